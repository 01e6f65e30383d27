// Stay quoting for hotel rooms and beach places, and conversion of quotes into bookings

pub mod booking;
pub mod catalog;
pub mod dates;
pub mod gateway;
pub mod memory;
pub mod quote;
pub mod resolver;
pub mod store;

// Re-export key types for convenience
pub use booking::{
    Booking, BookingConverter, BookingOverride, BookingPayload, BookingStatus, ConversionError,
    CreatedBooking,
};
pub use catalog::{
    CategoryOption, LineItem, PriceList, ProductLine, RateCatalog, RateSnapshot, TimetableEntry,
    TimetableIndex,
};
pub use gateway::{BookingGateway, CatalogSource, QuoteGateway, TransportConfig, TransportError};
pub use quote::{DayCharge, Quote, QuoteBuilder, StayRequest};
pub use resolver::{RateResolver, Resolution};
pub use store::{QuoteFilter, QuoteStore};
