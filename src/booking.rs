// Quote → booking conversion
// Two phases: create the booking, then retire the source quote. There is no rollback; a
// failure in the second phase is reported together with the booking that already exists.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::catalog::ProductLine;
use crate::gateway::{BookingGateway, TransportConfig, TransportError};
use crate::quote::Quote;
use crate::store::QuoteStore;

/// Caller-supplied booking fields, e.g. the physical room or umbrella that was picked.
/// Replaces the quote's own fields wholesale when given.
pub type BookingOverride = Map<String, Value>;

// Keys the converter always stamps itself
const STAMPED_KEYS: [&str; 4] = ["status", "createdFrom", "createdFromQuote", "quoteId"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Confirmed,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingPayload {
    #[serde(flatten)]
    pub details: Map<String, Value>,
    pub status: BookingStatus,
    pub created_from: String,
    pub created_from_quote: String,
    // Legacy key some booking endpoints still read
    pub quote_id: String,
}

impl BookingPayload {
    pub fn new(quote_id: &str, mut details: Map<String, Value>) -> Self {
        for key in STAMPED_KEYS {
            details.remove(key);
        }
        Self {
            details,
            status: BookingStatus::Confirmed,
            created_from: format!("quote_{}", quote_id),
            created_from_quote: quote_id.to_string(),
            quote_id: quote_id.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: String,
    pub product_line: ProductLine,
    pub status: BookingStatus,
    #[serde(default)]
    pub created_from_quote: Option<String>,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

#[derive(Error, Debug)]
pub enum ConversionError {
    #[error("Quote not found: {quote_id}")]
    NotFound { quote_id: String },

    #[error("Invalid booking payload: {0}")]
    Payload(String),

    #[error("Booking creation failed: {0}")]
    BookingCreation(#[source] TransportError),

    #[error("Booking {} created but quote {quote_id} was not removed: {source}", .booking.id)]
    QuoteRetirement {
        booking: Box<Booking>,
        quote_id: String,
        #[source]
        source: TransportError,
    },
}

impl ConversionError {
    // Booking that exists remotely despite the error, if any
    pub fn created_booking(&self) -> Option<&Booking> {
        match self {
            ConversionError::QuoteRetirement { booking, .. } => Some(booking),
            _ => None,
        }
    }
}

/// Result of phase one: the booking exists, the source quote has not been retired yet.
#[derive(Debug)]
#[must_use = "the source quote is still live until retire_quote is called"]
pub struct CreatedBooking {
    pub booking: Booking,
    pub quote_id: String,
}

pub struct BookingConverter {
    store: Arc<QuoteStore>,
    bookings: Arc<dyn BookingGateway>,
    config: TransportConfig,
}

impl BookingConverter {
    pub fn new(
        store: Arc<QuoteStore>,
        bookings: Arc<dyn BookingGateway>,
        config: TransportConfig,
    ) -> Self {
        Self {
            store,
            bookings,
            config,
        }
    }

    /// Payload for converting `quote_id`, looked up in the store's current view.
    pub fn build_payload(
        &self,
        quote_id: &str,
        booking_override: Option<BookingOverride>,
    ) -> Result<BookingPayload, ConversionError> {
        let quote = self
            .store
            .find(quote_id)
            .ok_or_else(|| ConversionError::NotFound {
                quote_id: quote_id.to_string(),
            })?;

        let details = match booking_override {
            Some(details) => details,
            None => quote_fields(&quote)?,
        };
        Ok(BookingPayload::new(quote_id, details))
    }

    /// Phase one. Nothing is written if the quote is unknown.
    pub async fn create_booking(
        &self,
        quote_id: &str,
        line: ProductLine,
        booking_override: Option<BookingOverride>,
    ) -> Result<CreatedBooking, ConversionError> {
        let payload = self.build_payload(quote_id, booking_override)?;

        let booking = self
            .config
            .cap(self.bookings.create_booking(line, payload))
            .await
            .map_err(|err| {
                error!(quote_id, %line, error = %err, "Booking creation failed");
                ConversionError::BookingCreation(err)
            })?;
        info!(quote_id, booking_id = %booking.id, %line, "Created booking from quote");

        Ok(CreatedBooking {
            booking,
            quote_id: quote_id.to_string(),
        })
    }

    /// Phase two. The booking is not undone if the delete fails.
    pub async fn retire_quote(&self, created: CreatedBooking) -> Result<Booking, ConversionError> {
        let CreatedBooking { booking, quote_id } = created;

        match self.store.delete(&quote_id).await {
            Ok(()) => Ok(booking),
            Err(source) => {
                warn!(
                    quote_id = %quote_id,
                    booking_id = %booking.id,
                    error = %source,
                    "Booking created but source quote was not removed"
                );
                Err(ConversionError::QuoteRetirement {
                    booking: Box::new(booking),
                    quote_id,
                    source,
                })
            }
        }
    }

    pub async fn convert(
        &self,
        quote_id: &str,
        line: ProductLine,
        booking_override: Option<BookingOverride>,
    ) -> Result<Booking, ConversionError> {
        let created = self.create_booking(quote_id, line, booking_override).await?;
        self.retire_quote(created).await
    }
}

fn quote_fields(quote: &Quote) -> Result<Map<String, Value>, ConversionError> {
    match serde_json::to_value(quote) {
        Ok(Value::Object(fields)) => Ok(fields),
        Ok(other) => Err(ConversionError::Payload(format!(
            "quote serialized to a non-object: {}",
            other
        ))),
        Err(err) => Err(ConversionError::Payload(err.to_string())),
    }
}
