// In-process stand-ins for the remote store, with failure injection
// Used by the tests and by the CLI when it quotes from local files

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use crate::booking::{Booking, BookingPayload};
use crate::catalog::{PriceList, ProductLine, TimetableEntry};
use crate::gateway::{BookingGateway, CatalogSource, QuoteGateway, TransportError};
use crate::quote::Quote;
use crate::store::QuoteFilter;

#[derive(Default)]
pub struct InMemoryCatalogSource {
    catalogs: RwLock<HashMap<ProductLine, Vec<PriceList>>>,
    timetables: RwLock<HashMap<ProductLine, Vec<TimetableEntry>>>,
    fail_next_load: Mutex<Option<String>>,
}

impl InMemoryCatalogSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_catalog(&self, line: ProductLine, price_lists: Vec<PriceList>) {
        self.catalogs.write().insert(line, price_lists);
    }

    pub fn set_timetable(&self, line: ProductLine, entries: Vec<TimetableEntry>) {
        self.timetables.write().insert(line, entries);
    }

    // The next catalog or timetable load fails with a network error
    pub fn fail_next_load(&self, message: &str) {
        *self.fail_next_load.lock() = Some(message.to_string());
    }

    fn check_failure(&self) -> Result<(), TransportError> {
        match self.fail_next_load.lock().take() {
            Some(message) => Err(TransportError::Network(message)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl CatalogSource for InMemoryCatalogSource {
    async fn load_catalog(&self, line: ProductLine) -> Result<Vec<PriceList>, TransportError> {
        self.check_failure()?;
        Ok(self.catalogs.read().get(&line).cloned().unwrap_or_default())
    }

    async fn load_timetable(
        &self,
        line: ProductLine,
    ) -> Result<Vec<TimetableEntry>, TransportError> {
        self.check_failure()?;
        Ok(self.timetables.read().get(&line).cloned().unwrap_or_default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteOperation {
    List,
    Persist,
    Remove,
}

/// Quote table keyed by id. Listing returns quotes in insertion order.
#[derive(Default)]
pub struct InMemoryQuoteGateway {
    quotes: DashMap<String, (u64, Quote)>,
    sequence: AtomicU64,
    failures: Mutex<Vec<QuoteOperation>>,
}

impl InMemoryQuoteGateway {
    pub fn new() -> Self {
        Self::default()
    }

    // Arm a one-shot failure for the next call of `operation`
    pub fn fail_next(&self, operation: QuoteOperation) {
        self.failures.lock().push(operation);
    }

    fn check_failure(&self, operation: QuoteOperation) -> Result<(), TransportError> {
        let mut failures = self.failures.lock();
        match failures.iter().position(|armed| *armed == operation) {
            Some(index) => {
                failures.remove(index);
                Err(TransportError::Network(format!(
                    "{:?} rejected by quote store",
                    operation
                )))
            }
            None => Ok(()),
        }
    }

    fn next_id(&self) -> String {
        loop {
            let id = format!("quote-{}", rand::random::<u32>());
            if !self.quotes.contains_key(&id) {
                return id;
            }
        }
    }

    /// Writes a quote directly, bypassing failure injection, as another client would.
    pub fn insert(&self, mut quote: Quote) -> Quote {
        let id = quote.id.clone().unwrap_or_else(|| self.next_id());
        quote.id = Some(id.clone());
        let order = self.sequence.fetch_add(1, Ordering::SeqCst);
        self.quotes.insert(id, (order, quote.clone()));
        quote
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }
}

#[async_trait]
impl QuoteGateway for InMemoryQuoteGateway {
    async fn list_quotes(&self, filter: QuoteFilter) -> Result<Vec<Quote>, TransportError> {
        self.check_failure(QuoteOperation::List)?;

        let mut ordered: Vec<(u64, Quote)> = self
            .quotes
            .iter()
            .filter(|entry| filter.matches(&entry.value().1))
            .map(|entry| entry.value().clone())
            .collect();
        ordered.sort_by_key(|(order, _)| *order);

        Ok(ordered.into_iter().map(|(_, quote)| quote).collect())
    }

    async fn persist_quote(&self, quote: Quote) -> Result<Quote, TransportError> {
        self.check_failure(QuoteOperation::Persist)?;
        Ok(self.insert(quote))
    }

    async fn remove_quote(&self, id: &str) -> Result<(), TransportError> {
        self.check_failure(QuoteOperation::Remove)?;
        self.quotes.remove(id);
        Ok(())
    }
}

// Fields the booking record owns; never copied from the payload details
const BOOKING_OWNED_KEYS: [&str; 4] = ["id", "productLine", "status", "createdFromQuote"];

#[derive(Default)]
pub struct InMemoryBookingGateway {
    bookings: DashMap<String, Booking>,
    calls: AtomicUsize,
    fail_next: AtomicBool,
    delay: Mutex<Duration>,
}

impl InMemoryBookingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = delay;
    }

    // Number of create calls received, failed ones included
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn get(&self, id: &str) -> Option<Booking> {
        self.bookings.get(id).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.bookings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bookings.is_empty()
    }
}

#[async_trait]
impl BookingGateway for InMemoryBookingGateway {
    async fn create_booking(
        &self,
        line: ProductLine,
        payload: BookingPayload,
    ) -> Result<Booking, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let delay = *self.delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(TransportError::Response {
                status_code: 500,
                message: "Internal Server Error".to_string(),
            });
        }

        let BookingPayload {
            mut details,
            status,
            created_from,
            created_from_quote,
            quote_id,
        } = payload;
        for key in BOOKING_OWNED_KEYS {
            details.remove(key);
        }
        details.insert("createdFrom".to_string(), created_from.into());
        details.insert("quoteId".to_string(), quote_id.into());

        let booking = Booking {
            id: format!("booking-{}-{}", line, rand::random::<u32>()),
            product_line: line,
            status,
            created_from_quote: Some(created_from_quote),
            details,
        };
        self.bookings.insert(booking.id.clone(), booking.clone());
        Ok(booking)
    }
}
