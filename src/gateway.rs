// Boundary contracts for the remote store that owns catalogs, timetables, quotes and bookings
// Transport details live behind these traits; the core only sees results

use async_trait::async_trait;
use serde::Deserialize;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

use crate::booking::{Booking, BookingPayload};
use crate::catalog::{PriceList, ProductLine, TimetableEntry};
use crate::quote::Quote;
use crate::store::QuoteFilter;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    #[error("Remote error: {status_code} - {message}")]
    Response { status_code: u16, message: String },

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Other error: {0}")]
    Other(String),
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        TransportError::Decode(err.to_string())
    }
}

/// Settings applied to every collaborator call. No timeout by default; the core itself
/// never retries.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub timeout_ms: Option<u64>,
}

impl TransportConfig {
    pub fn with_timeout_ms(timeout_ms: u64) -> Self {
        Self {
            timeout_ms: Some(timeout_ms),
        }
    }

    // Run a collaborator call under the configured cap, if any
    pub async fn cap<T, F>(&self, call: F) -> Result<T, TransportError>
    where
        F: Future<Output = Result<T, TransportError>>,
    {
        match self.timeout_ms {
            Some(ms) => tokio::time::timeout(Duration::from_millis(ms), call)
                .await
                .map_err(|_| TransportError::Timeout(ms))?,
            None => call.await,
        }
    }
}

#[async_trait]
pub trait CatalogSource: Send + Sync {
    // Full replacement set of pricelists for a product line
    async fn load_catalog(&self, line: ProductLine) -> Result<Vec<PriceList>, TransportError>;

    // Full replacement timetable for a product line
    async fn load_timetable(&self, line: ProductLine)
        -> Result<Vec<TimetableEntry>, TransportError>;
}

#[async_trait]
pub trait QuoteGateway: Send + Sync {
    async fn list_quotes(&self, filter: QuoteFilter) -> Result<Vec<Quote>, TransportError>;

    // Returns the quote as stored, with its assigned id
    async fn persist_quote(&self, quote: Quote) -> Result<Quote, TransportError>;

    async fn remove_quote(&self, id: &str) -> Result<(), TransportError>;
}

#[async_trait]
pub trait BookingGateway: Send + Sync {
    // One endpoint per product line
    async fn create_booking(
        &self,
        line: ProductLine,
        payload: BookingPayload,
    ) -> Result<Booking, TransportError>;
}
