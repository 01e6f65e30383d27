// Saved quotes, mirrored from the remote store
// Every mutation re-reads the full list; the local view is never patched in place

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

use crate::catalog::ProductLine;
use crate::gateway::{QuoteGateway, TransportConfig, TransportError};
use crate::quote::Quote;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuoteFilter {
    #[default]
    All,
    ProductLine(ProductLine),
}

impl QuoteFilter {
    pub fn matches(&self, quote: &Quote) -> bool {
        match self {
            QuoteFilter::All => true,
            QuoteFilter::ProductLine(line) => quote.product_line == *line,
        }
    }
}

pub struct QuoteStore {
    gateway: Arc<dyn QuoteGateway>,
    config: TransportConfig,
    quotes: RwLock<Arc<Vec<Quote>>>,
    last_filter: Mutex<QuoteFilter>,
}

impl QuoteStore {
    pub fn new(gateway: Arc<dyn QuoteGateway>, config: TransportConfig) -> Self {
        Self {
            gateway,
            config,
            quotes: RwLock::new(Arc::new(Vec::new())),
            last_filter: Mutex::new(QuoteFilter::All),
        }
    }

    // Current view as last loaded
    pub fn quotes(&self) -> Arc<Vec<Quote>> {
        self.quotes.read().clone()
    }

    pub fn find(&self, id: &str) -> Option<Quote> {
        self.quotes()
            .iter()
            .find(|quote| quote.id.as_deref() == Some(id))
            .cloned()
    }

    /// Reloads the view from the remote store. A failed load empties the view so stale
    /// quotes are never mistaken for current ones.
    pub async fn list(&self, filter: QuoteFilter) -> Result<Arc<Vec<Quote>>, TransportError> {
        *self.last_filter.lock() = filter;

        match self.config.cap(self.gateway.list_quotes(filter)).await {
            Ok(quotes) => {
                let quotes = Arc::new(quotes);
                *self.quotes.write() = Arc::clone(&quotes);
                Ok(quotes)
            }
            Err(err) => {
                error!(?filter, error = %err, "Failed to load quotes");
                *self.quotes.write() = Arc::new(Vec::new());
                Err(err)
            }
        }
    }

    // Re-read with whichever filter the view was last loaded with
    async fn resync(&self) -> Result<(), TransportError> {
        let filter = *self.last_filter.lock();
        self.list(filter).await.map(|_| ())
    }

    pub async fn save(&self, quote: Quote) -> Result<Quote, TransportError> {
        let saved = self
            .config
            .cap(self.gateway.persist_quote(quote))
            .await
            .map_err(|err| {
                error!(error = %err, "Failed to save quote");
                err
            })?;
        info!(id = ?saved.id, total = saved.total, "Saved quote");

        self.resync().await?;
        Ok(saved)
    }

    pub async fn delete(&self, id: &str) -> Result<(), TransportError> {
        self.config
            .cap(self.gateway.remove_quote(id))
            .await
            .map_err(|err| {
                error!(id, error = %err, "Failed to delete quote");
                err
            })?;
        info!(id, "Deleted quote");

        self.resync().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{LineItem, PriceList, RateCatalog, TimetableEntry};
    use crate::memory::{InMemoryQuoteGateway, QuoteOperation};
    use crate::quote::{QuoteBuilder, StayRequest};

    fn sample_quote(line: ProductLine, category: &str) -> Quote {
        let catalog = RateCatalog::new();
        catalog.replace_price_lists(line, vec![PriceList::new("A", vec![LineItem::hotel(category, 80.0)])]);
        catalog.replace_timetable(line, vec![TimetableEntry::new("2024-06-01", "A")]);
        QuoteBuilder::new(&catalog)
            .build_quote(&StayRequest::new("2024-06-01", "2024-06-02", category, line))
            .unwrap()
    }

    fn store_with(gateway: &Arc<InMemoryQuoteGateway>) -> QuoteStore {
        QuoteStore::new(gateway.clone(), TransportConfig::default())
    }

    #[tokio::test]
    async fn test_save_assigns_id_and_refreshes_view() {
        let gateway = Arc::new(InMemoryQuoteGateway::new());
        let store = store_with(&gateway);

        let saved = store.save(sample_quote(ProductLine::Hotel, "DBL")).await.unwrap();

        let id = saved.id.clone().unwrap();
        assert_eq!(store.quotes().len(), 1);
        assert_eq!(store.find(&id), Some(saved));
    }

    #[tokio::test]
    async fn test_delete_refreshes_view() {
        let gateway = Arc::new(InMemoryQuoteGateway::new());
        let store = store_with(&gateway);
        let saved = store.save(sample_quote(ProductLine::Hotel, "DBL")).await.unwrap();
        store.save(sample_quote(ProductLine::Hotel, "SGL")).await.unwrap();

        store.delete(saved.id.as_deref().unwrap()).await.unwrap();

        assert_eq!(store.quotes().len(), 1);
        assert_eq!(store.quotes()[0].category, "SGL");
    }

    #[tokio::test]
    async fn test_view_picks_up_changes_made_elsewhere() {
        let gateway = Arc::new(InMemoryQuoteGateway::new());
        let store = store_with(&gateway);
        store.save(sample_quote(ProductLine::Hotel, "DBL")).await.unwrap();

        // Another client writes directly to the remote store
        gateway.insert(sample_quote(ProductLine::Beach, "Fila 1"));
        store.save(sample_quote(ProductLine::Hotel, "SGL")).await.unwrap();

        assert_eq!(store.quotes().len(), 3);
    }

    #[tokio::test]
    async fn test_filtered_view_is_kept_across_mutations() {
        let gateway = Arc::new(InMemoryQuoteGateway::new());
        let store = store_with(&gateway);
        gateway.insert(sample_quote(ProductLine::Beach, "Fila 1"));

        store.list(QuoteFilter::ProductLine(ProductLine::Hotel)).await.unwrap();
        store.save(sample_quote(ProductLine::Hotel, "DBL")).await.unwrap();

        let quotes = store.quotes();
        assert_eq!(quotes.len(), 1);
        assert!(quotes.iter().all(|q| q.product_line == ProductLine::Hotel));
    }

    #[tokio::test]
    async fn test_failed_list_empties_view_and_propagates() {
        let gateway = Arc::new(InMemoryQuoteGateway::new());
        let store = store_with(&gateway);
        store.save(sample_quote(ProductLine::Hotel, "DBL")).await.unwrap();

        gateway.fail_next(QuoteOperation::List);
        let result = store.list(QuoteFilter::All).await;

        assert!(result.is_err());
        assert!(store.quotes().is_empty());
    }

    #[tokio::test]
    async fn test_failed_save_leaves_remote_untouched() {
        let gateway = Arc::new(InMemoryQuoteGateway::new());
        let store = store_with(&gateway);

        gateway.fail_next(QuoteOperation::Persist);
        let result = store.save(sample_quote(ProductLine::Hotel, "DBL")).await;

        assert!(matches!(result, Err(TransportError::Network(_))));
        assert_eq!(gateway.len(), 0);
    }

    #[test]
    fn test_filter_matches_product_line() {
        let quote = sample_quote(ProductLine::Beach, "Fila 2");
        assert!(QuoteFilter::All.matches(&quote));
        assert!(QuoteFilter::ProductLine(ProductLine::Beach).matches(&quote));
        assert!(!QuoteFilter::ProductLine(ProductLine::Hotel).matches(&quote));
    }
}
