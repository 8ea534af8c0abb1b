pub mod api;
pub mod config;
pub mod error;
pub mod history;
pub mod orchestrator;
pub mod sanitize;
pub mod scraper;
pub mod store;
pub mod viewer;

use std::sync::Arc;
use config::Config;
use error::Result;
use orchestrator::ScrapeOrchestrator;
use scraper::ProductScraper;
use store::ResultStore;

/// Application state that will be shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: ResultStore,
    pub orchestrator: ScrapeOrchestrator,
}

impl AppState {
    /// Open the result store named in `config` and wire the scraper in.
    pub fn new(config: Config, scraper: Arc<dyn ProductScraper>) -> Result<Self> {
        let config = Arc::new(config);
        let store = ResultStore::open(&config.results_dir)?;
        let orchestrator = ScrapeOrchestrator::new(Arc::clone(&config), scraper, store.clone());
        Ok(AppState {
            config,
            store,
            orchestrator,
        })
    }
}
