#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tempfile::TempDir;

use shopee_scrape_web::config::Config;
use shopee_scrape_web::scraper::{Credentials, ProductScraper, ScrapeError, ScrapeOutput, ScrapeQuery};
use shopee_scrape_web::AppState;

pub enum Behaviour {
    Items(Vec<Value>),
    Fail(String),
    Panic,
    /// One item, returned after sleeping.
    Slow(Duration),
}

/// Scraper double that records every query it receives.
pub struct StubScraper {
    behaviour: Behaviour,
    pub calls: Mutex<Vec<ScrapeQuery>>,
    finished: AtomicBool,
}

impl StubScraper {
    pub fn new(behaviour: Behaviour) -> Arc<Self> {
        Arc::new(Self {
            behaviour,
            calls: Mutex::new(Vec::new()),
            finished: AtomicBool::new(false),
        })
    }

    pub fn returning_items(count: usize) -> Arc<Self> {
        let items = (0..count)
            .map(|i| json!({ "name": format!("Item {i}"), "price": format!("{}.000", i + 1) }))
            .collect();
        Self::new(Behaviour::Items(items))
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Whether a scrape call has returned successfully.
    pub fn has_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    pub fn last_query(&self) -> Option<ScrapeQuery> {
        self.calls.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl ProductScraper for StubScraper {
    async fn scrape(
        &self,
        _credentials: &Credentials,
        query: &ScrapeQuery,
    ) -> Result<ScrapeOutput, ScrapeError> {
        self.calls.lock().unwrap().push(query.clone());
        let output = match &self.behaviour {
            Behaviour::Items(items) => json!({ "data": items }),
            Behaviour::Fail(msg) => return Err(ScrapeError::Login(msg.clone())),
            Behaviour::Panic => panic!("stub scraper blew up"),
            Behaviour::Slow(delay) => {
                tokio::time::sleep(*delay).await;
                json!({ "data": [{ "name": "late item" }] })
            }
        };
        self.finished.store(true, Ordering::SeqCst);
        Ok(output)
    }
}

pub fn config(dir: &TempDir, with_credentials: bool) -> Config {
    let mut config = Config::default();
    config.secret_key = "test-secret".to_string();
    config.results_dir = dir.path().to_path_buf();
    if with_credentials {
        config.shopee_username = Some("shop-user".to_string());
        config.shopee_password = Some("shop-pass".to_string());
    }
    config
}

pub fn state(dir: &TempDir, with_credentials: bool, scraper: Arc<StubScraper>) -> AppState {
    AppState::new(config(dir, with_credentials), scraper).unwrap()
}

pub fn files_in(dir: &TempDir) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    names.sort();
    names
}
