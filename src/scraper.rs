use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use reqwest::{Client, ClientBuilder, StatusCode};
use scraper::{ElementRef, Html, Selector};
use serde_json::{json, Map, Value};

pub const DEFAULT_PAGE_COUNT: u32 = 1;
pub const DEFAULT_ITEMS_PER_PAGE: u32 = 60;

/// Login for the shop account. Never logged.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &"<redacted>")
            .field("password", &"<redacted>")
            .finish()
    }
}

/// What to search for. `None` lets the scraper pick its default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeQuery {
    pub keyword: String,
    pub page_count: Option<u32>,
    pub items_per_page: Option<u32>,
}

/// Whatever the scraper produced. Expected to hold a `data` array of item
/// records; their shape is not inspected here.
pub type ScrapeOutput = Value;

#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error("login failed: {0}")]
    Login(String),

    #[error("request failed: {0}")]
    Fetch(#[from] reqwest::Error),

    #[error("unexpected status {status} for {url}")]
    Status { status: StatusCode, url: String },

    #[error("could not parse page: {0}")]
    Parse(String),

    #[error("scraper crashed: {0}")]
    Crashed(String),
}

/// Performs a blocking-for-the-request product search against the shop.
#[async_trait]
pub trait ProductScraper: Send + Sync {
    async fn scrape(
        &self,
        credentials: &Credentials,
        query: &ScrapeQuery,
    ) -> Result<ScrapeOutput, ScrapeError>;
}

static ITEM_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("li.shopee-search-item-result__item, div[data-sqe=\"item\"]")
        .expect("Failed to parse item selector")
});

static NAME_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("[data-sqe=\"name\"], .line-clamp-2").expect("Failed to parse name selector")
});

static PRICE_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("[class*=\"price\"]").expect("Failed to parse price selector")
});

static SOLD_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("[class*=\"sold\"]").expect("Failed to parse sold selector")
});

static LOCATION_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("[class*=\"location\"], [aria-label*=\"location\"]")
        .expect("Failed to parse location selector")
});

static LINK_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href]").expect("Failed to parse link selector"));

static IMAGE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("img[src]").expect("Failed to parse image selector"));

/// Scrapes the public search pages of a Shopee storefront after logging in
/// with the configured account.
#[derive(Debug, Clone)]
pub struct ShopeeScraper {
    base_url: String,
}

impl ShopeeScraper {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn client() -> Result<Client, ScrapeError> {
        // A fresh cookie jar per scrape keeps sessions apart.
        let client = ClientBuilder::new()
            .cookie_store(true)
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(10)
            .user_agent("Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36")
            .build()?;
        Ok(client)
    }

    async fn login(&self, client: &Client, credentials: &Credentials) -> Result<(), ScrapeError> {
        let url = format!("{}/api/v4/account/login_by_password", self.base_url);
        let response = client
            .post(&url)
            .json(&json!({
                "username": credentials.username,
                "password": credentials.password,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::Login(format!("server answered {status}")));
        }

        let body: Value = response.json().await?;
        match body.get("error").and_then(Value::as_i64) {
            None | Some(0) => Ok(()),
            Some(code) => {
                let msg = body
                    .get("error_msg")
                    .and_then(Value::as_str)
                    .unwrap_or("rejected by server");
                Err(ScrapeError::Login(format!("{msg} (code {code})")))
            }
        }
    }

    async fn fetch_page(&self, client: &Client, keyword: &str, page: u32) -> Result<String, ScrapeError> {
        let url = format!(
            "{}/search?keyword={}&page={}",
            self.base_url,
            urlencoding::encode(keyword),
            page
        );
        let response = client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::Status { status, url });
        }
        Ok(response.text().await?)
    }
}

#[async_trait]
impl ProductScraper for ShopeeScraper {
    async fn scrape(
        &self,
        credentials: &Credentials,
        query: &ScrapeQuery,
    ) -> Result<ScrapeOutput, ScrapeError> {
        let pages = query.page_count.unwrap_or(DEFAULT_PAGE_COUNT);
        let per_page = query.items_per_page.unwrap_or(DEFAULT_ITEMS_PER_PAGE) as usize;

        let client = Self::client()?;
        self.login(&client, credentials).await?;
        tracing::info!(keyword = %query.keyword, pages, per_page, "logged in, scraping search pages");

        let mut items = Vec::new();
        for page in 0..pages {
            let html = self.fetch_page(&client, &query.keyword, page).await?;
            let found = extract_items(&html, &self.base_url, per_page);
            tracing::debug!(page, found = found.len(), "page scraped");
            if found.is_empty() {
                break;
            }
            items.extend(found);
        }

        Ok(json!({
            "keyword": query.keyword,
            "pages": pages,
            "itemsPerPage": per_page,
            "data": items,
        }))
    }
}

/// Pull product cards out of a search results page, at most `limit` of them.
pub fn extract_items(html: &str, base_url: &str, limit: usize) -> Vec<Value> {
    let document = Html::parse_document(html);

    document
        .select(&ITEM_SELECTOR)
        .filter_map(|card| extract_item(card, base_url))
        .take(limit)
        .collect()
}

fn extract_item(card: ElementRef<'_>, base_url: &str) -> Option<Value> {
    let name = first_text(card, &NAME_SELECTOR)?;

    let mut record = Map::new();
    record.insert("name".into(), Value::String(name));

    if let Some(price) = first_text(card, &PRICE_SELECTOR) {
        record.insert("price".into(), Value::String(price));
    }
    if let Some(sold) = first_text(card, &SOLD_SELECTOR) {
        record.insert("sold".into(), Value::String(sold));
    }
    if let Some(location) = first_text(card, &LOCATION_SELECTOR) {
        record.insert("location".into(), Value::String(location));
    }
    if let Some(href) = card.select(&LINK_SELECTOR).next().and_then(|a| a.value().attr("href")) {
        record.insert("url".into(), Value::String(absolute_url(base_url, href)));
    }
    if let Some(src) = card.select(&IMAGE_SELECTOR).next().and_then(|img| img.value().attr("src")) {
        record.insert("image".into(), Value::String(src.to_string()));
    }

    Some(Value::Object(record))
}

fn first_text(card: ElementRef<'_>, selector: &Selector) -> Option<String> {
    card.select(selector)
        .map(|el| el.text().collect::<Vec<_>>().join(" "))
        .map(|text| text.split_whitespace().collect::<Vec<_>>().join(" "))
        .find(|text| !text.is_empty())
}

fn absolute_url(base_url: &str, href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        href.to_string()
    } else if let Some(rest) = href.strip_prefix("//") {
        format!("https://{rest}")
    } else {
        format!("{}/{}", base_url, href.trim_start_matches('/'))
    }
}
