use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Value};

use crate::config::Config;
use crate::error::{AppError, Result, StoreError};
use crate::sanitize::keyword_slug;
use crate::scraper::{ProductScraper, ScrapeError, ScrapeQuery};
use crate::store::ResultStore;

pub const FILE_PREFIX: &str = "shopee";
const TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";
const MAX_NAME_ATTEMPTS: u32 = 100;

/// Source of the creation time stamped on a finished scrape.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// A validated scrape submission. Zero counts have already become `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeRequest {
    pub keyword: String,
    pub page_count: Option<u32>,
    pub items_per_page: Option<u32>,
}

impl ScrapeRequest {
    /// Validate raw form values. Blank numbers count as 0.
    pub fn parse(keyword: &str, page_count_raw: &str, items_per_page_raw: &str) -> Result<Self> {
        let invalid_numbers =
            || AppError::InvalidInput("Invalid numeric inputs. Please provide valid integers.".into());

        let page_count = parse_count(page_count_raw).ok_or_else(invalid_numbers)?;
        let items_per_page = parse_count(items_per_page_raw).ok_or_else(invalid_numbers)?;

        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Err(AppError::InvalidInput("Keyword is required.".into()));
        }

        if page_count < 0 || items_per_page < 0 {
            return Err(AppError::InvalidInput("Numbers must be 0 or greater.".into()));
        }

        Ok(ScrapeRequest {
            keyword: keyword.to_string(),
            page_count: normalize(page_count).ok_or_else(invalid_numbers)?,
            items_per_page: normalize(items_per_page).ok_or_else(invalid_numbers)?,
        })
    }
}

fn parse_count(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Some(0);
    }
    raw.parse::<i64>().ok()
}

/// 0 means "use the scraper default". The outer `None` flags a value too big
/// for the scraper to accept.
fn normalize(value: i64) -> Option<Option<u32>> {
    match value {
        0 => Some(None),
        n => u32::try_from(n).ok().map(Some),
    }
}

/// Outcome of a successful scrape.
#[derive(Debug, Clone)]
pub struct Submission {
    pub filename: String,
    pub result: Value,
}

/// Runs one scrape end to end: validate, scrape, stamp, persist.
#[derive(Clone)]
pub struct ScrapeOrchestrator {
    config: Arc<Config>,
    scraper: Arc<dyn ProductScraper>,
    store: ResultStore,
    clock: Clock,
}

impl ScrapeOrchestrator {
    pub fn new(config: Arc<Config>, scraper: Arc<dyn ProductScraper>, store: ResultStore) -> Self {
        Self {
            config,
            scraper,
            store,
            clock: Arc::new(Utc::now),
        }
    }

    /// Replace the wall clock, e.g. to pin timestamps.
    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub async fn submit(
        &self,
        keyword: &str,
        page_count_raw: &str,
        items_per_page_raw: &str,
    ) -> Result<Submission> {
        let request = ScrapeRequest::parse(keyword, page_count_raw, items_per_page_raw)?;
        self.run(request).await
    }

    /// Scrape and persist a validated request. The creation time is read
    /// once the scraper has returned.
    pub async fn run(&self, request: ScrapeRequest) -> Result<Submission> {
        let credentials = self.config.credentials().ok_or(AppError::MissingCredentials)?;

        let query = ScrapeQuery {
            keyword: request.keyword.clone(),
            page_count: request.page_count,
            items_per_page: request.items_per_page,
        };

        tracing::info!(
            keyword = %query.keyword,
            page_count = ?query.page_count,
            items_per_page = ?query.items_per_page,
            "starting scrape"
        );
        let start_time = std::time::Instant::now();

        // The scrape runs in its own task so a panicking scraper cannot take
        // the request handler down with it.
        let scraper = Arc::clone(&self.scraper);
        let task = tokio::spawn(async move { scraper.scrape(&credentials, &query).await });
        let output = match task.await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                tracing::warn!(keyword = %request.keyword, error = %e, "scrape failed");
                return Err(e.into());
            }
            Err(join_err) => {
                tracing::error!(keyword = %request.keyword, error = %join_err, "scraper task aborted");
                return Err(ScrapeError::Crashed(join_err.to_string()).into());
            }
        };
        tracing::info!(keyword = %request.keyword, elapsed = ?start_time.elapsed(), "scrape finished");

        let now = (self.clock)();
        let result = stamp_result(output, &request.keyword, now);
        let filename = self.persist(&request.keyword, &result, now).await?;

        Ok(Submission { filename, result })
    }

    async fn persist(&self, keyword: &str, result: &Value, now: DateTime<Utc>) -> Result<String> {
        let stem = format!("{}_{}_{}", FILE_PREFIX, keyword_slug(keyword), now.format(TIMESTAMP_FORMAT));

        for attempt in 1..=MAX_NAME_ATTEMPTS {
            let filename = collision_name(&stem, attempt);

            match self.store.write(&filename, result).await {
                Ok(path) => {
                    tracing::info!(path = %path.display(), "result saved");
                    return Ok(filename);
                }
                Err(StoreError::AlreadyExists(_)) => {
                    tracing::debug!(%filename, "name taken, trying next suffix");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(AppError::Io(format!("no free file name for {stem}")))
    }
}

/// `<stem>.json` first, then `<stem>_002.json`, `<stem>_003.json`, ...
///
/// `_` sorts after `.` and the counter is zero-padded, so a plain
/// descending sort keeps later attempts ahead of earlier ones.
fn collision_name(stem: &str, attempt: u32) -> String {
    if attempt == 1 {
        format!("{stem}.json")
    } else {
        format!("{stem}_{attempt:03}.json")
    }
}

/// Ensure the document is an object carrying `keyword` and `createdAt`.
fn stamp_result(output: Value, keyword: &str, now: DateTime<Utc>) -> Value {
    let mut result = match output {
        Value::Object(map) => Value::Object(map),
        other => json!({ "data": other }),
    };

    result["keyword"] = Value::String(keyword.to_string());
    result["createdAt"] = Value::String(now.to_rfc3339_opts(SecondsFormat::Secs, true));
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn blank_numbers_are_defaults() {
        let req = ScrapeRequest::parse(" shoes ", "", "  ").unwrap();
        assert_eq!(req.keyword, "shoes");
        assert_eq!(req.page_count, None);
        assert_eq!(req.items_per_page, None);
    }

    #[test]
    fn zero_becomes_default_and_positive_is_kept() {
        let req = ScrapeRequest::parse("shoes", "0", "40").unwrap();
        assert_eq!(req.page_count, None);
        assert_eq!(req.items_per_page, Some(40));
    }

    #[test]
    fn rejects_non_integers_before_anything_else() {
        let err = ScrapeRequest::parse("", "two", "1").unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(ref m) if m.contains("valid integers")));
        assert!(ScrapeRequest::parse("shoes", "1.5", "1").is_err());
    }

    #[test]
    fn rejects_empty_keyword_and_negatives() {
        let err = ScrapeRequest::parse("   ", "1", "1").unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(ref m) if m == "Keyword is required."));

        let err = ScrapeRequest::parse("shoes", "-1", "0").unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(ref m) if m == "Numbers must be 0 or greater."));
    }

    #[test]
    fn stamp_wraps_non_objects_and_sets_fields() {
        let now = Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap();
        let stamped = stamp_result(json!([1, 2]), "bag", now);
        assert_eq!(stamped["data"], json!([1, 2]));
        assert_eq!(stamped["keyword"], "bag");
        assert_eq!(stamped["createdAt"], "2024-05-06T07:08:09Z");
    }

    #[test]
    fn collision_names_sort_newest_first() {
        let stem = "shopee_bag_20240101-000000";
        let mut names: Vec<String> = (1..=MAX_NAME_ATTEMPTS).map(|n| collision_name(stem, n)).collect();
        let written = names.clone();
        names.sort_unstable_by(|a, b| b.cmp(a));

        let expected: Vec<String> = written.into_iter().rev().collect();
        assert_eq!(names, expected);
        assert_eq!(collision_name(stem, 2), "shopee_bag_20240101-000000_002.json");
        assert!(collision_name(stem, 100) > collision_name("shopee_bag_20231231-235959", 100));
        assert!(collision_name(stem, 100) < collision_name("shopee_bag_20240101-000001", 1));
    }

    #[test]
    fn stamp_overrides_scraper_keyword() {
        let now = Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap();
        let stamped = stamp_result(json!({ "keyword": "other", "data": [] }), "bag", now);
        assert_eq!(stamped["keyword"], "bag");
    }
}
