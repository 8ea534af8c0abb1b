use serde::Deserialize;

/// Raw fields of the scrape form. Everything stays a string until the
/// orchestrator validates it.
#[derive(Debug, Default, Deserialize)]
pub struct ScrapeForm {
    #[serde(default)]
    pub keyword: String,
    #[serde(default)]
    pub numpage: String,
    #[serde(default)]
    pub itemperpage: String,
}
