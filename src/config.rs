use std::env;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use crate::error::{AppError, Result};
use crate::scraper::Credentials;

pub const DEFAULT_SECRET_KEY: &str = "dev-secret-key";
pub const DEFAULT_RESULTS_DIR: &str = "downloaded_files";
pub const DEFAULT_SHOPEE_BASE_URL: &str = "https://shopee.vn";

#[derive(Clone)]
pub struct Config {
    pub server_addr: SocketAddr,
    pub secret_key: String,
    pub shopee_username: Option<String>,
    pub shopee_password: Option<String>,
    pub shopee_base_url: String,
    pub results_dir: PathBuf,
}

impl Config {
    pub fn load() -> Result<Self> {
        // Load environment variables from .env file if it exists
        dotenv::dotenv().ok();

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("PORT").unwrap_or_else(|_| "5000".to_string());
        let server_addr = parse_addr(&host, &port)?;

        let secret_key = match non_empty_var("APP_SECRET_KEY") {
            Some(key) => key,
            None => {
                tracing::warn!("APP_SECRET_KEY not set; using an insecure development key");
                DEFAULT_SECRET_KEY.to_string()
            }
        };

        // Credentials are only checked when a scrape is requested.
        let shopee_username = non_empty_var("SHOPEE_USERNAME");
        let shopee_password = non_empty_var("SHOPEE_PASSWORD");

        let shopee_base_url = non_empty_var("SHOPEE_BASE_URL")
            .unwrap_or_else(|| DEFAULT_SHOPEE_BASE_URL.to_string());
        let results_dir = non_empty_var("RESULTS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_RESULTS_DIR));

        Ok(Config {
            server_addr,
            secret_key,
            shopee_username,
            shopee_password,
            shopee_base_url,
            results_dir,
        })
    }

    /// Both halves of the login, or `None` if either is missing or blank.
    pub fn credentials(&self) -> Option<Credentials> {
        let username = self.shopee_username.as_deref().filter(|s| !s.is_empty())?;
        let password = self.shopee_password.as_deref().filter(|s| !s.is_empty())?;
        Some(Credentials {
            username: username.to_string(),
            password: password.to_string(),
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server_addr: SocketAddr::from(([127, 0, 0, 1], 5000)),
            secret_key: DEFAULT_SECRET_KEY.to_string(),
            shopee_username: None,
            shopee_password: None,
            shopee_base_url: DEFAULT_SHOPEE_BASE_URL.to_string(),
            results_dir: PathBuf::from(DEFAULT_RESULTS_DIR),
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_addr(host: &str, port: &str) -> Result<SocketAddr> {
    let port = port.parse::<u16>().map_err(|e| AppError::ConfigError(format!("Invalid port: {}", e)))?;
    let ip = IpAddr::from_str(host).map_err(|e| AppError::ConfigError(format!("Invalid host address: {}", e)))?;
    Ok(SocketAddr::new(ip, port))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_host_and_port() {
        let addr = parse_addr("0.0.0.0", "8080").unwrap();
        assert_eq!(addr.to_string(), "0.0.0.0:8080");
    }

    #[test]
    fn rejects_bad_port_and_host() {
        assert!(matches!(parse_addr("127.0.0.1", "http"), Err(AppError::ConfigError(_))));
        assert!(matches!(parse_addr("localhost", "5000"), Err(AppError::ConfigError(_))));
    }

    #[test]
    fn credentials_need_both_values() {
        let mut config = Config::default();
        assert!(config.credentials().is_none());

        config.shopee_username = Some("shop".into());
        assert!(config.credentials().is_none());

        config.shopee_password = Some(String::new());
        assert!(config.credentials().is_none());

        config.shopee_password = Some("secret".into());
        let creds = config.credentials().unwrap();
        assert_eq!(creds.username, "shop");
        assert_eq!(creds.password, "secret");
    }
}
