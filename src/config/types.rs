use serde::Deserialize;

/// Main configuration structure for Shop-Scraper
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scraper: ScraperConfig,
    #[serde(default)]
    pub assets: AssetsConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Listing fetch and enumeration behaviour
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    /// Listing root; page 1 is `{base}?page=1`, later pages `{base}page/{n}`
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// User-Agent header sent with every request
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Total attempts per page, including the first one
    #[serde(rename = "max-attempts")]
    pub max_attempts: u32,

    /// Fixed delay between attempts (milliseconds)
    #[serde(rename = "retry-delay-ms")]
    pub retry_delay_ms: u64,

    /// Whole-request timeout (seconds)
    #[serde(rename = "request-timeout-secs")]
    pub request_timeout_secs: u64,

    /// TCP connect timeout (seconds)
    #[serde(rename = "connect-timeout-secs")]
    pub connect_timeout_secs: u64,

    /// Maximum number of page requests in flight
    #[serde(rename = "max-concurrent-requests")]
    pub max_concurrent_requests: u32,

    /// Pages issued together when no page limit is given
    #[serde(rename = "pages-per-wave")]
    pub pages_per_wave: u32,

    /// Hard stop for runs without a page limit
    #[serde(rename = "page-ceiling")]
    pub page_ceiling: u32,

    /// Currency symbol stripped from price text before parsing
    #[serde(rename = "currency-symbol")]
    pub currency_symbol: String,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            base_url: "https://dentalstall.com/shop/".to_string(),
            user_agent: "Mozilla/5.0 (compatible; scraping-tool/1.0)".to_string(),
            max_attempts: 3,
            retry_delay_ms: 2000,
            request_timeout_secs: 30,
            connect_timeout_secs: 10,
            max_concurrent_requests: 16,
            pages_per_wave: 10,
            page_ceiling: 500,
            currency_symbol: "₹".to_string(),
        }
    }
}

/// Image download configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AssetsConfig {
    /// Whether product images are downloaded at all
    pub enabled: bool,

    /// Directory images are written to (created on demand)
    pub directory: String,

    /// File extension given to every image
    pub extension: String,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: "images".to_string(),
            extension: "jpg".to_string(),
        }
    }
}

/// Record store selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Sqlite,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Which record store receives each batch
    pub format: OutputFormat,

    /// Path to the JSON file or SQLite database
    pub path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Json,
            path: "products.json".to_string(),
        }
    }
}
