use serde::Deserialize;

/// Main configuration structure for Sumi-Mirror
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub scope: ScopeConfig,
    #[serde(default)]
    pub login: Option<LoginConfig>,
    #[serde(default)]
    pub proxy: Option<ProxyConfig>,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// URL the crawl starts from (the command line may override it)
    #[serde(rename = "seed-url", default)]
    pub seed_url: Option<String>,

    /// Maximum number of link hops from the seed URL
    #[serde(rename = "max-depth", default = "default_max_depth")]
    pub max_depth: u32,

    /// Maximum number of pages attempted in one session
    #[serde(rename = "max-pages", default = "default_max_pages")]
    pub max_pages: u32,

    /// Time to let a page settle after navigation (milliseconds)
    #[serde(rename = "settle-time", default = "default_settle_time")]
    pub settle_time: u64,

    /// Per-request timeout of the page driver (seconds)
    #[serde(rename = "request-timeout", default = "default_request_timeout")]
    pub request_timeout: u64,

    /// Whether buttons, forms and modals are captured for every page
    #[serde(rename = "capture-interactive", default = "default_true")]
    pub capture_interactive: bool,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,
}

impl UserAgentConfig {
    /// Formats the user agent header: `Name/Version (+ContactURL)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{})",
            self.crawler_name, self.crawler_version, self.contact_url
        )
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Root directory mirrored pages are written under
    #[serde(rename = "downloads-dir")]
    pub downloads_dir: String,

    /// Path to the SQLite run manifest
    #[serde(rename = "manifest-path")]
    pub manifest_path: String,

    /// Whether page resources (images, scripts, stylesheets) are downloaded
    #[serde(rename = "download-resources", default = "default_true")]
    pub download_resources: bool,
}

/// Host patterns limiting which discovered links are followed
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScopeConfig {
    /// Host patterns to follow (e.g. "example.com" or "*.example.com"); empty means any host
    #[serde(default)]
    pub allow: Vec<String>,

    /// Host patterns never followed; wins over `allow`
    #[serde(default)]
    pub deny: Vec<String>,
}

/// Login form credentials used once before the crawl loop
#[derive(Debug, Clone, Deserialize)]
pub struct LoginConfig {
    #[serde(rename = "login-url")]
    pub login_url: String,

    pub username: String,

    pub password: String,

    /// Name of the username input on the login form
    #[serde(rename = "username-field", default = "default_username_field")]
    pub username_field: String,

    /// Name of the password input on the login form
    #[serde(rename = "password-field", default = "default_password_field")]
    pub password_field: String,
}

/// Outbound proxy for the page driver
#[derive(Debug, Clone, Deserialize)]
pub struct ProxyConfig {
    pub host: String,

    pub port: u16,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,
}

impl ProxyConfig {
    /// Proxy address in `http://host:port` form
    pub fn address(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

fn default_max_depth() -> u32 {
    3
}

fn default_max_pages() -> u32 {
    100
}

fn default_settle_time() -> u64 {
    5000
}

fn default_request_timeout() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

fn default_username_field() -> String {
    "username".to_string()
}

fn default_password_field() -> String {
    "password".to_string()
}
