//! Page driver capability consumed by the crawler
//!
//! A page driver owns a single "page" that is reused for every URL of a
//! session: it navigates, lets the page settle, and hands back the rendered
//! content, the resource URLs and the outbound links. The crawler only talks
//! to it through [`PageDriver`]; [`HttpDriver`] is the reference
//! implementation built on `reqwest` and `scraper`.

mod extract;
mod http;

pub use extract::{
    count_overlay_candidates, extract_interactive_elements, extract_links, extract_resources,
    find_login_form, LoginForm,
};
pub use http::{build_http_client, HttpDriver};

use crate::config::LoginConfig;
use crate::ConfigError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use url::Url;

/// Errors raised by a page driver
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("No page is loaded")]
    NoPage,

    #[error("Page driver has been released")]
    Released,

    #[error("Login failed: {0}")]
    Authentication(String),

    #[error("Extraction failed: {0}")]
    Extraction(String),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}

/// Result type for page driver operations
pub type DriverResult<T> = Result<T, DriverError>;

/// Credentials for the login form submitted once before the crawl loop
#[derive(Clone)]
pub struct LoginCredentials {
    pub login_url: Url,
    pub username: String,
    pub password: String,
    pub username_field: String,
    pub password_field: String,
}

impl LoginCredentials {
    pub fn from_config(config: &LoginConfig) -> Result<Self, ConfigError> {
        let login_url = Url::parse(&config.login_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid login_url: {}", e)))?;

        Ok(Self {
            login_url,
            username: config.username.clone(),
            password: config.password.clone(),
            username_field: config.username_field.clone(),
            password_field: config.password_field.clone(),
        })
    }
}

impl fmt::Debug for LoginCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginCredentials")
            .field("login_url", &self.login_url.as_str())
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// An interactive element found on a page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum InteractiveElement {
    Button {
        text: String,
        id: Option<String>,
        class: Option<String>,
        href: Option<String>,
    },
    Form {
        id: Option<String>,
        class: Option<String>,
        action: Option<String>,
        method: String,
        fields: Vec<FormField>,
    },
    Modal {
        id: Option<String>,
        class: Option<String>,
        content: String,
    },
}

/// A single input, select or textarea inside a form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormField {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: Option<String>,
    pub id: Option<String>,
    pub class: Option<String>,
}

/// Capability the crawler uses to load and inspect pages
///
/// Implementations keep one current page. `content`, `resources`, `links`
/// and `interactive_elements` describe whatever `navigate` loaded last and
/// return [`DriverError::NoPage`] before the first successful navigation.
#[async_trait]
pub trait PageDriver: Send {
    /// Submits the login form; called at most once, before the crawl loop
    async fn authenticate(&mut self, credentials: &LoginCredentials) -> DriverResult<()>;

    /// Loads `url` as the current page, getting past interstitials where possible
    async fn navigate(&mut self, url: &Url) -> DriverResult<()>;

    /// Closes pop-ups and overlays on the current page
    ///
    /// Callers treat failures as advisory.
    async fn dismiss_overlays(&mut self) -> DriverResult<()>;

    /// Rendered markup of the current page
    async fn content(&mut self) -> DriverResult<String>;

    /// Absolute URLs of the images, scripts and stylesheets of the current page
    async fn resources(&mut self) -> DriverResult<Vec<String>>;

    /// Absolute outbound links of the current page
    async fn links(&mut self) -> DriverResult<Vec<String>>;

    /// Buttons, forms and modals of the current page
    async fn interactive_elements(&mut self) -> DriverResult<Vec<InteractiveElement>> {
        Ok(Vec::new())
    }

    /// URL the current page was served from, once redirects are followed
    ///
    /// Drivers that cannot tell return `None`; the crawler then only marks
    /// the requested URL as visited.
    fn current_url(&self) -> Option<Url> {
        None
    }

    /// Tears the page down; no navigation is possible afterwards
    async fn release(&mut self) -> DriverResult<()>;
}
