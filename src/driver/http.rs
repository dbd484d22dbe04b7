//! HTTP page driver
//!
//! Loads pages with a cookie-keeping `reqwest` client and answers every
//! inspection call from the markup of the last response. Handles:
//! - Building the HTTP client (user agent, timeouts, proxy, cookies)
//! - Error classification for failed navigations
//! - Submitting the login form before a crawl

use super::extract;
use super::{DriverError, DriverResult, InteractiveElement, LoginCredentials, PageDriver};
use crate::config::{Config, ProxyConfig, UserAgentConfig};
use async_trait::async_trait;
use reqwest::{redirect::Policy, Client, Proxy};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `user_agent` - The user agent configuration
/// * `timeout_secs` - Per-request timeout in seconds
/// * `proxy` - Optional outbound proxy
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(
    user_agent: &UserAgentConfig,
    timeout_secs: u64,
    proxy: Option<&ProxyConfig>,
) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder()
        .user_agent(user_agent.header_value())
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(10))
        .cookie_store(true)
        .gzip(true)
        .brotli(true);

    if let Some(proxy_config) = proxy {
        let mut proxy = Proxy::all(proxy_config.address())?;
        if let (Some(username), Some(password)) = (&proxy_config.username, &proxy_config.password)
        {
            proxy = proxy.basic_auth(username, password);
        }
        builder = builder.proxy(proxy);
    }

    builder.build()
}

/// The page most recently loaded by the driver
#[derive(Debug, Clone)]
struct LoadedPage {
    /// Final URL after redirects
    url: Url,
    body: String,
}

/// Page driver backed by plain HTTP requests
///
/// Pop-ups never block an HTTP client, so `dismiss_overlays` only reports
/// how many close controls the page carries.
#[derive(Debug)]
pub struct HttpDriver {
    client: Client,
    page: Option<LoadedPage>,
    released: bool,
}

impl HttpDriver {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            page: None,
            released: false,
        }
    }

    /// Creates a driver from the user agent, timeout and proxy settings of a config
    pub fn from_config(config: &Config) -> DriverResult<Self> {
        let client = build_http_client(
            &config.user_agent,
            config.crawler.request_timeout,
            config.proxy.as_ref(),
        )?;
        Ok(Self::new(client))
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    fn ensure_active(&self) -> DriverResult<()> {
        if self.released {
            Err(DriverError::Released)
        } else {
            Ok(())
        }
    }

    fn page(&self) -> DriverResult<&LoadedPage> {
        self.ensure_active()?;
        self.page.as_ref().ok_or(DriverError::NoPage)
    }
}

/// Classifies a transport error into a short message
fn describe_error(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        "Request timeout".to_string()
    } else if error.is_connect() {
        "Connection refused".to_string()
    } else if error.is_redirect() {
        "Too many redirects".to_string()
    } else {
        error.to_string()
    }
}

#[async_trait]
impl PageDriver for HttpDriver {
    async fn authenticate(&mut self, credentials: &LoginCredentials) -> DriverResult<()> {
        self.ensure_active()?;

        let response = self
            .client
            .get(credentials.login_url.clone())
            .send()
            .await
            .map_err(|e| DriverError::Authentication(describe_error(&e)))?;

        if !response.status().is_success() {
            return Err(DriverError::Authentication(format!(
                "login page answered with HTTP {}",
                response.status().as_u16()
            )));
        }

        let base_url = response.url().clone();
        let body = response.text().await?;

        let mut form = extract::find_login_form(
            &body,
            &base_url,
            &credentials.username_field,
            &credentials.password_field,
        )
        .ok_or_else(|| {
            DriverError::Authentication(format!(
                "no form with field '{}' on {}",
                credentials.username_field, base_url
            ))
        })?;

        form.set_field(&credentials.username_field, &credentials.username);
        form.set_field(&credentials.password_field, &credentials.password);

        let request = if form.method == "get" {
            self.client.get(form.action.clone()).query(&form.fields)
        } else {
            self.client.post(form.action.clone()).form(&form.fields)
        };

        let response = request
            .send()
            .await
            .map_err(|e| DriverError::Authentication(describe_error(&e)))?;

        if !response.status().is_success() {
            return Err(DriverError::Authentication(format!(
                "login form answered with HTTP {}",
                response.status().as_u16()
            )));
        }

        info!(
            "Logged in as {} via {}",
            credentials.username, credentials.login_url
        );
        Ok(())
    }

    async fn navigate(&mut self, url: &Url) -> DriverResult<()> {
        self.ensure_active()?;
        self.page = None;

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| DriverError::Navigation {
                url: url.to_string(),
                message: describe_error(&e),
            })?;

        let status = response.status();
        let final_url = response.url().clone();
        let body = response
            .text()
            .await
            .map_err(|e| DriverError::Navigation {
                url: url.to_string(),
                message: describe_error(&e),
            })?;

        if final_url != *url {
            debug!("{} redirected to {}", url, final_url);
        }

        // Error pages stay loaded so their markup can still be captured
        self.page = Some(LoadedPage {
            url: final_url,
            body,
        });

        if !status.is_success() {
            return Err(DriverError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(())
    }

    async fn dismiss_overlays(&mut self) -> DriverResult<()> {
        let page = self.page()?;
        let candidates = extract::count_overlay_candidates(&page.body);
        if candidates > 0 {
            debug!("{} overlay controls on {}", candidates, page.url);
        }
        Ok(())
    }

    async fn content(&mut self) -> DriverResult<String> {
        Ok(self.page()?.body.clone())
    }

    async fn resources(&mut self) -> DriverResult<Vec<String>> {
        let page = self.page()?;
        Ok(extract::extract_resources(&page.body, &page.url))
    }

    async fn links(&mut self) -> DriverResult<Vec<String>> {
        let page = self.page()?;
        Ok(extract::extract_links(&page.body, &page.url))
    }

    async fn interactive_elements(&mut self) -> DriverResult<Vec<InteractiveElement>> {
        Ok(extract::extract_interactive_elements(&self.page()?.body))
    }

    fn current_url(&self) -> Option<Url> {
        self.page.as_ref().map(|page| page.url.clone())
    }

    async fn release(&mut self) -> DriverResult<()> {
        if !self.released {
            debug!("Releasing HTTP page driver");
        }
        self.page = None;
        self.released = true;
        Ok(())
    }
}
