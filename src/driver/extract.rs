//! HTML extraction helpers for the HTTP page driver
//!
//! This module handles parsing HTML content to extract:
//! - Links to follow (from <a> tags and canonical links)
//! - Resource URLs (images, scripts, stylesheets)
//! - Interactive elements (buttons, forms, modals)
//! - The login form submitted before a crawl
//!
//! `scraper::Html` is not `Send`, so every helper parses and drops the
//! document inside one synchronous call and returns owned data.

use super::{FormField, InteractiveElement};
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Selector for elements that close pop-ups and overlays
const OVERLAY_CLOSE_SELECTOR: &str =
    ".close, .dismiss, .modal-close, .popup-close, .btn-close, [aria-label='Close']";

/// Selector for modal-like containers
const MODAL_SELECTOR: &str = ".modal, [role='dialog'], dialog, .popup";

/// Extracts all followable links from an HTML document
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` tags
/// - `<link rel="canonical" href="...">`
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:` links
/// - Data URIs and fragment-only anchors
///
/// # Arguments
///
/// * `html` - The HTML content to parse
/// * `base_url` - The base URL for resolving relative links
///
/// # Returns
///
/// Absolute HTTP(S) URLs in document order, duplicates included
pub fn extract_links(html: &str, base_url: &Url) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut links = Vec::new();

    if let Ok(a_selector) = Selector::parse("a[href]") {
        for element in document.select(&a_selector) {
            if element.value().attr("download").is_some() {
                continue;
            }

            if let Some(href) = element.value().attr("href") {
                if let Some(absolute_url) = resolve_link(href, base_url) {
                    links.push(absolute_url);
                }
            }
        }
    }

    if let Ok(canonical_selector) = Selector::parse("link[rel='canonical'][href]") {
        for element in document.select(&canonical_selector) {
            if let Some(href) = element.value().attr("href") {
                if let Some(absolute_url) = resolve_link(href, base_url) {
                    links.push(absolute_url);
                }
            }
        }
    }

    links
}

/// Extracts the URLs of images, scripts and stylesheets
///
/// Only `src` of `<img>`/`<script>` and `href` of `<link>` are considered. Results are absolute and de-duplicated, first occurrence wins.
pub fn extract_resources(html: &str, base_url: &Url) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut resources: Vec<String> = Vec::new();

    let sources = [
        ("img[src]", "src"),
        ("script[src]", "src"),
        ("link[href]", "href"),
    ];

    for (selector, attr) in sources {
        let Ok(selector) = Selector::parse(selector) else {
            continue;
        };
        for element in document.select(&selector) {
            if let Some(value) = element.value().attr(attr) {
                if let Some(absolute) = resolve_link(value, base_url) {
                    if !resources.contains(&absolute) {
                        resources.push(absolute);
                    }
                }
            }
        }
    }

    resources
}

/// Extracts buttons, forms and modals
pub fn extract_interactive_elements(html: &str) -> Vec<InteractiveElement> {
    let document = Html::parse_document(html);
    let mut elements = Vec::new();

    if let Ok(selector) =
        Selector::parse("button, input[type='button'], input[type='submit'], a.btn, a.button")
    {
        for element in document.select(&selector) {
            let mut text = element_text(&element);
            if text.is_empty() {
                text = attr(&element, "value").unwrap_or_default();
            }

            elements.push(InteractiveElement::Button {
                text,
                id: attr(&element, "id"),
                class: attr(&element, "class"),
                href: attr(&element, "href"),
            });
        }
    }

    if let (Ok(form_selector), Ok(field_selector)) = (
        Selector::parse("form"),
        Selector::parse("input, select, textarea"),
    ) {
        for form in document.select(&form_selector) {
            let fields = form
                .select(&field_selector)
                .map(|field| FormField {
                    kind: attr(&field, "type").unwrap_or_else(|| field.value().name().to_string()),
                    name: attr(&field, "name"),
                    id: attr(&field, "id"),
                    class: attr(&field, "class"),
                })
                .collect();

            elements.push(InteractiveElement::Form {
                id: attr(&form, "id"),
                class: attr(&form, "class"),
                action: attr(&form, "action"),
                method: attr(&form, "method")
                    .map(|m| m.to_lowercase())
                    .unwrap_or_else(|| "get".to_string()),
                fields,
            });
        }
    }

    if let Ok(selector) = Selector::parse(MODAL_SELECTOR) {
        for element in document.select(&selector) {
            elements.push(InteractiveElement::Modal {
                id: attr(&element, "id"),
                class: attr(&element, "class"),
                content: element.inner_html(),
            });
        }
    }

    elements
}

/// Counts the overlay close controls present in a document
pub fn count_overlay_candidates(html: &str) -> usize {
    let document = Html::parse_document(html);
    Selector::parse(OVERLAY_CLOSE_SELECTOR)
        .map(|selector| document.select(&selector).count())
        .unwrap_or(0)
}

/// A login form ready to be submitted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginForm {
    /// Absolute submission URL
    pub action: Url,

    /// Lowercase HTTP method (`get` or `post`)
    pub method: String,

    /// Pre-filled name/value pairs (hidden inputs, default values)
    pub fields: Vec<(String, String)>,
}

impl LoginForm {
    /// Sets a field value, appending the field when the form lacks it
    pub fn set_field(&mut self, name: &str, value: &str) {
        match self.fields.iter_mut().find(|(n, _)| n == name) {
            Some((_, v)) => *v = value.to_string(),
            None => self.fields.push((name.to_string(), value.to_string())),
        }
    }
}

/// Finds the form carrying the login fields
///
/// The first form containing an input named `username_field` wins; otherwise
/// the first form with a password input is used.
pub fn find_login_form(
    html: &str,
    base_url: &Url,
    username_field: &str,
    password_field: &str,
) -> Option<LoginForm> {
    let document = Html::parse_document(html);
    let form_selector = Selector::parse("form").ok()?;
    let username_selector = Selector::parse(&format!("[name='{}']", username_field)).ok()?;
    let password_selector = Selector::parse(&format!(
        "[name='{}'], input[type='password']",
        password_field
    ))
    .ok()?;

    let form = document
        .select(&form_selector)
        .find(|form| form.select(&username_selector).next().is_some())
        .or_else(|| {
            document
                .select(&form_selector)
                .find(|form| form.select(&password_selector).next().is_some())
        })?;

    let action = match form.value().attr("action").map(str::trim) {
        Some(action) if !action.is_empty() => base_url.join(action).ok()?,
        _ => base_url.clone(),
    };

    let method = attr(&form, "method")
        .map(|m| m.to_lowercase())
        .unwrap_or_else(|| "post".to_string());

    let input_selector = Selector::parse("input[name]").ok()?;
    let fields = form
        .select(&input_selector)
        .filter_map(|input| {
            let kind = input.value().attr("type").unwrap_or("text").to_lowercase();
            let skip = matches!(kind.as_str(), "submit" | "button" | "image" | "reset")
                || (matches!(kind.as_str(), "checkbox" | "radio")
                    && input.value().attr("checked").is_none());
            if skip {
                return None;
            }
            let name = input.value().attr("name")?.to_string();
            let value = input.value().attr("value").unwrap_or_default().to_string();
            Some((name, value))
        })
        .collect();

    Some(LoginForm {
        action,
        method,
        fields,
    })
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if lower.starts_with("javascript:")
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:")
        || lower.starts_with("data:")
    {
        return None;
    }

    let absolute_url = base_url.join(href).ok()?;
    if absolute_url.scheme() == "http" || absolute_url.scheme() == "https" {
        Some(absolute_url.to_string())
    } else {
        None
    }
}

fn attr(element: &ElementRef<'_>, name: &str) -> Option<String> {
    element
        .value()
        .attr(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn element_text(element: &ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
