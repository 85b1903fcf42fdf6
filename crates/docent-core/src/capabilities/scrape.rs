//! Scrape capability - fetches a page and keeps only its paragraphs
//!
//! On HTTP 200 the page's `<p>` elements are extracted in document order and
//! re-wrapped in a minimal HTML document. Any other status produces a single
//! paragraph naming the status code. That is a normal output, not an error:
//! the run still needs something to continue with.

use super::{Capability, CapabilityResult};
use async_trait::async_trait;
use reqwest::header::{HeaderValue, ACCEPT, USER_AGENT};
use reqwest::StatusCode;
use serde_json::Value;

const SCRAPER_USER_AGENT: &str = "Docent-Scraper/0.1";

/// `scrape_website` capability
pub struct ScrapeCapability {
    http: reqwest::Client,
}

impl ScrapeCapability {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// Fetch `url` and convert it; transport failures are returned as `Err`.
    pub async fn scrape(&self, url: &str) -> Result<String, reqwest::Error> {
        let response = self
            .http
            .get(url)
            .header(USER_AGENT, HeaderValue::from_static(SCRAPER_USER_AGENT))
            .header(
                ACCEPT,
                HeaderValue::from_static("text/html, application/xhtml+xml, */*;q=0.8"),
            )
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            tracing::debug!(url = %url, status = status.as_u16(), "Scrape got non-200 status");
            return Ok(failure_paragraph(url, status.as_u16()));
        }

        let body = response.text().await?;
        let paragraphs = extract_paragraphs(&body);
        tracing::debug!(url = %url, paragraphs = paragraphs.len(), "Scraped page");
        Ok(render_document(&paragraphs))
    }
}

#[async_trait]
impl Capability for ScrapeCapability {
    fn name(&self) -> &str {
        "scrape_website"
    }

    fn description(&self) -> &str {
        "Scrape the provided website based on the url and return its paragraphs as an HTML document"
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "url": {
                    "type": "string",
                    "description": "url of the website to scrape"
                }
            },
            "required": ["url"]
        })
    }

    async fn execute(&self, arguments: Value) -> CapabilityResult {
        let url = match arguments.get("url").and_then(|v| v.as_str()) {
            Some(u) => u,
            None => return CapabilityResult::tool_error("Argument 'url' must be a string"),
        };

        match url::Url::parse(url) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
            _ => {
                return CapabilityResult::tool_error(
                    "Invalid URL: must start with http:// or https://",
                )
            }
        }

        match self.scrape(url).await {
            Ok(document) => CapabilityResult::success(document),
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Scrape request failed");
                if e.is_timeout() {
                    CapabilityResult::failed(format!("request to {} timed out", url))
                } else {
                    CapabilityResult::failed(e.to_string())
                }
            }
        }
    }
}

fn failure_paragraph(url: &str, status: u16) -> String {
    format!(
        "<p>Failed to retrieve content from {}. Status code: {}</p>",
        escape_html(url),
        status
    )
}

/// Wrap paragraph texts in a minimal HTML document, one `<p>` per entry.
pub fn render_document(paragraphs: &[String]) -> String {
    let mut html = String::from(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"UTF-8\">\n<title>Scraped Content</title>\n</head>\n<body>\n",
    );
    for paragraph in paragraphs {
        html.push_str("<p>");
        html.push_str(&escape_html(paragraph));
        html.push_str("</p>\n");
    }
    html.push_str("</body>\n</html>\n");
    html
}

/// Text content of every `<p>` element, in document order.
///
/// Nested markup is dropped, entities are decoded, and script/style bodies are
/// ignored. A new `<p>` implicitly closes an open one, as HTML parsers do.
pub fn extract_paragraphs(html: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut current: Option<String> = None;
    let mut in_tag = false;
    let mut tag = String::new();
    let mut quote: Option<char> = None;
    let mut skip_content = false;
    let mut chars = html.chars().peekable();

    while let Some(ch) = chars.next() {
        if in_tag {
            // A '>' inside a quoted attribute value does not end the tag
            if let Some(open) = quote {
                if ch == open {
                    quote = None;
                }
                tag.push(ch);
                continue;
            }
            if matches!(ch, '"' | '\'') && !tag.starts_with('!') && tag.trim_end().ends_with('=') {
                quote = Some(ch);
                tag.push(ch);
                continue;
            }

            if ch == '>' && !(tag.starts_with("!--") && !tag.ends_with("--")) {
                in_tag = false;
                let lowered = tag.to_lowercase();
                let is_closing = lowered.starts_with('/');
                let body = lowered.trim_start_matches('/');
                let is_self_closing = body.ends_with('/');
                let name = body
                    .split(|c: char| c.is_whitespace() || c == '/')
                    .next()
                    .unwrap_or("");

                let is_raw_text = matches!(name, "script" | "style" | "noscript" | "template");
                if skip_content {
                    // Markup inside script/style bodies is not structure
                    if is_closing && is_raw_text {
                        skip_content = false;
                    }
                    continue;
                }

                match name {
                    _ if is_raw_text => {
                        skip_content = !is_closing;
                    }
                    "p" if is_closing => {
                        if let Some(text) = current.take() {
                            paragraphs.push(text);
                        }
                    }
                    "p" => {
                        if let Some(text) = current.take() {
                            paragraphs.push(text);
                        }
                        if is_self_closing {
                            paragraphs.push(String::new());
                        } else {
                            current = Some(String::new());
                        }
                    }
                    _ => {}
                }
            } else {
                tag.push(ch);
            }
            continue;
        }

        if ch == '<' && opens_tag(chars.peek().copied(), skip_content) {
            in_tag = true;
            tag.clear();
            continue;
        }

        if skip_content {
            continue;
        }

        if let Some(text) = current.as_mut() {
            if ch == '&' {
                let mut entity = String::from('&');
                while let Some(&next) = chars.peek() {
                    if next == '<' || next.is_whitespace() || entity.len() > 10 {
                        break;
                    }
                    entity.push(next);
                    chars.next();
                    if next == ';' {
                        break;
                    }
                }
                match decode_entity(&entity) {
                    Some(decoded) => text.push(decoded),
                    None => text.push_str(&entity),
                }
            } else {
                text.push(ch);
            }
        }
    }

    // Unterminated trailing paragraph
    if let Some(text) = current.take() {
        paragraphs.push(text);
    }

    paragraphs
}

/// Whether a '<' followed by `next` starts markup. Inside script/style bodies
/// only a closing tag does; elsewhere a bare '<' is text.
fn opens_tag(next: Option<char>, raw_text: bool) -> bool {
    match next {
        Some('/') => true,
        Some(c) if !raw_text => c.is_ascii_alphabetic() || c == '!',
        _ => false,
    }
}

fn decode_entity(entity: &str) -> Option<char> {
    let inner = entity.strip_prefix('&')?.strip_suffix(';')?;
    match inner {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        "mdash" => Some('\u{2014}'),
        "ndash" => Some('\u{2013}'),
        "copy" => Some('\u{a9}'),
        "reg" => Some('\u{ae}'),
        "hellip" => Some('\u{2026}'),
        _ => {
            let numeric = inner.strip_prefix('#')?;
            let code = match numeric.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => numeric.parse::<u32>().ok()?,
            };
            char::from_u32(code)
        }
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
