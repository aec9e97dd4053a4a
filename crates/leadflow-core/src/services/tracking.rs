//! Open/click tracking for outbound HTML email
//!
//! Matching is tag-local regex work, not an HTML parse: malformed or
//! unterminated tags are left exactly as they are.

use crate::config::TrackingConfig;
use crate::constants::{TRACK_CLICK_PATH, TRACK_OPEN_PATH};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::HashSet;

/// `<a ... href="...">` with either quote style. Neither the attribute run
/// nor the URL may contain `<` or `>`, so a missing closing quote cannot
/// swallow the next tag. `href` must follow whitespace so `data-href` and
/// similar attributes are not taken for the destination.
static ANCHOR_HREF_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)(<a\b[^<>]*?\shref\s*=\s*)(?:"([^"<>]*)"|'([^'<>]*)')"#)
        .expect("Failed to compile anchor regex")
});

static BODY_CLOSE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)</body\s*>").expect("Failed to compile body regex"));

/// Result of preparing an email body for dispatch
#[derive(Debug, Clone)]
pub struct InstrumentedEmail {
    pub html: String,
    /// Distinct destinations found before rewriting, in document order
    pub links: Vec<String>,
    pub pixel_url: String,
}

/// Builds tracking URLs against the configured public origin
pub struct EmailTracker {
    base_url: String,
}

impl EmailTracker {
    pub fn new(config: TrackingConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Wrap a destination in the click redirect; already-wrapped URLs are returned unchanged
    pub fn build_tracking_url(&self, original_url: &str, sent_email_id: i64, lead_id: Option<i64>) -> String {
        if is_tracking_url(original_url) {
            return original_url.to_string();
        }

        let encoded: String = url::form_urlencoded::byte_serialize(original_url.as_bytes()).collect();
        let mut tracking_url = format!(
            "{}{}?url={}&eid={}",
            self.base_url, TRACK_CLICK_PATH, encoded, sent_email_id
        );
        if let Some(lid) = lead_id {
            tracking_url.push_str(&format!("&lid={}", lid));
        }
        tracking_url
    }

    /// Replace every eligible anchor href with its tracking URL
    ///
    /// Everything outside the href value, including the quote character and
    /// the other attributes, is copied verbatim.
    pub fn rewrite_links(&self, html: &str, sent_email_id: i64, lead_id: Option<i64>) -> String {
        ANCHOR_HREF_REGEX
            .replace_all(html, |caps: &Captures| {
                let prefix = &caps[1];
                let (quote, href) = match (caps.get(2), caps.get(3)) {
                    (Some(m), _) => ('"', m.as_str()),
                    (None, Some(m)) => ('\'', m.as_str()),
                    (None, None) => return caps[0].to_string(),
                };

                if !is_trackable(href) || is_tracking_url(href) {
                    return caps[0].to_string();
                }

                let destination = href.trim().replace("&amp;", "&");
                let tracked = self.build_tracking_url(&destination, sent_email_id, lead_id);
                format!("{}{}{}{}", prefix, quote, tracked, quote)
            })
            .into_owned()
    }

    pub fn build_open_pixel_url(&self, sent_email_id: i64, lead_id: Option<i64>) -> String {
        build_open_pixel_url(&self.base_url, sent_email_id, lead_id)
    }

    /// Audit links, rewrite them and embed the open pixel
    pub fn instrument(&self, html: &str, sent_email_id: i64, lead_id: Option<i64>) -> InstrumentedEmail {
        let links: Vec<String> = extract_links(html).collect();
        let rewritten = self.rewrite_links(html, sent_email_id, lead_id);
        let pixel_url = self.build_open_pixel_url(sent_email_id, lead_id);
        let html = embed_open_pixel(&rewritten, &pixel_url);

        log::debug!(
            "Instrumented email {}: {} distinct links, pixel {}",
            sent_email_id,
            links.len(),
            pixel_url
        );

        InstrumentedEmail { html, links, pixel_url }
    }
}

/// Distinct anchor hrefs in order of first appearance, without mailto:/tel:
pub fn extract_links(html: &str) -> impl Iterator<Item = String> + '_ {
    let mut seen = HashSet::new();
    ANCHOR_HREF_REGEX
        .captures_iter(html)
        .filter_map(|caps| caps.get(2).or_else(|| caps.get(3)).map(|m| m.as_str().to_string()))
        .filter(|href| !is_excluded_scheme(href))
        .filter(move |href| seen.insert(href.clone()))
}

/// `<base>/api/track/open?sentEmailId=<id>[&leadId=<id>]`
pub fn build_open_pixel_url(base_url: &str, sent_email_id: i64, lead_id: Option<i64>) -> String {
    let mut pixel_url = format!(
        "{}{}?sentEmailId={}",
        base_url.trim_end_matches('/'),
        TRACK_OPEN_PATH,
        sent_email_id
    );
    if let Some(lid) = lead_id {
        pixel_url.push_str(&format!("&leadId={}", lid));
    }
    pixel_url
}

/// Insert exactly one 1x1 pixel before the first `</body>`, or append it
pub fn embed_open_pixel(html: &str, pixel_url: &str) -> String {
    let pixel = format!(
        r#"<img src="{}" width="1" height="1" alt="" style="display:block;border:0;outline:none;">"#,
        pixel_url
    );

    match BODY_CLOSE_REGEX.find(html) {
        Some(m) => {
            let mut out = String::with_capacity(html.len() + pixel.len());
            out.push_str(&html[..m.start()]);
            out.push_str(&pixel);
            out.push_str(&html[m.start()..]);
            out
        }
        None => format!("{}{}", html, pixel),
    }
}

fn is_tracking_url(url: &str) -> bool {
    url.contains(TRACK_CLICK_PATH)
}

fn is_excluded_scheme(href: &str) -> bool {
    let lower = href.trim_start().to_ascii_lowercase();
    lower.starts_with("mailto:") || lower.starts_with("tel:")
}

fn is_trackable(href: &str) -> bool {
    let trimmed = href.trim();
    !trimmed.is_empty() && !trimmed.starts_with('#') && !is_excluded_scheme(trimmed)
}
