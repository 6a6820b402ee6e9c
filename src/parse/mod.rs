//! The parse/tokenize collaborator (§4.5 PRE-FILTER/EXTRACT stages, §6).
//!
//! Two document shapes are handled: ordinary HTML (links + visible text via
//! [`scraper`]) and XML sitemaps (child URLs only, via the [`sitemap`]
//! crate's streaming reader). Neither path panics on malformed input --
//! unparseable documents yield an empty [`ParsedResponse`] rather than
//! propagating an error, matching the worker pipeline's "never panics"
//! contract for this stage.

use sitemap::reader::{SiteMapEntity, SiteMapReader};
use sitemap::structs::Location;
use scraper::{Html, Selector};
use std::str::FromStr;
use url::Url;

/// What the PRE-FILTER/EXTRACT stages need out of a fetched document.
#[derive(Debug, Default, Clone)]
pub struct ParsedResponse {
    /// Absolute URLs discovered in the document, in document order.
    pub links: Vec<String>,
    /// Visible text content, whitespace-joined, scripts/styles excluded.
    pub text_content: String,
    /// True if this document was parsed as an XML sitemap rather than HTML.
    pub is_sitemap: bool,
}

/// True if `content_type` or the body's leading bytes look like XML.
fn looks_like_sitemap(content_type: Option<&str>, body: &[u8]) -> bool {
    if let Some(ct) = content_type {
        if let Ok(mime) = mime::Mime::from_str(ct) {
            if mime.subtype() == mime::XML || mime.suffix() == Some(mime::XML) {
                return true;
            }
        }
    }
    let head = &body[..body.len().min(256)];
    let head = String::from_utf8_lossy(head);
    head.trim_start().starts_with("<?xml") || head.contains("<urlset") || head.contains("<sitemapindex")
}

/// Parses a fetched document relative to `base_url`.
pub fn parse(content_type: Option<&str>, base_url: &Url, body: &[u8]) -> ParsedResponse {
    if looks_like_sitemap(content_type, body) {
        parse_sitemap(body)
    } else {
        parse_html(base_url, body)
    }
}

fn parse_sitemap(body: &[u8]) -> ParsedResponse {
    let mut links = Vec::new();
    let reader = SiteMapReader::new(body);
    for entity in reader {
        match entity {
            SiteMapEntity::Url(entry) => {
                if let Location::Url(url) = entry.loc {
                    links.push(url.to_string());
                }
            }
            SiteMapEntity::SiteMap(entry) => {
                if let Location::Url(url) = entry.loc {
                    links.push(url.to_string());
                }
            }
            SiteMapEntity::Err(err) => {
                log::debug!("parse: sitemap entry error: {err}");
            }
        }
    }
    ParsedResponse { links, text_content: String::new(), is_sitemap: true }
}

fn parse_html(base_url: &Url, body: &[u8]) -> ParsedResponse {
    let text = String::from_utf8_lossy(body);
    let document = Html::parse_document(&text);

    let link_selector = Selector::parse("a[href]").expect("static selector is valid");
    let mut links = Vec::new();
    for element in document.select(&link_selector) {
        if let Some(href) = element.value().attr("href") {
            if let Ok(resolved) = base_url.join(href) {
                links.push(resolved.to_string());
            }
        }
    }

    let skip_selector = Selector::parse("script, style, noscript").expect("static selector is valid");
    let skip_texts: std::collections::HashSet<_> = document
        .select(&skip_selector)
        .flat_map(|el| el.text())
        .collect();

    let body_selector = Selector::parse("body").ok();
    let root = body_selector
        .as_ref()
        .and_then(|sel| document.select(sel).next())
        .unwrap_or_else(|| document.root_element());

    let text_content: String = root
        .text()
        .filter(|t| !skip_texts.contains(t))
        .collect::<Vec<_>>()
        .join(" ");

    ParsedResponse { links, text_content, is_sitemap: false }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn extracts_absolute_and_relative_links() {
        let html = br#"<html><body><a href="/a">A</a><a href="https://b.edu/c">B</a></body></html>"#;
        let base = Url::parse("https://a.edu/x/").unwrap();
        let parsed = parse(Some("text/html"), &base, html);
        assert!(parsed.links.contains(&"https://a.edu/a".to_string()));
        assert!(parsed.links.contains(&"https://b.edu/c".to_string()));
        assert!(!parsed.is_sitemap);
    }

    #[test]
    fn excludes_script_and_style_text() {
        let html = br#"<html><body><p>hello</p><script>var x = 1;</script></body></html>"#;
        let base = Url::parse("https://a.edu/").unwrap();
        let parsed = parse(Some("text/html"), &base, html);
        assert!(parsed.text_content.contains("hello"));
        assert!(!parsed.text_content.contains("var x"));
    }

    #[test]
    fn detects_and_parses_a_sitemap() {
        let xml = br#"<?xml version="1.0"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url><loc>https://a.edu/page1</loc></url>
  <url><loc>https://a.edu/page2</loc></url>
</urlset>"#;
        let base = Url::parse("https://a.edu/").unwrap();
        let parsed = parse(Some("application/xml"), &base, xml);
        assert!(parsed.is_sitemap);
        assert_eq!(parsed.links.len(), 2);
    }

    #[test]
    fn malformed_html_never_panics() {
        let html = b"<html><body><a href=";
        let base = Url::parse("https://a.edu/").unwrap();
        let parsed = parse(Some("text/html"), &base, html);
        assert!(!parsed.is_sitemap);
    }
}
