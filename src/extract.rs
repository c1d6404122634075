//! Extraction of typed link candidates from HTML.
//!
//! Uses the `html5gum` tokenizer with a custom [`Emitter`] that buffers each
//! element's attributes and classifies the element as a whole once it is
//! emitted. Classification decides the [`LinkKind`] and whether the
//! candidate is subject to the `check_images` / `check_css_js` options.

use std::collections::HashSet;

use html5gum::{Emitter, Error, Tokenizer};
use url::Url;

use crate::types::{JobOptions, LinkCandidate, LinkKind};

/// Schemes that are never link candidates
const SKIPPED_SCHEMES: &[&str] = &["javascript:", "mailto:", "tel:", "data:"];

struct HtmlLinkEmitter {
    base: Url,
    options: JobOptions,
    candidates: Vec<LinkCandidate>,
    seen: HashSet<(String, LinkKind)>,
    current_element_name: Vec<u8>,
    current_element_is_end_tag: bool,
    current_attribute_name: Vec<u8>,
    current_attribute_value: Vec<u8>,
    attributes: Vec<(String, String)>,
    last_start_element: Vec<u8>,
    // Innermost enclosing <video>/<audio>/<picture>, for classifying <source>
    media_stack: Vec<MediaContext>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum MediaContext {
    Video,
    Audio,
    Picture,
}

impl HtmlLinkEmitter {
    fn new(base: &Url, options: JobOptions) -> Self {
        HtmlLinkEmitter {
            base: base.clone(),
            options,
            candidates: Vec::new(),
            seen: HashSet::new(),
            current_element_name: Vec::new(),
            current_element_is_end_tag: false,
            current_attribute_name: Vec::new(),
            current_attribute_value: Vec::new(),
            attributes: Vec::new(),
            last_start_element: Vec::new(),
            media_stack: Vec::new(),
        }
    }

    fn flush_old_attribute(&mut self) {
        if !self.current_attribute_name.is_empty() {
            let name = String::from_utf8_lossy(&self.current_attribute_name).into_owned();
            let value = String::from_utf8_lossy(&self.current_attribute_value).into_owned();
            self.attributes.push((name, value));
        }
        self.current_attribute_name.clear();
        self.current_attribute_value.clear();
    }

    fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Resolve a raw reference against the base and record it, deduplicating
    /// by `(url, kind)`. Unresolvable references are dropped silently.
    fn push(&mut self, raw: &str, kind: LinkKind) {
        let raw = raw.trim();
        if raw.is_empty() || is_skipped_scheme(raw) {
            return;
        }
        // Pure fragment references point back at the page itself
        if kind == LinkKind::Hyperlink && raw.starts_with('#') {
            return;
        }
        let Ok(mut url) = self.base.join(raw) else {
            return;
        };
        if kind == LinkKind::Hyperlink {
            url.set_fragment(None);
        }
        let key = (url.to_string(), kind);
        if self.seen.insert(key) {
            self.candidates.push(LinkCandidate {
                url,
                kind,
                source_page: self.base.to_string(),
            });
        }
    }

    /// Classify the buffered element and record its candidates.
    fn classify_current_element(&mut self) {
        let name = String::from_utf8_lossy(&self.current_element_name).into_owned();

        if self.current_element_is_end_tag {
            match name.as_str() {
                "video" | "audio" | "picture" => {
                    self.media_stack.pop();
                }
                _ => {}
            }
            return;
        }

        match name.as_str() {
            "a" => {
                if let Some(href) = self.attr("href").map(str::to_string) {
                    self.push(&href, LinkKind::Hyperlink);
                }
            }
            "link" => self.classify_link_element(),
            "iframe" => {
                if let Some(src) = self.attr("src").map(str::to_string) {
                    self.push(&src, LinkKind::Iframe);
                }
            }
            "script" => {
                if self.options.check_css_js {
                    if let Some(src) = self.attr("src").map(str::to_string) {
                        self.push(&src, LinkKind::Script);
                    }
                }
            }
            "img" => {
                if self.options.check_images {
                    if let Some(src) = self.attr("src").map(str::to_string) {
                        self.push(&src, LinkKind::Image);
                    }
                    if let Some(srcset) = self.attr("srcset").map(str::to_string) {
                        for url in srcset_urls(&srcset) {
                            self.push(&url, LinkKind::ImageSrcset);
                        }
                    }
                }
            }
            "video" | "audio" => {
                let context = if name == "video" {
                    MediaContext::Video
                } else {
                    MediaContext::Audio
                };
                self.media_stack.push(context);
                if self.options.check_images {
                    let kind = if context == MediaContext::Video {
                        LinkKind::Video
                    } else {
                        LinkKind::Audio
                    };
                    if let Some(src) = self.attr("src").map(str::to_string) {
                        self.push(&src, kind);
                    }
                }
            }
            "picture" => self.media_stack.push(MediaContext::Picture),
            "source" => {
                if self.options.check_images {
                    self.classify_source_element();
                }
            }
            _ => {}
        }
    }

    /// `<link>` is classified by its (space-separated) `rel` tokens.
    fn classify_link_element(&mut self) {
        let Some(href) = self.attr("href").map(str::to_string) else {
            return;
        };
        let rel = self.attr("rel").unwrap_or_default().to_ascii_lowercase();
        let rel: HashSet<&str> = rel.split_ascii_whitespace().collect();
        let mime = self
            .attr("type")
            .unwrap_or_default()
            .to_ascii_lowercase();

        let kind = if rel.contains("icon")
            || rel.contains("shortcut")
            || rel.contains("apple-touch-icon")
            || rel.contains("mask-icon")
        {
            Some(LinkKind::Favicon)
        } else if rel.contains("canonical") {
            Some(LinkKind::Canonical)
        } else if rel.contains("alternate") && (mime.contains("rss") || mime.contains("atom")) {
            Some(LinkKind::Feed)
        } else if rel.contains("manifest") {
            Some(LinkKind::Manifest)
        } else if !self.options.check_css_js {
            None
        } else if rel.contains("stylesheet") {
            Some(LinkKind::Stylesheet)
        } else if rel.contains("preload") {
            Some(LinkKind::Preload)
        } else if rel.contains("prefetch") {
            Some(LinkKind::Prefetch)
        } else if rel.contains("dns-prefetch") {
            Some(LinkKind::DnsPrefetch)
        } else if rel.contains("preconnect") {
            Some(LinkKind::Preconnect)
        } else {
            None
        };

        if let Some(kind) = kind {
            self.push(&href, kind);
        }
    }

    /// `<source>` inherits its kind from the enclosing media element.
    fn classify_source_element(&mut self) {
        match self.media_stack.last() {
            Some(MediaContext::Picture) => {
                if let Some(srcset) = self.attr("srcset").map(str::to_string) {
                    for url in srcset_urls(&srcset) {
                        self.push(&url, LinkKind::ImageSrcset);
                    }
                }
            }
            Some(MediaContext::Video) => {
                if let Some(src) = self.attr("src").map(str::to_string) {
                    self.push(&src, LinkKind::Video);
                }
            }
            Some(MediaContext::Audio) => {
                if let Some(src) = self.attr("src").map(str::to_string) {
                    self.push(&src, LinkKind::Audio);
                }
            }
            None => {}
        }
    }
}

fn is_skipped_scheme(raw: &str) -> bool {
    let lower = raw.trim_start().to_ascii_lowercase();
    SKIPPED_SCHEMES.iter().any(|s| lower.starts_with(s))
}

/// The first URL of each image candidate string in a `srcset` value
fn srcset_urls(srcset: &str) -> Vec<String> {
    let mut urls = Vec::new();
    for image_candidate_string in srcset.trim().split(',') {
        if let Some(url) = image_candidate_string.split_ascii_whitespace().next() {
            urls.push(url.to_string());
        }
    }
    urls
}

impl Emitter for &mut HtmlLinkEmitter {
    type Token = ();

    fn set_last_start_tag(&mut self, last_start_tag: Option<&[u8]>) {
        self.last_start_element.clear();
        self.last_start_element
            .extend(last_start_tag.unwrap_or_default());
    }

    fn emit_eof(&mut self) {}
    fn emit_error(&mut self, _: Error) {}
    fn pop_token(&mut self) -> Option<()> {
        None
    }

    fn emit_string(&mut self, _: &[u8]) {}

    fn init_start_tag(&mut self) {
        self.current_element_name.clear();
        self.current_element_is_end_tag = false;
        self.attributes.clear();
    }

    fn init_end_tag(&mut self) {
        self.current_element_name.clear();
        self.current_element_is_end_tag = true;
        self.attributes.clear();
    }

    fn init_comment(&mut self) {}

    fn emit_current_tag(&mut self) {
        self.flush_old_attribute();
        self.classify_current_element();
    }

    fn emit_current_doctype(&mut self) {}
    fn set_self_closing(&mut self) {}
    fn set_force_quirks(&mut self) {}

    fn push_tag_name(&mut self, s: &[u8]) {
        self.current_element_name.extend(s);
    }

    fn push_comment(&mut self, _: &[u8]) {}
    fn push_doctype_name(&mut self, _: &[u8]) {}
    fn init_doctype(&mut self) {}

    fn init_attribute(&mut self) {
        self.flush_old_attribute();
    }

    fn push_attribute_name(&mut self, s: &[u8]) {
        self.current_attribute_name.extend(s);
    }

    fn push_attribute_value(&mut self, s: &[u8]) {
        self.current_attribute_value.extend(s);
    }

    fn set_doctype_public_identifier(&mut self, _: &[u8]) {}
    fn set_doctype_system_identifier(&mut self, _: &[u8]) {}
    fn push_doctype_public_identifier(&mut self, _: &[u8]) {}
    fn push_doctype_system_identifier(&mut self, _: &[u8]) {}

    fn current_is_appropriate_end_tag_token(&mut self) -> bool {
        self.current_element_is_end_tag
            && !self.current_element_name.is_empty()
            && self.current_element_name == self.last_start_element
    }

    fn emit_current_comment(&mut self) {}
}

/// Extract all link candidates from an HTML document.
///
/// Relative references are resolved against `base`; references that cannot
/// be resolved are dropped without aborting extraction. The result is
/// deduplicated by `(url, kind)` and ordered by first occurrence, so the
/// same input always yields the same candidate set.
#[must_use]
pub fn extract_links(html: &str, base: &Url, options: &JobOptions) -> Vec<LinkCandidate> {
    let mut emitter = HtmlLinkEmitter::new(base, *options);
    let mut tokenizer = Tokenizer::new_with_emitter(html, &mut emitter).infallible();
    assert!(tokenizer.next().is_none());
    emitter.candidates
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn base() -> Url {
        Url::parse("https://example.org/blog/").unwrap()
    }

    fn extract(html: &str, options: &JobOptions) -> Vec<(String, LinkKind)> {
        extract_links(html, &base(), options)
            .into_iter()
            .map(|c| (c.url.to_string(), c.kind))
            .collect()
    }

    #[test]
    fn test_hyperlinks_resolved_and_fragment_stripped() {
        let html = r##"
            <a href="post#comments">relative</a>
            <a href="/about">rooted</a>
            <a href="https://other.example.com/page#top">absolute</a>
            <a href="#section">anchor only</a>
        "##;
        let got = extract(html, &JobOptions::default());
        assert_eq!(
            got,
            vec![
                ("https://example.org/blog/post".to_string(), LinkKind::Hyperlink),
                ("https://example.org/about".to_string(), LinkKind::Hyperlink),
                ("https://other.example.com/page".to_string(), LinkKind::Hyperlink),
            ]
        );
    }

    #[test]
    fn test_skips_pseudo_schemes() {
        let html = r#"
            <a href="javascript:void(0)">js</a>
            <a href="mailto:someone@example.org">mail</a>
            <a href="tel:+15551234567">phone</a>
            <iframe src="javascript:alert(1)"></iframe>
            <iframe src="data:text/html,hello"></iframe>
            <a href="/real">real</a>
        "#;
        let got = extract(html, &JobOptions::default());
        assert_eq!(
            got,
            vec![("https://example.org/real".to_string(), LinkKind::Hyperlink)]
        );
    }

    #[test]
    fn test_head_links_always_extracted() {
        let html = r#"
            <link rel="icon" href="/favicon.ico">
            <link rel="shortcut icon" href="/favicon.png">
            <link rel="canonical" href="https://example.org/blog/post">
            <link rel="alternate" type="application/rss+xml" href="/feed.xml">
            <link rel="alternate" type="application/atom+xml" href="/atom.xml">
            <link rel="alternate" hreflang="de" href="/de/">
            <link rel="manifest" href="/site.webmanifest">
            <iframe src="https://player.example.com/embed/1"></iframe>
        "#;
        let got = extract(html, &JobOptions::default());
        assert_eq!(
            got,
            vec![
                ("https://example.org/favicon.ico".to_string(), LinkKind::Favicon),
                ("https://example.org/favicon.png".to_string(), LinkKind::Favicon),
                ("https://example.org/blog/post".to_string(), LinkKind::Canonical),
                ("https://example.org/feed.xml".to_string(), LinkKind::Feed),
                ("https://example.org/atom.xml".to_string(), LinkKind::Feed),
                ("https://example.org/site.webmanifest".to_string(), LinkKind::Manifest),
                (
                    "https://player.example.com/embed/1".to_string(),
                    LinkKind::Iframe
                ),
            ]
        );
    }

    #[test]
    fn test_images_only_with_option() {
        let html = r#"
            <img src="/hero.jpg" srcset="/hero-480.jpg 480w, /hero-800.jpg 800w">
            <video src="/clip.mp4"></video>
            <audio><source src="/episode.mp3" type="audio/mpeg"></audio>
            <picture><source srcset="/art.avif 1x"><img src="/art.jpg"></picture>
        "#;
        assert_eq!(extract(html, &JobOptions::default()), vec![]);

        let options = JobOptions {
            check_images: true,
            ..JobOptions::default()
        };
        let got = extract(html, &options);
        assert_eq!(
            got,
            vec![
                ("https://example.org/hero.jpg".to_string(), LinkKind::Image),
                ("https://example.org/hero-480.jpg".to_string(), LinkKind::ImageSrcset),
                ("https://example.org/hero-800.jpg".to_string(), LinkKind::ImageSrcset),
                ("https://example.org/clip.mp4".to_string(), LinkKind::Video),
                ("https://example.org/episode.mp3".to_string(), LinkKind::Audio),
                ("https://example.org/art.avif".to_string(), LinkKind::ImageSrcset),
                ("https://example.org/art.jpg".to_string(), LinkKind::Image),
            ]
        );
    }

    #[test]
    fn test_css_js_only_with_option() {
        let html = r#"
            <link rel="stylesheet" href="/main.css">
            <script src="/app.js"></script>
            <link rel="preload" href="/font.woff2" as="font">
            <link rel="prefetch" href="/next.html">
            <link rel="dns-prefetch" href="//cdn.example.com">
            <link rel="preconnect" href="https://api.example.com">
        "#;
        assert_eq!(extract(html, &JobOptions::default()), vec![]);

        let options = JobOptions {
            check_css_js: true,
            ..JobOptions::default()
        };
        let got = extract(html, &options);
        assert_eq!(
            got,
            vec![
                ("https://example.org/main.css".to_string(), LinkKind::Stylesheet),
                ("https://example.org/app.js".to_string(), LinkKind::Script),
                ("https://example.org/font.woff2".to_string(), LinkKind::Preload),
                ("https://example.org/next.html".to_string(), LinkKind::Prefetch),
                ("https://cdn.example.com/".to_string(), LinkKind::DnsPrefetch),
                ("https://api.example.com/".to_string(), LinkKind::Preconnect),
            ]
        );
    }

    #[test]
    fn test_deduplicates_by_url_and_kind() {
        let html = r#"
            <a href="/page">one</a>
            <a href="/page#a">two</a>
            <a href="/page#b">three</a>
            <link rel="canonical" href="/page">
        "#;
        let got = extract(html, &JobOptions::default());
        assert_eq!(
            got,
            vec![
                ("https://example.org/page".to_string(), LinkKind::Hyperlink),
                ("https://example.org/page".to_string(), LinkKind::Canonical),
            ]
        );
    }

    #[test]
    fn test_unresolvable_reference_is_dropped() {
        let html = r#"
            <a href="https://exa mple.com/broken">bad host</a>
            <a href="/fine">fine</a>
        "#;
        let got = extract(html, &JobOptions::default());
        assert_eq!(
            got,
            vec![("https://example.org/fine".to_string(), LinkKind::Hyperlink)]
        );
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let html = r#"
            <a href="/a">a</a><a href="/b">b</a>
            <link rel="icon" href="/favicon.ico">
            <img src="/pic.png">
        "#;
        let options = JobOptions {
            check_images: true,
            check_css_js: true,
            external_only: false,
        };
        let first = extract(html, &options);
        let second = extract(html, &options);
        assert_eq!(first, second);
    }

    #[test]
    fn test_source_outside_media_element_is_ignored() {
        let html = r#"<source src="/stray.mp4">"#;
        let options = JobOptions {
            check_images: true,
            ..JobOptions::default()
        };
        assert_eq!(extract(html, &options), vec![]);
    }
}
