//! Heuristic detection of bot mitigation and client-side rendering.
//!
//! Everything in here is pure pattern matching over the fetched HTML
//! string. No I/O, no parsing beyond a tag-stripping scan, so the detector
//! is trivially unit-testable with literal fixtures.

use crate::types::ProtectionSignal;

/// Visible text shorter than this counts as an empty body
const MIN_VISIBLE_CHARS: usize = 100;

/// Script-density heuristic: at least this many script tags ...
const JS_HEAVY_SCRIPT_COUNT: usize = 6;

/// ... combined with fewer visible characters than this
const JS_HEAVY_MAX_VISIBLE: usize = 500;

/// SPA heuristic: a framework root marker plus fewer hyperlinks than this
const SPA_MAX_HYPERLINKS: usize = 3;

/// Markers of Cloudflare interstitial challenge pages
const CLOUDFLARE_MARKERS: &[&str] = &[
    "cf-browser-verification",
    "cf_chl_opt",
    "cdn-cgi/challenge-platform",
    "Just a moment...",
    "Checking your browser",
    "Attention Required!",
];

/// Markers of CAPTCHA widgets
const CAPTCHA_MARKERS: &[&str] = &[
    "g-recaptcha",
    "grecaptcha",
    "recaptcha/api.js",
    "h-captcha",
    "cf-turnstile",
];

/// Root-element signatures of client-side rendering frameworks
const SPA_MARKERS: &[&str] = &[
    "__NEXT_DATA__",
    "data-reactroot",
    "id=\"root\"",
    "id=\"app\"",
    "ng-app",
    "data-v-app",
];

/// Analyze fetched HTML for signs that it hides the page's true content.
///
/// Signals are independent and can co-occur; call
/// [`ProtectionSignal::detected`] to find out whether any fired.
#[must_use]
pub fn detect(html: &str) -> ProtectionSignal {
    let mut signal = ProtectionSignal::default();
    let lower = html.to_ascii_lowercase();

    let visible = visible_text_len(html);
    let script_tags = lower.matches("<script").count();
    let hyperlinks = lower.matches("<a ").count();

    if visible < MIN_VISIBLE_CHARS {
        signal.empty_body = true;
        signal
            .details
            .push(format!("Body has only {visible} visible characters"));
    }

    for marker in CLOUDFLARE_MARKERS {
        if html.contains(marker) {
            signal.cloudflare = true;
            signal
                .details
                .push(format!("Cloudflare challenge marker: {marker}"));
        }
    }

    for marker in CAPTCHA_MARKERS {
        if html.contains(marker) {
            signal.recaptcha = true;
            signal.details.push(format!("CAPTCHA marker: {marker}"));
        }
    }

    if script_tags >= JS_HEAVY_SCRIPT_COUNT && visible < JS_HEAVY_MAX_VISIBLE {
        signal.js_required = true;
        signal.details.push(format!(
            "{script_tags} script tags but only {visible} visible characters"
        ));
    } else if hyperlinks < SPA_MAX_HYPERLINKS {
        if let Some(marker) = SPA_MARKERS.iter().find(|m| html.contains(*m)) {
            signal.js_required = true;
            signal.details.push(format!(
                "SPA framework signature `{marker}` with {hyperlinks} hyperlinks"
            ));
        }
    }

    signal
}

/// Count the non-whitespace bytes a text-mode browser would show: strips
/// `<script>`/`<style>` elements including their contents, then all tags.
fn visible_text_len(html: &str) -> usize {
    let lower = html.to_ascii_lowercase();
    let bytes = lower.as_bytes();
    let mut visible = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'<' {
            let rest = &lower[i..];
            if rest.starts_with("<script") {
                match rest.find("</script") {
                    Some(off) => i += off,
                    None => break,
                }
            } else if rest.starts_with("<style") {
                match rest.find("</style") {
                    Some(off) => i += off,
                    None => break,
                }
            }
            // Skip to the end of the current tag
            match lower[i..].find('>') {
                Some(off) => i += off + 1,
                None => break,
            }
        } else {
            if !bytes[i].is_ascii_whitespace() {
                visible += 1;
            }
            i += 1;
        }
    }

    visible
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLEAN_PAGE: &str = r#"
<html><body>
<h1>A perfectly ordinary page</h1>
<p>This page has plenty of readable content. It goes on and on about
nothing in particular, but it does so at sufficient length that no
heuristic should mistake it for an empty or script-rendered shell.
There is even a <a href="/about">link</a> or <a href="/contact">two</a>
and a third one <a href="/blog">here</a>.</p>
</body></html>"#;

    #[test]
    fn test_clean_page_fires_nothing() {
        let signal = detect(CLEAN_PAGE);
        assert!(!signal.detected());
        assert!(signal.details.is_empty());
    }

    #[test]
    fn test_cloudflare_interstitial() {
        let html = r#"<html><head><title>Just a moment...</title></head>
<body><div id="cf-browser-verification">Checking your browser before accessing example.org.
Please stand by while we verify that you are a real visitor and not part of an automated
scraping operation. This process is automatic and should only take a few seconds.</div></body></html>"#;
        let signal = detect(html);
        assert!(signal.cloudflare);
        assert!(signal.detected());
        assert!(signal.details.iter().any(|d| d.contains("cf-browser-verification")));
    }

    #[test]
    fn test_recaptcha_widget() {
        let html = format!(
            "<html><body><p>{}</p><div class=\"g-recaptcha\" data-sitekey=\"xyz\"></div></body></html>",
            "Please confirm you are human before continuing to the requested page. ".repeat(5)
        );
        let signal = detect(&html);
        assert!(signal.recaptcha);
        assert!(!signal.cloudflare);
    }

    #[test]
    fn test_script_density_means_js_required() {
        // 6+ script tags and fewer than 500 visible characters
        let html = format!(
            "<html><body><div>{}</div>{}</body></html>",
            "Loading... ".repeat(12),
            "<script src=\"/chunk.js\"></script>".repeat(7)
        );
        let signal = detect(&html);
        assert!(signal.js_required);
    }

    #[test]
    fn test_spa_shell_with_few_links() {
        let html = format!(
            "<html><body><div id=\"root\"></div><p>{}</p><script src=\"/bundle.js\"></script></body></html>",
            "This single page application serves a nearly empty shell document. ".repeat(10)
        );
        let signal = detect(&html);
        assert!(signal.js_required);
        assert!(!signal.empty_body);
    }

    #[test]
    fn test_spa_marker_with_many_links_is_fine() {
        let links = "<a href=\"/a\">a</a> <a href=\"/b\">b</a> <a href=\"/c\">c</a>";
        let html = format!(
            "<html><body><div id=\"root\">{}</div><p>{}</p></body></html>",
            links,
            "Server rendered content with plenty of text and navigation links everywhere. "
                .repeat(8)
        );
        let signal = detect(&html);
        assert!(!signal.js_required);
    }

    #[test]
    fn test_empty_body() {
        let signal = detect("<html><body><div></div></body></html>");
        assert!(signal.empty_body);
        assert!(signal.detected());
    }

    #[test]
    fn test_script_contents_are_not_visible_text() {
        let html = format!(
            "<html><body><script>{}</script></body></html>",
            "var padding = 'lots and lots of javascript'; ".repeat(50)
        );
        let signal = detect(&html);
        assert!(signal.empty_body);
    }

    #[test]
    fn test_signals_can_cooccur() {
        let html = r#"<html><head><title>Just a moment...</title></head>
<body><div class="cf-turnstile"></div></body></html>"#;
        let signal = detect(html);
        assert!(signal.cloudflare);
        assert!(signal.recaptcha);
        assert!(signal.empty_body);
    }

    #[test]
    fn test_detect_is_deterministic() {
        let first = detect(CLEAN_PAGE);
        let second = detect(CLEAN_PAGE);
        assert_eq!(first, second);
    }
}
