use serde::{Deserialize, Serialize};

/// Heuristic evidence that a fetched page does not represent its true
/// rendered output, e.g. because of bot mitigation or client-side rendering.
///
/// Signals are independent and can co-occur.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtectionSignal {
    /// A known Cloudflare interstitial challenge marker is present
    pub cloudflare: bool,
    /// A known CAPTCHA widget marker is present
    pub recaptcha: bool,
    /// The page likely requires JavaScript to render its content
    pub js_required: bool,
    /// The page body is (nearly) empty after stripping markup
    pub empty_body: bool,
    /// Human-readable diagnostics for each triggered signal
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
}

impl ProtectionSignal {
    /// Whether any signal fired
    #[must_use]
    pub fn detected(&self) -> bool {
        self.cloudflare || self.recaptcha || self.js_required || self.empty_body
    }
}

/// Job-level aggregation of protection signals, shown to the caller when a
/// page's links may be incomplete or hidden.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtectionWarning {
    /// Triggered categories: `Cloudflare`, `reCAPTCHA`, `JavaScript-Required`,
    /// `Empty-Content`, `No-Links-Found`
    pub categories: Vec<String>,
    /// Raw diagnostic strings from the per-page signals
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
}
