use serde::{Deserialize, Serialize};

use super::LinkKind;

/// One followed redirect while checking a candidate link
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedirectHop {
    /// The URL the redirect was issued from
    pub from: String,
    /// The resolved target of the `Location` header
    pub to: String,
    /// The 3xx status code of the hop
    pub status: u16,
}

/// The recorded outcome of checking one candidate link.
///
/// `status` is the HTTP status code of the final probe, `408` for a local
/// timeout, or `0` for any other transport failure. A link that redirected
/// and then resolved keeps the first hop's 3xx status; `final_url` and the
/// chain tell the rest. Checking is infallible by contract; failures show
/// up here as data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckedLink {
    /// The original absolute URL of the candidate
    pub url: String,
    /// The semantic role the URL played in the markup
    pub kind: LinkKind,
    /// The page the candidate was found on
    pub source_page: String,
    /// Final status code, `408` on timeout or `0` on transport failure
    pub status: u16,
    /// Canonical reason phrase for `status`, empty when unknown
    pub status_text: String,
    /// Elapsed time of the final probe attempt
    pub response_time_ms: u64,
    /// Redirect hops followed manually, truncated at the hop cap
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub redirect_chain: Vec<RedirectHop>,
    /// Where the link ended up, only set if it differs from `url`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_url: Option<String>,
    /// Whether the link has been checked
    pub checked: bool,
    /// Error text for timeouts and transport failures
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CheckedLink {
    /// The link resolved directly with a 2xx status
    #[inline]
    #[must_use]
    pub fn is_working(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The link redirected, whether or not it eventually resolved
    #[inline]
    #[must_use]
    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status)
    }

    /// The link failed: a 4xx/5xx status or a transport failure
    #[inline]
    #[must_use]
    pub fn is_broken(&self) -> bool {
        self.status == 0 || self.status >= 400
    }
}
