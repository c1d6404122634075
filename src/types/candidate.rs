use std::fmt::Display;

use serde::{Deserialize, Serialize};
use url::Url;

/// The semantic role a URL played in the markup it was discovered in.
///
/// The role decides whether a candidate is checked at all (images and
/// CSS/JS assets are opt-in) and whether it can be enqueued for crawling
/// (only hyperlinks are).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LinkKind {
    /// A clickable `<a href>` target
    Hyperlink,
    /// A `<link rel="icon">` (or variant) target
    Favicon,
    /// The `<link rel="canonical">` target
    Canonical,
    /// An `<iframe src>` target
    Iframe,
    /// A syndication feed, `<link rel="alternate">` with an RSS/Atom type
    Feed,
    /// The `<link rel="manifest">` target
    Manifest,
    /// An `<img src>` target
    Image,
    /// The first URL of a `srcset` image candidate
    ImageSrcset,
    /// A `<video>` source, inline or via `<source>`
    Video,
    /// An `<audio>` source, inline or via `<source>`
    Audio,
    /// A `<link rel="stylesheet">` target
    Stylesheet,
    /// A `<script src>` target
    Script,
    /// A `<link rel="preload">` hint
    Preload,
    /// A `<link rel="prefetch">` hint
    Prefetch,
    /// A `<link rel="dns-prefetch">` hint
    DnsPrefetch,
    /// A `<link rel="preconnect">` hint
    Preconnect,
}

impl Display for LinkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Hyperlink => "hyperlink",
            Self::Favicon => "favicon",
            Self::Canonical => "canonical",
            Self::Iframe => "iframe",
            Self::Feed => "feed",
            Self::Manifest => "manifest",
            Self::Image => "image",
            Self::ImageSrcset => "image-srcset",
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Stylesheet => "stylesheet",
            Self::Script => "script",
            Self::Preload => "preload",
            Self::Prefetch => "prefetch",
            Self::DnsPrefetch => "dns-prefetch",
            Self::Preconnect => "preconnect",
        };
        f.write_str(name)
    }
}

/// A URL discovered in a page's markup, resolved to an absolute URL and
/// tagged with the role it played there.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LinkCandidate {
    /// The absolute URL of the candidate
    pub url: Url,
    /// The semantic role the URL played in the markup
    pub kind: LinkKind,
    /// The page the candidate was found on
    pub source_page: String,
}

impl Display for LinkCandidate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.url, self.kind)
    }
}
