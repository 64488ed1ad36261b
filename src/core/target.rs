//! Request URL resolution against the service base URL.

/// Where a queued request goes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RequestTarget {
    /// Path relative to the service base (no leading slash). Can be batched.
    Relative(String),
    /// Absolute URL on some other server. Always sent on its own.
    External(String),
}

fn is_absolute(url: &str) -> bool {
    let lower = url.get(..8).unwrap_or(url).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

impl RequestTarget {
    /// Classify `url` relative to `base_url`.
    ///
    /// Absolute URLs under `base_url` become relative so they can join a batch.
    #[must_use]
    pub fn resolve(base_url: &str, url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        if !is_absolute(url) {
            return Self::Relative(url.trim_start_matches('/').to_string());
        }
        if !base.is_empty() {
            if let Some(rest) = url.strip_prefix(base) {
                if rest.is_empty() || rest.starts_with('/') || rest.starts_with('?') {
                    return Self::Relative(rest.trim_start_matches('/').to_string());
                }
            }
        }
        Self::External(url.to_string())
    }

    /// Whether this target may be folded into a batch bundle.
    #[must_use]
    pub const fn is_batchable(&self) -> bool {
        matches!(self, Self::Relative(_))
    }

    /// The URL as it appears in a batch entry.
    #[must_use]
    pub fn entry_url(&self) -> &str {
        match self {
            Self::Relative(path) | Self::External(path) => path,
        }
    }

    /// The absolute URL for an individual GET, also used as the cache key.
    #[must_use]
    pub fn absolute_url(&self, base_url: &str) -> String {
        match self {
            Self::Relative(path) if path.starts_with('?') => {
                format!("{}{}", base_url.trim_end_matches('/'), path)
            }
            Self::Relative(path) => format!("{}/{}", base_url.trim_end_matches('/'), path),
            Self::External(url) => url.clone(),
        }
    }
}
