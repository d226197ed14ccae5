//! Shell configuration. One knob: the target URL, overridable through the
//! environment for development against a staging deployment or a local mock.

use tracing::warn;
use url::Url;

use crate::policy;

pub const TARGET_URL_ENV: &str = "CHATGPT_DESKTOP_TARGET_URL";
pub const DEFAULT_TARGET_URL: &str = "https://chatgpt.com/";

/// The URL the primary surface loads. Falls back to the default on any
/// override that does not normalize to an absolute URL with a host.
pub fn target_url() -> Url {
    normalize_target_url(std::env::var(TARGET_URL_ENV).ok().as_deref())
}

/// Whether the configured target is a loopback host; gates the narrow
/// certificate-error allowance in `main.rs`.
pub fn target_is_loopback() -> bool {
    target_url()
        .host_str()
        .map(policy::trust_certificate_for)
        .unwrap_or(false)
}

fn normalize_target_url(raw: Option<&str>) -> Url {
    let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return default_target();
    };

    // Accept a bare hostname; everything else must already carry a scheme.
    let candidate = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("https://{raw}")
    };

    match Url::parse(&candidate) {
        Ok(url) if url.host_str().is_some() && matches!(url.scheme(), "http" | "https") => url,
        Ok(url) => {
            warn!("{TARGET_URL_ENV}={raw} is not an http(s) URL with a host ({url}); using default");
            default_target()
        }
        Err(error) => {
            warn!("{TARGET_URL_ENV}={raw} did not parse: {error}; using default");
            default_target()
        }
    }
}

fn default_target() -> Url {
    // The constant is a valid URL; parsing it cannot fail.
    Url::parse(DEFAULT_TARGET_URL).unwrap_or_else(|_| unreachable!("default target URL is valid"))
}
