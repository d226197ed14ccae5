//! Navigation policy, free of `tauri::` types.
//!
//! Everything the shell decides about a URL lives here: which hostnames stay
//! in the window, which requests get the spoofed browser identity, which
//! finished loads are really interstitial/gateway error pages, and which
//! certificate failures are tolerated. The Tauri wiring in `surfaces.rs`
//! only forwards events into these functions.

use std::time::Duration;

/// Hostnames that belong to the chat service itself. Navigations and
/// popup redirects to these hosts stay on (or hand back to) the primary
/// surface.
const PRIMARY_DOMAINS: &[&str] = &["chatgpt.com", "chat.openai.com"];

/// The target's domain family: the service root plus its asset CDNs.
/// Outbound header overrides are scoped to exactly these hosts so the
/// spoofed identity never leaks to third parties.
const FAMILY_DOMAINS: &[&str] = &[
    "chatgpt.com",
    "openai.com",
    "oaistatic.com",
    "oaiusercontent.com",
];

/// Identity providers the sign-in flow bounces through. Popups to these
/// hosts get a real (secondary) surface instead of the external browser.
const AUTH_DOMAINS: &[&str] = &[
    "auth.openai.com",
    "auth0.openai.com",
    "openai.com",
    "accounts.google.com",
    "appleid.apple.com",
    "login.microsoftonline.com",
    "login.live.com",
];

/// Literal markers of a load that returned HTTP 200 but is not the app:
/// an edge challenge or an upstream gateway error. Matched case-insensitively
/// against the document title and visible text.
pub const SOFT_FAILURE_MARKERS: &[&str] = &[
    "Challenge in progress",
    "upstream connect error",
    "502 Bad Gateway",
    "503 Service",
];

/// Delay before the single automatic retry after a soft failure.
pub const RETRY_DELAY: Duration = Duration::from_secs(5);

/// A load that neither finishes nor errors within this window is treated
/// as a transport failure (the webview exposes no DNS/TLS error callback).
pub const LOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Disposition of a hostname against the allow-list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostClass {
    /// The chat service itself; belongs on the primary surface.
    Primary,
    /// Allow-listed auth provider or asset host; may load in-surface.
    Internal,
    /// Everything else; handed to the default external browser.
    External,
}

/// Exact or dot-suffix match, never raw substring: `notopenai.com` must not
/// match `openai.com`, and neither must `openai.com.attacker.net`.
fn matches_domain(host: &str, domain: &str) -> bool {
    host == domain
        || (host.len() > domain.len()
            && host.ends_with(domain)
            && host.as_bytes()[host.len() - domain.len() - 1] == b'.')
}

fn in_set(host: &str, domains: &[&str]) -> bool {
    domains.iter().any(|d| matches_domain(host, d))
}

/// Classify a destination hostname. Pure function of the static allow-list;
/// classification retains no state between attempts.
pub fn classify(host: &str) -> HostClass {
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    if in_set(&host, PRIMARY_DOMAINS) {
        HostClass::Primary
    } else if in_set(&host, AUTH_DOMAINS) || in_set(&host, FAMILY_DOMAINS) {
        HostClass::Internal
    } else {
        HostClass::External
    }
}

/// Whether a destination host belongs to the target's domain family, i.e.
/// whether outbound requests to it carry the spoofed header set.
pub fn is_domain_family(host: &str) -> bool {
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    in_set(&host, FAMILY_DOMAINS)
}

pub fn family_domains() -> &'static [&'static str] {
    FAMILY_DOMAINS
}

/// Scan a finished load for the known interstitial/gateway markers.
/// Returns the first marker found, if any.
pub fn soft_failure_marker(title: &str, body_text: &str) -> Option<&'static str> {
    let title = title.to_ascii_lowercase();
    let body = body_text.to_ascii_lowercase();
    SOFT_FAILURE_MARKERS
        .iter()
        .copied()
        .find(|marker| {
            let needle = marker.to_ascii_lowercase();
            title.contains(&needle) || body.contains(&needle)
        })
}

/// Certificate errors are tolerated only for loopback hosts, as a narrow
/// development convenience. Everything else fails through the normal
/// failure path.
pub fn trust_certificate_for(host: &str) -> bool {
    matches!(host, "localhost" | "127.0.0.1" | "[::1]" | "::1")
}
