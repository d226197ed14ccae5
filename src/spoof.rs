//! Browser-identity spoofing: the fixed user-agent, the outbound header
//! overrides for the target's domain family, and the best-effort stealth
//! script that removes automation markers before page scripts run.

use crate::policy;

/// Fixed identification string impersonating a current desktop Chrome.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Literal header overrides attached to outbound requests whose destination
/// host is in the target's domain family. Unrelated hosts are untouched.
pub const SPOOFED_HEADERS: &[(&str, &str)] = &[
    (
        "Accept",
        "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,\
         image/webp,image/apng,*/*;q=0.8,application/signed-exchange;v=b3;q=0.7",
    ),
    ("Accept-Language", "en-US,en;q=0.9"),
    ("Accept-Encoding", "gzip, deflate, br, zstd"),
    ("Cache-Control", "no-cache"),
    ("Pragma", "no-cache"),
    ("Sec-Fetch-Dest", "document"),
    ("Sec-Fetch-Mode", "navigate"),
    ("Sec-Fetch-Site", "none"),
    ("Sec-Fetch-User", "?1"),
    ("Upgrade-Insecure-Requests", "1"),
    (
        "sec-ch-ua",
        "\"Google Chrome\";v=\"131\", \"Chromium\";v=\"131\", \"Not_A Brand\";v=\"24\"",
    ),
    ("sec-ch-ua-mobile", "?0"),
    ("sec-ch-ua-platform", "\"Windows\""),
];

/// The header set for a destination host: the spoofed overrides for the
/// domain family, nothing for anyone else.
pub fn outbound_headers(host: &str) -> Option<&'static [(&'static str, &'static str)]> {
    policy::is_domain_family(host).then_some(SPOOFED_HEADERS)
}

/// Clicks the composer's new-chat affordance; wired to the File > New Chat
/// menu item. Selector fallbacks mirror the web app's markup drift.
pub const NEW_CHAT_JS: &str = r#"
(function() {
    var button = document.querySelector('[data-testid="new-chat-button"]')
        || document.querySelector('button[aria-label*="new"]')
        || document.querySelector('a[href="/"]');
    if (button) button.click();
})();
"#;

/// Reports the finished document back to the shell so the completion
/// classifier can spot interstitial/gateway pages. Failures are swallowed;
/// the probe is best-effort.
pub const HEALTH_PROBE_JS: &str = r#"
(function() {
    try {
        var body = (document.body && document.body.innerText)
            ? document.body.innerText.slice(0, 4096)
            : '';
        window.__TAURI__.core.invoke('report_page_health', {
            title: document.title || '',
            bodyText: body
        });
    } catch (e) { /* best effort */ }
})();
"#;

/// Cosmetic fingerprint patches. Each one is an isolated IIFE so a failure
/// in one does not break the others; injection errors are never surfaced.
const STEALTH_JS: &str = r#"
// navigator.webdriver: embedded webviews report true, real browsers do not.
(function() {
    try {
        Object.defineProperty(navigator, 'webdriver', {
            get: function() { return undefined; },
            configurable: true
        });
    } catch (e) {}
})();

// navigator.plugins: an empty plugin list is a webview tell. Desktop Chrome
// always carries at least the PDF pair.
(function() {
    try {
        var data = [
            { name: 'Chrome PDF Plugin', filename: 'internal-pdf-viewer',
              description: 'Portable Document Format' },
            { name: 'Chrome PDF Viewer', filename: 'mhjfbmdgcfjbbpaeojofohoefgiehjai',
              description: '' }
        ];
        var plugins = data.map(function(d) {
            var p = Object.create(Plugin.prototype);
            Object.defineProperties(p, {
                name: { get: function() { return d.name; } },
                filename: { get: function() { return d.filename; } },
                description: { get: function() { return d.description; } },
                length: { get: function() { return 0; } }
            });
            return p;
        });
        var pluginArray = Object.create(PluginArray.prototype);
        Object.defineProperties(pluginArray, {
            length: { get: function() { return plugins.length; } },
            0: { get: function() { return plugins[0]; } },
            1: { get: function() { return plugins[1]; } }
        });
        pluginArray.item = function(i) { return plugins[i] || null; };
        pluginArray.namedItem = function(n) {
            for (var i = 0; i < plugins.length; i++) {
                if (plugins[i].name === n) return plugins[i];
            }
            return null;
        };
        pluginArray.refresh = function() {};
        Object.defineProperty(navigator, 'plugins', {
            get: function() { return pluginArray; },
            configurable: true
        });
    } catch (e) {}
})();

// navigator.languages: keep consistent with the Accept-Language override.
(function() {
    try {
        Object.defineProperty(navigator, 'languages', {
            get: function() { return ['en-US', 'en']; },
            configurable: true
        });
    } catch (e) {}
})();

// chrome.runtime: detectors probe for a real extension environment.
(function() {
    try {
        if (!window.chrome) window.chrome = {};
        if (!window.chrome.runtime) {
            window.chrome.runtime = {
                connect: function() {},
                sendMessage: function() {},
                id: undefined
            };
        }
    } catch (e) {}
})();
"#;

/// Build the full injection script: stealth patches plus a `window.fetch`
/// wrapper that attaches the spoofed headers to domain-family requests.
/// Guarded so re-injection on page-load (the backup path) is a no-op.
pub fn init_script() -> String {
    let headers: serde_json::Map<String, serde_json::Value> = SPOOFED_HEADERS
        .iter()
        .map(|(name, value)| ((*name).to_string(), serde_json::Value::from(*value)))
        .collect();
    let headers_json = serde_json::Value::Object(headers).to_string();
    let family_json =
        serde_json::to_string(policy::family_domains()).unwrap_or_else(|_| "[]".to_string());

    format!(
        r#"
(function() {{
    if (window.__cgd_patched) return;
    window.__cgd_patched = true;

    {stealth}

    // Attach the spoofed header set to fetches bound for the target's own
    // domain family. Third-party destinations keep their original headers.
    (function() {{
        try {{
            var HEADERS = {headers_json};
            var FAMILY = {family_json};
            var inFamily = function(host) {{
                host = (host || '').toLowerCase();
                return FAMILY.some(function(d) {{
                    return host === d || host.slice(-(d.length + 1)) === '.' + d;
                }});
            }};
            var origFetch = window.fetch;
            window.fetch = function(input, init) {{
                try {{
                    var raw = (typeof input === 'string') ? input
                        : (input instanceof URL) ? input.href
                        : input.url;
                    var url = new URL(raw, window.location.href);
                    if ((url.protocol === 'https:' || url.protocol === 'http:')
                            && inFamily(url.hostname)) {{
                        init = init || {{}};
                        var headers = new Headers(
                            init.headers || (input && input.headers) || undefined);
                        Object.keys(HEADERS).forEach(function(name) {{
                            if (!headers.has(name)) headers.set(name, HEADERS[name]);
                        }});
                        init.headers = headers;
                    }}
                }} catch (e) {{ /* pass the request through untouched */ }}
                return origFetch.call(this, input, init);
            }};
        }} catch (e) {{}}
    }})();
}})();
"#,
        stealth = STEALTH_JS,
        headers_json = headers_json,
        family_json = family_json,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_agent_looks_like_desktop_chrome() {
        assert!(USER_AGENT.starts_with("Mozilla/5.0"));
        assert!(USER_AGENT.contains("Chrome/"));
        assert!(!USER_AGENT.to_lowercase().contains("tauri"));
        assert!(!USER_AGENT.to_lowercase().contains("wry"));
    }

    #[test]
    fn headers_cover_the_specified_set() {
        let names: Vec<&str> = SPOOFED_HEADERS.iter().map(|(n, _)| *n).collect();
        for required in [
            "Accept",
            "Accept-Language",
            "Accept-Encoding",
            "Cache-Control",
            "Pragma",
            "Upgrade-Insecure-Requests",
        ] {
            assert!(names.contains(&required), "missing {required}");
        }
        assert!(names.iter().any(|n| n.starts_with("Sec-Fetch-")));
        assert!(names.iter().any(|n| n.starts_with("sec-ch-ua")));
    }

    #[test]
    fn header_overrides_scoped_to_family() {
        assert!(outbound_headers("chatgpt.com").is_some());
        assert!(outbound_headers("api.openai.com").is_some());
        assert!(outbound_headers("example.com").is_none());
        assert!(outbound_headers("notopenai.com").is_none());
    }

    #[test]
    fn init_script_is_guarded_and_self_contained() {
        let script = init_script();
        assert!(script.contains("__cgd_patched"));
        assert!(script.contains("webdriver"));
        assert!(script.contains("navigator"));
        assert!(script.contains("window.fetch"));
        // The family list and header map are baked in as literals.
        assert!(script.contains("oaistatic.com"));
        assert!(script.contains("Accept-Language"));
    }

    #[test]
    fn probe_reports_through_the_command_layer() {
        assert!(HEALTH_PROBE_JS.contains("report_page_health"));
        assert!(HEALTH_PROBE_JS.contains("bodyText"));
    }
}
