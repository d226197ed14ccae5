//! The locally generated failure page, served over a custom URI scheme.
//!
//! Shown only on hard load failure. No network fetch: the document embeds
//! the literal error description, a manual retry control and a link that
//! opens the target in the default external browser.

use std::borrow::Cow;

use tauri::http;
use url::Url;

pub const SCHEME: &str = "fallback";

// Windows maps custom schemes onto http://<scheme>.localhost.
#[cfg(windows)]
const ORIGIN: &str = "http://fallback.localhost/";
#[cfg(not(windows))]
const ORIGIN: &str = "fallback://localhost/";

const DEFAULT_REASON: &str = "the page could not be loaded";

/// URL the primary surface navigates to when a load fails hard.
pub fn page_url(reason: &str) -> Result<Url, url::ParseError> {
    Url::parse_with_params(ORIGIN, &[("reason", reason)])
}

/// Protocol handler for `fallback://`. The reason travels in the query
/// string; anything unparseable degrades to a generic description.
pub fn serve(
    target: &Url,
    request: &http::Request<Vec<u8>>,
) -> http::Response<Cow<'static, [u8]>> {
    let reason = reason_from_uri(&request.uri().to_string());
    let html = render(&reason, target);
    match http::Response::builder()
        .status(http::StatusCode::OK)
        .header(http::header::CONTENT_TYPE, "text/html; charset=utf-8")
        .body(Cow::Owned(html.into_bytes()))
    {
        Ok(response) => response,
        Err(error) => {
            tracing::error!("failed to build fallback response: {error}");
            http::Response::new(Cow::Borrowed(&b"connection failed"[..]))
        }
    }
}

fn reason_from_uri(uri: &str) -> String {
    Url::parse(uri)
        .ok()
        .and_then(|url| {
            url.query_pairs()
                .find(|(key, _)| key == "reason")
                .map(|(_, value)| value.into_owned())
        })
        .filter(|reason| !reason.is_empty())
        .unwrap_or_else(|| DEFAULT_REASON.to_string())
}

fn render(reason: &str, target: &Url) -> String {
    format!(
        r##"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Connection failed</title>
<style>
  body {{
    font-family: -apple-system, "Segoe UI", Ubuntu, Helvetica, Arial, sans-serif;
    background: #212121; color: #ececec;
    display: flex; align-items: center; justify-content: center;
    height: 100vh; margin: 0;
  }}
  main {{ max-width: 28rem; text-align: center; }}
  h1 {{ font-size: 1.4rem; }}
  p.reason {{ color: #b4b4b4; overflow-wrap: break-word; }}
  button {{
    background: #10a37f; color: #fff; border: 0; border-radius: 6px;
    padding: 0.6rem 1.4rem; font-size: 1rem; cursor: pointer;
  }}
  a {{ display: block; margin-top: 1rem; color: #7ab7ff; }}
  footer {{ margin-top: 2rem; color: #6e6e6e; font-size: 0.8rem; }}
</style>
</head>
<body>
<main>
  <h1>ChatGPT could not be reached</h1>
  <p class="reason">{reason}</p>
  <button id="retry">Try again</button>
  <a id="external" href="#">Open in your browser instead</a>
  <footer id="version"></footer>
</main>
<script>
  document.getElementById('retry').addEventListener('click', function () {{
    window.__TAURI__.core.invoke('retry_load');
  }});
  document.getElementById('external').addEventListener('click', function (event) {{
    event.preventDefault();
    window.__TAURI__.core.invoke('open_external', {{ url: '{target}' }});
  }});
  window.__TAURI__.core.invoke('get_shell_info').then(function (info) {{
    document.getElementById('version').textContent =
      'ChatGPT Desktop v' + info.app_version + ' on ' + info.os;
  }}).catch(function () {{}});
</script>
</body>
</html>
"##,
        reason = escape_html(reason),
        target = target,
    )
}

/// Minimal HTML escaping; the reason string can carry arbitrary error text.
fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
