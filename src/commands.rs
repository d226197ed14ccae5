//! Tauri command handlers
//!
//! Invoked from the webview via `window.__TAURI__.core.invoke()`: the
//! page-health beacon injected after every finished load, and the retry /
//! external-open affordances on the fallback page. Decision logic lives in
//! `policy` and `controller`; these are thin wrappers.

use serde::Serialize;
use tauri_plugin_opener::OpenerExt;
use tracing::{debug, error, info};

use crate::controller::Event;
use crate::{policy, surfaces};

/// Shell/platform information shown on the fallback page and About flows.
#[derive(Debug, Serialize)]
pub struct ShellInfo {
    pub os: String,
    pub os_version: String,
    pub arch: String,
    pub app_version: String,
    pub tauri_version: String,
}

// ============================================================================
// Load lifecycle
// ============================================================================

/// Completion-classification beacon. Runs once per finished load on the
/// primary surface; a matched marker makes the controller schedule the
/// single fixed-delay retry.
#[tauri::command]
pub fn report_page_health(
    app: tauri::AppHandle,
    window: tauri::Window,
    title: String,
    body_text: String,
) {
    if window.label() != surfaces::MAIN_LABEL {
        return;
    }
    let marker = policy::soft_failure_marker(&title, &body_text);
    match marker {
        Some(marker) => info!("[command:report_page_health] matched marker: {marker:?}"),
        None => debug!("[command:report_page_health] page is healthy ({title:?})"),
    }
    surfaces::dispatch(&app, Event::LoadFinished { soft_failure: marker });
}

/// Manual retry control on the fallback page.
#[tauri::command]
pub fn retry_load(app: tauri::AppHandle) {
    info!("[command:retry_load] manual reload requested");
    surfaces::dispatch(&app, Event::LoadRequested);
}

// ============================================================================
// External opener
// ============================================================================

/// Validate a URL before handing it to the OS opener — must be http(s).
pub fn validate_external_url(url: &str) -> Result<(), String> {
    if !url.starts_with("https://") && !url.starts_with("http://") {
        return Err("Invalid URL: must start with http:// or https://".to_string());
    }
    Ok(())
}

/// Open a URL in the system's default browser.
#[tauri::command]
pub fn open_external(app: tauri::AppHandle, url: String) -> Result<(), String> {
    info!("[command:open_external] opening URL in browser: {url}");
    validate_external_url(&url)?;
    app.opener().open_url(&url, None::<&str>).map_err(|e| {
        error!("[command:open_external] failed to open browser: {e}");
        format!("Failed to open browser: {e}")
    })
}

// ============================================================================
// Shell information
// ============================================================================

#[tauri::command]
pub fn get_shell_info() -> ShellInfo {
    ShellInfo {
        os: std::env::consts::OS.to_string(),
        os_version: os_info::get().version().to_string(),
        arch: std::env::consts::ARCH.to_string(),
        app_version: env!("CARGO_PKG_VERSION").to_string(),
        tauri_version: tauri::VERSION.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_external_url() {
        assert!(validate_external_url("https://example.com").is_ok());
        assert!(validate_external_url("http://example.com").is_ok());
        assert!(validate_external_url("ftp://example.com").is_err());
        assert!(validate_external_url("javascript:alert(1)").is_err());
    }

    #[test]
    fn test_shell_info() {
        let info = get_shell_info();
        assert!(!info.os.is_empty());
        assert!(!info.arch.is_empty());
        assert!(!info.app_version.is_empty());
    }
}
