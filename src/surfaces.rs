//! Surface management: the single primary window, the transient auth popup,
//! and the executor that turns controller actions into webview calls.
//!
//! All callbacks are delivered serially by the host event loop; the mutex
//! around the controller only guards against the deferred retry/watchdog
//! tasks, which re-enter through `dispatch`.

use std::sync::Mutex;

use tauri::webview::NewWindowResponse;
use tauri::{AppHandle, Manager, WebviewUrl, WebviewWindow, WebviewWindowBuilder};
use tauri_plugin_opener::OpenerExt;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::controller::{Action, Event, NavigationController, SurfaceKind};
use crate::error::ShellError;
use crate::{fallback, policy, spoof};

pub const MAIN_LABEL: &str = "main";
pub const AUTH_LABEL: &str = "auth";

const ZOOM_STEP: f64 = 0.1;
const ZOOM_MIN: f64 = 0.3;
const ZOOM_MAX: f64 = 3.0;

/// View-menu zoom commands for the primary surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoomChange {
    In,
    Out,
    Reset,
}

pub struct ShellState {
    controller: Mutex<NavigationController>,
    zoom: Mutex<f64>,
}

impl ShellState {
    pub fn new(target: Url) -> Self {
        Self {
            controller: Mutex::new(NavigationController::new(target)),
            zoom: Mutex::new(1.0),
        }
    }

    pub fn target(&self) -> Url {
        self.lock().target().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, NavigationController> {
        self.controller
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Run one event through the controller and execute the resulting actions.
pub fn dispatch(app: &AppHandle, event: Event) {
    let actions = {
        let state = app.state::<ShellState>();
        let mut controller = state.lock();
        controller.handle(event)
    };
    apply_actions(app, actions);
}

/// `on_navigation` hook body: classify, execute side effects, and tell the
/// webview whether the navigation may proceed in-surface.
pub fn navigation_allowed(app: &AppHandle, surface: SurfaceKind, url: &Url) -> bool {
    let actions = {
        let state = app.state::<ShellState>();
        let mut controller = state.lock();
        controller.handle(Event::WillNavigate {
            surface,
            url: url.clone(),
        })
    };
    let allowed = actions.iter().any(|a| matches!(a, Action::AllowNavigation));
    if !allowed {
        info!("cancelling in-surface navigation to {url}");
    }
    apply_actions(app, actions);
    allowed
}

/// Idempotent "a primary surface exists and is frontmost" operation, used on
/// startup, app reactivation and second-instance launches.
pub fn ensure_primary(app: &AppHandle) {
    if let Some(window) = app.get_webview_window(MAIN_LABEL) {
        let _ = window.show();
        let _ = window.set_focus();
        return;
    }
    dispatch(app, Event::LoadRequested);
}

fn apply_actions(app: &AppHandle, actions: Vec<Action>) {
    for action in actions {
        match action {
            Action::AllowNavigation => {}
            Action::LoadPrimary(url) => load_primary(app, url),
            Action::FocusPrimary => {
                if let Some(window) = app.get_webview_window(MAIN_LABEL) {
                    let _ = window.show();
                    let _ = window.set_focus();
                }
            }
            Action::OpenExternal(url) => open_external(app, url.as_str()),
            Action::SpawnSecondary(url) => spawn_secondary(app, url),
            Action::CloseSecondary => {
                if let Some(window) = app.get_webview_window(AUTH_LABEL) {
                    // close() posts through the event loop, safe mid-callback
                    let _ = window.close();
                }
            }
            Action::ScheduleRetry { epoch } => schedule_retry(app, epoch),
            Action::StartWatchdog { epoch } => start_watchdog(app, epoch),
            Action::ShowFallback { reason } => show_fallback(app, &reason),
        }
    }
}

fn load_primary(app: &AppHandle, url: Url) {
    match app.get_webview_window(MAIN_LABEL) {
        Some(window) => {
            debug!("navigating primary surface to {url}");
            if let Err(error) = window.navigate(url) {
                error!("failed to navigate primary surface: {error}");
            }
        }
        None => {
            if let Err(error) = create_primary(app, url) {
                error!("{error}");
            }
        }
    }
}

fn create_primary(app: &AppHandle, url: Url) -> Result<WebviewWindow, ShellError> {
    info!("creating primary surface at {url}");
    let nav_handle = app.clone();
    let popup_handle = app.clone();
    WebviewWindowBuilder::new(app, MAIN_LABEL, WebviewUrl::External(url))
        .title("ChatGPT")
        .inner_size(1200.0, 800.0)
        .min_inner_size(800.0, 600.0)
        // shown once the first load settles, to avoid a visual flash
        .visible(false)
        .user_agent(spoof::USER_AGENT)
        .initialization_script(&spoof::init_script())
        .on_navigation(move |url| navigation_allowed(&nav_handle, SurfaceKind::Primary, url))
        .on_new_window(move |url, _features| {
            // Never let the runtime create its own window; the controller
            // decides between a bounded secondary surface and the external
            // browser.
            dispatch(&popup_handle, Event::NewSurfaceRequested { url: url.clone() });
            NewWindowResponse::Deny
        })
        .build()
        .map_err(|source| ShellError::SurfaceCreation {
            label: MAIN_LABEL,
            source,
        })
}

fn spawn_secondary(app: &AppHandle, url: Url) {
    if let Some(existing) = app.get_webview_window(AUTH_LABEL) {
        debug!("reusing auth surface for {url}");
        if let Err(error) = existing.navigate(url) {
            error!("failed to navigate auth surface: {error}");
        }
        let _ = existing.set_focus();
        return;
    }
    if let Err(error) = create_secondary(app, url) {
        error!("{error}");
    }
}

fn create_secondary(app: &AppHandle, url: Url) -> Result<WebviewWindow, ShellError> {
    info!("spawning auth surface at {url}");
    let nav_handle = app.clone();
    let popup_handle = app.clone();
    WebviewWindowBuilder::new(app, AUTH_LABEL, WebviewUrl::External(url))
        .title("Sign in")
        .inner_size(480.0, 700.0)
        .user_agent(spoof::USER_AGENT)
        .initialization_script(&spoof::init_script())
        .on_navigation(move |url| navigation_allowed(&nav_handle, SurfaceKind::Secondary, url))
        .on_new_window(move |url, _features| {
            dispatch(&popup_handle, Event::NewSurfaceRequested { url: url.clone() });
            NewWindowResponse::Deny
        })
        .build()
        .map_err(|source| ShellError::SurfaceCreation {
            label: AUTH_LABEL,
            source,
        })
}

fn open_external(app: &AppHandle, url: &str) {
    info!("opening externally: {url}");
    if let Err(error) = app.opener().open_url(url, None::<&str>) {
        error!("failed to open {url} in the default browser: {error}");
    }
}

fn schedule_retry(app: &AppHandle, epoch: u64) {
    info!(
        "interstitial detected; retrying in {}s",
        policy::RETRY_DELAY.as_secs()
    );
    let handle = app.clone();
    tauri::async_runtime::spawn(async move {
        tokio::time::sleep(policy::RETRY_DELAY).await;
        if handle.get_webview_window(MAIN_LABEL).is_none() {
            debug!("retry dropped: primary surface is gone");
            return;
        }
        dispatch(&handle, Event::RetryElapsed { epoch });
    });
}

fn start_watchdog(app: &AppHandle, epoch: u64) {
    let handle = app.clone();
    tauri::async_runtime::spawn(async move {
        tokio::time::sleep(policy::LOAD_TIMEOUT).await;
        dispatch(&handle, Event::WatchdogFired { epoch });
    });
}

fn next_zoom(current: f64, change: ZoomChange) -> f64 {
    match change {
        ZoomChange::In => (current + ZOOM_STEP).min(ZOOM_MAX),
        ZoomChange::Out => (current - ZOOM_STEP).max(ZOOM_MIN),
        ZoomChange::Reset => 1.0,
    }
}

/// Step the primary surface's zoom factor and apply it to the webview.
pub fn zoom_primary(app: &AppHandle, change: ZoomChange) {
    let state = app.state::<ShellState>();
    let factor = {
        let mut zoom = state
            .zoom
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *zoom = next_zoom(*zoom, change);
        *zoom
    };
    debug!("zoom factor: {factor}");
    if let Some(window) = app.get_webview_window(MAIN_LABEL) {
        if let Err(error) = window.set_zoom(factor) {
            warn!("failed to apply zoom factor {factor}: {error}");
        }
    }
}

fn show_fallback(app: &AppHandle, reason: &str) {
    warn!("load failed, showing fallback page: {reason}");
    let Some(window) = app.get_webview_window(MAIN_LABEL) else {
        return;
    };
    match fallback::page_url(reason) {
        Ok(url) => {
            if let Err(error) = window.navigate(url) {
                error!("failed to display fallback page: {error}");
            }
            let _ = window.show();
        }
        Err(error) => error!("failed to build fallback URL: {error}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zoom_steps_clamp_to_range() {
        let mut factor = 1.0;
        for _ in 0..50 {
            factor = next_zoom(factor, ZoomChange::In);
        }
        assert!(factor <= ZOOM_MAX);
        for _ in 0..50 {
            factor = next_zoom(factor, ZoomChange::Out);
        }
        assert!(factor >= ZOOM_MIN);
        assert_eq!(next_zoom(factor, ZoomChange::Reset), 1.0);
    }
}
