//! ChatGPT Desktop
//!
//! Tauri shell that wraps the hosted ChatGPT web app in a native window:
//! spoofed browser identity for the service's own domains, an allow-list
//! navigation policy, and load-failure recovery.

#![cfg_attr(
    all(not(debug_assertions), target_os = "windows"),
    windows_subsystem = "windows"
)]

pub mod commands;
pub mod config;
pub mod controller;
mod error;
mod fallback;
mod menu;
pub mod policy;
pub mod spoof;
mod surfaces;

use tauri::webview::PageLoadEvent;
use tauri::{Manager, RunEvent, WindowEvent};
use tracing::{debug, info, Level};
use tracing_subscriber::FmtSubscriber;

use crate::controller::Event;
use crate::surfaces::ShellState;

/// Initialize logging based on debug/release mode
fn init_logging() {
    let level = if cfg!(debug_assertions) {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(cfg!(debug_assertions))
        .with_line_number(cfg!(debug_assertions))
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");
}

/// Main entry point
pub fn main() {
    init_logging();
    info!("Starting ChatGPT Desktop v{}", env!("CARGO_PKG_VERSION"));

    let target = config::target_url();
    info!("target URL: {target}");

    tauri::Builder::default()
        .plugin(tauri_plugin_opener::init())
        .plugin(tauri_plugin_single_instance::init(|app, _args, _cwd| {
            // A second launch just brings the existing shell forward.
            info!("second instance launched; focusing primary surface");
            surfaces::ensure_primary(app);
        }))
        .manage(ShellState::new(target))
        .register_uri_scheme_protocol(fallback::SCHEME, |ctx, request| {
            let state = ctx.app_handle().state::<ShellState>();
            fallback::serve(&state.target(), &request)
        })
        .menu(menu::build)
        .on_menu_event(|app, event| menu::handle_event(app, event))
        .on_page_load(|webview, payload| match payload.event() {
            PageLoadEvent::Started => {
                debug!("page load started: {}", payload.url());
                // Backup injection; the builder's initialization script is
                // the primary path and the script self-guards.
                let _ = webview.eval(&spoof::init_script());
            }
            PageLoadEvent::Finished => {
                debug!("page load finished: {}", payload.url());
                let window = webview.window();
                if window.label() != surfaces::MAIN_LABEL {
                    return;
                }
                // First settled load reveals the window (no visual flash).
                if !window.is_visible().unwrap_or(true) {
                    let _ = window.show();
                }
                let url = payload.url();
                let is_fallback_page = url.scheme() == fallback::SCHEME
                    || url.host_str() == Some("fallback.localhost");
                if matches!(url.scheme(), "http" | "https") && !is_fallback_page {
                    let _ = webview.eval(spoof::HEALTH_PROBE_JS);
                }
            }
        })
        .on_window_event(|window, event| {
            if window.label() == surfaces::MAIN_LABEL {
                if let WindowEvent::Destroyed = event {
                    info!("primary surface destroyed");
                    surfaces::dispatch(window.app_handle(), Event::SurfaceDestroyed);
                }
            }
        })
        .setup(|app| {
            info!("Application setup starting...");
            surfaces::ensure_primary(app.handle());
            info!("Application setup complete");
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            commands::report_page_health,
            commands::retry_load,
            commands::open_external,
            commands::get_shell_info,
        ])
        .build(tauri::generate_context!())
        .expect("Error while building ChatGPT Desktop")
        .run(|app, event| match event {
            #[cfg(target_os = "macos")]
            RunEvent::Reopen { .. } => {
                // Dock activation with no windows left re-creates the
                // primary surface.
                surfaces::ensure_primary(app);
            }
            RunEvent::ExitRequested { api, code, .. } => {
                // macOS apps keep running when the last window closes.
                #[cfg(target_os = "macos")]
                if code.is_none() {
                    api.prevent_exit();
                }
                #[cfg(not(target_os = "macos"))]
                {
                    let _ = (app, api, code);
                }
            }
            _ => {}
        });
}
