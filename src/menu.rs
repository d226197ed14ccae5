//! Native application menu — File / Edit / View / Window / Help.
//!
//! Static bindings to the host menu API; "New Chat" and "Reload" are the
//! only items that feed back into the shell.

use tauri::menu::{AboutMetadataBuilder, Menu, MenuEvent, MenuItemBuilder, SubmenuBuilder};
use tauri::{AppHandle, Manager, Wry};
use tracing::{debug, warn};

use crate::controller::Event;
use crate::{spoof, surfaces};

pub fn build(handle: &AppHandle) -> tauri::Result<Menu<Wry>> {
    let about = AboutMetadataBuilder::new()
        .name(Some("ChatGPT Desktop"))
        .version(Some(env!("CARGO_PKG_VERSION")))
        .comments(Some("A desktop wrapper for ChatGPT"))
        .build();

    #[cfg(target_os = "macos")]
    let app_menu = SubmenuBuilder::new(handle, "ChatGPT Desktop")
        .about(Some(about.clone()))
        .separator()
        .services()
        .separator()
        .hide()
        .hide_others()
        .show_all()
        .separator()
        .quit()
        .build()?;

    let new_chat = MenuItemBuilder::with_id("new-chat", "New Chat")
        .accelerator("CmdOrCtrl+N")
        .build(handle)?;
    let file = SubmenuBuilder::new(handle, "File")
        .item(&new_chat)
        .separator()
        .quit()
        .build()?;

    let edit = SubmenuBuilder::new(handle, "Edit")
        .undo()
        .redo()
        .separator()
        .cut()
        .copy()
        .paste()
        .select_all()
        .build()?;

    let reload = MenuItemBuilder::with_id("reload", "Reload")
        .accelerator("CmdOrCtrl+R")
        .build(handle)?;
    let zoom_in = MenuItemBuilder::with_id("zoom-in", "Zoom In")
        .accelerator("CmdOrCtrl+=")
        .build(handle)?;
    let zoom_out = MenuItemBuilder::with_id("zoom-out", "Zoom Out")
        .accelerator("CmdOrCtrl+-")
        .build(handle)?;
    let zoom_reset = MenuItemBuilder::with_id("zoom-reset", "Actual Size")
        .accelerator("CmdOrCtrl+0")
        .build(handle)?;
    let view = SubmenuBuilder::new(handle, "View")
        .item(&reload)
        .separator()
        .item(&zoom_in)
        .item(&zoom_out)
        .item(&zoom_reset)
        .separator()
        .fullscreen()
        .build()?;

    let window = SubmenuBuilder::new(handle, "Window")
        .minimize()
        .close_window()
        .build()?;

    let help = SubmenuBuilder::new(handle, "Help")
        .about_with_text("About ChatGPT Desktop", Some(about))
        .build()?;

    let menu = Menu::new(handle)?;
    #[cfg(target_os = "macos")]
    menu.append(&app_menu)?;
    menu.append(&file)?;
    menu.append(&edit)?;
    menu.append(&view)?;
    menu.append(&window)?;
    menu.append(&help)?;
    Ok(menu)
}

pub fn handle_event(app: &AppHandle, event: MenuEvent) {
    match event.id().as_ref() {
        "new-chat" => {
            debug!("menu: new chat");
            if let Some(window) = app.get_webview_window(surfaces::MAIN_LABEL) {
                if let Err(error) = window.eval(spoof::NEW_CHAT_JS) {
                    warn!("new-chat script failed: {error}");
                }
            }
        }
        "reload" => {
            debug!("menu: reload");
            surfaces::dispatch(app, Event::LoadRequested);
        }
        "zoom-in" => surfaces::zoom_primary(app, surfaces::ZoomChange::In),
        "zoom-out" => surfaces::zoom_primary(app, surfaces::ZoomChange::Out),
        "zoom-reset" => surfaces::zoom_primary(app, surfaces::ZoomChange::Reset),
        _ => {}
    }
}
