// Prevents additional console window on Windows in release
#![cfg_attr(
    all(not(debug_assertions), target_os = "windows"),
    windows_subsystem = "windows"
)]

fn main() {
    // Chromium flags WebView2 only honors through this environment variable.
    // The automation flag complements the injected stealth script; the
    // insecure-localhost allowance applies only when the target itself is a
    // loopback host (development against a local mock).
    let mut browser_args =
        String::from("--disable-blink-features=AutomationControlled --disable-component-update");
    if chatgpt_desktop_lib::config::target_is_loopback() {
        browser_args.push_str(" --allow-insecure-localhost");
    }
    std::env::set_var("WEBVIEW2_ADDITIONAL_BROWSER_ARGUMENTS", browser_args);

    chatgpt_desktop_lib::main();
}
