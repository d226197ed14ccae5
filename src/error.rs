//! Shell error types.

/// Failures raised while wiring surfaces and the menu. Load failures are
/// not errors at this level; they flow through the controller's fallback
/// path and never abort the process.
#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    #[error("failed to create surface `{label}`")]
    SurfaceCreation {
        label: &'static str,
        #[source]
        source: tauri::Error,
    },
}
