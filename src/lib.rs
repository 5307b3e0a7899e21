//! CrabPush: live push session coordination
//!
//! This crate manages the client side of a live video push: choosing a
//! camera, driving a vendor push SDK through start/stop, keeping a control
//! WebSocket alive and turning its `move` messages into positioning hints,
//! and uploading template images to a backend.
//!
//! # Features
//! - Vendor push SDK behind injectable traits ([`pusher`])
//! - Guarded push lifecycle with observable snapshots ([`session`])
//! - Control channel with heartbeat and bounded message log ([`channel`])
//! - Template upload with optional JPEG downsampling ([`upload`])
//! - UI command layer and optional Tauri plugin (`plugin` feature)
//!
//! # Usage
//! ```rust,ignore
//! use crabpush::{config::CrabPushConfig, testing::SimulatedBackend, PushConsole};
//! use std::sync::Arc;
//!
//! let console = PushConsole::new(Arc::new(SimulatedBackend::new()), CrabPushConfig::default())?;
//! console.mount().await;
//! console.session().start().await?;
//! // ...
//! console.unmount().await;
//! ```
pub mod channel;
pub mod commands;
pub mod config;
pub mod console;
pub mod errors;
pub mod guidance;
pub mod invariant_ppt;
pub mod permissions;
pub mod pusher;
pub mod session;
pub mod types;
pub mod upload;

#[cfg(feature = "plugin")]
pub mod plugin;

// Testing utilities - simulated vendor SDK for offline testing
pub mod testing;

// Re-exports for convenience
pub use channel::{ChannelState, ControlChannel};
pub use console::{ConsoleSnapshot, PushConsole};
pub use errors::{PushError, SdkError};
pub use guidance::{translate, GuidanceHints, GuidanceState};
pub use session::{PushSessionController, SessionEvent};
pub use types::{DeviceInfo, DeviceList, SessionSnapshot, SessionState};
pub use upload::{TemplateUploader, UploadOutcome};

#[cfg(feature = "plugin")]
pub use plugin::init;

/// Initialize logging for the push client
pub fn init_logging() {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "crabpush=info");
    }
    let _ = env_logger::try_init();
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Get crate information
pub fn get_info() -> CrateInfo {
    CrateInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: DESCRIPTION.to_string(),
        plugin_enabled: cfg!(feature = "plugin"),
    }
}

/// Crate information structure
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CrateInfo {
    pub name: String,
    pub version: String,
    pub description: String,
    pub plugin_enabled: bool,
}

#[cfg(test)]
mod lib_tests {
    use super::*;

    #[test]
    fn test_crate_info() {
        let info = get_info();
        assert_eq!(info.name, "crabpush");
        assert!(!info.version.is_empty());
        assert!(!info.description.is_empty());
    }
}
