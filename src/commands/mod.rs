//! UI command layer
//!
//! Async functions over a [`crate::PushConsole`] returning `Result<T, String>`
//! so they can be exposed directly as frontend commands. The `plugin`
//! feature registers thin Tauri wrappers around them.

pub mod channel;
pub mod config;
pub mod permissions;
pub mod session;
pub mod upload;

pub use channel::*;
pub use config::*;
pub use permissions::*;
pub use session::*;
pub use upload::*;
