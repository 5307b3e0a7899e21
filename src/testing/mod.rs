//! Testing utilities for CrabPush
//!
//! A simulated vendor push SDK and synthetic template images, used by the
//! test suite, the CLI `simulate` command and benchmarks.

pub mod simulated;
pub mod synthetic_data;

pub use simulated::{PusherCall, PusherStep, SimulatedBackend, SimulatedPusher};
pub use synthetic_data::{gradient_image, synthetic_png, unsupported_image_bytes};
