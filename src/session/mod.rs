//! Push session lifecycle
//!
//! [`PushSessionController`] drives one vendor pusher at a time through
//! permission, device enumeration, start, camera toggling and stop, and
//! publishes [`SessionSnapshot`]s plus a stream of [`SessionEvent`]s.

mod controller;

pub use controller::PushSessionController;

use crate::pusher::PushStatusUpdate;
use crate::types::{DeviceList, SessionSnapshot};

/// Broadcast to subscribers whenever the session changes
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    StateChanged(SessionSnapshot),
    Status(PushStatusUpdate),
    DevicesChanged(DeviceList),
}
