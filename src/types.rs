//! Shared value types exposed to the UI layer as read-only snapshots.

use crate::permissions::PermissionStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Kind of media device reported by the vendor device manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    Video,
    Audio,
}

/// Raw device entry as returned by `DeviceManager::get_devices_list`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorDevice {
    pub device_id: String,
    pub device_name: String,
    pub kind: DeviceKind,
}

impl VendorDevice {
    pub fn video(device_id: impl Into<String>, device_name: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            device_name: device_name.into(),
            kind: DeviceKind::Video,
        }
    }

    pub fn audio(device_id: impl Into<String>, device_name: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            device_name: device_name.into(),
            kind: DeviceKind::Audio,
        }
    }
}

/// Selectable camera
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub device_id: String,
    pub label: String,
}

/// Ordered camera list, unique by `device_id`. Replaced wholesale, never edited.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceList {
    entries: Vec<DeviceInfo>,
}

impl DeviceList {
    /// Keep video entries only, drop repeated ids (first wins) and fill empty labels.
    pub fn from_vendor(devices: Vec<VendorDevice>) -> Self {
        let mut seen = HashSet::new();
        let mut entries = Vec::new();

        for device in devices {
            if device.kind != DeviceKind::Video {
                continue;
            }
            if !seen.insert(device.device_id.clone()) {
                log::debug!("Dropping duplicate camera entry {}", device.device_id);
                continue;
            }
            let label = if device.device_name.trim().is_empty() {
                format!("Camera {}", entries.len() + 1)
            } else {
                device.device_name
            };
            entries.push(DeviceInfo {
                device_id: device.device_id,
                label,
            });
        }

        Self { entries }
    }

    pub fn entries(&self) -> &[DeviceInfo] {
        &self.entries
    }

    pub fn first(&self) -> Option<&DeviceInfo> {
        self.entries.first()
    }

    pub fn contains(&self, device_id: &str) -> bool {
        self.entries.iter().any(|d| d.device_id == device_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Push session lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Idle,
    AcquiringPermission,
    Initializing,
    Streaming,
    Error,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Idle => write!(f, "idle"),
            SessionState::AcquiringPermission => write!(f, "acquiring_permission"),
            SessionState::Initializing => write!(f, "initializing"),
            SessionState::Streaming => write!(f, "streaming"),
            SessionState::Error => write!(f, "error"),
        }
    }
}

/// Point-in-time view of the push session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub status_message: String,
    pub camera_enabled: bool,
    pub selected_camera_id: String,
    pub last_error: Option<String>,
    pub session_id: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    /// A muted local preview is showing outside any push
    pub preview_active: bool,
    pub permission: PermissionStatus,
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self {
            state: SessionState::Idle,
            status_message: STATUS_NOT_CONNECTED.to_string(),
            camera_enabled: true,
            selected_camera_id: String::new(),
            last_error: None,
            session_id: None,
            started_at: None,
            preview_active: false,
            permission: PermissionStatus::NotDetermined,
        }
    }
}

impl SessionSnapshot {
    pub fn is_streaming(&self) -> bool {
        self.state == SessionState::Streaming
    }
}

pub const STATUS_NOT_CONNECTED: &str = "Not connected";
pub const STATUS_REQUESTING_PERMISSION: &str = "Requesting camera permission...";
pub const STATUS_INITIALIZING: &str = "Initializing pusher...";
pub const STATUS_LIVE: &str = "Live";
pub const STATUS_PUSHING: &str = "Pushing";
