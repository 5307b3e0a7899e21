//! Camera permission as reported by the push backend
//!
//! The crate never inspects host video devices for camera access. Permission is learned
//! from the vendor backend only: the transient capture made while a session
//! initializes, or an explicit [`request_permission`]. Until one of those
//! runs the status is `NotDetermined`.

use crate::pusher::PushBackend;
use serde::{Deserialize, Serialize};

/// Permission status enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PermissionStatus {
    /// Permission granted
    Granted,
    /// Permission denied
    Denied,
    /// Permission not determined (backend hasn't been asked yet)
    NotDetermined,
}

impl std::fmt::Display for PermissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PermissionStatus::Granted => write!(f, "granted"),
            PermissionStatus::Denied => write!(f, "denied"),
            PermissionStatus::NotDetermined => write!(f, "not_determined"),
        }
    }
}

/// Detailed permission information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionInfo {
    pub status: PermissionStatus,
    pub message: String,
    pub can_request: bool,
}

impl PermissionInfo {
    pub fn not_determined() -> Self {
        Self {
            status: PermissionStatus::NotDetermined,
            message: "Camera permission has not been requested yet".to_string(),
            can_request: true,
        }
    }

    pub fn granted() -> Self {
        Self {
            status: PermissionStatus::Granted,
            message: "Camera access granted".to_string(),
            can_request: false,
        }
    }

    pub fn denied(reason: &str) -> Self {
        Self {
            status: PermissionStatus::Denied,
            message: format!("Camera access denied: {}", reason),
            can_request: true,
        }
    }
}

impl Default for PermissionInfo {
    fn default() -> Self {
        Self::not_determined()
    }
}

/// Trigger the permission prompt by opening and immediately releasing the camera.
pub async fn request_permission(backend: &dyn PushBackend) -> PermissionInfo {
    log::info!("Requesting camera permission through push backend");

    match backend.acquire_camera().await {
        Ok(grant) => {
            grant.release();
            PermissionInfo::granted()
        }
        Err(e) => {
            log::warn!("Camera permission denied: {}", e);
            PermissionInfo::denied(&e.message)
        }
    }
}
