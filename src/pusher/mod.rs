//! Vendor push SDK interface
//!
//! The push SDK (capture, encoding, WebRTC/RTS transport) is an opaque
//! collaborator. Adapters for a concrete SDK implement these traits and are
//! injected into [`crate::session::PushSessionController`]; the
//! [`crate::testing`] module provides an in-process double.

use crate::errors::SdkError;
use crate::types::VendorDevice;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Property key for the capture frame rate
pub const PROPERTY_VIDEO_FPS: &str = "setVideoFPS";

/// Video quality preset understood by the pusher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VideoQuality {
    #[serde(rename = "360p")]
    P360,
    #[serde(rename = "480p")]
    P480,
    #[serde(rename = "540p")]
    P540,
    #[serde(rename = "720p")]
    P720,
    #[serde(rename = "1080p")]
    P1080,
}

impl VideoQuality {
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoQuality::P360 => "360p",
            VideoQuality::P480 => "480p",
            VideoQuality::P540 => "540p",
            VideoQuality::P720 => "720p",
            VideoQuality::P1080 => "1080p",
        }
    }
}

impl std::fmt::Display for VideoQuality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of the platform capability predicate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportReport {
    pub webrtc_supported: bool,
    pub detail: Option<String>,
}

impl SupportReport {
    pub fn supported() -> Self {
        Self {
            webrtc_supported: true,
            detail: None,
        }
    }

    pub fn unsupported(detail: impl Into<String>) -> Self {
        Self {
            webrtc_supported: false,
            detail: Some(detail.into()),
        }
    }
}

/// Status event emitted by the pusher while it runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushStatusUpdate {
    pub code: i32,
    pub message: String,
}

/// Receives vendor status callbacks.
pub trait PushObserver: Send + Sync {
    fn on_push_status_update(&self, update: PushStatusUpdate);
}

/// Camera access held outside a pusher: the one-shot permission check or a
/// local preview.
///
/// Dropping or releasing the grant stops every track it holds.
pub trait CaptureGrant: Send {
    fn release(self: Box<Self>);
}

#[async_trait]
pub trait DeviceManager: Send + Sync {
    async fn get_devices_list(&self) -> Result<Vec<VendorDevice>, SdkError>;
    async fn switch_camera(&self, device_id: &str) -> Result<(), SdkError>;
}

/// One pusher instance. Each push attempt creates a fresh one.
#[async_trait]
pub trait Pusher: Send + Sync {
    fn set_render_view(&mut self, view_id: &str) -> Result<(), SdkError>;
    fn set_local_preview_muted(&mut self, muted: bool) -> Result<(), SdkError>;
    fn set_video_quality(&mut self, quality: VideoQuality) -> Result<(), SdkError>;
    fn set_property(&mut self, key: &str, value: serde_json::Value) -> Result<(), SdkError>;
    fn set_observer(&mut self, observer: Arc<dyn PushObserver>);

    async fn start_camera(&mut self) -> Result<(), SdkError>;
    async fn stop_camera(&mut self) -> Result<(), SdkError>;
    async fn start_push(&mut self, url: &str) -> Result<(), SdkError>;
    async fn stop_push(&mut self) -> Result<(), SdkError>;

    fn device_manager(&self) -> &dyn DeviceManager;
}

/// Entry point of a vendor SDK: capability check, permission prompt, constructor.
#[async_trait]
pub trait PushBackend: Send + Sync {
    async fn check_support(&self) -> Result<SupportReport, SdkError>;

    /// Open the camera once so the platform asks for permission.
    async fn acquire_camera(&self) -> Result<Box<dyn CaptureGrant>, SdkError>;

    /// Show the camera, muted, on `view_id` without pushing. Uses the
    /// platform default camera when `device_id` is `None`.
    async fn open_preview(
        &self,
        view_id: &str,
        device_id: Option<&str>,
    ) -> Result<Box<dyn CaptureGrant>, SdkError>;

    fn create_pusher(&self) -> Result<Box<dyn Pusher>, SdkError>;
}
