//! In-process stand-in for a vendor push SDK
//!
//! Records every SDK call, can fail any step on demand, and tracks live
//! pushers, local previews and outstanding capture grants so tests can
//! assert on teardown. Camera and push flags are kept per pusher, so a
//! short-lived pusher never hides the state of a live one.

use crate::errors::SdkError;
use crate::pusher::{
    CaptureGrant, DeviceManager, PushBackend, PushObserver, PushStatusUpdate, Pusher,
    SupportReport, VideoQuality,
};
use crate::types::VendorDevice;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// A vendor call that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PusherStep {
    CreatePusher,
    SetRenderView,
    SetVideoQuality,
    SetProperty,
    SetLocalPreviewMuted,
    StartCamera,
    StopCamera,
    SwitchCamera,
    StartPush,
    StopPush,
    GetDevicesList,
    OpenPreview,
}

impl PusherStep {
    /// Name of the SDK method this step stands for
    pub fn operation(&self) -> &'static str {
        match self {
            PusherStep::CreatePusher => "createPusher",
            PusherStep::SetRenderView => "setRenderView",
            PusherStep::SetVideoQuality => "setVideoQuality",
            PusherStep::SetProperty => "setProperty",
            PusherStep::SetLocalPreviewMuted => "setLocalPreviewMuted",
            PusherStep::StartCamera => "startCamera",
            PusherStep::StopCamera => "stopCamera",
            PusherStep::SwitchCamera => "switchCamera",
            PusherStep::StartPush => "startPush",
            PusherStep::StopPush => "stopPush",
            PusherStep::GetDevicesList => "getDevicesList",
            PusherStep::OpenPreview => "startLocalPreview",
        }
    }
}

/// One recorded vendor call
#[derive(Debug, Clone, PartialEq)]
pub enum PusherCall {
    CreatePusher,
    SetRenderView(String),
    SetVideoQuality(VideoQuality),
    SetProperty(String, serde_json::Value),
    SetLocalPreviewMuted(bool),
    SetObserver,
    StartCamera,
    StopCamera,
    SwitchCamera(String),
    StartPush(String),
    StopPush,
    GetDevicesList,
    /// Preview opened on a view, for a camera or the default one
    OpenPreview(String, Option<String>),
    ClosePreview,
}

struct SimState {
    support: SupportReport,
    permission_granted: bool,
    devices: Vec<VendorDevice>,
    failing: HashSet<PusherStep>,
    start_camera_delay: Option<Duration>,
    check_support_delay: Option<Duration>,
    calls: Vec<PusherCall>,
    next_pusher_id: u64,
    live_pushers: usize,
    outstanding_grants: usize,
    /// Ids of pushers whose camera is on
    cameras: HashSet<u64>,
    /// Ids of pushers that are pushing
    pushing: HashSet<u64>,
    preview_device: Option<Option<String>>,
    observer: Option<Arc<dyn PushObserver>>,
}

/// Simulated vendor backend. Clones share state.
#[derive(Clone)]
pub struct SimulatedBackend {
    state: Arc<Mutex<SimState>>,
}

impl Default for SimulatedBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedBackend {
    /// Supported platform, permission granted, two cameras and a microphone.
    pub fn new() -> Self {
        Self::with_devices(vec![
            VendorDevice::video("cam-front", "Front Camera"),
            VendorDevice::audio("mic-default", "Default Microphone"),
            VendorDevice::video("cam-back", "Back Camera"),
        ])
    }

    pub fn with_devices(devices: Vec<VendorDevice>) -> Self {
        Self {
            state: Arc::new(Mutex::new(SimState {
                support: SupportReport::supported(),
                permission_granted: true,
                devices,
                failing: HashSet::new(),
                start_camera_delay: None,
                check_support_delay: None,
                calls: Vec::new(),
                next_pusher_id: 0,
                live_pushers: 0,
                outstanding_grants: 0,
                cameras: HashSet::new(),
                pushing: HashSet::new(),
                preview_device: None,
                observer: None,
            })),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_support(&self, support: SupportReport) {
        self.lock().support = support;
    }

    pub fn deny_permission(&self) {
        self.lock().permission_granted = false;
    }

    pub fn set_devices(&self, devices: Vec<VendorDevice>) {
        self.lock().devices = devices;
    }

    pub fn fail_at(&self, step: PusherStep) {
        self.lock().failing.insert(step);
    }

    pub fn clear_failures(&self) {
        self.lock().failing.clear();
    }

    /// Make `start_camera` take this long, to hold a start in flight.
    pub fn set_start_camera_delay(&self, delay: Duration) {
        self.lock().start_camera_delay = Some(delay);
    }

    /// Make `check_support` take this long, to hold an initialize in flight.
    pub fn set_check_support_delay(&self, delay: Duration) {
        self.lock().check_support_delay = Some(delay);
    }

    pub fn calls(&self) -> Vec<PusherCall> {
        self.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    pub fn live_pushers(&self) -> usize {
        self.lock().live_pushers
    }

    pub fn outstanding_grants(&self) -> usize {
        self.lock().outstanding_grants
    }

    /// Whether any live pusher has its camera on
    pub fn camera_running(&self) -> bool {
        !self.lock().cameras.is_empty()
    }

    /// Whether any live pusher is pushing
    pub fn pushing(&self) -> bool {
        !self.lock().pushing.is_empty()
    }

    pub fn preview_active(&self) -> bool {
        self.lock().preview_device.is_some()
    }

    /// Camera the open preview shows; `Some(None)` is the default camera.
    pub fn preview_device(&self) -> Option<Option<String>> {
        self.lock().preview_device.clone()
    }

    /// Deliver a status update to the most recently registered observer.
    pub fn emit_status(&self, code: i32, message: &str) {
        let observer = self.lock().observer.clone();
        if let Some(observer) = observer {
            observer.on_push_status_update(PushStatusUpdate {
                code,
                message: message.to_string(),
            });
        }
    }

    fn record(&self, call: PusherCall, step: PusherStep) -> Result<(), SdkError> {
        let mut state = self.lock();
        state.calls.push(call);
        if state.failing.contains(&step) {
            return Err(SdkError::new(step.operation(), "simulated failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl PushBackend for SimulatedBackend {
    async fn check_support(&self) -> Result<SupportReport, SdkError> {
        let delay = self.lock().check_support_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.lock().support.clone())
    }

    async fn acquire_camera(&self) -> Result<Box<dyn CaptureGrant>, SdkError> {
        let mut state = self.lock();
        if !state.permission_granted {
            return Err(SdkError::new("getUserMedia", "NotAllowedError: Permission denied"));
        }
        state.outstanding_grants += 1;
        Ok(Box::new(SimulatedGrant {
            backend: self.clone(),
            released: false,
        }))
    }

    async fn open_preview(
        &self,
        view_id: &str,
        device_id: Option<&str>,
    ) -> Result<Box<dyn CaptureGrant>, SdkError> {
        let device = device_id.map(str::to_string);
        self.record(
            PusherCall::OpenPreview(view_id.to_string(), device.clone()),
            PusherStep::OpenPreview,
        )?;

        let mut state = self.lock();
        if !state.permission_granted {
            return Err(SdkError::new(
                PusherStep::OpenPreview.operation(),
                "NotAllowedError: Permission denied",
            ));
        }
        state.preview_device = Some(device);
        Ok(Box::new(SimulatedPreview {
            backend: self.clone(),
            open: true,
        }))
    }

    fn create_pusher(&self) -> Result<Box<dyn Pusher>, SdkError> {
        self.record(PusherCall::CreatePusher, PusherStep::CreatePusher)?;
        let id = {
            let mut state = self.lock();
            state.live_pushers += 1;
            state.next_pusher_id += 1;
            state.next_pusher_id
        };
        Ok(Box::new(SimulatedPusher {
            id,
            devices: SimulatedDevices {
                backend: self.clone(),
            },
        }))
    }
}

struct SimulatedPreview {
    backend: SimulatedBackend,
    open: bool,
}

impl SimulatedPreview {
    fn close_once(&mut self) {
        if self.open {
            self.open = false;
            let mut state = self.backend.lock();
            state.calls.push(PusherCall::ClosePreview);
            state.preview_device = None;
        }
    }
}

impl CaptureGrant for SimulatedPreview {
    fn release(mut self: Box<Self>) {
        self.close_once();
    }
}

impl Drop for SimulatedPreview {
    fn drop(&mut self) {
        self.close_once();
    }
}

struct SimulatedGrant {
    backend: SimulatedBackend,
    released: bool,
}

impl SimulatedGrant {
    fn release_once(&mut self) {
        if !self.released {
            self.released = true;
            self.backend.lock().outstanding_grants -= 1;
        }
    }
}

impl CaptureGrant for SimulatedGrant {
    fn release(mut self: Box<Self>) {
        self.release_once();
    }
}

impl Drop for SimulatedGrant {
    fn drop(&mut self) {
        self.release_once();
    }
}

struct SimulatedDevices {
    backend: SimulatedBackend,
}

#[async_trait]
impl DeviceManager for SimulatedDevices {
    async fn get_devices_list(&self) -> Result<Vec<VendorDevice>, SdkError> {
        self.backend
            .record(PusherCall::GetDevicesList, PusherStep::GetDevicesList)?;
        Ok(self.backend.lock().devices.clone())
    }

    async fn switch_camera(&self, device_id: &str) -> Result<(), SdkError> {
        self.backend.record(
            PusherCall::SwitchCamera(device_id.to_string()),
            PusherStep::SwitchCamera,
        )
    }
}

/// Pusher handed out by [`SimulatedBackend`]
pub struct SimulatedPusher {
    id: u64,
    devices: SimulatedDevices,
}

impl SimulatedPusher {
    fn backend(&self) -> &SimulatedBackend {
        &self.devices.backend
    }
}

#[async_trait]
impl Pusher for SimulatedPusher {
    fn set_render_view(&mut self, view_id: &str) -> Result<(), SdkError> {
        self.backend().record(
            PusherCall::SetRenderView(view_id.to_string()),
            PusherStep::SetRenderView,
        )
    }

    fn set_local_preview_muted(&mut self, muted: bool) -> Result<(), SdkError> {
        self.backend().record(
            PusherCall::SetLocalPreviewMuted(muted),
            PusherStep::SetLocalPreviewMuted,
        )
    }

    fn set_video_quality(&mut self, quality: VideoQuality) -> Result<(), SdkError> {
        self.backend().record(
            PusherCall::SetVideoQuality(quality),
            PusherStep::SetVideoQuality,
        )
    }

    fn set_property(&mut self, key: &str, value: serde_json::Value) -> Result<(), SdkError> {
        self.backend().record(
            PusherCall::SetProperty(key.to_string(), value),
            PusherStep::SetProperty,
        )
    }

    fn set_observer(&mut self, observer: Arc<dyn PushObserver>) {
        let mut state = self.backend().lock();
        state.calls.push(PusherCall::SetObserver);
        state.observer = Some(observer);
    }

    async fn start_camera(&mut self) -> Result<(), SdkError> {
        let delay = self.backend().lock().start_camera_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.backend()
            .record(PusherCall::StartCamera, PusherStep::StartCamera)?;
        self.backend().lock().cameras.insert(self.id);
        Ok(())
    }

    async fn stop_camera(&mut self) -> Result<(), SdkError> {
        self.backend()
            .record(PusherCall::StopCamera, PusherStep::StopCamera)?;
        self.backend().lock().cameras.remove(&self.id);
        Ok(())
    }

    async fn start_push(&mut self, url: &str) -> Result<(), SdkError> {
        self.backend()
            .record(PusherCall::StartPush(url.to_string()), PusherStep::StartPush)?;
        self.backend().lock().pushing.insert(self.id);
        Ok(())
    }

    async fn stop_push(&mut self) -> Result<(), SdkError> {
        self.backend()
            .record(PusherCall::StopPush, PusherStep::StopPush)?;
        self.backend().lock().pushing.remove(&self.id);
        Ok(())
    }

    fn device_manager(&self) -> &dyn DeviceManager {
        &self.devices
    }
}

impl Drop for SimulatedPusher {
    fn drop(&mut self) {
        let id = self.id;
        let mut state = self.backend().lock();
        state.live_pushers = state.live_pushers.saturating_sub(1);
        state.cameras.remove(&id);
        state.pushing.remove(&id);
    }
}
