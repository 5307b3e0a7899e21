use super::SessionEvent;
use crate::config::PushConfig;
use crate::assert_invariant;
use crate::errors::{PushError, Result, SdkError};
use crate::permissions::{self, PermissionInfo};
use crate::pusher::{
    CaptureGrant, PushBackend, PushObserver, PushStatusUpdate, Pusher, PROPERTY_VIDEO_FPS,
};
use crate::types::{
    DeviceList, SessionSnapshot, SessionState, STATUS_INITIALIZING, STATUS_LIVE,
    STATUS_NOT_CONNECTED, STATUS_PUSHING, STATUS_REQUESTING_PERMISSION,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::{broadcast, Mutex};

/// Snapshot and event sender, shared with the status observer.
struct SessionShared {
    state: RwLock<SessionSnapshot>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionShared {
    fn snapshot(&self) -> SessionSnapshot {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn update<F>(&self, change: F) -> SessionSnapshot
    where
        F: FnOnce(&mut SessionSnapshot),
    {
        let snapshot = {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            change(&mut state);
            state.clone()
        };
        let _ = self.events.send(SessionEvent::StateChanged(snapshot.clone()));
        snapshot
    }

    fn fail(&self, message: String) {
        log::error!("{}", message);
        self.update(|s| {
            s.state = SessionState::Error;
            s.status_message = message.clone();
            s.last_error = Some(message);
            s.session_id = None;
            s.started_at = None;
        });
    }
}

/// Routes vendor status updates into the snapshot of the session that registered it.
struct SessionObserver {
    shared: Arc<SessionShared>,
    session_id: String,
}

impl PushObserver for SessionObserver {
    fn on_push_status_update(&self, update: PushStatusUpdate) {
        log::debug!("Push status {}: {}", update.code, update.message);

        let current = self.shared.snapshot().session_id.as_deref() == Some(self.session_id.as_str());
        if current {
            let message = if update.message.is_empty() {
                STATUS_PUSHING.to_string()
            } else {
                update.message.clone()
            };
            self.shared.update(|s| s.status_message = message);
        }

        let _ = self.shared.events.send(SessionEvent::Status(update));
    }
}

/// Clears the lifecycle flag even if the owning call is cancelled midway.
struct Lifecycle<'a>(&'a AtomicBool);

impl Drop for Lifecycle<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Owns the vendor pusher lifecycle for one console
pub struct PushSessionController {
    backend: Arc<dyn PushBackend>,
    config: PushConfig,
    shared: Arc<SessionShared>,
    devices: RwLock<DeviceList>,
    pusher: Mutex<Option<Box<dyn Pusher>>>,
    preview: Mutex<Option<Box<dyn CaptureGrant>>>,
    permission: RwLock<PermissionInfo>,
    /// Set while `initialize`, `start` or `start_preview` runs
    busy: AtomicBool,
}

impl PushSessionController {
    pub fn new(backend: Arc<dyn PushBackend>, config: PushConfig) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            backend,
            config,
            shared: Arc::new(SessionShared {
                state: RwLock::new(SessionSnapshot::default()),
                events,
            }),
            devices: RwLock::new(DeviceList::default()),
            pusher: Mutex::new(None),
            preview: Mutex::new(None),
            permission: RwLock::new(PermissionInfo::default()),
            busy: AtomicBool::new(false),
        }
    }

    /// Claim the lifecycle flag, or fail with `Busy` if another call holds it.
    fn begin(&self, call: &str) -> Result<Lifecycle<'_>> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(PushError::Busy(format!(
                "cannot {} while another session call is in progress",
                call
            )));
        }
        Ok(Lifecycle(&self.busy))
    }

    /// Capability check, permission prompt and first device enumeration.
    pub async fn initialize(&self) -> Result<DeviceList> {
        let _lifecycle = self.begin("initialize")?;
        let state = self.shared.snapshot().state;
        if matches!(state, SessionState::Streaming | SessionState::Initializing) {
            return Err(PushError::InvalidState(format!(
                "cannot initialize while {}",
                state
            )));
        }

        log::info!("Initializing push session");

        match self.backend.check_support().await {
            Ok(report) if report.webrtc_supported => {}
            Ok(report) => {
                let detail = report
                    .detail
                    .unwrap_or_else(|| "WebRTC is not available".to_string());
                return Err(self.initialize_failed(PushError::Capability(detail)));
            }
            Err(e) => return Err(self.initialize_failed(PushError::Capability(e.to_string()))),
        }

        self.shared.update(|s| {
            s.state = SessionState::AcquiringPermission;
            s.status_message = STATUS_REQUESTING_PERMISSION.to_string();
        });

        match self.backend.acquire_camera().await {
            Ok(grant) => {
                grant.release();
                self.record_permission(PermissionInfo::granted());
            }
            Err(e) => {
                self.record_permission(PermissionInfo::denied(&e.message));
                return Err(self.initialize_failed(PushError::PermissionDenied(e.message)));
            }
        }

        let pusher = match self.backend.create_pusher() {
            Ok(pusher) => pusher,
            Err(e) => return Err(self.initialize_failed(PushError::Device(e.to_string()))),
        };
        let devices = match self.enumerate_devices(pusher.as_ref()).await {
            Ok(devices) => devices,
            Err(e) => return Err(self.initialize_failed(e)),
        };
        drop(pusher);

        self.shared.update(|s| {
            s.state = SessionState::Idle;
            s.status_message = STATUS_NOT_CONNECTED.to_string();
            s.last_error = None;
        });

        log::info!("Push session ready with {} camera(s)", devices.len());
        Ok(devices)
    }

    fn initialize_failed(&self, error: PushError) -> PushError {
        *self.devices.write().unwrap_or_else(PoisonError::into_inner) = DeviceList::default();
        self.shared.fail(error.to_string());
        error
    }

    /// Replace the device list from the pusher's device manager.
    pub async fn enumerate_devices(&self, pusher: &dyn Pusher) -> Result<DeviceList> {
        let vendor = pusher
            .device_manager()
            .get_devices_list()
            .await
            .map_err(|e| PushError::Device(e.to_string()))?;

        let devices = DeviceList::from_vendor(vendor);
        *self.devices.write().unwrap_or_else(PoisonError::into_inner) = devices.clone();

        // Keep a selection that is still listed; otherwise fall back to the first camera.
        let selected = self.shared.snapshot().selected_camera_id;
        if selected.is_empty() || !devices.contains(&selected) {
            let id = devices
                .first()
                .map(|first| first.device_id.clone())
                .unwrap_or_default();
            if id != selected {
                log::debug!("Auto-selecting camera {:?}", id);
                self.shared.update(|s| s.selected_camera_id = id);
            }
        }

        let selected = self.shared.snapshot().selected_camera_id;
        assert_invariant!(
            selected.is_empty() || devices.contains(&selected),
            "Selected camera is listed or empty",
            "PushSessionController::enumerate_devices"
        );

        let _ = self
            .shared
            .events
            .send(SessionEvent::DevicesChanged(devices.clone()));
        Ok(devices)
    }

    /// Choose the camera the next `start()` switches to.
    pub fn select_camera(&self, device_id: &str) -> Result<()> {
        if self.is_busy() {
            return Err(PushError::Busy(
                "cannot change camera while another session call is in progress".to_string(),
            ));
        }
        let state = self.shared.snapshot().state;
        if matches!(state, SessionState::Streaming | SessionState::Initializing) {
            return Err(PushError::InvalidState(
                "cannot change camera while pushing".to_string(),
            ));
        }
        if !self.devices().contains(device_id) {
            return Err(PushError::InvalidArgument(format!(
                "unknown camera: {}",
                device_id
            )));
        }

        let id = device_id.to_string();
        self.shared.update(|s| s.selected_camera_id = id);
        Ok(())
    }

    /// Select a camera and move a running local preview onto it.
    pub async fn change_camera(&self, device_id: &str) -> Result<()> {
        self.select_camera(device_id)?;
        if self.shared.snapshot().preview_active {
            self.start_preview().await?;
        }
        Ok(())
    }

    /// Show the selected camera, muted, on the render view without pushing.
    ///
    /// Replaces a preview that is already showing.
    pub async fn start_preview(&self) -> Result<()> {
        let _lifecycle = self.begin("start preview")?;
        let snapshot = self.shared.snapshot();
        if snapshot.is_streaming() {
            return Err(PushError::InvalidState(
                "the pusher owns the camera while streaming".to_string(),
            ));
        }

        let mut preview = self.preview.lock().await;
        if let Some(previous) = preview.take() {
            previous.release();
        }

        let device = Some(snapshot.selected_camera_id.as_str()).filter(|id| !id.is_empty());
        match self.backend.open_preview(&self.config.render_view, device).await {
            Ok(grant) => {
                *preview = Some(grant);
                log::info!("Local preview showing {}", device.unwrap_or("default camera"));
                self.shared.update(|s| s.preview_active = true);
                Ok(())
            }
            Err(e) => {
                log::warn!("Local preview unavailable: {}", e);
                self.shared.update(|s| s.preview_active = false);
                Err(PushError::Device(e.to_string()))
            }
        }
    }

    /// Release the local preview. Never fails; no-op without one.
    pub async fn stop_preview(&self) {
        let Some(grant) = self.preview.lock().await.take() else {
            return;
        };
        log::info!("Stopping local preview");
        grant.release();
        self.shared.update(|s| s.preview_active = false);
    }

    /// Ask the backend for camera access and remember the answer.
    pub async fn request_permission(&self) -> PermissionInfo {
        let info = permissions::request_permission(self.backend.as_ref()).await;
        self.record_permission(info.clone());
        info
    }

    /// Last permission answer from the backend
    pub fn permission(&self) -> PermissionInfo {
        self.permission
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record_permission(&self, info: PermissionInfo) {
        let status = info.status;
        *self.permission.write().unwrap_or_else(PoisonError::into_inner) = info;
        if self.shared.snapshot().permission != status {
            self.shared.update(|s| s.permission = status);
        }
    }

    /// Create a pusher and start pushing to the configured destination.
    pub async fn start(&self) -> Result<()> {
        let _lifecycle = self.begin("start push")?;

        let mut slot = self.pusher.lock().await;

        let current = self.shared.snapshot();
        if !matches!(current.state, SessionState::Idle | SessionState::Error) || slot.is_some() {
            return Err(PushError::InvalidState(format!(
                "cannot start while {}",
                current.state
            )));
        }

        // The pusher opens the camera itself
        self.stop_preview().await;

        let session_id = uuid::Uuid::new_v4().to_string();
        log::info!(
            "Starting push session {} to {}",
            session_id,
            self.config.destination_url
        );

        let sid = session_id.clone();
        self.shared.update(|s| {
            s.state = SessionState::Initializing;
            s.status_message = STATUS_INITIALIZING.to_string();
            s.last_error = None;
            s.session_id = Some(sid);
            s.started_at = None;
        });

        let mut pusher = match self.backend.create_pusher() {
            Ok(pusher) => pusher,
            Err(e) => return Err(self.start_failed(e)),
        };

        if let Err(e) = self
            .run_start_sequence(pusher.as_mut(), &session_id, &current.selected_camera_id)
            .await
        {
            teardown(pusher.as_mut()).await;
            return Err(self.start_failed(e));
        }

        *slot = Some(pusher);
        let live = self.shared.update(|s| {
            s.state = SessionState::Streaming;
            s.status_message = STATUS_LIVE.to_string();
            s.camera_enabled = true;
            s.started_at = Some(chrono::Utc::now());
        });
        assert_invariant!(
            slot.is_some() && live.is_streaming(),
            "Live pusher iff streaming",
            "PushSessionController::start"
        );

        log::info!("Push session {} is live", session_id);
        Ok(())
    }

    async fn run_start_sequence(
        &self,
        pusher: &mut dyn Pusher,
        session_id: &str,
        camera_id: &str,
    ) -> std::result::Result<(), SdkError> {
        pusher.set_render_view(&self.config.render_view)?;
        pusher.set_video_quality(self.config.video_quality)?;
        pusher.set_property(PROPERTY_VIDEO_FPS, serde_json::json!(self.config.video_fps))?;
        pusher.set_local_preview_muted(self.config.mute_local_preview)?;
        pusher.set_observer(Arc::new(SessionObserver {
            shared: Arc::clone(&self.shared),
            session_id: session_id.to_string(),
        }));

        pusher.start_camera().await?;
        if !camera_id.is_empty() {
            pusher.device_manager().switch_camera(camera_id).await?;
        }
        pusher.start_push(&self.config.destination_url).await
    }

    fn start_failed(&self, error: SdkError) -> PushError {
        let message = format!("Failed to start push: {}", error);
        log::error!("{}", message);

        self.shared.update(|s| {
            s.state = SessionState::Idle;
            s.status_message = STATUS_NOT_CONNECTED.to_string();
            s.last_error = Some(message);
            s.session_id = None;
            s.started_at = None;
        });

        PushError::StreamStart(error.to_string())
    }

    /// Stop pushing and release the pusher. Never fails.
    pub async fn stop(&self) {
        let mut slot = self.pusher.lock().await;
        let Some(mut pusher) = slot.take() else {
            log::debug!("Stop requested without an active pusher");
            return;
        };

        log::info!("Stopping push session");
        teardown(pusher.as_mut()).await;
        drop(pusher);

        let idle = self.shared.update(|s| {
            s.state = SessionState::Idle;
            s.status_message = STATUS_NOT_CONNECTED.to_string();
            s.camera_enabled = true;
            s.session_id = None;
            s.started_at = None;
        });
        assert_invariant!(
            slot.is_none() && !idle.is_streaming(),
            "Live pusher iff streaming",
            "PushSessionController::stop"
        );
    }

    /// Turn local capture off or back on. Returns the new camera flag.
    pub async fn toggle_camera(&self) -> Result<bool> {
        if self.is_busy() {
            return Err(PushError::Busy(
                "cannot toggle camera while another session call is in progress".to_string(),
            ));
        }
        let mut slot = self
            .pusher
            .try_lock()
            .map_err(|_| PushError::Busy("push lifecycle call in progress".to_string()))?;

        let enabled = self.shared.snapshot().camera_enabled;
        let Some(pusher) = slot.as_mut() else {
            return Ok(enabled);
        };

        let result = if enabled {
            pusher.stop_camera().await
        } else {
            pusher.start_camera().await
        };
        result.map_err(|e| PushError::Control(e.to_string()))?;

        let next = !enabled;
        log::info!("Camera {}", if next { "enabled" } else { "disabled" });
        self.shared.update(|s| s.camera_enabled = next);
        Ok(next)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.shared.snapshot()
    }

    pub fn devices(&self) -> DeviceList {
        self.devices
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn backend(&self) -> &dyn PushBackend {
        self.backend.as_ref()
    }

    /// True while `initialize`, `start` or `start_preview` is running
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.shared.events.subscribe()
    }
}

/// Best-effort stop of a pusher that may be partially started.
async fn teardown(pusher: &mut dyn Pusher) {
    if let Err(e) = pusher.stop_push().await {
        log::warn!("Ignoring stop push error: {}", e);
    }
    if let Err(e) = pusher.stop_camera().await {
        log::warn!("Ignoring stop camera error: {}", e);
    }
}
