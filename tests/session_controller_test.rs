//! Push session lifecycle against the simulated vendor backend.

use crabpush::config::CrabPushConfig;
use crabpush::errors::PushError;
use crabpush::invariant_ppt::{clear_invariant_log, contract_test, evaluations};
use crabpush::permissions::PermissionStatus;
use crabpush::pusher::{PushBackend, SupportReport};
use crabpush::session::{PushSessionController, SessionEvent};
use crabpush::testing::{PusherCall, PusherStep, SimulatedBackend};
use crabpush::types::{SessionState, VendorDevice, STATUS_LIVE, STATUS_NOT_CONNECTED};
use std::sync::Arc;
use std::time::Duration;

fn controller_for(backend: &SimulatedBackend) -> Arc<PushSessionController> {
    Arc::new(PushSessionController::new(
        Arc::new(backend.clone()),
        CrabPushConfig::default().push,
    ))
}

async fn wait_until_busy(controller: &PushSessionController) {
    while !controller.is_busy() {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn start_then_stop_leaves_nothing_running() {
    let backend = SimulatedBackend::new();
    let controller = controller_for(&backend);
    controller.initialize().await.unwrap();

    controller.start().await.unwrap();
    assert!(backend.pushing());
    assert!(backend.camera_running());
    assert_eq!(backend.live_pushers(), 1);

    controller.stop().await;

    let snapshot = controller.snapshot();
    assert_eq!(snapshot.state, SessionState::Idle);
    assert_eq!(snapshot.status_message, STATUS_NOT_CONNECTED);
    assert!(snapshot.session_id.is_none());
    assert_eq!(backend.live_pushers(), 0);
    assert!(!backend.pushing());
}

#[tokio::test]
async fn stop_is_idempotent() {
    let backend = SimulatedBackend::new();
    let controller = controller_for(&backend);

    controller.stop().await;
    assert!(backend.calls().is_empty());

    controller.start().await.unwrap();
    controller.stop().await;
    controller.stop().await;

    let stops = backend
        .calls()
        .into_iter()
        .filter(|call| *call == PusherCall::StopPush)
        .count();
    assert_eq!(stops, 1);
    assert_eq!(controller.snapshot().state, SessionState::Idle);
}

#[tokio::test]
async fn stop_swallows_vendor_errors() {
    let backend = SimulatedBackend::new();
    let controller = controller_for(&backend);
    controller.start().await.unwrap();

    backend.fail_at(PusherStep::StopPush);
    backend.fail_at(PusherStep::StopCamera);
    controller.stop().await;

    assert_eq!(controller.snapshot().state, SessionState::Idle);
    assert_eq!(backend.live_pushers(), 0);
}

#[tokio::test]
async fn unsupported_platform_is_a_capability_error() {
    let backend = SimulatedBackend::new();
    backend.set_support(SupportReport::unsupported("RTCPeerConnection missing"));
    let controller = controller_for(&backend);

    let err = controller.initialize().await.unwrap_err();
    assert!(matches!(err, PushError::Capability(_)));

    let snapshot = controller.snapshot();
    assert_eq!(snapshot.state, SessionState::Error);
    assert!(snapshot.status_message.contains("RTCPeerConnection missing"));
    assert!(controller.devices().is_empty());
    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn denied_permission_is_reported() {
    let backend = SimulatedBackend::new();
    backend.deny_permission();
    let controller = controller_for(&backend);

    let err = controller.initialize().await.unwrap_err();
    assert!(matches!(err, PushError::PermissionDenied(_)));

    let snapshot = controller.snapshot();
    assert_eq!(snapshot.state, SessionState::Error);
    assert!(snapshot.last_error.unwrap().contains("Permission denied"));
    assert!(controller.devices().is_empty());
}

#[tokio::test]
async fn enumeration_failure_is_a_device_error() {
    let backend = SimulatedBackend::new();
    backend.fail_at(PusherStep::GetDevicesList);
    let controller = controller_for(&backend);

    let err = controller.initialize().await.unwrap_err();
    assert!(matches!(err, PushError::Device(_)));
    assert_eq!(controller.snapshot().state, SessionState::Error);
    assert_eq!(backend.live_pushers(), 0);
    assert_eq!(backend.outstanding_grants(), 0);
}

#[tokio::test]
async fn first_camera_is_selected_only_once() {
    clear_invariant_log();
    let backend = SimulatedBackend::with_devices(vec![
        VendorDevice::video("cam-1", "USB Camera"),
        VendorDevice::video("cam-1", "USB Camera (duplicate)"),
        VendorDevice::video("cam-2", ""),
    ]);
    let controller = controller_for(&backend);

    let devices = controller.initialize().await.unwrap();
    assert_eq!(devices.len(), 2);
    assert_eq!(devices.entries()[1].label, "Camera 2");
    assert_eq!(controller.snapshot().selected_camera_id, "cam-1");

    controller.select_camera("cam-2").unwrap();
    controller.initialize().await.unwrap();
    assert_eq!(controller.snapshot().selected_camera_id, "cam-2");

    contract_test("device enumeration", &["Selected camera is listed or empty"]);
}

#[tokio::test]
async fn empty_device_list_is_valid() {
    let backend = SimulatedBackend::with_devices(vec![VendorDevice::audio("mic", "Mic")]);
    let controller = controller_for(&backend);

    let devices = controller.initialize().await.unwrap();
    assert!(devices.is_empty());
    assert_eq!(controller.snapshot().selected_camera_id, "");

    controller.start().await.unwrap();
    assert!(!backend
        .calls()
        .iter()
        .any(|call| matches!(call, PusherCall::SwitchCamera(_))));
}

#[tokio::test]
async fn every_failing_step_resets_to_idle() {
    let steps = [
        PusherStep::CreatePusher,
        PusherStep::SetRenderView,
        PusherStep::SetVideoQuality,
        PusherStep::SetProperty,
        PusherStep::SetLocalPreviewMuted,
        PusherStep::StartCamera,
        PusherStep::SwitchCamera,
        PusherStep::StartPush,
    ];

    for step in steps {
        let backend = SimulatedBackend::new();
        let controller = controller_for(&backend);
        controller.initialize().await.unwrap();
        backend.fail_at(step);

        let err = controller.start().await.unwrap_err();
        assert!(matches!(err, PushError::StreamStart(_)), "{:?}", step);

        let snapshot = controller.snapshot();
        assert_eq!(snapshot.state, SessionState::Idle, "{:?}", step);
        assert!(
            snapshot.last_error.unwrap().contains(step.operation()),
            "{:?}",
            step
        );
        assert_eq!(backend.live_pushers(), 0, "{:?}", step);
    }
}

#[tokio::test]
async fn start_can_be_retried_after_failure() {
    let backend = SimulatedBackend::new();
    let controller = controller_for(&backend);
    backend.fail_at(PusherStep::StartPush);
    assert!(controller.start().await.is_err());

    backend.clear_failures();
    controller.start().await.unwrap();

    let snapshot = controller.snapshot();
    assert_eq!(snapshot.state, SessionState::Streaming);
    assert_eq!(snapshot.status_message, STATUS_LIVE);
    assert!(snapshot.last_error.is_none());
}

#[tokio::test]
async fn start_while_streaming_is_invalid() {
    let backend = SimulatedBackend::new();
    let controller = controller_for(&backend);
    controller.start().await.unwrap();

    assert!(matches!(
        controller.start().await,
        Err(PushError::InvalidState(_))
    ));
    assert_eq!(backend.live_pushers(), 1);
}

#[tokio::test(start_paused = true)]
async fn concurrent_start_is_busy() {
    let backend = SimulatedBackend::new();
    backend.set_start_camera_delay(Duration::from_secs(1));
    let controller = controller_for(&backend);

    let first = {
        let controller = Arc::clone(&controller);
        tokio::spawn(async move { controller.start().await })
    };
    wait_until_busy(&controller).await;

    assert!(matches!(controller.start().await, Err(PushError::Busy(_))));
    assert!(matches!(
        controller.initialize().await,
        Err(PushError::Busy(_))
    ));
    assert!(matches!(
        controller.toggle_camera().await,
        Err(PushError::Busy(_))
    ));

    first.await.unwrap().unwrap();
    assert_eq!(controller.snapshot().state, SessionState::Streaming);
    assert_eq!(backend.live_pushers(), 1);
}

#[tokio::test(start_paused = true)]
async fn stop_waits_for_in_flight_start() {
    let backend = SimulatedBackend::new();
    backend.set_start_camera_delay(Duration::from_secs(1));
    let controller = controller_for(&backend);

    let start = {
        let controller = Arc::clone(&controller);
        tokio::spawn(async move { controller.start().await })
    };
    wait_until_busy(&controller).await;

    controller.stop().await;
    start.await.unwrap().unwrap();

    assert_eq!(controller.snapshot().state, SessionState::Idle);
    assert_eq!(backend.live_pushers(), 0);
}

#[tokio::test]
async fn toggle_flips_camera_and_keeps_flag_on_failure() {
    let backend = SimulatedBackend::new();
    let controller = controller_for(&backend);
    controller.start().await.unwrap();

    assert!(!controller.toggle_camera().await.unwrap());
    assert!(!backend.camera_running());
    assert!(!controller.snapshot().camera_enabled);

    assert!(controller.toggle_camera().await.unwrap());
    assert!(backend.camera_running());

    backend.fail_at(PusherStep::StopCamera);
    assert!(matches!(
        controller.toggle_camera().await,
        Err(PushError::Control(_))
    ));
    assert!(controller.snapshot().camera_enabled);
}

#[tokio::test]
async fn events_follow_the_lifecycle() {
    let backend = SimulatedBackend::new();
    let controller = controller_for(&backend);
    let mut events = controller.subscribe();

    controller.start().await.unwrap();
    backend.emit_status(1001, "Pushing stable");

    let mut states = Vec::new();
    let mut statuses = Vec::new();
    while let Ok(event) = events.try_recv() {
        match event {
            SessionEvent::StateChanged(snapshot) => states.push(snapshot.state),
            SessionEvent::Status(update) => statuses.push(update.message),
            SessionEvent::DevicesChanged(_) => {}
        }
    }

    assert_eq!(states.first(), Some(&SessionState::Initializing));
    assert!(states.contains(&SessionState::Streaming));
    assert_eq!(statuses, vec!["Pushing stable".to_string()]);
}

#[test]
fn toggle_without_pusher_completes_on_first_poll() {
    let backend = SimulatedBackend::new();
    let controller = controller_for(&backend);

    let mut toggle = tokio_test::task::spawn(controller.toggle_camera());
    let enabled = tokio_test::assert_ready_ok!(toggle.poll());
    assert!(enabled);
    assert!(backend.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn start_during_initialize_is_busy() {
    let backend = SimulatedBackend::new();
    backend.set_check_support_delay(Duration::from_millis(200));
    let controller = controller_for(&backend);

    let initializing = {
        let controller = Arc::clone(&controller);
        tokio::spawn(async move { controller.initialize().await })
    };
    wait_until_busy(&controller).await;

    assert!(matches!(controller.start().await, Err(PushError::Busy(_))));
    assert!(matches!(
        controller.select_camera("cam-back"),
        Err(PushError::Busy(_))
    ));
    assert_eq!(backend.live_pushers(), 0);

    initializing.await.unwrap().unwrap();
    assert_eq!(controller.snapshot().state, SessionState::Idle);

    controller.start().await.unwrap();
    let snapshot = controller.snapshot();
    assert_eq!(snapshot.state, SessionState::Streaming);
    assert_eq!(snapshot.status_message, STATUS_LIVE);
    assert_eq!(backend.live_pushers(), 1);
}

#[tokio::test]
async fn lifecycle_keeps_pusher_and_state_in_step() {
    clear_invariant_log();
    let backend = SimulatedBackend::new();
    let controller = controller_for(&backend);

    controller.start().await.unwrap();
    controller.stop().await;

    assert_eq!(evaluations("Live pusher iff streaming"), 2);
    contract_test("push lifecycle", &["Live pusher iff streaming"]);
}

#[tokio::test]
async fn vanished_camera_is_replaced_by_first_entry() {
    let backend = SimulatedBackend::new();
    let controller = controller_for(&backend);
    controller.initialize().await.unwrap();
    controller.select_camera("cam-back").unwrap();

    backend.set_devices(vec![VendorDevice::video("cam-usb", "USB Camera")]);
    controller.initialize().await.unwrap();
    assert_eq!(controller.snapshot().selected_camera_id, "cam-usb");

    backend.set_devices(Vec::new());
    controller.initialize().await.unwrap();
    assert_eq!(controller.snapshot().selected_camera_id, "");
}

#[tokio::test]
async fn scratch_pusher_does_not_hide_live_push() {
    let backend = SimulatedBackend::new();
    let controller = controller_for(&backend);
    controller.start().await.unwrap();

    let scratch = backend.create_pusher().unwrap();
    controller.enumerate_devices(scratch.as_ref()).await.unwrap();
    drop(scratch);

    assert!(backend.pushing());
    assert!(backend.camera_running());
    assert_eq!(backend.live_pushers(), 1);
}

#[tokio::test]
async fn preview_follows_selection_and_yields_to_push() {
    let backend = SimulatedBackend::new();
    let controller = controller_for(&backend);
    controller.initialize().await.unwrap();

    controller.start_preview().await.unwrap();
    assert!(controller.snapshot().preview_active);
    assert_eq!(backend.preview_device(), Some(Some("cam-front".to_string())));

    controller.change_camera("cam-back").await.unwrap();
    assert_eq!(backend.preview_device(), Some(Some("cam-back".to_string())));

    controller.start().await.unwrap();
    assert!(!backend.preview_active());
    assert!(!controller.snapshot().preview_active);
    assert!(matches!(
        controller.start_preview().await,
        Err(PushError::InvalidState(_))
    ));

    controller.stop().await;
    controller.stop_preview().await;
    assert!(!backend.preview_active());
}

#[tokio::test]
async fn preview_without_selection_uses_default_camera() {
    let backend = SimulatedBackend::with_devices(Vec::new());
    let controller = controller_for(&backend);
    controller.initialize().await.unwrap();

    controller.start_preview().await.unwrap();
    assert_eq!(backend.preview_device(), Some(None));
    assert!(backend.calls().contains(&PusherCall::OpenPreview(
        CrabPushConfig::default().push.render_view,
        None
    )));
}

#[tokio::test]
async fn failed_preview_is_a_device_error() {
    let backend = SimulatedBackend::new();
    backend.fail_at(PusherStep::OpenPreview);
    let controller = controller_for(&backend);

    assert!(matches!(
        controller.start_preview().await,
        Err(PushError::Device(_))
    ));
    assert!(!controller.snapshot().preview_active);

    // Releasing a preview that never opened is a no-op
    controller.stop_preview().await;
    assert!(!backend.calls().contains(&PusherCall::ClosePreview));
}

#[tokio::test]
async fn permission_is_learned_from_the_backend() {
    let backend = SimulatedBackend::new();
    let controller = controller_for(&backend);
    assert_eq!(controller.permission().status, PermissionStatus::NotDetermined);

    controller.initialize().await.unwrap();
    assert_eq!(controller.snapshot().permission, PermissionStatus::Granted);

    backend.deny_permission();
    let info = controller.request_permission().await;
    assert_eq!(info.status, PermissionStatus::Denied);
    assert_eq!(controller.permission(), info);
    assert_eq!(controller.snapshot().permission, PermissionStatus::Denied);
    assert_eq!(backend.outstanding_grants(), 0);
}
