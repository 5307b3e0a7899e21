//! Command layer over a console backed by the simulated SDK.

use crabpush::commands;
use crabpush::config::CrabPushConfig;
use crabpush::console::PushConsole;
use crabpush::permissions::PermissionStatus;
use crabpush::testing::{synthetic_png, PusherStep, SimulatedBackend};
use crabpush::types::SessionState;
use crabpush::ChannelState;
use std::sync::Arc;

fn console_with(backend: &SimulatedBackend) -> PushConsole {
    let mut config = CrabPushConfig::default();
    config.channel.url = "ws://127.0.0.1:9/ws".to_string();
    config.upload.endpoint = "http://127.0.0.1:9/push".to_string();
    PushConsole::new(Arc::new(backend.clone()), config).unwrap()
}

#[tokio::test]
async fn test_session_commands_round_trip() {
    let backend = SimulatedBackend::new();
    let console = console_with(&backend);

    let devices = commands::initialize_push_session(&console).await.unwrap();
    assert_eq!(devices.len(), 2);

    commands::select_push_camera(&console, "cam-back".to_string())
        .await
        .unwrap();

    let live = commands::start_push(&console).await.unwrap();
    assert_eq!(live.state, SessionState::Streaming);
    assert_eq!(live.selected_camera_id, "cam-back");

    assert!(!commands::toggle_push_camera(&console).await.unwrap());

    let stopped = commands::stop_push(&console).await.unwrap();
    assert_eq!(stopped.state, SessionState::Idle);
    assert_eq!(backend.live_pushers(), 0);
}

#[tokio::test]
async fn test_errors_become_strings() {
    let backend = SimulatedBackend::new();
    backend.fail_at(PusherStep::StartPush);
    let console = console_with(&backend);

    let err = commands::start_push(&console).await.unwrap_err();
    assert!(err.contains("Stream start error"));

    let err = commands::select_push_camera(&console, "missing".to_string())
        .await
        .unwrap_err();
    assert!(err.contains("unknown camera"));

    let err = commands::submit_alignment(&console, 50.0, "waist".to_string(), 0.0)
        .await
        .unwrap_err();
    assert!(err.contains("waist"));
}

#[tokio::test]
async fn test_channel_commands_without_server() {
    let backend = SimulatedBackend::new();
    let console = console_with(&backend);

    let snapshot = commands::connect_control_channel(&console, None).await.unwrap();
    assert_eq!(snapshot.state, ChannelState::Degraded);

    assert!(commands::connect_control_channel(&console, Some("http://nope".to_string()))
        .await
        .is_err());

    commands::close_control_channel(&console).await.unwrap();
    let status = commands::get_channel_status(&console).await.unwrap();
    assert_eq!(status.state, ChannelState::Closed);
    assert!(commands::get_channel_messages(&console).await.unwrap().is_empty());
    assert!(commands::get_guidance_hints(&console).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_template_selection_from_disk() {
    let backend = SimulatedBackend::new();
    let console = console_with(&backend);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("template.png");
    std::fs::write(&path, synthetic_png(32, 16)).unwrap();

    let name = commands::select_template_file(&console, path.to_string_lossy().to_string())
        .await
        .unwrap();
    assert_eq!(name, "template.png");

    // Backend is unreachable, so the upload is reported rather than raised
    let outcome = commands::upload_template(&console, true).await.unwrap();
    assert!(!outcome.is_delivered());

    assert!(commands::select_template_file(&console, "/no/such/file.png".to_string())
        .await
        .is_err());
}

#[tokio::test]
async fn test_config_commands_save_and_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("crabpush.toml").to_string_lossy().to_string();

    let mut config = CrabPushConfig::default();
    config.push.video_fps = 15;
    commands::save_config(config.clone(), Some(path.clone()))
        .await
        .unwrap();

    let loaded = commands::load_config(Some(path.clone())).await.unwrap();
    assert_eq!(loaded.push.video_fps, 15);

    let reset = commands::reset_config(Some(path.clone())).await.unwrap();
    assert_eq!(reset, CrabPushConfig::default());

    config.push.video_fps = 0;
    assert!(commands::save_config(config, Some(path)).await.is_err());
}

#[tokio::test]
async fn test_mount_and_unmount_commands() {
    let backend = SimulatedBackend::new();
    let console = console_with(&backend);

    let mounted = commands::mount_console(&console).await.unwrap();
    assert!(mounted.mounted);
    assert_eq!(mounted.devices.len(), 2);
    assert!(mounted.session.preview_active);

    commands::select_push_camera(&console, "cam-back".to_string())
        .await
        .unwrap();
    assert_eq!(backend.preview_device(), Some(Some("cam-back".to_string())));

    commands::start_push(&console).await.unwrap();
    commands::unmount_console(&console).await.unwrap();
    commands::unmount_console(&console).await.unwrap();

    let snapshot = commands::get_console_snapshot(&console).await.unwrap();
    assert!(!snapshot.mounted);
    assert_eq!(snapshot.session.state, SessionState::Idle);
    assert_eq!(backend.live_pushers(), 0);
    assert!(!backend.preview_active());
}

#[tokio::test]
async fn test_preview_commands() {
    let backend = SimulatedBackend::new();
    let console = console_with(&backend);
    commands::initialize_push_session(&console).await.unwrap();

    let snapshot = commands::start_local_preview(&console).await.unwrap();
    assert!(snapshot.preview_active);

    let snapshot = commands::stop_local_preview(&console).await.unwrap();
    assert!(!snapshot.preview_active);
    assert!(!backend.preview_active());
}

#[tokio::test]
async fn test_send_control_message_needs_open_channel() {
    let backend = SimulatedBackend::new();
    let console = console_with(&backend);

    let err = commands::send_control_message(&console, "hello".to_string())
        .await
        .unwrap_err();
    assert!(err.contains("Control channel degraded"));
}

#[tokio::test]
async fn test_permission_request_through_backend() {
    let backend = SimulatedBackend::new();
    backend.deny_permission();
    let console = console_with(&backend);

    assert_eq!(commands::get_permission_status_string(&console), "not_determined");

    let info = commands::request_camera_permission(&console).await.unwrap();
    assert_eq!(info.status, PermissionStatus::Denied);
    assert_eq!(backend.outstanding_grants(), 0);

    let status = commands::check_camera_permission_status(&console).await.unwrap();
    assert_eq!(status, info);
    assert_eq!(commands::get_permission_status_string(&console), "denied");
}
