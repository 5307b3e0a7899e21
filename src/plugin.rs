//! Tauri plugin exposing the command layer
//!
//! ```rust,ignore
//! fn main() {
//!     let backend = std::sync::Arc::new(MyVendorBackend::new());
//!     let config = crabpush::config::CrabPushConfig::load_or_default();
//!
//!     tauri::Builder::default()
//!         .plugin(crabpush::init(backend, config).expect("invalid crabpush config"))
//!         .run(tauri::generate_context!())
//!         .expect("error while running tauri application");
//! }
//! ```

use crate::channel::ChannelSnapshot;
use crate::commands;
use crate::config::CrabPushConfig;
use crate::console::{ConsoleSnapshot, PushConsole};
use crate::errors::PushError;
use crate::guidance::GuidanceHints;
use crate::permissions::PermissionInfo;
use crate::pusher::PushBackend;
use crate::types::{DeviceList, SessionSnapshot};
use crate::upload::UploadOutcome;
use std::sync::Arc;
use tauri::{
    plugin::{Builder, TauriPlugin},
    Manager, Runtime, State,
};

type Console<'a> = State<'a, Arc<PushConsole>>;

/// Initialize the CrabPush plugin with all commands
pub fn init<R: Runtime>(
    backend: Arc<dyn PushBackend>,
    config: CrabPushConfig,
) -> Result<TauriPlugin<R>, PushError> {
    let console = Arc::new(PushConsole::new(backend, config)?);

    Ok(Builder::new("crabpush")
        .invoke_handler(tauri::generate_handler![
            // Lifecycle
            mount_console,
            unmount_console,
            get_console_snapshot,
            // Session commands
            initialize_push_session,
            start_local_preview,
            stop_local_preview,
            get_push_devices,
            select_push_camera,
            start_push,
            stop_push,
            toggle_push_camera,
            get_push_status,
            // Control channel commands
            connect_control_channel,
            close_control_channel,
            get_channel_messages,
            get_channel_status,
            get_guidance_hints,
            send_control_message,
            // Upload commands
            select_template_file,
            upload_template,
            submit_alignment,
            // Permission commands
            request_camera_permission,
            check_camera_permission_status,
            get_permission_status_string,
            // Configuration commands
            get_config,
            save_config,
            load_config,
            reset_config,
        ])
        .setup(move |app, _api| {
            app.manage(console);
            Ok(())
        })
        .build())
}

#[tauri::command]
async fn mount_console(console: Console<'_>) -> Result<ConsoleSnapshot, String> {
    commands::session::mount_console(&console).await
}

#[tauri::command]
async fn unmount_console(console: Console<'_>) -> Result<(), String> {
    commands::session::unmount_console(&console).await
}

#[tauri::command]
async fn get_console_snapshot(console: Console<'_>) -> Result<ConsoleSnapshot, String> {
    commands::session::get_console_snapshot(&console).await
}

#[tauri::command]
async fn initialize_push_session(console: Console<'_>) -> Result<DeviceList, String> {
    commands::session::initialize_push_session(&console).await
}

#[tauri::command]
async fn start_local_preview(console: Console<'_>) -> Result<SessionSnapshot, String> {
    commands::session::start_local_preview(&console).await
}

#[tauri::command]
async fn stop_local_preview(console: Console<'_>) -> Result<SessionSnapshot, String> {
    commands::session::stop_local_preview(&console).await
}

#[tauri::command]
async fn get_push_devices(console: Console<'_>) -> Result<DeviceList, String> {
    commands::session::get_push_devices(&console).await
}

#[tauri::command]
async fn select_push_camera(console: Console<'_>, device_id: String) -> Result<(), String> {
    commands::session::select_push_camera(&console, device_id).await
}

#[tauri::command]
async fn start_push(console: Console<'_>) -> Result<SessionSnapshot, String> {
    commands::session::start_push(&console).await
}

#[tauri::command]
async fn stop_push(console: Console<'_>) -> Result<SessionSnapshot, String> {
    commands::session::stop_push(&console).await
}

#[tauri::command]
async fn toggle_push_camera(console: Console<'_>) -> Result<bool, String> {
    commands::session::toggle_push_camera(&console).await
}

#[tauri::command]
async fn get_push_status(console: Console<'_>) -> Result<SessionSnapshot, String> {
    commands::session::get_push_status(&console).await
}

#[tauri::command]
async fn connect_control_channel(
    console: Console<'_>,
    url: Option<String>,
) -> Result<ChannelSnapshot, String> {
    commands::channel::connect_control_channel(&console, url).await
}

#[tauri::command]
async fn close_control_channel(console: Console<'_>) -> Result<(), String> {
    commands::channel::close_control_channel(&console).await
}

#[tauri::command]
async fn get_channel_messages(console: Console<'_>) -> Result<Vec<String>, String> {
    commands::channel::get_channel_messages(&console).await
}

#[tauri::command]
async fn get_channel_status(console: Console<'_>) -> Result<ChannelSnapshot, String> {
    commands::channel::get_channel_status(&console).await
}

#[tauri::command]
async fn get_guidance_hints(console: Console<'_>) -> Result<GuidanceHints, String> {
    commands::channel::get_guidance_hints(&console).await
}

#[tauri::command]
async fn send_control_message(console: Console<'_>, text: String) -> Result<(), String> {
    commands::channel::send_control_message(&console, text).await
}

#[tauri::command]
async fn select_template_file(console: Console<'_>, path: String) -> Result<String, String> {
    commands::upload::select_template_file(&console, path).await
}

#[tauri::command]
async fn upload_template(console: Console<'_>, compress: bool) -> Result<UploadOutcome, String> {
    commands::upload::upload_template(&console, compress).await
}

#[tauri::command]
async fn submit_alignment(
    console: Console<'_>,
    person_ratio_percent: f64,
    center_position: String,
    face_center_offset_deg: f64,
) -> Result<UploadOutcome, String> {
    commands::upload::submit_alignment(
        &console,
        person_ratio_percent,
        center_position,
        face_center_offset_deg,
    )
    .await
}

#[tauri::command]
async fn request_camera_permission(console: Console<'_>) -> Result<PermissionInfo, String> {
    commands::permissions::request_camera_permission(&console).await
}

#[tauri::command]
async fn check_camera_permission_status(console: Console<'_>) -> Result<PermissionInfo, String> {
    commands::permissions::check_camera_permission_status(&console).await
}

#[tauri::command]
fn get_permission_status_string(console: Console<'_>) -> String {
    commands::permissions::get_permission_status_string(&console)
}

#[tauri::command]
async fn get_config(console: Console<'_>) -> Result<CrabPushConfig, String> {
    commands::config::get_config(&console).await
}

#[tauri::command]
async fn save_config(new_config: CrabPushConfig, path: Option<String>) -> Result<(), String> {
    commands::config::save_config(new_config, path).await
}

#[tauri::command]
async fn load_config(path: Option<String>) -> Result<CrabPushConfig, String> {
    commands::config::load_config(path).await
}

#[tauri::command]
async fn reset_config(path: Option<String>) -> Result<CrabPushConfig, String> {
    commands::config::reset_config(path).await
}
