use crate::console::{ConsoleSnapshot, PushConsole};
use crate::types::{DeviceList, SessionSnapshot};

/// Mount the console: initialize devices and connect the control channel
pub async fn mount_console(console: &PushConsole) -> Result<ConsoleSnapshot, String> {
    Ok(console.mount().await)
}

/// Close the channel and stop any push
pub async fn unmount_console(console: &PushConsole) -> Result<(), String> {
    console.unmount().await;
    Ok(())
}

pub async fn get_console_snapshot(console: &PushConsole) -> Result<ConsoleSnapshot, String> {
    Ok(console.snapshot())
}

/// Check support, request permission and enumerate cameras
pub async fn initialize_push_session(console: &PushConsole) -> Result<DeviceList, String> {
    match console.session().initialize().await {
        Ok(devices) => {
            log::info!("Push session initialized with {} camera(s)", devices.len());
            Ok(devices)
        }
        Err(e) => {
            log::error!("Failed to initialize push session: {}", e);
            Err(format!("Failed to initialize push session: {}", e))
        }
    }
}

pub async fn get_push_devices(console: &PushConsole) -> Result<DeviceList, String> {
    Ok(console.session().devices())
}

/// Select a camera; a running local preview follows the selection
pub async fn select_push_camera(console: &PushConsole, device_id: String) -> Result<(), String> {
    console
        .session()
        .change_camera(&device_id)
        .await
        .map_err(|e| e.to_string())
}

/// Show the selected camera locally without pushing
pub async fn start_local_preview(console: &PushConsole) -> Result<SessionSnapshot, String> {
    match console.session().start_preview().await {
        Ok(()) => Ok(console.session().snapshot()),
        Err(e) => {
            log::error!("Failed to start local preview: {}", e);
            Err(e.to_string())
        }
    }
}

pub async fn stop_local_preview(console: &PushConsole) -> Result<SessionSnapshot, String> {
    console.session().stop_preview().await;
    Ok(console.session().snapshot())
}

pub async fn start_push(console: &PushConsole) -> Result<SessionSnapshot, String> {
    match console.session().start().await {
        Ok(()) => Ok(console.session().snapshot()),
        Err(e) => {
            log::error!("Failed to start push: {}", e);
            Err(e.to_string())
        }
    }
}

pub async fn stop_push(console: &PushConsole) -> Result<SessionSnapshot, String> {
    console.session().stop().await;
    Ok(console.session().snapshot())
}

/// Returns whether the camera is enabled afterwards
pub async fn toggle_push_camera(console: &PushConsole) -> Result<bool, String> {
    console
        .session()
        .toggle_camera()
        .await
        .map_err(|e| e.to_string())
}

pub async fn get_push_status(console: &PushConsole) -> Result<SessionSnapshot, String> {
    Ok(console.session().snapshot())
}
