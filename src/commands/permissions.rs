use crate::console::PushConsole;
use crate::permissions::PermissionInfo;

/// Request camera permission through the push backend
pub async fn request_camera_permission(console: &PushConsole) -> Result<PermissionInfo, String> {
    log::info!("Requesting camera permission");
    Ok(console.session().request_permission().await)
}

/// Last permission answer from the push backend
pub async fn check_camera_permission_status(console: &PushConsole) -> Result<PermissionInfo, String> {
    log::debug!("Checking camera permission status");
    Ok(console.session().permission())
}

/// Get human-readable permission status string
pub fn get_permission_status_string(console: &PushConsole) -> String {
    console.session().permission().status.to_string()
}
