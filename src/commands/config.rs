use crate::config::CrabPushConfig;
use crate::console::PushConsole;

/// Configuration the console was built with
pub async fn get_config(console: &PushConsole) -> Result<CrabPushConfig, String> {
    Ok(console.config().clone())
}

/// Validate and save a configuration; takes effect on the next console
pub async fn save_config(new_config: CrabPushConfig, path: Option<String>) -> Result<(), String> {
    new_config.validate()?;

    let path = path
        .map(Into::into)
        .unwrap_or_else(CrabPushConfig::default_path);
    new_config.save_to_file(path).map_err(|e| e.to_string())
}

/// Load defaults, file and environment overrides
pub async fn load_config(path: Option<String>) -> Result<CrabPushConfig, String> {
    let path = path
        .map(Into::into)
        .unwrap_or_else(CrabPushConfig::default_path);
    CrabPushConfig::load_layered(path).map_err(|e| e.to_string())
}

/// Reset configuration to defaults
pub async fn reset_config(path: Option<String>) -> Result<CrabPushConfig, String> {
    let default_config = CrabPushConfig::default();
    save_config(default_config.clone(), path).await?;
    Ok(default_config)
}
