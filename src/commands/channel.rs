use crate::channel::ChannelSnapshot;
use crate::console::PushConsole;
use crate::guidance::GuidanceHints;

/// Reconnect the control channel, to `url` or the configured endpoint
pub async fn connect_control_channel(
    console: &PushConsole,
    url: Option<String>,
) -> Result<ChannelSnapshot, String> {
    let url = url.unwrap_or_else(|| console.config().channel.url.clone());
    if !(url.starts_with("ws://") || url.starts_with("wss://")) {
        return Err(format!("Not a WebSocket URL: {}", url));
    }

    console.channel().connect(&url).await;
    Ok(console.channel().snapshot())
}

pub async fn close_control_channel(console: &PushConsole) -> Result<(), String> {
    console.channel().close();
    Ok(())
}

/// Logged messages, newest first
pub async fn get_channel_messages(console: &PushConsole) -> Result<Vec<String>, String> {
    Ok(console.channel().messages())
}

pub async fn get_channel_status(console: &PushConsole) -> Result<ChannelSnapshot, String> {
    Ok(console.channel().snapshot())
}

pub async fn get_guidance_hints(console: &PushConsole) -> Result<GuidanceHints, String> {
    Ok(console.channel().guidance_hints())
}

/// Send a text frame over the open control channel
pub async fn send_control_message(console: &PushConsole, text: String) -> Result<(), String> {
    console.channel().send_text(text).map_err(|e| {
        log::warn!("Control message not sent: {}", e);
        e.to_string()
    })
}
