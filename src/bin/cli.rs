use anyhow::{anyhow, bail, Context};
use crabpush::channel::{decode_frame, ChannelEvent, ControlChannel, DecodeMode};
use crabpush::config::CrabPushConfig;
use crabpush::guidance::translate;
use crabpush::session::PushSessionController;
use crabpush::testing::{PusherStep, SimulatedBackend};
use crabpush::upload::{AlignmentSubmission, FileInput, TemplateFile, TemplateUploader};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

const USAGE: &str = "Usage: crabpush-cli <command> [args]

Commands:
  decode <text> [--plain]                 Normalize one control message
  listen [url] [--seconds <n>] [--json]   Print control channel traffic
  upload <path> [--compress]              Upload a template image
  align <ratio> <center> <offset_deg>     Submit alignment measurements
  simulate [--fail <step>] [--deny]       Drive a push session against the simulated SDK
  config [show|init|validate]             Inspect the configuration

Options:
  --config <path>                         Config file (default crabpush.toml)";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    crabpush::init_logging();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("{}", USAGE);
        std::process::exit(1);
    }

    let config_path = option_value(&args, "--config")
        .map(PathBuf::from)
        .unwrap_or_else(CrabPushConfig::default_path);
    let config = CrabPushConfig::load_layered(&config_path)?;

    let command = &args[1];
    match command.as_str() {
        "decode" => cmd_decode(&args, &config),
        "listen" => cmd_listen(&args, &config).await,
        "upload" => cmd_upload(&args, &config).await,
        "align" => cmd_align(&args, &config).await,
        "simulate" => cmd_simulate(&args, &config).await,
        "config" => cmd_config(&args, &config, &config_path),
        "help" | "--help" | "-h" => {
            println!("{}", USAGE);
            Ok(())
        }
        _ => {
            eprintln!("Unknown command: {}\n\n{}", command, USAGE);
            std::process::exit(1);
        }
    }
}

fn option_value<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    args.iter()
        .position(|arg| arg == name)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

fn has_flag(args: &[String], name: &str) -> bool {
    args.iter().any(|arg| arg == name)
}

/// Arguments after the command that are neither flags nor flag values
fn positional(args: &[String]) -> Vec<&str> {
    let mut out = Vec::new();
    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "--seconds" | "--fail" => i += 1,
            arg if arg.starts_with("--") => {}
            arg => out.push(arg),
        }
        i += 1;
    }
    out
}

fn cmd_decode(args: &[String], config: &CrabPushConfig) -> anyhow::Result<()> {
    let raw = positional(args)
        .first()
        .copied()
        .ok_or_else(|| anyhow!("Usage: crabpush-cli decode <text> [--plain]"))?;

    let mode = if has_flag(args, "--plain") || !config.channel.guidance_enabled {
        DecodeMode::Plain
    } else {
        DecodeMode::Guidance
    };

    let decoded = decode_frame(raw, mode);
    println!("{}", decoded.display);
    if let Some(guidance) = decoded.guidance {
        println!("{}", serde_json::to_string(&translate(&guidance))?);
    }
    Ok(())
}

async fn cmd_listen(args: &[String], config: &CrabPushConfig) -> anyhow::Result<()> {
    let url = positional(args)
        .first()
        .map(|url| url.to_string())
        .unwrap_or_else(|| config.channel.url.clone());
    let seconds: Option<u64> = option_value(args, "--seconds")
        .map(str::parse)
        .transpose()
        .context("--seconds must be a number")?;
    let json = has_flag(args, "--json");

    let (stop_tx, mut stop_rx) = tokio::sync::mpsc::unbounded_channel();
    ctrlc::set_handler(move || {
        let _ = stop_tx.send(());
    })?;

    let channel = ControlChannel::new(&config.channel);
    let mut events = channel.subscribe();
    let state = channel.connect(&url).await;
    eprintln!("{} ({})", state.label(), url);

    let deadline = async {
        match seconds {
            Some(s) => tokio::time::sleep(Duration::from_secs(s)).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = stop_rx.recv() => break,
            _ = &mut deadline => break,
            event = events.recv() => match event {
                Ok(ChannelEvent::Message(text)) => println!("{}", text),
                Ok(ChannelEvent::Guidance(guidance)) => {
                    let hints = translate(&guidance);
                    if json {
                        println!("{}", serde_json::to_string(&hints)?);
                    } else if !hints.is_empty() {
                        eprintln!("guidance: {:?}", hints);
                    }
                }
                Ok(ChannelEvent::StateChanged(state)) => {
                    eprintln!("{}", state.label());
                    if !matches!(state, crabpush::ChannelState::Open | crabpush::ChannelState::Connecting) {
                        break;
                    }
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    eprintln!("skipped {} events", n);
                }
                Err(_) => break,
            },
        }
    }

    channel.close();
    if json {
        println!("{}", serde_json::to_string(&channel.snapshot())?);
    }
    Ok(())
}

async fn cmd_upload(args: &[String], config: &CrabPushConfig) -> anyhow::Result<()> {
    let path = positional(args)
        .first()
        .copied()
        .ok_or_else(|| anyhow!("Usage: crabpush-cli upload <path> [--compress]"))?;

    let uploader = TemplateUploader::new(&config.upload)?;
    let mut input = FileInput::new();
    input.select(TemplateFile::from_path(path)?);

    let outcome = if has_flag(args, "--compress") {
        let (max_dimension, quality) = uploader.compression_defaults();
        uploader
            .upload_compressed(&mut input, max_dimension, quality)
            .await?
    } else {
        uploader.upload_raw(&mut input).await
    };

    println!("{}", serde_json::to_string(&outcome)?);
    if !outcome.is_delivered() {
        std::process::exit(2);
    }
    Ok(())
}

async fn cmd_align(args: &[String], config: &CrabPushConfig) -> anyhow::Result<()> {
    let values = positional(args);
    let [ratio, center, offset] = values.as_slice() else {
        bail!("Usage: crabpush-cli align <ratio_percent> <eyes|shoulders|hips|knees> <offset_deg>");
    };

    let submission = AlignmentSubmission {
        person_ratio_percent: ratio.parse().context("ratio must be a number")?,
        center_position: center.parse().map_err(|e: String| anyhow!(e))?,
        face_center_offset_deg: offset.parse().context("offset must be a number")?,
    };

    let uploader = TemplateUploader::new(&config.upload)?;
    let outcome = uploader.submit_alignment(submission).await?;
    println!("{}", serde_json::to_string(&outcome)?);
    Ok(())
}

fn parse_step(name: &str) -> anyhow::Result<PusherStep> {
    let step = match name {
        "create" => PusherStep::CreatePusher,
        "render-view" => PusherStep::SetRenderView,
        "quality" => PusherStep::SetVideoQuality,
        "property" => PusherStep::SetProperty,
        "mute" => PusherStep::SetLocalPreviewMuted,
        "start-camera" => PusherStep::StartCamera,
        "stop-camera" => PusherStep::StopCamera,
        "switch-camera" => PusherStep::SwitchCamera,
        "start-push" => PusherStep::StartPush,
        "stop-push" => PusherStep::StopPush,
        "devices" => PusherStep::GetDevicesList,
        "preview" => PusherStep::OpenPreview,
        other => bail!("Unknown step: {}", other),
    };
    Ok(step)
}

async fn cmd_simulate(args: &[String], config: &CrabPushConfig) -> anyhow::Result<()> {
    let backend = SimulatedBackend::new();
    if let Some(step) = option_value(args, "--fail") {
        backend.fail_at(parse_step(step)?);
    }
    if has_flag(args, "--deny") {
        backend.deny_permission();
    }

    let controller = PushSessionController::new(Arc::new(backend.clone()), config.push.clone());
    let print = |label: &str, controller: &PushSessionController| -> anyhow::Result<()> {
        println!("{:<10} {}", label, serde_json::to_string(&controller.snapshot())?);
        Ok(())
    };

    match controller.initialize().await {
        Ok(devices) => println!("{:<10} {}", "devices", serde_json::to_string(&devices)?),
        Err(e) => eprintln!("initialize: {}", e),
    }
    print("ready", &controller)?;

    match controller.start_preview().await {
        Ok(()) => print("preview", &controller)?,
        Err(e) => eprintln!("preview: {}", e),
    }

    if let Err(e) = controller.start().await {
        eprintln!("start: {}", e);
        print("failed", &controller)?;
        return Ok(());
    }
    print("live", &controller)?;

    backend.emit_status(1001, "");
    print("status", &controller)?;

    match controller.toggle_camera().await {
        Ok(enabled) => println!("{:<10} camera_enabled={}", "toggle", enabled),
        Err(e) => eprintln!("toggle: {}", e),
    }

    controller.stop().await;
    print("stopped", &controller)?;
    println!("{:<10} {:?}", "calls", backend.calls());
    Ok(())
}

fn cmd_config(args: &[String], config: &CrabPushConfig, path: &Path) -> anyhow::Result<()> {
    match positional(args).first().copied().unwrap_or("show") {
        "show" => print!("{}", toml::to_string_pretty(config)?),
        "init" => {
            if path.exists() {
                bail!("{} already exists", path.display());
            }
            CrabPushConfig::default().save_to_file(path)?;
            println!("Wrote {}", path.display());
        }
        "validate" => {
            config.validate().map_err(|e| anyhow!(e))?;
            println!("Configuration is valid");
        }
        other => bail!("Unknown config action: {}", other),
    }
    Ok(())
}
