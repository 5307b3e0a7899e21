//! Push console
//!
//! Owns one session controller, one control channel and one uploader for the
//! lifetime of a view. `mount()` prepares devices, opens the local preview
//! and connects the channel; `unmount()` closes the channel, releases the
//! preview and stops any push. Both are safe to repeat, and an `unmount()`
//! that lands while a `mount()` is still running wins.

use crate::channel::{ChannelSnapshot, ControlChannel};
use crate::config::CrabPushConfig;
use crate::errors::{PushError, Result};
use crate::guidance::GuidanceHints;
use crate::pusher::PushBackend;
use crate::session::PushSessionController;
use crate::types::{DeviceList, SessionSnapshot};
use crate::upload::{AlignmentSubmission, FileInput, TemplateFile, TemplateUploader, UploadOutcome};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Everything a view renders, captured at one instant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsoleSnapshot {
    pub session: SessionSnapshot,
    pub devices: DeviceList,
    pub channel: ChannelSnapshot,
    pub hints: GuidanceHints,
    pub mounted: bool,
}

pub struct PushConsole {
    config: CrabPushConfig,
    session: PushSessionController,
    channel: ControlChannel,
    uploader: TemplateUploader,
    template_input: Mutex<FileInput>,
    mounted: AtomicBool,
    /// Bumped by every unmount so an in-flight mount can tell it was overtaken
    epoch: AtomicU64,
}

impl PushConsole {
    pub fn new(backend: Arc<dyn PushBackend>, config: CrabPushConfig) -> Result<Self> {
        config.validate().map_err(PushError::Config)?;

        Ok(Self {
            session: PushSessionController::new(backend, config.push.clone()),
            channel: ControlChannel::new(&config.channel),
            uploader: TemplateUploader::new(&config.upload)?,
            template_input: Mutex::new(FileInput::new()),
            mounted: AtomicBool::new(false),
            epoch: AtomicU64::new(0),
            config,
        })
    }

    /// Initialize the session, show the local preview and connect the control channel.
    ///
    /// Failures of any part are reflected in the snapshot, not returned.
    pub async fn mount(&self) -> ConsoleSnapshot {
        log::info!("Mounting push console");
        let epoch = self.epoch.load(Ordering::SeqCst);
        self.mounted.store(true, Ordering::SeqCst);

        match self.session.initialize().await {
            Ok(_) if self.overtaken(epoch) => return self.snapshot(),
            Ok(_) => {
                if let Err(e) = self.session.start_preview().await {
                    log::warn!("Local preview unavailable: {}", e);
                }
                if self.overtaken(epoch) {
                    self.session.stop_preview().await;
                    return self.snapshot();
                }
            }
            Err(e) => log::warn!("Push session unavailable: {}", e),
        }

        if !self.overtaken(epoch) {
            self.channel.connect(&self.config.channel.url).await;
        }

        self.snapshot()
    }

    /// An unmount happened since `epoch` was read.
    fn overtaken(&self, epoch: u64) -> bool {
        let overtaken = self.epoch.load(Ordering::SeqCst) != epoch;
        if overtaken {
            log::debug!("Mount overtaken by unmount");
        }
        overtaken
    }

    /// Close the channel, release the preview and stop any active push.
    pub async fn unmount(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        if self.mounted.swap(false, Ordering::SeqCst) {
            log::info!("Unmounting push console");
        }
        self.channel.close();
        self.session.stop_preview().await;
        self.session.stop().await;
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::SeqCst)
    }

    pub fn config(&self) -> &CrabPushConfig {
        &self.config
    }

    pub fn session(&self) -> &PushSessionController {
        &self.session
    }

    pub fn channel(&self) -> &ControlChannel {
        &self.channel
    }

    pub fn uploader(&self) -> &TemplateUploader {
        &self.uploader
    }

    pub fn snapshot(&self) -> ConsoleSnapshot {
        ConsoleSnapshot {
            session: self.session.snapshot(),
            devices: self.session.devices(),
            channel: self.channel.snapshot(),
            hints: self.channel.guidance_hints(),
            mounted: self.is_mounted(),
        }
    }

    pub async fn select_template(&self, file: TemplateFile) {
        self.template_input.lock().await.select(file);
    }

    /// Upload the selected template, downsampled with the configured limits when `compress` is set.
    pub async fn upload_template(&self, compress: bool) -> Result<UploadOutcome> {
        let mut input = self.template_input.lock().await;
        if compress {
            let (max_dimension, quality) = self.uploader.compression_defaults();
            self.uploader
                .upload_compressed(&mut input, max_dimension, quality)
                .await
        } else {
            Ok(self.uploader.upload_raw(&mut input).await)
        }
    }

    pub async fn submit_alignment(&self, submission: AlignmentSubmission) -> Result<UploadOutcome> {
        self.uploader.submit_alignment(submission).await
    }
}
