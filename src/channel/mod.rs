//! Control WebSocket client
//!
//! One [`ControlChannel`] owns at most one connection. While the connection
//! is open a heartbeat task sends `{"type":"ping","ts":<ms>}` every
//! `heartbeat_interval_ms`. Inbound frames are normalized by
//! [`decode::decode_frame`], prepended to a bounded [`log::MessageLog`] and,
//! for `move` messages, replace the current [`GuidanceState`].
//!
//! Transport errors move the channel to `Degraded`; a close frame or the end
//! of the stream moves it to `Closed` and cancels the heartbeat. The channel
//! never reconnects on its own.

pub mod decode;
pub mod log;

pub use self::decode::{decode_frame, unescape_unicode, DecodeMode, DecodedMessage};
pub use self::log::MessageLog;

use crate::config::ChannelConfig;
use crate::errors::{PushError, Result};
use crate::guidance::{self, GuidanceHints, GuidanceState};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelState {
    Connecting,
    Open,
    Degraded,
    Closed,
}

impl ChannelState {
    /// Text shown next to the stream status
    pub fn label(&self) -> &'static str {
        match self {
            ChannelState::Connecting => "Connecting",
            ChannelState::Open => "Connected",
            ChannelState::Degraded => "Connection error",
            ChannelState::Closed => "Disconnected",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    StateChanged(ChannelState),
    Message(String),
    Guidance(GuidanceState),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelSnapshot {
    pub state: ChannelState,
    pub label: String,
    pub messages: Vec<String>,
    pub guidance: Option<GuidanceState>,
    pub heartbeat_active: bool,
}

/// Outbound keep-alive frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeartbeatFrame {
    #[serde(rename = "type")]
    pub kind: String,
    pub ts: i64,
}

impl HeartbeatFrame {
    pub fn now() -> Self {
        Self {
            kind: "ping".to_string(),
            ts: chrono::Utc::now().timestamp_millis(),
        }
    }
}

#[derive(Default)]
struct Tasks {
    heartbeat: Option<JoinHandle<()>>,
    reader: Option<JoinHandle<()>>,
    outbound: Option<mpsc::UnboundedSender<Message>>,
    /// Bumped per connection so a stale reader cannot close a newer one
    generation: u64,
}

/// Handles of one connection, taken out of [`Tasks`] for shutdown.
struct Connection {
    heartbeat: Option<JoinHandle<()>>,
    reader: Option<JoinHandle<()>>,
    outbound: Option<mpsc::UnboundedSender<Message>>,
}

impl Connection {
    fn take(tasks: &mut Tasks) -> Self {
        Self {
            heartbeat: tasks.heartbeat.take(),
            reader: tasks.reader.take(),
            outbound: tasks.outbound.take(),
        }
    }

    /// Stop the heartbeat, send a close frame and stop reading.
    fn shut_down(self) {
        if let Some(heartbeat) = self.heartbeat {
            heartbeat.abort();
        }
        if let Some(outbound) = self.outbound {
            ::log::info!("Closing control channel");
            let _ = outbound.send(Message::Close(None));
        }
        if let Some(reader) = self.reader {
            reader.abort();
        }
    }
}

struct ChannelInner {
    heartbeat_period: Duration,
    mode: DecodeMode,
    state: RwLock<ChannelState>,
    log: Mutex<MessageLog>,
    guidance: RwLock<Option<GuidanceState>>,
    tasks: Mutex<Tasks>,
    events: broadcast::Sender<ChannelEvent>,
}

impl ChannelInner {
    fn state(&self) -> ChannelState {
        *self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn generation(&self) -> u64 {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner).generation
    }

    fn set_state(&self, next: ChannelState) {
        {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            if *state == next {
                return;
            }
            *state = next;
        }
        ::log::debug!("Control channel state -> {:?}", next);
        let _ = self.events.send(ChannelEvent::StateChanged(next));
    }

    fn ingest(&self, raw: &str) {
        let decoded = decode_frame(raw, self.mode);

        if let Some(guidance) = decoded.guidance {
            *self.guidance.write().unwrap_or_else(PoisonError::into_inner) = Some(guidance);
            let _ = self.events.send(ChannelEvent::Guidance(guidance));
        }

        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(decoded.display.clone());
        let _ = self.events.send(ChannelEvent::Message(decoded.display));
    }

    /// Transport ended underneath us: cancel the heartbeat, drop the writer.
    fn on_transport_finished(&self, generation: u64, next: ChannelState) {
        let heartbeat = {
            let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
            if tasks.generation != generation {
                return;
            }
            tasks.outbound = None;
            tasks.reader = None;
            tasks.heartbeat.take()
        };
        if let Some(heartbeat) = heartbeat {
            heartbeat.abort();
        }
        self.set_state(next);
    }
}

/// WebSocket control channel with heartbeat and bounded message log
pub struct ControlChannel {
    inner: Arc<ChannelInner>,
}

impl ControlChannel {
    pub fn new(config: &ChannelConfig) -> Self {
        let mode = if config.guidance_enabled {
            DecodeMode::Guidance
        } else {
            DecodeMode::Plain
        };
        Self::with_options(
            Duration::from_millis(config.heartbeat_interval_ms.max(1)),
            config.message_log_capacity,
            mode,
        )
    }

    pub fn with_options(heartbeat_period: Duration, log_capacity: usize, mode: DecodeMode) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            inner: Arc::new(ChannelInner {
                heartbeat_period,
                mode,
                state: RwLock::new(ChannelState::Closed),
                log: Mutex::new(MessageLog::new(log_capacity)),
                guidance: RwLock::new(None),
                tasks: Mutex::new(Tasks::default()),
                events,
            }),
        }
    }

    /// Open a connection. Failures leave the channel `Degraded`; they are not returned.
    ///
    /// A `close()` that lands while the handshake is pending wins: the late
    /// connection is dropped and the channel stays `Closed`.
    pub async fn connect(&self, url: &str) -> ChannelState {
        self.close();
        let generation = self.inner.generation();
        self.inner.set_state(ChannelState::Connecting);
        ::log::info!("Connecting control channel to {}", url);

        match tokio_tungstenite::connect_async(url).await {
            Ok((stream, _response)) => {
                if !self.install(stream, Some(generation)) {
                    ::log::info!("Control channel to {} closed during handshake; dropping it", url);
                }
            }
            Err(e) if self.inner.generation() == generation => {
                ::log::warn!("Control channel connection to {} failed: {}", url, e);
                self.inner.set_state(ChannelState::Degraded);
            }
            Err(e) => ::log::debug!("Ignoring failed handshake to {} after close: {}", url, e),
        }

        self.state()
    }

    /// Adopt an established WebSocket and start the reader, writer and heartbeat.
    pub fn attach<S>(&self, stream: WebSocketStream<S>)
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        self.install(stream, None);
    }

    /// Replace the current connection with `stream`. With `expected` set, the
    /// stream is only adopted if no close or reconnect happened since that
    /// generation was read; otherwise it is dropped and false is returned.
    fn install<S>(&self, stream: WebSocketStream<S>, expected: Option<u64>) -> bool
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let mut tasks = self.inner.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        if expected.is_some_and(|generation| generation != tasks.generation) {
            return false;
        }

        let previous = Connection::take(&mut tasks);
        tasks.generation = tasks.generation.wrapping_add(1);
        let generation = tasks.generation;

        let (sink, source) = stream.split();
        let (outbound, outbound_rx) = mpsc::unbounded_channel();

        // Open before the heartbeat exists so its first tick sees the right state.
        self.inner.set_state(ChannelState::Open);

        tokio::spawn(write_loop(sink, outbound_rx));
        tasks.heartbeat = Some(tokio::spawn(heartbeat_loop(
            Arc::clone(&self.inner),
            outbound.clone(),
            self.inner.heartbeat_period,
        )));
        tasks.reader = Some(tokio::spawn(read_loop(
            Arc::clone(&self.inner),
            source,
            generation,
        )));
        tasks.outbound = Some(outbound);
        drop(tasks);

        previous.shut_down();
        true
    }

    /// Cancel the heartbeat and close the transport. Safe to call repeatedly.
    pub fn close(&self) {
        let connection = {
            let mut tasks = self.inner.tasks.lock().unwrap_or_else(PoisonError::into_inner);
            tasks.generation = tasks.generation.wrapping_add(1);
            Connection::take(&mut tasks)
        };

        self.inner.set_state(ChannelState::Closed);
        connection.shut_down();
    }

    pub fn state(&self) -> ChannelState {
        self.inner.state()
    }

    pub fn has_heartbeat(&self) -> bool {
        self.inner
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .heartbeat
            .is_some()
    }

    pub fn messages(&self) -> Vec<String> {
        self.inner
            .log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries()
    }

    pub fn guidance(&self) -> Option<GuidanceState> {
        *self.inner.guidance.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn guidance_hints(&self) -> GuidanceHints {
        self.guidance()
            .map(|state| guidance::translate(&state))
            .unwrap_or_default()
    }

    pub fn decode_mode(&self) -> DecodeMode {
        self.inner.mode
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChannelEvent> {
        self.inner.events.subscribe()
    }

    /// Queue a text frame on the open connection.
    pub fn send_text(&self, text: impl Into<String>) -> Result<()> {
        let state = self.state();
        let tasks = self.inner.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        match tasks.outbound.as_ref() {
            Some(outbound) if state == ChannelState::Open => outbound
                .send(Message::Text(text.into()))
                .map_err(|_| PushError::ChannelDegraded("control channel writer stopped".to_string())),
            _ => Err(PushError::ChannelDegraded(format!(
                "control channel is not open ({})",
                state.label()
            ))),
        }
    }

    pub fn snapshot(&self) -> ChannelSnapshot {
        let state = self.state();
        ChannelSnapshot {
            state,
            label: state.label().to_string(),
            messages: self.messages(),
            guidance: self.guidance(),
            heartbeat_active: self.has_heartbeat(),
        }
    }
}

impl Drop for ControlChannel {
    fn drop(&mut self) {
        self.close();
    }
}

async fn write_loop<S>(
    mut sink: SplitSink<WebSocketStream<S>, Message>,
    mut outbound: mpsc::UnboundedReceiver<Message>,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    while let Some(message) = outbound.recv().await {
        let closing = matches!(message, Message::Close(_));
        if let Err(e) = sink.send(message).await {
            ::log::debug!("Control channel write failed: {}", e);
            break;
        }
        if closing {
            break;
        }
    }
    let _ = sink.close().await;
}

async fn heartbeat_loop(
    inner: Arc<ChannelInner>,
    outbound: mpsc::UnboundedSender<Message>,
    period: Duration,
) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        if inner.state() != ChannelState::Open {
            continue;
        }
        let frame = match serde_json::to_string(&HeartbeatFrame::now()) {
            Ok(frame) => frame,
            Err(e) => {
                ::log::error!("Failed to encode heartbeat: {}", e);
                continue;
            }
        };
        if outbound.send(Message::Text(frame)).is_err() {
            break;
        }
    }
}

async fn read_loop<S>(inner: Arc<ChannelInner>, mut source: SplitStream<WebSocketStream<S>>, generation: u64)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut next = ChannelState::Closed;

    while let Some(frame) = source.next().await {
        match frame {
            Ok(Message::Text(text)) => inner.ingest(&text),
            Ok(Message::Binary(bytes)) => inner.ingest(&String::from_utf8_lossy(&bytes)),
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                ::log::warn!("Control channel error: {}", e);
                next = ChannelState::Degraded;
                break;
            }
        }
    }

    inner.on_transport_finished(generation, next);
}
