/*
[INPUT]:  Backend HTTP client (base URL, API key, session) and a table name
[OUTPUT]: LiveSubscription delivering ChangeEvents from the realtime websocket
[POS]:    Realtime layer - websocket connection and channel lifecycle
[UPDATE]: When changing connection logic or heartbeat behavior
*/

use futures_util::{SinkExt, StreamExt};
use reqwest::Url;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior, interval_at, timeout};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, info, warn};

use super::message::{Inbound, PhoenixMessage};
use crate::http::{BackendClient, BackendError, Result};
use crate::types::ChangeEvent;

const PROTOCOL_VERSION: &str = "1.0.0";
const MESSAGE_SAMPLE_LIMIT: usize = 3;
const PARSE_FAIL_LOG_LIMIT: usize = 3;
const RAW_LOG_MAX_BYTES: usize = 1024;

static MESSAGE_SAMPLE_COUNT: AtomicUsize = AtomicUsize::new(0);
static PARSE_FAIL_LOG_COUNT: AtomicUsize = AtomicUsize::new(0);

/// Realtime connection settings
#[derive(Debug, Clone)]
pub struct RealtimeConfig {
    pub heartbeat_interval: Duration,
    pub channel_capacity: usize,
    /// How long `subscribe` waits for the server to accept the channel join
    pub join_timeout: Duration,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_secs(25),
            channel_capacity: 100,
            join_timeout: Duration::from_secs(10),
        }
    }
}

/// Websocket client for the realtime change feed
#[derive(Debug, Clone)]
pub struct RealtimeClient {
    client: BackendClient,
    config: RealtimeConfig,
}

impl RealtimeClient {
    pub fn new(client: BackendClient) -> Self {
        Self::with_config(client, RealtimeConfig::default())
    }

    pub fn with_config(client: BackendClient, config: RealtimeConfig) -> Self {
        Self { client, config }
    }

    /// Websocket endpoint derived from the backend base URL
    pub fn websocket_url(&self) -> Result<Url> {
        let mut url = self.client.url("realtime/v1/websocket")?;
        let scheme = match url.scheme() {
            "https" => "wss",
            "http" => "ws",
            other => {
                return Err(BackendError::Config(format!("unsupported URL scheme for realtime: {other}")));
            }
        };
        url.set_scheme(scheme)
            .map_err(|_| BackendError::Config(format!("cannot switch URL to {scheme}")))?;
        url.query_pairs_mut()
            .append_pair("apikey", self.client.api_key())
            .append_pair("vsn", PROTOCOL_VERSION);
        Ok(url)
    }

    /// Open one websocket and join the change channel for `table`.
    ///
    /// Returns once the server has accepted the join. A rejected or unanswered
    /// join closes the socket and fails with [`BackendError::WebSocket`].
    ///
    /// The connection lives in a spawned task until the returned handle is
    /// dropped or closed, or the server ends it.
    pub async fn subscribe(&self, table: &str) -> Result<LiveSubscription> {
        let url = self.websocket_url()?;
        let (ws_stream, _response) = connect_async(url.as_str())
            .await
            .map_err(|err| BackendError::WebSocket(err.to_string()))?;
        let (mut write, mut read) = ws_stream.split();

        let refs = Arc::new(AtomicU64::new(1));
        let join_ref = refs.fetch_add(1, Ordering::Relaxed);
        let token = self
            .client
            .fresh_access_token()
            .await
            .unwrap_or_else(|| self.client.api_key().to_string());
        let join = PhoenixMessage::join(table, &token, join_ref).to_text()?;
        write
            .send(WsMessage::Text(join.into()))
            .await
            .map_err(|err| BackendError::WebSocket(err.to_string()))?;

        let topic = PhoenixMessage::topic_for(table);
        let join_ref = join_ref.to_string();
        debug!(topic = %topic, "realtime channel join sent");

        // Changes that arrive ahead of the join reply are delivered after it.
        let mut pending = Vec::new();
        let joined = timeout(self.config.join_timeout, async {
            while let Some(frame) = read.next().await {
                let message = match frame {
                    Ok(message) => message,
                    Err(err) => return Err(BackendError::WebSocket(err.to_string())),
                };
                match parse_message(message, &topic, &join_ref) {
                    Some(Inbound::JoinReply { ok: true, .. }) => return Ok(()),
                    Some(Inbound::JoinReply { ok: false, detail }) => {
                        return Err(BackendError::WebSocket(format!("channel join rejected: {detail}")));
                    }
                    Some(Inbound::ChannelClosed(event)) => {
                        return Err(BackendError::WebSocket(format!("channel closed during join: {event}")));
                    }
                    Some(Inbound::Change(event)) => pending.push(event),
                    Some(Inbound::Ignored) | None => {}
                }
            }
            Err(BackendError::WebSocket("connection closed before join reply".to_string()))
        })
        .await
        .unwrap_or_else(|_| Err(BackendError::WebSocket("channel join timed out".to_string())));

        if let Err(err) = joined {
            warn!(topic = %topic, error = %err, "realtime channel join failed");
            let _ = write.send(WsMessage::Close(None)).await;
            return Err(err);
        }
        info!(topic = %topic, "realtime channel joined");

        let (outbound_tx, mut outbound_rx) = mpsc::channel::<WsMessage>(16);
        let (event_tx, event_rx) = mpsc::channel(self.config.channel_capacity);
        let period = self.config.heartbeat_interval;
        let task_refs = refs.clone();
        let task_topic = topic.clone();

        tokio::spawn(async move {
            for event in pending {
                if event_tx.send(event).await.is_err() {
                    let _ = write.send(WsMessage::Close(None)).await;
                    return;
                }
            }

            let mut heartbeat = interval_at(Instant::now() + period, period);
            heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    outbound = outbound_rx.recv() => {
                        match outbound {
                            Some(message) => {
                                if write.send(message).await.is_err() {
                                    break;
                                }
                            }
                            None => {
                                let _ = write.send(WsMessage::Close(None)).await;
                                break;
                            }
                        }
                    }
                    _ = heartbeat.tick() => {
                        let reference = task_refs.fetch_add(1, Ordering::Relaxed);
                        let Ok(text) = PhoenixMessage::heartbeat(reference).to_text() else {
                            continue;
                        };
                        if write.send(WsMessage::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    incoming = read.next() => {
                        match incoming {
                            Some(Ok(WsMessage::Close(_))) => {
                                let _ = write.send(WsMessage::Close(None)).await;
                                break;
                            }
                            Some(Ok(WsMessage::Ping(_))) | Some(Ok(WsMessage::Pong(_))) => {}
                            Some(Ok(message)) => {
                                match parse_message(message, &task_topic, &join_ref) {
                                    Some(Inbound::Change(event)) => {
                                        log_message_sample_once(&event);
                                        if event_tx.send(event).await.is_err() {
                                            let _ = write.send(WsMessage::Close(None)).await;
                                            break;
                                        }
                                    }
                                    Some(Inbound::JoinReply { ok: false, detail }) => {
                                        warn!(topic = %task_topic, detail = %detail, "realtime channel rejected");
                                        let _ = write.send(WsMessage::Close(None)).await;
                                        break;
                                    }
                                    Some(Inbound::ChannelClosed(event)) => {
                                        warn!(topic = %task_topic, event, "realtime channel closed by server");
                                        let _ = write.send(WsMessage::Close(None)).await;
                                        break;
                                    }
                                    Some(Inbound::JoinReply { ok: true, .. }) | Some(Inbound::Ignored) | None => {}
                                }
                            }
                            Some(Err(err)) => {
                                warn!(topic = %task_topic, error = %err, "realtime socket error");
                                break;
                            }
                            None => break,
                        }
                    }
                }
            }

            debug!(topic = %task_topic, "realtime connection task finished");
        });

        Ok(LiveSubscription {
            table: table.to_string(),
            events: event_rx,
            outbound: Some(outbound_tx),
            refs,
        })
    }
}

/// Handle to one live channel. Dropping it closes the websocket.
#[derive(Debug)]
pub struct LiveSubscription {
    table: String,
    events: mpsc::Receiver<ChangeEvent>,
    outbound: Option<mpsc::Sender<WsMessage>>,
    refs: Arc<AtomicU64>,
}

impl LiveSubscription {
    /// Subscription fed directly from a channel, with no socket behind it
    pub fn from_channel(table: impl Into<String>, events: mpsc::Receiver<ChangeEvent>) -> Self {
        Self {
            table: table.into(),
            events,
            outbound: None,
            refs: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Next change event, or `None` once the connection is gone
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        self.events.recv().await
    }

    /// Leave the channel and close the websocket
    pub async fn close(mut self) -> Result<()> {
        if let Some(outbound) = self.outbound.take() {
            let reference = self.refs.fetch_add(1, Ordering::Relaxed);
            let leave = PhoenixMessage::leave(&self.table, reference).to_text()?;
            // The connection may already be gone; closing is still complete.
            let _ = outbound.send(WsMessage::Text(leave.into())).await;
        }
        self.events.close();
        Ok(())
    }
}

fn parse_message(message: WsMessage, topic: &str, join_ref: &str) -> Option<Inbound> {
    let text: String = match message {
        WsMessage::Text(text) => text.to_string(),
        WsMessage::Binary(bytes) => String::from_utf8(bytes.to_vec()).ok()?,
        _ => return None,
    };

    let parsed = serde_json::from_str::<PhoenixMessage>(&text)
        .map_err(BackendError::from)
        .and_then(|frame| frame.classify(topic, join_ref));
    match parsed {
        Ok(inbound) => Some(inbound),
        Err(err) => {
            log_parse_fail_once(&err, &text);
            None
        }
    }
}

fn log_message_sample_once(event: &ChangeEvent) {
    let count = MESSAGE_SAMPLE_COUNT.fetch_add(1, Ordering::Relaxed);
    if count < MESSAGE_SAMPLE_LIMIT {
        info!(
            sample_index = count + 1,
            sample_limit = MESSAGE_SAMPLE_LIMIT,
            kind = ?event.kind(),
            id = event.id(),
            "realtime message sample"
        );
    }
}

fn log_parse_fail_once(err: &BackendError, raw: &str) {
    let count = PARSE_FAIL_LOG_COUNT.fetch_add(1, Ordering::Relaxed);
    if count < PARSE_FAIL_LOG_LIMIT {
        warn!(
            sample_index = count + 1,
            sample_limit = PARSE_FAIL_LOG_LIMIT,
            error = %err,
            bytes = raw.len(),
            "realtime message rejected"
        );
        let preview = truncate_for_log(raw, RAW_LOG_MAX_BYTES);
        debug!(
            sample_index = count + 1,
            sample_limit = PARSE_FAIL_LOG_LIMIT,
            message = %preview,
            "realtime message rejected"
        );
    }
}

fn truncate_for_log(value: &str, max_len: usize) -> String {
    if value.len() <= max_len {
        return value.to_string();
    }
    let mut end = max_len;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    let mut out = String::with_capacity(end + 3);
    out.push_str(&value[..end]);
    out.push_str("...");
    out
}
