//! Mirrors local log-level changes onto the remote agent's logger.
//!
//! The bridge binds once, at construction, if a connection exists: it opens
//! the `"logger"` channel, pushes the current level, then forwards every
//! later change in order until it is dropped. Without a connection it stays
//! unbound forever and holds no subscription.

use std::str::FromStr;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::connection::{ChannelOpenError, LogicalChannel};
use crate::env::RemoteAgentService;

/// Name of the logical channel the remote logger listens on.
pub const LOGGER_CHANNEL: &str = "logger";

/// Default buffer for pending level-change notifications per subscriber.
pub const LEVEL_BUFFER: usize = 64;

/// Log verbosity levels, ordered from most to least verbose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Off,
}

impl LogLevel {
    /// Directive string understood by `tracing_subscriber::EnvFilter`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::Off => "off",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Failed to parse a log level from text.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown log level '{value}'")]
pub struct ParseLogLevelError {
    value: String,
}

impl FromStr for LogLevel {
    type Err = ParseLogLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            "off" | "none" => Ok(Self::Off),
            _ => Err(ParseLogLevelError {
                value: s.to_string(),
            }),
        }
    }
}

/// Local log-level authority: holds the current level and notifies
/// subscribers of changes in the order they occur.
#[derive(Debug)]
pub struct LogLevelService {
    level: Mutex<LogLevel>,
    changes: broadcast::Sender<LogLevel>,
}

impl LogLevelService {
    pub fn new(level: LogLevel) -> Self {
        Self::with_buffer(level, LEVEL_BUFFER)
    }

    /// Like [`new`](Self::new) with an explicit notification buffer.
    ///
    /// `buffer` is clamped to at least 1.
    pub fn with_buffer(level: LogLevel, buffer: usize) -> Self {
        let (changes, _) = broadcast::channel(buffer.max(1));
        Self {
            level: Mutex::new(level),
            changes,
        }
    }

    /// Current level.
    pub fn level(&self) -> LogLevel {
        self.level
            .lock()
            .map(|l| *l)
            .unwrap_or_else(|poisoned| *poisoned.into_inner())
    }

    /// Change the level. Subscribers are notified only on an actual change.
    pub fn set_level(&self, level: LogLevel) {
        let mut current = self
            .level
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if *current == level {
            return;
        }
        *current = level;
        drop(current);
        let _ = self.changes.send(level);
    }

    /// Subscribe to level changes. Dropping the receiver revokes the
    /// subscription.
    pub fn subscribe(&self) -> broadcast::Receiver<LogLevel> {
        self.changes.subscribe()
    }
}

impl Default for LogLevelService {
    fn default() -> Self {
        Self::new(LogLevel::Info)
    }
}

/// Client for the remote logger protocol over the [`LOGGER_CHANNEL`]
/// channel.
#[derive(Debug, Clone)]
pub struct LoggerChannelClient {
    channel: LogicalChannel,
}

impl LoggerChannelClient {
    pub fn new(channel: LogicalChannel) -> Self {
        Self { channel }
    }

    /// Push a level to the remote logger.
    ///
    /// Fire-and-forget: a failed push is logged locally and never retried.
    pub fn set_level(&self, level: LogLevel) {
        if let Err(err) = self.channel.send("setLevel", json!({ "level": level })) {
            warn!(%level, %err, "failed to push log level to remote logger");
        }
    }
}

/// Keeps the remote logger's level in sync with the local one for the
/// lifetime of a connection.
///
/// Dropping the bridge revokes the subscription; no pushes happen
/// afterwards.
#[derive(Debug)]
pub struct LogLevelBridge {
    forwarder: JoinHandle<()>,
}

impl LogLevelBridge {
    /// Bind to the remote logger if a connection exists.
    ///
    /// Returns `Ok(None)` when there is no connection: no channel is opened
    /// and no subscription is held. A channel-open failure propagates to the
    /// caller, who should surface it as a startup diagnostic rather than
    /// crash the host.
    pub fn bind(
        service: &RemoteAgentService,
        levels: &LogLevelService,
    ) -> Result<Option<Self>, ChannelOpenError> {
        let Some(connection) = service.connection() else {
            return Ok(None);
        };
        let client = LoggerChannelClient::new(connection.open_channel(LOGGER_CHANNEL)?);

        // Subscribe before the initial push so a change landing in between
        // is forwarded rather than lost. The push itself is synchronous with
        // construction; no remote acknowledgment is awaited.
        let mut changes = levels.subscribe();
        client.set_level(levels.level());
        let forwarder = tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(level) => client.set_level(level),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!(skipped, "log level forwarder lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        Ok(Some(Self { forwarder }))
    }
}

impl Drop for LogLevelBridge {
    fn drop(&mut self) {
        self.forwarder.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::RemoteConnection;
    use crate::types::{OperatingSystem, RemoteEnvironment};
    use std::time::Duration;
    use tokio::time::timeout;

    fn service_with_connection() -> (RemoteAgentService, tokio::sync::mpsc::UnboundedReceiver<crate::connection::ChannelRequest>) {
        let (connection, rx) = RemoteConnection::open();
        let service = RemoteAgentService::resolved(
            RemoteEnvironment {
                os: OperatingSystem::Posix,
                logs_path: "/remote/logs".to_string(),
            },
            Some(connection),
        );
        (service, rx)
    }

    #[test]
    fn test_log_level_parsing() {
        assert_eq!("info".parse::<LogLevel>().unwrap(), LogLevel::Info);
        assert_eq!("WARN".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!("warning".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!("off".parse::<LogLevel>().unwrap(), LogLevel::Off);
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_log_level_ordering() {
        assert!(LogLevel::Trace < LogLevel::Debug);
        assert!(LogLevel::Error < LogLevel::Off);
    }

    #[test]
    fn test_service_notifies_only_on_change() {
        let service = LogLevelService::new(LogLevel::Info);
        let mut rx = service.subscribe();

        service.set_level(LogLevel::Info); // no-op
        service.set_level(LogLevel::Debug);

        assert_eq!(rx.try_recv().unwrap(), LogLevel::Debug);
        assert!(rx.try_recv().is_err());
        assert_eq!(service.level(), LogLevel::Debug);
    }

    #[test]
    fn test_level_survives_a_poisoned_lock() {
        use std::panic::{AssertUnwindSafe, catch_unwind};

        let service = LogLevelService::new(LogLevel::Warn);
        let poisoned = catch_unwind(AssertUnwindSafe(|| {
            let _guard = service.level.lock().unwrap();
            panic!("poison the level lock");
        }));
        assert!(poisoned.is_err());

        assert_eq!(service.level(), LogLevel::Warn);
        service.set_level(LogLevel::Error);
        assert_eq!(service.level(), LogLevel::Error);
    }

    #[test]
    fn test_with_buffer_clamps_to_at_least_one() {
        let service = LogLevelService::with_buffer(LogLevel::Info, 0);
        let mut rx = service.subscribe();
        service.set_level(LogLevel::Debug);
        assert_eq!(rx.try_recv().unwrap(), LogLevel::Debug);
    }

    #[tokio::test]
    async fn change_issued_right_after_bind_is_not_lost() {
        let (service, mut rx) = service_with_connection();
        let levels = LogLevelService::new(LogLevel::Info);

        let _bridge = LogLevelBridge::bind(&service, &levels).unwrap().unwrap();
        levels.set_level(LogLevel::Debug);

        let initial = rx.recv().await.unwrap();
        assert_eq!(initial.payload["level"], "info");
        let next = timeout(Duration::from_millis(200), rx.recv())
            .await
            .expect("timed out waiting for level push")
            .expect("transport closed");
        assert_eq!(next.payload["level"], "debug");
    }

    #[tokio::test]
    async fn bind_without_connection_stays_unbound() {
        let service = RemoteAgentService::detached();
        let levels = LogLevelService::new(LogLevel::Info);

        let bridge = LogLevelBridge::bind(&service, &levels).unwrap();
        assert!(bridge.is_none());

        // A later local change pushes nothing anywhere: there is no channel.
        levels.set_level(LogLevel::Trace);
        assert_eq!(levels.level(), LogLevel::Trace);
    }

    #[tokio::test]
    async fn bind_pushes_current_level_once() {
        let (service, mut rx) = service_with_connection();
        let levels = LogLevelService::new(LogLevel::Debug);

        let _bridge = LogLevelBridge::bind(&service, &levels).unwrap().unwrap();

        let frame = rx.recv().await.unwrap();
        assert_eq!(frame.channel, LOGGER_CHANNEL);
        assert_eq!(frame.method, "setLevel");
        assert_eq!(frame.payload["level"], "debug");

        // Exactly one initial push.
        let extra = timeout(Duration::from_millis(25), rx.recv()).await;
        assert!(extra.is_err());
    }

    #[tokio::test]
    async fn changes_are_forwarded_in_order() {
        let (service, mut rx) = service_with_connection();
        let levels = LogLevelService::new(LogLevel::Info);

        let _bridge = LogLevelBridge::bind(&service, &levels).unwrap().unwrap();
        let _initial = rx.recv().await.unwrap();

        levels.set_level(LogLevel::Trace);
        levels.set_level(LogLevel::Error);
        levels.set_level(LogLevel::Warn);

        for expected in ["trace", "error", "warn"] {
            let frame = timeout(Duration::from_millis(200), rx.recv())
                .await
                .expect("timed out waiting for level push")
                .expect("transport closed");
            assert_eq!(frame.payload["level"], expected);
        }
    }

    #[tokio::test]
    async fn dropped_bridge_pushes_nothing_further() {
        let (service, mut rx) = service_with_connection();
        let levels = LogLevelService::new(LogLevel::Info);

        let bridge = LogLevelBridge::bind(&service, &levels).unwrap().unwrap();
        let _initial = rx.recv().await.unwrap();
        drop(bridge);

        levels.set_level(LogLevel::Trace);
        let after = timeout(Duration::from_millis(50), rx.recv()).await;
        assert!(after.is_err(), "push arrived after disposal");
    }

    #[tokio::test]
    async fn failed_push_is_swallowed() {
        let (connection, rx) = RemoteConnection::open();
        let channel = connection.open_channel(LOGGER_CHANNEL).unwrap();
        drop(rx);

        // Must not panic or propagate: best-effort semantics.
        LoggerChannelClient::new(channel).set_level(LogLevel::Info);
    }

    #[tokio::test]
    async fn bind_surfaces_channel_open_failure() {
        let (connection, rx) = RemoteConnection::open();
        drop(rx);
        let service = RemoteAgentService::resolved(
            RemoteEnvironment {
                os: OperatingSystem::Posix,
                logs_path: "/remote/logs".to_string(),
            },
            Some(connection),
        );
        let levels = LogLevelService::default();

        let err = LogLevelBridge::bind(&service, &levels).unwrap_err();
        assert!(matches!(err, ChannelOpenError::ConnectionClosed { .. }));
    }
}
