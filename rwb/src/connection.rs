//! Logical-channel multiplexer handle for the remote agent connection.
//!
//! A [`RemoteConnection`] represents zero or one live session to the remote
//! agent. Named [`LogicalChannel`]s multiplex over it: every frame from every
//! channel lands in one outbound queue that the transport (out of scope
//! here) drains.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;

/// Channel-open failure. Surfaced synchronously from construction of
/// whatever wanted the channel; a startup diagnostic, not a crash.
#[derive(Debug, Error)]
pub enum ChannelOpenError {
    /// The transport side of the connection has been dropped.
    #[error("cannot open channel '{channel}': connection to the remote agent is closed")]
    ConnectionClosed { channel: String },
}

/// A best-effort push on a logical channel failed.
#[derive(Debug, Error)]
pub enum PushError {
    /// The transport side of the connection has been dropped.
    #[error("push on channel '{channel}' failed: transport is gone")]
    ChannelClosed { channel: String },
}

/// One outbound frame on the multiplexed connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelRequest {
    /// Name of the logical channel this frame belongs to.
    pub channel: String,
    /// Method invoked on the remote service behind the channel.
    pub method: String,
    /// Method-specific JSON payload.
    pub payload: Value,
}

/// A live multiplexed session to the remote agent.
///
/// Cheap to clone; all clones feed the same outbound queue.
#[derive(Debug, Clone)]
pub struct RemoteConnection {
    outbound: mpsc::UnboundedSender<ChannelRequest>,
}

impl RemoteConnection {
    /// Create a connection handle plus the receiving end the transport
    /// drains.
    pub fn open() -> (Self, mpsc::UnboundedReceiver<ChannelRequest>) {
        let (outbound, rx) = mpsc::unbounded_channel();
        (Self { outbound }, rx)
    }

    /// Open a named logical channel over this connection.
    ///
    /// Fails if the transport side has already been dropped. Opening the
    /// same name twice yields two senders over the same stream.
    pub fn open_channel(
        &self,
        name: impl Into<String>,
    ) -> Result<LogicalChannel, ChannelOpenError> {
        let name = name.into();
        if self.outbound.is_closed() {
            return Err(ChannelOpenError::ConnectionClosed { channel: name });
        }
        Ok(LogicalChannel {
            name,
            outbound: self.outbound.clone(),
        })
    }
}

/// A named, independent message stream multiplexed over one connection.
#[derive(Debug, Clone)]
pub struct LogicalChannel {
    name: String,
    outbound: mpsc::UnboundedSender<ChannelRequest>,
}

impl LogicalChannel {
    /// Name this channel was opened under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Send one request frame. Non-blocking; delivery is best-effort.
    pub fn send(&self, method: impl Into<String>, payload: Value) -> Result<(), PushError> {
        let request = ChannelRequest {
            channel: self.name.clone(),
            method: method.into(),
            payload,
        };
        self.outbound
            .send(request)
            .map_err(|_| PushError::ChannelClosed {
                channel: self.name.clone(),
            })
    }
}
