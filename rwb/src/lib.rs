//! Remote Workbench Bridge
//!
//! Keeps an editor-like host synchronized with a separately-running remote
//! agent process. A one-time asynchronous handshake discovers the remote
//! environment (OS family, log directory); three independent coordinators
//! propagate what it finds:
//!
//! - label formatting rules for the remote resource schemes,
//! - a file-backed output channel for the remote agent's log,
//! - a log-level mirror that pushes local level changes over the agent
//!   connection.
//!
//! Each coordinator fires at most once per process, only if the environment
//! or connection it depends on actually exists, and never blocks host
//! startup.
//!
//! # Modules
//!
//! - [`env`] - memoized remote environment resolution
//! - [`connection`] - logical-channel multiplexer handle
//! - [`label`] - label formatting rules for remote schemes
//! - [`log_bridge`] - local-to-remote log level mirroring
//! - [`output`] - remote log output channel registration
//! - [`contrib`] - lifecycle-phase contribution wiring
//! - [`config`] / [`logging`] - host-facing setup

#![forbid(unsafe_code)]

pub mod config;
pub mod connection;
pub mod contrib;
pub mod env;
pub mod label;
pub mod log_bridge;
pub mod logging;
pub mod output;
pub mod types;

pub use config::{BridgeConfig, ConfigError};
pub use connection::{
    ChannelOpenError, ChannelRequest, LogicalChannel, PushError, RemoteConnection,
};
pub use contrib::{
    LifecyclePhase, RemoteContributionDeps, RemoteContributions, WorkbenchContributions,
    register_remote_contributions,
};
pub use env::RemoteAgentService;
pub use label::{
    LabelContribution, LabelRegistry, LabelService, ResourceLabelFormatter,
    ResourceLabelFormatting, remote_formatting,
};
pub use log_bridge::{
    LEVEL_BUFFER, LOGGER_CHANNEL, LogLevel, LogLevelBridge, LogLevelService, LoggerChannelClient,
};
pub use logging::{LogConfig, init_logging};
pub use output::{
    OutputChannelDescriptor, OutputChannelRegistry, OutputRegistry,
    REMOTE_LOG_CHANNEL_ID, REMOTE_LOG_CHANNEL_LABEL, RemoteLogChannelsContribution,
};
pub use types::{
    ClientKind, OperatingSystem, REMOTE_SCHEME, RemoteEnvironment, USER_DATA_SCHEME,
};
