//! Output channel registration for the remote agent's log file.
//!
//! Runs at the `Restored` lifecycle phase: the channel may safely wait for
//! the workspace, unlike label rules which are needed as early as possible.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::env::RemoteAgentService;

/// Identifier of the remote agent log output channel.
pub const REMOTE_LOG_CHANNEL_ID: &str = "remote-agent-log";

/// Label shown to the user for the remote agent log output channel.
pub const REMOTE_LOG_CHANNEL_LABEL: &str = "Remote Agent";

/// A named output channel shown by the host's output viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputChannelDescriptor {
    /// Stable identifier.
    pub id: String,
    /// Human-readable label.
    pub label: String,
    /// Backing file, as a remote-side path.
    pub file: String,
    /// Marks the channel as a log channel.
    pub log: bool,
}

/// Seam to the host's output-channel registry.
pub trait OutputChannelRegistry: Send + Sync {
    /// Register one output channel.
    fn register_channel(&self, descriptor: OutputChannelDescriptor);
}

/// In-process output channel store. The first registration wins for a given
/// id.
#[derive(Debug, Default)]
pub struct OutputRegistry {
    channels: Mutex<Vec<OutputChannelDescriptor>>,
}

impl OutputRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the registered channels, in registration order.
    pub fn channels(&self) -> Vec<OutputChannelDescriptor> {
        self.channels.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

impl OutputChannelRegistry for OutputRegistry {
    fn register_channel(&self, descriptor: OutputChannelDescriptor) {
        if let Ok(mut channels) = self.channels.lock() {
            if channels.iter().any(|c| c.id == descriptor.id) {
                return;
            }
            channels.push(descriptor);
        }
    }
}

/// Registers the remote agent's log file as an output channel once the
/// remote environment is known.
pub struct RemoteLogChannelsContribution;

impl RemoteLogChannelsContribution {
    /// Fire-and-forget: spawns the registration task and returns
    /// immediately. If the environment resolves absent, nothing is
    /// registered.
    pub fn start(
        service: Arc<RemoteAgentService>,
        outputs: Arc<dyn OutputChannelRegistry>,
    ) -> JoinHandle<()> {
        tokio::spawn(Self::run(service, outputs))
    }

    async fn run(service: Arc<RemoteAgentService>, outputs: Arc<dyn OutputChannelRegistry>) {
        let Some(environment) = service.environment().await else {
            return;
        };
        let file = environment.log_file();
        outputs.register_channel(OutputChannelDescriptor {
            id: REMOTE_LOG_CHANNEL_ID.to_string(),
            label: REMOTE_LOG_CHANNEL_LABEL.to_string(),
            file: file.clone(),
            log: true,
        });
        debug!(%file, "registered remote agent log channel");
    }
}
