//! Resource label formatting rules derived from the remote environment.
//!
//! Once the remote environment is known, the same formatting policy is
//! registered for the remote-filesystem scheme and the user-data scheme:
//! both refer to the remote side and must render identically.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::env::RemoteAgentService;
use crate::types::{ClientKind, OperatingSystem, REMOTE_SCHEME, USER_DATA_SCHEME};

/// How a resource path under one scheme is rendered as a label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLabelFormatting {
    /// Display template; `${path}` stands for the formatted path.
    pub label: String,
    /// Path separator used when rendering.
    pub separator: char,
    /// Abbreviate the home directory to `~`.
    pub tildify: bool,
    /// Upper-case the drive letter on Windows-style paths.
    pub normalize_drive_letter: bool,
    /// Disambiguating suffix shown next to workspace names, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_suffix: Option<String>,
}

/// A formatting rule: the scheme it matches plus the policy to apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLabelFormatter {
    /// Resource-namespace scheme this rule matches.
    pub scheme: String,
    /// Formatting policy.
    pub formatting: ResourceLabelFormatting,
}

/// Seam to the host's label-rendering engine.
pub trait LabelService: Send + Sync {
    /// Register one formatting rule.
    fn register_formatter(&self, formatter: ResourceLabelFormatter);
}

/// In-process label rule store, for hosts and tests.
#[derive(Debug, Default)]
pub struct LabelRegistry {
    formatters: Mutex<Vec<ResourceLabelFormatter>>,
}

impl LabelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the registered formatters, in registration order.
    pub fn formatters(&self) -> Vec<ResourceLabelFormatter> {
        self.formatters.lock().map(|f| f.clone()).unwrap_or_default()
    }
}

impl LabelService for LabelRegistry {
    fn register_formatter(&self, formatter: ResourceLabelFormatter) {
        if let Ok(mut formatters) = self.formatters.lock() {
            formatters.push(formatter);
        }
    }
}

/// Formatting policy for paths on the remote side.
///
/// The workspace suffix is shown only by desktop clients, which have a
/// parallel local filesystem to disambiguate against.
pub fn remote_formatting(os: OperatingSystem, client: ClientKind) -> ResourceLabelFormatting {
    ResourceLabelFormatting {
        label: "${path}".to_string(),
        separator: if os.is_windows() { '\\' } else { '/' },
        tildify: !os.is_windows(),
        normalize_drive_letter: os.is_windows(),
        workspace_suffix: match client {
            ClientKind::Desktop => Some(REMOTE_SCHEME.to_string()),
            ClientKind::Web => None,
        },
    }
}

/// Registers label formatting rules for the remote schemes once the remote
/// environment is known.
pub struct LabelContribution;

impl LabelContribution {
    /// Fire-and-forget: spawns the registration task and returns
    /// immediately. If the environment resolves absent, no rule is ever
    /// registered.
    pub fn start(
        service: Arc<RemoteAgentService>,
        labels: Arc<dyn LabelService>,
        client: ClientKind,
    ) -> JoinHandle<()> {
        tokio::spawn(Self::run(service, labels, client))
    }

    async fn run(service: Arc<RemoteAgentService>, labels: Arc<dyn LabelService>, client: ClientKind) {
        let Some(environment) = service.environment().await else {
            return;
        };
        let formatting = remote_formatting(environment.os, client);
        // Both rules derive from one descriptor; never partially registered.
        for scheme in [REMOTE_SCHEME, USER_DATA_SCHEME] {
            labels.register_formatter(ResourceLabelFormatter {
                scheme: scheme.to_string(),
                formatting: formatting.clone(),
            });
        }
        debug!(os = %environment.os, "registered remote label formatters");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RemoteEnvironment;

    #[test]
    fn test_windows_formatting() {
        let formatting = remote_formatting(OperatingSystem::Windows, ClientKind::Desktop);
        assert_eq!(formatting.separator, '\\');
        assert!(!formatting.tildify);
        assert!(formatting.normalize_drive_letter);
    }

    #[test]
    fn test_posix_formatting() {
        let formatting = remote_formatting(OperatingSystem::Posix, ClientKind::Desktop);
        assert_eq!(formatting.separator, '/');
        assert!(formatting.tildify);
        assert!(!formatting.normalize_drive_letter);
    }

    #[test]
    fn test_desktop_client_gets_workspace_suffix() {
        for os in [OperatingSystem::Windows, OperatingSystem::Posix] {
            let formatting = remote_formatting(os, ClientKind::Desktop);
            assert_eq!(formatting.workspace_suffix.as_deref(), Some(REMOTE_SCHEME));
        }
    }

    #[test]
    fn test_web_client_gets_no_workspace_suffix() {
        for os in [OperatingSystem::Windows, OperatingSystem::Posix] {
            let formatting = remote_formatting(os, ClientKind::Web);
            assert!(formatting.workspace_suffix.is_none());
        }
    }

    #[tokio::test]
    async fn contribution_registers_both_schemes_identically() {
        let service = Arc::new(RemoteAgentService::resolved(
            RemoteEnvironment {
                os: OperatingSystem::Posix,
                logs_path: "/remote/logs".to_string(),
            },
            None,
        ));
        let registry = Arc::new(LabelRegistry::new());

        LabelContribution::run(service, Arc::clone(&registry) as Arc<dyn LabelService>, ClientKind::Desktop)
            .await;

        let formatters = registry.formatters();
        assert_eq!(formatters.len(), 2);
        assert_eq!(formatters[0].scheme, REMOTE_SCHEME);
        assert_eq!(formatters[1].scheme, USER_DATA_SCHEME);
        assert_eq!(formatters[0].formatting, formatters[1].formatting);
    }

    #[tokio::test]
    async fn contribution_registers_nothing_when_absent() {
        let service = Arc::new(RemoteAgentService::detached());
        let registry = Arc::new(LabelRegistry::new());

        LabelContribution::run(service, Arc::clone(&registry) as Arc<dyn LabelService>, ClientKind::Desktop)
            .await;

        assert!(registry.formatters().is_empty());
    }
}
