//! Common types shared across the bridge.

use serde::{Deserialize, Serialize};

/// Resource scheme for files on the remote agent's filesystem.
pub const REMOTE_SCHEME: &str = "remote-agent";

/// Resource scheme for user-data storage. Shared with the host's own profile
/// storage when it is remoted, so it must render the same way as
/// [`REMOTE_SCHEME`].
pub const USER_DATA_SCHEME: &str = "user-data";

/// Base name of the remote agent's log file, without extension.
pub const REMOTE_LOG_BASENAME: &str = "remote-agent";

/// Operating system family of the remote environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatingSystem {
    /// Windows.
    Windows,
    /// macOS, Linux, and everything else path-wise POSIX.
    Posix,
}

impl OperatingSystem {
    pub fn is_windows(self) -> bool {
        matches!(self, Self::Windows)
    }
}

impl std::fmt::Display for OperatingSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Windows => write!(f, "windows"),
            Self::Posix => write!(f, "posix"),
        }
    }
}

/// How the host application is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientKind {
    /// Thick desktop client with a parallel local filesystem.
    Desktop,
    /// Browser-hosted client; there is no local filesystem to disambiguate
    /// remote paths against.
    Web,
}

/// Facts discovered about the remote execution environment.
///
/// Produced at most once per process by the discovery handshake; absence
/// (no remote in play) is terminal and never revisited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteEnvironment {
    /// Remote operating system family.
    pub os: OperatingSystem,
    /// Absolute path of the remote agent's log directory, as understood by
    /// the remote side. Treated as opaque text locally.
    pub logs_path: String,
}

impl RemoteEnvironment {
    /// Path of the remote agent's log file inside `logs_path`.
    ///
    /// Segments are joined with `/` regardless of the remote OS; the path is
    /// interpreted by the remote side, never by the local filesystem.
    pub fn log_file(&self) -> String {
        let dir = self.logs_path.trim_end_matches('/');
        format!("{dir}/{REMOTE_LOG_BASENAME}.log")
    }
}
