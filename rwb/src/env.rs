//! Remote agent service: the connection handle plus memoized environment
//! resolution.

use std::future::Future;
use std::pin::Pin;

use tokio::sync::{Mutex, OnceCell};
use tracing::debug;

use crate::connection::RemoteConnection;
use crate::types::RemoteEnvironment;

type Probe = Pin<Box<dyn Future<Output = Option<RemoteEnvironment>> + Send>>;

/// Facade over the remote agent: answers "is there a connection?"
/// synchronously and "what is the environment?" asynchronously, running the
/// discovery probe at most once per process.
///
/// `None` from [`environment`](Self::environment) means no remote is in
/// play. That answer is terminal: once resolved absent, every later call
/// answers absent without re-probing.
pub struct RemoteAgentService {
    connection: Option<RemoteConnection>,
    probe: Mutex<Option<Probe>>,
    resolved: OnceCell<Option<RemoteEnvironment>>,
}

impl RemoteAgentService {
    /// Service backed by a discovery call that runs at most once.
    ///
    /// The probe must normalize its own failures into `None`: from the
    /// coordinators' point of view "no remote" is a valid terminal answer,
    /// not an error.
    pub fn with_probe(
        probe: impl Future<Output = Option<RemoteEnvironment>> + Send + 'static,
        connection: Option<RemoteConnection>,
    ) -> Self {
        Self {
            connection,
            probe: Mutex::new(Some(Box::pin(probe))),
            resolved: OnceCell::new(),
        }
    }

    /// Service whose environment is already known.
    pub fn resolved(environment: RemoteEnvironment, connection: Option<RemoteConnection>) -> Self {
        Self {
            connection,
            probe: Mutex::new(None),
            resolved: OnceCell::new_with(Some(Some(environment))),
        }
    }

    /// Service with no remote in play: no connection, and the environment
    /// resolves absent.
    pub fn detached() -> Self {
        Self {
            connection: None,
            probe: Mutex::new(None),
            resolved: OnceCell::new_with(Some(None)),
        }
    }

    /// The connection to the remote agent, if one was established before
    /// startup. Never transitions from absent to present.
    pub fn connection(&self) -> Option<&RemoteConnection> {
        self.connection.as_ref()
    }

    /// Resolve the remote environment.
    ///
    /// The first caller drives the probe; concurrent and later callers all
    /// observe the same memoized answer.
    pub async fn environment(&self) -> Option<RemoteEnvironment> {
        self.resolved
            .get_or_init(|| async {
                let probe = self.probe.lock().await.take();
                let environment = match probe {
                    Some(probe) => probe.await,
                    None => None,
                };
                debug!(present = environment.is_some(), "remote environment resolved");
                environment
            })
            .await
            .clone()
    }
}
