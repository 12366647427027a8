//! Lifecycle-phase contribution registry and the remote contribution set.
//!
//! The host constructs contributions at named startup phases. Label rules
//! and the log-level bridge go in at `Starting`; the remote log output
//! channel waits until `Restored`. None of the three depends on another;
//! they compose only through [`RemoteAgentService`].

use std::sync::{Arc, Mutex};

use tracing::warn;

use crate::env::RemoteAgentService;
use crate::label::{LabelContribution, LabelService};
use crate::log_bridge::{LogLevelBridge, LogLevelService};
use crate::output::{OutputChannelRegistry, RemoteLogChannelsContribution};
use crate::types::ClientKind;

/// Host startup phases at which contributions are constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LifecyclePhase {
    /// The host has begun starting; core services exist.
    Starting,
    /// The workspace has been fully restored.
    Restored,
}

type Ctor = Box<dyn FnOnce() + Send>;

#[derive(Default)]
struct State {
    pending: Vec<(LifecyclePhase, Ctor)>,
    reached: Option<LifecyclePhase>,
}

/// Registry of contribution constructors keyed by lifecycle phase.
///
/// The host drives [`advance_to`](Self::advance_to); each constructor runs
/// exactly once, in registration order, when its phase is reached.
#[derive(Default)]
pub struct WorkbenchContributions {
    state: Mutex<State>,
}

impl WorkbenchContributions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a contribution constructor for `phase`.
    ///
    /// If the phase has already been reached, the constructor runs
    /// immediately.
    pub fn register(&self, phase: LifecyclePhase, ctor: impl FnOnce() + Send + 'static) {
        let mut ctor: Option<Ctor> = Some(Box::new(ctor));
        if let Ok(mut state) = self.state.lock() {
            if !matches!(state.reached, Some(reached) if phase <= reached) {
                if let Some(pending) = ctor.take() {
                    state.pending.push((phase, pending));
                }
            }
        }
        if let Some(ctor) = ctor {
            ctor();
        }
    }

    /// Advance to `phase`, constructing every pending contribution whose
    /// phase has now been reached, in registration order. Phases never
    /// regress.
    pub fn advance_to(&self, phase: LifecyclePhase) {
        let due: Vec<Ctor> = match self.state.lock() {
            Ok(mut state) => {
                let reached = state.reached.map_or(phase, |r| r.max(phase));
                state.reached = Some(reached);
                let mut due = Vec::new();
                let mut remaining = Vec::new();
                for (p, ctor) in state.pending.drain(..) {
                    if p <= reached {
                        due.push(ctor);
                    } else {
                        remaining.push((p, ctor));
                    }
                }
                state.pending = remaining;
                due
            }
            Err(_) => Vec::new(),
        };
        // Constructors run outside the lock; they may register more.
        for ctor in due {
            ctor();
        }
    }
}

/// Everything the remote contributions need from the host.
pub struct RemoteContributionDeps {
    /// Environment resolution and the optional connection.
    pub service: Arc<RemoteAgentService>,
    /// Label-rendering seam.
    pub labels: Arc<dyn LabelService>,
    /// Output-channel seam.
    pub outputs: Arc<dyn OutputChannelRegistry>,
    /// Local log-level authority.
    pub levels: Arc<LogLevelService>,
    /// How this host is delivered.
    pub client: ClientKind,
}

/// Handle to the constructed remote contributions.
///
/// Owns the log-level bridge once it binds; dropping the handle releases the
/// bridge's subscription.
#[derive(Default)]
pub struct RemoteContributions {
    bridge: Mutex<Option<LogLevelBridge>>,
}

impl RemoteContributions {
    /// Whether the log-level bridge bound to a connection.
    pub fn log_bridge_bound(&self) -> bool {
        self.bridge.lock().map(|b| b.is_some()).unwrap_or(false)
    }
}

/// Wire the three remote coordinators into the contribution registry.
///
/// A channel-open failure in the log-level bridge is reported as a warning
/// and does not abort the remaining contributions.
pub fn register_remote_contributions(
    contributions: &WorkbenchContributions,
    deps: RemoteContributionDeps,
) -> Arc<RemoteContributions> {
    let handle = Arc::new(RemoteContributions::default());
    let RemoteContributionDeps {
        service,
        labels,
        outputs,
        levels,
        client,
    } = deps;

    {
        let service = Arc::clone(&service);
        contributions.register(LifecyclePhase::Starting, move || {
            LabelContribution::start(service, labels, client);
        });
    }

    {
        let service = Arc::clone(&service);
        let handle = Arc::clone(&handle);
        contributions.register(LifecyclePhase::Starting, move || {
            match LogLevelBridge::bind(&service, &levels) {
                Ok(Some(bridge)) => {
                    if let Ok(mut slot) = handle.bridge.lock() {
                        *slot = Some(bridge);
                    }
                }
                Ok(None) => {}
                Err(err) => warn!(%err, "log level bridge could not bind to the remote logger"),
            }
        });
    }

    contributions.register(LifecyclePhase::Restored, move || {
        RemoteLogChannelsContribution::start(service, outputs);
    });

    handle
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, impl Fn() -> usize) {
        let n = Arc::new(AtomicUsize::new(0));
        let read = {
            let n = Arc::clone(&n);
            move || n.load(Ordering::SeqCst)
        };
        (n, read)
    }

    #[test]
    fn test_ctor_waits_for_its_phase() {
        let contributions = WorkbenchContributions::new();
        let (n, count) = counter();

        contributions.register(LifecyclePhase::Restored, move || {
            n.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(count(), 0);

        contributions.advance_to(LifecyclePhase::Starting);
        assert_eq!(count(), 0);

        contributions.advance_to(LifecyclePhase::Restored);
        assert_eq!(count(), 1);
    }

    #[test]
    fn test_ctor_runs_exactly_once() {
        let contributions = WorkbenchContributions::new();
        let (n, count) = counter();

        contributions.register(LifecyclePhase::Starting, move || {
            n.fetch_add(1, Ordering::SeqCst);
        });
        contributions.advance_to(LifecyclePhase::Starting);
        contributions.advance_to(LifecyclePhase::Starting);
        contributions.advance_to(LifecyclePhase::Restored);
        assert_eq!(count(), 1);
    }

    #[test]
    fn test_late_registration_runs_immediately() {
        let contributions = WorkbenchContributions::new();
        contributions.advance_to(LifecyclePhase::Restored);

        let (n, count) = counter();
        contributions.register(LifecyclePhase::Starting, move || {
            n.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(count(), 1);
    }

    #[test]
    fn test_ctors_run_in_registration_order() {
        let contributions = WorkbenchContributions::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let order = Arc::clone(&order);
            contributions.register(LifecyclePhase::Starting, move || {
                if let Ok(mut o) = order.lock() {
                    o.push(tag);
                }
            });
        }
        contributions.advance_to(LifecyclePhase::Restored);

        assert_eq!(*order.lock().unwrap(), ["first", "second", "third"]);
    }

    #[test]
    fn test_skipping_straight_to_restored_runs_earlier_phases() {
        let contributions = WorkbenchContributions::new();
        let (n, count) = counter();

        contributions.register(LifecyclePhase::Starting, move || {
            n.fetch_add(1, Ordering::SeqCst);
        });
        contributions.advance_to(LifecyclePhase::Restored);
        assert_eq!(count(), 1);
    }
}
