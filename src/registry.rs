//! Server-side peer registry and liveness prober.
//!
//! The registry is the membership list used for fan-out. Readers take a snapshot and
//! mutate by identity afterwards, so a removal never disturbs an iteration in flight.

use crate::protocol::Message;
use crate::transport::PeerTransport;
use crate::types::ClientId;
use futures_util::future::join_all;
use log::{debug, info, warn};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// One known client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PeerEntry {
    pub identity: ClientId,
    /// Outcome of the most recent probe; false until the first probe answers.
    pub last_seen_alive: bool,
}

#[derive(Debug)]
struct Slot {
    entry: PeerEntry,
    /// Bumped on every fresh registration; tells a re-registered peer from its stale probe.
    generation: u64,
}

#[derive(Debug, Default)]
struct Members {
    slots: Vec<Slot>,
    next_generation: u64,
}

/// Registered clients in registration order.
#[derive(Debug, Default)]
pub struct PeerRegistry {
    members: Mutex<Members>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `identity`. Returns false (and changes nothing) if it is already known.
    pub fn register(&self, identity: ClientId) -> bool {
        let mut members = self.lock();
        if members.slots.iter().any(|s| s.entry.identity == identity) {
            return false;
        }
        members.next_generation += 1;
        let generation = members.next_generation;
        members.slots.push(Slot {
            entry: PeerEntry {
                identity,
                last_seen_alive: false,
            },
            generation,
        });
        true
    }

    /// Remove `identity`. Returns true if it was present.
    pub fn remove(&self, identity: &ClientId) -> bool {
        let mut members = self.lock();
        let before = members.slots.len();
        members.slots.retain(|s| &s.entry.identity != identity);
        members.slots.len() != before
    }

    /// Remove `identity` only if it is still the registration seen at `generation`.
    pub(crate) fn remove_generation(&self, identity: &ClientId, generation: u64) -> bool {
        let mut members = self.lock();
        let before = members.slots.len();
        members
            .slots
            .retain(|s| !(&s.entry.identity == identity && s.generation == generation));
        members.slots.len() != before
    }

    /// Record a successful probe. No-op if the entry was removed meanwhile.
    pub fn mark_alive(&self, identity: &ClientId) {
        if let Some(slot) = self.lock().slots.iter_mut().find(|s| &s.entry.identity == identity) {
            slot.entry.last_seen_alive = true;
        }
    }

    /// Current member identities, copied out.
    pub fn snapshot(&self) -> Vec<ClientId> {
        self.lock().slots.iter().map(|s| s.entry.identity.clone()).collect()
    }

    /// Like [`PeerRegistry::snapshot`], with each entry's registration generation.
    pub(crate) fn snapshot_generations(&self) -> Vec<(ClientId, u64)> {
        self.lock()
            .slots
            .iter()
            .map(|s| (s.entry.identity.clone(), s.generation))
            .collect()
    }

    pub fn entries(&self) -> Vec<PeerEntry> {
        self.lock().slots.iter().map(|s| s.entry.clone()).collect()
    }

    pub fn contains(&self, identity: &ClientId) -> bool {
        self.lock().slots.iter().any(|s| &s.entry.identity == identity)
    }

    pub fn len(&self) -> usize {
        self.lock().slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, Members> {
        self.members.lock().unwrap_or_else(|p| p.into_inner())
    }
}

/// Result of one liveness cycle.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProbeReport {
    pub alive: Vec<ClientId>,
    /// Entries this cycle actually removed.
    pub removed: Vec<ClientId>,
}

enum Probed {
    Alive,
    Removed,
    /// Failed, but the entry was removed or re-registered while the probe was in flight.
    Stale,
}

/// Periodically pings every registered client and drops the ones that do not answer.
///
/// A single failed probe removes the entry; there is no retry budget.
pub struct Prober {
    registry: Arc<PeerRegistry>,
    transport: Arc<dyn PeerTransport>,
    interval: Duration,
    timeout: Duration,
}

impl Prober {
    pub fn new(
        registry: Arc<PeerRegistry>,
        transport: Arc<dyn PeerTransport>,
        interval: Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            registry,
            transport,
            interval,
            timeout,
        }
    }

    /// Probe every current entry concurrently, each within its own timeout.
    ///
    /// Each outcome is applied to the registry as soon as that probe finishes, so a
    /// dead peer leaves the fan-out set without waiting for slower probes. A failed
    /// probe never removes a peer that re-registered after the cycle's snapshot.
    pub async fn run_cycle(&self) -> ProbeReport {
        let members = self.registry.snapshot_generations();
        let probes = members.into_iter().map(|(identity, generation)| async move {
            let ping = Message::Ping { client_id: None };
            let outcome = match self.transport.send(identity.as_str(), &ping, self.timeout).await {
                Ok(reply) => {
                    debug!("probe ok client={} reply={}", identity, reply.msg);
                    self.registry.mark_alive(&identity);
                    Probed::Alive
                }
                Err(e) => {
                    warn!("Client {} is unreachable, removing from the list: {}", identity, e);
                    if self.registry.remove_generation(&identity, generation) {
                        info!("client removed client={} remaining={}", identity, self.registry.len());
                        Probed::Removed
                    } else {
                        debug!("stale probe ignored client={} generation={}", identity, generation);
                        Probed::Stale
                    }
                }
            };
            (identity, outcome)
        });

        let mut report = ProbeReport::default();
        for (identity, outcome) in join_all(probes).await {
            match outcome {
                Probed::Alive => report.alive.push(identity),
                Probed::Removed => report.removed.push(identity),
                Probed::Stale => {}
            }
        }
        report
    }

    /// Run cycles forever, one per interval tick.
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            self.run_cycle().await;
        }
    }
}
