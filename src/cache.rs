// Lock order is always gates before entries. Opt-out and store both hold the
// player's gate lock, so a store issued under an older epoch is rejected.

use chrono::{DateTime, Duration, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, info};
use uuid::Uuid;

use crate::percentile::PercentileSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub team_id: Uuid,
    pub player_id: Uuid,
}

#[derive(Debug, Default)]
struct ConsentGate {
    opted_out: bool,
    epoch: u64,
}

#[derive(Debug, Clone)]
struct CachedSnapshot {
    snapshot: PercentileSnapshot,
    roster: Vec<Uuid>,
}

/// Consent epoch observed at lookup time.
#[derive(Debug, Clone, Copy)]
pub struct ComputeTicket {
    key: CacheKey,
    epoch: u64,
}

#[derive(Debug, Clone)]
pub enum Lookup {
    OptedOut,
    Hit(PercentileSnapshot),
    Miss(ComputeTicket),
}

#[derive(Debug)]
pub struct SnapshotCache {
    ttl: Duration,
    gates: DashMap<Uuid, ConsentGate>,
    entries: DashMap<CacheKey, CachedSnapshot>,
}

impl SnapshotCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            gates: DashMap::new(),
            entries: DashMap::new(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn is_opted_out(&self, player_id: Uuid) -> bool {
        self.gates
            .get(&player_id)
            .map(|gate| gate.opted_out)
            .unwrap_or(false)
    }

    pub fn lookup(&self, key: CacheKey, roster: &[Uuid], now: DateTime<Utc>) -> Lookup {
        let gate = self.gates.get(&key.player_id);
        let epoch = match &gate {
            Some(gate) if gate.opted_out => return Lookup::OptedOut,
            Some(gate) => gate.epoch,
            None => 0,
        };

        let hit = self
            .entries
            .get(&key)
            .filter(|cached| cached.roster == roster && now < cached.snapshot.expires_at)
            .map(|cached| cached.snapshot.clone());

        match hit {
            Some(snapshot) => {
                debug!(team_id = %key.team_id, player_id = %key.player_id, "percentile cache hit");
                Lookup::Hit(snapshot)
            }
            None => {
                debug!(team_id = %key.team_id, player_id = %key.player_id, "percentile cache miss");
                Lookup::Miss(ComputeTicket { key, epoch })
            }
        }
    }

    /// Returns `false` when the player's consent changed since `ticket` was
    /// issued. Expired entries are swept on every successful store.
    pub fn store(&self, ticket: ComputeTicket, snapshot: PercentileSnapshot, roster: Vec<Uuid>) -> bool {
        // a vacant entry still holds the shard lock; players who never
        // changed consent get no gate
        let gate = self.gates.entry(ticket.key.player_id);
        let current = match &gate {
            Entry::Occupied(occupied) if occupied.get().opted_out => None,
            Entry::Occupied(occupied) => Some(occupied.get().epoch),
            Entry::Vacant(_) => Some(0),
        };
        if current != Some(ticket.epoch) {
            debug!(player_id = %ticket.key.player_id, "discarding snapshot computed before consent change");
            return false;
        }

        self.purge_expired(snapshot.computed_at);
        self.entries
            .insert(ticket.key, CachedSnapshot { snapshot, roster });
        drop(gate);
        true
    }

    pub fn opt_out(&self, player_id: Uuid) {
        let mut gate = self.gates.entry(player_id).or_default();
        gate.opted_out = true;
        gate.epoch += 1;
        self.entries.retain(|key, _| key.player_id != player_id);
        drop(gate);
        info!(%player_id, "player opted out of comparisons, cached snapshots purged");
    }

    pub fn opt_in(&self, player_id: Uuid) {
        let mut gate = self.gates.entry(player_id).or_default();
        if gate.opted_out {
            gate.opted_out = false;
            gate.epoch += 1;
            info!(%player_id, "player opted back in to comparisons");
        }
    }

    pub fn invalidate_team(&self, team_id: Uuid) {
        let before = self.entries.len();
        self.entries.retain(|key, _| key.team_id != team_id);
        let purged = before.saturating_sub(self.entries.len());
        if purged > 0 {
            debug!(%team_id, purged, "invalidated team snapshots");
        }
    }

    fn purge_expired(&self, now: DateTime<Utc>) {
        self.entries
            .retain(|_, cached| now < cached.snapshot.expires_at);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
