//! Lossy in-process network between simulated clients.
//!
//! Packets are postcard-encoded on send and decoded on delivery so the
//! replicated types go through a real wire format. State packets may be lost;
//! ownership traffic is reliable. Both are delayed by the configured latency
//! and arrive in send order.
//!
//! Like a relay server, the network only forwards state from the player the
//! authority currently lists as owner. A former owner's pushes that race the
//! hand-off are discarded instead of reverting it.

use std::collections::BTreeMap;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use smart_sync_core::{ObjectId, OwnershipRequest, PlayerId, SyncState, Transport};

#[derive(Debug, thiserror::Error)]
pub enum NetError {
    #[error("failed to encode packet: {0}")]
    Encode(#[source] postcard::Error),
    #[error("failed to decode packet for player {player}: {source}")]
    Decode {
        player: PlayerId,
        #[source]
        source: postcard::Error,
    },
    #[error("unknown player {0}")]
    UnknownPlayer(PlayerId),
    #[error("player {0} tried to announce an ownership change")]
    ForgedOwnership(PlayerId),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WirePacket {
    State { object: ObjectId, state: SyncState },
    OwnershipRequest(OwnershipRequest),
    /// Sent by the authority only.
    OwnerChanged {
        object: ObjectId,
        owner: Option<PlayerId>,
    },
}

/// A client's view of the network. Collects outgoing packets during a tick.
#[derive(Debug)]
pub struct Endpoint {
    local: PlayerId,
    outgoing: Vec<WirePacket>,
}

impl Endpoint {
    pub fn new(local: PlayerId) -> Self {
        Self {
            local,
            outgoing: Vec::new(),
        }
    }

    pub fn drain(&mut self) -> Vec<WirePacket> {
        std::mem::take(&mut self.outgoing)
    }
}

impl Transport for Endpoint {
    fn local_player(&self) -> PlayerId {
        self.local
    }

    fn push(&mut self, object: ObjectId, state: &SyncState) {
        self.outgoing.push(WirePacket::State {
            object,
            state: state.clone(),
        });
    }

    fn request_ownership(&mut self, request: OwnershipRequest) {
        self.outgoing.push(WirePacket::OwnershipRequest(request));
    }
}

/// Session authority deciding who owns what. Competing requests within one
/// tick resolve last-writer-wins.
#[derive(Debug, Default)]
pub struct OwnershipAuthority {
    owners: BTreeMap<ObjectId, Option<PlayerId>>,
    pending: Vec<OwnershipRequest>,
}

impl OwnershipAuthority {
    pub fn owner_of(&self, object: ObjectId) -> Option<PlayerId> {
        self.owners.get(&object).copied().flatten()
    }

    pub fn submit(&mut self, request: OwnershipRequest) {
        self.pending.push(request);
    }

    /// Applies this tick's requests and returns the grants that changed an owner.
    pub fn resolve(&mut self) -> Vec<(ObjectId, PlayerId)> {
        let mut winners: BTreeMap<ObjectId, PlayerId> = BTreeMap::new();
        for request in self.pending.drain(..) {
            winners.insert(request.object, request.requester);
        }

        let mut grants = Vec::new();
        for (object, requester) in winners {
            let entry = self.owners.entry(object).or_insert(None);
            if *entry != Some(requester) {
                tracing::info!(object, old = ?*entry, new = requester, "[net] ownership granted");
                *entry = Some(requester);
                grants.push((object, requester));
            }
        }
        grants
    }

    pub fn assign(&mut self, object: ObjectId, owner: Option<PlayerId>) {
        self.owners.insert(object, owner);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NetStats {
    pub sent: u64,
    pub dropped: u64,
    /// State packets from players that did not own the object.
    pub rejected: u64,
    pub delivered: u64,
    pub bytes: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub to: PlayerId,
    pub packet: WirePacket,
}

#[derive(Debug)]
struct InFlight {
    deliver_at: u64,
    to: PlayerId,
    bytes: Vec<u8>,
}

pub struct LoopbackNetwork {
    players: Vec<PlayerId>,
    rng: ChaCha8Rng,
    drop_rate: f64,
    latency: u64,
    now: u64,
    in_flight: Vec<InFlight>,
    authority: OwnershipAuthority,
    stats: NetStats,
}

impl LoopbackNetwork {
    pub fn new(players: Vec<PlayerId>, drop_rate: f64, latency_ticks: u32, seed: u64) -> Self {
        Self {
            players,
            rng: ChaCha8Rng::seed_from_u64(seed),
            drop_rate: drop_rate.clamp(0.0, 1.0),
            latency: u64::from(latency_ticks),
            now: 0,
            in_flight: Vec::new(),
            authority: OwnershipAuthority::default(),
            stats: NetStats::default(),
        }
    }

    pub fn authority(&self) -> &OwnershipAuthority {
        &self.authority
    }

    pub fn stats(&self) -> NetStats {
        self.stats
    }

    pub fn now(&self) -> u64 {
        self.now
    }

    /// Sets the owner directly and tells every client, e.g. at session start.
    pub fn assign(&mut self, object: ObjectId, owner: Option<PlayerId>) -> Result<(), NetError> {
        self.authority.assign(object, owner);
        self.broadcast_owner(object, owner)
    }

    pub fn send(&mut self, from: PlayerId, packet: &WirePacket) -> Result<(), NetError> {
        if !self.players.contains(&from) {
            return Err(NetError::UnknownPlayer(from));
        }
        match packet {
            WirePacket::State { object, .. } => {
                if self.authority.owner_of(*object) != Some(from) {
                    self.stats.rejected += 1;
                    tracing::debug!(object, player = from, "[net] state from non-owner discarded");
                    return Ok(());
                }
                let bytes = postcard::to_allocvec(packet).map_err(NetError::Encode)?;
                let recipients: Vec<PlayerId> =
                    self.players.iter().copied().filter(|&p| p != from).collect();
                for to in recipients {
                    self.enqueue(to, bytes.clone(), true);
                }
                Ok(())
            }
            WirePacket::OwnershipRequest(request) => {
                self.authority.submit(*request);
                Ok(())
            }
            WirePacket::OwnerChanged { .. } => Err(NetError::ForgedOwnership(from)),
        }
    }

    /// Closes the current tick: resolves ownership, then hands out every
    /// packet that is due.
    pub fn end_tick(&mut self) -> Result<Vec<Delivery>, NetError> {
        for (object, owner) in self.authority.resolve() {
            self.broadcast_owner(object, Some(owner))?;
        }

        let now = self.now;
        let (due, waiting): (Vec<_>, Vec<_>) =
            self.in_flight.drain(..).partition(|packet| packet.deliver_at <= now);
        self.in_flight = waiting;
        self.now += 1;

        due.into_iter()
            .map(|packet| {
                let decoded = postcard::from_bytes(&packet.bytes).map_err(|source| NetError::Decode {
                    player: packet.to,
                    source,
                })?;
                self.stats.delivered += 1;
                Ok(Delivery {
                    to: packet.to,
                    packet: decoded,
                })
            })
            .collect()
    }

    fn broadcast_owner(&mut self, object: ObjectId, owner: Option<PlayerId>) -> Result<(), NetError> {
        let bytes = postcard::to_allocvec(&WirePacket::OwnerChanged { object, owner })
            .map_err(NetError::Encode)?;
        let players = self.players.clone();
        for to in players {
            self.enqueue(to, bytes.clone(), false);
        }
        Ok(())
    }

    fn enqueue(&mut self, to: PlayerId, bytes: Vec<u8>, lossy: bool) {
        self.stats.sent += 1;
        if lossy && self.rng.random_bool(self.drop_rate) {
            self.stats.dropped += 1;
            tracing::trace!(to, "[net] packet dropped");
            return;
        }
        self.stats.bytes += bytes.len() as u64;
        self.in_flight.push(InFlight {
            deliver_at: self.now + self.latency,
            to,
            bytes,
        });
    }
}
