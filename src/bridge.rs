//! External data bridge
//!
//! Optional data providers (economy balance, rank, faction) live outside
//! this crate and may be absent entirely. The host registers one factory
//! per capability; each factory is probed at startup and, after a failed
//! probe, retried no more often than [`BRIDGE_PROBE_RETRY`]. Values are
//! cached per client for [`BRIDGE_CACHE_TTL`] so an absent or slow provider
//! cannot be hammered on every render. A probe or call failure yields the
//! capability's neutral default, cached like a success - the bridge never
//! fails a render.

use std::time::Instant;

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::core::constants::{BRIDGE_CACHE_TTL, BRIDGE_PROBE_RETRY};
use crate::host::ClientHandle;

// =============================================================================
// PROVIDER CAPABILITIES
// =============================================================================

/// Economy balance lookup
pub trait BalanceProvider: Send + Sync {
    fn balance(&self, client: &dyn ClientHandle) -> Option<i64>;
}

/// Rank/permission-group lookup
pub trait RankProvider: Send + Sync {
    fn rank(&self, client: &dyn ClientHandle) -> Option<String>;
}

/// Faction membership data
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FactionInfo {
    pub name: String,
    pub rank: String,
    pub tag: String,
}

pub trait FactionProvider: Send + Sync {
    fn faction(&self, client: &dyn ClientHandle) -> Option<FactionInfo>;
}

// =============================================================================
// PROVIDER REGISTRY
// =============================================================================

type Factory<P> = Box<dyn Fn() -> Option<Box<P>> + Send + Sync>;

/// Factories for the optional providers, supplied by the host at startup.
/// A factory returns `None` when its integration is not installed or fails
/// to initialize; the bridge will retry later.
#[derive(Default)]
pub struct ProviderRegistry {
    balance: Option<Factory<dyn BalanceProvider>>,
    rank: Option<Factory<dyn RankProvider>>,
    faction: Option<Factory<dyn FactionProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_balance<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Option<Box<dyn BalanceProvider>> + Send + Sync + 'static,
    {
        self.balance = Some(Box::new(factory));
        self
    }

    pub fn with_rank<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Option<Box<dyn RankProvider>> + Send + Sync + 'static,
    {
        self.rank = Some(Box::new(factory));
        self
    }

    pub fn with_faction<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Option<Box<dyn FactionProvider>> + Send + Sync + 'static,
    {
        self.faction = Some(Box::new(factory));
        self
    }
}

// =============================================================================
// PROVIDER SLOT
// =============================================================================

/// One probed capability: either a live provider or a factory waiting for
/// its next probe window
struct Slot<P: ?Sized> {
    provider: Option<Box<P>>,
    factory: Option<Factory<P>>,
    last_probe: Option<Instant>,
    label: &'static str,
}

impl<P: ?Sized> Slot<P> {
    fn new(label: &'static str, factory: Option<Factory<P>>) -> Self {
        Self {
            provider: None,
            factory,
            last_probe: None,
            label,
        }
    }

    fn provider(&mut self, now: Instant) -> Option<&P> {
        if self.provider.is_none() {
            let factory = self.factory.as_ref()?;
            let due = self
                .last_probe
                .map_or(true, |at| now.duration_since(at) >= BRIDGE_PROBE_RETRY);
            if !due {
                return None;
            }
            self.last_probe = Some(now);
            match factory() {
                Some(provider) => {
                    info!(provider = self.label, "[BRIDGE] Provider available");
                    self.provider = Some(provider);
                }
                None => {
                    debug!(provider = self.label, "[BRIDGE] Provider probe failed");
                    return None;
                }
            }
        }
        self.provider.as_deref()
    }

    fn is_available(&self) -> bool {
        self.provider.is_some()
    }
}

// =============================================================================
// PER-CLIENT CACHE
// =============================================================================

struct CachedValue<T> {
    value: T,
    fetched_at: Instant,
}

impl<T: Clone> CachedValue<T> {
    fn fresh(&self, now: Instant) -> Option<T> {
        (now.duration_since(self.fetched_at) < BRIDGE_CACHE_TTL).then(|| self.value.clone())
    }
}

/// Per-client cache of provider values, owned by that client's session and
/// only touched from the session's own refresh
#[derive(Default)]
pub struct BridgeCache {
    balance: Option<CachedValue<i64>>,
    rank: Option<CachedValue<String>>,
    faction: Option<CachedValue<FactionInfo>>,
}

impl BridgeCache {
    pub fn new() -> Self {
        Self::default()
    }
}

// =============================================================================
// DATA BRIDGE
// =============================================================================

/// The capability-probed provider set plus probing state
pub struct DataBridge {
    slots: Mutex<Slots>,
}

struct Slots {
    balance: Slot<dyn BalanceProvider>,
    rank: Slot<dyn RankProvider>,
    faction: Slot<dyn FactionProvider>,
}

impl DataBridge {
    /// Build the bridge and run the initial capability probe
    pub fn new(registry: ProviderRegistry) -> Self {
        let bridge = Self {
            slots: Mutex::new(Slots {
                balance: Slot::new("balance", registry.balance),
                rank: Slot::new("rank", registry.rank),
                faction: Slot::new("faction", registry.faction),
            }),
        };
        let now = Instant::now();
        let mut slots = bridge.slots.lock();
        slots.balance.provider(now);
        slots.rank.provider(now);
        slots.faction.provider(now);
        drop(slots);
        bridge
    }

    pub fn has_balance_provider(&self) -> bool {
        self.slots.lock().balance.is_available()
    }

    pub fn has_rank_provider(&self) -> bool {
        self.slots.lock().rank.is_available()
    }

    pub fn has_faction_provider(&self) -> bool {
        self.slots.lock().faction.is_available()
    }

    /// Balance for a client; `0` when no provider answers
    pub fn balance(&self, cache: &mut BridgeCache, client: &dyn ClientHandle) -> i64 {
        self.balance_at(cache, client, Instant::now())
    }

    pub(crate) fn balance_at(
        &self,
        cache: &mut BridgeCache,
        client: &dyn ClientHandle,
        now: Instant,
    ) -> i64 {
        if let Some(value) = cache.balance.as_ref().and_then(|c| c.fresh(now)) {
            return value;
        }
        let value = {
            let mut slots = self.slots.lock();
            slots
                .balance
                .provider(now)
                .and_then(|p| p.balance(client))
                .unwrap_or(0)
        };
        cache.balance = Some(CachedValue {
            value,
            fetched_at: now,
        });
        value
    }

    /// Rank for a client; empty when no provider answers
    pub fn rank(&self, cache: &mut BridgeCache, client: &dyn ClientHandle) -> String {
        self.rank_at(cache, client, Instant::now())
    }

    pub(crate) fn rank_at(
        &self,
        cache: &mut BridgeCache,
        client: &dyn ClientHandle,
        now: Instant,
    ) -> String {
        if let Some(value) = cache.rank.as_ref().and_then(|c| c.fresh(now)) {
            return value;
        }
        let value = {
            let mut slots = self.slots.lock();
            slots
                .rank
                .provider(now)
                .and_then(|p| p.rank(client))
                .unwrap_or_default()
        };
        cache.rank = Some(CachedValue {
            value: value.clone(),
            fetched_at: now,
        });
        value
    }

    /// Faction data for a client; all-empty when no provider answers
    pub fn faction(&self, cache: &mut BridgeCache, client: &dyn ClientHandle) -> FactionInfo {
        self.faction_at(cache, client, Instant::now())
    }

    pub(crate) fn faction_at(
        &self,
        cache: &mut BridgeCache,
        client: &dyn ClientHandle,
        now: Instant,
    ) -> FactionInfo {
        if let Some(value) = cache.faction.as_ref().and_then(|c| c.fresh(now)) {
            return value;
        }
        let value = {
            let mut slots = self.slots.lock();
            slots
                .faction
                .provider(now)
                .and_then(|p| p.faction(client))
                .unwrap_or_default()
        };
        cache.faction = Some(CachedValue {
            value: value.clone(),
            fetched_at: now,
        });
        value
    }
}

// =============================================================================
// TESTS
// =============================================================================
