//! Host boundary traits - abstractions over the session host runtime
//!
//! The scoreboard engine never talks to the host directly; it goes through
//! these traits. The host adapter implements them over its own connection,
//! world and UI machinery, and tests use the mock implementations below.

use std::fmt;
use std::sync::Arc;

use crate::core::view::BoardView;

// =============================================================================
// CLIENT IDENTITY
// =============================================================================

/// Stable identifier of a connected client, as reported by the host
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(String);

impl ClientId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClientId {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

impl From<String> for ClientId {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

// =============================================================================
// ERRORS
// =============================================================================

/// Failure reported by a host-side call. Every caller in this crate treats
/// these as per-client soft failures; they are logged and never escalate.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// The client's owning world/execution context is gone
    #[error("client execution context is gone")]
    ContextGone,
    /// The host-side call itself failed
    #[error("host call failed: {0}")]
    Backend(String),
}

// =============================================================================
// CLIENT HANDLE
// =============================================================================

/// Work scheduled onto a client's owning world thread
pub type HudTask = Box<dyn FnOnce() + Send + 'static>;

/// A connected client as seen by the scoreboard service.
///
/// World- and entity-derived reads return `None` while the underlying state
/// is unavailable (loading, despawned); the render path substitutes neutral
/// values instead of failing.
pub trait ClientHandle: Send + Sync {
    fn id(&self) -> ClientId;

    fn display_name(&self) -> Option<String>;

    /// Name of the world the client currently occupies
    fn world_name(&self) -> Option<String>;

    fn position(&self) -> Option<[f64; 3]>;

    fn game_mode_name(&self) -> Option<String>;

    /// Monotonic tick counter of the client's world
    fn world_tick(&self) -> Option<u64>;

    /// False once the host has discarded the underlying player entity;
    /// the tracker evicts such sessions on the next refresh pass
    fn is_valid(&self) -> bool;

    /// Run `task` on the client's owning world thread. Hosts enforce a
    /// single-threaded affinity boundary per world; the scheduler submits
    /// work through here rather than mutating world state directly.
    fn dispatch(&self, task: HudTask) -> Result<(), HostError>;
}

// =============================================================================
// OVERLAY RENDERER
// =============================================================================

/// Paints a [`BoardView`] onto a client's screen. Implemented by the host
/// adapter over whatever UI protocol it speaks.
pub trait OverlayRenderer: Send + Sync {
    fn show(&self, client: &dyn ClientHandle, view: &BoardView) -> Result<(), HostError>;

    fn hide(&self, client: &dyn ClientHandle) -> Result<(), HostError>;
}

impl<T: OverlayRenderer + ?Sized> OverlayRenderer for Arc<T> {
    fn show(&self, client: &dyn ClientHandle, view: &BoardView) -> Result<(), HostError> {
        (**self).show(client, view)
    }

    fn hide(&self, client: &dyn ClientHandle) -> Result<(), HostError> {
        (**self).hide(client)
    }
}

// =============================================================================
// SERVER IDENTITY
// =============================================================================

/// Static identity of the hosting server
pub trait ServerInfo: Send + Sync {
    fn server_name(&self) -> Option<String>;

    /// Configured player cap; 0 when the host does not expose one
    fn max_players(&self) -> u32;
}

// =============================================================================
// TEST MOCKS
// =============================================================================

#[cfg(test)]
pub mod mocks {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Scriptable client for tests; every observable field can be flipped
    /// mid-test through interior mutability
    pub struct MockClient {
        pub id: ClientId,
        pub name: Mutex<Option<String>>,
        pub world: Mutex<Option<String>>,
        pub position: Mutex<Option<[f64; 3]>>,
        pub game_mode: Mutex<Option<String>>,
        pub tick: Mutex<Option<u64>>,
        pub valid: AtomicBool,
        pub fail_dispatch: AtomicBool,
        pub dispatched: AtomicUsize,
    }

    impl MockClient {
        pub fn new(id: &str, name: &str) -> Self {
            Self {
                id: ClientId::new(id),
                name: Mutex::new(Some(name.to_string())),
                world: Mutex::new(Some("hub".to_string())),
                position: Mutex::new(Some([10.0, 64.0, -32.0])),
                game_mode: Mutex::new(Some("SURVIVAL".to_string())),
                tick: Mutex::new(Some(1000)),
                valid: AtomicBool::new(true),
                fail_dispatch: AtomicBool::new(false),
                dispatched: AtomicUsize::new(0),
            }
        }

        pub fn set_world(&self, world: Option<&str>) {
            *self.world.lock() = world.map(|w| w.to_string());
        }

        pub fn set_tick(&self, tick: Option<u64>) {
            *self.tick.lock() = tick;
        }

        pub fn invalidate(&self) {
            self.valid.store(false, Ordering::SeqCst);
        }

        pub fn dispatch_count(&self) -> usize {
            self.dispatched.load(Ordering::SeqCst)
        }
    }

    impl ClientHandle for MockClient {
        fn id(&self) -> ClientId {
            self.id.clone()
        }

        fn display_name(&self) -> Option<String> {
            self.name.lock().clone()
        }

        fn world_name(&self) -> Option<String> {
            self.world.lock().clone()
        }

        fn position(&self) -> Option<[f64; 3]> {
            *self.position.lock()
        }

        fn game_mode_name(&self) -> Option<String> {
            self.game_mode.lock().clone()
        }

        fn world_tick(&self) -> Option<u64> {
            *self.tick.lock()
        }

        fn is_valid(&self) -> bool {
            self.valid.load(Ordering::SeqCst)
        }

        fn dispatch(&self, task: HudTask) -> Result<(), HostError> {
            if self.fail_dispatch.load(Ordering::SeqCst) {
                return Err(HostError::ContextGone);
            }
            self.dispatched.fetch_add(1, Ordering::SeqCst);
            task();
            Ok(())
        }
    }

    /// Renderer that records every show/hide call
    #[derive(Default)]
    pub struct MockRenderer {
        pub shows: Mutex<Vec<(ClientId, BoardView)>>,
        pub hides: Mutex<Vec<ClientId>>,
        pub fail: AtomicBool,
    }

    impl MockRenderer {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn show_count(&self) -> usize {
            self.shows.lock().len()
        }

        pub fn last_view(&self) -> Option<BoardView> {
            self.shows.lock().last().map(|(_, view)| view.clone())
        }

        pub fn hidden(&self) -> Vec<ClientId> {
            self.hides.lock().clone()
        }
    }

    impl OverlayRenderer for MockRenderer {
        fn show(&self, client: &dyn ClientHandle, view: &BoardView) -> Result<(), HostError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(HostError::Backend("mock failure".to_string()));
            }
            self.shows.lock().push((client.id(), view.clone()));
            Ok(())
        }

        fn hide(&self, client: &dyn ClientHandle) -> Result<(), HostError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(HostError::Backend("mock failure".to_string()));
            }
            self.hides.lock().push(client.id());
            Ok(())
        }
    }

    /// Fixed server identity
    pub struct MockServer {
        pub name: Option<String>,
        pub max: u32,
    }

    impl MockServer {
        pub fn new(name: &str, max: u32) -> Self {
            Self {
                name: Some(name.to_string()),
                max,
            }
        }

        pub fn anonymous() -> Self {
            Self { name: None, max: 0 }
        }
    }

    impl ServerInfo for MockServer {
        fn server_name(&self) -> Option<String> {
            self.name.clone()
        }

        fn max_players(&self) -> u32 {
            self.max
        }
    }
}
