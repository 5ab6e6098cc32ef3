//! Scoreboard service - the session tracker and public surface
//!
//! One `ScoreboardService` per install. It owns the configuration snapshot,
//! the rotation state, the concurrent session map and the background
//! refresher thread. Join/leave notifications and editor mutations may
//! arrive from any thread; per-session mutable state (tick samples, bridge
//! cache) is only written while the refresher thread holds that session's
//! mutex, so sessions need no further coordination.

mod render;
mod scheduler;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info};

use crate::bridge::{BridgeCache, DataBridge, ProviderRegistry};
use crate::config::{BoardConfig, PageConfig};
use crate::core::constants::{JOIN_RENDER_DELAY, MAX_LINES};
use crate::core::page::{Page, RotationState};
use crate::core::placeholders;
use crate::host::{ClientHandle, ClientId, OverlayRenderer, ServerInfo};

use scheduler::{Command, Refresher};

// =============================================================================
// CLIENT SESSION
// =============================================================================

/// Per-client tracked state, created on join and dropped on leave
pub(crate) struct ClientSession {
    pub(crate) client: Arc<dyn ClientHandle>,
    pub(crate) joined_at: Instant,
    /// Last observed (world tick, wall clock) sample for the rate estimate
    pub(crate) last_world_tick: u64,
    pub(crate) last_tick_time: Instant,
    pub(crate) bridge: BridgeCache,
}

impl ClientSession {
    fn new(client: Arc<dyn ClientHandle>) -> Self {
        let now = Instant::now();
        let last_world_tick = client.world_tick().unwrap_or(0);
        Self {
            client,
            joined_at: now,
            last_world_tick,
            last_tick_time: now,
            bridge: BridgeCache::new(),
        }
    }
}

type SessionMap = HashMap<ClientId, Arc<Mutex<ClientSession>>>;

// =============================================================================
// SERVICE INTERNALS
// =============================================================================

pub(crate) struct ServiceInner {
    pub(crate) config: RwLock<BoardConfig>,
    pub(crate) rotation: RwLock<RotationState>,
    pub(crate) sessions: RwLock<SessionMap>,
    pub(crate) bridge: DataBridge,
    pub(crate) renderer: Box<dyn OverlayRenderer>,
    pub(crate) server: Box<dyn ServerInfo>,
    /// Resolved once at startup; the host name does not change mid-run
    pub(crate) server_name: String,
    pub(crate) configured_max_players: u32,
}

impl ServiceInner {
    /// Rotation plus a render pass over every tracked session. Returns true
    /// when the active page changed, which re-arms the refresh cadence.
    pub(crate) fn refresh_all(self: &Arc<Self>) -> bool {
        let rotated = self.rotation.write().maybe_rotate(Instant::now());
        if rotated {
            info!(
                page = self.rotation.read().active_index() + 1,
                "[SERVICE] Rotated to page"
            );
        }
        let entries: Vec<(ClientId, Arc<Mutex<ClientSession>>)> = self
            .sessions
            .read()
            .iter()
            .map(|(id, session)| (id.clone(), Arc::clone(session)))
            .collect();
        let online = entries.len();
        for (id, session) in entries {
            self.refresh_session(&id, &session, online);
        }
        rotated
    }

    pub(crate) fn refresh_one(self: &Arc<Self>, id: &ClientId) {
        let session = self.sessions.read().get(id).cloned();
        let session = match session {
            Some(session) => session,
            None => return,
        };
        let online = self.sessions.read().len();
        self.refresh_session(id, &session, online);
    }

    fn refresh_session(
        self: &Arc<Self>,
        id: &ClientId,
        session: &Arc<Mutex<ClientSession>>,
        online: usize,
    ) {
        let mut guard = session.lock();
        if !guard.client.is_valid() {
            drop(guard);
            self.sessions.write().remove(id);
            debug!(client = %id, "[SERVICE] Evicted stale session");
            return;
        }
        let view = render::build_view(self, &mut guard, online);
        let client = Arc::clone(&guard.client);
        drop(guard);

        // The overlay write has to happen on the client's owning world
        // thread; failures stay scoped to this one session.
        let inner = Arc::clone(self);
        let target = Arc::clone(&client);
        let dispatched = client.dispatch(Box::new(move || {
            if let Err(e) = inner.renderer.show(target.as_ref(), &view) {
                debug!(client = %target.id(), error = %e, "[SERVICE] Overlay update failed");
            }
        }));
        if let Err(e) = dispatched {
            debug!(client = %id, error = %e, "[SERVICE] Dispatch failed");
        }
    }

    /// Insert-or-refresh for a joining client
    pub(crate) fn open_session(self: &Arc<Self>, client: Arc<dyn ClientHandle>) {
        let id = client.id();
        if self.sessions.read().contains_key(&id) {
            self.refresh_one(&id);
            return;
        }
        if !client.is_valid() {
            debug!(client = %id, "[SERVICE] Client vanished before first render");
            return;
        }
        let session = Arc::new(Mutex::new(ClientSession::new(client)));
        self.sessions.write().insert(id.clone(), Arc::clone(&session));
        let online = self.sessions.read().len();
        self.refresh_session(&id, &session, online);
        info!(client = %id, "[SERVICE] HUD overlay shown");
    }

    /// Refresh cadence of the active page; `None` disables the periodic tick
    pub(crate) fn tick_interval(&self) -> Option<std::time::Duration> {
        let global = self.config.read().refresh_ms;
        let ms = self.rotation.read().effective_refresh_ms(global);
        if ms == 0 {
            None
        } else {
            Some(std::time::Duration::from_millis(ms))
        }
    }

    pub(crate) fn resolve_max_players(&self, online: usize) -> u32 {
        if self.configured_max_players > 0 {
            return self.configured_max_players;
        }
        let live = self.server.max_players();
        if live > 0 {
            return live;
        }
        (online as u32).max(1)
    }
}

// =============================================================================
// SCOREBOARD SERVICE
// =============================================================================

/// Public entry point: owns the tracker state and the refresher thread
pub struct ScoreboardService {
    pub(crate) inner: Arc<ServiceInner>,
    refresher: Refresher,
}

impl ScoreboardService {
    pub fn new(
        config: BoardConfig,
        renderer: Box<dyn OverlayRenderer>,
        server: Box<dyn ServerInfo>,
        providers: ProviderRegistry,
    ) -> Self {
        let pages: Vec<Page> = config.pages.iter().map(Page::from_config).collect();
        let rotation = RotationState::new(
            pages,
            config.active_page.saturating_sub(1),
            config.rotation_enabled,
            Instant::now(),
        );
        let server_name = server
            .server_name()
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| "Server".to_string());
        let configured_max_players = server.max_players();

        let inner = Arc::new(ServiceInner {
            config: RwLock::new(config),
            rotation: RwLock::new(rotation),
            sessions: RwLock::new(HashMap::new()),
            bridge: DataBridge::new(providers),
            renderer,
            server,
            server_name,
            configured_max_players,
        });
        let refresher = Refresher::spawn(Arc::clone(&inner));
        Self { inner, refresher }
    }

    /// Arm the periodic refresh. Safe to call once after construction.
    pub fn start(&self) {
        self.refresher.send(Command::Rearm);
        info!(
            refresh_ms = self.inner.config.read().refresh_ms,
            "[SERVICE] Started"
        );
    }

    /// Cancel all timers, hide every tracked overlay and drop the tracker
    pub fn stop(&self) {
        self.refresher.shutdown();
        let sessions: Vec<Arc<Mutex<ClientSession>>> = {
            let mut map = self.inner.sessions.write();
            map.drain().map(|(_, session)| session).collect()
        };
        for session in sessions {
            let session = session.lock();
            if let Err(e) = self.inner.renderer.hide(session.client.as_ref()) {
                debug!(client = %session.client.id(), error = %e, "[SERVICE] Hide on shutdown failed");
            }
        }
        info!("[SERVICE] Stopped");
    }

    // =========================================================================
    // SESSION EVENTS
    // =========================================================================

    /// Client finished loading: track it and schedule its first render.
    /// Duplicate notifications for a tracked client collapse into a
    /// refresh-only pass.
    pub fn handle_client_ready(&self, client: Arc<dyn ClientHandle>) {
        let id = client.id();
        if self.inner.sessions.read().contains_key(&id) {
            self.refresher.send(Command::Refresh(id));
            return;
        }
        self.refresher.send(Command::Open {
            client,
            delay: Some(JOIN_RENDER_DELAY),
        });
    }

    /// Client left: drop its session and hide any visible overlay. No-op
    /// for untracked clients.
    pub fn handle_client_disconnect(&self, id: &ClientId) {
        self.remove_session(id, "disconnect");
    }

    /// Show the overlay immediately (command-driven), without the join delay
    pub fn show_hud(&self, client: Arc<dyn ClientHandle>) {
        self.refresher.send(Command::Open {
            client,
            delay: None,
        });
    }

    /// Hide and untrack a client's overlay
    pub fn hide_hud(&self, id: &ClientId) -> bool {
        self.remove_session(id, "hide")
    }

    fn remove_session(&self, id: &ClientId, reason: &str) -> bool {
        let removed = self.inner.sessions.write().remove(id);
        match removed {
            Some(session) => {
                let session = session.lock();
                if let Err(e) = self.inner.renderer.hide(session.client.as_ref()) {
                    debug!(client = %id, error = %e, "[SERVICE] Hide failed");
                }
                info!(client = %id, reason, "[SERVICE] HUD session removed");
                true
            }
            None => false,
        }
    }

    pub fn online_count(&self) -> usize {
        self.inner.sessions.read().len()
    }

    // =========================================================================
    // LINE EDITING (active page)
    // =========================================================================

    pub fn lines(&self) -> Vec<String> {
        self.inner.rotation.read().active_page().lines.clone()
    }

    pub fn set_line(&self, index: usize, text: impl Into<String>) {
        if index >= MAX_LINES {
            return;
        }
        {
            let mut rotation = self.inner.rotation.write();
            let page = rotation.active_page_mut();
            while page.lines.len() <= index {
                page.lines.push(String::new());
            }
            page.lines[index] = text.into();
        }
        self.refresher.send(Command::RefreshAll);
    }

    pub fn add_line(&self, text: impl Into<String>) -> bool {
        {
            let mut rotation = self.inner.rotation.write();
            let page = rotation.active_page_mut();
            if page.lines.len() >= MAX_LINES {
                return false;
            }
            page.lines.push(text.into());
        }
        self.refresher.send(Command::RefreshAll);
        true
    }

    pub fn remove_line(&self, index: usize) -> bool {
        {
            let mut rotation = self.inner.rotation.write();
            let page = rotation.active_page_mut();
            if index >= page.lines.len() {
                return false;
            }
            page.lines.remove(index);
        }
        self.refresher.send(Command::RefreshAll);
        true
    }

    // =========================================================================
    // CONFIG LIFECYCLE
    // =========================================================================

    /// Fold the live page state back into the config and write it to disk
    pub fn save_config(&self) {
        let (pages, active_index, enabled) = self.snapshot_rotation();
        {
            let mut config = self.inner.config.write();
            *config = config.with_pages(pages, active_index + 1, enabled);
            config.persist();
        }
        self.refresher.send(Command::RefreshAll);
    }

    /// Re-read the config file and replace all live state with it
    pub fn reload_config(&self) {
        let data_dir = self.inner.config.read().data_dir.clone();
        let fresh = BoardConfig::load(&data_dir);
        {
            let mut rotation = self.inner.rotation.write();
            rotation.replace_pages(
                fresh.pages.iter().map(Page::from_config).collect(),
                fresh.active_page.saturating_sub(1),
                fresh.rotation_enabled,
                Instant::now(),
            );
        }
        *self.inner.config.write() = fresh;
        self.refresher.send(Command::Rearm);
        self.refresher.send(Command::RefreshAll);
        info!("[SERVICE] Config reloaded");
    }

    /// Apply a full page set from the interactive editor
    pub fn apply_editor_update(
        &self,
        page_index: usize,
        pages: Vec<PageConfig>,
        rotation_enabled: bool,
        persist: bool,
    ) {
        if pages.is_empty() {
            return;
        }
        {
            let mut rotation = self.inner.rotation.write();
            rotation.replace_pages(
                pages.iter().map(Page::from_config).collect(),
                page_index,
                rotation_enabled,
                Instant::now(),
            );
        }
        {
            let mut config = self.inner.config.write();
            *config = config.with_pages(pages, page_index + 1, rotation_enabled);
            if persist {
                config.persist();
            }
        }
        self.refresher.send(Command::Rearm);
        self.refresher.send(Command::RefreshAll);
    }

    pub fn divider_visible(&self) -> bool {
        self.inner.config.read().divider_visible
    }

    /// Returns false when the toggle was already in the requested state
    pub fn set_divider_visible(&self, visible: bool, persist: bool) -> bool {
        {
            let mut config = self.inner.config.write();
            if config.divider_visible == visible {
                return false;
            }
            *config = config.with_divider_visible(visible);
            if persist {
                config.persist();
            }
        }
        self.refresher.send(Command::RefreshAll);
        true
    }

    pub fn logo_visible(&self) -> bool {
        self.inner.config.read().logo_visible
    }

    pub fn set_logo_visible(&self, visible: bool, persist: bool) -> bool {
        {
            let mut config = self.inner.config.write();
            if config.logo_visible == visible {
                return false;
            }
            *config = config.with_logo_visible(visible);
            if persist {
                config.persist();
            }
        }
        self.refresher.send(Command::RefreshAll);
        true
    }

    // =========================================================================
    // EDITOR SUPPORT
    // =========================================================================

    /// Current page set, for the interactive editor
    pub fn pages_snapshot(&self) -> Vec<PageConfig> {
        self.inner
            .rotation
            .read()
            .pages()
            .iter()
            .map(Page::to_config)
            .collect()
    }

    pub fn active_page_index(&self) -> usize {
        self.inner.rotation.read().active_index()
    }

    pub fn rotation_enabled(&self) -> bool {
        self.inner.rotation.read().enabled()
    }

    /// The fixed comma-joined list of supported placeholder names
    pub fn placeholders_line(&self) -> &'static str {
        placeholders::placeholders_line()
    }

    fn snapshot_rotation(&self) -> (Vec<PageConfig>, usize, bool) {
        let rotation = self.inner.rotation.read();
        (
            rotation.pages().iter().map(Page::to_config).collect(),
            rotation.active_index(),
            rotation.enabled(),
        )
    }
}

impl Drop for ScoreboardService {
    fn drop(&mut self) {
        self.stop();
    }
}

// =============================================================================
// TESTS
// =============================================================================
