//! Shared limits and timing constants for the scoreboard engine.
//!
//! The layout caps mirror the fixed HUD document on the client side, which
//! has twelve line rows; nothing in this crate can render past them.

use std::time::Duration;

// =============================================================================
// LAYOUT LIMITS
// =============================================================================

/// Hard cap on rendered lines (the HUD layout has 12 fixed rows)
pub const MAX_LINES: usize = 12;

/// Fixed upper bound on configured pages
pub const MAX_PAGES: usize = 12;

/// Color applied by renderers to segments that carry no explicit marker
pub const DEFAULT_TEXT_COLOR: &str = "#f6f8ff";

// =============================================================================
// TIMING FLOORS
// =============================================================================

/// Minimum refresh cadence in milliseconds; a refresh of 0 means
/// "no periodic refresh"
pub const REFRESH_FLOOR_MS: u64 = 1000;

/// Minimum page rotation duration in milliseconds
pub const DURATION_FLOOR_MS: u64 = 1000;

/// Rotation duration assigned to padded empty pages
pub const EMPTY_PAGE_DURATION_MS: u64 = 8000;

/// Refresh cadence assigned to padded empty pages
pub const EMPTY_PAGE_REFRESH_MS: u64 = 2500;

/// Delay between a client joining and its first render, giving the client
/// time to finish loading HUD assets
pub const JOIN_RENDER_DELAY: Duration = Duration::from_millis(500);

// =============================================================================
// EXTERNAL DATA BRIDGE
// =============================================================================

/// How long a cached provider value stays valid per client
pub const BRIDGE_CACHE_TTL: Duration = Duration::from_secs(10);

/// Minimum interval between provider probes after a failed probe
pub const BRIDGE_PROBE_RETRY: Duration = Duration::from_secs(30);
