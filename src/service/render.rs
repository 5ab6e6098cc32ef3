//! Render pipeline
//!
//! Turns a page's line templates into a [`BoardView`] for one session:
//! placeholder substitution first, then bold stripping, then color
//! segmentation. Placeholder values are only computed for tokens actually
//! present in the template - the bridge-backed ones would otherwise hit the
//! provider cache on every line of every refresh.

use std::sync::Arc;
use std::time::Instant;

use crate::core::color::decode_leading_color;
use crate::core::constants::MAX_LINES;
use crate::core::markup::{parse_segments, strip_bold_markers};
use crate::core::view::{BoardView, LineRender};

use super::{ClientSession, ServiceInner};

// =============================================================================
// VIEW BUILDING
// =============================================================================

pub(crate) fn build_view(
    inner: &ServiceInner,
    session: &mut ClientSession,
    online: usize,
) -> BoardView {
    let world = session.client.world_name();
    let page = inner
        .rotation
        .read()
        .page_for_world(world.as_deref())
        .clone();

    let (max_lines, offset_right, offset_top, divider_visible, logo_visible, logo_texture_path) = {
        let config = inner.config.read();
        (
            config.max_lines.min(MAX_LINES),
            config.offset_right,
            config.offset_top,
            config.divider_visible,
            config.logo_visible,
            config.logo_texture_path.clone(),
        )
    };

    let mut lines = Vec::new();
    for template in &page.lines {
        if lines.len() >= max_lines {
            break;
        }
        let substituted = apply_placeholders(template, inner, session, online);
        let (text, bold) = strip_bold_markers(&substituted);
        lines.push(LineRender::new(parse_segments(&text), bold));
    }

    let (title_color, title) = decode_leading_color(&page.title);
    BoardView {
        title,
        title_color,
        logo_texture_path,
        offset_right,
        offset_top,
        lines,
        divider_visible,
        logo_visible,
    }
}

// =============================================================================
// PLACEHOLDER SUBSTITUTION
// =============================================================================

/// Substitute every known placeholder present in `template`. Unknown tokens
/// stay verbatim. Idempotent for identical session state; the only side
/// effects are the tick-rate sample and the bridge cache warm-up.
pub(crate) fn apply_placeholders(
    template: &str,
    inner: &ServiceInner,
    session: &mut ClientSession,
    online: usize,
) -> String {
    let mut result = template.to_string();

    if result.contains("{server}") {
        result = result.replace("{server}", &inner.server_name);
    }
    if result.contains("{player}") {
        result = result.replace("{player}", &display_name(session));
    }
    if result.contains("{world}") {
        result = result.replace("{world}", &world_name(session));
    }
    if result.contains("{online}") {
        result = result.replace("{online}", &online.to_string());
    }
    if result.contains("{max_players}") {
        result = result.replace("{max_players}", &inner.resolve_max_players(online).to_string());
    }
    if result.contains("{playtime}") {
        let seconds = session.joined_at.elapsed().as_secs();
        result = result.replace("{playtime}", &format_playtime(seconds));
    }
    if result.contains("{tps}") {
        let tps = format_tps(session);
        result = result.replace("{tps}", &tps);
    }
    if result.contains("{money}") || result.contains("{balance}") {
        let client = Arc::clone(&session.client);
        let balance = inner
            .bridge
            .balance(&mut session.bridge, client.as_ref())
            .to_string();
        result = result.replace("{money}", &balance);
        result = result.replace("{balance}", &balance);
    }
    if result.contains("{pos_x}") {
        result = result.replace("{pos_x}", &format_pos(session, Axis::X));
    }
    if result.contains("{pos_y}") {
        result = result.replace("{pos_y}", &format_pos(session, Axis::Y));
    }
    if result.contains("{pos_z}") {
        result = result.replace("{pos_z}", &format_pos(session, Axis::Z));
    }
    if result.contains("{gamemode}") {
        let mode = session
            .client
            .game_mode_name()
            .filter(|mode| !mode.is_empty())
            .unwrap_or_else(|| "SURVIVAL".to_string());
        result = result.replace("{gamemode}", &mode);
    }
    if result.contains("{world_tick}") {
        let tick = session.client.world_tick().unwrap_or(0);
        result = result.replace("{world_tick}", &tick.to_string());
    }
    if result.contains("{chunk_x}") {
        result = result.replace("{chunk_x}", &format_chunk(session, Axis::X));
    }
    if result.contains("{chunk_z}") {
        result = result.replace("{chunk_z}", &format_chunk(session, Axis::Z));
    }
    if result.contains("{uuid}") {
        result = result.replace("{uuid}", session.client.id().as_str());
    }
    if result.contains("{rank}") {
        let client = Arc::clone(&session.client);
        let rank = inner.bridge.rank(&mut session.bridge, client.as_ref());
        result = result.replace("{rank}", &rank);
    }
    if result.contains("{faction}")
        || result.contains("{faction_rank}")
        || result.contains("{faction_tag}")
    {
        let client = Arc::clone(&session.client);
        let faction = inner.bridge.faction(&mut session.bridge, client.as_ref());
        // Longer tokens first so {faction} does not eat its variants.
        result = result.replace("{faction_rank}", &faction.rank);
        result = result.replace("{faction_tag}", &faction.tag);
        result = result.replace("{faction}", &faction.name);
    }

    result
}

// =============================================================================
// VALUE FORMATTING
// =============================================================================

enum Axis {
    X,
    Y,
    Z,
}

fn display_name(session: &ClientSession) -> String {
    session
        .client
        .display_name()
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "Player".to_string())
}

fn world_name(session: &ClientSession) -> String {
    session
        .client
        .world_name()
        .filter(|world| !world.is_empty())
        .unwrap_or_else(|| "world".to_string())
}

fn format_playtime(total_seconds: u64) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    format!("{hours:02}h {minutes:02}m {seconds:02}s")
}

/// Estimated ticks per second from the (tick, time) delta since the last
/// sample, clamped to [0, 20]. The first sample after a stall or any
/// non-positive delta yields the neutral 20.0 rather than faulting.
fn format_tps(session: &mut ClientSession) -> String {
    let tick_now = match session.client.world_tick() {
        Some(tick) => tick,
        None => return "20.0".to_string(),
    };
    let now = Instant::now();
    let tick_delta = tick_now as i64 - session.last_world_tick as i64;
    let time_delta = now.duration_since(session.last_tick_time);
    session.last_world_tick = tick_now;
    session.last_tick_time = now;
    if tick_delta <= 0 || time_delta.is_zero() {
        return "20.0".to_string();
    }
    let tps = tick_delta as f64 / time_delta.as_secs_f64();
    format!("{:.1}", tps.clamp(0.0, 20.0))
}

fn format_pos(session: &ClientSession, axis: Axis) -> String {
    let pos = match session.client.position() {
        Some(pos) => pos,
        None => return "0".to_string(),
    };
    let (prefix, value) = match axis {
        Axis::X => ("X: ", pos[0]),
        Axis::Y => ("Y: ", pos[1]),
        Axis::Z => ("Z: ", pos[2]),
    };
    format!("{}{}", prefix, value.round() as i64)
}

fn format_chunk(session: &ClientSession, axis: Axis) -> String {
    let pos = match session.client.position() {
        Some(pos) => pos,
        None => return "0".to_string(),
    };
    let value = match axis {
        Axis::X => pos[0],
        Axis::Z => pos[2],
        Axis::Y => 0.0,
    };
    ((value / 16.0).floor() as i64).to_string()
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::{BalanceProvider, ProviderRegistry};
    use crate::config::BoardConfig;
    use crate::host::mocks::{MockClient, MockRenderer, MockServer};
    use crate::host::ClientHandle;
    use crate::service::ScoreboardService;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct CountingBalance {
        calls: Arc<AtomicUsize>,
    }

    impl BalanceProvider for CountingBalance {
        fn balance(&self, _client: &dyn ClientHandle) -> Option<i64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Some(1234)
        }
    }

    fn service_with_providers(providers: ProviderRegistry) -> ScoreboardService {
        ScoreboardService::new(
            BoardConfig::defaults(Path::new("test-data")),
            Box::new(MockRenderer::new()),
            Box::new(MockServer::new("Test Server", 20)),
            providers,
        )
    }

    fn counting_service() -> (ScoreboardService, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);
        let providers = ProviderRegistry::new().with_balance(move || {
            Some(Box::new(CountingBalance {
                calls: Arc::clone(&calls_clone),
            }) as Box<dyn BalanceProvider>)
        });
        (service_with_providers(providers), calls)
    }

    fn session_for(client: Arc<MockClient>) -> ClientSession {
        ClientSession::new(client)
    }

    // -------------------------------------------------------------------------
    // Substitution basics
    // -------------------------------------------------------------------------

    #[test]
    fn test_identity_tokens() {
        let service = service_with_providers(ProviderRegistry::new());
        let mut session = session_for(Arc::new(MockClient::new("c1", "Steve")));
        let result = apply_placeholders(
            "{player} on {server} in {world}",
            &service.inner,
            &mut session,
            5,
        );
        assert_eq!(result, "Steve on Test Server in hub");
    }

    #[test]
    fn test_counts() {
        let service = service_with_providers(ProviderRegistry::new());
        let mut session = session_for(Arc::new(MockClient::new("c1", "Steve")));
        let result = apply_placeholders(
            "{online}/{max_players}",
            &service.inner,
            &mut session,
            5,
        );
        assert_eq!(result, "5/20");
    }

    #[test]
    fn test_unknown_token_left_verbatim() {
        let service = service_with_providers(ProviderRegistry::new());
        let mut session = session_for(Arc::new(MockClient::new("c1", "Steve")));
        let result = apply_placeholders("{nope} {player}", &service.inner, &mut session, 1);
        assert_eq!(result, "{nope} Steve");
    }

    #[test]
    fn test_plain_text_untouched() {
        let service = service_with_providers(ProviderRegistry::new());
        let mut session = session_for(Arc::new(MockClient::new("c1", "Steve")));
        let result = apply_placeholders("no tokens here", &service.inner, &mut session, 1);
        assert_eq!(result, "no tokens here");
    }

    #[test]
    fn test_idempotent_for_static_state() {
        let service = service_with_providers(ProviderRegistry::new());
        let mut session = session_for(Arc::new(MockClient::new("c1", "Steve")));
        let template = "{player} @ {pos_x} {chunk_x} [{gamemode}] #{uuid}";
        let first = apply_placeholders(template, &service.inner, &mut session, 3);
        let second = apply_placeholders(template, &service.inner, &mut session, 3);
        assert_eq!(first, second);
    }

    // -------------------------------------------------------------------------
    // Bridge-backed tokens
    // -------------------------------------------------------------------------

    #[test]
    fn test_balance_token_uses_provider() {
        let (service, calls) = counting_service();
        let mut session = session_for(Arc::new(MockClient::new("c1", "Steve")));
        let result = apply_placeholders(
            "Money: {money}$ ({balance})",
            &service.inner,
            &mut session,
            1,
        );
        assert_eq!(result, "Money: 1234$ (1234)");
        // One provider call covers both alias tokens.
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_absent_tokens_never_touch_bridge() {
        let (service, calls) = counting_service();
        let mut session = session_for(Arc::new(MockClient::new("c1", "Steve")));
        apply_placeholders("{player} {world} {online}", &service.inner, &mut session, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_balance_cached_across_renders() {
        let (service, calls) = counting_service();
        let mut session = session_for(Arc::new(MockClient::new("c1", "Steve")));
        apply_placeholders("{balance}", &service.inner, &mut session, 1);
        apply_placeholders("{balance}", &service.inner, &mut session, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_rank_and_faction_neutral_without_providers() {
        let service = service_with_providers(ProviderRegistry::new());
        let mut session = session_for(Arc::new(MockClient::new("c1", "Steve")));
        let result = apply_placeholders(
            "[{rank}] {faction}|{faction_rank}|{faction_tag}",
            &service.inner,
            &mut session,
            1,
        );
        assert_eq!(result, "[] ||");
    }

    // -------------------------------------------------------------------------
    // Time and rate tokens
    // -------------------------------------------------------------------------

    #[test]
    fn test_playtime_format() {
        assert_eq!(format_playtime(0), "00h 00m 00s");
        assert_eq!(format_playtime(3723), "01h 02m 03s");
        assert_eq!(format_playtime(59), "00h 00m 59s");
        assert_eq!(format_playtime(360000), "100h 00m 00s");
    }

    #[test]
    fn test_playtime_token_starts_at_zero() {
        let service = service_with_providers(ProviderRegistry::new());
        let mut session = session_for(Arc::new(MockClient::new("c1", "Steve")));
        let result = apply_placeholders("{playtime}", &service.inner, &mut session, 1);
        assert_eq!(result, "00h 00m 00s");
    }

    #[test]
    fn test_tps_neutral_without_world() {
        let service = service_with_providers(ProviderRegistry::new());
        let client = Arc::new(MockClient::new("c1", "Steve"));
        client.set_tick(None);
        let mut session = session_for(client);
        let result = apply_placeholders("{tps}", &service.inner, &mut session, 1);
        assert_eq!(result, "20.0");
    }

    #[test]
    fn test_tps_neutral_on_non_positive_delta() {
        let service = service_with_providers(ProviderRegistry::new());
        let client = Arc::new(MockClient::new("c1", "Steve"));
        let mut session = session_for(Arc::clone(&client));
        // Tick counter went backwards (world swap): neutral, sample updated.
        session.last_world_tick = 5000;
        let result = apply_placeholders("{tps}", &service.inner, &mut session, 1);
        assert_eq!(result, "20.0");
        assert_eq!(session.last_world_tick, 1000);
    }

    #[test]
    fn test_tps_estimates_from_delta() {
        let service = service_with_providers(ProviderRegistry::new());
        let client = Arc::new(MockClient::new("c1", "Steve"));
        let mut session = session_for(Arc::clone(&client));
        session.last_world_tick = 990;
        session.last_tick_time = Instant::now() - Duration::from_secs(2);
        // 10 ticks over 2 seconds.
        let result = apply_placeholders("{tps}", &service.inner, &mut session, 1);
        assert_eq!(result, "5.0");
    }

    #[test]
    fn test_tps_clamped_to_twenty() {
        let service = service_with_providers(ProviderRegistry::new());
        let client = Arc::new(MockClient::new("c1", "Steve"));
        client.set_tick(Some(100_000));
        let mut session = session_for(Arc::clone(&client));
        session.last_world_tick = 0;
        session.last_tick_time = Instant::now() - Duration::from_secs(1);
        let result = apply_placeholders("{tps}", &service.inner, &mut session, 1);
        assert_eq!(result, "20.0");
    }

    // -------------------------------------------------------------------------
    // Position tokens
    // -------------------------------------------------------------------------

    #[test]
    fn test_position_tokens() {
        let service = service_with_providers(ProviderRegistry::new());
        let mut session = session_for(Arc::new(MockClient::new("c1", "Steve")));
        let result = apply_placeholders(
            "{pos_x} {pos_y} {pos_z}",
            &service.inner,
            &mut session,
            1,
        );
        assert_eq!(result, "X: 10 Y: 64 Z: -32");
    }

    #[test]
    fn test_position_fallback_when_absent() {
        let service = service_with_providers(ProviderRegistry::new());
        let client = Arc::new(MockClient::new("c1", "Steve"));
        *client.position.lock() = None;
        let mut session = session_for(client);
        let result = apply_placeholders("{pos_x}/{chunk_z}", &service.inner, &mut session, 1);
        assert_eq!(result, "0/0");
    }

    #[test]
    fn test_chunk_floor_division() {
        let service = service_with_providers(ProviderRegistry::new());
        let client = Arc::new(MockClient::new("c1", "Steve"));
        *client.position.lock() = Some([10.0, 64.0, -32.0]);
        let mut session = session_for(client);
        let result = apply_placeholders("{chunk_x},{chunk_z}", &service.inner, &mut session, 1);
        assert_eq!(result, "0,-2");
    }

    #[test]
    fn test_world_tick_and_gamemode() {
        let service = service_with_providers(ProviderRegistry::new());
        let client = Arc::new(MockClient::new("c1", "Steve"));
        let mut session = session_for(Arc::clone(&client));
        let result = apply_placeholders(
            "{world_tick} {gamemode}",
            &service.inner,
            &mut session,
            1,
        );
        assert_eq!(result, "1000 SURVIVAL");

        *client.game_mode.lock() = None;
        client.set_tick(None);
        let result = apply_placeholders(
            "{world_tick} {gamemode}",
            &service.inner,
            &mut session,
            1,
        );
        assert_eq!(result, "0 SURVIVAL");
    }

    #[test]
    fn test_uuid_token() {
        let service = service_with_providers(ProviderRegistry::new());
        let mut session = session_for(Arc::new(MockClient::new("client-77", "Steve")));
        let result = apply_placeholders("{uuid}", &service.inner, &mut session, 1);
        assert_eq!(result, "client-77");
    }

    // -------------------------------------------------------------------------
    // View building
    // -------------------------------------------------------------------------

    #[test]
    fn test_build_view_caps_lines() {
        let mut config = BoardConfig::defaults(Path::new("test-data"));
        config.max_lines = 3;
        let service = ScoreboardService::new(
            config,
            Box::new(MockRenderer::new()),
            Box::new(MockServer::new("Test Server", 20)),
            ProviderRegistry::new(),
        );
        let mut session = session_for(Arc::new(MockClient::new("c1", "Steve")));
        let view = build_view(&service.inner, &mut session, 1);
        assert_eq!(view.lines.len(), 3);
    }

    #[test]
    fn test_build_view_decodes_title_color() {
        let mut config = BoardConfig::defaults(Path::new("test-data"));
        config.pages[0].title = "[#aaffff]Welcome".to_string();
        let service = ScoreboardService::new(
            config,
            Box::new(MockRenderer::new()),
            Box::new(MockServer::new("Test Server", 20)),
            ProviderRegistry::new(),
        );
        let mut session = session_for(Arc::new(MockClient::new("c1", "Steve")));
        let view = build_view(&service.inner, &mut session, 1);
        assert_eq!(view.title, "Welcome");
        assert_eq!(view.title_color, "#aaffff");
    }

    #[test]
    fn test_build_view_marks_bold_lines() {
        let mut config = BoardConfig::defaults(Path::new("test-data"));
        config.pages[0].lines = vec!["*bold*".to_string(), "plain".to_string()];
        let service = ScoreboardService::new(
            config,
            Box::new(MockRenderer::new()),
            Box::new(MockServer::new("Test Server", 20)),
            ProviderRegistry::new(),
        );
        let mut session = session_for(Arc::new(MockClient::new("c1", "Steve")));
        let view = build_view(&service.inner, &mut session, 1);
        assert!(view.lines[0].bold);
        assert!(!view.lines[1].bold);
        assert_eq!(view.lines[0].plain_text(), "bold");
    }

    #[test]
    fn test_build_view_uses_scoped_page_for_world() {
        let mut config = BoardConfig::defaults(Path::new("test-data"));
        config.pages = vec![
            crate::config::PageConfig {
                title: "Arena Only".to_string(),
                lines: vec!["fight".to_string()],
                duration_ms: 8000,
                refresh_ms: None,
                worlds: vec!["arena".to_string()],
            },
            crate::config::PageConfig {
                title: "Hub Board".to_string(),
                lines: vec!["welcome".to_string()],
                duration_ms: 8000,
                refresh_ms: None,
                worlds: vec!["hub".to_string()],
            },
        ];
        let service = ScoreboardService::new(
            config,
            Box::new(MockRenderer::new()),
            Box::new(MockServer::new("Test Server", 20)),
            ProviderRegistry::new(),
        );
        let client = Arc::new(MockClient::new("c1", "Steve"));
        client.set_world(Some("hub"));
        let mut session = session_for(client);
        let view = build_view(&service.inner, &mut session, 1);
        assert_eq!(view.title, "Hub Board");
    }
}
