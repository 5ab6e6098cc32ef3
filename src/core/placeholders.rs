//! The placeholder token set
//!
//! Line templates may reference any token from this closed set. The service
//! substitutes them at render time; everything else in braces stays
//! verbatim. `{money}` is accepted as an alias of `{balance}` and is not
//! listed separately.

use once_cell::sync::Lazy;

/// Every supported placeholder, in the order shown to users
pub const TOKENS: &[&str] = &[
    "{server}",
    "{world}",
    "{online}",
    "{max_players}",
    "{player}",
    "{playtime}",
    "{tps}",
    "{balance}",
    "{pos_x}",
    "{pos_y}",
    "{pos_z}",
    "{gamemode}",
    "{world_tick}",
    "{chunk_x}",
    "{chunk_z}",
    "{uuid}",
    "{rank}",
    "{faction}",
    "{faction_rank}",
    "{faction_tag}",
];

static TOKENS_LINE: Lazy<String> = Lazy::new(|| TOKENS.join(", "));

/// The fixed comma-joined token list, as shown by help output and written
/// into the configuration file's reference comment
pub fn placeholders_line() -> &'static str {
    &TOKENS_LINE
}
