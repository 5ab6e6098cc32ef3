//! Configuration model
//!
//! Loads and persists `config.yaml` in the install's data directory. The
//! file is a restricted line-oriented subset, not real YAML: `key: value`
//! pairs with optional quoting, `#` comments, and `- "entry"` list blocks
//! introduced by `lines:` / `page<N>Lines:` / `page<N>Worlds:` headers. The
//! hand-rolled reader/writer keeps exact ordering and comment behavior that
//! existing configuration files rely on.
//!
//! Loading never fails: malformed values keep their defaults, a missing
//! file writes the documented defaults first, and I/O errors fall back to
//! in-memory defaults.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info};

use crate::core::constants::{
    DURATION_FLOOR_MS, EMPTY_PAGE_DURATION_MS, EMPTY_PAGE_REFRESH_MS, MAX_LINES, MAX_PAGES,
    REFRESH_FLOOR_MS,
};
use crate::core::placeholders::placeholders_line;

pub const CONFIG_FILENAME: &str = "config.yaml";

// =============================================================================
// CONFIGURATION STRUCTURES
// =============================================================================

/// Per-page configuration as stored on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageConfig {
    pub title: String,
    pub lines: Vec<String>,
    pub duration_ms: u64,
    /// `None` inherits the global cadence; `Some(0)` disables auto-refresh
    pub refresh_ms: Option<u64>,
    pub worlds: Vec<String>,
}

impl PageConfig {
    /// Placeholder page for unconfigured slots
    pub fn empty(page_number: usize) -> Self {
        Self {
            title: format!("Page {page_number}"),
            lines: Vec::new(),
            duration_ms: EMPTY_PAGE_DURATION_MS,
            refresh_ms: Some(EMPTY_PAGE_REFRESH_MS),
            worlds: Vec::new(),
        }
    }

    fn is_default_empty(&self, page_number: usize) -> bool {
        self.lines.iter().all(|line| line.trim().is_empty())
            && self.worlds.is_empty()
            && self.title == format!("Page {page_number}")
    }
}

/// Immutable global settings plus the configured pages.
///
/// Created at load and replaced wholesale by the `with_*` copy-on-write
/// methods; readers always see a consistent snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardConfig {
    pub title: String,
    pub logo_texture_path: String,
    /// Rendered line cap, 1..=12
    pub max_lines: usize,
    /// Global refresh cadence in milliseconds; 0 disables periodic refresh
    pub refresh_ms: u64,
    pub offset_right: i32,
    pub offset_top: i32,
    pub divider_visible: bool,
    pub logo_visible: bool,
    pub rotation_enabled: bool,
    /// 1-based active page, 1..=MAX_PAGES
    pub active_page: usize,
    pub pages: Vec<PageConfig>,
    pub data_dir: PathBuf,
}

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to create config directory: {0}")]
    CreateDir(std::io::Error),
    #[error("failed to write config file: {0}")]
    Write(std::io::Error),
}

// =============================================================================
// LOADING
// =============================================================================

/// Parser state for the list block a `-` entry belongs to
enum ListTarget {
    None,
    PageLines(usize),
    PageWorlds(usize),
}

#[derive(Default)]
struct PageBuilder {
    title: Option<String>,
    lines: Vec<String>,
    duration_ms: Option<u64>,
    refresh_ms: Option<u64>,
    worlds: Vec<String>,
    touched: bool,
}

impl BoardConfig {
    /// Load the configuration from `data_dir`, writing documented defaults
    /// when no file exists yet. Never fails; see module docs.
    pub fn load(data_dir: &Path) -> BoardConfig {
        let defaults = Self::defaults(data_dir);
        let path = data_dir.join(CONFIG_FILENAME);

        if !path.exists() {
            info!(path = %path.display(), "[CONFIG] No config file, writing defaults");
            if let Err(e) = defaults.try_persist() {
                error!(error = %e, "[CONFIG] Could not write default config");
            }
            return defaults;
        }

        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) => {
                error!(path = %path.display(), error = %e, "[CONFIG] Failed to read config, using defaults");
                return defaults;
            }
        };

        let config = Self::parse(&contents, defaults);
        debug!(pages = config.pages.len(), "[CONFIG] Loaded config");
        config
    }

    fn parse(contents: &str, defaults: BoardConfig) -> BoardConfig {
        let mut config = defaults;
        let mut builders: Vec<PageBuilder> = (0..MAX_PAGES).map(|_| PageBuilder::default()).collect();
        let mut target = ListTarget::None;

        for raw in contents.lines() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some(entry) = line.strip_prefix('-') {
                let value = trim_quotes(entry);
                match target {
                    ListTarget::PageLines(n) => {
                        if !value.is_empty() {
                            builders[n].touched = true;
                            builders[n].lines.push(value);
                        }
                        continue;
                    }
                    ListTarget::PageWorlds(n) => {
                        let world = value.to_lowercase();
                        if !world.is_empty() {
                            builders[n].touched = true;
                            builders[n].worlds.push(world);
                        }
                        continue;
                    }
                    ListTarget::None => {
                        // Stray entry without a header; ignore it.
                        continue;
                    }
                }
            }
            target = ListTarget::None;

            let (key, value) = match line.split_once(':') {
                Some((key, value)) => (key.trim(), trim_quotes(value)),
                None => continue,
            };

            if let Some((page, suffix)) = split_page_key(key) {
                let builder = &mut builders[page];
                match suffix {
                    "Title" => {
                        builder.touched = true;
                        builder.title = Some(value);
                    }
                    "DurationSeconds" => {
                        builder.touched = true;
                        if let Some(ms) = parse_seconds_ms(&value) {
                            builder.duration_ms = Some(ms.max(DURATION_FLOOR_MS));
                        }
                    }
                    "RefreshSeconds" => {
                        builder.touched = true;
                        if let Some(ms) = parse_seconds_ms(&value) {
                            builder.refresh_ms = Some(clamp_refresh_ms(ms));
                        }
                    }
                    "Worlds" => target = ListTarget::PageWorlds(page),
                    "Lines" => target = ListTarget::PageLines(page),
                    _ => {}
                }
                continue;
            }

            match key {
                "title" => config.title = value,
                "logoTexturePath" => {
                    if !value.is_empty() {
                        config.logo_texture_path = value;
                    }
                }
                "refreshSeconds" => {
                    if let Some(ms) = parse_seconds_ms(&value) {
                        config.refresh_ms = clamp_refresh_ms(ms);
                    }
                }
                "maxLines" => {
                    if let Ok(parsed) = value.parse::<usize>() {
                        config.max_lines = parsed.clamp(1, MAX_LINES);
                    }
                }
                "offsetRight" => {
                    if let Ok(parsed) = value.parse::<i32>() {
                        config.offset_right = parsed;
                    }
                }
                "offsetTop" => {
                    if let Ok(parsed) = value.parse::<i32>() {
                        config.offset_top = parsed;
                    }
                }
                "dividerVisible" | "showDivider" => {
                    if let Some(parsed) = parse_bool(&value) {
                        config.divider_visible = parsed;
                    }
                }
                "logoVisible" => {
                    if let Some(parsed) = parse_bool(&value) {
                        config.logo_visible = parsed;
                    }
                }
                "rotationEnabled" => {
                    if let Some(parsed) = parse_bool(&value) {
                        config.rotation_enabled = parsed;
                    }
                }
                "activePage" => {
                    if let Ok(parsed) = value.parse::<usize>() {
                        config.active_page = parsed.clamp(1, MAX_PAGES);
                    }
                }
                // Legacy single-page key: folds into page 1.
                "lines" => target = ListTarget::PageLines(0),
                _ => {}
            }
        }

        let pages = materialize_pages(builders, &config.title);
        if !pages.is_empty() {
            config.pages = pages;
        }
        config
    }

    /// The documented default configuration
    pub fn defaults(data_dir: &Path) -> BoardConfig {
        BoardConfig {
            title: "Better ScoreBoard".to_string(),
            logo_texture_path: "Custom/Textures/BetterScoreBoard/logo.png".to_string(),
            max_lines: 10,
            refresh_ms: 1000,
            offset_right: 24,
            offset_top: 140,
            divider_visible: true,
            logo_visible: false,
            rotation_enabled: false,
            active_page: 1,
            pages: vec![PageConfig {
                title: "Better ScoreBoard".to_string(),
                lines: default_lines(),
                duration_ms: EMPTY_PAGE_DURATION_MS,
                refresh_ms: None,
                worlds: Vec::new(),
            }],
            data_dir: data_dir.to_path_buf(),
        }
    }

    // =========================================================================
    // PERSISTENCE
    // =========================================================================

    /// Write the configuration back to disk, logging and skipping on failure
    pub fn persist(&self) {
        if let Err(e) = self.try_persist() {
            error!(error = %e, "[CONFIG] Could not write config file");
        }
    }

    /// Fallible variant of [`persist`](Self::persist) for callers that want
    /// the error
    pub fn try_persist(&self) -> Result<(), ConfigError> {
        let path = self.data_dir.join(CONFIG_FILENAME);
        fs::create_dir_all(&self.data_dir).map_err(ConfigError::CreateDir)?;
        let mut contents = self.render_file().join("\n");
        contents.push('\n');
        fs::write(&path, contents).map_err(ConfigError::Write)?;
        debug!(path = %path.display(), "[CONFIG] Wrote config file");
        Ok(())
    }

    fn render_file(&self) -> Vec<String> {
        let mut out = Vec::new();
        out.push("# Better ScoreBoard configuration".to_string());
        out.push(format!("title: \"{}\"", escape_quotes(&self.title)));
        out.push("# Optional custom logo shown above the title".to_string());
        out.push(format!(
            "logoTexturePath: \"{}\"",
            escape_quotes(&self.logo_texture_path)
        ));
        out.push(
            "# HUD refresh rate (seconds). Use decimals for sub-second updates; 0 disables periodic refresh."
                .to_string(),
        );
        out.push(format!("refreshSeconds: {}", format_seconds(self.refresh_ms)));
        out.push("# Maximum lines rendered (capped by the HUD layout)".to_string());
        out.push(format!("maxLines: {}", self.max_lines));
        out.push("# HUD offsets in pixels".to_string());
        out.push(format!("offsetRight: {}", self.offset_right));
        out.push(format!("offsetTop: {}", self.offset_top));
        out.push("# Show the divider line below the title".to_string());
        out.push(format!("dividerVisible: {}", self.divider_visible));
        out.push("# Show the logo image above the title".to_string());
        out.push(format!("logoVisible: {}", self.logo_visible));
        out.push("# Rotate automatically between pages that have content".to_string());
        out.push(format!("rotationEnabled: {}", self.rotation_enabled));
        out.push(format!("activePage: {}", self.active_page));
        out.push(
            "# Line templates support [RRGGBB] color markers, *bold* pairs and these placeholders:"
                .to_string(),
        );
        out.push(format!("# {}", placeholders_line()));
        out.push("# {money} mirrors {balance} when an economy provider is installed".to_string());

        for (idx, page) in self.pages.iter().enumerate() {
            let n = idx + 1;
            if page.is_default_empty(n) {
                continue;
            }
            out.push(format!("page{}Title: \"{}\"", n, escape_quotes(&page.title)));
            out.push(format!(
                "page{}DurationSeconds: {}",
                n,
                format_seconds(page.duration_ms)
            ));
            if let Some(refresh) = page.refresh_ms {
                out.push(format!("page{}RefreshSeconds: {}", n, format_seconds(refresh)));
            }
            if !page.worlds.is_empty() {
                out.push(format!("page{n}Worlds:"));
                for world in &page.worlds {
                    out.push(format!("  - \"{}\"", escape_quotes(world)));
                }
            }
            if !page.lines.is_empty() {
                out.push(format!("page{n}Lines:"));
                for line in &page.lines {
                    out.push(format!("  - \"{}\"", escape_quotes(line)));
                }
            }
        }
        out
    }

    // =========================================================================
    // COPY-ON-WRITE UPDATES
    // =========================================================================

    pub fn with_pages(
        &self,
        pages: Vec<PageConfig>,
        active_page: usize,
        rotation_enabled: bool,
    ) -> BoardConfig {
        BoardConfig {
            pages,
            active_page: active_page.clamp(1, MAX_PAGES),
            rotation_enabled,
            ..self.clone()
        }
    }

    /// Replace the active page's lines
    pub fn with_lines(&self, lines: Vec<String>) -> BoardConfig {
        let mut pages = self.pages.clone();
        let idx = self.active_page.saturating_sub(1);
        while pages.len() <= idx {
            pages.push(PageConfig::empty(pages.len() + 1));
        }
        pages[idx].lines = lines;
        BoardConfig {
            pages,
            ..self.clone()
        }
    }

    /// Replace the active page's title and lines; an empty title keeps the
    /// existing one
    pub fn with_title_and_lines(&self, title: &str, lines: Vec<String>) -> BoardConfig {
        let mut config = self.with_lines(lines);
        let trimmed = title.trim();
        if !trimmed.is_empty() {
            let idx = config.active_page.saturating_sub(1);
            config.pages[idx].title = trimmed.to_string();
        }
        config
    }

    pub fn with_title(&self, title: impl Into<String>) -> BoardConfig {
        BoardConfig {
            title: title.into(),
            ..self.clone()
        }
    }

    pub fn with_divider_visible(&self, visible: bool) -> BoardConfig {
        BoardConfig {
            divider_visible: visible,
            ..self.clone()
        }
    }

    pub fn with_logo_visible(&self, visible: bool) -> BoardConfig {
        BoardConfig {
            logo_visible: visible,
            ..self.clone()
        }
    }

    pub fn with_offsets(&self, offset_right: i32, offset_top: i32) -> BoardConfig {
        BoardConfig {
            offset_right: offset_right.max(0),
            offset_top: offset_top.max(0),
            ..self.clone()
        }
    }
}

// =============================================================================
// HELPERS
// =============================================================================

fn materialize_pages(builders: Vec<PageBuilder>, global_title: &str) -> Vec<PageConfig> {
    let highest = builders
        .iter()
        .rposition(|b| b.touched)
        .map(|i| i + 1)
        .unwrap_or(0);

    let mut pages = Vec::with_capacity(highest);
    for (idx, builder) in builders.into_iter().take(highest).enumerate() {
        let n = idx + 1;
        if !builder.touched {
            pages.push(PageConfig::empty(n));
            continue;
        }
        let default_title = if n == 1 {
            global_title.to_string()
        } else {
            format!("Page {n}")
        };
        let mut lines = builder.lines;
        lines.truncate(MAX_LINES);
        pages.push(PageConfig {
            title: builder.title.unwrap_or(default_title),
            lines,
            duration_ms: builder.duration_ms.unwrap_or(EMPTY_PAGE_DURATION_MS),
            refresh_ms: builder.refresh_ms,
            worlds: builder.worlds,
        });
    }
    pages
}

/// Page-addressed keys look like `page3Title`; returns the zero-based page
/// index and the key suffix
fn split_page_key(key: &str) -> Option<(usize, &str)> {
    let rest = key.strip_prefix("page")?;
    let digits_end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    if digits_end == 0 {
        return None;
    }
    let number: usize = rest[..digits_end].parse().ok()?;
    if !(1..=MAX_PAGES).contains(&number) {
        return None;
    }
    Some((number - 1, &rest[digits_end..]))
}

fn trim_quotes(value: &str) -> String {
    let v = value.trim();
    if v.len() >= 2
        && ((v.starts_with('"') && v.ends_with('"')) || (v.starts_with('\'') && v.ends_with('\'')))
    {
        v[1..v.len() - 1].replace("\\\"", "\"")
    } else {
        v.to_string()
    }
}

fn escape_quotes(value: &str) -> String {
    value.replace('"', "\\\"")
}

fn parse_seconds_ms(value: &str) -> Option<u64> {
    let seconds: f64 = value.trim().parse().ok()?;
    if !seconds.is_finite() || seconds < 0.0 {
        return None;
    }
    Some((seconds * 1000.0).round() as u64)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

fn clamp_refresh_ms(ms: u64) -> u64 {
    if ms == 0 {
        0
    } else {
        ms.max(REFRESH_FLOOR_MS)
    }
}

/// Render a millisecond value as seconds, dropping a trailing `.0`
fn format_seconds(ms: u64) -> String {
    if ms % 1000 == 0 {
        (ms / 1000).to_string()
    } else {
        format!("{}", ms as f64 / 1000.0)
    }
}

fn default_lines() -> Vec<String> {
    vec![
        "[#aaffff]       *Welcome to : {server}*".to_string(),
        "[#0bec00]               *Current world: {world}*".to_string(),
        " ".to_string(),
        "[#ffa500]                     *Online: {online}/{max_players}*".to_string(),
        "[#ff00ff]      *{player} | Playtime: {playtime}*".to_string(),
        " ".to_string(),
        "[#cfe900]      * Coords: {pos_x}  {pos_y}  {pos_z}*".to_string(),
        "[#cfe900]       *         Money: {money}$ / TPS: {tps}*".to_string(),
        "      *Join the Discord: discord.gg/hytale*".to_string(),
    ]
}

// =============================================================================
// TESTS
// =============================================================================
