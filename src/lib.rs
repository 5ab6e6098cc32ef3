// Better ScoreBoard - rotating multi-page HUD overlay service

pub mod bridge;
pub mod config;
pub mod core;
pub mod host;
pub mod logging;
pub mod service;

pub use bridge::{BalanceProvider, FactionInfo, FactionProvider, ProviderRegistry, RankProvider};
pub use config::{BoardConfig, ConfigError, PageConfig};
pub use crate::core::view::{BoardView, LineRender, LineSegment};
pub use host::{ClientHandle, ClientId, HostError, OverlayRenderer, ServerInfo};
pub use service::ScoreboardService;
