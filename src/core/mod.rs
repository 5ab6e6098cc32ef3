//! Core module - host-independent rendering and rotation engine

pub mod color;
pub mod constants;
pub mod markup;
pub mod page;
pub mod placeholders;
pub mod view;

pub use color::{decode_leading_color, normalize_color};
pub use markup::{parse_segments, strip_bold_markers};
pub use page::{Page, RotationState};
pub use placeholders::placeholders_line;
pub use view::{BoardView, LineRender, LineSegment};
