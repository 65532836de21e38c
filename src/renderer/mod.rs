//! SVG preview of solved layouts
//!
//! Draws nodes, their terminals and group outlines as rectangles and every
//! link as a horizontal-tangent Bézier curve.

pub mod config;
pub mod svg;

pub use config::SvgConfig;
pub use svg::{link_path, render_svg};
