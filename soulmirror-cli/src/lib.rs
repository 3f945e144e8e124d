//! # SoulMirror CLI
//!
//! Terminal host for the questionnaire engine: catalog listing, interactive
//! sessions, batch analysis of saved answers and radar chart export.

pub mod report;
pub mod svg;

pub use report::{CliFormatter, ReportExport};
pub use svg::render_radar_svg;
