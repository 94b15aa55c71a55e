#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod geometry;
pub mod ir;
pub mod pass;
pub mod placement;
pub mod render;
pub mod text_metrics;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{Alignment, Config, PlacementConfig, RenderConfig, TextAlignment, load_config};
pub use context::PlacementContext;
pub use error::{PlacementError, Result};
pub use geometry::{CoordinateMapper, GeographicExtent, PixelRectangle};
pub use ir::{Annotation, AnnotationKind, AnnotationSet, parse_annotations};
pub use pass::{PassReport, PlacedAnnotation, Surface, run_pass, run_pass_with};
pub use placement::{CellGrid, CellKey, OccupancyGrid, PlacementBuffer};
pub use render::{SvgSurface, write_output_svg};
pub use text_metrics::LabelFont;
