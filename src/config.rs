use crate::error::{PlacementError, Result};
use serde::Deserialize;
use std::path::Path;

pub const DEFAULT_POINT_CELL_SIZE: i32 = 9;
pub const DEFAULT_LABEL_CELL_WIDTH: i32 = 16;
pub const DEFAULT_LABEL_CELL_HEIGHT: i32 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    #[default]
    Near,
    Center,
    Far,
}

/// How a label is anchored on its reserved position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextAlignment {
    pub horizontal: Alignment,
    pub vertical: Alignment,
}

impl Default for TextAlignment {
    fn default() -> Self {
        Self {
            horizontal: Alignment::Center,
            vertical: Alignment::Near,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PlacementConfig {
    pub point_cell_size: i32,
    pub label_cell_width: i32,
    pub label_cell_height: i32,
    pub font_family: String,
    pub font_size: f32,
    pub label_alignment: TextAlignment,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            point_cell_size: DEFAULT_POINT_CELL_SIZE,
            label_cell_width: DEFAULT_LABEL_CELL_WIDTH,
            label_cell_height: DEFAULT_LABEL_CELL_HEIGHT,
            font_family: "SimSun, \"Noto Sans CJK SC\", sans-serif".to_string(),
            font_size: 16.0,
            label_alignment: TextAlignment::default(),
        }
    }
}

impl PlacementConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("pointCellSize", self.point_cell_size),
            ("labelCellWidth", self.label_cell_width),
            ("labelCellHeight", self.label_cell_height),
        ] {
            if value <= 0 {
                return Err(PlacementError::InvalidConfig(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }
        if self.font_size.is_nan() || self.font_size <= 0.0 {
            return Err(PlacementError::InvalidConfig(format!(
                "fontSize must be positive, got {}",
                self.font_size
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct RenderConfig {
    pub background: String,
    pub marker_color: String,
    pub marker_radius: f32,
    pub label_color: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            background: "#FFFFFF".to_string(),
            marker_color: "#D0342C".to_string(),
            marker_radius: 3.0,
            label_color: "#1C2430".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub placement: PlacementConfig,
    pub render: RenderConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AlignmentFile {
    horizontal: Option<Alignment>,
    vertical: Option<Alignment>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    point_cell_size: Option<i32>,
    label_cell_width: Option<i32>,
    label_cell_height: Option<i32>,
    font_family: Option<String>,
    font_size: Option<f32>,
    label_alignment: Option<AlignmentFile>,
    background: Option<String>,
    marker_color: Option<String>,
    marker_radius: Option<f32>,
    label_color: Option<String>,
}

/// Loads an optional config file over the defaults. Files ending in
/// `.json5` are read as JSON5, everything else as strict JSON.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };

    let contents = std::fs::read_to_string(path)?;
    let is_json5 = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("json5"))
        .unwrap_or(false);
    let config = if is_json5 {
        parse_config_json5(&contents)?
    } else {
        parse_config(&contents)?
    };
    log::debug!("loaded config from {}", path.display());
    Ok(config)
}

pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    let parsed: ConfigFile = serde_json::from_str(contents)?;
    apply_config_file(parsed)
}

pub fn parse_config_json5(contents: &str) -> anyhow::Result<Config> {
    let parsed: ConfigFile = json5::from_str(contents)?;
    apply_config_file(parsed)
}

fn apply_config_file(parsed: ConfigFile) -> anyhow::Result<Config> {
    let mut config = Config::default();
    let placement = &mut config.placement;
    if let Some(v) = parsed.point_cell_size {
        placement.point_cell_size = v;
    }
    if let Some(v) = parsed.label_cell_width {
        placement.label_cell_width = v;
    }
    if let Some(v) = parsed.label_cell_height {
        placement.label_cell_height = v;
    }
    if let Some(v) = parsed.font_family {
        placement.font_family = v;
    }
    if let Some(v) = parsed.font_size {
        placement.font_size = v;
    }
    if let Some(align) = parsed.label_alignment {
        if let Some(v) = align.horizontal {
            placement.label_alignment.horizontal = v;
        }
        if let Some(v) = align.vertical {
            placement.label_alignment.vertical = v;
        }
    }

    let render = &mut config.render;
    if let Some(v) = parsed.background {
        render.background = v;
    }
    if let Some(v) = parsed.marker_color {
        render.marker_color = v;
    }
    if let Some(v) = parsed.marker_radius {
        render.marker_radius = v;
    }
    if let Some(v) = parsed.label_color {
        render.label_color = v;
    }

    config.placement.validate()?;
    Ok(config)
}
