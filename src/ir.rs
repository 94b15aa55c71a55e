use crate::geometry::{GeographicExtent, PixelRectangle};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationKind {
    Point,
    Label,
}

/// One annotation in geographic coordinates. Labels without text reserve
/// a single cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub kind: AnnotationKind,
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl Annotation {
    pub fn point(x: f64, y: f64) -> Self {
        Self {
            id: None,
            kind: AnnotationKind::Point,
            x,
            y,
            text: None,
        }
    }

    pub fn label(x: f64, y: f64, text: impl Into<String>) -> Self {
        Self {
            id: None,
            kind: AnnotationKind::Label,
            x,
            y,
            text: Some(text.into()),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// A map frame and the annotations to place on it, in draw order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationSet {
    pub extent: GeographicExtent,
    pub width: i32,
    pub height: i32,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
}

impl AnnotationSet {
    pub fn new(extent: GeographicExtent, width: i32, height: i32) -> Self {
        Self {
            extent,
            width,
            height,
            annotations: Vec::new(),
        }
    }

    pub fn rectangle(&self) -> PixelRectangle {
        PixelRectangle::from_size(self.width, self.height)
    }

    pub fn push(&mut self, annotation: Annotation) {
        self.annotations.push(annotation);
    }
}

pub fn parse_annotations(input: &str) -> anyhow::Result<AnnotationSet> {
    let set: AnnotationSet = serde_json::from_str(input)?;
    if set.width <= 0 || set.height <= 0 {
        return Err(anyhow::anyhow!(
            "Map size must be positive, got {}x{}",
            set.width,
            set.height
        ));
    }
    Ok(set)
}
