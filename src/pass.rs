// Drives one placement pass: maps each annotation to pixels, asks the
// context whether it may be drawn, and draws the ones that fit.

use crate::config::{PlacementConfig, TextAlignment};
use crate::context::PlacementContext;
use crate::error::{PlacementError, Result};
use crate::ir::{AnnotationKind, AnnotationSet};
use crate::text_metrics::LabelFont;
use serde::Serialize;

/// Drawing device the pass renders accepted annotations onto.
pub trait Surface {
    fn draw_marker(&mut self, x: i32, y: i32);
    fn draw_label(&mut self, x: i32, y: i32, text: &str, alignment: TextAlignment, font: &LabelFont);
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedAnnotation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub kind: AnnotationKind,
    pub x: i32,
    pub y: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PassReport {
    pub points_placed: usize,
    pub points_rejected: usize,
    pub labels_placed: usize,
    pub labels_rejected: usize,
    pub placed: Vec<PlacedAnnotation>,
}

impl PassReport {
    pub fn rejected(&self) -> usize {
        self.points_rejected + self.labels_rejected
    }
}

/// Places every annotation of `set` in order onto `surface`.
pub fn run_pass<S: Surface>(
    set: &AnnotationSet,
    config: &PlacementConfig,
    surface: S,
) -> Result<(PassReport, S)> {
    let ctx = PlacementContext::with_config(set.rectangle(), set.extent, surface, config.clone())?;
    run_pass_with(set, ctx)
}

/// Like [`run_pass`], on a prepared context (e.g. with a preset font).
pub fn run_pass_with<S: Surface>(
    set: &AnnotationSet,
    mut ctx: PlacementContext<S>,
) -> Result<(PassReport, S)> {
    let mut report = PassReport::default();
    let mut surface = ctx
        .take_device()
        .ok_or(PlacementError::DeviceUnavailable)?;

    for annotation in &set.annotations {
        let (x, y) = ctx.mapper().to_pixel_point(annotation.x, annotation.y);
        let placed = match annotation.kind {
            AnnotationKind::Point => {
                let placed = ctx.try_reserve_point(x, y)?;
                if placed {
                    surface.draw_marker(x, y);
                    report.points_placed += 1;
                } else {
                    report.points_rejected += 1;
                }
                placed
            }
            AnnotationKind::Label => {
                let text = annotation.text.as_deref().unwrap_or("");
                let placed = ctx.try_reserve_label_text(x, y, text)?;
                if placed {
                    let alignment = ctx.label_format();
                    surface.draw_label(x, y, text, alignment, ctx.label_font());
                    report.labels_placed += 1;
                } else {
                    report.labels_rejected += 1;
                }
                placed
            }
        };
        if placed {
            report.placed.push(PlacedAnnotation {
                id: annotation.id.clone(),
                kind: annotation.kind,
                x,
                y,
                text: annotation.text.clone(),
            });
        } else {
            log::debug!(
                "skipped {:?} {} at ({x}, {y})",
                annotation.kind,
                annotation.id.as_deref().unwrap_or("<unnamed>")
            );
        }
    }

    log::info!(
        "placed {} points ({} rejected) and {} labels ({} rejected)",
        report.points_placed,
        report.points_rejected,
        report.labels_placed,
        report.labels_rejected
    );
    Ok((report, surface))
}
