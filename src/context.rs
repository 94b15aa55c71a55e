use crate::config::{Alignment, PlacementConfig, TextAlignment};
use crate::error::{PlacementError, Result};
use crate::geometry::{CoordinateMapper, GeographicExtent, PixelRectangle};
use crate::placement::PlacementBuffer;
use crate::text_metrics::LabelFont;

/// State for one placement pass: the coordinate mapping, and in full mode
/// the drawing device, collision buffers and label styling.
///
/// Construct one per pass and drop it afterwards; [`reset`](Self::reset)
/// exists for callers that reuse the allocation across passes.
#[derive(Debug)]
pub struct PlacementContext<D> {
    mapper: CoordinateMapper,
    config: PlacementConfig,
    device: Option<D>,
    buffer: Option<PlacementBuffer>,
    label_format: TextAlignment,
    label_font: Option<LabelFont>,
}

impl<D> PlacementContext<D> {
    /// Mapping-only context. Reservation calls fail with
    /// [`PlacementError::BufferUnavailable`].
    pub fn new(rectangle: PixelRectangle, extent: GeographicExtent) -> Self {
        let config = PlacementConfig::default();
        Self {
            mapper: CoordinateMapper::new(rectangle, extent),
            label_format: config.label_alignment,
            config,
            device: None,
            buffer: None,
            label_font: None,
        }
    }

    /// Full context bound to a drawing device, with default cell sizes.
    pub fn with_device(rectangle: PixelRectangle, extent: GeographicExtent, device: D) -> Self {
        Self {
            mapper: CoordinateMapper::new(rectangle, extent),
            label_format: TextAlignment::default(),
            config: PlacementConfig::default(),
            device: Some(device),
            buffer: Some(PlacementBuffer::default()),
            label_font: None,
        }
    }

    pub fn with_config(
        rectangle: PixelRectangle,
        extent: GeographicExtent,
        device: D,
        config: PlacementConfig,
    ) -> Result<Self> {
        config.validate()?;
        let buffer = PlacementBuffer::new(&config)?;
        Ok(Self {
            mapper: CoordinateMapper::new(rectangle, extent),
            label_format: config.label_alignment,
            config,
            device: Some(device),
            buffer: Some(buffer),
            label_font: None,
        })
    }

    pub fn mapper(&self) -> &CoordinateMapper {
        &self.mapper
    }

    pub fn dx(&self) -> f64 {
        self.mapper.dx()
    }

    pub fn dy(&self) -> f64 {
        self.mapper.dy()
    }

    pub fn min_x(&self) -> f64 {
        self.mapper.min_x()
    }

    pub fn max_y(&self) -> f64 {
        self.mapper.max_y()
    }

    pub fn geographic_extent(&self) -> &GeographicExtent {
        self.mapper.extent()
    }

    pub fn image_rectangle(&self) -> &PixelRectangle {
        self.mapper.rectangle()
    }

    pub fn config(&self) -> &PlacementConfig {
        &self.config
    }

    pub fn device(&self) -> Option<&D> {
        self.device.as_ref()
    }

    pub fn device_mut(&mut self) -> Option<&mut D> {
        self.device.as_mut()
    }

    /// Replaces the device, returning the previous one.
    pub fn set_device(&mut self, device: D) -> Option<D> {
        self.device.replace(device)
    }

    pub fn take_device(&mut self) -> Option<D> {
        self.device.take()
    }

    pub fn label_format(&self) -> TextAlignment {
        self.label_format
    }

    pub fn set_label_format(&mut self, format: TextAlignment) {
        self.label_format = format;
    }

    /// The label font, created from the config on first access.
    pub fn label_font(&mut self) -> &mut LabelFont {
        let config = &self.config;
        self.label_font
            .get_or_insert_with(|| LabelFont::new(config.font_family.clone(), config.font_size))
    }

    /// Installs a font up front, e.g. [`LabelFont::fallback`] in headless runs.
    pub fn set_label_font(&mut self, font: LabelFont) {
        self.label_font = Some(font);
    }

    pub fn has_label_font(&self) -> bool {
        self.label_font.is_some()
    }

    pub fn buffer(&self) -> Option<&PlacementBuffer> {
        self.buffer.as_ref()
    }

    fn buffer_mut(&mut self) -> Result<&mut PlacementBuffer> {
        self.buffer.as_mut().ok_or(PlacementError::BufferUnavailable)
    }

    pub fn try_reserve_point(&mut self, x: i32, y: i32) -> Result<bool> {
        Ok(self.buffer_mut()?.try_reserve_point(x, y))
    }

    pub fn try_reserve_label(&mut self, x: i32, y: i32, cell_count: i32) -> Result<bool> {
        self.buffer_mut()?.try_reserve_label(x, y, cell_count)
    }

    pub fn try_reserve_label_cell(&mut self, x: i32, y: i32) -> Result<bool> {
        Ok(self.buffer_mut()?.try_reserve_label_cell(x, y))
    }

    /// Measures `text` with the label font and reserves the cells covered by
    /// its drawn footprint, which depends on the horizontal label format.
    /// Empty text still claims one cell.
    pub fn try_reserve_label_text(&mut self, x: i32, y: i32, text: &str) -> Result<bool> {
        if self.buffer.is_none() {
            return Err(PlacementError::BufferUnavailable);
        }
        let cell_width = self.config.label_cell_width;
        let horizontal = self.label_format.horizontal;
        let width = self.label_font().measure_width(text);
        let (left, cells) = label_span(x, width, horizontal, cell_width)?;
        self.try_reserve_label(left, y, cells)
    }

    /// Clears all reservations so the context can serve another pass.
    pub fn reset(&mut self) {
        if let Some(buffer) = self.buffer.as_mut() {
            buffer.clear();
        }
    }
}

/// Leftmost drawn pixel and the number of label cells between it and the
/// rightmost drawn pixel, for text of `width` anchored at `x`.
fn label_span(x: i32, width: f32, horizontal: Alignment, cell_width: i32) -> Result<(i32, i32)> {
    let width = width.max(0.0);
    let anchor = x as f32;
    let left = match horizontal {
        Alignment::Near => anchor,
        Alignment::Center => anchor - width / 2.0,
        Alignment::Far => anchor - width,
    };
    let first_px = left.floor() as i32;
    let last_px = ((left + width).ceil() as i32).saturating_sub(1).max(first_px);
    let first = first_px.div_euclid(cell_width) as i64;
    let last = last_px.div_euclid(cell_width) as i64;
    let cells = i32::try_from(last - first + 1).map_err(|_| PlacementError::CellOverflow {
        start: first as i32,
        count: i32::MAX,
    })?;
    Ok((first_px, cells))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect() -> PixelRectangle {
        PixelRectangle::from_size(100, 100)
    }

    fn extent() -> GeographicExtent {
        GeographicExtent::from_origin(0.0, 10.0, 10.0, 10.0)
    }

    #[test]
    fn minimal_context_maps_but_cannot_reserve() {
        let mut ctx: PlacementContext<()> = PlacementContext::new(rect(), extent());
        assert_eq!(ctx.dx(), 10.0);
        assert_eq!(ctx.dy(), 10.0);
        assert!(ctx.device().is_none());
        assert_eq!(
            ctx.try_reserve_point(30, 30),
            Err(PlacementError::BufferUnavailable)
        );
        assert_eq!(
            ctx.try_reserve_label_text(0, 0, "x"),
            Err(PlacementError::BufferUnavailable)
        );
        assert!(!ctx.has_label_font());
    }

    #[test]
    fn full_context_reserves_points() {
        let mut ctx = PlacementContext::with_device(rect(), extent(), "surface");
        assert_eq!(ctx.device(), Some(&"surface"));
        assert_eq!(ctx.try_reserve_point(30, 30), Ok(true));
        assert_eq!(ctx.try_reserve_point(31, 31), Ok(false));
    }

    #[test]
    fn default_label_format_is_centered_near() {
        let mut ctx = PlacementContext::with_device(rect(), extent(), ());
        assert_eq!(ctx.label_format().horizontal, Alignment::Center);
        assert_eq!(ctx.label_format().vertical, Alignment::Near);
        ctx.set_label_format(TextAlignment {
            horizontal: Alignment::Near,
            vertical: Alignment::Far,
        });
        assert_eq!(ctx.label_format().vertical, Alignment::Far);
    }

    #[test]
    fn label_font_is_created_once() {
        let mut ctx = PlacementContext::with_device(rect(), extent(), ());
        assert!(!ctx.has_label_font());
        let family = ctx.label_font().family().to_string();
        assert_eq!(family, PlacementConfig::default().font_family);
        ctx.label_font();
        assert!(ctx.has_label_font());
    }

    #[test]
    fn label_text_reserves_measured_span() {
        let mut ctx = PlacementContext::with_device(rect(), extent(), ());
        ctx.set_label_font(LabelFont::fallback(16.0));
        ctx.set_label_format(TextAlignment {
            horizontal: Alignment::Near,
            vertical: Alignment::Near,
        });
        // "Paris" is 44.8px wide with the fallback advance: columns 0..=2.
        assert_eq!(ctx.try_reserve_label_text(0, 0, "Paris"), Ok(true));
        let buffer = ctx.buffer().unwrap();
        assert_eq!(buffer.reserved_label_cells().len(), 3);
        assert_eq!(ctx.try_reserve_label_cell(40, 10), Ok(false));
        assert_eq!(ctx.try_reserve_label_cell(48, 10), Ok(true));
    }

    #[test]
    fn centered_label_reserves_both_sides_of_anchor() {
        let mut ctx = PlacementContext::with_device(rect(), extent(), ());
        ctx.set_label_font(LabelFont::fallback(16.0));
        // Drawn from 77.6 to 122.4: columns 4..=7.
        assert_eq!(ctx.try_reserve_label_text(100, 5, "Paris"), Ok(true));
        let columns: Vec<i32> = ctx
            .buffer()
            .unwrap()
            .reserved_label_cells()
            .sorted_keys()
            .iter()
            .map(|key| key.x)
            .collect();
        assert_eq!(columns, vec![4, 5, 6, 7]);
        // Drawn from 37.6 to 82.4, overlapping the first label's text.
        assert_eq!(ctx.try_reserve_label_text(60, 5, "Paris"), Ok(false));
    }

    #[test]
    fn label_span_follows_alignment() {
        assert_eq!(label_span(100, 44.8, Alignment::Near, 16), Ok((100, 4)));
        assert_eq!(label_span(100, 44.8, Alignment::Center, 16), Ok((77, 4)));
        assert_eq!(label_span(100, 44.8, Alignment::Far, 16), Ok((55, 4)));
        assert_eq!(label_span(0, 44.8, Alignment::Center, 16), Ok((-23, 4)));
        assert_eq!(label_span(7, 0.0, Alignment::Center, 16), Ok((7, 1)));
    }

    #[test]
    fn device_slot_is_replaceable() {
        let mut ctx = PlacementContext::with_device(rect(), extent(), 1u8);
        assert_eq!(ctx.set_device(2), Some(1));
        if let Some(device) = ctx.device_mut() {
            *device += 1;
        }
        assert_eq!(ctx.take_device(), Some(3));
        assert!(ctx.device().is_none());
    }

    #[test]
    fn reset_forgets_reservations() {
        let mut ctx = PlacementContext::with_device(rect(), extent(), ());
        assert_eq!(ctx.try_reserve_point(5, 5), Ok(true));
        ctx.reset();
        assert_eq!(ctx.try_reserve_point(5, 5), Ok(true));
    }

    #[test]
    fn with_config_rejects_bad_cells() {
        let config = PlacementConfig {
            point_cell_size: 0,
            ..PlacementConfig::default()
        };
        assert!(PlacementContext::with_config(rect(), extent(), (), config).is_err());
    }
}
