use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box in the map's geographic coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeographicExtent {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl GeographicExtent {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Builds an extent from its top-left corner and size.
    pub fn from_origin(min_x: f64, max_y: f64, width: f64, height: f64) -> Self {
        Self {
            min_x,
            min_y: max_y - height,
            max_x: min_x + width,
            max_y,
        }
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }
}

/// Pixel-space rectangle of the raster buffer being drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelRectangle {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl PixelRectangle {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_size(width: i32, height: i32) -> Self {
        Self::new(0, 0, width, height)
    }
}

/// Affine mapping between a geographic extent and the pixel rectangle it is
/// drawn into. Scale factors are derived on every call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateMapper {
    rectangle: PixelRectangle,
    extent: GeographicExtent,
}

impl CoordinateMapper {
    pub fn new(rectangle: PixelRectangle, extent: GeographicExtent) -> Self {
        Self { rectangle, extent }
    }

    /// Pixels per geographic unit along x; 0 when the extent has no width.
    pub fn dx(&self) -> f64 {
        let width = self.extent.width();
        if width != 0.0 {
            self.rectangle.width as f64 / width
        } else {
            0.0
        }
    }

    /// Pixels per geographic unit along y; 0 when the extent has no height.
    pub fn dy(&self) -> f64 {
        let height = self.extent.height();
        if height != 0.0 {
            self.rectangle.height as f64 / height
        } else {
            0.0
        }
    }

    pub fn min_x(&self) -> f64 {
        self.extent.min_x
    }

    pub fn max_y(&self) -> f64 {
        self.extent.max_y
    }

    pub fn extent(&self) -> &GeographicExtent {
        &self.extent
    }

    pub fn rectangle(&self) -> &PixelRectangle {
        &self.rectangle
    }

    pub fn to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.rectangle.x as f64 + (x - self.min_x()) * self.dx(),
            self.rectangle.y as f64 + (self.max_y() - y) * self.dy(),
        )
    }

    /// Rounded pixel position, saturating at the `i32` range.
    pub fn to_pixel_point(&self, x: f64, y: f64) -> (i32, i32) {
        let (px, py) = self.to_pixel(x, y);
        (px.round() as i32, py.round() as i32)
    }

    /// Inverse of [`to_pixel`](Self::to_pixel). `None` when either scale is
    /// degenerate.
    pub fn to_geographic(&self, px: f64, py: f64) -> Option<(f64, f64)> {
        let (dx, dy) = (self.dx(), self.dy());
        if dx == 0.0 || dy == 0.0 {
            return None;
        }
        Some((
            self.min_x() + (px - self.rectangle.x as f64) / dx,
            self.max_y() - (py - self.rectangle.y as f64) / dy,
        ))
    }
}
