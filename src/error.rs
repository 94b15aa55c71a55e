use thiserror::Error;

pub type Result<T> = std::result::Result<T, PlacementError>;

/// Contract violations raised by the placement layer.
///
/// A rejected reservation is not an error: it is reported as `Ok(false)`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlacementError {
    #[error("cell count must not be negative, got {0}")]
    NegativeCellCount(i32),

    #[error("label span of {count} cells starting at column {start} overflows the grid")]
    CellOverflow { start: i32, count: i32 },

    #[error("placement buffers are not allocated; construct the context with a device")]
    BufferUnavailable,

    #[error("no drawing device is bound to the placement context")]
    DeviceUnavailable,

    #[error("invalid placement config: {0}")]
    InvalidConfig(String),
}
