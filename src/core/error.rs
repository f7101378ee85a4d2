/// Errors produced by the image-to-block pipeline.
///
/// Validation errors surface synchronously before any side effect;
/// acquisition errors abort the pipeline with no canvas created.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("packed RGB value {0:#08x} exceeds 0xFFFFFF")]
    PackedOutOfRange(u32),

    #[error("{channel} channel value {value} is outside the range 0-255")]
    ChannelOutOfRange { channel: &'static str, value: u32 },

    #[error("pixel ({x}, {y}) is out of bounds for a {width}x{height} grid")]
    OutOfBounds {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    },

    #[error("invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("pixel scale must be positive, got {0}")]
    InvalidScale(f32),

    #[error("resize factor must be positive, got {0}")]
    InvalidFactor(f32),

    #[error("resample failed: {0}")]
    Resample(String),

    #[error("quantization depth {0} exceeds the supported maximum of 16")]
    DepthTooLarge(u32),

    #[error("cannot quantize an empty pixel grid")]
    EmptyGraph,

    #[error("pixel subset exhausted at depth {0}; reduce the quantization depth")]
    PaletteUnderflow(u32),

    #[error("image is {image_width}x{image_height} but the canvas is {canvas_width}x{canvas_height}")]
    DimensionMismatch {
        image_width: u32,
        image_height: u32,
        canvas_width: u32,
        canvas_height: u32,
    },

    #[error("canvas dimensions must be set before attaching an image")]
    DimensionsUnset,

    #[error("no pixel grid attached to the canvas builder")]
    MissingGraph,

    #[error("canvas has already been rendered")]
    AlreadyRendered,

    #[error("canvas has already been destroyed")]
    AlreadyDestroyed,

    #[error("canvas {0} not found")]
    CanvasNotFound(String),

    #[error("image acquisition failed: {0}")]
    Acquisition(String),

    #[error("world loop is no longer running")]
    WorldStopped,
}

pub type Result<T> = std::result::Result<T, Error>;
