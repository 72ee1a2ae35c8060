use bridge_traits::error::{BridgeError, ErrorKind};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetadataError {
    /// The source was readable but carries no GPS fix
    #[error("No location data found")]
    NoLocationData,

    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(String),

    #[error("Format conversion failed: {0}")]
    Conversion(String),

    #[error("Failed to extract metadata: {0}")]
    Extraction(String),

    /// exiftool could not be spawned or exited unsuccessfully
    #[error("External tool failed: {0}")]
    ToolFailed(String),

    #[error("Geocoding request failed: {0}")]
    Geocode(String),

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),
}

impl MetadataError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MetadataError::Bridge(e) => e.kind(),
            _ => ErrorKind::Other,
        }
    }

    pub fn is_no_location(&self) -> bool {
        matches!(self, MetadataError::NoLocationData)
    }
}

pub type Result<T> = std::result::Result<T, MetadataError>;
