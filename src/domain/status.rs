use std::fmt;

use serde::{Deserialize, Serialize};

/// Result of the most recent image check for an item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageStatus {
    #[default]
    Pending,
    Valid,
    Invalid,
    NoImage,
    CanvaOk,
    CanvaFail,
}

impl ImageStatus {
    pub const ALL: [ImageStatus; 6] = [
        ImageStatus::Pending,
        ImageStatus::Valid,
        ImageStatus::Invalid,
        ImageStatus::NoImage,
        ImageStatus::CanvaOk,
        ImageStatus::CanvaFail,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ImageStatus::Pending => "pending",
            ImageStatus::Valid => "valid",
            ImageStatus::Invalid => "invalid",
            ImageStatus::NoImage => "no_image",
            ImageStatus::CanvaOk => "canva_ok",
            ImageStatus::CanvaFail => "canva_fail",
        }
    }

    /// Whether a check confirmed the image can be fetched.
    pub fn is_reachable(self) -> bool {
        matches!(self, ImageStatus::Valid | ImageStatus::CanvaOk)
    }
}

impl fmt::Display for ImageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
