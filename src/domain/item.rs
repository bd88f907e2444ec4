use serde::{Deserialize, Serialize};

use crate::domain::ImageStatus;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: u64,
    pub title: String,
    pub optimized_title: Option<String>,
    pub image_url: Option<String>,
    pub permalink: String,
    pub image_status: ImageStatus,
}

impl Item {
    pub fn new(id: u64, title: impl Into<String>, permalink: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            optimized_title: None,
            image_url: None,
            permalink: permalink.into(),
            image_status: ImageStatus::Pending,
        }
    }

    pub fn with_image(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }

    /// The optimized title when one exists, otherwise the original.
    pub fn display_title(&self) -> &str {
        self.optimized_title.as_deref().unwrap_or(&self.title)
    }

    pub fn has_image(&self) -> bool {
        self.image_url.as_deref().is_some_and(|u| !u.trim().is_empty())
    }
}
