use crate::app::{BulkfeedError, Result};
use crate::domain::Item;

pub const DEFAULT_COLUMNS: [&str; 3] = ["Title", "Image_URL", "Link"];

/// What a column name resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    /// Optimized title when present, otherwise the original.
    Title,
    OriginalTitle,
    ImageUrl,
    Permalink,
    ImageStatus,
}

impl Field {
    /// Look up a column name. Case, spaces and hyphens are not significant.
    pub fn for_column(name: &str) -> Option<Field> {
        let key: String = name
            .trim()
            .chars()
            .map(|c| if c == ' ' || c == '-' { '_' } else { c.to_ascii_lowercase() })
            .collect();

        match key.as_str() {
            "title" | "optimized_title" => Some(Field::Title),
            "original_title" => Some(Field::OriginalTitle),
            "image_url" | "image" => Some(Field::ImageUrl),
            "link" | "permalink" | "url" => Some(Field::Permalink),
            "image_status" | "status" => Some(Field::ImageStatus),
            _ => None,
        }
    }

    pub fn value(self, item: &Item) -> String {
        match self {
            Field::Title => item.display_title().to_string(),
            Field::OriginalTitle => item.title.clone(),
            Field::ImageUrl => item.image_url.clone().unwrap_or_default(),
            Field::Permalink => item.permalink.clone(),
            Field::ImageStatus => item.image_status.to_string(),
        }
    }
}

/// Ordered export column names. Always holds at least one column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnList {
    names: Vec<String>,
}

impl Default for ColumnList {
    fn default() -> Self {
        Self {
            names: DEFAULT_COLUMNS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl ColumnList {
    pub fn new(names: Vec<String>) -> Result<Self> {
        if names.is_empty() {
            return Err(BulkfeedError::Validation(
                "at least one export column is required".into(),
            ));
        }
        Ok(Self { names })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Append a column named `Column_<n>` and return its name. `n` starts
    /// at the new length and skips names already in the list.
    pub fn add(&mut self) -> &str {
        let name = (self.names.len() + 1..)
            .map(|n| format!("Column_{}", n))
            .find(|candidate| !self.names.contains(candidate))
            .unwrap_or_default();
        self.names.push(name);
        &self.names[self.names.len() - 1]
    }

    /// Remove the column at `index`, refusing to drop the last one.
    pub fn remove(&mut self, index: usize) -> Result<String> {
        if self.names.len() <= 1 {
            return Err(BulkfeedError::Validation(
                "cannot remove the only export column".into(),
            ));
        }
        self.check_index(index)?;
        Ok(self.names.remove(index))
    }

    pub fn rename(&mut self, index: usize, name: &str) -> Result<()> {
        self.check_index(index)?;
        let name = name.trim();
        if name.is_empty() {
            return Err(BulkfeedError::Validation("column name cannot be empty".into()));
        }
        self.names[index] = name.to_string();
        Ok(())
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index >= self.names.len() {
            return Err(BulkfeedError::Validation(format!(
                "no column at position {} ({} columns)",
                index,
                self.names.len()
            )));
        }
        Ok(())
    }
}
