//! CSV export for Canva's Bulk Create import.
//!
//! Rows are projected from items through an ordered [`ColumnList`]; each
//! column name maps to a [`Field`] and unknown names export as empty cells.

mod columns;

pub use columns::{ColumnList, Field, DEFAULT_COLUMNS};

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::info;

use crate::app::{BulkfeedError, Result};
use crate::domain::Item;

/// One exported line, one cell per configured column.
pub type Row = Vec<String>;

/// Project items into rows, preserving collection order.
pub fn build_rows(items: &[Item], columns: &ColumnList) -> Vec<Row> {
    let fields: Vec<Option<Field>> = columns
        .names()
        .iter()
        .map(|name| Field::for_column(name))
        .collect();

    items
        .iter()
        .map(|item| {
            fields
                .iter()
                .map(|field| field.map(|f| f.value(item)).unwrap_or_default())
                .collect()
        })
        .collect()
}

/// Encode the header and rows as comma-separated UTF-8.
pub fn serialize(columns: &ColumnList, rows: &[Row]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer
        .write_record(columns.names())
        .map_err(|e| BulkfeedError::Serialization(e.to_string()))?;

    for row in rows {
        if row.len() != columns.len() {
            return Err(BulkfeedError::Serialization(format!(
                "row has {} cells but there are {} columns",
                row.len(),
                columns.len()
            )));
        }
        writer
            .write_record(row)
            .map_err(|e| BulkfeedError::Serialization(e.to_string()))?;
    }

    writer
        .into_inner()
        .map_err(|e| BulkfeedError::Serialization(e.to_string()))
}

pub fn export_filename(date: NaiveDate) -> String {
    format!("canva_bulk_create_{}.csv", date.format("%Y-%m-%d"))
}

/// Write `bytes` to `dir/filename`, creating `dir` if needed.
pub fn save_export(dir: &Path, filename: &str, bytes: &[u8]) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(filename);
    fs::write(&path, bytes)?;
    info!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ImageStatus;

    fn columns(names: &[&str]) -> ColumnList {
        ColumnList::new(names.iter().map(|s| s.to_string()).collect()).unwrap()
    }

    #[test]
    fn test_row_projection() {
        let item = Item::new(1, "A", "https://example.com/a").with_image("http://x/y.png");

        let rows = build_rows(&[item.clone()], &columns(&["Title", "Image_URL"]));
        assert_eq!(rows, vec![vec!["A".to_string(), "http://x/y.png".to_string()]]);

        let rows = build_rows(&[item], &columns(&["Foo"]));
        assert_eq!(rows, vec![vec![String::new()]]);
    }

    #[test]
    fn test_title_prefers_optimized_but_original_is_available() {
        let mut item = Item::new(1, "Old", "https://example.com/a");
        item.optimized_title = Some("New".into());
        item.image_status = ImageStatus::NoImage;

        let rows = build_rows(
            &[item],
            &columns(&["Title", "Original_Title", "Image_URL", "Link", "Image_Status"]),
        );
        assert_eq!(
            rows[0],
            vec!["New", "Old", "", "https://example.com/a", "no_image"]
        );
    }

    #[test]
    fn test_rows_follow_collection_order() {
        let items = vec![
            Item::new(3, "C", "c"),
            Item::new(1, "A", "a"),
            Item::new(2, "B", "b"),
        ];
        let rows = build_rows(&items, &columns(&["Title"]));
        let titles: Vec<&str> = rows.iter().map(|r| r[0].as_str()).collect();
        assert_eq!(titles, vec!["C", "A", "B"]);
    }

    #[test]
    fn test_serialize_quotes_special_fields() {
        let cols = columns(&["Title", "Link"]);
        let rows = vec![
            vec!["Plain".to_string(), "https://e.com/1".to_string()],
            vec!["Comma, here".to_string(), "https://e.com/2".to_string()],
            vec!["Say \"hi\"".to_string(), "line\nbreak".to_string()],
        ];

        let bytes = serialize(&cols, &rows).unwrap();
        let text = String::from_utf8(bytes).unwrap();

        assert_eq!(
            text,
            "Title,Link\n\
             Plain,https://e.com/1\n\
             \"Comma, here\",https://e.com/2\n\
             \"Say \"\"hi\"\"\",\"line\nbreak\"\n"
        );
    }

    #[test]
    fn test_serialize_header_only_when_empty() {
        let bytes = serialize(&columns(&["Title", "Image_URL"]), &[]).unwrap();
        assert_eq!(bytes, b"Title,Image_URL\n");
    }

    #[test]
    fn test_serialize_rejects_ragged_rows() {
        let err = serialize(&columns(&["A", "B"]), &[vec!["only one".to_string()]]).unwrap_err();
        assert!(matches!(err, BulkfeedError::Serialization(_)));
    }

    #[test]
    fn test_export_filename() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(export_filename(date), "canva_bulk_create_2024-03-09.csv");
    }

    #[test]
    fn test_save_export_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested").join("out");

        let path = save_export(&target, "file.csv", b"Title\nA\n").unwrap();

        assert_eq!(path, target.join("file.csv"));
        assert_eq!(std::fs::read(&path).unwrap(), b"Title\nA\n");
    }
}
