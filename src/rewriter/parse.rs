use crate::app::{BulkfeedError, Result};

/// Return the first balanced `[...]` span in `text`. Brackets inside JSON
/// string literals do not count toward the balance.
pub fn extract_json_array(text: &str) -> Option<&str> {
    let start = text.find('[')?;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    let end = start + offset + ch.len_utf8();
                    return Some(&text[start..end]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Parse model output into a list of strings.
pub fn parse_title_list(text: &str) -> Result<Vec<String>> {
    let span = extract_json_array(text)
        .ok_or_else(|| BulkfeedError::Rewrite("reply contained no JSON array".into()))?;

    serde_json::from_str::<Vec<String>>(span)
        .map_err(|e| BulkfeedError::Rewrite(format!("reply array is not a list of strings: {}", e)))
}
