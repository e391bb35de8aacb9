//! Extraction metadata assembly (SPEC_FULL.md §3.1).
//!
//! Always carries filesystem-derived fields plus the trace id; copies
//! whatever document-info fields the converter exposed; falls back the
//! title to the file's basename when the converter found none.

use chrono::Utc;
use std::collections::HashMap;
use std::path::Path;

/// Converter-exposed fields copied verbatim when present (SPEC_FULL.md
/// §3.1).
const PASSTHROUGH_FIELDS: &[&str] = &[
    "title",
    "author",
    "subject",
    "keywords",
    "creator",
    "producer",
    "creation_date",
    "modified_date",
    "language",
];

/// Assembles the metadata map the extract worker attaches to a document,
/// per SPEC_FULL.md §3.1.
#[must_use]
pub fn build_metadata(
    path: &Path,
    converter_metadata: &HashMap<String, serde_json::Value>,
    trace_id: &str,
) -> HashMap<String, serde_json::Value> {
    let mut metadata = HashMap::new();

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let file_type = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    let file_size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);

    metadata.insert("file_path".to_string(), path.display().to_string().into());
    metadata.insert("file_name".to_string(), file_name.clone().into());
    metadata.insert("file_type".to_string(), file_type.into());
    metadata.insert("extraction_date".to_string(), Utc::now().to_rfc3339().into());
    metadata.insert("file_size".to_string(), file_size.into());
    metadata.insert("trace_id".to_string(), trace_id.to_string().into());

    for field in PASSTHROUGH_FIELDS {
        if let Some(value) = converter_metadata.get(*field) {
            metadata.insert((*field).to_string(), value.clone());
        }
    }

    if !metadata.contains_key("title") {
        let basename = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or(file_name);
        metadata.insert("title".to_string(), basename.into());
    }

    metadata
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_title_to_basename_without_extension() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("quarterly-report.pdf");
        std::fs::write(&path, b"x").expect("write");

        let metadata = build_metadata(&path, &HashMap::new(), "trace-1");
        assert_eq!(metadata["title"], serde_json::json!("quarterly-report"));
        assert_eq!(metadata["file_type"], serde_json::json!("pdf"));
        assert_eq!(metadata["trace_id"], serde_json::json!("trace-1"));
    }

    #[test]
    fn converter_title_wins_over_basename_fallback() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("report.pdf");
        std::fs::write(&path, b"x").expect("write");

        let mut converter_metadata = HashMap::new();
        converter_metadata.insert("title".to_string(), serde_json::json!("Q3 Earnings"));

        let metadata = build_metadata(&path, &converter_metadata, "trace-2");
        assert_eq!(metadata["title"], serde_json::json!("Q3 Earnings"));
    }
}
