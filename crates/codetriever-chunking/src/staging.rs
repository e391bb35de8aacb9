//! Staging artifact writer (SPEC_FULL.md §4.4, §6): the chunk worker's
//! handoff file to the embed stage.
//!
//! Written to a temp file in the target directory, then renamed into place,
//! so a concurrent reader never observes a partial file (SPEC_FULL.md §5).

use crate::chunk::ChunkRecord;
use crate::error::{ChunkingError, ChunkingResult};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// The on-disk shape of a staging artifact: `{chunks, metadata}`.
#[derive(Debug, Serialize)]
struct StagingArtifact<'a> {
    chunks: &'a [ChunkRecord],
    metadata: &'a serde_json::Value,
}

/// Computes the staging artifact path for a given source file basename.
#[must_use]
pub fn staging_path(processed_dir: &Path, basename: &str) -> PathBuf {
    processed_dir.join(format!("{basename}_chunks.json"))
}

/// Atomically writes `{chunks, metadata}` to
/// `<processed_dir>/<basename>_chunks.json`.
///
/// # Errors
/// Returns a [`ChunkingError`] if serialization or the write/rename fails.
pub fn write_staging_atomic(
    processed_dir: &Path,
    basename: &str,
    chunks: &[ChunkRecord],
    metadata: &serde_json::Value,
) -> ChunkingResult<PathBuf> {
    std::fs::create_dir_all(processed_dir).map_err(|source| ChunkingError::Io {
        path: processed_dir.display().to_string(),
        source,
    })?;

    let final_path = staging_path(processed_dir, basename);
    let tmp_path = processed_dir.join(format!(".{basename}_chunks.json.tmp"));

    let artifact = StagingArtifact { chunks, metadata };
    let body = serde_json::to_vec_pretty(&artifact)?;

    std::fs::write(&tmp_path, body).map_err(|source| ChunkingError::Io {
        path: tmp_path.display().to_string(),
        source,
    })?;
    std::fs::rename(&tmp_path, &final_path).map_err(|source| ChunkingError::Io {
        path: final_path.display().to_string(),
        source,
    })?;

    Ok(final_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_and_renames_into_place() {
        let dir = tempfile::tempdir().expect("tempdir");
        let chunks = vec![ChunkRecord {
            text: "hello".to_string(),
            section_path: vec![],
        }];
        let metadata = serde_json::json!({"title": "doc"});

        let path = write_staging_atomic(dir.path(), "report", &chunks, &metadata).expect("write");
        assert!(path.exists());
        assert!(!dir.path().join(".report_chunks.json.tmp").exists());

        let contents: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).expect("read")).expect("parse");
        assert_eq!(contents["metadata"]["title"], "doc");
        assert_eq!(contents["chunks"][0]["text"], "hello");
    }
}
