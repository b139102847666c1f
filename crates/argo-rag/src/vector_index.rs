//! File-backed local vector index

use std::collections::BTreeMap;
use std::fs;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use argo_core::{EmbeddedDocument, Error, Result, RetrievedDocument, VectorIndex};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredEntry {
    text: String,
    embedding: Vec<f32>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct IndexFile {
    dimension: Option<usize>,
    documents: BTreeMap<String, StoredEntry>,
}

/// Exact nearest-neighbour index kept in memory and mirrored to a JSON file.
///
/// Upserts only touch memory; `flush` writes the whole index once. Entries
/// are keyed by document id in a sorted map, so the file written for a given
/// set of documents is byte-for-byte the same on every run.
pub struct LocalVectorIndex {
    path: Option<PathBuf>,
    state: RwLock<IndexFile>,
    dirty: AtomicBool,
}

impl LocalVectorIndex {
    /// Open the index stored at `path`, starting empty if the file does not
    /// exist yet. Parent directories are created on first write.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let state = if path.exists() {
            let content = fs::read_to_string(&path).map_err(|e| {
                Error::IndexUnavailable(format!("cannot read {}: {}", path.display(), e))
            })?;
            serde_json::from_str(&content).map_err(|e| {
                Error::IndexUnavailable(format!("corrupt index file {}: {}", path.display(), e))
            })?
        } else {
            IndexFile::default()
        };
        tracing::debug!(
            path = %path.display(),
            documents = state.documents.len(),
            "opened local vector index"
        );

        Ok(Self {
            path: Some(path),
            state: RwLock::new(state),
            dirty: AtomicBool::new(false),
        })
    }

    /// Index that is never written to disk.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            state: RwLock::new(IndexFile::default()),
            dirty: AtomicBool::new(false),
        }
    }

    fn poisoned() -> Error {
        Error::IndexUnavailable("index lock poisoned".to_string())
    }

    fn persist(&self, state: &IndexFile) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let unavailable = |e: std::io::Error| {
            Error::IndexUnavailable(format!("cannot write {}: {}", path.display(), e))
        };

        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(unavailable)?;

        let tmp = NamedTempFile::new_in(dir).map_err(unavailable)?;
        let mut writer = BufWriter::new(tmp);
        serde_json::to_writer(&mut writer, state)
            .map_err(|e| Error::Serialization(e.to_string()))?;
        let tmp = writer.into_inner().map_err(|e| unavailable(e.into_error()))?;
        tmp.persist(path).map_err(|e| unavailable(e.error))?;
        tracing::debug!(
            path = %path.display(),
            documents = state.documents.len(),
            "wrote local vector index"
        );
        Ok(())
    }
}

#[async_trait]
impl VectorIndex for LocalVectorIndex {
    async fn upsert(&self, documents: &[EmbeddedDocument]) -> Result<()> {
        if documents.is_empty() {
            return Ok(());
        }
        let mut state = self.state.write().map_err(|_| Self::poisoned())?;

        let dimension = state.dimension.unwrap_or(documents[0].embedding.len());
        if let Some(bad) = documents.iter().find(|d| d.embedding.len() != dimension) {
            return Err(Error::InvalidInput(format!(
                "document '{}' has {} dimensions, index expects {}",
                bad.id,
                bad.embedding.len(),
                dimension
            )));
        }

        state.dimension = Some(dimension);
        for doc in documents {
            state.documents.insert(
                doc.id.clone(),
                StoredEntry {
                    text: doc.text.clone(),
                    embedding: doc.embedding.clone(),
                },
            );
        }
        self.dirty.store(true, Ordering::Release);
        Ok(())
    }

    async fn query(&self, embedding: &[f32], k: usize) -> Result<Vec<RetrievedDocument>> {
        let state = self.state.read().map_err(|_| Self::poisoned())?;

        let mut scored: Vec<RetrievedDocument> = state
            .documents
            .iter()
            .map(|(id, entry)| RetrievedDocument {
                id: id.clone(),
                text: entry.text.clone(),
                score: cosine_similarity(embedding, &entry.embedding),
            })
            .collect();

        // Highest similarity first, ties broken by id
        scored.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
        scored.truncate(k);
        Ok(scored)
    }

    async fn count(&self) -> Result<usize> {
        let state = self.state.read().map_err(|_| Self::poisoned())?;
        Ok(state.documents.len())
    }

    async fn flush(&self) -> Result<()> {
        if !self.dirty.swap(false, Ordering::AcqRel) {
            return Ok(());
        }
        let state = self.state.read().map_err(|_| Self::poisoned())?;
        self.persist(&state).inspect_err(|_| {
            self.dirty.store(true, Ordering::Release);
        })
    }
}

/// Calculate cosine similarity between two vectors
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let magnitude_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let magnitude_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return 0.0;
    }

    dot_product / (magnitude_a * magnitude_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str, embedding: Vec<f32>) -> EmbeddedDocument {
        EmbeddedDocument {
            id: id.to_string(),
            text: format!("text of {}", id),
            embedding,
        }
    }

    #[tokio::test]
    async fn test_query_ranks_by_similarity() {
        let index = LocalVectorIndex::in_memory();
        index
            .upsert(&[
                doc("a", vec![1.0, 0.0]),
                doc("b", vec![0.0, 1.0]),
                doc("c", vec![0.7, 0.7]),
            ])
            .await
            .unwrap();

        let hits = index.query(&[1.0, 0.1], 2).await.unwrap();
        let ids: Vec<_> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
        assert!(hits[0].score > hits[1].score);
    }

    #[tokio::test]
    async fn test_ties_break_by_id() {
        let index = LocalVectorIndex::in_memory();
        index
            .upsert(&[doc("z", vec![1.0, 0.0]), doc("m", vec![1.0, 0.0])])
            .await
            .unwrap();
        let hits = index.query(&[1.0, 0.0], 5).await.unwrap();
        assert_eq!(hits[0].id, "m");
        assert_eq!(hits[1].id, "z");
    }

    #[tokio::test]
    async fn test_upsert_overwrites_by_id() {
        let index = LocalVectorIndex::in_memory();
        index.upsert(&[doc("a", vec![1.0, 0.0])]).await.unwrap();

        let mut replacement = doc("a", vec![0.0, 1.0]);
        replacement.text = "new text".to_string();
        index.upsert(&[replacement]).await.unwrap();

        assert_eq!(index.count().await.unwrap(), 1);
        let hits = index.query(&[0.0, 1.0], 1).await.unwrap();
        assert_eq!(hits[0].text, "new text");
    }

    #[tokio::test]
    async fn test_dimension_mismatch_is_rejected() {
        let index = LocalVectorIndex::in_memory();
        index.upsert(&[doc("a", vec![1.0, 0.0])]).await.unwrap();
        let err = index.upsert(&[doc("b", vec![1.0])]).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert_eq!(index.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_persists_and_reopens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store").join("argo_data.json");

        let index = LocalVectorIndex::open(&path).unwrap();
        assert_eq!(index.count().await.unwrap(), 0);
        index
            .upsert(&[doc("t_0", vec![0.5, 0.5]), doc("t_1", vec![1.0, 0.0])])
            .await
            .unwrap();
        assert!(!path.exists());
        index.flush().await.unwrap();
        assert!(path.exists());

        let reopened = LocalVectorIndex::open(&path).unwrap();
        assert_eq!(reopened.count().await.unwrap(), 2);
        let hits = reopened.query(&[1.0, 0.0], 1).await.unwrap();
        assert_eq!(hits[0].id, "t_1");
    }

    #[tokio::test]
    async fn test_flush_writes_compact_json_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("argo_data.json");
        let index = LocalVectorIndex::open(&path).unwrap();

        for i in 0..3 {
            index
                .upsert(&[doc(&format!("t_{}", i), vec![1.0, i as f32])])
                .await
                .unwrap();
        }
        assert!(!path.exists());

        index.flush().await.unwrap();
        let written = fs::read_to_string(&path).unwrap();
        assert!(!written.contains('\n'));
        assert!(written.starts_with(r#"{"dimension":2,"documents":{"t_0":"#));

        // nothing changed since the last flush, so the file is left alone
        fs::remove_file(&path).unwrap();
        index.flush().await.unwrap();
        assert!(!path.exists());

        index.upsert(&[doc("t_3", vec![0.0, 1.0])]).await.unwrap();
        index.flush().await.unwrap();
        let reopened = LocalVectorIndex::open(&path).unwrap();
        assert_eq!(reopened.count().await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_in_memory_flush_is_a_no_op() {
        let index = LocalVectorIndex::in_memory();
        index.upsert(&[doc("a", vec![1.0])]).await.unwrap();
        assert!(index.flush().await.is_ok());
    }

    #[test]
    fn test_corrupt_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "not json").unwrap();
        let err = LocalVectorIndex::open(&path).err().unwrap();
        assert!(matches!(err, Error::IndexUnavailable(_)));
    }

    #[test]
    fn test_cosine_similarity() {
        let vec1 = vec![1.0, 0.0, 0.0];
        let vec2 = vec![1.0, 0.0, 0.0];
        let vec3 = vec![0.0, 1.0, 0.0];

        assert!((cosine_similarity(&vec1, &vec2) - 1.0).abs() < 0.001);
        assert!(cosine_similarity(&vec1, &vec3).abs() < 0.001);
        assert_eq!(cosine_similarity(&vec1, &[1.0]), 0.0);
    }
}
