//! Qdrant-backed vector index

use std::collections::HashMap;

use async_trait::async_trait;
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::{
    CountPointsBuilder, CreateCollectionBuilder, Distance, PointStruct, SearchPointsBuilder,
    UpsertPointsBuilder, Value, VectorParamsBuilder,
};
use qdrant_client::Qdrant;
use uuid::Uuid;

use argo_core::{EmbeddedDocument, Error, Result, RetrievedDocument, VectorIndex};

const DOC_ID_KEY: &str = "doc_id";
const TEXT_KEY: &str = "text";

/// Vector index stored in a Qdrant collection.
///
/// The collection is created with cosine distance on the first upsert, sized
/// to the first embedding seen. Qdrant only accepts integers or UUIDs as
/// point ids, so each document id is mapped to a name-based UUID and the
/// document id travels in the payload.
pub struct QdrantVectorIndex {
    client: Qdrant,
    collection: String,
}

impl QdrantVectorIndex {
    /// Build a client for the server at `url`. No request is made until the
    /// first operation.
    pub fn connect(url: &str, collection: impl Into<String>) -> Result<Self> {
        let client = Qdrant::from_url(url).build().map_err(|e| {
            Error::IndexUnavailable(format!("cannot reach Qdrant at {}: {}", url, e))
        })?;
        Ok(Self {
            client,
            collection: collection.into(),
        })
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    async fn collection_exists(&self) -> Result<bool> {
        self.client
            .collection_exists(self.collection.as_str())
            .await
            .map_err(unavailable)
    }

    async fn ensure_collection(&self, dimension: usize) -> Result<()> {
        if self.collection_exists().await? {
            return Ok(());
        }
        self.client
            .create_collection(
                CreateCollectionBuilder::new(self.collection.as_str())
                    .vectors_config(VectorParamsBuilder::new(dimension as u64, Distance::Cosine)),
            )
            .await
            .map_err(unavailable)?;
        tracing::info!(collection = %self.collection, dimension, "created Qdrant collection");
        Ok(())
    }
}

/// Name-based UUID for a document id; the same id always maps to the same point.
pub(crate) fn point_uuid(doc_id: &str) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, doc_id.as_bytes()).to_string()
}

fn unavailable(e: impl std::fmt::Display) -> Error {
    Error::IndexUnavailable(e.to_string())
}

fn payload_str<'a>(payload: &'a HashMap<String, Value>, key: &str) -> Option<&'a str> {
    match payload.get(key) {
        Some(Value {
            kind: Some(Kind::StringValue(s)),
        }) => Some(s.as_str()),
        _ => None,
    }
}

#[async_trait]
impl VectorIndex for QdrantVectorIndex {
    async fn upsert(&self, documents: &[EmbeddedDocument]) -> Result<()> {
        let Some(first) = documents.first() else {
            return Ok(());
        };
        self.ensure_collection(first.embedding.len()).await?;

        let points: Vec<PointStruct> = documents
            .iter()
            .map(|doc| {
                let mut payload = HashMap::new();
                payload.insert(DOC_ID_KEY.to_string(), Value::from(doc.id.clone()));
                payload.insert(TEXT_KEY.to_string(), Value::from(doc.text.clone()));
                PointStruct::new(point_uuid(&doc.id), doc.embedding.clone(), payload)
            })
            .collect();

        self.client
            .upsert_points(UpsertPointsBuilder::new(self.collection.as_str(), points).wait(true))
            .await
            .map_err(unavailable)?;
        tracing::debug!(collection = %self.collection, points = documents.len(), "upserted points");
        Ok(())
    }

    async fn query(&self, embedding: &[f32], k: usize) -> Result<Vec<RetrievedDocument>> {
        if k == 0 || !self.collection_exists().await? {
            return Ok(Vec::new());
        }

        let response = self
            .client
            .search_points(
                SearchPointsBuilder::new(self.collection.as_str(), embedding.to_vec(), k as u64)
                    .with_payload(true),
            )
            .await
            .map_err(unavailable)?;

        let hits = response
            .result
            .into_iter()
            .map(|point| RetrievedDocument {
                id: payload_str(&point.payload, DOC_ID_KEY)
                    .unwrap_or_default()
                    .to_string(),
                text: payload_str(&point.payload, TEXT_KEY)
                    .unwrap_or_default()
                    .to_string(),
                score: point.score,
            })
            .collect();
        Ok(hits)
    }

    async fn count(&self) -> Result<usize> {
        if !self.collection_exists().await? {
            return Ok(0);
        }
        let response = self
            .client
            .count(CountPointsBuilder::new(self.collection.as_str()).exact(true))
            .await
            .map_err(unavailable)?;
        Ok(response.result.map(|r| r.count as usize).unwrap_or(0))
    }
}
