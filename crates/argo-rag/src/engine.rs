//! Retrieval query engine

use std::sync::Arc;

use argo_core::{
    AnswerGenerator, Embedder, QueryFailure, QueryFailureKind, QueryResult, RagQuery,
    RetrievedDocument, VectorIndex, DEFAULT_TOP_K,
};

/// Answers questions from the indexed corpus.
///
/// Each query runs one linear pass: check the index is populated, check the
/// generator is configured, embed the question, retrieve the nearest
/// documents, assemble a grounded prompt and call the generator. Every
/// outcome comes back as a [`QueryResult`]; nothing on this path panics.
pub struct RetrievalQueryEngine<E: ?Sized, V: ?Sized, G: ?Sized> {
    embedder: Arc<E>,
    index: Arc<V>,
    generator: Arc<G>,
    top_k: usize,
}

impl<E, V, G> RetrievalQueryEngine<E, V, G>
where
    E: Embedder + ?Sized,
    V: VectorIndex + ?Sized,
    G: AnswerGenerator + ?Sized,
{
    pub fn new(embedder: Arc<E>, index: Arc<V>, generator: Arc<G>) -> Self {
        Self {
            embedder,
            index,
            generator,
            top_k: DEFAULT_TOP_K,
        }
    }

    /// Default retrieval depth for [`rag_query`](Self::rag_query).
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Answer `question` using the engine's default `top_k`.
    pub async fn rag_query(&self, question: &str) -> QueryResult {
        self.rag_query_with(&RagQuery::new(question).with_top_k(self.top_k))
            .await
    }

    pub async fn rag_query_with(&self, query: &RagQuery) -> QueryResult {
        let top_k = query.top_k.max(1);

        let stored = self
            .index
            .count()
            .await
            .map_err(|e| QueryFailure::new(QueryFailureKind::IndexUnavailable, e.to_string()))?;
        if stored == 0 {
            return Err(QueryFailure::new(
                QueryFailureKind::NoDocuments,
                "No documents found in the vector index. Run `argo build` first.",
            ));
        }

        self.generator
            .ensure_configured()
            .map_err(|e| QueryFailure::new(QueryFailureKind::MissingCredentials, e.to_string()))?;

        let embedding = self.embed_question(&query.question).await?;

        let hits = self
            .index
            .query(&embedding, top_k)
            .await
            .map_err(|e| QueryFailure::new(QueryFailureKind::IndexUnavailable, e.to_string()))?;
        tracing::debug!(hits = hits.len(), top_k, "retrieved documents");
        if hits.is_empty() {
            return Err(QueryFailure::new(
                QueryFailureKind::NoRelevantDocuments,
                "No relevant documents found.",
            ));
        }

        let context = build_context(&hits).ok_or_else(|| {
            QueryFailure::new(
                QueryFailureKind::NoRelevantDocuments,
                "Retrieved documents are empty.",
            )
        })?;
        let prompt = build_prompt(&context, &query.question);

        tracing::debug!(model = self.generator.model_id(), "calling answer generator");
        self.generator.generate(&prompt).await.map_err(|e| {
            tracing::warn!(error = %e, "answer generation failed");
            QueryFailure::new(QueryFailureKind::Generation, e.to_string())
        })
    }

    /// Answer `question` and render any failure as a message for display.
    pub async fn ask(&self, question: &str) -> String {
        match self.rag_query(question).await {
            Ok(answer) => answer,
            Err(failure) => failure.to_string(),
        }
    }

    async fn embed_question(&self, question: &str) -> Result<Vec<f32>, QueryFailure> {
        let failed = |detail: String| QueryFailure::new(QueryFailureKind::Embedding, detail);

        let vectors = self
            .embedder
            .embed(&[question.to_string()])
            .await
            .map_err(|e| failed(e.to_string()))?;
        vectors
            .into_iter()
            .next()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                failed(format!(
                    "{} returned no embedding for the question",
                    self.embedder.model_id()
                ))
            })
    }
}

/// Join the non-blank document texts with newlines, keeping rank order.
/// Returns `None` when every text is blank.
pub fn build_context(hits: &[RetrievedDocument]) -> Option<String> {
    let texts: Vec<&str> = hits
        .iter()
        .map(|hit| hit.text.as_str())
        .filter(|text| !text.trim().is_empty())
        .collect();
    (!texts.is_empty()).then(|| texts.join("\n"))
}

pub fn build_prompt(context: &str, question: &str) -> String {
    format!("Context:\n{}\n\nQuestion: {}\nAnswer:", context, question)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(id: &str, text: &str) -> RetrievedDocument {
        RetrievedDocument {
            id: id.to_string(),
            text: text.to_string(),
            score: 0.5,
        }
    }

    #[test]
    fn test_build_context_skips_blank_texts() {
        let hits = [hit("a", "first"), hit("b", "  \n"), hit("c", "third")];
        assert_eq!(build_context(&hits).as_deref(), Some("first\nthird"));
        assert_eq!(build_context(&[hit("a", " "), hit("b", "")]), None);
        assert_eq!(build_context(&[]), None);
    }

    #[test]
    fn test_build_prompt() {
        assert_eq!(
            build_prompt("doc one\ndoc two", "why?"),
            "Context:\ndoc one\ndoc two\n\nQuestion: why?\nAnswer:"
        );
    }
}
