//! `RagSemanticStrategy`: the one pluggable, swappable-backend retrieval
//! point (spec §4.2's `RAG_SEMANTIC` reason), matching the teacher's own
//! single external-service trait boundary (`rag_store::RagStore`). Uses a
//! manually boxed future rather than `async-trait` to keep the dependency
//! footprint the same as the rest of the crate.

use std::future::Future;
use std::pin::Pin;

use diff_core::GitDiffDocument;
use review_model::{ContextMatch, MatchReason};

pub trait SemanticRetriever: Send + Sync {
    fn retrieve<'a>(
        &'a self,
        diff: &'a GitDiffDocument,
    ) -> Pin<Box<dyn Future<Output = Vec<(String, f64, String)>> + Send + 'a>>;
}

pub async fn retrieve(diff: &GitDiffDocument, retriever: &dyn SemanticRetriever) -> Vec<ContextMatch> {
    retriever
        .retrieve(diff)
        .await
        .into_iter()
        .map(|(file_path, score, evidence)| ContextMatch {
            file_path,
            reason: MatchReason::RagSemantic,
            confidence: score.clamp(0.0, 1.0),
            evidence,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use diff_core::FileModification;

    struct FakeRetriever;
    impl SemanticRetriever for FakeRetriever {
        fn retrieve<'a>(
            &'a self,
            _diff: &'a GitDiffDocument,
        ) -> Pin<Box<dyn Future<Output = Vec<(String, f64, String)>> + Send + 'a>> {
            Box::pin(async { vec![("src/related.rs".to_string(), 0.77, "semantic match".to_string())] })
        }
    }

    #[tokio::test]
    async fn maps_semantic_hits_to_context_matches() {
        let doc = GitDiffDocument {
            files: vec![FileModification { old_path: "a.rs".into(), new_path: "a.rs".into(), hunks: vec![] }],
        };
        let retriever = FakeRetriever;
        let matches = retrieve(&doc, &retriever).await;
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].confidence, 0.77);
        assert!(matches!(matches[0].reason, MatchReason::RagSemantic));
    }
}
