use crate::constants::QUERY_SEPARATOR;
use crate::decoding::{QueryResult, decode};
use crate::embedding::{TextEmbedder, TextEmbedding, VideoEmbedding};
use crate::grounding::GroundingEngine;

use super::error::ServiceError;

/// Splits a batch on `;`, trims each part, and drops empty parts.
pub fn split_queries(raw: &str) -> Vec<String> {
    raw.split(QUERY_SEPARATOR)
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(str::to_string)
        .collect()
}

/// One query carried through embed, infer, and decode.
///
/// The text embedding lives here rather than in shared storage, so no other
/// query can observe or replace it.
#[derive(Debug, Clone)]
pub struct QueryContext {
    query: String,
    text: TextEmbedding,
}

impl QueryContext {
    pub fn embed(query: &str, embedder: &TextEmbedder) -> Result<Self, ServiceError> {
        let text = embedder.embed(query)?;
        Ok(Self {
            query: query.to_string(),
            text,
        })
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn text(&self) -> &TextEmbedding {
        &self.text
    }

    pub fn ground(
        self,
        engine: &GroundingEngine,
        video: &VideoEmbedding,
    ) -> Result<QueryResult, ServiceError> {
        let inference = engine.infer(video, &self.text)?;
        Ok(decode(
            &self.query,
            &inference.output,
            &inference.features,
            engine.clip_len(),
        )?)
    }
}

/// Runs `queries` in order; the first failure aborts the rest.
pub fn run_sequential(
    queries: &[String],
    embedder: &TextEmbedder,
    engine: &GroundingEngine,
    video: &VideoEmbedding,
) -> Result<Vec<QueryResult>, ServiceError> {
    queries
        .iter()
        .map(|query| {
            QueryContext::embed(query, embedder)
                .and_then(|ctx| ctx.ground(engine, video))
                .map_err(|e| ServiceError::QueryFailed {
                    query: query.clone(),
                    source: Box::new(e),
                })
        })
        .collect()
}
