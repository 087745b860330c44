//! Bulk load of arXiv metadata into the vector store

use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::error::{Result, SpecloopError};
use crate::research::genai::GenAiClient;
use crate::research::store::VectorStore;
use crate::research::types::ArxivPaper;

/// Counts from one ingest run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestSummary {
    /// Papers the store acknowledged
    pub stored: usize,
    /// Lines that were not valid paper metadata
    pub skipped: usize,
    pub batches: usize,
    /// True when a failed insert ended the run before the input did
    pub stopped_early: bool,
}

/// Read JSON-lines paper metadata, embed `title + "\n" + abstract` per batch,
/// and insert each batch. A failed insert stops the run; embedding failures
/// are returned as errors.
pub async fn ingest<R>(
    reader: R,
    genai: &dyn GenAiClient,
    store: &dyn VectorStore,
    batch_size: usize,
) -> Result<IngestSummary>
where
    R: AsyncBufRead + Unpin,
{
    if batch_size == 0 {
        return Err(SpecloopError::Config("ingest batch size must be at least 1".to_string()));
    }

    let mut summary = IngestSummary::default();
    let mut batch = Vec::with_capacity(batch_size);
    let mut lines = reader.lines();
    let mut line_number = 0usize;

    while let Some(line) = lines.next_line().await? {
        line_number += 1;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<ArxivPaper>(&line) {
            Ok(paper) => batch.push(paper),
            Err(e) => {
                log::warn!("Skipping line {}: {}", line_number, e);
                summary.skipped += 1;
                continue;
            }
        }

        if batch.len() == batch_size && !flush(&mut batch, genai, store, &mut summary).await? {
            return Ok(summary);
        }
    }

    if !batch.is_empty() {
        flush(&mut batch, genai, store, &mut summary).await?;
    }

    log::info!(
        "Ingest finished: {} stored, {} skipped, {} batches",
        summary.stored,
        summary.skipped,
        summary.batches
    );
    Ok(summary)
}

/// Embed and insert one batch; false means the run must stop
async fn flush(
    batch: &mut Vec<ArxivPaper>,
    genai: &dyn GenAiClient,
    store: &dyn VectorStore,
    summary: &mut IngestSummary,
) -> Result<bool> {
    let mut papers = std::mem::take(batch);
    let texts: Vec<String> = papers.iter().map(ArxivPaper::embedding_text).collect();
    let embeddings = genai.embed_batch(&texts).await?;
    if embeddings.len() != papers.len() {
        return Err(SpecloopError::Llm(format!(
            "Asked for {} embeddings, got {}",
            papers.len(),
            embeddings.len()
        )));
    }
    for (paper, embedding) in papers.iter_mut().zip(embeddings) {
        paper.embedding = embedding;
    }

    summary.batches += 1;
    match store.insert_many(papers).await {
        Ok(count) => {
            summary.stored += count;
            log::debug!("Batch {} stored {} papers", summary.batches, count);
            Ok(true)
        }
        Err(e) => {
            log::error!("Error while loading data: {}", e);
            summary.stopped_early = true;
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::Mutex;

    struct LenGenAi;

    #[async_trait]
    impl GenAiClient for LenGenAi {
        async fn embed(&self, text: &str) -> Result<Vec<f64>> {
            Ok(vec![text.len() as f64])
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f64>>> {
            Ok(texts.iter().map(|t| vec![t.len() as f64]).collect())
        }

        async fn generate_text(&self, _prompt: &str) -> Result<String> {
            Ok(String::new())
        }

        async fn generate_json(&self, _parts: &[String], _schema: &Value) -> Result<Value> {
            Ok(Value::Null)
        }
    }

    /// Records batches; fails the insert with the given 1-based index
    #[derive(Default)]
    struct RecordingStore {
        batches: Mutex<Vec<Vec<ArxivPaper>>>,
        fail_on: Option<usize>,
    }

    #[async_trait]
    impl VectorStore for RecordingStore {
        async fn ping(&self) -> Result<()> {
            Ok(())
        }

        async fn insert_many(&self, papers: Vec<ArxivPaper>) -> Result<usize> {
            let mut batches = self.batches.lock().unwrap();
            if self.fail_on == Some(batches.len() + 1) {
                return Err(SpecloopError::Unavailable("duplicate key".to_string()));
            }
            let count = papers.len();
            batches.push(papers);
            Ok(count)
        }

        async fn vector_search(&self, _embedding: Vec<f64>, _limit: u32) -> Result<Vec<ArxivPaper>> {
            Ok(Vec::new())
        }
    }

    fn lines(n: usize) -> String {
        (0..n)
            .map(|i| {
                format!(
                    r#"{{"id":"{i}","title":"T{i}","authors":"A","abstract":"abs","categories":"cs","doi":null}}"#
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[tokio::test]
    async fn test_batches_and_embeddings() {
        let store = RecordingStore::default();
        let input = lines(5);

        let summary = ingest(input.as_bytes(), &LenGenAi, &store, 2).await.unwrap();

        assert_eq!(
            summary,
            IngestSummary {
                stored: 5,
                skipped: 0,
                batches: 3,
                stopped_early: false
            }
        );
        let batches = store.batches.lock().unwrap();
        let sizes: Vec<usize> = batches.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
        // "T0\nabs"
        assert_eq!(batches[0][0].embedding, vec![6.0]);
    }

    #[tokio::test]
    async fn test_insert_failure_stops() {
        let store = RecordingStore {
            fail_on: Some(2),
            ..Default::default()
        };
        let input = lines(6);

        let summary = ingest(input.as_bytes(), &LenGenAi, &store, 2).await.unwrap();

        assert_eq!(summary.stored, 2);
        assert_eq!(summary.batches, 2);
        assert!(summary.stopped_early);
        assert_eq!(store.batches.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_bad_lines_are_skipped() {
        let store = RecordingStore::default();
        let input = format!("{}\nnot json\n\n{{\"id\":\"x\"}}\n", lines(1));

        let summary = ingest(input.as_bytes(), &LenGenAi, &store, 100).await.unwrap();
        assert_eq!(summary.stored, 1);
        assert_eq!(summary.skipped, 2);
    }

    #[tokio::test]
    async fn test_zero_batch_size_rejected() {
        let store = RecordingStore::default();
        assert!(ingest("".as_bytes(), &LenGenAi, &store, 0).await.is_err());
    }
}
