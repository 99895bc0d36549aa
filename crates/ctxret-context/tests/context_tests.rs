use async_trait::async_trait;

use ctxret_context::{build_prompt, contextualize, generator_from_settings, MockContextGenerator};
use ctxret_core::config::{ContextProvider, ContextSettings};
use ctxret_core::error::{Error, Result};
use ctxret_core::traits::ContextGenerator;
use ctxret_core::types::ChunkRecord;

struct FailOn(u64);

#[async_trait]
impl ContextGenerator for FailOn {
    async fn generate(&self, chunk: &ChunkRecord, _document_text: &str) -> Result<String> {
        if chunk.chunk_id == self.0 {
            return Err(Error::ContextGeneration("rate limited".into()));
        }
        Ok(format!("ctx {}", chunk.chunk_id))
    }
}

fn chunks(n: u64) -> Vec<ChunkRecord> {
    (1..=n).map(|i| ChunkRecord::new(i, format!("chunk {}", i), 0, 1)).collect()
}

#[test]
fn prompt_embeds_document_and_chunk() {
    let prompt = build_prompt("THE DOCUMENT", "THE CHUNK");
    assert!(prompt.starts_with("<document>\nTHE DOCUMENT\n</document>"));
    assert!(prompt.contains("<chunk>\nTHE CHUNK\n</chunk>"));
    assert!(prompt.ends_with("Answer only with the succinct context and nothing else."));
}

#[test]
fn prompt_placeholders_in_content_are_left_alone() {
    let prompt = build_prompt("doc mentions {chunk_content}", "chunk");
    assert!(prompt.contains("doc mentions {chunk_content}"));
    assert!(prompt.contains("<chunk>\nchunk\n</chunk>"));
}

#[tokio::test]
async fn mock_generator_fills_every_chunk() {
    let mut list = chunks(3);
    contextualize(&mut list, "document", &MockContextGenerator).await.expect("contextualize");
    assert_eq!(
        list[1].context.as_deref(),
        Some("This is chunk 2 from the document discussing various topics.")
    );
    assert!(list.iter().all(|c| c.context.is_some()));
}

#[tokio::test]
async fn failure_stops_contextualization() {
    let mut list = chunks(3);
    let err = contextualize(&mut list, "document", &FailOn(2)).await.expect_err("fails");
    assert!(matches!(err, Error::ContextGeneration(_)));
    assert_eq!(list[0].context.as_deref(), Some("ctx 1"));
    assert!(list[1].context.is_none() && list[2].context.is_none());
}

#[tokio::test]
async fn chunks_with_context_are_not_overwritten() {
    let mut list = chunks(1);
    list[0].attach_context("existing").expect("attach");
    let err = contextualize(&mut list, "document", &MockContextGenerator).await.expect_err("already set");
    assert!(matches!(err, Error::ContextAlreadySet(1)));
    assert_eq!(list[0].context.as_deref(), Some("existing"));
}

#[tokio::test]
async fn settings_select_the_provider() {
    let generator = generator_from_settings(&ContextSettings::default()).expect("mock");
    let ctx = generator.generate(&ChunkRecord::new(5, "x", 0, 1), "doc").await.expect("generate");
    assert_eq!(ctx, "This is chunk 5 from the document discussing various topics.");

    let settings = ContextSettings {
        provider: ContextProvider::Anthropic,
        api_key_env: "CTXRET_CONTEXT_TEST_NO_KEY".into(),
        ..ContextSettings::default()
    };
    std::env::remove_var("CTXRET_CONTEXT_TEST_NO_KEY");
    assert!(matches!(generator_from_settings(&settings), Err(Error::InvalidConfig(_))));
}
