//! Terminal and JSON rendering of retrieval results.

use serde::Serialize;
use std::fmt::Write as _;

use ctxret_core::types::{ChunkStore, RetrievedChunk};

/// Characters of chunk text shown when the full text is not requested.
const PREVIEW_CHARS: usize = 200;
const RULE: &str = "======================================================================";

#[derive(Serialize)]
struct JsonOutput<'a> {
    query: &'a str,
    results: &'a [RetrievedChunk],
}

pub fn format_json(query: &str, results: &[RetrievedChunk]) -> String {
    serde_json::to_string_pretty(&JsonOutput { query, results }).unwrap_or_else(|_| "{}".to_string())
}

pub fn banner() -> String {
    format!("\n{RULE}\n🔍 CONTEXTUAL RETRIEVAL SYSTEM\n{RULE}\nPowered by: Contextual Embeddings + Hybrid Search\n{RULE}\n")
}

pub fn preview(text: &str, full_text: bool) -> String {
    if full_text || text.chars().count() <= PREVIEW_CHARS {
        return text.to_string();
    }
    let cut: String = text.chars().take(PREVIEW_CHARS).collect();
    format!("{}...", cut)
}

pub fn format_human(results: &[RetrievedChunk], full_text: bool) -> String {
    if results.is_empty() {
        return "\n❌ No results found.\n".to_string();
    }
    let mut out = String::new();
    let _ = writeln!(out, "\n📊 Found {} results:\n", results.len());
    for (i, r) in results.iter().enumerate() {
        let _ = writeln!(out, "{RULE}\nResult #{}\n{RULE}", i + 1);
        let _ = writeln!(out, "📈 Combined Score: {:.4}", r.combined_score);
        let _ = writeln!(out, "   ├─ Vector Score:  {:.4} (semantic similarity)", r.vector_score);
        let _ = writeln!(out, "   └─ BM25 Score:    {:.4} (keyword matching)", r.bm25_score);
        let _ = writeln!(out, "\n💬 Context:\n   {}", r.context);
        let _ = writeln!(out, "\n📝 Text:\n   {}\n", preview(&r.text, full_text));
    }
    out
}

pub fn format_stats(store: &ChunkStore) -> String {
    format!(
        "\n📊 Document Statistics:\n   Total chunks: {}\n   Total characters: {}\n   Average chunk size: {} chars\n",
        store.len(),
        store.total_chars(),
        store.average_chunk_chars()
    )
}
