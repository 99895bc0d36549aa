//! Interactive question loop over an indexed document.

use std::io::{BufRead, Write};

use ctxret_core::traits::{LexicalIndex, VectorIndex};
use ctxret_core::types::ChunkStore;
use ctxret_hybrid::HybridRetriever;

use crate::output::{format_human, format_stats};

const RULE: &str = "======================================================================";

#[derive(Debug, PartialEq, Eq)]
pub enum Command<'a> {
    Quit,
    Help,
    Stats,
    Empty,
    Query(&'a str),
}

impl<'a> Command<'a> {
    pub fn parse(line: &'a str) -> Self {
        let line = line.trim();
        match line.to_lowercase().as_str() {
            "" => Command::Empty,
            "quit" | "exit" | "q" => Command::Quit,
            "help" => Command::Help,
            "stats" => Command::Stats,
            _ => Command::Query(line),
        }
    }
}

pub struct SessionOptions {
    pub top_k: usize,
    pub use_contextual: bool,
    pub full_text: bool,
}

fn read_line<R: BufRead>(input: &mut R) -> std::io::Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line))
}

pub async fn run<L, V, R, W>(
    retriever: &HybridRetriever<L, V>,
    store: &ChunkStore,
    opts: &SessionOptions,
    mut input: R,
    out: &mut W,
) -> anyhow::Result<()>
where
    L: LexicalIndex + 'static,
    V: VectorIndex,
    R: BufRead,
    W: Write,
{
    writeln!(out, "\n{RULE}\n💡 INTERACTIVE SESSION STARTED\n{RULE}")?;
    writeln!(out, "Ask questions about your document!\nCommands:")?;
    writeln!(out, "  - Type your question and press Enter")?;
    writeln!(out, "  - 'quit' or 'exit' to end session")?;
    writeln!(out, "  - 'help' for more options\n{RULE}\n")?;

    loop {
        write!(out, "🔍 Your question: ")?;
        out.flush()?;
        let Some(line) = read_line(&mut input)? else {
            writeln!(out, "\n\n👋 Session ended. Goodbye!")?;
            return Ok(());
        };
        match Command::parse(&line) {
            Command::Empty => continue,
            Command::Quit => {
                writeln!(out, "\n👋 Goodbye! Thanks for using Contextual Retrieval System.")?;
                return Ok(());
            }
            Command::Help => {
                writeln!(out, "\n📖 Available commands:")?;
                writeln!(out, "  - Ask any question about the document")?;
                writeln!(out, "  - 'stats' - Show document statistics")?;
                writeln!(out, "  - 'quit' or 'exit' - End session\n")?;
            }
            Command::Stats => writeln!(out, "{}", format_stats(store))?,
            Command::Query(query) => {
                writeln!(out, "\n🔎 Searching...")?;
                let results = match retriever.retrieve_with_space(query, opts.top_k, opts.use_contextual).await {
                    Ok(results) => results,
                    Err(e) => {
                        tracing::warn!(error = %e, "retrieval failed");
                        writeln!(out, "\n❌ Error: {}\nPlease try again.\n", e)?;
                        continue;
                    }
                };
                write!(out, "{}", format_human(&results, opts.full_text))?;
                if !opts.full_text && !results.is_empty() {
                    write!(out, "📄 See full text of results? (y/n): ")?;
                    out.flush()?;
                    if let Some(answer) = read_line(&mut input)? {
                        if answer.trim().eq_ignore_ascii_case("y") {
                            write!(out, "{}", format_human(&results, true))?;
                        }
                    }
                }
                writeln!(out)?;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Arc;

    use ctxret_core::error::{Error, Result, Subsystem};
    use ctxret_core::traits::Embedder;
    use ctxret_core::types::{Candidate, ChunkRecord, VectorSpace};
    use ctxret_hybrid::RetrieverConfig;

    const TAIL: &str = "END-OF-CHUNK";

    fn candidate() -> Candidate {
        Candidate {
            chunk_id: 1,
            text: format!("{}{}", "harvest ".repeat(40), TAIL),
            context: "Chapter on the autumn harvest.".to_string(),
            score: 1.0,
        }
    }

    struct StubEmbedder;

    impl Embedder for StubEmbedder {
        fn dim(&self) -> usize { 4 }
        fn max_len(&self) -> usize { 16 }
        fn embed(&self, _text: &str) -> Result<Vec<f32>> { Ok(vec![0.5; 4]) }
    }

    /// Fails for the query "broken".
    struct StubLexical;

    impl LexicalIndex for StubLexical {
        fn add_documents(&self, _chunks: &[ChunkRecord]) -> Result<()> { Ok(()) }
        fn search(&self, query: &str, _k: usize) -> Result<Vec<Candidate>> {
            if query == "broken" {
                return Err(Error::search(Subsystem::Lexical, std::io::Error::other("index offline")));
            }
            Ok(vec![candidate()])
        }
    }

    struct StubVector;

    #[async_trait]
    impl VectorIndex for StubVector {
        fn dim(&self) -> usize { 4 }
        async fn add_chunks(&self, _chunks: &[ChunkRecord]) -> Result<()> { Ok(()) }
        async fn search(&self, _q: &[f32], _k: usize, _space: VectorSpace) -> Result<Vec<Candidate>> {
            Ok(vec![candidate()])
        }
    }

    async fn drive(script: &str, full_text: bool) -> String {
        let retriever = HybridRetriever::new(
            Arc::new(StubLexical),
            Arc::new(StubVector),
            Arc::new(StubEmbedder),
            RetrieverConfig::default(),
        )
        .expect("retriever");
        let store = ChunkStore::new(vec![ChunkRecord::new(1, "abcd", 0, 1)]);
        let opts = SessionOptions { top_k: 3, use_contextual: true, full_text };
        let mut out = Vec::new();
        run(&retriever, &store, &opts, script.as_bytes(), &mut out).await.expect("session");
        String::from_utf8(out).expect("utf8")
    }

    #[tokio::test]
    async fn session_runs_commands_and_queries() {
        let out = drive("help\nstats\nwhat was harvested?\ny\nquit\n", false).await;
        assert!(out.contains("INTERACTIVE SESSION STARTED"));
        assert!(out.contains("Available commands"));
        assert!(out.contains("Total chunks: 1"));
        assert!(out.contains("Result #1"));
        assert!(out.contains("Combined Score: 1.0000"));
        assert!(out.contains("Chapter on the autumn harvest."));
        assert!(out.contains("See full text of results? (y/n)"));
        assert_eq!(out.matches(TAIL).count(), 1, "only the full-text render shows the tail");
        assert!(out.contains("Goodbye! Thanks for using Contextual Retrieval System."));
    }

    #[tokio::test]
    async fn declining_full_text_keeps_the_preview() {
        let out = drive("what was harvested?\nn\nq\n", false).await;
        assert!(out.contains("Result #1"));
        assert!(!out.contains(TAIL));
        assert!(out.contains("Goodbye!"));
    }

    #[tokio::test]
    async fn full_text_option_skips_the_prompt() {
        let out = drive("what was harvested?\nexit\n", true).await;
        assert_eq!(out.matches(TAIL).count(), 1);
        assert!(!out.contains("(y/n)"));
    }

    #[tokio::test]
    async fn end_of_input_ends_the_session() {
        assert!(drive("", false).await.contains("Session ended. Goodbye!"));
        let out = drive("stats\n\n", false).await;
        assert!(out.contains("Total chunks: 1"));
        assert!(out.contains("Session ended. Goodbye!"));
    }

    #[tokio::test]
    async fn retrieval_errors_do_not_end_the_session() {
        let out = drive("broken\nwhat was harvested?\nn\nquit\n", false).await;
        assert!(out.contains("❌ Error: lexical search failed: index offline"));
        assert!(out.contains("Result #1"));
        assert!(out.contains("Goodbye! Thanks"));
    }

    #[test]
    fn commands_are_case_insensitive() {
        assert_eq!(Command::parse("  QUIT \n"), Command::Quit);
        assert_eq!(Command::parse("exit"), Command::Quit);
        assert_eq!(Command::parse("q"), Command::Quit);
        assert_eq!(Command::parse("Help"), Command::Help);
        assert_eq!(Command::parse("stats"), Command::Stats);
        assert_eq!(Command::parse("   \n"), Command::Empty);
    }

    #[test]
    fn anything_else_is_a_query() {
        assert_eq!(Command::parse(" What grew in Q2?\n"), Command::Query("What grew in Q2?"));
        assert_eq!(Command::parse("quit smoking tips"), Command::Query("quit smoking tips"));
    }
}
