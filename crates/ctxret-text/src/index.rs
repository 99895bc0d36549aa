use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use tantivy::collector::TopDocs;
use tantivy::query::{BooleanQuery, Occur, Query, TermQuery};
use tantivy::schema::{IndexRecordOption, Value};
use tantivy::{doc, Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};
use tracing::{debug, info};

use ctxret_core::error::{Error, Result, Subsystem};
use ctxret_core::traits::LexicalIndex;
use ctxret_core::types::{Candidate, ChunkRecord};

use crate::tantivy_utils::{build_schema, register_tokenizer, ChunkFields};

const WRITER_MEMORY_BUDGET: usize = 50_000_000;

fn lexical_err<E: Into<anyhow::Error>>(err: E) -> Error {
	Error::search(Subsystem::Lexical, err)
}

pub struct TantivyLexicalIndex {
	index: Index,
	reader: IndexReader,
	fields: ChunkFields,
	populated: AtomicBool,
}

impl TantivyLexicalIndex {
	pub fn create_in_ram() -> Result<Self> {
		let (schema, fields) = build_schema();
		Self::from_index(Index::create_in_ram(schema), fields)
	}

	/// Create an on-disk index, wiping whatever `index_dir` held before.
	pub fn create_in_dir(index_dir: &Path) -> Result<Self> {
		let (schema, fields) = build_schema();
		if index_dir.exists() { std::fs::remove_dir_all(index_dir)?; }
		std::fs::create_dir_all(index_dir)?;
		let index = Index::create_in_dir(index_dir, schema).map_err(lexical_err)?;
		info!(dir = %index_dir.display(), "created lexical index");
		Self::from_index(index, fields)
	}

	fn from_index(index: Index, fields: ChunkFields) -> Result<Self> {
		register_tokenizer(&index);
		let reader: IndexReader = index.reader_builder().reload_policy(ReloadPolicy::Manual).try_into().map_err(lexical_err)?;
		Ok(Self { index, reader, fields, populated: AtomicBool::new(false) })
	}

	pub fn num_docs(&self) -> u64 { self.reader.searcher().num_docs() }

	/// Run `query` through the indexing analyzer and OR the resulting terms.
	fn build_query(&self, query: &str) -> Result<Option<BooleanQuery>> {
		let mut analyzer = self.index.tokenizer_for_field(self.fields.body).map_err(lexical_err)?;
		let mut terms: Vec<Term> = Vec::new();
		let mut stream = analyzer.token_stream(query);
		stream.process(&mut |token| terms.push(Term::from_field_text(self.fields.body, &token.text)));
		terms.sort();
		terms.dedup();
		if terms.is_empty() {
			return Ok(None);
		}
		let clauses: Vec<(Occur, Box<dyn Query>)> = terms
			.into_iter()
			.map(|t| (Occur::Should, Box::new(TermQuery::new(t, IndexRecordOption::WithFreqs)) as Box<dyn Query>))
			.collect();
		Ok(Some(BooleanQuery::new(clauses)))
	}
}

impl LexicalIndex for TantivyLexicalIndex {
	fn add_documents(&self, chunks: &[ChunkRecord]) -> Result<()> {
		let mut writer: IndexWriter = self.index.writer(WRITER_MEMORY_BUDGET).map_err(lexical_err)?;
		writer.delete_all_documents().map_err(lexical_err)?;
		for c in chunks {
			let doc = doc!(
				self.fields.chunk_id => c.chunk_id,
				self.fields.text => c.text.clone(),
				self.fields.context => c.context()?.to_string(),
				self.fields.body => c.contextualized_text()?,
			);
			writer.add_document(doc).map_err(lexical_err)?;
		}
		writer.commit().map_err(lexical_err)?;
		self.reader.reload().map_err(lexical_err)?;
		self.populated.store(true, Ordering::Release);
		info!(chunks = chunks.len(), "indexed chunks for lexical search");
		Ok(())
	}

	fn search(&self, query: &str, k: usize) -> Result<Vec<Candidate>> {
		if !self.populated.load(Ordering::Acquire) {
			return Err(Error::UninitializedIndex(Subsystem::Lexical));
		}
		if k == 0 {
			return Ok(Vec::new());
		}
		let Some(q) = self.build_query(query)? else {
			debug!(query, "query has no indexable terms");
			return Ok(Vec::new());
		};

		let searcher = self.reader.searcher();
		// TopDocs overflows on limits near usize::MAX.
		let limit = usize::try_from(searcher.num_docs()).map_or(k, |n| k.min(n));
		if limit == 0 {
			return Ok(Vec::new());
		}
		let top_docs = searcher.search(&q, &TopDocs::with_limit(limit)).map_err(lexical_err)?;
		let mut hits = Vec::with_capacity(top_docs.len());
		for (score, addr) in top_docs {
			if score <= 0.0 {
				continue;
			}
			let doc: TantivyDocument = searcher.doc(addr).map_err(lexical_err)?;
			let chunk_id = doc
				.get_first(self.fields.chunk_id)
				.and_then(|v| v.as_u64())
				.ok_or_else(|| lexical_err(anyhow::anyhow!("stored document is missing chunk_id")))?;
			let text = doc.get_first(self.fields.text).and_then(|v| v.as_str()).unwrap_or("").to_string();
			let context = doc.get_first(self.fields.context).and_then(|v| v.as_str()).unwrap_or("").to_string();
			hits.push(Candidate { chunk_id, text, context, score });
		}
		debug!(query, hits = hits.len(), "lexical search");
		Ok(hits)
	}
}
