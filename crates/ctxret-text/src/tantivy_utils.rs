use tantivy::schema::{Field, IndexRecordOption, Schema, TextFieldIndexing, TextOptions, FAST, INDEXED, STORED};
use tantivy::tokenizer::{LowerCaser, SimpleTokenizer, StopWordFilter, TextAnalyzer};
use tantivy::Index;

pub const TOKENIZER_NAME: &str = "text_with_stopwords";

#[derive(Debug, Clone, Copy)]
pub struct ChunkFields {
	pub chunk_id: Field,
	pub text: Field,
	pub context: Field,
	/// Context and text joined; the only tokenized field.
	pub body: Field,
}

pub fn build_schema() -> (Schema, ChunkFields) {
	let mut schema_builder = Schema::builder();
	let chunk_id = schema_builder.add_u64_field("chunk_id", INDEXED | STORED | FAST);
	let text = schema_builder.add_text_field("text", STORED);
	let context = schema_builder.add_text_field("context", STORED);
	let body_indexing = TextFieldIndexing::default().set_tokenizer(TOKENIZER_NAME).set_index_option(IndexRecordOption::WithFreqsAndPositions);
	let body = schema_builder.add_text_field("body", TextOptions::default().set_indexing_options(body_indexing));
	(schema_builder.build(), ChunkFields { chunk_id, text, context, body })
}

pub fn register_tokenizer(index: &Index) {
	let stop_words = vec![
		"a","an","and","are","as","at","be","by","for","from","has","he","in","is","it","its","of","on","that","the","to","was","will","with","or","but","not","this","these","they","them","their","there","then","than","so","if","when","where","why","how","what","which","who","whom","whose","can","could","should","would","may","might","must","shall","do","does","did","have","had","having",
	];
	let tokenizer = TextAnalyzer::builder(SimpleTokenizer::default())
		.filter(LowerCaser)
		.filter(StopWordFilter::remove(stop_words.into_iter().map(|s| s.to_string())))
		.build();
	index.tokenizers().register(TOKENIZER_NAME, tokenizer);
}
