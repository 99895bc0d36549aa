use arrow_array::{Array, Float32Array, Int64Array, RecordBatch, StringArray};
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::DistanceType;
use tracing::debug;

use ctxret_core::error::{Error, Result, Subsystem};
use ctxret_core::traits::VectorIndex;
use ctxret_core::types::{Candidate, ChunkRecord, VectorSpace};

use crate::schema::{CHUNK_ID, CONTEXT, DISTANCE, TEXT};
use crate::writer::{vector_err, LanceVectorIndex};

fn column<'a, T: Array + 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T> {
	batch
		.column_by_name(name)
		.and_then(|c| c.as_any().downcast_ref::<T>())
		.ok_or_else(|| vector_err(anyhow::anyhow!("result column '{}' missing or mistyped", name)))
}

fn batch_to_candidates(batch: &RecordBatch, out: &mut Vec<Candidate>) -> Result<()> {
	let ids = column::<Int64Array>(batch, CHUNK_ID)?;
	let texts = column::<StringArray>(batch, TEXT)?;
	let contexts = column::<StringArray>(batch, CONTEXT)?;
	let distances = column::<Float32Array>(batch, DISTANCE)?;
	for i in 0..batch.num_rows() {
		let chunk_id = u64::try_from(ids.value(i)).map_err(vector_err)?;
		out.push(Candidate {
			chunk_id,
			text: texts.value(i).to_string(),
			context: contexts.value(i).to_string(),
			score: 1.0 - distances.value(i),
		});
	}
	Ok(())
}

impl LanceVectorIndex {
	pub async fn count_rows(&self) -> Result<usize> {
		if !self.table_exists().await? { return Ok(0); }
		let table = self.db.open_table(&self.table_name).execute().await.map_err(vector_err)?;
		table.count_rows(None).await.map_err(vector_err)
	}
}

#[async_trait]
impl VectorIndex for LanceVectorIndex {
	fn dim(&self) -> usize { self.dim }

	async fn add_chunks(&self, chunks: &[ChunkRecord]) -> Result<()> {
		self.write_chunks(chunks).await
	}

	async fn search(&self, query_vector: &[f32], k: usize, space: VectorSpace) -> Result<Vec<Candidate>> {
		if !self.table_exists().await? {
			return Err(Error::UninitializedIndex(Subsystem::Vector));
		}
		self.check_len(query_vector)?;
		if k == 0 { return Ok(Vec::new()); }

		let table = self.db.open_table(&self.table_name).execute().await.map_err(vector_err)?;
		let limit = k.min(table.count_rows(None).await.map_err(vector_err)?);
		if limit == 0 { return Ok(Vec::new()); }
		let mut results = table
			.vector_search(query_vector.to_vec())
			.map_err(vector_err)?
			.column(space.as_str())
			.distance_type(DistanceType::Cosine)
			.limit(limit)
			.execute()
			.await
			.map_err(vector_err)?;

		let mut hits = Vec::new();
		while let Some(batch) = results.try_next().await.map_err(vector_err)? {
			batch_to_candidates(&batch, &mut hits)?;
		}
		hits.sort_by(|a, b| b.score.total_cmp(&a.score));
		hits.truncate(k);
		debug!(space = space.as_str(), hits = hits.len(), "vector search");
		Ok(hits)
	}
}
