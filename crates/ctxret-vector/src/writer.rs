use arrow_array::types::Float32Type;
use arrow_array::{FixedSizeListArray, Int64Array, RecordBatch, RecordBatchIterator, StringArray};
use lancedb::{connect, Connection};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use ctxret_core::error::{Error, Result, Subsystem};
use ctxret_core::types::ChunkRecord;

use crate::schema::build_arrow_schema;

const BATCH_SIZE: usize = 1000;

pub(crate) fn vector_err<E: Into<anyhow::Error>>(err: E) -> Error {
	Error::search(Subsystem::Vector, err)
}

/// LanceDB table holding `embedding` and `contextual_embedding` per chunk.
pub struct LanceVectorIndex {
	pub(crate) db: Connection,
	pub(crate) table_name: String,
	pub(crate) dim: usize,
}

impl LanceVectorIndex {
	/// Start from an empty database at `db_path`, removing anything stored there.
	pub async fn create(db_path: &Path, table_name: &str, dim: usize) -> Result<Self> {
		check_dim(dim)?;
		if db_path.exists() { std::fs::remove_dir_all(db_path)?; }
		std::fs::create_dir_all(db_path)?;
		info!(db = %db_path.display(), table = table_name, dim, "created vector store");
		Self::open(db_path, table_name, dim).await
	}

	/// Connect to an existing database without touching its contents.
	pub async fn open(db_path: &Path, table_name: &str, dim: usize) -> Result<Self> {
		check_dim(dim)?;
		let db = connect(db_path.to_string_lossy().as_ref()).execute().await.map_err(vector_err)?;
		Ok(Self { db, table_name: table_name.to_string(), dim })
	}

	pub(crate) async fn table_exists(&self) -> Result<bool> {
		Ok(self.db.table_names().execute().await.map_err(vector_err)?.contains(&self.table_name))
	}

	pub(crate) async fn write_chunks(&self, chunks: &[ChunkRecord]) -> Result<()> {
		if chunks.is_empty() { debug!("no chunks to store"); return Ok(()); }
		for c in chunks {
			self.check_len(c.embedding()?)?;
			self.check_len(c.contextual_embedding()?)?;
			c.context()?;
		}
		for batch in chunks.chunks(BATCH_SIZE) {
			self.insert_batch(batch).await?;
		}
		info!(chunks = chunks.len(), table = %self.table_name, "stored chunk vectors");
		Ok(())
	}

	pub(crate) fn check_len(&self, v: &[f32]) -> Result<()> {
		if v.len() != self.dim {
			return Err(Error::DimensionMismatch { expected: self.dim, actual: v.len() });
		}
		Ok(())
	}

	async fn insert_batch(&self, chunks: &[ChunkRecord]) -> Result<()> {
		let record_batch = self.chunks_to_record_batch(chunks)?; let schema = record_batch.schema();
		let reader = Box::new(RecordBatchIterator::new(vec![Ok(record_batch)].into_iter(), schema));
		if self.table_exists().await? {
			self.db.open_table(&self.table_name).execute().await.map_err(vector_err)?.add(reader).execute().await.map_err(vector_err)?;
		} else {
			self.db.create_table(&self.table_name, reader).execute().await.map_err(vector_err)?;
		}
		Ok(())
	}

	fn chunks_to_record_batch(&self, chunks: &[ChunkRecord]) -> Result<RecordBatch> {
		let dim = i32::try_from(self.dim).map_err(|_| Error::InvalidConfig(format!("dimension {} is too large", self.dim)))?;
		let mut ids = Vec::with_capacity(chunks.len());
		let mut texts = Vec::with_capacity(chunks.len());
		let mut contexts = Vec::with_capacity(chunks.len());
		let mut raw: Vec<Option<Vec<Option<f32>>>> = Vec::with_capacity(chunks.len());
		let mut contextual: Vec<Option<Vec<Option<f32>>>> = Vec::with_capacity(chunks.len());
		for c in chunks {
			ids.push(i64::try_from(c.chunk_id).map_err(|_| Error::InvalidConfig(format!("chunk id {} out of range", c.chunk_id)))?);
			texts.push(c.text.clone());
			contexts.push(c.context()?.to_string());
			raw.push(Some(c.embedding()?.iter().map(|&x| Some(x)).collect()));
			contextual.push(Some(c.contextual_embedding()?.iter().map(|&x| Some(x)).collect()));
		}
		let record_batch = RecordBatch::try_new(build_arrow_schema(dim), vec![
			Arc::new(Int64Array::from(ids)),
			Arc::new(StringArray::from(texts)),
			Arc::new(StringArray::from(contexts)),
			Arc::new(FixedSizeListArray::from_iter_primitive::<Float32Type, _, _>(raw, dim)),
			Arc::new(FixedSizeListArray::from_iter_primitive::<Float32Type, _, _>(contextual, dim)),
		]).map_err(vector_err)?;
		Ok(record_batch)
	}
}

fn check_dim(dim: usize) -> Result<()> {
	if dim == 0 {
		return Err(Error::InvalidConfig("vector dimension must be positive".into()));
	}
	Ok(())
}
