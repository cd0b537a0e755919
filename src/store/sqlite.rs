//! SQLite-backed vector collection using the `sqlite-vec` extension.

use std::mem::transmute;
use std::os::raw::c_char;
use std::path::Path;
use std::sync::OnceLock;

use tokio_rusqlite::{Connection, OptionalExtension, ffi};
use tracing::{debug, info, warn};

use crate::chunking::Chunk;
use crate::types::{Metadata, VaultError};

use super::{CollectionStats, DistanceMetric, SearchHit, StoredPoint};

/// Status reported for a live collection.
const STATUS_READY: &str = "ready";

/// Manager for one named collection of embedded chunks.
///
/// The collection is created lazily on open (`Absent → Ready`) and its
/// dimension and metric are fixed from then on. [`clear`](Self::clear)
/// removes every point but leaves the collection observable as an empty,
/// ready collection with the same schema.
///
/// The underlying connection is the process's single long-lived storage
/// handle; it is closed on drop and can be released explicitly with
/// [`close`](Self::close).
#[derive(Clone)]
pub struct SqliteVectorStore {
    conn: Connection,
    collection: String,
    dimension: usize,
    metric: DistanceMetric,
}

impl SqliteVectorStore {
    /// Open (or create) the database at `path` and ensure `collection`
    /// exists with the given schema.
    pub async fn open(
        path: impl AsRef<Path>,
        collection: &str,
        dimension: usize,
        metric: DistanceMetric,
    ) -> Result<Self, VaultError> {
        register_sqlite_vec()?;
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let conn = Connection::open(path)
            .await
            .map_err(|err| VaultError::Storage(err.to_string()))?;
        Self::with_connection(conn, collection, dimension, metric).await
    }

    /// Open a private in-memory database; used by tests and throwaway runs.
    pub async fn open_in_memory(
        collection: &str,
        dimension: usize,
        metric: DistanceMetric,
    ) -> Result<Self, VaultError> {
        register_sqlite_vec()?;
        let conn = Connection::open_in_memory()
            .await
            .map_err(|err| VaultError::Storage(err.to_string()))?;
        Self::with_connection(conn, collection, dimension, metric).await
    }

    async fn with_connection(
        conn: Connection,
        collection: &str,
        dimension: usize,
        metric: DistanceMetric,
    ) -> Result<Self, VaultError> {
        if dimension == 0 {
            return Err(VaultError::Storage(
                "collection dimension must be positive".to_string(),
            ));
        }

        // Fail fast when the extension did not load.
        conn.call(|conn| {
            conn.query_row("select vec_version()", [], |row| row.get::<_, String>(0))
                .map_err(tokio_rusqlite::Error::Rusqlite)
        })
        .await
        .map_err(|err| VaultError::Storage(format!("sqlite-vec unavailable: {err}")))?;

        conn.call(|conn| {
            conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS collections (
                     name      TEXT PRIMARY KEY,
                     dimension TEXT NOT NULL,
                     metric    TEXT NOT NULL
                 );
                 CREATE TABLE IF NOT EXISTS points (
                     id         TEXT PRIMARY KEY,
                     collection TEXT NOT NULL,
                     payload    TEXT NOT NULL,
                     embedding  BLOB NOT NULL
                 );
                 CREATE INDEX IF NOT EXISTS points_by_collection ON points(collection);",
            )
            .map_err(tokio_rusqlite::Error::Rusqlite)
        })
        .await
        .map_err(|err| VaultError::Storage(err.to_string()))?;

        let store = Self {
            conn,
            collection: collection.to_string(),
            dimension,
            metric,
        };
        store.ensure_collection().await?;
        Ok(store)
    }

    /// Idempotently register the collection. An existing collection is left
    /// untouched; its recorded schema is not validated against the requested
    /// one, only logged when it differs so a later dimension failure is
    /// diagnosable.
    async fn ensure_collection(&self) -> Result<(), VaultError> {
        let name = self.collection.clone();
        let dimension = self.dimension.to_string();
        let metric = self.metric.as_str().to_string();

        let existing = self
            .conn
            .call(move |conn| {
                let created = conn
                    .execute(
                        "INSERT OR IGNORE INTO collections (name, dimension, metric)
                         VALUES (?1, ?2, ?3)",
                        [&name, &dimension, &metric],
                    )
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;
                let row = conn
                    .query_row(
                        "SELECT dimension, metric FROM collections WHERE name = ?1",
                        [&name],
                        |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
                    )
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;
                Ok((created > 0, row))
            })
            .await
            .map_err(|err| VaultError::Storage(err.to_string()))?;

        let (created, (stored_dimension, stored_metric)) = existing;
        if created {
            info!(
                collection = %self.collection,
                dimension = self.dimension,
                metric = %self.metric,
                "created collection"
            );
        } else if stored_dimension != self.dimension.to_string()
            || stored_metric != self.metric.as_str()
        {
            warn!(
                collection = %self.collection,
                requested_dimension = self.dimension,
                stored_dimension = %stored_dimension,
                requested_metric = %self.metric,
                stored_metric = %stored_metric,
                "existing collection schema differs from the requested one"
            );
        }
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.collection
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    /// Write embedded chunks as points in one transaction.
    ///
    /// Chunks missing required fields (text, embedding) are skipped with a
    /// warning. A present embedding whose length disagrees with the
    /// collection dimension fails the whole call before anything is written.
    /// Every written point receives a fresh UUID, so re-ingesting the same
    /// content produces duplicate points.
    ///
    /// Returns the number of points actually written.
    pub async fn upsert(&self, chunks: Vec<Chunk>) -> Result<usize, VaultError> {
        let mut points: Vec<StoredPoint> = Vec::with_capacity(chunks.len());
        for chunk in &chunks {
            let Some(embedding) = chunk.embedding.as_ref() else {
                warn!(
                    chunk_index = chunk.chunk_index,
                    "skipping chunk without an embedding"
                );
                continue;
            };
            if chunk.text.is_empty() {
                warn!(
                    chunk_index = chunk.chunk_index,
                    "skipping chunk without text"
                );
                continue;
            }
            if embedding.len() != self.dimension {
                return Err(VaultError::DimensionMismatch {
                    collection: self.collection.clone(),
                    expected: self.dimension,
                    actual: embedding.len(),
                });
            }
            points.push(StoredPoint::new(embedding.clone(), chunk.payload()));
        }

        if points.is_empty() {
            debug!(collection = %self.collection, "no valid chunks to write");
            return Ok(0);
        }

        let mut rows: Vec<(String, String, String)> = Vec::with_capacity(points.len());
        for point in points {
            let payload = serde_json::to_string(&point.payload)
                .map_err(|err| VaultError::Storage(err.to_string()))?;
            let vector_json = serde_json::to_string(&point.vector)
                .map_err(|err| VaultError::Storage(err.to_string()))?;
            rows.push((point.id, payload, vector_json));
        }

        let collection = self.collection.clone();
        let written = rows.len();
        self.conn
            .call(move |conn| {
                let tx = conn.transaction().map_err(tokio_rusqlite::Error::Rusqlite)?;
                for (id, payload, vector_json) in &rows {
                    tx.execute(
                        "INSERT INTO points (id, collection, payload, embedding)
                         VALUES (?1, ?2, ?3, vec_f32(?4))",
                        [id, &collection, payload, vector_json],
                    )
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;
                }
                tx.commit().map_err(tokio_rusqlite::Error::Rusqlite)?;
                Ok(())
            })
            .await
            .map_err(|err| VaultError::Storage(err.to_string()))?;

        info!(collection = %self.collection, written, "stored points");
        Ok(written)
    }

    /// Rank stored points against `query_vector`, highest score first.
    ///
    /// `limit` bounds the result count; `score_threshold` drops hits scoring
    /// below it. Searching an empty collection returns an empty vec.
    pub async fn search(
        &self,
        query_vector: &[f32],
        limit: usize,
        score_threshold: Option<f32>,
    ) -> Result<Vec<SearchHit>, VaultError> {
        if query_vector.len() != self.dimension {
            return Err(VaultError::DimensionMismatch {
                collection: self.collection.clone(),
                expected: self.dimension,
                actual: query_vector.len(),
            });
        }
        if limit == 0 {
            return Ok(Vec::new());
        }

        let mut hits = match self.metric {
            DistanceMetric::Cosine => {
                self.search_sql(
                    "1.0 - vec_distance_cosine(embedding, vec_f32(?2))",
                    query_vector,
                    limit,
                )
                .await?
            }
            DistanceMetric::Euclidean => {
                self.search_sql("-vec_distance_l2(embedding, vec_f32(?2))", query_vector, limit)
                    .await?
            }
            // sqlite-vec has no inner-product distance function; rank with
            // an exact scan instead.
            DistanceMetric::Dot => self.search_dot(query_vector, limit).await?,
        };

        if let Some(threshold) = score_threshold {
            hits.retain(|hit| hit.score >= threshold);
        }
        debug!(collection = %self.collection, hits = hits.len(), "search complete");
        Ok(hits)
    }

    async fn search_sql(
        &self,
        score_expr: &str,
        query_vector: &[f32],
        limit: usize,
    ) -> Result<Vec<SearchHit>, VaultError> {
        let sql = format!(
            "SELECT id, payload, {score_expr} AS score
             FROM points
             WHERE collection = ?1
             ORDER BY score DESC
             LIMIT {limit}"
        );
        let collection = self.collection.clone();
        let embedding_json = serde_json::to_string(query_vector)
            .map_err(|err| VaultError::Storage(err.to_string()))?;

        self.conn
            .call(move |conn| {
                let mut stmt = conn
                    .prepare(&sql)
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;
                let rows = stmt
                    .query_map([&collection, &embedding_json], |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, f64>(2)?,
                        ))
                    })
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;

                let mut hits = Vec::new();
                for row in rows {
                    let (id, payload, score) = row.map_err(tokio_rusqlite::Error::Rusqlite)?;
                    hits.push((id, payload, score as f32));
                }
                Ok(hits)
            })
            .await
            .map_err(|err| VaultError::Storage(err.to_string()))?
            .into_iter()
            .map(|(id, payload, score)| {
                Ok(SearchHit {
                    id,
                    score,
                    payload: decode_payload(&payload)?,
                })
            })
            .collect()
    }

    async fn search_dot(
        &self,
        query_vector: &[f32],
        limit: usize,
    ) -> Result<Vec<SearchHit>, VaultError> {
        let collection = self.collection.clone();
        let query = query_vector.to_vec();

        let mut scored = self
            .conn
            .call(move |conn| {
                let mut stmt = conn
                    .prepare("SELECT id, payload, embedding FROM points WHERE collection = ?1")
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;
                let rows = stmt
                    .query_map([&collection], |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, Vec<u8>>(2)?,
                        ))
                    })
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;

                let mut scored = Vec::new();
                for row in rows {
                    let (id, payload, blob) = row.map_err(tokio_rusqlite::Error::Rusqlite)?;
                    let vector = decode_vector(&blob);
                    let score: f32 = vector.iter().zip(&query).map(|(a, b)| a * b).sum();
                    scored.push((id, payload, score));
                }
                Ok(scored)
            })
            .await
            .map_err(|err| VaultError::Storage(err.to_string()))?;

        scored.sort_by(|a, b| b.2.total_cmp(&a.2));
        scored.truncate(limit);
        scored
            .into_iter()
            .map(|(id, payload, score)| {
                Ok(SearchHit {
                    id,
                    score,
                    payload: decode_payload(&payload)?,
                })
            })
            .collect()
    }

    /// Read-only collection snapshot. Never mutates collection state.
    pub async fn stats(&self) -> Result<CollectionStats, VaultError> {
        let collection = self.collection.clone();
        let total = self
            .conn
            .call(move |conn| {
                conn.query_row(
                    "SELECT COUNT(*) FROM points WHERE collection = ?1",
                    [&collection],
                    |row| row.get::<_, i64>(0),
                )
                .map_err(tokio_rusqlite::Error::Rusqlite)
            })
            .await
            .map_err(|err| VaultError::Storage(err.to_string()))?;

        let total = usize::try_from(total).unwrap_or(0);
        Ok(CollectionStats {
            name: self.collection.clone(),
            total_points: total,
            // Every stored point is searchable; there is no async index lag.
            indexed_points: total,
            status: STATUS_READY.to_string(),
        })
    }

    /// Delete every point in the collection, then leave it as an empty
    /// `Ready` collection with the same dimension and metric.
    pub async fn clear(&self) -> Result<(), VaultError> {
        warn!(collection = %self.collection, "clearing collection");
        let collection = self.collection.clone();
        self.conn
            .call(move |conn| {
                conn.execute("DELETE FROM points WHERE collection = ?1", [&collection])
                    .map_err(tokio_rusqlite::Error::Rusqlite)
            })
            .await
            .map_err(|err| VaultError::Storage(err.to_string()))?;
        self.ensure_collection().await?;
        info!(collection = %self.collection, "collection cleared");
        Ok(())
    }

    /// Whether the collection is registered in the backing store.
    pub async fn exists(&self) -> Result<bool, VaultError> {
        let collection = self.collection.clone();
        self.conn
            .call(move |conn| {
                conn.query_row(
                    "SELECT 1 FROM collections WHERE name = ?1",
                    [&collection],
                    |_| Ok(()),
                )
                .optional()
                .map_err(tokio_rusqlite::Error::Rusqlite)
            })
            .await
            .map(|row| row.is_some())
            .map_err(|err| VaultError::Storage(err.to_string()))
    }

    /// Release the storage handle. Dropping the store has the same effect;
    /// this surfaces close errors instead of swallowing them.
    pub async fn close(self) -> Result<(), VaultError> {
        self.conn
            .close()
            .await
            .map_err(|err| VaultError::Storage(err.to_string()))
    }
}

fn decode_payload(raw: &str) -> Result<Metadata, VaultError> {
    serde_json::from_str(raw)
        .map_err(|err| VaultError::Storage(format!("malformed stored payload: {err}")))
}

/// `vec_f32` blobs are little-endian f32 arrays.
fn decode_vector(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|bytes| f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
        .collect()
}

/// Register sqlite-vec as an auto-loaded extension, exactly once per
/// process. The first outcome is cached; every later caller observes it.
fn register_sqlite_vec() -> Result<(), VaultError> {
    static REGISTRATION: OnceLock<Result<(), String>> = OnceLock::new();

    REGISTRATION
        .get_or_init(|| unsafe {
            type SqliteExtensionInit = unsafe extern "C" fn(
                *mut ffi::sqlite3,
                *mut *const c_char,
                *const ffi::sqlite3_api_routines,
            ) -> i32;

            // sqlite3_vec_init is declared without the extension-entry-point
            // signature sqlite expects, hence the transmute.
            let init: unsafe extern "C" fn() = sqlite_vec::sqlite3_vec_init;
            let init_fn: SqliteExtensionInit =
                transmute::<unsafe extern "C" fn(), SqliteExtensionInit>(init);
            let rc = ffi::sqlite3_auto_extension(Some(init_fn));
            if rc == 0 {
                Ok(())
            } else {
                Err(format!(
                    "failed to register sqlite-vec extension (code {rc})"
                ))
            }
        })
        .clone()
        .map_err(VaultError::Storage)
}
