use std::future::Future;
use std::path::Path;
use sqlx::{Executor, Pool, QueryBuilder, Row, Sqlite, sqlite::SqlitePoolOptions};
use tokio::runtime::{Builder, Runtime};
use tracing::{debug, info};
use crate::core::config::{JoinEdgeConfig, RelationConfig};
use crate::core::error::{Error, Result};
use crate::core::types::{TupleId, TupleRow};
use crate::relation::descriptor::RelationDescriptor;
use crate::relation::store::{validate_identifier, RelationStore};

/// Rows per multi-row insert, one bind each, below SQLite's 999 bind limit.
const INSERT_CHUNK: usize = 500;

/// SQLite-backed store.
///
/// The growth loop is synchronous, so the store owns a small tokio runtime and
/// drives every sqlx call to completion on it.
pub struct SqliteStore {
    runtime: Runtime,
    db: Pool<Sqlite>,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("relcache-sqlite")
            .enable_all()
            .build()?;

        let db_url = format!("sqlite:{}?mode=rwc", path.to_string_lossy());
        let db = runtime.block_on(async {
            let db = SqlitePoolOptions::new()
                .max_connections(1)
                .connect(&db_url)
                .await?;

            sqlx::query("PRAGMA journal_mode=WAL").execute(&db).await?;
            sqlx::query("PRAGMA busy_timeout=10000").execute(&db).await?;
            sqlx::query("PRAGMA synchronous=NORMAL").execute(&db).await?;
            Ok::<_, sqlx::Error>(db)
        })
        .map_err(|e| Error::database(format!("cannot open {}: {}", path.display(), e)))?;

        info!("Relation database opened: {:?} (WAL mode)", path);
        Ok(SqliteStore { runtime, db })
    }

    fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    /// Run raw SQL statements, e.g. to load a fixture.
    pub fn execute_script(&self, sql: &str) -> Result<()> {
        self.block_on(async {
            self.db.execute(sql).await?;
            Ok(())
        })
    }

    pub fn close(self) {
        let SqliteStore { runtime, db } = self;
        runtime.block_on(db.close());
    }
}

impl RelationStore for SqliteStore {
    fn relation_totals(&self, relation: &RelationConfig) -> Result<(u64, f64)> {
        let sql = format!(
            "SELECT COUNT(*) AS cnt, TOTAL({}) AS mass FROM {}",
            validate_identifier(&relation.popularity_column)?,
            validate_identifier(&relation.name)?,
        );
        let row = self
            .block_on(sqlx::query(&sql).fetch_one(&self.db))
            .map_err(|e| Error::from(e).with_context(format!("counting {}", relation.name)))?;

        let count: i64 = row.try_get("cnt")?;
        let mass: f64 = row.try_get("mass")?;
        Ok((count.max(0) as u64, mass))
    }

    fn fetch_page(&self, descriptor: &RelationDescriptor, offset: u64, limit: usize) -> Result<Vec<TupleRow>> {
        let id = validate_identifier(&descriptor.id_column)?;
        let popularity = validate_identifier(&descriptor.popularity_column)?;
        let mut columns = vec![format!("CAST({} AS INTEGER)", id)];
        for attribute in &descriptor.text_attributes {
            columns.push(format!("CAST({} AS TEXT)", validate_identifier(attribute)?));
        }
        columns.push(format!("CAST({} AS REAL)", popularity));

        let sql = format!(
            "SELECT {} FROM {} ORDER BY {} DESC, {} ASC LIMIT ? OFFSET ?",
            columns.join(", "),
            validate_identifier(&descriptor.name)?,
            popularity,
            id,
        );
        let rows = self
            .block_on(
                sqlx::query(&sql)
                    .bind(limit as i64)
                    .bind(offset as i64)
                    .fetch_all(&self.db),
            )
            .map_err(|e| Error::from(e).with_context(format!("paging {} at offset {}", descriptor.name, offset)))?;

        let attributes = descriptor.text_attributes.len();
        let mut page = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut text_values = Vec::with_capacity(attributes);
            for column in 1..=attributes {
                text_values.push(row.try_get::<Option<String>, _>(column)?);
            }
            page.push(TupleRow {
                id: TupleId(row.try_get::<i64, _>(0)?),
                text_values,
                popularity: row.try_get::<Option<f64>, _>(attributes + 1)?.unwrap_or(0.0),
            });
        }
        debug!("Fetched {} rows from {} at offset {}", page.len(), descriptor.name, offset);
        Ok(page)
    }

    fn create_cache_table(&self, table: &str) -> Result<()> {
        let table = validate_identifier(table)?;
        self.block_on(async {
            sqlx::query(&format!("DROP TABLE IF EXISTS {}", table))
                .execute(&self.db)
                .await?;
            sqlx::query(&format!("CREATE TABLE {} (id INTEGER NOT NULL)", table))
                .execute(&self.db)
                .await?;
            sqlx::query(&format!("CREATE INDEX idx_{}_id ON {}(id)", table, table))
                .execute(&self.db)
                .await?;
            Ok::<_, sqlx::Error>(())
        })
        .map_err(|e| Error::from(e).with_context(format!("creating cache table {}", table)))
    }

    fn insert_cache_ids(&self, table: &str, ids: &[TupleId]) -> Result<()> {
        let prefix = format!("INSERT INTO {} (id) ", validate_identifier(table)?);
        self.block_on(async {
            let mut tx = self.db.begin().await?;
            for chunk in ids.chunks(INSERT_CHUNK) {
                let mut builder = QueryBuilder::<Sqlite>::new(&prefix);
                builder.push_values(chunk, |mut row, id| {
                    row.push_bind(id.value());
                });
                builder.build().execute(&mut *tx).await?;
            }
            tx.commit().await?;
            Ok::<_, sqlx::Error>(())
        })
        .map_err(|e| Error::from(e).with_context(format!("inserting {} ids into {}", ids.len(), table)))
    }

    fn count_cache_rows(&self, table: &str) -> Result<u64> {
        let sql = format!("SELECT COUNT(*) FROM {}", validate_identifier(table)?);
        let (count,): (i64,) = self.block_on(sqlx::query_as(&sql).fetch_one(&self.db))?;
        Ok(count.max(0) as u64)
    }

    fn load_join_pairs(&self, edge: &JoinEdgeConfig) -> Result<Vec<(TupleId, TupleId)>> {
        let sql = format!(
            "SELECT CAST({} AS INTEGER), CAST({} AS INTEGER) FROM {}",
            validate_identifier(&edge.left_column)?,
            validate_identifier(&edge.right_column)?,
            validate_identifier(&edge.table)?,
        );
        let pairs: Vec<(i64, i64)> = self
            .block_on(sqlx::query_as(&sql).fetch_all(&self.db))
            .map_err(|e| Error::from(e).with_context(format!("loading join table {}", edge.table)))?;

        info!("Loaded {} join pairs from {}", pairs.len(), edge.table);
        Ok(pairs.into_iter().map(|(l, r)| (TupleId(l), TupleId(r))).collect())
    }
}
