use async_trait::async_trait;
use sqlx::{
    PgPool, Postgres, Row, Transaction,
    postgres::{PgPoolOptions, PgRow},
};
use uuid::Uuid;

use crate::{
    Document, DocumentQuery, Result, Revision, StoreError, WriteBatch, WriteOp,
    store::{DocumentStore, validate_batch},
};

/// PostgreSQL-backed document store implementation.
#[derive(Clone)]
pub struct PostgresDocumentStore {
    pool: PgPool,
}

impl PostgresDocumentStore {
    /// Creates a new PostgreSQL document store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects a pool of at most `max_connections` to `url`.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_document(row: PgRow) -> Result<Document> {
        Ok(Document {
            collection: row.try_get("collection")?,
            id: row.try_get::<Uuid, _>("id")?,
            revision: Revision::new(row.try_get("revision")?),
            body: row.try_get("body")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    async fn revision_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        collection: &str,
        id: Uuid,
    ) -> Result<Revision> {
        let revision: Option<i64> =
            sqlx::query_scalar("SELECT revision FROM documents WHERE collection = $1 AND id = $2")
                .bind(collection)
                .bind(id)
                .fetch_optional(&mut **tx)
                .await?;
        Ok(revision.map(Revision::new).unwrap_or(Revision::initial()))
    }

    /// Applies one op inside the transaction.
    ///
    /// Returns `Ok(None)` when the expected revision did not match.
    async fn apply(tx: &mut Transaction<'_, Postgres>, op: &WriteOp) -> Result<Option<Revision>> {
        let affected = match op {
            WriteOp::Put {
                collection,
                id,
                body,
                expected,
            } if *expected == Revision::initial() => {
                sqlx::query(
                    r#"
                    INSERT INTO documents (collection, id, revision, body)
                    VALUES ($1, $2, 1, $3)
                    ON CONFLICT (collection, id) DO NOTHING
                    "#,
                )
                .bind(collection)
                .bind(id)
                .bind(body)
                .execute(&mut **tx)
                .await?
                .rows_affected()
            }
            WriteOp::Put {
                collection,
                id,
                body,
                expected,
            } => {
                sqlx::query(
                    r#"
                    UPDATE documents
                    SET body = $3, revision = revision + 1, updated_at = now()
                    WHERE collection = $1 AND id = $2 AND revision = $4
                    "#,
                )
                .bind(collection)
                .bind(id)
                .bind(body)
                .bind(expected.as_i64())
                .execute(&mut **tx)
                .await?
                .rows_affected()
            }
            WriteOp::Delete {
                collection,
                id,
                expected,
            } => {
                sqlx::query(
                    "DELETE FROM documents WHERE collection = $1 AND id = $2 AND revision = $3",
                )
                .bind(collection)
                .bind(id)
                .bind(expected.as_i64())
                .execute(&mut **tx)
                .await?
                .rows_affected()
            }
        };

        if affected == 0 {
            return Ok(None);
        }

        Ok(Some(match op {
            WriteOp::Put { expected, .. } => expected.next(),
            WriteOp::Delete { .. } => Revision::initial(),
        }))
    }
}

#[async_trait]
impl DocumentStore for PostgresDocumentStore {
    async fn get(&self, collection: &str, id: Uuid) -> Result<Option<Document>> {
        let row: Option<PgRow> = sqlx::query(
            r#"
            SELECT collection, id, revision, body, created_at, updated_at
            FROM documents
            WHERE collection = $1 AND id = $2
            "#,
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_document).transpose()
    }

    async fn find(&self, query: DocumentQuery) -> Result<Vec<Document>> {
        let mut sql = String::from(
            "SELECT collection, id, revision, body, created_at, updated_at FROM documents WHERE collection = $1",
        );
        let mut param_count = 1;

        // Containment on the whole body so the GIN index applies to any field
        if query.field_eq.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND body @> ${param_count}"));
        }

        sql.push_str(" ORDER BY created_at ASC, seq ASC");

        if query.limit.is_some() {
            param_count += 1;
            sql.push_str(&format!(" LIMIT ${param_count}"));
        }

        let mut sqlx_query = sqlx::query(&sql).bind(&query.collection);

        if let Some((field, value)) = &query.field_eq {
            let mut filter = serde_json::Map::new();
            filter.insert(field.clone(), value.clone());
            sqlx_query = sqlx_query.bind(serde_json::Value::Object(filter));
        }
        if let Some(limit) = query.limit {
            sqlx_query = sqlx_query.bind(limit as i64);
        }

        let rows = sqlx_query.fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::row_to_document).collect()
    }

    async fn commit(&self, batch: WriteBatch) -> Result<Vec<Revision>> {
        validate_batch(&batch)?;

        let mut tx = self.pool.begin().await?;
        let mut revisions = Vec::with_capacity(batch.len());

        for op in batch.ops() {
            match Self::apply(&mut tx, op).await? {
                Some(revision) => revisions.push(revision),
                None => {
                    let actual = Self::revision_in_tx(&mut tx, op.collection(), op.id()).await?;
                    tx.rollback().await?;
                    metrics::counter!("store_conflicts_total").increment(1);
                    tracing::debug!(
                        collection = op.collection(),
                        id = %op.id(),
                        expected = %op.expected(),
                        %actual,
                        "write batch rejected"
                    );
                    return Err(StoreError::ConcurrencyConflict {
                        collection: op.collection().to_string(),
                        id: op.id(),
                        expected: op.expected(),
                        actual,
                    });
                }
            }
        }

        tx.commit().await?;
        Ok(revisions)
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents WHERE collection = $1")
            .bind(collection)
            .fetch_one(&self.pool)
            .await?;
        Ok(count as usize)
    }
}
