//! The relational-store collaborator (§4.4, §6): one `cells` table keyed on
//! `(row_num, col_name)`, read as an ordered full-table scan and written
//! through an idempotent upsert.

mod error;

pub use error::StoreError;

use async_trait::async_trait;
use cellsync_types::{CellAddress, CellValue, Origin, StoredCell};
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use tracing::debug;

/// The capability surface the reconciler needs from the relational store.
/// `PgStore` is the real adapter; `cellsync-testkit::FakeStore` implements
/// the same trait over an in-memory map for deterministic tests.
#[async_trait]
pub trait Store: Send + Sync {
    async fn read_all(&self) -> Result<Vec<StoredCell>, StoreError>;
    async fn upsert(&self, address: CellAddress, value: &CellValue, origin: Origin) -> Result<(), StoreError>;
    async fn delete(&self, address: CellAddress) -> Result<(), StoreError>;
    /// Rewrites the origin of `address` to `remote`, but only if its current
    /// origin is not already `remote` — used after an outbound push so a
    /// concurrent remote-originated write is never clobbered.
    async fn update_origin_if_not_remote(&self, address: CellAddress) -> Result<(), StoreError>;
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Postgres-backed [`Store`], built on a bounded [`PgPool`] (default 10
/// connections, wait-don't-fail per §5's shared-resource policy).
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(dsn: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(dsn)
            .await
            .map_err(StoreError::from)?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Other(anyhow::anyhow!(e)))?;
        Ok(())
    }
}

fn row_to_stored_cell(row: sqlx::postgres::PgRow) -> Result<StoredCell, StoreError> {
    let row_num: i32 = row.try_get("row_num").map_err(StoreError::from)?;
    let col_name: String = row.try_get("col_name").map_err(StoreError::from)?;
    let value: String = row.try_get("cell_value").map_err(StoreError::from)?;
    let origin: String = row.try_get("origin").map_err(StoreError::from)?;
    let updated_at: DateTime<Utc> = row.try_get("updated_at").map_err(StoreError::from)?;

    let address = CellAddress::new(row_num as u32, &col_name)
        .map_err(|e| StoreError::Data(format!("malformed address in store row: {e}")))?;
    let value = CellValue::new(value).map_err(|e| StoreError::Data(format!("malformed cell value in store row: {e}")))?;
    let origin: Origin = origin
        .parse()
        .map_err(|e| StoreError::Data(format!("malformed origin in store row: {e}")))?;

    Ok(StoredCell {
        address,
        value,
        origin,
        updated_at,
    })
}

#[async_trait]
impl Store for PgStore {
    async fn read_all(&self) -> Result<Vec<StoredCell>, StoreError> {
        let rows = sqlx::query(
            r#"
            select row_num, col_name, cell_value, origin, updated_at
            from cells
            order by row_num, col_name
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::from)?;

        debug!(count = rows.len(), "read_all returned rows");
        rows.into_iter().map(row_to_stored_cell).collect()
    }

    async fn upsert(&self, address: CellAddress, value: &CellValue, origin: Origin) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            insert into cells (row_num, col_name, cell_value, origin, updated_at)
            values ($1, $2, $3, $4, now())
            on conflict (row_num, col_name)
            do update set cell_value = excluded.cell_value, origin = excluded.origin, updated_at = now()
            "#,
        )
        .bind(address.row() as i32)
        .bind(address.column_letter())
        .bind(value.as_str())
        .bind(origin.to_string())
        .execute(&self.pool)
        .await
        .map_err(StoreError::from)?;
        Ok(())
    }

    async fn delete(&self, address: CellAddress) -> Result<(), StoreError> {
        sqlx::query("delete from cells where row_num = $1 and col_name = $2")
            .bind(address.row() as i32)
            .bind(address.column_letter())
            .execute(&self.pool)
            .await
            .map_err(StoreError::from)?;
        Ok(())
    }

    async fn update_origin_if_not_remote(&self, address: CellAddress) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            update cells
            set origin = $3, updated_at = now()
            where row_num = $1 and col_name = $2 and origin <> $3
            "#,
        )
        .bind(address.row() as i32)
        .bind(address.column_letter())
        .bind(Origin::Remote.to_string())
        .execute(&self.pool)
        .await
        .map_err(StoreError::from)?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("select 1").fetch_one(&self.pool).await.map_err(StoreError::from)?;
        Ok(())
    }
}
