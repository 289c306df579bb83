//! [`PgStore`]: the [`Store`] implementation backed by a bounded `sqlx` pool.

use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgSslMode};
use sqlx::Row as _;
use tracing::info;

use super::{NewRow, SqlValue, Store, StoreError, StoredSecret};
use crate::config::Config;
use crate::schema::{ColumnSpec, TableSpec};

/// PostgreSQL-backed store.
#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Build the connection pool from configuration.
    ///
    /// Connections are opened lazily, so a database that is down at startup
    /// surfaces as per-request unavailability rather than a boot failure.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection string or SSL mode cannot be parsed.
    pub fn connect_lazy(cfg: &Config) -> Result<Self> {
        let ssl_mode = PgSslMode::from_str(&cfg.db_ssl_mode)
            .with_context(|| format!("invalid DB_SSL_MODE: {}", cfg.db_ssl_mode))?;
        // Overrides any sslmode carried in the URL itself.
        let options = PgConnectOptions::from_str(&cfg.database_url)
            .context("DATABASE_URL is not a valid PostgreSQL connection string")?
            .ssl_mode(ssl_mode);

        let pool = PgPoolOptions::new()
            .max_connections(cfg.db_max_connections)
            .acquire_timeout(Duration::from_secs(cfg.db_acquire_timeout_secs))
            .idle_timeout(Some(Duration::from_secs(cfg.db_idle_timeout_secs)))
            .connect_lazy_with(options);

        info!(
            max_connections = cfg.db_max_connections,
            acquire_timeout_secs = cfg.db_acquire_timeout_secs,
            "database pool configured"
        );
        Ok(Self { pool })
    }

    /// Close all pooled connections.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl Store for PgStore {
    async fn create_table(&self, table: &TableSpec) -> Result<(), StoreError> {
        sqlx::query(&create_table_sql(table))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn add_column(&self, table: &str, column: &ColumnSpec) -> Result<(), StoreError> {
        sqlx::query(&add_column_sql(table, column))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn convert_column_to_text(&self, table: &str, column: &str) -> Result<(), StoreError> {
        sqlx::query(&convert_to_text_sql(table, column))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn insert(&self, table: &str, row: &NewRow) -> Result<i64, StoreError> {
        let sql = insert_sql(table, row);
        let mut query = sqlx::query(&sql);
        for (_, value) in row.values() {
            query = match value {
                SqlValue::Text(s) => query.bind(s.as_str()),
                SqlValue::Bytes(b) => query.bind(b.as_slice()),
            };
        }
        let inserted = query.fetch_one(&self.pool).await?;
        Ok(inserted.try_get::<i64, _>("id")?)
    }

    async fn fetch_secret(
        &self,
        table: &TableSpec,
        id: i64,
        include_iv: bool,
    ) -> Result<Option<StoredSecret>, StoreError> {
        let row = sqlx::query(&fetch_secret_sql(table, include_iv))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(r) => Ok(Some(StoredSecret {
                payload: r.try_get(0)?,
                iv: r.try_get(1)?,
            })),
            None => Ok(None),
        }
    }
}

// ---------------------------------------------------------------------------
// SQL rendering
// ---------------------------------------------------------------------------

fn quote(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

fn create_table_sql(table: &TableSpec) -> String {
    let columns: Vec<String> = table
        .columns
        .iter()
        .map(ColumnSpec::create_definition)
        .collect();
    format!(
        "create table if not exists {} ({})",
        quote(table.name),
        columns.join(", ")
    )
}

fn add_column_sql(table: &str, column: &ColumnSpec) -> String {
    format!(
        "alter table {} add column if not exists {}",
        quote(table),
        column.add_definition()
    )
}

fn convert_to_text_sql(table: &str, column: &str) -> String {
    let col = quote(column);
    format!(
        "alter table {} alter column {col} type text using encode({col}, 'base64')",
        quote(table)
    )
}

fn insert_sql(table: &str, row: &NewRow) -> String {
    let columns: Vec<String> = row.columns().map(quote).collect();
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("${i}")).collect();
    format!(
        "insert into {} ({}) values ({}) returning id",
        quote(table),
        columns.join(", "),
        placeholders.join(", ")
    )
}

fn fetch_secret_sql(table: &TableSpec, include_iv: bool) -> String {
    let iv = if include_iv {
        quote(table.iv_column)
    } else {
        "null::text".to_owned()
    };
    format!(
        "select {}, {iv} from {} where id = $1",
        quote(table.secret_column),
        quote(table.name)
    )
}
