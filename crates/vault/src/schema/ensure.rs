//! [`SchemaEnsurer`]: brings a table up to its [`TableSpec`] before a write.

use tracing::{debug, instrument};

use super::table::{ColumnType, TableSpec};
use crate::store::{Store, StoreError};

/// Runs the create / add-columns / legacy-type migration sequence.
pub struct SchemaEnsurer<'s> {
    store: &'s dyn Store,
}

impl<'s> SchemaEnsurer<'s> {
    pub fn new(store: &'s dyn Store) -> Self {
        Self { store }
    }

    /// Ensure `table` has at least the columns in its spec.
    ///
    /// 1. Create the table if it does not exist.
    /// 2. Add any declared column that is missing.
    /// 3. Convert legacy binary columns to base64 text. Best-effort: a failure
    ///    here usually means the column is already text and is only logged.
    ///
    /// # Errors
    ///
    /// Returns the first [`StoreError`] from steps 1 or 2, except
    /// [`StoreErrorKind::AlreadyExists`](crate::store::StoreErrorKind::AlreadyExists):
    /// another connection ran the same DDL first.
    #[instrument(skip(self, table), fields(table = table.name))]
    pub async fn ensure(&self, table: &TableSpec) -> Result<(), StoreError> {
        tolerate_existing(self.store.create_table(table).await, table.name)?;

        for column in table.columns {
            // A primary key cannot be retrofitted onto an existing table.
            if column.ty == ColumnType::BigSerialKey {
                continue;
            }
            tolerate_existing(self.store.add_column(table.name, column).await, column.name)?;
        }

        for column in table.legacy_binary_columns {
            if let Err(e) = self.store.convert_column_to_text(table.name, column).await {
                debug!(column = %column, error = %e, "binary-to-text migration skipped");
            }
        }
        Ok(())
    }
}

fn tolerate_existing(result: Result<(), StoreError>, object: &str) -> Result<(), StoreError> {
    match result {
        Err(e) if e.is_already_exists() => {
            debug!(object, error = %e, "created concurrently");
            Ok(())
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use base64::{engine::general_purpose::STANDARD, Engine as _};

    use super::*;
    use crate::schema::{CREDENTIALS, FIEL_UPLOADS};
    use crate::store::memory::MemoryStore;
    use crate::store::{MockStore, SqlValue, StoreErrorKind};

    fn full_shape(spec: &TableSpec) -> Vec<(String, ColumnType, bool)> {
        spec.columns
            .iter()
            .map(|c| (c.name.to_owned(), c.ty, c.nullable))
            .collect()
    }

    #[tokio::test]
    async fn creates_missing_table() {
        let store = MemoryStore::new();
        SchemaEnsurer::new(&store).ensure(&CREDENTIALS).await.unwrap();
        assert_eq!(store.shape("sat_credentials").unwrap(), full_shape(&CREDENTIALS));
    }

    #[tokio::test]
    async fn repeated_ensure_leaves_same_shape() {
        let store = MemoryStore::new();
        let ensurer = SchemaEnsurer::new(&store);
        ensurer.ensure(&FIEL_UPLOADS).await.unwrap();
        let once = store.shape("fiel_uploads").unwrap();
        for _ in 0..5 {
            ensurer.ensure(&FIEL_UPLOADS).await.unwrap();
        }
        assert_eq!(store.shape("fiel_uploads").unwrap(), once);
    }

    #[tokio::test]
    async fn adds_iv_to_legacy_table() {
        let store = MemoryStore::new().with_table(
            "sat_credentials",
            &[
                ("id", ColumnType::BigSerialKey, false),
                ("rfc", ColumnType::Text, false),
                ("password_enc", ColumnType::Text, false),
                ("created_at", ColumnType::CreatedAt, false),
            ],
        );
        store.seed_row(
            "sat_credentials",
            &[
                ("rfc", SqlValue::Text("OLD010101AAA".into())),
                ("password_enc", SqlValue::Text("b2xk".into())),
            ],
        );

        SchemaEnsurer::new(&store).ensure(&CREDENTIALS).await.unwrap();

        let shape = store.shape("sat_credentials").unwrap();
        assert!(shape.contains(&("iv".to_owned(), ColumnType::Text, true)));
        assert_eq!(store.row_count("sat_credentials"), 1);
        assert_eq!(store.cell("sat_credentials", 0, "iv"), None);
    }

    #[tokio::test]
    async fn converts_binary_secret_column_in_place() {
        let store = MemoryStore::new().with_table(
            "sat_credentials",
            &[
                ("id", ColumnType::BigSerialKey, false),
                ("rfc", ColumnType::Text, false),
                ("password_enc", ColumnType::Bytes, false),
                ("created_at", ColumnType::CreatedAt, false),
            ],
        );
        store.seed_row(
            "sat_credentials",
            &[
                ("rfc", SqlValue::Text("OLD010101AAA".into())),
                ("password_enc", SqlValue::Bytes(vec![0xde, 0xad, 0xbe, 0xef])),
            ],
        );

        let ensurer = SchemaEnsurer::new(&store);
        ensurer.ensure(&CREDENTIALS).await.unwrap();
        // second pass hits the already-text column and must not fail or re-encode
        ensurer.ensure(&CREDENTIALS).await.unwrap();

        assert_eq!(
            store.cell("sat_credentials", 0, "password_enc"),
            Some(SqlValue::Text(STANDARD.encode([0xde, 0xad, 0xbe, 0xef])))
        );
        let shape = store.shape("sat_credentials").unwrap();
        assert!(shape.contains(&("password_enc".to_owned(), ColumnType::Text, false)));
    }

    #[tokio::test]
    async fn concurrent_ensures_converge() {
        let store = Arc::new(MemoryStore::new());
        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..8 {
            let store = Arc::clone(&store);
            tasks.spawn(async move {
                SchemaEnsurer::new(store.as_ref()).ensure(&CREDENTIALS).await
            });
        }
        while let Some(result) = tasks.join_next().await {
            result.unwrap().unwrap();
        }
        assert_eq!(store.shape("sat_credentials").unwrap(), full_shape(&CREDENTIALS));
    }

    #[tokio::test]
    async fn unreachable_store_fails_fast() {
        let store = MemoryStore::unreachable();
        let err = SchemaEnsurer::new(&store).ensure(&CREDENTIALS).await.unwrap_err();
        assert_eq!(err.kind, StoreErrorKind::ConnectionFailure);
    }

    #[tokio::test]
    async fn migration_failure_is_swallowed() {
        let mut store = MockStore::new();
        store.expect_create_table().times(1).returning(|_| Ok(()));
        store.expect_add_column().times(4).returning(|_, _| Ok(()));
        store
            .expect_convert_column_to_text()
            .withf(|table, column| table == "sat_credentials" && column == "password_enc")
            .times(1)
            .returning(|_, _| Err(StoreError::new(StoreErrorKind::Other, "already text")));

        SchemaEnsurer::new(&store).ensure(&CREDENTIALS).await.unwrap();
    }

    #[tokio::test]
    async fn add_column_failure_propagates() {
        let mut store = MockStore::new();
        store.expect_create_table().returning(|_| Ok(()));
        store
            .expect_add_column()
            .returning(|_, _| Err(StoreError::new(StoreErrorKind::Other, "must be owner")));
        store.expect_convert_column_to_text().never();

        let err = SchemaEnsurer::new(&store).ensure(&CREDENTIALS).await.unwrap_err();
        assert_eq!(err.kind, StoreErrorKind::Other);
    }

    #[tokio::test]
    async fn losing_a_create_race_is_not_an_error() {
        let mut store = MockStore::new();
        store.expect_create_table().times(1).returning(|_| {
            Err(StoreError::new(
                StoreErrorKind::AlreadyExists,
                r#"duplicate key value violates unique constraint "pg_type_typname_nsp_index""#,
            ))
        });
        store.expect_add_column().times(4).returning(|_, _| Ok(()));
        store.expect_convert_column_to_text().returning(|_, _| Ok(()));

        SchemaEnsurer::new(&store).ensure(&CREDENTIALS).await.unwrap();
    }

    #[tokio::test]
    async fn losing_an_add_column_race_is_not_an_error() {
        let mut store = MockStore::new();
        store.expect_create_table().returning(|_| Ok(()));
        store
            .expect_add_column()
            .withf(|_, column| column.name == "iv")
            .times(1)
            .returning(|_, _| {
                Err(StoreError::new(
                    StoreErrorKind::AlreadyExists,
                    r#"column "iv" of relation "fiel_uploads" already exists"#,
                ))
            });
        store.expect_add_column().returning(|_, _| Ok(()));

        SchemaEnsurer::new(&store).ensure(&FIEL_UPLOADS).await.unwrap();
    }

    #[tokio::test]
    async fn other_create_failures_still_propagate() {
        let mut store = MockStore::new();
        store.expect_create_table().returning(|_| {
            Err(StoreError::new(StoreErrorKind::ConstraintViolation, "check violation"))
        });
        store.expect_add_column().never();

        let err = SchemaEnsurer::new(&store).ensure(&CREDENTIALS).await.unwrap_err();
        assert_eq!(err.kind, StoreErrorKind::ConstraintViolation);
    }
}
