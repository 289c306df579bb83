//! In-memory [`Store`] that models table shapes closely enough to exercise
//! schema evolution and insert fallback in tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};

use super::{NewRow, SqlValue, Store, StoreError, StoreErrorKind, StoredSecret};
use crate::schema::{ColumnSpec, ColumnType, TableSpec};

#[derive(Debug, Clone)]
struct MemColumn {
    name: String,
    ty: ColumnType,
    nullable: bool,
}

#[derive(Debug, Default)]
struct MemTable {
    columns: Vec<MemColumn>,
    rows: Vec<HashMap<String, Option<SqlValue>>>,
    next_id: i64,
}

impl MemTable {
    fn column(&self, name: &str) -> Option<&MemColumn> {
        self.columns.iter().find(|c| c.name == name)
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<HashMap<String, MemTable>>,
    unreachable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every operation fails with [`StoreErrorKind::ConnectionFailure`].
    pub fn unreachable() -> Self {
        let store = Self::default();
        store.unreachable.store(true, Ordering::SeqCst);
        store
    }

    /// Seed a table with an arbitrary (possibly outdated) column set.
    pub fn with_table(self, name: &str, columns: &[(&str, ColumnType, bool)]) -> Self {
        let table = MemTable {
            columns: columns
                .iter()
                .map(|(n, ty, nullable)| MemColumn {
                    name: (*n).to_owned(),
                    ty: *ty,
                    nullable: *nullable,
                })
                .collect(),
            rows: Vec::new(),
            next_id: 1,
        };
        self.tables.lock().unwrap().insert(name.to_owned(), table);
        self
    }

    /// Append a raw row, bypassing insert validation.
    pub fn seed_row(&self, table: &str, values: &[(&str, SqlValue)]) {
        let mut tables = self.tables.lock().unwrap();
        let t = tables.get_mut(table).expect("table must exist");
        let id = t.next_id;
        t.next_id += 1;
        let mut row: HashMap<String, Option<SqlValue>> = values
            .iter()
            .map(|(n, v)| ((*n).to_owned(), Some(v.clone())))
            .collect();
        row.insert("id".into(), Some(SqlValue::Text(id.to_string())));
        t.rows.push(row);
    }

    /// `(name, type, nullable)` of each column, in table order.
    pub fn shape(&self, table: &str) -> Option<Vec<(String, ColumnType, bool)>> {
        self.tables.lock().unwrap().get(table).map(|t| {
            t.columns
                .iter()
                .map(|c| (c.name.clone(), c.ty, c.nullable))
                .collect()
        })
    }

    pub fn row_count(&self, table: &str) -> usize {
        self.tables
            .lock()
            .unwrap()
            .get(table)
            .map_or(0, |t| t.rows.len())
    }

    /// Value of `column` in the `index`-th row.
    pub fn cell(&self, table: &str, index: usize, column: &str) -> Option<SqlValue> {
        self.tables
            .lock()
            .unwrap()
            .get(table)
            .and_then(|t| t.rows.get(index))
            .and_then(|r| r.get(column).cloned().flatten())
    }

    fn check_reachable(&self) -> Result<(), StoreError> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(StoreError::new(
                StoreErrorKind::ConnectionFailure,
                "connection refused",
            ));
        }
        Ok(())
    }
}

fn missing_relation(table: &str) -> StoreError {
    StoreError::new(
        StoreErrorKind::Other,
        format!("relation \"{table}\" does not exist"),
    )
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_table(&self, table: &TableSpec) -> Result<(), StoreError> {
        self.check_reachable()?;
        let mut tables = self.tables.lock().unwrap();
        tables.entry(table.name.to_owned()).or_insert_with(|| MemTable {
            columns: table
                .columns
                .iter()
                .map(|c| MemColumn {
                    name: c.name.to_owned(),
                    ty: c.ty,
                    nullable: c.nullable,
                })
                .collect(),
            rows: Vec::new(),
            next_id: 1,
        });
        Ok(())
    }

    async fn add_column(&self, table: &str, column: &ColumnSpec) -> Result<(), StoreError> {
        self.check_reachable()?;
        let mut tables = self.tables.lock().unwrap();
        let t = tables.get_mut(table).ok_or_else(|| missing_relation(table))?;
        if t.column(column.name).is_some() {
            return Ok(());
        }
        t.columns.push(MemColumn {
            name: column.name.to_owned(),
            ty: column.ty,
            nullable: !column.is_generated(),
        });
        Ok(())
    }

    async fn convert_column_to_text(&self, table: &str, column: &str) -> Result<(), StoreError> {
        self.check_reachable()?;
        let mut tables = self.tables.lock().unwrap();
        let t = tables.get_mut(table).ok_or_else(|| missing_relation(table))?;
        let col = t
            .columns
            .iter_mut()
            .find(|c| c.name == column)
            .ok_or_else(|| {
                StoreError::new(
                    StoreErrorKind::UndefinedColumn,
                    format!("column \"{column}\" does not exist"),
                )
            })?;
        if col.ty != ColumnType::Bytes {
            return Err(StoreError::new(
                StoreErrorKind::Other,
                "function encode(text, unknown) does not exist",
            ));
        }
        col.ty = ColumnType::Text;
        for row in &mut t.rows {
            if let Some(Some(SqlValue::Bytes(b))) = row.get(column) {
                let encoded = STANDARD.encode(b);
                row.insert(column.to_owned(), Some(SqlValue::Text(encoded)));
            }
        }
        Ok(())
    }

    async fn insert(&self, table: &str, row: &NewRow) -> Result<i64, StoreError> {
        self.check_reachable()?;
        let mut tables = self.tables.lock().unwrap();
        let t = tables.get_mut(table).ok_or_else(|| missing_relation(table))?;

        for (name, value) in row.values() {
            let col = t.column(name).ok_or_else(|| {
                StoreError::new(
                    StoreErrorKind::UndefinedColumn,
                    format!("column \"{name}\" of relation \"{table}\" does not exist"),
                )
            })?;
            let compatible = matches!(
                (col.ty, value),
                (ColumnType::Text, SqlValue::Text(_)) | (ColumnType::Bytes, SqlValue::Bytes(_))
            );
            if !compatible {
                return Err(StoreError::new(
                    StoreErrorKind::Other,
                    format!("column \"{name}\" is of type {}", col.ty.sql_type()),
                ));
            }
        }
        for col in &t.columns {
            let generated = matches!(col.ty, ColumnType::BigSerialKey | ColumnType::CreatedAt);
            if !col.nullable && !generated && !row.contains(&col.name) {
                return Err(StoreError::new(
                    StoreErrorKind::ConstraintViolation,
                    format!("null value in column \"{}\" violates not-null constraint", col.name),
                ));
            }
        }

        let id = t.next_id;
        t.next_id += 1;
        let mut stored: HashMap<String, Option<SqlValue>> = t
            .columns
            .iter()
            .map(|c| (c.name.clone(), row.get(&c.name).cloned()))
            .collect();
        stored.insert("id".into(), Some(SqlValue::Text(id.to_string())));
        t.rows.push(stored);
        Ok(id)
    }

    async fn fetch_secret(
        &self,
        table: &TableSpec,
        id: i64,
        include_iv: bool,
    ) -> Result<Option<StoredSecret>, StoreError> {
        self.check_reachable()?;
        let tables = self.tables.lock().unwrap();
        let t = tables.get(table.name).ok_or_else(|| missing_relation(table.name))?;
        if include_iv && t.column(table.iv_column).is_none() {
            return Err(StoreError::new(
                StoreErrorKind::UndefinedColumn,
                format!("column \"{}\" does not exist", table.iv_column),
            ));
        }
        let wanted = SqlValue::Text(id.to_string());
        let row = t
            .rows
            .iter()
            .find(|r| r.get("id").and_then(Option::as_ref) == Some(&wanted));
        Ok(row.map(|r| {
            let text = |col: &str| match r.get(col).cloned().flatten() {
                Some(SqlValue::Text(s)) => Some(s),
                _ => None,
            };
            StoredSecret {
                payload: text(table.secret_column).unwrap_or_default(),
                iv: if include_iv { text(table.iv_column) } else { None },
            }
        }))
    }
}
