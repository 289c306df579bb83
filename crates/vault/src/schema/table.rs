//! Declarative table shapes for the two credential tables.

/// Column types used by the credential tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// Auto-incrementing 64-bit primary key.
    BigSerialKey,
    Text,
    Bytes,
    /// Timestamp with time zone, defaulting to `now()`.
    CreatedAt,
}

impl ColumnType {
    /// PostgreSQL type name.
    pub fn sql_type(self) -> &'static str {
        match self {
            ColumnType::BigSerialKey => "bigserial",
            ColumnType::Text => "text",
            ColumnType::Bytes => "bytea",
            ColumnType::CreatedAt => "timestamptz",
        }
    }
}

/// One column of a [`TableSpec`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub ty: ColumnType,
    pub nullable: bool,
}

impl ColumnSpec {
    const fn new(name: &'static str, ty: ColumnType, nullable: bool) -> Self {
        Self { name, ty, nullable }
    }

    /// Column definition used in `CREATE TABLE`.
    pub fn create_definition(&self) -> String {
        match self.ty {
            ColumnType::BigSerialKey => format!("\"{}\" bigserial primary key", self.name),
            ColumnType::CreatedAt => format!("\"{}\" timestamptz not null default now()", self.name),
            ty if self.nullable => format!("\"{}\" {}", self.name, ty.sql_type()),
            ty => format!("\"{}\" {} not null", self.name, ty.sql_type()),
        }
    }

    /// Column definition used in `ALTER TABLE ... ADD COLUMN`.
    ///
    /// Existing rows have no value for the new column, so a plain column is
    /// always added as nullable. Columns with a default keep their constraint.
    pub fn add_definition(&self) -> String {
        match self.ty {
            ColumnType::CreatedAt => self.create_definition(),
            ty => format!("\"{}\" {}", self.name, ty.sql_type()),
        }
    }

    /// Whether the column is populated by the database on insert.
    pub fn is_generated(&self) -> bool {
        matches!(self.ty, ColumnType::BigSerialKey | ColumnType::CreatedAt)
    }
}

/// The minimum shape of a table and the migrations that apply to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSpec {
    pub name: &'static str,
    pub columns: &'static [ColumnSpec],
    /// Column holding `base64(ciphertext || tag)`.
    pub secret_column: &'static str,
    /// Nullable column holding `base64(nonce)`.
    pub iv_column: &'static str,
    /// Text columns that older deployments created as binary.
    pub legacy_binary_columns: &'static [&'static str],
}

impl TableSpec {
    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// `sat_credentials`: subject identifier plus encrypted password.
pub const CREDENTIALS: TableSpec = TableSpec {
    name: "sat_credentials",
    columns: &[
        ColumnSpec::new("id", ColumnType::BigSerialKey, false),
        ColumnSpec::new("rfc", ColumnType::Text, false),
        ColumnSpec::new("password_enc", ColumnType::Text, false),
        ColumnSpec::new("iv", ColumnType::Text, true),
        ColumnSpec::new("created_at", ColumnType::CreatedAt, false),
    ],
    secret_column: "password_enc",
    iv_column: "iv",
    legacy_binary_columns: &["password_enc"],
};

/// `fiel_uploads`: certificate and key files plus encrypted key password.
pub const FIEL_UPLOADS: TableSpec = TableSpec {
    name: "fiel_uploads",
    columns: &[
        ColumnSpec::new("id", ColumnType::BigSerialKey, false),
        ColumnSpec::new("cer", ColumnType::Bytes, false),
        ColumnSpec::new("key", ColumnType::Bytes, false),
        ColumnSpec::new("password_enc", ColumnType::Text, false),
        ColumnSpec::new("iv", ColumnType::Text, true),
        ColumnSpec::new("created_at", ColumnType::CreatedAt, false),
    ],
    secret_column: "password_enc",
    iv_column: "iv",
    legacy_binary_columns: &[],
};
