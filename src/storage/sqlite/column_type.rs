//! Declared column type resolution.
//!
//! Declared types come from the table schema (`sqlite3_column_decltype`).
//! They are upper-cased, stripped of any `(size)` suffix and matched against
//! the type-name tables of <https://www.sqlite.org/datatype3.html>.

use rusqlite::types::Type;

const BLOB_TYPES: &[&str] = &["BINARY", "BLOB", "VARBINARY"];
const CHAR_TYPES: &[&str] = &[
    "CHAR",
    "CHARACTER",
    "CLOB",
    "NATIONAL VARYING CHARACTER",
    "NATIVE CHARACTER",
    "NCHAR",
    "NVARCHAR",
    "TEXT",
    "VARCHAR",
    "VARIANT",
    "VARYING CHARACTER",
];
const DATE_TYPES: &[&str] = &["DATE", "DATETIME", "TIME", "TIMESTAMP"];
const INT_TYPES: &[&str] = &[
    "BIGINT",
    "BIT",
    "BOOL",
    "BOOLEAN",
    "INT",
    "INT2",
    "INT8",
    "INTEGER",
    "MEDIUMINT",
    "SMALLINT",
    "TINYINT",
];
const NULL_TYPES: &[&str] = &["NULL"];
const REAL_TYPES: &[&str] = &[
    "DECIMAL",
    "DOUBLE",
    "DOUBLE PRECISION",
    "FLOAT",
    "CGFLOAT",
    "NUMERIC",
    "REAL",
];

/// Logical category of a result column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    /// Decoded as a 64-bit integer.
    Integer,
    /// Decoded as a double.
    Real,
    /// Decoded as UTF-8 text.
    Text,
    /// Decoded as raw bytes.
    Blob,
    /// Always decoded as the empty-string placeholder.
    Null,
    /// Decoded from `yyyy-MM-dd HH:mm:ss` text into a timestamp.
    Date,
    /// No declared type; each value is decoded by its storage class.
    Unknown,
}

impl ColumnType {
    /// Resolves a column's category from its declared type, if it has one.
    ///
    /// Expression and sub-query columns have no declared type and resolve to
    /// [`ColumnType::Unknown`].
    #[must_use]
    pub fn resolve(declared: Option<&str>) -> Self {
        declared.map_or(Self::Unknown, Self::from_declared)
    }

    /// Resolves a declared type name. Unrecognized names resolve to Text.
    ///
    /// # Examples
    ///
    /// ```
    /// use sqlaccess::storage::sqlite::ColumnType;
    ///
    /// assert_eq!(ColumnType::from_declared("varchar(255)"), ColumnType::Text);
    /// assert_eq!(ColumnType::from_declared("BOOL"), ColumnType::Integer);
    /// assert_eq!(ColumnType::from_declared("JSONB"), ColumnType::Text);
    /// ```
    #[must_use]
    pub fn from_declared(declared: &str) -> Self {
        let name = normalize(declared);
        let name = name.as_str();
        if INT_TYPES.contains(&name) {
            Self::Integer
        } else if REAL_TYPES.contains(&name) {
            Self::Real
        } else if CHAR_TYPES.contains(&name) {
            Self::Text
        } else if BLOB_TYPES.contains(&name) {
            Self::Blob
        } else if NULL_TYPES.contains(&name) {
            Self::Null
        } else if DATE_TYPES.contains(&name) {
            Self::Date
        } else {
            Self::Text
        }
    }

    /// Maps a value's dynamic storage class.
    #[must_use]
    pub const fn from_storage(storage: Type) -> Self {
        match storage {
            Type::Integer => Self::Integer,
            Type::Real => Self::Real,
            Type::Text => Self::Text,
            Type::Blob => Self::Blob,
            Type::Null => Self::Null,
        }
    }
}

/// Upper-cases a declared type and strips a trailing `(size)` suffix.
fn normalize(declared: &str) -> String {
    let base = declared.split_once('(').map_or(declared, |(head, _)| head);
    base.trim().to_uppercase()
}
