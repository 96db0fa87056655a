//! Record statement generation.
//!
//! A [`Record`] lists its own `(column, value)` pairs in declaration order.
//! From that list the [`StatementGenerator`] derives INSERT and UPDATE
//! statements with positional parameters, ready to hand to the gateway.
//!
//! # Examples
//!
//! ```
//! use sqlaccess::{Record, Value};
//!
//! struct Note {
//!     id: i64,
//!     body: Option<String>,
//! }
//!
//! impl Record for Note {
//!     fn table_name(&self) -> &str {
//!         "notes"
//!     }
//!
//!     fn fields(&self) -> Vec<(&'static str, Value)> {
//!         vec![("id", self.id.into()), ("body", self.body.clone().into())]
//!     }
//! }
//!
//! let note = Note { id: 7, body: None };
//! let unit = note.insert_statement();
//! assert_eq!(unit.sql, "insert into notes (id,body) values(?,NULL)");
//! assert_eq!(unit.params, vec![Value::Int64(7)]);
//! ```

mod generator;

pub use generator::StatementGenerator;

use crate::{TransactionUnit, Value};

/// Field names that describe the record itself and are never columns.
const RESERVED_FIELDS: &[&str] = &["table_name", "sort_alpha"];

/// A persistable record.
pub trait Record {
    /// Table the record is stored in.
    fn table_name(&self) -> &str;

    /// Whether columns are generated in alphabetical order instead of
    /// declaration order.
    fn sort_alpha(&self) -> bool {
        false
    }

    /// Column names and values in declaration order.
    fn fields(&self) -> Vec<(&'static str, Value)>;

    /// Builds the descriptor the generator works on.
    fn descriptor(&self) -> RecordDescriptor {
        RecordDescriptor::from_record(self)
    }

    /// `insert into T (..) values(..)` with `NULL` literals for null fields.
    fn insert_statement(&self) -> TransactionUnit {
        StatementGenerator::insert(&self.descriptor())
    }

    /// INSERT that leaves null fields out entirely.
    fn insert_valid_statement(&self) -> TransactionUnit {
        StatementGenerator::insert_valid(&self.descriptor())
    }

    /// UPDATE keyed on `where_fields`.
    fn update_statement(&self, where_fields: &[&str]) -> TransactionUnit {
        StatementGenerator::update(&self.descriptor(), where_fields)
    }

    /// UPDATE keyed on `where_fields` that leaves null set-fields out.
    fn update_valid_statement(&self, where_fields: &[&str]) -> TransactionUnit {
        StatementGenerator::update_valid(&self.descriptor(), where_fields)
    }

    /// Human-readable dump of the record's fields.
    fn describe(&self) -> String {
        StatementGenerator::describe(&self.descriptor())
    }
}

/// Ordered column/value pairs of one record, plus its table name.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordDescriptor {
    table: String,
    fields: Vec<(String, Value)>,
}

impl RecordDescriptor {
    /// Builds a descriptor, dropping reserved field names and optionally
    /// sorting the rest by name.
    ///
    /// Sorting is stable, so duplicate names keep their relative order.
    #[must_use]
    pub fn new<I, S>(table: impl Into<String>, fields: I, sort_alpha: bool) -> Self
    where
        I: IntoIterator<Item = (S, Value)>,
        S: Into<String>,
    {
        let mut fields: Vec<(String, Value)> = fields
            .into_iter()
            .map(|(name, value)| (name.into(), value))
            .filter(|(name, _)| !RESERVED_FIELDS.contains(&name.as_str()))
            .collect();
        if sort_alpha {
            fields.sort_by(|a, b| a.0.cmp(&b.0));
        }
        Self {
            table: table.into(),
            fields,
        }
    }

    /// Builds the descriptor of `record`.
    #[must_use]
    pub fn from_record<R: Record + ?Sized>(record: &R) -> Self {
        Self::new(record.table_name(), record.fields(), record.sort_alpha())
    }

    /// Table name.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Fields in generation order.
    #[must_use]
    pub fn fields(&self) -> &[(String, Value)] {
        &self.fields
    }

    /// Returns true if the record has no columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Sample {
        sort: bool,
    }

    impl Record for Sample {
        fn table_name(&self) -> &str {
            "sample"
        }

        fn sort_alpha(&self) -> bool {
            self.sort
        }

        fn fields(&self) -> Vec<(&'static str, Value)> {
            vec![
                ("zeta", Value::Int(1)),
                ("table_name", Value::from("sample")),
                ("alpha", Value::from("a")),
                ("sort_alpha", Value::Bool(self.sort)),
                ("mid", Value::Null),
            ]
        }
    }

    fn names(descriptor: &RecordDescriptor) -> Vec<&str> {
        descriptor.fields().iter().map(|(n, _)| n.as_str()).collect()
    }

    #[test]
    fn test_declaration_order_without_reserved_fields() {
        let descriptor = Sample { sort: false }.descriptor();
        assert_eq!(descriptor.table(), "sample");
        assert_eq!(names(&descriptor), vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_alphabetical_order() {
        let descriptor = Sample { sort: true }.descriptor();
        assert_eq!(names(&descriptor), vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_trait_statements_use_descriptor() {
        let record = Sample { sort: true };
        assert_eq!(
            record.insert_statement().sql,
            "insert into sample (alpha,mid,zeta) values(?,NULL,?)"
        );
        assert_eq!(
            record.insert_valid_statement().sql,
            "insert into sample (alpha,zeta) values(?,?)"
        );
        assert_eq!(
            record.update_statement(&["zeta"]).sql,
            "update sample set alpha = ?, mid = NULL where zeta = ? "
        );
        assert_eq!(
            record.update_valid_statement(&["zeta"]).sql,
            "update sample set alpha = ? where zeta = ? "
        );
    }

    #[test]
    fn test_empty_descriptor() {
        let descriptor = RecordDescriptor::new("t", Vec::<(&str, Value)>::new(), false);
        assert!(descriptor.is_empty());
    }
}
