//! INSERT/UPDATE statement generation from record descriptors.

use super::RecordDescriptor;
use crate::{TransactionUnit, Value};

/// Derives statements and positional parameters from a [`RecordDescriptor`].
///
/// Null fields become `NULL` literals (or are skipped by the `*_valid`
/// variants) and never contribute a parameter. Where-fields are matched by
/// exact column name and are always bound, even when null.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatementGenerator;

impl StatementGenerator {
    /// `insert into T (a,b,c) values(?,?,NULL)`.
    #[must_use]
    pub fn insert(descriptor: &RecordDescriptor) -> TransactionUnit {
        let mut params = Vec::new();
        let columns: Vec<&str> = descriptor.fields().iter().map(|(n, _)| n.as_str()).collect();
        let placeholders: Vec<&str> = descriptor
            .fields()
            .iter()
            .map(|(_, value)| placeholder(value, &mut params))
            .collect();

        TransactionUnit::new(
            format!(
                "insert into {} ({}) values({})",
                descriptor.table(),
                columns.join(","),
                placeholders.join(",")
            ),
            params,
        )
    }

    /// `insert into T (a,b) values(?,?)` with null fields left out.
    #[must_use]
    pub fn insert_valid(descriptor: &RecordDescriptor) -> TransactionUnit {
        let present: Vec<&(String, Value)> = descriptor
            .fields()
            .iter()
            .filter(|(_, value)| !value.is_null())
            .collect();
        let columns: Vec<&str> = present.iter().map(|(n, _)| n.as_str()).collect();
        let params: Vec<Value> = present.iter().map(|(_, v)| v.clone()).collect();

        TransactionUnit::new(
            format!(
                "insert into {} ({}) values({})",
                descriptor.table(),
                columns.join(","),
                vec!["?"; params.len()].join(",")
            ),
            params,
        )
    }

    /// `update T set a = ?, b = NULL where k = ? `.
    ///
    /// Set-values come first in the parameters, then where-values in field
    /// order. With no where-fields the statement ends in a bare `where`,
    /// which the engine rejects.
    #[must_use]
    pub fn update(descriptor: &RecordDescriptor, where_fields: &[&str]) -> TransactionUnit {
        Self::build_update(descriptor, where_fields, false)
    }

    /// Like [`update`](Self::update) but null set-fields are left out of the
    /// SET clause.
    #[must_use]
    pub fn update_valid(descriptor: &RecordDescriptor, where_fields: &[&str]) -> TransactionUnit {
        Self::build_update(descriptor, where_fields, true)
    }

    fn build_update(
        descriptor: &RecordDescriptor,
        where_fields: &[&str],
        skip_nulls: bool,
    ) -> TransactionUnit {
        let mut params = Vec::new();
        let mut where_params = Vec::new();
        let mut assignments = Vec::new();
        let mut conditions = Vec::new();

        for (name, value) in descriptor.fields() {
            if where_fields.contains(&name.as_str()) {
                conditions.push(format!("{name} = ? "));
                where_params.push(value.clone());
            } else if value.is_null() {
                if !skip_nulls {
                    assignments.push(format!("{name} = NULL"));
                }
            } else {
                assignments.push(format!("{name} = ?"));
                params.push(value.clone());
            }
        }
        params.append(&mut where_params);

        TransactionUnit::new(
            format!(
                "update {} set {} where {}",
                descriptor.table(),
                assignments.join(", "),
                conditions.join("and ")
            ),
            params,
        )
    }

    /// One `field = value` line per field under a `table:` header.
    #[must_use]
    pub fn describe(descriptor: &RecordDescriptor) -> String {
        std::iter::once(format!("{}:", descriptor.table()))
            .chain(
                descriptor
                    .fields()
                    .iter()
                    .map(|(name, value)| format!("  {name} = {value}")),
            )
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn placeholder(value: &Value, params: &mut Vec<Value>) -> &'static str {
    if value.is_null() {
        "NULL"
    } else {
        params.push(value.clone());
        "?"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor() -> RecordDescriptor {
        RecordDescriptor::new(
            "t",
            vec![
                ("id", Value::Int(1)),
                ("name", Value::from("a")),
                ("note", Value::Null),
            ],
            false,
        )
    }

    #[test]
    fn test_insert() {
        let unit = StatementGenerator::insert(&descriptor());
        assert_eq!(unit.sql, "insert into t (id,name,note) values(?,?,NULL)");
        assert_eq!(unit.params, vec![Value::Int(1), Value::from("a")]);
    }

    #[test]
    fn test_insert_valid() {
        let unit = StatementGenerator::insert_valid(&descriptor());
        assert_eq!(unit.sql, "insert into t (id,name) values(?,?)");
        assert_eq!(unit.params, vec![Value::Int(1), Value::from("a")]);
    }

    #[test]
    fn test_insert_valid_leading_null() {
        let descriptor = RecordDescriptor::new(
            "t",
            vec![("a", Value::Null), ("b", Value::Int(2)), ("c", Value::Int(3))],
            false,
        );
        let unit = StatementGenerator::insert_valid(&descriptor);
        assert_eq!(unit.sql, "insert into t (b,c) values(?,?)");
    }

    #[test]
    fn test_update() {
        let unit = StatementGenerator::update(&descriptor(), &["id"]);
        assert_eq!(unit.sql, "update t set name = ?, note = NULL where id = ? ");
        assert_eq!(unit.params, vec![Value::from("a"), Value::Int(1)]);
    }

    #[test]
    fn test_update_valid() {
        let unit = StatementGenerator::update_valid(&descriptor(), &["id"]);
        assert_eq!(unit.sql, "update t set name = ? where id = ? ");
        assert_eq!(unit.params, vec![Value::from("a"), Value::Int(1)]);
    }

    #[test]
    fn test_update_multiple_where_fields() {
        let unit = StatementGenerator::update(&descriptor(), &["id", "name"]);
        assert_eq!(unit.sql, "update t set note = NULL where id = ? and name = ? ");
        assert_eq!(unit.params, vec![Value::Int(1), Value::from("a")]);
    }

    #[test]
    fn test_null_where_field_is_bound() {
        let unit = StatementGenerator::update(&descriptor(), &["note"]);
        assert_eq!(unit.sql, "update t set id = ?, name = ? where note = ? ");
        assert_eq!(
            unit.params,
            vec![Value::Int(1), Value::from("a"), Value::Null]
        );
    }

    #[test]
    fn test_where_fields_match_exactly() {
        let unit = StatementGenerator::update(&descriptor(), &["identifier"]);
        assert_eq!(unit.sql, "update t set id = ?, name = ?, note = NULL where ");
    }

    #[test]
    fn test_describe() {
        assert_eq!(
            StatementGenerator::describe(&descriptor()),
            "t:\n  id = 1\n  name = a\n  note = NULL"
        );

        let empty = RecordDescriptor::new("bare", Vec::<(&str, Value)>::new(), false);
        assert_eq!(StatementGenerator::describe(&empty), "bare:");
    }
}
