//! Statement generation from records.
#![allow(clippy::unwrap_used)]

use chrono::{TimeZone, Utc};
use sqlaccess::{Record, RecordDescriptor, StatementGenerator, Value};

struct Item {
    id: i32,
    name: &'static str,
    note: Option<String>,
    sort: bool,
}

impl Record for Item {
    fn table_name(&self) -> &str {
        "t"
    }

    fn sort_alpha(&self) -> bool {
        self.sort
    }

    fn fields(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("id", self.id.into()),
            ("name", self.name.into()),
            ("note", self.note.clone().into()),
        ]
    }
}

fn item() -> Item {
    Item {
        id: 1,
        name: "a",
        note: None,
        sort: false,
    }
}

#[test]
fn test_insert_with_null_literal() {
    let unit = item().insert_statement();
    assert_eq!(unit.sql, "insert into t (id,name,note) values(?,?,NULL)");
    assert_eq!(unit.params, vec![Value::Int(1), Value::from("a")]);
}

#[test]
fn test_insert_valid_skips_nulls() {
    let unit = item().insert_valid_statement();
    assert_eq!(unit.sql, "insert into t (id,name) values(?,?)");
    assert_eq!(unit.params, vec![Value::Int(1), Value::from("a")]);
}

#[test]
fn test_update_appends_where_values() {
    let unit = item().update_statement(&["id"]);
    assert_eq!(unit.sql, "update t set name = ?, note = NULL where id = ? ");
    assert_eq!(unit.params, vec![Value::from("a"), Value::Int(1)]);
}

#[test]
fn test_update_valid_skips_null_set_fields() {
    let unit = item().update_valid_statement(&["id"]);
    assert_eq!(unit.sql, "update t set name = ? where id = ? ");
    assert_eq!(unit.params, vec![Value::from("a"), Value::Int(1)]);
}

#[test]
fn test_update_valid_with_leading_null() {
    let descriptor = RecordDescriptor::new(
        "t",
        vec![
            ("a", Value::Null),
            ("b", Value::Int(2)),
            ("c", Value::Int(3)),
            ("k", Value::Int(9)),
        ],
        false,
    );
    let unit = StatementGenerator::update_valid(&descriptor, &["k"]);
    assert_eq!(unit.sql, "update t set b = ?, c = ? where k = ? ");
    assert_eq!(
        unit.params,
        vec![Value::Int(2), Value::Int(3), Value::Int(9)]
    );
}

#[test]
fn test_alphabetical_ordering() {
    let descriptor = RecordDescriptor::new(
        "people",
        vec![
            ("zip", Value::from("02139")),
            ("age", Value::Int(40)),
            ("name", Value::from("Grace")),
        ],
        true,
    );
    let unit = StatementGenerator::insert(&descriptor);
    assert_eq!(unit.sql, "insert into people (age,name,zip) values(?,?,?)");
    assert_eq!(
        unit.params,
        vec![Value::Int(40), Value::from("Grace"), Value::from("02139")]
    );
}

#[test]
fn test_sort_flag_on_record() {
    let unit = Item {
        sort: true,
        note: Some("n".to_string()),
        ..item()
    }
    .insert_statement();
    assert_eq!(unit.sql, "insert into t (id,name,note) values(?,?,?)");
}

#[test]
fn test_describe_lists_every_field() {
    let created = Utc.with_ymd_and_hms(2020, 1, 2, 3, 4, 5).unwrap();
    let descriptor = RecordDescriptor::new(
        "events",
        vec![
            ("id", Value::Int64(3)),
            ("created", Value::Timestamp(created)),
            ("payload", Value::Blob(vec![1, 2, 3])),
            ("note", Value::Null),
        ],
        false,
    );
    assert_eq!(
        StatementGenerator::describe(&descriptor),
        "events:\n  id = 3\n  created = 2020-01-02 03:04:05\n  payload = <3 bytes>\n  note = NULL"
    );
    assert_eq!(item().describe(), "t:\n  id = 1\n  name = a\n  note = NULL");
}

#[test]
fn test_statement_units_are_plain_data() {
    let unit = item().insert_statement();
    let (sql, params) = (unit.sql.clone(), unit.params.clone());
    assert_eq!(sqlaccess::TransactionUnit::from((sql, params)), unit);
}
