//! Transaction units and batches.

use super::Value;

/// One statement with its positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionUnit {
    /// Statement text with `?` placeholders.
    pub sql: String,
    /// Parameters bound to the placeholders in order.
    pub params: Vec<Value>,
}

impl TransactionUnit {
    /// Creates a unit from statement text and parameters.
    #[must_use]
    pub fn new(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }
}

impl<S: Into<String>> From<(S, Vec<Value>)> for TransactionUnit {
    fn from((sql, params): (S, Vec<Value>)) -> Self {
        Self::new(sql, params)
    }
}

/// Units run as successive, independently committed transactions.
pub type TransactionBatch = Vec<TransactionUnit>;
