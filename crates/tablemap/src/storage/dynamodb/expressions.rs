//! Key condition and filter expressions built from a [`KeyFilter`].

use std::collections::HashMap;

use aws_sdk_dynamodb::types::AttributeValue;
use tablemap_core::entity::{PARTITION_KEY, ROW_KEY};
use tablemap_core::store::{KeyFilter, KeyRange};

/// An expression with its placeholder bindings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Expression {
    pub text: String,
    pub names: HashMap<String, String>,
    pub values: HashMap<String, AttributeValue>,
}

impl Expression {
    fn push_range(&mut self, alias: &str, attribute: &str, range: &KeyRange) {
        let clause = match (range.as_exact(), &range.lower, &range.upper) {
            (Some(key), _, _) => {
                self.bind(format!(":{alias}"), key);
                format!("#{alias} = :{alias}")
            }
            (None, Some(lower), Some(upper)) => {
                self.bind(format!(":{alias}_lo"), lower);
                self.bind(format!(":{alias}_hi"), upper);
                format!("#{alias} BETWEEN :{alias}_lo AND :{alias}_hi")
            }
            (None, Some(lower), None) => {
                self.bind(format!(":{alias}_lo"), lower);
                format!("#{alias} >= :{alias}_lo")
            }
            (None, None, Some(upper)) => {
                self.bind(format!(":{alias}_hi"), upper);
                format!("#{alias} <= :{alias}_hi")
            }
            (None, None, None) => return,
        };

        self.names.insert(format!("#{alias}"), attribute.to_string());
        if !self.text.is_empty() {
            self.text.push_str(" AND ");
        }
        self.text.push_str(&clause);
    }

    fn bind(&mut self, placeholder: String, value: &str) {
        self.values
            .insert(placeholder, AttributeValue::S(value.to_string()));
    }
}

/// A Query key condition, available when the partition key is fixed.
pub fn key_condition(filter: &KeyFilter) -> Option<Expression> {
    filter.partition.as_exact()?;

    let mut expression = Expression::default();
    expression.push_range("pk", PARTITION_KEY, &filter.partition);
    expression.push_range("rk", ROW_KEY, &filter.row);
    Some(expression)
}

/// A Scan filter expression, or `None` when the filter matches every row.
pub fn filter_expression(filter: &KeyFilter) -> Option<Expression> {
    let mut expression = Expression::default();
    expression.push_range("pk", PARTITION_KEY, &filter.partition);
    expression.push_range("rk", ROW_KEY, &filter.row);
    (!expression.text.is_empty()).then_some(expression)
}

/// True when a range can match nothing. DynamoDB rejects such `BETWEEN`s.
pub fn is_unsatisfiable(filter: &KeyFilter) -> bool {
    let inverted = |range: &KeyRange| matches!((&range.lower, &range.upper), (Some(lo), Some(hi)) if lo > hi);
    inverted(&filter.partition) || inverted(&filter.row)
}
