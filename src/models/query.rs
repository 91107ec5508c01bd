//! Query-related data models.
//!
//! This module defines the result type of a sandboxed query execution.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// The result of a sandboxed query: the complete row set in execution order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryOutcome {
    pub rows: Vec<serde_json::Map<String, JsonValue>>,
    pub execution_time_ms: u64,
}

impl QueryOutcome {
    /// Create a new outcome.
    pub fn new(rows: Vec<serde_json::Map<String, JsonValue>>, execution_time_ms: u64) -> Self {
        Self {
            rows,
            execution_time_ms,
        }
    }

    /// Get the number of rows in the result.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Check if the result is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_empty() {
        let outcome = QueryOutcome::new(Vec::new(), 10);
        assert!(outcome.is_empty());
        assert_eq!(outcome.row_count(), 0);
    }

    #[test]
    fn test_outcome_rows() {
        let mut row = serde_json::Map::new();
        row.insert("id".to_string(), serde_json::json!(1));
        let outcome = QueryOutcome::new(vec![row], 5);
        assert!(!outcome.is_empty());
        assert_eq!(outcome.row_count(), 1);
        assert_eq!(outcome.execution_time_ms, 5);
    }
}
