//! Parameter-set resolution from a test case's default data table
//!
//! The table format inside a plan file is:
//!
//! ```yaml
//! parameters:
//!   columns: [user, password]
//!   rows:
//!     - [alice, secret]
//!     - [bob, hunter2]
//! ```
//!
//! Cells that are not strings (numbers, booleans, null) are kept as absent
//! values rather than converted.

use serde_yaml::Value;
use tracing::{debug, warn};

use crate::types::{DataTable, ReplacementSet, TestCase};

/// Decode the test case's data table, or `None` if it is missing or unreadable.
pub fn try_resolve_table(test_case: &TestCase) -> Option<DataTable> {
    let raw = test_case.parameters.as_ref()?;
    if raw.is_null() {
        return None;
    }
    match decode_table(raw) {
        Ok(table) => Some(table),
        Err(reason) => {
            warn!(
                test_case = test_case.id,
                "ignoring unreadable parameter table: {}", reason
            );
            None
        }
    }
}

/// Build one replacement set per table row. Never returns an empty list:
/// a test case without usable rows is exported once with no substitutions.
pub fn resolve(test_case: &TestCase) -> Vec<ReplacementSet> {
    let mut sets: Vec<ReplacementSet> = Vec::new();

    if let Some(table) = try_resolve_table(test_case) {
        for row in &table.rows {
            let mut set = ReplacementSet::new();
            for (idx, column) in table.columns.iter().enumerate() {
                set.insert(column.clone(), row.get(idx).cloned().flatten());
            }
            sets.push(set);
        }
    }

    if sets.is_empty() {
        sets.push(ReplacementSet::new());
    }

    debug!(
        test_case = test_case.id,
        "resolved {} replacement set(s)",
        sets.len()
    );
    sets
}

fn decode_table(raw: &Value) -> Result<DataTable, String> {
    let map = raw
        .as_mapping()
        .ok_or_else(|| "parameters must be a mapping".to_string())?;

    let columns = match map.get("columns") {
        Some(Value::Sequence(seq)) => seq
            .iter()
            .map(|c| {
                c.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| format!("column name {:?} is not a string", c))
            })
            .collect::<Result<Vec<String>, String>>()?,
        Some(_) => return Err("'columns' must be a list".to_string()),
        None => return Err("missing 'columns'".to_string()),
    };

    let rows = match map.get("rows") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Sequence(seq)) => seq
            .iter()
            .enumerate()
            .map(|(idx, row)| decode_row(idx, row, columns.len()))
            .collect::<Result<Vec<_>, String>>()?,
        Some(_) => return Err("'rows' must be a list".to_string()),
    };

    Ok(DataTable { columns, rows })
}

fn decode_row(idx: usize, row: &Value, width: usize) -> Result<Vec<Option<String>>, String> {
    let cells = row
        .as_sequence()
        .ok_or_else(|| format!("row {} is not a list", idx))?;
    if cells.len() > width {
        return Err(format!(
            "row {} has {} cells but only {} columns",
            idx,
            cells.len(),
            width
        ));
    }
    Ok(cells
        .iter()
        .map(|cell| cell.as_str().map(str::to_string))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn case_with_table(yaml: &str) -> TestCase {
        let table: Value = serde_yaml::from_str(yaml).unwrap();
        TestCase::new(1, "t").with_parameters(table)
    }

    #[test]
    fn test_resolve_without_table_yields_one_empty_set() {
        let sets = resolve(&TestCase::new(1, "t"));
        assert_eq!(sets.len(), 1);
        assert!(sets[0].is_empty());
    }

    #[test]
    fn test_resolve_one_set_per_row() {
        let tc = case_with_table(
            r#"
            columns: [user, password]
            rows:
              - [alice, secret]
              - [bob, hunter2]
              - [carol, pw]
            "#,
        );

        let sets = resolve(&tc);
        assert_eq!(sets.len(), 3);
        for set in &sets {
            assert!(set.contains_key("user"));
            assert!(set.contains_key("password"));
        }
        assert_eq!(sets[1].get("user"), Some(&Some("bob".to_string())));
        assert_eq!(sets[2].get("password"), Some(&Some("pw".to_string())));
    }

    #[test]
    fn test_resolve_zero_rows_yields_one_empty_set() {
        let tc = case_with_table("columns: [user]\nrows: []\n");
        assert!(try_resolve_table(&tc).is_some());

        let sets = resolve(&tc);
        assert_eq!(sets.len(), 1);
        assert!(sets[0].is_empty());
    }

    #[test]
    fn test_resolve_non_string_cells_are_absent() {
        let tc = case_with_table("columns: [n, flag, s]\nrows:\n  - [42, true, ok]\n");

        let sets = resolve(&tc);
        assert_eq!(sets[0].get("n"), Some(&None));
        assert_eq!(sets[0].get("flag"), Some(&None));
        assert_eq!(sets[0].get("s"), Some(&Some("ok".to_string())));
    }

    #[test]
    fn test_resolve_short_row_fills_missing_columns() {
        let tc = case_with_table("columns: [a, b]\nrows:\n  - [x]\n");

        let sets = resolve(&tc);
        assert_eq!(sets[0].len(), 2);
        assert_eq!(sets[0].get("b"), Some(&None));
    }

    #[test]
    fn test_unreadable_table_falls_back() {
        for yaml in [
            "just a string",
            "rows: [[a]]",
            "columns: oops\nrows: []",
            "columns: [a]\nrows:\n  - [x, y]\n",
            "columns: [a]\nrows:\n  - scalar\n",
            "columns: [1]\nrows: []",
        ] {
            let tc = case_with_table(yaml);
            assert!(try_resolve_table(&tc).is_none(), "should reject: {}", yaml);

            let sets = resolve(&tc);
            assert_eq!(sets.len(), 1, "fallback for: {}", yaml);
            assert!(sets[0].is_empty());
        }
    }

    #[test]
    fn test_null_table_is_absent() {
        let tc = TestCase::new(1, "t").with_parameters(Value::Null);
        assert!(try_resolve_table(&tc).is_none());
        assert_eq!(resolve(&tc).len(), 1);
    }

    #[test]
    fn test_resolve_preserves_row_order() {
        let tc = case_with_table("columns: [v]\nrows:\n  - [z]\n  - [a]\n  - [m]\n");
        let values: Vec<String> = resolve(&tc)
            .iter()
            .map(|s| s.get("v").cloned().flatten().unwrap())
            .collect();
        assert_eq!(values, vec!["z", "a", "m"]);
    }
}
