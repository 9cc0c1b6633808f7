//! Table shape validation.
//!
//! Stores encode index tables as arrays and name tables as objects. A table
//! that mixes both key kinds has no faithful encoding, so every sub-record is
//! checked before it is allowed into a write.

use super::record::{KeyKind, RecordKey, RecordValue, Table};

/// Location of the first mixed-key table found by [`find_mixed_table`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeViolation {
    /// Keys leading from the root to the offending table.
    pub path: Vec<RecordKey>,
}

impl ShapeViolation {
    pub fn path_string(&self) -> String {
        if self.path.is_empty() {
            return "<root>".to_string();
        }
        self.path
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(".")
    }
}

/// Returns `true` when no table at any depth mixes index and name keys.
pub fn is_well_formed(table: &Table) -> bool {
    find_mixed_table(table).is_none()
}

/// Walks the table depth-first and reports the first mixed-key table.
///
/// Callers must not hand in cyclic data; `Table` owns its children so this
/// cannot happen through the public API.
pub fn find_mixed_table(table: &Table) -> Option<ShapeViolation> {
    let mut path = Vec::new();
    if walk(table, &mut path) {
        Some(ShapeViolation { path })
    } else {
        None
    }
}

fn walk(table: &Table, path: &mut Vec<RecordKey>) -> bool {
    let mut seen: Option<KeyKind> = None;
    for key in table.keys() {
        match seen {
            None => seen = Some(key.kind()),
            Some(kind) if kind != key.kind() => return true,
            Some(_) => {}
        }
    }

    for (key, value) in table.iter() {
        if let RecordValue::Table(child) = value {
            path.push(key.clone());
            if walk(child, path) {
                return true;
            }
            path.pop();
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn homogeneous_tables_are_well_formed() {
        let table = Table::new()
            .with("name", "sword")
            .with("tags", Table::list(["sharp", "heavy"]))
            .with("stats", Table::new().with("atk", 7).with("def", 2));
        assert!(is_well_formed(&table));
        assert!(is_well_formed(&Table::new()));
    }

    #[test]
    fn mixed_root_is_rejected() {
        let table = Table::new().with(1u64, "a").with("x", "b");
        let violation = find_mixed_table(&table).unwrap();
        assert!(violation.path.is_empty());
        assert_eq!(violation.path_string(), "<root>");
    }

    #[test]
    fn mixed_nested_table_is_reported_with_path() {
        let inner = Table::new().with(0u64, true).with("flag", false);
        let table = Table::new()
            .with("ok", Table::list([1, 2, 3]))
            .with("inventory", Table::new().with("slots", inner));
        let violation = find_mixed_table(&table).unwrap();
        assert_eq!(violation.path_string(), "inventory.slots");
        assert!(!is_well_formed(&table));
    }

    #[test]
    fn fixing_another_level_does_not_restore_shape() {
        let broken = Table::new().with(0u64, 1).with("k", 2);
        let mut table = Table::new().with("a", broken.clone()).with("b", broken);
        table.insert("a", Table::new().with("k", 2));
        assert!(!is_well_formed(&table));
    }
}
