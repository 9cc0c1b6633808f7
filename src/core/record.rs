use std::fmt;

/// Key of a [`Table`] entry.
///
/// A table is either an index table (every key is `Index`) or a name table
/// (every key is `Name`). Mixing both within the same table is representable
/// here but rejected before anything reaches a store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RecordKey {
    Index(u64),
    Name(String),
}

/// Classification used by the shape validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    Index,
    Name,
}

impl RecordKey {
    pub fn kind(&self) -> KeyKind {
        match self {
            Self::Index(_) => KeyKind::Index,
            Self::Name(_) => KeyKind::Name,
        }
    }

    pub fn as_name(&self) -> Option<&str> {
        match self {
            Self::Name(name) => Some(name),
            Self::Index(_) => None,
        }
    }

    pub fn as_index(&self) -> Option<u64> {
        match self {
            Self::Index(idx) => Some(*idx),
            Self::Name(_) => None,
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(idx) => write!(f, "[{idx}]"),
            Self::Name(name) => write!(f, "{name}"),
        }
    }
}

impl From<&str> for RecordKey {
    fn from(value: &str) -> Self {
        Self::Name(value.to_string())
    }
}

impl From<String> for RecordKey {
    fn from(value: String) -> Self {
        Self::Name(value)
    }
}

impl From<&String> for RecordKey {
    fn from(value: &String) -> Self {
        Self::Name(value.clone())
    }
}

impl From<u64> for RecordKey {
    fn from(value: u64) -> Self {
        Self::Index(value)
    }
}

impl From<usize> for RecordKey {
    fn from(value: usize) -> Self {
        Self::Index(value as u64)
    }
}

impl From<u32> for RecordKey {
    fn from(value: u32) -> Self {
        Self::Index(u64::from(value))
    }
}

/// A value stored inside a [`Table`].
#[derive(Debug, Clone, PartialEq)]
pub enum RecordValue {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    Table(Table),
}

impl RecordValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Table(_) => "table",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_table(&self) -> Option<&Table> {
        match self {
            Self::Table(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_table_mut(&mut self) -> Option<&mut Table> {
        match self {
            Self::Table(t) => Some(t),
            _ => None,
        }
    }

    pub fn into_table(self) -> Option<Table> {
        match self {
            Self::Table(t) => Some(t),
            _ => None,
        }
    }
}

impl From<bool> for RecordValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for RecordValue {
    fn from(value: i64) -> Self {
        Self::Number(value.into())
    }
}

impl From<i32> for RecordValue {
    fn from(value: i32) -> Self {
        Self::Number(value.into())
    }
}

impl From<u64> for RecordValue {
    fn from(value: u64) -> Self {
        Self::Number(value.into())
    }
}

impl From<u32> for RecordValue {
    fn from(value: u32) -> Self {
        Self::Number(value.into())
    }
}

impl From<f64> for RecordValue {
    // NaN and infinities have no JSON representation
    fn from(value: f64) -> Self {
        serde_json::Number::from_f64(value)
            .map(Self::Number)
            .unwrap_or(Self::Null)
    }
}

impl From<&str> for RecordValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for RecordValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Table> for RecordValue {
    fn from(value: Table) -> Self {
        Self::Table(value)
    }
}

impl<T: Into<RecordValue>> From<Option<T>> for RecordValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Self::Null)
    }
}

/// Insertion-ordered mapping that every persisted sub-record is built from.
#[derive(Debug, Clone, Default)]
pub struct Table {
    entries: Vec<(RecordKey, RecordValue)>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an index table `[0] = v0, [1] = v1, ...`.
    pub fn list<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<RecordValue>,
    {
        values
            .into_iter()
            .enumerate()
            .map(|(idx, value)| (RecordKey::from(idx), value.into()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn with(mut self, key: impl Into<RecordKey>, value: impl Into<RecordValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Inserts or replaces a value, keeping the original position on replace.
    pub fn insert(
        &mut self,
        key: impl Into<RecordKey>,
        value: impl Into<RecordValue>,
    ) -> Option<RecordValue> {
        let key = key.into();
        let value = value.into();
        if let Some((_, slot)) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            return Some(std::mem::replace(slot, value));
        }
        self.entries.push((key, value));
        None
    }

    /// Appends under the next free index.
    pub fn push(&mut self, value: impl Into<RecordValue>) {
        let next = self
            .entries
            .iter()
            .filter_map(|(k, _)| k.as_index())
            .max()
            .map(|max| max + 1)
            .unwrap_or(0);
        self.entries.push((RecordKey::Index(next), value.into()));
    }

    pub fn remove(&mut self, key: impl Into<RecordKey>) -> Option<RecordValue> {
        let key = key.into();
        let pos = self.entries.iter().position(|(k, _)| *k == key)?;
        Some(self.entries.remove(pos).1)
    }

    /// Removes `name` and returns it when it held a table.
    pub fn remove_table(&mut self, name: &str) -> Option<Table> {
        self.remove(name).and_then(RecordValue::into_table)
    }

    pub fn contains_key(&self, key: impl Into<RecordKey>) -> bool {
        self.get(key).is_some()
    }

    pub fn get(&self, key: impl Into<RecordKey>) -> Option<&RecordValue> {
        let key = key.into();
        self.entries.iter().find(|(k, _)| *k == key).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, key: impl Into<RecordKey>) -> Option<&mut RecordValue> {
        let key = key.into();
        self.entries
            .iter_mut()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(RecordValue::as_str)
    }

    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(RecordValue::as_i64)
    }

    pub fn get_f64(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(RecordValue::as_f64)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(RecordValue::as_bool)
    }

    pub fn get_table(&self, name: &str) -> Option<&Table> {
        self.get(name).and_then(RecordValue::as_table)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RecordKey, &RecordValue)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &RecordKey> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &RecordValue> {
        self.entries.iter().map(|(_, v)| v)
    }
}

// Entry order is presentation only; two tables are equal when they map the
// same keys to equal values.
impl PartialEq for Table {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .entries
                .iter()
                .all(|(k, v)| other.get(k.clone()).is_some_and(|ov| ov == v))
    }
}

impl<K, V> FromIterator<(K, V)> for Table
where
    K: Into<RecordKey>,
    V: Into<RecordValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut table = Table::new();
        for (k, v) in iter {
            table.insert(k, v);
        }
        table
    }
}

impl IntoIterator for Table {
    type Item = (RecordKey, RecordValue);
    type IntoIter = std::vec::IntoIter<(RecordKey, RecordValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_replaces_in_place() {
        let mut table = Table::new().with("a", 1).with("b", 2);
        let previous = table.insert("a", 10);
        assert_eq!(previous, Some(RecordValue::from(1)));
        assert_eq!(table.keys().next(), Some(&RecordKey::from("a")));
        assert_eq!(table.get_i64("a"), Some(10));
    }

    #[test]
    fn push_uses_next_free_index() {
        let mut table = Table::list(["x", "y"]);
        table.push("z");
        assert_eq!(table.get(2u64).and_then(RecordValue::as_str), Some("z"));
    }

    #[test]
    fn equality_ignores_entry_order() {
        let left = Table::new().with("a", 1).with("b", true);
        let right = Table::new().with("b", true).with("a", 1);
        assert_eq!(left, right);
        assert_ne!(left, right.with("c", "extra"));
    }

    #[test]
    fn non_finite_floats_become_null() {
        assert_eq!(RecordValue::from(f64::NAN), RecordValue::Null);
    }
}
