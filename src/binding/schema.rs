use super::BindingContext;
use crate::core::{BindError, Result, Table};
use crate::store::wire;
use serde::{Serialize, de::DeserializeOwned};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Produces the latest wire shape of an object.
pub type SerializeFn<T> = Arc<dyn Fn(&T) -> Result<Table> + Send + Sync>;

/// Populates an object from a stored sub-record of one specific version.
///
/// The `__VERSION` field has already been stripped from the table.
pub type DeserializeFn<T> = Arc<dyn Fn(&mut T, Table, &BindingContext) -> Result<()> + Send + Sync>;

/// Version tag -> deserialize procedure, plus the tag every save is written at.
pub struct VersionTable<T> {
    latest: Option<String>,
    procedures: HashMap<String, DeserializeFn<T>>,
}

impl<T> VersionTable<T> {
    pub fn new() -> Self {
        Self {
            latest: None,
            procedures: HashMap::new(),
        }
    }

    pub fn latest(mut self, tag: impl Into<String>) -> Self {
        self.latest = Some(tag.into());
        self
    }

    pub fn version<F>(mut self, tag: impl Into<String>, procedure: F) -> Self
    where
        F: Fn(&mut T, Table, &BindingContext) -> Result<()> + Send + Sync + 'static,
    {
        self.procedures.insert(tag.into(), Arc::new(procedure));
        self
    }

    pub fn latest_tag(&self) -> Option<&str> {
        self.latest.as_deref()
    }

    pub fn procedure(&self, tag: &str) -> Option<&DeserializeFn<T>> {
        self.procedures.get(tag)
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.procedures.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.procedures.is_empty()
    }
}

impl<T> Default for VersionTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for VersionTable<T> {
    fn clone(&self) -> Self {
        Self {
            latest: self.latest.clone(),
            procedures: self.procedures.clone(),
        }
    }
}

/// Capabilities of an object that can be bound to a master record.
///
/// Every piece is optional at the type level so that a half-declared object
/// is caught when the binding is built rather than on its first save.
pub struct Schema<T> {
    serializer: Option<SerializeFn<T>>,
    versions: Option<VersionTable<T>>,
}

impl<T> Schema<T> {
    pub fn new() -> Self {
        Self {
            serializer: None,
            versions: None,
        }
    }

    pub fn serializer<F>(mut self, serialize: F) -> Self
    where
        F: Fn(&T) -> Result<Table> + Send + Sync + 'static,
    {
        self.serializer = Some(Arc::new(serialize));
        self
    }

    pub fn versions(mut self, versions: VersionTable<T>) -> Self {
        self.versions = Some(versions);
        self
    }

    pub fn version_table(&self) -> Option<&VersionTable<T>> {
        self.versions.as_ref()
    }

    pub fn serialize_fn(&self) -> Option<&SerializeFn<T>> {
        self.serializer.as_ref()
    }

    pub fn latest_tag(&self) -> Option<&str> {
        self.versions.as_ref().and_then(VersionTable::latest_tag)
    }

    /// Checks the structural contract, in the order the errors are reported.
    pub fn validate(&self, sub_key: &str) -> Result<()> {
        if self.serializer.is_none() {
            return Err(BindError::NotSerializable(sub_key.to_string()));
        }

        let versions = self
            .versions
            .as_ref()
            .ok_or_else(|| BindError::MissingVersionTable(sub_key.to_string()))?;

        if versions.is_empty() {
            return Err(BindError::IncompleteVersionTable(sub_key.to_string()));
        }

        let latest = versions
            .latest_tag()
            .ok_or_else(|| BindError::NoLatestVersion(sub_key.to_string()))?;

        if versions.procedure(latest).is_none() {
            return Err(BindError::LatestVersionNotFound {
                sub_key: sub_key.to_string(),
                latest: latest.to_string(),
            });
        }

        Ok(())
    }
}

impl<T> Default for Schema<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Schema<T> {
    fn clone(&self) -> Self {
        Self {
            serializer: self.serializer.clone(),
            versions: self.versions.clone(),
        }
    }
}

impl<T> fmt::Debug for Schema<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tags: Vec<&str> = self
            .versions
            .as_ref()
            .map(|v| v.tags().collect())
            .unwrap_or_default();
        tags.sort_unstable();
        f.debug_struct("Schema")
            .field("serializable", &self.serializer.is_some())
            .field("latest", &self.latest_tag())
            .field("versions", &tags)
            .finish()
    }
}

impl<T> Schema<T>
where
    T: Serialize + DeserializeOwned + Send + 'static,
{
    /// Single-version schema backed by the type's serde implementation.
    ///
    /// An empty stored record leaves the object untouched, so a fresh key
    /// keeps whatever defaults the caller constructed it with.
    pub fn serde(tag: impl Into<String>) -> Self {
        let tag = tag.into();
        Schema::new()
            .serializer(|obj: &T| {
                let value = serde_json::to_value(obj)?;
                if !value.is_object() {
                    return Err(BindError::Serialization(
                        "serde schema requires a struct or map".to_string(),
                    ));
                }
                wire::table_from_json(value)
            })
            .versions(
                VersionTable::new()
                    .latest(tag.clone())
                    .version(tag, |obj: &mut T, stored: Table, _ctx: &BindingContext| {
                        if stored.is_empty() {
                            return Ok(());
                        }
                        *obj = wire::from_table(&stored)?;
                        Ok(())
                    }),
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::collections::HashMap;

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Loadout {
        slots: Vec<String>,
        perks: HashMap<String, u32>,
        level: u32,
    }

    fn ctx() -> BindingContext {
        BindingContext {
            store_name: "Loadouts".to_string(),
            master_key: "k".to_string(),
        }
    }

    #[test]
    fn serde_schema_reads_empty_collections() {
        let schema: Schema<Loadout> = Schema::serde("1");
        let stored = (schema.serialize_fn().unwrap())(&Loadout {
            slots: Vec::new(),
            perks: HashMap::new(),
            level: 4,
        })
        .unwrap();

        let mut loaded = Loadout::default();
        let procedure = schema.version_table().unwrap().procedure("1").unwrap();
        procedure(&mut loaded, stored, &ctx()).unwrap();
        assert_eq!(loaded.level, 4);
        assert!(loaded.slots.is_empty());
        assert!(loaded.perks.is_empty());
    }

    #[test]
    fn validate_accepts_complete_schema() {
        let schema: Schema<Loadout> = Schema::serde("3");
        assert!(schema.validate("loadout").is_ok());
        assert_eq!(schema.latest_tag(), Some("3"));
    }
}
