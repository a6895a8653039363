//! Entity repository seam used by the active record binder.
//!
//! Query execution belongs to the ORM; the binder only needs "find by primary
//! key" and "instantiate a new record".

use std::collections::{BTreeMap, HashMap};

use serde_json::{Map, Value};

use crate::schema::ClassSchema;
use crate::value::{BoundValue, EntityValue};

/// Looks up and instantiates domain entities.
pub trait EntityRepository: Send + Sync {
    /// Find an entity of `class` by primary key.
    fn find_by_key(&self, class: &ClassSchema, key: &Value) -> Option<EntityValue>;

    /// Construct a new, unsaved entity populated with `attributes`.
    fn instantiate(
        &self,
        class: &ClassSchema,
        attributes: BTreeMap<String, BoundValue>,
    ) -> EntityValue {
        EntityValue::new_record(&class.name, attributes)
    }
}

/// A repository that never finds anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoEntities;

impl EntityRepository for NoEntities {
    fn find_by_key(&self, _class: &ClassSchema, _key: &Value) -> Option<EntityValue> {
        None
    }
}

/// Record storage held in memory, keyed by class name.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRepository {
    records: HashMap<String, Vec<Map<String, Value>>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a record for `class`.
    pub fn insert(&mut self, class: impl Into<String>, record: Map<String, Value>) -> &mut Self {
        self.records.entry(class.into()).or_default().push(record);
        self
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with_record(mut self, class: impl Into<String>, record: Map<String, Value>) -> Self {
        self.insert(class, record);
        self
    }

    /// Number of records stored for `class`.
    pub fn count(&self, class: &str) -> usize {
        self.records.get(class).map_or(0, Vec::len)
    }
}

impl EntityRepository for InMemoryRepository {
    fn find_by_key(&self, class: &ClassSchema, key: &Value) -> Option<EntityValue> {
        let wanted = key_string(key)?;
        let pk = class.primary_key();
        let record = self
            .records
            .get(&class.name)?
            .iter()
            .find(|record| record.get(pk).and_then(key_string).as_deref() == Some(wanted.as_str()))?;

        let attributes = record
            .iter()
            .map(|(name, value)| (name.clone(), BoundValue::from_json(value.clone())))
            .collect();
        Some(EntityValue::existing(
            &class.name,
            record.get(pk).cloned().unwrap_or(Value::Null),
            attributes,
        ))
    }
}

/// Canonical string form of a key, so `"42"` from a query string matches a
/// stored integer `42`.
fn key_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
