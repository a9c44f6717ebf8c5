//! Entities and cache snapshots
//!
//! Server-authoritative read data is kept opaque: an [`Entity`] is whatever
//! JSON object the API returned. The engine only ever looks at a handful of
//! fields (`id`, `businessId`), everything else is passed through to the UI.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Opaque JSON object returned by the server
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Entity(Map<String, Value>);

impl Entity {
    /// Create an empty entity
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a JSON value; `None` unless it is an object
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    /// Entity id; numeric ids are rendered as strings
    pub fn id(&self) -> Option<String> {
        match self.0.get("id")? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Read a field
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Read a string field
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Set a field
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Builder-style [`Entity::insert`]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for Entity {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Kinds of entity kept in a [`CacheSnapshot`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    #[serde(rename = "businesses")]
    BusinessCatalog,
    #[serde(rename = "itineraries")]
    Itineraries,
    #[serde(rename = "favorites")]
    Favorites,
}

impl EntityKind {
    pub const ALL: [EntityKind; 3] = [
        EntityKind::BusinessCatalog,
        EntityKind::Itineraries,
        EntityKind::Favorites,
    ];
}

/// Versioned, wholesale copy of server-authoritative read data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheSnapshot {
    pub entities: BTreeMap<EntityKind, Vec<Entity>>,
    pub version: i64,
    pub last_updated_at: DateTime<Utc>,
}

impl CacheSnapshot {
    /// Create a snapshot with every kind present and empty
    pub fn new(version: i64, last_updated_at: DateTime<Utc>) -> Self {
        let entities = EntityKind::ALL.iter().map(|k| (*k, Vec::new())).collect();
        Self {
            entities,
            version,
            last_updated_at,
        }
    }

    /// Replace the entities of one kind
    pub fn with_entities(mut self, kind: EntityKind, entities: Vec<Entity>) -> Self {
        self.entities.insert(kind, entities);
        self
    }

    /// Entities of one kind, empty when the kind is absent
    pub fn entities(&self, kind: EntityKind) -> &[Entity] {
        self.entities.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether an entity with this id exists under `kind`
    pub fn contains_id(&self, kind: EntityKind, id: &str) -> bool {
        self.entities(kind)
            .iter()
            .any(|e| e.id().as_deref() == Some(id))
    }
}
