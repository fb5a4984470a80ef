//! Collection names, filters, patches and grouping queries
//!
//! Field paths are dotted (`reference.id`). A missing field compares equal to
//! `null`, matching the usual document-store convention.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Collections the build reads or writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Otus,
    Indexes,
    History,
    References,
}

impl Collection {
    pub fn name(&self) -> &'static str {
        match self {
            Collection::Otus => "otus",
            Collection::Indexes => "indexes",
            Collection::History => "history",
            Collection::References => "references",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Resolve a dotted path inside a document
pub fn lookup<'a>(document: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(document, |current, key| current.as_object()?.get(key))
}

fn field_or_null<'a>(document: &'a Value, path: &str) -> &'a Value {
    lookup(document, path).unwrap_or(&Value::Null)
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Eq(Value),
    Ne(Value),
    In(Vec<Value>),
}

impl Condition {
    fn matches(&self, value: &Value) -> bool {
        match self {
            Condition::Eq(expected) => value == expected,
            Condition::Ne(expected) => value != expected,
            Condition::In(candidates) => candidates.iter().any(|c| c == value),
        }
    }
}

/// Conjunction of field conditions
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<(String, Condition)>,
}

impl Filter {
    /// Matches every document
    pub fn new() -> Self {
        Self::default()
    }

    pub fn by_id(id: impl Into<String>) -> Self {
        Self::new().eq("_id", id.into())
    }

    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions
            .push((field.into(), Condition::Eq(value.into())));
        self
    }

    pub fn ne(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions
            .push((field.into(), Condition::Ne(value.into())));
        self
    }

    pub fn is_in<I, V>(mut self, field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.conditions.push((field.into(), Condition::In(values)));
        self
    }

    pub fn conditions(&self) -> &[(String, Condition)] {
        &self.conditions
    }

    pub fn matches(&self, document: &Value) -> bool {
        self.conditions
            .iter()
            .all(|(field, condition)| condition.matches(field_or_null(document, field)))
    }
}

/// Field assignments applied by an update
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Patch {
    sets: Vec<(String, Value)>,
}

impl Patch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.sets.push((field.into(), value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Apply the assignments, creating intermediate objects as needed.
    /// Returns true when the document changed.
    pub fn apply(&self, document: &mut Value) -> bool {
        let mut changed = false;

        for (path, value) in &self.sets {
            let mut current = &mut *document;
            let mut keys = path.split('.').peekable();

            while let Some(key) = keys.next() {
                if !current.is_object() {
                    *current = Value::Object(Map::new());
                }
                let Some(object) = current.as_object_mut() else {
                    break;
                };

                if keys.peek().is_none() {
                    if object.get(key) != Some(value) {
                        object.insert(key.to_string(), value.clone());
                        changed = true;
                    }
                    break;
                }

                current = object
                    .entry(key.to_string())
                    .or_insert_with(|| Value::Object(Map::new()));
            }
        }

        changed
    }
}

/// Grouping of matching documents by the value of one field
#[derive(Debug, Clone, PartialEq)]
pub struct GroupQuery {
    pub filter: Filter,
    /// Only documents where these two fields hold different values
    pub diverging: Option<(String, String)>,
    pub group_by: String,
}

impl GroupQuery {
    pub fn new(filter: Filter, group_by: impl Into<String>) -> Self {
        Self {
            filter,
            diverging: None,
            group_by: group_by.into(),
        }
    }

    pub fn where_fields_differ(
        mut self,
        left: impl Into<String>,
        right: impl Into<String>,
    ) -> Self {
        self.diverging = Some((left.into(), right.into()));
        self
    }

    pub fn matches(&self, document: &Value) -> bool {
        if !self.filter.matches(document) {
            return false;
        }

        match &self.diverging {
            Some((left, right)) => {
                field_or_null(document, left) != field_or_null(document, right)
            }
            None => true,
        }
    }

    pub fn key_of(&self, document: &Value) -> Value {
        field_or_null(document, &self.group_by).clone()
    }
}

/// One output group of an aggregation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub key: Value,
    pub ids: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateResult {
    pub matched: u64,
    pub modified: u64,
}
