//! Dotted-path flattening of documents
//!
//! A document (JSON object) is flattened to an ordered map of
//! `dotted.path -> leaf`. Numeric segments index sequences, other segments
//! are object keys. Empty arrays and objects are kept as leaves so that
//! unflattening reproduces them.
//!
//! Object keys that are empty, contain `.` or look like a sequence index
//! cannot be represented and are rejected rather than mangled.

use std::collections::BTreeMap;
use std::ops::Bound;

use serde_json::{Map, Value};
use thiserror::Error;

/// Result type for path operations
pub type PathResult<T> = Result<T, PathError>;

/// Path syntax and structure errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("Document root must be an object, got {0}")]
    RootNotObject(&'static str),

    #[error("Key '{key}' under '{parent}' cannot be addressed by a dotted path")]
    UnaddressableKey { parent: String, key: String },

    #[error("Malformed path: '{0}'")]
    MalformedPath(String),

    #[error("Path '{0}' conflicts with another path in the document")]
    Conflict(String),
}

/// A document flattened to dotted paths.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatDocument {
    entries: BTreeMap<String, Value>,
}

impl FlatDocument {
    /// Creates an empty flat document
    pub fn new() -> Self {
        Self::default()
    }

    /// Flattens a document. The root must be an object.
    pub fn flatten(document: &Value) -> PathResult<Self> {
        let root = document
            .as_object()
            .ok_or_else(|| PathError::RootNotObject(json_type_name(document)))?;

        let mut flat = Self::new();
        flatten_object(root, "", &mut flat.entries)?;
        Ok(flat)
    }

    /// Rebuilds the nested document.
    pub fn unflatten(&self) -> PathResult<Value> {
        let mut root = Node::Map(BTreeMap::new());
        for (path, value) in &self.entries {
            let segments = split_path(path)?;
            place(&mut root, &segments, value, path)?;
        }
        Ok(root.into_value())
    }

    /// Sets `path` to `value`, replacing whatever was stored at or beneath it.
    ///
    /// Non-empty containers are flattened beneath `path`.
    pub fn insert(&mut self, path: &str, value: Value) -> PathResult<()> {
        split_path(path)?;
        self.remove(path);

        match &value {
            Value::Object(map) if !map.is_empty() => flatten_object(map, path, &mut self.entries),
            Value::Array(items) if !items.is_empty() => {
                flatten_array(items, path, &mut self.entries)
            }
            _ => {
                self.entries.insert(path.to_string(), value);
                Ok(())
            }
        }
    }

    /// Removes the leaf at `path` and every entry beneath it.
    pub fn remove(&mut self, path: &str) {
        self.entries.remove(path);
        let nested: Vec<String> = self.keys_under(path).map(str::to_string).collect();
        for key in nested {
            self.entries.remove(&key);
        }
    }

    /// Returns the leaf stored exactly at `path`
    pub fn get(&self, path: &str) -> Option<&Value> {
        self.entries.get(path)
    }

    /// Returns the leaf at `path` if it is a string
    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(Value::as_str)
    }

    /// Returns true if `path` holds a meaningful value.
    ///
    /// Missing keys, `null` and `""` are absent. `0`, `false` and empty
    /// containers are present, as is any path with entries beneath it.
    pub fn is_present(&self, path: &str) -> bool {
        match self.entries.get(path) {
            Some(value) => !is_absent(value),
            None => self.keys_under(path).next().is_some(),
        }
    }

    /// Returns the value at `path`: the leaf itself, or the container
    /// reassembled from the entries beneath it.
    pub fn value_at(&self, path: &str) -> Option<Value> {
        if let Some(value) = self.entries.get(path) {
            return Some(value.clone());
        }

        let prefix_len = path.len() + 1;
        let nested: Vec<(&str, &Value)> = self
            .keys_under(path)
            .filter_map(|key| self.entries.get(key).map(|v| (&key[prefix_len..], v)))
            .collect();

        let first = nested.first()?;
        let first_segment = first.0.split('.').next().unwrap_or_default();
        let mut root = if index_of(first_segment).is_some() {
            Node::Seq(BTreeMap::new())
        } else {
            Node::Map(BTreeMap::new())
        };

        for (relative, value) in nested {
            let segments = split_path(relative).ok()?;
            place(&mut root, &segments, value, relative).ok()?;
        }
        Some(root.into_value())
    }

    /// Iterates over `(path, leaf)` pairs in path order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of leaves
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the document has no leaves
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn keys_under<'a>(&'a self, path: &str) -> impl Iterator<Item = &'a str> + 'a {
        let prefix = format!("{}.", path);
        self.entries
            .range::<str, _>((Bound::Included(prefix.as_str()), Bound::Unbounded))
            .map(|(k, _)| k.as_str())
            .take_while(move |k| k.starts_with(&prefix))
    }
}

/// Returns true for values that do not satisfy a requirement: `null` and `""`.
pub fn is_absent(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Returns the JSON type name for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Joins a prefix and a segment into a dotted path.
fn make_path(prefix: &str, segment: &str) -> String {
    if prefix.is_empty() {
        segment.to_string()
    } else {
        format!("{}.{}", prefix, segment)
    }
}

/// Canonical sequence index: ASCII digits without leading zeros.
fn index_of(segment: &str) -> Option<usize> {
    if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let index: usize = segment.parse().ok()?;
    (index.to_string() == segment).then_some(index)
}

fn split_path(path: &str) -> PathResult<Vec<&str>> {
    let segments: Vec<&str> = path.split('.').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(PathError::MalformedPath(path.to_string()));
    }
    Ok(segments)
}

fn flatten_object(
    map: &Map<String, Value>,
    prefix: &str,
    out: &mut BTreeMap<String, Value>,
) -> PathResult<()> {
    for (key, value) in map {
        if key.is_empty() || key.contains('.') || index_of(key).is_some() {
            return Err(PathError::UnaddressableKey {
                parent: prefix.to_string(),
                key: key.clone(),
            });
        }
        flatten_value(value, make_path(prefix, key), out)?;
    }
    Ok(())
}

fn flatten_array(items: &[Value], prefix: &str, out: &mut BTreeMap<String, Value>) -> PathResult<()> {
    for (i, item) in items.iter().enumerate() {
        flatten_value(item, make_path(prefix, &i.to_string()), out)?;
    }
    Ok(())
}

fn flatten_value(value: &Value, path: String, out: &mut BTreeMap<String, Value>) -> PathResult<()> {
    match value {
        Value::Object(map) if !map.is_empty() => flatten_object(map, &path, out),
        Value::Array(items) if !items.is_empty() => flatten_array(items, &path, out),
        leaf => {
            out.insert(path, leaf.clone());
            Ok(())
        }
    }
}

/// Intermediate tree used while unflattening.
enum Node {
    /// Slot created for a leaf that has not been written yet
    Pending,
    Leaf(Value),
    Map(BTreeMap<String, Node>),
    Seq(BTreeMap<usize, Node>),
}

impl Node {
    fn for_rest(rest: &[&str]) -> Self {
        match rest.first() {
            None => Node::Pending,
            Some(next) if index_of(next).is_some() => Node::Seq(BTreeMap::new()),
            Some(_) => Node::Map(BTreeMap::new()),
        }
    }

    fn into_value(self) -> Value {
        match self {
            Node::Pending => Value::Null,
            Node::Leaf(value) => value,
            Node::Map(children) => Value::Object(
                children
                    .into_iter()
                    .map(|(k, child)| (k, child.into_value()))
                    .collect(),
            ),
            Node::Seq(children) => {
                let len = children.keys().next_back().map_or(0, |max| max + 1);
                let mut items = vec![Value::Null; len];
                for (index, child) in children {
                    items[index] = child.into_value();
                }
                Value::Array(items)
            }
        }
    }
}

fn place(node: &mut Node, segments: &[&str], value: &Value, path: &str) -> PathResult<()> {
    let (head, rest) = segments
        .split_first()
        .ok_or_else(|| PathError::MalformedPath(path.to_string()))?;

    let child = match node {
        Node::Map(children) => {
            if index_of(head).is_some() {
                return Err(PathError::Conflict(path.to_string()));
            }
            children
                .entry((*head).to_string())
                .or_insert_with(|| Node::for_rest(rest))
        }
        Node::Seq(children) => {
            let index = index_of(head).ok_or_else(|| PathError::Conflict(path.to_string()))?;
            children.entry(index).or_insert_with(|| Node::for_rest(rest))
        }
        Node::Pending | Node::Leaf(_) => return Err(PathError::Conflict(path.to_string())),
    };

    if rest.is_empty() {
        match child {
            Node::Pending => {
                *child = Node::Leaf(value.clone());
                Ok(())
            }
            _ => Err(PathError::Conflict(path.to_string())),
        }
    } else {
        place(child, rest, value, path)
    }
}
