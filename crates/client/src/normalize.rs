//! Wire-format normalization for Discovery API responses.
//!
//! Responsibilities:
//! - Rename camelCase keys to snake_case, recursively, for objects inside objects and arrays.
//! - Unwrap GraphQL connection envelopes (`edges`/`node`/`page_info`) into plain node lists.
//! - Walk a normalized response down to the sub-node a query reads from.
//!
//! Does NOT handle:
//! - Typed decoding of nodes (see `models::factory`).
//! - GraphQL error envelopes (see `endpoints::graphql`).
//!
//! Invariants:
//! - `normalize(normalize(x)) == normalize(x)` for every JSON value.
//! - Scalar leaves are never modified.
//! - Values under opaque keys (user-defined `meta`, `config`) keep their original keys.
//! - A connection without `edges` is an `UnexpectedShape` error, never an empty list.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ClientError, Result};

/// Keys whose renaming does not follow the generic rule.
const KEY_OVERRIDES: &[(&str, &str)] = &[("__typename", "typename")];

/// Keys whose values are user-authored mappings and pass through unchanged.
const OPAQUE_KEYS: &[&str] = &["meta", "config"];

/// Convert a camelCase name to snake_case.
///
/// An underscore is inserted before every uppercase ASCII letter that follows a
/// lowercase letter or digit, then the whole name is lowercased.
pub fn camel_to_snake(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev: Option<char> = None;
    for ch in name.chars() {
        if ch.is_ascii_uppercase()
            && prev.is_some_and(|p| p.is_ascii_lowercase() || p.is_ascii_digit())
        {
            out.push('_');
        }
        out.push(ch.to_ascii_lowercase());
        prev = Some(ch);
    }
    out
}

/// Convert a snake_case name back to the camelCase wire format.
pub fn snake_to_camel(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper_next = false;
    for (idx, ch) in name.chars().enumerate() {
        if ch == '_' && idx > 0 {
            upper_next = true;
            continue;
        }
        if upper_next {
            out.push(ch.to_ascii_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
    }
    out
}

/// Domain name for a wire key.
pub fn normalize_key(key: &str) -> String {
    KEY_OVERRIDES
        .iter()
        .find(|(wire, _)| *wire == key)
        .map(|(_, domain)| (*domain).to_string())
        .unwrap_or_else(|| camel_to_snake(key))
}

/// Recursively rename object keys to snake_case.
pub fn normalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (key, inner) in map {
                let renamed = normalize_key(key);
                let inner = if OPAQUE_KEYS.contains(&renamed.as_str()) {
                    inner.clone()
                } else {
                    normalize(inner)
                };
                out.insert(renamed, inner);
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(normalize).collect()),
        scalar => scalar.clone(),
    }
}

/// Consume and normalize a value in place of [`normalize`] when ownership is available.
pub fn normalize_owned(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (key, inner) in map {
                let renamed = normalize_key(&key);
                let inner = if OPAQUE_KEYS.contains(&renamed.as_str()) {
                    inner
                } else {
                    normalize_owned(inner)
                };
                out.insert(renamed, inner);
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(normalize_owned).collect()),
        scalar => scalar,
    }
}

/// Pagination metadata of a connection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageInfo {
    pub has_next_page: bool,
    pub has_previous_page: bool,
    pub start_cursor: Option<String>,
    pub end_cursor: Option<String>,
}

/// One flattened page of a connection.
///
/// `cursors[i]` is the opaque cursor of `nodes[i]` when the server sent one.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub nodes: Vec<T>,
    pub page_info: PageInfo,
    pub cursors: Vec<Option<String>>,
}

impl Page<Value> {
    /// Decode every node while keeping pagination data.
    pub fn try_map<U>(self, f: impl FnMut(Value) -> Result<U>) -> Result<Page<U>> {
        let nodes = self.nodes.into_iter().map(f).collect::<Result<Vec<U>>>()?;
        Ok(Page {
            nodes,
            page_info: self.page_info,
            cursors: self.cursors,
        })
    }
}

/// Flatten a normalized connection object into its nodes.
///
/// `path` names the connection for error messages.
pub fn flatten_connection(connection: Value, path: &str) -> Result<Page<Value>> {
    let Value::Object(mut map) = connection else {
        return Err(ClientError::unexpected_shape(path, "connection object"));
    };

    let edges = match map.remove("edges") {
        Some(Value::Array(edges)) => edges,
        _ => {
            return Err(ClientError::unexpected_shape(
                format!("{path}.edges"),
                "list of edges",
            ));
        }
    };

    let page_info = match map.remove("page_info") {
        None | Some(Value::Null) => PageInfo::default(),
        Some(raw) => serde_json::from_value(raw).map_err(|_| {
            ClientError::unexpected_shape(format!("{path}.page_info"), "page info object")
        })?,
    };

    let mut nodes = Vec::with_capacity(edges.len());
    let mut cursors = Vec::with_capacity(edges.len());
    for (idx, edge) in edges.into_iter().enumerate() {
        let Value::Object(mut edge) = edge else {
            return Err(ClientError::unexpected_shape(
                format!("{path}.edges[{idx}]"),
                "edge object",
            ));
        };
        match edge.remove("node") {
            Some(node @ Value::Object(_)) => nodes.push(node),
            _ => {
                return Err(ClientError::unexpected_shape(
                    format!("{path}.edges[{idx}].node"),
                    "node object",
                ));
            }
        }
        cursors.push(match edge.remove("cursor") {
            Some(Value::String(cursor)) => Some(cursor),
            _ => None,
        });
    }

    Ok(Page {
        nodes,
        page_info,
        cursors,
    })
}

/// Take the value at `path` out of a normalized response.
///
/// Every segment must exist; a `null` at the final segment is returned as-is,
/// a `null` before it is an `UnexpectedShape` error.
pub fn take_path(mut value: Value, path: &[&str]) -> Result<Value> {
    for (depth, segment) in path.iter().enumerate() {
        let location = path[..=depth].join(".");
        match value {
            Value::Object(mut map) => match map.remove(*segment) {
                Some(inner) => value = inner,
                None => return Err(ClientError::unexpected_shape(location, "field present")),
            },
            _ => {
                return Err(ClientError::unexpected_shape(
                    path[..depth].join("."),
                    "object",
                ));
            }
        }
    }
    Ok(value)
}
