//! The context tree's node type: a tagged variant of scalar / sequence / mapping,
//! each carrying `Meta` about where it came from.
//!
//! A single, explicit enum rather than a dynamically-typed value — one
//! variant per concept instead of reaching for `Box<dyn Any>`.

use std::rc::Rc;

use indexmap::IndexMap;
use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::Deserialize;

/// Insertion-ordered mapping from string key to `Node`.
///
/// An `IndexMap` rather than a `BTreeMap`/`HashMap` because spec order
/// (declaration order of `vars`, iteration order of `foreach`/`matrix`) must
/// be preserved end to end.
pub type NodeMap = IndexMap<String, Node>;

/// Where a `Node` came from: which file (if any) and the dotted path within
/// that file/document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Meta {
    /// `None` for values declared inline (global `vars` entries written as a
    /// mapping, or `item`/`key` injected by `foreach`/`matrix`).
    pub source: Option<Rc<str>>,
    pub dpath: Vec<String>,
    /// Introduced locally (temporary scope values); never counted as a
    /// tracked input even if `source` happens to be set.
    pub local: bool,
}

impl Meta {
    pub fn inline() -> Self {
        Meta { source: None, dpath: Vec::new(), local: false }
    }

    pub fn local() -> Self {
        Meta { source: None, dpath: Vec::new(), local: true }
    }

    pub fn from_source(source: Rc<str>) -> Self {
        Meta { source: Some(source), dpath: Vec::new(), local: false }
    }

    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut dpath = self.dpath.clone();
        dpath.push(segment.into());
        Meta { source: self.source.clone(), dpath, local: self.local }
    }

    /// `dvc.yaml`-style display: `source:a.b.c` or `<local>:a.b.c`.
    pub fn path(&self) -> String {
        self.dpath.join(".")
    }

    pub fn display(&self) -> String {
        match &self.source {
            Some(s) => format!("{}:{}", s, self.path()),
            None => format!("<local>:{}", self.path()),
        }
    }

    /// Just the origin, e.g. `params.yaml`, or `<inline>` for values with no
    /// backing file. Used in merge-conflict diagnostics, which name the
    /// conflicting sources but not the dotted path twice.
    pub fn source_label(&self) -> String {
        match &self.source {
            Some(s) => s.to_string(),
            None => "<inline>".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl Scalar {
    /// Renders a scalar the way string interpolation coerces it.
    pub fn to_display_string(&self) -> String {
        match self {
            Scalar::Null => String::new(),
            Scalar::Bool(b) => if *b { "true".to_string() } else { "false".to_string() },
            Scalar::Int(i) => i.to_string(),
            Scalar::Float(f) => format_float(*f),
            Scalar::String(s) => s.clone(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Scalar::Null => "null",
            Scalar::Bool(_) => "bool",
            Scalar::Int(_) => "int",
            Scalar::Float(_) => "float",
            Scalar::String(_) => "string",
        }
    }
}

/// Rust's `Display` for `f64` already produces the shortest round-trip
/// representation.
fn format_float(f: f64) -> String {
    if f == f.trunc() && f.is_finite() && f.abs() < 1e15 {
        // Avoid "3" for 3.0 - a float always renders with a decimal point,
        // matching how YAML/JSON/TOML loaders distinguish 3 (int) from 3.0 (float).
        format!("{f:.1}")
    } else {
        format!("{f}")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Scalar(Scalar, Meta),
    Sequence(Vec<Node>, Meta),
    Mapping(NodeMap, Meta),
}

impl Node {
    pub fn null() -> Self {
        Node::Scalar(Scalar::Null, Meta::inline())
    }

    pub fn empty_mapping() -> Self {
        Node::Mapping(NodeMap::new(), Meta::inline())
    }

    pub fn meta(&self) -> &Meta {
        match self {
            Node::Scalar(_, m) | Node::Sequence(_, m) | Node::Mapping(_, m) => m,
        }
    }

    pub fn meta_mut(&mut self) -> &mut Meta {
        match self {
            Node::Scalar(_, m) | Node::Sequence(_, m) | Node::Mapping(_, m) => m,
        }
    }

    pub fn as_mapping(&self) -> Option<&NodeMap> {
        match self {
            Node::Mapping(m, _) => Some(m),
            _ => None,
        }
    }

    pub fn as_mapping_mut(&mut self) -> Option<&mut NodeMap> {
        match self {
            Node::Mapping(m, _) => Some(m),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[Node]> {
        match self {
            Node::Sequence(s, _) => Some(s),
            _ => None,
        }
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Node::Scalar(s, _) => Some(s),
            _ => None,
        }
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self, Node::Scalar(..))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Node::Scalar(s, _) => s.type_name(),
            Node::Sequence(..) => "list",
            Node::Mapping(..) => "dict",
        }
    }

    /// Re-stamp `source`/`local` across the whole subtree, and rebuild
    /// `dpath` from scratch starting at `base`. Used right after a loader
    /// parses raw structure (with throwaway metadata) into a `Node`.
    pub fn stamp(&mut self, source: Option<Rc<str>>, base: &[String], local: bool) {
        self.stamp_at(source, base, local);
    }

    fn stamp_at(&mut self, source: Option<Rc<str>>, dpath: &[String], local: bool) {
        *self.meta_mut() = Meta { source: source.clone(), dpath: dpath.to_vec(), local };
        match self {
            Node::Scalar(..) => {}
            Node::Sequence(items, _) => {
                for (i, item) in items.iter_mut().enumerate() {
                    let mut child = dpath.to_vec();
                    child.push(i.to_string());
                    item.stamp_at(source.clone(), &child, local);
                }
            }
            Node::Mapping(map, _) => {
                for (k, v) in map.iter_mut() {
                    let mut child = dpath.to_vec();
                    child.push(k.clone());
                    v.stamp_at(source.clone(), &child, local);
                }
            }
        }
    }

    /// Deep, structurally independent copy.
    pub fn deep_clone(&self) -> Node {
        self.clone()
    }

    /// Build a `Node` from an already-parsed JSON value (used for inline
    /// `vars` mappings given directly in the document, and for values
    /// produced programmatically rather than loaded from a parameter file).
    pub fn from_json(value: serde_json::Value, meta: Meta) -> Node {
        match value {
            serde_json::Value::Null => Node::Scalar(Scalar::Null, meta),
            serde_json::Value::Bool(b) => Node::Scalar(Scalar::Bool(b), meta),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Node::Scalar(Scalar::Int(i), meta)
                } else {
                    Node::Scalar(Scalar::Float(n.as_f64().unwrap_or(0.0)), meta)
                }
            }
            serde_json::Value::String(s) => Node::Scalar(Scalar::String(s), meta),
            serde_json::Value::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for (i, item) in items.into_iter().enumerate() {
                    out.push(Node::from_json(item, meta.child(i.to_string())));
                }
                Node::Sequence(out, meta)
            }
            serde_json::Value::Object(map) => {
                let mut out = NodeMap::new();
                for (k, v) in map {
                    let child_meta = meta.child(k.clone());
                    out.insert(k, Node::from_json(v, child_meta));
                }
                Node::Mapping(out, meta)
            }
        }
    }

    /// Convert a resolved, placeholder-free `Node` back into a `serde_json::Value`
    /// for CLI output / tests.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Node::Scalar(Scalar::Null, _) => serde_json::Value::Null,
            Node::Scalar(Scalar::Bool(b), _) => serde_json::Value::Bool(*b),
            Node::Scalar(Scalar::Int(i), _) => serde_json::Value::Number((*i).into()),
            Node::Scalar(Scalar::Float(f), _) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Node::Scalar(Scalar::String(s), _) => serde_json::Value::String(s.clone()),
            Node::Sequence(items, _) => {
                serde_json::Value::Array(items.iter().map(Node::to_json).collect())
            }
            Node::Mapping(map, _) => {
                let mut out = serde_json::Map::new();
                for (k, v) in map {
                    out.insert(k.clone(), v.to_json());
                }
                serde_json::Value::Object(out)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// serde::Deserialize for Node, shared by every format loader.
//
// Parsing through a generic `Visitor` (rather than parsing each format to its
// own `Value` type first and converting) means one code path gets duplicate
// mapping-key detection across YAML, JSON and TOML at once: whichever
// format's `Deserializer` drives `visit_map`, we see every key exactly once
// and can reject a repeat with `FileCorrupted`.
// ---------------------------------------------------------------------------

impl<'de> Deserialize<'de> for Node {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_any(NodeVisitor)
    }
}

struct NodeVisitor;

impl<'de> Visitor<'de> for NodeVisitor {
    type Value = Node;

    fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str("a scalar, sequence or mapping")
    }

    fn visit_bool<E>(self, v: bool) -> Result<Node, E> {
        Ok(Node::Scalar(Scalar::Bool(v), Meta::inline()))
    }

    fn visit_i64<E>(self, v: i64) -> Result<Node, E> {
        Ok(Node::Scalar(Scalar::Int(v), Meta::inline()))
    }

    fn visit_u64<E>(self, v: u64) -> Result<Node, E> {
        match i64::try_from(v) {
            Ok(i) => Ok(Node::Scalar(Scalar::Int(i), Meta::inline())),
            Err(_) => Ok(Node::Scalar(Scalar::Float(v as f64), Meta::inline())),
        }
    }

    fn visit_i128<E>(self, v: i128) -> Result<Node, E> {
        Ok(Node::Scalar(Scalar::Float(v as f64), Meta::inline()))
    }

    fn visit_u128<E>(self, v: u128) -> Result<Node, E> {
        Ok(Node::Scalar(Scalar::Float(v as f64), Meta::inline()))
    }

    fn visit_f64<E>(self, v: f64) -> Result<Node, E> {
        Ok(Node::Scalar(Scalar::Float(v), Meta::inline()))
    }

    fn visit_str<E>(self, v: &str) -> Result<Node, E> {
        Ok(Node::Scalar(Scalar::String(v.to_string()), Meta::inline()))
    }

    fn visit_string<E>(self, v: String) -> Result<Node, E> {
        Ok(Node::Scalar(Scalar::String(v), Meta::inline()))
    }

    fn visit_unit<E>(self) -> Result<Node, E> {
        Ok(Node::null())
    }

    fn visit_none<E>(self) -> Result<Node, E> {
        Ok(Node::null())
    }

    fn visit_some<D>(self, deserializer: D) -> Result<Node, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_any(NodeVisitor)
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Node, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut out = Vec::new();
        while let Some(item) = seq.next_element::<Node>()? {
            out.push(item);
        }
        Ok(Node::Sequence(out, Meta::inline()))
    }

    fn visit_map<A>(self, mut access: A) -> Result<Node, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut out = NodeMap::new();
        while let Some(key) = access.next_key::<String>()? {
            let value = access.next_value::<Node>()?;
            if out.insert(key.clone(), value).is_some() {
                return Err(de::Error::custom(format!("duplicate key '{key}'")));
            }
        }
        Ok(Node::Mapping(out, Meta::inline()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_formats_with_a_decimal_point() {
        assert_eq!(Scalar::Float(3.0).to_display_string(), "3.0");
        assert_eq!(Scalar::Float(3.5).to_display_string(), "3.5");
    }

    #[test]
    fn stamp_rebuilds_dpath_from_base() {
        let mut node = Node::from_json(
            serde_json::json!({"a": {"b": [1, 2]}}),
            Meta::inline(),
        );
        let source: Rc<str> = Rc::from("params.yaml");
        node.stamp(Some(source.clone()), &[], false);
        let Node::Mapping(map, _) = &node else { panic!() };
        let Node::Mapping(inner, meta) = &map["a"] else { panic!() };
        assert_eq!(meta.dpath, vec!["a".to_string()]);
        let Node::Sequence(items, _) = &inner["b"] else { panic!() };
        assert_eq!(items[1].meta().dpath, vec!["a", "b", "1"]);
        assert_eq!(items[1].meta().source.as_deref(), Some("params.yaml"));
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        let err = serde_json::from_str::<Node>(r#"{"a": 1, "a": 2}"#).unwrap_err();
        assert!(err.to_string().contains("duplicate key"));
    }
}
