//! Context Tree: the symbol table. Wraps a root `Node::Mapping` plus the
//! side-tables that track what's been loaded and consulted — `tracking`
//! and `imports` — behind `RefCell`, so mutation during a read-oriented
//! traversal is encoded explicitly rather than threaded through every
//! call as `&mut`.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use crate::resolve::error::{ResolveError, ResolveErrorKind};
use crate::resolve::node::{Meta, Node, NodeMap, Scalar};

/// `imports`: which parameter files have been loaded globally, and with
/// which key subset (`None` = the whole file).
#[derive(Debug, Default, Clone)]
pub struct ImportLog {
    entries: BTreeMap<String, Option<BTreeSet<String>>>,
}

impl ImportLog {
    /// Returns `Ok(true)` if this is a genuinely new import, `Ok(false)` if
    /// it is an idempotent repeat of an identical prior import, or an error
    /// if the same source is being re-imported with a different subset.
    pub fn record(&mut self, source: &str, keys: Option<&BTreeSet<String>>) -> Result<bool, ResolveErrorKind> {
        match self.entries.get(source) {
            None => {
                self.entries.insert(source.to_string(), keys.cloned());
                Ok(true)
            }
            Some(existing) => {
                if existing.as_ref() == keys {
                    Ok(false)
                } else {
                    Err(ResolveErrorKind::VarsAlreadyLoaded { file: source.to_string() })
                }
            }
        }
    }
}

/// `tracked`: source → set of dotted paths consulted while resolving the
/// stage currently in `track_scope`.
#[derive(Debug, Default, Clone)]
pub struct Tracked {
    pub by_source: BTreeMap<String, BTreeSet<String>>,
}

pub struct Context {
    root: RefCell<Node>,
    tracking: RefCell<Option<Tracked>>,
    imports: RefCell<ImportLog>,
}

/// RAII guard returned by [`Context::set_temporarily`]; removes the
/// inserted keys on drop regardless of how control leaves the scope.
pub struct TempGuard<'a> {
    ctx: &'a Context,
    keys: Vec<String>,
}

impl Drop for TempGuard<'_> {
    fn drop(&mut self) {
        let mut root = self.ctx.root.borrow_mut();
        if let Some(map) = root.as_mapping_mut() {
            for key in &self.keys {
                map.shift_remove(key);
            }
        }
    }
}

impl Context {
    pub fn new() -> Self {
        Context {
            root: RefCell::new(Node::empty_mapping()),
            tracking: RefCell::new(None),
            imports: RefCell::new(ImportLog::default()),
        }
    }

    pub fn root_snapshot(&self) -> Node {
        self.root.borrow().clone()
    }

    /// Walks `segments` from the root. On a Mapping the segment is a key;
    /// on a Sequence it is parsed as an integer index.
    pub fn select(&self, segments: &[String]) -> Result<Node, ResolveErrorKind> {
        let root = self.root.borrow();
        let node = select_in(&root, segments)?;
        let result = node.clone();
        drop(root);
        if self.tracking.borrow().is_some() {
            self.record_tracked(&result, segments);
        }
        Ok(result)
    }

    fn record_tracked(&self, node: &Node, segments: &[String]) {
        let meta = node.meta();
        if meta.local {
            return;
        }
        let Some(source) = &meta.source else { return };
        let mut tracking = self.tracking.borrow_mut();
        if let Some(tracked) = tracking.as_mut() {
            tracked
                .by_source
                .entry(source.to_string())
                .or_default()
                .insert(segments.join("."));
        }
    }

    /// Run `f` with tracking enabled, returning both `f`'s result and the
    /// accumulated `tracked` table.
    pub fn track_scope<T>(&self, f: impl FnOnce() -> Result<T, ResolveError>) -> Result<(T, Tracked), ResolveError> {
        *self.tracking.borrow_mut() = Some(Tracked::default());
        let result = f();
        let tracked = self.tracking.borrow_mut().take().unwrap_or_default();
        result.map(|v| (v, tracked))
    }

    /// Merges `other` into the root, recursing through nested mappings and
    /// raising on a leaf collision unless `overwrite` is set.
    pub fn merge_update(&self, other: Node, overwrite: bool) -> Result<(), ResolveErrorKind> {
        let mut root = self.root.borrow_mut();
        let Node::Mapping(into, _) = &mut *root else {
            unreachable!("context root is always a mapping")
        };
        let Node::Mapping(update, _) = other else {
            unreachable!("merge source is always a mapping")
        };
        merge_into(into, update, overwrite)
    }

    /// Inserts `pairs` as local values, returning a guard that removes them
    /// when dropped. `reserve = true` fails immediately if any key already
    /// exists (used to protect `item`/`key` from a generated stage's own
    /// `vars`, see [`Context::check_not_reserved`] for the softer,
    /// warn-once path used by the per-iteration injection itself).
    pub fn set_temporarily(&self, pairs: Vec<(String, Node)>, reserve: bool) -> Result<TempGuard<'_>, ResolveErrorKind> {
        let mut root = self.root.borrow_mut();
        let map = root.as_mapping_mut().expect("context root is always a mapping");
        if reserve {
            for (key, _) in &pairs {
                if map.contains_key(key) {
                    return Err(ResolveErrorKind::ReservedKeyModified { key: key.clone() });
                }
            }
        }
        let mut keys = Vec::with_capacity(pairs.len());
        for (key, mut value) in pairs {
            *value.meta_mut() = Meta::local();
            keys.push(key.clone());
            map.insert(key, value);
        }
        drop(root);
        Ok(TempGuard { ctx: self, keys })
    }

    /// `true` if `key` is already bound at the top level — used by
    /// `foreach`/`matrix` to decide whether to emit the one-time
    /// pre-existing-key warning.
    pub fn has_top_level_key(&self, key: &str) -> bool {
        self.root
            .borrow()
            .as_mapping()
            .is_some_and(|m| m.contains_key(key))
    }

    /// Deep-copied context that shares nothing with `self`; `imports` is
    /// preserved, `tracked` is reset.
    pub fn clone_context(&self) -> Context {
        Context {
            root: RefCell::new(self.root.borrow().deep_clone()),
            tracking: RefCell::new(None),
            imports: RefCell::new(self.imports.borrow().clone()),
        }
    }

    pub fn imports(&self) -> std::cell::Ref<'_, ImportLog> {
        self.imports.borrow()
    }

    pub fn imports_mut(&self) -> std::cell::RefMut<'_, ImportLog> {
        self.imports.borrow_mut()
    }
}

impl Default for Context {
    fn default() -> Self {
        Context::new()
    }
}

fn select_in<'a>(node: &'a Node, segments: &[String]) -> Result<&'a Node, ResolveErrorKind> {
    let mut current = node;
    let mut consumed: Vec<String> = Vec::new();
    for segment in segments {
        consumed.push(segment.clone());
        current = match current {
            Node::Mapping(map, _) => map.get(segment).ok_or_else(|| ResolveErrorKind::KeyNotInContext {
                path: consumed.join("."),
            })?,
            Node::Sequence(items, _) => {
                let index: usize = segment.parse().map_err(|_| ResolveErrorKind::KeyNotInContext {
                    path: consumed.join("."),
                })?;
                items.get(index).ok_or_else(|| ResolveErrorKind::KeyNotInContext {
                    path: consumed.join("."),
                })?
            }
            Node::Scalar(..) => {
                return Err(ResolveErrorKind::KeyNotInContext { path: consumed.join(".") });
            }
        };
    }
    Ok(current)
}

/// `merge_update`'s recursive core.
fn merge_into(into: &mut NodeMap, update: NodeMap, overwrite: bool) -> Result<(), ResolveErrorKind> {
    for (key, value) in update {
        match into.get_mut(&key) {
            Some(existing @ Node::Mapping(_, _)) if matches!(value, Node::Mapping(_, _)) => {
                let Node::Mapping(existing_map, _) = existing else { unreachable!() };
                let Node::Mapping(value_map, _) = value else { unreachable!() };
                merge_into(existing_map, value_map, overwrite)?;
            }
            Some(existing) => {
                if overwrite {
                    *existing = value;
                } else {
                    let path = existing.meta().path();
                    return Err(ResolveErrorKind::merge_error(path, existing.meta(), value.meta()));
                }
            }
            None => {
                into.insert(key, value);
            }
        }
    }
    Ok(())
}

/// Build a `Node` tree out of an arbitrary `serde_json::Value`:
/// primitives/nulls become Scalars, arrays become Sequences, objects
/// become Mappings.
pub fn build_context_value(value: serde_json::Value, source: Option<Rc<str>>) -> Node {
    let mut node = Node::from_json(value, Meta::inline());
    node.stamp(source, &[], false);
    node
}

pub fn node_is_primitive(node: &Node) -> bool {
    matches!(node, Node::Scalar(..))
}

pub fn scalar_of(node: &Node) -> Option<&Scalar> {
    node.as_scalar()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx_from(value: serde_json::Value, source: &str) -> Context {
        let ctx = Context::new();
        let node = build_context_value(value, Some(Rc::from(source)));
        ctx.merge_update(node, false).unwrap();
        ctx
    }

    #[test]
    fn select_walks_mapping_and_sequence() {
        let ctx = ctx_from(json!({"dict": {"foo": "foo", "list": [1, 2, 3]}}), "params.yaml");
        let node = ctx.select(&["dict".into(), "list".into(), "1".into()]).unwrap();
        assert_eq!(node.as_scalar(), Some(&Scalar::Int(2)));
    }

    #[test]
    fn select_reports_dpath_matching_selection_path() {
        let ctx = ctx_from(json!({"a": {"b": {"c": 1}}}), "params.yaml");
        let node = ctx.select(&["a".into(), "b".into(), "c".into()]).unwrap();
        assert_eq!(node.meta().dpath, vec!["a", "b", "c"]);
    }

    #[test]
    fn missing_key_fails() {
        let ctx = ctx_from(json!({"a": 1}), "params.yaml");
        let err = ctx.select(&["b".into()]).unwrap_err();
        assert!(matches!(err, ResolveErrorKind::KeyNotInContext { .. }));
    }

    #[test]
    fn merge_without_overwrite_raises_on_collision() {
        let ctx = ctx_from(json!({"models": {"bar": "bar"}}), "params.yaml");
        let other = build_context_value(json!({"models": {"bar": "bar"}}), Some(Rc::from("params.json")));
        let err = ctx.merge_update(other, false).unwrap_err();
        match err {
            ResolveErrorKind::MergeError { key, existing_source, new_source } => {
                assert_eq!(key, "models.bar");
                assert_eq!(existing_source, "params.yaml");
                assert_eq!(new_source, "params.json");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn merge_recurses_through_nested_mappings() {
        let ctx = ctx_from(json!({"a": {"x": 1}}), "params.yaml");
        let other = build_context_value(json!({"a": {"y": 2}}), Some(Rc::from("params.yaml")));
        ctx.merge_update(other, false).unwrap();
        let node = ctx.select(&["a".into(), "y".into()]).unwrap();
        assert_eq!(node.as_scalar(), Some(&Scalar::Int(2)));
    }

    #[test]
    fn set_temporarily_removes_keys_on_drop() {
        let ctx = Context::new();
        {
            let _guard = ctx.set_temporarily(vec![("item".into(), Node::null())], false).unwrap();
            assert!(ctx.has_top_level_key("item"));
        }
        assert!(!ctx.has_top_level_key("item"));
    }

    #[test]
    fn reserve_fails_on_pre_existing_key() {
        let ctx = ctx_from(json!({"item": 1}), "vars.yaml");
        let err = ctx.set_temporarily(vec![("item".into(), Node::null())], true).unwrap_err();
        assert!(matches!(err, ResolveErrorKind::ReservedKeyModified { .. }));
    }

    #[test]
    fn clone_is_structurally_independent() {
        let ctx = ctx_from(json!({"a": 1}), "params.yaml");
        let clone = ctx.clone_context();
        let other = build_context_value(json!({"b": 2}), None);
        clone.merge_update(other, false).unwrap();
        assert!(ctx.select(&["b".into()]).is_err());
        assert!(clone.select(&["b".into()]).is_ok());
    }

    #[test]
    fn tracking_records_selected_sources() {
        let ctx = ctx_from(json!({"dict": {"foo": "foo", "bar": "bar"}}), "params.yaml");
        let (_, tracked) = ctx
            .track_scope(|| {
                ctx.select(&["dict".into(), "foo".into()]).map_err(ResolveError::from)?;
                ctx.select(&["dict".into(), "bar".into()]).map_err(ResolveError::from)?;
                Ok(())
            })
            .unwrap();
        let keys = &tracked.by_source["params.yaml"];
        assert!(keys.contains("dict.foo"));
        assert!(keys.contains("dict.bar"));
    }

    #[test]
    fn import_log_is_idempotent_for_same_subset() {
        let mut log = ImportLog::default();
        assert!(log.record("params.yaml", None).unwrap());
        assert!(!log.record("params.yaml", None).unwrap());
        let mut subset = BTreeSet::new();
        subset.insert("foo".to_string());
        assert!(log.record("params.yaml", Some(&subset)).is_err());
    }
}
