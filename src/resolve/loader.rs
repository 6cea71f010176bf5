//! Parameter Loader: resolves a `vars` entry (file reference or inline
//! mapping) into a context subtree annotated with its source.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::fs::FileSystem;
use crate::formats::loader_for_extension;
use crate::resolve::context::Context;
use crate::resolve::error::ResolveErrorKind;
use crate::resolve::node::{Node, NodeMap};

/// One element of a `vars:` list, before parsing.
#[derive(Debug, Clone)]
pub enum VarsEntry {
    /// `"params.yaml"` or `"params.yaml:foo,bar"`.
    Path(String),
    /// An inline mapping given directly in the document.
    Inline(Node),
}

/// `path[:key1,key2,...]`, split apart.
struct ParsedRef {
    path: String,
    keys: Option<BTreeSet<String>>,
}

fn split_keys(entry: &str) -> ParsedRef {
    match entry.split_once(':') {
        Some((path, keys)) => ParsedRef {
            path: path.to_string(),
            keys: Some(keys.split(',').map(|k| k.trim().to_string()).collect()),
        },
        None => ParsedRef { path: entry.to_string(), keys: None },
    }
}

/// Loads every `vars:` entry into `context`, or the default params file if
/// `vars` was empty and the default file exists.
pub fn load_from_vars(
    fs: &dyn FileSystem,
    context: &Context,
    vars: &[VarsEntry],
    wdir: &Path,
    default_path: &str,
) -> Result<(), ResolveErrorKind> {
    if vars.is_empty() {
        let default_file = fs.join(wdir, default_path);
        if fs.exists(&default_file) {
            load_one_path(fs, context, default_path, None, wdir)?;
        }
        return Ok(());
    }

    for entry in vars {
        match entry {
            VarsEntry::Path(raw) => {
                let parsed = split_keys(raw);
                load_one_path(fs, context, &parsed.path, parsed.keys.as_ref(), wdir)?;
            }
            VarsEntry::Inline(node) => {
                let mut stamped = node.clone();
                stamped.stamp(None, &[], false);
                context.merge_update(stamped, false)?;
            }
        }
    }
    Ok(())
}

fn load_one_path(
    fs: &dyn FileSystem,
    context: &Context,
    path: &str,
    keys: Option<&BTreeSet<String>>,
    wdir: &Path,
) -> Result<(), ResolveErrorKind> {
    let resolved = fs.normpath(&fs.join(wdir, path));

    if !fs.exists(&resolved) || fs.is_dir(&resolved) {
        return Err(ResolveErrorKind::ParamsLoadError { path: resolved });
    }

    let is_new = context.imports_mut().record(path, keys)?;
    if !is_new {
        return Ok(());
    }

    let node = parse_file(fs, &resolved, path)?;
    let projected = project_keys(node, keys, path)?;

    let source: Rc<str> = Rc::from(path);
    let mut stamped = projected;
    stamped.stamp(Some(source), &[], false);
    context.merge_update(stamped, false)
}

fn parse_file(fs: &dyn FileSystem, resolved: &PathBuf, display_path: &str) -> Result<Node, ResolveErrorKind> {
    let ext = resolved
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();
    let loader = loader_for_extension(ext).ok_or_else(|| ResolveErrorKind::FileCorrupted {
        path: resolved.clone(),
        reason: format!("unrecognized file extension '{ext}'"),
    })?;
    let contents = fs.read_to_string(resolved).map_err(|e| ResolveErrorKind::FileCorrupted {
        path: resolved.clone(),
        reason: e.to_string(),
    })?;
    loader.parse(&contents).map_err(|reason| ResolveErrorKind::FileCorrupted {
        path: PathBuf::from(display_path),
        reason,
    })
}

fn project_keys(node: Node, keys: Option<&BTreeSet<String>>, file: &str) -> Result<Node, ResolveErrorKind> {
    let Some(keys) = keys else { return Ok(node) };
    let Node::Mapping(map, meta) = node else {
        return Err(ResolveErrorKind::VarsKeyNotFound {
            file: file.to_string(),
            key: keys.iter().next().cloned().unwrap_or_default(),
        });
    };
    let mut projected = NodeMap::new();
    for key in keys {
        match map.get(key) {
            Some(value) => {
                projected.insert(key.clone(), value.clone());
            }
            None => {
                return Err(ResolveErrorKind::VarsKeyNotFound {
                    file: file.to_string(),
                    key: key.clone(),
                });
            }
        }
    }
    Ok(Node::Mapping(projected, meta))
}

/// Interpret raw document nodes under `vars:` as a list of [`VarsEntry`].
pub fn parse_vars_field(node: &Node) -> Result<Vec<VarsEntry>, ResolveErrorKind> {
    let Node::Sequence(items, _) = node else {
        return Err(ResolveErrorKind::UnsupportedType { path: "vars".to_string() });
    };
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Node::Scalar(scalar, _) => out.push(VarsEntry::Path(scalar.to_display_string())),
            Node::Mapping(..) => out.push(VarsEntry::Inline(item.clone())),
            Node::Sequence(..) => return Err(ResolveErrorKind::UnsupportedType { path: "vars".to_string() }),
        }
    }
    Ok(out)
}
