//! Stage Definition: resolves one ordinary stage.

use std::collections::BTreeMap;
use std::ops::Deref;
use std::path::{Path, PathBuf};

use crate::fs::FileSystem;
use crate::resolve::cmd_dict::expand_cmd_dict;
use crate::resolve::context::{Context, Tracked};
use crate::resolve::definition::{Definition, ResolveSettings, ResolvedEntries};
use crate::resolve::error::{ResolveError, ResolveErrorKind};
use crate::resolve::interpolate::{check_recursive_parse_errors, resolve_value, ParsingConfig};
use crate::resolve::loader::{load_from_vars, parse_vars_field, VarsEntry};
use crate::resolve::node::{Meta, Node, NodeMap, Scalar};
use crate::resolve::template::is_interpolated;

/// Either a borrowed context (no local `vars`) or one owned by this stage
/// resolution (cloned because local `vars` were declared). Lets
/// `resolve_stage` use a single `&Context` at the call site either way.
enum CtxRef<'a> {
    Borrowed(&'a Context),
    Owned(Context),
}

impl Deref for CtxRef<'_> {
    type Target = Context;
    fn deref(&self) -> &Context {
        match self {
            CtxRef::Borrowed(c) => c,
            CtxRef::Owned(c) => c,
        }
    }
}

pub struct StageDefinition {
    pub raw: NodeMap,
}

impl Definition for StageDefinition {
    fn generated_names(&self, parent_name: &str) -> Vec<String> {
        vec![parent_name.to_string()]
    }

    fn resolve_all(
        &self,
        parent_name: &str,
        ctx: &Context,
        settings: &ResolveSettings,
    ) -> Result<ResolvedEntries, ResolveError> {
        let (resolved, _tracked) = resolve_stage(
            settings.fs,
            ctx,
            parent_name,
            &self.raw,
            settings.wdir,
            settings.default_params_path,
            settings.doc_file,
            &settings.parsing,
            false,
            false,
            &format!("stages.{parent_name}"),
        )?;
        Ok(vec![(parent_name.to_string(), resolved)])
    }
}

/// Entries a generated (`foreach`/`matrix`) stage's own `vars` block may not
/// introduce — `item`/`key` are reserved for the generator's own binding.
pub fn check_not_reserved(entries: &[VarsEntry]) -> Result<(), ResolveErrorKind> {
    for entry in entries {
        if let VarsEntry::Inline(Node::Mapping(map, _)) = entry {
            for key in map.keys() {
                if key == "item" || key == "key" {
                    return Err(ResolveErrorKind::ReservedKeyModified { key: key.clone() });
                }
            }
        }
    }
    Ok(())
}

/// `vars` lists must be free of placeholders themselves.
fn check_interpolations_forbidden(node: &Node) -> Result<(), ResolveErrorKind> {
    match node {
        Node::Scalar(Scalar::String(s), _) => {
            if is_interpolated(s) {
                return Err(ResolveErrorKind::InterpolationForbidden { where_: "a 'vars' entry" });
            }
            Ok(())
        }
        Node::Scalar(..) => Ok(()),
        Node::Sequence(items, _) => items.iter().try_for_each(check_interpolations_forbidden),
        Node::Mapping(map, _) => map.values().try_for_each(check_interpolations_forbidden),
    }
}

/// Resolves one stage's raw fields against `ctx`. `name` is the concrete
/// stage name (e.g. `build@win-3.7`), used to build the `stages.<name>.<field>`
/// path a per-field error is reported against; `section` is the coarser
/// `stages.<name>` path used for errors that span the whole stage rather
/// than one field. `is_generated` marks a stage produced by `foreach`/
/// `matrix` (enables the reserved-key check); `skip_checks` skips the
/// recursive parse-error sweep because the owning Foreach/Matrix
/// Definition already ran it once on the shared `do` template.
#[allow(clippy::too_many_arguments)]
pub fn resolve_stage(
    fs: &dyn FileSystem,
    ctx: &Context,
    name: &str,
    raw: &NodeMap,
    wdir_base: &Path,
    default_params_path: &str,
    doc_file: &str,
    parsing: &ParsingConfig,
    is_generated: bool,
    skip_checks: bool,
    section: &str,
) -> Result<(Node, Tracked), ResolveError> {
    let wrap_whole = |kind: ResolveErrorKind| ResolveError::wrap(kind, section, doc_file);
    let wrap = |field: &str, kind: ResolveErrorKind| ResolveError::wrap(kind, &format!("stages.{name}.{field}"), doc_file);

    if !skip_checks {
        check_recursive_parse_errors(&Node::Mapping(raw.clone(), Meta::inline())).map_err(wrap_whole)?;
    }

    let mut fields = raw.clone();

    let wdir_path: PathBuf = match fields.get("wdir").cloned() {
        Some(node) => {
            let resolved = resolve_value(&node, ctx).map_err(|e| wrap("wdir", e))?;
            let Node::Scalar(scalar, _) = &resolved else {
                return Err(wrap("wdir", ResolveErrorKind::UnsupportedType { path: "wdir".to_string() }));
            };
            let rel = scalar.to_display_string();
            fields.insert("wdir".to_string(), resolved);
            wdir_base.join(rel)
        }
        None => wdir_base.to_path_buf(),
    };

    let vars_node = fields.shift_remove("vars");
    if let Some(v) = &vars_node {
        check_interpolations_forbidden(v).map_err(|e| wrap("vars", e))?;
    }

    let effective_ctx: CtxRef = match &vars_node {
        Some(v) => {
            let entries = parse_vars_field(v).map_err(|e| wrap("vars", e))?;
            if entries.is_empty() {
                CtxRef::Borrowed(ctx)
            } else {
                if is_generated {
                    check_not_reserved(&entries).map_err(|e| wrap("vars", e))?;
                }
                let cloned = ctx.clone_context();
                load_from_vars(fs, &cloned, &entries, &wdir_path, default_params_path).map_err(|e| wrap("vars", e))?;
                CtxRef::Owned(cloned)
            }
        }
        None => CtxRef::Borrowed(ctx),
    };

    let (resolved_map, tracked) = effective_ctx.track_scope(|| {
        let mut out = NodeMap::new();
        for (key, value) in &fields {
            if key == "wdir" {
                out.insert(key.clone(), value.clone());
                continue;
            }
            let mut resolved = resolve_value(value, &effective_ctx).map_err(|e| wrap(key, e))?;
            if key == "cmd" {
                if let Node::Mapping(map, meta) = &resolved {
                    let flags = expand_cmd_dict(map, parsing).map_err(|e| wrap(key, e))?;
                    resolved = Node::Scalar(Scalar::String(flags), meta.clone());
                }
            }
            out.insert(key.clone(), resolved);
        }
        Ok(Node::Mapping(out, Meta::inline()))
    })?;

    let Node::Mapping(mut out, meta) = resolved_map else { unreachable!() };
    let params_field = synthesize_params(&tracked, out.shift_remove("params"));
    if let Some(params_field) = params_field {
        out.insert("params".to_string(), params_field);
    }

    Ok((Node::Mapping(out, meta), tracked))
}

/// Params auto-tracking: merge the sources/keys consulted while resolving
/// this stage with any user-supplied `params` entries, deduplicating
/// `(source, key)` pairs.
fn synthesize_params(tracked: &Tracked, user_params: Option<Node>) -> Option<Node> {
    let mut by_source: BTreeMap<String, std::collections::BTreeSet<String>> = tracked.by_source.clone();

    if let Some(Node::Sequence(entries, _)) = &user_params {
        for entry in entries {
            match entry {
                Node::Scalar(scalar, _) => {
                    by_source.entry(String::new()).or_default().insert(scalar.to_display_string());
                }
                Node::Mapping(map, _) => {
                    for (file, keys) in map {
                        if let Node::Sequence(keys, _) = keys {
                            let set = by_source.entry(file.clone()).or_default();
                            for k in keys {
                                if let Node::Scalar(scalar, _) = k {
                                    set.insert(scalar.to_display_string());
                                }
                            }
                        }
                    }
                }
                _ => {}
            }
        }
    }

    if by_source.is_empty() {
        return None;
    }

    let mut out = Vec::with_capacity(by_source.len());
    for (source, keys) in by_source {
        if source.is_empty() {
            for key in keys {
                out.push(Node::Scalar(Scalar::String(key), Meta::inline()));
            }
            continue;
        }
        let mut entry = NodeMap::new();
        let key_nodes = keys.into_iter().map(|k| Node::Scalar(Scalar::String(k), Meta::inline())).collect();
        entry.insert(source, Node::Sequence(key_nodes, Meta::inline()));
        out.push(Node::Mapping(entry, Meta::inline()));
    }
    Some(Node::Sequence(out, Meta::inline()))
}
