//! Foreach Definition: expands `{foreach: <value>, do: <template>}` over a
//! sequence or mapping.

use std::cell::{Cell, RefCell};

use crate::resolve::context::Context;
use crate::resolve::definition::stage::resolve_stage;
use crate::resolve::definition::{Definition, ResolveSettings, ResolvedEntries};
use crate::resolve::error::{ResolveError, ResolveErrorKind};
use crate::resolve::interpolate::{check_recursive_parse_errors, resolve_str};
use crate::resolve::node::{Meta, Node, NodeMap, Scalar};

pub struct ForeachDefinition {
    pub foreach: Node,
    pub do_template: NodeMap,
    /// Run the template syntax check once, not once per generated stage.
    checked: Cell<bool>,
    warned: RefCell<bool>,
}

/// One entry of the normalized iterable.
struct IterationPair {
    key: String,
    value: Node,
}

impl ForeachDefinition {
    pub fn new(foreach: Node, do_template: NodeMap) -> Self {
        ForeachDefinition { foreach, do_template, checked: Cell::new(false), warned: RefCell::new(false) }
    }

    fn ensure_template_checked(&self) -> Result<(), ResolveErrorKind> {
        if !self.checked.get() {
            check_recursive_parse_errors(&Node::Mapping(self.do_template.clone(), Meta::inline()))?;
            self.checked.set(true);
        }
        Ok(())
    }

    /// Resolves the `foreach:` value into a list of `(key, item)` pairs,
    /// in declaration order.
    fn resolved_iterable(&self, ctx: &Context) -> Result<Vec<IterationPair>, ResolveErrorKind> {
        let resolved = match &self.foreach {
            Node::Scalar(Scalar::String(s), _) => resolve_str(s, ctx, false)?,
            other => other.clone(),
        };
        normalize(resolved)
    }

    fn warn_if_overwriting(&self, ctx: &Context, parent_name: &str, uses_key: bool) {
        if *self.warned.borrow() {
            return;
        }
        let overwritten = ctx.has_top_level_key("item") || (uses_key && ctx.has_top_level_key("key"));
        if overwritten {
            use colored::Colorize;
            let message = format!(
                "warning: foreach '{parent_name}' shadows an existing 'item'/'key' variable for the duration of each iteration"
            );
            eprintln!("{}", message.yellow());
            *self.warned.borrow_mut() = true;
        }
    }
}

/// Mapping: keys stringified as-is. Sequence of primitives: each value
/// becomes both key and value. Sequence with at least one composite: the
/// zero-based index becomes the key.
fn normalize(node: Node) -> Result<Vec<IterationPair>, ResolveErrorKind> {
    match node {
        Node::Mapping(map, _) => Ok(map
            .into_iter()
            .map(|(key, value)| IterationPair { key, value })
            .collect()),
        Node::Sequence(items, _) => {
            let all_primitive = items.iter().all(Node::is_primitive);
            Ok(items
                .into_iter()
                .enumerate()
                .map(|(i, value)| {
                    let key = if all_primitive {
                        value.as_scalar().map(Scalar::to_display_string).unwrap_or_default()
                    } else {
                        i.to_string()
                    };
                    IterationPair { key, value }
                })
                .collect())
        }
        other => Err(ResolveErrorKind::ForeachExpectsCollection { type_name: other.type_name() }),
    }
}

impl Definition for ForeachDefinition {
    fn generated_names(&self, parent_name: &str) -> Vec<String> {
        // Cheap path: iterable normalization without a live context only
        // works for literal (non-placeholder) `foreach` values; callers
        // needing names against a resolved iterable should go through
        // `resolve_all` and take the returned names instead.
        match normalize(self.foreach.clone()) {
            Ok(pairs) => pairs.into_iter().map(|p| format!("{parent_name}@{}", p.key)).collect(),
            Err(_) => Vec::new(),
        }
    }

    fn resolve_all(
        &self,
        parent_name: &str,
        ctx: &Context,
        settings: &ResolveSettings,
    ) -> Result<ResolvedEntries, ResolveError> {
        self.ensure_template_checked()
            .map_err(|e| ResolveError::wrap(e, &format!("stages.{parent_name}"), settings.doc_file))?;
        let pairs = self
            .resolved_iterable(ctx)
            .map_err(|e| ResolveError::wrap(e, &format!("stages.{parent_name}.foreach"), settings.doc_file))?;

        let uses_key = matches!(&self.foreach, Node::Mapping(..));
        self.warn_if_overwriting(ctx, parent_name, uses_key);

        let mut out = Vec::with_capacity(pairs.len());
        for pair in pairs {
            let stage_name = format!("{parent_name}@{}", pair.key);
            let mut temp = vec![("item".to_string(), pair.value)];
            if uses_key {
                temp.push(("key".to_string(), Node::Scalar(Scalar::String(pair.key.clone()), Meta::inline())));
            }
            let guard = ctx
                .set_temporarily(temp, false)
                .map_err(|e| ResolveError::wrap(e, &format!("stages.{stage_name}"), settings.doc_file))?;
            let (resolved, _tracked) = resolve_stage(
                settings.fs,
                ctx,
                &stage_name,
                &self.do_template,
                settings.wdir,
                settings.default_params_path,
                settings.doc_file,
                &settings.parsing,
                true,
                true,
                &format!("stages.{stage_name}"),
            )?;
            drop(guard);
            out.push((stage_name, resolved));
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::fake::FakeFileSystem;
    use serde_json::json;

    fn settings<'a>(fs: &'a FakeFileSystem, wdir: &'a std::path::Path) -> ResolveSettings<'a> {
        ResolveSettings {
            fs,
            wdir,
            default_params_path: "params.yaml",
            doc_file: "dvc.yaml",
            parsing: Default::default(),
        }
    }

    #[test]
    fn foreach_over_list_expands_to_one_stage_per_item() {
        let ctx = Context::new();
        let fs = FakeFileSystem::new();
        let wdir = std::path::Path::new("");
        let foreach = Node::from_json(json!(["foo", "bar", "baz"]), Meta::inline());
        let do_template = Node::from_json(json!({"cmd": "python script.py ${item}"}), Meta::inline())
            .as_mapping()
            .unwrap()
            .clone();
        let def = ForeachDefinition::new(foreach, do_template);
        let entries = def.resolve_all("build", &ctx, &settings(&fs, wdir)).unwrap();
        let names: Vec<_> = entries.iter().map(|(n, _)| n.clone()).collect();
        assert_eq!(names, vec!["build@foo", "build@bar", "build@baz"]);
        assert_eq!(
            entries[0].1.as_mapping().unwrap()["cmd"].as_scalar().unwrap().to_display_string(),
            "python script.py foo"
        );
    }

    #[test]
    fn foreach_over_mapping_binds_item_per_entry() {
        let ctx = Context::new();
        let fs = FakeFileSystem::new();
        let wdir = std::path::Path::new("");
        let foreach = Node::from_json(json!({"us": {"thresh": 10}, "gb": {"thresh": 15}}), Meta::inline());
        let do_template = Node::from_json(json!({"cmd": "python script.py ${item.thresh}"}), Meta::inline())
            .as_mapping()
            .unwrap()
            .clone();
        let def = ForeachDefinition::new(foreach, do_template);
        let entries = def.resolve_all("build", &ctx, &settings(&fs, wdir)).unwrap();
        let by_name: std::collections::HashMap<_, _> = entries.into_iter().collect();
        assert_eq!(
            by_name["build@us"].as_mapping().unwrap()["cmd"].as_scalar().unwrap().to_display_string(),
            "python script.py 10"
        );
        assert_eq!(
            by_name["build@gb"].as_mapping().unwrap()["cmd"].as_scalar().unwrap().to_display_string(),
            "python script.py 15"
        );
    }

    #[test]
    fn foreach_over_empty_collection_produces_zero_stages() {
        let ctx = Context::new();
        let fs = FakeFileSystem::new();
        let wdir = std::path::Path::new("");
        let def = ForeachDefinition::new(Node::from_json(json!([]), Meta::inline()), NodeMap::new());
        let entries = def.resolve_all("build", &ctx, &settings(&fs, wdir)).unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn foreach_over_scalar_fails() {
        let ctx = Context::new();
        let fs = FakeFileSystem::new();
        let wdir = std::path::Path::new("");
        let def = ForeachDefinition::new(Node::Scalar(Scalar::Int(1), Meta::inline()), NodeMap::new());
        let err = def.resolve_all("build", &ctx, &settings(&fs, wdir)).unwrap_err();
        assert!(matches!(err.kind(), ResolveErrorKind::ForeachExpectsCollection { .. }));
    }

    #[test]
    fn item_does_not_leak_outside_iteration() {
        let ctx = Context::new();
        let fs = FakeFileSystem::new();
        let wdir = std::path::Path::new("");
        let foreach = Node::from_json(json!(["a"]), Meta::inline());
        let do_template = Node::from_json(json!({"cmd": "${item}"}), Meta::inline()).as_mapping().unwrap().clone();
        let def = ForeachDefinition::new(foreach, do_template);
        def.resolve_all("build", &ctx, &settings(&fs, wdir)).unwrap();
        assert!(!ctx.has_top_level_key("item"));
    }
}
