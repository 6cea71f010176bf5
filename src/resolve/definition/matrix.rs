//! Matrix Definition: Cartesian product across a mapping of axes, each
//! combination becoming a stage.

use std::cell::{Cell, RefCell};
use std::collections::HashSet;

use crate::resolve::context::Context;
use crate::resolve::definition::stage::resolve_stage;
use crate::resolve::definition::{Definition, ResolveSettings, ResolvedEntries};
use crate::resolve::error::{ResolveError, ResolveErrorKind};
use crate::resolve::interpolate::{check_recursive_parse_errors, resolve_str};
use crate::resolve::node::{Meta, Node, NodeMap, Scalar};

pub struct MatrixDefinition {
    pub axes: Node,
    pub name_template: Option<String>,
    pub rest: NodeMap,
    checked: Cell<bool>,
    warned: RefCell<bool>,
}

struct Combo {
    key: String,
    value: NodeMap,
}

impl MatrixDefinition {
    pub fn new(axes: Node, name_template: Option<String>, rest: NodeMap) -> Self {
        MatrixDefinition { axes, name_template, rest, checked: Cell::new(false), warned: RefCell::new(false) }
    }

    fn ensure_template_checked(&self) -> Result<(), ResolveErrorKind> {
        if !self.checked.get() {
            check_recursive_parse_errors(&Node::Mapping(self.rest.clone(), Meta::inline()))?;
            self.checked.set(true);
        }
        Ok(())
    }

    /// After interpolation (which may turn `"${models}"` into a concrete
    /// mapping), verify the axes value is a Mapping of Sequences.
    fn resolved_axes(&self, ctx: &Context) -> Result<Vec<(String, Vec<Node>)>, ResolveErrorKind> {
        let resolved = match &self.axes {
            Node::Scalar(Scalar::String(s), _) => resolve_str(s, ctx, false)?,
            other => other.clone(),
        };
        let Node::Mapping(map, _) = resolved else {
            return Err(ResolveErrorKind::UnsupportedType { path: "matrix".to_string() });
        };
        let mut out = Vec::with_capacity(map.len());
        for (name, value) in map {
            let Node::Sequence(items, _) = value else {
                return Err(ResolveErrorKind::UnsupportedType { path: format!("matrix.{name}") });
            };
            out.push((name, items));
        }
        Ok(out)
    }

    fn warn_if_overwriting(&self, ctx: &Context, parent_name: &str) {
        if *self.warned.borrow() {
            return;
        }
        if ctx.has_top_level_key("item") || ctx.has_top_level_key("key") {
            use colored::Colorize;
            let message = format!(
                "warning: matrix '{parent_name}' shadows an existing 'item'/'key' variable for the duration of each combination"
            );
            eprintln!("{}", message.yellow());
            *self.warned.borrow_mut() = true;
        }
    }
}

/// Cartesian product across `axes`, preserving declaration order — the
/// first axis varies slowest.
fn enumerate(axes: &[(String, Vec<Node>)]) -> Vec<Combo> {
    let mut combos: Vec<Vec<(String, Node, usize)>> = vec![Vec::new()];
    for (name, items) in axes {
        let mut next = Vec::with_capacity(combos.len() * items.len().max(1));
        for combo in &combos {
            for (idx, value) in items.iter().enumerate() {
                let mut extended = combo.clone();
                extended.push((name.clone(), value.clone(), idx));
                next.push(extended);
            }
        }
        combos = next;
    }

    combos
        .into_iter()
        .map(|fragments| {
            let key = fragments
                .iter()
                .map(|(name, value, idx)| {
                    if value.is_primitive() {
                        value.as_scalar().unwrap().to_display_string()
                    } else {
                        format!("{name}{idx}")
                    }
                })
                .collect::<Vec<_>>()
                .join("-");
            let mut value = NodeMap::new();
            for (name, v, _) in fragments {
                value.insert(name, v);
            }
            Combo { key, value }
        })
        .collect()
}

impl Definition for MatrixDefinition {
    fn generated_names(&self, parent_name: &str) -> Vec<String> {
        match self.resolved_axes_literal() {
            Some(axes) => enumerate(&axes).into_iter().map(|c| format!("{parent_name}@{}", c.key)).collect(),
            None => Vec::new(),
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
        let axes = self
            .resolved_axes(ctx)
            .map_err(|e| ResolveError::wrap(e, &format!("stages.{parent_name}.matrix"), settings.doc_file))?;
        self.warn_if_overwriting(ctx, parent_name);

        let combos = enumerate(&axes);
        let mut seen = HashSet::new();
        let mut out = Vec::with_capacity(combos.len());

        for combo in combos {
            let item_node = Node::Mapping(combo.value, Meta::inline());
            let temp = vec![
                ("item".to_string(), item_node),
                ("key".to_string(), Node::Scalar(Scalar::String(combo.key.clone()), Meta::inline())),
            ];
            let guard = ctx
                .set_temporarily(temp, false)
                .map_err(|e| ResolveError::wrap(e, &format!("stages.{parent_name}"), settings.doc_file))?;

            let stage_name = match &self.name_template {
                Some(template) => {
                    let resolved = resolve_str(template, ctx, true)
                        .map_err(|e| ResolveError::wrap(e, &format!("stages.{parent_name}.name"), settings.doc_file))?;
                    let Node::Scalar(scalar, _) = resolved else {
                        return Err(ResolveError::wrap(
                            ResolveErrorKind::UnsupportedType { path: "matrix.name".to_string() },
                            &format!("stages.{parent_name}.name"),
                            settings.doc_file,
                        ));
                    };
                    let name = scalar.to_display_string();
                    if name.contains('@') {
                        return Err(ResolveError::wrap(
                            ResolveErrorKind::Other(format!("matrix stage name '{name}' must not contain '@'")),
                            &format!("stages.{parent_name}.name"),
                            settings.doc_file,
                        ));
                    }
                    name
                }
                None => format!("{parent_name}@{}", combo.key),
            };

            if !seen.insert(stage_name.clone()) {
                drop(guard);
                return Err(ResolveError::wrap(
                    ResolveErrorKind::DuplicateName { name: stage_name },
                    &format!("stages.{parent_name}"),
                    settings.doc_file,
                ));
            }

            let (resolved, _tracked) = resolve_stage(
                settings.fs,
                ctx,
                &stage_name,
                &self.rest,
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

impl MatrixDefinition {
    /// Best-effort names for `get_keys()`-style enumeration when the axes
    /// are given literally (no placeholder). Matrices whose axes come from
    /// an interpolated reference can only be named by going through
    /// `resolve_all` against a live context.
    fn resolved_axes_literal(&self) -> Option<Vec<(String, Vec<Node>)>> {
        let Node::Mapping(map, _) = &self.axes else { return None };
        let mut out = Vec::with_capacity(map.len());
        for (name, value) in map {
            let Node::Sequence(items, _) = value else { return None };
            out.push((name.clone(), items.clone()));
        }
        Some(out)
    }
}
