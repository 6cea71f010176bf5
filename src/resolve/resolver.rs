//! Top-Level Resolver: the orchestrator. Loads the document's global
//! `vars`, builds a Definition per stage entry, and exposes both lazy
//! per-stage and eager top-level resolution.

use std::collections::BTreeMap;
use std::path::Path;

use indexmap::IndexMap;

use crate::fs::FileSystem;
use crate::resolve::context::Context;
use crate::resolve::definition::foreach::ForeachDefinition;
use crate::resolve::definition::matrix::MatrixDefinition;
use crate::resolve::definition::stage::StageDefinition;
use crate::resolve::definition::{Definition, ResolveSettings};
use crate::resolve::error::{ResolveError, ResolveErrorKind};
use crate::resolve::interpolate::{resolve_value, ParsingConfig};
use crate::resolve::loader::{load_from_vars, parse_vars_field};
use crate::resolve::node::{Meta, Node, NodeMap};

/// One of the three Definition kinds, dispatched by which keys a raw
/// `stages.<name>` entry carries.
enum AnyDefinition {
    Stage(StageDefinition),
    Foreach(ForeachDefinition),
    Matrix(MatrixDefinition),
}

impl AnyDefinition {
    fn as_definition(&self) -> &dyn Definition {
        match self {
            AnyDefinition::Stage(d) => d,
            AnyDefinition::Foreach(d) => d,
            AnyDefinition::Matrix(d) => d,
        }
    }
}

/// Splits `parent`/`matrix`/`foreach` out of a raw stage Mapping and picks
/// the Definition kind. `matrix`/`foreach` blocks are never required to be
/// mappings elsewhere in the raw document, so the field is kept whole.
fn build_definition(raw: NodeMap) -> AnyDefinition {
    let mut raw = raw;
    let has_foreach = raw.contains_key("foreach") && raw.contains_key("do");
    let has_matrix = raw.contains_key("matrix") && !has_foreach;

    if has_foreach {
        let foreach = raw.shift_remove("foreach").unwrap();
        let do_node = raw.shift_remove("do").unwrap();
        let do_template = do_node.as_mapping().cloned().unwrap_or_default();
        AnyDefinition::Foreach(ForeachDefinition::new(foreach, do_template))
    } else if has_matrix {
        let matrix = raw.shift_remove("matrix").unwrap();
        let name_template = raw.shift_remove("name").and_then(|n| match n {
            Node::Scalar(s, _) => Some(s.to_display_string()),
            _ => None,
        });
        AnyDefinition::Matrix(MatrixDefinition::new(matrix, name_template, raw))
    } else {
        AnyDefinition::Stage(StageDefinition { raw })
    }
}

pub struct DataResolver<'a> {
    fs: &'a dyn FileSystem,
    wdir: &'a Path,
    doc_file: &'a str,
    default_params_path: &'a str,
    parsing: ParsingConfig,
    context: Context,
    definitions: IndexMap<String, AnyDefinition>,
    artifacts: Option<Node>,
    datasets: Option<Node>,
    metrics: Option<Node>,
    params: Option<Node>,
    plots: Option<Node>,
    tracked: std::cell::RefCell<BTreeMap<String, BTreeMap<String, std::collections::BTreeSet<String>>>>,
}

impl<'a> DataResolver<'a> {
    /// Root context is created empty at construction, then populated from
    /// global `vars`.
    pub fn new(
        fs: &'a dyn FileSystem,
        wdir: &'a Path,
        doc_file: &'a str,
        default_params_path: &'a str,
        parsing: ParsingConfig,
        document: &Node,
    ) -> Result<Self, ResolveError> {
        let wrap = |kind: ResolveErrorKind| ResolveError::wrap(kind, "vars", doc_file);
        let context = Context::new();

        let doc = document.as_mapping().cloned().unwrap_or_default();

        if let Some(vars_node) = doc.get("vars") {
            let entries = parse_vars_field(vars_node).map_err(wrap)?;
            load_from_vars(fs, &context, &entries, wdir, default_params_path).map_err(wrap)?;
        }

        let mut definitions = IndexMap::new();
        if let Some(Node::Mapping(stages, _)) = doc.get("stages") {
            for (name, raw) in stages {
                let raw_map = raw.as_mapping().cloned().unwrap_or_default();
                definitions.insert(name.clone(), build_definition(raw_map));
            }
        }

        Ok(DataResolver {
            fs,
            wdir,
            doc_file,
            default_params_path,
            parsing,
            context,
            definitions,
            artifacts: doc.get("artifacts").cloned(),
            datasets: doc.get("datasets").cloned(),
            metrics: doc.get("metrics").cloned(),
            params: doc.get("params").cloned(),
            plots: doc.get("plots").cloned(),
            tracked: std::cell::RefCell::new(BTreeMap::new()),
        })
    }

    fn settings(&self) -> ResolveSettings<'_> {
        ResolveSettings {
            fs: self.fs,
            wdir: self.wdir,
            default_params_path: self.default_params_path,
            doc_file: self.doc_file,
            parsing: self.parsing,
        }
    }

    /// Resolves one entry, where `name` is either a plain stage name or
    /// `parent@suffix`.
    pub fn resolve_one(&self, name: &str) -> Result<Node, ResolveError> {
        let parent = name.split('@').next().unwrap_or(name);
        let Some(def) = self.definitions.get(parent) else {
            return Err(ResolveError::from(ResolveErrorKind::EntryNotFound { name: name.to_string() }));
        };
        let settings = self.settings();
        let resolved = def.as_definition().resolve_member(parent, name, &self.context, &settings)?;
        match resolved {
            Some((_, node)) => Ok(node),
            None => Err(ResolveError::from(ResolveErrorKind::EntryNotFound { name: name.to_string() })),
        }
    }

    /// Resolves every concrete stage, expanding all generators.
    pub fn resolve_all(&self) -> Result<IndexMap<String, Node>, ResolveError> {
        let settings = self.settings();
        let mut out = IndexMap::new();
        for (parent, def) in &self.definitions {
            for (name, node) in def.as_definition().resolve_all(parent, &self.context, &settings)? {
                out.insert(name, node);
            }
        }
        Ok(out)
    }

    fn resolve_section(&self, section: &str, node: &Node) -> Result<Node, ResolveError> {
        resolve_value(node, &self.context).map_err(|e| ResolveError::wrap(e, section, self.doc_file))
    }

    pub fn resolve_artifacts(&self) -> Result<Node, ResolveError> {
        match &self.artifacts {
            Some(node) => self.resolve_section("artifacts", node),
            None => Ok(Node::empty_mapping()),
        }
    }

    pub fn resolve_datasets(&self) -> Result<Node, ResolveError> {
        match &self.datasets {
            Some(node) => self.resolve_section("datasets", node),
            None => Ok(Node::Sequence(Vec::new(), Meta::inline())),
        }
    }

    pub fn resolve_metrics(&self) -> Result<Node, ResolveError> {
        match &self.metrics {
            Some(node) => self.resolve_section("metrics", node),
            None => Ok(Node::Sequence(Vec::new(), Meta::inline())),
        }
    }

    pub fn resolve_params(&self) -> Result<Node, ResolveError> {
        match &self.params {
            Some(node) => self.resolve_section("params", node),
            None => Ok(Node::Sequence(Vec::new(), Meta::inline())),
        }
    }

    pub fn resolve_plots(&self) -> Result<Node, ResolveError> {
        match &self.plots {
            Some(node) => self.resolve_section("plots", node),
            None => Ok(Node::Sequence(Vec::new(), Meta::inline())),
        }
    }

    /// Concrete stage names, expanding generators via their
    /// `generated_names()`.
    pub fn get_keys(&self) -> Vec<String> {
        let mut out = Vec::new();
        for (parent, def) in &self.definitions {
            out.extend(def.as_definition().generated_names(parent));
        }
        out
    }

    pub fn has_key(&self, name: &str) -> bool {
        let parent = name.split('@').next().unwrap_or(name);
        match self.definitions.get(parent) {
            Some(def) => def.as_definition().has_member(parent, name),
            None => false,
        }
    }

    /// Set during the most recent resolution of `name` via
    /// [`DataResolver::resolve_one_tracking`].
    pub fn tracked_vars(&self, name: &str) -> Option<BTreeMap<String, std::collections::BTreeSet<String>>> {
        self.tracked.borrow().get(name).cloned()
    }

    /// Like [`DataResolver::resolve_one`], but also records the stage's
    /// tracked-vars report for later retrieval via [`DataResolver::tracked_vars`].
    pub fn resolve_one_tracking(&self, name: &str) -> Result<Node, ResolveError> {
        let parent = name.split('@').next().unwrap_or(name);
        let Some(def) = self.definitions.get(parent) else {
            return Err(ResolveError::from(ResolveErrorKind::EntryNotFound { name: name.to_string() }));
        };
        let settings = self.settings();
        let all = def.as_definition().resolve_all(parent, &self.context, &settings)?;
        let Some((_, node)) = all.into_iter().find(|(n, _)| n == name) else {
            return Err(ResolveError::from(ResolveErrorKind::EntryNotFound { name: name.to_string() }));
        };
        if let Some(Node::Sequence(entries, _)) = node.as_mapping().and_then(|m| m.get("params")) {
            let mut by_source: BTreeMap<String, std::collections::BTreeSet<String>> = BTreeMap::new();
            for entry in entries {
                if let Node::Mapping(map, _) = entry {
                    for (source, keys) in map {
                        if let Node::Sequence(keys, _) = keys {
                            let set = by_source.entry(source.clone()).or_default();
                            for k in keys {
                                if let Some(scalar) = k.as_scalar() {
                                    set.insert(scalar.to_display_string());
                                }
                            }
                        }
                    }
                }
            }
            self.tracked.borrow_mut().insert(name.to_string(), by_source);
        }
        Ok(node)
    }
}
