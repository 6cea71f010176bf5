//! The Definition layer: one module per stage kind.

pub mod foreach;
pub mod matrix;
pub mod stage;

use std::path::Path;

use crate::fs::FileSystem;
use crate::resolve::context::Context;
use crate::resolve::error::ResolveError;
use crate::resolve::node::Node;

/// Settings every Definition needs, threaded down from the Top-Level
/// Resolver / CLI config rather than hand-carried through each call.
#[derive(Clone, Copy)]
pub struct ResolveSettings<'a> {
    pub fs: &'a dyn FileSystem,
    pub wdir: &'a Path,
    pub default_params_path: &'a str,
    /// The pipeline document's own path, used only in error prefixes
    /// (`failed to parse <section> in <file>:`).
    pub doc_file: &'a str,
    pub parsing: crate::resolve::interpolate::ParsingConfig,
}

/// What any of the three kinds of Definition resolves to: zero or more
/// `(stage name, resolved stage)` pairs plus the track report keyed by
/// stage name, used by `Context::tracked_vars`.
pub type ResolvedEntries = Vec<(String, Node)>;

pub trait Definition {
    /// Concrete stage names this definition expands to.
    fn generated_names(&self, parent_name: &str) -> Vec<String>;

    /// `true` if `member` is one of [`Definition::generated_names`].
    fn has_member(&self, parent_name: &str, member: &str) -> bool {
        self.generated_names(parent_name).iter().any(|n| n == member)
    }

    fn resolve_all(
        &self,
        parent_name: &str,
        ctx: &Context,
        settings: &ResolveSettings,
    ) -> Result<ResolvedEntries, ResolveError>;

    /// Resolve just one generated member (or the whole thing, for an
    /// ordinary stage). `None` means "not a member of this definition".
    fn resolve_member(
        &self,
        parent_name: &str,
        member: &str,
        ctx: &Context,
        settings: &ResolveSettings,
    ) -> Result<Option<(String, Node)>, ResolveError> {
        if !self.has_member(parent_name, member) {
            return Ok(None);
        }
        let all = self.resolve_all(parent_name, ctx, settings)?;
        Ok(all.into_iter().find(|(name, _)| name == member))
    }
}
