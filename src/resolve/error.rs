//! The resolver's error taxonomy: a `thiserror` enum of specific failure
//! kinds, wrapped by an outer type that adds a `failed to parse ... in
//! ...:` prefix as an error climbs out of a stage/foreach/matrix
//! resolution. Callers match on the kind to decide exit status and
//! rendering, so the chain stays typed end to end rather than flattening
//! to `anyhow` until it reaches the CLI boundary.

use std::fmt;
use std::path::PathBuf;

use crate::resolve::node::Meta;

/// One specific failure kind the resolver can raise.
#[derive(Debug, thiserror::Error)]
pub enum ResolveErrorKind {
    #[error("{0}")]
    ExpressionSyntax(#[from] ExpressionSyntaxError),

    #[error("'{path}' does not exist")]
    KeyNotInContext { path: String },

    #[error("cannot interpolate a {type_name} value into a string")]
    InterpolateNonString { type_name: &'static str },

    #[error(
        "cannot redefine '{key}' from '{new_source}' as it already exists in '{existing_source}'"
    )]
    MergeError {
        key: String,
        existing_source: String,
        new_source: String,
    },

    #[error("'{file}' imported with a different subset of keys than before")]
    VarsAlreadyLoaded { file: String },

    #[error("could not find '{key}' in '{file}'")]
    VarsKeyNotFound { file: String, key: String },

    #[error("'{path}' does not exist")]
    ParamsLoadError { path: PathBuf },

    #[error("failed to parse '{path}': {reason}")]
    FileCorrupted { path: PathBuf, reason: String },

    #[error("'{path}' has an unsupported type")]
    UnsupportedType { path: String },

    #[error("cannot iterate over a {type_name}; `foreach` requires a list or mapping")]
    ForeachExpectsCollection { type_name: &'static str },

    #[error("'{name}' does not match any stage")]
    EntryNotFound { name: String },

    #[error("attempted to modify reserved key '{key}'")]
    ReservedKeyModified { key: String },

    #[error("interpolation is not allowed in {where_}")]
    InterpolationForbidden { where_: &'static str },

    #[error("'{name}' is already defined")]
    DuplicateName { name: String },

    #[error("{0}")]
    Other(String),
}

/// Carries what the Path Parser needs to render its
/// `${expr}\n      ^\n…` diagnostic.
#[derive(Debug, Clone)]
pub struct ExpressionSyntaxError {
    pub text: String,
    pub offset: usize,
    pub found: Option<char>,
}

impl fmt::Display for ExpressionSyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pointer = " ".repeat(self.offset + "${".len());
        let detail = match self.found {
            Some(c) => format!("unexpected character '{c}'"),
            None => "unexpected end of expression".to_string(),
        };
        write!(f, "${{{}}}\n{pointer}^\n{detail}", self.text)
    }
}

impl std::error::Error for ExpressionSyntaxError {}

/// The outer wrapper: either a bare kind (raised straight through, e.g.
/// `EntryNotFound`) or a kind wrapped with the `failed to parse ... in ...:`
/// prefix the Definition layer adds as an error climbs out of a
/// stage/foreach/matrix resolution.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("{prefix}{spacing}{inner}")]
    Wrapped {
        prefix: String,
        spacing: &'static str,
        #[source]
        inner: Box<ResolveErrorKind>,
    },
    #[error(transparent)]
    Bare(#[from] ResolveErrorKind),
}

impl ResolveError {
    pub fn kind(&self) -> &ResolveErrorKind {
        match self {
            ResolveError::Wrapped { inner, .. } => inner,
            ResolveError::Bare(kind) => kind,
        }
    }

    /// `failed to parse <section>.<name>.<field> in <file>:` — spacing is a
    /// newline for errors whose own message is already multi-line.
    pub fn wrap(kind: ResolveErrorKind, section: &str, file: &str) -> ResolveError {
        let spacing = match &kind {
            ResolveErrorKind::ExpressionSyntax(_)
            | ResolveErrorKind::MergeError { .. }
            | ResolveErrorKind::VarsAlreadyLoaded { .. } => "\n",
            _ => " ",
        };
        ResolveError::Wrapped {
            prefix: format!("failed to parse '{section}' in '{file}':"),
            spacing,
            inner: Box::new(kind),
        }
    }
}

impl ResolveErrorKind {
    pub fn merge_error(key: impl Into<String>, existing: &Meta, new: &Meta) -> ResolveErrorKind {
        ResolveErrorKind::MergeError {
            key: key.into(),
            existing_source: existing.source_label(),
            new_source: new.source_label(),
        }
    }
}
