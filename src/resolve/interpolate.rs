//! Interpolator and Generic Value Resolver: an exact-single placeholder
//! preserves the referenced value's type, anything else stringifies.
//! `Node` already carries `Meta`, so there is no separate "wrapped vs.
//! unwrapped" value representation to maintain — `unwrap` is kept in the
//! public signature for contract fidelity, but both branches return the
//! same `Node`; callers that truly want a meta-free value call
//! `Node::to_json` at the output boundary instead.

use crate::resolve::context::Context;
use crate::resolve::error::ResolveErrorKind;
use crate::resolve::node::{Meta, Node, NodeMap, Scalar};
use crate::resolve::path::parse_path;
use crate::resolve::template::{get_matches, is_exact_single, unescape};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolStyle {
    StoreTrue,
    BooleanOptional,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListStyle {
    Nargs,
    Append,
}

/// The two behavioral switches that live under the config file's
/// `parsing.bool`/`parsing.list` keys, used only by command-dict expansion.
#[derive(Debug, Clone, Copy)]
pub struct ParsingConfig {
    pub bool_style: BoolStyle,
    pub list_style: ListStyle,
}

impl Default for ParsingConfig {
    fn default() -> Self {
        ParsingConfig { bool_style: BoolStyle::StoreTrue, list_style: ListStyle::Nargs }
    }
}

/// Resolve a single template string against `ctx`.
pub fn resolve_str(s: &str, ctx: &Context, unwrap: bool) -> Result<Node, ResolveErrorKind> {
    let _ = unwrap; // see module doc: both branches already return the same `Node`.
    let matches = get_matches(s);

    if is_exact_single(s, &matches) {
        let segments = parse_path(&matches[0].inner)?;
        return ctx.select(&segments);
    }

    let mut buf = String::new();
    let mut cursor = 0usize;
    for m in &matches {
        let segments = parse_path(&m.inner)?;
        let node = ctx.select(&segments)?;
        let Node::Scalar(scalar, _) = &node else {
            return Err(ResolveErrorKind::InterpolateNonString { type_name: node.type_name() });
        };
        buf.push_str(&s[cursor..m.start]);
        buf.push_str(&scalar.to_display_string());
        cursor = m.end;
    }
    buf.push_str(&s[cursor..]);
    Ok(Node::Scalar(Scalar::String(unescape(&buf)), Meta::inline()))
}

/// Validates every placeholder in `value` parses, without resolving
/// anything, so a malformed expression deep in a large document surfaces
/// before any partial resolution happens.
pub fn check_recursive_parse_errors(value: &Node) -> Result<(), ResolveErrorKind> {
    match value {
        Node::Scalar(Scalar::String(s), _) => {
            for m in get_matches(s) {
                parse_path(&m.inner)?;
            }
            Ok(())
        }
        Node::Scalar(..) => Ok(()),
        Node::Sequence(items, _) => {
            for item in items {
                check_recursive_parse_errors(item)?;
            }
            Ok(())
        }
        Node::Mapping(map, _) => {
            for (key, v) in map {
                for m in get_matches(key) {
                    parse_path(&m.inner)?;
                }
                check_recursive_parse_errors(v)?;
            }
            Ok(())
        }
    }
}

/// Generic Value Resolver: walk `value`, delegating every string leaf
/// (and every interpolated mapping key) to the Interpolator.
pub fn resolve_value(value: &Node, ctx: &Context) -> Result<Node, ResolveErrorKind> {
    match value {
        Node::Scalar(Scalar::String(s), _) => resolve_str(s, ctx, true),
        Node::Scalar(..) => Ok(value.clone()),
        Node::Sequence(items, meta) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(resolve_value(item, ctx)?);
            }
            Ok(Node::Sequence(out, meta.clone()))
        }
        Node::Mapping(map, meta) => {
            let mut out = NodeMap::new();
            for (key, v) in map {
                let resolved_key = resolve_key(key, ctx)?;
                let resolved_value = resolve_value(v, ctx)?;
                if out.insert(resolved_key.clone(), resolved_value).is_some() {
                    return Err(ResolveErrorKind::DuplicateName { name: resolved_key });
                }
            }
            Ok(Node::Mapping(out, meta.clone()))
        }
    }
}

fn resolve_key(key: &str, ctx: &Context) -> Result<String, ResolveErrorKind> {
    if get_matches(key).is_empty() {
        return Ok(key.to_string());
    }
    let resolved = resolve_str(key, ctx, true)?;
    match resolved {
        Node::Scalar(scalar, _) => Ok(scalar.to_display_string()),
        other => Err(ResolveErrorKind::InterpolateNonString { type_name: other.type_name() }),
    }
}
