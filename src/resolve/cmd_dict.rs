//! Command-dict expansion: renders a resolved mapping as command-line
//! flags, letting a `cmd:` field reference a mapping of CLI arguments
//! instead of a literal string.

use crate::resolve::error::ResolveErrorKind;
use crate::resolve::interpolate::{BoolStyle, ListStyle, ParsingConfig};
use crate::resolve::node::{Node, NodeMap, Scalar};

/// Render `map` as a space-joined sequence of `--flag value` tokens.
pub fn expand_cmd_dict(map: &NodeMap, config: &ParsingConfig) -> Result<String, ResolveErrorKind> {
    let mut tokens = Vec::new();
    expand_into(map, "", config, &mut tokens)?;
    Ok(tokens.join(" "))
}

fn expand_into(
    map: &NodeMap,
    prefix: &str,
    config: &ParsingConfig,
    tokens: &mut Vec<String>,
) -> Result<(), ResolveErrorKind> {
    for (key, value) in map {
        let flag = if prefix.is_empty() { format!("--{key}") } else { format!("--{prefix}.{key}") };
        match value {
            Node::Scalar(Scalar::Bool(true), _) => match config.bool_style {
                BoolStyle::StoreTrue => tokens.push(flag),
                BoolStyle::BooleanOptional => tokens.push(flag),
            },
            Node::Scalar(Scalar::Bool(false), _) => match config.bool_style {
                BoolStyle::StoreTrue => {}
                BoolStyle::BooleanOptional => tokens.push(format!("--no-{}", &flag[2..])),
            },
            Node::Scalar(scalar, _) => {
                tokens.push(flag);
                tokens.push(quote(&scalar.to_display_string()));
            }
            Node::Sequence(items, _) => {
                let mut rendered = Vec::with_capacity(items.len());
                for item in items {
                    let Node::Scalar(scalar, _) = item else {
                        return Err(ResolveErrorKind::InterpolateNonString { type_name: item.type_name() });
                    };
                    rendered.push(quote(&scalar.to_display_string()));
                }
                match config.list_style {
                    ListStyle::Nargs => {
                        tokens.push(flag);
                        tokens.extend(rendered);
                    }
                    ListStyle::Append => {
                        for value in rendered {
                            tokens.push(flag.clone());
                            tokens.push(value);
                        }
                    }
                }
            }
            Node::Mapping(nested, _) => {
                let child_prefix = if prefix.is_empty() { key.clone() } else { format!("{prefix}.{key}") };
                expand_into(nested, &child_prefix, config, tokens)?;
            }
        }
    }
    Ok(())
}

/// POSIX-style double-quoting when the token contains whitespace or quotes.
fn quote(token: &str) -> String {
    if token.chars().any(|c| c.is_whitespace() || c == '"' || c == '\'') {
        format!("\"{}\"", token.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        token.to_string()
    }
}
