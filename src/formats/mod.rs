//! Format dispatcher: a pluggable loader that returns in-memory trees,
//! keyed by file extension. One `FormatLoader` implementation per
//! mandatory extension, selected by a small registry.

pub mod json;
pub mod py_literal;
pub mod toml;
pub mod yaml;

use crate::resolve::node::Node;

/// A single format's parser: turns raw file text into a `Node` tree.
/// Implementations never touch the file system themselves — the Parameter
/// Loader (`src/resolve/loader.rs`) reads the file via the `FileSystem`
/// trait and hands the contents here, so format loaders stay unit-testable
/// on plain strings.
pub trait FormatLoader {
    fn parse(&self, contents: &str) -> Result<Node, String>;
}

/// Looks up a loader by lower-cased file extension (without the leading
/// dot). `.yaml` and `.yml` share one loader.
pub fn loader_for_extension(ext: &str) -> Option<Box<dyn FormatLoader>> {
    match ext.to_ascii_lowercase().as_str() {
        "yaml" | "yml" => Some(Box::new(yaml::YamlLoader)),
        "json" => Some(Box::new(json::JsonLoader)),
        "toml" => Some(Box::new(toml::TomlLoader)),
        "py" => Some(Box::new(py_literal::PyLiteralLoader)),
        _ => None,
    }
}
