//! TOML format loader, backed by the `toml` crate — the version both
//! `ryugen-io-hyprlog` and `JTan2231-vizier` in the retrieval pack depend on
//! for their own config parsing.

use serde::Deserialize;

use crate::formats::FormatLoader;
use crate::resolve::node::Node;

pub struct TomlLoader;

impl FormatLoader for TomlLoader {
    fn parse(&self, contents: &str) -> Result<Node, String> {
        if contents.trim().is_empty() {
            return Ok(Node::empty_mapping());
        }
        let de = ::toml::Deserializer::new(contents);
        Node::deserialize(de).map_err(|e| e.to_string())
    }
}
