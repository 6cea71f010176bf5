//! YAML format loader, backed by `serde_yaml` — the near-universal choice
//! across the retrieved pack's own manifests for this job.

use serde::Deserialize;

use crate::formats::FormatLoader;
use crate::resolve::node::Node;

pub struct YamlLoader;

impl FormatLoader for YamlLoader {
    fn parse(&self, contents: &str) -> Result<Node, String> {
        if contents.trim().is_empty() {
            return Ok(Node::empty_mapping());
        }
        let de = serde_yaml::Deserializer::from_str(contents);
        Node::deserialize(de).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_mapping() {
        let node = YamlLoader.parse("dict:\n  foo: foo\n  bar: bar\n").unwrap();
        let map = node.as_mapping().unwrap();
        let dict = map["dict"].as_mapping().unwrap();
        assert_eq!(dict["foo"].as_scalar().unwrap().to_display_string(), "foo");
    }

    #[test]
    fn rejects_duplicate_keys() {
        let err = YamlLoader.parse("a: 1\na: 2\n").unwrap_err();
        assert!(err.contains("duplicate key"));
    }
}
