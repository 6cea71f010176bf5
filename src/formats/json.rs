//! JSON format loader, backed by `serde_json` with the `preserve_order`
//! feature so mapping keys stay in source order.

use serde::Deserialize;

use crate::formats::FormatLoader;
use crate::resolve::node::Node;

pub struct JsonLoader;

impl FormatLoader for JsonLoader {
    fn parse(&self, contents: &str) -> Result<Node, String> {
        let mut de = serde_json::Deserializer::from_str(contents);
        let node = Node::deserialize(&mut de).map_err(|e| e.to_string())?;
        de.end().map_err(|e| e.to_string())?;
        Ok(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_object() {
        let node = JsonLoader.parse(r#"{"dict": {"foo": "foo", "bar": "bar"}}"#).unwrap();
        let map = node.as_mapping().unwrap();
        assert!(map.contains_key("dict"));
    }

    #[test]
    fn rejects_duplicate_keys() {
        let err = JsonLoader.parse(r#"{"a": 1, "a": 2}"#).unwrap_err();
        assert!(err.contains("duplicate key"));
    }

    #[test]
    fn rejects_trailing_garbage() {
        assert!(JsonLoader.parse(r#"{"a": 1} garbage"#).is_err());
    }
}
