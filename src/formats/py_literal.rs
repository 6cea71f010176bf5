//! `.py` parameter file loader.
//!
//! A `.py` parameter file is a module containing nothing but top-level
//! literal assignments — `THRESHOLD = 10`, `MODELS = {"a": 1}` — read for
//! their values, never executed. Rather than pull in a full Python
//! parser (a large, version-sensitive API surface this crate has no way
//! to verify without compiling), this is a small hand-written
//! recursive-descent parser restricted to the literal subset: strings,
//! numbers, `True`/`False`/`None`, lists and dicts with string keys.
//! Anything else — a function call, an f-string, an import, a
//! comprehension — is rejected as corrupt rather than guessed at.

use crate::formats::FormatLoader;
use crate::resolve::node::{Meta, Node, NodeMap, Scalar};

pub struct PyLiteralLoader;

impl FormatLoader for PyLiteralLoader {
    fn parse(&self, contents: &str) -> Result<Node, String> {
        let mut parser = Parser::new(contents);
        parser.parse_module()
    }
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn new(src: &str) -> Self {
        Parser { chars: src.chars().collect(), pos: 0 }
    }

    fn parse_module(&mut self) -> Result<Node, String> {
        let mut top = NodeMap::new();
        self.skip_trivia();
        while !self.at_end() {
            let name = self.parse_identifier()?;
            self.skip_trivia();
            self.expect('=')?;
            self.skip_trivia();
            let value = self.parse_value()?;
            if top.insert(name.clone(), value).is_some() {
                return Err(format!("duplicate top-level assignment '{name}'"));
            }
            self.skip_trivia();
        }
        Ok(Node::Mapping(top, Meta::inline()))
    }

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn expect(&mut self, expected: char) -> Result<(), String> {
        match self.bump() {
            Some(c) if c == expected => Ok(()),
            other => Err(format!(
                "expected '{expected}' at offset {}, found {:?}",
                self.pos.saturating_sub(1),
                other
            )),
        }
    }

    /// Skips whitespace, newlines and `#`-comments between tokens.
    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.pos += 1;
                }
                Some('#') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.pos += 1;
                    }
                }
                _ => break,
            }
        }
    }

    fn parse_identifier(&mut self) -> Result<String, String> {
        let start = self.pos;
        match self.peek() {
            Some(c) if c.is_alphabetic() || c == '_' => self.pos += 1,
            other => return Err(format!("expected identifier at offset {start}, found {other:?}")),
        }
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                self.pos += 1;
            } else {
                break;
            }
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }

    fn parse_value(&mut self) -> Result<Node, String> {
        self.skip_trivia();
        match self.peek() {
            Some('"') | Some('\'') => self.parse_string().map(|s| Node::Scalar(Scalar::String(s), Meta::inline())),
            Some(c) if c == '-' || c.is_ascii_digit() => self.parse_number(),
            Some('[') => self.parse_list(),
            Some('{') => self.parse_dict(),
            Some(c) if c.is_alphabetic() => self.parse_keyword(),
            other => Err(format!("unexpected token at offset {}: {:?}", self.pos, other)),
        }
    }

    fn parse_keyword(&mut self) -> Result<Node, String> {
        let start = self.pos;
        let word = self.parse_identifier()?;
        match word.as_str() {
            "True" => Ok(Node::Scalar(Scalar::Bool(true), Meta::inline())),
            "False" => Ok(Node::Scalar(Scalar::Bool(false), Meta::inline())),
            "None" => Ok(Node::null()),
            other => Err(format!("unsupported expression '{other}' at offset {start} (only literals are supported)")),
        }
    }

    fn parse_string(&mut self) -> Result<String, String> {
        let quote = self.bump().expect("caller checked a quote is present");
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err("unterminated string literal".to_string()),
                Some(c) if c == quote => break,
                Some('\\') => match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('r') => out.push('\r'),
                    Some('\\') => out.push('\\'),
                    Some(c) if c == quote => out.push(quote),
                    Some(other) => {
                        out.push('\\');
                        out.push(other);
                    }
                    None => return Err("unterminated escape in string literal".to_string()),
                },
                Some(c) => out.push(c),
            }
        }
        Ok(out)
    }

    fn parse_number(&mut self) -> Result<Node, String> {
        let start = self.pos;
        if self.peek() == Some('-') {
            self.pos += 1;
        }
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        let mut is_float = false;
        if self.peek() == Some('.') {
            is_float = true;
            self.pos += 1;
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.pos += 1;
            }
        }
        if matches!(self.peek(), Some('e') | Some('E')) {
            is_float = true;
            self.pos += 1;
            if matches!(self.peek(), Some('+') | Some('-')) {
                self.pos += 1;
            }
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.pos += 1;
            }
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        if is_float {
            text.parse::<f64>()
                .map(|f| Node::Scalar(Scalar::Float(f), Meta::inline()))
                .map_err(|e| format!("invalid float literal '{text}': {e}"))
        } else {
            text.parse::<i64>()
                .map(|i| Node::Scalar(Scalar::Int(i), Meta::inline()))
                .map_err(|e| format!("invalid int literal '{text}': {e}"))
        }
    }

    fn parse_list(&mut self) -> Result<Node, String> {
        self.expect('[')?;
        let mut items = Vec::new();
        self.skip_trivia();
        if self.peek() == Some(']') {
            self.pos += 1;
            return Ok(Node::Sequence(items, Meta::inline()));
        }
        loop {
            items.push(self.parse_value()?);
            self.skip_trivia();
            match self.peek() {
                Some(',') => {
                    self.pos += 1;
                    self.skip_trivia();
                    if self.peek() == Some(']') {
                        self.pos += 1;
                        break;
                    }
                }
                Some(']') => {
                    self.pos += 1;
                    break;
                }
                other => return Err(format!("expected ',' or ']' at offset {}, found {other:?}", self.pos)),
            }
        }
        Ok(Node::Sequence(items, Meta::inline()))
    }

    fn parse_dict(&mut self) -> Result<Node, String> {
        self.expect('{')?;
        let mut map = NodeMap::new();
        self.skip_trivia();
        if self.peek() == Some('}') {
            self.pos += 1;
            return Ok(Node::Mapping(map, Meta::inline()));
        }
        loop {
            self.skip_trivia();
            let key = match self.peek() {
                Some('"') | Some('\'') => self.parse_string()?,
                other => return Err(format!("dict keys must be string literals, found {other:?} at offset {}", self.pos)),
            };
            self.skip_trivia();
            self.expect(':')?;
            let value = self.parse_value()?;
            if map.insert(key.clone(), value).is_some() {
                return Err(format!("duplicate key '{key}' in dict literal"));
            }
            self.skip_trivia();
            match self.peek() {
                Some(',') => {
                    self.pos += 1;
                    self.skip_trivia();
                    if self.peek() == Some('}') {
                        self.pos += 1;
                        break;
                    }
                }
                Some('}') => {
                    self.pos += 1;
                    break;
                }
                other => return Err(format!("expected ',' or '}}' at offset {}, found {other:?}", self.pos)),
            }
        }
        Ok(Node::Mapping(map, Meta::inline()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_top_level_assignments() {
        let node = PyLiteralLoader
            .parse("THRESHOLD = 10\nNAME = \"bar\"\n")
            .unwrap();
        let map = node.as_mapping().unwrap();
        assert_eq!(map["THRESHOLD"].as_scalar().unwrap().to_display_string(), "10");
        assert_eq!(map["NAME"].as_scalar().unwrap().to_display_string(), "bar");
    }

    #[test]
    fn parses_nested_dict_and_list() {
        let node = PyLiteralLoader
            .parse("MODELS = {\"a\": [1, 2, 3], \"b\": True}\n")
            .unwrap();
        let map = node.as_mapping().unwrap();
        let models = map["MODELS"].as_mapping().unwrap();
        assert_eq!(models["a"].as_sequence().unwrap().len(), 3);
        assert_eq!(models["b"].as_scalar().unwrap(), &Scalar::Bool(true));
    }

    #[test]
    fn rejects_non_literal_expressions() {
        let err = PyLiteralLoader.parse("X = some_function()\n").unwrap_err();
        assert!(err.contains("unsupported expression") || err.contains("unexpected token"));
    }

    #[test]
    fn skips_comments() {
        let node = PyLiteralLoader.parse("# a comment\nX = 1  # trailing\n").unwrap();
        assert_eq!(node.as_mapping().unwrap()["X"].as_scalar().unwrap().to_display_string(), "1");
    }
}
