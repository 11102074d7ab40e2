//! Metadata extraction from entry scripts
//!
//! Addons declare their metadata as a `bl_info` mapping literal at the
//! top of the entry script. The block is located textually and parsed
//! with a restricted recursive-descent parser; the script is never
//! executed and nothing beyond literal constants is accepted.
//!
//! The block is bounded by depth-counting brace matching so nested
//! mappings inside the literal are handled correctly, and braces
//! inside string literals do not affect the count.

use std::collections::BTreeMap;

use addonsmith_core::{Error, Metadata, Result, Value};
use tracing::debug;

/// Identifier naming the metadata block in entry scripts
pub const METADATA_MARKER: &str = "bl_info";

/// Extract the metadata mapping from entry-script text
pub fn extract(text: &str) -> Result<Metadata> {
    let marker = text.find(METADATA_MARKER).ok_or(Error::MetadataNotFound)?;
    let after_marker = &text[marker..];
    let open = after_marker
        .find('{')
        .ok_or_else(|| Error::malformed_metadata("no '{' after the bl_info marker"))?;

    let literal = bounded_block(&after_marker[open..])?;
    debug!("Found metadata literal ({} bytes)", literal.len());

    let mut parser = Parser::new(literal);
    let entries = parser.parse_mapping()?;
    parser.expect_end()?;

    Metadata::from_entries(entries)
}

/// Slice out the brace-delimited block starting at `{`, inclusive of
/// both braces, tracking nesting depth and skipping string literals
/// and `#` comments (quotes and braces inside either do not count).
fn bounded_block(text: &str) -> Result<&str> {
    let mut depth = 0usize;
    let mut string_delim: Option<char> = None;
    let mut escaped = false;
    let mut in_comment = false;

    for (pos, ch) in text.char_indices() {
        if let Some(delim) = string_delim {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == delim {
                string_delim = None;
            }
            continue;
        }
        if in_comment {
            if ch == '\n' {
                in_comment = false;
            }
            continue;
        }
        match ch {
            '#' => in_comment = true,
            '\'' | '"' => string_delim = Some(ch),
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(&text[..=pos]);
                }
            }
            _ => {}
        }
    }

    Err(Error::malformed_metadata("unterminated bl_info block"))
}

/// Recursive-descent parser over the restricted literal grammar:
/// mappings with string keys, strings, integers, floats, booleans,
/// tuples, lists and nested mappings. Trailing commas and `#` comments
/// between tokens are allowed.
struct Parser<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input: input.as_bytes(),
            pos: 0,
        }
    }

    fn error(&self, message: impl std::fmt::Display) -> Error {
        Error::malformed_metadata(format!("{} at offset {}", message, self.pos))
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.pos += 1;
        Some(byte)
    }

    fn skip_trivia(&mut self) {
        while let Some(byte) = self.peek() {
            match byte {
                b' ' | b'\t' | b'\r' | b'\n' => {
                    self.pos += 1;
                }
                b'#' => {
                    while let Some(b) = self.peek() {
                        self.pos += 1;
                        if b == b'\n' {
                            break;
                        }
                    }
                }
                _ => break,
            }
        }
    }

    fn expect(&mut self, byte: u8) -> Result<()> {
        self.skip_trivia();
        match self.bump() {
            Some(b) if b == byte => Ok(()),
            Some(b) => Err(self.error(format!(
                "expected '{}', found '{}'",
                byte as char, b as char
            ))),
            None => Err(self.error(format!("expected '{}', found end of input", byte as char))),
        }
    }

    fn expect_end(&mut self) -> Result<()> {
        self.skip_trivia();
        match self.peek() {
            None => Ok(()),
            Some(b) => Err(self.error(format!("trailing content '{}'", b as char))),
        }
    }

    /// mapping := '{' (string ':' value ',')* '}'
    fn parse_mapping(&mut self) -> Result<BTreeMap<String, Value>> {
        self.expect(b'{')?;
        let mut entries = BTreeMap::new();

        loop {
            self.skip_trivia();
            if self.peek() == Some(b'}') {
                self.pos += 1;
                return Ok(entries);
            }

            let key = self.parse_string()?;
            self.expect(b':')?;
            let value = self.parse_value()?;
            entries.insert(key, value);

            self.skip_trivia();
            match self.peek() {
                Some(b',') => {
                    self.pos += 1;
                }
                Some(b'}') => {
                    self.pos += 1;
                    return Ok(entries);
                }
                Some(b) => {
                    return Err(self.error(format!(
                        "expected ',' or '}}', found '{}'",
                        b as char
                    )))
                }
                None => return Err(self.error("unterminated mapping")),
            }
        }
    }

    fn parse_value(&mut self) -> Result<Value> {
        self.skip_trivia();
        match self.peek() {
            Some(b'"') | Some(b'\'') => Ok(Value::Str(self.parse_string()?)),
            Some(b'{') => Ok(Value::Map(self.parse_mapping()?)),
            Some(b'(') => self.parse_sequence(b'(', b')'),
            Some(b'[') => self.parse_sequence(b'[', b']'),
            Some(b'T') | Some(b'F') => self.parse_bool(),
            Some(b) if b == b'-' || b.is_ascii_digit() => self.parse_number(),
            Some(b) => Err(self.error(format!(
                "expected a literal value, found '{}'",
                b as char
            ))),
            None => Err(self.error("expected a literal value, found end of input")),
        }
    }

    fn parse_string(&mut self) -> Result<String> {
        self.skip_trivia();
        let delim = match self.bump() {
            Some(b @ (b'"' | b'\'')) => b,
            _ => return Err(self.error("expected a string literal")),
        };

        let mut out: Vec<u8> = Vec::new();
        loop {
            match self.bump() {
                Some(b) if b == delim => {
                    return String::from_utf8(out)
                        .map_err(|_| self.error("invalid UTF-8 in string literal"));
                }
                Some(b'\\') => {
                    let escaped = self
                        .bump()
                        .ok_or_else(|| self.error("unterminated string escape"))?;
                    match escaped {
                        b'n' => out.push(b'\n'),
                        b't' => out.push(b'\t'),
                        b'r' => out.push(b'\r'),
                        other => out.push(other),
                    }
                }
                Some(b) => out.push(b),
                None => return Err(self.error("unterminated string literal")),
            }
        }
    }

    /// sequence := open (value ',')* close, tuples and lists alike
    fn parse_sequence(&mut self, open: u8, close: u8) -> Result<Value> {
        self.expect(open)?;
        let mut items = Vec::new();

        loop {
            self.skip_trivia();
            if self.peek() == Some(close) {
                self.pos += 1;
                return Ok(Value::Seq(items));
            }

            items.push(self.parse_value()?);

            self.skip_trivia();
            match self.peek() {
                Some(b',') => {
                    self.pos += 1;
                }
                Some(b) if b == close => {
                    self.pos += 1;
                    return Ok(Value::Seq(items));
                }
                Some(b) => {
                    return Err(self.error(format!(
                        "expected ',' or '{}', found '{}'",
                        close as char, b as char
                    )))
                }
                None => return Err(self.error("unterminated sequence")),
            }
        }
    }

    fn parse_bool(&mut self) -> Result<Value> {
        for (word, value) in [("True", true), ("False", false)] {
            if self.input[self.pos..].starts_with(word.as_bytes()) {
                self.pos += word.len();
                return Ok(Value::Bool(value));
            }
        }
        Err(self.error("expected 'True' or 'False'"))
    }

    fn parse_number(&mut self) -> Result<Value> {
        let start = self.pos;
        if self.peek() == Some(b'-') {
            self.pos += 1;
        }
        let mut is_float = false;
        while let Some(b) = self.peek() {
            match b {
                b'0'..=b'9' => self.pos += 1,
                b'.' if !is_float => {
                    is_float = true;
                    self.pos += 1;
                }
                _ => break,
            }
        }

        let text = std::str::from_utf8(&self.input[start..self.pos])
            .expect("number literals are ascii");
        if is_float {
            text.parse()
                .map(Value::Float)
                .map_err(|_| self.error(format!("invalid float literal '{}'", text)))
        } else {
            text.parse()
                .map(Value::Int)
                .map_err(|_| self.error(format!("invalid integer literal '{}'", text)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_basic_block() {
        let text = r#"
bl_info = {
    "name": "Foo",
    "version": (1, 0, 0),
}

import bpy
"#;
        let metadata = extract(text).unwrap();
        assert_eq!(metadata.name(), "Foo");
        assert_eq!(
            metadata.get("version"),
            Some(&Value::Seq(vec![
                Value::Int(1),
                Value::Int(0),
                Value::Int(0)
            ]))
        );
    }

    #[test]
    fn test_missing_marker_is_not_found() {
        assert!(matches!(
            extract("import bpy\n\nprint('no metadata here')\n"),
            Err(Error::MetadataNotFound)
        ));
    }

    #[test]
    fn test_nested_mapping_is_bounded_by_depth() {
        let text = r#"bl_info = {
    "name": "Nested",
    "links": {"docs": "https://example.com", "tracker": "https://example.com/issues"},
    "category": "Development",
}"#;
        let metadata = extract(text).unwrap();
        assert_eq!(
            metadata.get("category"),
            Some(&Value::Str("Development".to_string()))
        );
        match metadata.get("links") {
            Some(Value::Map(links)) => {
                assert_eq!(links.len(), 2);
            }
            other => panic!("expected nested map, got {:?}", other),
        }
    }

    #[test]
    fn test_braces_inside_strings_do_not_close_the_block() {
        let text = r#"bl_info = {
    "name": "Braces",
    "description": "inserts {curly} placeholders",
}"#;
        let metadata = extract(text).unwrap();
        assert_eq!(
            metadata.get("description"),
            Some(&Value::Str("inserts {curly} placeholders".to_string()))
        );
    }

    #[test]
    fn test_single_quoted_strings_and_comments() {
        let text = "bl_info = {\n    'name': 'Quotes',  # addon title\n    'author': 'Someone',\n}\n";
        let metadata = extract(text).unwrap();
        assert_eq!(metadata.name(), "Quotes");
        assert_eq!(
            metadata.get("author"),
            Some(&Value::Str("Someone".to_string()))
        );
    }

    #[test]
    fn test_apostrophe_in_comment_does_not_open_a_string() {
        let text = "bl_info = {\n    \"name\": \"Foo\",  # it's a nice addon\n    \"category\": \"Development\",\n}\n";
        let metadata = extract(text).unwrap();
        assert_eq!(metadata.name(), "Foo");
        assert_eq!(
            metadata.get("category"),
            Some(&Value::Str("Development".to_string()))
        );
    }

    #[test]
    fn test_brace_in_comment_does_not_close_the_block() {
        let text = "bl_info = {\n    \"name\": \"Foo\",  # returns }\n    \"author\": \"Someone\",\n}\n";
        let metadata = extract(text).unwrap();
        assert_eq!(
            metadata.get("author"),
            Some(&Value::Str("Someone".to_string()))
        );
    }

    #[test]
    fn test_numbers_booleans_and_lists() {
        let text = r#"bl_info = {
    "name": "Mixed",
    "weight": -2.5,
    "order": [3, 1],
    "experimental": True,
    "stable": False,
}"#;
        let metadata = extract(text).unwrap();
        assert_eq!(metadata.get("weight"), Some(&Value::Float(-2.5)));
        assert_eq!(
            metadata.get("order"),
            Some(&Value::Seq(vec![Value::Int(3), Value::Int(1)]))
        );
        assert_eq!(metadata.get("experimental"), Some(&Value::Bool(true)));
        assert_eq!(metadata.get("stable"), Some(&Value::Bool(false)));
    }

    #[test]
    fn test_string_escapes() {
        let text = r#"bl_info = {"name": "Esc", "description": "line\none \"quoted\""}"#;
        let metadata = extract(text).unwrap();
        assert_eq!(
            metadata.get("description"),
            Some(&Value::Str("line\none \"quoted\"".to_string()))
        );
    }

    #[test]
    fn test_function_calls_are_rejected() {
        let text = r#"bl_info = {"name": make_name()}"#;
        assert!(matches!(
            extract(text),
            Err(Error::MalformedMetadata { .. })
        ));
    }

    #[test]
    fn test_identifiers_are_rejected() {
        let text = r#"bl_info = {"name": NAME_CONSTANT}"#;
        assert!(matches!(
            extract(text),
            Err(Error::MalformedMetadata { .. })
        ));
    }

    #[test]
    fn test_missing_name_is_malformed() {
        let text = r#"bl_info = {"author": "Someone"}"#;
        assert!(matches!(
            extract(text),
            Err(Error::MalformedMetadata { .. })
        ));
    }

    #[test]
    fn test_unterminated_block_is_malformed() {
        let text = r#"bl_info = {"name": "Broken", "#;
        assert!(matches!(
            extract(text),
            Err(Error::MalformedMetadata { .. })
        ));
    }

    #[test]
    fn test_marker_without_brace_is_malformed() {
        assert!(matches!(
            extract("bl_info = None\n"),
            Err(Error::MalformedMetadata { .. })
        ));
    }

    #[test]
    fn test_realistic_addon_header() {
        let text = r#"
bl_info = {
    "name": "Addon Installer",
    "author": "JayReigns",
    "version": (1, 0, 0),
    "blender": (2, 80, 0),
    "location": "TopBar > Edit > Install Addon",
    "description": "Quickly install addons from a link",
    "category": "Development"
}

MODULE_NAME = "module"
"#;
        let metadata = extract(text).unwrap();
        assert_eq!(metadata.name(), "Addon Installer");
        assert_eq!(
            metadata.get("blender"),
            Some(&Value::Seq(vec![Value::Int(2), Value::Int(80), Value::Int(0)]))
        );
    }
}
