//! Minimal XML tokenizer for the XML and XHTML readers
//!
//! Supports elements, attributes, text, character and predefined entity
//! references. Declarations, processing instructions and comments are
//! skipped. Namespaces are not interpreted.

use crate::error::MarshalError;

#[derive(Debug, Clone, PartialEq)]
pub(super) enum XmlToken {
    Start {
        name: String,
        attributes: Vec<(String, String)>,
        empty: bool,
        line: usize,
    },
    End {
        name: String,
        line: usize,
    },
    Text {
        text: String,
        line: usize,
    },
}

impl XmlToken {
    pub(super) fn line(&self) -> usize {
        match self {
            XmlToken::Start { line, .. } | XmlToken::End { line, .. } | XmlToken::Text { line, .. } => *line,
        }
    }

    fn is_blank(&self) -> bool {
        matches!(self, XmlToken::Text { text, .. } if text.trim().is_empty())
    }

    fn describe(&self) -> String {
        match self {
            XmlToken::Start { name, .. } => format!("<{name}>"),
            XmlToken::End { name, .. } => format!("</{name}>"),
            XmlToken::Text { text, .. } => format!("text '{}'", text.trim()),
        }
    }
}

/// Looks up an attribute of a start tag.
pub(super) fn attribute<'a>(attributes: &'a [(String, String)], name: &str) -> Option<&'a str> {
    attributes
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
}

/// Splits `input` into tokens.
pub(super) fn tokenize(input: &str, format: &'static str) -> Result<Vec<XmlToken>, MarshalError> {
    let mut tokens = Vec::new();
    let mut rest = input;
    let mut line = 1;

    while !rest.is_empty() {
        if rest.starts_with("<?") {
            rest = skip_past(rest, "?>", format, &mut line)?;
        } else if rest.starts_with("<!--") {
            rest = skip_past(rest, "-->", format, &mut line)?;
        } else if rest.starts_with("<!") {
            rest = skip_past(rest, ">", format, &mut line)?;
        } else if let Some(tag) = rest.strip_prefix("</") {
            let end = tag
                .find('>')
                .ok_or_else(|| MarshalError::syntax(format, line, "unterminated end tag"))?;
            tokens.push(XmlToken::End {
                name: tag[..end].trim().to_string(),
                line,
            });
            line += count_lines(&tag[..end]);
            rest = &tag[end + 1..];
        } else if rest.starts_with('<') {
            let end = tag_end(rest)
                .ok_or_else(|| MarshalError::syntax(format, line, "unterminated start tag"))?;
            tokens.push(parse_start_tag(&rest[1..end], format, line)?);
            line += count_lines(&rest[..end]);
            rest = &rest[end + 1..];
        } else {
            let end = rest.find('<').unwrap_or(rest.len());
            tokens.push(XmlToken::Text {
                text: decode_entities(&rest[..end], format, line)?,
                line,
            });
            line += count_lines(&rest[..end]);
            rest = &rest[end..];
        }
    }

    Ok(tokens)
}

fn count_lines(text: &str) -> usize {
    text.matches('\n').count()
}

fn skip_past<'a>(rest: &'a str, terminator: &str, format: &'static str, line: &mut usize) -> Result<&'a str, MarshalError> {
    let end = rest
        .find(terminator)
        .ok_or_else(|| MarshalError::syntax(format, *line, format!("missing '{terminator}'")))?;
    *line += count_lines(&rest[..end]);
    Ok(&rest[end + terminator.len()..])
}

/// Finds the closing `>` of a start tag, ignoring any inside quoted values.
fn tag_end(text: &str) -> Option<usize> {
    let mut quote = None;
    for (index, c) in text.char_indices() {
        match (quote, c) {
            (None, '"' | '\'') => quote = Some(c),
            (Some(open), _) if open == c => quote = None,
            (None, '>') => return Some(index),
            _ => {}
        }
    }
    None
}

fn parse_start_tag(body: &str, format: &'static str, line: usize) -> Result<XmlToken, MarshalError> {
    let (body, empty) = match body.strip_suffix('/') {
        Some(body) => (body, true),
        None => (body, false),
    };
    let name_end = body.find(char::is_whitespace).unwrap_or(body.len());
    let name = body[..name_end].to_string();
    if name.is_empty() {
        return Err(MarshalError::syntax(format, line, "missing element name"));
    }

    let mut attributes = Vec::new();
    let mut rest = body[name_end..].trim_start();
    while !rest.is_empty() {
        let equals = rest
            .find('=')
            .ok_or_else(|| MarshalError::syntax(format, line, format!("attribute without value in <{name}>")))?;
        let key = rest[..equals].trim().to_string();
        let value = rest[equals + 1..].trim_start();
        let quote = value
            .chars()
            .next()
            .filter(|c| *c == '"' || *c == '\'')
            .ok_or_else(|| MarshalError::syntax(format, line, format!("unquoted attribute '{key}'")))?;
        let close = value[1..]
            .find(quote)
            .ok_or_else(|| MarshalError::syntax(format, line, format!("unterminated attribute '{key}'")))?;
        attributes.push((key, decode_entities(&value[1..close + 1], format, line)?));
        rest = value[close + 2..].trim_start();
    }

    Ok(XmlToken::Start {
        name,
        attributes,
        empty,
        line,
    })
}

fn decode_entities(text: &str, format: &'static str, line: usize) -> Result<String, MarshalError> {
    if !text.contains('&') {
        return Ok(text.to_string());
    }

    let mut decoded = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find('&') {
        decoded.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let end = after
            .find(';')
            .ok_or_else(|| MarshalError::syntax(format, line, "unterminated entity reference"))?;
        let entity = &after[..end];
        let c = match entity {
            "amp" => '&',
            "lt" => '<',
            "gt" => '>',
            "quot" => '"',
            "apos" => '\'',
            _ => {
                let code = if let Some(hex) = entity.strip_prefix("#x") {
                    u32::from_str_radix(hex, 16).ok()
                } else if let Some(decimal) = entity.strip_prefix('#') {
                    decimal.parse().ok()
                } else {
                    None
                };
                code.and_then(char::from_u32).ok_or_else(|| {
                    MarshalError::syntax(format, line, format!("unknown entity '&{entity};'"))
                })?
            }
        };
        decoded.push(c);
        rest = &after[end + 1..];
    }
    decoded.push_str(rest);
    Ok(decoded)
}

/// Walks a token list on behalf of a format reader.
pub(super) struct XmlCursor {
    tokens: Vec<XmlToken>,
    position: usize,
    format: &'static str,
}

impl XmlCursor {
    pub(super) fn new(input: &str, format: &'static str) -> Result<Self, MarshalError> {
        Ok(Self {
            tokens: tokenize(input, format)?,
            position: 0,
            format,
        })
    }

    fn last_line(&self) -> usize {
        self.tokens.last().map(XmlToken::line).unwrap_or(1)
    }

    /// Returns the next token that is not whitespace-only text.
    pub(super) fn next_significant(&mut self) -> Result<XmlToken, MarshalError> {
        while let Some(token) = self.tokens.get(self.position) {
            self.position += 1;
            if !token.is_blank() {
                return Ok(token.clone());
            }
        }
        Err(MarshalError::syntax(self.format, self.last_line(), "unexpected end of input"))
    }

    /// Skips tokens until the start tag `name` and returns its attributes
    /// and whether it is empty.
    pub(super) fn seek_start(&mut self, name: &str) -> Result<(Vec<(String, String)>, bool), MarshalError> {
        while let Some(token) = self.tokens.get(self.position) {
            self.position += 1;
            if let XmlToken::Start {
                name: found,
                attributes,
                empty,
                ..
            } = token
                && found == name
            {
                return Ok((attributes.clone(), *empty));
            }
        }
        Err(MarshalError::structure(self.format, format!("no <{name}> element")))
    }

    /// Collects the text up to the end tag `name`. Nested elements are an
    /// error.
    pub(super) fn text_until_end(&mut self, name: &str) -> Result<String, MarshalError> {
        let mut text = String::new();
        loop {
            let token = self
                .tokens
                .get(self.position)
                .cloned()
                .ok_or_else(|| MarshalError::syntax(self.format, self.last_line(), format!("unclosed <{name}>")))?;
            self.position += 1;
            match token {
                XmlToken::Text { text: part, .. } => text.push_str(&part),
                XmlToken::End { name: found, .. } if found == name => return Ok(text),
                other => return Err(self.unexpected(&other)),
            }
        }
    }

    /// Reads a value element whose start tag has already been consumed.
    ///
    /// An element marked null yields `None`, an empty element the empty
    /// string.
    pub(super) fn value(
        &mut self,
        name: &str,
        attributes: &[(String, String)],
        empty: bool,
    ) -> Result<Option<String>, MarshalError> {
        let null = attribute(attributes, "null") == Some("true") || attribute(attributes, "class") == Some("null");
        let text = if empty { String::new() } else { self.text_until_end(name)? };
        Ok(if null { None } else { Some(text) })
    }

    pub(super) fn unexpected(&self, token: &XmlToken) -> MarshalError {
        MarshalError::syntax(self.format, token.line(), format!("unexpected {}", token.describe()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_skips_prolog() {
        let tokens = tokenize(
            "<?xml version=\"1.0\"?>\n<!-- note -->\n<a x=\"1 &amp; 2\"><b/>t&#65;&lt;</a>",
            "xml",
        )
        .unwrap();
        let tokens: Vec<XmlToken> = tokens.into_iter().filter(|token| !token.is_blank()).collect();
        assert_eq!(
            tokens[0],
            XmlToken::Start {
                name: "a".to_string(),
                attributes: vec![("x".to_string(), "1 & 2".to_string())],
                empty: false,
                line: 3,
            }
        );
        assert!(matches!(&tokens[1], XmlToken::Start { name, empty: true, .. } if name == "b"));
        assert!(matches!(&tokens[2], XmlToken::Text { text, .. } if text == "tA<"));
        assert!(matches!(&tokens[3], XmlToken::End { name, .. } if name == "a"));
    }

    #[test]
    fn test_quoted_gt_in_attribute() {
        let tokens = tokenize(r#"<a title="x > y"/>"#, "xml").unwrap();
        assert!(matches!(&tokens[0], XmlToken::Start { attributes, .. } if attributes[0].1 == "x > y"));
    }

    #[test]
    fn test_unknown_entity_fails() {
        let result = tokenize("<a>&bogus;</a>", "xml");
        assert!(matches!(result, Err(MarshalError::Syntax { line: 1, .. })));
    }
}
