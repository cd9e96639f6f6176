use crate::error::{DocumentError, DocumentResult};
use crate::escape::decode_entities;
use crate::node::{NodeId, XmlDocument};
use crate::tokenizer::{tokenize, Token};

/// Parser for MLT-style XML documents
pub struct Parser<'src> {
    tokens: Vec<(Result<Token<'src>, usize>, std::ops::Range<usize>)>,
    pos: usize,
}

/// An element being built: its handle plus the raw text collected so far
struct OpenElement {
    id: NodeId,
    text: String,
}

impl<'src> Parser<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            tokens: tokenize(source),
            pos: 0,
        }
    }

    /// Parse a complete document
    pub fn parse_document(&mut self) -> DocumentResult<XmlDocument> {
        let mut doc = XmlDocument::empty();
        let mut stack: Vec<OpenElement> = Vec::new();
        let mut has_root = false;

        while self.pos < self.tokens.len() {
            let (token, span) = self.tokens[self.pos].clone();
            self.pos += 1;

            let token = token.map_err(|pos| DocumentError::LexerError { pos })?;

            match token {
                Token::ProcessingInstruction | Token::Comment | Token::Declaration => {}

                Token::StartTag(raw) => {
                    let tag = parse_start_tag(raw, span.start)?;
                    let id = doc.create_element(tag.name);
                    for (name, value) in tag.attributes {
                        doc.set_attr(id, &name, value);
                    }

                    match stack.last() {
                        Some(parent) => doc.append_child(parent.id, id),
                        None if has_root => {
                            return Err(DocumentError::MultipleRoots { pos: span.start })
                        }
                        None => {
                            doc.set_root(id);
                            has_root = true;
                        }
                    }

                    if !tag.self_closing {
                        stack.push(OpenElement {
                            id,
                            text: String::new(),
                        });
                    }
                }

                Token::EndTag(raw) => {
                    let found = raw[2..raw.len() - 1].trim();
                    let open = stack.pop().ok_or_else(|| DocumentError::UnexpectedEndTag {
                        pos: span.start,
                        found: found.to_string(),
                    })?;
                    let expected = doc.tag(open.id);
                    if expected != found {
                        return Err(DocumentError::mismatched_tag(span.start, expected, found));
                    }
                    close_element(&mut doc, open);
                }

                Token::Text(raw) => match stack.last_mut() {
                    Some(open) => open.text.push_str(&decode_entities(raw)),
                    None if raw.trim().is_empty() => {}
                    None => return Err(DocumentError::TextOutsideRoot { pos: span.start }),
                },

                Token::CData(content) => match stack.last_mut() {
                    Some(open) => open.text.push_str(content),
                    None => return Err(DocumentError::TextOutsideRoot { pos: span.start }),
                },
            }
        }

        if let Some(open) = stack.pop() {
            return Err(DocumentError::UnclosedTag {
                tag: doc.tag(open.id).to_string(),
            });
        }
        if !has_root {
            return Err(DocumentError::EmptyDocument);
        }

        Ok(doc)
    }
}

/// Store the collected text on the element.
///
/// Whitespace-only text is dropped. Elements with children keep their text
/// trimmed, since the surrounding whitespace is indentation.
fn close_element(doc: &mut XmlDocument, open: OpenElement) {
    if open.text.trim().is_empty() {
        return;
    }
    let text = if doc.children(open.id).is_empty() {
        open.text
    } else {
        open.text.trim().to_string()
    };
    doc.set_text(open.id, Some(text));
}

struct StartTag {
    name: String,
    attributes: Vec<(String, String)>,
    self_closing: bool,
}

/// Split a lexed start tag (`<name a="1" b='2'/>`) into its parts
fn parse_start_tag(raw: &str, offset: usize) -> DocumentResult<StartTag> {
    let mut inner = &raw[1..raw.len() - 1];
    let self_closing = inner.ends_with('/');
    if self_closing {
        inner = &inner[..inner.len() - 1];
    }

    let name_end = inner
        .find(|c: char| c.is_whitespace())
        .unwrap_or(inner.len());
    let name = inner[..name_end].to_string();

    let mut attributes = Vec::new();
    let mut rest = &inner[name_end..];

    loop {
        rest = rest.trim_start();
        if rest.is_empty() {
            break;
        }

        let pos = offset + 1 + (inner.len() - rest.len());
        let eq = rest
            .find('=')
            .ok_or_else(|| DocumentError::invalid_attribute(pos, "expected '=' after attribute name"))?;
        let attr_name = rest[..eq].trim();
        if attr_name.is_empty() || attr_name.contains(char::is_whitespace) {
            return Err(DocumentError::invalid_attribute(pos, "malformed attribute name"));
        }

        rest = rest[eq + 1..].trim_start();
        let quote = rest
            .chars()
            .next()
            .filter(|c| *c == '"' || *c == '\'')
            .ok_or_else(|| DocumentError::invalid_attribute(pos, "attribute value must be quoted"))?;
        let close = rest[1..]
            .find(quote)
            .ok_or_else(|| DocumentError::invalid_attribute(pos, "unterminated attribute value"))?;
        let value = decode_entities(&rest[1..1 + close]).into_owned();

        if attributes.iter().any(|(k, _): &(String, String)| k == attr_name) {
            return Err(DocumentError::invalid_attribute(
                pos,
                format!("duplicate attribute '{}'", attr_name),
            ));
        }
        attributes.push((attr_name.to_string(), value));
        rest = &rest[close + 2..];
    }

    Ok(StartTag {
        name,
        attributes,
        self_closing,
    })
}

/// Parse a document from source text
pub fn parse(source: &str) -> DocumentResult<XmlDocument> {
    Parser::new(source).parse_document()
}
