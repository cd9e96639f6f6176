use crate::escape::{escape_attr, escape_text};
use crate::node::{NodeId, XmlDocument};
use std::fmt::Write;

/// Serializer converts the tree back to XML text.
///
/// Output is indented one element per line. Leaf text is written inline
/// and verbatim, so parsing the output and serializing again yields the
/// same bytes.
pub struct Serializer {
    indent_string: String,
    declaration: bool,
}

impl Serializer {
    pub fn new() -> Self {
        Self {
            indent_string: "  ".to_string(), // 2 spaces
            declaration: true,
        }
    }

    pub fn with_indent(indent: &str) -> Self {
        Self {
            indent_string: indent.to_string(),
            declaration: true,
        }
    }

    /// Omit the `<?xml ...?>` header
    pub fn without_declaration(mut self) -> Self {
        self.declaration = false;
        self
    }

    /// Serialize a whole document
    pub fn serialize(&self, doc: &XmlDocument) -> String {
        let mut output = String::new();
        if self.declaration {
            output.push_str("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n");
        }
        self.serialize_node(doc, doc.root(), 0, &mut output);
        output
    }

    /// Serialize one subtree without declaration
    pub fn serialize_subtree(&self, doc: &XmlDocument, id: NodeId) -> String {
        let mut output = String::new();
        self.serialize_node(doc, id, 0, &mut output);
        output
    }

    fn serialize_node(&self, doc: &XmlDocument, id: NodeId, depth: usize, output: &mut String) {
        let node = doc.node(id);
        self.write_indent(depth, output);

        output.push('<');
        output.push_str(&node.tag);
        for (name, value) in &node.attributes {
            let _ = write!(output, " {}=\"{}\"", name, escape_attr(value));
        }

        match (&node.text, node.children.is_empty()) {
            (None, true) => output.push_str("/>\n"),
            (Some(text), true) => {
                let _ = writeln!(output, ">{}</{}>", escape_text(text), node.tag);
            }
            (text, false) => {
                output.push('>');
                if let Some(text) = text {
                    output.push_str(&escape_text(text));
                }
                output.push('\n');
                for child in &node.children {
                    self.serialize_node(doc, *child, depth + 1, output);
                }
                self.write_indent(depth, output);
                let _ = writeln!(output, "</{}>", node.tag);
            }
        }
    }

    fn write_indent(&self, depth: usize, output: &mut String) {
        for _ in 0..depth {
            output.push_str(&self.indent_string);
        }
    }
}

impl Default for Serializer {
    fn default() -> Self {
        Self::new()
    }
}

/// Serialize with the default settings
pub fn serialize(doc: &XmlDocument) -> String {
    Serializer::new().serialize(doc)
}
