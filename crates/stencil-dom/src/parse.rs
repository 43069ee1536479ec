//! Lenient HTML fragment parsing.
//!
//! Single-pass tokenizer with `innerHTML`-style leniency: unmatched close
//! tags are ignored, unclosed elements close at end of input, and
//! malformed markup degrades to text instead of failing. Entities are
//! decoded with the same crate the serializer encodes with.

use smol_str::SmolStr;

use crate::document::Document;
use crate::node::{ElementData, NodeId, NodeKind};

/// Elements that never take children and never emit a close tag.
pub(crate) const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

pub(crate) fn is_void(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

impl Document {
    /// Parse an HTML fragment into detached top-level nodes, in document
    /// order. Never fails; the result may be empty for whitespace-free
    /// comment-only input.
    pub fn parse_fragment(&mut self, html: &str) -> Vec<NodeId> {
        Parser {
            doc: self,
            input: html,
            pos: 0,
            roots: Vec::new(),
            stack: Vec::new(),
        }
        .run()
    }
}

struct Parser<'a> {
    doc: &'a mut Document,
    input: &'a str,
    pos: usize,
    roots: Vec<NodeId>,
    stack: Vec<(SmolStr, NodeId)>,
}

impl Parser<'_> {
    fn run(mut self) -> Vec<NodeId> {
        while self.pos < self.input.len() {
            let rest = &self.input[self.pos..];
            match rest.find('<') {
                Some(0) => self.handle_markup(),
                Some(lt) => {
                    self.flush_text(&rest[..lt]);
                    self.pos += lt;
                }
                None => {
                    self.flush_text(rest);
                    self.pos = self.input.len();
                }
            }
        }
        self.roots
    }

    fn flush_text(&mut self, raw: &str) {
        if raw.is_empty() {
            return;
        }
        let decoded = html_escape::decode_html_entities(raw).into_owned();
        let node = self.doc.create_text(decoded);
        self.attach(node);
    }

    fn attach(&mut self, node: NodeId) {
        match self.stack.last() {
            Some(&(_, parent)) => self.doc.attach_unchecked(parent, node),
            None => self.roots.push(node),
        }
    }

    fn handle_markup(&mut self) {
        let rest = &self.input[self.pos..];
        let bytes = rest.as_bytes();
        if rest.starts_with("<!--") {
            self.pos = match rest.find("-->") {
                Some(end) => self.pos + end + 3,
                None => self.input.len(),
            };
        } else if rest.starts_with("</") {
            match rest.find('>') {
                Some(end) => {
                    let name = rest[2..end].trim().to_ascii_lowercase();
                    self.close_tag(&name);
                    self.pos += end + 1;
                }
                None => self.pos = self.input.len(),
            }
        } else if rest.starts_with("<!") || rest.starts_with("<?") {
            self.pos = match rest.find('>') {
                Some(end) => self.pos + end + 1,
                None => self.input.len(),
            };
        } else if bytes.len() > 1 && bytes[1].is_ascii_alphabetic() {
            self.open_tag();
        } else {
            // A lone '<' is content, not markup.
            self.flush_text("<");
            self.pos += 1;
        }
    }

    fn close_tag(&mut self, name: &str) {
        match self.stack.iter().rposition(|(tag, _)| tag == name) {
            Some(found) => self.stack.truncate(found),
            None => {
                tracing::trace!(target: "stencil::dom", tag = name, "ignoring unmatched close tag");
            }
        }
    }

    fn open_tag(&mut self) {
        let rest = &self.input[self.pos..];
        let bytes = rest.as_bytes();
        let len = bytes.len();

        let mut i = 1;
        while i < len && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'-') {
            i += 1;
        }
        let tag: SmolStr = rest[1..i].to_ascii_lowercase().into();
        let mut element = ElementData::new(tag.clone());
        let mut self_closing = false;

        loop {
            while i < len && bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            if i >= len {
                break;
            }
            if bytes[i] == b'>' {
                i += 1;
                break;
            }
            if bytes[i] == b'/' {
                if i + 1 < len && bytes[i + 1] == b'>' {
                    self_closing = true;
                    i += 2;
                    break;
                }
                i += 1;
                continue;
            }

            // Attribute name, optionally followed by a value.
            let name_start = i;
            while i < len
                && !bytes[i].is_ascii_whitespace()
                && bytes[i] != b'='
                && bytes[i] != b'>'
                && bytes[i] != b'/'
            {
                i += 1;
            }
            if i == name_start {
                i += 1;
                continue;
            }
            let name = rest[name_start..i].to_ascii_lowercase();

            while i < len && bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            let value = if i < len && bytes[i] == b'=' {
                i += 1;
                while i < len && bytes[i].is_ascii_whitespace() {
                    i += 1;
                }
                if i < len && (bytes[i] == b'"' || bytes[i] == b'\'') {
                    let quote = bytes[i];
                    i += 1;
                    let value_start = i;
                    while i < len && bytes[i] != quote {
                        i += 1;
                    }
                    let raw = &rest[value_start..i];
                    if i < len {
                        i += 1;
                    }
                    html_escape::decode_html_entities(raw).into_owned()
                } else {
                    let value_start = i;
                    while i < len && !bytes[i].is_ascii_whitespace() && bytes[i] != b'>' {
                        i += 1;
                    }
                    html_escape::decode_html_entities(&rest[value_start..i]).into_owned()
                }
            } else {
                String::new()
            };
            element.set_attr(name, value);
        }

        let node = self.doc.alloc(NodeKind::Element(element));
        self.attach(node);
        if !self_closing && !is_void(&tag) {
            self.stack.push((tag, node));
        }
        self.pos += i;
    }
}
