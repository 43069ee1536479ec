//! HTML serialization of document subtrees.

use crate::document::{Document, DomError};
use crate::node::{NodeId, NodeKind};
use crate::parse::is_void;

impl Document {
    /// Serialized markup of `node`'s contents (children only).
    pub fn inner_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        for &child in self.children(node) {
            self.write_node(child, &mut out);
        }
        out
    }

    /// Serialized markup of `node` itself, contents included.
    pub fn outer_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.write_node(node, &mut out);
        out
    }

    /// Replace the entire content of `element` with a parsed fragment.
    ///
    /// This is a full-subtree replacement, not a diff: the old children
    /// are freed, so ids into them stop resolving. Keeping the cursor
    /// sensible across the swap is the snapshot/restore protocol's job,
    /// not this function's.
    pub fn set_inner_html(&mut self, element: NodeId, html: &str) -> Result<(), DomError> {
        {
            let data = self.require(element)?;
            if !data.kind.is_element() {
                return Err(DomError::NotAnElement(element));
            }
        }
        let old = self.children(element).to_vec();
        for child in old {
            self.remove_subtree(child);
        }
        let fragment = self.parse_fragment(html);
        for node in fragment {
            self.attach_unchecked(element, node);
        }
        Ok(())
    }

    fn write_node(&self, id: NodeId, out: &mut String) {
        let Some(data) = self.node(id) else {
            return;
        };
        match &data.kind {
            NodeKind::Text(text) => out.push_str(&html_escape::encode_text(text)),
            NodeKind::Element(el) => {
                out.push('<');
                out.push_str(&el.tag);
                for (name, value) in el.attrs() {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    out.push_str(&html_escape::encode_double_quoted_attribute(value));
                    out.push('"');
                }
                out.push('>');
                if is_void(&el.tag) {
                    return;
                }
                for &child in &data.children {
                    self.write_node(child, out);
                }
                out.push_str("</");
                out.push_str(&el.tag);
                out.push('>');
            }
        }
    }
}
