use std::rc::Rc;

use crate::node::{AttributeValue, Handle, NodeData};
use crate::tree_builder::VOID;

/// Serializes a node and its descendants back to markup.
///
/// Attribute names are emitted in ascending lexicographic order so that the
/// output is deterministic regardless of how the attribute map iterates.
pub(crate) fn render(node: &Handle, xml: bool) -> String {
    let mut markup = String::new();
    render_node(&mut markup, node, xml);
    markup
}

fn render_node(markup: &mut String, node: &Handle, xml: bool) {
    match &node.data {
        NodeData::Root => render_children(markup, node, xml),

        NodeData::Text(text) => xml_escape(markup, text),
        NodeData::Raw(text) => markup.push_str(text),

        NodeData::Doctype(payload) => {
            markup.push_str("<!DOCTYPE");
            markup.push_str(payload);
            markup.push('>');
        }
        NodeData::Comment(body) => {
            markup.push_str("<!--");
            markup.push_str(body);
            markup.push_str("-->");
        }
        NodeData::Cdata(body) => {
            markup.push_str("<![CDATA[");
            markup.push_str(body);
            markup.push_str("]]>");
        }
        NodeData::Pi(body) => {
            markup.push_str("<?");
            markup.push_str(body);
            markup.push_str("?>");
        }

        NodeData::Tag { name, attrs } => {
            markup.push('<');
            markup.push_str(name);

            let attrs = attrs.borrow();
            let mut names: Vec<&Rc<str>> = attrs.keys().collect();
            names.sort();
            for attr_name in names {
                markup.push(' ');
                markup.push_str(attr_name);
                if let AttributeValue::String(value) = &attrs[attr_name] {
                    markup.push_str("=\"");
                    xml_escape(markup, value);
                    markup.push('"');
                }
            }

            let childless = node.children.borrow().is_empty();
            if childless && (xml || VOID.contains(&**name)) {
                markup.push_str(" />");
                return;
            }

            markup.push('>');
            render_children(markup, node, xml);
            markup.push_str("</");
            markup.push_str(name);
            markup.push('>');
        }
    }
}

fn render_children(markup: &mut String, node: &Handle, xml: bool) {
    for child in node.children.borrow().iter() {
        render_node(markup, child, xml);
    }
}

/// Escapes the five XML metacharacters, both quote styles included, so
/// serialized text and attribute values survive a re-parse in any quoting
/// context.
fn xml_escape(markup: &mut String, text: &str) {
    for character in text.chars() {
        match character {
            '&' => markup.push_str("&amp;"),
            '<' => markup.push_str("&lt;"),
            '>' => markup.push_str("&gt;"),
            '"' => markup.push_str("&quot;"),
            '\'' => markup.push_str("&#39;"),
            _ => markup.push(character),
        }
    }
}
