use crate::node::{Handle, Node};
use crate::renderer;
use crate::tree_builder::TreeBuilder;

/// A permissive HTML/XML document engine.
///
/// Every input parses: ill-formed markup is repaired with HTML's
/// tag-omission and scope rules rather than rejected. The engine owns one
/// tree at a time; `parse` replaces it and `render` serializes it back to
/// markup.
///
/// The `xml` flag selects the dialect. `None` (the default) applies HTML
/// rules but switches to XML semantics when an XML processing instruction
/// shows up; `Some(true)` and `Some(false)` pin the mode and disable
/// auto-detection. XML semantics preserve name case, honor self-closing
/// tags on every element, and turn off the HTML repair rules.
///
/// ```
/// use html_dom_api::Dom;
///
/// let markup = Dom::new().parse("<ul><li>a<li>b</ul>").render();
/// assert_eq!(markup, "<ul><li>a</li><li>b</li></ul>");
/// ```
#[derive(Debug)]
pub struct Dom {
    tree: Handle,
    xml: Option<bool>,
}

impl Dom {
    /// An engine with an empty tree and auto-detected mode.
    pub fn new() -> Self {
        Self {
            tree: Node::new_root(),
            xml: None,
        }
    }

    /// Parses markup, replacing the current tree.
    pub fn parse(&mut self, html: &str) -> &mut Self {
        let (tree, xml) = TreeBuilder::new(html, self.xml).build();
        self.tree = tree;
        self.xml = xml;
        self
    }

    /// Serializes the current tree to markup.
    pub fn render(&self) -> String {
        renderer::render(&self.tree, self.xml == Some(true))
    }

    /// The current tree. Its root is always a [`crate::NodeData::Root`]
    /// node.
    pub fn tree(&self) -> &Handle {
        &self.tree
    }

    /// Replaces the current tree.
    pub fn set_tree(&mut self, tree: Handle) -> &mut Self {
        self.tree = tree;
        self
    }

    /// The mode flag. `None` means the next parse auto-detects.
    pub fn xml(&self) -> Option<bool> {
        self.xml
    }

    /// Sets the mode flag, or resets it to auto-detection with `None`.
    pub fn set_xml(&mut self, xml: Option<bool>) -> &mut Self {
        self.xml = xml;
        self
    }
}

impl Default for Dom {
    fn default() -> Self {
        Self::new()
    }
}
