use std::cell::RefCell;
use std::rc::{Rc, Weak};

use rustc_hash::FxHashMap;

/// A shared handle to a node in the document tree.
pub type Handle = Rc<Node>;

/// Attribute map of a tag element.
///
/// Names are unique per element; inserting a name that already exists
/// overwrites the earlier occurrence.
pub type AttrMap = FxHashMap<Rc<str>, AttributeValue>;

/// A node in the document tree.
///
/// Children are owned through `children`. The `parent` field is a weak
/// back-reference: it resolves the enclosing node during upward traversal
/// but never extends its lifetime, keeping the tree acyclic on the owning
/// edges.
#[derive(Debug)]
pub struct Node {
    pub data: NodeData,
    pub parent: RefCell<Weak<Node>>,
    pub children: RefCell<Vec<Handle>>,
}

/// The kind-specific payload of a node.
#[derive(Debug)]
pub enum NodeData {
    /// The document root. The only node without a parent.
    Root,

    /// An element with a name and attributes.
    Tag {
        name: Rc<str>,
        attrs: RefCell<AttrMap>,
    },

    /// A text run with character references already decoded.
    Text(String),

    /// Verbatim text inside a raw text element, e.g. a script body.
    Raw(String),

    /// A DOCTYPE declaration; the payload spans everything between
    /// `<!DOCTYPE` and the closing `>`.
    Doctype(String),

    /// A comment body, everything between `<!--` and `--`.
    Comment(String),

    /// A CDATA section body, everything between `<![CDATA[` and `]]>`.
    Cdata(String),

    /// A processing instruction body, everything between `<?` and `?>`.
    Pi(String),
}

/// The value of a single attribute.
#[derive(Clone, Debug, PartialEq)]
pub enum AttributeValue {
    /// Attribute present without a value, e.g. `<option selected>`.
    BooleanTrue,

    /// Attribute with a value, character references already decoded.
    String(Rc<str>),
}

impl Node {
    pub fn new(data: NodeData) -> Handle {
        Rc::new(Node {
            data,
            parent: RefCell::new(Weak::new()),
            children: RefCell::new(Vec::new()),
        })
    }

    pub fn new_root() -> Handle {
        Node::new(NodeData::Root)
    }

    /// Appends `child` as the last child of `parent` and points the child's
    /// back-reference at its new container.
    pub fn append(parent: &Handle, child: Handle) {
        *child.parent.borrow_mut() = Rc::downgrade(parent);
        parent.children.borrow_mut().push(child);
    }

    /// Resolves the parent node, if the node has one and it is still alive.
    pub fn parent_node(&self) -> Option<Handle> {
        self.parent.borrow().upgrade()
    }

    pub fn is_root(&self) -> bool {
        matches!(self.data, NodeData::Root)
    }

    /// The element name for tag nodes, `None` for every other kind.
    pub fn tag_name(&self) -> Option<&str> {
        match &self.data {
            NodeData::Tag { name, .. } => Some(name),
            _ => None,
        }
    }
}
