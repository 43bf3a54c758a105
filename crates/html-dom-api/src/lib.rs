//! A permissive HTML/XML engine.
//!
//! Three pieces make up the crate: a tokenizer that splits markup into
//! lexical tokens, a tree builder that applies HTML's tag-omission and
//! scope rules to produce a document tree, and a renderer that serializes
//! the tree back to markup. Every input parses; malformed markup is
//! repaired rather than rejected.
//!
//! [`Dom`] is the entry point:
//!
//! ```
//! use html_dom_api::Dom;
//!
//! let mut dom = Dom::new();
//! dom.parse("<p>one<p>two");
//! assert_eq!(dom.render(), "<p>one</p><p>two</p>");
//! ```
//!
//! The tree itself is exposed through [`Handle`]s so that selector engines,
//! query layers, and other collaborators can traverse and rearrange it;
//! the engine makes no guarantees about its invariants after outside
//! mutation.

mod doctype;
mod dom;
mod macros;
mod node;
mod renderer;
mod str_fns;
mod tokenizer;
mod tree_builder;

pub use doctype::DoctypeInfo;
pub use dom::Dom;
pub use node::{AttrMap, AttributeValue, Handle, Node, NodeData};
