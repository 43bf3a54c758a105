use std::cell::RefCell;
use std::rc::Rc;
use std::sync::LazyLock;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::node::{AttrMap, AttributeValue, Handle, Node, NodeData};
use crate::str_fns::stripos;
use crate::tokenizer::{Token, Tokenizer};

/// Elements that never have content or an end tag.
pub(crate) static VOID: LazyLock<FxHashSet<&'static str>> = LazyLock::new(|| {
    [
        "area", "base", "br", "col", "embed", "hr", "img", "input", "keygen", "link", "menuitem",
        "meta", "param", "source", "track", "wbr",
    ]
    .into_iter()
    .collect()
});

/// Elements whose start tag implicitly ends an open `p` element.
static PARAGRAPH: LazyLock<FxHashSet<&'static str>> = LazyLock::new(|| {
    [
        "address", "article", "aside", "blockquote", "dir", "div", "dl", "fieldset", "footer",
        "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "main", "menu", "nav", "ol",
        "p", "pre", "section", "table", "ul",
    ]
    .into_iter()
    .collect()
});

/// Phrasing content. An end tag for one of these may not reach out of a
/// non-phrasing ancestor.
static PHRASING: LazyLock<FxHashSet<&'static str>> = LazyLock::new(|| {
    [
        "a", "abbr", "area", "audio", "b", "bdi", "bdo", "br", "button", "canvas", "cite", "code",
        "data", "datalist", "del", "dfn", "em", "embed", "i", "iframe", "img", "input", "ins",
        "kbd", "keygen", "label", "link", "map", "mark", "math", "meta", "meter", "noscript",
        "object", "output", "progress", "q", "ruby", "s", "samp", "script", "select", "small",
        "span", "strong", "sub", "sup", "svg", "template", "textarea", "time", "u", "var", "video",
        "wbr",
        // Obsolete inline elements still found in the wild.
        "acronym", "applet", "basefont", "big", "font", "strike", "tt",
    ]
    .into_iter()
    .collect()
});

/// Table sections closed in table scope before a new row, cell, or section.
const TABLE_SECTION_NAMES: &[&str] = &["colgroup", "tbody", "td", "tfoot", "th", "thead", "tr"];

/// Builds a document tree from the token stream, repairing mismatched
/// nesting with HTML's tag-omission and scope rules.
///
/// The builder never fails: every token stream produces some tree.
pub(crate) struct TreeBuilder {
    tokenizer: Tokenizer,
    root: Handle,
    current: Handle,
    xml: Option<bool>,
}

impl TreeBuilder {
    pub(crate) fn new(html: &str, xml: Option<bool>) -> Self {
        let root = Node::new_root();
        Self {
            tokenizer: Tokenizer::new(html),
            current: root.clone(),
            root,
            xml,
        }
    }

    /// Consumes the whole token stream and returns the finished tree along
    /// with the mode flag, which auto-detection may have flipped.
    pub(crate) fn build(mut self) -> (Handle, Option<bool>) {
        while let Some(token) = self.tokenizer.next_token() {
            self.process_token(token);
        }
        (self.root, self.xml)
    }

    fn is_xml(&self) -> bool {
        self.xml == Some(true)
    }

    fn process_token(&mut self, token: Token) {
        match token {
            Token::Text(text) => {
                let decoded = html_escape::decode_html_entities(&text);
                if !decoded.is_empty() {
                    self.append(Node::new(NodeData::Text(decoded.into_owned())));
                }
            }

            Token::Raw(text) => self.append(Node::new(NodeData::Raw(text))),
            Token::Comment(body) => self.append(Node::new(NodeData::Comment(body))),
            Token::Cdata(body) => self.append(Node::new(NodeData::Cdata(body))),
            Token::Doctype(payload) => self.append(Node::new(NodeData::Doctype(payload))),

            Token::Pi(body) => {
                /*
                 * An XML-ish processing instruction switches the whole parse
                 * into XML semantics, once, unless the caller pinned the mode
                 * beforehand.
                 */
                if self.xml.is_none() && stripos(body.as_bytes(), b"xml", 0).is_some() {
                    self.xml = Some(true);
                }
                self.append(Node::new(NodeData::Pi(body)));
            }

            Token::Tag {
                name,
                attributes,
                is_closing,
                self_closing,
            } => {
                let name = self.normalize_name(&name);
                if is_closing {
                    self.close_tag(&name);
                } else {
                    self.open_tag(name, attributes, self_closing);
                }
            }
        }
    }

    /// Tag and attribute names are lowercased in HTML mode and preserved as
    /// written in XML mode.
    fn normalize_name(&self, name: &str) -> Rc<str> {
        if self.is_xml() {
            name.into()
        } else {
            name.to_ascii_lowercase().into()
        }
    }

    fn append(&self, child: Handle) {
        Node::append(&self.current, child);
    }

    fn open_tag(&mut self, name: Rc<str>, attributes: Vec<(String, Option<String>)>, self_closing: bool) {
        let xml = self.is_xml();
        if !xml {
            self.auto_close(&name);
        }

        let mut attrs: AttrMap = FxHashMap::default();
        for (attr_name, value) in attributes {
            let attr_name: Rc<str> = if xml {
                attr_name.into()
            } else {
                attr_name.to_ascii_lowercase().into()
            };
            let value = match value {
                Some(value) => AttributeValue::String(value.into()),
                None => AttributeValue::BooleanTrue,
            };
            attrs.insert(attr_name, value);
        }

        let tag = Node::new(NodeData::Tag {
            name: name.clone(),
            attrs: RefCell::new(attrs),
        });
        Node::append(&self.current, tag.clone());
        self.current = tag;

        if (!xml && VOID.contains(&*name)) || self_closing {
            self.close_tag(&name);
        } else if !xml && (&*name == "script" || &*name == "style") {
            self.tokenizer.enter_raw_text(&name);
        }
    }

    /// Implicitly closes elements with optional end tags before a new
    /// element opens.
    ///
    /// @see https://html.spec.whatwg.org/#optional-tags
    fn auto_close(&mut self, name: &str) {
        if self.current.is_root() {
            return;
        }

        match name {
            "li" => self.close_scope(&["li"], "ul"),

            name if PARAGRAPH.contains(name) => {
                /*
                 * A paragraph-level element cannot sit inside phrasing
                 * content; whatever inline elements are still open end
                 * before it, as does an open paragraph.
                 */
                self.close_phrasing();
                self.close_tag("p");
            }

            "body" => self.close_tag("head"),
            "optgroup" => self.close_tag("optgroup"),
            "option" => self.close_tag("option"),

            "colgroup" | "thead" | "tbody" | "tfoot" => {
                self.close_scope(TABLE_SECTION_NAMES, "table")
            }
            "tr" => self.close_scope(&["tr"], "table"),
            "th" | "td" => {
                self.close_scope(&["th"], "table");
                self.close_scope(&["td"], "table");
            }

            "dt" | "dd" => {
                self.close_tag("dt");
                self.close_tag("dd");
            }
            "rt" | "rp" => {
                self.close_tag("rt");
                self.close_tag("rp");
            }

            _ => {}
        }
    }

    /// Closes any phrasing elements left open at the insertion point.
    fn close_phrasing(&mut self) {
        loop {
            let current = self.current.clone();
            let Some(name) = current.tag_name() else {
                return;
            };
            if !PHRASING.contains(name) {
                return;
            }
            self.close_tag(name);
        }
    }

    /// Closes every `allowed` element between the insertion point and the
    /// nearest `scope` boundary, leaving the boundary itself open.
    fn close_scope(&mut self, allowed: &[&str], scope: &str) {
        let mut next = Some(self.current.clone());
        while let Some(node) = next {
            let Some(name) = node.tag_name() else {
                break;
            };
            if name == scope {
                break;
            }

            next = node.parent_node();
            if allowed.contains(&name) {
                self.close_tag(name);
            }
        }
    }

    /// The end tag algorithm.
    ///
    /// Walks from the insertion point toward the root looking for an open
    /// element with this name; closing it also closes anything left open
    /// inside it. A closer matching no open element is ignored, and the
    /// closer of a phrasing element may not reach out of a non-phrasing
    /// ancestor, so stray inline closers cannot escape their block
    /// container.
    fn close_tag(&mut self, name: &str) {
        let phrasing = !self.is_xml() && PHRASING.contains(name);

        let mut node = self.current.clone();
        loop {
            match node.tag_name() {
                // Reached the root without a match: a stray closer.
                None => return,

                Some(node_name) if node_name == name => {
                    self.current = node.parent_node().unwrap_or_else(|| self.root.clone());
                    return;
                }

                Some(node_name) => {
                    if phrasing && !PHRASING.contains(node_name) {
                        return;
                    }
                }
            }

            let Some(parent) = node.parent_node() else {
                return;
            };
            node = parent;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn parse(html: &str) -> Handle {
        TreeBuilder::new(html, None).build().0
    }

    fn child_names(node: &Handle) -> Vec<String> {
        node.children
            .borrow()
            .iter()
            .map(|child| match &child.data {
                NodeData::Tag { name, .. } => name.to_string(),
                NodeData::Text(text) => format!("#text:{text}"),
                NodeData::Raw(text) => format!("#raw:{text}"),
                NodeData::Comment(_) => "#comment".to_string(),
                NodeData::Cdata(_) => "#cdata".to_string(),
                NodeData::Doctype(_) => "#doctype".to_string(),
                NodeData::Pi(_) => "#pi".to_string(),
                NodeData::Root => "#root".to_string(),
            })
            .collect()
    }

    fn nth_child(node: &Handle, index: usize) -> Handle {
        node.children.borrow()[index].clone()
    }

    #[test]
    fn sibling_paragraphs_from_missing_end_tags() {
        let root = parse("<p>one<p>two");
        assert_eq!(child_names(&root), vec!["p", "p"]);
        assert_eq!(child_names(&nth_child(&root, 0)), vec!["#text:one"]);
        assert_eq!(child_names(&nth_child(&root, 1)), vec!["#text:two"]);
    }

    #[test]
    fn list_items_close_each_other_in_list_scope() {
        let root = parse("<ul><li>a<li>b</ul>");
        let ul = nth_child(&root, 0);
        assert_eq!(child_names(&ul), vec!["li", "li"]);
    }

    #[test]
    fn nested_lists_keep_items_apart() {
        let root = parse("<ul><li>a<ul><li>b<li>c</ul><li>d</ul>");
        let outer = nth_child(&root, 0);
        assert_eq!(child_names(&outer), vec!["li", "li"]);
        let first = nth_child(&outer, 0);
        assert_eq!(child_names(&first), vec!["#text:a", "ul"]);
        let inner = nth_child(&first, 1);
        assert_eq!(child_names(&inner), vec!["li", "li"]);
    }

    #[test]
    fn table_cells_and_rows_close_in_table_scope() {
        let root = parse("<table><tr><td>a<td>b<tr><td>c</table>");
        let table = nth_child(&root, 0);
        assert_eq!(child_names(&table), vec!["tr", "tr"]);
        let first_row = nth_child(&table, 0);
        assert_eq!(child_names(&first_row), vec!["td", "td"]);
    }

    #[test]
    fn table_end_tag_closes_open_sections() {
        let root = parse("<table><tbody><tr><td>a</table>x");
        assert_eq!(child_names(&root), vec!["table", "#text:x"]);
    }

    #[test]
    fn head_ends_when_body_opens() {
        let root = parse("<head><meta><body>x");
        assert_eq!(child_names(&root), vec!["head", "body"]);
    }

    #[test]
    fn options_and_optgroups_close_implicitly() {
        let root = parse("<select><optgroup><option>a<option>b<optgroup><option>c</select>");
        let select = nth_child(&root, 0);
        assert_eq!(child_names(&select), vec!["optgroup", "optgroup"]);
        let first = nth_child(&select, 0);
        assert_eq!(child_names(&first), vec!["option", "option"]);
    }

    #[test]
    fn definition_terms_close_each_other() {
        let root = parse("<dl><dt>a<dd>b<dt>c</dl>");
        let dl = nth_child(&root, 0);
        assert_eq!(child_names(&dl), vec!["dt", "dd", "dt"]);
    }

    #[test]
    fn ruby_annotations_close_each_other() {
        let root = parse("<ruby>x<rt>y<rp>z</ruby>");
        let ruby = nth_child(&root, 0);
        assert_eq!(child_names(&ruby), vec!["#text:x", "rt", "rp"]);
    }

    #[test]
    fn paragraph_level_element_leaves_phrasing_content() {
        let root = parse("<b>bold<p>para</p></b>");
        assert_eq!(child_names(&root), vec!["b", "p"]);
        assert_eq!(child_names(&nth_child(&root, 0)), vec!["#text:bold"]);
        assert_eq!(child_names(&nth_child(&root, 1)), vec!["#text:para"]);
    }

    #[test]
    fn phrasing_closer_cannot_escape_a_block_container() {
        let root = parse("<table><tr><td><b>x</td></b>y");
        let table = nth_child(&root, 0);
        let row = nth_child(&table, 0);
        // The stray "</b>" was ignored; "y" landed after the cell.
        assert_eq!(child_names(&row), vec!["td", "#text:y"]);
        let cell = nth_child(&row, 0);
        assert_eq!(child_names(&cell), vec!["b"]);
    }

    #[test]
    fn block_end_tag_closes_inline_descendants() {
        let root = parse("<div><b>one</div>two");
        assert_eq!(child_names(&root), vec!["div", "#text:two"]);
        let div = nth_child(&root, 0);
        assert_eq!(child_names(&div), vec!["b"]);
    }

    #[test]
    fn stray_end_tags_are_ignored() {
        let root = parse("</div>a</p>b");
        assert_eq!(child_names(&root), vec!["#text:a", "#text:b"]);
    }

    #[test]
    fn empty_end_tag_is_ignored() {
        let root = parse("a</>b");
        assert_eq!(child_names(&root), vec!["#text:a", "#text:b"]);
    }

    #[test]
    fn void_elements_have_no_children() {
        let root = parse("<br>text");
        assert_eq!(child_names(&root), vec!["br", "#text:text"]);
        assert!(nth_child(&root, 0).children.borrow().is_empty());
    }

    #[test]
    fn text_is_entity_decoded_once() {
        let root = parse("a &amp;lt; b");
        assert_eq!(child_names(&root), vec!["#text:a &lt; b"]);
    }

    #[test]
    fn comment_and_cdata_bodies_are_not_decoded() {
        let root = parse("<!--&amp;--><![CDATA[&amp;]]>");
        let comment = nth_child(&root, 0);
        let NodeData::Comment(body) = &comment.data else {
            panic!("expected a comment");
        };
        assert_eq!(body, "&amp;");
        let cdata = nth_child(&root, 1);
        let NodeData::Cdata(body) = &cdata.data else {
            panic!("expected a CDATA section");
        };
        assert_eq!(body, "&amp;");
    }

    #[test]
    fn names_are_lowercased_in_html_mode() {
        let root = parse("<DIV Class=X>t</DIV>");
        let div = nth_child(&root, 0);
        assert_eq!(div.tag_name(), Some("div"));
        let NodeData::Tag { attrs, .. } = &div.data else {
            unreachable!();
        };
        assert_eq!(
            attrs.borrow().get("class"),
            Some(&AttributeValue::String("X".into()))
        );
    }

    #[test]
    fn duplicate_attributes_last_occurrence_wins() {
        let root = parse("<a x=1 X=2>");
        let a = nth_child(&root, 0);
        let NodeData::Tag { attrs, .. } = &a.data else {
            unreachable!();
        };
        let attrs = attrs.borrow();
        assert_eq!(attrs.len(), 1);
        assert_eq!(attrs.get("x"), Some(&AttributeValue::String("2".into())));
    }

    #[test]
    fn script_bodies_become_raw_children() {
        let root = parse("<script>if (1<2) a()</script>");
        let script = nth_child(&root, 0);
        assert_eq!(child_names(&script), vec!["#raw:if (1<2) a()"]);
    }

    #[test]
    fn self_closing_script_captures_no_raw_text() {
        let root = parse("<script/>x");
        assert_eq!(child_names(&root), vec!["script", "#text:x"]);
        assert!(nth_child(&root, 0).children.borrow().is_empty());
    }

    #[test]
    fn xml_mode_preserves_case_and_skips_html_rules() {
        let (root, xml) = TreeBuilder::new("<Outer><P>a<P>b</P></P></Outer>", Some(true)).build();
        assert_eq!(xml, Some(true));
        let outer = nth_child(&root, 0);
        assert_eq!(outer.tag_name(), Some("Outer"));
        // Without HTML tag omission the second P nests inside the first.
        let first = nth_child(&outer, 0);
        assert_eq!(child_names(&first), vec!["#text:a", "P"]);
    }

    #[test]
    fn xml_mode_latches_on_xml_processing_instruction() {
        let (root, xml) = TreeBuilder::new("<?xml version=\"1.0\"?><Foo/>", None).build();
        assert_eq!(xml, Some(true));
        assert_eq!(child_names(&root), vec!["#pi", "Foo"]);
    }

    #[test]
    fn explicit_html_mode_disables_auto_detection() {
        let (root, xml) = TreeBuilder::new("<?xml version=\"1.0\"?><Foo/>", Some(false)).build();
        assert_eq!(xml, Some(false));
        assert_eq!(child_names(&root), vec!["#pi", "foo"]);
    }

    #[test]
    fn parent_links_match_containers() {
        let root = parse("<div><p>a<span>b</span></p></div>");
        fn check(node: &Handle) {
            for child in node.children.borrow().iter() {
                let parent = child.parent_node().expect("non-root nodes have parents");
                assert!(Rc::ptr_eq(&parent, node));
                check(child);
            }
        }
        check(&root);
        assert!(root.parent_node().is_none());
    }
}
