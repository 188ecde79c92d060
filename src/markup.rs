//! Parsed markup with the handful of queries the page parsers need.
//!
//! Nodes are addressed by [`NodeId`] so callers can read, collect, then
//! detach without holding borrows into the tree across mutations.

use ego_tree::NodeId;
use scraper::{ElementRef, Html, Node, Selector};

/// A direct child of an element, in document order.
pub enum Child<'a> {
    Text(&'a str),
    Element(NodeId),
}

pub struct Document {
    html: Html,
}

impl Document {
    pub fn parse(markup: &str) -> Self {
        Self {
            html: Html::parse_document(markup),
        }
    }

    /// The `<body>` element, where parsed page content lands.
    pub fn body(&self) -> NodeId {
        let root = self.html.root_element();
        root.children()
            .filter_map(ElementRef::wrap)
            .find(|e| e.value().name() == "body")
            .unwrap_or(root)
            .id()
    }

    fn element(&self, id: NodeId) -> Option<ElementRef<'_>> {
        self.html.tree.get(id).and_then(ElementRef::wrap)
    }

    /// Elements matching `selector` within `scope`, the scope itself included.
    pub fn select(&self, scope: NodeId, selector: &Selector) -> Vec<NodeId> {
        let Some(el) = self.element(scope) else {
            return Vec::new();
        };
        let mut found = Vec::new();
        if selector.matches(&el) {
            found.push(el.id());
        }
        found.extend(el.select(selector).map(|e| e.id()));
        found
    }

    pub fn select_first(&self, scope: NodeId, selector: &Selector) -> Option<NodeId> {
        self.select(scope, selector).into_iter().next()
    }

    /// Direct element children with the given tag name.
    pub fn children_named(&self, parent: NodeId, tag: &str) -> Vec<NodeId> {
        self.element(parent)
            .map(|el| {
                el.children()
                    .filter_map(ElementRef::wrap)
                    .filter(|c| c.value().name() == tag)
                    .map(|c| c.id())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn child_named(&self, parent: NodeId, tag: &str) -> Option<NodeId> {
        self.children_named(parent, tag).into_iter().next()
    }

    /// Direct element children regardless of tag.
    pub fn child_elements(&self, parent: NodeId) -> Vec<NodeId> {
        self.element(parent)
            .map(|el| el.children().filter_map(ElementRef::wrap).map(|c| c.id()).collect())
            .unwrap_or_default()
    }

    /// Text nodes and elements directly under `parent`; comments are skipped.
    pub fn child_nodes(&self, parent: NodeId) -> Vec<Child<'_>> {
        let Some(node) = self.html.tree.get(parent) else {
            return Vec::new();
        };
        node.children()
            .filter_map(|c| match c.value() {
                Node::Text(t) => Some(Child::Text(&**t)),
                Node::Element(_) => Some(Child::Element(c.id())),
                _ => None,
            })
            .collect()
    }

    /// Concatenated text of every descendant text node.
    pub fn text(&self, id: NodeId) -> String {
        self.element(id).map(|e| e.text().collect()).unwrap_or_default()
    }

    pub fn tag(&self, id: NodeId) -> &str {
        self.element(id).map(|e| e.value().name()).unwrap_or("")
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id).and_then(|e| e.value().attr(name))
    }

    /// Attribute value, treating an empty string as absent.
    pub fn attr_nonempty(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attr(id, name).filter(|v| !v.is_empty())
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.element(id)
            .map(|e| e.value().classes().any(|c| c == class))
            .unwrap_or(false)
    }

    pub fn classes(&self, id: NodeId) -> Vec<&str> {
        self.element(id)
            .map(|e| e.value().classes().collect())
            .unwrap_or_default()
    }

    /// Detach a node (and its subtree) from the document.
    pub fn remove(&mut self, id: NodeId) {
        if let Some(mut node) = self.html.tree.get_mut(id) {
            node.detach();
        }
    }
}

/// Compile a constant selector. Only used for literals inside `LazyLock`s.
pub fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap()
}

#[cfg(test)]
mod tests {
    use std::sync::LazyLock;

    use super::*;

    static ARG: LazyLock<Selector> = LazyLock::new(|| selector("function > args > arg"));
    static LINK: LazyLock<Selector> = LazyLock::new(|| selector("a.cm"));

    const PAGE: &str = r#"<function name="Add" parent="hook" type="libraryfunc">
<description>Adds a hook. <note>Careful</note></description>
<args><arg name="a" type="string">first</arg><arg name="b" type="number">second</arg></args>
</function>"#;

    #[test]
    fn select_and_attrs() {
        let doc = Document::parse(PAGE);
        let args = doc.select(doc.body(), &ARG);
        assert_eq!(args.len(), 2);
        assert_eq!(doc.attr(args[0], "name"), Some("a"));
        assert_eq!(doc.attr(args[1], "type"), Some("number"));
        assert_eq!(doc.text(args[1]), "second");
    }

    #[test]
    fn select_includes_scope() {
        let doc = Document::parse(r#"<a class="cm f" href="/gmod/x" search="x">x</a>"#);
        let a = doc.select(doc.body(), &LINK)[0];
        assert_eq!(doc.select(a, &LINK), vec![a]);
        assert!(doc.has_class(a, "f"));
        assert!(!doc.has_class(a, "depr"));
    }

    #[test]
    fn remove_detaches_subtree() {
        let mut doc = Document::parse(PAGE);
        let desc = doc.select(doc.body(), &selector("description"))[0];
        let note = doc.child_named(desc, "note").unwrap();
        doc.remove(note);
        assert_eq!(doc.text(desc).trim(), "Adds a hook.");
        assert!(doc.child_named(desc, "note").is_none());
    }
}
