use std::collections::HashMap;
use std::sync::LazyLock;

use ego_tree::NodeId;
use regex::Regex;

use crate::markup::{Child, Document};
use crate::model::{Annotations, Bug};

static BLANKS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

const ENUM_PREFIX: &str = "Enums/";

/// Link target → symbol name, for rendering cross-references by name.
#[derive(Debug, Default)]
pub struct LinkRegistry {
    names: HashMap<String, String>,
}

impl LinkRegistry {
    pub fn register(&mut self, link: &str, name: &str) {
        self.names.insert(link.to_string(), name.to_string());
    }

    pub fn name_for(&self, link: &str) -> Option<&str> {
        self.names.get(link).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Collapse runs of 3+ newlines to a blank line and trim.
pub fn compress_newlines(text: &str) -> String {
    BLANKS_RE.replace_all(text, "\n\n").trim().to_string()
}

/// Pulls descriptions and inline annotations out of page markup.
pub struct Extractor<'a> {
    links: &'a LinkRegistry,
    wiki_path: &'a str,
}

impl<'a> Extractor<'a> {
    pub fn new(links: &'a LinkRegistry, wiki_path: &'a str) -> Self {
        Self { links, wiki_path }
    }

    /// Fill `docs` from `el`. Marker children are detached once read, then the
    /// remaining text becomes (or extends) the description.
    pub fn extract(&self, doc: &mut Document, el: NodeId, docs: &mut Annotations) {
        let markers = [
            doc.children_named(el, "deprecated"),
            doc.children_named(el, "removed"),
        ]
        .concat();
        for marker in markers {
            let text = compress_newlines(&doc.text(marker));
            if !text.is_empty() {
                docs.deprecated.push_detail(text);
            }
            doc.remove(marker);
        }

        for bug in doc.children_named(el, "bug") {
            let pull = doc.attr(bug, "pull").map(str::to_string);
            let issue = if pull.is_none() {
                doc.attr(bug, "issue").map(str::to_string)
            } else {
                None
            };
            docs.bugs.push(Bug {
                pull,
                issue,
                description: self.text(doc, bug),
            });
            doc.remove(bug);
        }

        for (tag, list) in [("note", &mut docs.notes), ("warning", &mut docs.warnings)] {
            for marker in doc.children_named(el, tag) {
                let text = compress_newlines(&doc.text(marker));
                if !text.is_empty() {
                    list.push(text);
                }
                doc.remove(marker);
            }
        }

        if let Some(text) = self.text(doc, el) {
            docs.append_description(&text);
        }
        docs.sort();
    }

    /// Text of `el` with `<page>` cross-references rendered as Markdown links
    /// in place. `None` when nothing but whitespace remains.
    pub fn text(&self, doc: &Document, el: NodeId) -> Option<String> {
        let mut out = String::new();
        self.collect_text(doc, el, &mut out);
        let text = compress_newlines(&out);
        (!text.is_empty()).then_some(text)
    }

    fn collect_text(&self, doc: &Document, el: NodeId, out: &mut String) {
        for child in doc.child_nodes(el) {
            match child {
                Child::Text(t) => out.push_str(t),
                Child::Element(id) if doc.tag(id) == "page" => {
                    out.push_str(&self.page_link(doc, id));
                }
                Child::Element(id) => self.collect_text(doc, id, out),
            }
        }
    }

    fn page_link(&self, doc: &Document, page_el: NodeId) -> String {
        let target = doc.text(page_el).trim().to_string();
        let url = format!("{}{}", self.wiki_path, target.replace(' ', "%20"));

        let label = if let Some(text) = doc.attr(page_el, "text") {
            text.trim().to_string()
        } else if let Some(name) = target.strip_prefix(ENUM_PREFIX) {
            name.to_string()
        } else if let Some(name) = self.links.name_for(&target) {
            name.to_string()
        } else {
            target.clone()
        };

        format!("[{}]({})", label, url)
    }
}

/// Bare enum name when a `<page>` target points at an enum page.
pub fn enum_target(target: &str) -> Option<&str> {
    target.trim().strip_prefix(ENUM_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::selector;
    use crate::model::Deprecation;

    fn first(doc: &Document, css: &str) -> NodeId {
        doc.select(doc.body(), &selector(css))[0]
    }

    fn extract(markup: &str, css: &str, links: &LinkRegistry, docs: &mut Annotations) {
        let mut doc = Document::parse(markup);
        let el = first(&doc, css);
        Extractor::new(links, "/gmod/").extract(&mut doc, el, docs);
    }

    #[test]
    fn link_label_tiers() {
        let mut links = LinkRegistry::default();
        links.register("Global.Entity", "Entity");

        let markup = r#"<description>See <page text="this page">Vector</page>, <page>Enums/IN</page>, <page>Global.Entity</page> and <page>Angle Math</page>.</description>"#;
        let mut docs = Annotations::default();
        extract(markup, "description", &links, &mut docs);

        assert_eq!(
            docs.description.as_deref(),
            Some(
                "See [this page](/gmod/Vector), [IN](/gmod/Enums/IN), \
                 [Entity](/gmod/Global.Entity) and [Angle Math](/gmod/Angle%20Math)."
            )
        );
    }

    #[test]
    fn markers_are_detached_and_sorted() {
        let markup = r#"<description>Main text.
<note>A much longer note text</note>
<note>Short</note>
<warning>Warn</warning>
<bug issue="1234">Breaks on <page>Global.Foo</page></bug>
<bug pull="99"></bug>
</description>"#;
        let mut docs = Annotations::default();
        extract(markup, "description", &LinkRegistry::default(), &mut docs);

        assert_eq!(docs.description.as_deref(), Some("Main text."));
        assert_eq!(docs.notes, ["Short", "A much longer note text"]);
        assert_eq!(docs.warnings, ["Warn"]);
        assert_eq!(docs.bugs.len(), 2);
        assert_eq!(docs.bugs[0].issue.as_deref(), Some("1234"));
        assert_eq!(
            docs.bugs[0].description.as_deref(),
            Some("Breaks on [Global.Foo](/gmod/Global.Foo)")
        );
        assert_eq!(docs.bugs[1].pull.as_deref(), Some("99"));
        assert!(docs.bugs[1].description.is_none());
    }

    #[test]
    fn deprecated_marker_upgrades_flag() {
        let mut docs = Annotations::default();
        docs.deprecated.flag();
        extract(
            "<description>Old.<deprecated>Use the new thing instead</deprecated></description>",
            "description",
            &LinkRegistry::default(),
            &mut docs,
        );
        assert_eq!(
            docs.deprecated,
            Deprecation::Detailed(vec!["Use the new thing instead".into()])
        );
        assert_eq!(docs.description.as_deref(), Some("Old."));
    }

    #[test]
    fn empty_markers_contribute_nothing() {
        let mut docs = Annotations::default();
        extract(
            "<description>  <note>  </note><removed></removed> </description>",
            "description",
            &LinkRegistry::default(),
            &mut docs,
        );
        assert!(docs.description.is_none());
        assert!(docs.notes.is_empty());
        assert!(docs.deprecated.is_none());
    }

    #[test]
    fn descriptions_accumulate() {
        let mut docs = Annotations::default();
        docs.append_description("First.");
        extract(
            "<summary>Second.\n\n\n\nThird.</summary>",
            "summary",
            &LinkRegistry::default(),
            &mut docs,
        );
        assert_eq!(docs.description.as_deref(), Some("First.\n\nSecond.\n\nThird."));
    }

    #[test]
    fn registry_counts_distinct_links() {
        let mut links = LinkRegistry::default();
        assert!(links.is_empty());
        links.register("Global.Entity", "Entity");
        links.register("Global.Entity", "Entity");
        assert_eq!(links.len(), 1);
        assert!(!links.is_empty());
    }

    #[test]
    fn enum_target_prefix() {
        assert_eq!(enum_target(" Enums/KEY "), Some("KEY"));
        assert_eq!(enum_target("Global.Entity"), None);
    }
}
