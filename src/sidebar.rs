//! Navigation-tree walk: classify every sidebar node, create its stub record,
//! and queue the page parse that will fill it in later.

use std::sync::LazyLock;

use ego_tree::NodeId;
use scraper::Selector;
use tracing::info;

use crate::jobs::Job;
use crate::markup::{selector, Document};
use crate::model::{Category, EnumValue, Record, RecordPath, Tree};
use crate::parser::content::LinkRegistry;

static PANEL_LINKS: LazyLock<Selector> = LazyLock::new(|| selector("a.cm.panel"));
static HOOK_LINKS: LazyLock<Selector> = LazyLock::new(|| selector("a.cm.event"));
static ENUM_LINKS: LazyLock<Selector> = LazyLock::new(|| selector("a.cm.enum"));
static SECTIONS: LazyLock<Selector> = LazyLock::new(|| selector("details.level1"));
static SUMMARY_LINK: LazyLock<Selector> = LazyLock::new(|| selector("summary > a"));
static ANY_LINK: LazyLock<Selector> = LazyLock::new(|| selector("a"));
static CM_LINK: LazyLock<Selector> = LazyLock::new(|| selector("a.cm"));

/// Hook families documented under a different global name.
const FAMILY_RENAMES: &[(&str, &str)] = &[("WEAPON", "SWEP"), ("ENTITY", "ENT")];

/// Stub tree plus the page parses still owed to it.
pub struct Plan {
    pub tree: Tree,
    pub jobs: Vec<Job>,
    pub links: LinkRegistry,
}

struct Walker<'a> {
    doc: &'a Document,
    wiki_path: &'a str,
    tree: Tree,
    jobs: Vec<Job>,
    links: LinkRegistry,
}

/// Walk the sidebar markup. Panels go first so panel hooks can be told apart.
pub fn walk(markup: &str, wiki_path: &str) -> Plan {
    let mut doc = Document::parse(markup);
    let sections = section_labels(&mut doc);

    let mut w = Walker {
        doc: &doc,
        wiki_path,
        tree: Tree::default(),
        jobs: Vec::new(),
        links: LinkRegistry::default(),
    };

    w.register_panels();
    w.register_hooks();
    w.register_enums();

    for (label, section) in sections {
        match label.as_str() {
            "Globals" => w.globals(section),
            "Structs" => w.structs(section),
            "Panels" => {
                let mut items = w.level2_items(section);
                items.extend(
                    w.chain(section, &["ul", "li", "a"])
                        .into_iter()
                        .filter(|&a| w.doc.has_class(a, "cm")),
                );
                w.subcategory(Category::Panels, items);
            }
            "Classes" => {
                let items = w.level2_items(section);
                w.subcategory(Category::Classes, items);
            }
            "Libraries" => {
                let items = w.level2_items(section);
                w.subcategory(Category::Libraries, items);
            }
            _ => {}
        }
    }

    info!(
        "Sidebar: {} globals, {} hook families, {} panels, {} classes, {} libraries, {} structs; {} pages queued, {} links registered",
        w.tree.globals.len(),
        w.tree.hooks.len(),
        w.tree.panels.len(),
        w.tree.classes.len(),
        w.tree.libraries.len(),
        w.tree.structs.len(),
        w.jobs.len(),
        w.links.len(),
    );

    Plan {
        tree: w.tree,
        jobs: w.jobs,
        links: w.links,
    }
}

/// Top-level sections with their display label. The label div's second
/// child (the item count) is dropped before reading the text.
fn section_labels(doc: &mut Document) -> Vec<(String, NodeId)> {
    let mut out = Vec::new();
    for section in doc.select(doc.body(), &SECTIONS) {
        let Some(div) = doc
            .child_named(section, "summary")
            .and_then(|s| doc.child_named(s, "div"))
        else {
            continue;
        };
        if let Some(&count) = doc.child_elements(div).get(1) {
            doc.remove(count);
        }
        out.push((doc.text(div).trim().to_string(), section));
    }
    out
}

impl Walker<'_> {
    /// Follow direct children by tag name, e.g. `["ul", "li", "a"]`.
    fn chain(&self, from: NodeId, tags: &[&str]) -> Vec<NodeId> {
        tags.iter().fold(vec![from], |nodes, tag| {
            nodes
                .into_iter()
                .flat_map(|n| self.doc.children_named(n, tag))
                .collect()
        })
    }

    fn level2_items(&self, section: NodeId) -> Vec<NodeId> {
        self.chain(section, &["ul", "li", "details"])
            .into_iter()
            .filter(|&d| self.doc.has_class(d, "level2"))
            .collect()
    }

    fn link_of(&self, el: NodeId) -> Option<String> {
        let href = self.doc.attr(el, "href")?;
        Some(href.strip_prefix(self.wiki_path).unwrap_or(href).to_string())
    }

    /// Set `LINK` from the node's href; optionally remember link → name.
    fn add_link(&mut self, record: &mut Record, el: NodeId, name: &str, register: bool) {
        if let Some(link) = self.link_of(el) {
            if register {
                self.links.register(&link, name);
            }
            record.link = Some(link);
        }
    }

    fn queue(&mut self, job: Job) {
        self.jobs.push(job);
    }

    // ── Pass 1: panels, hooks, enums ──

    fn register_panels(&mut self) {
        let doc = self.doc;
        for panel in doc.select(doc.body(), &PANEL_LINKS) {
            if let Some(search) = doc.attr(panel, "search") {
                self.tree
                    .panels
                    .insert(search.replace(' ', "_"), Record::container(None));
            }
        }
    }

    fn register_hooks(&mut self) {
        let doc = self.doc;
        for hook in doc.select(doc.body(), &HOOK_LINKS) {
            let Some(search) = doc.attr(hook, "search") else {
                continue;
            };
            let mut path = search.split(':');
            let (Some(family), Some(member)) = (path.next(), path.next()) else {
                continue;
            };

            if self.tree.panels.contains_key(family) {
                continue;
            }

            let family_href = format!("{}{}_HOOKS", self.wiki_path, family);
            let family = FAMILY_RENAMES
                .iter()
                .find(|(from, _)| *from == family)
                .map_or(family, |(_, to)| *to)
                .to_string();

            let family_path = RecordPath::new(Category::Hooks, &family);
            if !self.tree.hooks.contains_key(&family) {
                self.tree
                    .hooks
                    .insert(family.clone(), Record::container(Some(family.clone())));
                self.queue(Job::Summary {
                    href: family_href,
                    target: family_path.clone(),
                });
            }

            let search = format!("{}:{}", family, member);
            let mut record = Record::callable(&search);
            record.apply_classes(doc.classes(hook), false);
            self.add_link(&mut record, hook, &search, false);

            if let Some(members) = self
                .tree
                .hooks
                .get_mut(&family)
                .and_then(Record::members_mut)
            {
                members.insert(member.to_string(), record);
            }
            if let Some(href) = doc.attr(hook, "href") {
                self.queue(Job::Hook {
                    href: href.to_string(),
                    target: family_path.member(member),
                });
            }
        }
    }

    fn register_enums(&mut self) {
        let doc = self.doc;
        for node in doc.select(doc.body(), &ENUM_LINKS) {
            let Some(href) = doc.attr(node, "href") else {
                continue;
            };
            let mut base = Record::enum_value(EnumValue {
                family: doc.attr(node, "search").map(str::to_string),
                ..EnumValue::default()
            });
            base.link = self.link_of(node);
            base.apply_classes(doc.classes(node), true);
            self.queue(Job::Enum {
                href: href.to_string(),
                base,
            });
        }
    }

    // ── Pass 2: labelled sections ──

    fn globals(&mut self, section: NodeId) {
        let doc = self.doc;
        for a in self.chain(section, &["ul", "li", "a"]) {
            let Some(name) = doc.attr(a, "search").map(str::to_string) else {
                continue;
            };
            let mut record = Record::callable(&name);
            record.apply_classes(doc.classes(a), false);
            self.add_link(&mut record, a, &name, true);
            self.tree.globals.insert(name.clone(), record);

            if let Some(href) = doc.attr(a, "href") {
                self.queue(Job::Function {
                    href: href.to_string(),
                    target: RecordPath::new(Category::Globals, name),
                });
            }
        }
    }

    fn structs(&mut self, section: NodeId) {
        let doc = self.doc;
        for a in self.chain(section, &["ul", "li", "a"]) {
            let Some(name) = doc.attr(a, "search").map(str::to_string) else {
                continue;
            };
            let mut record = Record::container(Some(name.clone()));
            record.apply_classes(doc.classes(a), true);
            self.add_link(&mut record, a, &name, true);
            self.tree.structs.insert(name.clone(), record);

            if let Some(href) = doc.attr(a, "href") {
                self.queue(Job::Struct {
                    href: href.to_string(),
                    target: RecordPath::new(Category::Structs, name),
                });
            }
        }
    }

    /// Name of a category node: its summary link's `search`, spaces → `_`.
    fn subcategory_name(&self, node: NodeId) -> Option<String> {
        let link = self
            .doc
            .select_first(node, &SUMMARY_LINK)
            .or_else(|| self.doc.select_first(node, &ANY_LINK))?;
        let search = self.doc.attr(link, "search")?;
        Some(search.trim().replace(' ', "_"))
    }

    /// Top-level entries of Panels/Classes/Libraries.
    fn subcategory(&mut self, category: Category, items: Vec<NodeId>) {
        let doc = self.doc;
        for item in items {
            let Some(name) = self.subcategory_name(item) else {
                continue;
            };

            let mut record = Record::container(Some(name.clone()));
            record.apply_classes(doc.classes(item), true);
            self.add_link(&mut record, item, &name, false);
            self.tree.category_mut(category).insert(name.clone(), record);

            let path = RecordPath::new(category, &name);
            let summary_link = doc.child_named(item, "summary").and_then(|s| {
                doc.children_named(s, "a")
                    .into_iter()
                    .find(|&a| doc.has_class(a, "cm"))
            });

            match summary_link {
                Some(link) => {
                    self.queue_summary(link, &path);
                    let deprecated = doc.has_class(item, "depr");
                    self.members(&path, item, deprecated);
                }
                None => {
                    if let Some(link) = doc.select_first(item, &CM_LINK) {
                        self.queue_summary(link, &path);
                    }
                }
            }
        }
    }

    fn queue_summary(&mut self, link: NodeId, target: &RecordPath) {
        let doc = self.doc;
        if let Some(href) = doc.attr(link, "href") {
            self.queue(Job::Summary {
                href: href.to_string(),
                target: target.clone(),
            });
        }
    }

    /// Entries under a category: leaf links become callable members, nested
    /// `<details>` become sub-containers. `deprecated` only flows downward.
    fn members(&mut self, parent: &RecordPath, node: NodeId, deprecated: bool) {
        let doc = self.doc;
        for li in self.chain(node, &["ul", "li"]) {
            if let Some(a) = doc.child_named(li, "a") {
                let Some(search) = doc.attr(a, "search").map(str::to_string) else {
                    continue;
                };
                let name = match search.split_once(':') {
                    Some((_, member)) => member.to_string(),
                    None => doc.text(a).trim().to_string(),
                };

                let mut record = Record::callable(&search);
                if deprecated {
                    record.docs.deprecated.flag();
                }
                record.apply_classes(doc.classes(a), true);
                self.add_link(&mut record, a, &name, false);
                self.insert_member(parent, &name, record);

                if let Some(href) = doc.attr(a, "href") {
                    self.queue(Job::Function {
                        href: href.to_string(),
                        target: parent.member(&name),
                    });
                }
            } else {
                let Some(name) = self.subcategory_name(li) else {
                    continue;
                };
                let mut record = Record::container(None);
                record.apply_classes(doc.classes(li), true);
                self.add_link(&mut record, li, &name, false);
                self.insert_member(parent, &name, record);

                let nested = deprecated || doc.has_class(li, "depr");
                if let Some(details) = doc.child_named(li, "details") {
                    self.members(&parent.member(&name), details, nested);
                }
            }
        }
    }

    fn insert_member(&mut self, parent: &RecordPath, name: &str, record: Record) {
        if let Some(members) = self.tree.get_mut(parent).and_then(Record::members_mut) {
            members.insert(name.to_string(), record);
        }
    }
}
