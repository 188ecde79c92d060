//! Regex alternations for the editor grammar, and the template fill that
//! splices them into `%_NAME_%` placeholders.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::warn;

use crate::model::{Members, Record, Tree};

static PLACEHOLDER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"%_(.+?)_%").unwrap());
static SEGMENT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r".+?(?:_|\.|$)").unwrap());

const ACCESSOR: &str = r"(\.|:)";

pub type Patterns = BTreeMap<String, String>;

fn alternation<'a>(names: impl IntoIterator<Item = &'a String>) -> String {
    names
        .into_iter()
        .map(|n| regex::escape(n))
        .collect::<Vec<_>>()
        .join("|")
}

/// Every placeholder the grammar template knows about.
pub fn patterns(tree: &Tree) -> Patterns {
    let mut p = Patterns::new();

    p.insert(
        "PACKAGES_AND_DERMA".into(),
        format!(
            "({})|({})",
            alternation(tree.libraries.keys()),
            alternation(tree.panels.keys())
        ),
    );

    let methods: Vec<String> = tree
        .classes
        .values()
        .filter_map(Record::members)
        .flat_map(|m| m.keys())
        .map(|n| regex::escape(n))
        .collect();
    p.insert("META_FUNCTIONS".into(), methods.join("|"));

    p.insert("GLOBAL_FUNCTIONS".into(), alternation(tree.globals.keys()));
    p.insert("ENUMS".into(), enums(&tree.enums));
    p.insert("HOOKS".into(), hooks(&tree.hooks));
    p.insert("LIBRARY_FUNCTIONS".into(), library_functions(&tree.libraries));
    p
}

// ── Enums ──

/// Prefix trie over `_`/`.`-terminated name segments.
#[derive(Default)]
struct Trie {
    terminal: bool,
    children: BTreeMap<String, Trie>,
}

impl Trie {
    fn insert(&mut self, name: &str) {
        let node = SEGMENT_RE
            .find_iter(name)
            .fold(self, |node, seg| node.children.entry(seg.as_str().to_string()).or_default());
        node.terminal = true;
    }

    fn render(&self) -> String {
        self.children
            .iter()
            .map(|(segment, child)| {
                let segment = regex::escape(segment);
                match (child.children.len(), child.terminal) {
                    (0, _) => segment,
                    (1, false) => format!("{}{}", segment, child.render()),
                    (_, false) => format!("{}({})", segment, child.render()),
                    (_, true) => format!("{}({})?", segment, child.render()),
                }
            })
            .collect::<Vec<_>>()
            .join("|")
    }
}

/// `ACT_A_B`, `ACT_A_C` → `ACT_A_(B|C)`. Reference-only families are skipped.
fn enums(enums: &Members) -> String {
    let mut trie = Trie::default();
    for (name, record) in enums {
        if !record.flags.ref_only {
            trie.insert(name);
        }
    }
    trie.render()
}

// ── Hooks ──

fn hooks(hooks: &Members) -> String {
    hooks
        .iter()
        .map(|(family, record)| {
            let owner = if family == "GM" {
                "GAMEMODE|GM|self".to_string()
            } else {
                format!("{}|self", regex::escape(family))
            };
            let members = record.members().map(|m| alternation(m.keys())).unwrap_or_default();
            format!("((({}){})({}))", owner, ACCESSOR, members)
        })
        .collect::<Vec<_>>()
        .join("|")
}

// ── Library functions ──

fn collect_searches(members: &Members, out: &mut Vec<String>) {
    for record in members.values() {
        match (record.members(), &record.search) {
            (Some(nested), _) => collect_searches(nested, out),
            (None, Some(search)) => out.push(search.clone()),
            (None, None) => {}
        }
    }
}

/// `(util\.(TraceLine|TraceHull))|(draw\.(Text))`, one group per library.
fn library_functions(libraries: &Members) -> String {
    let groups: Vec<String> = libraries
        .iter()
        .filter_map(|(library, record)| {
            let mut searches = Vec::new();
            collect_searches(record.members()?, &mut searches);
            if searches.is_empty() {
                return None;
            }
            let prefix = format!("{}.", library);
            let names: Vec<String> = searches
                .iter()
                .map(|s| regex::escape(s.strip_prefix(&prefix).unwrap_or(s)))
                .collect();
            Some(format!("({}\\.({}))", regex::escape(library), names.join("|")))
        })
        .collect();
    format!("({})", groups.join("|"))
}

/// Replace each `%_NAME_%` with its pattern. Unknown names stay as written.
pub fn render(template: &str, patterns: &Patterns) -> String {
    PLACEHOLDER_RE
        .replace_all(template, |caps: &Captures| match patterns.get(&caps[1]) {
            Some(pattern) => pattern.clone(),
            None => {
                warn!("Missing pattern for %_{}_%", &caps[1]);
                caps[0].to_string()
            }
        })
        .into_owned()
}
