//! Secondary dump merge: source locations keyed by symbol path, plus
//! `cyclic` aliases between entries that share one member table.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::model::{Category, Members, Src, Tree};

pub type DumpTree = BTreeMap<String, DumpEntry>;

/// Categories whose records can receive a source location from the dump.
const INJECT_INTO: [Category; 3] = [Category::Panels, Category::Globals, Category::Classes];

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DumpEntry {
    #[serde(default, deserialize_with = "object_or_empty_list")]
    pub members: DumpTree,
    /// realm → `[file, start, end]`, in document order.
    #[serde(default, deserialize_with = "object_or_empty_list")]
    pub src: serde_json::Map<String, Value>,
    /// realm → dotted path (or list of paths) this entry aliases.
    #[serde(default, deserialize_with = "object_or_empty_list")]
    pub cyclic: serde_json::Map<String, Value>,
}

/// An empty table in the dump is written as `[]`.
fn object_or_empty_list<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw<T> {
        Object(T),
        List(Vec<Value>),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Object(value) => value,
        Raw::List(_) => T::default(),
    })
}

impl DumpEntry {
    fn cyclic_targets(&self) -> impl Iterator<Item = &str> {
        self.cyclic.values().flat_map(|v| match v {
            Value::String(s) => vec![s.as_str()],
            Value::Array(items) => items.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        })
    }

    /// Location from the first realm with a well-formed `[file, start, end]`.
    pub fn first_src(&self) -> Option<Src> {
        self.src.iter().find_map(|(realm, v)| {
            let src = parse_src(v);
            if src.is_none() {
                debug!("Skipping malformed {} src {}", realm, v);
            }
            src
        })
    }
}

fn parse_src(v: &Value) -> Option<Src> {
    let [file, start, end] = v.as_array()?.as_slice() else {
        return None;
    };
    let file = file.as_str()?;
    Some(Src(
        file.to_string(),
        format!("{}-{}", line_number(start)?, line_number(end)?),
    ))
}

fn line_number(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Read the dump. A missing file is not an error; the merge is skipped.
pub fn load(path: &Path) -> Result<Option<DumpTree>> {
    if !path.exists() {
        warn!("No secondary dump at {}, skipping source locations", path.display());
        return Ok(None);
    }
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let dump = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(Some(dump))
}

/// Resolve aliases, then copy source locations into `tree`.
pub fn merge(tree: &mut Tree, mut dump: DumpTree) {
    let resolved = resolve_cycles(&mut dump);
    let injected: usize = INJECT_INTO
        .iter()
        .map(|&category| inject(&dump, tree.category_mut(category)))
        .sum();
    info!("Dump merged: {} cyclic targets resolved, {} source locations", resolved, injected);
}

// ── Cycle resolution ──

fn entry_mut<'d>(dump: &'d mut DumpTree, path: &[String]) -> Option<&'d mut DumpEntry> {
    let (first, rest) = path.split_first()?;
    let mut entry = dump.get_mut(first)?;
    for key in rest {
        entry = entry.members.get_mut(key)?;
    }
    Some(entry)
}

fn entry<'d>(dump: &'d DumpTree, path: &[String]) -> Option<&'d DumpEntry> {
    let (first, rest) = path.split_first()?;
    let mut entry = dump.get(first)?;
    for key in rest {
        entry = entry.members.get(key)?;
    }
    Some(entry)
}

/// Dotted id of every entry → key path, plus target id → aliasing sources.
fn index(
    dump: &DumpTree,
    prefix: &[String],
    paths: &mut HashMap<String, Vec<String>>,
    targets: &mut BTreeMap<String, Vec<Vec<String>>>,
) {
    for (name, entry) in dump {
        let mut path = prefix.to_vec();
        path.push(name.clone());

        for target in entry.cyclic_targets() {
            let sources = targets.entry(target.to_string()).or_default();
            if !sources.contains(&path) {
                sources.push(path.clone());
            }
        }
        index(&entry.members, &path, paths, targets);
        paths.insert(path.join("."), path);
    }
}

fn strip_cyclic(dump: &mut DumpTree) {
    for entry in dump.values_mut() {
        entry.cyclic.clear();
        strip_cyclic(&mut entry.members);
    }
}

/// Make every aliasing entry and its target expose the same member set.
/// Targets absorb their sources (later sources win), and each source gets
/// the target's own members (target wins). All markers are dropped after.
/// Returns the number of targets found.
pub fn resolve_cycles(dump: &mut DumpTree) -> usize {
    let mut paths = HashMap::new();
    let mut targets = BTreeMap::new();
    index(dump, &[], &mut paths, &mut targets);

    let mut resolved = 0;
    for (target_id, sources) in &targets {
        let Some(target_path) = paths.get(target_id) else {
            debug!("Cyclic target {} not in dump", target_id);
            continue;
        };
        let Some(original) = entry(dump, target_path).map(|e| e.members.clone()) else {
            continue;
        };

        let absorbed: Vec<DumpTree> = sources
            .iter()
            .filter_map(|source| entry(dump, source).map(|e| e.members.clone()))
            .collect();

        // Sources go after the target so one nested inside it keeps its update.
        if let Some(target) = entry_mut(dump, target_path) {
            for members in absorbed {
                target.members.extend(members);
            }
        }
        for source in sources {
            if let Some(source) = entry_mut(dump, source) {
                source.members.extend(original.clone());
            }
        }
        resolved += 1;
    }

    strip_cyclic(dump);
    resolved
}

// ── Injection ──

/// Walk the dump and the tree in lock-step by name. Returns locations set.
fn inject(dump: &DumpTree, members: &mut Members) -> usize {
    let mut count = 0;
    for (name, entry) in dump {
        let Some(record) = members.get_mut(name) else {
            continue;
        };
        if record.takes_src() {
            if let (Some(src), Some(callable)) = (entry.first_src(), record.callable_mut()) {
                callable.src = Some(src);
                count += 1;
            }
        }
        if let Some(nested) = record.members_mut() {
            count += inject(&entry.members, nested);
        }
    }
    count
}
