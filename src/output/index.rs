use std::collections::BTreeMap;

use crate::model::{Category, Members, Record, Tree};

/// Language-server lookup table: `SEARCH` → record without its `SEARCH`.
pub type Index = BTreeMap<String, Record>;

/// Hoist every searchable record into one flat map. Records without a
/// `SEARCH` (nested subcategories, panel stubs) are looked through.
pub fn flatten(tree: &Tree) -> Index {
    let mut index = Index::new();
    for category in Category::ALL {
        hoist(tree.category(category), &mut index);
    }
    index
}

fn hoist(members: &Members, index: &mut Index) {
    for record in members.values() {
        match &record.search {
            Some(search) => {
                let mut entry = record.clone();
                entry.search = None;
                index.insert(search.clone(), entry);
            }
            None => {
                if let Some(nested) = record.members() {
                    hoist(nested, index);
                }
            }
        }
    }
}
