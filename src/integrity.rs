use tracing::warn;

use crate::model::{Category, Members, Tree};

/// Drop records keyed by the empty string, at any depth. Returns how many.
pub fn strip_empty_keys(tree: &mut Tree, wiki_url: &str) -> usize {
    Category::ALL
        .iter()
        .map(|&category| strip(tree.category_mut(category), category.key(), wiki_url))
        .sum()
}

/// Post-order: children are swept before their own empty key is dropped.
fn strip(members: &mut Members, id_base: &str, wiki_url: &str) -> usize {
    let mut stripped = 0;
    for (key, record) in members.iter_mut() {
        if let Some(nested) = record.members_mut() {
            stripped += strip(nested, &member_id(id_base, key), wiki_url);
        }
    }
    if let Some(record) = members.remove("") {
        let id = member_id(id_base, "");
        match &record.link {
            Some(link) => warn!("Stripped \"{}\" (empty key), see {}{}", id, wiki_url, link),
            None => warn!("Stripped \"{}\" (empty key)", id),
        }
        stripped += 1;
    }
    stripped
}

fn member_id(id_base: &str, key: &str) -> String {
    let key = if key.is_empty() { "<empty>" } else { key };
    format!("{}.{}", id_base, key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Record;

    #[test]
    fn removes_only_the_empty_key() {
        let mut tree = Tree::default();
        let mut broken = Record::callable("");
        broken.link = Some("Global.".into());
        tree.globals.insert("".into(), broken);
        tree.globals.insert("Entity".into(), Record::callable("Entity"));
        tree.globals.insert("print".into(), Record::callable("print"));

        assert_eq!(strip_empty_keys(&mut tree, "https://wiki.facepunch.com/gmod/"), 1);
        let keys: Vec<&str> = tree.globals.keys().map(String::as_str).collect();
        assert_eq!(keys, ["Entity", "print"]);
    }

    #[test]
    fn recurses_into_members() {
        let mut tree = Tree::default();
        let mut lib = Record::container(Some("util".into()));
        let mut sub = Record::container(None);
        sub.members_mut().unwrap().insert("".into(), Record::callable("util.x."));
        sub.members_mut().unwrap().insert("Start".into(), Record::callable("util.x.Start"));
        lib.members_mut().unwrap().insert("x".into(), sub);
        lib.members_mut().unwrap().insert("".into(), Record::callable("util."));
        tree.libraries.insert("util".into(), lib);

        assert_eq!(strip_empty_keys(&mut tree, ""), 2);
        let util = tree.libraries["util"].members().unwrap();
        assert!(!util.contains_key(""));
        let x = util["x"].members().unwrap();
        assert_eq!(x.len(), 1);
        assert!(x.contains_key("Start"));
    }

    #[test]
    fn empty_keys_inside_empty_keys_are_counted() {
        let mut tree = Tree::default();
        let mut broken = Record::container(None);
        broken
            .members_mut()
            .unwrap()
            .insert("".into(), Record::callable("x"));
        tree.panels.insert("".into(), broken);

        assert_eq!(strip_empty_keys(&mut tree, ""), 2);
        assert!(tree.panels.is_empty());
    }

    #[test]
    fn empty_key_ids_are_readable() {
        assert_eq!(member_id("GLOBALS", ""), "GLOBALS.<empty>");
        assert_eq!(member_id("LIBRARIES", "util"), "LIBRARIES.util");
    }
}
