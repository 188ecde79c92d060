use std::sync::LazyLock;

use scraper::Selector;

use super::content::Extractor;
use crate::markup::{selector, Document};
use crate::model::{Annotations, Kind, Members, Record};

static DESCRIPTION: LazyLock<Selector> = LazyLock::new(|| selector("enum > description"));
static ITEMS: LazyLock<Selector> = LazyLock::new(|| selector("items > item"));

/// Warning text that marks an enum family as documentation-only.
const REFERENCE_MARKER: &str = "reference";
const ALIAS_SEPARATOR: &str = " or ";

/// Enum page: every value (and every alias of a value) becomes its own
/// record in `enums`, cloned from `base`.
pub fn parse(ex: &Extractor, doc: &mut Document, mut base: Record, enums: &mut Members) {
    let body = doc.body();

    if let Some(desc) = doc.select_first(body, &DESCRIPTION) {
        ex.extract(doc, desc, &mut base.docs);
    }

    let base_description = base.docs.description.take();
    if let Kind::EnumValue(v) = &mut base.kind {
        v.base_description = base_description;
    }

    let before = base.docs.warnings.len();
    base.docs.warnings.retain(|w| !w.contains(REFERENCE_MARKER));
    let reference_only = base.docs.warnings.len() != before;

    let base_link = base.link.clone().unwrap_or_default();

    for item in doc.select(body, &ITEMS) {
        let Some(key) = doc.attr(item, "key").map(str::to_string) else {
            continue;
        };
        let value = doc.attr(item, "value").unwrap_or_default().to_string();

        let mut fragment = Annotations::default();
        ex.extract(doc, item, &mut fragment);

        for alias in key.rsplit(ALIAS_SEPARATOR) {
            let alias = alias.trim();
            let mut record = base.clone();
            record.search = Some(alias.to_string());
            record.link = Some(format!("{}#{}", base_link, alias));
            record.flags.ref_only |= reference_only;
            if let Kind::EnumValue(v) = &mut record.kind {
                v.value = value.clone();
            }
            record.docs.absorb(&fragment);
            enums.insert(alias.to_string(), record);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EnumValue;
    use crate::parser::content::LinkRegistry;

    fn base() -> Record {
        let mut base = Record::enum_value(EnumValue {
            family: Some("KEY".into()),
            ..EnumValue::default()
        });
        base.link = Some("Enums/KEY".into());
        base.flags.client = true;
        base
    }

    fn parse_fixture() -> Members {
        let markup = std::fs::read_to_string("tests/fixtures/enum.xml").unwrap();
        let mut doc = Document::parse(&markup);
        let links = LinkRegistry::default();
        let ex = Extractor::new(&links, "/gmod/");
        let mut enums = Members::new();
        parse(&ex, &mut doc, base(), &mut enums);
        enums
    }

    #[test]
    fn aliases_are_independent_records() {
        let enums = parse_fixture();
        assert_eq!(enums.len(), 3);

        let a = &enums["KEY_A"];
        let first = &enums["KEY_FIRST"];
        assert_eq!(a.search.as_deref(), Some("KEY_A"));
        assert_eq!(first.search.as_deref(), Some("KEY_FIRST"));
        assert_eq!(a.link.as_deref(), Some("Enums/KEY#KEY_A"));
        assert_eq!(first.link.as_deref(), Some("Enums/KEY#KEY_FIRST"));

        for r in [a, first] {
            let Kind::EnumValue(v) = &r.kind else {
                panic!("expected enum value");
            };
            assert_eq!(v.value, "11");
            assert_eq!(v.family.as_deref(), Some("KEY"));
            assert_eq!(v.base_description.as_deref(), Some("Used by [Global.Entity](/gmod/Global.Entity)."));
            assert_eq!(r.docs.description.as_deref(), Some("The A key"));
            assert_eq!(r.docs.notes, ["Alias", "Values may change"]);
            assert!(r.flags.client);
        }
        assert_eq!(a.docs, first.docs);
        assert_eq!(a.flags, first.flags);
    }

    #[test]
    fn reference_warning_becomes_flag() {
        let enums = parse_fixture();
        for r in enums.values() {
            assert!(r.flags.ref_only);
            assert!(r.docs.warnings.is_empty());
        }
        let b = &enums["KEY_B"];
        assert_eq!(b.docs.notes, ["Values may change"]);
        assert_eq!(b.docs.description.as_deref(), Some("The B key"));
    }

    #[test]
    fn plain_enum_keeps_warnings() {
        let mut doc = Document::parse(
            r#"<enum><description>Flags.<warning>Mind the bits</warning></description>
<items><item key="F_ONE" value="1"></item></items></enum>"#,
        );
        let links = LinkRegistry::default();
        let ex = Extractor::new(&links, "/gmod/");
        let mut enums = Members::new();
        parse(&ex, &mut doc, base(), &mut enums);

        let one = &enums["F_ONE"];
        assert!(!one.flags.ref_only);
        assert_eq!(one.docs.warnings, ["Mind the bits"]);
        assert!(one.docs.description.is_none());
    }

    #[test]
    fn every_alias_of_a_key_is_emitted() {
        let mut doc = Document::parse(
            r#"<enum><items><item key="IN_A or IN_B or IN_C" value="4">Shared</item></items></enum>"#,
        );
        let links = LinkRegistry::default();
        let ex = Extractor::new(&links, "/gmod/");
        let mut enums = Members::new();
        parse(&ex, &mut doc, base(), &mut enums);

        let keys: Vec<&str> = enums.keys().map(String::as_str).collect();
        assert_eq!(keys, ["IN_A", "IN_B", "IN_C"]);
        for (name, r) in &enums {
            assert_eq!(r.link.as_deref(), Some(format!("Enums/KEY#{}", name).as_str()));
            assert_eq!(r.docs.description.as_deref(), Some("Shared"));
        }
    }
}
