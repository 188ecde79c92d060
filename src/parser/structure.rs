use std::sync::LazyLock;

use scraper::Selector;

use super::content::Extractor;
use crate::markup::{selector, Document};
use crate::model::{Kind, Record};

static DESCRIPTION: LazyLock<Selector> = LazyLock::new(|| selector("structure > description"));
static FIELDS: LazyLock<Selector> = LazyLock::new(|| selector("fields > item"));

/// Struct page: description plus one member record per field.
pub fn parse(ex: &Extractor, doc: &mut Document, struct_name: &str, record: &mut Record) {
    let body = doc.body();

    if let Some(desc) = doc.select_first(body, &DESCRIPTION) {
        ex.extract(doc, desc, &mut record.docs);
    }

    for item in doc.select(body, &FIELDS) {
        let Some(field_name) = doc.attr(item, "name").map(str::to_string) else {
            continue;
        };

        let mut field = Record::field(format!("{}.{}", struct_name, field_name), &field_name);
        if let Kind::Field(f) = &mut field.kind {
            f.ty = doc.attr(item, "type").map(str::to_string);
            f.default = doc.attr_nonempty(item, "default").map(str::to_string);
        }
        ex.extract(doc, item, &mut field.docs);

        if let Some(members) = record.members_mut() {
            members.insert(field_name, field);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::content::LinkRegistry;

    #[test]
    fn struct_fields_become_members() {
        let markup = std::fs::read_to_string("tests/fixtures/struct.xml").unwrap();
        let mut doc = Document::parse(&markup);
        let links = LinkRegistry::default();
        let ex = Extractor::new(&links, "/gmod/");
        let mut record = Record::container(Some("Trace".into()));

        parse(&ex, &mut doc, "Trace", &mut record);

        assert_eq!(record.docs.description.as_deref(), Some("Table used by trace functions."));
        let members = record.members().unwrap();
        assert_eq!(members.len(), 2);

        let start = &members["start"];
        assert_eq!(start.search.as_deref(), Some("Trace.start"));
        let Kind::Field(f) = &start.kind else {
            panic!("expected field, got {:?}", start.kind);
        };
        assert_eq!(f.name, "start");
        assert_eq!(f.ty.as_deref(), Some("Vector"));
        assert_eq!(f.default.as_deref(), Some("Vector(0, 0, 0)"));
        assert_eq!(start.docs.description.as_deref(), Some("Start position."));

        let mask = &members["mask"];
        let Kind::Field(f) = &mask.kind else {
            panic!("expected field");
        };
        assert!(f.default.is_none());
        assert_eq!(mask.docs.notes, ["Uses MASK values"]);
    }
}
