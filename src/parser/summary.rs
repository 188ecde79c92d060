use std::sync::LazyLock;

use scraper::Selector;

use super::content::Extractor;
use crate::markup::{selector, Document};
use crate::model::{Kind, Record};

static PANEL: LazyLock<Selector> = LazyLock::new(|| selector("panel"));
static SUMMARY: LazyLock<Selector> = LazyLock::new(|| selector("summary"));

/// Library, class, hook family or panel landing page.
pub fn parse(ex: &Extractor, doc: &mut Document, record: &mut Record) {
    let body = doc.body();

    if let Some(panel) = doc.select_first(body, &PANEL) {
        let parent = doc.child_named(panel, "parent").map(|p| doc.text(p));
        let preview = doc.child_named(panel, "preview").map(|p| doc.text(p));
        if let Kind::Container(c) = &mut record.kind {
            c.parent = parent;
            c.preview = preview;
        }
        if let Some(desc) = doc.child_named(panel, "description") {
            ex.extract(doc, desc, &mut record.docs);
        }
        return;
    }

    if let Some(summary) = doc.select_first(body, &SUMMARY) {
        ex.extract(doc, summary, &mut record.docs);
    }
}
