use std::sync::LazyLock;

use ego_tree::NodeId;
use scraper::Selector;

use super::content::{enum_target, Extractor};
use crate::markup::{selector, Document};
use crate::model::{Param, Record, Src};

static FUNCTION: LazyLock<Selector> = LazyLock::new(|| selector("function"));
static DESCRIPTION: LazyLock<Selector> = LazyLock::new(|| selector("function > description"));
static ARGS: LazyLock<Selector> = LazyLock::new(|| selector("function > args > arg"));
static RETS: LazyLock<Selector> = LazyLock::new(|| selector("function > rets > ret"));
static PREDICTED: LazyLock<Selector> = LazyLock::new(|| selector("function > predicted"));
static CAT: LazyLock<Selector> = LazyLock::new(|| selector("cat"));

/// Function, method, or bare category page.
pub fn parse(ex: &Extractor, doc: &mut Document, record: &mut Record) {
    let body = doc.body();

    if !record.flags.function && !record.flags.event {
        // Category/listing page: drop child listings, keep the prose.
        for cat in doc.select(body, &CAT) {
            doc.remove(cat);
        }
        ex.extract(doc, body, &mut record.docs);
        return;
    }

    let Some(function) = doc.select_first(body, &FUNCTION) else {
        return;
    };

    if record.takes_src() {
        if let Some(src) = view_source(doc, function) {
            if let Some(callable) = record.callable_mut() {
                callable.src = Some(src);
            }
        }
    }

    if let Some(desc) = doc.select_first(body, &DESCRIPTION) {
        ex.extract(doc, desc, &mut record.docs);
    }

    let arguments: Vec<Param> = doc
        .select(body, &ARGS)
        .into_iter()
        .map(|arg| param(ex, doc, arg, true))
        .collect();
    let returns: Vec<Param> = doc
        .select(body, &RETS)
        .into_iter()
        .map(|ret| param(ex, doc, ret, false))
        .collect();

    if let Some(callable) = record.callable_mut() {
        callable.arguments.extend(arguments);
        callable.returns.extend(returns);
    }
}

/// Hook page: a function page plus the prediction marker.
pub fn parse_hook(ex: &Extractor, doc: &mut Document, record: &mut Record) {
    let predicted = doc
        .select_first(doc.body(), &PREDICTED)
        .is_some_and(|p| doc.text(p) == "Yes");
    if predicted {
        record.flags.predicted = true;
    }
    parse(ex, doc, record);
}

/// `<file line="L10-L20">path</file>` → `[path, "10-20"]`.
fn view_source(doc: &Document, function: NodeId) -> Option<Src> {
    doc.children_named(function, "file")
        .into_iter()
        .filter_map(|file| {
            let line = doc.attr(file, "line")?;
            Some(Src(doc.text(file).trim().to_string(), line.replace('L', "")))
        })
        .last()
}

fn param(ex: &Extractor, doc: &mut Document, el: NodeId, probe_enum: bool) -> Param {
    let mut param = Param {
        name: doc.attr_nonempty(el, "name").map(str::to_string),
        ty: doc.attr_nonempty(el, "type").map(str::to_string),
        ..Param::default()
    };

    if probe_enum && param.ty.as_deref() == Some("number") {
        param.enum_name = doc
            .children_named(el, "page")
            .into_iter()
            .filter_map(|page| enum_target(&doc.text(page)).map(str::to_string))
            .last();
    }

    ex.extract(doc, el, &mut param.docs);
    param
}
