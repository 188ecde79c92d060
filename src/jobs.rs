use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use crate::config::Settings;
use crate::fetch::{Format, PageSource};
use crate::markup::Document;
use crate::model::{Record, RecordPath, Tree};
use crate::parser::content::{Extractor, LinkRegistry};
use crate::parser::{enums, function, structure, summary};

/// A page parse deferred until every navigation node is classified.
#[derive(Debug, Clone)]
pub enum Job {
    Function { href: String, target: RecordPath },
    Hook { href: String, target: RecordPath },
    Summary { href: String, target: RecordPath },
    Struct { href: String, target: RecordPath },
    Enum { href: String, base: Record },
}

impl Job {
    pub fn href(&self) -> &str {
        match self {
            Job::Function { href, .. }
            | Job::Hook { href, .. }
            | Job::Summary { href, .. }
            | Job::Struct { href, .. }
            | Job::Enum { href, .. } => href,
        }
    }
}

/// Fetch and parse every job's page in order, filling in `tree`.
/// The first failed fetch aborts the whole run.
pub fn run(
    settings: &Settings,
    source: &dyn PageSource,
    tree: &mut Tree,
    jobs: Vec<Job>,
    links: &LinkRegistry,
    quiet: bool,
) -> Result<()> {
    let pb = if quiet {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(jobs.len() as u64)
    };
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta}) {msg}")?
            .progress_chars("=> "),
    );

    let ex = Extractor::new(links, &settings.wiki_path);
    let total = jobs.len();

    for job in jobs {
        pb.set_message(job.href().to_string());
        let url = settings.page_url(job.href());
        let markup = source
            .fetch(&url, Format::Xml)
            .with_context(|| format!("Scrape aborted at {}", job.href()))?;
        let mut doc = Document::parse(&markup);
        apply(&ex, &mut doc, tree, job);
        pb.inc(1);
    }

    pb.finish_and_clear();
    info!("Parsed {} pages", total);
    Ok(())
}

fn apply(ex: &Extractor, doc: &mut Document, tree: &mut Tree, job: Job) {
    match job {
        Job::Enum { base, .. } => enums::parse(ex, doc, base, &mut tree.enums),
        Job::Function { target, .. } => {
            if let Some(record) = target_record(tree, &target) {
                function::parse(ex, doc, record);
            }
        }
        Job::Hook { target, .. } => {
            if let Some(record) = target_record(tree, &target) {
                function::parse_hook(ex, doc, record);
            }
        }
        Job::Summary { target, .. } => {
            if let Some(record) = target_record(tree, &target) {
                summary::parse(ex, doc, record);
            }
        }
        Job::Struct { target, .. } => {
            let name = target.keys.last().cloned().unwrap_or_default();
            if let Some(record) = target_record(tree, &target) {
                structure::parse(ex, doc, &name, record);
            }
        }
    }
}

fn target_record<'t>(tree: &'t mut Tree, target: &RecordPath) -> Option<&'t mut Record> {
    let record = tree.get_mut(target);
    if record.is_none() {
        debug!("Job target {:?} no longer in tree", target);
    }
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::MemorySource;
    use crate::model::Src;
    use crate::sidebar;

    const SIDEBAR: &str = r#"<body>
<details class="level1"><summary><div><i></i>Globals<span>1</span></div></summary><ul>
  <li><a class="cm f rs" href="/gmod/Global.Entity" search="Entity">Entity</a></li>
</ul></details>
<details class="level1"><summary><div><i></i>Libraries<span>1</span></div></summary><ul>
  <li><details class="level2"><summary><a class="cm" href="/gmod/util" search="util">util</a></summary><ul>
    <li><a class="cm f rs rc" href="/gmod/util.TraceLine" search="util.TraceLine">TraceLine</a></li>
  </ul></details></li>
</ul></details>
</body>"#;

    const ENTITY_PAGE: &str = r#"<function name="Entity" parent="Global" type="libraryfunc">
<description>Gets an entity by index.</description>
<args><arg name="index" type="number">The index.</arg></args>
</function>"#;

    fn fixture(name: &str) -> String {
        std::fs::read_to_string(format!("tests/fixtures/{}", name)).unwrap()
    }

    fn source(settings: &Settings, with_trace_line: bool) -> MemorySource {
        let mut source = MemorySource::default()
            .with(&settings.page_url("/gmod/Global.Entity"), ENTITY_PAGE)
            .with(&settings.page_url("/gmod/util"), &fixture("library.xml"));
        if with_trace_line {
            source = source.with(&settings.page_url("/gmod/util.TraceLine"), &fixture("function.xml"));
        }
        source
    }

    #[test]
    fn pipeline_fills_stubs() {
        let settings = Settings::default();
        let plan = sidebar::walk(SIDEBAR, &settings.wiki_path);
        let mut tree = plan.tree;
        run(&settings, &source(&settings, true), &mut tree, plan.jobs, &plan.links, true).unwrap();

        let util = &tree.libraries["util"];
        assert_eq!(
            util.docs.description.as_deref(),
            Some("The util library is a collection of [Entity](/gmod/Global.Entity) helpers.")
        );
        assert_eq!(util.docs.warnings, ["Some are internal"]);

        let mut trace_line = util.members().unwrap()["TraceLine"].clone();
        assert!(trace_line.flags.function && trace_line.flags.client);
        let callable = trace_line.callable_mut().unwrap();
        assert_eq!(
            callable.src,
            Some(Src("lua/includes/util.lua".into(), "12-40".into()))
        );
        assert_eq!(callable.arguments.len(), 2);
        assert_eq!(callable.arguments[0].enum_name.as_deref(), Some("MASK"));
        assert!(callable.arguments[1].ty.is_none());
        assert!(callable.arguments[1].enum_name.is_none());

        let entity = &tree.globals["Entity"];
        assert_eq!(entity.docs.description.as_deref(), Some("Gets an entity by index."));
    }

    #[test]
    fn missing_page_aborts_run() {
        let settings = Settings::default();
        let plan = sidebar::walk(SIDEBAR, &settings.wiki_path);
        let mut tree = plan.tree;
        let err = run(&settings, &source(&settings, false), &mut tree, plan.jobs, &plan.links, true)
            .unwrap_err();
        assert_eq!(err.to_string(), "Scrape aborted at /gmod/util.TraceLine");
    }

    #[test]
    fn job_for_removed_target_is_skipped() {
        let settings = Settings::default();
        let plan = sidebar::walk(SIDEBAR, &settings.wiki_path);
        let mut tree = plan.tree;
        tree.libraries.clear();
        run(&settings, &source(&settings, true), &mut tree, plan.jobs, &plan.links, true).unwrap();
        assert!(tree.libraries.is_empty());
        assert!(tree.globals["Entity"].docs.description.is_some());
    }
}
