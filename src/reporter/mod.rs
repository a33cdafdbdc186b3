//! Wires the stats tracker and the tree renderer to an engine's lifecycle
//! events and keeps the stats bar in the document current.

pub mod filter;
pub mod page;

use std::cell::RefCell;
use std::rc::Rc;

use tracing::{debug, info, warn};

use crate::config::ReportConfig;
use crate::dom::{Container, Document, NodeId, fragment};
use crate::error::{ReportError, Result};
use crate::events::{Engine, Event, EventKind, RunContext};
use crate::renderer::{DeepLink, RenderOptions, TreeRenderer};
use crate::stats::{Clock, StatsSnapshot, StatsTracker};

pub use filter::Filter;

pub const STATS_ID: &str = "hydro-stats";
pub const REPORT_ID: &str = "hydro-report";

const STATS_TEMPLATE: &str = concat!(
    r#"<ul id="hydro-stats">"#,
    r#"<li class="progress"><progress max="100" value="0"></progress><em>0</em>%</li>"#,
    r##"<li class="passes"><a href="#">passes:</a> <em>0</em></li>"##,
    r##"<li class="failures"><a href="#">failures:</a> <em>0</em></li>"##,
    r#"<li class="duration">duration: <em>0</em>s</li>"#,
    "</ul>"
);
const REPORT_TEMPLATE: &str = r#"<ul id="hydro-report"></ul>"#;

/// Stats-bar nodes refreshed as results arrive.
#[derive(Debug, Clone, Copy)]
struct StatsView {
    progress: NodeId,
    percent: NodeId,
    passes: NodeId,
    failures: NodeId,
    duration: NodeId,
    passes_link: NodeId,
    failures_link: NodeId,
}

impl StatsView {
    fn locate(doc: &Document, bar: NodeId) -> Result<Self> {
        Ok(Self {
            progress: find(doc, bar, "progress", "progress", "progress bar")?,
            percent: find(doc, bar, "progress", "em", "progress percent")?,
            passes: find(doc, bar, "passes", "em", "passes count")?,
            failures: find(doc, bar, "failures", "em", "failures count")?,
            duration: find(doc, bar, "duration", "em", "duration")?,
            passes_link: find(doc, bar, "passes", "a", "passes link")?,
            failures_link: find(doc, bar, "failures", "a", "failures link")?,
        })
    }

    fn update(&self, doc: &mut Document, snap: &StatsSnapshot) {
        let percent = snap.percent.to_string();
        doc.set_attr(self.progress, "value", &percent);
        doc.set_text(self.percent, &percent);
        doc.set_text(self.passes, &snap.passes.to_string());
        doc.set_text(self.failures, &snap.failures.to_string());
        doc.set_text(self.duration, &snap.seconds_label());
    }
}

fn find(
    doc: &Document,
    bar: NodeId,
    item: &str,
    tag: &str,
    what: &'static str,
) -> Result<NodeId> {
    doc.elements_with_classes(bar, &[item])
        .into_iter()
        .find_map(|li| doc.first_by_tag(li, tag))
        .ok_or(ReportError::MissingElement(what))
}

struct ReporterState {
    page: Rc<RefCell<Document>>,
    stats: StatsTracker,
    renderer: TreeRenderer,
    view: StatsView,
    root: NodeId,
    report: NodeId,
    detached: bool,
}

impl ReporterState {
    fn handle(&mut self, event: &Event, ctx: &RunContext) {
        if self.detached {
            return;
        }

        // A busy document only skips the writes below; counters and suite
        // nesting still advance.
        let mut doc = self.page.try_borrow_mut().ok();
        if let Some(doc) = doc.as_deref()
            && doc.parent(self.report) != Some(self.root)
        {
            debug!(event = %event.kind(), "report no longer mounted, reporter detached");
            self.detached = true;
            return;
        }

        match event {
            Event::PreAll => self.stats.start(ctx.planned),
            Event::PreSuite(suite) => {
                match doc.as_deref_mut() {
                    Some(doc) => {
                        self.renderer.enter_suite(doc, suite);
                    }
                    None => {
                        warn!(suite = %suite.title, "document busy, suite not rendered");
                        self.renderer.enter_detached(suite);
                    }
                }
                return;
            }
            Event::PostSuite(_) => {
                self.renderer.leave_suite();
                return;
            }
            Event::PostTest(test) => {
                self.stats.record(test.status);
                match doc.as_deref_mut() {
                    Some(doc) => {
                        self.renderer.add_test(doc, test);
                    }
                    None => warn!(test = %test.title, "document busy, test not rendered"),
                }
            }
            Event::PostAll => self.stats.finish(),
        }

        let snap = self.stats.snapshot();
        match doc.as_deref_mut() {
            Some(doc) => self.view.update(doc, &snap),
            None => warn!(event = %event.kind(), "document busy, stats bar not refreshed"),
        }

        if matches!(event, Event::PostAll) {
            info!(
                passes = snap.passes,
                failures = snap.failures,
                pending = snap.pending,
                duration_ms = snap.duration_ms.unwrap_or(snap.elapsed_ms),
                "run complete"
            );
        }
    }
}

/// Returned by [`use_reporter`]; reads the reporter's live state.
#[derive(Clone)]
pub struct ReporterHandle {
    state: Rc<RefCell<ReporterState>>,
    root: NodeId,
    stats_bar: NodeId,
    report: NodeId,
}

impl ReporterHandle {
    pub fn snapshot(&self) -> StatsSnapshot {
        self.state.borrow().stats.snapshot()
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn stats_bar(&self) -> NodeId {
        self.stats_bar
    }

    pub fn report(&self) -> NodeId {
        self.report
    }

    /// Open containers including the report root.
    pub fn depth(&self) -> usize {
        self.state.borrow().renderer.stack().depth()
    }

    pub fn page(&self) -> Rc<RefCell<Document>> {
        Rc::clone(&self.state.borrow().page)
    }

    /// Stop reacting to events. Handlers stay registered with the engine
    /// but return immediately.
    pub fn detach(&self) {
        self.state.borrow_mut().detached = true;
    }

    pub fn is_detached(&self) -> bool {
        self.state.borrow().detached
    }

    pub fn toggle(&self, filter: Filter) {
        let page = self.page();
        let mut doc = page.borrow_mut();
        filter::toggle(&mut *doc, self.report, filter);
    }
}

/// Attach an HTML reporter to `engine`, rendering into `page`.
///
/// The report mounts into `root` when given, else the element with id
/// `config.root_id`, else a new `<div>` with that id appended to the body.
/// Mounting twice into the same root replaces the earlier stats bar and report.
/// The earlier reporter's handlers stay registered, since [`Engine`] has no
/// way to remove them, but they go inert once they see their report is gone.
/// [`ReporterHandle::detach`] silences a reporter explicitly.
pub fn use_reporter<E: Engine + ?Sized>(
    engine: &mut E,
    page: Rc<RefCell<Document>>,
    root: Option<NodeId>,
    config: &ReportConfig,
    clock: Rc<dyn Clock>,
) -> Result<ReporterHandle> {
    let (root, stats_bar, report, view) = {
        let mut doc = page.borrow_mut();
        let root = resolve_root(&mut doc, root, &config.root_id);
        clear_previous(&mut doc, root);

        let stats_bar = fragment(&mut doc, STATS_TEMPLATE, &[])?;
        let view = StatsView::locate(&doc, stats_bar)?;
        let report = fragment(&mut doc, REPORT_TEMPLATE, &[])?;
        doc.append_child(root, stats_bar);
        doc.append_child(root, report);

        filter::bind(&mut doc, view.passes_link, report, Filter::Passes);
        filter::bind(&mut doc, view.failures_link, report, Filter::Failures);
        (root, stats_bar, report, view)
    };

    let options = RenderOptions {
        links: DeepLink::new(config.focus_param.as_str()),
        highlight: config.highlight,
        focus_on_dblclick: config.focus_on_dblclick,
    };
    let state = Rc::new(RefCell::new(ReporterState {
        page,
        stats: StatsTracker::new(clock),
        renderer: TreeRenderer::new(report, options),
        view,
        root,
        report,
        detached: false,
    }));

    for kind in EventKind::ALL {
        let state = Rc::clone(&state);
        engine.on(
            kind,
            Box::new(move |event: &Event, ctx: &RunContext| state.borrow_mut().handle(event, ctx)),
        );
    }

    Ok(ReporterHandle {
        state,
        root,
        stats_bar,
        report,
    })
}

fn resolve_root(doc: &mut Document, root: Option<NodeId>, root_id: &str) -> NodeId {
    if let Some(root) = root {
        return root;
    }
    if let Some(existing) = doc.get_element_by_id(root_id) {
        return existing;
    }
    let div = doc.create_element("div");
    doc.set_attr(div, "id", root_id);
    let body = doc.body();
    doc.append_child(body, div);
    div
}

fn clear_previous(doc: &mut Document, root: NodeId) {
    let stale: Vec<NodeId> = doc
        .children(root)
        .iter()
        .copied()
        .filter(|&child| matches!(doc.attr(child, "id"), Some(STATS_ID | REPORT_ID)))
        .collect();
    for child in stale {
        doc.remove_child(root, child);
    }
}
