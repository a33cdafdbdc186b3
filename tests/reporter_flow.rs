//! End-to-end reporter behavior: events in, document out.

use std::cell::RefCell;
use std::rc::Rc;

use hydro_html::{
    Container, Document, Event, EventBus, Filter, ManualClock, NodeId, ReportConfig,
    ReporterHandle, Suite, TestError, TestResult, use_reporter,
};
use proptest::prelude::*;

fn mount(planned: usize) -> (EventBus, Rc<RefCell<Document>>, ReporterHandle) {
    let mut bus = EventBus::with_planned(planned);
    let page = Rc::new(RefCell::new(Document::new()));
    let handle = use_reporter(
        &mut bus,
        Rc::clone(&page),
        None,
        &ReportConfig::default(),
        Rc::new(ManualClock::new()),
    )
    .unwrap();
    (bus, page, handle)
}

fn heading(doc: &Document, item: NodeId, tag: &str) -> String {
    doc.text_content(doc.first_by_tag(item, tag).unwrap())
}

fn suite_ancestors(doc: &Document, node: NodeId) -> usize {
    let mut count = 0;
    let mut cursor = doc.parent(node);
    while let Some(id) = cursor {
        if doc.has_class(id, "suite") {
            count += 1;
        }
        cursor = doc.parent(id);
    }
    count
}

#[test]
fn two_test_run_renders_suite_and_top_level_failure() {
    let (mut bus, page, handle) = mount(2);
    bus.emit(&Event::PreAll);
    bus.emit(&Event::PreSuite(Suite::new("A")));
    bus.emit(&Event::PostTest(TestResult::passed("t1", 5)));
    bus.emit(&Event::PostSuite(Suite::default()));
    bus.emit(&Event::PostTest(TestResult::failed(
        "t2",
        TestError::new("x").with_stack("Error: x\n at ..."),
    )));
    bus.emit(&Event::PostAll);

    let snap = handle.snapshot();
    assert_eq!(snap.passes, 1);
    assert_eq!(snap.failures, 1);
    assert_eq!(snap.pending, 0);
    assert_eq!(snap.percent, 100);
    assert!(snap.duration_ms.is_some());

    let doc = page.borrow();
    let report = handle.report();
    let top: Vec<NodeId> = doc.children(report).to_vec();
    assert_eq!(top.len(), 2);

    let suite = top[0];
    assert!(doc.has_class(suite, "suite"));
    assert_eq!(heading(&doc, suite, "h1"), "A");
    let passing = doc.elements_with_classes(suite, &["test", "pass"]);
    assert_eq!(passing.len(), 1);
    assert!(heading(&doc, passing[0], "h2").starts_with("t1"));

    let failing = top[1];
    assert!(doc.has_class(failing, "fail"));
    assert_eq!(heading(&doc, failing, "h2"), "t2");
    let error = doc.elements_with_classes(failing, &["error"])[0];
    assert_eq!(doc.text_content(error), "Error: x\n at ...");
}

#[test]
fn error_without_stack_starts_with_message() {
    let (mut bus, page, handle) = mount(1);
    bus.emit(&Event::PreAll);
    bus.emit(&Event::PostTest(TestResult::failed("t", TestError::new("boom"))));

    let doc = page.borrow();
    let error = doc.elements_with_classes(handle.report(), &["error"])[0];
    assert!(doc.text_content(error).starts_with("boom"));
}

#[test]
fn failure_without_error_object_is_unknown() {
    let (mut bus, page, handle) = mount(1);
    let mut result = TestResult::failed("t", TestError::default());
    result.error = None;
    bus.emit(&Event::PreAll);
    bus.emit(&Event::PostTest(result));

    let doc = page.borrow();
    let error = doc.elements_with_classes(handle.report(), &["error"])[0];
    assert_eq!(doc.text_content(error), "unknown error");
}

#[test]
fn zero_planned_tests_keep_percent_at_zero() {
    let (mut bus, _, handle) = mount(0);
    bus.emit(&Event::PreAll);
    bus.emit(&Event::PostAll);
    assert_eq!(handle.snapshot().percent, 0);
}

#[test]
fn surplus_post_suite_and_late_tests_are_tolerated() {
    let (mut bus, page, handle) = mount(2);
    bus.emit(&Event::PreAll);
    bus.emit(&Event::PostSuite(Suite::new("ghost")));
    bus.emit(&Event::PreSuite(Suite::new("A")));
    bus.emit(&Event::PostSuite(Suite::new("A")));
    bus.emit(&Event::PostSuite(Suite::new("A")));
    bus.emit(&Event::PostTest(TestResult::passed("late", 1)));
    assert_eq!(handle.depth(), 1);

    let doc = page.borrow();
    let late = doc.elements_with_classes(handle.report(), &["test"])[0];
    assert_eq!(doc.parent(late), Some(handle.report()));
}

#[test]
fn pending_and_skipped_share_a_bucket() {
    let (mut bus, page, handle) = mount(2);
    let mut skipped = TestResult::pending("skip");
    skipped.status = hydro_html::TestStatus::Skipped;
    bus.emit(&Event::PreAll);
    bus.emit(&Event::PostTest(TestResult::pending("todo")));
    bus.emit(&Event::PostTest(skipped));

    assert_eq!(handle.snapshot().pending, 2);
    let doc = page.borrow();
    assert_eq!(
        doc.elements_with_classes(handle.report(), &["test", "pass", "pending"])
            .len(),
        2
    );
}

#[test]
fn passes_filter_twice_restores_visibility() {
    let (mut bus, page, handle) = mount(3);
    bus.emit(&Event::PreAll);
    for (suite, result) in [
        ("ok", TestResult::passed("a", 1)),
        ("ko", TestResult::failed("b", TestError::new("x"))),
        ("todo", TestResult::pending("c")),
    ] {
        bus.emit(&Event::PreSuite(Suite::new(suite)));
        bus.emit(&Event::PostTest(result));
        bus.emit(&Event::PostSuite(Suite::new(suite)));
    }

    let before = page.borrow().outer_html(handle.report());
    handle.toggle(Filter::Passes);
    {
        let doc = page.borrow();
        let hidden = doc.elements_with_classes(handle.report(), &["suite", "hidden"]);
        assert_eq!(hidden.len(), 1);
        assert_eq!(heading(&doc, hidden[0], "h1"), "ko");
    }
    handle.toggle(Filter::Passes);
    assert_eq!(page.borrow().outer_html(handle.report()), before);
}

#[test]
fn rendered_page_carries_the_report() {
    let (mut bus, page, handle) = mount(1);
    bus.emit(&Event::PreAll);
    bus.emit(&Event::PostTest(
        TestResult::passed("<script>", 1).with_source("function () {\n  assert(1 < 2);\n}"),
    ));
    bus.emit(&Event::PostAll);

    let html = hydro_html::reporter::page::render_page(&page.borrow(), "Hydro");
    assert!(html.contains("id=\"hydro-stats\""));
    assert!(html.contains("&lt;script&gt;"));
    assert!(html.contains("<span class=\"number\">1</span> &lt; <span class=\"number\">2</span>"));
    assert!(html.contains("data-focus=\"?focus=%3Cscript%3E\""));
    assert_eq!(handle.snapshot().completed, 1);
}

#[derive(Debug, Clone)]
enum Step {
    Enter,
    Leave,
    Test,
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![Just(Step::Enter), Just(Step::Leave), Just(Step::Test)]
}

proptest! {
    #[test]
    fn tests_sit_at_their_suite_depth(steps in prop::collection::vec(step(), 0..60)) {
        let (mut bus, page, handle) = mount(0);
        bus.emit(&Event::PreAll);
        let mut depth = 0usize;

        for (i, step) in steps.into_iter().enumerate() {
            match step {
                Step::Enter => {
                    bus.emit(&Event::PreSuite(Suite::new(format!("s{}", i))));
                    depth += 1;
                }
                Step::Leave => {
                    bus.emit(&Event::PostSuite(Suite::default()));
                    depth = depth.saturating_sub(1);
                }
                Step::Test => {
                    bus.emit(&Event::PostTest(TestResult::passed(format!("t{}", i), 1)));
                    let doc = page.borrow();
                    let last = *doc
                        .elements_with_classes(handle.report(), &["test"])
                        .iter()
                        .max()
                        .unwrap();
                    prop_assert_eq!(suite_ancestors(&doc, last), depth);
                }
            }
            prop_assert_eq!(handle.depth(), depth + 1);
        }

        let snap = handle.snapshot();
        prop_assert_eq!(snap.passes + snap.failures + snap.pending, snap.completed);
        prop_assert!(snap.completed <= snap.total);
    }
}
