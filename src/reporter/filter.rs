use std::rc::Rc;

use tracing::debug;

use crate::dom::{Container, Document, NodeId, Trigger};

const HIDDEN: &str = "hidden";

/// Stats-bar toggles that narrow the report to one outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    Passes,
    Failures,
}

impl Filter {
    /// Class set on the report container while the filter is active.
    pub fn marker(&self) -> &'static str {
        match self {
            Filter::Passes => "pass",
            Filter::Failures => "fail",
        }
    }

    fn test_classes(&self) -> &'static [&'static str] {
        match self {
            Filter::Passes => &["test", "pass"],
            Filter::Failures => &["test", "fail"],
        }
    }

    /// Currently active filter on `report`, if any.
    pub fn active<C: Container + ?Sized>(tree: &C, report: NodeId) -> Option<Filter> {
        [Filter::Passes, Filter::Failures]
            .into_iter()
            .find(|f| tree.has_class(report, f.marker()))
    }
}

/// Flip `filter` on the report. Only one filter is active at a time; toggling
/// the active filter again shows everything.
pub fn toggle<C: Container + ?Sized>(tree: &mut C, report: NodeId, filter: Filter) {
    let was_active = tree.has_class(report, filter.marker());

    for suite in tree.elements_with_classes(report, &["suite", HIDDEN]) {
        tree.set_class(suite, HIDDEN, false);
    }
    tree.set_class(report, Filter::Passes.marker(), false);
    tree.set_class(report, Filter::Failures.marker(), false);

    if was_active {
        debug!(filter = filter.marker(), "filter cleared");
        return;
    }

    tree.set_class(report, filter.marker(), true);
    for suite in tree.elements_with_classes(report, &["suite"]) {
        if tree.elements_with_classes(suite, filter.test_classes()).is_empty() {
            tree.set_class(suite, HIDDEN, true);
        }
    }
    debug!(filter = filter.marker(), "filter applied");
}

/// Bind `filter` to clicks on `link`.
pub fn bind(doc: &mut Document, link: NodeId, report: NodeId, filter: Filter) {
    doc.on(
        link,
        Trigger::Click,
        Rc::new(move |doc: &mut Document| toggle(doc, report, filter)),
    );
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::dom::fragment;

    /// report > [suite A > [pass], suite B > [fail], suite C > [suite D > [pass]]]
    fn report() -> (Document, NodeId, [NodeId; 4]) {
        let mut doc = Document::new();
        let report = doc.create_element("ul");
        let suite = |doc: &mut Document, parent: NodeId| {
            let li = fragment(doc, "<li class=\"suite\"><h1>s</h1></li>", &[]).unwrap();
            let ul = doc.create_element("ul");
            doc.append_child(li, ul);
            doc.append_child(parent, li);
            (li, ul)
        };
        let test = |doc: &mut Document, parent: NodeId, class: &str| {
            let li = fragment(doc, "<li class=\"%s\"></li>", &[class]).unwrap();
            doc.append_child(parent, li);
        };

        let (a, a_list) = suite(&mut doc, report);
        test(&mut doc, a_list, "test pass fast");
        let (b, b_list) = suite(&mut doc, report);
        test(&mut doc, b_list, "test fail");
        let (c, c_list) = suite(&mut doc, report);
        let (d, d_list) = suite(&mut doc, c_list);
        test(&mut doc, d_list, "test pass pending");
        (doc, report, [a, b, c, d])
    }

    fn hidden(doc: &Document, suites: &[NodeId]) -> Vec<bool> {
        suites.iter().map(|&s| doc.has_class(s, HIDDEN)).collect()
    }

    #[test]
    fn passes_hides_suites_without_passing_tests() {
        let (mut doc, report, suites) = report();
        toggle(&mut doc, report, Filter::Passes);
        assert_eq!(hidden(&doc, &suites), vec![false, true, false, false]);
        assert_eq!(Filter::active(&doc, report), Some(Filter::Passes));
    }

    #[test]
    fn failures_hides_suites_without_failures() {
        let (mut doc, report, suites) = report();
        toggle(&mut doc, report, Filter::Failures);
        assert_eq!(hidden(&doc, &suites), vec![true, false, true, true]);
        assert!(doc.has_class(report, "fail"));
        assert!(!doc.has_class(report, "pass"));
    }

    #[test]
    fn toggling_twice_restores_everything() {
        let (mut doc, report, suites) = report();
        toggle(&mut doc, report, Filter::Passes);
        toggle(&mut doc, report, Filter::Passes);
        assert_eq!(hidden(&doc, &suites), vec![false; 4]);
        assert_eq!(Filter::active(&doc, report), None);
    }

    #[test]
    fn switching_filters_is_exclusive() {
        let (mut doc, report, suites) = report();
        toggle(&mut doc, report, Filter::Passes);
        toggle(&mut doc, report, Filter::Failures);
        assert_eq!(Filter::active(&doc, report), Some(Filter::Failures));
        assert!(!doc.has_class(report, "pass"));
        assert_eq!(hidden(&doc, &suites), vec![true, false, true, true]);
    }

    /// Class-only tree keyed by node, enough to drive the toggles.
    #[derive(Default)]
    struct Outline {
        children: HashMap<NodeId, Vec<NodeId>>,
        classes: HashMap<NodeId, Vec<String>>,
    }

    impl Container for Outline {
        fn append_child(&mut self, parent: NodeId, child: NodeId) {
            self.children.entry(parent).or_default().push(child);
        }

        fn set_visible(&mut self, node: NodeId, visible: bool) {
            self.set_class(node, HIDDEN, !visible);
        }

        fn is_visible(&self, node: NodeId) -> bool {
            !self.has_class(node, HIDDEN)
        }

        fn set_class(&mut self, node: NodeId, class: &str, on: bool) {
            let tokens = self.classes.entry(node).or_default();
            tokens.retain(|t| t != class);
            if on {
                tokens.push(class.to_string());
            }
        }

        fn has_class(&self, node: NodeId, class: &str) -> bool {
            self.classes
                .get(&node)
                .is_some_and(|tokens| tokens.iter().any(|t| t == class))
        }

        fn elements_with_classes(&self, scope: NodeId, classes: &[&str]) -> Vec<NodeId> {
            let mut found = Vec::new();
            let mut pending = self.children.get(&scope).cloned().unwrap_or_default();
            pending.reverse();
            while let Some(node) = pending.pop() {
                if classes.iter().all(|c| self.has_class(node, c)) {
                    found.push(node);
                }
                if let Some(kids) = self.children.get(&node) {
                    pending.extend(kids.iter().rev());
                }
            }
            found
        }
    }

    #[test]
    fn toggles_work_on_any_container() {
        // Node handles only; the outline keeps its own structure.
        let mut ids = Document::new();
        let report = ids.create_element("ul");
        let (good, bad, ok, ko) = (
            ids.create_element("li"),
            ids.create_element("li"),
            ids.create_element("li"),
            ids.create_element("li"),
        );

        let mut outline = Outline::default();
        for (suite, test, outcome) in [(good, ok, "pass"), (bad, ko, "fail")] {
            outline.append_child(report, suite);
            outline.set_class(suite, "suite", true);
            outline.append_child(suite, test);
            outline.set_class(test, "test", true);
            outline.set_class(test, outcome, true);
        }

        let tree: &mut dyn Container = &mut outline;
        toggle(&mut *tree, report, Filter::Failures);
        assert!(!tree.is_visible(good));
        assert!(tree.is_visible(bad));
        assert_eq!(Filter::active(&*tree, report), Some(Filter::Failures));

        toggle(&mut *tree, report, Filter::Failures);
        assert!(tree.is_visible(good));
        assert_eq!(Filter::active(&*tree, report), None);
    }

    #[test]
    fn bound_link_toggles_on_click() {
        let (mut doc, report, suites) = report();
        let link = doc.create_element("a");
        bind(&mut doc, link, report, Filter::Failures);
        doc.click(link);
        assert_eq!(hidden(&doc, &suites), vec![true, false, true, true]);
        doc.click(link);
        assert_eq!(hidden(&doc, &suites), vec![false; 4]);
    }
}
