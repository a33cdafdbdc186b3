use std::rc::Rc;

use tracing::{debug, warn};

use crate::dom::{Container, Document, NodeId, Trigger, fragment};
use crate::highlight;
use crate::models::{Suite, TestResult, TestStatus};
use crate::source;

const SUITE_TEMPLATE: &str = r#"<li class="suite"><h1><a href="%s">%e</a></h1></li>"#;
const PASS_TEMPLATE: &str =
    r#"<li class="test pass %s"><h2>%e<span class=duration>%sms</span></h2></li>"#;
const PENDING_TEMPLATE: &str = r#"<li class="test pass pending"><h2>%e</h2></li>"#;
const FAIL_TEMPLATE: &str = r#"<li class="test fail"><h2>%e</h2><pre class=error>%e</pre></li>"#;

/// Builds `?param=<title>` links. Only the leaf title is encoded.
#[derive(Debug, Clone)]
pub struct DeepLink {
    param: String,
}

impl DeepLink {
    pub fn new(param: impl Into<String>) -> Self {
        Self {
            param: param.into(),
        }
    }

    pub fn url_for(&self, title: &str) -> String {
        let encoded: String = url::form_urlencoded::byte_serialize(title.as_bytes()).collect();
        format!("?{}={}", self.param, encoded)
    }
}

impl Default for DeepLink {
    fn default() -> Self {
        Self::new("focus")
    }
}

/// Open containers, innermost last. The report root sits at the bottom and
/// is never popped. A suite that could not be rendered still occupies a
/// level, with no container, so its `post:suite` pops the right entry.
#[derive(Debug, Clone)]
pub struct RenderStack {
    open: Vec<Option<NodeId>>,
}

impl RenderStack {
    pub fn new(root: NodeId) -> Self {
        Self {
            open: vec![Some(root)],
        }
    }

    /// Current insertion point. `None` inside a suite that was not rendered.
    pub fn top(&self) -> Option<NodeId> {
        self.open.last().copied().flatten()
    }

    pub fn root(&self) -> Option<NodeId> {
        self.open.first().copied().flatten()
    }

    pub fn push(&mut self, container: NodeId) {
        self.open.push(Some(container));
    }

    /// Open a level with nowhere to insert.
    pub fn push_placeholder(&mut self) {
        self.open.push(None);
    }

    /// Pop the innermost suite level. Returns `false` at the root.
    pub fn pop(&mut self) -> bool {
        if self.open.len() > 1 {
            self.open.pop();
            true
        } else {
            false
        }
    }

    /// Suite nesting depth + 1.
    pub fn depth(&self) -> usize {
        self.open.len()
    }
}

#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub links: DeepLink,
    pub highlight: bool,
    pub focus_on_dblclick: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            links: DeepLink::default(),
            highlight: true,
            focus_on_dblclick: true,
        }
    }
}

/// Turns suite and test events into nested list items.
#[derive(Debug, Clone)]
pub struct TreeRenderer {
    stack: RenderStack,
    options: RenderOptions,
}

impl TreeRenderer {
    pub fn new(report: NodeId, options: RenderOptions) -> Self {
        Self {
            stack: RenderStack::new(report),
            options,
        }
    }

    pub fn stack(&self) -> &RenderStack {
        &self.stack
    }

    /// `pre:suite`: add a heading to the current container and open a nested
    /// list under it. Returns the heading item.
    pub fn enter_suite(&mut self, doc: &mut Document, suite: &Suite) -> Option<NodeId> {
        let Some(parent) = self.stack.top() else {
            debug!(suite = %suite.title, "no open container for suite");
            self.stack.push_placeholder();
            return None;
        };

        let url = self.options.links.url_for(&suite.title);
        let heading = match fragment(doc, SUITE_TEMPLATE, &[&url, &suite.title]) {
            Ok(el) => {
                doc.append_child(parent, el);
                Some(el)
            }
            Err(e) => {
                warn!(suite = %suite.title, error = %e, "failed to render suite heading");
                None
            }
        };

        // The container is pushed even without a heading so the matching
        // `post:suite` pops the right level.
        let container = doc.create_element("ul");
        doc.append_child(heading.unwrap_or(parent), container);
        self.stack.push(container);
        heading
    }

    /// `pre:suite` without document access: keep nesting paired and render
    /// nothing until the matching `post:suite`.
    pub fn enter_detached(&mut self, suite: &Suite) {
        debug!(suite = %suite.title, "suite entered without rendering");
        self.stack.push_placeholder();
    }

    /// `post:suite`: close the innermost container. It stays in the document.
    pub fn leave_suite(&mut self) {
        if !self.stack.pop() {
            debug!("post:suite without an open suite ignored");
        }
    }

    /// `post:test`: render the result into the current container.
    pub fn add_test(&mut self, doc: &mut Document, test: &TestResult) -> Option<NodeId> {
        let rendered = match test.status {
            TestStatus::Passed => {
                let speed = test.speed.unwrap_or_default();
                let duration = test.duration_ms.unwrap_or(0).to_string();
                fragment(doc, PASS_TEMPLATE, &[speed.as_class(), &test.title, &duration])
            }
            TestStatus::Pending | TestStatus::Skipped => {
                fragment(doc, PENDING_TEMPLATE, &[&test.title])
            }
            TestStatus::Failed => {
                let text = test.failure_text();
                fragment(doc, FAIL_TEMPLATE, &[&test.title, &text])
            }
        };

        let el = match rendered {
            Ok(el) => el,
            Err(e) => {
                warn!(test = %test.title, error = %e, "failed to render test");
                return None;
            }
        };

        if !test.status.is_pending() {
            self.attach_source(doc, el, test);
        }

        match self.stack.top() {
            Some(parent) => {
                doc.append_child(parent, el);
                Some(el)
            }
            None => {
                debug!(test = %test.title, "no open container for test");
                None
            }
        }
    }

    /// Add the collapsed source panel and the heading's click handlers.
    fn attach_source(&self, doc: &mut Document, el: NodeId, test: &TestResult) {
        let Some(heading) = doc.first_by_tag(el, "h2") else {
            return;
        };

        let pre = doc.create_element("pre");
        let code = doc.create_element("code");
        doc.append_child(pre, code);
        let body = source::clean(test.source.as_deref().unwrap_or_default());
        self.write_code(doc, code, &body);
        doc.append_child(el, pre);
        doc.set_visible(pre, false);

        doc.on(
            heading,
            Trigger::Click,
            Rc::new(move |doc: &mut Document| {
                let visible = doc.is_visible(pre);
                doc.set_visible(pre, !visible);
            }),
        );

        if self.options.focus_on_dblclick {
            let url = self.options.links.url_for(&test.title);
            doc.set_attr(heading, "data-focus", &url);
            doc.on(
                heading,
                Trigger::DoubleClick,
                Rc::new(move |doc: &mut Document| doc.navigate(url.clone())),
            );
        }
    }

    fn write_code(&self, doc: &mut Document, code: NodeId, body: &str) {
        if !self.options.highlight {
            let text = doc.create_text(body);
            doc.append_child(code, text);
            return;
        }
        for span in highlight::highlight(body) {
            let text = doc.create_text(span.text);
            match span.category {
                Some(category) => {
                    let marker = doc.create_element("span");
                    doc.set_class(marker, category.as_class(), true);
                    doc.append_child(marker, text);
                    doc.append_child(code, marker);
                }
                None => doc.append_child(code, text),
            }
        }
    }
}
