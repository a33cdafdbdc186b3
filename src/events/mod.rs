use std::fmt;
use std::str::FromStr;

use crate::models::{Suite, TestResult};

/// Lifecycle events emitted by a test engine.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    PreAll,
    PreSuite(Suite),
    PostSuite(Suite),
    PostTest(TestResult),
    PostAll,
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::PreAll => EventKind::PreAll,
            Event::PreSuite(_) => EventKind::PreSuite,
            Event::PostSuite(_) => EventKind::PostSuite,
            Event::PostTest(_) => EventKind::PostTest,
            Event::PostAll => EventKind::PostAll,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    PreAll,
    PreSuite,
    PostSuite,
    PostTest,
    PostAll,
}

impl EventKind {
    pub const ALL: [EventKind; 5] = [
        EventKind::PreAll,
        EventKind::PreSuite,
        EventKind::PostSuite,
        EventKind::PostTest,
        EventKind::PostAll,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            EventKind::PreAll => "pre:all",
            EventKind::PreSuite => "pre:suite",
            EventKind::PostSuite => "post:suite",
            EventKind::PostTest => "post:test",
            EventKind::PostAll => "post:all",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| format!("unknown lifecycle event '{}'", s))
    }
}

/// Engine-side facts handed to every handler alongside the event.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunContext {
    /// Number of tests the engine plans to run.
    pub planned: usize,
}

pub type Handler = Box<dyn FnMut(&Event, &RunContext)>;

/// The subscription surface a reporter needs from a test engine.
pub trait Engine {
    /// Subscribe `handler` to every event of `kind`.
    fn on(&mut self, kind: EventKind, handler: Handler);

    /// Number of tests in the current run.
    fn tests(&self) -> usize;
}

/// Ordered, synchronous event dispatch.
///
/// Handlers run in subscription order, on the caller's thread, before
/// `emit` returns.
#[derive(Default)]
pub struct EventBus {
    listeners: Vec<(EventKind, Handler)>,
    planned: usize,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_planned(planned: usize) -> Self {
        Self {
            planned,
            ..Self::default()
        }
    }

    /// Update the planned test count reported by `tests()`.
    pub fn plan(&mut self, planned: usize) {
        self.planned = planned;
    }

    pub fn emit(&mut self, event: &Event) {
        let kind = event.kind();
        let ctx = RunContext {
            planned: self.planned,
        };
        tracing::trace!(event = %kind, "dispatching");
        for (listening, handler) in self.listeners.iter_mut() {
            if *listening == kind {
                handler(event, &ctx);
            }
        }
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.listeners.iter().filter(|(k, _)| *k == kind).count()
    }
}

impl Engine for EventBus {
    fn on(&mut self, kind: EventKind, handler: Handler) {
        self.listeners.push((kind, handler));
    }

    fn tests(&self) -> usize {
        self.planned
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.len())
            .field("planned", &self.planned)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    #[test]
    fn delivers_in_subscription_order_and_only_to_matching_kind() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut bus = EventBus::with_planned(3);

        for tag in ["first", "second"] {
            let seen = Rc::clone(&seen);
            bus.on(
                EventKind::PreAll,
                Box::new(move |_: &Event, ctx: &RunContext| seen.borrow_mut().push(format!("{}:{}", tag, ctx.planned))),
            );
        }
        let other = Rc::clone(&seen);
        bus.on(
            EventKind::PostAll,
            Box::new(move |_: &Event, _: &RunContext| other.borrow_mut().push("post".into())),
        );

        bus.emit(&Event::PreAll);
        assert_eq!(*seen.borrow(), vec!["first:3", "second:3"]);

        bus.emit(&Event::PostAll);
        assert_eq!(seen.borrow().last().map(String::as_str), Some("post"));
        assert_eq!(bus.listener_count(EventKind::PreAll), 2);
        assert_eq!(bus.listener_count(EventKind::PostTest), 0);
    }

    #[test]
    fn kind_names_round_trip() {
        for kind in EventKind::ALL {
            assert_eq!(kind.name().parse::<EventKind>(), Ok(kind));
        }
        assert!("pre:nothing".parse::<EventKind>().is_err());
    }

    #[test]
    fn plan_updates_engine_test_count() {
        let mut bus = EventBus::new();
        assert_eq!(bus.tests(), 0);
        bus.plan(7);
        assert_eq!(bus.tests(), 7);
    }
}
