//! Story-element lifecycle states and the name-keyed state registry.
//!
//! Every act, sequence, maneuver, and event walks the same state machine:
//! `NotStarted -> Running -> Done`, with `Skipped` as the never-ran
//! terminal. The registry mirrors those states under `(kind, name)` keys
//! so state-based triggers can observe elements anywhere in the story
//! graph without holding references into it.

use std::collections::BTreeMap;

use roadshow_types::{StoryElementKind, TerminationRule};

/// Lifecycle state of one story element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ElementState {
    /// Not yet triggered.
    #[default]
    NotStarted,
    /// Currently executing.
    Running,
    /// Terminated, by completion or cancellation.
    Done,
    /// Dropped without ever running.
    Skipped,
}

/// How a `Done` element terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Ran to natural completion.
    Completed,
    /// Cut short by arbitration or an explicit cancel.
    Cancelled,
}

impl Termination {
    /// Whether this termination satisfies an after-termination rule.
    pub const fn matches(self, rule: TerminationRule) -> bool {
        match rule {
            TerminationRule::End => matches!(self, Self::Completed),
            TerminationRule::Cancel => matches!(self, Self::Cancelled),
            TerminationRule::Any => true,
        }
    }
}

/// State plus termination of one registered element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ElementRecord {
    /// Current lifecycle state.
    pub state: ElementState,
    /// Set once the element reaches `Done`.
    pub termination: Option<Termination>,
}

/// Name-keyed view of story-element states for state-based triggers.
///
/// Keys are `(kind, name)`; elements with duplicate names share a key and
/// the latest transition wins, matching by-name trigger semantics. The
/// engine snapshots the registry at tick start so all triggers within one
/// tick observe the same states.
#[derive(Debug, Clone, Default)]
pub struct ElementRegistry {
    records: BTreeMap<(StoryElementKind, String), ElementRecord>,
}

impl ElementRegistry {
    /// Create an empty registry.
    pub const fn new() -> Self {
        Self {
            records: BTreeMap::new(),
        }
    }

    /// Record a state transition for a named element.
    pub fn set_state(&mut self, kind: StoryElementKind, name: &str, state: ElementState) {
        let record = self.records.entry((kind, name.to_owned())).or_default();
        record.state = state;
        if state != ElementState::Done {
            record.termination = None;
        }
    }

    /// Record a termination: the element becomes `Done` with the given
    /// termination kind.
    pub fn set_terminated(&mut self, kind: StoryElementKind, name: &str, termination: Termination) {
        let record = self.records.entry((kind, name.to_owned())).or_default();
        record.state = ElementState::Done;
        record.termination = Some(termination);
    }

    /// Look up the record for a named element.
    pub fn record(&self, kind: StoryElementKind, name: &str) -> Option<ElementRecord> {
        self.records.get(&(kind, name.to_owned())).copied()
    }

    /// Whether the named element has started running (running or already
    /// terminated).
    pub fn has_started(&self, kind: StoryElementKind, name: &str) -> bool {
        self.record(kind, name).is_some_and(|r| {
            matches!(r.state, ElementState::Running | ElementState::Done)
        })
    }

    /// Whether the named element terminated in a way the rule accepts.
    pub fn has_terminated(&self, kind: StoryElementKind, name: &str, rule: TerminationRule) -> bool {
        self.record(kind, name)
            .and_then(|r| r.termination)
            .is_some_and(|t| t.matches(rule))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn unknown_elements_have_no_record() {
        let registry = ElementRegistry::new();
        assert!(registry.record(StoryElementKind::Event, "missing").is_none());
        assert!(!registry.has_started(StoryElementKind::Event, "missing"));
        assert!(!registry.has_terminated(StoryElementKind::Event, "missing", TerminationRule::Any));
    }

    #[test]
    fn started_covers_running_and_done() {
        let mut registry = ElementRegistry::new();
        registry.set_state(StoryElementKind::Act, "act", ElementState::NotStarted);
        assert!(!registry.has_started(StoryElementKind::Act, "act"));

        registry.set_state(StoryElementKind::Act, "act", ElementState::Running);
        assert!(registry.has_started(StoryElementKind::Act, "act"));

        registry.set_terminated(StoryElementKind::Act, "act", Termination::Completed);
        assert!(registry.has_started(StoryElementKind::Act, "act"));
    }

    #[test]
    fn termination_rules_discriminate_completion_from_cancellation() {
        let mut registry = ElementRegistry::new();
        registry.set_terminated(StoryElementKind::Event, "e", Termination::Completed);
        assert!(registry.has_terminated(StoryElementKind::Event, "e", TerminationRule::End));
        assert!(!registry.has_terminated(StoryElementKind::Event, "e", TerminationRule::Cancel));
        assert!(registry.has_terminated(StoryElementKind::Event, "e", TerminationRule::Any));

        registry.set_terminated(StoryElementKind::Event, "e", Termination::Cancelled);
        assert!(!registry.has_terminated(StoryElementKind::Event, "e", TerminationRule::End));
        assert!(registry.has_terminated(StoryElementKind::Event, "e", TerminationRule::Cancel));
    }

    #[test]
    fn restarting_an_element_clears_its_termination() {
        let mut registry = ElementRegistry::new();
        registry.set_terminated(StoryElementKind::Event, "e", Termination::Completed);
        registry.set_state(StoryElementKind::Event, "e", ElementState::Running);

        let record = registry.record(StoryElementKind::Event, "e").unwrap();
        assert_eq!(record.state, ElementState::Running);
        assert!(record.termination.is_none());
    }

    #[test]
    fn same_name_different_kind_is_a_distinct_key() {
        let mut registry = ElementRegistry::new();
        registry.set_state(StoryElementKind::Act, "shared", ElementState::Running);
        assert!(!registry.has_started(StoryElementKind::Event, "shared"));
    }
}
