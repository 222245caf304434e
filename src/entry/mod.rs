//! Autocompleting command entry, independent of any UI toolkit.
//!
//! [CommandEntry] keeps the typed query, the ranked suggestions and the current selection. A
//! front end feeds it [EntryEvent]s and renders [EntryState]. Extra behavior is attached by
//! registering callbacks per [EventKind]; they run after the built-in handling of the event.

use std::collections::HashMap;

use tracing::debug;

use crate::matcher::FuzzyMatcher;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    TextChanged,
    Up,
    Down,
    Enter,
    Escape,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryEvent {
    /// The whole current text of the input, not a delta.
    TextChanged(String),
    Up,
    Down,
    Enter,
    Escape,
}

impl EntryEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            EntryEvent::TextChanged(_) => EventKind::TextChanged,
            EntryEvent::Up => EventKind::Up,
            EntryEvent::Down => EventKind::Down,
            EntryEvent::Enter => EventKind::Enter,
            EntryEvent::Escape => EventKind::Escape,
        }
    }
}

/// Everything a front end needs to draw the entry.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EntryState {
    query: String,
    suggestions: Vec<String>,
    selected: Option<usize>,
    visible: bool,
}

impl EntryState {
    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn suggestions(&self) -> &[String] {
        &self.suggestions
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn selected_suggestion(&self) -> Option<&str> {
        self.selected
            .and_then(|i| self.suggestions.get(i))
            .map(String::as_str)
    }

    /// Whether the suggestion list should be shown.
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    fn hide(&mut self) {
        self.suggestions.clear();
        self.selected = None;
        self.visible = false;
    }
}

pub type EventHandler = Box<dyn FnMut(&EntryState)>;
pub type AcceptHandler = Box<dyn FnMut(&str)>;

pub struct CommandEntry {
    matcher: FuzzyMatcher,
    state: EntryState,
    handlers: HashMap<EventKind, Vec<EventHandler>>,
    accept_handlers: Vec<AcceptHandler>,
}

impl CommandEntry {
    pub fn new(matcher: FuzzyMatcher) -> Self {
        Self {
            matcher,
            state: EntryState::default(),
            handlers: HashMap::new(),
            accept_handlers: Vec::new(),
        }
    }

    pub fn state(&self) -> &EntryState {
        &self.state
    }

    pub fn matcher(&self) -> &FuzzyMatcher {
        &self.matcher
    }

    /// Registers `handler` to observe the entry after every event of `kind`.
    pub fn on(
        &mut self,
        kind: EventKind,
        handler: impl FnMut(&EntryState) + 'static,
    ) -> &mut Self {
        self.handlers
            .entry(kind)
            .or_default()
            .push(Box::new(handler));
        self
    }

    /// Registers `handler` to receive every committed entry.
    pub fn on_accept(&mut self, handler: impl FnMut(&str) + 'static) -> &mut Self {
        self.accept_handlers.push(Box::new(handler));
        self
    }

    /// Applies `event` and returns the committed text when the event accepted an entry.
    pub fn dispatch(&mut self, event: EntryEvent) -> Option<String> {
        let kind = event.kind();
        let accepted = match event {
            EntryEvent::TextChanged(query) => {
                self.update_query(query);
                None
            }
            EntryEvent::Up => {
                self.move_selection(-1);
                None
            }
            EntryEvent::Down => {
                self.move_selection(1);
                None
            }
            EntryEvent::Enter => self.accept(),
            EntryEvent::Escape => {
                self.state.hide();
                None
            }
        };

        if let Some(handlers) = self.handlers.get_mut(&kind) {
            for handler in handlers {
                handler(&self.state);
            }
        }
        if let Some(accepted) = &accepted {
            debug!("Accepted entry {accepted:?}");
            for handler in &mut self.accept_handlers {
                handler(accepted);
            }
        }
        accepted
    }

    fn update_query(&mut self, query: String) {
        // Recomputed in full on each change.
        self.state.suggestions = if query.is_empty() {
            Vec::new()
        } else {
            self.matcher.rank(&query)
        };
        self.state.query = query;
        self.state.visible = !self.state.suggestions.is_empty();
        self.state.selected = self.state.visible.then_some(0);
    }

    fn move_selection(&mut self, step: isize) {
        if !self.state.visible {
            return;
        }
        let last = self.state.suggestions.len().saturating_sub(1);
        let next = self
            .state
            .selected
            .map_or(0, |current| current.saturating_add_signed(step).min(last));
        self.state.selected = Some(next);
    }

    fn accept(&mut self) -> Option<String> {
        let accepted = match self.state.visible {
            true => self.state.selected_suggestion().map(str::to_string),
            false => None,
        }
        .or_else(|| {
            let raw = self.state.query.trim();
            (!raw.is_empty()).then(|| raw.to_string())
        })?;

        self.state.query = accepted.clone();
        self.state.hide();
        Some(accepted)
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use super::{CommandEntry, EntryEvent, EventKind};
    use crate::matcher::FuzzyMatcher;

    fn entry() -> CommandEntry {
        CommandEntry::new(FuzzyMatcher::new([
            "timer",
            "todo",
            "track",
            "triage",
            "complete",
        ]))
    }

    fn type_text(entry: &mut CommandEntry, text: &str) {
        entry.dispatch(EntryEvent::TextChanged(text.into()));
    }

    #[test]
    fn test_typing_shows_ranked_suggestions() {
        let mut entry = entry();
        type_text(&mut entry, "t");

        let state = entry.state();
        assert!(state.is_visible());
        assert_eq!(
            state.suggestions(),
            ["todo", "timer", "track", "triage", "complete"]
        );
        assert_eq!(state.selected_suggestion(), Some("todo"));
    }

    #[test]
    fn test_empty_query_hides_suggestions() {
        let mut entry = entry();
        type_text(&mut entry, "tr");
        type_text(&mut entry, "");

        assert!(!entry.state().is_visible());
        assert!(entry.state().suggestions().is_empty());
        assert_eq!(entry.state().selected(), None);
    }

    #[test]
    fn test_no_matches_hides_suggestions() {
        let mut entry = entry();
        type_text(&mut entry, "zzz");
        assert!(!entry.state().is_visible());
    }

    #[test]
    fn test_navigation_is_clamped() {
        let mut entry = entry();
        type_text(&mut entry, "tr");
        // "timer" is a scattered match, so it goes after both prefix matches.
        assert_eq!(entry.state().suggestions(), ["track", "triage", "timer"]);

        entry.dispatch(EntryEvent::Up);
        assert_eq!(entry.state().selected(), Some(0));

        for _ in 0..5 {
            entry.dispatch(EntryEvent::Down);
        }
        assert_eq!(entry.state().selected_suggestion(), Some("timer"));

        entry.dispatch(EntryEvent::Up);
        assert_eq!(entry.state().selected_suggestion(), Some("triage"));
    }

    #[test]
    fn test_enter_accepts_selected_suggestion() {
        let mut entry = entry();
        type_text(&mut entry, "tr");
        entry.dispatch(EntryEvent::Down);

        let accepted = entry.dispatch(EntryEvent::Enter);
        assert_eq!(accepted.as_deref(), Some("triage"));
        assert_eq!(entry.state().query(), "triage");
        assert!(!entry.state().is_visible());
    }

    #[test]
    fn test_enter_without_suggestions_accepts_raw_query() {
        let mut entry = entry();
        assert_eq!(entry.dispatch(EntryEvent::Enter), None);

        type_text(&mut entry, " timer 5 ");
        assert!(!entry.state().is_visible());
        assert_eq!(entry.dispatch(EntryEvent::Enter).as_deref(), Some("timer 5"));
    }

    #[test]
    fn test_escape_keeps_query() {
        let mut entry = entry();
        type_text(&mut entry, "to");
        entry.dispatch(EntryEvent::Escape);

        assert!(!entry.state().is_visible());
        assert_eq!(entry.state().query(), "to");
        // Hidden list ignores navigation; Enter commits the raw text.
        entry.dispatch(EntryEvent::Down);
        assert_eq!(entry.state().selected(), None);
        assert_eq!(entry.dispatch(EntryEvent::Enter).as_deref(), Some("to"));
    }

    #[test]
    fn test_registered_handlers_observe_events() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let accepted = Rc::new(RefCell::new(Vec::new()));

        let mut entry = entry();
        {
            let seen = seen.clone();
            entry.on(EventKind::TextChanged, move |state| {
                seen.borrow_mut().push(state.suggestions().len())
            });
        }
        {
            let accepted = accepted.clone();
            entry.on_accept(move |text| accepted.borrow_mut().push(text.to_string()));
        }

        type_text(&mut entry, "t");
        type_text(&mut entry, "tim");
        entry.dispatch(EntryEvent::Down);
        entry.dispatch(EntryEvent::Enter);

        assert_eq!(*seen.borrow(), vec![5, 1]);
        assert_eq!(*accepted.borrow(), vec!["timer".to_string()]);
    }
}
