use std::time::{Duration, Instant};

use time::OffsetDateTime;
use unicode_segmentation::UnicodeSegmentation;

use crate::storage::KeyValueStore;
use crate::store::{Item, ItemId, ListError, ListStore, Status};
use crate::view::{self, FilterState, ListRender, Row};

const STATUS_TTL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    Input,
    List,
}

/// Single-line text field for new item names.
#[derive(Debug, Clone)]
pub struct InputState {
    buffer: String,
    max_len: usize,
}

impl InputState {
    pub fn new(max_len: usize) -> Self {
        Self {
            buffer: String::new(),
            max_len,
        }
    }

    pub fn value(&self) -> &str {
        &self.buffer
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn push_char(&mut self, ch: char) -> bool {
        if self.buffer.chars().count() >= self.max_len {
            return false;
        }
        self.buffer.push(ch);
        true
    }

    pub fn backspace(&mut self) -> bool {
        let Some((offset, _)) = self.buffer.grapheme_indices(true).next_back() else {
            return false;
        };
        self.buffer.truncate(offset);
        true
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Error,
}

#[derive(Debug, Clone)]
pub struct StatusMessage {
    pub text: String,
    pub kind: StatusKind,
    shown_at: Instant,
}

/// Everything the screen shows, owned in one place.
///
/// Every list mutation persists through the store and then re-renders the whole
/// view from `(items, filter)`.
#[derive(Debug)]
pub struct AppState<S> {
    store: ListStore<S>,
    filter: FilterState,
    view: ListRender,
    pub input: InputState,
    pub focus: FocusPane,
    pub selected: usize,
    status: Option<StatusMessage>,
    last_saved_at: Option<OffsetDateTime>,
    show_help: bool,
}

impl<S: KeyValueStore> AppState<S> {
    pub fn new(store: ListStore<S>, max_input_len: usize) -> Self {
        let view = view::render(store.items(), FilterState::None);
        Self {
            store,
            filter: FilterState::None,
            view,
            input: InputState::new(max_input_len),
            focus: FocusPane::Input,
            selected: 0,
            status: None,
            last_saved_at: None,
            show_help: false,
        }
    }

    pub fn store(&self) -> &ListStore<S> {
        &self.store
    }

    pub fn items(&self) -> &[Item] {
        self.store.items()
    }

    pub fn view(&self) -> &ListRender {
        &self.view
    }

    pub fn filter(&self) -> FilterState {
        self.filter
    }

    pub fn selected_row(&self) -> Option<&Row> {
        self.view.row(self.selected)
    }

    pub fn row_id(&self, position: usize) -> Option<ItemId> {
        self.view.row(position).map(|row| row.id)
    }

    pub fn last_saved_at(&self) -> Option<OffsetDateTime> {
        self.last_saved_at
    }

    pub fn add_item(&mut self, name: &str) -> Result<Option<ItemId>, ListError> {
        let added = self.store.add(name)?;
        if let Some(id) = added {
            self.input.clear();
            self.after_mutation();
            if let Some(position) = self.view.rows.iter().position(|row| row.id == id) {
                self.selected = position;
            }
        }
        Ok(added)
    }

    pub fn set_item_status(&mut self, id: ItemId, completed: bool) -> Result<(), ListError> {
        self.store.set_status_by_id(id, completed)?;
        self.after_mutation();
        Ok(())
    }

    pub fn toggle_item(&mut self, id: ItemId) -> Result<Status, ListError> {
        let status = self.store.toggle_by_id(id)?;
        self.after_mutation();
        Ok(status)
    }

    pub fn remove_item(&mut self, id: ItemId) -> Result<Item, ListError> {
        let removed = self.store.remove_by_id(id)?;
        self.after_mutation();
        Ok(removed)
    }

    pub fn clear_items(&mut self) -> Result<usize, ListError> {
        let count = self.store.clear()?;
        self.after_mutation();
        Ok(count)
    }

    pub fn select_filter(&mut self, selected: FilterState) -> FilterState {
        self.filter = self.filter.toggled(selected);
        self.rerender();
        self.filter
    }

    pub fn move_selection(&mut self, delta: isize) {
        if self.view.rows.is_empty() {
            self.selected = 0;
            return;
        }
        let last = self.view.rows.len() as isize - 1;
        let next = (self.selected as isize + delta).clamp(0, last);
        self.selected = next as usize;
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            FocusPane::Input => FocusPane::List,
            FocusPane::List => FocusPane::Input,
        };
    }

    pub fn show_help(&self) -> bool {
        self.show_help
    }

    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    pub fn status_message(&self) -> Option<&StatusMessage> {
        self.status.as_ref()
    }

    pub fn set_status_message<T: Into<String>>(&mut self, text: T) {
        self.status = Some(StatusMessage {
            text: text.into(),
            kind: StatusKind::Info,
            shown_at: Instant::now(),
        });
    }

    pub fn set_error_message<T: Into<String>>(&mut self, text: T) {
        self.status = Some(StatusMessage {
            text: text.into(),
            kind: StatusKind::Error,
            shown_at: Instant::now(),
        });
    }

    pub fn clear_status_message(&mut self) {
        self.status = None;
    }

    pub fn expire_status_message(&mut self) {
        if self
            .status
            .as_ref()
            .is_some_and(|status| status.shown_at.elapsed() >= STATUS_TTL)
        {
            self.status = None;
        }
    }

    fn after_mutation(&mut self) {
        self.last_saved_at = Some(OffsetDateTime::now_utc());
        self.rerender();
    }

    fn rerender(&mut self) {
        self.view = view::render(self.store.items(), self.filter);
        self.normalize_selection();
    }

    fn normalize_selection(&mut self) {
        if self.view.rows.is_empty() {
            self.selected = 0;
        } else if self.selected >= self.view.rows.len() {
            self.selected = self.view.rows.len() - 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn state_with(names: &[&str]) -> anyhow::Result<AppState<MemoryStore>> {
        let mut state = AppState::new(ListStore::load(MemoryStore::new()), 40);
        for name in names.iter().rev() {
            state.add_item(name)?;
        }
        Ok(state)
    }

    #[test]
    fn input_backspace_removes_whole_graphemes() {
        let mut input = InputState::new(10);
        for ch in "ae\u{301}".chars() {
            input.push_char(ch);
        }
        assert!(input.backspace());
        assert_eq!(input.value(), "a");
        assert!(input.backspace());
        assert!(!input.backspace());
    }

    #[test]
    fn input_respects_length_limit() {
        let mut input = InputState::new(2);
        assert!(input.push_char('a'));
        assert!(input.push_char('b'));
        assert!(!input.push_char('c'));
        assert_eq!(input.value(), "ab");
    }

    #[test]
    fn add_clears_input_and_selects_new_row() -> anyhow::Result<()> {
        let mut state = state_with(&["first", "second"])?;
        state.move_selection(1);
        for ch in "third".chars() {
            state.input.push_char(ch);
        }
        let name = state.input.value().to_string();
        assert!(state.add_item(&name)?.is_some());
        assert!(state.input.is_empty());
        assert_eq!(state.selected, 0);
        assert_eq!(state.view().rows[0].name, "third");
        assert!(state.last_saved_at().is_some());
        Ok(())
    }

    #[test]
    fn status_change_rerenders_filtered_view() -> anyhow::Result<()> {
        let mut state = state_with(&["A", "B"])?;
        state.select_filter(FilterState::Pending);
        assert_eq!(state.view().rows.len(), 2);

        let id = state.row_id(0).expect("row");
        state.set_item_status(id, true)?;
        assert_eq!(state.view().rows.len(), 1);
        assert_eq!(state.view().rows[0].name, "B");
        assert_eq!(state.view().rows[0].index, 1);
        Ok(())
    }

    #[test]
    fn selection_is_clamped_after_removal() -> anyhow::Result<()> {
        let mut state = state_with(&["A", "B", "C"])?;
        state.move_selection(5);
        assert_eq!(state.selected, 2);
        let id = state.row_id(2).expect("row");
        state.remove_item(id)?;
        assert_eq!(state.selected, 1);
        state.clear_items()?;
        assert_eq!(state.selected, 0);
        assert!(state.view().show_empty);
        Ok(())
    }

    #[test]
    fn filter_is_not_reset_by_mutations() -> anyhow::Result<()> {
        let mut state = state_with(&["A"])?;
        assert_eq!(state.select_filter(FilterState::Completed), FilterState::Completed);
        state.add_item("B")?;
        assert_eq!(state.filter(), FilterState::Completed);
        assert!(state.view().rows.is_empty());
        assert!(!state.view().show_empty);
        assert_eq!(state.select_filter(FilterState::Completed), FilterState::None);
        assert_eq!(state.view().rows.len(), 2);
        Ok(())
    }
}
