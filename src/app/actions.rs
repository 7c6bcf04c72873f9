use crate::app::state::AppState;
use crate::storage::KeyValueStore;
use crate::store::{ListError, Status};
use crate::view::FilterState;

/// Input events the list screen reacts to. Row arguments are positions in the
/// currently rendered rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiEvent {
    Submit,
    ToggleRow(usize),
    SetRowStatus { row: usize, completed: bool },
    DeleteRow(usize),
    SelectFilter(FilterState),
    ClearAll,
}

/// Glue between interface events and list operations.
///
/// Rows are resolved to item ids here, right before the mutation runs, so a
/// position captured by an earlier render can never hit the wrong item.
pub struct ActionDispatcher<'a, S> {
    state: &'a mut AppState<S>,
}

impl<'a, S: KeyValueStore> ActionDispatcher<'a, S> {
    pub fn new(state: &'a mut AppState<S>) -> Self {
        Self { state }
    }

    pub fn dispatch(&mut self, event: UiEvent) {
        match event {
            UiEvent::Submit => self.submit(),
            UiEvent::ToggleRow(row) => self.toggle_row(row),
            UiEvent::SetRowStatus { row, completed } => self.set_row_status(row, completed),
            UiEvent::DeleteRow(row) => self.delete_row(row),
            UiEvent::SelectFilter(filter) => self.select_filter(filter),
            UiEvent::ClearAll => self.clear_all(),
        }
    }

    fn submit(&mut self) {
        let name = self.state.input.value().to_string();
        match self.state.add_item(&name) {
            Ok(Some(_)) => self.state.set_status_message(format!("Added '{}'", name.trim())),
            Ok(None) => {}
            Err(err) => self.report(err, "add item"),
        }
    }

    fn toggle_row(&mut self, row: usize) {
        let Some(id) = self.state.row_id(row) else {
            tracing::debug!(row, "toggle on a row that is not rendered");
            return;
        };
        match self.state.toggle_item(id) {
            Ok(Status::Completed) => self.state.set_status_message("Marked completed"),
            Ok(Status::Pending) => self.state.set_status_message("Marked pending"),
            Err(err) => self.report(err, "update item"),
        }
    }

    fn set_row_status(&mut self, row: usize, completed: bool) {
        let Some(id) = self.state.row_id(row) else {
            tracing::debug!(row, "status change on a row that is not rendered");
            return;
        };
        if let Err(err) = self.state.set_item_status(id, completed) {
            self.report(err, "update item");
        }
    }

    fn delete_row(&mut self, row: usize) {
        let Some(id) = self.state.row_id(row) else {
            tracing::debug!(row, "delete on a row that is not rendered");
            return;
        };
        match self.state.remove_item(id) {
            Ok(item) => self
                .state
                .set_status_message(format!("Removed '{}'", item.name)),
            Err(err) => self.report(err, "remove item"),
        }
    }

    fn select_filter(&mut self, filter: FilterState) {
        let active = self.state.select_filter(filter);
        tracing::debug!(%active, "filter changed");
        self.state.clear_status_message();
    }

    fn clear_all(&mut self) {
        match self.state.clear_items() {
            Ok(0) => {}
            Ok(count) => self
                .state
                .set_status_message(format!("Cleared {count} item(s)")),
            Err(err) => self.report(err, "clear list"),
        }
    }

    fn report(&mut self, err: ListError, action: &str) {
        match &err {
            ListError::Persist(_) => {
                tracing::error!(?err, action, "list change not saved");
                self.state
                    .set_error_message(format!("Could not save ({action}): {err}"));
            }
            ListError::IndexOutOfRange { .. } | ListError::UnknownItem(_) => {
                tracing::warn!(%err, action, "list change ignored");
                self.state.set_error_message(format!("Nothing to {action}"));
            }
        }
    }
}
