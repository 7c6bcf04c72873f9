
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

use crate::store::{Item, ItemId, Status};

/// Visibility criterion for rendered rows. Process-wide and never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum FilterState {
    #[default]
    None,
    Pending,
    Completed,
}

impl FilterState {
    pub fn admits(self, status: Status) -> bool {
        match self {
            FilterState::None => true,
            FilterState::Pending => status == Status::Pending,
            FilterState::Completed => status == Status::Completed,
        }
    }

    /// Selecting the active filter clears it; any other choice replaces it.
    pub fn toggled(self, selected: FilterState) -> FilterState {
        if self == selected {
            FilterState::None
        } else {
            selected
        }
    }

    /// The filter controls, in display order. `None` is the "All" control.
    pub fn controls() -> impl Iterator<Item = FilterState> {
        FilterState::iter()
    }

    pub fn label(self) -> &'static str {
        match self {
            FilterState::None => "All",
            FilterState::Pending => "Pending",
            FilterState::Completed => "Completed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    /// Position in the unfiltered list at render time.
    pub index: usize,
    pub id: ItemId,
    pub name: String,
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListRender {
    pub rows: Vec<Row>,
    pub show_empty: bool,
    pub filter: FilterState,
}

impl ListRender {
    pub fn row(&self, position: usize) -> Option<&Row> {
        self.rows.get(position)
    }

    /// Whether `filter`'s control should be drawn as active. Exactly one is.
    pub fn is_active(&self, filter: FilterState) -> bool {
        self.filter == filter
    }

    /// HTML fragment with one `<li class="todo">` per row.
    pub fn to_markup(&self) -> String {
        let mut out = String::new();
        for row in &self.rows {
            let checked = if row.completed { "checked" } else { "" };
            out.push_str(&format!(
                concat!(
                    "<li class=\"todo\">",
                    "<label for=\"{idx}\">",
                    "<input id=\"{idx}\" type=\"checkbox\"{attr}>",
                    "<span class=\"{checked}\">{name}</span>",
                    "</label>",
                    "<button class=\"delete-btn\" data-index=\"{idx}\"></button>",
                    "</li>\n"
                ),
                idx = row.index,
                attr = if row.completed { " checked" } else { "" },
                checked = checked,
                name = escape_html(&row.name),
            ));
        }
        out
    }
}

/// Derives the visible rows for `items` under `filter`.
///
/// The empty indicator follows the unfiltered list only, so a non-empty list that
/// is entirely filtered out shows neither rows nor the indicator.
pub fn render(items: &[Item], filter: FilterState) -> ListRender {
    if items.is_empty() {
        return ListRender {
            rows: Vec::new(),
            show_empty: true,
            filter,
        };
    }
    let rows = items
        .iter()
        .enumerate()
        .filter(|(_, item)| filter.admits(item.status))
        .map(|(index, item)| Row {
            index,
            id: item.id,
            name: item.name.clone(),
            completed: item.is_completed(),
        })
        .collect();
    ListRender {
        rows,
        show_empty: false,
        filter,
    }
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}
