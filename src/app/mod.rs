use std::io::Stdout;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::widgets::ListState;
use ratatui::Terminal;

use crate::config::themes::ThemeRegistry;
use crate::config::AppConfig;
use crate::storage::KeyValueStore;
use crate::store::ListStore;
use crate::ui::{self, ScreenStyle};
use crate::view::FilterState;

mod actions;
pub mod state;

pub use actions::{ActionDispatcher, UiEvent};
pub use state::{AppState, FocusPane, InputState, StatusKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Quit,
    SelectNext,
    SelectPrevious,
    ToggleFocus,
    FocusInput,
    ToggleHelp,
    Event(UiEvent),
}

pub struct App<S> {
    state: AppState<S>,
    list_state: ListState,
    style: ScreenStyle,
    should_quit: bool,
    tick_rate: Duration,
}

impl<S: KeyValueStore> App<S> {
    pub fn new(config: &AppConfig, store: ListStore<S>) -> Self {
        let state = AppState::new(store, config.ui.max_input_len);
        let style = ScreenStyle {
            palette: ThemeRegistry::default().palette(config.theme),
            show_indices: config.ui.show_indices,
        };
        tracing::info!(items = state.items().len(), "starting list screen");
        Self {
            tick_rate: config.ui.tick_rate(),
            state,
            list_state: ListState::default(),
            style,
            should_quit: false,
        }
    }

    pub fn state(&self) -> &AppState<S> {
        &self.state
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn run(&mut self) -> Result<()> {
        let mut terminal = setup_terminal()?;
        let result = self.event_loop(&mut terminal);
        restore_terminal(&mut terminal)?;
        result
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        let mut last_tick = Instant::now();
        loop {
            terminal
                .draw(|frame| {
                    self.sync_list_state();
                    ui::draw_app(frame, &self.state, &mut self.list_state, &self.style);
                })
                .context("rendering frame")?;

            if self.should_quit {
                break;
            }

            let timeout = self
                .tick_rate
                .checked_sub(last_tick.elapsed())
                .unwrap_or_else(|| Duration::from_millis(0));

            if event::poll(timeout).context("polling for terminal events")? {
                if let Event::Key(key) = event::read().context("reading terminal event")? {
                    self.handle_key(key);
                }
            }

            if last_tick.elapsed() >= self.tick_rate {
                self.state.expire_status_message();
                last_tick = Instant::now();
            }
        }
        Ok(())
    }

    fn sync_list_state(&mut self) {
        if self.state.view().rows.is_empty() {
            self.list_state.select(None);
        } else {
            self.list_state.select(Some(self.state.selected));
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.handle_action(Action::Quit);
            return;
        }
        if self.state.show_help() {
            if matches!(key.code, KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q')) {
                self.state.toggle_help();
            }
            return;
        }

        let action = match self.state.focus {
            FocusPane::Input => self.input_action(key),
            FocusPane::List => list_action(key, self.state.selected),
        };
        if let Some(action) = action {
            self.handle_action(action);
        }
    }

    fn input_action(&mut self, key: KeyEvent) -> Option<Action> {
        match key.code {
            KeyCode::Enter => Some(Action::Event(UiEvent::Submit)),
            KeyCode::Esc | KeyCode::Tab | KeyCode::Down => Some(Action::ToggleFocus),
            KeyCode::Backspace => {
                self.state.input.backspace();
                None
            }
            KeyCode::Char(ch) if !has_command_modifier(key.modifiers) => {
                if !self.state.input.push_char(ch) {
                    self.state.set_status_message("Item name is at the length limit");
                }
                None
            }
            _ => None,
        }
    }

    fn handle_action(&mut self, action: Action) {
        match action {
            Action::Quit => self.should_quit = true,
            Action::SelectNext => self.state.move_selection(1),
            Action::SelectPrevious => self.state.move_selection(-1),
            Action::ToggleFocus => self.state.toggle_focus(),
            Action::FocusInput => self.state.focus = FocusPane::Input,
            Action::ToggleHelp => self.state.toggle_help(),
            Action::Event(event) => ActionDispatcher::new(&mut self.state).dispatch(event),
        }
    }
}

fn list_action(key: KeyEvent, row: usize) -> Option<Action> {
    if has_command_modifier(key.modifiers) {
        return None;
    }
    let action = match key.code {
        KeyCode::Char('q') => Action::Quit,
        KeyCode::Char('j') | KeyCode::Down => Action::SelectNext,
        KeyCode::Char('k') | KeyCode::Up => Action::SelectPrevious,
        KeyCode::Tab | KeyCode::Esc => Action::ToggleFocus,
        KeyCode::Char('i') | KeyCode::Char('a') | KeyCode::Char('/') => Action::FocusInput,
        KeyCode::Char('?') => Action::ToggleHelp,
        KeyCode::Char(' ') | KeyCode::Char('x') | KeyCode::Enter => {
            Action::Event(UiEvent::ToggleRow(row))
        }
        KeyCode::Char('d') | KeyCode::Delete => Action::Event(UiEvent::DeleteRow(row)),
        KeyCode::Char('1') => Action::Event(UiEvent::SelectFilter(FilterState::None)),
        KeyCode::Char('2') | KeyCode::Char('p') => {
            Action::Event(UiEvent::SelectFilter(FilterState::Pending))
        }
        KeyCode::Char('3') | KeyCode::Char('c') => {
            Action::Event(UiEvent::SelectFilter(FilterState::Completed))
        }
        KeyCode::Char('X') => Action::Event(UiEvent::ClearAll),
        _ => return None,
    };
    Some(action)
}

fn has_command_modifier(modifiers: KeyModifiers) -> bool {
    modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER)
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode().context("enabling raw mode")?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen).context("switching to alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("creating terminal backend")?;
    terminal.hide_cursor().context("hiding cursor")?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    terminal.show_cursor().ok();
    disable_raw_mode().context("disabling raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen).context("restoring screen state")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use crate::store::Status;

    fn app() -> App<MemoryStore> {
        App::new(&AppConfig::default(), ListStore::load(MemoryStore::new()))
    }

    fn press(app: &mut App<MemoryStore>, code: KeyCode) {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE));
    }

    fn type_text(app: &mut App<MemoryStore>, text: &str) {
        for ch in text.chars() {
            press(app, KeyCode::Char(ch));
        }
    }

    #[test]
    fn typing_and_enter_adds_items() {
        let mut app = app();
        type_text(&mut app, "buy milk");
        press(&mut app, KeyCode::Enter);
        type_text(&mut app, "qx");
        press(&mut app, KeyCode::Enter);

        let names: Vec<_> = app.state().items().iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["qx", "buy milk"]);
        assert!(!app.should_quit(), "q typed into the input must not quit");
    }

    #[test]
    fn list_keys_toggle_delete_and_filter_selected_row() {
        let mut app = app();
        for name in ["C", "B", "A"] {
            type_text(&mut app, name);
            press(&mut app, KeyCode::Enter);
        }
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.state().focus, FocusPane::List);

        press(&mut app, KeyCode::Char('j'));
        press(&mut app, KeyCode::Char(' '));
        assert_eq!(app.state().items()[1].status, Status::Completed);

        press(&mut app, KeyCode::Char('c'));
        assert_eq!(app.state().filter(), FilterState::Completed);
        assert_eq!(app.state().view().rows.len(), 1);
        press(&mut app, KeyCode::Char('d'));
        assert_eq!(app.state().items().len(), 2);
        assert!(app.state().view().rows.is_empty());
        assert!(!app.state().view().show_empty);

        press(&mut app, KeyCode::Char('c'));
        assert_eq!(app.state().filter(), FilterState::None);
        press(&mut app, KeyCode::Char('X'));
        assert!(app.state().items().is_empty());

        press(&mut app, KeyCode::Char('q'));
        assert!(app.should_quit());
    }

    #[test]
    fn input_limit_comes_from_config() {
        let mut config = AppConfig::default();
        config.ui.max_input_len = 3;
        let mut app = App::new(&config, ListStore::load(MemoryStore::new()));
        type_text(&mut app, "abcd");
        assert_eq!(app.state().input.value(), "abc");
        assert!(app.state().status_message().is_some());
    }

    #[test]
    fn help_overlay_swallows_keys() {
        let mut app = app();
        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Char('?'));
        assert!(app.state().show_help());
        press(&mut app, KeyCode::Char('X'));
        press(&mut app, KeyCode::Esc);
        assert!(!app.state().show_help());
        assert!(!app.should_quit());
    }
}
