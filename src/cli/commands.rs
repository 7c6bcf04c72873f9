use std::io::{self, Read};

use anyhow::{bail, Context, Result};
use clap::{Args, ValueEnum};
use serde::Serialize;

use crate::app::App;
use crate::storage::KeyValueStore;
use crate::store::{ListStore, Status};
use crate::view::{self, FilterState};

#[derive(Args, Debug, Clone)]
pub struct AddArgs {
    /// Task text (words are joined with spaces). Read from stdin if omitted.
    #[arg()]
    pub name: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    /// Only show tasks with this status (pending, completed)
    #[arg(long)]
    pub filter: Option<FilterState>,
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Args, Debug, Clone)]
pub struct IndexArgs {
    /// 1-based position as printed by `list`
    pub index: usize,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    Html,
}

#[derive(Debug, Serialize)]
struct ListedItem<'a> {
    position: usize,
    name: &'a str,
    status: Status,
}

pub fn run_tui<S: KeyValueStore>(app: &mut App<S>) -> Result<()> {
    app.run()
}

pub fn add_item<S: KeyValueStore>(mut store: ListStore<S>, args: AddArgs) -> Result<()> {
    let output = if args.name.is_empty() {
        let piped = read_stdin()?.unwrap_or_default();
        run_add_lines(&mut store, &piped)?
    } else {
        run_add(&mut store, &args.name.join(" "))?
    };
    print!("{output}");
    Ok(())
}

pub fn list_items<S: KeyValueStore>(store: &ListStore<S>, args: ListArgs) -> Result<()> {
    print!("{}", run_list(store, &args)?);
    Ok(())
}

pub fn set_item_status<S: KeyValueStore>(
    mut store: ListStore<S>,
    args: IndexArgs,
    completed: bool,
) -> Result<()> {
    print!("{}", run_set_status(&mut store, &args, completed)?);
    Ok(())
}

pub fn remove_item<S: KeyValueStore>(mut store: ListStore<S>, args: IndexArgs) -> Result<()> {
    print!("{}", run_remove(&mut store, &args)?);
    Ok(())
}

pub fn clear_items<S: KeyValueStore>(mut store: ListStore<S>) -> Result<()> {
    let count = store.clear().context("clearing list")?;
    println!("Cleared {count} task(s)");
    Ok(())
}

fn run_add<S: KeyValueStore>(store: &mut ListStore<S>, name: &str) -> Result<String> {
    match store.add(name).context("adding task")? {
        Some(_) => Ok(format!("Added '{}' ({} total)\n", name.trim(), store.len())),
        None => Ok("Nothing added: task text is empty\n".to_string()),
    }
}

/// One task per non-blank line, added in reading order so the last line ends up on top.
fn run_add_lines<S: KeyValueStore>(store: &mut ListStore<S>, text: &str) -> Result<String> {
    let mut out = String::new();
    for line in text.lines().filter(|line| !line.trim().is_empty()) {
        out.push_str(&run_add(store, line)?);
    }
    if out.is_empty() {
        out = run_add(store, "")?;
    }
    Ok(out)
}

fn run_list<S: KeyValueStore>(store: &ListStore<S>, args: &ListArgs) -> Result<String> {
    let rendered = view::render(store.items(), args.filter.unwrap_or_default());
    match args.format {
        OutputFormat::Html => Ok(rendered.to_markup()),
        OutputFormat::Json => {
            let listed: Vec<ListedItem> = rendered
                .rows
                .iter()
                .map(|row| ListedItem {
                    position: row.index + 1,
                    name: &row.name,
                    status: Status::from_completed(row.completed),
                })
                .collect();
            let mut json =
                serde_json::to_string_pretty(&listed).context("serialising task list")?;
            json.push('\n');
            Ok(json)
        }
        OutputFormat::Text => {
            if rendered.show_empty {
                return Ok("No tasks yet.\n".to_string());
            }
            if rendered.rows.is_empty() {
                return Ok(format!("No {} tasks.\n", rendered.filter));
            }
            let mut out = String::new();
            for row in &rendered.rows {
                let checkbox = if row.completed { "[x]" } else { "[ ]" };
                out.push_str(&format!("{:>3}. {checkbox} {}\n", row.index + 1, row.name));
            }
            Ok(out)
        }
    }
}

fn run_set_status<S: KeyValueStore>(
    store: &mut ListStore<S>,
    args: &IndexArgs,
    completed: bool,
) -> Result<String> {
    let index = zero_based(args.index)?;
    store
        .set_status(index, completed)
        .with_context(|| format!("updating task {}", args.index))?;
    let name = store.get(index).map(|item| item.name.as_str()).unwrap_or("");
    let status = Status::from_completed(completed);
    Ok(format!("Marked #{} '{name}' {status}\n", args.index))
}

fn run_remove<S: KeyValueStore>(store: &mut ListStore<S>, args: &IndexArgs) -> Result<String> {
    let index = zero_based(args.index)?;
    let removed = store
        .remove_at(index)
        .with_context(|| format!("removing task {}", args.index))?;
    Ok(format!("Removed #{} '{}'\n", args.index, removed.name))
}

fn zero_based(position: usize) -> Result<usize> {
    if position == 0 {
        bail!("task positions start at 1");
    }
    Ok(position - 1)
}

fn read_stdin() -> Result<Option<String>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }
    let mut buffer = String::new();
    io::stdin()
        .read_to_string(&mut buffer)
        .context("reading task text from stdin")?;
    Ok(Some(buffer))
}
