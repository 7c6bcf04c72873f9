fn main() -> anyhow::Result<()> {
    todo_tui::cli::run()
}
