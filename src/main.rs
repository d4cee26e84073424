mod cli;
mod collector;
mod model;
mod monitor;
mod tui;

fn main() -> anyhow::Result<()> {
    cli::start::run()
}
