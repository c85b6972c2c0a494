// Entrypoint for the CLI application.
// - Keeps `main` small: resolve the configuration and hand it to the UI flow.
// - Any failure is printed once and exits with status 1.

use clap::Parser;
use qwen_image_edit::{encode::GuessTable, ui, Config};
use std::path::PathBuf;
use std::process::ExitCode;

/// Edit a local image with the Qwen image-edit API.
#[derive(Parser)]
#[command(version)]
struct Cli {
    /// Directory holding `.env`, `Prompt.txt`, `input/` and `output/`
    #[arg(short = 'C', long, default_value = ".")]
    workdir: PathBuf,

    /// Edit this image instead of searching for one
    #[arg(long)]
    image: Option<PathBuf>,
}

fn main() -> ExitCode {
    pretty_env_logger::formatted_builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            ui::error(&err.to_string());
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::resolve(&cli.workdir, |key| std::env::var(key).ok())?;
    config.image = cli.image;

    let outcome = ui::run_edit(&config, &GuessTable)?;
    ui::print_summary(&outcome);
    Ok(())
}
