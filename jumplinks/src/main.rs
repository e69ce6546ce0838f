// jumplinks/src/main.rs
//! Jumplinks entry point.
//!
//! Loads `.env`, parses the command line, sets up logging and hands over to
//! the selected command. Failures are reported on stderr with the full
//! context chain and a non-zero exit code.

use clap::Parser;
use is_terminal::IsTerminal;
use jumplinks::cli::Cli;
use jumplinks::logger;
use jumplinks::ui::output_format;
use jumplinks::ui::theme::ThemeStyle;
use std::io;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    // JUMPLINKS_STORE / JUMPLINKS_CONFIG may come from a local .env file.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    logger::init_logger(logger::level_from_flags(cli.debug, cli.quiet));

    match jumplinks::dispatch(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let stderr = io::stderr();
            let supports_color = stderr.is_terminal();
            let _ = output_format::print_error_message(
                &mut stderr.lock(),
                &format!("{:#}", err),
                &ThemeStyle::default_theme_map(),
                supports_color,
            );
            ExitCode::FAILURE
        }
    }
}
