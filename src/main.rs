use std::process::ExitCode;

use clap::Parser;
use git_evtag::cli::{self, Cli};
use git_evtag::ui::output;

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // clap exits 2 on usage errors; 2 means ObjectNotFound here.
            let code = if err.use_stderr() {
                cli::GENERIC_FAILURE
            } else {
                0
            };
            let _ = err.print();
            return ExitCode::from(code as u8);
        }
    };

    match cli::run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            output::error(format!("{err:#}"));
            ExitCode::from(cli::exit_code(&err) as u8)
        }
    }
}
