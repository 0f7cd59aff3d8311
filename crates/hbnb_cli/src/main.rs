//! `hbnb` console entry point.
//!
//! # Responsibility
//! - Wire configuration, logging, storage and the shell to stdin/stdout.
//! - Map fatal storage or stream failures to exit code 1.

use hbnb_core::{init_logging, FileStorage, KindRegistry, Shell, ShellConfig};
use log::{error, info};
use std::io::{self, IsTerminal};
use std::process::ExitCode;
use std::sync::Arc;

fn main() -> ExitCode {
    let config = ShellConfig::default();

    // Logging is diagnostics only; the console still works without it.
    if let Err(err) = init_logging(&config.log_level, &config.log_dir) {
        eprintln!("hbnb: logging disabled: {err}");
    }

    let kinds = Arc::new(KindRegistry::with_builtin_kinds());
    let storage = match FileStorage::open(&config.storage_path, &kinds) {
        Ok(storage) => storage,
        Err(err) => {
            error!("event=app_exit module=cli status=error stage=load error={err}");
            eprintln!("hbnb: {err}");
            return ExitCode::FAILURE;
        }
    };

    let stdin = io::stdin();
    let piped_input = !stdin.is_terminal();
    let mut shell = Shell::new(storage, kinds, io::stdout())
        .with_prompt(config.prompt.as_str())
        .with_piped_input(piped_input);

    match shell.run(stdin.lock()) {
        Ok(()) => {
            info!("event=app_exit module=cli status=ok");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("event=app_exit module=cli status=error stage=command error={err}");
            eprintln!("hbnb: {err}");
            ExitCode::FAILURE
        }
    }
}
