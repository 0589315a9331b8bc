//! CLI smoke entry point.
//!
//! # Responsibility
//! - Open the store selected by the environment and load it once.
//! - Print a deterministic summary for quick local sanity checks.

use std::process::ExitCode;
use todo_core::{init_logging, StoreConfig, StoreHandle, TodoService};

fn main() -> ExitCode {
    let mut config = match StoreConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("todo_core config error: {err}");
            return ExitCode::FAILURE;
        }
    };
    if let Ok(absolute) = std::path::absolute(&config.data_dir) {
        config.data_dir = absolute;
    }

    if let Err(err) = init_logging(config.log_level, &config.log_dir()) {
        eprintln!("todo_core logging disabled: {err}");
    }

    let handle = match StoreHandle::open(&config) {
        Ok(handle) => handle,
        Err(err) => {
            eprintln!("todo_core store error: {err}");
            return ExitCode::FAILURE;
        }
    };

    let loaded = {
        let repo = match handle.repository() {
            Ok(repo) => repo,
            Err(err) => {
                eprintln!("todo_core store error: {err}");
                return ExitCode::FAILURE;
            }
        };
        let mut service = TodoService::new(repo);
        let loaded = service.initialize();

        println!("todo_core version={}", todo_core::core_version());
        println!("todo_core backend={}", config.backend.as_str());
        println!("todo_core path={}", config.storage_path().display());
        println!(
            "todo_core items={} open={}",
            service.items().len(),
            service.items().iter().filter(|item| !item.is_completed()).count()
        );
        if let Some(message) = service.last_error_message() {
            println!("todo_core error={message}");
        }
        loaded
    };

    if let Err(err) = handle.close() {
        eprintln!("todo_core close error: {err}");
        return ExitCode::FAILURE;
    }

    if loaded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
