//! rebrand - rewrite CI workflow files for a renamed product

use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(e) = workflow_rebrand::cli::run() {
        eprintln!("Error: {:#}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
