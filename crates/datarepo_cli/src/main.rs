//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `datarepo_core` linkage.
//! - Inspect a repository root's descriptor when one is given.

use std::path::Path;
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("datarepo_core version={}", datarepo_core::core_version());

    let Some(root) = std::env::args().nth(1) else {
        return ExitCode::SUCCESS;
    };

    match datarepo_core::storage::posix::open_access(Path::new(&root)) {
        Ok(access) => match access.load_descriptor() {
            Ok(config) => {
                let root_display = config
                    .root
                    .as_deref()
                    .map(|path| path.display().to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "descriptor root={} parents={} peers={}",
                    root_display,
                    config.parents.len(),
                    config.peers.len()
                );
                ExitCode::SUCCESS
            }
            Err(err) => {
                eprintln!("failed to load descriptor at `{root}`: {err}");
                ExitCode::FAILURE
            }
        },
        Err(err) => {
            eprintln!("failed to open `{root}`: {err}");
            ExitCode::FAILURE
        }
    }
}
