// Declare modules
pub mod cli;
pub mod config;
pub mod error;
pub mod formatter;
pub mod ignore;
pub mod models;
pub mod normalize;
pub mod scanner;
pub mod version;
pub mod workflow;

use anyhow::{Context, Result};
use clap::Parser;
use std::env;

use self::cli::Cli;
use self::formatter::OutputGenerator;
use self::normalize::normalize_options;
use self::scanner::Scanner;

/// Resolves the fingerprint options for one project and prints them.
pub fn run() -> Result<()> {
    // 1. Parse Args
    let args = Cli::parse();

    // 2. Identify Project Root
    let project_root = match &args.root {
        Some(root) => root.clone(),
        None => env::current_dir().context("Failed to get current directory")?,
    };

    // 3. Normalize Options
    let options = args.to_options();
    let normalized = normalize_options(&project_root, Some(&options)).with_context(|| {
        format!(
            "Failed to resolve fingerprint options for {}",
            project_root.display()
        )
    })?;

    // 4. Generate Output
    let output = if args.list_files {
        let files = Scanner::new(project_root, &normalized).scan();
        if files.is_empty() {
            log::warn!("No files inside the fingerprint scope.");
        }
        OutputGenerator::generate_file_list(&files)
    } else if args.json {
        OutputGenerator::generate_json(&normalized)?
    } else {
        OutputGenerator::generate_summary(&normalized)
    };

    // 5. Print to Stdout
    println!("{}", output);

    Ok(())
}
