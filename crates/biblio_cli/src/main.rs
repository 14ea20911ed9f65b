//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `biblio_core` linkage and open the configured catalog.
//! - Print a deterministic one-line-per-field summary.
//!
//! Usage: `biblio_cli [config.json]`. Without a config file an in-memory
//! catalog holding only the seed categories is opened.

use biblio_core::{CatalogConfig, SqliteCatalogService};
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("event=cli_run module=cli status=error error={}", err);
            eprintln!("biblio_cli: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("biblio_core ping={}", biblio_core::ping());
    println!("biblio_core version={}", biblio_core::core_version());

    let config = match std::env::args_os().nth(1) {
        Some(path) => CatalogConfig::from_file(path)?,
        None => CatalogConfig::default(),
    };
    config.start_logging()?;

    let conn = config.open_connection()?;
    let service = SqliteCatalogService::from_connection(&conn).with_text_match(config.search_match);
    let summary = service.catalog_summary()?;

    println!("categories={}", summary.total_categories);
    println!("books={}", summary.total_books);
    println!("want_to_read={}", summary.want_to_read);
    println!("reading={}", summary.reading);
    println!("read={}", summary.read);
    for entry in &summary.recent_books {
        println!(
            "recent id={} status={} category={}",
            entry.book.id, entry.book.status, entry.category.id
        );
    }

    Ok(())
}
