//! Command-line entry point for `mockdb_core`.
//!
//! # Responsibility
//! - Verify core crate wiring with a deterministic version line.
//! - Inspect a store dump: namespace sizes, or item matches for a query.
//!
//! Usage: `mockdb_cli [DUMP.json [KIND QUERY...]]`. Logging goes to
//! `$MOCKDB_LOG_DIR` when that variable holds an absolute path.

use mockdb_core::{
    default_log_level, init_logging, Item, ItemField, LoggingConfig, RecordKind, Store,
};
use std::process::ExitCode;

fn main() -> ExitCode {
    match run(std::env::args().skip(1).collect()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("mockdb_cli error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Vec<String>) -> Result<(), String> {
    if let Ok(log_dir) = std::env::var("MOCKDB_LOG_DIR") {
        init_logging(&LoggingConfig::new(default_log_level(), log_dir))?;
    }

    println!("mockdb_core version={}", mockdb_core::core_version());
    let Some((dump_path, rest)) = args.split_first() else {
        return Ok(());
    };

    let mut store = Store::new();
    store
        .load_from_file(dump_path)
        .map_err(|err| err.to_string())?;

    let Some((kind_tag, terms)) = rest.split_first() else {
        for kind in RecordKind::ALL {
            println!("{} records={}", kind, store.len(kind));
        }
        return Ok(());
    };

    let kind = RecordKind::parse_tag(kind_tag)
        .and_then(RecordKind::as_item_kind)
        .ok_or_else(|| format!("`{kind_tag}` is not a searchable item kind"))?;
    let hits = Item::str_filter(&store, kind, &terms.join(" ")).map_err(|err| err.to_string())?;
    for item in hits {
        let name = item
            .load_note(&store, ItemField::Name)
            .map_err(|err| err.to_string())?;
        println!("{} id={} name={}", kind, item.id.unwrap_or_default(), name.text());
    }
    Ok(())
}
