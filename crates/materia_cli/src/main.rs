//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `materia_core` linkage and configuration end to end.
//! - Optionally print one pivot table as JSON.
//!
//! Usage: `materia_cli [config.json] [owner_id structure [locale]]`.
//! `structure` is an id when numeric, a url when it starts with `/`, and a
//! name otherwise.

use log::info;
use materia_core::{
    core_version, CoreConfig, Locale, Resolution, SqliteTableRepository, StructureSelector,
    TableService,
};
use std::process::ExitCode;

fn main() -> ExitCode {
    match run(std::env::args().skip(1).collect()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("materia_cli: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Vec<String>) -> Result<(), String> {
    println!("materia_core version={}", core_version());

    let config = match args.first() {
        Some(path) => CoreConfig::load(path).map_err(|err| err.to_string())?,
        None => CoreConfig::default(),
    };
    config.init_logging().map_err(|err| err.to_string())?;
    let conn = config.open_connection().map_err(|err| err.to_string())?;
    info!("event=cli_start module=cli status=ok args={}", args.len());

    let (Some(owner), Some(structure)) = (args.get(1), args.get(2)) else {
        println!("materia_core db=ready");
        return Ok(());
    };
    let owner_id: i64 = owner
        .parse()
        .map_err(|_| format!("owner id `{owner}` is not an integer"))?;
    let locale = args.get(3).map(Locale::new).unwrap_or_else(|| config.locale());

    let repo = SqliteTableRepository::try_new(&conn).map_err(|err| err.to_string())?;
    let service = TableService::new(repo);
    match service
        .build_table(owner_id, &parse_selector(structure), &locale)
        .map_err(|err| err.to_string())?
    {
        Resolution::Found(table) => {
            let json = serde_json::to_string_pretty(&table).map_err(|err| err.to_string())?;
            println!("{json}");
            Ok(())
        }
        Resolution::UnknownStructure(selector) => Err(format!("unknown structure {selector}")),
        other => Err(format!("no table: {other:?}")),
    }
}

fn parse_selector(raw: &str) -> StructureSelector {
    if let Ok(id) = raw.parse::<i64>() {
        StructureSelector::Id(id)
    } else if raw.starts_with('/') {
        StructureSelector::Url(raw.to_string())
    } else {
        StructureSelector::Name(raw.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::parse_selector;
    use materia_core::StructureSelector;

    #[test]
    fn selector_kind_follows_argument_shape() {
        assert_eq!(parse_selector("12"), StructureSelector::Id(12));
        assert_eq!(
            parse_selector("/catalog"),
            StructureSelector::Url("/catalog".to_string())
        );
        assert_eq!(
            parse_selector("Catalog"),
            StructureSelector::Name("Catalog".to_string())
        );
    }
}
