use std::process::ExitCode;
use tracing::info;
use vaultdb::config::{self, Config};
use vaultdb::{Record, RecordStore, Result, VaultError};

const USAGE: &str = "usage: vaultdb [--config <file>] <database> <command> [args]

commands:
  tables                         list user tables
  columns <table>                list columns of a table
  count <table>                  count rows
  dump <table>                   print every row
  export <table> <file.csv>      write a table to CSV
  import <table> <file.csv>      load a CSV file into a table
  backup <file>                  copy the database to a file
  restore <file>                 replace the database with a backup
  index <table> <column> [--unique]";

fn main() -> ExitCode {
    // Logs go to stderr so command output stays pipeable
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(mut args: Vec<String>) -> Result<()> {
    let config = match args.iter().position(|a| a == "--config") {
        Some(i) if i + 1 < args.len() => {
            let path = args.remove(i + 1);
            args.remove(i);
            config::load_config(path)?
        }
        Some(_) => return Err(VaultError::Config("--config needs a file".to_string())),
        None => match config::default_config_path().filter(|p| p.is_file()) {
            Some(path) => config::load_config(path)?,
            None => Config::default(),
        },
    };

    let mut args = args.into_iter();
    let database = args
        .next()
        .or_else(|| config.database.path.clone())
        .ok_or_else(|| VaultError::Config(USAGE.to_string()))?;
    let command = args.next().unwrap_or_else(|| "tables".to_string());
    let rest: Vec<String> = args.collect();

    info!("Opening {}", database);
    let mut store = RecordStore::open_with_config(database.as_str(), &config);
    if !store.connection().is_available() {
        return Err(VaultError::Unavailable);
    }

    let arg = |i: usize| argument(&rest, i, &command);

    match command.as_str() {
        "tables" => {
            for table in store.list_tables()? {
                println!("{}", table);
            }
        }
        "columns" => {
            for column in store.describe_table(arg(0)?)? {
                println!(
                    "{}\t{}{}{}",
                    column.name,
                    column.type_name,
                    if column.pk { "\tPRIMARY KEY" } else { "" },
                    if column.notnull { "\tNOT NULL" } else { "" }
                );
            }
        }
        "count" => println!("{}", store.count(arg(0)?, None)?),
        "dump" => {
            for row in store.fetch_all(arg(0)?)? {
                println!("{}", format_record(&row));
            }
        }
        "export" => {
            let rows = store.export_to_csv(arg(0)?, arg(1)?)?;
            println!("exported {} rows", rows);
        }
        "import" => {
            let outcome = store.import_from_csv(arg(0)?, arg(1)?)?;
            println!("imported {} rows", outcome.changed());
        }
        "backup" => {
            store.backup(arg(0)?)?;
            println!("backup written to {}", arg(0)?);
        }
        "restore" => {
            store.restore(arg(0)?)?;
            println!("restored from {}", arg(0)?);
        }
        "index" => {
            let unique = rest.iter().any(|a| a == "--unique");
            store.create_index(arg(0)?, arg(1)?, unique)?;
            println!("index idx_{}_{} ready", arg(0)?, arg(1)?);
        }
        other => {
            return Err(VaultError::Config(format!("unknown command '{}'\n{}", other, USAGE)));
        }
    }

    store.close();
    Ok(())
}

fn argument<'a>(rest: &'a [String], i: usize, command: &str) -> Result<&'a str> {
    rest.get(i)
        .map(String::as_str)
        .ok_or_else(|| VaultError::Config(format!("missing argument for '{}'\n{}", command, USAGE)))
}

fn format_record(record: &Record) -> String {
    record
        .iter()
        .map(|(column, value)| format!("{}={}", column, value))
        .collect::<Vec<_>>()
        .join("\t")
}
