//! Command-line tool around the TA extraction library.

use std::fs;
use std::path::PathBuf;
use std::process;

use clap::error::ErrorKind;
use clap::{Parser, Subcommand};

use ta_extract::error::TaResult;
use ta_extract::layout::BOOTLOG_COUNT;
use ta_extract::TaImage;

const BOOTLOG_DIR: &str = "bootlogs";
const SQLITEDB_FILE: &str = "sqlite.db";

/// Inspects the data contained inside the TA (trim area) as found on SoMC
/// devices.
#[derive(Parser)]
#[command(name = "ta-extract", version)]
struct Cli {
    /// The TA dump to open
    file: PathBuf,
    /// The action to perform
    #[command(subcommand)]
    func: Func,
}

#[derive(Subcommand)]
#[command(rename_all = "snake_case")]
enum Func {
    /// Dump boot logs (the TA stores up to ten of these)
    DumpBootlogs,
    /// Dump the internal SQLite database
    DumpSqlitedb,
    /// Show build number
    ShowBuildid,
    /// Show serial number
    ShowSerial,
}

fn main() {
    pretty_env_logger::init();

    let cli = Cli::try_parse().unwrap_or_else(|err| {
        let _ = err.print();
        // Missing arguments show usage without counting as a failure.
        match err.kind() {
            ErrorKind::DisplayHelp
            | ErrorKind::DisplayVersion
            | ErrorKind::MissingRequiredArgument
            | ErrorKind::MissingSubcommand
            | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => process::exit(0),
            _ => process::exit(2),
        }
    });

    if let Err(err) = run(cli) {
        eprintln!("error: {err}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> TaResult<()> {
    println!("Opening file: {}", cli.file.display());
    let data = fs::read(&cli.file)?;
    println!("TA size: {} bytes", data.len());

    let image = TaImage::new(data)?;
    println!("TA size intact, proceeding..\n");

    match cli.func {
        Func::DumpBootlogs => dump_bootlogs(&image),
        Func::DumpSqlitedb => dump_sqlitedb(&image),
        Func::ShowBuildid => {
            println!("Image version: {}", image.build_id()?);
            Ok(())
        }
        Func::ShowSerial => {
            println!("Serial no.: {}", image.serial()?);
            Ok(())
        }
    }
}

/// Writes every readable boot log to `bootlogs/bootlog<slot>.txt`.
///
/// A slot that cannot be extracted is reported and skipped; the rest are
/// still written out.
fn dump_bootlogs<B: AsRef<[u8]>>(image: &TaImage<B>) -> TaResult<()> {
    fs::create_dir_all(BOOTLOG_DIR)?;

    let mut failed = 0;
    for result in image.bootlogs() {
        match result {
            Ok(log) => {
                println!("Dumping bootlog {} at {:#x}..", log.slot, log.offset);
                let path = format!("{BOOTLOG_DIR}/bootlog{}.txt", log.slot);
                println!("Saving to {path}..");
                fs::write(path, log.text)?;
            }
            Err(err) => {
                eprintln!("{err}");
                failed += 1;
            }
        }
    }

    if failed > 0 {
        eprintln!("{failed} of {BOOTLOG_COUNT} bootlogs could not be extracted");
    }
    Ok(())
}

/// Writes the embedded database to `sqlite.db` and checks the copy on disk
/// against the size the header promised.
fn dump_sqlitedb<B: AsRef<[u8]>>(image: &TaImage<B>) -> TaResult<()> {
    let db = image.sqlitedb()?;
    println!(
        "SQLite DB size: 2^{} ({} B)",
        db.size_exponent(),
        db.expected_len()
    );

    fs::write(SQLITEDB_FILE, db.bytes())?;

    let persisted = fs::metadata(SQLITEDB_FILE)?.len();
    if let Err(err) = db.verify_persisted(persisted) {
        eprintln!("{err}");
    }

    println!("Saved results to {SQLITEDB_FILE}!");
    Ok(())
}
