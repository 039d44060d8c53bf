//! One-shot batch import: parse the forum JSON export, normalize each
//! report, and append the survivors into a fresh table through the
//! positional collection.

mod error;
mod export;

use clap::Parser;
use error::IngestError;
use export::ForumExport;
use rowseq::{ColumnSpec, DataType, LengthMode, Session};
use rowseq_text::TextFilter;
use std::path::PathBuf;

///
/// Args
///

#[derive(Debug, Parser)]
#[command(name = "rowseq-ingest", about = "Import a forum JSON export into a reports table")]
struct Args {
    /// Path to the JSON export
    export: PathBuf,

    /// Database file to write (created if absent)
    #[arg(long, default_value = "reports.db")]
    database: PathBuf,

    /// Table to (re)create
    #[arg(long, default_value = "reports")]
    table: String,

    /// Texts longer than this are skipped
    #[arg(long, default_value_t = 5000)]
    max_text_len: usize,
}

fn report_columns() -> Vec<ColumnSpec> {
    vec![
        ColumnSpec::new("id", DataType::Integer)
            .not_null()
            .unique()
            .primary_key(),
        ColumnSpec::new("date", DataType::Integer).not_null(),
        ColumnSpec::new("is_report", DataType::Integer).not_null(),
        ColumnSpec::new("main_place", DataType::Text).not_null(),
        ColumnSpec::new("place", DataType::Text).not_null(),
        ColumnSpec::new("text", DataType::Text).not_null(),
        ColumnSpec::new("emoticons", DataType::Integer).not_null(),
    ]
}

fn run(args: &Args) -> Result<usize, IngestError> {
    let export = ForumExport::load(&args.export)?;
    let filter = TextFilter::new([]);
    let entries = export.entries(&filter, args.max_text_len);

    let mut session = Session::open(&args.database)?;
    if session.introspect(&args.table).is_ok() {
        session.drop_table(&args.table)?;
    }
    session.create_table(&args.table, &report_columns())?;
    session.bind(&args.table, "id", LengthMode::Cached)?;

    // One transaction for the whole import; a failure leaves no partial
    // table behind.
    session.begin()?;
    let appended = match session.extend(entries.iter().map(export::ReportEntry::to_row)) {
        Ok(appended) => appended,
        Err(err) => {
            session.rollback()?;
            return Err(err.into());
        }
    };
    session.commit()?;
    session.close()?;

    Ok(appended)
}

fn main() {
    let args = Args::parse();

    match run(&args) {
        Ok(appended) => {
            println!(
                "ingested {appended} reports into {}",
                args.database.display()
            );
        }
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    }
}
