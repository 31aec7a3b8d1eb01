use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use pagedb::{DbError, MetaCommand, Statement, Table};

/// Single-table record store with an interactive prompt
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Database file, created if missing
    db_file: PathBuf,

    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long)]
    debug: bool,
}

enum ReadOutcome {
    Line,
    NotUtf8,
    Eof,
}

struct InputBuffer {
    buffer: String,
}

impl InputBuffer {
    fn new() -> Self {
        Self {
            buffer: String::new(),
        }
    }

    fn read_input(&mut self) -> Result<ReadOutcome> {
        self.buffer.clear();
        let mut raw = Vec::new();
        let n = io::stdin()
            .lock()
            .read_until(b'\n', &mut raw)
            .context("Failed to read line")?;
        if n == 0 {
            return Ok(ReadOutcome::Eof);
        }
        match String::from_utf8(raw) {
            Ok(line) => {
                self.buffer = line.trim().to_string();
                Ok(ReadOutcome::Line)
            }
            Err(_) => Ok(ReadOutcome::NotUtf8),
        }
    }
}

fn print_prompt() -> Result<()> {
    print!("db > ");
    io::stdout().flush()?;
    Ok(())
}

fn run(table: &mut Table) -> Result<()> {
    let mut input_buffer = InputBuffer::new();

    loop {
        print_prompt()?;
        match input_buffer.read_input()? {
            ReadOutcome::Line => {}
            ReadOutcome::NotUtf8 => {
                println!("Input is not valid UTF-8.");
                continue;
            }
            ReadOutcome::Eof => return Ok(()),
        }
        let input = input_buffer.buffer.as_str();
        if input.is_empty() {
            continue;
        }

        if let Some(meta) = MetaCommand::parse(input) {
            match meta {
                MetaCommand::Exit => return Ok(()),
                MetaCommand::Unrecognized(command) => {
                    println!("Unrecognized meta-command: {command}");
                }
            }
            continue;
        }

        let statement = match Statement::prepare(input) {
            Ok(statement) => statement,
            Err(err) => {
                println!("{err}");
                continue;
            }
        };

        match statement.execute(table) {
            Ok(rows) => {
                for row in rows {
                    println!("{row}");
                }
                println!("Executed.");
            }
            Err(err) if err.is_fatal() => {
                return Err(err).context("Storage failure, aborting session");
            }
            Err(err) => println!("Error: {err}"),
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.debug { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let mut table = Table::open(&args.db_file)
        .with_context(|| format!("Failed to open database {}", args.db_file.display()))?;

    let outcome = run(&mut table);
    // Cached pages are not written back after a storage failure.
    if let Err(err) = &outcome {
        if err.downcast_ref::<DbError>().is_some_and(DbError::is_fatal) {
            return outcome;
        }
    }
    table.close().context("Failed to flush database on exit")?;
    outcome
}
