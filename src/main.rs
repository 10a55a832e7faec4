use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};

use demon_interpreter as demon;

use demon::ast_printer::AstPrinter;
use demon::scanner::Scanner;
use demon::session::{parse_source, ConsoleReporter, RunStatus, Session};

#[derive(ClapParser, Debug)]
#[command(version, about = "Demon language interpreter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Commands,

    /// Enable logging to app.log
    #[arg(long, global = true)]
    log: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes input from a file, printing each token
    Tokenize { filename: PathBuf },

    /// Parses a program and prints its AST
    Parse {
        filename: PathBuf,

        /// Dump the AST as JSON instead of the prefix form
        #[arg(long)]
        json: bool,
    },

    /// Runs input from a file as a Demon program
    Run { filename: PathBuf },

    /// Starts an interactive session
    Repl,
}

/// Reads the contents of a file into a String
fn read_file(filename: &PathBuf) -> Result<String> {
    info!("Reading file: {:?}", filename);

    let file = File::open(filename).context(format!("Failed to open file {:?}", filename))?;
    let mut reader = BufReader::new(file);
    let mut buf = String::new();

    let bytes = reader
        .read_to_string(&mut buf)
        .context(format!("Failed to read file {:?}", filename))?;

    info!("Read {} bytes from {:?}", bytes, filename);

    Ok(buf)
}

fn init_logger() -> Result<()> {
    let log_file = File::create("app.log").context("Failed to create app.log")?;

    Builder::new()
        .format(|buf, record| {
            // Strip 'demon_interpreter::' from module path
            let module = record
                .module_path()
                .unwrap_or("<unnamed>")
                .strip_prefix("demon_interpreter::")
                .unwrap_or(record.module_path().unwrap_or("<unnamed>"));
            writeln!(
                buf,
                "[{}:{}] - {}",
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug)
        .init();

    info!("Logger initialized, writing to app.log");
    Ok(())
}

fn tokenize(filename: &PathBuf) -> Result<()> {
    info!("Running Tokenize subcommand");

    let source = read_file(filename)?;
    let mut tokenized = true;

    for token in Scanner::new(&source) {
        match token {
            Ok(token) => {
                debug!("Scanned token: {}", token);
                println!("{}", token);
            }

            Err(e) => {
                tokenized = false;
                debug!("Tokenization debug: {}", e);
                eprintln!("{}", e);
            }
        }
    }

    if !tokenized {
        debug!("Tokenization failed, exiting with code 65");
        std::process::exit(65);
    }

    info!("Tokenization completed successfully");
    Ok(())
}

fn parse(filename: &PathBuf, json: bool) -> Result<()> {
    info!("Running Parse subcommand");

    let source = read_file(filename)?;
    let mut reporter = ConsoleReporter::new();
    let (statements, had_error) = parse_source(&source, &mut reporter);

    if had_error {
        debug!("Parse failed, exiting with code 65");
        std::process::exit(65);
    }

    if json {
        let dump =
            serde_json::to_string_pretty(&statements).context("Failed to serialize the AST")?;
        println!("{}", dump);
    } else {
        for stmt in &statements {
            println!("{}", AstPrinter::print_stmt(stmt));
        }
    }

    info!("Parse subcommand completed");
    Ok(())
}

fn run(filename: &PathBuf) -> Result<()> {
    info!("Running Run subcommand");

    let source = read_file(filename)?;
    info!("Provided input:\n {}", source);

    let mut session = Session::new();
    let mut reporter = ConsoleReporter::new();

    let status = session.run(&source, &mut reporter);
    io::stdout().flush().context("Failed to flush stdout")?;

    if status != RunStatus::Ok {
        debug!("Run finished with {:?}", status);
        std::process::exit(status.exit_code());
    }

    info!("Program executed successfully");
    Ok(())
}

fn repl() -> Result<()> {
    info!("Starting REPL");

    let mut session = Session::new();
    let mut reporter = ConsoleReporter::new();
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("> ");
        io::stdout().flush().context("Failed to flush stdout")?;

        let Some(line) = lines.next() else {
            println!();
            break;
        };
        let line = line.context("Failed to read from stdin")?;

        let status = session.run(&line, &mut reporter);
        debug!("REPL line finished with {:?}", status);
    }

    info!("REPL finished");
    Ok(())
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    // Initialize logger only if --log flag is provided
    if args.log {
        init_logger()?;
    } else {
        // Initialize a minimal logger to avoid "no logger" errors
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    info!("CLI arguments: {:?}", args);

    let result = match &args.commands {
        Commands::Tokenize { filename } => tokenize(filename),
        Commands::Parse { filename, json } => parse(filename, *json),
        Commands::Run { filename } => run(filename),
        Commands::Repl => repl(),
    };

    if let Err(e) = result {
        eprintln!("{:#}", e);
        std::process::exit(74);
    }

    Ok(())
}
