use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};

use wagago::ast_printer::AstPrinter;
use wagago::session::{self, RunOutcome, Session};

/// sysexits: input data incorrect (scan, parse or resolve errors).
const EXIT_DATA_ERR: i32 = 65;
/// sysexits: internal software error (uncaught runtime fault).
const EXIT_SOFTWARE: i32 = 70;
/// sysexits: input/output error.
const EXIT_IO_ERR: i32 = 74;

/// Every Wagago call nests several host frames, so deep recursion needs
/// more than the default main-thread stack.
const INTERPRETER_STACK_SIZE: usize = 64 * 1024 * 1024;

#[derive(ClapParser, Debug)]
#[command(version, about = "Wagago language interpreter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Commands,

    /// Enable logging to the log file
    #[arg(long, global = true)]
    log: bool,

    /// Where `--log` writes to
    #[arg(long, global = true, env = "WAGAGO_LOG_FILE", default_value = "app.log")]
    log_file: PathBuf,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes input from a file, printing each token
    Tokenize {
        filename: PathBuf,

        /// Print one JSON object per token instead of `KIND lexeme literal`
        #[arg(long)]
        json: bool,
    },

    /// Parses input from a file and prints its AST
    Parse { filename: PathBuf },

    /// Runs a Wagago script, or starts a REPL when no file is given
    Run { filename: Option<PathBuf> },
}

/// Reads the whole file as UTF‑8 text.
fn read_source(filename: &Path) -> Result<String> {
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

/// Like [`read_source`], but an unreadable file ends the process with the
/// I/O exit status.
fn read_source_or_exit(filename: &Path) -> String {
    match read_source(filename) {
        Ok(source) => source,
        Err(e) => {
            debug!("Read failure: {:#}", e);
            eprintln!("{:#}", e);
            std::process::exit(EXIT_IO_ERR);
        }
    }
}

fn init_logger(path: &Path) -> Result<()> {
    // Create or open the log file
    let log_file = File::create(path).context(format!("Failed to create {:?}", path))?;

    Builder::new()
        .format(|buf, record| {
            let module = record.module_path().unwrap_or("<unnamed>");
            let module = module.strip_prefix("wagago::").unwrap_or(module);
            writeln!(
                buf,
                "[{}:{}] - {}",
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug) // Default to Debug, override with RUST_LOG
        .parse_env("RUST_LOG")
        .init();

    info!("Logger initialized, writing to {:?}", path);
    Ok(())
}

fn report(outcome: &RunOutcome) {
    for diagnostic in outcome.diagnostics() {
        eprintln!("{}", diagnostic);
    }
}

fn run_file(filename: &Path) -> i32 {
    info!("Running Run subcommand");
    let source = read_source_or_exit(filename);

    let mut session = Session::new();
    let outcome = session.run(&source);
    report(&outcome);

    if outcome.is_ok() {
        info!("Program executed successfully");
        return 0;
    }

    if session.had_error() {
        debug!("Static errors, exiting with code {}", EXIT_DATA_ERR);
        EXIT_DATA_ERR
    } else {
        debug!("Runtime fault, exiting with code {}", EXIT_SOFTWARE);
        EXIT_SOFTWARE
    }
}

/// One line per `run`; globals persist, errors never end the loop.
fn run_prompt() -> Result<()> {
    info!("Starting REPL");

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    let mut session = Session::new();

    loop {
        print!("> ");
        io::stdout().flush().context("Failed to flush prompt")?;

        let Some(line) = lines.next() else {
            println!();
            break;
        };
        let line = line.context("Failed to read from stdin")?;

        let outcome = session.run(&line);
        report(&outcome);
        session.reset_errors();
    }

    info!("REPL finished");
    Ok(())
}

fn main() -> Result<()> {
    let worker = std::thread::Builder::new()
        .name("wagago".into())
        .stack_size(INTERPRETER_STACK_SIZE)
        .spawn(run_cli)
        .context("Failed to spawn interpreter thread")?;

    match worker.join() {
        Ok(result) => result,
        Err(_) => anyhow::bail!("Interpreter thread panicked"),
    }
}

fn run_cli() -> Result<()> {
    let args: Cli = Cli::parse();

    // Initialize logger only if --log flag is provided
    if args.log {
        init_logger(&args.log_file)?;
    } else {
        // Initialize a minimal logger to avoid "no logger" errors
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    info!("CLI arguments: {:?}", args);

    match args.commands {
        Commands::Tokenize { filename, json } => {
            info!("Running Tokenize subcommand");
            let source = read_source_or_exit(&filename);
            let (tokens, errors) = session::tokenize(&source);

            for error in &errors {
                eprintln!("{}", error);
            }

            for token in &tokens {
                if json {
                    println!("{}", serde_json::to_string(token)?);
                } else {
                    println!("{}", token);
                }
            }

            if !errors.is_empty() {
                debug!("Tokenization failed, exiting with code {}", EXIT_DATA_ERR);
                std::process::exit(EXIT_DATA_ERR);
            }

            info!("Tokenization completed successfully");
        }

        Commands::Parse { filename } => {
            info!("Running Parse subcommand");
            let source = read_source_or_exit(&filename);

            match session::parse(&source) {
                Ok(statements) => {
                    let ast_str = AstPrinter::print_program(&statements);
                    debug!("AST: {}", ast_str);
                    println!("{}", ast_str);
                }

                Err(errors) => {
                    for error in &errors {
                        eprintln!("{}", error);
                    }
                    std::process::exit(EXIT_DATA_ERR);
                }
            }

            info!("Parse subcommand completed");
        }

        Commands::Run { filename } => match filename {
            Some(filename) => {
                let code = run_file(&filename);
                if code != 0 {
                    std::process::exit(code);
                }
            }
            None => run_prompt()?,
        },
    }

    Ok(())
}
