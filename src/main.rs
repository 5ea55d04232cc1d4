use std::fs::File;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};
use memmap2::Mmap;

use rlox::ast_printer::AstPrinter;
use rlox::error::{Diagnostics, RunError};
use rlox::interpreter::Interpreter;
use rlox::scanner::Scanner;
use rlox::value::Value;

#[derive(ClapParser, Debug)]
#[command(version, about = "Lox language interpreter", long_about = None)]
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
    Tokenize {
        filename: PathBuf,

        /// Print one JSON object per token instead of `KIND lexeme literal`
        #[arg(long)]
        json: bool,
    },

    /// Parses input from a file as a single expression and prints its AST
    Parse { filename: PathBuf },

    /// Evaluates input from a file as a single expression and prints the result
    Evaluate { filename: PathBuf },

    /// Runs input from a file as a Lox program
    Run { filename: PathBuf },

    /// Starts an interactive prompt
    Repl,
}

/// Source text backing a run: a read-only mapping of the file, or nothing for
/// an empty file (zero-length files cannot be mapped).
struct SourceFile {
    map: Option<Mmap>,
}

impl SourceFile {
    fn open(filename: &Path) -> Result<Self> {
        info!("Reading file: {:?}", filename);

        let file: File =
            File::open(filename).context(format!("Failed to open file {:?}", filename))?;
        let len: u64 = file
            .metadata()
            .context(format!("Failed to stat file {:?}", filename))?
            .len();

        if len == 0 {
            info!("File {:?} is empty", filename);
            return Ok(Self { map: None });
        }

        // SAFETY: the mapping is read-only and lives only as long as this
        // run; the interpreter never writes to its source.
        let map: Mmap = unsafe { Mmap::map(&file) }
            .context(format!("Failed to map file {:?}", filename))?;

        info!("Mapped {} bytes from {:?}", map.len(), filename);

        Ok(Self { map: Some(map) })
    }

    fn text(&self) -> Result<&str> {
        match &self.map {
            Some(map) => rlox::source_text(map).context("Source is not valid UTF-8"),
            None => Ok(""),
        }
    }
}

fn init_logger() -> Result<()> {
    // Create or open the log file
    let log_file: File = File::create("app.log").context("Failed to create app.log")?;

    Builder::new()
        .format(|buf, record| {
            // Strip 'rlox::' from module path
            let module: &str = record.module_path().unwrap_or("<unnamed>");
            let module: &str = module.strip_prefix("rlox::").unwrap_or(module);

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
        .init();

    info!("Logger initialized, writing to app.log");
    Ok(())
}

/// Prints a failed run to stderr and exits with its conventional status.
fn fail(error: RunError) -> ! {
    debug!("Run failed: {:?}", error);

    eprintln!("{}", error);

    std::process::exit(error.exit_code());
}

fn tokenize(source: &str, json: bool) -> Result<()> {
    let mut stdout = io::stdout().lock();
    let mut diagnostics: Diagnostics = Diagnostics::new();

    for token in Scanner::new(source) {
        match token {
            Ok(token) => {
                debug!("Scanned token: {}", token);

                if json {
                    serde_json::to_writer(&mut stdout, &token)
                        .context("Failed to serialize token")?;
                    writeln!(stdout)?;
                } else {
                    writeln!(stdout, "{}", token)?;
                }
            }

            Err(e) => {
                debug!("Tokenization debug: {}", e);

                eprintln!("{}", e);
                diagnostics.report(e);
            }
        }
    }

    stdout.flush()?;

    if diagnostics.had_error() {
        debug!("Tokenization failed, exiting with code 65");

        std::process::exit(65);
    }

    info!("Tokenization completed successfully");
    Ok(())
}

/// Reads lines from stdin and runs each against one long-lived interpreter.
/// Errors are reported and the session carries on.
fn repl() -> Result<()> {
    info!("Starting REPL");

    let mut interpreter: Interpreter<'static> = Interpreter::new();
    let stdin = io::stdin();
    let mut input = stdin.lock();

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line: String = String::new();
        let nchar: usize = input
            .read_line(&mut line)
            .context("Could not read line")?;

        if nchar == 0 {
            info!("End of input, leaving REPL");
            println!();
            break;
        }

        if line.trim().is_empty() {
            continue;
        }

        // Rejected lines are reported and dropped; only a line that will
        // actually run has to stay alive.
        if let Err(e) = rlox::check(&line) {
            eprintln!("{}", e);
            continue;
        }

        // Functions and classes defined on this line keep borrowing it after
        // the line is done.
        let line: &'static str = Box::leak(line.into_boxed_str());

        match rlox::run(&mut interpreter, line) {
            Ok(Value::Nil) => {}
            Ok(value) => println!("{}", value),
            Err(e) => eprintln!("{}", e),
        }
    }

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

    match args.commands {
        Commands::Tokenize { filename, json } => {
            info!("Running Tokenize subcommand");

            let file: SourceFile = SourceFile::open(&filename)?;
            tokenize(file.text()?, json)?;
        }

        Commands::Parse { filename } => {
            info!("Running Parse subcommand");

            let file: SourceFile = SourceFile::open(&filename)?;

            match rlox::parse_expression(file.text()?) {
                Ok(expr) => {
                    let ast_str: String = AstPrinter::print(&expr);

                    debug!("AST: {}", ast_str);
                    println!("{}", ast_str);
                }

                Err(e) => fail(e),
            }

            info!("Parse subcommand completed");
        }

        Commands::Evaluate { filename } => {
            info!("Running Evaluate subcommand");

            let file: SourceFile = SourceFile::open(&filename)?;
            let source: &str = file.text()?;
            let mut interpreter: Interpreter = Interpreter::new();

            match rlox::evaluate(&mut interpreter, source) {
                Ok(value) => {
                    debug!("Evaluated to: {}", value);
                    println!("{}", value);
                }

                Err(e) => fail(e),
            }

            info!("Evaluate subcommand completed");
        }

        Commands::Run { filename } => {
            info!("Running Run subcommand");

            let file: SourceFile = SourceFile::open(&filename)?;
            let source: &str = file.text()?;

            info!("Provided input:\n {}", source);

            let mut interpreter: Interpreter = Interpreter::new();

            if let Err(e) = rlox::run(&mut interpreter, source) {
                fail(e);
            }

            info!("Program executed successfully");
        }

        Commands::Repl => repl()?,
    }

    Ok(())
}
