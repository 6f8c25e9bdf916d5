use std::fs::File;
use std::io::{self, Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};
use memmap2::Mmap;

use sprig::ast_printer::AstPrinter;
use sprig::lexer::Lexer;
use sprig::observer::LogObserver;
use sprig::{parse, Environment, Interpreter, Object};

#[derive(ClapParser, Debug)]
#[command(version, about = "sprig language interpreter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Commands,

    /// Enable logging to sprig.log
    #[arg(long, global = true)]
    log: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes a file (or stdin), printing each token
    Tokenize {
        filename: Option<PathBuf>,

        /// Print the token list as JSON
        #[arg(long)]
        json: bool,
    },

    /// Parses a file (or stdin) and prints every statement's AST
    Parse { filename: Option<PathBuf> },

    /// Runs a file (or stdin) as a sprig program
    Run {
        filename: Option<PathBuf>,

        /// Log every evaluation step and call through the logger
        #[arg(long)]
        trace: bool,
    },
}

/// Source text of `filename`, or of stdin when no file is given.
fn read_source(filename: Option<PathBuf>) -> Result<String> {
    let Some(filename) = filename else {
        info!("Reading program from stdin");

        let mut source = String::new();
        io::stdin()
            .read_to_string(&mut source)
            .context("Failed to read stdin")?;

        return Ok(source);
    };

    info!("Reading file: {:?}", filename);

    let file = File::open(&filename).context(format!("Failed to open file {:?}", filename))?;

    let len = file
        .metadata()
        .context(format!("Failed to stat file {:?}", filename))?
        .len();

    // Mapping an empty file fails on some platforms.
    if len == 0 {
        return Ok(String::new());
    }

    // SAFETY: the map is read-only and copied into an owned string before
    // anything else can observe it.
    let map = unsafe { Mmap::map(&file) }.context(format!("Failed to map file {:?}", filename))?;

    let source = std::str::from_utf8(&map)
        .context(format!("File {:?} is not valid UTF-8", filename))?
        .to_owned();

    info!("Read {} bytes from {:?}", source.len(), filename);

    Ok(source)
}

fn init_logger() -> Result<()> {
    let log_file = File::create("sprig.log").context("Failed to create sprig.log")?;

    Builder::new()
        .format(|buf, record| {
            let module = record
                .module_path()
                .unwrap_or("<unnamed>")
                .strip_prefix("sprig::")
                .unwrap_or(record.module_path().unwrap_or("<unnamed>"));
            writeln!(
                buf,
                "{} [{}:{}] - {}",
                chrono::Local::now().format("%H:%M:%S%.3f"),
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug) // Default to Debug, override with RUST_LOG
        .parse_default_env()
        .init();

    info!("Logger initialized, writing to sprig.log");
    Ok(())
}

fn tokenize(source: &str, json: bool) -> Result<()> {
    let mut tokens = Vec::new();

    for token in Lexer::new(source) {
        match token {
            Ok(token) => {
                debug!("Scanned token: {}", token);
                tokens.push(token);
            }

            Err(e) => {
                debug!("Tokenization failed: {}", e);
                eprintln!("{}", e);
                std::process::exit(65);
            }
        }
    }

    if json {
        let rendered = serde_json::to_string_pretty(&tokens).context("Failed to serialize tokens")?;
        println!("{}", rendered);
    } else {
        for token in &tokens {
            println!("{}", token);
        }
    }

    info!("Tokenization completed with {} tokens", tokens.len());

    Ok(())
}

fn parse_source(source: &str) -> sprig::ParseOutput {
    match parse(source) {
        Ok(output) if output.errors.is_empty() => output,

        Ok(output) => {
            for e in &output.errors {
                debug!("Parse error: {}", e);
                eprintln!("{}", e);
            }
            std::process::exit(65);
        }

        Err(e) => {
            debug!("Tokenization failed: {}", e);
            eprintln!("{}", e);
            std::process::exit(65);
        }
    }
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    if args.log {
        init_logger()?;
    } else {
        // A logger filtered to Off avoids "no logger" noise.
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    info!("CLI arguments: {:?}", args);

    match args.commands {
        Commands::Tokenize { filename, json } => {
            info!("Running Tokenize subcommand");
            let source = read_source(filename)?;
            tokenize(&source, json)?;
        }

        Commands::Parse { filename } => {
            info!("Running Parse subcommand");
            let source = read_source(filename)?;
            let output = parse_source(&source);

            for statement in &output.program.statements {
                println!("{}", AstPrinter::statement(statement));
            }

            info!("Parse subcommand completed");
        }

        Commands::Run { filename, trace } => {
            info!("Running Run subcommand");
            let source = read_source(filename)?;
            let output = parse_source(&source);

            let mut interpreter = Interpreter::new().with_source(&source);
            if trace {
                interpreter = interpreter.with_observer(Box::new(LogObserver::default()));
            }

            let env = Environment::new();

            match interpreter.evaluate(&output.program, &env) {
                Object::Error(err) => {
                    debug!("Runtime error: {}", err.message);
                    eprintln!("{}", err);
                    std::process::exit(70);
                }

                Object::Null => {}

                value => println!("{}", value),
            }

            info!("Program executed successfully");
        }
    }

    Ok(())
}
