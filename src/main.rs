use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::{Builder, Env};
use log::{debug, info};
use memmap2::Mmap;

use rox::ast_printer::AstPrinter;
use rox::diagnostics::{Diagnostics, EXIT_USAGE};
use rox::parser::Parser;
use rox::scanner::{self, Scanner};
use rox::session::Session;

#[derive(ClapParser, Debug)]
#[command(
    version,
    about = "Rox: a Lox language interpreter",
    long_about = None,
    args_conflicts_with_subcommands = true
)]
pub struct Cli {
    #[command(subcommand)]
    commands: Option<Commands>,

    /// Script to run; starts the REPL when omitted
    script: Option<PathBuf>,

    /// Enable logging to a file
    #[arg(long, global = true)]
    log: bool,

    /// Log file written when --log is given
    #[arg(long, global = true, default_value = "app.log")]
    log_file: PathBuf,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Runs a file as a Lox program
    Run { filename: PathBuf },

    /// Tokenizes a file, printing each token
    Tokenize {
        filename: PathBuf,

        /// Print the token stream as JSON
        #[arg(long)]
        json: bool,
    },

    /// Parses a file and prints the syntax tree of every statement
    Parse {
        filename: PathBuf,

        /// Print the syntax tree as JSON
        #[arg(long)]
        json: bool,
    },

    /// Starts an interactive session
    Repl,
}

/// Reads a source file through a memory map and validates it as UTF‑8.
fn read_source(filename: &Path) -> Result<String> {
    info!("Reading file: {:?}", filename);
    let file = File::open(filename).context(format!("Failed to open file {:?}", filename))?;

    let len = file
        .metadata()
        .context(format!("Failed to stat file {:?}", filename))?
        .len();

    // Zero-length maps are rejected on some platforms, and pipes report 0.
    let bytes: Vec<u8> = if len == 0 {
        let mut buf = Vec::new();
        BufReader::new(file)
            .read_to_end(&mut buf)
            .context(format!("Failed to read file {:?}", filename))?;
        buf
    } else {
        let mmap = unsafe { Mmap::map(&file) }.context(format!("Failed to map file {:?}", filename))?;
        mmap.to_vec()
    };

    info!("Read {} bytes from {:?}", bytes.len(), filename);

    String::from_utf8(bytes).context(format!("File {:?} is not valid UTF-8", filename))
}

fn init_logger(path: &Path) -> Result<()> {
    let log_file = File::create(path).context(format!("Failed to create {:?}", path))?;

    Builder::from_env(Env::default().default_filter_or("debug"))
        .format(|buf, record| {
            let module = record.module_path().unwrap_or("<unnamed>");
            let module = module.strip_prefix("rox::").unwrap_or(module);
            writeln!(
                buf,
                "{} [{}:{}] - {}",
                Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .init();

    info!("Logger initialized, writing to {:?}", path);
    Ok(())
}

fn report(diagnostics: &Diagnostics) -> Result<()> {
    diagnostics
        .report(&mut io::stderr().lock())
        .context("Failed to write diagnostics")
}

fn exit_with(diagnostics: &Diagnostics) -> ! {
    let code = diagnostics.exit_code().unwrap_or(0);
    debug!("Exiting with code {}", code);
    let _ = io::stdout().flush();
    std::process::exit(code);
}

fn tokenize(filename: &Path, json: bool) -> Result<()> {
    let source = read_source(filename)?;
    let mut diagnostics = Diagnostics::new();

    if json {
        let tokens = scanner::tokenize(&source, &mut diagnostics);
        println!("{}", serde_json::to_string_pretty(&tokens)?);
    } else {
        let stdout = io::stdout();
        let mut out = stdout.lock();

        for token in Scanner::new(&source) {
            match token {
                Ok(token) => writeln!(out, "{}", token)?,
                Err(e) => {
                    writeln!(io::stderr(), "{}", e)?;
                    diagnostics.push(e);
                }
            }
        }
    }

    info!("Tokenize finished with {} error(s)", diagnostics.len());

    if json {
        report(&diagnostics)?;
    }
    exit_with(&diagnostics)
}

fn parse(filename: &Path, json: bool) -> Result<()> {
    let source = read_source(filename)?;
    let mut diagnostics = Diagnostics::new();

    let tokens = scanner::tokenize(&source, &mut diagnostics);
    let statements = Parser::new(tokens).parse(&mut diagnostics);

    if json {
        println!("{}", serde_json::to_string_pretty(&statements)?);
    } else {
        for stmt in &statements {
            println!("{}", AstPrinter::print_stmt(stmt));
        }
    }

    report(&diagnostics)?;
    exit_with(&diagnostics)
}

fn run(filename: &Path) -> Result<()> {
    let source = read_source(filename)?;

    let mut session = Session::new();
    let diagnostics = session.run(&source);

    report(&diagnostics)?;
    exit_with(&diagnostics)
}

fn repl() -> Result<()> {
    info!("Starting REPL");

    let mut session = Session::new();
    let stdin = io::stdin();
    let mut lines = stdin.lock();
    let mut line = String::new();

    loop {
        print!("> ");
        io::stdout().flush()?;

        line.clear();
        if lines.read_line(&mut line).context("Failed to read from stdin")? == 0 {
            println!();
            break;
        }

        let outcome = session.run_repl_line(&line);
        if let Some(value) = outcome.value {
            println!("{}", value);
        }
        report(&outcome.diagnostics)?;
    }

    info!("REPL finished");
    Ok(())
}

fn main() -> Result<()> {
    let args: Cli = match Cli::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let code = if e.use_stderr() { EXIT_USAGE } else { 0 };
            let _ = e.print();
            std::process::exit(code);
        }
    };

    // Initialize logger only if --log flag is provided
    if args.log {
        init_logger(&args.log_file)?;
    } else {
        Builder::from_env(Env::default().default_filter_or("off")).init();
    }

    info!("CLI arguments: {:?}", args);

    match (args.commands, args.script) {
        (Some(Commands::Run { filename }), _) | (None, Some(filename)) => run(&filename),
        (Some(Commands::Tokenize { filename, json }), _) => tokenize(&filename, json),
        (Some(Commands::Parse { filename, json }), _) => parse(&filename, json),
        (Some(Commands::Repl), _) | (None, None) => repl(),
    }
}
