use std::{
    fs,
    io::{self, Read, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use displaytools::{
    CellRunner, DisplayTools,
    config::{Config, PartialConfig},
    display::{MimeBundle, TextPublisher},
    rewriter::LineReport,
    tokenizer::tokenize_strict,
};
use log::LevelFilter;

#[derive(Debug, Parser)]
#[command(name = "displaytools", version, about)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Config file to use instead of ./displaytools.toml
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    /// Text published between consecutive displays
    #[arg(long, global = true)]
    delimiter: Option<String>,

    /// Width that `show` wraps labeled array representations to
    #[arg(long, global = true)]
    line_width: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the rewritten cell
    Rewrite {
        /// Input file, stdin when omitted
        path: Option<PathBuf>,

        /// Exit with an error instead of echoing the unchanged cell
        #[arg(long)]
        strict: bool,
    },
    /// Print the tokens of a cell
    Tokens {
        /// Input file, stdin when omitted
        path: Option<PathBuf>,
    },
    /// Print the logical lines of a cell with their segments
    Lines {
        /// Input file, stdin when omitted
        path: Option<PathBuf>,
    },
    /// Print a value's text representation as a labeled display shows it
    Show {
        /// Label put in front of the value
        label: String,

        /// File holding the representation, stdin when omitted
        path: Option<PathBuf>,
    },
}

/// Runs a cell by writing it out
struct EchoRunner<W> {
    out: W,
}

impl<W: Write> CellRunner for EchoRunner<W> {
    type Outcome = io::Result<()>;

    fn run_cell(&mut self, cell: &str) -> io::Result<()> {
        self.out.write_all(cell.as_bytes())?;
        self.out.flush()
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let strict = matches!(cli.command, Command::Rewrite { strict: true, .. });
    let overrides = PartialConfig {
        delimiter: cli.delimiter.clone(),
        line_width: cli.line_width,
        strict: strict.then_some(true),
        ..PartialConfig::default()
    };
    let config = Config::load(cli.config.as_deref(), &overrides)?;

    match &cli.command {
        Command::Rewrite { path, .. } => run_rewrite(&config, &read_input(path.as_deref())?),
        Command::Tokens { path } => run_tokens(&read_input(path.as_deref())?),
        Command::Lines { path } => run_lines(&config, &read_input(path.as_deref())?),
        Command::Show { label, path } => run_show(&config, label, &read_input(path.as_deref())?),
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .init();
}

fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display())),
        None => {
            let mut input = String::new();
            io::stdin()
                .read_to_string(&mut input)
                .context("Failed to read stdin")?;
            Ok(input)
        }
    }
}

fn run_rewrite(config: &Config, cell: &str) -> Result<()> {
    if config.strict {
        let rewritten = config.rewriter().rewrite(cell)?;
        let mut stdout = io::stdout().lock();
        stdout.write_all(rewritten.as_bytes())?;
        return Ok(stdout.flush()?);
    }

    let runner = EchoRunner {
        out: io::stdout().lock(),
    };
    let mut tools = DisplayTools::with_rewriter(runner, config.rewriter());
    tools.run_cell(cell).context("Failed to write cell")
}

fn run_show(config: &Config, label: &str, repr: &str) -> Result<()> {
    let bundle = MimeBundle::plain(repr.trim_end_matches(['\r', '\n']));
    let mut publisher = TextPublisher::new(io::stdout().lock());
    config
        .custom_display(&mut publisher, label, &bundle)
        .context("Failed to write display")
}

fn run_tokens(cell: &str) -> Result<()> {
    let tokens = tokenize_strict(cell)?;
    let mut stdout = io::stdout().lock();
    for token in &tokens {
        writeln!(
            stdout,
            "{:<8} {:<8} {:<10} {:?}",
            token.start.to_string(),
            token.end.to_string(),
            token.kind.to_string(),
            token.text
        )?;
    }
    Ok(())
}

fn run_lines(config: &Config, cell: &str) -> Result<()> {
    let reports = config.rewriter().analyze(cell);
    let mut stdout = io::stdout().lock();
    for (index, report) in reports.iter().enumerate() {
        write_report(&mut stdout, index, report)?;
    }
    Ok(())
}

fn write_report(out: &mut impl Write, index: usize, report: &LineReport) -> io::Result<()> {
    let LineReport {
        line,
        segments,
        flags,
    } = report;

    writeln!(
        out,
        "[{index}] lines {}-{} {:?}",
        line.start_line + 1,
        line.end_line + 1,
        line.text
    )?;
    writeln!(
        out,
        "    indent={:?} target={:?} rhs={:?} comment={:?}",
        segments.indent, segments.lhs.target_text, segments.rhs, segments.comment
    )?;
    writeln!(
        out,
        "    marker={} assignment={:?} comment-only={} multi-match={:?}",
        flags
            .marker
            .map_or_else(|| "-".to_owned(), |marker| marker.to_string()),
        flags.is_assignment,
        flags.is_comment_only_line,
        flags.multi_match
    )?;
    if let Some(error) = segments
        .indentation_error
        .as_ref()
        .or(segments.lhs.extraction_error.as_ref())
    {
        writeln!(out, "    deferred error: {error}")?;
    }
    Ok(())
}
