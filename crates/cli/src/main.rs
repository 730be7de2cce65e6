// # -----------------------------
// # crates/cli/src/main.rs
// # -----------------------------
use anyhow::{Context, Result};
use clap::{ArgGroup, Parser};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::{fmt, EnvFilter};

use jour_common::errors::{EXIT_OK, EXIT_RUNTIME, EXIT_USAGE};
use jour_common::{JourConfig, JourError, JournalStore, NewEntry, Operation, Outcome};

/// Prefix of every journal line printed to stdout.
const INDENT: &str = "  ";

#[derive(Parser, Debug)]
#[command(
    name = "jw",
    version,
    about = "Journal writer - numbered, timestamped, append-mostly journal",
    long_about = None
)]
#[command(group(
    ArgGroup::new("operation")
        .args(["print", "save", "append", "remove", "tag", "return_tag", "save_and_tag"])
        .multiple(false)
))]
struct Cli {
    /// Print the last lines of the journal (default)
    #[arg(short = 'p', long = "print", short_alias = 'e', alias = "echo")]
    print: bool,

    /// Write a new line
    #[arg(short = 's', long = "save", num_args = 1.., value_name = "MSG")]
    save: Option<Vec<String>>,

    /// Append text to the last line
    #[arg(short = 'a', long = "append", num_args = 1.., value_name = "MSG")]
    append: Option<Vec<String>>,

    /// Remove the last line
    #[arg(short = 'r', long = "remove")]
    remove: bool,

    /// Tag the last line with the next free TAG<n>
    #[arg(short = 't', long = "tag", value_name = "TAG")]
    tag: Option<String>,

    /// Print the next free TAG<n> without writing anything
    #[arg(long = "rt", alias = "return-tag", value_name = "TAG")]
    return_tag: Option<String>,

    /// Write a new line and tag it in one go: TAG MSG...
    #[arg(
        long = "st",
        alias = "save-and-tag",
        num_args = 2..,
        value_names = ["TAG", "MSG"]
    )]
    save_and_tag: Option<Vec<String>>,

    /// Wrap the content in backticks (shell command)
    #[arg(short = 'c', long = "command")]
    command: bool,

    /// Signature for new lines (defaults to $JOUR_SIGNATURE, then $USER)
    #[arg(long = "signature", value_name = "TEXT")]
    signature: Option<String>,

    /// Use this journal file instead of the configured one; it must exist
    #[arg(long = "cj", alias = "custom-journal", value_name = "PATH")]
    custom_journal: Option<PathBuf>,

    /// Create the primary journal when missing instead of using the emergency one
    #[arg(long = "create")]
    create: bool,

    /// Configuration file (TOML)
    #[arg(long = "config", value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error, off). Overrides RUST_LOG if set.
    #[arg(long = "log-level", value_name = "LEVEL")]
    log_level: Option<String>,
}

impl Cli {
    fn operation(&self) -> Operation {
        if let Some(words) = &self.save {
            return Operation::Write(self.entry(words));
        }
        if let Some(words) = &self.append {
            return Operation::Append {
                content: words.join(" "),
                as_command: self.command,
            };
        }
        if self.remove {
            return Operation::Remove;
        }
        if let Some(tag_name) = &self.tag {
            return Operation::Tag {
                tag_name: tag_name.clone(),
            };
        }
        if let Some(tag_name) = &self.return_tag {
            return Operation::ReturnTag {
                tag_name: tag_name.clone(),
            };
        }
        let save_and_tag = self.save_and_tag.as_deref().and_then(<[_]>::split_first);
        if let Some((tag_name, words)) = save_and_tag {
            return Operation::SaveAndTag {
                tag_name: tag_name.clone(),
                entry: self.entry(words),
            };
        }
        Operation::Print
    }

    fn entry(&self, words: &[String]) -> NewEntry {
        NewEntry::new(words.join(" "))
            .with_signature(self.signature.clone())
            .as_command(self.command)
    }
}

/// Initialize logging based on CLI arguments and environment
fn init_logging(log_level: Option<&str>) -> Result<()> {
    // CLI arg overrides RUST_LOG
    let filter = match log_level {
        Some(level) => match level.to_lowercase().as_str() {
            "off" => EnvFilter::new("off"),
            "error" => EnvFilter::new("error"),
            "warn" | "warning" => EnvFilter::new("warn"),
            "info" => EnvFilter::new("info"),
            "debug" => EnvFilter::new("debug"),
            "trace" => EnvFilter::new("trace"),
            _ => {
                eprintln!("Warning: Invalid log level '{}', using 'warn'", level);
                EnvFilter::new("warn")
            }
        },
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };

    // stdout carries journal output only
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(std::io::stderr().is_terminal())
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!(e))
        .context("initialize logging")
}

fn load_config(cli: &Cli) -> Result<JourConfig, JourError> {
    let mut config = JourConfig::load(cli.config.as_deref())?;
    if let Some(path) = &cli.custom_journal {
        config.custom_journal = Some(path.clone());
    }
    if cli.create {
        config.create_journal = true;
    }
    if let Some(signature) = &cli.signature {
        config.signature = Some(signature.clone());
    }
    Ok(config)
}

fn run(cli: &Cli) -> Result<(), JourError> {
    let config = load_config(cli)?;
    tracing::debug!("configuration: {:?}", config);

    let store = JournalStore::from_config(&config)?;
    let report = store.run(cli.operation())?;
    tracing::debug!("journal in use: {}", report.journal.path.display());

    match report.outcome {
        Outcome::Printed(lines) => {
            for line in lines {
                println!("{INDENT}{line}");
            }
        }
        Outcome::Empty => {}
        Outcome::Line(line) | Outcome::Removed(line) => println!("{INDENT}{line}"),
        Outcome::NextTag(tag) => println!("{tag}"),
    }
    Ok(())
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let code = if err.use_stderr() { EXIT_USAGE } else { EXIT_OK };
            let _ = err.print();
            process::exit(code);
        }
    };

    if let Err(err) = init_logging(cli.log_level.as_deref()) {
        eprintln!("[RUNTIME ERROR] {err:#}");
        process::exit(EXIT_RUNTIME);
    }
    tracing::debug!("CLI arguments: {:?}", cli);

    let code = match run(&cli) {
        Ok(()) => EXIT_OK,
        Err(err) => {
            tracing::debug!("{} failed: {}", cli.operation().name(), err.error_code());
            eprintln!("[{}] {}", err.label(), err);
            err.exit_code()
        }
    };
    process::exit(code);
}
