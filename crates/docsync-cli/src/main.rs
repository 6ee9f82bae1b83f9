//! docsync command line
//!
//! Normalizes markdown documents, shows their block representation and
//! prints the effective sync configuration.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use docsync_core::markdown::{self, render_front_matter, split_front_matter};
use docsync_core::store::wire::to_wire;
use docsync_core::SyncConfig;

#[derive(Parser, Debug)]
#[command(name = "docsync")]
#[command(about = "Normalize markdown and inspect its block representation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Config file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the canonical form of a markdown file
    Fmt {
        file: PathBuf,

        /// Exit with an error if the file is not already canonical
        #[arg(long, conflicts_with = "write")]
        check: bool,

        /// Rewrite the file in place
        #[arg(short, long)]
        write: bool,
    },

    /// Print the block tree of a markdown file as JSON
    Blocks {
        file: PathBuf,

        /// Emit the remote store's block objects instead of the internal model
        #[arg(long)]
        wire: bool,
    },

    /// Print the effective sync configuration
    Config,
}

fn main() -> ExitCode {
    init_logging();

    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Command::Fmt { file, check, write } => {
            let original = read(&file)?;
            let formatted = format_document(&original)?;

            if check {
                if formatted == original {
                    return Ok(ExitCode::SUCCESS);
                }
                info!(file = %file.display(), "File is not formatted");
                return Ok(ExitCode::FAILURE);
            }

            if write {
                if formatted != original {
                    std::fs::write(&file, &formatted)
                        .with_context(|| format!("Failed to write {}", file.display()))?;
                    info!(file = %file.display(), "Formatted");
                } else {
                    debug!(file = %file.display(), "Already formatted");
                }
            } else {
                print!("{}", formatted);
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Blocks { file, wire } => {
            let content = read(&file)?;
            println!("{}", blocks_json(&content, wire)?);
            Ok(ExitCode::SUCCESS)
        }
        Command::Config => {
            let config = SyncConfig::load_or_default(cli.config.as_deref())
                .context("Failed to load sync configuration")?;
            print!("{}", config.to_toml_string()?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// Canonical form of a whole file, leading comments and front matter included
fn format_document(content: &str) -> Result<String> {
    let (front_matter, body) =
        split_front_matter(content).context("Failed to parse front matter")?;
    let body = markdown::format(&body);
    Ok(render_front_matter(&front_matter, &body)?)
}

fn blocks_json(content: &str, wire: bool) -> Result<String> {
    let (_, body) = split_front_matter(content).context("Failed to parse front matter")?;
    let blocks = markdown::parse(&body);
    debug!(count = blocks.len(), "Parsed top-level blocks");

    let json = if wire {
        let objects: Vec<_> = blocks.iter().map(to_wire).collect();
        serde_json::to_string_pretty(&objects)?
    } else {
        serde_json::to_string_pretty(&blocks)?
    };
    Ok(json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_document_keeps_front_matter() {
        let input = "---\nstatus: draft\n---\n\n\n# Title\ntext\n- a\n    - b\n";
        let out = format_document(input).unwrap();
        assert_eq!(out, "---\nstatus: draft\n---\n\n# Title\n\ntext\n- a\n  - b\n");
        assert_eq!(format_document(&out).unwrap(), out);
    }

    #[test]
    fn test_format_document_keeps_leading_comments() {
        let input = "<!--\nFRONT MATTER - allowed values\nstatus: Draft | Review\n-->\n---\nstatus: draft\n---\n\n# T\n";
        assert_eq!(format_document(input).unwrap(), input);

        let bare = "<!-- keep me -->\n# T\n";
        assert_eq!(format_document(bare).unwrap(), bare);
    }

    #[test]
    fn test_format_document_without_front_matter() {
        assert_eq!(format_document("# A\n\n\n\nb").unwrap(), "# A\n\nb\n");
    }

    #[test]
    fn test_blocks_json_shapes() {
        let json = blocks_json("- [x] done", false).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["type"], "todo");
        assert_eq!(value[0]["checked"], true);

        let json = blocks_json("## Sub", true).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["type"], "heading_2");
    }

    #[test]
    fn test_fmt_write_rewrites_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.md");
        std::fs::write(&path, "# T\ntext").unwrap();

        let cli = Cli::parse_from(["docsync", "fmt", "--write", path.to_str().unwrap()]);
        assert_eq!(run(cli).unwrap(), ExitCode::SUCCESS);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# T\n\ntext\n");

        let cli = Cli::parse_from(["docsync", "fmt", "--check", path.to_str().unwrap()]);
        assert_eq!(run(cli).unwrap(), ExitCode::SUCCESS);
    }

    #[test]
    fn test_config_file_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "policy = \"lenient\"\n").unwrap();

        let cli = Cli::parse_from(["docsync", "config", "--config", path.to_str().unwrap()]);
        assert_eq!(run(cli).unwrap(), ExitCode::SUCCESS);
    }
}
