//! pdfdoc CLI - PDF document inspection tool

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use pdfdoc::{Document, LoadOptions, Outline};

#[derive(Parser)]
#[command(name = "pdfdoc")]
#[command(author = "iyulab")]
#[command(version)]
#[command(about = "Inspect PDF documents: info, metadata keys and outlines", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show document information
    Info {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Password for encrypted documents
        #[arg(short, long, env = "PDFDOC_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// List the keys of the info dictionary
    Keys {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Password for encrypted documents
        #[arg(short, long, env = "PDFDOC_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Print the outline (table of contents)
    #[command(alias = "toc")]
    Outline {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output JSON instead of an indented tree
        #[arg(long)]
        json: bool,

        /// Password for encrypted documents
        #[arg(short, long, env = "PDFDOC_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Show version information
    Version,
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Info { input, password } => cmd_info(&input, password),
        Commands::Keys { input, password } => cmd_keys(&input, password),
        Commands::Outline {
            input,
            json,
            password,
        } => cmd_outline(&input, json, password),
        Commands::Version => {
            cmd_version();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

/// Load a document behind a spinner, trying the password if one was given.
fn open(input: &Path, password: Option<String>) -> Result<Document, Box<dyn std::error::Error>> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.enable_steady_tick(Duration::from_millis(80));
    pb.set_message(format!("Opening {}...", input.display()));

    let mut options = LoadOptions::new();
    if let Some(password) = password {
        options = options.with_password(password);
    }

    let mut doc = Document::new().with_options(options);
    let result = doc.load(input);
    pb.finish_and_clear();
    result?;

    if doc.is_locked() {
        log::info!("{} is still locked", input.display());
        eprintln!(
            "{} document is encrypted; pass {} to unlock it",
            "Warning:".yellow().bold(),
            "--password".bold()
        );
    }
    Ok(doc)
}

fn cmd_info(input: &Path, password: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let doc = open(input, password)?;
    let metadata = doc.metadata();

    println!("{}", "Document Information".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    println!("{}: {}", "File".bold(), input.display());
    println!("{}: PDF {:.1}", "Format".bold(), metadata.pdf_version);
    println!("{}: {}", "Pages".bold(), metadata.page_count);
    println!("{}: {}", "Page mode".bold(), metadata.page_mode);
    println!(
        "{}: {}",
        "Encrypted".bold(),
        metadata.encryption.as_deref().unwrap_or("No")
    );
    println!(
        "{}: {}",
        "Locked".bold(),
        if metadata.locked { "Yes" } else { "No" }
    );

    if let Some((width, height)) = doc.page(0).size() {
        println!("{}: {:.0} x {:.0} pt", "Page size".bold(), width, height);
    }

    if let Some(ref title) = metadata.title {
        println!("{}: {}", "Title".bold(), title);
    }
    if let Some(ref author) = metadata.author {
        println!("{}: {}", "Author".bold(), author);
    }
    if let Some(ref subject) = metadata.subject {
        println!("{}: {}", "Subject".bold(), subject);
    }
    if let Some(ref creator) = metadata.creator {
        println!("{}: {}", "Creator".bold(), creator);
    }
    if let Some(ref producer) = metadata.producer {
        println!("{}: {}", "Producer".bold(), producer);
    }
    if let Some(ref created) = metadata.created {
        println!("{}: {}", "Created".bold(), created);
    }
    if let Some(ref modified) = metadata.modified {
        println!("{}: {}", "Modified".bold(), modified);
    }

    if let Some(outline) = doc.outline() {
        println!("{}: {}", "Bookmarks".bold(), outline.total_items());
    }

    Ok(())
}

fn cmd_keys(input: &Path, password: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let doc = open(input, password)?;

    for key in doc.info_keys() {
        let name = String::from_utf8_lossy(&key);
        let value = doc.info_key(&key);
        println!(
            "{}: {}",
            (*name).bold(),
            if value.is_empty() {
                "-".dimmed().to_string()
            } else {
                value
            }
        );
    }

    Ok(())
}

fn cmd_outline(
    input: &Path,
    json: bool,
    password: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let doc = open(input, password)?;

    let Some(outline) = doc.outline() else {
        if json {
            println!("null");
        } else {
            println!("{}", "No outline".dimmed());
        }
        return Ok(());
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&outline)?);
    } else {
        print!("{}", format_outline(&outline));
    }

    Ok(())
}

/// Render an outline as an indented tree, one entry per line.
fn format_outline(outline: &Outline) -> String {
    let mut out = String::new();
    for (level, entry) in outline.iter() {
        out.push_str(&"  ".repeat(level));
        out.push_str(if entry.is_empty() {
            "-"
        } else if entry.is_open() {
            "▾"
        } else {
            "▸"
        });
        out.push(' ');
        out.push_str(entry.title());
        match entry.page_target() {
            Some(index) => out.push_str(&format!(" (p. {})", index + 1)),
            None => {
                if let Some(link) = entry.link() {
                    out.push_str(&format!(" <{}>", link));
                }
            }
        }
        out.push('\n');
    }
    out
}

fn cmd_version() {
    println!("{} {}", "pdfdoc".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("PDF document inspection tool");
    println!();
    println!("Repository: {}", "https://github.com/iyulab/pdfdoc".dimmed());
    println!("License: MIT");
}
