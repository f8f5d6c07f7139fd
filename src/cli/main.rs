use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};

use image_meta_batch::record::MetadataRecord;
use image_meta_batch::{config, export, pipeline, thumbnail};

#[derive(Parser, Debug)]
#[command(
    name = "image-meta-batch",
    version,
    about = "Batch editor for image titles, descriptions and keywords (EXIF and PNG text)"
)]
struct Cli {
    /// Image files or directories to process
    #[arg(value_name = "PATH")]
    paths: Vec<PathBuf>,

    /// Path to config file (default: config.json next to binary)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Initialize a default config.json and exit
    #[arg(long)]
    init: bool,

    /// Output records as JSON
    #[arg(long)]
    json: bool,

    /// Export the metadata table as CSV into the export directory
    #[arg(long)]
    csv: bool,

    /// Apply edits from a CSV table (Filename, Title, Description, Keywords) and write copies
    #[arg(long, value_name = "CSV")]
    apply: Option<PathBuf>,

    /// Directory for edited copies (overrides output.output_dir)
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Render PNG thumbnails into this directory
    #[arg(long, value_name = "DIR")]
    thumbnails: Option<PathBuf>,

    /// Maximum number of images per batch (overrides batch.max_batch_size)
    #[arg(long, value_name = "N")]
    limit: Option<usize>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = if cli.init {
        config::Config::default()
    } else {
        config::Config::load(cli.config.as_deref())?
    };

    init_logging(cli.verbose, config.output.log_file.as_deref())?;

    // Handle --init
    if cli.init {
        let path = cli.config.as_deref();
        config.save(path)?;
        let save_path = match path {
            Some(p) => p.to_path_buf(),
            None => config::Config::config_path()?,
        };
        println!("Default config written to {}", save_path.display());
        return Ok(());
    }

    if cli.paths.is_empty() {
        anyhow::bail!("No input files or directories specified. Use --help for usage.");
    }

    if let Some(limit) = cli.limit {
        config.batch.max_batch_size = limit;
    }

    let images = pipeline::collect_images(&cli.paths);
    if images.is_empty() {
        anyhow::bail!("No image files found in the specified paths.");
    }
    log::info!("Found {} file(s)", images.len());

    let processor = pipeline::BatchProcessor::from_config(&config);
    let records = processor.extract(&images);

    if let Some(ref dir) = cli.thumbnails {
        render_thumbnails(&records, dir, config.output.thumbnail_size);
    }

    let mut summary = None;
    if let Some(ref table) = cli.apply {
        let rows = export::read_edits(table)?;
        let edits = export::match_edits(&records, &rows);
        let output_dir = cli
            .output
            .clone()
            .unwrap_or_else(|| PathBuf::from(&config.output.output_dir));

        log::info!("Writing edited copies to {}", output_dir.display());
        let result = processor.apply_edits_and_write(&records, &edits, &output_dir);
        for (source, reason) in &result.failures {
            log::error!("  {}: {reason}", source.display());
        }
        summary = Some(result);
    }

    if cli.csv {
        let path = export::export_csv(&records, Path::new(&config.output.export_dir))?;
        println!("Exported table to {}", path.display());
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&records)?);
    } else if cli.apply.is_none() && !cli.csv {
        for record in &records {
            print_record(record);
        }
    }

    // Summary
    let unreadable = records.iter().filter(|r| r.decode_failed).count();
    let unsupported = records.iter().filter(|r| !r.is_supported()).count();
    log::info!(
        "Done: {} read, {unreadable} unreadable, {unsupported} unsupported",
        records.len() - unreadable - unsupported
    );
    if let Some(s) = summary {
        log::info!(
            "Wrote {} copies, {} failed",
            s.success_count,
            s.failure_count
        );
    }

    Ok(())
}

fn init_logging(verbose: bool, log_file: Option<&str>) -> Result<()> {
    let log_level = if verbose { "debug" } else { "info" };
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level));
    builder.format_timestamp(None);

    if let Some(file) = log_file {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(file)
            .with_context(|| format!("Failed to open log file {file}"))?;
        builder
            .target(env_logger::Target::Pipe(Box::new(file)))
            .write_style(env_logger::WriteStyle::Never);
    }

    builder.init();
    Ok(())
}

fn render_thumbnails(records: &[MetadataRecord], dir: &Path, size: u32) {
    for record in records.iter().filter(|r| r.is_supported() && !r.decode_failed) {
        match thumbnail::write_thumbnail(&record.source_path, dir, size) {
            Ok(path) => log::debug!("Thumbnail: {}", path.display()),
            Err(e) => log::warn!("No thumbnail for {}: {e:#}", record.source_path.display()),
        }
    }
}

// ANSI color codes
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";

/// Max width for the value column before wrapping.
const VAL_WIDTH: usize = 46;
/// Indent for continuation lines (tag column width + " : " = 25 chars + 2 leading spaces).
const INDENT: &str = "                           ";

/// Print one record with its fields and counters.
fn print_record(record: &MetadataRecord) {
    println!();
    println!(
        "{BOLD}{}{RESET} {DIM}[{} / {}]{RESET}",
        record.filename,
        record.format.label(),
        record.status()
    );
    println!("  {DIM}{}{RESET}", "─".repeat(70));

    let fields = &record.fields;
    print_row("Title", &fields.title);
    print_row("Description", &fields.description);
    print_row("Keywords", &fields.keywords);
    println!(
        "  {DIM}{} title chars, {} description chars, {} keywords{RESET}",
        fields.title_chars(),
        fields.description_chars(),
        fields.keyword_list().len()
    );
}

/// Print a single row in the field table.
fn print_row(tag: &str, val: &str) {
    let tag_col = format!("{:<22}", tag);
    if val.is_empty() {
        println!("  {tag_col} : {DIM}(empty){RESET}");
        return;
    }
    let lines = wrap_text(val, VAL_WIDTH);
    for (i, line) in lines.iter().enumerate() {
        if i == 0 {
            println!("  {tag_col} : {line}");
        } else {
            println!("  {INDENT}{line}");
        }
    }
}

/// Wrap text at word boundaries to fit within max_width characters.
fn wrap_text(s: &str, max_width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current_line = String::new();

    for word in s.split_whitespace() {
        if current_line.is_empty() {
            current_line = word.to_string();
        } else if current_line.chars().count() + 1 + word.chars().count() <= max_width {
            current_line.push(' ');
            current_line.push_str(word);
        } else {
            lines.push(current_line);
            current_line = word.to_string();
        }
    }

    if !current_line.is_empty() {
        lines.push(current_line);
    }

    if lines.is_empty() {
        lines.push(s.to_string());
    }

    lines
}
