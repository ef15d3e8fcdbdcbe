//! Main entry point for the tinyunzip CLI application.
//!
//! Lists an archive and extracts all of its files into a directory,
//! keeping relative paths and modification times.

use anyhow::{Context, Result};
use clap::Parser;
use std::io::{Read, Seek};

use tinyunzip::{Archive, Cli, Entry, ExtractProgress};

fn main() -> Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(cli.log_level.to_string()),
    )
    .init();

    if cli.is_http_url() {
        let mut archive = Archive::open_url(&cli.archive)
            .with_context(|| format!("cannot open {}", cli.archive))?;

        process_zip(&mut archive, &cli)?;

        // Display network transfer statistics for HTTP sources
        if !cli.is_quiet() {
            let transferred = archive.get_mut().transferred_bytes();
            eprintln!("\nTotal bytes transferred: {}", format_size(transferred));
        }
    } else {
        let mut archive = Archive::open(&cli.archive)
            .with_context(|| format!("cannot open {}", cli.archive))?;
        process_zip(&mut archive, &cli)?;
    }

    Ok(())
}

/// List the archive, then extract (and optionally test) all of its files.
fn process_zip<R: Read + Seek>(archive: &mut Archive<R>, cli: &Cli) -> Result<()> {
    let entries = archive
        .entries()
        .with_context(|| format!("cannot read directory of {}", cli.archive))?;

    let skipped = archive.skipped_records()?;
    if skipped > 0 {
        eprintln!("warning: {skipped} damaged directory records were skipped");
    }

    if !cli.is_very_quiet() {
        if cli.verbose {
            list_verbose(&entries);
        } else {
            list_entries(&entries);
        }
    }

    if cli.list {
        return Ok(());
    }

    let quiet = cli.is_quiet();
    let report = |progress: &ExtractProgress<'_>| {
        if !quiet {
            println!(
                "  {}: {} ({}/{})",
                if cli.test { "extracting+testing" } else { "extracting" },
                progress.name,
                progress.index + 1,
                progress.total
            );
        }
    };
    // With -t each file is hashed while it is written, in a single pass.
    let summary = if cli.test {
        archive.extract_all_verified(&cli.output_dir, report)
    } else {
        archive.extract_all(&cli.output_dir, report)
    }
    .with_context(|| format!("extraction to {} failed", cli.output_dir.display()))?;

    if summary.skipped > 0 {
        eprintln!(
            "warning: {} entries with unsafe paths were not extracted",
            summary.skipped
        );
    }

    if !quiet {
        println!(
            "{} files, {} bytes written to {}",
            summary.extracted,
            summary.bytes,
            cli.output_dir.display()
        );
    }

    Ok(())
}

/// One entry per line; files are indented when the archive has directories.
fn list_entries(entries: &[Entry]) {
    let indent = if entries.iter().any(Entry::is_directory) {
        "  "
    } else {
        ""
    };

    for entry in entries {
        if entry.is_directory() {
            println!("{}", entry.name);
        } else {
            println!("{}{}", indent, entry.name);
        }
    }
}

/// Detailed table with size, compression ratio and timestamps.
fn list_verbose(entries: &[Entry]) {
    println!(
        "{:>10}  {:>10}  {:>5}  {:>10}  {:>5}  Name",
        "Length", "Size", "Cmpr", "Date", "Time"
    );
    println!("{}", "-".repeat(70));

    let mut total_uncompressed = 0u64;
    let mut total_compressed = 0u64;
    let mut file_count = 0usize;

    for entry in entries {
        let t = entry.timestamp;
        println!(
            "{:>10}  {:>10}  {}  {:04}-{:02}-{:02}  {:02}:{:02}  {}",
            entry.original_size,
            entry.compressed_size,
            ratio(entry.compressed_size as u64, entry.original_size as u64),
            t.year,
            t.month,
            t.day,
            t.hour,
            t.minute,
            entry.name
        );

        if entry.is_file() {
            total_uncompressed += entry.original_size as u64;
            total_compressed += entry.compressed_size as u64;
            file_count += 1;
        }
    }

    println!("{}", "-".repeat(70));
    println!(
        "{:>10}  {:>10}  {}  {:>21}  {} files",
        total_uncompressed,
        total_compressed,
        ratio(total_compressed, total_uncompressed),
        "",
        file_count
    );
}

/// Space saved as a percentage, right-aligned to five columns.
fn ratio(compressed: u64, uncompressed: u64) -> String {
    if uncompressed > 0 && compressed <= uncompressed {
        format!("{:>4}%", 100 - (compressed * 100 / uncompressed))
    } else {
        "  0%".to_string()
    }
}

/// Format a byte size into a human-readable string.
fn format_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{} bytes", size)
    }
}
