//! Format job reports and listings as text.

use crate::indexer::IndexReport;
use crate::reconstruct::ReconstructReport;
use crate::store::MaterializeReport;
use crate::vfs::{FileAttributes, FileKind};
use chrono::{DateTime, Utc};
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use owo_colors::OwoColorize;

/// Format a section heading with bold/underline.
pub fn format_section_heading(title: &str) -> String {
    format!("{}", title.bold().underline())
}

fn counter_table(rows: &[(&str, String)]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Counter", "Value"]);
    for (name, value) in rows {
        table.add_row(vec![name.to_string(), value.clone()]);
    }
    table
}

/// Format an indexing run.
pub fn format_index_report(report: &IndexReport) -> String {
    let stats = &report.stats;
    let mut out = format!("{}\n\n", format_section_heading("Index"));
    out.push_str(&format!("  Index: {}\n", report.commit.index_path.display()));
    match &report.commit.backup_path {
        Some(backup) => out.push_str(&format!("  Backup: {}\n", backup.display())),
        None => out.push_str("  Backup: none (first run)\n"),
    }
    out.push('\n');
    let table = counter_table(&[
        ("Records loaded", report.records_loaded.to_string()),
        ("Records added", report.records_added.to_string()),
        ("Directories scanned", stats.dirs_scanned.to_string()),
        ("Directories errored", stats.dirs_errored.to_string()),
        ("Files scanned", stats.files_scanned.to_string()),
        ("Files unchanged", stats.files_skipped.to_string()),
        ("Files hashed", stats.files_hashed.to_string()),
        ("Files errored", stats.files_errored.to_string()),
        ("Bytes hashed", stats.bytes_hashed.to_string()),
    ]);
    out.push_str(&format!("{}\n", table));
    out
}

/// Format a store update.
pub fn format_materialize_report(report: &MaterializeReport) -> String {
    let mut out = format!("{}\n\n", format_section_heading("Content store"));
    let table = counter_table(&[
        ("Hashes", report.hashes.to_string()),
        ("Copied", report.copied.to_string()),
        ("Already stored", report.already_stored.to_string()),
        ("Bytes copied", report.bytes_copied.to_string()),
        ("Unresolved", report.unresolved.len().to_string()),
    ]);
    out.push_str(&format!("{}\n", table));
    if !report.unresolved.is_empty() {
        out.push_str(&format!("\n{}\n", format_section_heading("Unresolved hashes")));
        for hash in &report.unresolved {
            out.push_str(&format!("  {}\n", hash.red()));
        }
    }
    out
}

/// Format a reconstruct run.
pub fn format_reconstruct_report(report: &ReconstructReport) -> String {
    let mut out = format!("{}\n\n", format_section_heading("Reconstruct"));
    let table = counter_table(&[
        ("Records", report.records_considered.to_string()),
        ("Filtered out", report.filtered_out.to_string()),
        ("Links created", report.links_created.to_string()),
        ("Directories created", report.dirs_created.to_string()),
        ("Existing, skipped", report.skipped_existing.to_string()),
        ("Errors", report.errors.to_string()),
    ]);
    out.push_str(&format!("{}\n", table));
    out
}

/// Format a directory listing produced by `read_directory`.
pub fn format_listing(path: &str, entries: &[(String, FileAttributes)]) -> String {
    let mut out = format!("{}\n\n", format_section_heading(path));
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Inode", "Mode", "Size", "Modified", "Name"]);
    for (name, attr) in entries {
        let modified: DateTime<Utc> = attr.mtime.into();
        let shown_name = match attr.kind {
            FileKind::Directory => format!("{}/", name.blue()),
            FileKind::RegularFile => name.clone(),
        };
        table.add_row(vec![
            attr.ino.to_string(),
            format!("{:o}", attr.mode()),
            attr.size.to_string(),
            modified.format("%Y-%m-%d %H:%M:%S").to_string(),
            shown_name,
        ]);
    }
    out.push_str(&format!("{}\n", table));
    out
}
