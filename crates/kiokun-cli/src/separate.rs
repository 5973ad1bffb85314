//! Offline shard separation.
//!
//! Takes a flat directory of `<key>.json` entry documents and copies each into
//! the shard directory the router assigns it, using the same path layout the
//! filesystem lookup backend reads from.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use kiokun_lookup::LocalLayout;
use kiokun_routing::{PartitionPlan, PartitionReport, ShardCeiling, ShardSetGeneration};

/// Progress is logged every this many files.
const PROGRESS_INTERVAL: u64 = 10_000;

/// One entry document found in the source directory.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    /// Key, taken from the file stem
    pub key: String,
    /// Path of the document
    pub path: PathBuf,
    /// Payload size in bytes
    pub size: u64,
}

/// Lists every `*.json` document directly inside `dir`, sorted by key.
pub fn scan_source(dir: &Path) -> Result<Vec<SourceDocument>> {
    if !dir.is_dir() {
        bail!("source directory {} does not exist", dir.display());
    }

    let mut docs = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let Some(key) = path.file_stem().and_then(|s| s.to_str()) else {
            tracing::warn!("skipping non UTF-8 file name {}", path.display());
            continue;
        };
        let size = entry.metadata()?.len();
        docs.push(SourceDocument {
            key: key.to_string(),
            path,
            size,
        });
    }

    docs.sort_by(|a, b| a.key.cmp(&b.key));
    Ok(docs)
}

/// Routes every source document without copying and returns the distribution.
pub fn plan(
    docs: &[SourceDocument],
    generation: ShardSetGeneration,
    ceiling: ShardCeiling,
) -> Result<PartitionPlan> {
    let mut plan = PartitionPlan::new(generation, ceiling);
    for doc in docs {
        plan.add(&doc.key, doc.size)?;
    }
    Ok(plan)
}

/// Builds a distribution report for the documents in `source`.
pub fn report(
    source: &Path,
    generation: ShardSetGeneration,
    ceiling: ShardCeiling,
) -> Result<PartitionReport> {
    let docs = scan_source(source)?;
    Ok(plan(&docs, generation, ceiling)?.report())
}

/// Copies every document in `source` into its shard directory under `dest`.
///
/// Fails if the number of files copied differs from the number found.
pub fn separate(
    source: &Path,
    dest: &Path,
    generation: ShardSetGeneration,
    ceiling: ShardCeiling,
) -> Result<PartitionReport> {
    let docs = scan_source(source)?;
    let total = docs.len() as u64;
    tracing::info!("found {} files to separate into {} shards", total, generation.shard_count());

    let layout = LocalLayout::new(dest);
    for shard in generation.shards() {
        let dir = layout.shard_dir(shard);
        fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
    }

    let mut plan = PartitionPlan::new(generation, ceiling);
    let mut copied = 0u64;
    for doc in &docs {
        let shard = plan.add(&doc.key, doc.size)?;
        let target = layout.path_for(shard, &doc.key);
        fs::copy(&doc.path, &target).with_context(|| {
            format!("copying {} to {}", doc.path.display(), target.display())
        })?;

        copied += 1;
        if copied % PROGRESS_INTERVAL == 0 {
            tracing::info!(
                "processed {}/{} files ({}%)",
                copied,
                total,
                copied * 100 / total
            );
        }
    }

    // case-insensitive filesystems can fold distinct keys onto one file
    let written = count_shard_files(&layout, generation)?;
    if written != total {
        bail!("file count mismatch: source {} files, shards {} files", total, written);
    }

    let report = plan.report();
    tracing::info!(
        "separation complete: {} files, {} shards over ceiling",
        report.total_files,
        report.violations
    );
    Ok(report)
}

fn count_shard_files(layout: &LocalLayout, generation: ShardSetGeneration) -> Result<u64> {
    let mut count = 0u64;
    for shard in generation.shards() {
        for entry in fs::read_dir(layout.shard_dir(shard))? {
            if entry?.path().extension().and_then(|e| e.to_str()) == Some("json") {
                count += 1;
            }
        }
    }
    Ok(count)
}

/// Renders a report as the fixed-width table printed by the CLI.
pub fn render_report(report: &PartitionReport) -> String {
    let mut out = String::new();
    out.push_str(&format!("Generation: {}\n\n", report.generation));
    out.push_str(&format!("{:<20} {:>10} {:>12}\n", "Shard Name", "File Count", "Size (MB)"));
    out.push_str(&format!("{}\n", "=".repeat(44)));
    for load in &report.shards {
        let marker = if load.over_ceiling { "  !" } else { "" };
        out.push_str(&format!(
            "{:<20} {:>10} {:>12.1}{}\n",
            load.shard,
            load.files,
            load.bytes as f64 / (1024.0 * 1024.0),
            marker
        ));
    }
    out.push_str(&format!("{}\n", "=".repeat(44)));
    out.push_str(&format!(
        "{:<20} {:>10} {:>12.1}\n",
        "TOTAL",
        report.total_files,
        report.total_bytes as f64 / (1024.0 * 1024.0)
    ));
    if let Some(largest) = report.largest() {
        out.push_str(&format!(
            "\nLargest shard: {} with {} files\n",
            largest.shard, largest.files
        ));
    }
    out.push_str(&format!("Shards over ceiling: {}\n", report.violations));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiokun_routing::route;

    fn write_source(dir: &Path, keys: &[&str]) {
        for key in keys {
            fs::write(dir.join(format!("{}.json", key)), format!(r#"{{"k":"{}"}}"#, key)).unwrap();
        }
        fs::write(dir.join("README.txt"), "not an entry").unwrap();
    }

    #[test]
    fn test_scan_source_skips_non_json() {
        let dir = tempfile::tempdir().unwrap();
        write_source(dir.path(), &["好", "日本", "hello"]);

        let docs = scan_source(dir.path()).unwrap();
        let keys: Vec<_> = docs.iter().map(|d| d.key.as_str()).collect();
        assert_eq!(keys, vec!["hello", "好", "日本"]);
        assert!(docs.iter().all(|d| d.size > 0));
    }

    #[test]
    fn test_scan_missing_source_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(scan_source(&dir.path().join("nope")).is_err());
    }

    #[test]
    fn test_separate_copies_into_routed_shards() {
        let source = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        let keys = ["好", "日本", "図書館", "ひらがな", "hello"];
        write_source(source.path(), &keys);

        let generation = ShardSetGeneration::Fine;
        let report = separate(source.path(), dest.path(), generation, ShardCeiling::default()).unwrap();
        assert_eq!(report.total_files, keys.len() as u64);
        assert_eq!(report.violations, 0);

        let layout = LocalLayout::new(dest.path());
        for key in keys {
            let path = layout.path_for(route(key, generation), key);
            assert!(path.is_file(), "{} missing at {}", key, path.display());
        }

        // every shard directory exists, even empty ones
        for shard in generation.shards() {
            assert!(layout.shard_dir(shard).is_dir());
        }
    }

    #[test]
    fn test_separate_keeps_unsafe_keys_distinct() {
        let source = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        fs::write(source.path().join("a<b.json"), r#"{"k":"a<b"}"#).unwrap();
        fs::write(source.path().join("a_b.json"), r#"{"k":"a_b"}"#).unwrap();

        let generation = ShardSetGeneration::Fine;
        let report = separate(source.path(), dest.path(), generation, ShardCeiling::default()).unwrap();
        assert_eq!(report.total_files, 2);

        let layout = LocalLayout::new(dest.path());
        let escaped = layout.path_for(route("a<b", generation), "a<b");
        assert_eq!(fs::read_to_string(escaped).unwrap(), r#"{"k":"a<b"}"#);
        let plain = layout.path_for(route("a_b", generation), "a_b");
        assert_eq!(fs::read_to_string(plain).unwrap(), r#"{"k":"a_b"}"#);
    }

    #[test]
    fn test_report_coarse() {
        let source = tempfile::tempdir().unwrap();
        write_source(source.path(), &["好", "日本", "你好", "hello"]);

        let report = report(source.path(), ShardSetGeneration::Coarse, ShardCeiling::default()).unwrap();
        assert_eq!(report.largest().unwrap().shard, "han-2char");
        assert_eq!(report.total_files, 4);
    }

    #[test]
    fn test_render_report_marks_violations() {
        let source = tempfile::tempdir().unwrap();
        write_source(source.path(), &["a", "b", "c"]);
        let ceiling = ShardCeiling {
            max_files: 1,
            max_bytes: u64::MAX,
        };

        let report = report(source.path(), ShardSetGeneration::Coarse, ceiling).unwrap();
        let table = render_report(&report);
        assert!(table.contains("Generation: coarse"));
        assert!(table.contains("Largest shard: non-han with 3 files"));
        assert!(table.contains("Shards over ceiling: 1"));
        assert!(table.lines().any(|l| l.starts_with("non-han") && l.ends_with("!")));
    }
}
