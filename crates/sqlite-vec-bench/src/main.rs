//! CRUD and similarity-search benchmarks for sqlite-vec-client.
//!
//! Every configured dataset size is run once per database mode. Each
//! operation prints one `bench=row` line, followed by a summary table per
//! mode. Configuration comes from `SQLITE_VEC_BENCH_*` environment variables
//! (see [`config`]); `SQLITE_VEC_BENCH_OUTPUT` also writes a CSV of all rows.

mod config;
mod operations;

use std::fs;
use std::path::Path;
use std::process;

use sqlite_vec_client::{LogConfig, Result};

use crate::config::BenchConfig;
use crate::operations::{run_suite, BenchRow};

fn main() {
    if let Err(e) = LogConfig::from_env().init() {
        eprintln!("warn=logging_disabled detail=\"{e}\"");
    }
    if cfg!(debug_assertions) {
        eprintln!(
            "warn=debug_build message=\"run `cargo run --release -p sqlite-vec-bench` \
             for meaningful numbers\""
        );
    }

    let config = BenchConfig::from_env();
    println!(
        "bench=sqlite_vec_client dimension={} distance={} sizes={:?} db_modes={:?} top_k={:?} \
         iterations={} batch_size={}",
        config.dimension,
        config.distance,
        config.sizes,
        config.db_modes.iter().map(|m| m.as_str()).collect::<Vec<_>>(),
        config.top_k,
        config.iterations,
        config.batch_size,
    );

    let mut all_rows = Vec::new();
    for &mode in &config.db_modes {
        for &size in &config.sizes {
            tracing::info!(%mode, size, "running benchmark suite");
            match run_suite(&config, mode, size) {
                Ok(rows) => {
                    for row in &rows {
                        print_row(row);
                    }
                    all_rows.extend(rows);
                }
                Err(e) => {
                    eprintln!("error=bench_failed db_mode={mode} size={size} detail=\"{e}\"");
                    process::exit(1);
                }
            }
        }
    }

    print_summary(&config, &all_rows);

    if let Some(dir) = &config.output {
        match write_csv(dir, &all_rows) {
            Ok(path) => println!("bench=csv_written path={}", path.display()),
            Err(e) => {
                eprintln!("error=csv_export_failed dir={} detail=\"{e}\"", dir.display());
                process::exit(1);
            }
        }
    }
}

fn print_row(row: &BenchRow) {
    println!(
        "bench=row db_mode={} size={} operation={} count={} elapsed_ms={:.3} ops_per_sec={:.2}",
        row.db_mode, row.size, row.operation, row.count, row.elapsed_ms, row.ops_per_sec
    );
}

/// Operations as rows, dataset sizes as columns, ops/sec in the cells.
fn print_summary(config: &BenchConfig, rows: &[BenchRow]) {
    for mode in &config.db_modes {
        let mode_rows: Vec<&BenchRow> = rows
            .iter()
            .filter(|r| r.db_mode == mode.as_str())
            .collect();
        if mode_rows.is_empty() {
            continue;
        }

        let mut operations: Vec<&str> = Vec::new();
        for row in &mode_rows {
            if !operations.contains(&row.operation.as_str()) {
                operations.push(&row.operation);
            }
        }

        println!();
        println!("summary db_mode={mode} (ops/sec)");
        let sizes: Vec<String> = config.sizes.iter().map(usize::to_string).collect();
        println!("| operation | {} |", sizes.join(" | "));
        println!("|---|{}", "---:|".repeat(sizes.len()));
        for op in operations {
            let cells: Vec<String> = config
                .sizes
                .iter()
                .map(|&size| {
                    mode_rows
                        .iter()
                        .find(|r| r.size == size && r.operation == op)
                        .map_or_else(|| "-".to_string(), |r| format!("{:.2}", r.ops_per_sec))
                })
                .collect();
            println!("| {op} | {} |", cells.join(" | "));
        }
    }
}

fn write_csv(dir: &Path, rows: &[BenchRow]) -> Result<std::path::PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join("benchmark_results.csv");
    let mut writer = csv::Writer::from_path(&path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(path)
}
