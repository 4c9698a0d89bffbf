//! Benchmark configuration read from `SQLITE_VEC_BENCH_*` variables.
//!
//! Missing or malformed values fall back to the defaults with a warning on
//! stderr; a bad variable never aborts the run.

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use sqlite_vec_client::DistanceMetric;

const DEFAULT_SIZES: &[usize] = &[100, 1_000, 10_000];
const DEFAULT_DIMENSION: usize = 384;
const DEFAULT_TOP_K: &[usize] = &[5, 10];
const DEFAULT_ITERATIONS: usize = 10;
const DEFAULT_BATCH_SIZE: usize = 1_000;

/// Where each run's database lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbMode {
    /// A fresh file in a temporary directory.
    File,
    Memory,
}

impl DbMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Memory => "memory",
        }
    }
}

impl fmt::Display for DbMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DbMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(Self::File),
            "memory" => Ok(Self::Memory),
            other => Err(format!("unknown db mode '{other}'")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BenchConfig {
    pub sizes: Vec<usize>,
    pub dimension: usize,
    pub distance: DistanceMetric,
    pub db_modes: Vec<DbMode>,
    pub top_k: Vec<usize>,
    pub iterations: usize,
    pub batch_size: usize,
    /// Directory for the results CSV; nothing is written when unset.
    pub output: Option<PathBuf>,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            sizes: DEFAULT_SIZES.to_vec(),
            dimension: DEFAULT_DIMENSION,
            distance: DistanceMetric::Cosine,
            db_modes: vec![DbMode::File, DbMode::Memory],
            top_k: DEFAULT_TOP_K.to_vec(),
            iterations: DEFAULT_ITERATIONS,
            batch_size: DEFAULT_BATCH_SIZE,
            output: None,
        }
    }
}

impl BenchConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            sizes: read_list_env("SQLITE_VEC_BENCH_SIZES", defaults.sizes),
            dimension: read_usize_env_with_min("SQLITE_VEC_BENCH_DIMENSION", defaults.dimension, 1),
            distance: read_parsed_env("SQLITE_VEC_BENCH_DISTANCE", defaults.distance),
            db_modes: read_list_env("SQLITE_VEC_BENCH_DB_MODE", defaults.db_modes),
            top_k: read_list_env("SQLITE_VEC_BENCH_TOP_K", defaults.top_k),
            iterations: read_usize_env_with_min(
                "SQLITE_VEC_BENCH_ITERATIONS",
                defaults.iterations,
                1,
            ),
            batch_size: read_usize_env_with_min(
                "SQLITE_VEC_BENCH_BATCH_SIZE",
                defaults.batch_size,
                1,
            ),
            output: env::var_os("SQLITE_VEC_BENCH_OUTPUT").map(PathBuf::from),
        }
    }
}

fn read_usize_env_with_min(name: &str, default: usize, min: usize) -> usize {
    match env::var(name) {
        Ok(raw) => match raw.trim().parse::<usize>() {
            Ok(value) if value >= min => value,
            Ok(value) => {
                eprintln!(
                    "warn=invalid_env env={name} value={value} reason=\"must be >= {min}\" \
                     using_default={default}"
                );
                default
            }
            Err(_) => {
                eprintln!(
                    "warn=invalid_env env={name} value=\"{raw}\" reason=\"not an integer\" \
                     using_default={default}"
                );
                default
            }
        },
        Err(_) => default,
    }
}

fn read_parsed_env<T>(name: &str, default: T) -> T
where
    T: FromStr + fmt::Display,
{
    let Ok(raw) = env::var(name) else {
        return default;
    };
    match raw.parse::<T>() {
        Ok(value) => value,
        Err(_) => {
            eprintln!("warn=invalid_env env={name} value=\"{raw}\" using_default={default}");
            default
        }
    }
}

/// Comma-separated list. Any unparsable or empty entry discards the whole
/// value in favour of the default; numeric lists reject zero.
fn read_list_env<T>(name: &str, default: Vec<T>) -> Vec<T>
where
    T: FromStr + ListItem,
{
    let Ok(raw) = env::var(name) else {
        return default;
    };
    match parse_list::<T>(&raw) {
        Some(values) => values,
        None => {
            eprintln!("warn=invalid_env env={name} value=\"{raw}\" using_default=true");
            default
        }
    }
}

fn parse_list<T: FromStr + ListItem>(raw: &str) -> Option<Vec<T>> {
    let values = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<T>().ok().filter(ListItem::is_valid))
        .collect::<Option<Vec<T>>>()?;
    (!values.is_empty()).then_some(values)
}

trait ListItem {
    fn is_valid(&self) -> bool {
        true
    }
}

impl ListItem for usize {
    fn is_valid(&self) -> bool {
        *self > 0
    }
}

impl ListItem for DbMode {}
