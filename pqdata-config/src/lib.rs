use envconfig::Envconfig;
use lazy_static::lazy_static;

#[derive(Debug, Envconfig)]
pub struct Config {
    #[envconfig(from = "PQDATA_LOG_LEVEL", default = "info")]
    pub log_level: String,
    /// Number of rows decoded per record batch when materializing a table.
    #[envconfig(from = "PQDATA_BATCH_SIZE", default = "65536")]
    pub batch_size: usize,
    #[envconfig(from = "PQDATA_MAX_ROW_GROUP_SIZE", default = "1048576")]
    pub max_row_group_size: usize,
    /// One of `zstd`, `snappy` or `none`.
    #[envconfig(from = "PQDATA_COMPRESSION", default = "zstd")]
    pub compression: String,
    /// Read the modalities of a multi-modal container on scoped threads.
    #[envconfig(from = "PQDATA_PARALLEL_READS", default = "true")]
    pub parallel_reads: bool,
    #[envconfig(from = "PQDATA_MAX_NESTING_DEPTH", default = "8")]
    pub max_nesting_depth: usize,
}

impl Config {
    pub fn init() -> Config {
        Config::init_from_env().expect("Failed to load config")
    }
}

/// Conventional suffix of a store root directory.
pub const ROOT_SUFFIX: &str = "pqdata";
/// Stem of the per-node manifest file.
pub const MANIFEST_STEM: &str = "pqdata";

/// Table file extensions, in lookup order.
pub const TABLE_EXTENSIONS: [&str; 2] = ["pq", "parquet"];
/// Structured-text extensions, in lookup order. Later files win when merged.
pub const TEXT_EXTENSIONS: [&str; 4] = ["json", "yaml", "yml", "toml"];

lazy_static! {
    pub static ref CONFIG: Config = Config::init();

    /// Every extension a key may carry on disk.
    pub static ref SUPPORTED_EXTENSIONS: Vec<&'static str> = TABLE_EXTENSIONS
        .iter()
        .chain(TEXT_EXTENSIONS.iter())
        .copied()
        .collect();

    /// File names reserved for the manifest of a store root.
    pub static ref MANIFEST_FILE_NAMES: Vec<String> = TEXT_EXTENSIONS
        .iter()
        .map(|ext| format!("{}.{}", MANIFEST_STEM, ext))
        .collect();
}
