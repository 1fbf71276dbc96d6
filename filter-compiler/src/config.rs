//! Filter compiler configuration

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

/// Helper used when nothing else is configured.
pub const DEFAULT_HELPER_PATH: &str = "/usr/lib/tracectl/tracectl-filter-helper";

/// Largest bytecode accepted from the helper, in bytes.
pub const DEFAULT_MAX_BYTECODE_LEN: usize = 64 * 1024;

/// Environment variable prefix, e.g. `TRACECTL_FILTER_HELPER_PATH`.
pub const ENV_PREFIX: &str = "TRACECTL_FILTER";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilerConfig {
    /// Helper executable speaking the compile protocol on stdin/stdout
    pub helper_path: PathBuf,

    /// Extra arguments passed to the helper
    #[serde(default)]
    pub helper_args: Vec<String>,

    /// Max bytecode size accepted from the helper
    pub max_bytecode_len: usize,
}

impl CompilerConfig {
    /// Layered load: built-in defaults, then `path` (TOML, optional), then
    /// `TRACECTL_FILTER_*` environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("helper_path", DEFAULT_HELPER_PATH)?
            .set_default("helper_args", Vec::<String>::new())?
            .set_default("max_bytecode_len", DEFAULT_MAX_BYTECODE_LEN as u64)?;

        if let Some(path) = path {
            builder = builder.add_source(
                File::from(path.to_path_buf())
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .try_parsing(true)
                    .list_separator(" ")
                    .with_list_parse_key("helper_args"),
            )
            .build()?
            .try_deserialize()
    }
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            helper_path: std::env::var("TRACECTL_FILTER_HELPER_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_HELPER_PATH)),
            helper_args: std::env::var("TRACECTL_FILTER_HELPER_ARGS")
                .map(|args| args.split_whitespace().map(str::to_string).collect())
                .unwrap_or_default(),
            max_bytecode_len: std::env::var("TRACECTL_FILTER_MAX_BYTECODE_LEN")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_MAX_BYTECODE_LEN),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "helper_path = \"/opt/tracectl/helper\"\nhelper_args = [\"--strict\"]\nmax_bytecode_len = 4096"
        )
        .unwrap();

        let config = CompilerConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.helper_path, PathBuf::from("/opt/tracectl/helper"));
        assert_eq!(config.helper_args, vec!["--strict".to_string()]);
        assert_eq!(config.max_bytecode_len, 4096);
    }

    #[test]
    fn test_missing_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = CompilerConfig::load(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(config.helper_path, PathBuf::from(DEFAULT_HELPER_PATH));
        assert_eq!(config.max_bytecode_len, DEFAULT_MAX_BYTECODE_LEN);
    }

    #[test]
    fn test_malformed_file_is_reported() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "max_bytecode_len = \"lots\"").unwrap();
        assert!(CompilerConfig::load(Some(file.path())).is_err());
    }
}
