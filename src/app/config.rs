//! File configuration and its merge with CLI flags.
//!
//! Priority per setting: CLI flag > config file > built-in default.

use std::env;
use std::fs;
use std::num::ParseIntError;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use linkfetch_core::EngineConfig;
use linkfetch_core::download::constants::MIB;

use crate::cli::Args;

const DEFAULT_INPUT_FILE: &str = "input.txt";
const DEFAULT_OUTPUT_DIR: &str = "downloads";

/// Flat `key = value` file configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileConfig {
    /// Default output directory.
    pub output_dir: Option<PathBuf>,
    /// Default link list file.
    pub input_file: Option<PathBuf>,
    /// Concurrent chunk requests per file.
    pub concurrency: Option<u8>,
    /// Chunk size in MiB.
    pub chunk_size_mib: Option<u64>,
    /// Attempts per chunk.
    pub max_attempts: Option<u8>,
    /// Delay between chunk attempts in milliseconds.
    pub retry_delay_ms: Option<u64>,
    /// Connect/read timeout for transfers in seconds.
    pub request_timeout_secs: Option<u64>,
    /// Fail a file on any permanently failed chunk.
    pub fail_on_chunk_error: Option<bool>,
}

impl FileConfig {
    /// Validates config values against runtime and CLI constraints.
    pub fn validate(&self) -> Result<()> {
        validate_range("concurrency", self.concurrency.map(u64::from), 1, 64)?;
        validate_range("chunk_size_mib", self.chunk_size_mib, 1, 1024)?;
        validate_range("max_attempts", self.max_attempts.map(u64::from), 1, 10)?;
        validate_range("retry_delay_ms", self.retry_delay_ms, 0, 60_000)?;
        validate_range("request_timeout_secs", self.request_timeout_secs, 1, 3600)?;
        Ok(())
    }
}

fn validate_range(field: &str, value: Option<u64>, min: u64, max: u64) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if !(min..=max).contains(&value) {
        bail!("Invalid config value for `{field}`: {value}. Expected range: {min}..={max}");
    }
    Ok(())
}

/// Everything `main` needs to run, after merging all sources.
#[derive(Debug, Clone)]
pub struct RunSettings {
    /// Link list file.
    pub input_file: PathBuf,
    /// Output directory.
    pub output_dir: PathBuf,
    /// Engine tunables.
    pub engine: EngineConfig,
    /// Use the direct resolver.
    pub direct: bool,
    /// Remove completed links from the input file.
    pub remove_completed: bool,
}

impl RunSettings {
    /// Merges CLI flags over file values over defaults.
    #[must_use]
    pub fn resolve(args: &Args, file: &FileConfig) -> Self {
        let mut engine = EngineConfig::default();
        if let Some(concurrency) = args.concurrency.or(file.concurrency) {
            engine.concurrency = usize::from(concurrency);
        }
        if let Some(mib) = args.chunk_size_mib.or(file.chunk_size_mib) {
            engine.chunk_size = mib * MIB;
        }
        if let Some(attempts) = args.max_attempts.or(file.max_attempts) {
            engine.max_attempts = u32::from(attempts);
        }
        if let Some(ms) = file.retry_delay_ms {
            engine.retry_delay = Duration::from_millis(ms);
        }
        if let Some(secs) = file.request_timeout_secs {
            engine.request_timeout = Duration::from_secs(secs);
        }
        engine.fail_on_chunk_error = args.strict || file.fail_on_chunk_error.unwrap_or(false);

        Self {
            input_file: args
                .input
                .clone()
                .or_else(|| file.input_file.clone())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_INPUT_FILE)),
            output_dir: args
                .output
                .clone()
                .or_else(|| file.output_dir.clone())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
            engine,
            direct: args.direct,
            remove_completed: !args.no_remove,
        }
    }
}

const CONFIG_DIR: &str = "linkfetch";
const CONFIG_FILE: &str = "config.toml";

/// Location of the user config file: `$XDG_CONFIG_HOME/linkfetch/config.toml`,
/// else `$HOME/.config/linkfetch/config.toml`.
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    let base = match non_empty_env("XDG_CONFIG_HOME") {
        Some(xdg) => PathBuf::from(xdg),
        None => PathBuf::from(non_empty_env("HOME")?).join(".config"),
    };
    Some(base.join(CONFIG_DIR).join(CONFIG_FILE))
}

fn non_empty_env(name: &str) -> Option<std::ffi::OsString> {
    env::var_os(name).filter(|value| !value.is_empty())
}

/// Loads config from the default path; a missing file yields defaults.
pub fn load_default_file_config() -> Result<(Option<PathBuf>, FileConfig)> {
    let path = resolve_default_config_path();
    let config = match path.as_deref().filter(|p| p.exists()) {
        Some(existing) => {
            let raw = fs::read_to_string(existing)
                .with_context(|| format!("Failed to read config file '{}'", existing.display()))?;
            parse_config_str(&raw)
                .with_context(|| format!("Invalid config file '{}'", existing.display()))?
        }
        None => FileConfig::default(),
    };
    Ok((path, config))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let mut cfg = FileConfig::default();
    for (line_no, line) in (1..).zip(raw.lines()) {
        let line = without_comment(line).trim();
        if line.is_empty() {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            bail!("Invalid config syntax on line {line_no}: expected key = value");
        };
        let (key, value) = (key.trim(), value.trim());
        apply_entry(&mut cfg, key, value)
            .with_context(|| format!("Invalid `{key}` value on line {line_no}"))?;
    }
    cfg.validate()?;
    Ok(cfg)
}

fn apply_entry(cfg: &mut FileConfig, key: &str, value: &str) -> Result<()> {
    match key {
        "output_dir" => cfg.output_dir = Some(quoted(value)?.into()),
        "input_file" => cfg.input_file = Some(quoted(value)?.into()),
        "concurrency" => cfg.concurrency = Some(number(value)?),
        "chunk_size_mib" => cfg.chunk_size_mib = Some(number(value)?),
        "max_attempts" => cfg.max_attempts = Some(number(value)?),
        "retry_delay_ms" => cfg.retry_delay_ms = Some(number(value)?),
        "request_timeout_secs" => cfg.request_timeout_secs = Some(number(value)?),
        "fail_on_chunk_error" => {
            cfg.fail_on_chunk_error = Some(match value {
                "true" => true,
                "false" => false,
                _ => bail!("Expected 'true' or 'false'"),
            });
        }
        unknown => bail!("Unknown configuration key: '{unknown}'"),
    }
    Ok(())
}

/// Drops a `#` comment unless the `#` sits inside a quoted string.
fn without_comment(line: &str) -> &str {
    let mut quoted = false;
    let cut = line.char_indices().find(|&(_, ch)| {
        if ch == '"' {
            quoted = !quoted;
        }
        ch == '#' && !quoted
    });
    cut.map_or(line, |(index, _)| &line[..index])
}

fn quoted(value: &str) -> Result<String> {
    match value.strip_prefix('"').and_then(|v| v.strip_suffix('"')) {
        Some(inner) => Ok(inner.to_string()),
        _ => bail!("Expected double-quoted string"),
    }
}

fn number<T>(value: &str) -> Result<T>
where
    T: FromStr<Err = ParseIntError>,
{
    value
        .parse::<T>()
        .with_context(|| format!("Expected a non-negative integer in range, got '{value}'"))
}
