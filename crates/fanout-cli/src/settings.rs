//! Config file loading and merge with command-line flags.

use std::path::{Path, PathBuf};

use eyre::{bail, eyre, Result, WrapErr};
use fanout_core::config::default_config_file;
use fanout_core::{DispatchConfig, DEFAULT_COPIES};
use serde::Deserialize;
use tokio::fs;

use crate::cli::Cli;

/// Contents of `fanout.toml`. Every field is optional; flags win.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// Root directory of the bucket store
    pub store_root: Option<PathBuf>,
    /// Bucket that receives the copies
    pub bucket: Option<String>,
    pub copies: Option<usize>,
    pub workers: Option<usize>,
    pub attempts: Option<u32>,
    pub queue_capacity: Option<usize>,
    #[serde(default)]
    pub create_bucket: bool,
}

impl FileConfig {
    pub async fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .wrap_err_with(|| format!("failed to read config file: {}", path.display()))?;

        let config: FileConfig = toml::from_str(&content)
            .wrap_err_with(|| format!("failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Loads an explicitly named file, or the default one when it exists.
    pub async fn discover(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path).await;
        }
        let path = default_config_file()?;
        if fs::try_exists(&path).await.unwrap_or(false) {
            log::debug!("using config file {}", path.display());
            Self::load(&path).await
        } else {
            Ok(Self::default())
        }
    }
}

/// Fully resolved run settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub store_root: PathBuf,
    pub bucket: String,
    pub image_file: PathBuf,
    pub copies: usize,
    pub create_bucket: bool,
    pub dispatch: DispatchConfig,
}

impl Settings {
    pub fn resolve(cli: &Cli, file: FileConfig) -> Result<Self> {
        let store_root = cli
            .store_root
            .clone()
            .or(file.store_root)
            .ok_or_else(|| eyre!("no bucket store given (use --store-root or store_root in the config file)"))?;
        let bucket = cli
            .bucket
            .clone()
            .or(file.bucket)
            .ok_or_else(|| eyre!("no bucket given (use --bucket or bucket in the config file)"))?;
        if bucket.trim().is_empty() {
            bail!("bucket name cannot be empty");
        }

        let copies = cli.copies.or(file.copies).unwrap_or(DEFAULT_COPIES);
        if copies == 0 {
            bail!("copies must be at least 1");
        }

        let defaults = DispatchConfig::default();
        let dispatch = DispatchConfig {
            workers: cli.workers.or(file.workers).unwrap_or(defaults.workers),
            max_attempts: cli.attempts.or(file.attempts).unwrap_or(defaults.max_attempts),
            queue_capacity: cli.queue_capacity.or(file.queue_capacity),
        };
        dispatch.validate().wrap_err("invalid dispatch settings")?;

        Ok(Self {
            store_root,
            bucket,
            image_file: cli.image_file.clone(),
            copies,
            create_bucket: cli.create_bucket || file.create_bucket,
            dispatch,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["fanout", "--image-file", "cat.jpg"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn parses_full_file() {
        let config: FileConfig = toml::from_str(
            r#"
            store_root = "/srv/buckets"
            bucket = "media"
            copies = 50
            workers = 8
            attempts = 2
            create_bucket = true
            "#,
        )
        .unwrap();
        assert_eq!(config.store_root, Some(PathBuf::from("/srv/buckets")));
        assert_eq!(config.copies, Some(50));
        assert!(config.create_bucket);
    }

    #[test]
    fn rejects_unknown_keys() {
        assert!(toml::from_str::<FileConfig>("buckett = \"typo\"").is_err());
    }

    #[test]
    fn flags_override_file_values() {
        let file = FileConfig {
            store_root: Some("/from/file".into()),
            bucket: Some("file-bucket".into()),
            workers: Some(2),
            attempts: Some(7),
            ..FileConfig::default()
        };
        let settings = Settings::resolve(&cli(&["--bucket", "flag-bucket", "--workers", "6"]), file)
            .unwrap();
        assert_eq!(settings.store_root, PathBuf::from("/from/file"));
        assert_eq!(settings.bucket, "flag-bucket");
        assert_eq!(settings.dispatch.workers, 6);
        assert_eq!(settings.dispatch.max_attempts, 7);
        assert_eq!(settings.copies, DEFAULT_COPIES);
    }

    #[test]
    fn defaults_match_original_constants() {
        let settings =
            Settings::resolve(&cli(&["--store-root", "/s", "--bucket", "b"]), FileConfig::default())
                .unwrap();
        assert_eq!(settings.dispatch.workers, 10);
        assert_eq!(settings.dispatch.max_attempts, 3);
        assert_eq!(settings.copies, 1000);
        assert!(settings.dispatch.queue_capacity.is_none());
    }

    #[test]
    fn missing_bucket_or_store_is_an_error() {
        let err = Settings::resolve(&cli(&["--store-root", "/s"]), FileConfig::default())
            .unwrap_err();
        assert!(err.to_string().contains("bucket"));
        let err =
            Settings::resolve(&cli(&["--bucket", "b"]), FileConfig::default()).unwrap_err();
        assert!(err.to_string().contains("store"));
    }

    #[test]
    fn zero_workers_rejected() {
        let err = Settings::resolve(
            &cli(&["--store-root", "/s", "--bucket", "b", "--workers", "0"]),
            FileConfig::default(),
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("worker count"));
    }

    #[test]
    fn oversized_queue_capacity_rejected() {
        let file = FileConfig {
            queue_capacity: Some(usize::MAX),
            ..FileConfig::default()
        };
        let err = Settings::resolve(&cli(&["--store-root", "/s", "--bucket", "b"]), file)
            .unwrap_err();
        assert!(format!("{err:#}").contains("queue capacity"));
    }

    #[tokio::test]
    async fn load_reports_path_on_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fanout.toml");
        std::fs::write(&path, "workers = \"many\"").unwrap();
        let err = FileConfig::load(&path).await.unwrap_err();
        assert!(err.to_string().contains("fanout.toml"));
    }

    #[tokio::test]
    async fn discover_requires_explicit_file_to_exist() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        assert!(FileConfig::discover(Some(&missing)).await.is_err());
    }
}
