use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use facecheck_core::{EMBEDDING_SIZE, SIMILARITY_THRESHOLD};
use serde::Deserialize;

/// CLI configuration: optional TOML file, then `FACECHECK_*` environment overrides.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Directory holding the encrypted vault entries.
    pub store_dir: PathBuf,
    /// Vault key file, used when no passphrase is set.
    pub key_file: PathBuf,
    /// Passphrase to derive the vault key from (env only).
    pub passphrase: Option<String>,
    /// Euclidean distance below which a capture matches.
    pub threshold: f32,
    /// Required embedding length; `None` disables the check.
    pub dimension: Option<usize>,
}

/// On-disk shape of the config file. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub store_dir: Option<PathBuf>,
    pub key_file: Option<PathBuf>,
    pub threshold: Option<f32>,
    pub dimension: Option<usize>,
}

impl FileConfig {
    pub fn read(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parsing config file {}", path.display()))
    }
}

impl Config {
    /// Load from `explicit` (or `$FACECHECK_CONFIG`) and the process environment.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os("FACECHECK_CONFIG").map(PathBuf::from));
        let file = match path {
            Some(p) => FileConfig::read(&p)?,
            None => FileConfig::default(),
        };
        Self::resolve(file, |key| std::env::var(key).ok())
    }

    /// Merge file values with environment lookups. Environment wins.
    pub fn resolve(file: FileConfig, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let store_dir = env("FACECHECK_STORE_DIR")
            .map(PathBuf::from)
            .or(file.store_dir)
            .unwrap_or_else(|| default_data_dir(&env));

        let key_file = env("FACECHECK_KEY_FILE")
            .map(PathBuf::from)
            .or(file.key_file)
            .unwrap_or_else(|| store_dir.join("vault.key"));

        let threshold = match env("FACECHECK_THRESHOLD") {
            Some(v) => v
                .parse()
                .with_context(|| format!("FACECHECK_THRESHOLD is not a number: {v}"))?,
            None => file.threshold.unwrap_or(SIMILARITY_THRESHOLD),
        };
        if !(threshold.is_finite() && threshold > 0.0) {
            bail!("threshold must be a positive number, got {threshold}");
        }

        let dimension = match env("FACECHECK_DIMENSION") {
            Some(v) => v
                .parse()
                .with_context(|| format!("FACECHECK_DIMENSION is not an integer: {v}"))?,
            None => file.dimension.unwrap_or(EMBEDDING_SIZE),
        };

        Ok(Self {
            store_dir,
            key_file,
            passphrase: env("FACECHECK_PASSPHRASE").filter(|p| !p.is_empty()),
            threshold,
            dimension: (dimension > 0).then_some(dimension),
        })
    }
}

fn default_data_dir(env: &impl Fn(&str) -> Option<String>) -> PathBuf {
    env("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            let home = env("HOME").unwrap_or_else(|| "/tmp".to_string());
            PathBuf::from(home).join(".local/share")
        })
        .join("facecheck")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn resolve_env(pairs: &[(&str, &str)]) -> Result<Config> {
        Config::resolve(FileConfig::default(), env_of(pairs))
    }

    #[test]
    fn test_defaults() {
        let cfg = resolve_env(&[("HOME", "/home/ana")]).unwrap();
        assert_eq!(cfg.store_dir, PathBuf::from("/home/ana/.local/share/facecheck"));
        assert_eq!(
            cfg.key_file,
            PathBuf::from("/home/ana/.local/share/facecheck/vault.key")
        );
        assert_eq!(cfg.threshold, 0.6);
        assert_eq!(cfg.dimension, Some(512));
        assert_eq!(cfg.passphrase, None);
    }

    #[test]
    fn test_xdg_data_home() {
        let cfg = resolve_env(&[("XDG_DATA_HOME", "/data")]).unwrap();
        assert_eq!(cfg.store_dir, PathBuf::from("/data/facecheck"));
    }

    #[test]
    fn test_env_overrides_file() {
        let file: FileConfig = toml::from_str(
            r#"
            store_dir = "/srv/faces"
            threshold = 0.5
            dimension = 128
            "#,
        )
        .unwrap();
        let cfg = Config::resolve(
            file,
            env_of(&[("FACECHECK_THRESHOLD", "0.7"), ("FACECHECK_PASSPHRASE", "pw")]),
        )
        .unwrap();
        assert_eq!(cfg.store_dir, PathBuf::from("/srv/faces"));
        assert_eq!(cfg.key_file, PathBuf::from("/srv/faces/vault.key"));
        assert_eq!(cfg.threshold, 0.7);
        assert_eq!(cfg.dimension, Some(128));
        assert_eq!(cfg.passphrase.as_deref(), Some("pw"));
    }

    #[test]
    fn test_zero_dimension_disables_check() {
        let cfg = resolve_env(&[("FACECHECK_DIMENSION", "0")]).unwrap();
        assert_eq!(cfg.dimension, None);
    }

    #[test]
    fn test_invalid_threshold_rejected() {
        assert!(resolve_env(&[("FACECHECK_THRESHOLD", "abc")]).is_err());
        assert!(resolve_env(&[("FACECHECK_THRESHOLD", "-1")]).is_err());
    }

    #[test]
    fn test_unknown_file_key_rejected() {
        assert!(toml::from_str::<FileConfig>("treshold = 0.4").is_err());
    }

    #[test]
    fn test_read_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("facecheck.toml");
        std::fs::write(&path, "key_file = \"/etc/facecheck/key\"\n").unwrap();
        let file = FileConfig::read(&path).unwrap();
        assert_eq!(file.key_file, Some(PathBuf::from("/etc/facecheck/key")));
        assert!(FileConfig::read(&tmp.path().join("missing.toml")).is_err());
    }
}
