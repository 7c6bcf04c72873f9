use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::config::themes::ThemeRegistry;
use crate::store::DEFAULT_KEY;

pub mod themes;

const APP_DOMAIN: &str = "io";
const APP_ORG: &str = "TodoTui";
const APP_NAME: &str = "todotui";

pub const CONFIG_ENV: &str = "TODOTUI_CONFIG";
pub const DATA_ENV: &str = "TODOTUI_DATA";

pub struct ConfigLoader {
    paths: ConfigPaths,
}

impl ConfigLoader {
    pub fn discover() -> Result<Self> {
        let paths = ConfigPaths::discover()?;
        Ok(Self { paths })
    }

    pub fn with_paths(paths: ConfigPaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &ConfigPaths {
        &self.paths
    }

    pub fn load_or_init(&self) -> Result<AppConfig> {
        self.paths.ensure_directories()?;
        if !self.paths.config_file.exists() {
            let mut default_cfg = AppConfig::default();
            default_cfg.post_load();
            self.write_default_config(&default_cfg)?;
            return Ok(default_cfg);
        }

        self.load()
    }

    pub fn load(&self) -> Result<AppConfig> {
        let raw = fs::read_to_string(&self.paths.config_file)
            .with_context(|| format!("reading config {}", self.paths.config_file.display()))?;
        let mut cfg: AppConfig = toml::from_str(&raw).context("parsing config toml")?;
        cfg.post_load();
        Ok(cfg)
    }

    fn write_default_config(&self, cfg: &AppConfig) -> Result<()> {
        let toml = toml::to_string_pretty(cfg).context("serializing default config")?;
        if let Some(parent) = self.paths.config_file.parent() {
            fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
        }
        let mut file = fs::File::create(&self.paths.config_file)
            .with_context(|| format!("creating config {}", self.paths.config_file.display()))?;
        file.write_all(toml.as_bytes())
            .context("writing default config")?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ConfigPaths {
    pub config_dir: PathBuf,
    pub config_file: PathBuf,
    pub data_dir: PathBuf,
    pub store_dir: PathBuf,
    pub log_dir: PathBuf,
    pub state_dir: PathBuf,
}

impl ConfigPaths {
    pub fn discover() -> Result<Self> {
        let override_config = env::var(CONFIG_ENV).ok().map(PathBuf::from);
        let override_data = env::var(DATA_ENV).ok().map(PathBuf::from);

        let project_dirs = ProjectDirs::from(APP_DOMAIN, APP_ORG, APP_NAME)
            .context("resolving XDG project directories")?;

        let config_dir = override_config
            .clone()
            .map(|p| {
                if p.is_dir() {
                    p
                } else {
                    p.parent().map(Path::to_path_buf).unwrap_or(p)
                }
            })
            .unwrap_or_else(|| project_dirs.config_dir().to_path_buf());

        let config_file = override_config
            .filter(|p| p.is_file() || p.extension().is_some())
            .unwrap_or_else(|| config_dir.join("config.toml"));

        let data_root = override_data.unwrap_or_else(|| project_dirs.data_dir().to_path_buf());
        let state_dir = project_dirs
            .state_dir()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| data_root.join("state"));

        Ok(Self::from_roots(config_dir, config_file, data_root, state_dir))
    }

    /// Lays out every directory beneath a single root, for tests and portable installs.
    pub fn under(root: &Path) -> Self {
        let config_dir = root.join("config");
        let config_file = config_dir.join("config.toml");
        Self::from_roots(config_dir, config_file, root.join("data"), root.join("state"))
    }

    fn from_roots(
        config_dir: PathBuf,
        config_file: PathBuf,
        data_dir: PathBuf,
        state_dir: PathBuf,
    ) -> Self {
        Self {
            config_dir,
            config_file,
            store_dir: data_dir.join("store"),
            data_dir,
            log_dir: state_dir.join("logs"),
            state_dir,
        }
    }

    pub fn log_file(&self) -> PathBuf {
        self.log_dir.join(format!("{APP_NAME}.log"))
    }

    pub fn ensure_directories(&self) -> Result<()> {
        for dir in [
            &self.config_dir,
            &self.data_dir,
            &self.store_dir,
            &self.log_dir,
            &self.state_dir,
        ] {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating application directory {}", dir.display()))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub theme: ThemeName,
    pub storage: StorageOptions,
    pub ui: UiOptions,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            theme: ThemeName::Dark,
            storage: StorageOptions::default(),
            ui: UiOptions::default(),
        }
    }
}

impl AppConfig {
    fn post_load(&mut self) {
        if !ThemeRegistry::default().contains(&self.theme) {
            tracing::warn!(?self.theme, "unknown theme in config, falling back to Dark");
            self.theme = ThemeName::Dark;
        }
        let key = self.storage.key.trim().to_string();
        if key.is_empty() {
            tracing::warn!("empty storage key in config, using {DEFAULT_KEY}");
            self.storage.key = DEFAULT_KEY.to_string();
        } else if !is_plain_key(&key) {
            tracing::warn!(
                key = %self.storage.key,
                "storage key is not a plain file name, using {DEFAULT_KEY}"
            );
            self.storage.key = DEFAULT_KEY.to_string();
        } else {
            self.storage.key = key;
        }
        if self.ui.max_input_len == 0 {
            self.ui.max_input_len = UiOptions::default().max_input_len;
        }
    }
}

/// Keys become file names inside the store directory.
fn is_plain_key(key: &str) -> bool {
    key != "." && key != ".." && !key.contains(['/', '\\', '\0'])
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageOptions {
    /// Key the list snapshot is stored under.
    pub key: String,
}

impl Default for StorageOptions {
    fn default() -> Self {
        Self {
            key: DEFAULT_KEY.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiOptions {
    pub max_input_len: usize,
    pub show_indices: bool,
    pub tick_rate_ms: u64,
}

impl Default for UiOptions {
    fn default() -> Self {
        Self {
            max_input_len: 120,
            show_indices: false,
            tick_rate_ms: 250,
        }
    }
}

impl UiOptions {
    pub fn tick_rate(&self) -> Duration {
        Duration::from_millis(self.tick_rate_ms.max(10))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, std::hash::Hash)]
#[serde(rename_all = "kebab-case")]
pub enum ThemeName {
    Dark,
    Light,
    HighContrast,
    Solarized,
    /// Any name without a palette; replaced by `Dark` when the config is loaded.
    #[serde(other)]
    Unknown,
}

impl Default for ThemeName {
    fn default() -> Self {
        ThemeName::Dark
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn first_load_writes_default_config() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let loader = ConfigLoader::with_paths(ConfigPaths::under(temp.path()));
        let cfg = loader.load_or_init()?;
        assert_eq!(cfg.theme, ThemeName::Dark);
        assert_eq!(cfg.storage.key, "todos");
        assert!(loader.paths().config_file.exists());
        assert!(loader.paths().store_dir.is_dir());

        let reloaded = loader.load()?;
        assert_eq!(reloaded.ui.max_input_len, cfg.ui.max_input_len);
        Ok(())
    }

    #[test]
    fn partial_config_keeps_defaults_and_repairs_blank_key() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let paths = ConfigPaths::under(temp.path());
        paths.ensure_directories()?;
        fs::write(
            &paths.config_file,
            "theme = \"solarized\"\n[storage]\nkey = \"  \"\n[ui]\nshow_indices = true\n",
        )?;

        let cfg = ConfigLoader::with_paths(paths).load()?;
        assert_eq!(cfg.theme, ThemeName::Solarized);
        assert_eq!(cfg.storage.key, DEFAULT_KEY);
        assert!(cfg.ui.show_indices);
        assert_eq!(cfg.ui.tick_rate_ms, 250);
        Ok(())
    }

    #[test]
    fn unknown_theme_falls_back_to_dark() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let paths = ConfigPaths::under(temp.path());
        paths.ensure_directories()?;
        fs::write(&paths.config_file, "theme = \"neon\"\n[ui]\nmax_input_len = 40\n")?;

        let cfg = ConfigLoader::with_paths(paths).load()?;
        assert_eq!(cfg.theme, ThemeName::Dark);
        assert_eq!(cfg.ui.max_input_len, 40);
        Ok(())
    }

    #[test]
    fn storage_keys_that_leave_the_store_dir_are_replaced() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let paths = ConfigPaths::under(temp.path());
        paths.ensure_directories()?;
        let loader = ConfigLoader::with_paths(paths);

        for key in ["../escape", "a/b", "a\\b", ".."] {
            fs::write(
                &loader.paths().config_file,
                format!("[storage]\nkey = '{key}'\n"),
            )?;
            assert_eq!(loader.load()?.storage.key, DEFAULT_KEY, "key {key:?}");
        }

        fs::write(&loader.paths().config_file, "[storage]\nkey = ' groceries '\n")?;
        assert_eq!(loader.load()?.storage.key, "groceries");
        Ok(())
    }
}
