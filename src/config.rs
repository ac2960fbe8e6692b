//! Configuration loading and rule compilation.
//!
//! Configuration is stored in TOML. Sections whose order matters (groups,
//! keywords, rename rules) are arrays of tables so the order written in the
//! file is the order used when classifying.
//!
//! ```toml
//! delete_def = [".exe"]
//!
//! [settings]
//! watched_folder = "~/Downloads"
//! ask_to_delete = false
//! rename = false
//! progress_bar = true
//! ascii_bar = false
//! delete_empty_folders = true
//!
//! [[file_type_groups]]
//! name = "video"
//! extensions = [".mp4", ".mkv"]
//!
//! [file_group_dest]
//! video = "~/Downloads/Videos"
//!
//! [special_case_dest]
//! ".mkv" = "~/Downloads/HD Videos"
//!
//! [[keywords_dest]]
//! keyword = "tutorial"
//! matches = ["video"]
//! destination = "~/Downloads/Tutorials"
//!
//! [[file_rename]]
//! pattern = "_"
//! replacement = " "
//! ```

use crate::rules::{
    Destination, FileTypeGroup, KeywordRule, RenameRule, RuleSet, expand_home, home_dir,
    normalize_extension,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Template written when no configuration exists at the default location.
pub const TEMPLATE_CONFIG: &str = include_str!("template_config.toml");

/// Errors that can occur while loading or compiling configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file not found at an explicitly given path.
    #[error("Configuration file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),
    /// Invalid TOML syntax or a missing required field.
    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),
    /// The watched folder is missing or not a directory.
    #[error("Watched folder {} does not exist or is not a directory", .0.display())]
    WatchedFolderMissing(PathBuf),
    /// A keyword rule has nothing to match against.
    #[error("Keyword '{0}' has an empty `matches` list")]
    EmptyKeywordMatches(String),
    /// IO error while reading or bootstrapping configuration.
    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Run-level switches from the `[settings]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub watched_folder: String,
    /// Ask before deleting files whose extension is in `delete_def`.
    pub ask_to_delete: bool,
    /// Apply `file_rename` rules when moving.
    pub rename: bool,
    pub progress_bar: bool,
    /// Draw the progress bar with ASCII characters only.
    pub ascii_bar: bool,
    pub delete_empty_folders: bool,
    /// Ring the terminal bell when a run finishes.
    #[serde(default = "default_completion_signal")]
    pub completion_signal: bool,
}

fn default_completion_signal() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupEntry {
    pub name: String,
    pub extensions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordEntry {
    pub keyword: String,
    /// Extensions or group names; the first entry is also a group wildcard.
    pub matches: Vec<String>,
    pub destination: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenameEntry {
    pub pattern: String,
    pub replacement: String,
}

/// The configuration file as written on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanerConfig {
    pub settings: Settings,
    pub file_type_groups: Vec<GroupEntry>,
    pub file_group_dest: HashMap<String, String>,
    pub keywords_dest: Vec<KeywordEntry>,
    pub special_case_dest: HashMap<String, String>,
    pub delete_def: Vec<String>,
    pub file_rename: Vec<RenameEntry>,
}

impl CleanerConfig {
    /// Load configuration from `config_path`, or from the default location.
    ///
    /// An explicit path must exist. When no path is given the default file
    /// (`~/.config/dirsweep/config.toml`) is used, and it is first created from
    /// [`TEMPLATE_CONFIG`] if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ConfigNotFound` for a missing explicit path,
    /// `ConfigError::ConfigInvalid` if parsing fails, and `ConfigError::Io` if
    /// the file cannot be read or the template cannot be written.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        let default_path = Self::default_path().ok_or_else(|| {
            ConfigError::ConfigInvalid(
                "cannot locate a home directory for the default config".to_string(),
            )
        })?;
        Self::bootstrap(&default_path)?;
        Self::load_from_file(&default_path)
    }

    /// `~/.config/dirsweep/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        home_dir().map(|home| home.join(".config").join("dirsweep").join("config.toml"))
    }

    /// Writes the template to `path` unless a file is already there.
    ///
    /// Returns `true` when the template was written.
    pub fn bootstrap(path: &Path) -> Result<bool, ConfigError> {
        if path.exists() {
            return Ok(false);
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        fs::write(path, TEMPLATE_CONFIG).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        tracing::info!(path = %path.display(), "wrote configuration template");
        Ok(true)
    }

    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::ConfigNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ConfigInvalid(e.to_string()))
    }

    /// The watched folder with `~` expanded.
    pub fn watched_folder(&self) -> PathBuf {
        expand_home(&self.settings.watched_folder, home_dir().as_deref())
    }

    /// Checks the watched folder and compiles the rule tables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::WatchedFolderMissing` if the watched folder is not
    /// a directory, or any error from [`CleanerConfig::compile_rules`].
    pub fn compile(&self) -> Result<RuleSet, ConfigError> {
        let watched = self.watched_folder();
        if !watched.is_dir() {
            return Err(ConfigError::WatchedFolderMissing(watched));
        }
        self.compile_rules(home_dir().as_deref())
    }

    /// Compiles the rule tables into a [`RuleSet`] without touching the
    /// filesystem. `home` is used for `~` expansion.
    pub fn compile_rules(&self, home: Option<&Path>) -> Result<RuleSet, ConfigError> {
        let known_groups: HashSet<&str> =
            self.file_type_groups.iter().map(|g| g.name.as_str()).collect();
        for name in self.file_group_dest.keys() {
            if !known_groups.contains(name.as_str()) {
                tracing::warn!(group = %name, "file_group_dest names an unknown group; ignored");
            }
        }

        let mut seen: HashMap<String, &str> = HashMap::new();
        let mut groups = Vec::with_capacity(self.file_type_groups.len());
        for entry in &self.file_type_groups {
            let extensions: HashSet<String> =
                entry.extensions.iter().map(|e| normalize_extension(e)).collect();
            for ext in &extensions {
                if let Some(earlier) = seen.insert(ext.clone(), &entry.name)
                    && earlier != entry.name
                {
                    tracing::warn!(
                        extension = %ext,
                        earlier = %earlier,
                        later = %entry.name,
                        "extension is listed in more than one group; the later group wins"
                    );
                }
            }
            let destination = match self.file_group_dest.get(&entry.name) {
                Some(value) => Destination::parse(value, home),
                None => {
                    tracing::debug!(
                        group = %entry.name,
                        "group has no destination; treated as skip"
                    );
                    Destination::Skip
                }
            };
            groups.push(FileTypeGroup {
                name: entry.name.clone(),
                extensions,
                destination,
            });
        }

        let special_cases = self
            .special_case_dest
            .iter()
            .map(|(ext, dest)| (normalize_extension(ext), Destination::parse(dest, home)))
            .collect();

        let keywords = self
            .keywords_dest
            .iter()
            .map(|entry| {
                if entry.matches.is_empty() {
                    return Err(ConfigError::EmptyKeywordMatches(entry.keyword.clone()));
                }
                Ok(KeywordRule {
                    keyword: entry.keyword.to_lowercase(),
                    matches: entry
                        .matches
                        .iter()
                        .map(|m| if m.starts_with('.') { m.to_lowercase() } else { m.clone() })
                        .collect(),
                    destination: Destination::parse(&entry.destination, home),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(RuleSet {
            groups,
            special_cases,
            keywords,
            delete_extensions: self.delete_def.iter().map(|e| normalize_extension(e)).collect(),
            rename_rules: self
                .file_rename
                .iter()
                .map(|r| RenameRule {
                    pattern: r.pattern.clone(),
                    replacement: r.replacement.clone(),
                })
                .collect(),
        })
    }
}
