//! Config manager for loading, saving, and atomic updates.
//!
//! Key features:
//! - Atomic writes (write to temp file, then rename)
//! - Section-level updates (only the modified table is rewritten)
//! - Unknown sections are dropped on load
//! - Comments outside the updated section survive via toml_edit

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use toml_edit::{DocumentMut, Item};

use super::settings::{ConfigSection, Settings};

/// Errors that can occur during config operations.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("Failed to parse config for editing: {0}")]
    EditParseError(#[from] toml_edit::TomlError),

    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Result type for config operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Manages the settings file.
pub struct ConfigManager {
    config_path: PathBuf,
    settings: Settings,
}

impl ConfigManager {
    /// Create a manager for `config_path`. Call `load()` or `load_or_create()` next.
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
            settings: Settings::default(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// In-memory settings; persisted only by `save()` or `update_section()`.
    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    /// Consume the manager, keeping the loaded settings.
    pub fn into_settings(self) -> Settings {
        self.settings
    }

    /// Load config from file. Errors if the file doesn't exist.
    pub fn load(&mut self) -> ConfigResult<()> {
        if !self.config_path.exists() {
            return Err(ConfigError::NotFound(self.config_path.clone()));
        }

        let content = fs::read_to_string(&self.config_path)?;
        self.settings = parse_and_validate(&content)?;
        Ok(())
    }

    /// Load config from file, creating it with defaults if missing.
    ///
    /// A file with unknown sections or missing keys is rewritten in full.
    pub fn load_or_create(&mut self) -> ConfigResult<()> {
        if self.config_path.exists() {
            let content = fs::read_to_string(&self.config_path)?;
            let (settings, was_modified) = parse_validate_and_clean(&content)?;
            self.settings = settings;

            if was_modified {
                tracing::debug!(
                    "[Config] Rewriting {} with defaults filled in",
                    self.config_path.display()
                );
                self.save()?;
            }
        } else {
            self.settings = Settings::default();
            self.save()?;
            tracing::info!(
                "[Config] Created default config at {}",
                self.config_path.display()
            );
        }
        Ok(())
    }

    /// Create the output, temp and logs directories.
    pub fn ensure_dirs_exist(&self) -> ConfigResult<()> {
        let paths = &self.settings.paths;
        for dir in [&paths.output_folder, &paths.temp_root, &paths.logs_folder] {
            fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    pub fn logs_folder(&self) -> PathBuf {
        PathBuf::from(&self.settings.paths.logs_folder)
    }

    /// Save the entire config atomically.
    pub fn save(&self) -> ConfigResult<()> {
        let content = self.generate_config_with_comments()?;
        self.atomic_write(&content)?;
        Ok(())
    }

    /// Rewrite one section from the in-memory settings.
    ///
    /// Re-reads the file first so other sections keep their on-disk state.
    pub fn update_section(&mut self, section: ConfigSection) -> ConfigResult<()> {
        let current_content = if self.config_path.exists() {
            fs::read_to_string(&self.config_path)?
        } else {
            String::new()
        };

        let mut doc: DocumentMut = if current_content.is_empty() {
            DocumentMut::new()
        } else {
            current_content.parse()?
        };

        let section_doc: DocumentMut = self.section_toml(section)?.parse()?;
        doc[section.table_name()] = Item::Table(section_doc.as_table().clone());

        self.atomic_write(&doc.to_string())?;
        Ok(())
    }

    fn section_toml(&self, section: ConfigSection) -> ConfigResult<String> {
        let s = &self.settings;
        let content = match section {
            ConfigSection::Paths => toml::to_string_pretty(&s.paths)?,
            ConfigSection::Logging => toml::to_string_pretty(&s.logging)?,
            ConfigSection::Analysis => toml::to_string_pretty(&s.analysis)?,
            ConfigSection::Timeline => toml::to_string_pretty(&s.timeline)?,
            ConfigSection::Selection => toml::to_string_pretty(&s.selection)?,
            ConfigSection::Output => toml::to_string_pretty(&s.output)?,
            ConfigSection::Probe => toml::to_string_pretty(&s.probe)?,
        };
        Ok(content)
    }

    fn generate_config_with_comments(&self) -> ConfigResult<String> {
        let mut output = String::new();
        output.push_str("# MultiTake configuration\n");
        output.push_str(
            "# This file is auto-generated. Comments may be preserved on section updates.\n",
        );

        for section in ConfigSection::ALL {
            output.push('\n');
            output.push_str(&format!("# {}\n", section.description()));
            output.push_str(&format!("[{}]\n", section.table_name()));
            for line in self.section_toml(section)?.lines() {
                output.push_str(line);
                output.push('\n');
            }
        }

        Ok(output)
    }

    fn atomic_write(&self, content: &str) -> io::Result<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Same directory so the rename stays on one filesystem
        let temp_path = self.config_path.with_extension("toml.tmp");
        {
            let mut file = fs::File::create(&temp_path)?;
            file.write_all(content.as_bytes())?;
            file.sync_all()?;
        }

        fs::rename(&temp_path, &self.config_path)?;
        Ok(())
    }
}

fn parse_and_validate(content: &str) -> ConfigResult<Settings> {
    let settings: Settings = toml::from_str(content)?;
    settings.validate().map_err(ConfigError::Invalid)?;
    Ok(settings)
}

/// Parse, validate, and report whether the file needs rewriting.
fn parse_validate_and_clean(content: &str) -> ConfigResult<(Settings, bool)> {
    let doc: DocumentMut = content.parse()?;
    let settings = parse_and_validate(content)?;

    let has_unknown = doc
        .iter()
        .any(|(key, _)| !ConfigSection::ALL.iter().any(|s| s.table_name() == key));

    // A section with fewer keys than its full serialization is missing defaults
    let full: DocumentMut = toml::to_string_pretty(&settings)?.parse()?;
    let has_missing = ConfigSection::ALL.iter().any(|section| {
        let name = section.table_name();
        let expected = full
            .get(name)
            .and_then(|t| t.as_table())
            .map(|t| t.len())
            .unwrap_or(0);
        let actual = doc
            .get(name)
            .and_then(|t| t.as_table())
            .map(|t| t.len());
        actual.map_or(true, |len| len < expected)
    });

    Ok((settings, has_unknown || has_missing))
}
