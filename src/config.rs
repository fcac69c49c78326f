// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Configuration layout.
//!
//! Unraid-compose is configured in layers. Built-in defaults come first,
//! followed by an optional TOML settings file, followed by environment
//! variables and command-line flags. The [`Settings`] type models one layer,
//! and [`Settings::merge`] stacks them. Once merged, [`Layout`] resolves the
//! concrete folders that every other component works with.

use crate::path::{default_template_dir, NoWayHome};

use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Error as FmtError, Formatter, Result as FmtResult},
    fs::read_to_string,
    path::{Path, PathBuf},
    str::FromStr,
};

/// File name of template store inside template folder.
pub const TEMPLATE_FILE_NAME: &str = "templates.json";

/// File name of persisted repository list inside template folder.
pub const REPOSITORY_FILE_NAME: &str = "repositories.txt";

/// One layer of settings.
///
/// Every field is optional so that a layer only needs to mention what it
/// wants to override.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Folder holding the template store and persisted repository list.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_folder: Option<PathBuf>,

    /// Folder holding repository checkouts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository_folder: Option<PathBuf>,

    /// Folder that receives one subdirectory per generated compose file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compose_folder: Option<PathBuf>,

    /// URL of JSON feed listing template repositories.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository_list: Option<String>,

    /// Explicit template repository URLs.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub repositories: Vec<String>,
}

impl Settings {
    /// Load settings file from target path.
    ///
    /// A missing settings file is not an error, it simply yields an empty
    /// layer.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::Read`] if settings file exists but cannot be
    ///   read.
    /// - Return [`ConfigError::Deserialize`] if settings file is malformed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        read_to_string(path)
            .map_err(|err| ConfigError::Read {
                source: err,
                path: path.to_path_buf(),
            })?
            .parse()
    }

    /// Stack another layer on top of this one.
    ///
    /// Values present in `overrides` win. An empty repository listing in
    /// `overrides` keeps the current listing.
    pub fn merge(self, overrides: Settings) -> Self {
        Self {
            template_folder: overrides.template_folder.or(self.template_folder),
            repository_folder: overrides.repository_folder.or(self.repository_folder),
            compose_folder: overrides.compose_folder.or(self.compose_folder),
            repository_list: overrides.repository_list.or(self.repository_list),
            repositories: if overrides.repositories.is_empty() {
                self.repositories
            } else {
                overrides.repositories
            },
        }
    }
}

impl FromStr for Settings {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        toml::de::from_str(data).map_err(ConfigError::Deserialize)
    }
}

impl Display for Settings {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(
            toml::ser::to_string_pretty(self)
                .map_err(ConfigError::Serialize)?
                .as_str(),
        )
    }
}

/// Concrete folder layout derived from merged settings.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Layout {
    /// Folder holding the template store and persisted repository list.
    pub template_folder: PathBuf,

    /// Folder holding repository checkouts.
    pub repository_folder: PathBuf,

    /// Folder that receives generated compose files.
    pub compose_folder: PathBuf,
}

impl Layout {
    /// Resolve folder layout from settings.
    ///
    /// Unset folders fall back to defaults: template folder to
    /// `$XDG_DATA_HOME/unraid-compose`, repository folder to
    /// `<template_folder>/repositories`, and compose folder to the current
    /// directory. Every folder undergoes shell expansion.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::NoWayHome`] if default template folder cannot
    ///   be determined.
    /// - Return [`ConfigError::ShellExpansion`] if a folder references an
    ///   undefined variable.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let template_folder = match &settings.template_folder {
            Some(path) => expand_path(path)?,
            None => default_template_dir()?,
        };

        // INVARIANT: Checkouts follow the template folder unless told otherwise.
        let repository_folder = match &settings.repository_folder {
            Some(path) => expand_path(path)?,
            None => template_folder.join("repositories"),
        };

        let compose_folder = match &settings.compose_folder {
            Some(path) => expand_path(path)?,
            None => PathBuf::from("."),
        };

        Ok(Self {
            template_folder,
            repository_folder,
            compose_folder,
        })
    }

    /// Path to template store file.
    pub fn template_file(&self) -> PathBuf {
        self.template_folder.join(TEMPLATE_FILE_NAME)
    }

    /// Path to persisted repository list.
    pub fn repository_file(&self) -> PathBuf {
        self.template_folder.join(REPOSITORY_FILE_NAME)
    }
}

/// Load environment file at target path into the process environment.
///
/// Variables that are already set keep their value. Returns whether a file
/// was loaded, a missing file is not an error.
///
/// # Errors
///
/// - Return [`ConfigError::EnvFile`] if environment file is malformed.
pub fn load_env_file(path: impl AsRef<Path>) -> Result<bool> {
    let path = path.as_ref();
    if !path.is_file() {
        return Ok(false);
    }

    dotenvy::from_path(path).map_err(|err| ConfigError::EnvFile {
        source: err,
        path: path.to_path_buf(),
    })?;

    Ok(true)
}

fn expand_path(path: &Path) -> Result<PathBuf> {
    Ok(PathBuf::from(
        shellexpand::full(path.to_string_lossy().as_ref())
            .map_err(ConfigError::ShellExpansion)?
            .into_owned(),
    ))
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read settings file.
    #[error("failed to read settings file at {:?}", path.display())]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Failed to load environment file.
    #[error("failed to load environment file at {:?}", path.display())]
    EnvFile {
        #[source]
        source: dotenvy::Error,
        path: PathBuf,
    },

    /// Failed to deserialize configuration.
    #[error(transparent)]
    Deserialize(#[from] toml::de::Error),

    /// Failed to serialize configuration.
    #[error(transparent)]
    Serialize(#[from] toml::ser::Error),

    /// Failed to perform shell expansion on configuration.
    #[error(transparent)]
    ShellExpansion(#[from] shellexpand::LookupError<std::env::VarError>),

    /// Failed to determine default folders.
    #[error(transparent)]
    NoWayHome(#[from] NoWayHome),
}

impl From<ConfigError> for FmtError {
    fn from(_: ConfigError) -> Self {
        FmtError
    }
}

/// Friendly result alias :3
type Result<T, E = ConfigError> = std::result::Result<T, E>;
