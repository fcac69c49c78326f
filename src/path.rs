// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Path resolution utilities.
//!
//! Determine default locations for the files that unraid-compose reads and
//! writes. Repository checkouts default to a subdirectory of the template
//! folder, see [`Layout`](crate::config::Layout).

use std::path::PathBuf;

/// Name of directory used under the platform data and config directories.
const APP_DIR_NAME: &str = "unraid-compose";

/// Determine default absolute path to the template folder.
///
/// Uses XDG Base Directory path `$XDG_DATA_HOME/unraid-compose` as the
/// default. The template store and persisted repository list live here. Does
/// not check if the path returned actually exists.
///
/// # Errors
///
/// - Return [`NoWayHome`] if the data directory cannot be determined.
///
/// # See Also
///
/// - [XDG Base Directory](https://wiki.archlinux.org/title/XDG_Base_Directory)
pub fn default_template_dir() -> Result<PathBuf> {
    dirs::data_dir()
        .map(|path| path.join(APP_DIR_NAME))
        .ok_or(NoWayHome)
}

/// Determine default absolute path to the settings file.
///
/// # Errors
///
/// - Return [`NoWayHome`] if the config directory cannot be determined.
pub fn default_settings_file() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|path| path.join(APP_DIR_NAME).join("config.toml"))
        .ok_or(NoWayHome)
}

/// No way to determine user's data or config directories.
///
/// # See Also
///
/// - [`dirs::data_dir`](https://docs.rs/dirs/latest/dirs/fn.data_dir.html)
#[derive(Clone, Debug, thiserror::Error)]
#[error("cannot determine absolute path to user's data or config directory")]
pub struct NoWayHome;

/// Friendly result alias :3
pub type Result<T, E = NoWayHome> = std::result::Result<T, E>;
