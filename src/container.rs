// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Container launching.
//!
//! Generated compose files can be brought up right away through whichever
//! container system the host runs. Both Docker and Podman ship a `compose`
//! subcommand that accepts the same arguments, so only the binary differs.

use std::{
    ffi::{OsStr, OsString},
    fmt,
    path::{Path, PathBuf},
    process::Command,
};
use tracing::{info, instrument};

/// Container system used to launch compose files.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ContainerSystem {
    #[default]
    Docker,
    Podman,
}

impl ContainerSystem {
    /// Name of binary to invoke.
    pub fn binary(&self) -> &'static str {
        match self {
            Self::Docker => "docker",
            Self::Podman => "podman",
        }
    }
}

impl fmt::Display for ContainerSystem {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.write_str(self.binary())
    }
}

/// Start services of target compose file in the background.
///
/// Runs `<system> compose -f <file> up -d` and returns whatever the command
/// printed.
///
/// # Errors
///
/// - Return [`ContainerError::MissingComposeFile`] if compose file does not
///   exist.
/// - Return [`ContainerError::Syscall`] if the command cannot be spawned or
///   exits unsuccessfully.
#[instrument(level = "debug")]
pub fn compose_up(system: ContainerSystem, compose_file: &Path) -> Result<String> {
    if !compose_file.is_file() {
        return Err(ContainerError::MissingComposeFile {
            path: compose_file.to_path_buf(),
        });
    }

    info!("start {:?} with {system}", compose_file.display());
    syscall_non_interactive(system.binary(), compose_up_args(compose_file))
}

fn compose_up_args(compose_file: &Path) -> Vec<OsString> {
    vec![
        "compose".into(),
        "-f".into(),
        compose_file.as_os_str().to_os_string(),
        "up".into(),
        "-d".into(),
    ]
}

fn syscall_non_interactive(
    cmd: impl AsRef<OsStr>,
    args: impl IntoIterator<Item = impl AsRef<OsStr>>,
) -> Result<String> {
    let output = Command::new(cmd.as_ref())
        .args(args)
        .output()
        .map_err(|source| ContainerError::Syscall {
            source,
            command: cmd.as_ref().to_os_string(),
        })?;
    let stdout = String::from_utf8_lossy(output.stdout.as_slice()).into_owned();
    let stderr = String::from_utf8_lossy(output.stderr.as_slice()).into_owned();
    let mut message = String::new();

    if !stdout.is_empty() {
        message.push_str(format!("stdout: {stdout}").as_str());
    }

    if !stderr.is_empty() {
        message.push_str(format!("stderr: {stderr}").as_str());
    }

    // INVARIANT: Chomp trailing newlines.
    let message = message
        .strip_suffix("\r\n")
        .or(message.strip_suffix('\n'))
        .map(ToString::to_string)
        .unwrap_or(message);

    if !output.status.success() {
        return Err(ContainerError::Syscall {
            source: std::io::Error::other(format!("exited with {}:\n{message}", output.status)),
            command: cmd.as_ref().to_os_string(),
        });
    }

    Ok(message)
}

/// Container launch error types.
#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
    /// Compose file to launch does not exist.
    #[error("compose file {:?} does not exist", path.display())]
    MissingComposeFile { path: PathBuf },

    /// Command failed to run or exited unsuccessfully.
    #[error("command {command:?} failed")]
    Syscall {
        #[source]
        source: std::io::Error,
        command: OsString,
    },
}

/// Friendly result alias :3
pub type Result<T, E = ContainerError> = std::result::Result<T, E>;
