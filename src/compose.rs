// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Compose file generation.
//!
//! Turns one template into a docker-compose file holding a single service.
//! The service is named after the application, reduced to characters that
//! are safe in both service names and directory names. Every setting is
//! preceded by a comment carrying its target and the author's description,
//! since that description is usually the only documentation there is.
//!
//! # Output Layout
//!
//! Each application gets its own directory beneath the compose folder:
//! `<compose_folder>/<service>/docker-compose.yml`. Regenerating a compose
//! file moves the current one aside to `docker-compose.yml.old` first, which
//! replaces whatever backup was there before.

use crate::template::{ConfigEntry, ConfigKind, Template};

use std::{
    fmt::Write as _,
    fs::{create_dir_all, rename, write},
    path::{Path, PathBuf},
};
use tracing::{debug, info, instrument};

/// File name of generated compose file.
pub const COMPOSE_FILE_NAME: &str = "docker-compose.yml";

/// Suffix appended to compose file that gets replaced.
pub const BACKUP_SUFFIX: &str = ".old";

const INDENT: &str = "  ";

/// Reduce application name to a service name.
///
/// Keeps ASCII letters, digits, `_` and `-`, lowercased.
///
/// # Errors
///
/// - Return [`ComposeError::InvalidName`] if nothing is left.
pub fn service_name(app: &str) -> Result<String> {
    let name = app
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .map(|c| c.to_ascii_lowercase())
        .collect::<String>();

    if name.is_empty() {
        return Err(ComposeError::InvalidName(app.to_string()));
    }

    Ok(name)
}

/// Render compose file for template of target application.
///
/// # Errors
///
/// - Return [`ComposeError::InvalidName`] if application name has no
///   usable characters.
pub fn render_compose(app: &str, template: &Template) -> Result<String> {
    let service = service_name(app)?;
    let mut out = String::new();

    if let Some(description) = &template.description {
        for line in comment_lines(description) {
            push_line(&mut out, 0, &format!("# {line}"));
        }
    }

    push_line(&mut out, 0, "services:");
    push_line(&mut out, 1, &format!("{service}:"));
    push_line(&mut out, 2, &format!("image: {}", quote(&template.image)));
    push_line(&mut out, 2, &format!("container_name: {}", quote(&service)));
    push_line(&mut out, 2, "restart: unless-stopped");
    if let Some(network_mode) = &template.network_mode {
        push_line(&mut out, 2, &format!("network_mode: {}", quote(network_mode)));
    }

    for kind in ConfigKind::ALL {
        render_bucket(&mut out, kind, template);
    }

    Ok(out)
}

/// Render one bucket as a list section of the service.
///
/// A section whose every entry lacks a usable default is commented out in
/// full so the file stays valid.
fn render_bucket(out: &mut String, kind: ConfigKind, template: &Template) {
    let bucket = template.bucket(kind);
    if bucket.is_empty() {
        return;
    }

    let mut body = String::new();
    let mut active = 0;
    for (target, entry) in bucket {
        for line in entry_comment(target, entry) {
            push_line(&mut body, 3, &format!("# {line}"));
        }

        match list_item(kind, target, entry) {
            Some(item) => {
                push_line(&mut body, 3, &format!("- {}", quote(&item)));
                active += 1;
            }
            None => {
                let item = placeholder_item(kind, target);
                push_line(&mut body, 3, &format!("# - {}", quote(&item)));
            }
        }
    }

    let header = if active == 0 {
        format!("# {}:", kind.bucket_name())
    } else {
        format!("{}:", kind.bucket_name())
    };
    push_line(out, 2, &header);
    out.push_str(&body);
}

/// List item of entry, or nothing if entry cannot be used without a default.
fn list_item(kind: ConfigKind, target: &str, entry: &ConfigEntry) -> Option<String> {
    let default = entry.default.as_str();
    match kind {
        ConfigKind::Port if default.is_empty() => Some(format!("{target}:{target}")),
        ConfigKind::Port => Some(format!("{default}:{target}")),
        ConfigKind::Path if default.is_empty() => None,
        ConfigKind::Path => Some(format!("{default}:{target}")),
        ConfigKind::Device if default.is_empty() => None,
        ConfigKind::Device => Some(format!("{target}:{default}")),
        ConfigKind::Variable | ConfigKind::Label => Some(format!("{target}={default}")),
    }
}

/// Item left for the user to complete when entry has no default.
fn placeholder_item(kind: ConfigKind, target: &str) -> String {
    match kind {
        ConfigKind::Device => format!("{target}:"),
        _ => format!(":{target}"),
    }
}

/// Comment lines describing entry: target first, then its description.
fn entry_comment(target: &str, entry: &ConfigEntry) -> Vec<String> {
    // INVARIANT: Target must stay on one comment line.
    let target = comment_lines(target).join(" ");
    let mut lines = comment_lines(&entry.description);
    if lines.is_empty() {
        return vec![target];
    }

    lines[0] = format!("{target}: {}", lines[0]);
    lines
}

/// Split free text into non-blank comment lines.
///
/// Unraid markup line breaks (`[br]`) count as line breaks, and so does
/// every character YAML treats as one. Remaining control characters become
/// spaces.
fn comment_lines(text: &str) -> Vec<String> {
    text.replace("[br]", "\n")
        .split(is_line_break)
        .map(|line| {
            line.chars()
                .map(|c| if c.is_control() { ' ' } else { c })
                .collect::<String>()
        })
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
        .collect()
}

fn is_line_break(c: char) -> bool {
    matches!(c, '\n' | '\r' | '\u{85}' | '\u{2028}' | '\u{2029}')
}

fn push_line(out: &mut String, depth: usize, line: &str) {
    let _ = writeln!(out, "{}{line}", INDENT.repeat(depth));
}

/// Quote scalar as YAML double-quoted string.
fn quote(value: &str) -> String {
    // INVARIANT: JSON string literals are valid YAML double-quoted scalars.
    serde_json::to_string(value).unwrap_or_else(|_| format!("\"{value}\""))
}

/// Write compose file for template of target application.
///
/// Existing compose file is renamed with [`BACKUP_SUFFIX`] first, replacing
/// any older backup. Returns path of written compose file.
///
/// # Errors
///
/// - Return [`ComposeError::InvalidName`] if application name has no
///   usable characters.
/// - Return [`ComposeError::Write`] or [`ComposeError::Backup`] if file
///   system operations fail.
#[instrument(skip(compose_folder, template), level = "debug")]
pub fn write_compose(
    compose_folder: impl AsRef<Path>,
    app: &str,
    template: &Template,
) -> Result<PathBuf> {
    let content = render_compose(app, template)?;
    let service_dir = compose_folder.as_ref().join(service_name(app)?);
    let compose_file = service_dir.join(COMPOSE_FILE_NAME);

    create_dir_all(&service_dir).map_err(|err| ComposeError::Write {
        source: err,
        path: service_dir.clone(),
    })?;

    if compose_file.exists() {
        let backup = backup_path(&compose_file);
        debug!("back up {:?} to {:?}", compose_file.display(), backup.display());
        rename(&compose_file, &backup).map_err(|err| ComposeError::Backup {
            source: err,
            path: compose_file.clone(),
        })?;
    }

    write(&compose_file, content).map_err(|err| ComposeError::Write {
        source: err,
        path: compose_file.clone(),
    })?;
    info!("wrote {:?}", compose_file.display());

    Ok(compose_file)
}

/// Path compose file is moved to before being replaced.
pub fn backup_path(compose_file: impl AsRef<Path>) -> PathBuf {
    let mut backup = compose_file.as_ref().as_os_str().to_owned();
    backup.push(BACKUP_SUFFIX);
    PathBuf::from(backup)
}

/// Compose generation error types.
#[derive(Debug, thiserror::Error)]
pub enum ComposeError {
    /// Application name has no characters usable for a service name.
    #[error("cannot derive service name from {0:?}")]
    InvalidName(String),

    /// Compose file or its directory cannot be written.
    #[error("failed to write {:?}", path.display())]
    Write {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Existing compose file cannot be moved aside.
    #[error("failed to back up {:?}", path.display())]
    Backup {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
}

/// Friendly result alias :3
pub type Result<T, E = ComposeError> = std::result::Result<T, E>;
