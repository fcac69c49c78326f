// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Template store management.
//!
//! Every parsed template is collected into the __template store__, a two
//! level mapping of application name to author to template. The same
//! application is commonly packaged by several authors, so the author level
//! keeps their templates apart. Within one author, a later template with the
//! same application name simply replaces the earlier one.
//!
//! # Template Store Layout
//!
//! The store is persisted as pretty-printed JSON with sorted keys:
//!
//! ```json
//! {
//!     "Sonarr": {
//!         "linuxserver": {
//!             "image": "lscr.io/linuxserver/sonarr",
//!             "description": "Smart PVR",
//!             "network_mode": "bridge",
//!             "ports": {
//!                 "8989": { "Default": "8989", "Description": "web ui" }
//!             },
//!             "volumes": {},
//!             ...
//!         }
//!     }
//! }
//! ```
//!
//! The store is never updated in place. A refresh rebuilds it from scratch
//! out of the current repository checkouts and then overwrites the file.

use crate::{
    scan::{scan_templates, ScanError},
    template::{parse_template, Template, TemplateEntry, TemplateError},
};

use serde::{Deserialize, Serialize};
use serde_json::ser::{PrettyFormatter, Serializer};
use std::{
    collections::{BTreeMap, BTreeSet},
    fs::{create_dir_all, read, write},
    path::{Path, PathBuf},
};
use tracing::{debug, info, instrument, warn};

/// Templates keyed by application name, then by author.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(transparent)]
pub struct TemplateStore {
    apps: BTreeMap<String, BTreeMap<String, Template>>,
}

impl TemplateStore {
    /// Construct new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert parsed template, replacing any template with the same
    /// application and author.
    pub fn insert(&mut self, entry: TemplateEntry) {
        let TemplateEntry {
            app,
            author,
            mut template,
        } = entry;
        template.name.clone_from(&app);

        if let Some(previous) = self
            .apps
            .entry(app)
            .or_default()
            .insert(author.clone(), template)
        {
            debug!("replace template {:?} by {author}", previous.name);
        }
    }

    /// Look up template by exact application and author.
    pub fn get(&self, app: &str, author: &str) -> Option<&Template> {
        self.apps.get(app).and_then(|authors| authors.get(author))
    }

    /// Application names in sorted order.
    pub fn apps(&self) -> Vec<&str> {
        self.apps.keys().map(String::as_str).collect()
    }

    /// Authors that packaged target application, in sorted order.
    pub fn authors_of(&self, app: &str) -> Vec<&str> {
        self.apps
            .get(app)
            .map(|authors| authors.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Every distinct author in sorted order.
    pub fn authors(&self) -> Vec<&str> {
        self.apps
            .values()
            .flat_map(|authors| authors.keys().map(String::as_str))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Applications packaged by target author, in sorted order.
    pub fn apps_by(&self, author: &str) -> Vec<&str> {
        self.apps
            .iter()
            .filter(|(_, authors)| authors.contains_key(author))
            .map(|(app, _)| app.as_str())
            .collect()
    }

    /// Number of templates across all applications and authors.
    pub fn len(&self) -> usize {
        self.apps.values().map(BTreeMap::len).sum()
    }

    /// Check if store holds no templates.
    pub fn is_empty(&self) -> bool {
        self.apps.is_empty()
    }

    /// Load template store from JSON file.
    ///
    /// A missing file yields an empty store.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::Read`] if file exists but cannot be read.
    /// - Return [`StoreError::Deserialize`] if file is malformed.
    #[instrument(skip(path), level = "debug")]
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!("no template store at {:?}", path.display());
            return Ok(Self::new());
        }

        info!("load templates from {:?}", path.display());
        let content = read(path).map_err(|err| StoreError::Read {
            source: err,
            path: path.to_path_buf(),
        })?;
        let mut store: Self =
            serde_json::from_slice(&content).map_err(|err| StoreError::Deserialize {
                source: err,
                path: path.to_path_buf(),
            })?;

        // INVARIANT: Names are not persisted, restore them from their keys.
        for (app, authors) in store.apps.iter_mut() {
            for template in authors.values_mut() {
                template.name.clone_from(app);
            }
        }

        Ok(store)
    }

    /// Save template store as pretty-printed JSON with sorted keys.
    ///
    /// Overwrites existing file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::Write`] if file cannot be written.
    /// - Return [`StoreError::Serialize`] if store cannot be serialized.
    #[instrument(skip(self, path), level = "debug")]
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let to_write_error = |err| StoreError::Write {
            source: err,
            path: path.to_path_buf(),
        };

        let mut buffer = Vec::new();
        let mut serializer =
            Serializer::with_formatter(&mut buffer, PrettyFormatter::with_indent(b"    "));
        self.serialize(&mut serializer)?;
        buffer.push(b'\n');

        if let Some(parent) = path.parent() {
            create_dir_all(parent).map_err(to_write_error)?;
        }
        write(path, buffer).map_err(to_write_error)?;
        info!("saved {} templates to {:?}", self.len(), path.display());

        Ok(())
    }

    /// Rebuild template store from scratch out of repository checkouts.
    ///
    /// Each checkout is given as its author and root directory. Checkouts
    /// are processed in order, and templates found later replace earlier
    /// ones with the same application and author. Files that cannot be read
    /// or parsed are logged, recorded in the report, and skipped.
    pub fn rebuild(
        checkouts: impl IntoIterator<Item = (impl Into<String>, impl AsRef<Path>)>,
    ) -> (Self, BuildReport) {
        let mut store = Self::new();
        let mut report = BuildReport::default();

        for (author, root) in checkouts {
            let author: String = author.into();
            let files = match scan_templates(root.as_ref()) {
                Ok(files) => files,
                Err(error) => {
                    warn!("{error}");
                    report.skipped.push(error.into());
                    continue;
                }
            };

            for file in files {
                match read_template(&file, &author) {
                    Ok(entry) => {
                        store.insert(entry);
                        report.parsed += 1;
                    }
                    Err(error) => {
                        warn!("skip template: {error}");
                        report.skipped.push(error);
                    }
                }
            }
        }

        info!(
            "parsed {} template files, skipped {}",
            report.parsed,
            report.skipped.len()
        );

        (store, report)
    }
}

fn read_template(path: &Path, author: &str) -> Result<TemplateEntry> {
    let content = read(path).map_err(|err| StoreError::Read {
        source: err,
        path: path.to_path_buf(),
    })?;

    Ok(parse_template(
        &String::from_utf8_lossy(&content),
        author,
        path,
    )?)
}

/// Outcome of rebuilding template store.
#[derive(Debug, Default)]
pub struct BuildReport {
    /// Number of template files parsed successfully.
    pub parsed: usize,

    /// Files and checkouts that were skipped, with the reason why.
    pub skipped: Vec<StoreError>,
}

/// Template store error types.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// File cannot be read.
    #[error("failed to read {:?}", path.display())]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Store file cannot be written.
    #[error("failed to write template store at {:?}", path.display())]
    Write {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Store file is malformed.
    #[error("malformed template store at {:?}", path.display())]
    Deserialize {
        #[source]
        source: serde_json::Error,
        path: PathBuf,
    },

    /// Store cannot be serialized.
    #[error(transparent)]
    Serialize(#[from] serde_json::Error),

    /// Checkout cannot be scanned.
    #[error(transparent)]
    Scan(#[from] ScanError),

    /// Template cannot be parsed.
    #[error(transparent)]
    Template(#[from] TemplateError),
}

/// Friendly result alias :3
pub type Result<T, E = StoreError> = std::result::Result<T, E>;
