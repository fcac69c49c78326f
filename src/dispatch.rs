// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Request dispatch.
//!
//! Every invocation runs in two steps. First the template store is made
//! ready: it is loaded from disk, or rebuilt from freshly synchronized
//! repositories when asked to or when nothing has been harvested yet. Then
//! the request is routed by which of application and author were given:
//!
//! | app | author | result                                   |
//! | --- | ------ | ---------------------------------------- |
//! | yes | yes    | compose file generated                   |
//! | yes | no     | authors that packaged the application    |
//! | no  | yes    | applications packaged by the author      |
//! | no  | no     | every application or author, if listing  |

use crate::{
    compose::{write_compose, ComposeError},
    config::{Layout, Settings},
    matcher::{find_match, MatchError},
    repository::{
        load_repository_file, resolve_repositories, save_repository_file, RepositoryError,
    },
    store::{StoreError, TemplateStore},
    sync::{sync_all, Synchronize},
};

use std::path::PathBuf;
use tracing::{info, warn};

/// What was asked for on the command line.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Request {
    pub app: Option<String>,
    pub author: Option<String>,
    pub list: bool,
    pub list_authors: bool,
    pub update: bool,
}

/// Result of dispatching a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Names to show, one per line.
    Listing(Vec<String>),

    /// Compose file written at path.
    Generated(PathBuf),

    /// Nothing to show.
    Idle,
}

/// Make template store ready, then dispatch request against it.
///
/// # Errors
///
/// - Return [`DispatchError`] if store preparation or dispatch fails.
pub fn run(
    syncer: &impl Synchronize,
    settings: &Settings,
    layout: &Layout,
    request: &Request,
) -> Result<Outcome> {
    let store = prepare_store(syncer, settings, layout, request.update)?;
    dispatch(&store, layout, request)
}

/// Load template store, rebuilding it first if needed.
///
/// The persisted repository list is re-resolved when updating or when it is
/// empty. The store is rebuilt from synchronized checkouts when updating or
/// when it holds no templates. Otherwise the store on disk is used as is.
///
/// # Errors
///
/// - Return [`DispatchError::Repository`] if repository list cannot be
///   resolved or persisted.
/// - Return [`DispatchError::Store`] if store cannot be loaded or saved.
pub fn prepare_store(
    syncer: &impl Synchronize,
    settings: &Settings,
    layout: &Layout,
    update: bool,
) -> Result<TemplateStore> {
    let repository_file = layout.repository_file();
    let mut repositories = load_repository_file(&repository_file)?;
    if update || repositories.is_empty() {
        repositories = resolve_repositories(
            settings.repository_list.as_deref(),
            settings.repositories.iter().cloned(),
        )?;
        save_repository_file(&repository_file, &repositories)?;
    }

    let template_file = layout.template_file();
    let store = TemplateStore::load(&template_file)?;
    if !update && !store.is_empty() {
        return Ok(store);
    }

    if repositories.is_empty() {
        warn!("no template repositories configured, set --repository or --repository-list");
    }

    let report = sync_all(syncer, &repositories, &layout.repository_folder);
    let failures = report.failures().count();
    if failures > 0 {
        warn!("{failures} repositories failed to sync");
    }

    let checkouts = report
        .synced()
        .map(|synced| (synced.repository.owner().to_string(), synced.path.clone()));
    let (store, _) = TemplateStore::rebuild(checkouts);
    store.save(&template_file)?;

    Ok(store)
}

/// Route request by which of application and author were given.
///
/// # Errors
///
/// - Return [`DispatchError::Match`] if application or author does not match
///   exactly one stored name.
/// - Return [`DispatchError::Compose`] if compose file cannot be written.
pub fn dispatch(store: &TemplateStore, layout: &Layout, request: &Request) -> Result<Outcome> {
    match (request.app.as_deref(), request.author.as_deref()) {
        (Some(app), Some(author)) => {
            let app = find_match("app", app, &store.apps())?;
            let author = find_match("author", author, &store.authors_of(app))?;
            let template = store
                .get(app, author)
                .ok_or_else(|| DispatchError::MissingTemplate {
                    app: app.to_string(),
                    author: author.to_string(),
                })?;

            let compose_file = write_compose(&layout.compose_folder, app, template)?;
            Ok(Outcome::Generated(compose_file))
        }
        (Some(app), None) => {
            let app = find_match("app", app, &store.apps())?;
            Ok(listing(store.authors_of(app)))
        }
        (None, Some(author)) => {
            let author = find_match("author", author, &store.authors())?;
            Ok(listing(store.apps_by(author)))
        }
        (None, None) if request.list => Ok(listing(store.apps())),
        (None, None) if request.list_authors => Ok(listing(store.authors())),
        (None, None) => {
            if !request.update {
                info!("nothing to do, see --help for usage");
            }
            Ok(Outcome::Idle)
        }
    }
}

fn listing(names: Vec<&str>) -> Outcome {
    Outcome::Listing(names.into_iter().map(str::to_owned).collect())
}

/// Dispatch error types.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Match(#[from] MatchError),

    #[error(transparent)]
    Compose(#[from] ComposeError),

    /// Matched names do not lead to a stored template.
    #[error("no template for {app:?} by {author:?}")]
    MissingTemplate { app: String, author: String },
}

/// Friendly result alias :3
pub type Result<T, E = DispatchError> = std::result::Result<T, E>;
