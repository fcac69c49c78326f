// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Repository synchronization.
//!
//! Template repositories are mirrored locally in a one-way fashion. If a
//! repository has no checkout yet it gets cloned, otherwise its checked out
//! branch is fetched and fast-forwarded. Local checkouts are never meant to
//! be edited, so a checkout that somehow diverged from its remote is simply
//! reset onto the remote commit.
//!
//! Synchronization is best-effort. Every repository yields its own outcome
//! in a [`SyncReport`], so one unreachable repository never stops the rest
//! from being synchronized.

use crate::repository::{RepositoryError, RepositoryUrl};

use auth_git2::GitAuthenticator;
use git2::{
    build::{CheckoutBuilder, RepoBuilder},
    Config, FetchOptions, RemoteCallbacks, Repository, ResetType,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    fs::create_dir_all,
    path::{Path, PathBuf},
    time,
};
use tracing::{debug, info, instrument, warn};

/// What synchronization did to a repository checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    /// Repository was cloned fresh.
    Cloned,

    /// Existing checkout moved to newer remote commit.
    Updated,

    /// Existing checkout already matched its remote.
    UpToDate,
}

impl Display for SyncAction {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Cloned => fmt.write_str("cloned"),
            Self::Updated => fmt.write_str("updated"),
            Self::UpToDate => fmt.write_str("up to date"),
        }
    }
}

/// Layer of indirection for repository synchronization.
pub trait Synchronize {
    /// Clone repository from URL into target path.
    fn clone_repository(&self, url: &str, path: &Path) -> Result<()>;

    /// Bring existing checkout at target path up to date with its remote.
    fn pull_repository(&self, path: &Path) -> Result<SyncAction>;

    /// Ensure checkout of repository exists beneath target root.
    ///
    /// Clones if the checkout is missing, pulls otherwise. Returns the
    /// checkout path along with what was done to it.
    fn sync(
        &self,
        repository: &RepositoryUrl,
        root: &Path,
    ) -> Result<(PathBuf, SyncAction)> {
        let path = repository.checkout_path(root);

        if path.join(".git").exists() {
            info!("update {repository}");
            let action = self.pull_repository(&path)?;
            return Ok((path, action));
        }

        info!("clone {repository}");
        if let Some(parent) = path.parent() {
            create_dir_all(parent).map_err(|err| SyncError::CreateDir {
                source: err,
                path: parent.to_path_buf(),
            })?;
        }
        self.clone_repository(repository.clone_url(), &path)?;

        Ok((path, SyncAction::Cloned))
    }
}

/// Repository synchronization through libgit2.
///
/// Credentials come from ssh-agent and git credential helpers. Nothing is
/// prompted for, a repository that needs interactive credentials fails like
/// any other unreachable repository.
#[derive(Debug, Default, Clone)]
pub struct Git2Sync {
    hide_progress: bool,
}

impl Git2Sync {
    /// Construct new synchronizer that draws transfer progress.
    pub fn new() -> Self {
        Self::default()
    }

    /// Construct new synchronizer that draws nothing.
    pub fn quiet() -> Self {
        Self {
            hide_progress: true,
        }
    }

    fn progress_bar(&self, message: impl Into<String>) -> Result<ProgressBar> {
        if self.hide_progress {
            return Ok(ProgressBar::hidden());
        }

        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{elapsed_precise:.green}  {msg:<50}  [{wide_bar:.yellow/blue}]",
        )?
        .progress_chars("-Cco.");
        bar.set_style(style);
        bar.set_message(message.into());
        bar.enable_steady_tick(time::Duration::from_millis(100));

        Ok(bar)
    }

    /// Run git operation with authenticated fetch options that drive a
    /// progress bar.
    fn with_fetch_options<T>(
        &self,
        message: impl Into<String>,
        operation: impl FnOnce(FetchOptions<'_>) -> Result<T>,
    ) -> Result<T> {
        let bar = self.progress_bar(message)?;
        let authenticator = GitAuthenticator::default()
            .try_password_prompt(0)
            .prompt_ssh_key_password(false);
        let config = Config::open_default()?;

        let progress = bar.clone();
        let mut throttle = time::Instant::now();
        let mut rc = RemoteCallbacks::new();
        rc.credentials(authenticator.credentials(&config));
        rc.transfer_progress(move |stats| {
            if throttle.elapsed() > time::Duration::from_millis(10) {
                throttle = time::Instant::now();
                progress.set_length(stats.total_objects() as u64);
                progress.set_position(stats.received_objects() as u64);
            }
            true
        });

        let mut fo = FetchOptions::new();
        fo.remote_callbacks(rc);
        let result = operation(fo);
        bar.finish_and_clear();

        result
    }
}

impl Synchronize for Git2Sync {
    #[instrument(skip(self), level = "debug")]
    fn clone_repository(&self, url: &str, path: &Path) -> Result<()> {
        self.with_fetch_options(url, |fo| {
            let _ = RepoBuilder::new().fetch_options(fo).clone(url, path)?;
            Ok(())
        })
    }

    #[instrument(skip(self), level = "debug")]
    fn pull_repository(&self, path: &Path) -> Result<SyncAction> {
        let repository = Repository::open(path)?;
        let head = repository.head()?;
        if !head.is_branch() {
            return Err(SyncError::DetachedHead {
                path: path.to_path_buf(),
            });
        }

        let refname = head.name().unwrap_or("HEAD").to_string();
        let branch = head.shorthand().unwrap_or("HEAD").to_string();
        debug!("fetch branch {branch} of {:?}", path.display());

        let mut remote = repository.find_remote("origin")?;
        self.with_fetch_options(path.display().to_string(), |mut fo| {
            remote.fetch(&[branch.as_str()], Some(&mut fo), None)?;
            Ok(())
        })?;

        let fetch_head = repository.find_reference("FETCH_HEAD")?;
        let fetch_commit = repository.reference_to_annotated_commit(&fetch_head)?;
        let (analysis, _) = repository.merge_analysis(&[&fetch_commit])?;

        if analysis.is_up_to_date() {
            return Ok(SyncAction::UpToDate);
        }

        if analysis.is_fast_forward() {
            let mut reference = repository.find_reference(&refname)?;
            reference.set_target(fetch_commit.id(), "unraid-compose: fast-forward")?;
            repository.set_head(&refname)?;
            repository.checkout_head(Some(CheckoutBuilder::default().force()))?;
            return Ok(SyncAction::Updated);
        }

        // INVARIANT: Checkouts are mirrors, remote always wins.
        warn!(
            "checkout {:?} diverged from remote, resetting onto remote",
            path.display()
        );
        let target = repository.find_object(fetch_commit.id(), None)?;
        repository.reset(&target, ResetType::Hard, None)?;

        Ok(SyncAction::Updated)
    }
}

/// Successfully synchronized repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncedRepository {
    pub repository: RepositoryUrl,
    pub path: PathBuf,
    pub action: SyncAction,
}

/// Outcome of synchronizing one repository.
#[derive(Debug)]
pub struct SyncOutcome {
    pub url: String,
    pub result: Result<SyncedRepository>,
}

/// Outcomes of synchronizing a batch of repositories.
#[derive(Debug, Default)]
pub struct SyncReport {
    pub outcomes: Vec<SyncOutcome>,
}

impl SyncReport {
    /// Repositories that synchronized successfully.
    pub fn synced(&self) -> impl Iterator<Item = &SyncedRepository> {
        self.outcomes
            .iter()
            .filter_map(|outcome| outcome.result.as_ref().ok())
    }

    /// Repositories that failed to synchronize.
    pub fn failures(&self) -> impl Iterator<Item = (&str, &SyncError)> {
        self.outcomes.iter().filter_map(|outcome| match &outcome.result {
            Ok(_) => None,
            Err(error) => Some((outcome.url.as_str(), error)),
        })
    }
}

/// Synchronize every repository in listing beneath target root.
///
/// Repositories are handled one at a time in listing order. Failures are
/// logged and recorded, then skipped.
pub fn sync_all(
    syncer: &impl Synchronize,
    urls: impl IntoIterator<Item = impl AsRef<str>>,
    root: impl AsRef<Path>,
) -> SyncReport {
    let mut report = SyncReport::default();

    for url in urls {
        let url = url.as_ref();
        let result = RepositoryUrl::parse(url)
            .map_err(SyncError::from)
            .and_then(|repository| {
                let (path, action) = syncer.sync(&repository, root.as_ref())?;
                Ok(SyncedRepository {
                    repository,
                    path,
                    action,
                })
            });

        match &result {
            Ok(synced) => debug!("{} {}", synced.repository, synced.action),
            Err(error) => warn!("failed to sync {url}: {error}"),
        }

        report.outcomes.push(SyncOutcome {
            url: url.to_string(),
            result,
        });
    }

    report
}

/// Repository synchronization error types.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Repository URL is malformed.
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// Checkout directory cannot be created.
    #[error("failed to create checkout directory at {:?}", path.display())]
    CreateDir {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Checkout is not on a branch, so there is nothing to fast-forward.
    #[error("checkout at {:?} has detached HEAD", path.display())]
    DetachedHead { path: PathBuf },

    /// Style template cannot be set for progress bars.
    #[error(transparent)]
    IndicatifStyleTemplate(#[from] indicatif::style::TemplateError),

    /// Operations from libgit2 fail.
    #[error(transparent)]
    Git2(#[from] git2::Error),
}

/// Friendly result alias :3
pub type Result<T, E = SyncError> = std::result::Result<T, E>;
