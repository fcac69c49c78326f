// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Template repository listing.
//!
//! Unraid templates are spread across many git repositories, one or more per
//! template author. This module figures out _which_ repositories to harvest:
//! they come from an explicit listing, from a remote JSON feed whose entries
//! carry a `url` field, or from the listing persisted by a previous run.
//!
//! # Repository Identity
//!
//! A repository is identified by the owner and name found in its URL path,
//! e.g., `https://github.com/linuxserver/templates` belongs to owner
//! `linuxserver` and is named `templates`. The owner doubles as the author
//! of every template found inside the repository, and the pair determines
//! where the repository is checked out locally.

use serde::Deserialize;
use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    fs::{create_dir_all, read_to_string, write},
    path::{Path, PathBuf},
};
use tracing::{debug, info, instrument};
use url::Url;

/// URL of a template repository along with its identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepositoryUrl {
    owner: String,
    name: String,
    clone_url: String,
}

impl RepositoryUrl {
    /// Parse repository URL.
    ///
    /// For network URLs the owner and name are the first two path segments,
    /// and any trailing segments (e.g. `/tree/master`) are dropped from the
    /// URL used to clone. For `file://` URLs the owner and name are the last
    /// two path segments and the URL is kept as is. A `.git` suffix is
    /// removed from the name but kept in the clone URL.
    ///
    /// # Errors
    ///
    /// - Return [`RepositoryError::InvalidUrl`] if URL cannot be parsed.
    /// - Return [`RepositoryError::MissingSegments`] if URL path does not
    ///   hold both owner and name.
    pub fn parse(raw: impl AsRef<str>) -> Result<Self> {
        let raw = raw.as_ref().trim();
        let mut url = Url::parse(raw).map_err(|err| RepositoryError::InvalidUrl {
            source: err,
            url: raw.to_string(),
        })?;

        let segments = url
            .path_segments()
            .map(|segments| {
                segments
                    .filter(|segment| !segment.is_empty())
                    .map(str::to_owned)
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        if segments.len() < 2 {
            return Err(RepositoryError::MissingSegments {
                url: raw.to_string(),
            });
        }

        let (owner, name) = if url.scheme() == "file" {
            let len = segments.len();
            (segments[len - 2].clone(), segments[len - 1].clone())
        } else {
            url.set_path(&format!("/{}/{}", segments[0], segments[1]));
            url.set_query(None);
            url.set_fragment(None);
            (segments[0].clone(), segments[1].clone())
        };

        let clone_url = if url.scheme() == "file" {
            raw.to_string()
        } else {
            url.to_string()
        };

        Ok(Self {
            name: name.strip_suffix(".git").unwrap_or(&name).to_string(),
            owner,
            clone_url,
        })
    }

    /// Owner of repository, used as author of its templates.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Name of repository.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// URL to clone repository from.
    pub fn clone_url(&self) -> &str {
        &self.clone_url
    }

    /// Local checkout path of repository beneath target root.
    pub fn checkout_path(&self, root: impl AsRef<Path>) -> PathBuf {
        root.as_ref().join(&self.owner).join(&self.name)
    }
}

impl Display for RepositoryUrl {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        write!(fmt, "{}/{}", self.owner, self.name)
    }
}

/// Entry of repository list feed.
#[derive(Debug, Deserialize)]
struct FeedEntry {
    url: Option<String>,
}

/// Parse body of repository list feed.
///
/// The feed is a JSON array of objects each holding a `url` field. Other
/// fields are ignored, and so are entries without a URL.
///
/// # Errors
///
/// - Return [`RepositoryError::Feed`] if body is not a JSON array of objects.
pub fn parse_repository_feed(body: &str) -> Result<Vec<String>> {
    let entries: Vec<FeedEntry> = serde_json::from_str(body)?;
    Ok(entries
        .into_iter()
        .filter_map(|entry| {
            if entry.url.is_none() {
                debug!("skip feed entry without url");
            }
            entry.url
        })
        .map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty())
        .collect())
}

/// Fetch repository list feed from target URL.
///
/// # Errors
///
/// - Return [`RepositoryError::Http`] if feed cannot be downloaded.
/// - Return [`RepositoryError::Feed`] if feed is malformed.
#[instrument(level = "debug")]
pub fn fetch_repository_feed(feed_url: &str) -> Result<Vec<String>> {
    info!("fetch repository list from {feed_url}");
    let client = reqwest::blocking::Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()?;
    let body = client.get(feed_url).send()?.error_for_status()?.text()?;

    parse_repository_feed(&body)
}

/// Resolve full repository listing.
///
/// Feed entries come first, followed by explicit repositories. Exact
/// duplicates are dropped, first occurrence wins.
///
/// # Errors
///
/// - Return [`RepositoryError::Http`] or [`RepositoryError::Feed`] if feed
///   is given but cannot be fetched.
pub fn resolve_repositories(
    feed_url: Option<&str>,
    explicit: impl IntoIterator<Item = impl Into<String>>,
) -> Result<Vec<String>> {
    let mut repositories = match feed_url {
        Some(feed_url) => fetch_repository_feed(feed_url)?,
        None => Vec::new(),
    };
    repositories.extend(explicit.into_iter().map(Into::into));

    Ok(dedup_repositories(repositories))
}

fn dedup_repositories(repositories: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    repositories
        .into_iter()
        .map(|repository| repository.trim().to_string())
        .filter(|repository| !repository.is_empty() && seen.insert(repository.clone()))
        .collect()
}

/// Load persisted repository listing.
///
/// One URL per line, blank lines skipped. A missing file yields an empty
/// listing.
///
/// # Errors
///
/// - Return [`RepositoryError::Read`] if file exists but cannot be read.
pub fn load_repository_file(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(Vec::new());
    }

    let content = read_to_string(path).map_err(|err| RepositoryError::Read {
        source: err,
        path: path.to_path_buf(),
    })?;

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_owned)
        .collect())
}

/// Persist repository listing, one URL per line.
///
/// # Errors
///
/// - Return [`RepositoryError::Write`] if file or its parent directory
///   cannot be written.
pub fn save_repository_file(
    path: impl AsRef<Path>,
    repositories: impl IntoIterator<Item = impl AsRef<str>>,
) -> Result<()> {
    let path = path.as_ref();
    let to_write_error = |err| RepositoryError::Write {
        source: err,
        path: path.to_path_buf(),
    };

    if let Some(parent) = path.parent() {
        create_dir_all(parent).map_err(to_write_error)?;
    }

    let mut content = String::new();
    for repository in repositories {
        content.push_str(repository.as_ref());
        content.push('\n');
    }

    write(path, content).map_err(to_write_error)
}

/// Repository listing error types.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// Repository URL cannot be parsed.
    #[error("invalid repository url {url:?}")]
    InvalidUrl {
        #[source]
        source: url::ParseError,
        url: String,
    },

    /// Repository URL lacks owner or name.
    #[error("repository url {url:?} does not name an owner and repository")]
    MissingSegments { url: String },

    /// Repository list feed cannot be downloaded.
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// Repository list feed is malformed.
    #[error("malformed repository list feed")]
    Feed(#[from] serde_json::Error),

    /// Persisted repository listing cannot be read.
    #[error("failed to read repository list at {:?}", path.display())]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Persisted repository listing cannot be written.
    #[error("failed to write repository list at {:?}", path.display())]
    Write {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
}

/// Friendly result alias :3
pub type Result<T, E = RepositoryError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;
    use simple_test_case::test_case;

    #[test_case(
        "https://github.com/linuxserver/templates",
        "linuxserver", "templates", "https://github.com/linuxserver/templates";
        "plain"
    )]
    #[test_case(
        "https://github.com/binhex/docker-templates/tree/master/binhex",
        "binhex", "docker-templates", "https://github.com/binhex/docker-templates";
        "trailing tree path"
    )]
    #[test_case(
        "https://gitlab.com/foo/bar.git/",
        "foo", "bar", "https://gitlab.com/foo/bar.git";
        "git suffix"
    )]
    #[test_case(
        "file:///srv/remotes/selfhosters/unraid-templates",
        "selfhosters", "unraid-templates", "file:///srv/remotes/selfhosters/unraid-templates";
        "local file"
    )]
    #[test]
    fn parse_repository_url(raw: &str, owner: &str, name: &str, clone_url: &str) {
        let result = RepositoryUrl::parse(raw).unwrap();
        pretty_assertions::assert_eq!(result.owner(), owner);
        pretty_assertions::assert_eq!(result.name(), name);
        pretty_assertions::assert_eq!(result.clone_url(), clone_url);
    }

    #[test_case("github.com/foo/bar"; "no scheme")]
    #[test_case("https://github.com/foo"; "owner only")]
    #[test]
    fn parse_repository_url_rejects_malformed(raw: &str) {
        assert!(RepositoryUrl::parse(raw).is_err());
    }

    #[test]
    fn checkout_path_uses_owner_and_name() {
        let repository = RepositoryUrl::parse("https://github.com/foo/bar.git").unwrap();
        assert_eq!(
            repository.checkout_path("/srv/checkouts"),
            PathBuf::from("/srv/checkouts/foo/bar")
        );
        assert_eq!(repository.to_string(), "foo/bar");
    }

    #[test]
    fn parse_feed_keeps_urls_only() -> anyhow::Result<()> {
        let body = indoc! {r#"
            [
                {"name": "linuxserver", "url": "https://github.com/linuxserver/templates"},
                {"name": "no url here"},
                {"url": "  https://github.com/binhex/docker-templates  "}
            ]
        "#};

        let result = parse_repository_feed(body)?;
        let expect = vec![
            "https://github.com/linuxserver/templates".to_string(),
            "https://github.com/binhex/docker-templates".to_string(),
        ];
        assert_eq!(result, expect);

        Ok(())
    }

    #[test]
    fn parse_feed_rejects_non_array() {
        assert!(parse_repository_feed(r#"{"url": "x"}"#).is_err());
    }

    #[test]
    fn resolve_without_feed_dedups_explicit() -> anyhow::Result<()> {
        let result = resolve_repositories(
            None,
            ["https://github.com/a/b", " https://github.com/a/b ", "", "https://github.com/c/d"],
        )?;
        let expect = vec![
            "https://github.com/a/b".to_string(),
            "https://github.com/c/d".to_string(),
        ];
        assert_eq!(result, expect);

        Ok(())
    }

    #[sealed_test]
    fn repository_file_round_trip() -> anyhow::Result<()> {
        let path = PathBuf::from("state").join("repositories.txt");
        let repositories = ["https://github.com/a/b", "https://github.com/c/d"];
        save_repository_file(&path, repositories)?;

        assert_eq!(
            std::fs::read_to_string(&path)?,
            "https://github.com/a/b\nhttps://github.com/c/d\n"
        );
        assert_eq!(load_repository_file(&path)?, repositories.to_vec());
        assert!(load_repository_file("missing.txt")?.is_empty());

        Ok(())
    }
}
