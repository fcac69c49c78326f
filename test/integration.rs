// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use crate::{template_xml, RepoFixture};

use unraid_compose::{
    compose::{backup_path, write_compose},
    repository::{load_repository_file, save_repository_file},
    store::TemplateStore,
    sync::{sync_all, Git2Sync, SyncAction, SyncReport},
};

use anyhow::Result;
use pretty_assertions::assert_eq;
use sealed_test::prelude::*;
use std::{
    fs::{read_to_string, write},
    path::PathBuf,
    process::Command,
};

fn checkouts(report: &SyncReport) -> Vec<(String, PathBuf)> {
    report
        .synced()
        .map(|synced| (synced.repository.owner().to_string(), synced.path.clone()))
        .collect()
}

fn actions(report: &SyncReport) -> Vec<SyncAction> {
    report.synced().map(|synced| synced.action).collect()
}

#[sealed_test]
fn sync_clones_then_pulls() -> Result<()> {
    let remote = RepoFixture::new("remote/linuxserver/templates")?;
    remote.stage_and_commit(
        "sonarr.xml",
        template_xml("Sonarr", "lscr.io/linuxserver/sonarr", "8989"),
    )?;
    let urls = vec![remote.url()];
    let syncer = Git2Sync::quiet();

    let report = sync_all(&syncer, &urls, "checkouts");
    assert_eq!(actions(&report), vec![SyncAction::Cloned]);
    assert!(PathBuf::from("checkouts/linuxserver/templates/sonarr.xml").is_file());

    let report = sync_all(&syncer, &urls, "checkouts");
    assert_eq!(actions(&report), vec![SyncAction::UpToDate]);

    remote.stage_and_commit(
        "radarr.xml",
        template_xml("Radarr", "lscr.io/linuxserver/radarr", "7878"),
    )?;
    let report = sync_all(&syncer, &urls, "checkouts");
    assert_eq!(actions(&report), vec![SyncAction::Updated]);
    assert!(PathBuf::from("checkouts/linuxserver/templates/radarr.xml").is_file());

    Ok(())
}

#[sealed_test]
fn sync_failure_does_not_stop_batch() -> Result<()> {
    let remote = RepoFixture::new("remote/binhex/templates")?;
    remote.stage_and_commit(
        "plex.xml",
        template_xml("Plex", "binhex/arch-plex", "32400"),
    )?;
    let missing = format!("file://{}/remote/nobody/nothing", std::env::current_dir()?.display());
    let urls = vec![missing.clone(), "not a url".into(), remote.url()];

    let report = sync_all(&Git2Sync::quiet(), &urls, "checkouts");
    let failures = report.failures().map(|(url, _)| url).collect::<Vec<_>>();
    assert_eq!(failures, vec![missing.as_str(), "not a url"]);
    assert_eq!(actions(&report), vec![SyncAction::Cloned]);

    Ok(())
}

#[sealed_test]
fn harvest_and_generate_compose() -> Result<()> {
    let linuxserver = RepoFixture::new("remote/linuxserver/templates")?;
    linuxserver.stage_and_commit(
        "sonarr.xml",
        template_xml("Sonarr", "lscr.io/linuxserver/sonarr", "8989"),
    )?;
    linuxserver.stage_and_commit(
        "plex.xml",
        template_xml("Plex", "lscr.io/linuxserver/plex", "32400"),
    )?;
    linuxserver.stage_and_commit(".github/ISSUE_TEMPLATE/bug.xml", "<Container/>")?;

    let binhex = RepoFixture::new("remote/binhex/templates")?;
    binhex.stage_and_commit(
        "plex/plex.xml",
        template_xml("Plex", "binhex/arch-plex", "32400"),
    )?;
    binhex.stage_and_commit("broken.xml", "<Container><Name>oops")?;

    let urls = vec![linuxserver.url(), binhex.url()];
    save_repository_file("templates/repositories.txt", &urls)?;
    let urls = load_repository_file("templates/repositories.txt")?;

    let report = sync_all(&Git2Sync::quiet(), &urls, "checkouts");
    let (store, build) = TemplateStore::rebuild(checkouts(&report));
    assert_eq!(build.parsed, 3);
    assert_eq!(build.skipped.len(), 1);
    assert_eq!(store.apps(), vec!["Plex", "Sonarr"]);
    assert_eq!(store.authors_of("Plex"), vec!["binhex", "linuxserver"]);

    store.save("templates/templates.json")?;
    let store = TemplateStore::load("templates/templates.json")?;

    let template = store
        .get("Sonarr", "linuxserver")
        .ok_or_else(|| anyhow::anyhow!("sonarr template missing"))?;
    let compose_file = write_compose("compose", "Sonarr", template)?;
    assert_eq!(compose_file, PathBuf::from("compose/sonarr/docker-compose.yml"));

    let content = read_to_string(&compose_file)?;
    assert!(content.contains("# 8989: web ui\n      - \"8989:8989\"\n"));

    let yaml: serde_yaml::Value = serde_yaml::from_str(&content)?;
    let service = &yaml["services"]["sonarr"];
    assert_eq!(service["image"].as_str(), Some("lscr.io/linuxserver/sonarr"));
    assert_eq!(service["network_mode"].as_str(), Some("bridge"));
    assert_eq!(service["environment"][0].as_str(), Some("PUID=99"));

    write_compose("compose", "Sonarr", template)?;
    assert_eq!(read_to_string(backup_path(&compose_file))?, content);
    assert_eq!(read_to_string(&compose_file)?, content);

    Ok(())
}

#[sealed_test]
fn cli_reads_env_file_and_reports_errors_without_failing() -> Result<()> {
    write(
        ".env",
        "TEMPLATE_FOLDER=templates\nREPOSITORY_FOLDER=checkouts\nDOCKER_COMPOSE_FOLDER=compose\n",
    )?;

    let output = Command::new(env!("CARGO_BIN_EXE_unraid-compose"))
        .args(["--config", "missing.toml", "--app", "nope", "--author", "nobody"])
        .env_remove("TEMPLATE_FOLDER")
        .env_remove("REPOSITORY_FOLDER")
        .env_remove("DOCKER_COMPOSE_FOLDER")
        .env_remove("UNRAID_REPOSITORY_LIST")
        .env_remove("UNRAID_REPOSITORIES")
        .env_remove("UNRAID_COMPOSE_CONFIG")
        .env("RUST_LOG", "info")
        .env("NO_COLOR", "1")
        .output()?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert!(stdout.contains("no app matches"), "unexpected output: {stdout}");
    assert!(PathBuf::from("templates/repositories.txt").is_file());
    assert!(PathBuf::from("templates/templates.json").is_file());

    Ok(())
}
