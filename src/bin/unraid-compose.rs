// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use unraid_compose::{
    config::{load_env_file, Layout, Settings},
    container::{compose_up, ContainerSystem},
    dispatch::{self, Outcome, Request},
    path::default_settings_file,
    sync::Git2Sync,
};

use anyhow::Result;
use clap::Parser;
use std::{path::PathBuf, process::exit};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Parser)]
#[command(
    about,
    override_usage = "\n  unraid-compose [options] --list\n  unraid-compose [options] --app <app_name> [--author <author>]",
    version
)]
struct Cli {
    /// Application to look up.
    #[arg(short, long, visible_alias = "app-name", value_name = "app_name")]
    pub app: Option<String>,

    /// Author to look up.
    #[arg(short = 'A', long, value_name = "author")]
    pub author: Option<String>,

    /// List every stored application.
    #[arg(short, long)]
    pub list: bool,

    /// List every stored author.
    #[arg(long)]
    pub list_authors: bool,

    /// Resync repositories and rebuild template store first.
    #[arg(short, long, visible_alias = "update-templates")]
    pub update: bool,

    /// Start generated compose file right away.
    #[arg(long, requires_all = ["app", "author"])]
    pub update_containers: bool,

    /// Container system used to start compose files.
    #[arg(long, value_enum, default_value_t, value_name = "system")]
    pub container_system: ContainerSystem,

    /// Path to settings file.
    #[arg(short, long, env = "UNRAID_COMPOSE_CONFIG", value_name = "path")]
    pub config: Option<PathBuf>,

    /// Folder holding template store and repository list.
    #[arg(long, env = "TEMPLATE_FOLDER", value_name = "path")]
    pub template_folder: Option<PathBuf>,

    /// Folder holding repository checkouts.
    #[arg(long, env = "REPOSITORY_FOLDER", value_name = "path")]
    pub repository_folder: Option<PathBuf>,

    /// Folder receiving generated compose files.
    #[arg(long, env = "DOCKER_COMPOSE_FOLDER", value_name = "path")]
    pub compose_folder: Option<PathBuf>,

    /// URL of JSON feed listing template repositories.
    #[arg(long, env = "UNRAID_REPOSITORY_LIST", value_name = "url")]
    pub repository_list: Option<String>,

    /// Template repository to harvest, may be given more than once.
    #[arg(
        long = "repository",
        env = "UNRAID_REPOSITORIES",
        value_delimiter = ',',
        value_name = "url"
    )]
    pub repositories: Vec<String>,
}

impl Cli {
    fn run(self) -> Result<()> {
        let settings = self.settings()?;
        let layout = Layout::from_settings(&settings)?;
        let request = Request {
            app: self.app.clone(),
            author: self.author.clone(),
            list: self.list,
            list_authors: self.list_authors,
            update: self.update,
        };

        match dispatch::run(&Git2Sync::new(), &settings, &layout, &request)? {
            Outcome::Listing(names) => names.iter().for_each(|name| println!("{name}")),
            Outcome::Generated(compose_file) => {
                println!("{}", compose_file.display());
                if self.update_containers {
                    let output = compose_up(self.container_system, &compose_file)?;
                    if !output.is_empty() {
                        info!("{output}");
                    }
                }
            }
            Outcome::Idle => {}
        }

        Ok(())
    }

    fn settings(&self) -> Result<Settings> {
        let path = match &self.config {
            Some(path) => path.clone(),
            None => default_settings_file()?,
        };

        let overrides = Settings {
            template_folder: self.template_folder.clone(),
            repository_folder: self.repository_folder.clone(),
            compose_folder: self.compose_folder.clone(),
            repository_list: self.repository_list.clone(),
            repositories: self.repositories.clone(),
        };

        Ok(Settings::load(path)?.merge(overrides))
    }
}

fn main() {
    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .with_timer(false)
        .without_time();
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    // INVARIANT: Environment file must be loaded before clap reads the environment.
    if let Err(error) = load_env_file(".env") {
        warn!("{error:?}");
    }

    // INVARIANT: Failures are reported, not signalled through the exit status.
    if let Err(error) = run() {
        error!("{error:?}");
    }

    exit(0)
}

fn run() -> Result<()> {
    Cli::parse().run()
}
