// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Unraid template harvesting and docker-compose generation.
//!
//! Unraid's community applications are described by XML __templates__ that
//! authors publish across many git repositories. This crate collects those
//! repositories, parses every template it finds, and keeps the result in a
//! __template store__ keyed by application name and author. Any stored
//! template can then be turned into a `docker-compose.yml` file.
//!
//! # Pipeline
//!
//! 1. [`repository`] resolves the list of template repositories, either from
//!    a JSON feed or from explicit URLs.
//! 2. [`sync`] clones each repository, or pulls it if a checkout exists.
//! 3. [`scan`] walks every checkout for template files.
//! 4. [`template`] parses each file into a normalized [`template::Template`].
//! 5. [`store`] accumulates templates and persists them as `templates.json`.
//! 6. [`compose`] renders one template into a compose file.
//!
//! Lookup of user supplied names is handled by [`matcher`], and generated
//! files can be started through [`container`]. [`dispatch`] ties the stages
//! together for one command-line request.

pub mod compose;
pub mod config;
pub mod container;
pub mod dispatch;
pub mod matcher;
pub mod path;
pub mod repository;
pub mod scan;
pub mod store;
pub mod sync;
pub mod template;
