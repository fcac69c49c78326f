// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Unraid template parsing and normalization.
//!
//! An Unraid template is an XML document written by hand by whoever packages
//! an application for Unraid. The layout looks roughly like this:
//!
//! ```xml
//! <Container version="2">
//!   <Name>Sonarr</Name>
//!   <Repository>lscr.io/linuxserver/sonarr</Repository>
//!   <Network>bridge</Network>
//!   <Overview>Smart PVR for newsgroup and bittorrent users.</Overview>
//!   <Config Name="WebUI" Target="8989" Default="8989" Type="Port" Description="web ui"/>
//!   <Config Name="Config" Target="/config" Default="/mnt/user/appdata/sonarr" Type="Path"/>
//! </Container>
//! ```
//!
//! Only a handful of top-level elements matter, and every `Config` element
//! lands in one of five buckets depending on its `Type` attribute. Authors
//! are not consistent about any of this, so parsing is lenient: a broken
//! `Config` element is skipped on its own, and only a missing image makes
//! the whole template unusable.

use roxmltree::{Document, Node, ParsingOptions};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fmt::{Display, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
    str::FromStr,
};
use tracing::warn;

/// Settings of one bucket, keyed by target.
pub type Bucket = BTreeMap<String, ConfigEntry>;

/// Application definition by one author.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct Template {
    /// Name of application. Carried by the store key, so it is not written.
    #[serde(skip)]
    pub name: String,

    /// Container image reference.
    pub image: String,

    /// Free text description.
    #[serde(default)]
    pub description: Option<String>,

    /// Docker network mode, e.g. bridge or host.
    #[serde(default)]
    pub network_mode: Option<String>,

    /// Published ports keyed by container port.
    #[serde(default)]
    pub ports: Bucket,

    /// Bind mounts keyed by container path.
    #[serde(default)]
    pub volumes: Bucket,

    /// Environment variables keyed by variable name.
    #[serde(default)]
    pub environment: Bucket,

    /// Container labels keyed by label name.
    #[serde(default)]
    pub labels: Bucket,

    /// Passed through devices keyed by container device path.
    #[serde(default)]
    pub devices: Bucket,
}

impl Template {
    /// Bucket that holds settings of given kind.
    pub fn bucket(&self, kind: ConfigKind) -> &Bucket {
        match kind {
            ConfigKind::Variable => &self.environment,
            ConfigKind::Port => &self.ports,
            ConfigKind::Path => &self.volumes,
            ConfigKind::Device => &self.devices,
            ConfigKind::Label => &self.labels,
        }
    }

    /// Mutable bucket that holds settings of given kind.
    pub fn bucket_mut(&mut self, kind: ConfigKind) -> &mut Bucket {
        match kind {
            ConfigKind::Variable => &mut self.environment,
            ConfigKind::Port => &mut self.ports,
            ConfigKind::Path => &mut self.volumes,
            ConfigKind::Device => &mut self.devices,
            ConfigKind::Label => &mut self.labels,
        }
    }
}

/// One configurable setting of a template.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct ConfigEntry {
    /// Default value suggested by the author.
    #[serde(rename = "Default", default)]
    pub default: String,

    /// Description of setting.
    #[serde(rename = "Description", default)]
    pub description: String,
}

impl ConfigEntry {
    /// Construct new setting.
    pub fn new(default: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            default: default.into(),
            description: description.into(),
        }
    }
}

/// Kind of `Config` element, decided by its `Type` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigKind {
    /// Environment variable.
    Variable,

    /// Published port.
    Port,

    /// Bind mount.
    Path,

    /// Passed through device.
    Device,

    /// Container label.
    Label,
}

impl ConfigKind {
    /// Every kind, in rendering order.
    pub const ALL: [ConfigKind; 5] = [
        ConfigKind::Port,
        ConfigKind::Path,
        ConfigKind::Variable,
        ConfigKind::Device,
        ConfigKind::Label,
    ];

    /// Name of output bucket for kind.
    pub fn bucket_name(&self) -> &'static str {
        match self {
            Self::Variable => "environment",
            Self::Port => "ports",
            Self::Path => "volumes",
            Self::Device => "devices",
            Self::Label => "labels",
        }
    }
}

impl FromStr for ConfigKind {
    type Err = TemplateError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        match data.trim().to_lowercase().as_str() {
            "variable" => Ok(Self::Variable),
            "port" => Ok(Self::Port),
            "path" => Ok(Self::Path),
            "device" => Ok(Self::Device),
            "label" => Ok(Self::Label),
            _ => Err(TemplateError::UnknownKind(data.to_string())),
        }
    }
}

impl Display for ConfigKind {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        let name = match self {
            Self::Variable => "variable",
            Self::Port => "port",
            Self::Path => "path",
            Self::Device => "device",
            Self::Label => "label",
        };
        fmt.write_str(name)
    }
}

/// Parsed template along with the keys it is stored under.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct TemplateEntry {
    pub app: String,
    pub author: String,
    pub template: Template,
}

/// Parse raw template XML written by target author.
///
/// The path is only used for diagnostics. `Config` elements with unknown or
/// missing `Type`, or without `Target`, are logged and skipped while the
/// rest of the template is kept.
///
/// # Errors
///
/// - Return [`TemplateError::Xml`] if document is not well-formed.
/// - Return [`TemplateError::MissingName`] if `Name` is blank or absent.
/// - Return [`TemplateError::MissingImage`] if `Repository` is blank or
///   absent.
pub fn parse_template(
    xml: &str,
    author: impl Into<String>,
    path: impl AsRef<Path>,
) -> Result<TemplateEntry> {
    let path = path.as_ref();
    let xml = xml.strip_prefix('\u{feff}').unwrap_or(xml);
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    let document = Document::parse_with_options(xml, options).map_err(|err| {
        TemplateError::Xml {
            source: err,
            path: path.to_path_buf(),
        }
    })?;
    let root = document.root_element();

    let name = child_text(root, "Name")
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .ok_or_else(|| TemplateError::MissingName {
            path: path.to_path_buf(),
        })?;

    let image = child_text(root, "Repository")
        .map(|image| image.trim().to_string())
        .filter(|image| !image.is_empty())
        .ok_or_else(|| TemplateError::MissingImage {
            path: path.to_path_buf(),
        })?;

    let mut template = Template {
        name: name.clone(),
        image,
        description: child_text(root, "Overview").filter(|text| !text.trim().is_empty()),
        network_mode: child_text(root, "Network")
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty()),
        ..Template::default()
    };

    for config in root
        .children()
        .filter(|node| node.has_tag_name("Config"))
    {
        let kind = match config.attribute("Type") {
            Some(kind) => kind,
            None => {
                warn!("skip config without type in {:?}", path.display());
                continue;
            }
        };
        let kind = match kind.parse::<ConfigKind>() {
            Ok(kind) => kind,
            Err(error) => {
                warn!("{error} in {:?}", path.display());
                continue;
            }
        };

        let target = match config.attribute("Target") {
            Some(target) => target.trim().to_string(),
            None => {
                warn!(
                    "skip {kind} config {:?} without target in {:?}",
                    config.attribute("Name").unwrap_or_default(),
                    path.display()
                );
                continue;
            }
        };

        let entry = ConfigEntry::new(
            config.attribute("Default").unwrap_or_default().trim(),
            config.attribute("Description").unwrap_or_default().trim(),
        );
        template.bucket_mut(kind).insert(target, entry);
    }

    Ok(TemplateEntry {
        app: name,
        author: author.into(),
        template,
    })
}

/// Concatenated text of first child element with target tag.
fn child_text(node: Node<'_, '_>, tag: &str) -> Option<String> {
    node.children()
        .find(|child| child.has_tag_name(tag))
        .map(|child| {
            child
                .children()
                .filter(|text| text.is_text())
                .filter_map(|text| text.text())
                .collect::<String>()
        })
}

/// Template parsing error types.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    /// Template is not well-formed XML.
    #[error("failed to parse template {:?}", path.display())]
    Xml {
        #[source]
        source: roxmltree::Error,
        path: PathBuf,
    },

    /// Template has no name to store it under.
    #[error("template {:?} has no name", path.display())]
    MissingName { path: PathBuf },

    /// Template has no image reference.
    #[error("template {:?} has no repository", path.display())]
    MissingImage { path: PathBuf },

    /// Type attribute of `Config` element is not recognized.
    #[error("unknown config type {0:?}")]
    UnknownKind(String),
}

/// Friendly result alias :3
pub type Result<T, E = TemplateError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use simple_test_case::test_case;

    const SONARR: &str = indoc! {r#"
        <?xml version="1.0"?>
        <Container version="2">
          <Name>Sonarr</Name>
          <Repository>lscr.io/linuxserver/sonarr</Repository>
          <Network>bridge</Network>
          <Overview><![CDATA[Smart PVR for newsgroup
        and bittorrent users.]]></Overview>
          <Config Name="WebUI" Target="8989" Default="8989" Mode="tcp" Description="web ui" Type="Port"/>
          <Config Name="Appdata" Target=" /config " Default=" /mnt/user/appdata/sonarr " Type="Path">/mnt/user/appdata/sonarr</Config>
          <Config Name="PUID" Target="PUID" Default="99" Type="Variable" Description=" user id "/>
          <Config Name="Tuner" Target="/dev/dvb" Type="device"/>
          <Config Name="Label" Target="net.unraid.docker.managed" Default="composeman" Type="LABEL"/>
        </Container>
    "#};

    #[test]
    fn parse_full_template() -> anyhow::Result<()> {
        let result = parse_template(SONARR, "linuxserver", "sonarr.xml")?;

        let expect = TemplateEntry {
            app: "Sonarr".into(),
            author: "linuxserver".into(),
            template: Template {
                name: "Sonarr".into(),
                image: "lscr.io/linuxserver/sonarr".into(),
                description: Some("Smart PVR for newsgroup\nand bittorrent users.".into()),
                network_mode: Some("bridge".into()),
                ports: [("8989".into(), ConfigEntry::new("8989", "web ui"))].into(),
                volumes: [(
                    "/config".into(),
                    ConfigEntry::new("/mnt/user/appdata/sonarr", ""),
                )]
                .into(),
                environment: [("PUID".into(), ConfigEntry::new("99", "user id"))].into(),
                labels: [(
                    "net.unraid.docker.managed".into(),
                    ConfigEntry::new("composeman", ""),
                )]
                .into(),
                devices: [("/dev/dvb".into(), ConfigEntry::new("", ""))].into(),
            },
        };

        assert_eq!(result, expect);

        Ok(())
    }

    #[test_case("<Container><Name>Foo</Name></Container>"; "missing repository")]
    #[test_case("<Container><Name>Foo</Name><Repository>  </Repository></Container>"; "blank repository")]
    #[test_case("<Container><Name>Foo</Name><Repository/></Container>"; "empty repository")]
    #[test]
    fn parse_rejects_template_without_image(xml: &str) {
        assert!(matches!(
            parse_template(xml, "someone", "foo.xml"),
            Err(TemplateError::MissingImage { .. })
        ));
    }

    #[test]
    fn parse_rejects_template_without_name() {
        let xml = "<Container><Repository>foo/bar</Repository></Container>";
        assert!(matches!(
            parse_template(xml, "someone", "foo.xml"),
            Err(TemplateError::MissingName { .. })
        ));
    }

    #[test]
    fn parse_trims_wrapped_name() -> anyhow::Result<()> {
        let xml = indoc! {r#"
            <Container>
              <Name>
                Sonarr
              </Name>
              <Repository>lscr.io/linuxserver/sonarr</Repository>
            </Container>
        "#};
        let entry = parse_template(xml, "linuxserver", "sonarr.xml")?;
        assert_eq!(entry.app, "Sonarr");
        assert_eq!(entry.template.name, "Sonarr");

        Ok(())
    }

    #[test]
    fn parse_rejects_malformed_xml() {
        let xml = "<Container><Name>Foo</Name><Repository>foo/bar</Container>";
        assert!(matches!(
            parse_template(xml, "someone", "foo.xml"),
            Err(TemplateError::Xml { .. })
        ));
    }

    #[test]
    fn parse_skips_broken_configs_only() -> anyhow::Result<()> {
        let xml = indoc! {r#"
            <Container>
              <Name>Plex</Name>
              <Repository>plexinc/pms-docker</Repository>
              <Config Name="No target" Default="1" Type="Variable"/>
              <Config Name="No type" Target="IGNORED" Default="1"/>
              <Config Name="Odd type" Target="ALSO_IGNORED" Type="Widget"/>
              <Config Name="Timezone" Target="TZ" Default="Europe/London" Type="Variable"/>
              <Config Name="Web" Target="32400" Default="32400" Type="port"/>
            </Container>
        "#};

        let result = parse_template(xml, "plexinc", "plex.xml")?.template;
        assert_eq!(
            result.environment,
            Bucket::from([("TZ".into(), ConfigEntry::new("Europe/London", ""))])
        );
        assert_eq!(
            result.ports,
            Bucket::from([("32400".into(), ConfigEntry::new("32400", ""))])
        );
        assert!(result.volumes.is_empty());
        assert_eq!(result.description, None);
        assert_eq!(result.network_mode, None);

        Ok(())
    }

    #[test]
    fn parse_tolerates_bom_and_doctype() -> anyhow::Result<()> {
        let xml = "\u{feff}<?xml version=\"1.0\"?>\n<!DOCTYPE Container>\n\
                   <Container><Name>Foo</Name><Repository>foo/bar</Repository></Container>";
        let result = parse_template(xml, "someone", "foo.xml")?;
        assert_eq!(result.app, "Foo");
        assert_eq!(result.template.image, "foo/bar");

        Ok(())
    }

    #[test_case("Variable", ConfigKind::Variable; "variable")]
    #[test_case("PORT", ConfigKind::Port; "upper port")]
    #[test_case(" path ", ConfigKind::Path; "padded path")]
    #[test_case("Device", ConfigKind::Device; "device")]
    #[test_case("label", ConfigKind::Label; "label")]
    #[test]
    fn config_kind_from_type(raw: &str, expect: ConfigKind) {
        pretty_assertions::assert_eq!(raw.parse::<ConfigKind>().unwrap(), expect);
    }

    #[test]
    fn config_kind_maps_to_bucket() {
        let names = ConfigKind::ALL
            .iter()
            .map(ConfigKind::bucket_name)
            .collect::<Vec<_>>();
        assert_eq!(
            names,
            vec!["ports", "volumes", "environment", "devices", "labels"]
        );
    }
}
