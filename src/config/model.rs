// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::catalog::{Catalog, CommandKind, FeatureAction, FeatureDef, PlatformCommand};
use crate::exec::{SessionOptions, MIN_VISIBLE_DURATION};
use crate::types::Platform;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [session]
/// min_visible_ms = 700
///
/// [catalog]
/// include_builtin = true
///
/// [feature."Disk Usage"]
/// category = "Application / System"
/// windows = { powershell = "Get-PSDrive" }
/// macos = { argv = ["df", "-h"] }
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub session: SessionSection,

    #[serde(default)]
    pub catalog: CatalogSection,

    #[serde(default)]
    pub export: ExportSection,

    /// All features from `[feature.<id>]`, keyed by feature id.
    #[serde(default)]
    pub feature: BTreeMap<String, FeatureConfig>,
}

/// Validated configuration. Build it with `ConfigFile::try_from(raw)`.
#[derive(Debug, Clone, Default)]
pub struct ConfigFile {
    pub session: SessionSection,
    pub catalog: CatalogSection,
    pub export: ExportSection,
    pub feature: BTreeMap<String, FeatureConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            session: raw.session,
            catalog: raw.catalog,
            export: raw.export,
            feature: raw.feature,
        }
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            min_visible: Duration::from_millis(self.session.min_visible_ms),
        }
    }

    /// Built-ins (unless disabled) with configured features layered on top.
    pub fn build_catalog(&self) -> Catalog {
        let mut catalog = if self.catalog.include_builtin {
            Catalog::builtin()
        } else {
            Catalog::new()
        };
        for (id, feature) in &self.feature {
            catalog.insert(feature.to_def(id));
        }
        catalog
    }
}

/// `[session]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionSection {
    /// Minimum time between start banner and `done`, in milliseconds.
    #[serde(default = "default_min_visible_ms")]
    pub min_visible_ms: u64,
}

fn default_min_visible_ms() -> u64 {
    MIN_VISIBLE_DURATION.as_millis() as u64
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            min_visible_ms: default_min_visible_ms(),
        }
    }
}

/// `[catalog]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogSection {
    #[serde(default = "default_include_builtin")]
    pub include_builtin: bool,
}

fn default_include_builtin() -> bool {
    true
}

impl Default for CatalogSection {
    fn default() -> Self {
        Self {
            include_builtin: default_include_builtin(),
        }
    }
}

/// `[export]` section.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ExportSection {
    /// Directory used when an export is requested without a file path.
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

/// `[feature.<id>]` section.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct FeatureConfig {
    #[serde(default)]
    pub category: Option<String>,

    #[serde(default)]
    pub windows: Option<PlatformCommandConfig>,

    #[serde(default)]
    pub macos: Option<PlatformCommandConfig>,

    #[serde(default)]
    pub linux: Option<PlatformCommandConfig>,
}

impl FeatureConfig {
    pub fn platforms(&self) -> impl Iterator<Item = (Platform, &PlatformCommandConfig)> {
        [
            (Platform::Windows, self.windows.as_ref()),
            (Platform::Macos, self.macos.as_ref()),
            (Platform::Linux, self.linux.as_ref()),
        ]
        .into_iter()
        .filter_map(|(p, c)| c.map(|c| (p, c)))
    }

    fn to_def(&self, id: &str) -> FeatureDef {
        let map = self
            .platforms()
            .filter_map(|(p, c)| c.to_platform_command().map(|pc| (p, pc)))
            .collect();
        FeatureDef {
            id: id.to_string(),
            category: self.category.clone().unwrap_or_else(|| "Custom".to_string()),
            action: FeatureAction::Commands(map),
        }
    }
}

/// One platform's command: exactly one of `argv`, `powershell`, `shell`.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct PlatformCommandConfig {
    #[serde(default)]
    pub argv: Vec<String>,

    #[serde(default)]
    pub powershell: Option<String>,

    #[serde(default)]
    pub shell: Option<String>,

    /// Lines emitted after the start banner.
    #[serde(default)]
    pub notices: Vec<String>,
}

impl PlatformCommandConfig {
    /// `None` unless exactly one command form is set.
    pub fn to_platform_command(&self) -> Option<PlatformCommand> {
        let kind = match (self.argv.is_empty(), &self.powershell, &self.shell) {
            (false, None, None) => CommandKind::Argv(self.argv.clone()),
            (true, Some(script), None) => CommandKind::PowerShell(script.clone()),
            (true, None, Some(script)) => CommandKind::Shell(script.clone()),
            _ => return None,
        };
        Some(PlatformCommand {
            kind,
            notices: self.notices.clone(),
        })
    }
}
