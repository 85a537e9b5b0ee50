// src/catalog/mod.rs

//! Feature dispatcher.
//!
//! Maps a feature id and a [`Platform`] to what should run:
//!
//! - a [`CommandSpec`] (plus notice lines) for an [`ExecutionSession`],
//! - a [`CompositeAction`] such as the full cleanup,
//! - or an explicit `Unsupported` / `Unknown` that callers answer
//!   synchronously without starting a session.
//!
//! The execution core never looks at this table; it only consumes resolved
//! specs.
//!
//! [`ExecutionSession`]: crate::exec::ExecutionSession

pub mod builtin;

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::exec::CommandSpec;
use crate::types::Platform;

pub use builtin::builtin_features;

static ENV_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid env var regex"));

/// How a platform entry is turned into argv.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandKind {
    Argv(Vec<String>),
    PowerShell(String),
    Shell(String),
}

/// The command a feature runs on one platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformCommand {
    pub kind: CommandKind,
    /// Lines emitted after the start banner, before command output.
    pub notices: Vec<String>,
}

impl PlatformCommand {
    pub fn new(kind: CommandKind) -> Self {
        Self {
            kind,
            notices: Vec::new(),
        }
    }

    /// Build the spec, expanding `${VAR}` placeholders through `lookup`.
    ///
    /// Windows commands always run hidden.
    pub fn to_spec(
        &self,
        platform: Platform,
        lookup: &dyn Fn(&str) -> Option<String>,
    ) -> CommandSpec {
        let spec = match &self.kind {
            CommandKind::Argv(argv) => {
                let mut parts = argv.iter().map(|s| expand_vars(s, lookup));
                let program = parts.next().unwrap_or_default();
                CommandSpec::new(program).args(parts)
            }
            CommandKind::PowerShell(script) => CommandSpec::powershell(expand_vars(script, lookup)),
            CommandKind::Shell(script) => CommandSpec::shell(expand_vars(script, lookup)),
        };
        spec.hidden(platform == Platform::Windows)
    }
}

/// Multi-step actions that are not a single command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositeAction {
    FullCleanup,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeatureAction {
    Commands(BTreeMap<Platform, PlatformCommand>),
    Composite(CompositeAction),
}

/// One entry of the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureDef {
    pub id: String,
    pub category: String,
    pub action: FeatureAction,
}

impl FeatureDef {
    pub fn supports(&self, platform: Platform) -> bool {
        match &self.action {
            FeatureAction::Commands(map) => map.contains_key(&platform),
            FeatureAction::Composite(_) => true,
        }
    }
}

/// Result of resolving a feature id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Command {
        spec: CommandSpec,
        notices: Vec<String>,
    },
    Composite(CompositeAction),
    /// Known feature with no entry for the requested platform.
    Unsupported,
    Unknown,
}

/// Ordered feature table.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    features: Vec<FeatureDef>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog pre-filled with [`builtin_features`].
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        for def in builtin_features() {
            catalog.insert(def);
        }
        catalog
    }

    /// Add a feature, replacing any existing one with the same id in place.
    pub fn insert(&mut self, def: FeatureDef) {
        match self.features.iter_mut().find(|f| f.id == def.id) {
            Some(slot) => *slot = def,
            None => self.features.push(def),
        }
    }

    pub fn get(&self, id: &str) -> Option<&FeatureDef> {
        self.features.iter().find(|f| f.id == id)
    }

    pub fn features(&self) -> impl Iterator<Item = &FeatureDef> {
        self.features.iter()
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Resolve against the process environment.
    pub fn resolve(&self, id: &str, platform: Platform) -> Resolution {
        self.resolve_with(id, platform, &|name| std::env::var(name).ok())
    }

    pub fn resolve_with(
        &self,
        id: &str,
        platform: Platform,
        lookup: &dyn Fn(&str) -> Option<String>,
    ) -> Resolution {
        let Some(def) = self.get(id) else {
            return Resolution::Unknown;
        };

        match &def.action {
            FeatureAction::Composite(action) => Resolution::Composite(*action),
            FeatureAction::Commands(map) => match map.get(&platform) {
                Some(cmd) => Resolution::Command {
                    spec: cmd.to_spec(platform, lookup),
                    notices: cmd.notices.clone(),
                },
                None => Resolution::Unsupported,
            },
        }
    }
}

/// Replace `${NAME}` with the looked-up value; unset names become empty.
pub fn expand_vars(input: &str, lookup: &dyn Fn(&str) -> Option<String>) -> String {
    ENV_VAR
        .replace_all(input, |caps: &Captures| lookup(&caps[1]).unwrap_or_default())
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(name: &str) -> Option<String> {
        match name {
            "HOME" => Some("/Users/ana".to_string()),
            _ => None,
        }
    }

    #[test]
    fn expands_known_and_blanks_unknown_vars() {
        assert_eq!(expand_vars("${HOME}/.Trash", &env), "/Users/ana/.Trash");
        assert_eq!(expand_vars("x${NOPE}y", &env), "xy");
        assert_eq!(expand_vars("${TMPDIR:-/tmp}", &env), "${TMPDIR:-/tmp}");
    }

    #[test]
    fn windows_resolution_is_hidden_and_wrapped() {
        let catalog = Catalog::builtin();
        match catalog.resolve_with("Windows Services", Platform::Windows, &env) {
            Resolution::Command { spec, .. } => {
                assert!(spec.hidden);
                assert_eq!(spec.program, "powershell");
                assert_eq!(spec.args[3], "-Command");
            }
            other => panic!("expected command, got {other:?}"),
        }
    }

    #[test]
    fn macos_trash_path_uses_home() {
        let catalog = Catalog::builtin();
        match catalog.resolve_with("Open Trash / Recycle Bin", Platform::Macos, &env) {
            Resolution::Command { spec, .. } => {
                assert!(!spec.hidden);
                assert_eq!(spec.program, "open");
                assert_eq!(spec.args, vec!["/Users/ana/.Trash"]);
            }
            other => panic!("expected command, got {other:?}"),
        }
    }

    #[test]
    fn unknown_and_unsupported_are_distinct() {
        let catalog = Catalog::builtin();
        assert_eq!(
            catalog.resolve_with("Screenshot", Platform::Macos, &env),
            Resolution::Unknown
        );
        assert_eq!(
            catalog.resolve_with("Access HKLM Registry", Platform::Linux, &env),
            Resolution::Unsupported
        );
    }

    #[test]
    fn insert_replaces_in_place() {
        let mut catalog = Catalog::builtin();
        let before = catalog.len();
        let first_id = catalog.features().next().map(|f| f.id.clone()).unwrap();

        let mut map = BTreeMap::new();
        map.insert(
            Platform::Linux,
            PlatformCommand::new(CommandKind::Argv(vec!["true".to_string()])),
        );
        catalog.insert(FeatureDef {
            id: first_id.clone(),
            category: "Custom".to_string(),
            action: FeatureAction::Commands(map),
        });

        assert_eq!(catalog.len(), before);
        assert_eq!(catalog.features().next().unwrap().category, "Custom");
    }
}
