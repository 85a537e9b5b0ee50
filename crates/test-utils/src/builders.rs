#![allow(dead_code)]

use std::collections::BTreeMap;

use checkpoint::catalog::{Catalog, CommandKind, FeatureAction, FeatureDef, PlatformCommand};
use checkpoint::types::Platform;

/// Builder for a small `Catalog` to simplify test setup.
pub struct CatalogBuilder {
    catalog: Catalog,
}

impl CatalogBuilder {
    /// Empty catalog (no built-ins).
    pub fn new() -> Self {
        Self {
            catalog: Catalog::new(),
        }
    }

    pub fn builtin() -> Self {
        Self {
            catalog: Catalog::builtin(),
        }
    }

    /// Add an argv feature available on a single platform.
    pub fn argv(mut self, id: &str, platform: Platform, argv: &[&str]) -> Self {
        self.catalog.insert(single(
            id,
            platform,
            CommandKind::Argv(argv.iter().map(|s| s.to_string()).collect()),
            Vec::new(),
        ));
        self
    }

    /// Add a `bash -c` feature available on a single platform.
    pub fn shell(mut self, id: &str, platform: Platform, script: &str) -> Self {
        self.catalog.insert(single(
            id,
            platform,
            CommandKind::Shell(script.to_string()),
            Vec::new(),
        ));
        self
    }

    pub fn with_notices(
        mut self,
        id: &str,
        platform: Platform,
        argv: &[&str],
        notices: &[&str],
    ) -> Self {
        self.catalog.insert(single(
            id,
            platform,
            CommandKind::Argv(argv.iter().map(|s| s.to_string()).collect()),
            notices.iter().map(|s| s.to_string()).collect(),
        ));
        self
    }

    pub fn build(self) -> Catalog {
        self.catalog
    }
}

impl Default for CatalogBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn single(id: &str, platform: Platform, kind: CommandKind, notices: Vec<String>) -> FeatureDef {
    let mut map = BTreeMap::new();
    map.insert(platform, PlatformCommand { kind, notices });
    FeatureDef {
        id: id.to_string(),
        category: "Test".to_string(),
        action: FeatureAction::Commands(map),
    }
}
