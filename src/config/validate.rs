// src/config/validate.rs

use crate::config::model::{ConfigFile, PlatformCommandConfig, RawConfigFile};
use crate::errors::{CheckpointError, Result};
use crate::types::Platform;

/// Upper bound on `[session].min_visible_ms`.
pub const MAX_MIN_VISIBLE_MS: u64 = 60_000;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::CheckpointError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_features(cfg)?;
    validate_session(cfg)?;
    validate_features(cfg)?;
    Ok(())
}

fn ensure_has_features(cfg: &RawConfigFile) -> Result<()> {
    if !cfg.catalog.include_builtin && cfg.feature.is_empty() {
        return Err(CheckpointError::ConfigError(
            "catalog is empty: set [catalog].include_builtin = true or add a [feature.<id>] section"
                .to_string(),
        ));
    }
    Ok(())
}

fn validate_session(cfg: &RawConfigFile) -> Result<()> {
    if cfg.session.min_visible_ms > MAX_MIN_VISIBLE_MS {
        return Err(CheckpointError::ConfigError(format!(
            "[session].min_visible_ms must be <= {MAX_MIN_VISIBLE_MS} (got {})",
            cfg.session.min_visible_ms
        )));
    }
    Ok(())
}

fn validate_features(cfg: &RawConfigFile) -> Result<()> {
    for (id, feature) in cfg.feature.iter() {
        if id.trim().is_empty() {
            return Err(CheckpointError::ConfigError(
                "feature ids must not be empty".to_string(),
            ));
        }

        let mut any = false;
        for (platform, cmd) in feature.platforms() {
            any = true;
            validate_platform_command(id, platform, cmd)?;
        }

        if !any {
            return Err(CheckpointError::ConfigError(format!(
                "feature '{id}' has no windows, macos or linux command"
            )));
        }
    }
    Ok(())
}

fn validate_platform_command(
    id: &str,
    platform: Platform,
    cmd: &PlatformCommandConfig,
) -> Result<()> {
    let forms = usize::from(!cmd.argv.is_empty())
        + usize::from(cmd.powershell.is_some())
        + usize::from(cmd.shell.is_some());

    if forms != 1 {
        return Err(CheckpointError::ConfigError(format!(
            "feature '{id}' ({platform}) must set exactly one of `argv`, `powershell` or `shell`"
        )));
    }

    if cmd.argv.first().is_some_and(|p| p.trim().is_empty()) {
        return Err(CheckpointError::ConfigError(format!(
            "feature '{id}' ({platform}) has an empty program name in `argv`"
        )));
    }

    let script_empty = cmd
        .powershell
        .as_deref()
        .or(cmd.shell.as_deref())
        .is_some_and(|s| s.trim().is_empty());
    if script_empty {
        return Err(CheckpointError::ConfigError(format!(
            "feature '{id}' ({platform}) has an empty script"
        )));
    }

    Ok(())
}
