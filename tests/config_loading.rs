use std::error::Error;
use std::fs;
use std::time::Duration;

use checkpoint::catalog::{CommandKind, FeatureAction, Resolution};
use checkpoint::config::{load_and_validate, load_or_default};
use checkpoint::types::Platform;
use checkpoint::CheckpointError;
use tempfile::tempdir;

type TestResult = Result<(), Box<dyn Error>>;

#[test]
fn custom_features_extend_the_builtin_catalog() -> TestResult {
    let dir = tempdir()?;
    let path = dir.path().join("Checkpoint.toml");
    fs::write(
        &path,
        r#"
[session]
min_visible_ms = 250

[export]
directory = "logs"

[feature."Disk Usage"]
category = "System Information"
linux = { argv = ["df", "-h"], notices = ["[INFO] Listing mounts"] }
macos = { shell = "df -h | head -n 5" }
"#,
    )?;

    let cfg = load_and_validate(&path)?;
    assert_eq!(cfg.session_options().min_visible, Duration::from_millis(250));
    assert_eq!(cfg.export.directory.as_deref(), Some(std::path::Path::new("logs")));

    let catalog = cfg.build_catalog();
    assert!(catalog.get("Netstat").is_some(), "built-ins kept");

    let def = catalog.get("Disk Usage").ok_or("custom feature missing")?;
    assert_eq!(def.category, "System Information");
    assert!(def.supports(Platform::Linux));
    assert!(!def.supports(Platform::Windows));

    match &def.action {
        FeatureAction::Commands(map) => {
            let linux = &map[&Platform::Linux];
            assert_eq!(
                linux.kind,
                CommandKind::Argv(vec!["df".to_string(), "-h".to_string()])
            );
            assert_eq!(linux.notices, vec!["[INFO] Listing mounts"]);
        }
        other => panic!("expected commands, got {other:?}"),
    }

    assert_eq!(
        catalog.resolve("Disk Usage", Platform::Windows),
        Resolution::Unsupported
    );
    Ok(())
}

#[test]
fn builtins_can_be_disabled() -> TestResult {
    let dir = tempdir()?;
    let path = dir.path().join("Checkpoint.toml");
    fs::write(
        &path,
        r#"
[catalog]
include_builtin = false

[feature.Uptime]
linux = { argv = ["uptime"] }
"#,
    )?;

    let catalog = load_and_validate(&path)?.build_catalog();
    assert_eq!(catalog.len(), 1);
    assert!(catalog.get("Netstat").is_none());
    Ok(())
}

#[test]
fn config_feature_overrides_builtin_with_same_id() -> TestResult {
    let dir = tempdir()?;
    let path = dir.path().join("Checkpoint.toml");
    fs::write(
        &path,
        r#"
[feature.Netstat]
linux = { argv = ["ss", "-s"] }
"#,
    )?;

    let catalog = load_and_validate(&path)?.build_catalog();
    let builtin = checkpoint::catalog::Catalog::builtin();
    assert_eq!(catalog.len(), builtin.len());

    match catalog.resolve("Netstat", Platform::Linux) {
        Resolution::Command { spec, .. } => {
            assert_eq!(spec.program, "ss");
            assert_eq!(spec.args, vec!["-s"]);
        }
        other => panic!("expected command, got {other:?}"),
    }
    Ok(())
}

#[test]
fn invalid_toml_is_a_parse_error() -> TestResult {
    let dir = tempdir()?;
    let path = dir.path().join("Checkpoint.toml");
    fs::write(&path, "[session\nmin_visible_ms = 1")?;

    assert!(matches!(
        load_and_validate(&path),
        Err(CheckpointError::TomlError(_))
    ));
    Ok(())
}

#[test]
fn ambiguous_command_form_is_rejected() -> TestResult {
    let dir = tempdir()?;
    let path = dir.path().join("Checkpoint.toml");
    fs::write(
        &path,
        r#"
[feature.Both]
linux = { argv = ["ls"], shell = "ls" }
"#,
    )?;

    assert!(matches!(
        load_and_validate(&path),
        Err(CheckpointError::ConfigError(_))
    ));
    Ok(())
}

#[test]
fn explicit_missing_path_is_an_error() -> TestResult {
    let dir = tempdir()?;
    let missing = dir.path().join("nope.toml");
    assert!(load_or_default(Some(&missing)).is_err());
    Ok(())
}
