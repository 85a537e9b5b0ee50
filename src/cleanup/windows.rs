// src/cleanup/windows.rs

use tracing::debug;

use super::StepRunner;
use crate::exec::CommandSpec;
use crate::sink::LogSink;

/// `(description, PowerShell script)` pairs run in order.
const CLEAN_STEPS: &[(&str, &str)] = &[
    (
        "Emptying Recycle Bin",
        "Clear-RecycleBin -Force -ErrorAction SilentlyContinue",
    ),
    (
        "Cleaning User Temp (%TEMP%)",
        "Get-ChildItem -Path $env:TEMP -Recurse -Force -ErrorAction SilentlyContinue | Remove-Item -Recurse -Force -ErrorAction SilentlyContinue",
    ),
    (
        r"Cleaning System Temp (C:\Windows\Temp)",
        r"Get-ChildItem -Path 'C:\Windows\Temp' -Recurse -Force -ErrorAction SilentlyContinue | Remove-Item -Recurse -Force -ErrorAction SilentlyContinue",
    ),
    (
        "Cleaning Chrome Cache",
        r#"Get-ChildItem -Path "$env:LOCALAPPDATA\Google\Chrome\User Data\Default\Cache\*" -Recurse -Force -ErrorAction SilentlyContinue | Remove-Item -Recurse -Force -ErrorAction SilentlyContinue"#,
    ),
    (
        "Cleaning Edge Cache",
        r#"Get-ChildItem -Path "$env:LOCALAPPDATA\Microsoft\Edge\User Data\Default\Cache\*" -Recurse -Force -ErrorAction SilentlyContinue | Remove-Item -Recurse -Force -ErrorAction SilentlyContinue"#,
    ),
    (
        "Cleaning Recent Items",
        r#"Get-ChildItem -Path "$env:APPDATA\Microsoft\Windows\Recent\*" -Recurse -Force -ErrorAction SilentlyContinue | Remove-Item -Recurse -Force -ErrorAction SilentlyContinue"#,
    ),
];

const SCAN_STEPS: &[(&str, &str)] = &[
    (
        "Scanning Desktop",
        r"Get-ChildItem -Path $env:USERPROFILE\Desktop -Filter *exam* -Recurse -ErrorAction SilentlyContinue | Select-Object Name",
    ),
    (
        "Scanning Documents",
        r"Get-ChildItem -Path $env:USERPROFILE\Documents -Filter *exam* -Recurse -ErrorAction SilentlyContinue | Select-Object Name",
    ),
];

const DRIVE_STEP: (&str, &str) = (
    "Listing Removable Drives",
    r#"Get-CimInstance -ClassName Win32_LogicalDisk -Filter "DriveType = 2" | Select-Object DeviceID, VolumeName"#,
);

/// Windows cleanup: every step runs to completion before the next starts.
pub async fn run(steps: &dyn StepRunner, sink: &dyn LogSink) {
    sink.emit("[Clean Files] Starting Windows cleanup...");

    for (desc, script) in CLEAN_STEPS {
        run_step(steps, sink, desc, script).await;
    }

    sink.emit("  - Cleaning Thumbnails (Skipping to prevent explorer restart)");

    sink.emit("[Clean Files] Checking Documents/Desktop for 'exam' files...");
    for (desc, script) in SCAN_STEPS {
        run_step(steps, sink, desc, script).await;
    }

    sink.emit("[Clean Files] Checking Removable Drives...");
    run_step(steps, sink, DRIVE_STEP.0, DRIVE_STEP.1).await;

    sink.emit("[Clean Files] Windows Cleanup Summary Complete.");
}

async fn run_step(steps: &dyn StepRunner, sink: &dyn LogSink, desc: &str, script: &str) {
    sink.emit(&format!("  - {desc}..."));

    let spec = CommandSpec::powershell(script).hidden(true);

    match steps.run_step(&spec).await {
        Ok(out) if out.success => {
            let text = out.combined.trim_end();
            if text.is_empty() {
                sink.emit("    [OK] Completed.");
            } else {
                sink.emit(&format!("    [OK] {text}"));
            }
        }
        Ok(_) => sink.emit(&format!("    [INFO] {desc} (Partial/Locks)")),
        Err(e) => {
            debug!(step = desc, error = %e, "cleanup step could not run");
            sink.emit(&format!("    [INFO] {desc} (Partial/Locks)"));
        }
    }
}
