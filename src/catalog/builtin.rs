// src/catalog/builtin.rs

//! The feature table shipped with the binary.

use std::collections::BTreeMap;

use super::{CommandKind, CompositeAction, FeatureAction, FeatureDef, PlatformCommand};
use crate::types::Platform;

pub const CATEGORY_NETWORK: &str = "Network";
pub const CATEGORY_SYSTEM: &str = "Application / System";
pub const CATEGORY_MALWARE: &str = "Malware / Anti Virus";
pub const CATEGORY_REMOTE: &str = "Remote Services";
pub const CATEGORY_CLEAN: &str = "Clean Files";

pub const FULL_CLEANUP: &str = "Run Full Cleanup";

#[derive(Clone, Copy)]
enum Cmd {
    None,
    Argv(&'static [&'static str]),
    Ps(&'static str),
    Sh(&'static str),
}

struct Entry {
    id: &'static str,
    category: &'static str,
    windows: Cmd,
    macos: Cmd,
    linux: Cmd,
    notices: &'static [(Platform, &'static str)],
}

const NO_NOTICES: &[(Platform, &str)] = &[];

const TABLE: &[Entry] = &[
    // Network
    Entry {
        id: "Cek IP",
        category: CATEGORY_NETWORK,
        windows: Cmd::Argv(&["ipconfig", "/all"]),
        macos: Cmd::Argv(&["ifconfig"]),
        linux: Cmd::Argv(&["ip", "addr"]),
        notices: NO_NOTICES,
    },
    Entry {
        id: "Cek Routing",
        category: CATEGORY_NETWORK,
        windows: Cmd::Argv(&["tracert", "8.8.8.8"]),
        macos: Cmd::Argv(&["netstat", "-nr"]),
        linux: Cmd::Argv(&["ip", "route"]),
        notices: NO_NOTICES,
    },
    Entry {
        id: "Netstat",
        category: CATEGORY_NETWORK,
        windows: Cmd::Argv(&["netstat", "-a"]),
        macos: Cmd::Argv(&["netstat", "-a"]),
        linux: Cmd::Argv(&["ss", "-a"]),
        notices: NO_NOTICES,
    },
    Entry {
        id: "ARP Table",
        category: CATEGORY_NETWORK,
        windows: Cmd::Argv(&["arp", "-a"]),
        macos: Cmd::Argv(&["arp", "-a"]),
        linux: Cmd::Argv(&["ip", "neigh"]),
        notices: NO_NOTICES,
    },
    Entry {
        id: "Ping Connectivity",
        category: CATEGORY_NETWORK,
        windows: Cmd::Argv(&["ping", "8.8.8.8"]),
        macos: Cmd::Argv(&["ping", "-c", "4", "8.8.8.8"]),
        linux: Cmd::Argv(&["ping", "-c", "4", "8.8.8.8"]),
        notices: NO_NOTICES,
    },
    // Application / System
    Entry {
        id: "List PS Drives",
        category: CATEGORY_SYSTEM,
        windows: Cmd::Ps("Get-PSDrive | Format-Table -AutoSize"),
        macos: Cmd::Argv(&["df", "-h"]),
        linux: Cmd::Argv(&["df", "-h"]),
        notices: NO_NOTICES,
    },
    Entry {
        id: "Access HKLM Registry",
        category: CATEGORY_SYSTEM,
        windows: Cmd::Ps(
            r"Get-ItemProperty HKLM:\Software\Microsoft\Windows\CurrentVersion | Select-Object -Property ProgramFilesDir, CommonFilesDir, DevicePath",
        ),
        macos: Cmd::Argv(&["defaults", "read", "NSGlobalDomain"]),
        linux: Cmd::None,
        notices: NO_NOTICES,
    },
    Entry {
        id: "Startup Registry Check",
        category: CATEGORY_SYSTEM,
        windows: Cmd::Ps(
            "Get-CimInstance Win32_StartupCommand | Select-Object Name, Command, Location | Format-Table -AutoSize",
        ),
        macos: Cmd::Argv(&["ls", "-la", "/Library/LaunchAgents"]),
        linux: Cmd::Argv(&["ls", "-la", "/etc/xdg/autostart"]),
        notices: NO_NOTICES,
    },
    // Malware / Anti Virus
    Entry {
        id: "Microsoft Malware Removal Tool",
        category: CATEGORY_MALWARE,
        windows: Cmd::Ps(
            "Get-MpComputerStatus | Select-Object -Property AntivirusEnabled,AMServiceEnabled,AntispywareEnabled,BehaviorMonitorEnabled,IoavProtectionEnabled,NisEnabled,OnAccessProtectionEnabled | Format-List",
        ),
        macos: Cmd::Sh(r#"system_profiler SPInstallHistoryDataType | grep -A 5 "XProtect""#),
        linux: Cmd::None,
        notices: &[(
            Platform::Macos,
            "[INFO] MRT is Windows-only. Checking XProtect status instead...",
        )],
    },
    Entry {
        id: "Check Default Antivirus Status",
        category: CATEGORY_MALWARE,
        windows: Cmd::Ps("Get-MpComputerStatus | Format-List"),
        macos: Cmd::Argv(&["spctl", "--status"]),
        linux: Cmd::None,
        notices: NO_NOTICES,
    },
    // Remote Services
    Entry {
        id: "Windows Services",
        category: CATEGORY_REMOTE,
        windows: Cmd::Ps(
            "Get-Service | Where-Object {$_.Status -eq 'Running'} | Format-Table -AutoSize",
        ),
        macos: Cmd::Argv(&["launchctl", "list"]),
        linux: Cmd::Argv(&[
            "systemctl",
            "list-units",
            "--type=service",
            "--state=running",
            "--no-pager",
        ]),
        notices: NO_NOTICES,
    },
    Entry {
        id: "Remote System Properties",
        category: CATEGORY_REMOTE,
        windows: Cmd::Ps(
            "Get-ComputerInfo | Select-Object CsName, OsName, WindowsVersion, OsArchitecture, BiosVersion | Format-List",
        ),
        macos: Cmd::Argv(&["system_profiler", "SPSoftwareDataType"]),
        linux: Cmd::Argv(&["uname", "-a"]),
        notices: NO_NOTICES,
    },
    Entry {
        id: "Device Manager (Bluetooth)",
        category: CATEGORY_REMOTE,
        windows: Cmd::Ps(
            "Get-PnpDevice -Class Bluetooth | Select-Object Status, Class, FriendlyName, InstanceId | Format-Table -AutoSize",
        ),
        macos: Cmd::Argv(&["system_profiler", "SPBluetoothDataType"]),
        linux: Cmd::None,
        notices: NO_NOTICES,
    },
    Entry {
        id: "Registry Editor",
        category: CATEGORY_REMOTE,
        windows: Cmd::Ps(
            "Write-Output 'Registry Editor cannot be run silently. Please use system tools if GUI access is needed.'",
        ),
        macos: Cmd::Argv(&["open", "/Library/Preferences"]),
        linux: Cmd::None,
        notices: NO_NOTICES,
    },
    Entry {
        id: "Task Manager",
        category: CATEGORY_REMOTE,
        windows: Cmd::Ps(
            "Get-Process | Sort-Object CPU -Descending | Select-Object -First 20 | Format-Table -AutoSize",
        ),
        macos: Cmd::Argv(&["open", "-a", "Activity Monitor"]),
        linux: Cmd::Sh("ps aux --sort=-%cpu | head -n 21"),
        notices: NO_NOTICES,
    },
    Entry {
        id: "Startup Services",
        category: CATEGORY_REMOTE,
        windows: Cmd::Ps(
            "Get-CimInstance Win32_Service | Where-Object StartMode -eq 'Auto' | Select-Object Name, State, StartMode, PathName | Format-Table -AutoSize",
        ),
        macos: Cmd::Argv(&["ls", "-la", "/Library/LaunchDaemons"]),
        linux: Cmd::Argv(&[
            "systemctl",
            "list-unit-files",
            "--type=service",
            "--state=enabled",
            "--no-pager",
        ]),
        notices: NO_NOTICES,
    },
    // Clean Files (the full cleanup is added separately as a composite)
    Entry {
        id: "Open Temp Folder",
        category: CATEGORY_CLEAN,
        windows: Cmd::Ps(
            "Get-ChildItem -Path $env:TEMP -Recurse -Force -ErrorAction SilentlyContinue | Measure-Object -Property Length -Sum | Select-Object Count, @{Name='Total Size(MB)';Expression={[math]::round($_.Sum/1MB,2)}} | Format-List",
        ),
        macos: Cmd::Argv(&["open", "${TMPDIR}"]),
        linux: Cmd::Argv(&["du", "-sh", "/tmp"]),
        notices: NO_NOTICES,
    },
    Entry {
        id: "Open Trash / Recycle Bin",
        category: CATEGORY_CLEAN,
        windows: Cmd::Ps(
            r"Get-ChildItem 'C:\$Recycle.Bin' -Recurse -Force -ErrorAction SilentlyContinue | Measure-Object -Property Length -Sum | Select-Object Count, @{Name='Total Size(MB)';Expression={[math]::round($_.Sum/1MB,2)}} | Format-List",
        ),
        macos: Cmd::Argv(&["open", "${HOME}/.Trash"]),
        linux: Cmd::Argv(&["ls", "-la", "${HOME}/.local/share/Trash/files"]),
        notices: NO_NOTICES,
    },
    Entry {
        id: "Open Microsoft Office Temp Files",
        category: CATEGORY_CLEAN,
        windows: Cmd::Ps(
            r#"Get-ChildItem -Path "$env:APPDATA\Microsoft\Word\" -Filter *.asd -Recurse -ErrorAction SilentlyContinue | Select-Object Name, Length, LastWriteTime | Format-Table"#,
        ),
        macos: Cmd::Argv(&[
            "open",
            "${HOME}/Library/Containers/com.microsoft.Word/Data/Library/Preferences/AutoRecovery",
        ]),
        linux: Cmd::None,
        notices: NO_NOTICES,
    },
];

fn to_kind(cmd: Cmd) -> Option<CommandKind> {
    match cmd {
        Cmd::None => None,
        Cmd::Argv(argv) => Some(CommandKind::Argv(argv.iter().map(|s| s.to_string()).collect())),
        Cmd::Ps(script) => Some(CommandKind::PowerShell(script.to_string())),
        Cmd::Sh(script) => Some(CommandKind::Shell(script.to_string())),
    }
}

fn to_def(entry: &Entry) -> FeatureDef {
    let mut map = BTreeMap::new();
    for (platform, cmd) in [
        (Platform::Windows, entry.windows),
        (Platform::Macos, entry.macos),
        (Platform::Linux, entry.linux),
    ] {
        if let Some(kind) = to_kind(cmd) {
            let notices = entry
                .notices
                .iter()
                .filter(|(p, _)| *p == platform)
                .map(|(_, line)| line.to_string())
                .collect();
            map.insert(platform, PlatformCommand { kind, notices });
        }
    }

    FeatureDef {
        id: entry.id.to_string(),
        category: entry.category.to_string(),
        action: FeatureAction::Commands(map),
    }
}

/// All built-in features in display order.
pub fn builtin_features() -> Vec<FeatureDef> {
    let mut defs: Vec<FeatureDef> = TABLE.iter().map(to_def).collect();

    let cleanup = FeatureDef {
        id: FULL_CLEANUP.to_string(),
        category: CATEGORY_CLEAN.to_string(),
        action: FeatureAction::Composite(CompositeAction::FullCleanup),
    };
    let at = defs
        .iter()
        .position(|d| d.category == CATEGORY_CLEAN)
        .unwrap_or(defs.len());
    defs.insert(at, cleanup);

    defs
}
