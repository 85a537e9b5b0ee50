// src/exec/command_spec.rs

use std::fmt;

use tokio::process::Command;

/// Windows `CREATE_NO_WINDOW` process creation flag.
#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Everything needed to launch one external command.
///
/// Arguments are passed to the OS as discrete argv elements; nothing here is
/// interpreted by a shell unless the program itself is a shell (see
/// [`CommandSpec::powershell`] and [`CommandSpec::shell`]).
///
/// ```rust
/// use checkpoint::exec::CommandSpec;
///
/// let spec = CommandSpec::new("ping").args(["-c", "4", "8.8.8.8"]);
/// assert_eq!(spec.program, "ping");
/// assert_eq!(spec.args.len(), 3);
/// assert!(!spec.hidden);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Executable name, resolved through the usual `PATH` lookup.
    pub program: String,
    pub args: Vec<String>,
    /// On Windows, suppress the child's console window. No-op elsewhere.
    pub hidden: bool,
}

impl CommandSpec {
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            hidden: false,
        }
    }

    /// Run a PowerShell script without profile, prompts or banner.
    #[must_use]
    pub fn powershell(script: impl Into<String>) -> Self {
        Self::new("powershell").args([
            "-NoProfile".to_string(),
            "-NonInteractive".to_string(),
            "-NoLogo".to_string(),
            "-Command".to_string(),
            script.into(),
        ])
    }

    /// Run a script through `bash -c`.
    #[must_use]
    pub fn shell(script: impl Into<String>) -> Self {
        Self::new("bash").args(["-c".to_string(), script.into()])
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    /// Build the Tokio command for this spec. Stdio is left to the caller.
    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);

        #[cfg(windows)]
        if self.hidden {
            cmd.creation_flags(CREATE_NO_WINDOW);
        }

        cmd
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " \"{arg}\"")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}
