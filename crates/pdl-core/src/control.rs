//! Run control over IPC: commands a client (e.g. `pdl suspend`) sends to a live `pdl run`.
//!
//! Protocol: one line per command, `suspend`, `resume` or `cancel`.

use std::fmt;
use std::path::PathBuf;

use crate::runner::RunControl;

/// A control request for the run in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    Suspend,
    Resume,
    Cancel,
}

impl ControlCommand {
    pub fn as_str(self) -> &'static str {
        match self {
            ControlCommand::Suspend => "suspend",
            ControlCommand::Resume => "resume",
            ControlCommand::Cancel => "cancel",
        }
    }

    /// Parse one protocol line. Surrounding whitespace is ignored; anything else is `None`.
    pub fn parse_line(line: &str) -> Option<Self> {
        match line.trim() {
            "suspend" => Some(ControlCommand::Suspend),
            "resume" => Some(ControlCommand::Resume),
            "cancel" => Some(ControlCommand::Cancel),
            _ => None,
        }
    }

    /// Apply the command to a runner's control flags.
    pub fn apply(self, control: &RunControl) {
        match self {
            ControlCommand::Suspend => control.suspend(),
            ControlCommand::Resume => control.resume(),
            ControlCommand::Cancel => control.cancel_all(),
        }
    }
}

impl fmt::Display for ControlCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Default path for the control socket (same XDG state dir as the DB).
pub fn default_control_socket_path() -> std::io::Result<PathBuf> {
    let dir = xdg::BaseDirectories::with_prefix("pdl")?
        .get_state_home()
        .join("pdl");
    Ok(dir.join("control.sock"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_known_lines() {
        assert_eq!(ControlCommand::parse_line("suspend"), Some(ControlCommand::Suspend));
        assert_eq!(ControlCommand::parse_line("  resume\n"), Some(ControlCommand::Resume));
        assert_eq!(ControlCommand::parse_line("cancel"), Some(ControlCommand::Cancel));
    }

    #[test]
    fn parse_rejects_other_lines() {
        assert_eq!(ControlCommand::parse_line("pause 3"), None);
        assert_eq!(ControlCommand::parse_line(""), None);
        assert_eq!(ControlCommand::parse_line("SUSPEND"), None);
    }

    #[test]
    fn apply_toggles_flags() {
        let control = RunControl::new();
        ControlCommand::Suspend.apply(&control);
        assert!(control.is_suspended());
        ControlCommand::Resume.apply(&control);
        assert!(!control.is_suspended());
        ControlCommand::Cancel.apply(&control);
        assert!(control.is_cancelled());
    }

    #[test]
    fn line_roundtrip() {
        for cmd in [ControlCommand::Suspend, ControlCommand::Resume, ControlCommand::Cancel] {
            assert_eq!(ControlCommand::parse_line(&cmd.to_string()), Some(cmd));
        }
    }
}
