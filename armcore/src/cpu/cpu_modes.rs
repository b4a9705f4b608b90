use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    /// The normal ARM program execution state.
    User = 0b10000,

    /// Designed to support a data transfer or channel process.
    Fiq = 0b10001,

    /// Used for general-purpose interrupt handling.
    Irq = 0b10010,

    /// Protected mode for the operating system
    Supervisor = 0b10011,

    /// Entered after a data or instruction prefetch abort.
    Abort = 0b10111,

    /// Entered when an undefined instruction is executed
    Undefined = 0b11011,

    /// A privileged user mode for the operating system.
    System = 0b11111,
}

impl Mode {
    /// Every mode but User may touch privileged state.
    #[must_use]
    pub const fn is_privileged(self) -> bool {
        !matches!(self, Self::User)
    }
}

impl From<Mode> for u32 {
    fn from(m: Mode) -> Self {
        m as Self
    }
}

impl TryFrom<u32> for Mode {
    type Error = String;

    fn try_from(n: u32) -> Result<Self, Self::Error> {
        match n {
            0b10000 => Ok(Self::User),
            0b10001 => Ok(Self::Fiq),
            0b10010 => Ok(Self::Irq),
            0b10011 => Ok(Self::Supervisor),
            0b10111 => Ok(Self::Abort),
            0b11011 => Ok(Self::Undefined),
            0b11111 => Ok(Self::System),
            _ => Err(format!("Unexpected value for Mode: 0b{n:05b}")),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::User => "USER",
            Self::Fiq => "FIQ",
            Self::Irq => "IRQ",
            Self::Supervisor => "SUPERVISOR",
            Self::Abort => "ABORT",
            Self::Undefined => "UNDEFINED",
            Self::System => "SYSTEM",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_user_is_unprivileged() {
        assert!(!Mode::User.is_privileged());

        assert!(Mode::Fiq.is_privileged());
        assert!(Mode::Irq.is_privileged());
        assert!(Mode::Supervisor.is_privileged());
        assert!(Mode::Abort.is_privileged());
        assert!(Mode::Undefined.is_privileged());
        assert!(Mode::System.is_privileged());
    }

    #[test]
    fn rejects_unknown_mode_bits() {
        assert!(Mode::try_from(0b00000).is_err());
        assert!(Mode::try_from(0b10100).is_err());
        assert!(Mode::try_from(0b11110).is_err());
    }

    #[test]
    fn display_names() {
        assert_eq!(Mode::User.to_string(), "USER");
        assert_eq!(Mode::Supervisor.to_string(), "SUPERVISOR");
        assert_eq!(Mode::Undefined.to_string(), "UNDEFINED");
    }
}
