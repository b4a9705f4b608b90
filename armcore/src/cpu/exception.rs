use serde::{Deserialize, Serialize};

use crate::cpu::cpu_modes::Mode;

/// Where the exception vector table lives. Configured once per core and
/// never per delivery.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VectorBase {
    /// Vectors at 0x00000000, the reset default.
    #[default]
    Low,

    /// Vectors remapped to 0xFFFF0000.
    High,
}

/// The seven exception kinds the core can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exception {
    Reset,
    UndefinedInstruction,
    SoftwareInterrupt,
    PrefetchAbort,
    DataAbort,
    Irq,
    Fiq,
}

impl Exception {
    /// Address the program counter is redirected to on entry.
    #[must_use]
    pub const fn vector(self, base: VectorBase) -> u32 {
        let offset = match self {
            Self::Reset => 0x00,
            Self::UndefinedInstruction => 0x04,
            Self::SoftwareInterrupt => 0x08,
            Self::PrefetchAbort => 0x0C,
            Self::DataAbort => 0x10,
            Self::Irq => 0x18,
            Self::Fiq => 0x1C,
        };

        match base {
            VectorBase::Low => offset,
            VectorBase::High => 0xFFFF_0000 | offset,
        }
    }

    /// Mode the core switches to when taking this exception.
    #[must_use]
    pub const fn target_mode(self) -> Mode {
        match self {
            Self::Reset | Self::SoftwareInterrupt => Mode::Supervisor,
            Self::UndefinedInstruction => Mode::Undefined,
            Self::PrefetchAbort | Self::DataAbort => Mode::Abort,
            Self::Irq => Mode::Irq,
            Self::Fiq => Mode::Fiq,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn vector_table() {
        let table = [
            (Exception::Reset, 0x0000_0000),
            (Exception::UndefinedInstruction, 0x0000_0004),
            (Exception::SoftwareInterrupt, 0x0000_0008),
            (Exception::PrefetchAbort, 0x0000_000C),
            (Exception::DataAbort, 0x0000_0010),
            (Exception::Irq, 0x0000_0018),
            (Exception::Fiq, 0x0000_001C),
        ];

        for (exception, low) in table {
            assert_eq!(exception.vector(VectorBase::Low), low);
            assert_eq!(exception.vector(VectorBase::High), 0xFFFF_0000 | low);
        }
    }

    #[test]
    fn target_modes() {
        assert_eq!(Exception::Reset.target_mode(), Mode::Supervisor);
        assert_eq!(Exception::SoftwareInterrupt.target_mode(), Mode::Supervisor);
        assert_eq!(Exception::UndefinedInstruction.target_mode(), Mode::Undefined);
        assert_eq!(Exception::PrefetchAbort.target_mode(), Mode::Abort);
        assert_eq!(Exception::DataAbort.target_mode(), Mode::Abort);
        assert_eq!(Exception::Irq.target_mode(), Mode::Irq);
        assert_eq!(Exception::Fiq.target_mode(), Mode::Fiq);
    }
}
