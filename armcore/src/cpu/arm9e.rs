use serde::{Deserialize, Serialize};

use crate::cpu::cpu_modes::Mode;
use crate::cpu::exception::{Exception, VectorBase};
use crate::cpu::psr::{ConditionFlags, CpuState, ProcessorState, Psr};
use crate::cpu::register_bank::RegisterBank;
use crate::cpu::registers::Registers;

/// The privileged-state core: operating mode, condition flags, the
/// general register file, the banked registers and the exception entry
/// sequence.
///
/// Instruction semantics, memory and the fetch/execute loop live outside
/// this type; the loop advances the program counter and delivers pending
/// exceptions through [`Arm9e::service_exception`].
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Arm9e {
    pub state: ProcessorState,
    pub flags: ConditionFlags,
    pub registers: Registers,
    pub register_bank: RegisterBank,
    pub vector_base: VectorBase,
}

impl Arm9e {
    #[must_use]
    pub fn new(vector_base: VectorBase) -> Self {
        Self {
            vector_base,
            ..Default::default()
        }
    }

    /// The current program status register, packed on demand from the
    /// tracked state.
    #[must_use]
    pub fn cpsr(&self) -> Psr {
        Psr::compose(&self.state, &self.flags)
    }

    /// Unpack a composite value into the tracked state.
    ///
    /// A mode field outside the recognized set never reaches
    /// [`ProcessorState`]: the write is diagnosed and the current mode
    /// kept, while the remaining fields still apply.
    pub fn set_cpsr(&mut self, psr: Psr) {
        self.flags = ConditionFlags::from(psr);
        self.state.thumb = psr.state_bit();
        self.state.fiq_disable = psr.fiq_disable();
        self.state.irq_disable = psr.irq_disable();

        match Mode::try_from(psr.mode_bits()) {
            Ok(mode) => self.state.mode = mode,
            Err(_) => tracing::warn!(
                "invalid mode bits 0b{:05b} in PSR write, keeping {} mode",
                psr.mode_bits(),
                self.state.mode
            ),
        }
    }

    /// SPSR of the current mode. User and System have none; reading it
    /// there is diagnosed and yields the default value.
    #[must_use]
    pub fn spsr(&self) -> Psr {
        match self.state.mode {
            Mode::User | Mode::System => {
                tracing::warn!("no SPSR in {} mode", self.state.mode);
                Psr::default()
            }
            Mode::Fiq => self.register_bank.spsr_fiq,
            Mode::Irq => self.register_bank.spsr_irq,
            Mode::Supervisor => self.register_bank.spsr_svc,
            Mode::Abort => self.register_bank.spsr_abt,
            Mode::Undefined => self.register_bank.spsr_und,
        }
    }

    /// Write the SPSR of the current mode; dropped with a diagnostic in
    /// User and System.
    pub fn set_spsr(&mut self, psr: Psr) {
        match self.state.mode {
            Mode::User | Mode::System => {
                tracing::warn!("no SPSR in {} mode, write dropped", self.state.mode);
            }
            Mode::Fiq => self.register_bank.spsr_fiq = psr,
            Mode::Irq => self.register_bank.spsr_irq = psr,
            Mode::Supervisor => self.register_bank.spsr_svc = psr,
            Mode::Abort => self.register_bank.spsr_abt = psr,
            Mode::Undefined => self.register_bank.spsr_und = psr,
        }
    }

    /// Restore CPSR from the current mode's SPSR, the tail of an
    /// exception handler.
    pub fn spsr_to_cpsr(&mut self) {
        match self.state.mode {
            Mode::User | Mode::System => {
                tracing::warn!("no SPSR to restore in {} mode", self.state.mode);
            }
            _ => self.set_cpsr(self.spsr()),
        }
    }

    /// Read a register as the current mode sees it: banked storage for
    /// the indices the mode banks, the general file for everything else.
    #[must_use]
    pub fn bypass_read(&self, index: usize) -> u32 {
        match self.state.mode {
            Mode::User | Mode::System => self.registers.register_at(index),
            Mode::Fiq => match index {
                8 => self.register_bank.r8_fiq,
                9 => self.register_bank.r9_fiq,
                10 => self.register_bank.r10_fiq,
                11 => self.register_bank.r11_fiq,
                12 => self.register_bank.r12_fiq,
                13 => self.register_bank.r13_fiq,
                14 => self.register_bank.r14_fiq,
                _ => self.registers.register_at(index),
            },
            Mode::Irq => match index {
                13 => self.register_bank.r13_irq,
                14 => self.register_bank.r14_irq,
                _ => self.registers.register_at(index),
            },
            Mode::Supervisor => match index {
                13 => self.register_bank.r13_svc,
                14 => self.register_bank.r14_svc,
                _ => self.registers.register_at(index),
            },
            Mode::Abort => match index {
                13 => self.register_bank.r13_abt,
                14 => self.register_bank.r14_abt,
                _ => self.registers.register_at(index),
            },
            Mode::Undefined => match index {
                13 => self.register_bank.r13_und,
                14 => self.register_bank.r14_und,
                _ => self.registers.register_at(index),
            },
        }
    }

    /// Write a register as the current mode sees it. See
    /// [`Arm9e::bypass_read`] for the routing rule.
    pub fn bypass_write(&mut self, index: usize, value: u32) {
        match self.state.mode {
            Mode::User | Mode::System => self.registers.set_register_at(index, value),
            Mode::Fiq => match index {
                8 => self.register_bank.r8_fiq = value,
                9 => self.register_bank.r9_fiq = value,
                10 => self.register_bank.r10_fiq = value,
                11 => self.register_bank.r11_fiq = value,
                12 => self.register_bank.r12_fiq = value,
                13 => self.register_bank.r13_fiq = value,
                14 => self.register_bank.r14_fiq = value,
                _ => self.registers.set_register_at(index, value),
            },
            Mode::Irq => match index {
                13 => self.register_bank.r13_irq = value,
                14 => self.register_bank.r14_irq = value,
                _ => self.registers.set_register_at(index, value),
            },
            Mode::Supervisor => match index {
                13 => self.register_bank.r13_svc = value,
                14 => self.register_bank.r14_svc = value,
                _ => self.registers.set_register_at(index, value),
            },
            Mode::Abort => match index {
                13 => self.register_bank.r13_abt = value,
                14 => self.register_bank.r14_abt = value,
                _ => self.registers.set_register_at(index, value),
            },
            Mode::Undefined => match index {
                13 => self.register_bank.r13_und = value,
                14 => self.register_bank.r14_und = value,
                _ => self.registers.set_register_at(index, value),
            },
        }
    }

    /// Deliver one exception: save the return address and the current
    /// CPSR into the target mode's bank, switch mode, mask interrupts
    /// and redirect the program counter to the vector.
    ///
    /// The caller owns priority arbitration and presents at most one
    /// kind per invocation. Hardware priority, highest first:
    ///
    /// 1. Reset
    /// 2. Data abort
    /// 3. FIQ
    /// 4. IRQ
    /// 5. Prefetch abort
    /// 6. Undefined instruction / SWI
    ///
    /// The program counter must already be advanced past the current
    /// instruction; its value is taken as the next-instruction address.
    pub fn service_exception(&mut self, exception: Exception) {
        if exception == Exception::Fiq && self.state.fiq_disable {
            return;
        }
        if exception == Exception::Irq && self.state.irq_disable {
            return;
        }

        let next_instruction = self.registers.program_counter();
        let cpsr = self.cpsr();
        let mut psr = cpsr;

        match exception {
            Exception::Reset => {
                self.register_bank.r14_svc = 0;
                self.register_bank.spsr_svc = Psr::default();
                psr.set_fiq_disable(true);
            }
            Exception::UndefinedInstruction => {
                self.register_bank.r14_und = next_instruction;
                self.register_bank.spsr_und = cpsr;
            }
            Exception::SoftwareInterrupt => {
                self.register_bank.r14_svc = next_instruction;
                self.register_bank.spsr_svc = cpsr;
            }
            Exception::PrefetchAbort => {
                self.register_bank.r14_abt = next_instruction;
                self.register_bank.spsr_abt = cpsr;
            }
            Exception::DataAbort => {
                // Data aborts link past the aborted instruction's
                // successor.
                self.register_bank.r14_abt = next_instruction.wrapping_add(4);
                self.register_bank.spsr_abt = cpsr;
            }
            Exception::Irq => {
                self.register_bank.r14_irq = next_instruction.wrapping_add(4);
                self.register_bank.spsr_irq = cpsr;
            }
            Exception::Fiq => {
                self.register_bank.r14_fiq = next_instruction.wrapping_add(4);
                self.register_bank.spsr_fiq = cpsr;
                psr.set_fiq_disable(true);
            }
        }

        psr.set_mode(exception.target_mode());
        psr.set_cpu_state(CpuState::Arm);
        psr.set_irq_disable(true);
        self.set_cpsr(psr);

        self.registers
            .set_program_counter(exception.vector(self.vector_base));
    }
}
