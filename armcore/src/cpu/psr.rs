//! # Program Status Register codec
//!
//! The composite PSR packs condition flags and control bits into one word:
//!
//! ```text
//! 31 30 29 28 27 26      8 7 6 5 4   0
//! ┌──┬──┬──┬──┬──┬────────┬─┬─┬─┬─────┐
//! │N │Z │C │V │Q │Reserved│I│F│T│Mode │
//! └──┴──┴──┴──┴──┴────────┴─┴─┴─┴─────┘
//! ```
//!
//! The composite value is never stored: the core keeps [`ProcessorState`]
//! and [`ConditionFlags`] as the source of truth and a [`Psr`] is packed
//! on demand ([`Psr::compose`]) and unpacked on write
//! (`Arm9e::set_cpsr`). Reserved bits read as zero and are ignored on
//! write.

use serde::{Deserialize, Serialize};

use crate::bitwise::Bits;
use crate::cpu::cpu_modes::Mode;

/// Operating mode and the control bits that travel with it.
///
/// Mutated only through composite register writes and exception entry;
/// everything else reads it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessorState {
    pub mode: Mode,
    /// F bit: fast interrupts are ignored while set.
    pub fiq_disable: bool,
    /// I bit: normal interrupts are ignored while set.
    pub irq_disable: bool,
    /// T bit: executing Thumb (true) or ARM (false) instructions.
    pub thumb: bool,
}

impl Default for ProcessorState {
    /// The reset values: User mode, both interrupts enabled, ARM state.
    fn default() -> Self {
        Self {
            mode: Mode::User,
            fiq_disable: false,
            irq_disable: false,
            thumb: false,
        }
    }
}

/// The condition flags, set by instruction behaviors and packed into
/// PSR bits 31-27.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionFlags {
    /// N: result was negative.
    pub sign: bool,
    /// Z: result was zero.
    pub zero: bool,
    /// C: carry out / no borrow.
    pub carry: bool,
    /// V: signed overflow.
    pub overflow: bool,
    /// Q: sticky saturation flag, cleared only by an explicit PSR write.
    pub sticky_overflow: bool,
    /// Redundant copy of the T bit, consulted only while packing and
    /// unpacking the composite register.
    pub state_bit: bool,
}

/// Program Status Register (CPSR or SPSR) as a packed 32-bit value.
///
/// # Example
///
/// ```
/// use armcore::cpu::psr::Psr;
///
/// let mut cpsr = Psr::default();
///
/// cpsr.set_zero_flag(true);
/// assert!(cpsr.zero_flag());
///
/// cpsr.set_carry_flag(true);
/// assert!(cpsr.carry_flag());
/// ```
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Psr(u32);

impl Psr {
    /// Pack processor state and condition flags into the architectural
    /// layout. Untracked bits are zero.
    #[must_use]
    pub fn compose(state: &ProcessorState, flags: &ConditionFlags) -> Self {
        let mut psr = Self(u32::from(state.mode));
        psr.set_state_bit(state.thumb);
        psr.set_fiq_disable(state.fiq_disable);
        psr.set_irq_disable(state.irq_disable);
        psr.set_sticky_overflow(flags.sticky_overflow);
        psr.set_overflow_flag(flags.overflow);
        psr.set_carry_flag(flags.carry);
        psr.set_zero_flag(flags.zero);
        psr.set_sign_flag(flags.sign);
        // The redundant flag copy can force the T bit on, matching the
        // original's packing order.
        if flags.state_bit {
            psr.set_state_bit(true);
        }
        psr
    }

    /// N => Bit 31, (0=Not Signed, 1=Signed)
    #[must_use]
    pub fn sign_flag(self) -> bool {
        self.0.get_bit(31)
    }

    /// Z => Bit 30, (0=Not Zero, 1=Zero)
    #[must_use]
    pub fn zero_flag(self) -> bool {
        self.0.get_bit(30)
    }

    /// C => Bit 29, (0=Borrow/No Carry, 1=Carry/No Borrow)
    #[must_use]
    pub fn carry_flag(self) -> bool {
        self.0.get_bit(29)
    }

    /// V => Bit 28, (0=No Overflow, 1=Overflow)
    #[must_use]
    pub fn overflow_flag(self) -> bool {
        self.0.get_bit(28)
    }

    /// Q => Bit 27, (1=Sticky Overflow)
    #[must_use]
    pub fn sticky_overflow(self) -> bool {
        self.0.get_bit(27)
    }

    /// I => Bit 7, (0=Enable, 1=Disable)
    #[must_use]
    pub fn irq_disable(self) -> bool {
        self.0.get_bit(7)
    }

    /// F => Bit 6, (0=Enable, 1=Disable)
    #[must_use]
    pub fn fiq_disable(self) -> bool {
        self.0.get_bit(6)
    }

    /// T => Bit 5, (0=ARM, 1=THUMB)
    #[must_use]
    pub fn state_bit(self) -> bool {
        self.0.get_bit(5)
    }

    /// M4-M0 => Bits 4-0, unvalidated.
    #[must_use]
    pub fn mode_bits(self) -> u32 {
        self.0.get_bits(0..=4)
    }

    pub fn set_sign_flag(&mut self, value: bool) {
        self.0.set_bit(31, value);
    }

    pub fn set_zero_flag(&mut self, value: bool) {
        self.0.set_bit(30, value);
    }

    pub fn set_carry_flag(&mut self, value: bool) {
        self.0.set_bit(29, value);
    }

    pub fn set_overflow_flag(&mut self, value: bool) {
        self.0.set_bit(28, value);
    }

    pub fn set_sticky_overflow(&mut self, value: bool) {
        self.0.set_bit(27, value);
    }

    pub fn set_irq_disable(&mut self, value: bool) {
        self.0.set_bit(7, value);
    }

    pub fn set_fiq_disable(&mut self, value: bool) {
        self.0.set_bit(6, value);
    }

    pub fn set_state_bit(&mut self, value: bool) {
        self.0.set_bit(5, value);
    }

    /// The Mode Bits M4-M0 contain the current operating mode.
    pub const fn set_mode(&mut self, m: Mode) {
        // Setting mode bits to 0
        self.0 &= 0b1111_1111_1111_1111_1111_1111_1110_0000;

        // Setting mode bits according to the chosen mode
        self.0 |= m as u32;
    }

    #[must_use]
    pub fn cpu_state(self) -> CpuState {
        self.state_bit().into()
    }

    pub fn set_cpu_state(&mut self, state: CpuState) {
        self.set_state_bit(state.into());
    }
}

impl From<u32> for Psr {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl From<Psr> for u32 {
    fn from(p: Psr) -> Self {
        p.0
    }
}

impl From<Psr> for ConditionFlags {
    fn from(psr: Psr) -> Self {
        Self {
            sign: psr.sign_flag(),
            zero: psr.zero_flag(),
            carry: psr.carry_flag(),
            overflow: psr.overflow_flag(),
            sticky_overflow: psr.sticky_overflow(),
            state_bit: psr.state_bit(),
        }
    }
}

/// The CPU execution state (ARM or Thumb), controlled by the T bit.
#[derive(Debug, PartialEq, Eq)]
pub enum CpuState {
    /// Thumb: 16-bit instructions.
    Thumb,
    /// ARM: 32-bit instructions.
    Arm,
}

impl From<CpuState> for bool {
    fn from(state: CpuState) -> Self {
        match state {
            CpuState::Arm => false,
            CpuState::Thumb => true,
        }
    }
}

impl From<bool> for CpuState {
    fn from(state: bool) -> Self {
        if state { Self::Thumb } else { Self::Arm }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    /// The bits this model tracks: flags, control bits and the mode field.
    const TRACKED: u32 = 0b1111_1000_0000_0000_0000_0000_1111_1111;

    #[test]
    fn check_sign_flag() {
        let mut cpsr = Psr::default();
        cpsr.set_sign_flag(true);
        assert!(cpsr.sign_flag());
        assert_eq!(u32::from(cpsr), 1 << 31);
    }

    #[test]
    fn check_zero_flag() {
        let mut cpsr = Psr::default();
        cpsr.set_zero_flag(true);
        assert!(cpsr.zero_flag());
        assert_eq!(u32::from(cpsr), 1 << 30);
    }

    #[test]
    fn check_carry_flag() {
        let mut cpsr = Psr::default();
        cpsr.set_carry_flag(true);
        assert!(cpsr.carry_flag());
        assert_eq!(u32::from(cpsr), 1 << 29);
    }

    #[test]
    fn check_overflow_flag() {
        let cpsr = Psr::from(0b0001_0000_0000_0000_0000_0000_0000_0000_u32);
        assert!(cpsr.overflow_flag());
    }

    #[test]
    fn check_sticky_overflow() {
        let mut cpsr = Psr::default();
        cpsr.set_sticky_overflow(true);
        assert!(cpsr.sticky_overflow());
        assert_eq!(u32::from(cpsr), 1 << 27);
    }

    #[test]
    fn check_irq_disable() {
        let mut cpsr = Psr::default();
        cpsr.set_irq_disable(true);
        assert!(cpsr.irq_disable());
        assert_eq!(u32::from(cpsr), 1 << 7);
    }

    #[test]
    fn check_fiq_disable() {
        let mut cpsr = Psr::default();
        cpsr.set_fiq_disable(true);
        assert!(cpsr.fiq_disable());
        assert_eq!(u32::from(cpsr), 1 << 6);
    }

    #[test]
    fn check_state_bit() {
        let mut cpsr = Psr::default();
        cpsr.set_state_bit(true);
        assert!(cpsr.state_bit());
        assert_eq!(cpsr.cpu_state(), CpuState::Thumb);
    }

    #[test]
    fn mode_bit_patterns() {
        for (mode, bits) in [
            (Mode::User, 0b10000),
            (Mode::Fiq, 0b10001),
            (Mode::Irq, 0b10010),
            (Mode::Supervisor, 0b10011),
            (Mode::Abort, 0b10111),
            (Mode::Undefined, 0b11011),
            (Mode::System, 0b11111),
        ] {
            let mut cpsr = Psr::default();
            cpsr.set_mode(mode);
            assert_eq!(cpsr.mode_bits(), bits);
            assert_eq!(Mode::try_from(cpsr.mode_bits()), Ok(mode));
        }
    }

    #[test]
    fn compose_packs_the_layout() {
        let state = ProcessorState {
            mode: Mode::Supervisor,
            fiq_disable: true,
            irq_disable: false,
            thumb: true,
        };
        let flags = ConditionFlags {
            sign: true,
            zero: false,
            carry: true,
            overflow: false,
            sticky_overflow: true,
            state_bit: false,
        };

        let psr = Psr::compose(&state, &flags);
        assert_eq!(
            u32::from(psr),
            (1 << 31) | (1 << 29) | (1 << 27) | (1 << 6) | (1 << 5) | 0b10011
        );
    }

    #[test]
    fn redundant_state_flag_forces_thumb_bit() {
        let state = ProcessorState::default();
        let flags = ConditionFlags {
            state_bit: true,
            ..ConditionFlags::default()
        };

        assert!(Psr::compose(&state, &flags).state_bit());
    }

    #[test]
    fn compose_round_trips_every_state() {
        let modes = [
            Mode::User,
            Mode::Fiq,
            Mode::Irq,
            Mode::Supervisor,
            Mode::Abort,
            Mode::Undefined,
            Mode::System,
        ];

        for _ in 0..1000 {
            let state = ProcessorState {
                mode: modes[rand::random::<u8>() as usize % modes.len()],
                fiq_disable: rand::random(),
                irq_disable: rand::random(),
                thumb: rand::random(),
            };
            let thumb = state.thumb;
            let flags = ConditionFlags {
                sign: rand::random(),
                zero: rand::random(),
                carry: rand::random(),
                overflow: rand::random(),
                sticky_overflow: rand::random(),
                // Keep the redundant copy coherent, as decode always does.
                state_bit: thumb,
            };

            let psr = Psr::compose(&state, &flags);
            assert_eq!(Mode::try_from(psr.mode_bits()), Ok(state.mode));
            assert_eq!(psr.fiq_disable(), state.fiq_disable);
            assert_eq!(psr.irq_disable(), state.irq_disable);
            assert_eq!(psr.state_bit(), state.thumb);
            assert_eq!(ConditionFlags::from(psr), flags);
        }
    }

    #[test]
    fn untracked_bits_read_as_zero_after_repack() {
        for _ in 0..1000 {
            let mut raw = rand::random::<u32>();
            // Force a recognized mode field so decode is well defined.
            raw = (raw & !0b11111) | 0b10010;

            let psr = Psr::from(raw);
            let state = ProcessorState {
                mode: Mode::try_from(psr.mode_bits()).unwrap(),
                fiq_disable: psr.fiq_disable(),
                irq_disable: psr.irq_disable(),
                thumb: psr.state_bit(),
            };
            let flags = ConditionFlags::from(psr);

            assert_eq!(u32::from(Psr::compose(&state, &flags)), raw & TRACKED);
        }
    }
}
