/*!
state.rs - Architectural CPU state: the logical register working set, the
banked physical register file behind it, and the processor status word.

Overview
========
`CpuState` owns everything the PSW serializes plus the register storage.
It deliberately excludes bus logic, instruction decode and addressing —
those live in the sibling modules and operate on this struct.

Register model
==============
The executing instruction stream sees eight logical registers (R0-R5,
SP, PC). Behind them sit sixteen physical slots: R0-R5 twice (general
register set 0 and 1), one stack pointer per processor mode (kernel,
supervisor, user), and the shared PC. Exactly one general bank and one
stack pointer are live in the logical array at a time, chosen by the
PSW's register-set bit and current-mode field.

The synchronization rule is absolute: the logical array must be flushed
to physical storage (`store_registers`) before any change to the bank
selectors and reloaded (`load_registers`) after. Nothing detects a
violation — it silently corrupts register state — so every selector
change in this file is wrapped accordingly, and external register access
goes through the same discipline in `cpu::core`.

PSW layout
==========
Bit: 15 14 | 13 12 | 11 | 10..8 | 7 6 5 | 4 | 3 | 2 | 1 | 0
     curr  | prev  | rs |  --   |  pri  | T | N | Z | V | C

Reading and writing the PSW is bit-identical to the individual fields;
it is the single serialization point used by trap entry and RTT.
*/

use crate::mmu::Access;

/// Logical register indices.
pub const R0: usize = 0;
pub const R5: usize = 5;
pub const SP: usize = 6;
pub const PC: usize = 7;

/// PSW flag bit masks.
pub const PSW_CARRY: u16 = 0o000001;
pub const PSW_OVERFLOW: u16 = 0o000002;
pub const PSW_ZERO: u16 = 0o000004;
pub const PSW_NEGATIVE: u16 = 0o000010;
pub const PSW_TRACE: u16 = 0o000020;

/// Processor mode, as encoded in the PSW mode fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessorMode {
    Kernel = 0,
    Supervisor = 1,
    User = 2,
}

impl ProcessorMode {
    /// Decode a two-bit PSW mode field. The fourth encoding has no
    /// architectural meaning here and indicates corrupted state.
    pub fn from_bits(bits: u16) -> Self {
        match bits & 3 {
            0 => ProcessorMode::Kernel,
            1 => ProcessorMode::Supervisor,
            2 => ProcessorMode::User,
            _ => panic!("invalid processor mode encoding 3"),
        }
    }

    /// Translation context for memory references made in this mode.
    /// The MMU has no supervisor page set; reaching this in supervisor
    /// mode is a decode bug, not a guest-visible condition.
    pub fn access(self) -> Access {
        match self {
            ProcessorMode::Kernel => Access::Kernel,
            ProcessorMode::User => Access::User,
            ProcessorMode::Supervisor => {
                panic!("no translation context for supervisor mode")
            }
        }
    }
}

/// Architectural register and status state.
#[derive(Debug, Clone)]
pub struct CpuState {
    /// Logical working set: R0-R5, SP, PC.
    pub(crate) registers: [u16; 8],
    /// The two general register banks (R0-R5 each).
    pub(crate) general: [[u16; 6]; 2],
    /// Stack pointers banked by processor mode.
    pub(crate) stack_pointer: [u16; 3],

    pub(crate) current_mode: ProcessorMode,
    pub(crate) previous_mode: ProcessorMode,
    /// Which general register bank is live (0 or 1).
    pub(crate) register_set: u16,
    /// Interrupt priority level, three bits.
    pub(crate) priority: u16,

    pub(crate) flag_t: bool,
    pub(crate) flag_n: bool,
    pub(crate) flag_z: bool,
    pub(crate) flag_v: bool,
    pub(crate) flag_c: bool,

    /// Set by WAIT; cleared by interrupt or trap delivery.
    pub(crate) waiting: bool,
}

impl Default for CpuState {
    fn default() -> Self {
        Self::new()
    }
}

impl CpuState {
    /// Power-up state: kernel mode, bank 0, everything zero.
    pub fn new() -> Self {
        Self {
            registers: [0; 8],
            general: [[0; 6]; 2],
            stack_pointer: [0; 3],
            current_mode: ProcessorMode::Kernel,
            previous_mode: ProcessorMode::Kernel,
            register_set: 0,
            priority: 0,
            flag_t: false,
            flag_n: false,
            flag_z: false,
            flag_v: false,
            flag_c: false,
            waiting: false,
        }
    }

    /// Reset to the power-up state.
    pub fn init(&mut self) {
        *self = Self::new();
    }

    // ---------------------------------------------------------------------
    // Program counter
    // ---------------------------------------------------------------------

    #[inline]
    pub fn pc(&self) -> u16 {
        self.registers[PC]
    }

    #[inline]
    pub fn set_pc(&mut self, value: u16) {
        self.registers[PC] = value;
    }

    /// Advance the PC, wrapping at 16 bits.
    #[inline]
    pub fn advance_pc(&mut self, delta: u16) {
        self.registers[PC] = self.registers[PC].wrapping_add(delta);
    }

    // ---------------------------------------------------------------------
    // Mode and translation context
    // ---------------------------------------------------------------------

    #[inline]
    pub fn current_mode(&self) -> ProcessorMode {
        self.current_mode
    }

    #[inline]
    pub fn previous_mode(&self) -> ProcessorMode {
        self.previous_mode
    }

    /// Translation context for ordinary references in the current mode.
    #[inline]
    pub(crate) fn access(&self) -> Access {
        self.current_mode.access()
    }

    /// Translation context for previous-space references (MFPI/MTPI).
    #[inline]
    pub(crate) fn previous_access(&self) -> Access {
        self.previous_mode.access()
    }

    #[inline]
    pub fn is_waiting(&self) -> bool {
        self.waiting
    }

    // ---------------------------------------------------------------------
    // Condition code helpers
    // ---------------------------------------------------------------------

    /// Set N and Z from a 16-bit result.
    #[inline]
    pub(crate) fn update_nz_word(&mut self, value: u16) {
        self.flag_n = value & 0x8000 != 0;
        self.flag_z = value == 0;
    }

    /// Set N and Z from an 8-bit result.
    #[inline]
    pub(crate) fn update_nz_byte(&mut self, value: u8) {
        self.flag_n = value & 0x80 != 0;
        self.flag_z = value == 0;
    }

    // ---------------------------------------------------------------------
    // Processor status word
    // ---------------------------------------------------------------------

    /// Pack the status word.
    pub fn read_psw(&self) -> u16 {
        let mut psw = (self.current_mode as u16) << 14
            | (self.previous_mode as u16) << 12
            | (self.register_set & 1) << 11
            | (self.priority & 7) << 5;
        if self.flag_t {
            psw |= PSW_TRACE;
        }
        if self.flag_n {
            psw |= PSW_NEGATIVE;
        }
        if self.flag_z {
            psw |= PSW_ZERO;
        }
        if self.flag_v {
            psw |= PSW_OVERFLOW;
        }
        if self.flag_c {
            psw |= PSW_CARRY;
        }
        psw
    }

    /// Unpack a status word, switching register banks as the mode and
    /// register-set fields dictate. The live working set is flushed
    /// before and reloaded after, so no register value is lost.
    pub fn write_psw(&mut self, value: u16) {
        self.store_registers();
        self.current_mode = ProcessorMode::from_bits(value >> 14);
        self.previous_mode = ProcessorMode::from_bits(value >> 12);
        self.register_set = (value >> 11) & 1;
        self.priority = (value >> 5) & 7;
        self.flag_t = value & PSW_TRACE != 0;
        self.flag_n = value & PSW_NEGATIVE != 0;
        self.flag_z = value & PSW_ZERO != 0;
        self.flag_v = value & PSW_OVERFLOW != 0;
        self.flag_c = value & PSW_CARRY != 0;
        self.load_registers();
    }

    /// Record the mode an exception interrupted. Trap entry loads the
    /// vector PSW first and then stamps the pre-trap mode here so
    /// previous-space instructions see through to the interrupted
    /// context.
    pub(crate) fn set_previous_mode(&mut self, mode: ProcessorMode) {
        self.previous_mode = mode;
    }

    // ---------------------------------------------------------------------
    // Bank synchronization
    // ---------------------------------------------------------------------

    /// Flush the logical working set into the live physical banks.
    pub(crate) fn store_registers(&mut self) {
        let bank = (self.register_set & 1) as usize;
        self.general[bank].copy_from_slice(&self.registers[R0..=R5]);
        self.stack_pointer[self.current_mode as usize] = self.registers[SP];
    }

    /// Reload the logical working set from the live physical banks.
    pub(crate) fn load_registers(&mut self) {
        let bank = (self.register_set & 1) as usize;
        self.registers[R0..=R5].copy_from_slice(&self.general[bank]);
        self.registers[SP] = self.stack_pointer[self.current_mode as usize];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn power_up_defaults() {
        let s = CpuState::new();
        assert_eq!(s.current_mode(), ProcessorMode::Kernel);
        assert_eq!(s.read_psw(), 0);
        assert!(!s.is_waiting());
        assert_eq!(s.pc(), 0);
    }

    #[test]
    fn pc_advance_wraps() {
        let mut s = CpuState::new();
        s.set_pc(0xfffe);
        s.advance_pc(2);
        assert_eq!(s.pc(), 0);
    }

    #[test]
    fn psw_packs_every_field() {
        let mut s = CpuState::new();
        s.current_mode = ProcessorMode::User;
        s.previous_mode = ProcessorMode::Supervisor;
        s.register_set = 1;
        s.priority = 0o7;
        s.flag_t = true;
        s.flag_n = true;
        s.flag_z = false;
        s.flag_v = true;
        s.flag_c = true;
        assert_eq!(
            s.read_psw(),
            0b10_01_1_000_111_1_1_0_1_1u16,
        );
    }

    #[test]
    fn mode_switch_banks_the_stack_pointer() {
        let mut s = CpuState::new();
        s.registers[SP] = 0o1000; // kernel SP
        s.write_psw((ProcessorMode::User as u16) << 14);
        // Fresh user stack pointer, kernel value preserved in its bank.
        assert_eq!(s.registers[SP], 0);
        s.registers[SP] = 0o2000;
        s.write_psw(0); // back to kernel
        assert_eq!(s.registers[SP], 0o1000);
        s.write_psw((ProcessorMode::User as u16) << 14);
        assert_eq!(s.registers[SP], 0o2000);
    }

    #[test]
    fn register_set_switch_banks_the_generals() {
        let mut s = CpuState::new();
        s.registers[R0] = 0o111;
        s.registers[R5] = 0o555;
        s.write_psw(1 << 11); // select bank 1
        assert_eq!(s.registers[R0], 0);
        s.registers[R0] = 0o777;
        s.write_psw(0); // back to bank 0
        assert_eq!(s.registers[R0], 0o111);
        assert_eq!(s.registers[R5], 0o555);
        s.write_psw(1 << 11);
        assert_eq!(s.registers[R0], 0o777);
    }

    #[test]
    fn pc_survives_bank_switches() {
        let mut s = CpuState::new();
        s.set_pc(0o4000);
        s.write_psw((ProcessorMode::User as u16) << 14 | 1 << 11);
        assert_eq!(s.pc(), 0o4000);
    }

    #[test]
    #[should_panic(expected = "invalid processor mode encoding")]
    fn mode_bits_three_are_rejected() {
        let mut s = CpuState::new();
        s.write_psw(0b11 << 14);
    }

    proptest! {
        /// The PSW is the single serialization point: any valid field
        /// combination survives a write/read round trip bit-for-bit.
        #[test]
        fn psw_round_trips(
            cur in 0u16..3,
            prev in 0u16..3,
            rs in 0u16..2,
            pri in 0u16..8,
            flags in 0u16..32,
        ) {
            let psw = cur << 14 | prev << 12 | rs << 11 | pri << 5 | flags;
            let mut s = CpuState::new();
            s.write_psw(psw);
            prop_assert_eq!(s.read_psw(), psw);
        }
    }
}
