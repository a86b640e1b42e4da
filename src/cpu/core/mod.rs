/*!
core::Cpu - Driver-facing processor facade wrapping `CpuState`.

The facade owns the architectural state and the injected diagnostics
sink, and exposes the external contract: `init`, `run_step`,
`check_interrupt`, the sixteen-slot physical register file, and the
PSW. Instruction semantics live in `cpu::dispatch`; this type only
orchestrates.

Physical register file
======================
External inspection addresses physical storage, not the logical working
set:

    0..=5    general register bank 0 (R0-R5)
    6..=11   general register bank 1 (R0-R5)
    12       user stack pointer
    13       supervisor stack pointer
    14       kernel stack pointer
    15       program counter

Every access first flushes the live logical bank into physical storage
and a write reloads afterwards, so callers always observe the bank the
processor is actually using. An index outside 0..=15 is a caller bug
and panics.
*/

use crate::bus::Unibus;
use crate::cpu::state::{CpuState, PC, ProcessorMode};
use crate::cpu::{Processor, dispatch};
use crate::diag::{DiagHandle, null_diag};
use crate::fault::CpuError;

/// Physical register file slots.
pub const REG_FILE_R00: usize = 0;
pub const REG_FILE_R10: usize = 6;
pub const REG_FILE_USER_SP: usize = 12;
pub const REG_FILE_SUPERVISOR_SP: usize = 13;
pub const REG_FILE_KERNEL_SP: usize = 14;
pub const REG_FILE_PC: usize = 15;
const REG_FILE_SLOTS: usize = 16;

/// The processor: architectural state plus the diagnostics seam.
pub struct Cpu {
    state: CpuState,
    diag: DiagHandle,
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

impl Cpu {
    /// Processor with silent diagnostics.
    pub fn new() -> Self {
        Self::with_diagnostics(null_diag())
    }

    pub fn with_diagnostics(diag: DiagHandle) -> Self {
        Self {
            state: CpuState::new(),
            diag,
        }
    }

    /// Immutable view of the architectural state.
    pub fn state(&self) -> &CpuState {
        &self.state
    }

    /// Mutable state access for tests and embedders that stage
    /// scenarios directly.
    pub fn state_mut(&mut self) -> &mut CpuState {
        &mut self.state
    }

    /// True after WAIT, until an interrupt arrives.
    pub fn is_waiting(&self) -> bool {
        self.state.is_waiting()
    }

    /// Packed processor status word.
    pub fn read_psw(&self) -> u16 {
        self.state.read_psw()
    }

    /// Replace the processor status word, rebanking registers as the
    /// mode and register-set fields dictate.
    pub fn write_psw(&mut self, value: u16) {
        self.state.write_psw(value);
    }

    /// Poll interrupt sources; delivers through the vector and wakes
    /// WAIT when one is pending and the priority admits it.
    pub fn check_interrupt(&mut self, bus: &mut Unibus) -> Result<(), CpuError> {
        dispatch::check_interrupt(&mut self.state, bus)
    }
}

impl Processor for Cpu {
    fn init(&mut self) {
        self.state.init();
    }

    fn run_step(&mut self, bus: &mut Unibus) -> Result<(), CpuError> {
        dispatch::step(&mut self.state, bus, &*self.diag)
    }

    fn read_register(&mut self, index: usize) -> u16 {
        assert!(index < REG_FILE_SLOTS, "register file index {index} out of range");
        self.state.store_registers();
        match index {
            0..=5 => self.state.general[0][index],
            6..=11 => self.state.general[1][index - REG_FILE_R10],
            REG_FILE_USER_SP => self.state.stack_pointer[ProcessorMode::User as usize],
            REG_FILE_SUPERVISOR_SP => self.state.stack_pointer[ProcessorMode::Supervisor as usize],
            REG_FILE_KERNEL_SP => self.state.stack_pointer[ProcessorMode::Kernel as usize],
            _ => self.state.registers[PC],
        }
    }

    fn write_register(&mut self, index: usize, value: u16) {
        assert!(index < REG_FILE_SLOTS, "register file index {index} out of range");
        self.state.store_registers();
        match index {
            0..=5 => self.state.general[0][index] = value,
            6..=11 => self.state.general[1][index - REG_FILE_R10] = value,
            REG_FILE_USER_SP => self.state.stack_pointer[ProcessorMode::User as usize] = value,
            REG_FILE_SUPERVISOR_SP => {
                self.state.stack_pointer[ProcessorMode::Supervisor as usize] = value
            }
            REG_FILE_KERNEL_SP => self.state.stack_pointer[ProcessorMode::Kernel as usize] = value,
            _ => self.state.registers[PC] = value,
        }
        self.state.load_registers();
    }
}
