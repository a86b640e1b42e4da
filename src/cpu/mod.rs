/*!
cpu - The processor core, split by responsibility:

    state.rs        - Architectural state: register banks, modes, PSW.
    addressing.rs   - Operand-specifier resolution (8 modes x byte/word).
    execute.rs      - Instruction semantics: ALU transforms, flags, stack.
    dispatch/       - Tiered decode orchestration, one module per family,
                      plus trap delivery and the interrupt check.
    core/           - The `Cpu` facade implementing `Processor`.

The driver-facing surface is the `Processor` trait plus the facade's
PSW and interrupt entry points; everything below it is crate-internal
and free to evolve.
*/

use crate::bus::Unibus;
use crate::fault::CpuError;

pub mod addressing;
pub mod core;
pub mod dispatch;
pub mod execute;
pub mod state;

/// Driver-facing processor contract.
///
/// The bus collaborator is threaded into every step, so "bound before
/// first use" holds by construction wherever a machine owns both.
pub trait Processor {
    /// Full reset to the power-up state.
    fn init(&mut self);

    /// Execute exactly one instruction, or nothing while waiting.
    fn run_step(&mut self, bus: &mut Unibus) -> Result<(), CpuError>;

    /// Read a physical register file slot (0..=15).
    fn read_register(&mut self, index: usize) -> u16;

    /// Write a physical register file slot (0..=15).
    fn write_register(&mut self, index: usize, value: u16);
}

pub use crate::cpu::core::Cpu;
pub use crate::cpu::state::{CpuState, ProcessorMode};
