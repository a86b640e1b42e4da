/*!
fault.rs - Typed fault and error values shared by the bus and CPU core.

Overview
========
Memory access failures are ordinary values, not panics: every bus accessor
returns `Result<_, MemoryFault>` and the CPU decides per fault variant
whether to vector through a trap or to surface a fatal `CpuError` to the
driver. Contract breaches (bad register index, forbidden addressing mode
for a jump target, unsupported translation context) are not represented
here; those panic at the breach site.

Fault classification
====================
- `Timeout`   - no RAM or device resolved an address below the I/O window.
                Recoverable: the CPU converts it into a trap through the
                bus-timeout vector.
- `Unmapped`  - an I/O-page address that no device register window claims.
                Fatal: propagated to the driver.
- `Misaligned`- odd address used for a word transfer. Fatal.

`CpuError` annotates the failure with the instruction word and the PC at
fetch time, both rendered in octal as PDP-11 convention dictates.
*/

use thiserror::Error;

/// A failed UNIBUS transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MemoryFault {
    /// Nothing resolved the address and it lies below the I/O window.
    #[error("bus timeout at {address:#08o}")]
    Timeout { address: u32 },

    /// An I/O-page address that no device register window claims.
    #[error("unmapped i/o address {address:#08o}")]
    Unmapped { address: u32 },

    /// Odd address on a word transfer.
    #[error("odd address {address:#08o} on word transfer")]
    Misaligned { address: u32 },
}

impl MemoryFault {
    /// Address the failed transaction targeted.
    #[inline]
    pub fn address(&self) -> u32 {
        match *self {
            MemoryFault::Timeout { address }
            | MemoryFault::Unmapped { address }
            | MemoryFault::Misaligned { address } => address,
        }
    }

    /// True when the CPU should vector through the bus-timeout trap
    /// instead of aborting the run.
    #[inline]
    pub fn is_trappable(&self) -> bool {
        matches!(self, MemoryFault::Timeout { .. })
    }
}

/// Fatal condition surfaced to the driver by `run_step`.
///
/// The instruction word is 0 when the failure happened during the opcode
/// fetch itself, before a word was available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CpuError {
    #[error("unknown instruction {instruction:#08o} at PC {pc:#08o}")]
    UnknownInstruction { instruction: u16, pc: u16 },

    #[error("{fault} on instruction {instruction:#08o} at PC {pc:#08o}")]
    Bus {
        fault: MemoryFault,
        instruction: u16,
        pc: u16,
    },
}
