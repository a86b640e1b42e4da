/*!
machine.rs - The assembled PDP-11: one processor, one UNIBUS.

`Pdp11` owns both halves and threads the bus into every processor call,
which is what makes the bind-before-first-step contract impossible to
violate from outside. The driver loop runs bounded instruction batches;
interrupt sources are polled once per batch, between instructions, so a
WAITing processor wakes at batch granularity.

Booting follows the hardware convention: program the disk controller
for a 512-word read of block zero into memory at zero and start the
function; the caller then points the PC at zero.
*/

use crate::bus::{AddressSpace, Unibus};
use crate::cpu::core::{REG_FILE_PC, REG_FILE_R00};
use crate::cpu::{Cpu, Processor};
use crate::devices::rk::{RKBA_ADDRESS, RKCS_ADDRESS, RKDA_ADDRESS, RKWC_ADDRESS};
use crate::diag::{DiagHandle, null_diag};
use crate::fault::{CpuError, MemoryFault};

/// Instructions per `run` batch, matching the historical driver cadence.
pub const DEFAULT_BATCH: usize = 10_000;

/// A complete machine: processor plus bus.
pub struct Pdp11 {
    pub cpu: Cpu,
    pub bus: Unibus,
    diag: DiagHandle,
}

impl Default for Pdp11 {
    fn default() -> Self {
        Self::new()
    }
}

impl Pdp11 {
    /// Machine with silent diagnostics.
    pub fn new() -> Self {
        Self::with_diagnostics(null_diag())
    }

    pub fn with_diagnostics(diag: DiagHandle) -> Self {
        Self {
            cpu: Cpu::with_diagnostics(diag.clone()),
            bus: Unibus::with_diagnostics(diag.clone()),
            diag,
        }
    }

    /// Run one bounded batch of instruction steps, then poll
    /// interrupts once. Errors carry the faulting opcode and PC.
    pub fn run(&mut self, steps: usize) -> Result<(), CpuError> {
        for _ in 0..steps {
            self.cpu.run_step(&mut self.bus)?;
        }
        self.cpu.check_interrupt(&mut self.bus)
    }

    /// Mount raw image bytes as drive zero.
    pub fn mount_rk0(&mut self, image: &[u8]) {
        self.bus.rk.mount(image);
    }

    /// Program the disk controller to read boot block zero (512 words)
    /// to memory address zero and start the transfer.
    pub fn boot_rk0(&mut self) -> Result<(), MemoryFault> {
        self.bus.write_word(RKWC_ADDRESS, (0x10000 - 512) as u16)?;
        self.bus.write_word(RKBA_ADDRESS, 0)?;
        self.bus.write_word(RKDA_ADDRESS, 0)?;
        self.bus.write_word(RKCS_ADDRESS, 0o5) // READ | GO
    }

    /// Narrate the register file through diagnostics, octal.
    pub fn dump(&mut self) {
        let pc = self.cpu.read_register(REG_FILE_PC);
        let mut line = String::new();
        for r in 0..6 {
            let value = self.cpu.read_register(REG_FILE_R00 + r);
            line.push_str(&format!("R{r}:{value:#08o},"));
        }
        line.push_str(&format!("PC:{pc:#08o}"));
        self.diag.info(&line);
    }
}
