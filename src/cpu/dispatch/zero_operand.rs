/*!
Subroutine-return and zero-operand instructions: the 0o177770 decode
tier (RTS) and the exact full-word matches (HALT, WAIT, RESET, RTT).

RTT restores in stack order: the saved PC comes off first, then the
saved PSW; the PSW (and with it the processor mode and register banks)
is applied before control transfers, so the final PC load happens in
the restored context.
*/

use crate::bus::Unibus;
use crate::cpu::execute::pop_word;
use crate::cpu::state::{CpuState, PC};
use crate::diag::Diagnostics;
use crate::fault::MemoryFault;

/// Execute `instruction` if it is RTS or a zero-operand opcode.
pub(crate) fn dispatch(
    cpu: &mut CpuState,
    bus: &mut Unibus,
    diag: &dyn Diagnostics,
    instruction: u16,
) -> Result<bool, MemoryFault> {
    if instruction & 0o177770 == 0o000200 {
        // RTS: PC from the linkage register, register from the stack.
        let r = (instruction & 7) as usize;
        cpu.registers[PC] = cpu.registers[r];
        cpu.registers[r] = pop_word(cpu, bus)?;
        return Ok(true);
    }
    match instruction {
        0o000000 => {
            // HALT leaves the processor where it stands; stopping the
            // step loop is the driver's decision.
            diag.info("HALT");
        }
        0o000001 => {
            // WAIT: idle until an interrupt is delivered.
            cpu.waiting = true;
        }
        0o000005 => {
            // RESET: re-initialize the peripherals, not the processor.
            bus.io_reset();
        }
        0o000006 => {
            // RTT: pop PC, pop PSW, switch context, then transfer.
            let pc = pop_word(cpu, bus)?;
            let psw = pop_word(cpu, bus)?;
            cpu.write_psw(psw);
            cpu.set_pc(pc);
        }
        _ => return Ok(false),
    }
    Ok(true)
}
