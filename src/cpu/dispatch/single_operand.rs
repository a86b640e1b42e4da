/*!
Single-operand instruction family (decode mask 0o177700).

One six-bit operand specifier in the low bits. JMP resolves the operand
as a transfer target; the previous-space moves (MFPI/MTPI) resolve the
operand address with current-mode side effects, access it through the
previous mode's translation, and stage the value over the current
stack.
*/

use crate::bus::Unibus;
use crate::cpu::addressing::{
    jump_target, load_byte_by_mode, load_word_by_mode, load_word_previous, operand_address,
    operate_byte_by_mode, operate_word_by_mode, store_byte_by_mode, store_word_by_mode,
    store_word_previous,
};
use crate::cpu::execute::{asl_word, inc_byte, inc_word, pop_word, push_word, swab_word};
use crate::cpu::state::{CpuState, PC};
use crate::fault::MemoryFault;

/// Execute `instruction` if it belongs to this family.
pub(crate) fn dispatch(
    cpu: &mut CpuState,
    bus: &mut Unibus,
    instruction: u16,
) -> Result<bool, MemoryFault> {
    let spec = instruction & 0o77;
    match instruction & 0o177700 {
        0o000100 => {
            // JMP
            cpu.registers[PC] = jump_target(cpu, bus, spec)?;
        }
        0o000300 => {
            // SWAB
            operate_word_by_mode(cpu, bus, spec, 0, swab_word)?;
        }
        0o005000 => {
            // CLR
            cpu.flag_n = false;
            cpu.flag_z = true;
            cpu.flag_v = false;
            cpu.flag_c = false;
            store_word_by_mode(cpu, bus, spec, 0)?;
        }
        0o005200 => {
            // INC
            operate_word_by_mode(cpu, bus, spec, 0, inc_word)?;
        }
        0o005700 => {
            // TST
            let value = load_word_by_mode(cpu, bus, spec)?;
            cpu.update_nz_word(value);
            cpu.flag_v = false;
            cpu.flag_c = false;
        }
        0o006300 => {
            // ASL
            operate_word_by_mode(cpu, bus, spec, 0, asl_word)?;
        }
        0o006500 => {
            // MFPI: previous-space word onto the current stack.
            let value = if spec & 0o70 == 0 {
                cpu.registers[(spec & 7) as usize]
            } else {
                let address = operand_address(cpu, bus, spec)?;
                load_word_previous(cpu, bus, address)?
            };
            cpu.update_nz_word(value);
            cpu.flag_v = false;
            push_word(cpu, bus, value)?;
        }
        0o006600 => {
            // MTPI: current stack word into the previous space.
            let value = pop_word(cpu, bus)?;
            cpu.update_nz_word(value);
            cpu.flag_v = false;
            if spec & 0o70 == 0 {
                cpu.registers[(spec & 7) as usize] = value;
            } else {
                let address = operand_address(cpu, bus, spec)?;
                store_word_previous(cpu, bus, address, value)?;
            }
        }
        0o006700 => {
            // SXT: spread N through the operand.
            let value = if cpu.flag_n { 0xffff } else { 0 };
            cpu.flag_z = !cpu.flag_n;
            cpu.flag_v = false;
            store_word_by_mode(cpu, bus, spec, value)?;
        }
        0o105000 => {
            // CLRB
            cpu.flag_n = false;
            cpu.flag_z = true;
            cpu.flag_v = false;
            cpu.flag_c = false;
            store_byte_by_mode(cpu, bus, spec, 0)?;
        }
        0o105200 => {
            // INCB
            operate_byte_by_mode(cpu, bus, spec, 0, inc_byte)?;
        }
        0o105700 => {
            // TSTB
            let value = load_byte_by_mode(cpu, bus, spec)?;
            cpu.update_nz_byte(value);
            cpu.flag_v = false;
            cpu.flag_c = false;
        }
        _ => return Ok(false),
    }
    Ok(true)
}
