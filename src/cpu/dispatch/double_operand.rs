/*!
Double-operand instruction family (decode mask 0o170000).

Both operands are full six-bit specifiers. The source is resolved
completely — including any displacement-word fetch — before destination
resolution begins, so a source in index mode consumes its displacement
first and the destination sees the PC already advanced past it.

Word forms: MOV CMP BIT BIC BIS ADD; byte forms: MOVB CMPB BITB BICB
BISB; SUB occupies the byte column's 0o16 slot. BIS and BISB inherit
the exclusive-or combine documented in `cpu::execute`.
*/

use crate::bus::Unibus;
use crate::cpu::addressing::{
    load_byte_by_mode, load_word_by_mode, operate_byte_by_mode, operate_word_by_mode,
    store_byte_by_mode, store_word_by_mode,
};
use crate::cpu::execute::{
    add_word, bic_byte, bic_word, bis_byte, bis_word, bit_test_byte, bit_test_word, compare_byte,
    compare_word, sub_word,
};
use crate::cpu::state::CpuState;
use crate::fault::MemoryFault;

/// Execute `instruction` if it belongs to this family.
pub(crate) fn dispatch(
    cpu: &mut CpuState,
    bus: &mut Unibus,
    instruction: u16,
) -> Result<bool, MemoryFault> {
    let src_spec = (instruction >> 6) & 0o77;
    let dst_spec = instruction & 0o77;
    match instruction & 0o170000 {
        0o010000 => {
            // MOV: condition codes from the source, carry untouched.
            let src = load_word_by_mode(cpu, bus, src_spec)?;
            cpu.update_nz_word(src);
            cpu.flag_v = false;
            store_word_by_mode(cpu, bus, dst_spec, src)?;
        }
        0o020000 => {
            // CMP
            let src = load_word_by_mode(cpu, bus, src_spec)?;
            let dst = load_word_by_mode(cpu, bus, dst_spec)?;
            compare_word(cpu, src, dst);
        }
        0o030000 => {
            // BIT
            let src = load_word_by_mode(cpu, bus, src_spec)?;
            let dst = load_word_by_mode(cpu, bus, dst_spec)?;
            bit_test_word(cpu, src, dst);
        }
        0o040000 => {
            // BIC
            let src = load_word_by_mode(cpu, bus, src_spec)?;
            operate_word_by_mode(cpu, bus, dst_spec, src, bic_word)?;
        }
        0o050000 => {
            // BIS
            let src = load_word_by_mode(cpu, bus, src_spec)?;
            operate_word_by_mode(cpu, bus, dst_spec, src, bis_word)?;
        }
        0o060000 => {
            // ADD
            let src = load_word_by_mode(cpu, bus, src_spec)?;
            operate_word_by_mode(cpu, bus, dst_spec, src, add_word)?;
        }
        0o110000 => {
            // MOVB
            let src = load_byte_by_mode(cpu, bus, src_spec)?;
            cpu.update_nz_byte(src);
            cpu.flag_v = false;
            store_byte_by_mode(cpu, bus, dst_spec, src)?;
        }
        0o120000 => {
            // CMPB
            let src = load_byte_by_mode(cpu, bus, src_spec)?;
            let dst = load_byte_by_mode(cpu, bus, dst_spec)?;
            compare_byte(cpu, src, dst);
        }
        0o130000 => {
            // BITB
            let src = load_byte_by_mode(cpu, bus, src_spec)?;
            let dst = load_byte_by_mode(cpu, bus, dst_spec)?;
            bit_test_byte(cpu, src, dst);
        }
        0o140000 => {
            // BICB
            let src = load_byte_by_mode(cpu, bus, src_spec)?;
            operate_byte_by_mode(cpu, bus, dst_spec, src, bic_byte)?;
        }
        0o150000 => {
            // BISB
            let src = load_byte_by_mode(cpu, bus, src_spec)?;
            operate_byte_by_mode(cpu, bus, dst_spec, src, bis_byte)?;
        }
        0o160000 => {
            // SUB
            let src = load_word_by_mode(cpu, bus, src_spec)?;
            operate_word_by_mode(cpu, bus, dst_spec, src, sub_word)?;
        }
        _ => return Ok(false),
    }
    Ok(true)
}
