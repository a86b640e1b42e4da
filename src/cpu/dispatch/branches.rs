/*!
Conditional branch family (decode mask 0o177400).

Each carries an 8-bit signed word displacement; a taken branch adds
twice the displacement to the PC, which already points past the branch
instruction. Predicates come straight from the condition-code
definitions: signed comparisons combine N and V, unsigned ones combine
C and Z.
*/

use crate::cpu::state::{CpuState, PC};

/// Execute `instruction` if it belongs to this family, returning
/// whether it did. Branches touch no memory and cannot fault.
pub(crate) fn dispatch(cpu: &mut CpuState, instruction: u16) -> bool {
    let taken = match instruction & 0o177400 {
        0o000400 => true,                                  // BR
        0o001000 => !cpu.flag_z,                           // BNE
        0o001400 => cpu.flag_z,                            // BEQ
        0o002000 => cpu.flag_n == cpu.flag_v,              // BGE
        0o002400 => cpu.flag_n != cpu.flag_v,              // BLT
        0o003000 => !cpu.flag_z && cpu.flag_n == cpu.flag_v, // BGT
        0o100000 => !cpu.flag_n,                           // BPL
        0o101000 => !cpu.flag_c && !cpu.flag_z,            // BHI
        0o101400 => cpu.flag_c || cpu.flag_z,              // BLOS
        0o103000 => !cpu.flag_c,                           // BCC
        0o103400 => cpu.flag_c,                            // BCS
        _ => return false,
    };
    if taken {
        let displacement = (instruction & 0o377) as u8 as i8 as i16;
        cpu.registers[PC] = cpu.registers[PC].wrapping_add((displacement as u16).wrapping_mul(2));
    }
    true
}
