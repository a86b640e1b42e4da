/*!
Register-and-operand instruction family (decode mask 0o177000).

These carry a register field in bits 8..6 next to a regular six-bit
operand specifier: JSR, the extended arithmetic group (MUL, DIV, ASH)
and SOB. DIV addresses an even register pair selected by bits 8..7; the
low bit of the register field is not decoded.
*/

use crate::bus::Unibus;
use crate::cpu::addressing::{jump_target, load_word_by_mode};
use crate::cpu::execute::push_word;
use crate::cpu::state::{CpuState, PC};
use crate::fault::MemoryFault;

/// Execute `instruction` if it belongs to this family.
pub(crate) fn dispatch(
    cpu: &mut CpuState,
    bus: &mut Unibus,
    instruction: u16,
) -> Result<bool, MemoryFault> {
    let r = ((instruction >> 6) & 7) as usize;
    let operand_spec = instruction & 0o77;
    match instruction & 0o177000 {
        0o004000 => {
            // JSR: resolve the target first (index modes consume a
            // displacement word), then stack the link register and
            // leave the return address in it.
            let target = jump_target(cpu, bus, operand_spec)?;
            let link = cpu.registers[r];
            push_word(cpu, bus, link)?;
            cpu.registers[r] = cpu.registers[PC];
            cpu.registers[PC] = target;
        }
        0o070000 => {
            // MUL: signed 16x16 -> 32, split across the even/odd pair.
            let src = load_word_by_mode(cpu, bus, operand_spec)?;
            let product = (cpu.registers[r] as i16 as i32) * (src as i16 as i32);
            cpu.registers[r & !1] = (product >> 16) as u16;
            cpu.registers[r | 1] = product as u16;
            cpu.flag_n = product < 0;
            cpu.flag_z = product == 0;
            cpu.flag_v = false;
            cpu.flag_c = !(-32768..=32767).contains(&product);
        }
        0o071000 => {
            let pair = (r & !1, (r & !1) + 1);
            let dividend =
                (((cpu.registers[pair.0] as u32) << 16) | cpu.registers[pair.1] as u32) as i32;
            let divisor = load_word_by_mode(cpu, bus, operand_spec)? as i16 as i32;
            if divisor == 0 {
                cpu.flag_n = false;
                cpu.flag_z = true;
                cpu.flag_v = true;
                cpu.flag_c = true;
            } else if dividend == i32::MIN && divisor == -1 {
                // The one quotient even 32 bits cannot hold.
                cpu.flag_n = false;
                cpu.flag_z = false;
                cpu.flag_v = true;
                cpu.flag_c = false;
            } else {
                let quotient = dividend / divisor;
                cpu.flag_n = (quotient >> 15) & 1 != 0;
                if !(-32768..=32767).contains(&quotient) {
                    cpu.flag_z = false;
                    cpu.flag_v = true;
                    cpu.flag_c = false;
                } else {
                    cpu.registers[pair.0] = quotient as u16;
                    cpu.registers[pair.1] = (dividend % divisor) as u16;
                    cpu.flag_z = quotient == 0;
                    cpu.flag_v = false;
                    cpu.flag_c = false;
                }
            }
        }
        0o072000 => {
            // ASH: signed six-bit shift count, bit 5 selects direction.
            let src = load_word_by_mode(cpu, bus, operand_spec)?;
            let count = (src & 0o37) as u32;
            let value = cpu.registers[r];
            if src & 0o40 == 0 {
                // Left shift through a 32-bit window; C is bit 16.
                let wide = (value as u32).wrapping_shl(count);
                cpu.flag_n = wide & 0x8000 != 0;
                cpu.flag_z = wide == 0;
                cpu.flag_v = (wide ^ value as u32) & 0x8000 != 0;
                cpu.flag_c = wide & 0x10000 != 0;
                cpu.registers[r] = wide as u16;
            } else {
                // Right shift, sign extending; effective count clamps
                // at 16 so the sign saturates.
                let shift = (32 - count).min(16);
                let mut result = (value as u32) >> shift;
                if value & 0x8000 != 0 {
                    result |= (0xffffu32 << (16 - shift)) & 0xffff;
                }
                cpu.flag_n = result & 0x8000 != 0;
                cpu.flag_z = result == 0;
                cpu.flag_v = (result ^ value as u32) & 0x8000 != 0;
                cpu.flag_c = (value as u32 >> (shift - 1)) & 1 != 0;
                cpu.registers[r] = result as u16;
            }
        }
        0o077000 => {
            // SOB: unsigned backward displacement, always subtracted.
            let offset = instruction & 0o77;
            cpu.registers[r] = cpu.registers[r].wrapping_sub(1);
            if cpu.registers[r] != 0 {
                cpu.registers[PC] = cpu.registers[PC].wrapping_sub(offset * 2);
            }
        }
        _ => return Ok(false),
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::AddressSpace;
    use crate::cpu::state::SP;

    fn setup() -> (CpuState, Unibus) {
        let mut cpu = CpuState::new();
        cpu.registers[SP] = 0o2000;
        (cpu, Unibus::new())
    }

    #[test]
    fn jsr_links_through_r5() {
        let (mut cpu, mut bus) = setup();
        cpu.set_pc(0o3000);
        bus.write_word(0o3000, 0o500).unwrap(); // index displacement
        cpu.registers[5] = 0o123;
        cpu.registers[1] = 0o100;
        // JSR R5, 0o500(R1)
        assert!(dispatch(&mut cpu, &mut bus, 0o004561).unwrap());
        assert_eq!(bus.read_word(0o1776).unwrap(), 0o123); // old R5 stacked
        assert_eq!(cpu.registers[SP], 0o1776);
        assert_eq!(cpu.registers[5], 0o3002); // return address
        assert_eq!(cpu.pc(), 0o600);
    }

    #[test]
    fn mul_splits_product_across_pair() {
        let (mut cpu, mut bus) = setup();
        cpu.registers[2] = 0x4000;
        cpu.registers[0] = 4;
        // MUL R0, R2 -> 0x10000
        assert!(dispatch(&mut cpu, &mut bus, 0o070200).unwrap());
        assert_eq!(cpu.registers[2], 0x0001);
        assert_eq!(cpu.registers[3], 0x0000);
        assert!(cpu.flag_c); // exceeds 16-bit signed range
        assert!(!cpu.flag_n);
        assert!(!cpu.flag_z);
    }

    #[test]
    fn mul_negative_product() {
        let (mut cpu, mut bus) = setup();
        cpu.registers[0] = 0xffff; // -1
        cpu.registers[2] = 7;
        cpu.registers[1] = 0; // unused
        // MUL R2, R0-pair? use r=0: MUL R2, R0
        assert!(dispatch(&mut cpu, &mut bus, 0o070002).unwrap());
        // -7 across the pair
        assert_eq!(cpu.registers[0], 0xffff);
        assert_eq!(cpu.registers[1], 0xfff9);
        assert!(cpu.flag_n);
        assert!(!cpu.flag_c); // fits in 16 bits
    }

    #[test]
    fn div_by_zero_leaves_pair_untouched() {
        let (mut cpu, mut bus) = setup();
        cpu.registers[0] = 0x1234;
        cpu.registers[1] = 0x5678;
        cpu.registers[2] = 0;
        assert!(dispatch(&mut cpu, &mut bus, 0o071002).unwrap());
        assert_eq!(cpu.registers[0], 0x1234);
        assert_eq!(cpu.registers[1], 0x5678);
        assert!(!cpu.flag_n);
        assert!(cpu.flag_z);
        assert!(cpu.flag_v);
        assert!(cpu.flag_c);
    }

    #[test]
    fn div_most_negative_by_minus_one_overflows() {
        let (mut cpu, mut bus) = setup();
        cpu.registers[0] = 0x8000;
        cpu.registers[1] = 0x0000; // dividend 0x8000_0000
        cpu.registers[2] = 0xffff; // -1
        assert!(dispatch(&mut cpu, &mut bus, 0o071002).unwrap());
        assert_eq!(cpu.registers[0], 0x8000);
        assert_eq!(cpu.registers[1], 0x0000);
        assert!(cpu.flag_v);
        assert!(!cpu.flag_c);
        assert!(!cpu.flag_z);
        assert!(!cpu.flag_n);
    }

    #[test]
    fn div_quotient_and_remainder() {
        let (mut cpu, mut bus) = setup();
        cpu.registers[0] = 0;
        cpu.registers[1] = 100;
        cpu.registers[2] = 7;
        assert!(dispatch(&mut cpu, &mut bus, 0o071002).unwrap());
        assert_eq!(cpu.registers[0], 14);
        assert_eq!(cpu.registers[1], 2);
        assert!(!cpu.flag_v);
        assert!(!cpu.flag_c);
        assert!(!cpu.flag_z);
    }

    #[test]
    fn div_quotient_overflow_leaves_pair() {
        let (mut cpu, mut bus) = setup();
        cpu.registers[0] = 0x0001;
        cpu.registers[1] = 0x0000; // dividend 0x10000
        cpu.registers[2] = 1;
        assert!(dispatch(&mut cpu, &mut bus, 0o071002).unwrap());
        assert_eq!(cpu.registers[0], 0x0001);
        assert_eq!(cpu.registers[1], 0x0000);
        assert!(cpu.flag_v);
    }

    #[test]
    fn ash_left_shifts_and_reports_carry() {
        let (mut cpu, mut bus) = setup();
        cpu.registers[1] = 0xc000;
        cpu.registers[0] = 1; // shift left by one
        assert!(dispatch(&mut cpu, &mut bus, 0o072100).unwrap());
        assert_eq!(cpu.registers[1], 0x8000);
        assert!(cpu.flag_c); // bit 16 took the old sign
        assert!(cpu.flag_n);
    }

    #[test]
    fn ash_right_is_sign_extending() {
        let (mut cpu, mut bus) = setup();
        cpu.registers[1] = 0x8000;
        cpu.registers[0] = 0o76; // -2: shift right by two
        assert!(dispatch(&mut cpu, &mut bus, 0o072100).unwrap());
        assert_eq!(cpu.registers[1], 0xe000);
        assert!(cpu.flag_n);
        assert!(!cpu.flag_z);
    }

    #[test]
    fn sob_loops_until_zero() {
        let (mut cpu, mut bus) = setup();
        cpu.registers[3] = 2;
        cpu.set_pc(0o1000);
        // SOB R3, back 3 words
        assert!(dispatch(&mut cpu, &mut bus, 0o077303).unwrap());
        assert_eq!(cpu.registers[3], 1);
        assert_eq!(cpu.pc(), 0o1000 - 6);

        cpu.set_pc(0o1000);
        assert!(dispatch(&mut cpu, &mut bus, 0o077303).unwrap());
        assert_eq!(cpu.registers[3], 0);
        assert_eq!(cpu.pc(), 0o1000); // fell through
    }

    #[test]
    fn unrelated_opcode_declines() {
        let (mut cpu, mut bus) = setup();
        assert!(!dispatch(&mut cpu, &mut bus, 0o000400).unwrap());
    }
}
