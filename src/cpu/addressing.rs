/*!
addressing.rs - Operand-specifier resolution shared by the dispatch tiers.

Overview
========
An operand specifier is six bits: a 3-bit addressing mode and a 3-bit
register. Eight modes exist — register, register-deferred, autoincrement
and autodecrement plus their deferred forms, index and index-deferred.
This module provides, for both operand sizes:

    load_*_by_mode      read an operand
    store_*_by_mode     write an operand
    operate_*_by_mode   read-modify-write through one resolution
    operand_address     effective address only (previous-space moves)
    jump_target         effective address for JMP/JSR

plus the MMU-mediated access helpers (`load_word`, `store_byte`, ...)
and the instruction-stream fetch.

Ordering rules
==============
Index modes consume a displacement word from the instruction stream,
advancing the PC; callers resolve the source operand completely before
touching the destination so displacement fetches happen in
source-then-destination order. Autoincrement steps the register after a
successful access, autodecrement before it; a faulted access therefore
leaves an autoincrement register unstepped, which is the state a trap
handler observes. Byte-sized autoincrement and autodecrement step
general registers by one but SP and PC always by two; the deferred
forms always step by two (they walk pointers, not operands).

Stack discipline
================
Push and pop are not separate mechanisms; they are the autodecrement and
autoincrement specifiers applied to SP (`PUSH`/`POP` below).
*/

use crate::bus::{AddressSpace, Unibus};
use crate::cpu::state::{CpuState, SP};
use crate::fault::MemoryFault;

/// Specifier synthesizing a stack push: autodecrement on SP.
pub(crate) const PUSH: u16 = (4 << 3) | SP as u16;
/// Specifier synthesizing a stack pop: autoincrement on SP.
pub(crate) const POP: u16 = (2 << 3) | SP as u16;

#[inline]
fn split(spec: u16) -> (u16, usize) {
    ((spec >> 3) & 7, (spec & 7) as usize)
}

/// Register step for byte-sized mode 2/4 access.
#[inline]
fn byte_step(r: usize) -> u16 {
    if r >= SP { 2 } else { 1 }
}

// ---------------------------------------------------------------------------
// MMU-mediated memory access
// ---------------------------------------------------------------------------

pub(crate) fn load_word(cpu: &CpuState, bus: &mut Unibus, vaddr: u16) -> Result<u16, MemoryFault> {
    let physical = bus.mmu.translate(vaddr, cpu.access());
    bus.read_word(physical)
}

pub(crate) fn store_word(
    cpu: &CpuState,
    bus: &mut Unibus,
    vaddr: u16,
    value: u16,
) -> Result<(), MemoryFault> {
    let physical = bus.mmu.translate(vaddr, cpu.access());
    bus.write_word(physical, value)
}

pub(crate) fn load_byte(cpu: &CpuState, bus: &mut Unibus, vaddr: u16) -> Result<u8, MemoryFault> {
    let physical = bus.mmu.translate(vaddr, cpu.access());
    bus.read_byte(physical)
}

pub(crate) fn store_byte(
    cpu: &CpuState,
    bus: &mut Unibus,
    vaddr: u16,
    value: u8,
) -> Result<(), MemoryFault> {
    let physical = bus.mmu.translate(vaddr, cpu.access());
    bus.write_byte(physical, value)
}

/// Word read through the previous mode's address space (MFPI).
pub(crate) fn load_word_previous(
    cpu: &CpuState,
    bus: &mut Unibus,
    vaddr: u16,
) -> Result<u16, MemoryFault> {
    let physical = bus.mmu.translate(vaddr, cpu.previous_access());
    bus.read_word(physical)
}

/// Word write through the previous mode's address space (MTPI).
pub(crate) fn store_word_previous(
    cpu: &CpuState,
    bus: &mut Unibus,
    vaddr: u16,
    value: u16,
) -> Result<(), MemoryFault> {
    let physical = bus.mmu.translate(vaddr, cpu.previous_access());
    bus.write_word(physical, value)
}

/// Fetch the next instruction-stream word, advancing the PC.
pub(crate) fn fetch_word(cpu: &mut CpuState, bus: &mut Unibus) -> Result<u16, MemoryFault> {
    let value = load_word(cpu, bus, cpu.pc())?;
    cpu.advance_pc(2);
    Ok(value)
}

// ---------------------------------------------------------------------------
// Word operand access
// ---------------------------------------------------------------------------

pub(crate) fn load_word_by_mode(
    cpu: &mut CpuState,
    bus: &mut Unibus,
    spec: u16,
) -> Result<u16, MemoryFault> {
    let (mode, r) = split(spec);
    match mode {
        0 => Ok(cpu.registers[r]),
        1 => load_word(cpu, bus, cpu.registers[r]),
        2 => {
            let value = load_word(cpu, bus, cpu.registers[r])?;
            cpu.registers[r] = cpu.registers[r].wrapping_add(2);
            Ok(value)
        }
        3 => {
            let pointer = load_word(cpu, bus, cpu.registers[r])?;
            cpu.registers[r] = cpu.registers[r].wrapping_add(2);
            load_word(cpu, bus, pointer)
        }
        4 => {
            cpu.registers[r] = cpu.registers[r].wrapping_sub(2);
            load_word(cpu, bus, cpu.registers[r])
        }
        5 => {
            cpu.registers[r] = cpu.registers[r].wrapping_sub(2);
            let pointer = load_word(cpu, bus, cpu.registers[r])?;
            load_word(cpu, bus, pointer)
        }
        6 => {
            let displacement = fetch_word(cpu, bus)?;
            load_word(cpu, bus, displacement.wrapping_add(cpu.registers[r]))
        }
        7 => {
            let displacement = fetch_word(cpu, bus)?;
            let pointer = load_word(cpu, bus, displacement.wrapping_add(cpu.registers[r]))?;
            load_word(cpu, bus, pointer)
        }
        _ => unreachable!(),
    }
}

pub(crate) fn store_word_by_mode(
    cpu: &mut CpuState,
    bus: &mut Unibus,
    spec: u16,
    value: u16,
) -> Result<(), MemoryFault> {
    let (mode, r) = split(spec);
    match mode {
        0 => {
            cpu.registers[r] = value;
            Ok(())
        }
        1 => store_word(cpu, bus, cpu.registers[r], value),
        2 => {
            store_word(cpu, bus, cpu.registers[r], value)?;
            cpu.registers[r] = cpu.registers[r].wrapping_add(2);
            Ok(())
        }
        3 => {
            let pointer = load_word(cpu, bus, cpu.registers[r])?;
            cpu.registers[r] = cpu.registers[r].wrapping_add(2);
            store_word(cpu, bus, pointer, value)
        }
        4 => {
            cpu.registers[r] = cpu.registers[r].wrapping_sub(2);
            store_word(cpu, bus, cpu.registers[r], value)
        }
        5 => {
            cpu.registers[r] = cpu.registers[r].wrapping_sub(2);
            let pointer = load_word(cpu, bus, cpu.registers[r])?;
            store_word(cpu, bus, pointer, value)
        }
        6 => {
            let displacement = fetch_word(cpu, bus)?;
            store_word(cpu, bus, displacement.wrapping_add(cpu.registers[r]), value)
        }
        7 => {
            let displacement = fetch_word(cpu, bus)?;
            let pointer = load_word(cpu, bus, displacement.wrapping_add(cpu.registers[r]))?;
            store_word(cpu, bus, pointer, value)
        }
        _ => unreachable!(),
    }
}

/// Read-modify-write a word operand through one resolution of `spec`.
///
/// `op` is a plain transform of (state, previous value, src operand) to
/// the replacement value; flag effects happen inside it against the
/// explicit state reference. The destination is resolved exactly once —
/// an index displacement is fetched once and autoincrement steps after
/// the write-back, as a one-pass data path would behave.
pub(crate) fn operate_word_by_mode(
    cpu: &mut CpuState,
    bus: &mut Unibus,
    spec: u16,
    src: u16,
    op: fn(&mut CpuState, u16, u16) -> u16,
) -> Result<(), MemoryFault> {
    let (mode, r) = split(spec);
    match mode {
        0 => {
            let previous = cpu.registers[r];
            cpu.registers[r] = op(cpu, previous, src);
            Ok(())
        }
        1 => {
            let address = cpu.registers[r];
            rmw_word(cpu, bus, address, src, op)
        }
        2 => {
            let address = cpu.registers[r];
            rmw_word(cpu, bus, address, src, op)?;
            cpu.registers[r] = cpu.registers[r].wrapping_add(2);
            Ok(())
        }
        3 => {
            let pointer = load_word(cpu, bus, cpu.registers[r])?;
            cpu.registers[r] = cpu.registers[r].wrapping_add(2);
            rmw_word(cpu, bus, pointer, src, op)
        }
        4 => {
            cpu.registers[r] = cpu.registers[r].wrapping_sub(2);
            let address = cpu.registers[r];
            rmw_word(cpu, bus, address, src, op)
        }
        5 => {
            cpu.registers[r] = cpu.registers[r].wrapping_sub(2);
            let pointer = load_word(cpu, bus, cpu.registers[r])?;
            rmw_word(cpu, bus, pointer, src, op)
        }
        6 => {
            let displacement = fetch_word(cpu, bus)?;
            let address = displacement.wrapping_add(cpu.registers[r]);
            rmw_word(cpu, bus, address, src, op)
        }
        7 => {
            let displacement = fetch_word(cpu, bus)?;
            let pointer = load_word(cpu, bus, displacement.wrapping_add(cpu.registers[r]))?;
            rmw_word(cpu, bus, pointer, src, op)
        }
        _ => unreachable!(),
    }
}

#[inline]
fn rmw_word(
    cpu: &mut CpuState,
    bus: &mut Unibus,
    address: u16,
    src: u16,
    op: fn(&mut CpuState, u16, u16) -> u16,
) -> Result<(), MemoryFault> {
    let previous = load_word(cpu, bus, address)?;
    let value = op(cpu, previous, src);
    store_word(cpu, bus, address, value)
}

// ---------------------------------------------------------------------------
// Byte operand access
// ---------------------------------------------------------------------------

pub(crate) fn load_byte_by_mode(
    cpu: &mut CpuState,
    bus: &mut Unibus,
    spec: u16,
) -> Result<u8, MemoryFault> {
    let (mode, r) = split(spec);
    match mode {
        0 => Ok((cpu.registers[r] & 0xff) as u8),
        1 => load_byte(cpu, bus, cpu.registers[r]),
        2 => {
            let value = load_byte(cpu, bus, cpu.registers[r])?;
            cpu.registers[r] = cpu.registers[r].wrapping_add(byte_step(r));
            Ok(value)
        }
        3 => {
            let pointer = load_word(cpu, bus, cpu.registers[r])?;
            cpu.registers[r] = cpu.registers[r].wrapping_add(2);
            load_byte(cpu, bus, pointer)
        }
        4 => {
            cpu.registers[r] = cpu.registers[r].wrapping_sub(byte_step(r));
            load_byte(cpu, bus, cpu.registers[r])
        }
        5 => {
            cpu.registers[r] = cpu.registers[r].wrapping_sub(2);
            let pointer = load_word(cpu, bus, cpu.registers[r])?;
            load_byte(cpu, bus, pointer)
        }
        6 => {
            let displacement = fetch_word(cpu, bus)?;
            load_byte(cpu, bus, displacement.wrapping_add(cpu.registers[r]))
        }
        7 => {
            let displacement = fetch_word(cpu, bus)?;
            let pointer = load_word(cpu, bus, displacement.wrapping_add(cpu.registers[r]))?;
            load_byte(cpu, bus, pointer)
        }
        _ => unreachable!(),
    }
}

pub(crate) fn store_byte_by_mode(
    cpu: &mut CpuState,
    bus: &mut Unibus,
    spec: u16,
    value: u8,
) -> Result<(), MemoryFault> {
    let (mode, r) = split(spec);
    match mode {
        0 => {
            cpu.registers[r] = (cpu.registers[r] & 0xff00) | value as u16;
            Ok(())
        }
        1 => store_byte(cpu, bus, cpu.registers[r], value),
        2 => {
            store_byte(cpu, bus, cpu.registers[r], value)?;
            cpu.registers[r] = cpu.registers[r].wrapping_add(byte_step(r));
            Ok(())
        }
        3 => {
            let pointer = load_word(cpu, bus, cpu.registers[r])?;
            cpu.registers[r] = cpu.registers[r].wrapping_add(2);
            store_byte(cpu, bus, pointer, value)
        }
        4 => {
            cpu.registers[r] = cpu.registers[r].wrapping_sub(byte_step(r));
            store_byte(cpu, bus, cpu.registers[r], value)
        }
        5 => {
            cpu.registers[r] = cpu.registers[r].wrapping_sub(2);
            let pointer = load_word(cpu, bus, cpu.registers[r])?;
            store_byte(cpu, bus, pointer, value)
        }
        6 => {
            let displacement = fetch_word(cpu, bus)?;
            store_byte(cpu, bus, displacement.wrapping_add(cpu.registers[r]), value)
        }
        7 => {
            let displacement = fetch_word(cpu, bus)?;
            let pointer = load_word(cpu, bus, displacement.wrapping_add(cpu.registers[r]))?;
            store_byte(cpu, bus, pointer, value)
        }
        _ => unreachable!(),
    }
}

/// Read-modify-write a byte operand through one resolution of `spec`.
pub(crate) fn operate_byte_by_mode(
    cpu: &mut CpuState,
    bus: &mut Unibus,
    spec: u16,
    src: u8,
    op: fn(&mut CpuState, u8, u8) -> u8,
) -> Result<(), MemoryFault> {
    let (mode, r) = split(spec);
    match mode {
        0 => {
            let previous = (cpu.registers[r] & 0xff) as u8;
            let value = op(cpu, previous, src);
            cpu.registers[r] = (cpu.registers[r] & 0xff00) | value as u16;
            Ok(())
        }
        1 => {
            let address = cpu.registers[r];
            rmw_byte(cpu, bus, address, src, op)
        }
        2 => {
            let address = cpu.registers[r];
            rmw_byte(cpu, bus, address, src, op)?;
            cpu.registers[r] = cpu.registers[r].wrapping_add(byte_step(r));
            Ok(())
        }
        3 => {
            let pointer = load_word(cpu, bus, cpu.registers[r])?;
            cpu.registers[r] = cpu.registers[r].wrapping_add(2);
            rmw_byte(cpu, bus, pointer, src, op)
        }
        4 => {
            cpu.registers[r] = cpu.registers[r].wrapping_sub(byte_step(r));
            let address = cpu.registers[r];
            rmw_byte(cpu, bus, address, src, op)
        }
        5 => {
            cpu.registers[r] = cpu.registers[r].wrapping_sub(2);
            let pointer = load_word(cpu, bus, cpu.registers[r])?;
            rmw_byte(cpu, bus, pointer, src, op)
        }
        6 => {
            let displacement = fetch_word(cpu, bus)?;
            let address = displacement.wrapping_add(cpu.registers[r]);
            rmw_byte(cpu, bus, address, src, op)
        }
        7 => {
            let displacement = fetch_word(cpu, bus)?;
            let pointer = load_word(cpu, bus, displacement.wrapping_add(cpu.registers[r]))?;
            rmw_byte(cpu, bus, pointer, src, op)
        }
        _ => unreachable!(),
    }
}

#[inline]
fn rmw_byte(
    cpu: &mut CpuState,
    bus: &mut Unibus,
    address: u16,
    src: u8,
    op: fn(&mut CpuState, u8, u8) -> u8,
) -> Result<(), MemoryFault> {
    let previous = load_byte(cpu, bus, address)?;
    let value = op(cpu, previous, src);
    store_byte(cpu, bus, address, value)
}

// ---------------------------------------------------------------------------
// Effective addresses
// ---------------------------------------------------------------------------

/// Resolve the effective address of a memory operand (modes 1-7),
/// applying the mode's register side effects. Register mode has no
/// address; callers special-case it before asking.
pub(crate) fn operand_address(
    cpu: &mut CpuState,
    bus: &mut Unibus,
    spec: u16,
) -> Result<u16, MemoryFault> {
    let (mode, r) = split(spec);
    match mode {
        1 => Ok(cpu.registers[r]),
        2 => {
            let address = cpu.registers[r];
            cpu.registers[r] = cpu.registers[r].wrapping_add(2);
            Ok(address)
        }
        3 => {
            let pointer = load_word(cpu, bus, cpu.registers[r])?;
            cpu.registers[r] = cpu.registers[r].wrapping_add(2);
            Ok(pointer)
        }
        4 => {
            cpu.registers[r] = cpu.registers[r].wrapping_sub(2);
            Ok(cpu.registers[r])
        }
        5 => {
            cpu.registers[r] = cpu.registers[r].wrapping_sub(2);
            load_word(cpu, bus, cpu.registers[r])
        }
        6 => {
            let displacement = fetch_word(cpu, bus)?;
            Ok(displacement.wrapping_add(cpu.registers[r]))
        }
        7 => {
            let displacement = fetch_word(cpu, bus)?;
            load_word(cpu, bus, displacement.wrapping_add(cpu.registers[r]))
        }
        _ => panic!("register operand has no effective address"),
    }
}

/// Resolve a jump target for JMP/JSR. Register-direct and the
/// auto-modify specifiers cannot name a transfer target; decoding one
/// here is a contract breach.
pub(crate) fn jump_target(
    cpu: &mut CpuState,
    bus: &mut Unibus,
    spec: u16,
) -> Result<u16, MemoryFault> {
    let (mode, _) = split(spec);
    match mode {
        1 | 3 | 5 | 6 | 7 => operand_address(cpu, bus, spec),
        _ => panic!("invalid jump target addressing mode {mode}"),
    }
}
