/*!
dispatch - Orchestrator for a single instruction step.

Decode order
============
An instruction word is offered to the decode tiers by widening mask,
each tier tried only when the previous one declined, first match wins:

    (a) 0o170000  double-operand            double_operand
    (b) 0o177000  register-and-operand      register_operand
    (c) 0o177400  program control           branches
    (d) 0o177700  single-operand            single_operand
    (e) 0o177770  subroutine return         zero_operand (RTS)
    (f) exact     HALT / WAIT / RESET / RTT zero_operand

A word no tier claims is an unknown instruction: fatal, annotated with
the opcode and the fetch-time PC.

Fault handling
==============
Tiers propagate `MemoryFault` values out of operand access. A trappable
fault (bus timeout below the I/O window) is converted here into a trap
through the bus-timeout vector; everything else is annotated and
surfaced to the driver. A fault inside trap delivery itself is fatal —
there is no double-trap recovery.

Trap entry pushes the interrupted PSW, then the interrupted PC, onto
the stack of the mode the vector PSW selects, so the PC lands on top;
RTT pops in the mirror order. Both vector words are fetched through the
MMU's physical pass-through. After the vector PSW is live, the
previous-mode field is rewritten with the interrupted mode.
*/

use crate::bus::{AddressSpace, Unibus};
use crate::cpu::addressing::fetch_word;
use crate::cpu::execute::push_word;
use crate::cpu::state::CpuState;
use crate::devices::kw::{CLOCK_PRIORITY, CLOCK_VECTOR};
use crate::diag::Diagnostics;
use crate::fault::{CpuError, MemoryFault};

pub(crate) mod branches;
pub(crate) mod double_operand;
pub(crate) mod register_operand;
pub(crate) mod single_operand;
pub(crate) mod zero_operand;

/// Physical address of the bus-timeout trap vector (PC word, PSW word).
pub const BUS_TIMEOUT_VECTOR: u32 = 0o4;

/// Execute exactly one instruction, or nothing while waiting.
pub(crate) fn step(
    cpu: &mut CpuState,
    bus: &mut Unibus,
    diag: &dyn Diagnostics,
) -> Result<(), CpuError> {
    if cpu.waiting {
        return Ok(());
    }
    let current_pc = cpu.pc();
    let instruction = match fetch_word(cpu, bus) {
        Ok(word) => word,
        Err(fault) => return handle_fault(cpu, bus, fault, 0, current_pc),
    };
    match execute(cpu, bus, diag, instruction) {
        Ok(true) => Ok(()),
        Ok(false) => Err(CpuError::UnknownInstruction {
            instruction,
            pc: current_pc,
        }),
        Err(fault) => handle_fault(cpu, bus, fault, instruction, current_pc),
    }
}

/// Poll interrupt sources and deliver at most one, waking WAIT.
/// Delivery respects the PSW priority field.
pub(crate) fn check_interrupt(cpu: &mut CpuState, bus: &mut Unibus) -> Result<(), CpuError> {
    if cpu.priority < CLOCK_PRIORITY && bus.kw.request_interrupt() {
        let pc = cpu.pc();
        trap(cpu, bus, CLOCK_VECTOR).map_err(|fault| CpuError::Bus {
            fault,
            instruction: 0,
            pc,
        })?;
    }
    Ok(())
}

fn execute(
    cpu: &mut CpuState,
    bus: &mut Unibus,
    diag: &dyn Diagnostics,
    instruction: u16,
) -> Result<bool, MemoryFault> {
    if double_operand::dispatch(cpu, bus, instruction)? {
        return Ok(true);
    }
    if register_operand::dispatch(cpu, bus, instruction)? {
        return Ok(true);
    }
    if branches::dispatch(cpu, instruction) {
        return Ok(true);
    }
    if single_operand::dispatch(cpu, bus, instruction)? {
        return Ok(true);
    }
    zero_operand::dispatch(cpu, bus, diag, instruction)
}

fn handle_fault(
    cpu: &mut CpuState,
    bus: &mut Unibus,
    fault: MemoryFault,
    instruction: u16,
    pc: u16,
) -> Result<(), CpuError> {
    if fault.is_trappable() {
        trap(cpu, bus, BUS_TIMEOUT_VECTOR).map_err(|vector_fault| CpuError::Bus {
            fault: vector_fault,
            instruction,
            pc,
        })
    } else {
        Err(CpuError::Bus {
            fault,
            instruction,
            pc,
        })
    }
}

/// Deliver a trap or interrupt through the vector at `vector`.
pub(crate) fn trap(cpu: &mut CpuState, bus: &mut Unibus, vector: u32) -> Result<(), MemoryFault> {
    let old_psw = cpu.read_psw();
    let old_pc = cpu.pc();
    let interrupted_mode = cpu.current_mode();

    // Vector words are physical; no translation context applies.
    let new_pc = bus.read_word(vector)?;
    let new_psw = bus.read_word(vector + 2)?;

    cpu.write_psw(new_psw);
    cpu.set_previous_mode(interrupted_mode);
    push_word(cpu, bus, old_psw)?;
    push_word(cpu, bus, old_pc)?;
    cpu.set_pc(new_pc);
    cpu.waiting = false;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::state::{ProcessorMode, SP};
    use crate::devices::kw::{LKS_ADDRESS, LKS_INTERRUPT_ENABLE};
    use crate::diag::{NullDiagnostics, null_diag};

    const DIAG: NullDiagnostics = NullDiagnostics;

    /// 8 KiB machine with the bus-timeout vector installed.
    fn small_machine() -> (CpuState, Unibus) {
        let mut bus = Unibus::with_memory_size(0o20000, null_diag());
        bus.write_word(BUS_TIMEOUT_VECTOR, 0o500).unwrap(); // handler PC
        bus.write_word(BUS_TIMEOUT_VECTOR + 2, 0o340).unwrap(); // handler PSW, priority 7
        let mut cpu = CpuState::new();
        cpu.registers[SP] = 0o2000;
        (cpu, bus)
    }

    #[test]
    fn mov_end_to_end() {
        let (mut cpu, mut bus) = small_machine();
        cpu.registers[0] = 0x1234;
        cpu.set_pc(0o1000);
        bus.write_word(0o1000, 0o010001).unwrap(); // MOV R0, R1
        step(&mut cpu, &mut bus, &DIAG).unwrap();
        assert_eq!(cpu.registers[1], 0x1234);
        assert_eq!(cpu.pc(), 0o1002);
        assert!(!cpu.flag_n);
        assert!(!cpu.flag_z);
        assert!(!cpu.flag_v);
    }

    #[test]
    fn unknown_instruction_is_fatal_with_context() {
        let (mut cpu, mut bus) = small_machine();
        cpu.set_pc(0o1000);
        bus.write_word(0o1000, 0o000007).unwrap();
        let err = step(&mut cpu, &mut bus, &DIAG).unwrap_err();
        assert_eq!(
            err,
            CpuError::UnknownInstruction {
                instruction: 0o7,
                pc: 0o1000
            }
        );
    }

    #[test]
    fn timeout_during_execution_traps_through_vector_four() {
        let (mut cpu, mut bus) = small_machine();
        cpu.set_pc(0o1000);
        bus.write_word(0o1000, 0o010011).unwrap(); // MOV R0, @R1
        cpu.registers[1] = 0o30000; // beyond the 8 KiB of RAM
        let psw_before = cpu.read_psw();

        step(&mut cpu, &mut bus, &DIAG).unwrap();

        // Redirected through the vector.
        assert_eq!(cpu.pc(), 0o500);
        assert_eq!(cpu.priority, 7);
        assert_eq!(cpu.previous_mode(), ProcessorMode::Kernel);
        // Interrupted context on the stack: PC on top, PSW beneath.
        assert_eq!(cpu.registers[SP], 0o1774);
        assert_eq!(bus.read_word(0o1774).unwrap(), 0o1002);
        assert_eq!(bus.read_word(0o1776).unwrap(), psw_before);
    }

    #[test]
    fn fetch_timeout_traps_with_zero_instruction_context() {
        let (mut cpu, mut bus) = small_machine();
        cpu.set_pc(0o30000); // fetch from open bus
        step(&mut cpu, &mut bus, &DIAG).unwrap();
        assert_eq!(cpu.pc(), 0o500);
    }

    #[test]
    fn unmapped_io_access_is_fatal() {
        let (mut cpu, mut bus) = small_machine();
        cpu.set_pc(0o1000);
        bus.write_word(0o1000, 0o010011).unwrap(); // MOV R0, @R1
        cpu.registers[1] = 0o167776; // aliases to unclaimed 0o767776
        let err = step(&mut cpu, &mut bus, &DIAG).unwrap_err();
        assert_eq!(
            err,
            CpuError::Bus {
                fault: MemoryFault::Unmapped { address: 0o767776 },
                instruction: 0o010011,
                pc: 0o1000
            }
        );
    }

    #[test]
    fn waiting_step_is_a_no_op() {
        let (mut cpu, mut bus) = small_machine();
        cpu.set_pc(0o1000);
        bus.write_word(0o1000, 0o000001).unwrap(); // WAIT
        step(&mut cpu, &mut bus, &DIAG).unwrap();
        assert!(cpu.is_waiting());
        let pc = cpu.pc();
        step(&mut cpu, &mut bus, &DIAG).unwrap();
        step(&mut cpu, &mut bus, &DIAG).unwrap();
        assert_eq!(cpu.pc(), pc);
    }

    #[test]
    fn clock_interrupt_wakes_wait_through_its_vector() {
        let (mut cpu, mut bus) = small_machine();
        bus.write_word(CLOCK_VECTOR, 0o700).unwrap();
        bus.write_word(CLOCK_VECTOR + 2, 0o300).unwrap();
        bus.write_word(LKS_ADDRESS, LKS_INTERRUPT_ENABLE as u16).unwrap();
        cpu.waiting = true;
        cpu.set_pc(0o1000);

        check_interrupt(&mut cpu, &mut bus).unwrap();

        assert!(!cpu.is_waiting());
        assert_eq!(cpu.pc(), 0o700);
        // Interrupted PC stacked for the handler's return.
        assert_eq!(bus.read_word(0o1774).unwrap(), 0o1000);
    }

    #[test]
    fn high_priority_masks_the_clock() {
        let (mut cpu, mut bus) = small_machine();
        bus.write_word(LKS_ADDRESS, LKS_INTERRUPT_ENABLE as u16).unwrap();
        cpu.priority = 7;
        let pc = cpu.pc();
        check_interrupt(&mut cpu, &mut bus).unwrap();
        assert_eq!(cpu.pc(), pc);
        // The request was not consumed; a lower priority will take it.
        cpu.priority = 0;
        bus.write_word(CLOCK_VECTOR, 0o700).unwrap();
        bus.write_word(CLOCK_VECTOR + 2, 0).unwrap();
        check_interrupt(&mut cpu, &mut bus).unwrap();
        assert_eq!(cpu.pc(), 0o700);
    }

    #[test]
    fn trap_then_rtt_round_trip() {
        let (mut cpu, mut bus) = small_machine();
        cpu.set_pc(0o1000);
        cpu.flag_c = true;
        let psw_before = cpu.read_psw();
        trap(&mut cpu, &mut bus, BUS_TIMEOUT_VECTOR).unwrap();
        assert_eq!(cpu.pc(), 0o500);

        // Handler returns.
        bus.write_word(cpu.pc().into(), 0o000006).unwrap(); // RTT at 0o500
        step(&mut cpu, &mut bus, &DIAG).unwrap();
        assert_eq!(cpu.pc(), 0o1000);
        assert_eq!(cpu.read_psw(), psw_before);
        assert_eq!(cpu.registers[SP], 0o2000);
    }

    #[test]
    fn decode_prefers_earlier_tiers() {
        // 0o000400 (BR) must not be taken by the wider-tier families.
        let (mut cpu, mut bus) = small_machine();
        cpu.set_pc(0o1000);
        bus.write_word(0o1000, 0o000402).unwrap(); // BR .+2 words
        step(&mut cpu, &mut bus, &DIAG).unwrap();
        assert_eq!(cpu.pc(), 0o1006);
    }

    #[test]
    fn uses_pc_snapshot_not_advanced_pc_in_errors() {
        let (mut cpu, mut bus) = small_machine();
        cpu.set_pc(0o1750);
        bus.write_word(0o1750, 0o107700).unwrap(); // no such instruction
        let err = step(&mut cpu, &mut bus, &DIAG).unwrap_err();
        match err {
            CpuError::UnknownInstruction { pc, .. } => assert_eq!(pc, 0o1750),
            other => panic!("unexpected error {other:?}"),
        }
    }
}
