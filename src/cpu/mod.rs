/*!
Instruction engine for the 8-bit core.

```text
regs.rs    - register file (AF/BC/DE/HL/SP/PC) and flag invariants
decode.rs  - opcode -> instruction descriptor tables (256 + 0xCB space)
execute.rs - per-instruction micro-step state machines
core.rs    - T-cycle tick, boundaries, halt states, interrupt dispatch
```

The public surface is the `Cpu` type: construct it, then drive `tick` once
per T-cycle with the bus. Instruction timing resolves at machine-cycle
granularity with one bus access per machine-cycle.
*/

pub mod core;
pub mod decode;
pub mod execute;
pub mod regs;

pub use core::Cpu;
pub use decode::{AluOp, CbOp, CbTarget, Instr, decode, decode_cb};
pub use regs::{
    Cond, FLAG_CARRY, FLAG_HALF_CARRY, FLAG_SUBTRACT, FLAG_ZERO, Reg8, Reg16, Registers,
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{Access, Bus};
    use crate::log::Logger;

    /// Bus with a program placed in working RAM and PC pointed at it. The
    /// engine never fetches from ROM here, so no cartridge is needed.
    fn machine_with(program: &[u8]) -> (Cpu, Bus) {
        let mut bus = Bus::new(Logger::null());
        for (i, &byte) in program.iter().enumerate() {
            bus.write(0xC000 + i as u16, byte, Access::Cpu);
        }
        let mut cpu = Cpu::new();
        cpu.regs.pc = 0xC000;
        (cpu, bus)
    }

    /// Drive `cycles` machine-cycles (the first primes the opcode latch).
    fn run(cpu: &mut Cpu, bus: &mut Bus, cycles: usize) {
        for _ in 0..cycles {
            cpu.machine_cycle(bus);
        }
    }

    #[test]
    fn add_computes_all_four_flags() {
        // LD A,0x3A; LD B,0xC6; ADD A,B -> 0x00, Z+H+C set
        let (mut cpu, mut bus) = machine_with(&[0x3E, 0x3A, 0x06, 0xC6, 0x80]);
        run(&mut cpu, &mut bus, 1 + 2 + 2 + 1);
        assert_eq!(cpu.regs.a(), 0x00);
        assert!(cpu.regs.flag(FLAG_ZERO));
        assert!(cpu.regs.flag(FLAG_HALF_CARRY));
        assert!(cpu.regs.flag(FLAG_CARRY));
        assert!(!cpu.regs.flag(FLAG_SUBTRACT));
    }

    #[test]
    fn half_carry_tracks_low_nibble_arithmetic() {
        // Table of (a, operand, carry_in, op) -> expected (result, H, C).
        let cases: &[(u8, u8, bool, u8, u8, bool, bool)] = &[
            // ADD
            (0x0F, 0x01, false, 0x80, 0x10, true, false),
            (0xF0, 0x10, false, 0x80, 0x00, false, true),
            (0x08, 0x07, false, 0x80, 0x0F, false, false),
            // ADC with carry-in
            (0x0F, 0x00, true, 0x88, 0x10, true, false),
            (0xFF, 0x00, true, 0x88, 0x00, true, true),
            // SUB
            (0x10, 0x01, false, 0x90, 0x0F, true, false),
            (0x00, 0x01, false, 0x90, 0xFF, true, true),
            // SBC with carry-in
            (0x10, 0x0F, true, 0x98, 0x00, true, false),
        ];
        for &(a, operand, carry_in, opcode, result, half, carry) in cases {
            let (mut cpu, mut bus) = machine_with(&[opcode]);
            cpu.regs.set_a(a);
            cpu.regs.set_r8(Reg8::B, operand);
            cpu.regs.set_flag(FLAG_CARRY, carry_in);
            run(&mut cpu, &mut bus, 2);
            assert_eq!(cpu.regs.a(), result, "result for op {opcode:#04X} a={a:#04X}");
            assert_eq!(
                cpu.regs.flag(FLAG_HALF_CARRY),
                half,
                "H for op {opcode:#04X} a={a:#04X}"
            );
            assert_eq!(
                cpu.regs.flag(FLAG_CARRY),
                carry,
                "C for op {opcode:#04X} a={a:#04X}"
            );
        }
    }

    #[test]
    fn pop_af_clears_flag_low_nibble() {
        // LD SP,0xC100; POP AF  with 0xFFFF staged on the stack
        let (mut cpu, mut bus) = machine_with(&[0x31, 0x00, 0xC1, 0xF1]);
        bus.write(0xC100, 0xFF, Access::Cpu);
        bus.write(0xC101, 0xFF, Access::Cpu);
        run(&mut cpu, &mut bus, 1 + 3 + 3);
        assert_eq!(cpu.regs.r16(Reg16::AF), 0xFFF0);
    }

    #[test]
    fn inc_dec_memory_share_register_flag_logic() {
        // LD HL,0xC200; INC (HL); DEC (HL)
        let (mut cpu, mut bus) = machine_with(&[0x21, 0x00, 0xC2, 0x34, 0x35]);
        bus.write(0xC200, 0x0F, Access::Cpu);
        run(&mut cpu, &mut bus, 1 + 3 + 3);
        assert_eq!(bus.read(0xC200, Access::Cpu), 0x10);
        assert!(cpu.regs.flag(FLAG_HALF_CARRY)); // 0x0F -> 0x10 half-carries
        run(&mut cpu, &mut bus, 3);
        assert_eq!(bus.read(0xC200, Access::Cpu), 0x0F);
        assert!(cpu.regs.flag(FLAG_SUBTRACT));
    }

    #[test]
    fn conditional_jump_consumes_short_count_when_not_taken() {
        // CP A (sets Z), JR NZ,+2 (not taken), LD B,0x55
        let (mut cpu, mut bus) = machine_with(&[0xBF, 0x20, 0x02, 0x06, 0x55]);
        run(&mut cpu, &mut bus, 1 + 1 + 2 + 2);
        assert_eq!(cpu.regs.r8(Reg8::B), 0x55);
    }

    #[test]
    fn taken_jump_lands_on_target() {
        // JR +2 over a DEC B; LD B,0x77
        let (mut cpu, mut bus) = machine_with(&[0x18, 0x01, 0x05, 0x06, 0x77]);
        cpu.regs.set_r8(Reg8::B, 0);
        run(&mut cpu, &mut bus, 1 + 3 + 2);
        assert_eq!(cpu.regs.r8(Reg8::B), 0x77);
    }

    #[test]
    fn call_and_ret_round_trip() {
        // CALL 0xC010; (filler)...; at 0xC010: RET
        let mut program = vec![0xCD, 0x10, 0xC0, 0x04]; // CALL; INC B
        program.resize(0x10, 0x00);
        program.push(0xC9); // RET at 0xC010
        let (mut cpu, mut bus) = machine_with(&program);
        cpu.regs.sp = 0xCFFF;
        cpu.regs.set_r8(Reg8::B, 0);
        run(&mut cpu, &mut bus, 1 + 6 + 4 + 1);
        // Returned and executed INC B.
        assert_eq!(cpu.regs.r8(Reg8::B), 1);
        assert_eq!(cpu.regs.sp, 0xCFFF);
    }

    #[test]
    fn rst_pushes_and_vectors() {
        let (mut cpu, mut bus) = machine_with(&[0xEF]); // RST 0x28
        cpu.regs.sp = 0xD000;
        run(&mut cpu, &mut bus, 1 + 4);
        assert_eq!(cpu.regs.pc, 0x0029); // vector plus the prefetch
        let lo = bus.read(0xCFFE, Access::Cpu);
        let hi = bus.read(0xCFFF, Access::Cpu);
        assert_eq!(u16::from(hi) << 8 | u16::from(lo), 0xC001);
    }

    #[test]
    fn cb_operations_on_register_and_memory() {
        // LD HL,0xC200; SET 3,(HL); LD B,0x81; RLC B
        let (mut cpu, mut bus) = machine_with(&[0x21, 0x00, 0xC2, 0xCB, 0xDE, 0x06, 0x81, 0xCB, 0x00]);
        run(&mut cpu, &mut bus, 1 + 3 + 4 + 2 + 2);
        assert_eq!(bus.read(0xC200, Access::Cpu), 0x08);
        assert_eq!(cpu.regs.r8(Reg8::B), 0x03);
        assert!(cpu.regs.flag(FLAG_CARRY));
    }

    #[test]
    fn daa_adjusts_bcd_addition() {
        // LD A,0x45; LD B,0x38; ADD A,B; DAA -> 0x83
        let (mut cpu, mut bus) = machine_with(&[0x3E, 0x45, 0x06, 0x38, 0x80, 0x27]);
        run(&mut cpu, &mut bus, 1 + 2 + 2 + 1 + 1);
        assert_eq!(cpu.regs.a(), 0x83);
        assert!(!cpu.regs.flag(FLAG_CARRY));
    }

    #[test]
    fn ei_takes_effect_after_the_following_instruction() {
        let (mut cpu, mut bus) = machine_with(&[0xFB, 0x00, 0x00]); // EI; NOP; NOP
        run(&mut cpu, &mut bus, 1 + 1); // prime + EI
        assert!(!cpu.interrupts_enabled());
        run(&mut cpu, &mut bus, 1); // NOP
        assert!(!cpu.interrupts_enabled());
        run(&mut cpu, &mut bus, 1); // boundary after the following instruction
        assert!(cpu.interrupts_enabled());
    }

    #[test]
    fn interrupt_dispatch_vectors_by_priority() {
        let (mut cpu, mut bus) = machine_with(&[0xFB, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]);
        bus.intr.write_pending(0);
        bus.intr.write_enable(0x1F);
        run(&mut cpu, &mut bus, 3); // prime + EI + NOP (master now enabled)

        // Timer and serial both pending: timer (lower bit) wins.
        bus.write(0xFF0F, 0x0C, Access::Cpu);
        cpu.regs.sp = 0xD000;
        run(&mut cpu, &mut bus, 5 + 1);
        assert_eq!(cpu.regs.pc, 0x0051); // 0x0050 plus the prefetch
        assert!(!cpu.interrupts_enabled());
        // Serviced bit cleared, the other still pending.
        assert_eq!(bus.read(0xFF0F, Access::Cpu) & 0x1F, 0x08);
    }

    #[test]
    fn halt_wakes_on_pending_interrupt() {
        let (mut cpu, mut bus) = machine_with(&[0x76, 0x04]); // HALT; INC B
        bus.intr.write_pending(0);
        bus.intr.write_enable(0x04);
        cpu.regs.set_r8(Reg8::B, 0);
        run(&mut cpu, &mut bus, 2); // prime + HALT
        assert!(cpu.is_halted());
        run(&mut cpu, &mut bus, 8);
        assert!(cpu.is_halted()); // still parked

        bus.write(0xFF0F, 0x04, Access::Cpu);
        run(&mut cpu, &mut bus, 2); // wake + INC B
        assert!(!cpu.is_halted());
        assert_eq!(cpu.regs.r8(Reg8::B), 1);
    }

    #[test]
    fn halt_quirk_runs_the_following_byte_twice() {
        // IME disabled, enabled interrupt already pending: HALT is skipped
        // and the INC B after it executes twice.
        let (mut cpu, mut bus) = machine_with(&[0x76, 0x04, 0x00]); // HALT; INC B; NOP
        bus.intr.write_pending(0x04);
        bus.intr.write_enable(0x04);
        cpu.regs.set_r8(Reg8::B, 0);
        run(&mut cpu, &mut bus, 1 + 1 + 1 + 1); // prime, HALT, INC B, INC B again
        assert!(!cpu.is_halted());
        assert_eq!(cpu.regs.r8(Reg8::B), 2);
    }

    #[test]
    #[should_panic(expected = "illegal opcode")]
    fn illegal_opcode_aborts() {
        let (mut cpu, mut bus) = machine_with(&[0xD3]);
        run(&mut cpu, &mut bus, 2);
    }

    #[test]
    fn add_hl_leaves_zero_flag_alone() {
        // Set Z via CP A, then ADD HL,BC must not clear it.
        let (mut cpu, mut bus) = machine_with(&[0xBF, 0x09]);
        cpu.regs.set_r16(Reg16::HL, 0x0FFF);
        cpu.regs.set_r16(Reg16::BC, 0x0001);
        run(&mut cpu, &mut bus, 1 + 1 + 2);
        assert_eq!(cpu.regs.r16(Reg16::HL), 0x1000);
        assert!(cpu.regs.flag(FLAG_ZERO));
        assert!(cpu.regs.flag(FLAG_HALF_CARRY));
        assert!(!cpu.regs.flag(FLAG_CARRY));
    }
}
