/*!
Top-level driver: owns the instruction engine and the bus, and advances the
whole machine one T-cycle at a time.

Per T-cycle order: instruction engine first, then the bus-side components
(timer on machine-cycle boundaries, pixel pipeline, block transfer, audio
stub). The driver owns every component; cross-component traffic goes
through the bus arbiter, never through back-pointers.
*/

use std::rc::Rc;

use crate::bus::Bus;
use crate::cartridge::Cartridge;
use crate::cpu::Cpu;
use crate::joypad::Button;
use crate::log::{LogSink, Logger};
use crate::ppu::Mode;

/// T-cycles in one full frame (154 scanlines of 456 ticks).
pub const TCYCLES_PER_FRAME: u64 = 70224;

pub struct Machine {
    pub cpu: Cpu,
    pub bus: Bus,
    tcycles: u64,
}

impl Machine {
    /// Build a machine around a cartridge, logging to stderr.
    pub fn new(cartridge: Cartridge) -> Self {
        Self::with_logger(cartridge, Logger::default())
    }

    /// Build a machine with an injected log sink.
    pub fn with_sink(cartridge: Cartridge, sink: Rc<dyn LogSink>) -> Self {
        Self::with_logger(cartridge, Logger::new(sink))
    }

    pub fn with_logger(cartridge: Cartridge, log: Logger) -> Self {
        let mut bus = Bus::new(log);
        bus.attach_cartridge(cartridge);
        Self {
            cpu: Cpu::new(),
            bus,
            tcycles: 0,
        }
    }

    /// Advance the shared clock by one T-cycle.
    pub fn tick(&mut self) {
        self.cpu.tick(&mut self.bus);
        self.bus.tick(self.tcycles);
        self.tcycles = self.tcycles.wrapping_add(1);
    }

    /// Run exactly one frame's worth of T-cycles.
    pub fn step_frame(&mut self) {
        for _ in 0..TCYCLES_PER_FRAME {
            self.tick();
        }
    }

    /// Run until the next vertical-blank transition (leaving a current
    /// vertical blank first), bounded by two frames' worth of T-cycles so a
    /// disabled display cannot wedge the caller.
    pub fn run_until_vblank(&mut self) {
        let mut budget = 2 * TCYCLES_PER_FRAME;
        while self.bus.ppu.mode() == Mode::VBlank && budget > 0 {
            self.tick();
            budget -= 1;
        }
        while self.bus.ppu.mode() != Mode::VBlank && budget > 0 {
            self.tick();
            budget -= 1;
        }
    }

    /// Total T-cycles elapsed since power-on.
    pub fn tcycles(&self) -> u64 {
        self.tcycles
    }

    /// The pipeline's output framebuffer (one packed color per pixel).
    pub fn framebuffer(&self) -> &[u32] {
        self.bus.ppu.framebuffer()
    }

    /// Front-end entry point for a button edge.
    pub fn button_event(&mut self, button: Button, pressed: bool) {
        self.bus.button_event(button, pressed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::Logger;
    use crate::test_utils::build_rom;

    fn machine(program: &[u8]) -> Machine {
        let rom = build_rom(program);
        let cart = Cartridge::from_bytes(&rom, Logger::null()).expect("test ROM parses");
        Machine::with_logger(cart, Logger::null())
    }

    #[test]
    fn executes_from_the_entry_point() {
        // LD A,0x2A; LD (0xC000),A; then spin.
        let mut m = machine(&[0x3E, 0x2A, 0xEA, 0x00, 0xC0, 0x18, 0xFE]);
        for _ in 0..200 {
            m.tick();
        }
        assert_eq!(
            m.bus.read(0xC000, crate::bus::Access::Cpu),
            0x2A
        );
    }

    #[test]
    fn frame_stepping_advances_the_clock() {
        let mut m = machine(&[0x18, 0xFE]); // spin
        m.step_frame();
        assert_eq!(m.tcycles(), TCYCLES_PER_FRAME);
    }

    #[test]
    fn scanline_cadence_and_vblank() {
        let mut m = machine(&[0x18, 0xFE]);
        m.run_until_vblank();
        assert_eq!(m.bus.ppu.mode(), Mode::VBlank);
        assert_eq!(m.bus.ppu.line(), 144);
    }

    #[test]
    fn block_transfer_program_round_trip() {
        // The canonical transfer idiom: park a stub in high RAM, start the
        // transfer from there, spin until it completes, return, and read
        // the copied byte back out of object RAM.
        let stub: &[u8] = &[
            0xE0, 0x46, // LDH (0x46),A   start transfer from page in A
            0x3E, 0x28, // LD A,0x28
            0x3D, // wait: DEC A
            0x20, 0xFD, // JR NZ,wait
            0xC9, // RET
        ];
        let mut program = vec![
            0x3E, 0x11, // LD A,0x11
            0xE0, 0x40, // LDH (0x40),A   display off: object RAM stays open
            0x21, 0x80, 0xFF, // LD HL,0xFF80
        ];
        for &byte in stub {
            program.extend_from_slice(&[0x3E, byte, 0x22]); // LD A,b; LD (HL+),A
        }
        program.extend_from_slice(&[
            0x3E, 0x5A, // LD A,0x5A
            0xEA, 0x00, 0xC1, // LD (0xC100),A  source marker
            0x3E, 0xC1, // LD A,0xC1      source page
            0xCD, 0x80, 0xFF, // CALL 0xFF80
            0xFA, 0x00, 0xFE, // LD A,(0xFE00)
            0xEA, 0x00, 0xC0, // LD (0xC000),A
            0x18, 0xFE, // spin
        ]);

        let mut m = machine(&program);
        m.step_frame();
        assert_eq!(m.bus.oam[0], 0x5A);
        assert_eq!(m.bus.read(0xC000, crate::bus::Access::Cpu), 0x5A);
    }

    #[test]
    fn arithmetic_conformance_snapshot() {
        // Mixed arithmetic/rotate/stack sequence with a hand-computed end
        // state, exercising flag propagation across instruction families.
        let mut m = machine(&[
            0x3E, 0x25, // LD A,0x25
            0x06, 0x38, // LD B,0x38
            0x80, // ADD A,B   -> 0x5D
            0x27, // DAA       -> 0x63
            0x4F, // LD C,A
            0x2F, // CPL       -> 0x9C, N+H
            0x37, // SCF       -> C=1, N=H=0
            0x17, // RLA       -> 0x39, C=1
            0x57, // LD D,A
            0x1E, 0x0F, // LD E,0x0F
            0x7B, // LD A,E
            0xCB, 0x37, // SWAP A -> 0xF0, all flags clear
            0xB1, // OR C      -> 0xF3
            0xF5, // PUSH AF
            0xE1, // POP HL    -> HL = 0xF300
            0xEA, 0x00, 0xC0, // LD (0xC000),A
            0x18, 0xFE, // spin
        ]);
        m.step_frame();

        assert_eq!(m.cpu.regs.a(), 0xF3);
        assert_eq!(m.cpu.regs.r16(crate::cpu::Reg16::BC), 0x3863);
        assert_eq!(m.cpu.regs.r16(crate::cpu::Reg16::DE), 0x390F);
        assert_eq!(m.cpu.regs.r16(crate::cpu::Reg16::HL), 0xF300);
        assert_eq!(m.cpu.regs.sp, 0xFFFE);
        assert_eq!(m.bus.read(0xC000, crate::bus::Access::Cpu), 0xF3);
    }

    #[test]
    fn instruction_timing_snapshot() {
        // A small flags/timing program with a known end state:
        //   LD A,0xFF; INC A; LD B,0x0F; LD C,0xF0; ADD A,B; SUB A,C(0x91?)
        // kept simple: after INC A the accumulator wraps to 0 with Z+H set.
        let mut m = machine(&[
            0x3E, 0xFF, // LD A,0xFF
            0x3C, // INC A -> 0x00, Z+H
            0x06, 0x0F, // LD B,0x0F
            0x80, // ADD A,B -> 0x0F
            0xD6, 0x01, // SUB 0x01 -> 0x0E
            0x18, 0xFE, // spin
        ]);
        // Entry sequence: initial fetch (1) + NOP (1) + JP (4) at 0x100,
        // then the program: 2+1+2+1+2 machine-cycles, each 4 T-cycles.
        for _ in 0..((1 + 1 + 4 + 2 + 1 + 2 + 1 + 2) * 4) {
            m.tick();
        }
        assert_eq!(m.cpu.regs.a(), 0x0E);
        assert!(!m.cpu.regs.flag(crate::cpu::FLAG_ZERO));
        assert!(m.cpu.regs.flag(crate::cpu::FLAG_SUBTRACT));
    }
}
