/*!
Instruction engine core: the T-cycle tick, instruction boundaries, the
interrupt-master latch, halt states, and interrupt dispatch.

Execution is pipelined the way the hardware overlaps it: the final
machine-cycle of every instruction fetches the next opcode (`finish`), so at
an instruction boundary the opcode latch already holds the byte to decode.
Only every 4th T-cycle does work: instruction timing is modelled at
machine-cycle granularity, with at most one bus access per machine-cycle.

Interrupt dispatch is a 5-machine-cycle sequence: one cycle to back the
program counter up over the prefetched opcode, one internal delay, two
stack pushes, then vector resolution. The vector is re-derived from live
IF/IE at the final step, scanning bits low-to-high, since the pushes can land on
0xFFFF and change the outcome, including all the way to vector 0x0000.
*/

use crate::bus::interrupts::Interrupt;
use crate::bus::{Access, Bus};
use crate::cpu::decode::{CbOp, CbTarget, Instr, decode};
use crate::cpu::regs::Registers;

/// Interrupt-master state. EI does not take effect immediately: it requests
/// the enable, which ripens across the following instruction boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Ime {
    Disabled,
    Enabled,
    PendingEnable,
    RequestEnable,
}

#[derive(Debug)]
pub struct Cpu {
    pub regs: Registers,
    pub(crate) ime: Ime,
    pub(crate) halted: bool,
    pub(crate) halt_bug: bool,

    // T-cycle phase within the current machine-cycle.
    phase: u8,
    // Initial opcode fetch after power-on has happened.
    primed: bool,

    // Per-instruction execution state: micro-step counter plus the scratch
    // latches that live only for the duration of one instruction.
    pub(crate) step: u8,
    pub(crate) instr: Instr,
    pub(crate) cb: Option<(CbOp, CbTarget)>,
    pub(crate) data: u8,
    pub(crate) lo: u8,
    pub(crate) hi: u8,

    // Interrupt dispatch step when a dispatch is in flight.
    dispatch: Option<u8>,
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

impl Cpu {
    pub fn new() -> Self {
        Self {
            regs: Registers::new(),
            ime: Ime::Disabled,
            halted: false,
            halt_bug: false,
            phase: 0,
            primed: false,
            step: 0,
            instr: Instr::Nop,
            cb: None,
            data: 0,
            lo: 0,
            hi: 0,
            dispatch: None,
        }
    }

    /// Advance exactly one T-cycle. Work happens on the first T-cycle of
    /// each 4-T-cycle machine-cycle; the rest are timing filler.
    pub fn tick(&mut self, bus: &mut Bus) {
        let phase = self.phase;
        self.phase = (self.phase + 1) & 3;
        if phase == 0 {
            self.machine_cycle(bus);
        }
    }

    /// True while the engine is parked in the halt state.
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// True once the interrupt master has fully ripened to enabled.
    pub fn interrupts_enabled(&self) -> bool {
        self.ime == Ime::Enabled
    }

    pub(crate) fn machine_cycle(&mut self, bus: &mut Bus) {
        if !self.primed {
            // Power-on: nothing is in the opcode latch yet; spend the first
            // machine-cycle fetching from the entry point.
            self.primed = true;
            self.finish(bus);
            return;
        }

        if let Some(step) = self.dispatch {
            self.dispatch_cycle(bus, step);
            return;
        }

        if self.halted {
            if bus.intr.ready() != 0 {
                self.halted = false;
            } else {
                return;
            }
        }

        if self.step == 0 {
            // Instruction boundary: ripen the EI latch, then sample
            // interrupts before decoding. A 0xCB escape never reaches this
            // point mid-way; its operand fetch is part of the instruction.
            self.ime = match self.ime {
                Ime::RequestEnable => Ime::PendingEnable,
                Ime::PendingEnable => Ime::Enabled,
                other => other,
            };

            if self.ime == Ime::Enabled && bus.intr.ready() != 0 {
                self.dispatch = Some(0);
                self.dispatch_cycle(bus, 0);
                return;
            }

            self.instr = decode(self.data);
            self.cb = None;
            if let Instr::Illegal(op) = self.instr {
                panic!(
                    "illegal opcode 0x{op:02X} at 0x{:04X}",
                    self.regs.pc.wrapping_sub(1)
                );
            }
        }

        self.exec_machine_cycle(bus);
    }

    fn dispatch_cycle(&mut self, bus: &mut Bus, step: u8) {
        match step {
            0 => {
                // Back over the prefetched-but-unexecuted opcode so the
                // pushed return address points at it.
                self.regs.pc = self.regs.pc.wrapping_sub(1);
                self.dispatch = Some(1);
            }
            1 => {
                self.dispatch = Some(2);
            }
            2 => {
                self.regs.sp = self.regs.sp.wrapping_sub(1);
                bus.write(self.regs.sp, (self.regs.pc >> 8) as u8, Access::Cpu);
                self.dispatch = Some(3);
            }
            3 => {
                self.regs.sp = self.regs.sp.wrapping_sub(1);
                bus.write(self.regs.sp, self.regs.pc as u8, Access::Cpu);
                self.dispatch = Some(4);
            }
            _ => {
                // Vector resolution from live state, lowest bit first. If
                // the pushes cancelled everything, fall through to 0x0000.
                self.ime = Ime::Disabled;
                let ready = bus.intr.ready();
                let mut vector = 0x0000;
                for source in Interrupt::PRIORITY {
                    if ready & (source as u8) != 0 {
                        bus.intr.acknowledge(source);
                        vector = source.vector();
                        break;
                    }
                }
                self.regs.pc = vector;
                self.dispatch = None;
                self.finish(bus);
            }
        }
    }

    /// Read the byte at PC into the data latch and advance PC. The one
    /// shared fetch-and-advance primitive: opcode fetch, operand fetch and
    /// the halt-quirk suppression all go through here.
    pub(crate) fn read_pc(&mut self, bus: &mut Bus) {
        self.data = bus.read(self.regs.pc, Access::Cpu);
        self.regs.pc = self.regs.pc.wrapping_add(1);
    }

    /// Final machine-cycle of every instruction: prefetch the next opcode
    /// and rearm the step counter. Under the halt quirk the fetch happens
    /// without advancing PC, so the following byte executes twice.
    pub(crate) fn finish(&mut self, bus: &mut Bus) {
        if self.halt_bug {
            self.halt_bug = false;
            self.data = bus.read(self.regs.pc, Access::Cpu);
        } else {
            self.read_pc(bus);
        }
        self.step = 0;
    }

    /// Read an arbitrary address into the data latch.
    pub(crate) fn read_at(&mut self, bus: &mut Bus, addr: u16) {
        self.data = bus.read(addr, Access::Cpu);
    }
}
