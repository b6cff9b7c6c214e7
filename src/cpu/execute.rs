/*!
Per-instruction execution: one resumable micro-step state machine per
instruction shape, keyed on the engine's step counter.

Every arm performs at most one bus access per machine-cycle and ends its
final cycle in `finish`, the shared fetch-and-advance primitive. Conditional
control flow early-exits its ladder when the condition fails, landing on the
documented shorter cycle count. The memory forms of INC/DEC and the ALU
column route their flag computation through the same helpers the register
forms use.
*/

use crate::bus::{Access, Bus};
use crate::cpu::core::{Cpu, Ime};
use crate::cpu::decode::{AluOp, CbOp, CbTarget, Instr, decode_cb};
use crate::cpu::regs::{FLAG_CARRY, FLAG_HALF_CARRY, FLAG_SUBTRACT, FLAG_ZERO, Reg8, Reg16};

impl Cpu {
    /// Execute one machine-cycle of the current instruction.
    pub(crate) fn exec_machine_cycle(&mut self, bus: &mut Bus) {
        match self.instr {
            Instr::Nop => self.finish(bus),

            Instr::Stop => match self.step {
                0 => {
                    // The encoding carries a padding byte.
                    self.read_pc(bus);
                    self.step = 1;
                }
                _ => {
                    self.halted = true;
                    self.finish(bus);
                }
            },

            Instr::Halt => {
                // Hardware quirk: with the master disabled and a serviceable
                // interrupt already pending, the halt is skipped and the
                // following byte executes twice.
                if self.ime != Ime::Enabled && bus.intr.ready() != 0 {
                    self.halt_bug = true;
                } else {
                    self.halted = true;
                }
                self.finish(bus);
            }

            Instr::Di => {
                self.ime = Ime::Disabled;
                self.finish(bus);
            }

            Instr::Ei => {
                if self.ime != Ime::Enabled {
                    self.ime = Ime::RequestEnable;
                }
                self.finish(bus);
            }

            Instr::LdRR(dst, src) => {
                let v = self.regs.r8(src);
                self.regs.set_r8(dst, v);
                self.finish(bus);
            }

            Instr::LdRN(dst) => match self.step {
                0 => {
                    self.read_pc(bus);
                    self.step = 1;
                }
                _ => {
                    self.regs.set_r8(dst, self.data);
                    self.finish(bus);
                }
            },

            Instr::LdRrNn(dst) => match self.step {
                0 => {
                    self.read_pc(bus);
                    self.step = 1;
                }
                1 => {
                    self.lo = self.data;
                    self.read_pc(bus);
                    self.step = 2;
                }
                _ => {
                    let value = u16::from(self.data) << 8 | u16::from(self.lo);
                    self.regs.set_r16(dst, value);
                    self.finish(bus);
                }
            },

            Instr::StoreInd(dst, src) => match self.step {
                0 => {
                    bus.write(self.regs.r16(dst), self.regs.r8(src), Access::Cpu);
                    self.step = 1;
                }
                _ => self.finish(bus),
            },

            Instr::LoadInd(dst, src) => match self.step {
                0 => {
                    self.read_at(bus, self.regs.r16(src));
                    self.step = 1;
                }
                _ => {
                    self.regs.set_r8(dst, self.data);
                    self.finish(bus);
                }
            },

            Instr::LdHlN => match self.step {
                0 => {
                    self.read_pc(bus);
                    self.step = 1;
                }
                1 => {
                    bus.write(self.regs.hl(), self.data, Access::Cpu);
                    self.step = 2;
                }
                _ => self.finish(bus),
            },

            Instr::LdHliA => match self.step {
                0 => {
                    let hl = self.regs.hl();
                    bus.write(hl, self.regs.a(), Access::Cpu);
                    self.regs.set_r16(Reg16::HL, hl.wrapping_add(1));
                    self.step = 1;
                }
                _ => self.finish(bus),
            },

            Instr::LdHldA => match self.step {
                0 => {
                    let hl = self.regs.hl();
                    bus.write(hl, self.regs.a(), Access::Cpu);
                    self.regs.set_r16(Reg16::HL, hl.wrapping_sub(1));
                    self.step = 1;
                }
                _ => self.finish(bus),
            },

            Instr::LdAHli => match self.step {
                0 => {
                    let hl = self.regs.hl();
                    self.read_at(bus, hl);
                    self.regs.set_r16(Reg16::HL, hl.wrapping_add(1));
                    self.step = 1;
                }
                _ => {
                    self.regs.set_a(self.data);
                    self.finish(bus);
                }
            },

            Instr::LdAHld => match self.step {
                0 => {
                    let hl = self.regs.hl();
                    self.read_at(bus, hl);
                    self.regs.set_r16(Reg16::HL, hl.wrapping_sub(1));
                    self.step = 1;
                }
                _ => {
                    self.regs.set_a(self.data);
                    self.finish(bus);
                }
            },

            Instr::LdNnA => match self.step {
                0 => {
                    self.read_pc(bus);
                    self.step = 1;
                }
                1 => {
                    self.lo = self.data;
                    self.read_pc(bus);
                    self.step = 2;
                }
                2 => {
                    let addr = u16::from(self.data) << 8 | u16::from(self.lo);
                    bus.write(addr, self.regs.a(), Access::Cpu);
                    self.step = 3;
                }
                _ => self.finish(bus),
            },

            Instr::LdANn => match self.step {
                0 => {
                    self.read_pc(bus);
                    self.step = 1;
                }
                1 => {
                    self.lo = self.data;
                    self.read_pc(bus);
                    self.step = 2;
                }
                2 => {
                    let addr = u16::from(self.data) << 8 | u16::from(self.lo);
                    self.read_at(bus, addr);
                    self.step = 3;
                }
                _ => {
                    self.regs.set_a(self.data);
                    self.finish(bus);
                }
            },

            Instr::LdhNA => match self.step {
                0 => {
                    self.read_pc(bus);
                    self.step = 1;
                }
                1 => {
                    bus.write(0xFF00 + u16::from(self.data), self.regs.a(), Access::Cpu);
                    self.step = 2;
                }
                _ => self.finish(bus),
            },

            Instr::LdhAN => match self.step {
                0 => {
                    self.read_pc(bus);
                    self.step = 1;
                }
                1 => {
                    self.read_at(bus, 0xFF00 + u16::from(self.data));
                    self.step = 2;
                }
                _ => {
                    self.regs.set_a(self.data);
                    self.finish(bus);
                }
            },

            Instr::LdhCA => match self.step {
                0 => {
                    let addr = 0xFF00 + u16::from(self.regs.r8(Reg8::C));
                    bus.write(addr, self.regs.a(), Access::Cpu);
                    self.step = 1;
                }
                _ => self.finish(bus),
            },

            Instr::LdhAC => match self.step {
                0 => {
                    let addr = 0xFF00 + u16::from(self.regs.r8(Reg8::C));
                    self.read_at(bus, addr);
                    self.step = 1;
                }
                _ => {
                    self.regs.set_a(self.data);
                    self.finish(bus);
                }
            },

            Instr::LdNnSp => match self.step {
                0 => {
                    self.read_pc(bus);
                    self.step = 1;
                }
                1 => {
                    self.lo = self.data;
                    self.read_pc(bus);
                    self.step = 2;
                }
                2 => {
                    self.hi = self.data;
                    let addr = u16::from(self.hi) << 8 | u16::from(self.lo);
                    bus.write(addr, self.regs.sp as u8, Access::Cpu);
                    self.step = 3;
                }
                3 => {
                    let addr = (u16::from(self.hi) << 8 | u16::from(self.lo)).wrapping_add(1);
                    bus.write(addr, (self.regs.sp >> 8) as u8, Access::Cpu);
                    self.step = 4;
                }
                _ => self.finish(bus),
            },

            Instr::LdSpHl => match self.step {
                0 => {
                    self.regs.sp = self.regs.hl();
                    self.step = 1;
                }
                _ => self.finish(bus),
            },

            Instr::LdHlSpE => match self.step {
                0 => {
                    self.read_pc(bus);
                    self.step = 1;
                }
                1 => {
                    let result = self.sp_offset_flags();
                    self.regs.set_r16(Reg16::HL, result);
                    self.step = 2;
                }
                _ => self.finish(bus),
            },

            Instr::AddSpE => match self.step {
                0 => {
                    self.read_pc(bus);
                    self.step = 1;
                }
                1 => {
                    let result = self.sp_offset_flags();
                    self.regs.sp = result;
                    self.step = 2;
                }
                2 => {
                    self.step = 3;
                }
                _ => self.finish(bus),
            },

            Instr::AluR(op, src) => {
                let v = self.regs.r8(src);
                self.alu(op, v);
                self.finish(bus);
            }

            Instr::AluHl(op) => match self.step {
                0 => {
                    self.read_at(bus, self.regs.hl());
                    self.step = 1;
                }
                _ => {
                    self.alu(op, self.data);
                    self.finish(bus);
                }
            },

            Instr::AluN(op) => match self.step {
                0 => {
                    self.read_pc(bus);
                    self.step = 1;
                }
                _ => {
                    self.alu(op, self.data);
                    self.finish(bus);
                }
            },

            Instr::IncR(r) => {
                let v = self.regs.r8(r);
                let result = self.inc8(v);
                self.regs.set_r8(r, result);
                self.finish(bus);
            }

            Instr::DecR(r) => {
                let v = self.regs.r8(r);
                let result = self.dec8(v);
                self.regs.set_r8(r, result);
                self.finish(bus);
            }

            Instr::IncHlInd => match self.step {
                0 => {
                    self.read_at(bus, self.regs.hl());
                    self.step = 1;
                }
                1 => {
                    let result = self.inc8(self.data);
                    bus.write(self.regs.hl(), result, Access::Cpu);
                    self.step = 2;
                }
                _ => self.finish(bus),
            },

            Instr::DecHlInd => match self.step {
                0 => {
                    self.read_at(bus, self.regs.hl());
                    self.step = 1;
                }
                1 => {
                    let result = self.dec8(self.data);
                    bus.write(self.regs.hl(), result, Access::Cpu);
                    self.step = 2;
                }
                _ => self.finish(bus),
            },

            Instr::AddHlRr(src) => match self.step {
                0 => {
                    let hl = self.regs.hl();
                    let v = self.regs.r16(src);
                    let (result, carry) = hl.overflowing_add(v);
                    // Zero flag is untouched by the 16-bit add.
                    self.regs.set_flag(FLAG_SUBTRACT, false);
                    self.regs
                        .set_flag(FLAG_HALF_CARRY, (hl & 0x0FFF) + (v & 0x0FFF) > 0x0FFF);
                    self.regs.set_flag(FLAG_CARRY, carry);
                    self.regs.set_r16(Reg16::HL, result);
                    self.step = 1;
                }
                _ => self.finish(bus),
            },

            Instr::IncRr(r) => match self.step {
                0 => {
                    let v = self.regs.r16(r).wrapping_add(1);
                    self.regs.set_r16(r, v);
                    self.step = 1;
                }
                _ => self.finish(bus),
            },

            Instr::DecRr(r) => match self.step {
                0 => {
                    let v = self.regs.r16(r).wrapping_sub(1);
                    self.regs.set_r16(r, v);
                    self.step = 1;
                }
                _ => self.finish(bus),
            },

            Instr::Rlca => {
                let a = self.regs.a();
                self.regs.set_a(a.rotate_left(1));
                self.accumulator_rotate_flags(a & 0x80 != 0);
                self.finish(bus);
            }

            Instr::Rrca => {
                let a = self.regs.a();
                self.regs.set_a(a.rotate_right(1));
                self.accumulator_rotate_flags(a & 0x01 != 0);
                self.finish(bus);
            }

            Instr::Rla => {
                let a = self.regs.a();
                let carry_in = u8::from(self.regs.flag(FLAG_CARRY));
                self.regs.set_a(a << 1 | carry_in);
                self.accumulator_rotate_flags(a & 0x80 != 0);
                self.finish(bus);
            }

            Instr::Rra => {
                let a = self.regs.a();
                let carry_in = u8::from(self.regs.flag(FLAG_CARRY));
                self.regs.set_a(a >> 1 | carry_in << 7);
                self.accumulator_rotate_flags(a & 0x01 != 0);
                self.finish(bus);
            }

            Instr::Daa => {
                self.daa();
                self.finish(bus);
            }

            Instr::Cpl => {
                let a = self.regs.a();
                self.regs.set_a(!a);
                self.regs.set_flag(FLAG_SUBTRACT, true);
                self.regs.set_flag(FLAG_HALF_CARRY, true);
                self.finish(bus);
            }

            Instr::Scf => {
                self.regs.set_flag(FLAG_SUBTRACT, false);
                self.regs.set_flag(FLAG_HALF_CARRY, false);
                self.regs.set_flag(FLAG_CARRY, true);
                self.finish(bus);
            }

            Instr::Ccf => {
                let carry = self.regs.flag(FLAG_CARRY);
                self.regs.set_flag(FLAG_SUBTRACT, false);
                self.regs.set_flag(FLAG_HALF_CARRY, false);
                self.regs.set_flag(FLAG_CARRY, !carry);
                self.finish(bus);
            }

            Instr::JpNn => match self.step {
                0 => {
                    self.read_pc(bus);
                    self.step = 1;
                }
                1 => {
                    self.lo = self.data;
                    self.read_pc(bus);
                    self.step = 2;
                }
                2 => {
                    self.regs.pc = u16::from(self.data) << 8 | u16::from(self.lo);
                    self.step = 3;
                }
                _ => self.finish(bus),
            },

            Instr::JpCc(cond) => match self.step {
                0 => {
                    self.read_pc(bus);
                    self.step = 1;
                }
                1 => {
                    self.lo = self.data;
                    self.read_pc(bus);
                    self.step = 2;
                }
                2 => {
                    if self.regs.condition(cond) {
                        self.regs.pc = u16::from(self.data) << 8 | u16::from(self.lo);
                        self.step = 3;
                    } else {
                        self.finish(bus);
                    }
                }
                _ => self.finish(bus),
            },

            Instr::JpHl => {
                self.regs.pc = self.regs.hl();
                self.finish(bus);
            }

            Instr::JrE => match self.step {
                0 => {
                    self.read_pc(bus);
                    self.step = 1;
                }
                1 => {
                    self.regs.pc = self.regs.pc.wrapping_add(self.data as i8 as u16);
                    self.step = 2;
                }
                _ => self.finish(bus),
            },

            Instr::JrCc(cond) => match self.step {
                0 => {
                    self.read_pc(bus);
                    self.step = 1;
                }
                1 => {
                    if self.regs.condition(cond) {
                        self.regs.pc = self.regs.pc.wrapping_add(self.data as i8 as u16);
                        self.step = 2;
                    } else {
                        self.finish(bus);
                    }
                }
                _ => self.finish(bus),
            },

            Instr::CallNn => match self.step {
                0 => {
                    self.read_pc(bus);
                    self.step = 1;
                }
                1 => {
                    self.lo = self.data;
                    self.read_pc(bus);
                    self.step = 2;
                }
                2 => {
                    self.hi = self.data;
                    self.step = 3;
                }
                3 => {
                    self.push_pc_high(bus);
                    self.step = 4;
                }
                4 => {
                    self.push_pc_low(bus);
                    self.regs.pc = u16::from(self.hi) << 8 | u16::from(self.lo);
                    self.step = 5;
                }
                _ => self.finish(bus),
            },

            Instr::CallCc(cond) => match self.step {
                0 => {
                    self.read_pc(bus);
                    self.step = 1;
                }
                1 => {
                    self.lo = self.data;
                    self.read_pc(bus);
                    self.step = 2;
                }
                2 => {
                    self.hi = self.data;
                    if self.regs.condition(cond) {
                        self.step = 3;
                    } else {
                        self.finish(bus);
                    }
                }
                3 => {
                    self.push_pc_high(bus);
                    self.step = 4;
                }
                4 => {
                    self.push_pc_low(bus);
                    self.regs.pc = u16::from(self.hi) << 8 | u16::from(self.lo);
                    self.step = 5;
                }
                _ => self.finish(bus),
            },

            Instr::Ret => match self.step {
                0 => {
                    self.read_at(bus, self.regs.sp);
                    self.regs.sp = self.regs.sp.wrapping_add(1);
                    self.step = 1;
                }
                1 => {
                    self.lo = self.data;
                    self.read_at(bus, self.regs.sp);
                    self.regs.sp = self.regs.sp.wrapping_add(1);
                    self.step = 2;
                }
                2 => {
                    self.regs.pc = u16::from(self.data) << 8 | u16::from(self.lo);
                    self.step = 3;
                }
                _ => self.finish(bus),
            },

            Instr::RetCc(cond) => match self.step {
                0 => {
                    self.step = 1;
                }
                1 => {
                    if self.regs.condition(cond) {
                        self.read_at(bus, self.regs.sp);
                        self.regs.sp = self.regs.sp.wrapping_add(1);
                        self.step = 2;
                    } else {
                        self.finish(bus);
                    }
                }
                2 => {
                    self.lo = self.data;
                    self.read_at(bus, self.regs.sp);
                    self.regs.sp = self.regs.sp.wrapping_add(1);
                    self.step = 3;
                }
                3 => {
                    self.regs.pc = u16::from(self.data) << 8 | u16::from(self.lo);
                    self.step = 4;
                }
                _ => self.finish(bus),
            },

            Instr::Reti => match self.step {
                0 => {
                    self.read_at(bus, self.regs.sp);
                    self.regs.sp = self.regs.sp.wrapping_add(1);
                    self.step = 1;
                }
                1 => {
                    self.lo = self.data;
                    self.read_at(bus, self.regs.sp);
                    self.regs.sp = self.regs.sp.wrapping_add(1);
                    self.step = 2;
                }
                2 => {
                    self.regs.pc = u16::from(self.data) << 8 | u16::from(self.lo);
                    self.ime = Ime::Enabled;
                    self.step = 3;
                }
                _ => self.finish(bus),
            },

            Instr::Rst(vector) => match self.step {
                0 => {
                    self.step = 1;
                }
                1 => {
                    self.push_pc_high(bus);
                    self.step = 2;
                }
                2 => {
                    self.push_pc_low(bus);
                    self.regs.pc = u16::from(vector);
                    self.step = 3;
                }
                _ => self.finish(bus),
            },

            Instr::Push(src) => match self.step {
                0 => {
                    self.step = 1;
                }
                1 => {
                    let v = (self.regs.r16(src) >> 8) as u8;
                    self.regs.sp = self.regs.sp.wrapping_sub(1);
                    bus.write(self.regs.sp, v, Access::Cpu);
                    self.step = 2;
                }
                2 => {
                    let v = self.regs.r16(src) as u8;
                    self.regs.sp = self.regs.sp.wrapping_sub(1);
                    bus.write(self.regs.sp, v, Access::Cpu);
                    self.step = 3;
                }
                _ => self.finish(bus),
            },

            Instr::Pop(dst) => match self.step {
                0 => {
                    self.read_at(bus, self.regs.sp);
                    self.regs.sp = self.regs.sp.wrapping_add(1);
                    self.step = 1;
                }
                1 => {
                    self.lo = self.data;
                    self.read_at(bus, self.regs.sp);
                    self.regs.sp = self.regs.sp.wrapping_add(1);
                    self.step = 2;
                }
                _ => {
                    // Popping into AF goes through the masked register-pair
                    // write, keeping the flags low nibble clear.
                    let value = u16::from(self.data) << 8 | u16::from(self.lo);
                    self.regs.set_r16(dst, value);
                    self.finish(bus);
                }
            },

            Instr::Prefix => self.exec_cb_cycle(bus),

            Instr::Illegal(op) => {
                // Decode aborts before execution can get here.
                unreachable!("illegal opcode 0x{op:02X} reached execution")
            }
        }
    }

    fn exec_cb_cycle(&mut self, bus: &mut Bus) {
        if self.step == 0 {
            self.read_pc(bus);
            self.cb = Some(decode_cb(self.data));
            self.step = 1;
            return;
        }
        let (op, target) = self.cb.expect("CB operand decoded on step 0");
        match target {
            CbTarget::Reg(r) => {
                let v = self.regs.r8(r);
                let result = self.cb_apply(op, v);
                self.regs.set_r8(r, result);
                self.finish(bus);
            }
            CbTarget::HlInd => match (op, self.step) {
                (CbOp::Bit(_), 1) => {
                    self.read_at(bus, self.regs.hl());
                    self.step = 2;
                }
                (CbOp::Bit(_), _) => {
                    let v = self.data;
                    self.cb_apply(op, v);
                    self.finish(bus);
                }
                (_, 1) => {
                    self.read_at(bus, self.regs.hl());
                    self.step = 2;
                }
                (_, 2) => {
                    let result = self.cb_apply(op, self.data);
                    bus.write(self.regs.hl(), result, Access::Cpu);
                    self.step = 3;
                }
                _ => self.finish(bus),
            },
        }
    }

    // -----------------------------------------------------------------
    // Flag arithmetic. All four flags are computed from each operation's
    // actual inputs; every instruction form funnels through these.
    // -----------------------------------------------------------------

    pub(crate) fn alu(&mut self, op: AluOp, value: u8) {
        let a = self.regs.a();
        let carry = u8::from(self.regs.flag(FLAG_CARRY));
        match op {
            AluOp::Add => {
                let result = a.wrapping_add(value);
                self.regs.set_flag(FLAG_ZERO, result == 0);
                self.regs.set_flag(FLAG_SUBTRACT, false);
                self.regs
                    .set_flag(FLAG_HALF_CARRY, (a & 0x0F) + (value & 0x0F) > 0x0F);
                self.regs
                    .set_flag(FLAG_CARRY, u16::from(a) + u16::from(value) > 0xFF);
                self.regs.set_a(result);
            }
            AluOp::Adc => {
                let result = a.wrapping_add(value).wrapping_add(carry);
                self.regs.set_flag(FLAG_ZERO, result == 0);
                self.regs.set_flag(FLAG_SUBTRACT, false);
                self.regs
                    .set_flag(FLAG_HALF_CARRY, (a & 0x0F) + (value & 0x0F) + carry > 0x0F);
                self.regs.set_flag(
                    FLAG_CARRY,
                    u16::from(a) + u16::from(value) + u16::from(carry) > 0xFF,
                );
                self.regs.set_a(result);
            }
            AluOp::Sub => {
                let result = a.wrapping_sub(value);
                self.regs.set_flag(FLAG_ZERO, result == 0);
                self.regs.set_flag(FLAG_SUBTRACT, true);
                self.regs
                    .set_flag(FLAG_HALF_CARRY, (a & 0x0F) < (value & 0x0F));
                self.regs.set_flag(FLAG_CARRY, a < value);
                self.regs.set_a(result);
            }
            AluOp::Sbc => {
                let result = a.wrapping_sub(value).wrapping_sub(carry);
                self.regs.set_flag(FLAG_ZERO, result == 0);
                self.regs.set_flag(FLAG_SUBTRACT, true);
                self.regs
                    .set_flag(FLAG_HALF_CARRY, (a & 0x0F) < (value & 0x0F) + carry);
                self.regs
                    .set_flag(FLAG_CARRY, u16::from(a) < u16::from(value) + u16::from(carry));
                self.regs.set_a(result);
            }
            AluOp::And => {
                let result = a & value;
                self.regs.set_flag(FLAG_ZERO, result == 0);
                self.regs.set_flag(FLAG_SUBTRACT, false);
                self.regs.set_flag(FLAG_HALF_CARRY, true);
                self.regs.set_flag(FLAG_CARRY, false);
                self.regs.set_a(result);
            }
            AluOp::Xor => {
                let result = a ^ value;
                self.regs.set_flag(FLAG_ZERO, result == 0);
                self.regs.set_flag(FLAG_SUBTRACT, false);
                self.regs.set_flag(FLAG_HALF_CARRY, false);
                self.regs.set_flag(FLAG_CARRY, false);
                self.regs.set_a(result);
            }
            AluOp::Or => {
                let result = a | value;
                self.regs.set_flag(FLAG_ZERO, result == 0);
                self.regs.set_flag(FLAG_SUBTRACT, false);
                self.regs.set_flag(FLAG_HALF_CARRY, false);
                self.regs.set_flag(FLAG_CARRY, false);
                self.regs.set_a(result);
            }
            AluOp::Cp => {
                self.regs.set_flag(FLAG_ZERO, a == value);
                self.regs.set_flag(FLAG_SUBTRACT, true);
                self.regs
                    .set_flag(FLAG_HALF_CARRY, (a & 0x0F) < (value & 0x0F));
                self.regs.set_flag(FLAG_CARRY, a < value);
            }
        }
    }

    pub(crate) fn inc8(&mut self, v: u8) -> u8 {
        let result = v.wrapping_add(1);
        self.regs.set_flag(FLAG_ZERO, result == 0);
        self.regs.set_flag(FLAG_SUBTRACT, false);
        self.regs.set_flag(FLAG_HALF_CARRY, (v & 0x0F) == 0x0F);
        result
    }

    pub(crate) fn dec8(&mut self, v: u8) -> u8 {
        let result = v.wrapping_sub(1);
        self.regs.set_flag(FLAG_ZERO, result == 0);
        self.regs.set_flag(FLAG_SUBTRACT, true);
        self.regs.set_flag(FLAG_HALF_CARRY, (v & 0x0F) == 0);
        result
    }

    /// SP + signed immediate, shared by ADD SP,e and LD HL,SP+e. Half-carry
    /// and carry come from the unsigned low-byte addition.
    fn sp_offset_flags(&mut self) -> u16 {
        let sp = self.regs.sp;
        let e = self.data;
        self.regs.set_flag(FLAG_ZERO, false);
        self.regs.set_flag(FLAG_SUBTRACT, false);
        self.regs
            .set_flag(FLAG_HALF_CARRY, (sp & 0x0F) + u16::from(e & 0x0F) > 0x0F);
        self.regs
            .set_flag(FLAG_CARRY, (sp & 0xFF) + u16::from(e) > 0xFF);
        sp.wrapping_add(e as i8 as u16)
    }

    fn accumulator_rotate_flags(&mut self, carry: bool) {
        self.regs.set_flag(FLAG_ZERO, false);
        self.regs.set_flag(FLAG_SUBTRACT, false);
        self.regs.set_flag(FLAG_HALF_CARRY, false);
        self.regs.set_flag(FLAG_CARRY, carry);
    }

    fn rotate_result_flags(&mut self, result: u8, carry: bool) {
        self.regs.set_flag(FLAG_ZERO, result == 0);
        self.regs.set_flag(FLAG_SUBTRACT, false);
        self.regs.set_flag(FLAG_HALF_CARRY, false);
        self.regs.set_flag(FLAG_CARRY, carry);
    }

    /// Apply a 0xCB operation and return the result byte. BIT only sets
    /// flags; RES/SET touch none.
    pub(crate) fn cb_apply(&mut self, op: CbOp, v: u8) -> u8 {
        match op {
            CbOp::Rlc => {
                let result = v.rotate_left(1);
                self.rotate_result_flags(result, v & 0x80 != 0);
                result
            }
            CbOp::Rrc => {
                let result = v.rotate_right(1);
                self.rotate_result_flags(result, v & 0x01 != 0);
                result
            }
            CbOp::Rl => {
                let carry_in = u8::from(self.regs.flag(FLAG_CARRY));
                let result = v << 1 | carry_in;
                self.rotate_result_flags(result, v & 0x80 != 0);
                result
            }
            CbOp::Rr => {
                let carry_in = u8::from(self.regs.flag(FLAG_CARRY));
                let result = v >> 1 | carry_in << 7;
                self.rotate_result_flags(result, v & 0x01 != 0);
                result
            }
            CbOp::Sla => {
                let result = v << 1;
                self.rotate_result_flags(result, v & 0x80 != 0);
                result
            }
            CbOp::Sra => {
                let result = (v >> 1) | (v & 0x80);
                self.rotate_result_flags(result, v & 0x01 != 0);
                result
            }
            CbOp::Swap => {
                let result = v.rotate_left(4);
                self.rotate_result_flags(result, false);
                result
            }
            CbOp::Srl => {
                let result = v >> 1;
                self.rotate_result_flags(result, v & 0x01 != 0);
                result
            }
            CbOp::Bit(bit) => {
                self.regs.set_flag(FLAG_ZERO, v & (1 << bit) == 0);
                self.regs.set_flag(FLAG_SUBTRACT, false);
                self.regs.set_flag(FLAG_HALF_CARRY, true);
                v
            }
            CbOp::Res(bit) => v & !(1 << bit),
            CbOp::Set(bit) => v | (1 << bit),
        }
    }

    fn daa(&mut self) {
        let mut a = self.regs.a();
        let subtract = self.regs.flag(FLAG_SUBTRACT);
        let half = self.regs.flag(FLAG_HALF_CARRY);
        let mut carry = self.regs.flag(FLAG_CARRY);
        if subtract {
            if carry {
                a = a.wrapping_sub(0x60);
            }
            if half {
                a = a.wrapping_sub(0x06);
            }
        } else {
            if carry || a > 0x99 {
                a = a.wrapping_add(0x60);
                carry = true;
            }
            if half || (a & 0x0F) > 0x09 {
                a = a.wrapping_add(0x06);
            }
        }
        self.regs.set_flag(FLAG_ZERO, a == 0);
        self.regs.set_flag(FLAG_HALF_CARRY, false);
        self.regs.set_flag(FLAG_CARRY, carry);
        self.regs.set_a(a);
    }

    fn push_pc_high(&mut self, bus: &mut Bus) {
        self.regs.sp = self.regs.sp.wrapping_sub(1);
        bus.write(self.regs.sp, (self.regs.pc >> 8) as u8, Access::Cpu);
    }

    fn push_pc_low(&mut self, bus: &mut Bus) {
        self.regs.sp = self.regs.sp.wrapping_sub(1);
        bus.write(self.regs.sp, self.regs.pc as u8, Access::Cpu);
    }
}
