/*!
Opcode decoding: the 256-entry base table and the 0xCB escape space.

The base table is a flat, declarative mapping from opcode byte to an
enum-tagged instruction descriptor; execution state machines live in
`execute.rs`. Eleven entries are defined illegal and decode to
`Instr::Illegal`; executing one is fatal (hardware locks up there, and a
conforming run must not paper over it).

The escape space behind 0xCB is regular (register selector in the low three
bits, operation selector above), so it is decoded from the bit fields rather
than spelled out as a second flat table.
*/

use crate::cpu::regs::{Cond, Reg8, Reg16};

/// ALU operations over the accumulator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AluOp {
    Add,
    Adc,
    Sub,
    Sbc,
    And,
    Xor,
    Or,
    Cp,
}

/// Decoded instruction descriptor. One variant per execution shape; operand
/// selectors are carried as data so each shape has a single step machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Instr {
    Nop,
    Stop,
    Halt,
    Di,
    Ei,
    /// 0xCB escape; the second byte is fetched and decoded by the executor.
    Prefix,

    LdRR(Reg8, Reg8),
    LdRN(Reg8),
    LdRrNn(Reg16),
    /// LD (rr),r
    StoreInd(Reg16, Reg8),
    /// LD r,(rr)
    LoadInd(Reg8, Reg16),
    LdHlN,
    LdHliA,
    LdHldA,
    LdAHli,
    LdAHld,
    LdNnA,
    LdANn,
    LdhNA,
    LdhAN,
    LdhCA,
    LdhAC,
    LdNnSp,
    LdSpHl,
    LdHlSpE,

    AluR(AluOp, Reg8),
    AluHl(AluOp),
    AluN(AluOp),
    IncR(Reg8),
    DecR(Reg8),
    IncHlInd,
    DecHlInd,
    AddHlRr(Reg16),
    AddSpE,
    IncRr(Reg16),
    DecRr(Reg16),

    Rlca,
    Rrca,
    Rla,
    Rra,
    Daa,
    Cpl,
    Scf,
    Ccf,

    JpNn,
    JpCc(Cond),
    JpHl,
    JrE,
    JrCc(Cond),
    CallNn,
    CallCc(Cond),
    Ret,
    RetCc(Cond),
    Reti,
    Rst(u8),
    Push(Reg16),
    Pop(Reg16),

    Illegal(u8),
}

/// Operations in the 0xCB escape space.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CbOp {
    Rlc,
    Rrc,
    Rl,
    Rr,
    Sla,
    Sra,
    Swap,
    Srl,
    Bit(u8),
    Res(u8),
    Set(u8),
}

/// Target of a 0xCB operation: a register or the byte at (HL).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CbTarget {
    Reg(Reg8),
    HlInd,
}

/// Decode the byte following the 0xCB escape from its bit fields: target in
/// the low three bits (6 encodes the HL indirection), operation row above.
pub fn decode_cb(opcode: u8) -> (CbOp, CbTarget) {
    let target = match opcode & 0x07 {
        0 => CbTarget::Reg(Reg8::B),
        1 => CbTarget::Reg(Reg8::C),
        2 => CbTarget::Reg(Reg8::D),
        3 => CbTarget::Reg(Reg8::E),
        4 => CbTarget::Reg(Reg8::H),
        5 => CbTarget::Reg(Reg8::L),
        6 => CbTarget::HlInd,
        _ => CbTarget::Reg(Reg8::A),
    };
    let row = (opcode >> 3) & 0x07;
    let op = match opcode >> 6 {
        0 => match row {
            0 => CbOp::Rlc,
            1 => CbOp::Rrc,
            2 => CbOp::Rl,
            3 => CbOp::Rr,
            4 => CbOp::Sla,
            5 => CbOp::Sra,
            6 => CbOp::Swap,
            _ => CbOp::Srl,
        },
        1 => CbOp::Bit(row),
        2 => CbOp::Res(row),
        _ => CbOp::Set(row),
    };
    (op, target)
}

/// The 256-entry base opcode table.
pub fn decode(opcode: u8) -> Instr {
    use AluOp::*;
    use Cond::*;
    use Instr::*;
    use Reg8::*;
    use Reg16::*;

    match opcode {
        0x00 => Nop,
        0x01 => LdRrNn(BC),
        0x02 => StoreInd(BC, A),
        0x03 => IncRr(BC),
        0x04 => IncR(B),
        0x05 => DecR(B),
        0x06 => LdRN(B),
        0x07 => Rlca,
        0x08 => LdNnSp,
        0x09 => AddHlRr(BC),
        0x0A => LoadInd(A, BC),
        0x0B => DecRr(BC),
        0x0C => IncR(C),
        0x0D => DecR(C),
        0x0E => LdRN(C),
        0x0F => Rrca,

        0x10 => Stop,
        0x11 => LdRrNn(DE),
        0x12 => StoreInd(DE, A),
        0x13 => IncRr(DE),
        0x14 => IncR(D),
        0x15 => DecR(D),
        0x16 => LdRN(D),
        0x17 => Rla,
        0x18 => JrE,
        0x19 => AddHlRr(DE),
        0x1A => LoadInd(A, DE),
        0x1B => DecRr(DE),
        0x1C => IncR(E),
        0x1D => DecR(E),
        0x1E => LdRN(E),
        0x1F => Rra,

        0x20 => JrCc(NotZero),
        0x21 => LdRrNn(HL),
        0x22 => LdHliA,
        0x23 => IncRr(HL),
        0x24 => IncR(H),
        0x25 => DecR(H),
        0x26 => LdRN(H),
        0x27 => Daa,
        0x28 => JrCc(Zero),
        0x29 => AddHlRr(HL),
        0x2A => LdAHli,
        0x2B => DecRr(HL),
        0x2C => IncR(L),
        0x2D => DecR(L),
        0x2E => LdRN(L),
        0x2F => Cpl,

        0x30 => JrCc(NotCarry),
        0x31 => LdRrNn(SP),
        0x32 => LdHldA,
        0x33 => IncRr(SP),
        0x34 => IncHlInd,
        0x35 => DecHlInd,
        0x36 => LdHlN,
        0x37 => Scf,
        0x38 => JrCc(Carry),
        0x39 => AddHlRr(SP),
        0x3A => LdAHld,
        0x3B => DecRr(SP),
        0x3C => IncR(A),
        0x3D => DecR(A),
        0x3E => LdRN(A),
        0x3F => Ccf,

        0x40 => LdRR(B, B),
        0x41 => LdRR(B, C),
        0x42 => LdRR(B, D),
        0x43 => LdRR(B, E),
        0x44 => LdRR(B, H),
        0x45 => LdRR(B, L),
        0x46 => LoadInd(B, HL),
        0x47 => LdRR(B, A),
        0x48 => LdRR(C, B),
        0x49 => LdRR(C, C),
        0x4A => LdRR(C, D),
        0x4B => LdRR(C, E),
        0x4C => LdRR(C, H),
        0x4D => LdRR(C, L),
        0x4E => LoadInd(C, HL),
        0x4F => LdRR(C, A),

        0x50 => LdRR(D, B),
        0x51 => LdRR(D, C),
        0x52 => LdRR(D, D),
        0x53 => LdRR(D, E),
        0x54 => LdRR(D, H),
        0x55 => LdRR(D, L),
        0x56 => LoadInd(D, HL),
        0x57 => LdRR(D, A),
        0x58 => LdRR(E, B),
        0x59 => LdRR(E, C),
        0x5A => LdRR(E, D),
        0x5B => LdRR(E, E),
        0x5C => LdRR(E, H),
        0x5D => LdRR(E, L),
        0x5E => LoadInd(E, HL),
        0x5F => LdRR(E, A),

        0x60 => LdRR(H, B),
        0x61 => LdRR(H, C),
        0x62 => LdRR(H, D),
        0x63 => LdRR(H, E),
        0x64 => LdRR(H, H),
        0x65 => LdRR(H, L),
        0x66 => LoadInd(H, HL),
        0x67 => LdRR(H, A),
        0x68 => LdRR(L, B),
        0x69 => LdRR(L, C),
        0x6A => LdRR(L, D),
        0x6B => LdRR(L, E),
        0x6C => LdRR(L, H),
        0x6D => LdRR(L, L),
        0x6E => LoadInd(L, HL),
        0x6F => LdRR(L, A),

        0x70 => StoreInd(HL, B),
        0x71 => StoreInd(HL, C),
        0x72 => StoreInd(HL, D),
        0x73 => StoreInd(HL, E),
        0x74 => StoreInd(HL, H),
        0x75 => StoreInd(HL, L),
        0x76 => Halt,
        0x77 => StoreInd(HL, A),
        0x78 => LdRR(A, B),
        0x79 => LdRR(A, C),
        0x7A => LdRR(A, D),
        0x7B => LdRR(A, E),
        0x7C => LdRR(A, H),
        0x7D => LdRR(A, L),
        0x7E => LoadInd(A, HL),
        0x7F => LdRR(A, A),

        0x80 => AluR(Add, B),
        0x81 => AluR(Add, C),
        0x82 => AluR(Add, D),
        0x83 => AluR(Add, E),
        0x84 => AluR(Add, H),
        0x85 => AluR(Add, L),
        0x86 => AluHl(Add),
        0x87 => AluR(Add, A),
        0x88 => AluR(Adc, B),
        0x89 => AluR(Adc, C),
        0x8A => AluR(Adc, D),
        0x8B => AluR(Adc, E),
        0x8C => AluR(Adc, H),
        0x8D => AluR(Adc, L),
        0x8E => AluHl(Adc),
        0x8F => AluR(Adc, A),

        0x90 => AluR(Sub, B),
        0x91 => AluR(Sub, C),
        0x92 => AluR(Sub, D),
        0x93 => AluR(Sub, E),
        0x94 => AluR(Sub, H),
        0x95 => AluR(Sub, L),
        0x96 => AluHl(Sub),
        0x97 => AluR(Sub, A),
        0x98 => AluR(Sbc, B),
        0x99 => AluR(Sbc, C),
        0x9A => AluR(Sbc, D),
        0x9B => AluR(Sbc, E),
        0x9C => AluR(Sbc, H),
        0x9D => AluR(Sbc, L),
        0x9E => AluHl(Sbc),
        0x9F => AluR(Sbc, A),

        0xA0 => AluR(And, B),
        0xA1 => AluR(And, C),
        0xA2 => AluR(And, D),
        0xA3 => AluR(And, E),
        0xA4 => AluR(And, H),
        0xA5 => AluR(And, L),
        0xA6 => AluHl(And),
        0xA7 => AluR(And, A),
        0xA8 => AluR(Xor, B),
        0xA9 => AluR(Xor, C),
        0xAA => AluR(Xor, D),
        0xAB => AluR(Xor, E),
        0xAC => AluR(Xor, H),
        0xAD => AluR(Xor, L),
        0xAE => AluHl(Xor),
        0xAF => AluR(Xor, A),

        0xB0 => AluR(Or, B),
        0xB1 => AluR(Or, C),
        0xB2 => AluR(Or, D),
        0xB3 => AluR(Or, E),
        0xB4 => AluR(Or, H),
        0xB5 => AluR(Or, L),
        0xB6 => AluHl(Or),
        0xB7 => AluR(Or, A),
        0xB8 => AluR(Cp, B),
        0xB9 => AluR(Cp, C),
        0xBA => AluR(Cp, D),
        0xBB => AluR(Cp, E),
        0xBC => AluR(Cp, H),
        0xBD => AluR(Cp, L),
        0xBE => AluHl(Cp),
        0xBF => AluR(Cp, A),

        0xC0 => RetCc(NotZero),
        0xC1 => Pop(BC),
        0xC2 => JpCc(NotZero),
        0xC3 => JpNn,
        0xC4 => CallCc(NotZero),
        0xC5 => Push(BC),
        0xC6 => AluN(Add),
        0xC7 => Rst(0x00),
        0xC8 => RetCc(Zero),
        0xC9 => Ret,
        0xCA => JpCc(Zero),
        0xCB => Prefix,
        0xCC => CallCc(Zero),
        0xCD => CallNn,
        0xCE => AluN(Adc),
        0xCF => Rst(0x08),

        0xD0 => RetCc(NotCarry),
        0xD1 => Pop(DE),
        0xD2 => JpCc(NotCarry),
        0xD3 => Illegal(0xD3),
        0xD4 => CallCc(NotCarry),
        0xD5 => Push(DE),
        0xD6 => AluN(Sub),
        0xD7 => Rst(0x10),
        0xD8 => RetCc(Carry),
        0xD9 => Reti,
        0xDA => JpCc(Carry),
        0xDB => Illegal(0xDB),
        0xDC => CallCc(Carry),
        0xDD => Illegal(0xDD),
        0xDE => AluN(Sbc),
        0xDF => Rst(0x18),

        0xE0 => LdhNA,
        0xE1 => Pop(HL),
        0xE2 => LdhCA,
        0xE3 => Illegal(0xE3),
        0xE4 => Illegal(0xE4),
        0xE5 => Push(HL),
        0xE6 => AluN(And),
        0xE7 => Rst(0x20),
        0xE8 => AddSpE,
        0xE9 => JpHl,
        0xEA => LdNnA,
        0xEB => Illegal(0xEB),
        0xEC => Illegal(0xEC),
        0xED => Illegal(0xED),
        0xEE => AluN(Xor),
        0xEF => Rst(0x28),

        0xF0 => LdhAN,
        0xF1 => Pop(AF),
        0xF2 => LdhAC,
        0xF3 => Di,
        0xF4 => Illegal(0xF4),
        0xF5 => Push(AF),
        0xF6 => AluN(Or),
        0xF7 => Rst(0x30),
        0xF8 => LdHlSpE,
        0xF9 => LdSpHl,
        0xFA => LdANn,
        0xFB => Ei,
        0xFC => Illegal(0xFC),
        0xFD => Illegal(0xFD),
        0xFE => AluN(Cp),
        0xFF => Rst(0x38),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_entry_in_the_load_grid_decodes() {
        // 0x40..=0x7F is the register-to-register grid with HALT at 0x76.
        for op in 0x40..=0x7Fu8 {
            let decoded = decode(op);
            if op == 0x76 {
                assert_eq!(decoded, Instr::Halt);
            } else {
                assert!(matches!(
                    decoded,
                    Instr::LdRR(..) | Instr::LoadInd(..) | Instr::StoreInd(..)
                ));
            }
        }
    }

    #[test]
    fn exactly_eleven_opcodes_are_illegal() {
        let illegal: Vec<u8> = (0..=255u8)
            .filter(|&op| matches!(decode(op), Instr::Illegal(_)))
            .collect();
        assert_eq!(
            illegal,
            vec![0xD3, 0xDB, 0xDD, 0xE3, 0xE4, 0xEB, 0xEC, 0xED, 0xF4, 0xFC, 0xFD]
        );
    }

    #[test]
    fn cb_space_decodes_from_bit_fields() {
        assert_eq!(decode_cb(0x00), (CbOp::Rlc, CbTarget::Reg(Reg8::B)));
        assert_eq!(decode_cb(0x16), (CbOp::Rl, CbTarget::HlInd));
        assert_eq!(decode_cb(0x37), (CbOp::Swap, CbTarget::Reg(Reg8::A)));
        assert_eq!(decode_cb(0x7E), (CbOp::Bit(7), CbTarget::HlInd));
        assert_eq!(decode_cb(0x87), (CbOp::Res(0), CbTarget::Reg(Reg8::A)));
        assert_eq!(decode_cb(0xFF), (CbOp::Set(7), CbTarget::Reg(Reg8::A)));
    }

    #[test]
    fn alu_rows_cover_all_eight_operations() {
        assert_eq!(decode(0x80), Instr::AluR(AluOp::Add, Reg8::B));
        assert_eq!(decode(0x96), Instr::AluHl(AluOp::Sub));
        assert_eq!(decode(0xEE), Instr::AluN(AluOp::Xor));
        assert_eq!(decode(0xBF), Instr::AluR(AluOp::Cp, Reg8::A));
    }
}
