//! Opcode decode table for the 2A03.
//!
//! All 256 encodings are covered: the 151 official instructions, the
//! documented illegal NOP variants, and JAM for everything else. The
//! `cycles` field is the base cost for documentation and the debugger;
//! actual timing is produced by the bus accesses each instruction performs.

/// Instruction class, dispatched on after decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)] // The variants are the 6502 mnemonics themselves.
pub enum OpcodeClass {
    Adc, And, Asl, Bcc, Bcs, Beq, Bit, Bmi, Bne, Bpl, Brk, Bvc, Bvs,
    Clc, Cld, Cli, Clv, Cmp, Cpx, Cpy, Dec, Dex, Dey, Eor, Inc, Inx,
    Iny, Jam, Jmp, Jsr, Lda, Ldx, Ldy, Lsr, Nop, Ora, Pha, Php, Pla,
    Plp, Rol, Ror, Rti, Rts, Sbc, Sec, Sed, Sei, Sta, Stx, Sty, Tax,
    Tay, Tsx, Txa, Txs, Tya,
}

/// Addressing mode of an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddrMode {
    /// Operand is the accumulator.
    Accumulator,
    /// Two-byte absolute address.
    Absolute,
    /// Absolute address indexed by X.
    AbsoluteX,
    /// Absolute address indexed by Y.
    AbsoluteY,
    /// Operand is the byte following the opcode.
    Immediate,
    /// No operand.
    Implied,
    /// Absolute pointer dereference (JMP only, with the page-wrap bug).
    Indirect,
    /// Zero-page pointer indexed by X before dereference.
    IndirectX,
    /// Zero-page pointer dereferenced, then indexed by Y.
    IndirectY,
    /// Signed 8-bit branch offset.
    Relative,
    /// One-byte zero-page address.
    ZeroPage,
    /// Zero-page address indexed by X (wraps within page 0).
    ZeroPageX,
    /// Zero-page address indexed by Y (wraps within page 0).
    ZeroPageY,
}

impl AddrMode {
    /// Number of operand bytes following the opcode.
    #[must_use]
    pub const fn operand_bytes(self) -> u16 {
        match self {
            Self::Accumulator | Self::Implied => 0,
            Self::Immediate
            | Self::Relative
            | Self::ZeroPage
            | Self::ZeroPageX
            | Self::ZeroPageY
            | Self::IndirectX
            | Self::IndirectY => 1,
            Self::Absolute | Self::AbsoluteX | Self::AbsoluteY | Self::Indirect => 2,
        }
    }
}

/// One row of the decode table.
#[derive(Debug, Clone, Copy)]
pub struct Opcode {
    /// Instruction class.
    pub class: OpcodeClass,
    /// Addressing mode.
    pub mode: AddrMode,
    /// Instruction length in bytes, including the opcode.
    pub length: u8,
    /// Base cycle count (without taken-branch or page-cross penalties).
    pub cycles: u8,
    /// Mnemonic, for the debugger.
    pub mnemonic: &'static str,
}

const fn op(class: OpcodeClass, mode: AddrMode, length: u8, cycles: u8, mnemonic: &'static str) -> Opcode {
    Opcode { class, mode, length, cycles, mnemonic }
}

const fn jam() -> Opcode {
    op(OpcodeClass::Jam, AddrMode::Implied, 1, 1, "JAM")
}

use AddrMode as M;
use OpcodeClass as C;

/// Complete decode table, indexed by the opcode byte.
pub const OPCODE_TABLE: [Opcode; 256] = [
    op(C::Brk, M::Implied, 1, 7, "BRK"),      // 0x00
    op(C::Ora, M::IndirectX, 2, 6, "ORA"),    // 0x01
    jam(),                                    // 0x02
    jam(),                                    // 0x03
    op(C::Nop, M::ZeroPage, 2, 3, "NOP"),     // 0x04
    op(C::Ora, M::ZeroPage, 2, 3, "ORA"),     // 0x05
    op(C::Asl, M::ZeroPage, 2, 5, "ASL"),     // 0x06
    jam(),                                    // 0x07
    op(C::Php, M::Implied, 1, 3, "PHP"),      // 0x08
    op(C::Ora, M::Immediate, 2, 2, "ORA"),    // 0x09
    op(C::Asl, M::Accumulator, 1, 2, "ASL"),  // 0x0A
    jam(),                                    // 0x0B
    op(C::Nop, M::Absolute, 3, 4, "NOP"),     // 0x0C
    op(C::Ora, M::Absolute, 3, 4, "ORA"),     // 0x0D
    op(C::Asl, M::Absolute, 3, 6, "ASL"),     // 0x0E
    jam(),                                    // 0x0F
    op(C::Bpl, M::Relative, 2, 2, "BPL"),     // 0x10
    op(C::Ora, M::IndirectY, 2, 5, "ORA"),    // 0x11
    jam(),                                    // 0x12
    jam(),                                    // 0x13
    op(C::Nop, M::ZeroPageX, 2, 4, "NOP"),    // 0x14
    op(C::Ora, M::ZeroPageX, 2, 4, "ORA"),    // 0x15
    op(C::Asl, M::ZeroPageX, 2, 6, "ASL"),    // 0x16
    jam(),                                    // 0x17
    op(C::Clc, M::Implied, 1, 2, "CLC"),      // 0x18
    op(C::Ora, M::AbsoluteY, 3, 4, "ORA"),    // 0x19
    op(C::Nop, M::Implied, 1, 2, "NOP"),      // 0x1A
    jam(),                                    // 0x1B
    op(C::Nop, M::AbsoluteX, 3, 4, "NOP"),    // 0x1C
    op(C::Ora, M::AbsoluteX, 3, 4, "ORA"),    // 0x1D
    op(C::Asl, M::AbsoluteX, 3, 7, "ASL"),    // 0x1E
    jam(),                                    // 0x1F
    op(C::Jsr, M::Absolute, 3, 6, "JSR"),     // 0x20
    op(C::And, M::IndirectX, 2, 6, "AND"),    // 0x21
    jam(),                                    // 0x22
    jam(),                                    // 0x23
    op(C::Bit, M::ZeroPage, 2, 3, "BIT"),     // 0x24
    op(C::And, M::ZeroPage, 2, 3, "AND"),     // 0x25
    op(C::Rol, M::ZeroPage, 2, 5, "ROL"),     // 0x26
    jam(),                                    // 0x27
    op(C::Plp, M::Implied, 1, 4, "PLP"),      // 0x28
    op(C::And, M::Immediate, 2, 2, "AND"),    // 0x29
    op(C::Rol, M::Accumulator, 1, 2, "ROL"),  // 0x2A
    jam(),                                    // 0x2B
    op(C::Bit, M::Absolute, 3, 4, "BIT"),     // 0x2C
    op(C::And, M::Absolute, 3, 4, "AND"),     // 0x2D
    op(C::Rol, M::Absolute, 3, 6, "ROL"),     // 0x2E
    jam(),                                    // 0x2F
    op(C::Bmi, M::Relative, 2, 2, "BMI"),     // 0x30
    op(C::And, M::IndirectY, 2, 5, "AND"),    // 0x31
    jam(),                                    // 0x32
    jam(),                                    // 0x33
    op(C::Nop, M::ZeroPageX, 2, 4, "NOP"),    // 0x34
    op(C::And, M::ZeroPageX, 2, 4, "AND"),    // 0x35
    op(C::Rol, M::ZeroPageX, 2, 6, "ROL"),    // 0x36
    jam(),                                    // 0x37
    op(C::Sec, M::Implied, 1, 2, "SEC"),      // 0x38
    op(C::And, M::AbsoluteY, 3, 4, "AND"),    // 0x39
    op(C::Nop, M::Implied, 1, 2, "NOP"),      // 0x3A
    jam(),                                    // 0x3B
    op(C::Nop, M::AbsoluteX, 3, 4, "NOP"),    // 0x3C
    op(C::And, M::AbsoluteX, 3, 4, "AND"),    // 0x3D
    op(C::Rol, M::AbsoluteX, 3, 7, "ROL"),    // 0x3E
    jam(),                                    // 0x3F
    op(C::Rti, M::Implied, 1, 6, "RTI"),      // 0x40
    op(C::Eor, M::IndirectX, 2, 6, "EOR"),    // 0x41
    jam(),                                    // 0x42
    jam(),                                    // 0x43
    op(C::Nop, M::ZeroPage, 2, 3, "NOP"),     // 0x44
    op(C::Eor, M::ZeroPage, 2, 3, "EOR"),     // 0x45
    op(C::Lsr, M::ZeroPage, 2, 5, "LSR"),     // 0x46
    jam(),                                    // 0x47
    op(C::Pha, M::Implied, 1, 3, "PHA"),      // 0x48
    op(C::Eor, M::Immediate, 2, 2, "EOR"),    // 0x49
    op(C::Lsr, M::Accumulator, 1, 2, "LSR"),  // 0x4A
    jam(),                                    // 0x4B
    op(C::Jmp, M::Absolute, 3, 3, "JMP"),     // 0x4C
    op(C::Eor, M::Absolute, 3, 4, "EOR"),     // 0x4D
    op(C::Lsr, M::Absolute, 3, 6, "LSR"),     // 0x4E
    jam(),                                    // 0x4F
    op(C::Bvc, M::Relative, 2, 2, "BVC"),     // 0x50
    op(C::Eor, M::IndirectY, 2, 5, "EOR"),    // 0x51
    jam(),                                    // 0x52
    jam(),                                    // 0x53
    op(C::Nop, M::ZeroPageX, 2, 4, "NOP"),    // 0x54
    op(C::Eor, M::ZeroPageX, 2, 4, "EOR"),    // 0x55
    op(C::Lsr, M::ZeroPageX, 2, 6, "LSR"),    // 0x56
    jam(),                                    // 0x57
    op(C::Cli, M::Implied, 1, 2, "CLI"),      // 0x58
    op(C::Eor, M::AbsoluteY, 3, 4, "EOR"),    // 0x59
    op(C::Nop, M::Implied, 1, 2, "NOP"),      // 0x5A
    jam(),                                    // 0x5B
    op(C::Nop, M::AbsoluteX, 3, 4, "NOP"),    // 0x5C
    op(C::Eor, M::AbsoluteX, 3, 4, "EOR"),    // 0x5D
    op(C::Lsr, M::AbsoluteX, 3, 7, "LSR"),    // 0x5E
    jam(),                                    // 0x5F
    op(C::Rts, M::Implied, 1, 6, "RTS"),      // 0x60
    op(C::Adc, M::IndirectX, 2, 6, "ADC"),    // 0x61
    jam(),                                    // 0x62
    jam(),                                    // 0x63
    op(C::Nop, M::ZeroPage, 2, 3, "NOP"),     // 0x64
    op(C::Adc, M::ZeroPage, 2, 3, "ADC"),     // 0x65
    op(C::Ror, M::ZeroPage, 2, 5, "ROR"),     // 0x66
    jam(),                                    // 0x67
    op(C::Pla, M::Implied, 1, 4, "PLA"),      // 0x68
    op(C::Adc, M::Immediate, 2, 2, "ADC"),    // 0x69
    op(C::Ror, M::Accumulator, 1, 2, "ROR"),  // 0x6A
    jam(),                                    // 0x6B
    op(C::Jmp, M::Indirect, 3, 5, "JMP"),     // 0x6C
    op(C::Adc, M::Absolute, 3, 4, "ADC"),     // 0x6D
    op(C::Ror, M::Absolute, 3, 6, "ROR"),     // 0x6E
    jam(),                                    // 0x6F
    op(C::Bvs, M::Relative, 2, 2, "BVS"),     // 0x70
    op(C::Adc, M::IndirectY, 2, 5, "ADC"),    // 0x71
    jam(),                                    // 0x72
    jam(),                                    // 0x73
    op(C::Nop, M::ZeroPageX, 2, 4, "NOP"),    // 0x74
    op(C::Adc, M::ZeroPageX, 2, 4, "ADC"),    // 0x75
    op(C::Ror, M::ZeroPageX, 2, 6, "ROR"),    // 0x76
    jam(),                                    // 0x77
    op(C::Sei, M::Implied, 1, 2, "SEI"),      // 0x78
    op(C::Adc, M::AbsoluteY, 3, 4, "ADC"),    // 0x79
    op(C::Nop, M::Implied, 1, 2, "NOP"),      // 0x7A
    jam(),                                    // 0x7B
    op(C::Nop, M::AbsoluteX, 3, 4, "NOP"),    // 0x7C
    op(C::Adc, M::AbsoluteX, 3, 4, "ADC"),    // 0x7D
    op(C::Ror, M::AbsoluteX, 3, 7, "ROR"),    // 0x7E
    jam(),                                    // 0x7F
    op(C::Nop, M::Immediate, 2, 2, "NOP"),    // 0x80
    op(C::Sta, M::IndirectX, 2, 6, "STA"),    // 0x81
    op(C::Nop, M::Immediate, 2, 2, "NOP"),    // 0x82
    jam(),                                    // 0x83
    op(C::Sty, M::ZeroPage, 2, 3, "STY"),     // 0x84
    op(C::Sta, M::ZeroPage, 2, 3, "STA"),     // 0x85
    op(C::Stx, M::ZeroPage, 2, 3, "STX"),     // 0x86
    jam(),                                    // 0x87
    op(C::Dey, M::Implied, 1, 2, "DEY"),      // 0x88
    op(C::Nop, M::Immediate, 2, 2, "NOP"),    // 0x89
    op(C::Txa, M::Implied, 1, 2, "TXA"),      // 0x8A
    jam(),                                    // 0x8B
    op(C::Sty, M::Absolute, 3, 4, "STY"),     // 0x8C
    op(C::Sta, M::Absolute, 3, 4, "STA"),     // 0x8D
    op(C::Stx, M::Absolute, 3, 4, "STX"),     // 0x8E
    jam(),                                    // 0x8F
    op(C::Bcc, M::Relative, 2, 2, "BCC"),     // 0x90
    op(C::Sta, M::IndirectY, 2, 6, "STA"),    // 0x91
    jam(),                                    // 0x92
    jam(),                                    // 0x93
    op(C::Sty, M::ZeroPageX, 2, 4, "STY"),    // 0x94
    op(C::Sta, M::ZeroPageX, 2, 4, "STA"),    // 0x95
    op(C::Stx, M::ZeroPageY, 2, 4, "STX"),    // 0x96
    jam(),                                    // 0x97
    op(C::Tya, M::Implied, 1, 2, "TYA"),      // 0x98
    op(C::Sta, M::AbsoluteY, 3, 5, "STA"),    // 0x99
    op(C::Txs, M::Implied, 1, 2, "TXS"),      // 0x9A
    jam(),                                    // 0x9B
    jam(),                                    // 0x9C
    op(C::Sta, M::AbsoluteX, 3, 5, "STA"),    // 0x9D
    jam(),                                    // 0x9E
    jam(),                                    // 0x9F
    op(C::Ldy, M::Immediate, 2, 2, "LDY"),    // 0xA0
    op(C::Lda, M::IndirectX, 2, 6, "LDA"),    // 0xA1
    op(C::Ldx, M::Immediate, 2, 2, "LDX"),    // 0xA2
    jam(),                                    // 0xA3
    op(C::Ldy, M::ZeroPage, 2, 3, "LDY"),     // 0xA4
    op(C::Lda, M::ZeroPage, 2, 3, "LDA"),     // 0xA5
    op(C::Ldx, M::ZeroPage, 2, 3, "LDX"),     // 0xA6
    jam(),                                    // 0xA7
    op(C::Tay, M::Implied, 1, 2, "TAY"),      // 0xA8
    op(C::Lda, M::Immediate, 2, 2, "LDA"),    // 0xA9
    op(C::Tax, M::Implied, 1, 2, "TAX"),      // 0xAA
    jam(),                                    // 0xAB
    op(C::Ldy, M::Absolute, 3, 4, "LDY"),     // 0xAC
    op(C::Lda, M::Absolute, 3, 4, "LDA"),     // 0xAD
    op(C::Ldx, M::Absolute, 3, 4, "LDX"),     // 0xAE
    jam(),                                    // 0xAF
    op(C::Bcs, M::Relative, 2, 2, "BCS"),     // 0xB0
    op(C::Lda, M::IndirectY, 2, 5, "LDA"),    // 0xB1
    jam(),                                    // 0xB2
    jam(),                                    // 0xB3
    op(C::Ldy, M::ZeroPageX, 2, 4, "LDY"),    // 0xB4
    op(C::Lda, M::ZeroPageX, 2, 4, "LDA"),    // 0xB5
    op(C::Ldx, M::ZeroPageY, 2, 4, "LDX"),    // 0xB6
    jam(),                                    // 0xB7
    op(C::Clv, M::Implied, 1, 2, "CLV"),      // 0xB8
    op(C::Lda, M::AbsoluteY, 3, 4, "LDA"),    // 0xB9
    op(C::Tsx, M::Implied, 1, 2, "TSX"),      // 0xBA
    jam(),                                    // 0xBB
    op(C::Ldy, M::AbsoluteX, 3, 4, "LDY"),    // 0xBC
    op(C::Lda, M::AbsoluteX, 3, 4, "LDA"),    // 0xBD
    op(C::Ldx, M::AbsoluteY, 3, 4, "LDX"),    // 0xBE
    jam(),                                    // 0xBF
    op(C::Cpy, M::Immediate, 2, 2, "CPY"),    // 0xC0
    op(C::Cmp, M::IndirectX, 2, 6, "CMP"),    // 0xC1
    op(C::Nop, M::Immediate, 2, 2, "NOP"),    // 0xC2
    jam(),                                    // 0xC3
    op(C::Cpy, M::ZeroPage, 2, 3, "CPY"),     // 0xC4
    op(C::Cmp, M::ZeroPage, 2, 3, "CMP"),     // 0xC5
    op(C::Dec, M::ZeroPage, 2, 5, "DEC"),     // 0xC6
    jam(),                                    // 0xC7
    op(C::Iny, M::Implied, 1, 2, "INY"),      // 0xC8
    op(C::Cmp, M::Immediate, 2, 2, "CMP"),    // 0xC9
    op(C::Dex, M::Implied, 1, 2, "DEX"),      // 0xCA
    jam(),                                    // 0xCB
    op(C::Cpy, M::Absolute, 3, 4, "CPY"),     // 0xCC
    op(C::Cmp, M::Absolute, 3, 4, "CMP"),     // 0xCD
    op(C::Dec, M::Absolute, 3, 6, "DEC"),     // 0xCE
    jam(),                                    // 0xCF
    op(C::Bne, M::Relative, 2, 2, "BNE"),     // 0xD0
    op(C::Cmp, M::IndirectY, 2, 5, "CMP"),    // 0xD1
    jam(),                                    // 0xD2
    jam(),                                    // 0xD3
    op(C::Nop, M::ZeroPageX, 2, 4, "NOP"),    // 0xD4
    op(C::Cmp, M::ZeroPageX, 2, 4, "CMP"),    // 0xD5
    op(C::Dec, M::ZeroPageX, 2, 6, "DEC"),    // 0xD6
    jam(),                                    // 0xD7
    op(C::Cld, M::Implied, 1, 2, "CLD"),      // 0xD8
    op(C::Cmp, M::AbsoluteY, 3, 4, "CMP"),    // 0xD9
    op(C::Nop, M::Implied, 1, 2, "NOP"),      // 0xDA
    jam(),                                    // 0xDB
    op(C::Nop, M::AbsoluteX, 3, 4, "NOP"),    // 0xDC
    op(C::Cmp, M::AbsoluteX, 3, 4, "CMP"),    // 0xDD
    op(C::Dec, M::AbsoluteX, 3, 7, "DEC"),    // 0xDE
    jam(),                                    // 0xDF
    op(C::Cpx, M::Immediate, 2, 2, "CPX"),    // 0xE0
    op(C::Sbc, M::IndirectX, 2, 6, "SBC"),    // 0xE1
    op(C::Nop, M::Immediate, 2, 2, "NOP"),    // 0xE2
    jam(),                                    // 0xE3
    op(C::Cpx, M::ZeroPage, 2, 3, "CPX"),     // 0xE4
    op(C::Sbc, M::ZeroPage, 2, 3, "SBC"),     // 0xE5
    op(C::Inc, M::ZeroPage, 2, 5, "INC"),     // 0xE6
    jam(),                                    // 0xE7
    op(C::Inx, M::Implied, 1, 2, "INX"),      // 0xE8
    op(C::Sbc, M::Immediate, 2, 2, "SBC"),    // 0xE9
    op(C::Nop, M::Implied, 1, 2, "NOP"),      // 0xEA
    jam(),                                    // 0xEB
    op(C::Cpx, M::Absolute, 3, 4, "CPX"),     // 0xEC
    op(C::Sbc, M::Absolute, 3, 4, "SBC"),     // 0xED
    op(C::Inc, M::Absolute, 3, 6, "INC"),     // 0xEE
    jam(),                                    // 0xEF
    op(C::Beq, M::Relative, 2, 2, "BEQ"),     // 0xF0
    op(C::Sbc, M::IndirectY, 2, 5, "SBC"),    // 0xF1
    jam(),                                    // 0xF2
    jam(),                                    // 0xF3
    op(C::Nop, M::ZeroPageX, 2, 4, "NOP"),    // 0xF4
    op(C::Sbc, M::ZeroPageX, 2, 4, "SBC"),    // 0xF5
    op(C::Inc, M::ZeroPageX, 2, 6, "INC"),    // 0xF6
    jam(),                                    // 0xF7
    op(C::Sed, M::Implied, 1, 2, "SED"),      // 0xF8
    op(C::Sbc, M::AbsoluteY, 3, 4, "SBC"),    // 0xF9
    op(C::Nop, M::Implied, 1, 2, "NOP"),      // 0xFA
    jam(),                                    // 0xFB
    op(C::Nop, M::AbsoluteX, 3, 4, "NOP"),    // 0xFC
    op(C::Sbc, M::AbsoluteX, 3, 4, "SBC"),    // 0xFD
    op(C::Inc, M::AbsoluteX, 3, 7, "INC"),    // 0xFE
    jam(),                                    // 0xFF
];
