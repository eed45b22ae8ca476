use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::mode::Mode;
use crate::opcode::{OPCODES, TABLE};

/// 6502 and 65C02 mnemonics.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, EnumIter, Display,
)]
#[strum(ascii_case_insensitive)]
pub enum Op {
    ADC,
    AND,
    ASL,
    BCC,
    BCS,
    BEQ,
    BIT,
    BMI,
    BNE,
    BPL,
    BRA,
    BRK,
    BVC,
    BVS,
    CLC,
    CLD,
    CLI,
    CLV,
    CMP,
    CPX,
    CPY,
    DEC,
    DEX,
    DEY,
    EOR,
    INC,
    INX,
    INY,
    JMP,
    JSR,
    LDA,
    LDX,
    LDY,
    LSR,
    NOP,
    ORA,
    PHA,
    PHP,
    PHX,
    PHY,
    PLA,
    PLP,
    PLX,
    PLY,
    ROL,
    ROR,
    RTI,
    RTS,
    SBC,
    SEC,
    SED,
    SEI,
    STA,
    STX,
    STY,
    STZ,
    TAX,
    TAY,
    TRB,
    TSB,
    TSX,
    TXA,
    TXS,
    TYA,
}

impl Op {
    pub fn parse(s: &str) -> Result<Self, String> {
        match s.parse::<Self>() {
            Ok(op) => Ok(op),
            Err(_) => Err(format!("Undefined Op: {s}")),
        }
    }

    /// Addressing modes the opcode table holds for this mnemonic, in table order.
    pub fn modes(&self) -> Vec<Mode> {
        TABLE
            .iter()
            .filter(|(op, _, _)| op == self)
            .map(|(_, mode, _)| *mode)
            .collect()
    }

    pub fn has_mode(&self, mode: Mode) -> bool {
        OPCODES.contains_left(&(*self, mode))
    }

    pub fn opcode(&self, mode: Mode) -> Option<u8> {
        OPCODES.get_by_left(&(*self, mode)).copied()
    }

    pub fn is_branch(&self) -> bool {
        self.has_mode(Mode::Relative)
    }

    pub fn is_jump(&self) -> bool {
        matches!(self, Op::JMP | Op::JSR) || self.is_branch()
    }
}

#[test]
fn test() {
    assert_eq!(Op::parse("lda"), Ok(Op::LDA));
    assert!(Op::parse("hoge").is_err());
    assert!(Op::BNE.is_branch());
    assert!(!Op::JMP.is_branch());
    assert!(Op::LDX.has_mode(Mode::ZeroPageY));
    assert!(!Op::LDA.has_mode(Mode::ZeroPageY));
    assert_eq!(Op::JSR.modes(), vec![Mode::Absolute]);
}
