use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, Display)]
pub enum Mode {
    Implied,
    Accumulator,
    Immediate,
    ZeroPage,
    ZeroPageX,
    ZeroPageY,
    Absolute,
    AbsoluteX,
    AbsoluteY,
    Indirect,
    IndirectX,
    IndirectY,
    ZpIndirect,
    AbsIndirectX,
    Relative,
}

impl Mode {
    /// Operand bytes following the opcode byte.
    pub fn operand_size(&self) -> u8 {
        use Mode::*;
        match self {
            Implied | Accumulator => 0,
            Immediate | ZeroPage | ZeroPageX | ZeroPageY | IndirectX | IndirectY | ZpIndirect
            | Relative => 1,
            Absolute | AbsoluteX | AbsoluteY | Indirect | AbsIndirectX => 2,
        }
    }

    /// The zero page counterpart of an absolute mode.
    pub fn zero_page(&self) -> Option<Mode> {
        match self {
            Mode::Absolute => Some(Mode::ZeroPage),
            Mode::AbsoluteX => Some(Mode::ZeroPageX),
            Mode::AbsoluteY => Some(Mode::ZeroPageY),
            Mode::Indirect => Some(Mode::ZpIndirect),
            _ => None,
        }
    }

    pub fn is_zero_page(&self) -> bool {
        matches!(
            self,
            Mode::ZeroPage
                | Mode::ZeroPageX
                | Mode::ZeroPageY
                | Mode::IndirectX
                | Mode::IndirectY
                | Mode::ZpIndirect
        )
    }
}
