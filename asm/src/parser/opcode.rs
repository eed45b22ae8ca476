use arch::{Mode, Op};

use super::Parser;
use crate::expr::SymbolExpr;
use crate::statement::{OpcodeStmt, OperandForm, Statement, StmtKind};
use crate::syntax::OpcodeSuffix;
use crate::token::{Token, TokenType};

impl<'a> Parser<'a> {
    /// Mnemonic named by `token`, with any width the spelling forces and
    /// whether the suffix was valid.
    pub(crate) fn opcode_of(&self, token: &Token) -> Option<(Op, Option<u8>, bool)> {
        let text = token.text.as_str();
        if let Ok(op) = Op::parse(text) {
            return Some((op, None, true));
        }
        match self.def.opcode_suffix {
            // Known macros win over the width suffix: `INCW` may be a macro.
            OpcodeSuffix::Letter
                if text.len() == 4 && self.def.keyword(text).is_none() && !self.is_macro(text) =>
            {
                let op = Op::parse(&text[..3]).ok()?;
                let width = match text.as_bytes()[3].to_ascii_uppercase() {
                    b'L' => 3,
                    _ => 2,
                };
                Some((op, Some(width), true))
            }
            OpcodeSuffix::Dot => {
                let (head, suffix) = text.split_once('.')?;
                let op = Op::parse(head).ok()?;
                match suffix.to_ascii_lowercase().as_str() {
                    "b" | "z" => Some((op, Some(1), true)),
                    "w" | "a" => Some((op, Some(2), true)),
                    _ => Some((op, None, false)),
                }
            }
            _ => None,
        }
    }

    pub(crate) fn opcode(
        &mut self,
        label: Option<SymbolExpr>,
        mut keyword: Token,
        op: Op,
        mut width: Option<u8>,
        suffix_ok: bool,
    ) -> Statement {
        keyword.set_type(TokenType::Opcode);
        if !suffix_ok {
            keyword.set_error("Invalid opcode suffix");
        }

        // Suffixes written as separate tokens: Merlin `LDA:`, ACME `lda+2`.
        match self.def.opcode_suffix {
            OpcodeSuffix::Letter => {
                if let Some(colon) = self.tk.peek_very_next().filter(|t| t.is(":")) {
                    self.tk.very_next_token();
                    keyword.merge(&colon);
                    width = Some(2);
                }
            }
            OpcodeSuffix::Plus => {
                let mut ahead = self.tk.clone();
                let plus = ahead.very_next_token().filter(|t| t.is("+"));
                let digit = plus.as_ref().and_then(|_| ahead.very_next_token());
                if let (Some(plus), Some(digit)) = (plus, digit) {
                    self.tk = ahead;
                    keyword.merge(&plus);
                    keyword.merge(&digit);
                    match digit.text.as_str() {
                        "1" => width = Some(1),
                        "2" => width = Some(2),
                        _ => keyword.set_error("Invalid opcode suffix"),
                    }
                }
            }
            _ => {}
        }

        // CA65 `z:`, `a:`, `f:` operand prefixes.
        if self.def.width_prefix {
            let mut ahead = self.tk.clone();
            if let Some(prefix) = ahead.next_token().filter(|t| t.len() == 1 && t.is_word()) {
                if let Some(colon) = ahead.very_next_token().filter(|t| t.is(":")) {
                    let forced = match prefix.text.to_ascii_lowercase().as_str() {
                        "z" => Some(1),
                        "a" => Some(2),
                        "f" => Some(3),
                        _ => None,
                    };
                    if forced.is_some() {
                        self.tk = ahead;
                        let mut prefix = prefix;
                        prefix.set_type(TokenType::Keyword);
                        self.extras.push(prefix);
                        self.extras.push(colon);
                        width = forced;
                    }
                }
            }
        }

        let (form, operand) = self.operand(op);
        if let Some(problem) = check_form(op, form) {
            keyword.set_error(problem);
        }
        let mut stmt = Statement::new(
            StmtKind::Opcode(OpcodeStmt {
                op,
                form,
                operand,
                width,
                mode: None,
            }),
            self.def.syntax,
        );
        stmt.label = label;
        stmt.keyword = Some(keyword);
        stmt
    }

    fn operand(&mut self, op: Op) -> (OperandForm, Option<crate::expr::Expression>) {
        let Some(first) = self.tk.peek_token() else {
            let form = if op.has_mode(Mode::Implied) || !op.has_mode(Mode::Accumulator) {
                OperandForm::Implied
            } else {
                OperandForm::Accumulator
            };
            return (form, None);
        };

        // `ASL A`
        if first.text.eq_ignore_ascii_case("a") && op.has_mode(Mode::Accumulator) {
            let mut ahead = self.tk.clone();
            ahead.next_token();
            if ahead.at_end() {
                let mut reg = self.tk.next_token().unwrap_or(first);
                reg.set_type(TokenType::Keyword);
                self.extras.push(reg);
                return (OperandForm::Accumulator, None);
            }
        }

        // `#expr`
        if first.is("#") {
            if let Some(hash) = self.tk.next_token() {
                self.extras.push(hash);
            }
            let expr = self.expect_expression("Missing operand");
            return (OperandForm::Immediate, expr);
        }

        // `(expr)`, `(expr,X)`, `(expr),Y`
        if first.is("(") && has_indirect(op) {
            let save = self.tk.clone();
            let saved_extras = self.extras.len();
            if let Some(open) = self.tk.next_token() {
                self.extras.push(open);
            }
            let expr = self.parse_expression();
            if let Some(form) = self.indirect_tail() {
                return (form, expr);
            }
            // Not indirect after all: `(1+2)*3`.
            self.tk = save;
            self.extras.truncate(saved_extras);
        }

        let expr = self.expect_expression("Missing operand");
        let form = match self.index_register() {
            Some('X') => OperandForm::DirectX,
            Some('Y') => OperandForm::DirectY,
            _ => OperandForm::Direct,
        };
        (form, expr)
    }

    /// After `(expr`: `,X)`, `),Y` or `)` at the end of the operand.
    fn indirect_tail(&mut self) -> Option<OperandForm> {
        let mut ahead = self.tk.clone();
        let mut taken = Vec::new();
        let next = ahead.next_token()?;
        let form = if next.is(",") {
            taken.push(next);
            let mut reg = ahead.next_token().filter(|t| t.text.eq_ignore_ascii_case("x"))?;
            reg.set_type(TokenType::Keyword);
            taken.push(reg);
            taken.push(ahead.next_token().filter(|t| t.is(")"))?);
            OperandForm::IndirectX
        } else if next.is(")") {
            taken.push(next);
            match ahead.peek_token() {
                Some(t) if t.is(",") => {
                    taken.push(ahead.next_token()?);
                    let mut reg =
                        ahead.next_token().filter(|t| t.text.eq_ignore_ascii_case("y"))?;
                    reg.set_type(TokenType::Keyword);
                    taken.push(reg);
                    OperandForm::IndirectY
                }
                Some(t) if !t.is("{") => return None,
                _ => OperandForm::Indirect,
            }
        } else {
            return None;
        };
        self.tk = ahead;
        self.extras.extend(taken);
        Some(form)
    }

    /// Trailing `,X` or `,Y`.
    fn index_register(&mut self) -> Option<char> {
        let mut ahead = self.tk.clone();
        let comma = ahead.next_token().filter(|t| t.is(","))?;
        let mut reg = ahead.next_token()?;
        let index = match reg.text.to_ascii_uppercase().as_str() {
            "X" => 'X',
            "Y" => 'Y',
            _ => return None,
        };
        reg.set_type(TokenType::Keyword);
        self.tk = ahead;
        self.extras.push(comma);
        self.extras.push(reg);
        Some(index)
    }
}

fn has_indirect(op: Op) -> bool {
    [
        Mode::Indirect,
        Mode::IndirectX,
        Mode::IndirectY,
        Mode::ZpIndirect,
        Mode::AbsIndirectX,
    ]
    .iter()
    .any(|&m| op.has_mode(m))
}

/// Operand shapes the mnemonic can never take.
fn check_form(op: Op, form: OperandForm) -> Option<&'static str> {
    let any = |modes: &[Mode]| modes.iter().any(|&m| op.has_mode(m));
    let ok = match form {
        OperandForm::Implied => any(&[Mode::Implied, Mode::Accumulator]),
        OperandForm::Accumulator => any(&[Mode::Accumulator]),
        OperandForm::Immediate => any(&[Mode::Immediate]),
        OperandForm::Direct => any(&[Mode::ZeroPage, Mode::Absolute, Mode::Relative]),
        OperandForm::DirectX => any(&[Mode::ZeroPageX, Mode::AbsoluteX]),
        OperandForm::DirectY => any(&[Mode::ZeroPageY, Mode::AbsoluteY]),
        OperandForm::Indirect => any(&[Mode::Indirect, Mode::ZpIndirect]),
        OperandForm::IndirectX => any(&[Mode::IndirectX, Mode::AbsIndirectX]),
        OperandForm::IndirectY => any(&[Mode::IndirectY]),
    };
    match (ok, form) {
        (true, _) => None,
        (false, OperandForm::Implied) => Some("Missing operand"),
        (false, _) => Some("Invalid addressing mode"),
    }
}

/// Pick the addressing mode for an operand form, given a forced width or the
/// operand's inferred size. Unknown sizes assume a full address.
pub fn infer_mode(op: Op, form: OperandForm, width: Option<u8>, size: Option<u8>) -> Option<Mode> {
    let pick = |zp: Mode, abs: Mode| -> Option<Mode> {
        let small = width.or(size) == Some(1);
        match (small && op.has_mode(zp), op.has_mode(abs), op.has_mode(zp)) {
            (true, _, _) => Some(zp),
            (false, true, _) => Some(abs),
            (false, false, true) => Some(zp),
            _ => None,
        }
    };
    let mode = match form {
        OperandForm::Implied if op.has_mode(Mode::Implied) => Mode::Implied,
        OperandForm::Implied | OperandForm::Accumulator => Mode::Accumulator,
        OperandForm::Immediate => Mode::Immediate,
        OperandForm::Direct if op.is_branch() => Mode::Relative,
        OperandForm::Direct => return pick(Mode::ZeroPage, Mode::Absolute),
        OperandForm::DirectX => return pick(Mode::ZeroPageX, Mode::AbsoluteX),
        OperandForm::DirectY => return pick(Mode::ZeroPageY, Mode::AbsoluteY),
        OperandForm::Indirect => return pick(Mode::ZpIndirect, Mode::Indirect),
        OperandForm::IndirectX => return pick(Mode::IndirectX, Mode::AbsIndirectX),
        OperandForm::IndirectY => Mode::IndirectY,
    };
    op.has_mode(mode).then_some(mode)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modes_follow_size() {
        use OperandForm::*;
        assert_eq!(infer_mode(Op::LDA, Direct, None, Some(1)), Some(Mode::ZeroPage));
        assert_eq!(infer_mode(Op::LDA, Direct, None, None), Some(Mode::Absolute));
        assert_eq!(infer_mode(Op::LDA, Direct, Some(2), Some(1)), Some(Mode::Absolute));
        assert_eq!(infer_mode(Op::LDX, DirectY, None, Some(1)), Some(Mode::ZeroPageY));
        assert_eq!(infer_mode(Op::STA, DirectY, None, Some(1)), Some(Mode::AbsoluteY));
        assert_eq!(infer_mode(Op::BNE, Direct, None, None), Some(Mode::Relative));
        assert_eq!(infer_mode(Op::JMP, Indirect, None, None), Some(Mode::Indirect));
        assert_eq!(infer_mode(Op::LDA, Indirect, None, Some(1)), Some(Mode::ZpIndirect));
        assert_eq!(infer_mode(Op::JMP, IndirectX, None, None), Some(Mode::AbsIndirectX));
        assert_eq!(infer_mode(Op::LDA, IndirectX, None, None), Some(Mode::IndirectX));
        assert_eq!(infer_mode(Op::ASL, Implied, None, None), Some(Mode::Accumulator));
        assert_eq!(infer_mode(Op::LDA, Immediate, None, None), Some(Mode::Immediate));
    }
}
