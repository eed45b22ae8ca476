use crate::message::Note;
use crate::symbol::{SymbolId, SymbolTable, SymbolType};
use crate::token::Token;

/// Operator semantics shared by every dialect table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    // unary
    Neg,
    Pos,
    BitNot,
    LogNot,
    Low,
    High,
    Bank,
    Group,
    // binary
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    And,
    Or,
    Xor,
    Shl,
    Shr,
    Lsr,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    LogAnd,
    LogOr,
    LogXor,
    // function-only
    Defined,
    Strlen,
}

impl OpKind {
    pub fn unary(self, v: i64) -> Option<i64> {
        Some(match self {
            OpKind::Neg => v.wrapping_neg(),
            OpKind::Pos | OpKind::Group => v,
            OpKind::BitNot => !v,
            OpKind::LogNot => (v == 0) as i64,
            OpKind::Low => v & 0xFF,
            OpKind::High => (v >> 8) & 0xFF,
            OpKind::Bank => (v >> 16) & 0xFF,
            _ => return None,
        })
    }

    pub fn binary(self, l: i64, r: i64) -> Option<i64> {
        let shift = |r: i64| r.clamp(0, 63) as u32;
        Some(match self {
            OpKind::Add => l.wrapping_add(r),
            OpKind::Sub => l.wrapping_sub(r),
            OpKind::Mul => l.wrapping_mul(r),
            OpKind::Div => l.checked_div(r)?,
            OpKind::Mod => l.checked_rem(r)?,
            OpKind::Pow => l.checked_pow(u32::try_from(r).ok()?)?,
            OpKind::And => l & r,
            OpKind::Or => l | r,
            OpKind::Xor => l ^ r,
            OpKind::Shl => l.wrapping_shl(shift(r)),
            OpKind::Shr => l.wrapping_shr(shift(r)),
            OpKind::Lsr => ((l as u64) >> shift(r)) as i64,
            OpKind::Eq => (l == r) as i64,
            OpKind::Ne => (l != r) as i64,
            OpKind::Lt => (l < r) as i64,
            OpKind::Gt => (l > r) as i64,
            OpKind::Le => (l <= r) as i64,
            OpKind::Ge => (l >= r) as i64,
            OpKind::LogAnd => (l != 0 && r != 0) as i64,
            OpKind::LogOr => (l != 0 || r != 0) as i64,
            OpKind::LogXor => ((l != 0) != (r != 0)) as i64,
            _ => return None,
        })
    }

    /// Byte-selecting operators always produce a single byte.
    pub fn is_byte_select(self) -> bool {
        matches!(self, OpKind::Low | OpKind::High | OpKind::Bank)
    }
}

/// Reference to, or definition of, a symbol inside an expression or label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolExpr {
    pub token: Token,
    pub ty: SymbolType,
    pub is_def: bool,
    /// Marker run length for anonymous locals, digit for LISA locals.
    pub run: usize,
    /// `+`/`>` references look forward.
    pub forward: bool,
    /// Names to try in order, innermost scope first.
    pub candidates: Vec<String>,
    pub full_name: Option<String>,
    pub symbol: Option<SymbolId>,
    /// Value captured when the reference was bound immediately.
    pub value: Option<i64>,
    /// Set for the operand of `.ifdef`-style tests and `.defined`.
    pub defined_test: bool,
}

impl SymbolExpr {
    pub fn new(token: Token, ty: SymbolType, is_def: bool) -> Self {
        SymbolExpr {
            token,
            ty,
            is_def,
            run: 0,
            forward: false,
            candidates: Vec::new(),
            full_name: None,
            symbol: None,
            value: None,
            defined_test: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.token.text
    }

    pub fn is_bound(&self) -> bool {
        self.symbol.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExprKind {
    Number {
        prefix: Option<Token>,
        digits: Token,
        value: i64,
        size: u8,
    },
    Unary {
        op: Token,
        kind: OpKind,
        arg: Box<Expression>,
    },
    Binary {
        op: Token,
        kind: OpKind,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Pc(Token),
    Paren {
        open: Token,
        inner: Box<Expression>,
        close: Token,
    },
    Array {
        open: Token,
        items: Vec<Expression>,
        separators: Vec<Token>,
        close: Option<Token>,
    },
    String {
        open: Token,
        parts: Vec<Token>,
        close: Option<Token>,
        bytes: Vec<u8>,
    },
    Function {
        name: Token,
        kind: OpKind,
        open: Token,
        args: Vec<Expression>,
        separators: Vec<Token>,
        close: Option<Token>,
    },
    Align(Token),
    Var(Token),
    Symbol(SymbolExpr),
    Bad(Vec<Token>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expression {
    pub kind: ExprKind,
    pub note: Note,
}

/// Deepest equate chain followed before giving up (guards `A = B`, `B = A`).
const MAX_DEPTH: usize = 64;

impl Expression {
    pub fn new(kind: ExprKind) -> Self {
        Expression {
            kind,
            note: Note::default(),
        }
    }

    /// Error sentinel absorbing `tokens`.
    pub fn bad(tokens: Vec<Token>, message: &str) -> Self {
        let mut expr = Expression::new(ExprKind::Bad(tokens));
        expr.note.error(message);
        expr
    }

    pub fn is_bad(&self) -> bool {
        matches!(self.kind, ExprKind::Bad(_))
    }

    pub fn as_symbol(&self) -> Option<&SymbolExpr> {
        match &self.kind {
            ExprKind::Symbol(sym) => Some(sym),
            _ => None,
        }
    }

    pub fn resolve(&self, table: &SymbolTable) -> Option<i64> {
        self.resolve_depth(table, 0)
    }

    pub(crate) fn resolve_depth(&self, table: &SymbolTable, depth: usize) -> Option<i64> {
        if depth > MAX_DEPTH {
            return None;
        }
        match &self.kind {
            ExprKind::Number { value, .. } => Some(*value),
            ExprKind::Unary { kind, arg, .. } => kind.unary(arg.resolve_depth(table, depth)?),
            ExprKind::Binary {
                kind, left, right, ..
            } => kind.binary(
                left.resolve_depth(table, depth)?,
                right.resolve_depth(table, depth)?,
            ),
            ExprKind::Paren { inner, .. } => inner.resolve_depth(table, depth),
            ExprKind::String { bytes, .. } => match bytes.as_slice() {
                [byte] => Some(*byte as i64),
                _ => None,
            },
            ExprKind::Function { kind, args, .. } => match (kind, args.as_slice()) {
                (OpKind::Defined, [arg]) => {
                    let sym = arg.as_symbol()?;
                    Some(sym.is_bound() as i64)
                }
                (OpKind::Strlen, [arg]) => match &arg.kind {
                    ExprKind::String { bytes, .. } => Some(bytes.len() as i64),
                    _ => None,
                },
                (kind, [arg]) => kind.unary(arg.resolve_depth(table, depth)?),
                _ => None,
            },
            ExprKind::Symbol(sym) => {
                if sym.ty == SymbolType::Variable || sym.value.is_some() {
                    return sym.value;
                }
                table.resolve_depth(sym.symbol?, depth + 1)
            }
            ExprKind::Pc(_)
            | ExprKind::Array { .. }
            | ExprKind::Align(_)
            | ExprKind::Var(_)
            | ExprKind::Bad(_) => None,
        }
    }

    /// Operand size in bytes, when it can be known.
    pub fn size(&self, table: &SymbolTable) -> Option<u8> {
        self.size_depth(table, 0)
    }

    pub(crate) fn size_depth(&self, table: &SymbolTable, depth: usize) -> Option<u8> {
        if depth > MAX_DEPTH {
            return None;
        }
        match &self.kind {
            ExprKind::Number { size, .. } => Some(*size),
            ExprKind::Unary { kind, arg, .. } => {
                if kind.is_byte_select() {
                    Some(1)
                } else {
                    arg.size_depth(table, depth)
                }
            }
            ExprKind::Binary { left, right, .. } => {
                let l = left.size_depth(table, depth)?;
                let r = right.size_depth(table, depth)?;
                Some(l.max(r))
            }
            ExprKind::Paren { inner, .. } => inner.size_depth(table, depth),
            ExprKind::Pc(_) => Some(2),
            ExprKind::String { bytes, .. } => (bytes.len() == 1).then_some(1),
            ExprKind::Function { kind, args, .. } => match kind {
                OpKind::Defined | OpKind::Strlen => Some(1),
                kind if kind.is_byte_select() => Some(1),
                _ => args.first()?.size_depth(table, depth),
            },
            ExprKind::Symbol(sym) => {
                if let Some(value) = sym.value {
                    return Some(size_of_value(value, false));
                }
                table.size_depth(sym.symbol?, depth + 1)
            }
            ExprKind::Array { .. } | ExprKind::Align(_) | ExprKind::Var(_) | ExprKind::Bad(_) => {
                None
            }
        }
    }

    /// Every token in source order.
    pub fn tokens(&self) -> Vec<&Token> {
        let mut out = Vec::new();
        self.collect_tokens(&mut out);
        out.sort_by_key(|t| t.start);
        out
    }

    fn collect_tokens<'a>(&'a self, out: &mut Vec<&'a Token>) {
        match &self.kind {
            ExprKind::Number { prefix, digits, .. } => {
                out.extend(prefix.iter());
                out.push(digits);
            }
            ExprKind::Unary { op, arg, .. } => {
                out.push(op);
                arg.collect_tokens(out);
            }
            ExprKind::Binary {
                op, left, right, ..
            } => {
                left.collect_tokens(out);
                out.push(op);
                right.collect_tokens(out);
            }
            ExprKind::Pc(token) | ExprKind::Align(token) | ExprKind::Var(token) => out.push(token),
            ExprKind::Paren { open, inner, close } => {
                out.push(open);
                inner.collect_tokens(out);
                out.push(close);
            }
            ExprKind::Array {
                open,
                items,
                separators,
                close,
            } => {
                out.push(open);
                items.iter().for_each(|item| item.collect_tokens(out));
                out.extend(separators.iter());
                out.extend(close.iter());
            }
            ExprKind::String {
                open, parts, close, ..
            } => {
                out.push(open);
                out.extend(parts.iter());
                out.extend(close.iter());
            }
            ExprKind::Function {
                name,
                open,
                args,
                separators,
                close,
                ..
            } => {
                out.push(name);
                out.push(open);
                args.iter().for_each(|arg| arg.collect_tokens(out));
                out.extend(separators.iter());
                out.extend(close.iter());
            }
            ExprKind::Symbol(sym) => out.push(&sym.token),
            ExprKind::Bad(tokens) => out.extend(tokens.iter()),
        }
    }

    /// Byte span covered by this expression.
    pub fn span(&self) -> Option<(usize, usize)> {
        let tokens = self.tokens();
        let start = tokens.iter().map(|t| t.start).min()?;
        let end = tokens.iter().map(|t| t.end).max()?;
        Some((start, end))
    }

    /// All notes set on this expression, its sub-expressions and tokens.
    pub fn notes(&self) -> Vec<(usize, usize, &Note)> {
        let mut out: Vec<_> = self
            .tokens()
            .into_iter()
            .filter(|t| t.note.is_set())
            .map(|t| (t.start, t.end, &t.note))
            .collect();
        self.collect_expr_notes(&mut out);
        out
    }

    fn collect_expr_notes<'a>(&'a self, out: &mut Vec<(usize, usize, &'a Note)>) {
        if self.note.is_set() {
            if let Some((start, end)) = self.span() {
                out.push((start, end, &self.note));
            }
        }
        self.children().for_each(|child| child.collect_expr_notes(out));
    }

    fn children(&self) -> Box<dyn Iterator<Item = &Expression> + '_> {
        match &self.kind {
            ExprKind::Unary { arg, .. } => Box::new(std::iter::once(arg.as_ref())),
            ExprKind::Binary { left, right, .. } => {
                Box::new([left.as_ref(), right.as_ref()].into_iter())
            }
            ExprKind::Paren { inner, .. } => Box::new(std::iter::once(inner.as_ref())),
            ExprKind::Array { items, .. } => Box::new(items.iter()),
            ExprKind::Function { args, .. } => Box::new(args.iter()),
            _ => Box::new(std::iter::empty()),
        }
    }

    pub fn for_each_symbol<'a>(&'a self, f: &mut impl FnMut(&'a SymbolExpr)) {
        if let ExprKind::Symbol(sym) = &self.kind {
            f(sym);
        }
        self.children().for_each(|child| child.for_each_symbol(f));
    }

    pub fn for_each_symbol_mut(&mut self, f: &mut impl FnMut(&mut SymbolExpr)) {
        match &mut self.kind {
            ExprKind::Symbol(sym) => f(sym),
            ExprKind::Unary { arg, .. } => arg.for_each_symbol_mut(f),
            ExprKind::Binary { left, right, .. } => {
                left.for_each_symbol_mut(f);
                right.for_each_symbol_mut(f);
            }
            ExprKind::Paren { inner, .. } => inner.for_each_symbol_mut(f),
            ExprKind::Array { items, .. } => items.iter_mut().for_each(|i| i.for_each_symbol_mut(f)),
            ExprKind::Function { args, .. } => {
                args.iter_mut().for_each(|a| a.for_each_symbol_mut(f))
            }
            _ => {}
        }
    }
}

/// Bytes needed to hold `value`: one byte covers [-128, 255].
pub fn size_of_value(value: i64, wide_literal: bool) -> u8 {
    if wide_literal || !(-128..=255).contains(&value) {
        if (-0x8000..=0xFFFF).contains(&value) {
            2
        } else if (-0x80_0000..=0xFF_FFFF).contains(&value) {
            3
        } else {
            4
        }
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operators_follow_c() {
        assert_eq!(OpKind::Div.binary(7, 0), None);
        assert_eq!(OpKind::Mod.binary(7, 3), Some(1));
        assert_eq!(OpKind::Lt.binary(1, 2), Some(1));
        assert_eq!(OpKind::Pow.binary(2, 10), Some(1024));
        assert_eq!(OpKind::High.unary(0x1234), Some(0x12));
        assert_eq!(OpKind::Bank.unary(0x123456), Some(0x12));
        assert_eq!(OpKind::LogNot.unary(5), Some(0));
    }

    #[test]
    fn literal_sizes() {
        assert_eq!(size_of_value(255, false), 1);
        assert_eq!(size_of_value(-128, false), 1);
        assert_eq!(size_of_value(256, false), 2);
        assert_eq!(size_of_value(0x10, true), 2);
        assert_eq!(size_of_value(0x10000, false), 3);
    }
}
