use arch::{Mode, Op, Syntax};

use crate::expr::{Expression, SymbolExpr};
use crate::message::Note;
use crate::syntax::Test;
use crate::token::Token;

/// Operand shape as written, before the addressing mode is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandForm {
    Implied,
    Accumulator,
    Immediate,
    Direct,
    DirectX,
    DirectY,
    Indirect,
    IndirectX,
    IndirectY,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpcodeStmt {
    pub op: Op,
    pub form: OperandForm,
    pub operand: Option<Expression>,
    /// Operand width forced by a suffix or prefix (`LDA:`, `lda.w`, `a:`).
    pub width: Option<u8>,
    pub mode: Option<Mode>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CondKind {
    If(Test),
    Elif(Test),
    Else,
    Endif,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Scope,
    Proc,
    Struct,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StmtKind {
    /// Blank or comment-only line.
    Empty,
    /// Line inside a conditional branch that is not assembled.
    Disabled,
    Label,
    Opcode(OpcodeStmt),
    Equate {
        value: Expression,
        zpage: bool,
    },
    Variable {
        value: Expression,
    },
    Org {
        value: Option<Expression>,
    },
    Data {
        width: u8,
        big_endian: bool,
        values: Vec<Expression>,
    },
    Hex {
        digits: Vec<Token>,
    },
    Text {
        values: Vec<Expression>,
    },
    Storage {
        args: Vec<Expression>,
    },
    Align {
        args: Vec<Expression>,
    },
    Include {
        file: Token,
        binary: bool,
    },
    Conditional {
        kind: CondKind,
        expr: Option<Expression>,
    },
    Repeat {
        var: Option<SymbolExpr>,
        args: Vec<Expression>,
    },
    EndRepeat,
    MacroDef {
        name: Option<Token>,
        params: Vec<SymbolExpr>,
    },
    EndMacro,
    MacroInvoke {
        name: Token,
        args: Vec<String>,
    },
    Scope {
        kind: ScopeKind,
        name: Option<SymbolExpr>,
    },
    EndScope(ScopeKind),
    Zone {
        name: Option<Token>,
    },
    Entry {
        names: Vec<Expression>,
    },
    Import {
        names: Vec<SymbolExpr>,
    },
    BlockClose {
        else_branch: bool,
    },
    Generic {
        args: Vec<Expression>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub kind: StmtKind,
    pub syntax: Syntax,
    pub label: Option<SymbolExpr>,
    /// Opcode, keyword or macro-name token.
    pub keyword: Option<Token>,
    /// Punctuation and raw spans that belong to no expression.
    pub extras: Vec<Token>,
    pub comment: Option<Token>,
    /// ACME: the line ends with `{`.
    pub opens_block: bool,
    /// CA65: the line ends with `\` and continues on the next one.
    pub continues: bool,
}

impl Statement {
    pub fn new(kind: StmtKind, syntax: Syntax) -> Self {
        Statement {
            kind,
            syntax,
            label: None,
            keyword: None,
            extras: Vec::new(),
            comment: None,
            opens_block: false,
            continues: false,
        }
    }

    pub fn empty(syntax: Syntax) -> Self {
        Statement::new(StmtKind::Empty, syntax)
    }

    /// Placeholder for a line in a disabled branch: only its comment is kept.
    pub fn disabled(&self) -> Self {
        let mut stmt = Statement::new(StmtKind::Disabled, self.syntax);
        stmt.comment = self.comment.clone();
        stmt
    }

    pub fn is_conditional(&self) -> bool {
        matches!(self.kind, StmtKind::Conditional { .. })
    }

    pub fn cond_kind(&self) -> Option<CondKind> {
        match &self.kind {
            StmtKind::Conditional { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    pub fn expressions(&self) -> Vec<&Expression> {
        match &self.kind {
            StmtKind::Opcode(op) => op.operand.iter().collect(),
            StmtKind::Equate { value, .. } | StmtKind::Variable { value } => vec![value],
            StmtKind::Org { value } => value.iter().collect(),
            StmtKind::Conditional { expr, .. } => expr.iter().collect(),
            StmtKind::Data { values, .. } | StmtKind::Text { values } => values.iter().collect(),
            StmtKind::Storage { args }
            | StmtKind::Align { args }
            | StmtKind::Repeat { args, .. }
            | StmtKind::Generic { args } => args.iter().collect(),
            StmtKind::Entry { names } => names.iter().collect(),
            _ => Vec::new(),
        }
    }

    pub fn expressions_mut(&mut self) -> Vec<&mut Expression> {
        match &mut self.kind {
            StmtKind::Opcode(op) => op.operand.iter_mut().collect(),
            StmtKind::Equate { value, .. } | StmtKind::Variable { value } => vec![value],
            StmtKind::Org { value } => value.iter_mut().collect(),
            StmtKind::Conditional { expr, .. } => expr.iter_mut().collect(),
            StmtKind::Data { values, .. } | StmtKind::Text { values } => {
                values.iter_mut().collect()
            }
            StmtKind::Storage { args }
            | StmtKind::Align { args }
            | StmtKind::Repeat { args, .. }
            | StmtKind::Generic { args } => args.iter_mut().collect(),
            StmtKind::Entry { names } => names.iter_mut().collect(),
            _ => Vec::new(),
        }
    }

    /// Symbol nodes that are not part of an expression.
    fn bare_symbols(&self) -> Vec<&SymbolExpr> {
        let mut out: Vec<&SymbolExpr> = self.label.iter().collect();
        match &self.kind {
            StmtKind::Repeat { var, .. } => out.extend(var.iter()),
            StmtKind::MacroDef { params, .. } => out.extend(params.iter()),
            StmtKind::Scope { name, .. } => out.extend(name.iter()),
            StmtKind::Import { names } => out.extend(names.iter()),
            _ => {}
        }
        out
    }

    /// Every symbol node, label first, then in expression order.
    pub fn for_each_symbol_mut(&mut self, f: &mut impl FnMut(&mut SymbolExpr)) {
        if let Some(label) = &mut self.label {
            f(label);
        }
        match &mut self.kind {
            StmtKind::Repeat { var: Some(var), .. } => f(var),
            StmtKind::MacroDef { params, .. } => params.iter_mut().for_each(&mut *f),
            StmtKind::Scope { name: Some(name), .. } => f(name),
            StmtKind::Import { names } => names.iter_mut().for_each(&mut *f),
            _ => {}
        }
        for expr in self.expressions_mut() {
            expr.for_each_symbol_mut(f);
        }
    }

    pub fn for_each_symbol<'a>(&'a self, f: &mut impl FnMut(&'a SymbolExpr)) {
        for sym in self.bare_symbols() {
            f(sym);
        }
        for expr in self.expressions() {
            expr.for_each_symbol(f);
        }
    }

    /// Every token of the statement in source order.
    pub fn tokens(&self) -> Vec<&Token> {
        let mut out: Vec<&Token> = Vec::new();
        out.extend(self.label.iter().map(|l| &l.token));
        out.extend(self.keyword.iter());
        out.extend(self.extras.iter());
        match &self.kind {
            StmtKind::Opcode(_) => {}
            StmtKind::Hex { digits } => out.extend(digits.iter()),
            StmtKind::Include { file, .. } => out.push(file),
            StmtKind::MacroDef { name, .. } => out.extend(name.iter()),
            StmtKind::MacroInvoke { name, .. } => out.push(name),
            StmtKind::Zone { name } => out.extend(name.iter()),
            _ => {}
        }
        for sym in self.bare_symbols().into_iter().skip(self.label.is_some() as usize) {
            out.push(&sym.token);
        }
        for expr in self.expressions() {
            out.extend(expr.tokens());
        }
        out.extend(self.comment.iter());
        out.sort_by_key(|t| (t.start, t.end));
        out.dedup_by(|a, b| a.start == b.start && a.end == b.end && a.text == b.text);
        out
    }

    /// Token and expression annotations, as `(start, end, note)`.
    pub fn notes(&self) -> Vec<(usize, usize, &Note)> {
        let mut out: Vec<_> = Vec::new();
        for token in self.tokens() {
            if token.note.is_set() {
                out.push((token.start, token.end, &token.note));
            }
        }
        for expr in self.expressions() {
            for (start, end, note) in expr.notes() {
                if !out.iter().any(|(s, e, n)| *s == start && *e == end && *n == note) {
                    out.push((start, end, note));
                }
            }
        }
        out
    }

    pub fn has_error(&self) -> bool {
        self.notes().iter().any(|(_, _, note)| note.has_error())
    }

    /// Mutable access to every token that is not owned by an expression.
    pub fn tokens_mut(&mut self) -> Vec<&mut Token> {
        let mut out: Vec<&mut Token> = Vec::new();
        if let Some(label) = &mut self.label {
            out.push(&mut label.token);
        }
        out.extend(self.keyword.iter_mut());
        out.extend(self.extras.iter_mut());
        match &mut self.kind {
            StmtKind::Hex { digits } => out.extend(digits.iter_mut()),
            StmtKind::Include { file, .. } => out.push(file),
            StmtKind::MacroInvoke { name, .. } => out.push(name),
            _ => {}
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenType;

    #[test]
    fn disabled_keeps_only_comment() {
        let line = "FOO LDA #1 ; hi";
        let mut stmt = Statement::new(StmtKind::Label, Syntax::Merlin);
        stmt.keyword = Some(Token::new(line, 4, 7, TokenType::Opcode));
        stmt.comment = Some(Token::new(line, 11, 15, TokenType::Comment));
        let disabled = stmt.disabled();
        assert_eq!(disabled.kind, StmtKind::Disabled);
        assert_eq!(disabled.tokens().len(), 1);
    }
}
