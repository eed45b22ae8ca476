// Shunting-yard expression parser.

use super::Parser;
use crate::expr::{size_of_value, ExprKind, Expression, OpKind, SymbolExpr};
use crate::symbol::SymbolType;
use crate::syntax::{AnonStyle, OpDef, VarArgs};
use crate::token::{Token, TokenType};

struct StackOp {
    token: Token,
    def: OpDef,
    unary: bool,
}

struct Group {
    open: Token,
    close: &'static str,
    ops: usize,
    operands: usize,
}

#[derive(Default)]
struct Yard {
    operands: Vec<Expression>,
    ops: Vec<StackOp>,
    groups: Vec<Group>,
}

impl Yard {
    fn is_empty(&self) -> bool {
        self.operands.is_empty() && self.ops.is_empty() && self.groups.is_empty()
    }

    /// Everything consumed so far, for a Bad expression.
    fn drain_tokens(&mut self) -> Vec<Token> {
        let mut tokens: Vec<Token> = Vec::new();
        for expr in self.operands.drain(..) {
            tokens.extend(expr.tokens().into_iter().cloned());
        }
        tokens.extend(self.ops.drain(..).map(|op| op.token));
        tokens.extend(self.groups.drain(..).map(|g| g.open));
        tokens.sort_by_key(|t| t.start);
        tokens
    }

    fn bad(&mut self, extra: Option<Token>, message: &str) -> Expression {
        let mut tokens = self.drain_tokens();
        tokens.extend(extra);
        Expression::bad(tokens, message)
    }

    /// Apply the top operator. `false` when it lacks operands.
    fn reduce_one(&mut self) -> bool {
        let Some(op) = self.ops.pop() else {
            return false;
        };
        let floor = self.groups.last().map(|g| g.operands).unwrap_or(0);
        let need = if op.unary { 1 } else { 2 };
        if self.operands.len() < floor + need {
            self.ops.push(op);
            return false;
        }
        let expr = if op.unary {
            let arg = self.operands.pop().map(Box::new);
            let Some(arg) = arg else { return false };
            ExprKind::Unary {
                op: op.token,
                kind: op.def.op,
                arg,
            }
        } else {
            let (Some(right), Some(left)) = (self.operands.pop(), self.operands.pop()) else {
                return false;
            };
            ExprKind::Binary {
                op: op.token,
                kind: op.def.op,
                left: Box::new(left),
                right: Box::new(right),
            }
        };
        self.operands.push(Expression::new(expr));
        true
    }

    /// Reduce stacked operators above the innermost group that bind at
    /// least as tightly as `incoming`.
    fn reduce_for(&mut self, incoming: &OpDef) -> bool {
        let floor = self.groups.last().map(|g| g.ops).unwrap_or(0);
        while self.ops.len() > floor {
            let Some(top) = self.ops.last() else { break };
            let pops = top.def.pre > incoming.pre || (top.def.pre == incoming.pre && !incoming.ra);
            if !pops {
                break;
            }
            if !self.reduce_one() {
                return false;
            }
        }
        true
    }

    fn reduce_to(&mut self, floor: usize) -> bool {
        while self.ops.len() > floor {
            if !self.reduce_one() {
                return false;
            }
        }
        true
    }
}

impl<'a> Parser<'a> {
    fn expr_token(&mut self, first: bool) -> Option<Token> {
        // Merlin operands end at whitespace.
        if self.def.syntax.is_merlin_family() && !first {
            self.tk.very_next_token()
        } else {
            self.tk.next_token()
        }
    }

    fn peek_expr_token(&self, first: bool) -> Option<Token> {
        if self.def.syntax.is_merlin_family() && !first {
            self.tk.peek_very_next()
        } else {
            self.tk.peek_token()
        }
    }

    /// Parse one expression. `None` when the next token cannot start one
    /// (nothing is consumed in that case).
    pub fn parse_expression(&mut self) -> Option<Expression> {
        let mut yard = Yard::default();
        let mut first = true;
        loop {
            // 1. Operand position: unary operators, groups, then a term
            let Some(token) = self.peek_expr_token(first) else {
                if yard.is_empty() {
                    return None;
                }
                return Some(yard.bad(None, "Missing operand"));
            };
            if let Some(def) = self.unary_for(&token) {
                let token = self.expr_token(first)?;
                first = false;
                if def.op == OpKind::Group {
                    if self.def.list_literals && token.is("[") {
                        let list = self.parse_list(token);
                        yard.operands.push(list);
                    } else {
                        yard.groups.push(Group {
                            open: token,
                            close: def.close.unwrap_or(")"),
                            ops: yard.ops.len(),
                            operands: yard.operands.len(),
                        });
                        continue;
                    }
                } else {
                    yard.ops.push(StackOp {
                        token,
                        def: *def,
                        unary: true,
                    });
                    continue;
                }
            } else {
                match self.parse_term(first) {
                    Some(term) => yard.operands.push(term),
                    None if yard.is_empty() => return None,
                    None => return Some(yard.bad(None, "Missing operand")),
                }
                first = false;
            }

            // 2. Operator position: closes and binary operators
            loop {
                let Some(token) = self.peek_expr_token(false) else {
                    return Some(self.finish(yard));
                };
                if let Some(group) = yard.groups.last() {
                    if token.ty == TokenType::Operator && token.is(group.close) {
                        let Some(close) = self.expr_token(false) else {
                            return Some(self.finish(yard));
                        };
                        let floor = group.ops;
                        let expect = group.operands + 1;
                        if !yard.reduce_to(floor) || yard.operands.len() != expect {
                            return Some(yard.bad(Some(close), "Missing operand"));
                        }
                        let Some(group) = yard.groups.pop() else {
                            return Some(yard.bad(Some(close), "Unbalanced grouping"));
                        };
                        let Some(inner) = yard.operands.pop() else {
                            return Some(yard.bad(Some(close), "Missing operand"));
                        };
                        yard.operands.push(Expression::new(ExprKind::Paren {
                            open: group.open,
                            inner: Box::new(inner),
                            close,
                        }));
                        continue;
                    }
                }
                let binary = match token.ty {
                    TokenType::Operator | TokenType::Symbol | TokenType::HexNumber => {
                        self.def.binary_op(&token.text).copied()
                    }
                    _ => None,
                };
                let Some(def) = binary else {
                    return Some(self.finish(yard));
                };
                let Some(token) = self.expr_token(false) else {
                    return Some(self.finish(yard));
                };
                if !yard.reduce_for(&def) {
                    return Some(yard.bad(Some(token), "Missing operand"));
                }
                yard.ops.push(StackOp {
                    token,
                    def,
                    unary: false,
                });
                break;
            }
        }
    }

    fn finish(&mut self, mut yard: Yard) -> Expression {
        if !yard.groups.is_empty() {
            let close = yard.groups.last().map(|g| g.close).unwrap_or(")");
            return yard.bad(None, &format!("Missing '{close}'"));
        }
        if !yard.reduce_to(0) || yard.operands.len() != 1 {
            return yard.bad(None, "Missing operand");
        }
        match yard.operands.pop() {
            Some(expr) => expr,
            None => yard.bad(None, "Missing operand"),
        }
    }

    fn unary_for(&self, token: &Token) -> Option<&'static OpDef> {
        let def = self.def;
        match token.ty {
            TokenType::Operator => {
                if self.is_anon_ref(token) || self.is_lisa_ref(token) {
                    return None;
                }
                if token.is("{") && def.var_args == VarArgs::Brace {
                    return None;
                }
                def.unary_op(&token.text)
            }
            // Word operators (`NOT`, `.BITNOT`).
            TokenType::Symbol | TokenType::HexNumber => {
                let op = def.unary_op(&token.text)?;
                (op.op != OpKind::Group).then_some(op)
            }
            _ => None,
        }
    }

    /// ACME `+`/`-` runs standing alone as an operand.
    fn is_anon_ref(&self, token: &Token) -> bool {
        if self.def.anon != AnonStyle::Acme || token.ty != TokenType::Operator {
            return false;
        }
        let run = &token.text;
        if !(run.chars().all(|c| c == '+') || run.chars().all(|c| c == '-')) {
            return false;
        }
        let mut ahead = self.tk.clone();
        ahead.next_token();
        match ahead.peek_token() {
            None => true,
            Some(next) => {
                next.ty == TokenType::Operator && (next.is(",") || next.is(")") || next.is("]"))
            }
        }
    }

    /// LISA `<d` / `>d` directly followed by a single digit.
    fn is_lisa_ref(&self, token: &Token) -> bool {
        if self.def.anon != AnonStyle::Lisa || !(token.is("<") || token.is(">")) {
            return false;
        }
        let mut ahead = self.tk.clone();
        ahead.next_token();
        ahead
            .peek_very_next()
            .is_some_and(|d| d.ty == TokenType::DecNumber && d.len() == 1)
    }

    // ------------------------------------------------------------------------
    // Terms
    // ------------------------------------------------------------------------

    fn parse_term(&mut self, first: bool) -> Option<Expression> {
        let token = self.peek_expr_token(first)?;
        let def = self.def;
        match token.ty {
            TokenType::Operator => {
                if token.is("$") {
                    let prefix = self.expr_token(first)?;
                    return Some(self.hex_literal(prefix));
                }
                if token.is("%") {
                    let prefix = self.expr_token(first)?;
                    return Some(self.binary_literal(prefix));
                }
                if token.is("\"") || token.is("'") {
                    let open = self.expr_token(first)?;
                    return Some(self.string_literal(open));
                }
                if def.is_pc_symbol(&token.text) {
                    let mut token = self.expr_token(first)?;
                    token.set_type(TokenType::Keyword);
                    return Some(Expression::new(ExprKind::Pc(token)));
                }
                if self.is_anon_ref(&token) {
                    let token = self.expr_token(first)?;
                    return Some(self.symbol_ref(token, SymbolType::AnonLocal));
                }
                if def.anon == AnonStyle::Ca65 && token.text.starts_with(':') && token.len() > 1 {
                    let body = &token.text[1..];
                    if body.chars().all(|c| c == '+') || body.chars().all(|c| c == '-') {
                        let token = self.expr_token(first)?;
                        return Some(self.symbol_ref(token, SymbolType::Ca65Local));
                    }
                }
                if self.is_lisa_ref(&token) {
                    let mut marker = self.expr_token(first)?;
                    if let Some(digit) = self.tk.very_next_token() {
                        marker.merge(&digit);
                    }
                    return Some(self.symbol_ref(marker, SymbolType::LisaLocal));
                }
                if token.is("::") && def.scope_sep == "::" {
                    let mut sep = self.expr_token(first)?;
                    if let Some(name) = self.tk.peek_very_next().filter(|t| t.is_word()) {
                        self.tk.very_next_token();
                        sep.merge(&name);
                        self.scoped_tail(&mut sep);
                        return Some(self.symbol_ref(sep, SymbolType::Scoped));
                    }
                    return Some(Expression::bad(vec![sep], "Missing symbol"));
                }
                if token.is("{") && def.var_args == VarArgs::Brace {
                    let mut open = self.expr_token(first)?;
                    if let Some(num) = self.tk.peek_very_next().filter(|t| t.is_word()) {
                        self.tk.very_next_token();
                        open.merge(&num);
                        if let Some(close) = self.tk.peek_very_next().filter(|t| t.is("}")) {
                            self.tk.very_next_token();
                            open.merge(&close);
                            open.set_type(TokenType::Variable);
                            return Some(Expression::new(ExprKind::Var(open)));
                        }
                    }
                    return Some(Expression::bad(vec![open], "Missing '}'"));
                }
                None
            }
            TokenType::DecNumber => {
                let digits = self.expr_token(first)?;
                Some(self.number(None, digits, 10))
            }
            TokenType::Symbol | TokenType::HexNumber => {
                let mut token = self.expr_token(first)?;
                if let Some(kind) = def.function(&token.text) {
                    if self.tk.peek_very_next().is_some_and(|t| t.is("(")) {
                        return Some(self.function(token, kind));
                    }
                }
                // ACME `!x`: the `!` is an operator here, not a directive prefix.
                if def.syntax == arch::Syntax::Acme && token.text.starts_with('!') {
                    let op = self.tk.split_token(&token, 1);
                    let arg = self.parse_term(false);
                    let Some(opdef) = def.unary_op("!") else {
                        return Some(Expression::bad(vec![op], "Unexpected '!'"));
                    };
                    return Some(match arg {
                        Some(arg) => Expression::new(ExprKind::Unary {
                            op,
                            kind: opdef.op,
                            arg: Box::new(arg),
                        }),
                        None => Expression::bad(vec![op], "Missing operand"),
                    });
                }
                if def.var_args == VarArgs::Bracket
                    && token.text.starts_with(']')
                    && token.text[1..].chars().all(|c| c.is_ascii_digit())
                {
                    token.set_type(TokenType::Variable);
                    return Some(Expression::new(ExprKind::Var(token)));
                }
                let scoped = self.scoped_tail(&mut token);
                let ty = if scoped {
                    SymbolType::Scoped
                } else {
                    self.classify(&token.text)
                };
                Some(self.symbol_ref(token, ty))
            }
            _ => None,
        }
    }

    /// Merge `::name` continuations into `token`. True if any were merged.
    fn scoped_tail(&mut self, token: &mut Token) -> bool {
        let sep = self.def.scope_sep;
        if sep != "::" {
            return false;
        }
        let mut merged = false;
        loop {
            let mut ahead = self.tk.clone();
            let Some(op) = ahead.very_next_token().filter(|t| t.is(sep)) else {
                break;
            };
            let Some(name) = ahead.very_next_token().filter(|t| t.is_word()) else {
                break;
            };
            self.tk = ahead;
            token.merge(&op);
            token.merge(&name);
            merged = true;
        }
        merged
    }

    /// Symbol category implied by a name's spelling.
    pub(crate) fn classify(&self, name: &str) -> SymbolType {
        let def = self.def;
        let first = name.chars().next();
        if first.is_some() && first == def.cheap_prefix {
            SymbolType::CheapLocal
        } else if first.is_some() && first == def.var_prefix {
            SymbolType::Variable
        } else if (first.is_some() && first == def.zone_prefix)
            || def.zone_suffix.is_some_and(|s| name.len() > 1 && name.ends_with(s))
        {
            SymbolType::ZoneLocal
        } else {
            SymbolType::Simple
        }
    }

    pub(crate) fn symbol_ref(&self, mut token: Token, ty: SymbolType) -> Expression {
        token.set_type(if ty == SymbolType::Variable {
            TokenType::Variable
        } else {
            TokenType::Label
        });
        Expression::new(ExprKind::Symbol(SymbolExpr::new(token, ty, false)))
    }

    // ------------------------------------------------------------------------
    // Literals
    // ------------------------------------------------------------------------

    pub(super) fn number(&self, prefix: Option<Token>, digits: Token, radix: u32) -> Expression {
        let text = digits.text.replace('_', "");
        match i64::from_str_radix(&text, radix) {
            Ok(value) => {
                // `$0010` is written wide on purpose.
                let wide = radix == 16 && text.len() > 2;
                Expression::new(ExprKind::Number {
                    prefix,
                    digits,
                    value,
                    size: size_of_value(value, wide),
                })
            }
            Err(_) => {
                let mut tokens: Vec<Token> = prefix.into_iter().collect();
                tokens.push(digits);
                Expression::bad(tokens, "Number out of range")
            }
        }
    }

    fn hex_literal(&mut self, mut prefix: Token) -> Expression {
        prefix.set_type(TokenType::HexNumber);
        match self.tk.peek_very_next() {
            Some(t) if t.ty == TokenType::HexNumber || t.ty == TokenType::DecNumber => {
                let Some(mut digits) = self.tk.very_next_token() else {
                    return Expression::bad(vec![prefix], "Missing hex digits");
                };
                digits.set_type(TokenType::HexNumber);
                self.number(Some(prefix), digits, 16)
            }
            Some(t) if t.ty == TokenType::Symbol => {
                let Some(mut digits) = self.tk.very_next_token() else {
                    return Expression::bad(vec![prefix], "Missing hex digits");
                };
                digits.set_error("Invalid hex digits");
                Expression::bad(vec![prefix, digits], "Invalid hex digits")
            }
            _ => {
                prefix.set_error("Missing hex digits");
                Expression::bad(vec![prefix], "Missing hex digits")
            }
        }
    }

    fn binary_literal(&mut self, mut prefix: Token) -> Expression {
        prefix.set_type(TokenType::DecNumber);
        let Some(mut digits) = self.tk.peek_very_next().filter(|t| t.is_word()) else {
            prefix.set_error("Missing binary digits");
            return Expression::bad(vec![prefix], "Missing binary digits");
        };
        self.tk.very_next_token();
        if !digits.text.chars().all(|c| c == '0' || c == '1' || c == '_') {
            digits.set_error("Invalid binary digits");
            return Expression::bad(vec![prefix, digits], "Invalid binary digits");
        }
        let count = digits.text.chars().filter(|&c| c != '_').count();
        if count % 4 != 0 {
            digits.set_warning("Unusual number of binary digits");
        }
        self.number(Some(prefix), digits, 2)
    }

    fn string_literal(&mut self, mut open: Token) -> Expression {
        let quote = open.text.chars().next().unwrap_or('"');
        open.set_type(TokenType::Quote);
        let scan = self.tk.read_string(quote, self.def.escapes);
        let mut bytes = Vec::new();
        for part in &scan.parts {
            match part.ty {
                TokenType::Escape => bytes.push(escape_value(&part.text)),
                _ => bytes.extend(part.text.bytes()),
            }
        }
        if quote == '"' && self.def.high_ascii_dquote {
            bytes.iter_mut().for_each(|b| *b |= 0x80);
        }
        if scan.close.is_none() {
            open.set_error("Unterminated string");
        }
        Expression::new(ExprKind::String {
            open,
            parts: scan.parts,
            close: scan.close,
            bytes,
        })
    }

    // ------------------------------------------------------------------------
    // Compound terms
    // ------------------------------------------------------------------------

    /// Comma-separated items up to `close`. Returns items, separators and
    /// the close token when found.
    fn parse_items(&mut self, close: &str) -> (Vec<Expression>, Vec<Token>, Option<Token>) {
        let mut items = Vec::new();
        let mut separators = Vec::new();
        loop {
            if let Some(end) = self.tk.peek_token().filter(|t| t.is(close)) {
                self.tk.next_token();
                return (items, separators, Some(end));
            }
            match self.parse_expression() {
                Some(item) => items.push(item),
                None => return (items, separators, None),
            }
            match self.tk.peek_token() {
                Some(t) if t.is(",") => {
                    self.tk.next_token();
                    separators.push(t);
                }
                Some(t) if t.is(close) => {
                    self.tk.next_token();
                    return (items, separators, Some(t));
                }
                _ => return (items, separators, None),
            }
        }
    }

    fn parse_list(&mut self, open: Token) -> Expression {
        let (items, separators, close) = self.parse_items("]");
        let mut expr = Expression::new(ExprKind::Array {
            open,
            items,
            separators,
            close: close.clone(),
        });
        if close.is_none() {
            expr.note.error("Missing ']'");
        }
        expr
    }

    fn function(&mut self, mut name: Token, kind: OpKind) -> Expression {
        name.set_type(TokenType::Keyword);
        let Some(open) = self.tk.very_next_token() else {
            return Expression::bad(vec![name], "Missing '('");
        };
        let (mut args, separators, close) = self.parse_items(")");
        if kind == OpKind::Defined {
            for arg in &mut args {
                arg.for_each_symbol_mut(&mut |sym| sym.defined_test = true);
            }
        }
        let mut expr = Expression::new(ExprKind::Function {
            name,
            kind,
            open,
            args,
            separators,
            close: close.clone(),
        });
        if close.is_none() {
            expr.note.error("Missing ')'");
        }
        expr
    }

    /// Comma-separated expressions, separators recorded as extras.
    pub fn parse_expression_list(&mut self) -> Vec<Expression> {
        let mut out = Vec::new();
        while let Some(expr) = self.parse_expression() {
            out.push(expr);
            match self.tk.peek_token() {
                Some(t) if t.is(",") => {
                    self.tk.next_token();
                    self.extras.push(t);
                }
                _ => break,
            }
        }
        out
    }
}

fn escape_value(text: &str) -> u8 {
    let mut chars = text.chars().skip(1);
    match chars.next() {
        Some('n') => b'\n',
        Some('r') => b'\r',
        Some('t') => b'\t',
        Some('0') => 0,
        Some('x') => u8::from_str_radix(&text[2..], 16).unwrap_or(0),
        Some(c) => c as u8,
        None => b'\\',
    }
}
