// Line layout: label, op column, trailing tokens, comment.

use super::Parser;
use crate::expr::SymbolExpr;
use crate::statement::{Statement, StmtKind};
use crate::symbol::SymbolType;
use crate::syntax::{AnonStyle, Keyword, LabelColon};
use crate::token::{Token, TokenType};

impl<'a> Parser<'a> {
    pub fn parse_statement(mut self) -> Statement {
        let syntax = self.def.syntax;

        // 0. Blank or comment-only line
        if self.tk.at_end() {
            let mut stmt = Statement::empty(syntax);
            stmt.comment = self.tk.comment();
            return stmt;
        }

        // 1. Label
        let label = self.parse_label();

        // 2. Op column
        let mut stmt = self.parse_body(label);

        // 3. Block open, line continuation, leftovers
        if self.def.brace_blocks {
            if let Some(open) = self.tk.peek_token().filter(|t| t.is("{")) {
                self.tk.next_token();
                self.extras.push(open);
                stmt.opens_block = true;
            }
        }
        if self.def.line_continuation {
            if let Some(cont) = self.tk.peek_token().filter(|t| t.is("\\")) {
                self.tk.next_token();
                let mut ahead = self.tk.clone();
                if ahead.next_token().is_none() {
                    self.extras.push(cont);
                    stmt.continues = true;
                } else {
                    self.unexpected(cont);
                }
            }
        }
        while let Some(token) = self.tk.next_token() {
            self.unexpected(token);
        }
        stmt.comment = self.tk.comment();
        stmt.extras.append(&mut self.extras);
        stmt
    }

    pub(crate) fn unexpected(&mut self, mut token: Token) {
        token.set_error("Unexpected token");
        self.extras.push(token);
    }

    /// Word that names an opcode, directive or macro in this dialect.
    pub(crate) fn is_op_word(&self, token: &Token) -> bool {
        if token.ty == TokenType::Operator {
            return self.def.keyword(&token.text).is_some();
        }
        token.is_word()
            && (self.opcode_of(token).is_some()
                || self.def.keyword(&token.text).is_some()
                || self.is_macro(&token.text))
    }

    // ------------------------------------------------------------------------
    // Labels
    // ------------------------------------------------------------------------

    fn parse_label(&mut self) -> Option<SymbolExpr> {
        let def = self.def;
        let column0 = !self.tk.at_whitespace();
        let first = self.tk.peek_token()?;

        if column0 {
            // `*=` assigns the program counter.
            if first.ty == TokenType::Operator && def.is_pc_symbol(&first.text) {
                return None;
            }
            if def.keyword_column1 && self.is_op_word(&first) && !self.colon_follows(&first) {
                return None;
            }
            if def.macro_prefix.is_some_and(|p| first.is(&p.to_string())) && self.word_follows() {
                return None;
            }
            if first.ty == TokenType::Operator && def.keyword(&first.text).is_some() {
                return None;
            }
        } else {
            // Indented labels need their colon, or an assignment.
            let assigns = def.indented_assignment && first.is_word() && self.assign_follows();
            let colon = def.label_colon != LabelColon::Never
                && first.is_word()
                && self.colon_follows(&first);
            if !assigns && !colon {
                return None;
            }
            if def.keyword_column1 && self.is_op_word(&first) && !self.colon_follows(&first) {
                return None;
            }
        }

        let token = self.tk.next_token()?;
        let label = match self.label_symbol(token) {
            Ok(label) => label,
            Err(token) => {
                self.extras.push(token);
                return None;
            }
        };

        // Trailing colon
        let colon = self.tk.peek_very_next().filter(|t| t.is(":"));
        match (colon, def.label_colon) {
            (Some(_), LabelColon::Never) => {
                if let Some(mut colon) = self.tk.very_next_token() {
                    colon.set_error_weak("Unexpected ':' after label");
                    self.extras.push(colon);
                }
            }
            (Some(_), _) => {
                self.extras.extend(self.tk.very_next_token());
            }
            (None, LabelColon::Required) => {
                let assigns = self.tk.peek_token().is_some_and(|t| {
                    t.is("=") || t.is(":=") || self.def.keyword(&t.text) == Some(Keyword::Set)
                });
                if !assigns && label.ty != SymbolType::Ca65Local {
                    let mut label = label;
                    label.token.set_error_weak("Missing ':' after label");
                    return Some(label);
                }
            }
            (None, _) => {}
        }
        Some(label)
    }

    fn colon_follows(&self, token: &Token) -> bool {
        let mut ahead = self.tk.clone();
        ahead.set_position(token.end);
        ahead.very_next_token().is_some_and(|t| t.is(":"))
    }

    fn assign_follows(&self) -> bool {
        let mut ahead = self.tk.clone();
        ahead.next_token();
        ahead.peek_token().is_some_and(|t| {
            t.is("=")
                || t.is(":=")
                || matches!(
                    self.def.keyword(&t.text),
                    Some(Keyword::Set) | Some(Keyword::Equ)
                )
        })
    }

    fn word_follows(&self) -> bool {
        let mut ahead = self.tk.clone();
        ahead.next_token();
        ahead.very_next_token().is_some_and(|t| t.is_word())
    }

    /// Turn the column-0 token into a label definition, or hand the token
    /// back with an error.
    fn label_symbol(&mut self, mut token: Token) -> Result<SymbolExpr, Token> {
        let def = self.def;
        let ty = match token.ty {
            TokenType::Symbol | TokenType::HexNumber => self.classify(&token.text),
            TokenType::Operator => {
                let run = token.text.as_str();
                let plus_minus = !run.is_empty()
                    && (run.chars().all(|c| c == '+') || run.chars().all(|c| c == '-'));
                match def.anon {
                    AnonStyle::Acme if plus_minus => SymbolType::AnonLocal,
                    AnonStyle::Ca65 if run == ":" => SymbolType::Ca65Local,
                    AnonStyle::Lisa if run == "^" => {
                        match self.tk.peek_very_next() {
                            Some(d) if d.ty == TokenType::DecNumber && d.len() == 1 => {
                                self.tk.very_next_token();
                                token.merge(&d);
                                SymbolType::LisaLocal
                            }
                            _ => {
                                token.set_error("Expected local label digit");
                                return Err(token);
                            }
                        }
                    }
                    _ => {
                        token.set_error("Invalid label");
                        return Err(token);
                    }
                }
            }
            _ => {
                token.set_error("Invalid label");
                return Err(token);
            }
        };
        token.set_type(if ty == SymbolType::Variable {
            TokenType::Variable
        } else {
            TokenType::Label
        });
        Ok(SymbolExpr::new(token, ty, true))
    }

    // ------------------------------------------------------------------------
    // Op column
    // ------------------------------------------------------------------------

    fn parse_body(&mut self, label: Option<SymbolExpr>) -> Statement {
        let syntax = self.def.syntax;
        let Some(token) = self.tk.peek_token() else {
            let mut stmt = Statement::new(StmtKind::Label, syntax);
            stmt.label = label;
            return stmt;
        };

        // `* = expr`
        if label.is_none() && token.ty == TokenType::Operator && self.def.is_pc_symbol(&token.text)
        {
            let mut ahead = self.tk.clone();
            ahead.next_token();
            if ahead.peek_token().is_some_and(|t| t.is("=")) {
                let mut star = self.tk.next_token().unwrap_or(token);
                star.set_type(TokenType::Keyword);
                self.extras.extend(self.tk.next_token());
                let value = self.expect_expression("Missing address");
                let mut stmt = Statement::new(StmtKind::Org { value }, syntax);
                stmt.keyword = Some(star);
                return stmt;
            }
        }

        // `label = expr`
        if token.ty == TokenType::Operator && (token.is("=") || token.is(":=")) {
            self.extras.extend(self.tk.next_token());
            return self.assignment(label, None);
        }

        // `+name` macro call
        if let Some(prefix) = self.def.macro_prefix {
            if token.is(&prefix.to_string()) && self.word_follows() {
                let mut prefix = self.tk.next_token().unwrap_or(token);
                if let Some(name) = self.tk.very_next_token() {
                    prefix.merge(&name);
                }
                return self.macro_invoke(label, prefix);
            }
        }

        if token.ty == TokenType::Operator {
            if let Some(keyword) = self.def.keyword(&token.text) {
                let token = self.tk.next_token().unwrap_or(token);
                return self.directive(label, token, keyword);
            }
        }

        if token.is_word() {
            if let Some((op, width, ok)) = self.opcode_of(&token) {
                let token = self.tk.next_token().unwrap_or(token);
                return self.opcode(label, token, op, width, ok);
            }
            if let Some(keyword) = self.def.keyword(&token.text) {
                let token = self.tk.next_token().unwrap_or(token);
                return self.directive(label, token, keyword);
            }
            if self.is_macro(&token.text) {
                let token = self.tk.next_token().unwrap_or(token);
                return self.macro_invoke(label, token);
            }
        }

        let mut token = self.tk.next_token().unwrap_or(token);
        if token.is_word() {
            token.set_error("Unknown opcode or directive");
        } else {
            token.set_error("Unexpected token");
        }
        let mut stmt = Statement::new(StmtKind::Label, syntax);
        stmt.label = label;
        stmt.keyword = Some(token);
        stmt
    }

    /// Value of an equate-like statement; `None` leaves a missing marker.
    pub(crate) fn expect_expression(&mut self, message: &str) -> Option<crate::expr::Expression> {
        let expr = self.parse_expression();
        if expr.is_none() {
            let at = self.tk.position();
            self.extras.push(Token::missing(at, message));
        }
        expr
    }

    /// `label = expr`, `label EQU expr`, `label SET expr`.
    pub(crate) fn assignment(&mut self, label: Option<SymbolExpr>, keyword: Option<Token>) -> Statement {
        let syntax = self.def.syntax;
        let value = self.expect_expression("Missing value");
        let zpage = keyword
            .as_ref()
            .is_some_and(|k| self.def.keyword(&k.text) == Some(Keyword::EquZp));
        let variable = label.as_ref().is_some_and(|l| l.ty == SymbolType::Variable)
            || keyword
                .as_ref()
                .is_some_and(|k| self.def.keyword(&k.text) == Some(Keyword::Set));
        let label = match label {
            Some(label) => Some(label),
            None => {
                let at = keyword.as_ref().map(|k| k.start).unwrap_or(0);
                self.extras.push(Token::missing(at, "Missing label"));
                None
            }
        };
        let kind = match value {
            Some(value) if variable => StmtKind::Variable { value },
            Some(value) => StmtKind::Equate { value, zpage },
            None => StmtKind::Label,
        };
        let mut stmt = Statement::new(kind, syntax);
        stmt.label = label.map(|mut l| {
            if variable {
                l.ty = SymbolType::Variable;
                l.token.set_type(TokenType::Variable);
            }
            l
        });
        stmt.keyword = keyword;
        stmt
    }

    pub(crate) fn macro_invoke(&mut self, label: Option<SymbolExpr>, mut name: Token) -> Statement {
        name.set_type(TokenType::Macro);
        let args = self.macro_args();
        let mut stmt = Statement::new(StmtKind::MacroInvoke { name, args }, self.def.syntax);
        stmt.label = label;
        stmt
    }

    /// Raw macro arguments, split on `,` (`;` in Merlin) outside quotes.
    pub(crate) fn macro_args(&mut self) -> Vec<String> {
        let Some(raw) = self.tk.rest_of_line() else {
            return Vec::new();
        };
        let sep = if self.def.syntax.is_merlin_family() { ';' } else { ',' };
        let args = split_args(&raw.text, sep);
        let mut raw = raw;
        raw.set_type(TokenType::String);
        self.extras.push(raw);
        args
    }
}

/// Split `text` on `sep` outside of quotes, trimming each piece.
pub(crate) fn split_args(text: &str, sep: char) -> Vec<String> {
    let mut out = Vec::new();
    let mut quote = None;
    let mut current = String::new();
    for ch in text.chars() {
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => {}
            None if ch == '"' || ch == '\'' => quote = Some(ch),
            None if ch == sep => {
                out.push(current.trim().to_string());
                current.clear();
                continue;
            }
            None => {}
        }
        current.push(ch);
    }
    out.push(current.trim().to_string());
    out
}

#[cfg(test)]
mod tests {
    use super::split_args;

    #[test]
    fn args_split_outside_quotes() {
        assert_eq!(split_args("a, \"b,c\" ,d", ','), vec!["a", "\"b,c\"", "d"]);
        assert_eq!(split_args("1;2", ';'), vec!["1", "2"]);
    }
}
