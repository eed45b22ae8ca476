use arch::Syntax;

use super::Parser;
use crate::expr::{ExprKind, Expression, SymbolExpr};
use crate::statement::{CondKind, ScopeKind, Statement, StmtKind};
use crate::symbol::SymbolType;
use crate::syntax::{Args, Keyword, Test};
use crate::token::{Token, TokenType};

impl<'a> Parser<'a> {
    pub(crate) fn directive(
        &mut self,
        label: Option<SymbolExpr>,
        mut token: Token,
        keyword: Keyword,
    ) -> Statement {
        token.set_type(TokenType::Keyword);
        let syntax = self.def.syntax;

        let kind = match keyword {
            Keyword::Set if syntax == Syntax::Acme && label.is_none() => {
                return self.acme_set(token);
            }
            Keyword::Equ | Keyword::EquZp | Keyword::Set => {
                return self.assignment(label, Some(token));
            }
            Keyword::Define => return self.define(label, token),
            Keyword::Macro => return self.macro_def(label, token),
            Keyword::InvokeMacro => {
                let Some(mut name) = self.word() else {
                    let mut stmt = Statement::new(StmtKind::Label, syntax);
                    stmt.label = label;
                    token.set_error("Missing macro name");
                    stmt.keyword = Some(token);
                    return stmt;
                };
                if let Some(sep) = self.tk.peek_very_next().filter(|t| t.is(",") || t.is(".")) {
                    self.tk.very_next_token();
                    self.extras.push(sep);
                }
                name.set_type(TokenType::Macro);
                self.extras.push(token);
                return self.macro_invoke(label, name);
            }
            Keyword::Import => return self.import(label, token),

            Keyword::Org => StmtKind::Org {
                value: self.expect_expression("Missing address"),
            },
            Keyword::Data(width) | Keyword::DataBE(width) => {
                let values = self.parse_expression_list();
                if values.is_empty() {
                    self.extras.push(Token::missing(token.end, "Missing value"));
                }
                StmtKind::Data {
                    width,
                    big_endian: matches!(keyword, Keyword::DataBE(_)),
                    values,
                }
            }
            Keyword::Hex => StmtKind::Hex {
                digits: self.hex_digits(&token),
            },
            Keyword::Text => StmtKind::Text {
                values: self.text_values(&token),
            },
            Keyword::Storage => {
                if let Some(slash) = self.tk.peek_token().filter(|t| t.is("\\")) {
                    self.tk.next_token();
                    let mut args = vec![Expression::new(ExprKind::Align(slash))];
                    if let Some(comma) = self.tk.peek_token().filter(|t| t.is(",")) {
                        self.tk.next_token();
                        self.extras.push(comma);
                        args.extend(self.parse_expression());
                    }
                    StmtKind::Align { args }
                } else {
                    let args = self.parse_expression_list();
                    if args.is_empty() {
                        self.extras.push(Token::missing(token.end, "Missing size"));
                    }
                    StmtKind::Storage { args }
                }
            }
            Keyword::Align => StmtKind::Align {
                args: self.parse_expression_list(),
            },
            Keyword::Include | Keyword::IncludeBinary => StmtKind::Include {
                file: self.file_name(&token),
                binary: keyword == Keyword::IncludeBinary,
            },

            Keyword::If(test) | Keyword::Elif(test) => {
                let mut expr = self.expect_expression("Missing condition");
                if matches!(test, Test::Defined | Test::Undefined) {
                    if let Some(expr) = &mut expr {
                        expr.for_each_symbol_mut(&mut |sym| sym.defined_test = true);
                    }
                }
                let kind = match keyword {
                    Keyword::If(_) => CondKind::If(test),
                    _ => CondKind::Elif(test),
                };
                StmtKind::Conditional { kind, expr }
            }
            Keyword::Else => StmtKind::Conditional {
                kind: CondKind::Else,
                expr: None,
            },
            Keyword::Endif => StmtKind::Conditional {
                kind: CondKind::Endif,
                expr: None,
            },

            Keyword::Repeat => self.repeat(&token),
            Keyword::EndRepeat => StmtKind::EndRepeat,
            Keyword::EndMacro => StmtKind::EndMacro,

            Keyword::Scope | Keyword::Proc | Keyword::Struct => {
                let (kind, ty) = match keyword {
                    Keyword::Scope => (ScopeKind::Scope, SymbolType::TypeName),
                    Keyword::Proc => (ScopeKind::Proc, SymbolType::Simple),
                    _ => (ScopeKind::Struct, SymbolType::TypeName),
                };
                let name = self.word().map(|mut name| {
                    name.set_type(if ty == SymbolType::TypeName {
                        TokenType::TypeName
                    } else {
                        TokenType::Label
                    });
                    SymbolExpr::new(name, ty, true)
                });
                if name.is_none() && kind == ScopeKind::Proc {
                    self.extras.push(Token::missing(token.end, "Missing name"));
                }
                StmtKind::Scope { kind, name }
            }
            Keyword::EndScope => StmtKind::EndScope(ScopeKind::Scope),
            Keyword::EndProc => StmtKind::EndScope(ScopeKind::Proc),
            Keyword::EndStruct => StmtKind::EndScope(ScopeKind::Struct),

            Keyword::Zone | Keyword::Subroutine => StmtKind::Zone {
                name: self.word().map(|mut name| {
                    name.set_type(TokenType::Label);
                    name
                }),
            },

            Keyword::Entry => StmtKind::Entry {
                names: self.parse_expression_list(),
            },

            Keyword::BlockClose => {
                let else_branch = match self.tk.peek_token() {
                    Some(t) if t.text.eq_ignore_ascii_case("else") => {
                        let mut word = self.tk.next_token().unwrap_or(t);
                        word.set_type(TokenType::Keyword);
                        self.extras.push(word);
                        true
                    }
                    _ => false,
                };
                StmtKind::BlockClose { else_branch }
            }

            Keyword::Other(Args::None) => StmtKind::Generic { args: Vec::new() },
            Keyword::Other(Args::Exprs) => StmtKind::Generic {
                args: self.parse_expression_list(),
            },
            Keyword::Other(Args::Raw) => {
                if let Some(raw) = self.tk.rest_of_line() {
                    self.extras.push(raw);
                }
                StmtKind::Generic { args: Vec::new() }
            }
        };

        let mut stmt = Statement::new(kind, syntax);
        stmt.label = label;
        stmt.keyword = Some(token);
        stmt
    }

    /// Next token if it is a word.
    fn word(&mut self) -> Option<Token> {
        let token = self.tk.peek_token().filter(|t| t.is_word())?;
        self.tk.next_token();
        Some(token)
    }

    /// ACME `!set name = value`.
    fn acme_set(&mut self, keyword: Token) -> Statement {
        let name = self.word().map(|mut name| {
            name.set_type(TokenType::Variable);
            SymbolExpr::new(name, SymbolType::Variable, true)
        });
        if name.is_some() {
            match self.tk.peek_token().filter(|t| t.is("=")) {
                Some(eq) => {
                    self.tk.next_token();
                    self.extras.push(eq);
                }
                None => {
                    let at = self.tk.position();
                    self.extras.push(Token::missing(at, "Missing '='"));
                }
            }
        }
        self.assignment(name, Some(keyword))
    }

    /// CA65 `.define NAME value`, kept as a plain equate.
    fn define(&mut self, label: Option<SymbolExpr>, keyword: Token) -> Statement {
        let name = self.word().map(|mut name| {
            name.set_type(TokenType::Label);
            SymbolExpr::new(name, SymbolType::Simple, true)
        });
        let Some(name) = name else {
            let mut stmt = Statement::new(StmtKind::Label, self.def.syntax);
            self.extras.push(Token::missing(keyword.end, "Missing name"));
            stmt.label = label;
            stmt.keyword = Some(keyword);
            return stmt;
        };
        let value = self.expect_expression("Missing value");
        let kind = match value {
            Some(value) => StmtKind::Equate {
                value,
                zpage: false,
            },
            None => StmtKind::Label,
        };
        let mut stmt = Statement::new(kind, self.def.syntax);
        if let Some(mut label) = label {
            label.token.set_error("Unexpected label");
            self.extras.push(label.token);
        }
        stmt.label = Some(name);
        stmt.keyword = Some(keyword);
        stmt
    }

    fn macro_def(&mut self, label: Option<SymbolExpr>, keyword: Token) -> Statement {
        let syntax = self.def.syntax;
        let mut stmt = Statement::new(StmtKind::Label, syntax);
        stmt.keyword = Some(keyword);

        // Merlin names the macro in the label column.
        if syntax.is_merlin_family() {
            let name = label.map(|label| {
                let mut name = label.token;
                name.set_type(TokenType::Macro);
                name
            });
            if name.is_none() {
                let at = stmt.keyword.as_ref().map(|k| k.start).unwrap_or(0);
                self.extras.push(Token::missing(at, "Missing macro name"));
            }
            stmt.kind = StmtKind::MacroDef {
                name,
                params: Vec::new(),
            };
            return stmt;
        }

        stmt.label = label;
        let name = self.word().map(|mut name| {
            name.set_type(TokenType::Macro);
            name
        });
        if name.is_none() {
            let at = self.tk.position();
            self.extras.push(Token::missing(at, "Missing macro name"));
        }
        let mut params = Vec::new();
        if name.is_some() && syntax != Syntax::Dasm {
            if let Some(comma) = self.tk.peek_token().filter(|t| t.is(",")) {
                self.tk.next_token();
                self.extras.push(comma);
            }
            while let Some(mut param) = self.param_word() {
                param.set_type(TokenType::Variable);
                params.push(SymbolExpr::new(param, SymbolType::NamedParam, true));
                match self.tk.peek_token().filter(|t| t.is(",")) {
                    Some(comma) => {
                        self.tk.next_token();
                        self.extras.push(comma);
                    }
                    None => break,
                }
            }
        }
        stmt.kind = StmtKind::MacroDef { name, params };
        stmt
    }

    /// Macro parameter name. ACME marks by-reference parameters with `~`.
    fn param_word(&mut self) -> Option<Token> {
        if self.def.syntax == Syntax::Acme {
            if let Some(tilde) = self.tk.peek_token().filter(|t| t.is("~")) {
                let mut ahead = self.tk.clone();
                ahead.next_token();
                if ahead.peek_very_next().is_some_and(|t| t.is_word()) {
                    self.tk.next_token();
                    self.extras.push(tilde);
                }
            }
        }
        self.word()
    }

    fn import(&mut self, label: Option<SymbolExpr>, keyword: Token) -> Statement {
        let mut names = Vec::new();
        while let Some(mut name) = self.word() {
            name.set_type(TokenType::Label);
            names.push(SymbolExpr::new(name, SymbolType::Simple, true));
            match self.tk.peek_token().filter(|t| t.is(",")) {
                Some(comma) => {
                    self.tk.next_token();
                    self.extras.push(comma);
                }
                None => break,
            }
        }
        // Merlin `NAME EXT`: the label is the imported name.
        let mut label = label;
        if names.is_empty() {
            match label.take() {
                Some(name) => names.push(name),
                None => self
                    .extras
                    .push(Token::missing(keyword.end, "Missing name")),
            }
        }
        let mut stmt = Statement::new(StmtKind::Import { names }, self.def.syntax);
        stmt.label = label;
        stmt.keyword = Some(keyword);
        stmt
    }

    /// Loop header: `LUP n`, `REPEAT n`, `.repeat n[, var]`, `!for var, [a,] b`.
    fn repeat(&mut self, keyword: &Token) -> StmtKind {
        let def = self.def;
        let mut var = None;
        if def.syntax == Syntax::Acme {
            var = self.word().map(|mut name| {
                name.set_type(TokenType::Variable);
                SymbolExpr::new(name, SymbolType::Variable, true)
            });
            if var.is_none() {
                self.extras.push(Token::missing(keyword.end, "Missing loop variable"));
            }
            if let Some(comma) = self.tk.peek_token().filter(|t| t.is(",")) {
                self.tk.next_token();
                self.extras.push(comma);
            }
            let args = self.parse_expression_list();
            if args.is_empty() {
                let at = self.tk.position();
                self.extras.push(Token::missing(at, "Missing count"));
            }
            return StmtKind::Repeat { var, args };
        }

        let args: Vec<Expression> = self.expect_expression("Missing count").into_iter().collect();
        if def.syntax == Syntax::Ca65 {
            if let Some(comma) = self.tk.peek_token().filter(|t| t.is(",")) {
                self.tk.next_token();
                self.extras.push(comma);
                var = self.word().map(|mut name| {
                    name.set_type(TokenType::Variable);
                    SymbolExpr::new(name, SymbolType::Variable, true)
                });
            }
        }
        StmtKind::Repeat { var, args }
    }

    /// Hex digit pairs for `HEX`, `!hex`: runs separated by commas or spaces.
    fn hex_digits(&mut self, keyword: &Token) -> Vec<Token> {
        let merlin = self.def.syntax.is_merlin_family();
        let mut digits = Vec::new();
        let mut first = true;
        loop {
            let next = if first || !merlin {
                self.tk.peek_token()
            } else {
                self.tk.peek_very_next()
            };
            let Some(mut token) = next else { break };
            if token.is(",") {
                self.tk.set_position(token.end);
                self.extras.push(token);
                first = false;
                continue;
            }
            if !token.is_word() {
                break;
            }
            self.tk.set_position(token.end);
            first = false;
            if !token.text.chars().all(|c| c.is_ascii_hexdigit()) {
                token.set_error("Invalid hex digits");
            } else {
                token.set_type(TokenType::HexNumber);
                if token.len() % 2 != 0 {
                    token.set_warning("Odd number of hex digits");
                }
            }
            digits.push(token);
        }
        if digits.is_empty() {
            self.extras
                .push(Token::missing(keyword.end, "Missing hex digits"));
        }
        digits
    }

    /// String directive operands. Merlin allows raw hex bytes after the
    /// string: `ASC "DONE",8D00`.
    fn text_values(&mut self, keyword: &Token) -> Vec<Expression> {
        if !self.def.syntax.is_merlin_family() {
            let values = self.parse_expression_list();
            if values.is_empty() {
                self.extras.push(Token::missing(keyword.end, "Missing string"));
            }
            return values;
        }
        let mut values: Vec<Expression> = self.expect_expression("Missing string").into_iter().collect();
        while let Some(comma) = self.tk.peek_very_next().filter(|t| t.is(",")) {
            self.tk.very_next_token();
            self.extras.push(comma);
            match self.tk.peek_very_next() {
                Some(t) if t.ty == TokenType::HexNumber || t.ty == TokenType::DecNumber => {
                    self.tk.very_next_token();
                    let mut digits = t;
                    digits.set_type(TokenType::HexNumber);
                    values.push(self.number(None, digits, 16));
                }
                _ => match self.parse_expression() {
                    Some(value) => values.push(value),
                    None => break,
                },
            }
        }
        values
    }

    /// Include target: `"name"`, `'name'`, ACME `<name>`, or a bare word.
    fn file_name(&mut self, keyword: &Token) -> Token {
        let line = self.tk.line();
        let Some(next) = self.tk.peek_token() else {
            return Token::missing(keyword.end, "Missing file name");
        };
        if next.is("\"") || next.is("'") {
            let quote = next.text.chars().next().unwrap_or('"');
            let mut open = self.tk.next_token().unwrap_or(next);
            open.set_type(TokenType::Quote);
            let start = open.end;
            let scan = self.tk.read_string(quote, "");
            let end = scan.close.as_ref().map(|c| c.start).unwrap_or(self.tk.position());
            match scan.close {
                Some(close) => {
                    self.extras.push(open);
                    self.extras.push(close);
                }
                None => {
                    open.set_error("Unterminated string");
                    self.extras.push(open);
                }
            }
            if end == start {
                return Token::missing(start, "Missing file name");
            }
            return Token::new(line, start, end, TokenType::FileName);
        }
        if next.is("<") && self.def.syntax == Syntax::Acme {
            self.tk.next_token();
            let start = next.end;
            let Some(len) = line[start..].find('>') else {
                let mut open = next;
                open.set_error("Missing '>'");
                self.extras.push(open);
                return Token::missing(start, "Missing file name");
            };
            self.extras.push(next);
            self.tk.set_position(start + len + 1);
            self.extras
                .push(Token::new(line, start + len, start + len + 1, TokenType::Operator));
            return Token::new(line, start, start + len, TokenType::FileName);
        }
        self.tk
            .bare_word()
            .unwrap_or_else(|| Token::missing(keyword.end, "Missing file name"))
    }
}

#[cfg(test)]
mod tests {
    use arch::Syntax;

    use crate::parser::parse_line;
    use crate::statement::StmtKind;

    #[test]
    fn include_names() {
        for (line, syntax) in [
            (" PUT lib/util.s", Syntax::Merlin),
            (" include \"lib/util.s\"", Syntax::Dasm),
            ("!source <lib/util.s>", Syntax::Acme),
        ] {
            let stmt = parse_line(line, syntax);
            match &stmt.kind {
                StmtKind::Include { file, binary } => {
                    assert_eq!(file.text, "lib/util.s", "{line}");
                    assert!(!binary);
                }
                other => panic!("{line}: {other:?}"),
            }
            assert!(!stmt.has_error(), "{line}");
        }
    }

    #[test]
    fn hex_digit_checks() {
        let stmt = parse_line(" HEX 0102,A0FF", Syntax::Merlin);
        assert!(!stmt.has_error());
        let stmt = parse_line(" HEX 012", Syntax::Merlin);
        assert!(!stmt.has_error());
        assert!(!stmt.notes().is_empty());
        let stmt = parse_line(" HEX 01ZZ", Syntax::Merlin);
        assert!(stmt.has_error());
    }

    #[test]
    fn merlin_macro_takes_label_name() {
        let stmt = parse_line("MOVE MAC", Syntax::Merlin);
        match &stmt.kind {
            StmtKind::MacroDef { name: Some(name), .. } => assert_eq!(name.text, "MOVE"),
            other => panic!("{other:?}"),
        }
        assert!(stmt.label.is_none());
    }
}
