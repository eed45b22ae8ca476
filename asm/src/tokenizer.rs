// tokenizer.rs

use crate::syntax::SyntaxDef;
use crate::token::{Token, TokenType};

/// Characters an operator run may be extended with.
const OPERATOR_EXT: &str = "<>=!&|:+-*^~";

/// Multi-character operators recognized by maximal munch.
const OPERATORS: [&str; 15] = [
    "<<", ">>", ">>>", "<<<", "<=", ">=", "<>", "><", "==", "!=", "&&", "||", "::", ":=", "--^",
];

fn is_operator_pattern(s: &str) -> bool {
    if OPERATORS.contains(&s) {
        return true;
    }
    // Anonymous label runs: `++`, `---`, and CA65 `:+`, `:--`.
    let body = s.strip_prefix(':').unwrap_or(s);
    !body.is_empty() && (body.chars().all(|c| c == '+') || body.chars().all(|c| c == '-'))
}

fn is_word_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}

/// Body of a quoted string as read by [`Tokenizer::read_string`].
#[derive(Debug, Clone)]
pub struct StringScan {
    pub parts: Vec<Token>,
    pub close: Option<Token>,
}

/// On-demand tokenizer over a single source line.
#[derive(Clone)]
pub struct Tokenizer<'a> {
    line: &'a str,
    pos: usize,
    def: &'static SyntaxDef,
}

impl<'a> Tokenizer<'a> {
    pub fn new(line: &'a str, def: &'static SyntaxDef) -> Self {
        Self { line, pos: 0, def }
    }

    pub fn line(&self) -> &'a str {
        self.line
    }

    pub fn def(&self) -> &'static SyntaxDef {
        self.def
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn set_position(&mut self, pos: usize) {
        self.pos = pos.min(self.line.len());
    }

    fn char_at(&self, at: usize) -> Option<char> {
        self.line.get(at..).and_then(|rest| rest.chars().next())
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.char_at(self.pos) {
            if ch != ' ' && ch != '\t' {
                break;
            }
            self.pos += 1;
        }
    }

    /// True when the next character is whitespace (or the line is done).
    pub fn at_whitespace(&self) -> bool {
        matches!(self.char_at(self.pos), None | Some(' ') | Some('\t'))
    }

    fn is_comment_at(&self, at: usize) -> bool {
        match self.char_at(at) {
            Some(';') => {
                if !self.def.merlin_comments() || at == 0 {
                    return true;
                }
                let prev = self.line[..at].chars().next_back();
                matches!(prev, Some(' ') | Some('\t'))
            }
            Some('*') if at == 0 && self.def.star_comments() => !self.is_pc_assignment(),
            _ => false,
        }
    }

    /// `*` followed by optional whitespace and `=` assigns the program counter.
    fn is_pc_assignment(&self) -> bool {
        self.line[1..].trim_start_matches([' ', '\t']).starts_with('=')
    }

    /// True when nothing but whitespace or a comment remains.
    pub fn at_end(&self) -> bool {
        let mut ahead = self.clone();
        ahead.skip_whitespace();
        ahead.pos >= ahead.line.len() || ahead.is_comment_at(ahead.pos)
    }

    /// Consume and return the comment starting at the next non-whitespace
    /// character, if there is one.
    pub fn comment(&mut self) -> Option<Token> {
        let save = self.pos;
        self.skip_whitespace();
        if self.pos < self.line.len() && self.is_comment_at(self.pos) {
            let token = Token::new(self.line, self.pos, self.line.len(), TokenType::Comment);
            self.pos = self.line.len();
            return Some(token);
        }
        self.pos = save;
        None
    }

    pub fn next_token(&mut self) -> Option<Token> {
        self.skip_whitespace();
        self.very_next_token()
    }

    pub fn peek_token(&self) -> Option<Token> {
        self.clone().next_token()
    }

    pub fn peek_very_next(&self) -> Option<Token> {
        self.clone().very_next_token()
    }

    /// Next token without skipping whitespace; `None` at whitespace, a
    /// comment or the end of the line.
    pub fn very_next_token(&mut self) -> Option<Token> {
        // 0. End of line, whitespace or comment
        let start = self.pos;
        let c = self.char_at(start)?;
        if c == ' ' || c == '\t' || self.is_comment_at(start) {
            return None;
        }

        // 1. Number, hex candidate or symbol
        if is_word_char(c) {
            return Some(self.word(start, !c.is_ascii_digit()));
        }

        // 2. Operator character that opens a symbol
        if self.def.is_symbol_start(c) {
            if let Some(next) = self.char_at(start + c.len_utf8()) {
                if is_word_char(next) {
                    self.pos = start + c.len_utf8();
                    let mut token = self.word(start, true);
                    token.ty = TokenType::Symbol;
                    return Some(token);
                }
            }
        }

        // 3. Operator run, maximal munch
        let mut end = start + c.len_utf8();
        if OPERATOR_EXT.contains(c) {
            let mut ahead = end;
            while let Some(next) = self.char_at(ahead) {
                if !OPERATOR_EXT.contains(next) {
                    break;
                }
                ahead += next.len_utf8();
                if is_operator_pattern(&self.line[start..ahead]) {
                    end = ahead;
                }
            }
        }
        self.pos = end;
        Some(Token::new(self.line, start, end, TokenType::Operator))
    }

    /// Scan a run of word characters beginning at `self.pos`; `symbolic` runs
    /// may also absorb the dialect's symbol-continue characters. A Merlin `;`
    /// that does not follow whitespace is part of the symbol.
    fn word(&mut self, start: usize, symbolic: bool) -> Token {
        let mut end = self.pos.max(start);
        while let Some(ch) = self.char_at(end) {
            let inner_semicolon = ch == ';' && self.def.merlin_comments();
            let continues = self.def.is_symbol_continue(ch) || inner_semicolon;
            if is_word_char(ch) || (symbolic && continues) {
                end += ch.len_utf8();
            } else {
                break;
            }
        }
        self.pos = end;
        let text = &self.line[start..end];
        let ty = if text.chars().all(|c| c.is_ascii_digit()) {
            TokenType::DecNumber
        } else if text.chars().all(|c| c.is_ascii_hexdigit()) {
            TokenType::HexNumber
        } else {
            TokenType::Symbol
        };
        Token::new(self.line, start, end, ty)
    }

    /// Split `token`, which must be the token just returned, after `len`
    /// bytes. The head is returned and scanning resumes at the tail.
    pub fn split_token(&mut self, token: &Token, len: usize) -> Token {
        let at = (token.start + len).min(token.end);
        self.pos = at;
        let ty = match token.ty {
            TokenType::Symbol | TokenType::HexNumber | TokenType::DecNumber if len == 1 => {
                TokenType::Operator
            }
            ty => ty,
        };
        Token::new(self.line, token.start, at, ty)
    }

    /// Read a string body after its opening `quote` has been consumed.
    pub fn read_string(&mut self, quote: char, escapes: &str) -> StringScan {
        let mut parts = Vec::new();
        let mut run_start = self.pos;
        while let Some(ch) = self.char_at(self.pos) {
            if ch == quote {
                if run_start < self.pos {
                    parts.push(Token::new(self.line, run_start, self.pos, TokenType::String));
                }
                let close = Token::new(self.line, self.pos, self.pos + 1, TokenType::Quote);
                self.pos += 1;
                return StringScan {
                    parts,
                    close: Some(close),
                };
            }
            if ch == '\\' && !escapes.is_empty() {
                if let Some(code) = self.char_at(self.pos + 1) {
                    if escapes.contains(code) {
                        if run_start < self.pos {
                            parts.push(Token::new(self.line, run_start, self.pos, TokenType::String));
                        }
                        parts.push(self.escape(code));
                        run_start = self.pos;
                        continue;
                    }
                }
            }
            self.pos += ch.len_utf8();
        }
        if run_start < self.pos {
            parts.push(Token::new(self.line, run_start, self.pos, TokenType::String));
        }
        StringScan { parts, close: None }
    }

    fn escape(&mut self, code: char) -> Token {
        let start = self.pos;
        if code != 'x' {
            self.pos += 2;
            return Token::new(self.line, start, self.pos, TokenType::Escape);
        }
        let mut end = start + 2;
        while end < start + 4 && self.char_at(end).is_some_and(|c| c.is_ascii_hexdigit()) {
            end += 1;
        }
        self.pos = end;
        let mut token = Token::new(self.line, start, end, TokenType::Escape);
        if end != start + 4 {
            token.set_error("Expected two hex digits");
        }
        token
    }

    /// Raw span from the next non-whitespace character to the comment or end
    /// of line, trailing whitespace trimmed. Quoted sections are kept whole.
    pub fn rest_of_line(&mut self) -> Option<Token> {
        self.skip_whitespace();
        let start = self.pos;
        let mut quote = None;
        let mut end = start;
        while let Some(ch) = self.char_at(end) {
            match quote {
                Some(q) if ch == q => quote = None,
                Some(_) => {}
                None if ch == '"' || ch == '\'' => quote = Some(ch),
                None if self.is_comment_at(end) => break,
                None => {}
            }
            end += ch.len_utf8();
        }
        let trimmed = start + self.line[start..end].trim_end().len();
        self.pos = trimmed;
        (trimmed > start).then(|| Token::new(self.line, start, trimmed, TokenType::String))
    }

    /// Next whitespace-delimited word, used for bare file names.
    pub fn bare_word(&mut self) -> Option<Token> {
        self.skip_whitespace();
        let start = self.pos;
        let mut end = start;
        while let Some(ch) = self.char_at(end) {
            if ch == ' ' || ch == '\t' || self.is_comment_at(end) {
                break;
            }
            end += ch.len_utf8();
        }
        self.pos = end;
        (end > start).then(|| Token::new(self.line, start, end, TokenType::FileName))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arch::Syntax;

    fn texts(line: &str, syntax: Syntax) -> Vec<String> {
        let mut tokenizer = Tokenizer::new(line, SyntaxDef::get(syntax));
        let mut out = Vec::new();
        while let Some(token) = tokenizer.next_token() {
            out.push(token.text);
        }
        out
    }

    #[test]
    fn maximal_munch_backtracks() {
        assert_eq!(texts("a<<=b", Syntax::Dasm), vec!["a", "<<", "=", "b"]);
        assert_eq!(texts("x>>>2", Syntax::Acme), vec!["x", ">>>", "2"]);
        assert_eq!(texts("*=$800", Syntax::Acme), vec!["*", "=", "$", "800"]);
        assert_eq!(texts(" --^", Syntax::Merlin), vec!["--^"]);
        assert_eq!(texts("bne :--", Syntax::Ca65), vec!["bne", ":--"]);
        assert_eq!(texts("bne ++", Syntax::Acme), vec!["bne", "++"]);
    }

    #[test]
    fn number_classes() {
        let mut tokenizer = Tokenizer::new("12 C0 DEC X1", SyntaxDef::get(Syntax::Dasm));
        let types: Vec<_> = std::iter::from_fn(|| tokenizer.next_token())
            .map(|t| t.ty)
            .collect();
        use TokenType::*;
        assert_eq!(types, vec![DecNumber, HexNumber, HexNumber, Symbol]);
    }

    #[test]
    fn merlin_semicolon_needs_space() {
        assert_eq!(texts("A;B ;c", Syntax::Merlin), vec!["A;B"]);
        assert_eq!(texts("A;B ;c", Syntax::Dasm), vec!["A"]);
        assert_eq!(texts("LDA  FOO;X", Syntax::Merlin), vec!["LDA", "FOO;X"]);
        assert_eq!(texts("LDA  FOO ;X", Syntax::Merlin), vec!["LDA", "FOO"]);
        assert_eq!(texts(";all comment", Syntax::Merlin), Vec::<String>::new());
    }

    #[test]
    fn merlin_star_comment_in_column_zero() {
        assert_eq!(texts("* comment", Syntax::Merlin), Vec::<String>::new());
        assert_eq!(texts("*comment LDA", Syntax::Merlin), Vec::<String>::new());
        assert_eq!(texts("* = $300", Syntax::Merlin), vec!["*", "=", "$", "300"]);
        assert_eq!(texts(" LDA *", Syntax::Merlin), vec!["LDA", "*"]);

        let mut tokenizer = Tokenizer::new("* header", SyntaxDef::get(Syntax::Merlin));
        let comment = tokenizer.comment().unwrap();
        assert_eq!(comment.text, "* header");
        assert_eq!(comment.ty, TokenType::Comment);
    }

    #[test]
    fn symbol_prefixes() {
        assert_eq!(texts(":LOOP ]1", Syntax::Merlin), vec![":LOOP", "]1"]);
        assert_eq!(texts("@x .proc", Syntax::Ca65), vec!["@x", ".proc"]);
        assert_eq!(texts("lda.w foo$", Syntax::Dasm), vec!["lda.w", "foo$"]);
    }

    #[test]
    fn strings_and_escapes() {
        let def = SyntaxDef::get(Syntax::Ca65);
        let mut tokenizer = Tokenizer::new(r#""a\x41b\n" x"#, def);
        let open = tokenizer.next_token().unwrap();
        assert_eq!(open.text, "\"");
        let scan = tokenizer.read_string('"', def.escapes);
        let parts: Vec<_> = scan.parts.iter().map(|t| (t.text.as_str(), t.ty)).collect();
        assert_eq!(
            parts,
            vec![
                ("a", TokenType::String),
                ("\\x41", TokenType::Escape),
                ("b", TokenType::String),
                ("\\n", TokenType::Escape),
            ]
        );
        assert!(scan.close.is_some());
        assert_eq!(tokenizer.next_token().unwrap().text, "x");

        let mut tokenizer = Tokenizer::new("'abc", def);
        tokenizer.next_token();
        assert!(tokenizer.read_string('\'', def.escapes).close.is_none());
    }

    #[test]
    fn split_resumes_at_tail() {
        let mut tokenizer = Tokenizer::new("!x", SyntaxDef::get(Syntax::Acme));
        let token = tokenizer.next_token().unwrap();
        assert_eq!(token.text, "!x");
        let head = tokenizer.split_token(&token, 1);
        assert_eq!(head.text, "!");
        assert_eq!(tokenizer.next_token().unwrap().text, "x");
    }

    #[test]
    fn rest_of_line_stops_at_comment() {
        let mut tokenizer = Tokenizer::new(" foo bar.s  ; c", SyntaxDef::get(Syntax::Dasm));
        assert_eq!(tokenizer.rest_of_line().unwrap().text, "foo bar.s");
        assert!(tokenizer.at_end());
    }
}
