use crate::message::{Note, Severity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenType {
    Missing,
    Operator,
    Symbol,
    HexNumber,
    DecNumber,
    String,
    Escape,
    Quote,
    Opcode,
    Keyword,
    Comment,
    Label,
    Macro,
    Variable,
    FileName,
    TypeName,
}

/// A span of one source line. Only the type and the note change after the
/// tokenizer creates it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    pub start: usize,
    pub end: usize,
    pub ty: TokenType,
    pub note: Note,
}

impl Token {
    pub fn new(line: &str, start: usize, end: usize, ty: TokenType) -> Self {
        Token {
            text: line.get(start..end).unwrap_or_default().to_string(),
            start,
            end,
            ty,
            note: Note::default(),
        }
    }

    /// Zero-width placeholder for something the line should have contained.
    pub fn missing(at: usize, message: &str) -> Self {
        let mut token = Token {
            text: String::new(),
            start: at,
            end: at,
            ty: TokenType::Missing,
            note: Note::default(),
        };
        token.note.error(message);
        token
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn upper(&self) -> String {
        self.text.to_ascii_uppercase()
    }

    pub fn is(&self, text: &str) -> bool {
        self.text == text
    }

    pub fn is_operator(&self, text: &str) -> bool {
        self.ty == TokenType::Operator && self.text == text
    }

    /// Symbol-like runs: anything the tokenizer produced from letters or digits.
    pub fn is_word(&self) -> bool {
        matches!(
            self.ty,
            TokenType::Symbol | TokenType::HexNumber | TokenType::DecNumber
        )
    }

    pub fn set_type(&mut self, ty: TokenType) {
        self.ty = ty;
    }

    pub fn set_error(&mut self, message: impl Into<String>) {
        self.note.error(message);
    }

    pub fn set_error_weak(&mut self, message: impl Into<String>) {
        self.note.error_weak(message);
    }

    pub fn set_warning(&mut self, message: impl Into<String>) {
        self.note.warning(message);
    }

    pub fn set_info(&mut self, message: impl Into<String>) {
        self.note.info(message);
    }

    pub fn severity(&self) -> Severity {
        self.note.severity()
    }

    pub fn has_error(&self) -> bool {
        self.note.has_error()
    }

    /// Glue `other` onto the end of this token. Both must be adjacent.
    pub fn merge(&mut self, other: &Token) {
        debug_assert_eq!(self.end, other.start);
        self.text.push_str(&other.text);
        self.end = other.end;
    }
}
