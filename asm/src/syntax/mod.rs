//! Per-dialect tables: keywords, operators, local label affixes and the
//! feature flags the tokenizer and parser consult.

mod acme;
mod ca65;
mod dasm;
mod lisa;
mod merlin;

use std::collections::HashMap;

use arch::Syntax;
use once_cell::sync::Lazy;

use crate::expr::OpKind;

/// Condition a conditional-assembly directive tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Test {
    NonZero,
    Zero,
    Positive,
    Negative,
    Defined,
    Undefined,
}

/// How a generic directive's arguments are read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Args {
    None,
    Exprs,
    Raw,
}

/// Statement form a keyword introduces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Org,
    Equ,
    EquZp,
    Set,
    Define,
    Data(u8),
    DataBE(u8),
    Hex,
    Text,
    Storage,
    Align,
    Include,
    IncludeBinary,
    If(Test),
    Elif(Test),
    Else,
    Endif,
    Repeat,
    EndRepeat,
    Macro,
    EndMacro,
    InvokeMacro,
    Scope,
    EndScope,
    Proc,
    EndProc,
    Zone,
    Subroutine,
    Struct,
    EndStruct,
    Entry,
    Import,
    BlockClose,
    Other(Args),
}

impl Keyword {
    pub fn is_conditional(&self) -> bool {
        matches!(
            self,
            Keyword::If(_) | Keyword::Elif(_) | Keyword::Else | Keyword::Endif
        )
    }
}

/// Operator entry: precedence (higher binds tighter), right associativity,
/// and for grouping operators the matching close delimiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpDef {
    pub op: OpKind,
    pub pre: u8,
    pub ra: bool,
    pub close: Option<&'static str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelColon {
    Never,
    Optional,
    Required,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnonStyle {
    None,
    /// ACME `+`/`-` runs, matched by marker and run length.
    Acme,
    /// CA65 `:` definitions referenced with `:+`/`:-`.
    Ca65,
    /// LISA `^d` definitions referenced with `<d`/`>d`.
    Lisa,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpcodeSuffix {
    None,
    /// Merlin: a fourth letter after the mnemonic (`LDAL`, `STA:`).
    Letter,
    /// DASM: `.b`, `.w`, `.z`, `.a`.
    Dot,
    /// ACME: `+1`, `+2`.
    Plus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarArgs {
    None,
    /// Merlin `]1` .. `]9`.
    Bracket,
    /// DASM `{1}` .. `{9}`.
    Brace,
}

pub struct SyntaxDef {
    pub syntax: Syntax,
    pub keywords: HashMap<&'static str, Keyword>,
    pub unary: HashMap<&'static str, OpDef>,
    pub binary: HashMap<&'static str, OpDef>,
    pub functions: HashMap<&'static str, OpKind>,

    pub cheap_prefix: Option<char>,
    pub zone_prefix: Option<char>,
    pub zone_suffix: Option<char>,
    pub var_prefix: Option<char>,
    pub anon: AnonStyle,
    pub var_args: VarArgs,
    pub scope_sep: &'static str,

    pub keyword_column1: bool,
    pub label_colon: LabelColon,
    pub indented_assignment: bool,
    pub line_continuation: bool,
    pub macro_prefix: Option<char>,
    pub escapes: &'static str,
    pub symbol_start: &'static str,
    pub symbol_continue: &'static str,
    pub pc_symbols: &'static str,
    pub high_ascii_dquote: bool,
    pub opcode_suffix: OpcodeSuffix,
    pub width_prefix: bool,
    pub dot_keywords: bool,
    pub bare_filenames: bool,
    pub brace_blocks: bool,
    pub list_literals: bool,
}

impl SyntaxDef {
    pub fn get(syntax: Syntax) -> &'static SyntaxDef {
        match syntax {
            Syntax::Merlin => &MERLIN,
            Syntax::Dasm => &DASM,
            Syntax::Ca65 => &CA65,
            Syntax::Acme => &ACME,
            Syntax::Lisa => &LISA,
            Syntax::Unknown => &GENERIC,
        }
    }

    pub fn keyword(&self, word: &str) -> Option<Keyword> {
        let upper = word.to_ascii_uppercase();
        if let Some(kw) = self.keywords.get(upper.as_str()) {
            return Some(*kw);
        }
        if self.dot_keywords {
            if let Some(bare) = upper.strip_prefix('.') {
                return self.keywords.get(bare).copied();
            }
        }
        None
    }

    pub fn unary_op(&self, text: &str) -> Option<&OpDef> {
        self.unary.get(text.to_ascii_uppercase().as_str())
    }

    pub fn binary_op(&self, text: &str) -> Option<&OpDef> {
        self.binary.get(text.to_ascii_uppercase().as_str())
    }

    pub fn function(&self, text: &str) -> Option<OpKind> {
        self.functions.get(text.to_ascii_uppercase().as_str()).copied()
    }

    pub fn is_pc_symbol(&self, text: &str) -> bool {
        text.len() == 1 && self.pc_symbols.contains(text)
    }

    /// Operator characters that may open a symbol (`:` in Merlin, `@` in CA65).
    pub fn is_symbol_start(&self, ch: char) -> bool {
        self.symbol_start.contains(ch)
    }

    /// Operator characters allowed inside a symbol once it has started.
    pub fn is_symbol_continue(&self, ch: char) -> bool {
        self.symbol_continue.contains(ch)
    }

    /// Merlin family: `;` only opens a comment after whitespace.
    pub fn merlin_comments(&self) -> bool {
        self.syntax.is_merlin_family()
    }

    /// `*` in column 0 opens a full-line comment.
    pub fn star_comments(&self) -> bool {
        matches!(self.syntax, Syntax::Merlin | Syntax::Unknown)
    }
}

pub(crate) fn ops(list: &[(&'static str, OpKind, u8, bool)]) -> HashMap<&'static str, OpDef> {
    list.iter()
        .map(|&(text, op, pre, ra)| {
            let close = match op {
                OpKind::Group => match text {
                    "(" => Some(")"),
                    "[" => Some("]"),
                    "{" => Some("}"),
                    _ => None,
                },
                _ => None,
            };
            (text, OpDef { op, pre, ra, close })
        })
        .collect()
}

pub(crate) fn keywords(list: &[(&'static str, Keyword)]) -> HashMap<&'static str, Keyword> {
    list.iter().copied().collect()
}

/// Unary operators outrank every binary level.
pub(crate) const UNARY_PRE: u8 = 12;

static MERLIN: Lazy<SyntaxDef> = Lazy::new(merlin::table);
static DASM: Lazy<SyntaxDef> = Lazy::new(dasm::table);
static CA65: Lazy<SyntaxDef> = Lazy::new(ca65::table);
static ACME: Lazy<SyntaxDef> = Lazy::new(acme::table);
static LISA: Lazy<SyntaxDef> = Lazy::new(lisa::table);

/// Table used to tokenize before a dialect is known: Merlin's comment
/// rules without any dialect-specific symbol affixes.
static GENERIC: Lazy<SyntaxDef> = Lazy::new(|| SyntaxDef {
    syntax: Syntax::Unknown,
    symbol_start: "",
    symbol_continue: "",
    ..merlin::table()
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_dialect_has_mul_above_add() {
        for syntax in Syntax::KNOWN {
            let def = SyntaxDef::get(syntax);
            let add = def.binary_op("+").unwrap();
            let mul = def.binary_op("*").unwrap();
            assert!(mul.pre > add.pre, "{syntax}");
        }
    }

    #[test]
    fn lisa_is_right_associative() {
        let def = SyntaxDef::get(Syntax::Lisa);
        assert!(def.binary_op("-").unwrap().ra);
        assert!(!SyntaxDef::get(Syntax::Dasm).binary_op("-").unwrap().ra);
    }

    #[test]
    fn keyword_lookup_is_case_insensitive() {
        let merlin = SyntaxDef::get(Syntax::Merlin);
        assert_eq!(merlin.keyword("put"), Some(Keyword::Include));
        let dasm = SyntaxDef::get(Syntax::Dasm);
        assert_eq!(dasm.keyword(".byte"), Some(Keyword::Data(1)));
        let ca65 = SyntaxDef::get(Syntax::Ca65);
        assert_eq!(ca65.keyword(".IfDef"), Some(Keyword::If(Test::Defined)));
        assert_eq!(ca65.keyword("ifdef"), None);
    }

    #[test]
    fn groups_know_their_close() {
        let def = SyntaxDef::get(Syntax::Dasm);
        assert_eq!(def.unary_op("[").unwrap().close, Some("]"));
        assert_eq!(def.unary_op("(").unwrap().close, Some(")"));
    }
}
