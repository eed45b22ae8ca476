use std::collections::HashMap;

use arch::Syntax;

use super::{
    keywords, ops, AnonStyle, Args, Keyword, LabelColon, OpcodeSuffix, SyntaxDef, Test, VarArgs,
    UNARY_PRE,
};
use crate::expr::OpKind::*;

pub(super) fn table() -> SyntaxDef {
    SyntaxDef {
        syntax: Syntax::Merlin,
        keywords: keywords(&[
            ("ORG", Keyword::Org),
            ("EQU", Keyword::Equ),
            ("DS", Keyword::Storage),
            ("DFB", Keyword::Data(1)),
            ("DB", Keyword::Data(1)),
            ("DA", Keyword::Data(2)),
            ("DW", Keyword::Data(2)),
            ("DDB", Keyword::DataBE(2)),
            ("ADR", Keyword::Data(3)),
            ("ADRL", Keyword::Data(4)),
            ("HEX", Keyword::Hex),
            ("ASC", Keyword::Text),
            ("DCI", Keyword::Text),
            ("INV", Keyword::Text),
            ("FLS", Keyword::Text),
            ("REV", Keyword::Text),
            ("STR", Keyword::Text),
            ("STRL", Keyword::Text),
            ("PUT", Keyword::Include),
            ("USE", Keyword::Include),
            ("PUTBIN", Keyword::IncludeBinary),
            ("DO", Keyword::If(Test::NonZero)),
            ("IF", Keyword::If(Test::NonZero)),
            ("ELSE", Keyword::Else),
            ("FIN", Keyword::Endif),
            ("LUP", Keyword::Repeat),
            ("--^", Keyword::EndRepeat),
            ("MAC", Keyword::Macro),
            ("EOM", Keyword::EndMacro),
            ("<<<", Keyword::EndMacro),
            ("PMC", Keyword::InvokeMacro),
            (">>>", Keyword::InvokeMacro),
            ("ENT", Keyword::Entry),
            ("EXT", Keyword::Import),
            ("EXD", Keyword::Import),
            ("DUM", Keyword::Other(Args::Exprs)),
            ("DEND", Keyword::Other(Args::None)),
            ("MX", Keyword::Other(Args::Exprs)),
            ("XC", Keyword::Other(Args::Raw)),
            ("LST", Keyword::Other(Args::Raw)),
            ("LSTDO", Keyword::Other(Args::Raw)),
            ("EXP", Keyword::Other(Args::Raw)),
            ("TR", Keyword::Other(Args::Raw)),
            ("PAG", Keyword::Other(Args::None)),
            ("AST", Keyword::Other(Args::Exprs)),
            ("SKP", Keyword::Other(Args::Exprs)),
            ("CYC", Keyword::Other(Args::Raw)),
            ("TTL", Keyword::Other(Args::Raw)),
            ("DSK", Keyword::Other(Args::Raw)),
            ("SAV", Keyword::Other(Args::Raw)),
            ("TYP", Keyword::Other(Args::Exprs)),
            ("OBJ", Keyword::Other(Args::Exprs)),
            ("REL", Keyword::Other(Args::None)),
            ("LNK", Keyword::Other(Args::Raw)),
            ("ERR", Keyword::Other(Args::Exprs)),
            ("CHK", Keyword::Other(Args::None)),
            ("USR", Keyword::Other(Args::Exprs)),
            ("KBD", Keyword::Other(Args::Raw)),
            ("PAU", Keyword::Other(Args::None)),
            ("SW", Keyword::Other(Args::None)),
            ("END", Keyword::Other(Args::None)),
        ]),
        unary: ops(&[
            ("-", Neg, UNARY_PRE, true),
            ("<", Low, UNARY_PRE, true),
            (">", High, UNARY_PRE, true),
            ("^", Bank, UNARY_PRE, true),
            ("(", Group, 0, false),
            ("{", Group, 0, false),
        ]),
        binary: ops(&[
            ("*", Mul, 10, false),
            ("/", Div, 10, false),
            ("+", Add, 9, false),
            ("-", Sub, 9, false),
            ("<", Lt, 6, false),
            (">", Gt, 6, false),
            ("=", Eq, 6, false),
            ("#", Ne, 6, false),
            ("&", And, 5, false),
            ("!", Xor, 4, false),
            (".", Or, 3, false),
        ]),
        functions: HashMap::new(),

        cheap_prefix: Some(':'),
        zone_prefix: None,
        zone_suffix: None,
        var_prefix: Some(']'),
        anon: AnonStyle::None,
        var_args: VarArgs::Bracket,
        scope_sep: ".",

        keyword_column1: false,
        label_colon: LabelColon::Never,
        indented_assignment: false,
        line_continuation: false,
        macro_prefix: None,
        escapes: "",
        symbol_start: ":]",
        symbol_continue: "",
        pc_symbols: "*",
        high_ascii_dquote: true,
        opcode_suffix: OpcodeSuffix::Letter,
        width_prefix: false,
        dot_keywords: false,
        bare_filenames: true,
        brace_blocks: false,
        list_literals: false,
    }
}
