use std::collections::HashMap;

use arch::Syntax;

use super::{
    keywords, ops, AnonStyle, Args, Keyword, LabelColon, OpcodeSuffix, SyntaxDef, Test, VarArgs,
    UNARY_PRE,
};
use crate::expr::OpKind::*;

pub(super) fn table() -> SyntaxDef {
    SyntaxDef {
        syntax: Syntax::Dasm,
        keywords: keywords(&[
            ("PROCESSOR", Keyword::Other(Args::Raw)),
            ("ORG", Keyword::Org),
            ("RORG", Keyword::Org),
            ("REND", Keyword::Other(Args::None)),
            ("SEG", Keyword::Other(Args::Raw)),
            ("SEG.U", Keyword::Other(Args::Raw)),
            ("EQU", Keyword::Equ),
            ("EQM", Keyword::Equ),
            ("SET", Keyword::Set),
            ("DC", Keyword::Data(1)),
            ("DC.B", Keyword::Data(1)),
            ("BYTE", Keyword::Data(1)),
            ("DC.W", Keyword::Data(2)),
            ("WORD", Keyword::Data(2)),
            ("DC.L", Keyword::Data(4)),
            ("LONG", Keyword::Data(4)),
            ("DS", Keyword::Storage),
            ("DS.B", Keyword::Storage),
            ("DS.W", Keyword::Storage),
            ("DS.L", Keyword::Storage),
            ("DV", Keyword::Other(Args::Exprs)),
            ("HEX", Keyword::Hex),
            ("ALIGN", Keyword::Align),
            ("INCLUDE", Keyword::Include),
            ("INCBIN", Keyword::IncludeBinary),
            ("INCDIR", Keyword::Other(Args::Raw)),
            ("IF", Keyword::If(Test::NonZero)),
            ("IFCONST", Keyword::If(Test::Defined)),
            ("IFNCONST", Keyword::If(Test::Undefined)),
            ("ELSE", Keyword::Else),
            ("ENDIF", Keyword::Endif),
            ("EIF", Keyword::Endif),
            ("REPEAT", Keyword::Repeat),
            ("REPEND", Keyword::EndRepeat),
            ("MAC", Keyword::Macro),
            ("MACRO", Keyword::Macro),
            ("ENDM", Keyword::EndMacro),
            ("MEXIT", Keyword::Other(Args::None)),
            ("SUBROUTINE", Keyword::Subroutine),
            ("ECHO", Keyword::Other(Args::Exprs)),
            ("ERR", Keyword::Other(Args::None)),
            ("LIST", Keyword::Other(Args::Raw)),
            ("TRACE", Keyword::Other(Args::Raw)),
            ("END", Keyword::Other(Args::None)),
        ]),
        unary: ops(&[
            ("-", Neg, UNARY_PRE, true),
            ("~", BitNot, UNARY_PRE, true),
            ("!", LogNot, UNARY_PRE, true),
            ("<", Low, UNARY_PRE, true),
            (">", High, UNARY_PRE, true),
            ("(", Group, 0, false),
            ("[", Group, 0, false),
        ]),
        binary: ops(&[
            ("*", Mul, 10, false),
            ("/", Div, 10, false),
            ("%", Mod, 10, false),
            ("+", Add, 9, false),
            ("-", Sub, 9, false),
            ("<<", Shl, 8, false),
            (">>", Shr, 8, false),
            ("<", Lt, 7, false),
            (">", Gt, 7, false),
            ("<=", Le, 7, false),
            (">=", Ge, 7, false),
            ("==", Eq, 6, false),
            ("=", Eq, 6, false),
            ("!=", Ne, 6, false),
            ("&", And, 5, false),
            ("^", Xor, 4, false),
            ("|", Or, 3, false),
            ("&&", LogAnd, 2, false),
            ("||", LogOr, 1, false),
        ]),
        functions: HashMap::new(),

        cheap_prefix: None,
        zone_prefix: Some('.'),
        zone_suffix: Some('$'),
        var_prefix: None,
        anon: AnonStyle::None,
        var_args: VarArgs::Brace,
        scope_sep: ".",

        keyword_column1: false,
        label_colon: LabelColon::Optional,
        indented_assignment: true,
        line_continuation: false,
        macro_prefix: None,
        escapes: "",
        symbol_start: ".",
        symbol_continue: ".$",
        pc_symbols: "*.",
        high_ascii_dquote: false,
        opcode_suffix: OpcodeSuffix::Dot,
        width_prefix: false,
        dot_keywords: true,
        bare_filenames: false,
        brace_blocks: false,
        list_literals: false,
    }
}
