use std::collections::HashMap;

use arch::Syntax;

use super::{
    keywords, ops, AnonStyle, Args, Keyword, LabelColon, OpcodeSuffix, SyntaxDef, Test, VarArgs,
    UNARY_PRE,
};
use crate::expr::OpKind::*;

pub(super) fn table() -> SyntaxDef {
    SyntaxDef {
        syntax: Syntax::Acme,
        keywords: keywords(&[
            ("!TO", Keyword::Other(Args::Raw)),
            ("!SL", Keyword::Other(Args::Raw)),
            ("!CPU", Keyword::Other(Args::Raw)),
            ("!INITMEM", Keyword::Other(Args::Exprs)),
            ("!PSEUDOPC", Keyword::Org),
            ("!REALPC", Keyword::Other(Args::None)),
            ("!BYTE", Keyword::Data(1)),
            ("!BY", Keyword::Data(1)),
            ("!08", Keyword::Data(1)),
            ("!8", Keyword::Data(1)),
            ("!WORD", Keyword::Data(2)),
            ("!WO", Keyword::Data(2)),
            ("!16", Keyword::Data(2)),
            ("!LE16", Keyword::Data(2)),
            ("!BE16", Keyword::DataBE(2)),
            ("!24", Keyword::Data(3)),
            ("!LE24", Keyword::Data(3)),
            ("!BE24", Keyword::DataBE(3)),
            ("!32", Keyword::Data(4)),
            ("!LE32", Keyword::Data(4)),
            ("!BE32", Keyword::DataBE(4)),
            ("!HEX", Keyword::Hex),
            ("!H", Keyword::Hex),
            ("!FILL", Keyword::Storage),
            ("!FI", Keyword::Storage),
            ("!SKIP", Keyword::Storage),
            ("!ALIGN", Keyword::Align),
            ("!TEXT", Keyword::Text),
            ("!TX", Keyword::Text),
            ("!RAW", Keyword::Text),
            ("!PET", Keyword::Text),
            ("!SCR", Keyword::Text),
            ("!SCRXOR", Keyword::Text),
            ("!SOURCE", Keyword::Include),
            ("!SRC", Keyword::Include),
            ("!BINARY", Keyword::IncludeBinary),
            ("!BIN", Keyword::IncludeBinary),
            ("!ZONE", Keyword::Zone),
            ("!ZN", Keyword::Zone),
            ("!IF", Keyword::If(Test::NonZero)),
            ("!IFDEF", Keyword::If(Test::Defined)),
            ("!IFNDEF", Keyword::If(Test::Undefined)),
            ("!FOR", Keyword::Repeat),
            ("!DO", Keyword::Other(Args::Raw)),
            ("!WHILE", Keyword::Other(Args::Raw)),
            ("!MACRO", Keyword::Macro),
            ("!SET", Keyword::Set),
            ("!ADDR", Keyword::Other(Args::Raw)),
            ("!ADDRESS", Keyword::Other(Args::Raw)),
            ("!EOF", Keyword::Other(Args::None)),
            ("!ENDOFFILE", Keyword::Other(Args::None)),
            ("!WARN", Keyword::Other(Args::Exprs)),
            ("!ERROR", Keyword::Other(Args::Exprs)),
            ("!SERIOUS", Keyword::Other(Args::Exprs)),
            ("!CT", Keyword::Other(Args::Raw)),
            ("!CONVTAB", Keyword::Other(Args::Raw)),
            ("}", Keyword::BlockClose),
        ]),
        unary: ops(&[
            ("-", Neg, UNARY_PRE, true),
            ("!", BitNot, UNARY_PRE, true),
            ("NOT", BitNot, UNARY_PRE, true),
            ("<", Low, UNARY_PRE, true),
            (">", High, UNARY_PRE, true),
            ("^", Bank, UNARY_PRE, true),
            ("(", Group, 0, false),
        ]),
        binary: ops(&[
            ("^", Pow, 11, true),
            ("*", Mul, 10, false),
            ("/", Div, 10, false),
            ("DIV", Div, 10, false),
            ("%", Mod, 10, false),
            ("MOD", Mod, 10, false),
            ("+", Add, 9, false),
            ("-", Sub, 9, false),
            ("<<", Shl, 8, false),
            ("ASL", Shl, 8, false),
            ("LSL", Shl, 8, false),
            (">>", Shr, 8, false),
            ("ASR", Shr, 8, false),
            (">>>", Lsr, 8, false),
            ("LSR", Lsr, 8, false),
            ("<=", Le, 7, false),
            ("<", Lt, 7, false),
            (">=", Ge, 7, false),
            (">", Gt, 7, false),
            ("!=", Ne, 7, false),
            ("<>", Ne, 7, false),
            ("><", Ne, 7, false),
            ("=", Eq, 7, false),
            ("&", And, 5, false),
            ("AND", And, 5, false),
            ("XOR", Xor, 4, false),
            ("|", Or, 3, false),
            ("OR", Or, 3, false),
        ]),
        functions: HashMap::new(),

        cheap_prefix: Some('@'),
        zone_prefix: Some('.'),
        zone_suffix: None,
        var_prefix: None,
        anon: AnonStyle::Acme,
        var_args: VarArgs::None,
        scope_sep: ".",

        keyword_column1: true,
        label_colon: LabelColon::Optional,
        indented_assignment: true,
        line_continuation: false,
        macro_prefix: Some('+'),
        escapes: "\\\"'0tnr",
        symbol_start: "!.@",
        symbol_continue: "",
        pc_symbols: "*",
        high_ascii_dquote: false,
        opcode_suffix: OpcodeSuffix::Plus,
        width_prefix: false,
        dot_keywords: false,
        bare_filenames: false,
        brace_blocks: true,
        list_literals: true,
    }
}
