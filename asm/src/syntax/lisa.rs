use std::collections::HashMap;

use arch::Syntax;

use super::{
    keywords, ops, AnonStyle, Args, Keyword, LabelColon, OpcodeSuffix, SyntaxDef, Test, VarArgs,
    UNARY_PRE,
};
use crate::expr::OpKind::*;

// Every LISA binary operator groups right to left.
pub(super) fn table() -> SyntaxDef {
    SyntaxDef {
        syntax: Syntax::Lisa,
        keywords: keywords(&[
            ("ORG", Keyword::Org),
            ("OBJ", Keyword::Other(Args::Exprs)),
            ("EQU", Keyword::Equ),
            ("EPZ", Keyword::EquZp),
            ("ADR", Keyword::Data(2)),
            ("BYT", Keyword::Data(1)),
            ("HBY", Keyword::Data(1)),
            ("DBY", Keyword::DataBE(2)),
            ("STR", Keyword::Text),
            ("ASC", Keyword::Text),
            ("DCI", Keyword::Text),
            ("INV", Keyword::Text),
            ("BLK", Keyword::Text),
            ("HEX", Keyword::Hex),
            ("DFS", Keyword::Storage),
            ("ICL", Keyword::Include),
            ("IFEQ", Keyword::If(Test::Zero)),
            ("IFNE", Keyword::If(Test::NonZero)),
            ("IFPL", Keyword::If(Test::Positive)),
            ("IFMI", Keyword::If(Test::Negative)),
            ("ELSE", Keyword::Else),
            ("FIN", Keyword::Endif),
            ("END", Keyword::Other(Args::None)),
            ("LST", Keyword::Other(Args::None)),
            ("NLS", Keyword::Other(Args::None)),
            ("PAG", Keyword::Other(Args::None)),
            ("PAU", Keyword::Other(Args::None)),
            ("GEN", Keyword::Other(Args::None)),
            ("NOG", Keyword::Other(Args::None)),
            ("SBTL", Keyword::Other(Args::Raw)),
            ("USR", Keyword::Other(Args::Exprs)),
        ]),
        unary: ops(&[
            ("-", Neg, UNARY_PRE, true),
            ("/", High, UNARY_PRE, true),
            ("(", Group, 0, false),
        ]),
        binary: ops(&[
            ("*", Mul, 10, true),
            ("/", Div, 10, true),
            ("+", Add, 9, true),
            ("-", Sub, 9, true),
            ("&", And, 5, true),
            ("^", Xor, 4, true),
            ("|", Or, 3, true),
        ]),
        functions: HashMap::new(),

        cheap_prefix: None,
        zone_prefix: None,
        zone_suffix: None,
        var_prefix: None,
        anon: AnonStyle::Lisa,
        var_args: VarArgs::None,
        scope_sep: ".",

        keyword_column1: false,
        label_colon: LabelColon::Never,
        indented_assignment: false,
        line_continuation: false,
        macro_prefix: None,
        escapes: "",
        symbol_start: "",
        symbol_continue: "",
        pc_symbols: "*",
        high_ascii_dquote: true,
        opcode_suffix: OpcodeSuffix::None,
        width_prefix: false,
        dot_keywords: false,
        bare_filenames: true,
        brace_blocks: false,
        list_literals: false,
    }
}
