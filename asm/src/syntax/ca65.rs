use std::collections::HashMap;

use arch::Syntax;

use super::{
    keywords, ops, AnonStyle, Args, Keyword, LabelColon, OpcodeSuffix, SyntaxDef, Test, VarArgs,
    UNARY_PRE,
};
use crate::expr::OpKind::{self, *};

pub(super) fn table() -> SyntaxDef {
    SyntaxDef {
        syntax: Syntax::Ca65,
        keywords: keywords(&[
            (".ORG", Keyword::Org),
            (".SET", Keyword::Set),
            (".DEFINE", Keyword::Define),
            (".BYTE", Keyword::Data(1)),
            (".BYT", Keyword::Data(1)),
            (".DB", Keyword::Data(1)),
            (".WORD", Keyword::Data(2)),
            (".DW", Keyword::Data(2)),
            (".ADDR", Keyword::Data(2)),
            (".DBYT", Keyword::DataBE(2)),
            (".FARADDR", Keyword::Data(3)),
            (".DWORD", Keyword::Data(4)),
            (".RES", Keyword::Storage),
            (".ALIGN", Keyword::Align),
            (".ASCIIZ", Keyword::Text),
            (".INCLUDE", Keyword::Include),
            (".INCBIN", Keyword::IncludeBinary),
            (".IF", Keyword::If(Test::NonZero)),
            (".IFDEF", Keyword::If(Test::Defined)),
            (".IFNDEF", Keyword::If(Test::Undefined)),
            (".ELSEIF", Keyword::Elif(Test::NonZero)),
            (".ELSE", Keyword::Else),
            (".ENDIF", Keyword::Endif),
            (".REPEAT", Keyword::Repeat),
            (".REPT", Keyword::Repeat),
            (".ENDREP", Keyword::EndRepeat),
            (".ENDREPEAT", Keyword::EndRepeat),
            (".MACRO", Keyword::Macro),
            (".MAC", Keyword::Macro),
            (".ENDMACRO", Keyword::EndMacro),
            (".ENDMAC", Keyword::EndMacro),
            (".SCOPE", Keyword::Scope),
            (".ENDSCOPE", Keyword::EndScope),
            (".PROC", Keyword::Proc),
            (".ENDPROC", Keyword::EndProc),
            (".STRUCT", Keyword::Struct),
            (".ENDSTRUCT", Keyword::EndStruct),
            (".ENUM", Keyword::Struct),
            (".ENDENUM", Keyword::EndStruct),
            (".EXPORT", Keyword::Entry),
            (".EXPORTZP", Keyword::Entry),
            (".GLOBAL", Keyword::Entry),
            (".GLOBALZP", Keyword::Entry),
            (".IMPORT", Keyword::Import),
            (".IMPORTZP", Keyword::Import),
            (".SEGMENT", Keyword::Other(Args::Exprs)),
            (".CODE", Keyword::Other(Args::None)),
            (".DATA", Keyword::Other(Args::None)),
            (".BSS", Keyword::Other(Args::None)),
            (".RODATA", Keyword::Other(Args::None)),
            (".ZEROPAGE", Keyword::Other(Args::None)),
            (".SETCPU", Keyword::Other(Args::Exprs)),
            (".P02", Keyword::Other(Args::None)),
            (".PC02", Keyword::Other(Args::None)),
            (".A8", Keyword::Other(Args::None)),
            (".A16", Keyword::Other(Args::None)),
            (".I8", Keyword::Other(Args::None)),
            (".I16", Keyword::Other(Args::None)),
            (".ASSERT", Keyword::Other(Args::Raw)),
            (".ERROR", Keyword::Other(Args::Exprs)),
            (".WARNING", Keyword::Other(Args::Exprs)),
            (".OUT", Keyword::Other(Args::Exprs)),
            (".FEATURE", Keyword::Other(Args::Raw)),
            (".LINECONT", Keyword::Other(Args::Raw)),
            (".LIST", Keyword::Other(Args::Raw)),
            (".LISTBYTES", Keyword::Other(Args::Raw)),
            (".LOCAL", Keyword::Other(Args::Raw)),
            (".LOCALCHAR", Keyword::Other(Args::Raw)),
            (".FILEOPT", Keyword::Other(Args::Raw)),
            (".DEBUGINFO", Keyword::Other(Args::Raw)),
            (".CHARMAP", Keyword::Other(Args::Exprs)),
            (".TAG", Keyword::Other(Args::Exprs)),
            (".RELOC", Keyword::Other(Args::None)),
            (".EXITMACRO", Keyword::Other(Args::None)),
            (".EXITMAC", Keyword::Other(Args::None)),
            (".END", Keyword::Other(Args::None)),
        ]),
        unary: ops(&[
            ("-", Neg, UNARY_PRE, true),
            ("+", Pos, UNARY_PRE, true),
            ("~", BitNot, UNARY_PRE, true),
            (".BITNOT", BitNot, UNARY_PRE, true),
            ("!", LogNot, UNARY_PRE, true),
            (".NOT", LogNot, UNARY_PRE, true),
            ("<", Low, UNARY_PRE, true),
            (">", High, UNARY_PRE, true),
            ("^", Bank, UNARY_PRE, true),
            ("(", Group, 0, false),
        ]),
        binary: ops(&[
            ("*", Mul, 10, false),
            ("/", Div, 10, false),
            (".MOD", Mod, 10, false),
            ("&", And, 10, false),
            (".BITAND", And, 10, false),
            ("^", Xor, 10, false),
            (".BITXOR", Xor, 10, false),
            ("<<", Shl, 10, false),
            (".SHL", Shl, 10, false),
            (">>", Shr, 10, false),
            (".SHR", Shr, 10, false),
            ("+", Add, 9, false),
            ("-", Sub, 9, false),
            ("|", Or, 9, false),
            (".BITOR", Or, 9, false),
            ("=", Eq, 6, false),
            ("<>", Ne, 6, false),
            ("<", Lt, 6, false),
            (">", Gt, 6, false),
            ("<=", Le, 6, false),
            (">=", Ge, 6, false),
            ("&&", LogAnd, 2, false),
            (".AND", LogAnd, 2, false),
            (".XOR", LogXor, 2, false),
            ("||", LogOr, 1, false),
            (".OR", LogOr, 1, false),
        ]),
        functions: functions(),

        cheap_prefix: Some('@'),
        zone_prefix: None,
        zone_suffix: None,
        var_prefix: None,
        anon: AnonStyle::Ca65,
        var_args: VarArgs::None,
        scope_sep: "::",

        keyword_column1: true,
        label_colon: LabelColon::Required,
        indented_assignment: true,
        line_continuation: true,
        macro_prefix: None,
        escapes: "\\\"'tnrx",
        symbol_start: "@.",
        symbol_continue: "",
        pc_symbols: "*",
        high_ascii_dquote: false,
        opcode_suffix: OpcodeSuffix::None,
        width_prefix: true,
        dot_keywords: false,
        bare_filenames: false,
        brace_blocks: false,
        list_literals: false,
    }
}

fn functions() -> HashMap<&'static str, OpKind> {
    [
        (".DEFINED", Defined),
        (".DEF", Defined),
        (".LOBYTE", Low),
        (".HIBYTE", High),
        (".BANKBYTE", Bank),
        (".STRLEN", Strlen),
    ]
    .into_iter()
    .collect()
}
