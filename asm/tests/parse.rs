use asm65::statement::StmtKind;
use asm65::symbol::SymbolTable;
use asm65::{parse_line, Syntax};

/// Every non-blank character of `code` belongs to exactly one token.
fn assert(code: &str, syntax: Syntax) {
    let stmt = parse_line(code, syntax);
    println!(" {code}");
    for token in stmt.tokens() {
        print!("\r\x1b[{}C^", token.start + 1);
    }
    println!();
    for (idx, token) in stmt.tokens().iter().enumerate() {
        println!("{:>2}: {:?} {:?}", idx, token.ty, token.text);
    }

    let mut covered = vec![false; code.len()];
    let mut last_end = 0;
    for token in stmt.tokens() {
        if token.start == token.end {
            continue;
        }
        assert!(token.start >= last_end, "overlap at {}", token.start);
        assert_eq!(&code[token.start..token.end], token.text);
        covered[token.start..token.end].fill(true);
        last_end = token.end;
    }
    for (idx, ch) in code.char_indices() {
        if !ch.is_whitespace() {
            assert!(covered[idx], "{:?} at {} not covered", ch, idx);
        }
    }
}

macro_rules! case {
    ($name:ident, $syntax:expr, $code:expr) => {
        #[test]
        fn $name() {
            assert($code, $syntax);
        }
    };
}

case!(merlin_immediate, Syntax::Merlin, "START    LDA  #$10       ; load");
case!(merlin_indexed, Syntax::Merlin, "         STA  TABLE,X");
case!(merlin_indirect_y, Syntax::Merlin, "         LDA  (PTR),Y");
case!(merlin_equate, Syntax::Merlin, "COUNT    EQU  $20");
case!(dasm_local, Syntax::Dasm, ".loop   dex");
case!(dasm_byte_list, Syntax::Dasm, "        .byte 1, 2, 3");
case!(ca65_label_colon, Syntax::Ca65, "start:  lda #<(table+1)");
case!(ca65_proc, Syntax::Ca65, ".proc main");
case!(acme_for, Syntax::Acme, "!for i, 1, 3 {");
case!(acme_text, Syntax::Acme, "        !text \"hi\", 0");
case!(lisa_equate, Syntax::Lisa, "PTR      EPZ  $06");
case!(merlin_inner_semicolon, Syntax::Merlin, "         LDA  FOO;X  ; real comment");

fn value(code: &str, syntax: Syntax) -> Option<i64> {
    let stmt = parse_line(code, syntax);
    match &stmt.kind {
        StmtKind::Equate { value, .. } | StmtKind::Variable { value } => {
            value.resolve(&SymbolTable::new())
        }
        other => panic!("not an assignment: {:?}", other),
    }
}

#[test]
fn precedence_by_dialect() {
    assert_eq!(value("X        EQU  1+2*3", Syntax::Merlin), Some(7));
    assert_eq!(value("X       EQU 1+2*3", Syntax::Dasm), Some(7));
    assert_eq!(value("X = 1+2*3", Syntax::Ca65), Some(7));
    assert_eq!(value("X = 1+2*3", Syntax::Acme), Some(7));
    assert_eq!(value("X = (1+2)*3", Syntax::Ca65), Some(9));
}

#[test]
fn lisa_groups_right() {
    assert_eq!(value("X        EQU  8-4-2", Syntax::Lisa), Some(6));
    assert_eq!(value("X       EQU 8-4-2", Syntax::Dasm), Some(2));
}

#[test]
fn opcode_forms() {
    let stmt = parse_line("         LDA  (PTR),Y", Syntax::Merlin);
    let StmtKind::Opcode(op) = &stmt.kind else {
        panic!("{:?}", stmt.kind);
    };
    assert_eq!(op.op, arch::Op::LDA);
    assert_eq!(op.form, asm65::statement::OperandForm::IndirectY);

    let stmt = parse_line("         ASL", Syntax::Merlin);
    let StmtKind::Opcode(op) = &stmt.kind else {
        panic!("{:?}", stmt.kind);
    };
    assert_eq!(op.form, asm65::statement::OperandForm::Accumulator);
}

#[test]
fn ca65_label_needs_colon() {
    assert!(!parse_line("start:  rts", Syntax::Ca65).has_error());
    assert!(parse_line("start   rts", Syntax::Ca65).has_error());
}

#[test]
fn merlin_macro_beats_width_suffix() {
    let incw = |name: &str| name == "INCW";
    let stmt = asm65::parser::parse_line_with("         INCW $10", Syntax::Merlin, &incw);
    assert!(matches!(stmt.kind, StmtKind::MacroInvoke { .. }), "{:?}", stmt.kind);

    let stmt = parse_line("         INCW $10", Syntax::Merlin);
    let StmtKind::Opcode(op) = &stmt.kind else {
        panic!("{:?}", stmt.kind);
    };
    assert_eq!(op.op, arch::Op::INC);
    assert_eq!(op.width, Some(2));
}

#[test]
fn merlin_semicolon_inside_operand() {
    let stmt = parse_line("         LDA  FOO;X", Syntax::Merlin);
    assert!(!stmt.has_error());
    assert!(stmt.comment.is_none());
}
