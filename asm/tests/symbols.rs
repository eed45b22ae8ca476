use asm65::{assemble, Config, MemoryProvider, Module, Syntax};

fn run(syntax: Syntax, code: &str) -> Module {
    let provider = MemoryProvider::new().with("main.s", code);
    let module = assemble("main.s", &Config::with_syntax(syntax), &provider).unwrap();
    for (idx, line) in code.lines().enumerate() {
        println!("{:>2}: {}", idx, line);
    }
    for diagnostic in module.diagnostics() {
        println!("{:?}", diagnostic);
    }
    module
}

fn errors(module: &Module) -> Vec<String> {
    module
        .diagnostics()
        .into_iter()
        .filter(|d| d.severity.is_error())
        .map(|d| d.message)
        .collect()
}

/// Assemble `code` cleanly and check that each of `names` was defined.
fn assert(syntax: Syntax, code: &str, names: &[&str]) {
    let module = run(syntax, code);
    assert!(errors(&module).is_empty(), "{:?}", errors(&module));
    for name in names {
        assert!(
            module.symbols().find(name).is_some(),
            "{} missing from {:?}",
            name,
            module.symbols().iter().map(|(_, s)| &s.name).collect::<Vec<_>>()
        );
    }
}

macro_rules! case {
    ($name:ident, $syntax:expr, $code:expr, $names:expr) => {
        #[test]
        fn $name() {
            assert($syntax, $code, &$names);
        }
    };
}

case!(
    merlin_cheap_locals,
    Syntax::Merlin,
    "\
MAIN     LDX  #0
:LOOP1   DEX
         BNE  :LOOP1
NEXT     LDY  #0
:LOOP1   DEY
         BNE  :LOOP1
",
    ["MAIN", "NEXT", "MAIN:LOOP1", "NEXT:LOOP1"]
);

case!(
    dasm_subroutine_zones,
    Syntax::Dasm,
    "\
START   SUBROUTINE
.loop   dex
        bne .loop
OTHER   SUBROUTINE
.loop   dey
        bne .loop
",
    ["START", "OTHER", "START.loop", "OTHER.loop"]
);

case!(
    ca65_anonymous,
    Syntax::Ca65,
    "\
:       dex
        bne :-
        beq :+
:       rts
",
    [":#0", ":#1"]
);

case!(
    acme_anonymous,
    Syntax::Acme,
    "\
-       dex
        bne -
        beq +
+       rts
",
    ["-1#0", "+1#0"]
);

case!(
    forward_reference,
    Syntax::Merlin,
    "         JMP  FOO
FOO      RTS
",
    ["FOO"]
);

#[test]
fn duplicate_marks_both() {
    let module = run(
        Syntax::Merlin,
        "\
FOO      LDA  #1
FOO      LDA  #2
",
    );
    let lines: Vec<usize> = module
        .diagnostics()
        .into_iter()
        .filter(|d| d.message == "Duplicate label")
        .map(|d| d.line)
        .collect();
    assert_eq!(lines, vec![0, 1]);
}

#[test]
fn missing_label() {
    let module = run(Syntax::Merlin, "         JMP  BAR\n");
    assert_eq!(errors(&module), vec!["Label not found".to_string()]);
}

#[test]
fn references_and_usage() {
    let module = run(
        Syntax::Merlin,
        "\
PTR      EQU  $06
         JSR  INIT
         LDA  PTR
         RTS
INIT     LDA  #PTR
         RTS
",
    );
    let ptr = module.symbols().by_name("PTR").unwrap();
    assert_eq!(ptr.references.len(), 2);
    assert!(ptr.flags.zpage);
    assert!(ptr.flags.data);
    assert!(ptr.flags.constant);

    let init = module.symbols().by_name("INIT").unwrap();
    assert!(init.flags.subroutine);
    assert_eq!(init.definition.line, 4);
}

#[test]
fn equates_resolve_in_order() {
    let module = run(
        Syntax::Ca65,
        "\
SIZE = 4
AREA = SIZE * SIZE
",
    );
    let symbols = module.symbols();
    let area = symbols.find("AREA").unwrap();
    assert_eq!(symbols.resolve(area), Some(16));
}

#[test]
fn variables_read_where_used() {
    let module = run(
        Syntax::Merlin,
        "\
]N       =    1
FIRST    EQU  ]N
]N       =    ]N+1
SECOND   EQU  ]N
",
    );
    let symbols = module.symbols();
    assert_eq!(symbols.resolve(symbols.find("FIRST").unwrap()), Some(1));
    assert_eq!(symbols.resolve(symbols.find("SECOND").unwrap()), Some(2));
}

#[test]
fn unused_local_is_info() {
    let module = run(
        Syntax::Merlin,
        "\
MAIN     RTS
:SKIP    RTS
",
    );
    let notes: Vec<_> = module
        .diagnostics()
        .into_iter()
        .filter(|d| d.message == "Unused local label")
        .collect();
    assert_eq!(notes.len(), 1);
    assert!(!notes[0].severity.is_error());
}

#[test]
fn ca65_scopes_qualify_names() {
    let module = run(
        Syntax::Ca65,
        "\
.proc main
inner:  rts
.endproc
        jmp main
",
    );
    assert!(errors(&module).is_empty(), "{:?}", errors(&module));
    assert!(module.symbols().find("main").is_some());
    assert!(module
        .symbols()
        .iter()
        .any(|(_, s)| s.name != "inner" && s.name.ends_with("inner")));
}
