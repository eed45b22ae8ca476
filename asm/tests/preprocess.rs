use asm65::module::StmtRef;
use asm65::statement::StmtKind;
use std::rc::Rc;

use asm65::{assemble, Config, Error, MemoryProvider, Module, SourceProvider, Syntax};

fn run_with(config: &Config, provider: &MemoryProvider) -> Module {
    let module = assemble("main.s", config, provider).unwrap();
    for record in module.lines() {
        println!(
            "{:>2}:{:<3} {} {}",
            record.file,
            record.line,
            if record.enabled { ' ' } else { '-' },
            module.text(record.stmt)
        );
    }
    for diagnostic in module.diagnostics() {
        println!("{:?}", diagnostic);
    }
    module
}

fn run(syntax: Syntax, code: &str) -> Module {
    run_with(
        &Config::with_syntax(syntax),
        &MemoryProvider::new().with("main.s", code),
    )
}

fn errors(module: &Module) -> Vec<String> {
    module
        .diagnostics()
        .into_iter()
        .filter(|d| d.severity.is_error())
        .map(|d| d.message)
        .collect()
}

fn kind(module: &Module, line: usize) -> &StmtKind {
    &module.statement(StmtRef::File(0, line)).unwrap().kind
}

/// Values of every assembled data statement, in traversal order.
fn data(module: &Module) -> Vec<i64> {
    let mut out = Vec::new();
    for at in module.statement_refs(true) {
        if let Some(StmtKind::Data { values, .. }) = module.statement(at).map(|s| &s.kind) {
            out.extend(values.iter().filter_map(|v| v.resolve(module.symbols())));
        }
    }
    out
}

// ----------------------------------------------------------------------------
// Conditionals
// ----------------------------------------------------------------------------

#[test]
fn else_branch_disabled() {
    let module = run(
        Syntax::Merlin,
        "         DO   1
         LDA  #1
         ELSE
         LDA  #2
         FIN
",
    );
    assert!(errors(&module).is_empty());
    assert!(matches!(kind(&module, 1), StmtKind::Opcode(_)));
    assert_eq!(kind(&module, 3), &StmtKind::Disabled);
    assert!(module.lines().iter().all(|r| r.enabled == (r.line != 3)));
}

#[test]
fn false_branch_disabled() {
    let module = run(
        Syntax::Merlin,
        "         DO   0
         LDA  #1
         ELSE
         LDA  #2
         FIN
",
    );
    assert!(errors(&module).is_empty(), "{:?}", errors(&module));
    assert_eq!(kind(&module, 1), &StmtKind::Disabled);
    assert!(matches!(kind(&module, 3), StmtKind::Opcode(_)));
    assert!(module.lines().iter().all(|r| r.enabled == (r.line != 1)));
}

#[test]
fn label_on_conditional_line() {
    let module = run(
        Syntax::Merlin,
        "FOO      DO   1
         NOP
         FIN
         JMP  FOO
",
    );
    assert!(errors(&module).is_empty(), "{:?}", errors(&module));
    let foo = module.symbols().by_name("FOO").unwrap();
    assert_eq!(foo.definition.line, 0);
    assert_eq!(foo.references.len(), 1);
}

#[test]
fn elseif_chain() {
    let module = run(
        Syntax::Ca65,
        "\
MODE = 2
.if MODE = 1
        lda #1
.elseif MODE = 2
        lda #2
.else
        lda #3
.endif
",
    );
    assert!(errors(&module).is_empty(), "{:?}", errors(&module));
    assert_eq!(kind(&module, 2), &StmtKind::Disabled);
    assert!(matches!(kind(&module, 4), StmtKind::Opcode(_)));
    assert_eq!(kind(&module, 6), &StmtKind::Disabled);
}

#[test]
fn undefined_symbol_test() {
    let module = run(
        Syntax::Dasm,
        "        IFCONST FOO
        lda #1
        ENDIF
",
    );
    assert!(errors(&module).is_empty(), "{:?}", errors(&module));
    assert_eq!(kind(&module, 1), &StmtKind::Disabled);
}

#[test]
fn unbalanced_endif() {
    let module = run(Syntax::Merlin, "         FIN\n");
    assert_eq!(errors(&module), vec!["Unbalanced conditional".to_string()]);
}

#[test]
fn missing_endif() {
    let module = run(Syntax::Merlin, "         DO   1\n         NOP\n");
    assert_eq!(errors(&module), vec!["Missing ENDIF".to_string()]);
}

#[test]
fn nesting_overflow_stops() {
    let code = "         DO   1\n".repeat(256);
    let module = run(Syntax::Merlin, &code);
    assert!(module.fatal.is_some());
    assert_eq!(module.lines().len(), 256);
    assert!(errors(&module).contains(&"Conditional nesting too deep".to_string()));
}

// ----------------------------------------------------------------------------
// Loops
// ----------------------------------------------------------------------------

#[test]
fn merlin_loop_variable() {
    let module = run(
        Syntax::Merlin,
        "\
]N       =    0
         LUP  3
]N       =    ]N+1
         --^
RESULT   EQU  ]N
",
    );
    assert!(errors(&module).is_empty(), "{:?}", errors(&module));
    let symbols = module.symbols();
    assert_eq!(symbols.resolve(symbols.find("RESULT").unwrap()), Some(3));
    assert_eq!(module.expanded.len(), 2);
}

#[test]
fn dasm_repeat() {
    let module = run(
        Syntax::Dasm,
        "        REPEAT 4
        nop
        REPEND
",
    );
    let nops = module
        .statement_refs(true)
        .into_iter()
        .filter(|at| matches!(module.statement(*at).map(|s| &s.kind), Some(StmtKind::Opcode(_))))
        .count();
    assert_eq!(nops, 4);
}

#[test]
fn acme_for_counts() {
    let module = run(
        Syntax::Acme,
        "\
!for i, 1, 3 {
        !byte i
}
",
    );
    assert!(errors(&module).is_empty(), "{:?}", errors(&module));
    assert_eq!(data(&module), vec![1, 2, 3]);
}

#[test]
fn acme_for_out_of_range() {
    let module = run(
        Syntax::Acme,
        "!for i, -9223372036854775807, 9223372036854775807 {
        !byte i
}
        !byte 7
",
    );
    assert_eq!(errors(&module), vec!["Loop count out of range".to_string()]);
    assert_eq!(data(&module), vec![7]);
}

#[test]
fn missing_loop_end() {
    let module = run(Syntax::Dasm, "        REPEAT 2\n        nop\n");
    assert_eq!(errors(&module), vec!["Missing end of loop".to_string()]);
}

// ----------------------------------------------------------------------------
// Macros
// ----------------------------------------------------------------------------

#[test]
fn merlin_macro_expands() {
    let module = run(
        Syntax::Merlin,
        "\
INC16    MAC
         INC  ]1
         INC  ]1+1
         <<<
PTR      EQU  $10
START    INC16 PTR
         RTS
",
    );
    assert!(errors(&module).is_empty(), "{:?}", errors(&module));
    assert!(module.macros.contains_key("INC16"));
    assert_eq!(module.expanded.len(), 2);
    assert_eq!(module.expanded[0].text.trim(), "INC  PTR");
    assert_eq!(module.symbols().by_name("PTR").unwrap().references.len(), 2);
    // The body itself is never assembled.
    assert!(module
        .lines()
        .iter()
        .filter(|r| r.stmt == StmtRef::File(0, 1))
        .all(|r| !r.enabled));
}

#[test]
fn merlin_macro_named_like_suffixed_opcode() {
    let module = run(
        Syntax::Merlin,
        "INCW     MAC
         INC  ]1
         <<<
         INCW $10
",
    );
    assert!(errors(&module).is_empty(), "{:?}", errors(&module));
    assert!(matches!(kind(&module, 3), StmtKind::MacroInvoke { .. }));
    assert_eq!(module.expanded.len(), 1);
    assert_eq!(module.expanded[0].text.trim(), "INC  $10");
}

#[test]
fn ca65_named_params() {
    let module = run(
        Syntax::Ca65,
        "\
.macro  store value, dest
        lda #value
        sta dest
.endmacro
        store 5, $0200
",
    );
    assert!(errors(&module).is_empty(), "{:?}", errors(&module));
    let texts: Vec<&str> = module.expanded.iter().map(|e| e.text.trim()).collect();
    assert_eq!(texts, vec!["lda #5", "sta $0200"]);
}

#[test]
fn dasm_numbered_params() {
    let module = run(
        Syntax::Dasm,
        "        MAC store
        lda #{1}
        sta {2}
        ENDM
        store 5, $0200
",
    );
    assert!(errors(&module).is_empty(), "{:?}", errors(&module));
    let texts: Vec<&str> = module.expanded.iter().map(|e| e.text.trim()).collect();
    assert_eq!(texts, vec!["lda #5", "sta $0200"]);
}

// ----------------------------------------------------------------------------
// Includes
// ----------------------------------------------------------------------------

const MAIN: &str = "         PUT  defs.s
         LDA  #VALUE
         PUT  defs.s
";

#[test]
fn include_twice_duplicates() {
    let provider = MemoryProvider::new()
        .with("main.s", MAIN)
        .with("defs.s", "VALUE    EQU  1\n");
    let module = run_with(&Config::with_syntax(Syntax::Merlin), &provider);
    assert_eq!(module.files().len(), 3);
    assert!(errors(&module).contains(&"Duplicate label".to_string()));
}

#[test]
fn shared_include_replayed() {
    let provider = MemoryProvider::new()
        .with("main.s", MAIN)
        .with("defs.s", "VALUE    EQU  1\n");
    let config = Config {
        shared_includes: vec!["defs.s".to_string()],
        ..Config::with_syntax(Syntax::Merlin)
    };
    let module = run_with(&config, &provider);
    assert_eq!(module.files().len(), 2);
    assert!(module.files()[1].processed);
    assert!(errors(&module).is_empty(), "{:?}", errors(&module));

    // Both include sites walk the one shared file.
    let order: Vec<(usize, usize)> = module.lines().iter().map(|r| (r.file, r.line)).collect();
    assert_eq!(order, vec![(0, 0), (1, 0), (0, 1), (0, 2), (1, 0)]);
    assert!(module.lines().iter().all(|r| r.enabled));
    let symbols = module.symbols();
    assert_eq!(symbols.iter().filter(|(_, s)| s.name == "VALUE").count(), 1);
}

#[test]
fn include_not_found() {
    let module = run(Syntax::Merlin, "         PUT  nothere.s\n");
    assert_eq!(errors(&module), vec!["File not found".to_string()]);
}

#[test]
fn main_file_not_found() {
    let provider = MemoryProvider::new();
    let result = assemble("main.s", &Config::default(), &provider);
    assert!(matches!(result, Err(asm65::Error::FileNotFound(_))));
}

/// Serves `main.s` but fails to read `locked.s`, which exists.
struct Locked(MemoryProvider);

impl SourceProvider for Locked {
    fn open(&self, path: &str) -> Result<Option<Rc<Vec<String>>>, Error> {
        if path == "locked.s" {
            let denied = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
            return Err(Error::FileRead(path.to_string(), denied));
        }
        self.0.open(path)
    }
}

#[test]
fn include_read_error_reported() {
    let files = Locked(MemoryProvider::new().with("main.s", "         PUT  locked.s\n"));
    let module = assemble("main.s", &Config::with_syntax(Syntax::Merlin), &files).unwrap();
    assert_eq!(errors(&module), vec!["Failed to read file: locked.s".to_string()]);
}

#[test]
fn main_read_error_propagates() {
    let files = Locked(MemoryProvider::new());
    let result = assemble("locked.s", &Config::default(), &files);
    assert!(matches!(result, Err(Error::FileRead(path, _)) if path == "locked.s"));
}
