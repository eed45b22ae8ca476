use asm65::module::StmtRef;
use asm65::renumber::{renumber_locals, TextEdit};
use asm65::{assemble, Config, MemoryProvider, Project, Syntax};

fn provider(files: &[(&str, &str)]) -> MemoryProvider {
    let mut provider = MemoryProvider::new();
    for (path, text) in files {
        provider.add(path, text);
    }
    provider
}

fn link(files: &[(&str, &str)]) -> Project {
    let provider = provider(files);
    let mut project = Project::new(Config::with_syntax(Syntax::Merlin));
    for (path, _) in files {
        project.assemble(path, &provider).unwrap();
    }
    project.link();
    for diagnostic in project.diagnostics() {
        println!("{:?}", diagnostic);
    }
    project
}

fn errors(project: &Project) -> Vec<String> {
    project
        .diagnostics()
        .into_iter()
        .filter(|d| d.severity.is_error())
        .map(|d| d.message)
        .collect()
}

const CALLER: &str = "\
START    ENT
         JMP  HELPER
";

const HELPER: &str = "\
HELPER   ENT
         RTS
";

#[test]
fn entries_link_across_modules() {
    let project = link(&[("a.s", CALLER), ("b.s", HELPER)]);
    assert!(errors(&project).is_empty(), "{:?}", errors(&project));
    let names: Vec<&String> = project.entries.keys().collect();
    assert_eq!(names, vec!["START", "HELPER"]);
    assert_eq!(project.entries["HELPER"].module, 1);
}

#[test]
fn unlinked_reference_fails() {
    let project = link(&[("a.s", CALLER)]);
    assert_eq!(errors(&project), vec!["Label not found".to_string()]);
}

#[test]
fn duplicate_entry_point() {
    let project = link(&[("a.s", CALLER), ("b.s", HELPER), ("c.s", HELPER)]);
    assert!(errors(&project).contains(&"Duplicate entry point".to_string()));
    assert_eq!(project.entries["HELPER"].module, 1);
}

#[test]
fn label_conflicts_with_entry() {
    let project = link(&[
        ("a.s", CALLER),
        ("b.s", HELPER),
        ("c.s", "HELPER   RTS\n"),
    ]);
    assert_eq!(
        errors(&project),
        vec!["Label conflicts with entry point".to_string()]
    );
}

#[test]
fn detects_dialect() {
    let code = "\
.proc main
@loop:  dex
        bne @loop
        rts
.endproc
";
    let module = assemble("main.s", &Config::default(), &provider(&[("main.s", code)])).unwrap();
    assert_eq!(module.syntax, Syntax::Ca65);
}

#[test]
fn marker_pins_dialect() {
    let code = "\
; syntax:acme
        lda #1
";
    let module = assemble("main.s", &Config::default(), &provider(&[("main.s", code)])).unwrap();
    assert_eq!(module.syntax, Syntax::Acme);
}

#[test]
fn runs_are_repeatable() {
    let code = "\
]N       =    0
         LUP  2
]N       =    ]N+1
         --^
MAIN     LDA  #]N
:LOOP    DEX
         BNE  :LOOP
";
    let files = provider(&[("main.s", code)]);
    let config = Config::with_syntax(Syntax::Merlin);
    let first = assemble("main.s", &config, &files).unwrap();
    let second = assemble("main.s", &config, &files).unwrap();
    assert_eq!(format!("{:?}", first), format!("{:?}", second));
}

#[test]
fn renumbers_in_definition_order() {
    let code = "\
MAIN     LDX  #0
:7       DEX
         BNE  :7
:3       DEY
         BNE  :3
";
    let files = provider(&[("main.s", code)]);
    let module = assemble("main.s", &Config::with_syntax(Syntax::Merlin), &files).unwrap();
    let statements: Vec<(usize, &asm65::statement::Statement)> = (0..5)
        .filter_map(|line| Some((line, module.statement(StmtRef::File(0, line))?)))
        .collect();
    let edits = renumber_locals(&statements, 10, 10);
    let edit = |line: usize, text: &str| TextEdit {
        line,
        start: if line % 2 == 1 { 0 } else { 14 },
        end: if line % 2 == 1 { 2 } else { 16 },
        text: text.to_string(),
    };
    assert_eq!(
        edits,
        vec![
            edit(1, ":10"),
            edit(2, ":10"),
            edit(3, ":20"),
            edit(4, ":20"),
        ]
    );
}
