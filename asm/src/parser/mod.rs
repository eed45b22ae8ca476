//! Statement parser: one source line in, one [`Statement`] out.

mod directive;
mod expr;
mod line;
mod opcode;

use arch::Syntax;
use tracing::trace;

use crate::detect::Detector;
use crate::statement::Statement;
use crate::syntax::SyntaxDef;
use crate::token::Token;
use crate::tokenizer::Tokenizer;

pub use opcode::infer_mode;

/// Reports whether a name is a macro defined so far in the run.
pub type MacroLookup<'a> = &'a dyn Fn(&str) -> bool;

pub struct Parser<'a> {
    pub(crate) tk: Tokenizer<'a>,
    pub(crate) def: &'static SyntaxDef,
    pub(crate) extras: Vec<Token>,
    macros: MacroLookup<'a>,
}

impl<'a> Parser<'a> {
    pub fn new(line: &'a str, syntax: Syntax, macros: MacroLookup<'a>) -> Self {
        let def = SyntaxDef::get(syntax);
        Parser {
            tk: Tokenizer::new(line, def),
            def,
            extras: Vec::new(),
            macros,
        }
    }

    pub(crate) fn is_macro(&self, name: &str) -> bool {
        (self.macros)(name)
    }
}

fn no_macros(_: &str) -> bool {
    false
}

/// Parse `line` under a fixed dialect.
pub fn parse_line(line: &str, syntax: Syntax) -> Statement {
    Parser::new(line, syntax, &no_macros).parse_statement()
}

/// Parse `line` under a fixed dialect, with macro names known.
pub fn parse_line_with(line: &str, syntax: Syntax, macros: MacroLookup) -> Statement {
    Parser::new(line, syntax, macros).parse_statement()
}

/// Parse `line` under the detector's dialect, or under every dialect while
/// it is still unknown, voting on the outcome.
pub fn parse_detect(line: &str, detector: &mut Detector, macros: MacroLookup) -> Statement {
    detector.scan_pin(line);
    if let Some(syntax) = detector.pinned() {
        return parse_line_with(line, syntax, macros);
    }
    let generic = parse_line_with(line, Syntax::Unknown, macros);
    if matches!(generic.kind, crate::statement::StmtKind::Empty) {
        return generic;
    }

    let attempts: Vec<(Syntax, Statement)> = Syntax::KNOWN
        .iter()
        .map(|&syntax| (syntax, parse_line_with(line, syntax, macros)))
        .collect();

    let passed: Vec<Syntax> = attempts
        .iter()
        .filter(|(_, stmt)| !stmt.has_error())
        .map(|(syntax, _)| *syntax)
        .collect();
    trace!("detect {:?} -> {:?}", line, passed);

    if !passed.is_empty() {
        for syntax in &passed {
            detector.vote_strong(*syntax);
        }
    } else {
        for (syntax, _) in &attempts {
            detector.vote_weak(*syntax);
        }
    }

    // The lowest-indexed dialect that passed wins the line; with none
    // passing, the first attempt still yields a statement.
    let pick = passed.first().copied().unwrap_or(Syntax::Merlin);
    attempts
        .into_iter()
        .find(|(syntax, _)| *syntax == pick)
        .map(|(_, stmt)| stmt)
        .unwrap_or(generic)
}
