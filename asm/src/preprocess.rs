//! Line traversal: conditionals, loops, macros and includes, with the first
//! symbol pass run per line and the final pass run once traversal ends.

use std::collections::HashMap;
use std::rc::Rc;

use arch::{Op, Syntax};
use tracing::{debug, trace, warn};

use crate::config::Config;
use crate::error::Error;
use crate::expr::SymbolExpr;
use crate::message::Severity;
use crate::module::{ExpandedLine, Fatal, LineRecord, MacroDef, Module, StmtRef};
use crate::parser::{infer_mode, parse_detect, parse_line};
use crate::scope::ScopeState;
use crate::source::{FileId, SourceFile, SourceProvider};
use crate::statement::{CondKind, OperandForm, ScopeKind, Statement, StmtKind};
use crate::symbol::{Location, Symbol, SymbolFrom, SymbolId, SymbolTable, SymbolType};
use crate::syntax::{SyntaxDef, Test};

/// Deepest conditional, include or expansion nesting before the run stops.
pub const MAX_NESTING: usize = 255;

/// Upper bound on the iterations of one loop.
const MAX_ITERATIONS: i64 = 0x10000;

#[derive(Debug, Clone)]
enum Source {
    File(FileId),
    Expansion {
        lines: Rc<Vec<String>>,
        file: FileId,
        line: usize,
    },
}

#[derive(Debug, Clone)]
struct LoopVar {
    symbol: SymbolId,
    first: i64,
    step: i64,
}

#[derive(Debug, Clone)]
struct Frame {
    source: Source,
    start: usize,
    current: usize,
    end: usize,
    /// Iterations still to run after the current one.
    remaining: i64,
    iteration: i64,
    var: Option<LoopVar>,
    cond_base: usize,
    is_loop: bool,
    /// Walks an already processed shared file without parsing it again.
    replay: bool,
}

impl Frame {
    fn new(source: Source, start: usize, end: usize, cond_base: usize) -> Self {
        Frame {
            source,
            start,
            current: start,
            end,
            remaining: 0,
            iteration: 0,
            var: None,
            cond_base,
            is_loop: false,
            replay: false,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct CondFrame {
    active: bool,
    satisfied: bool,
    parent: bool,
    directive: StmtRef,
}

/// What an ACME `{` opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Block {
    Cond,
    Zone,
    Loop,
    Macro,
    Other,
}

pub struct Preprocessor<'a> {
    config: &'a Config,
    provider: &'a dyn SourceProvider,
    module: Module,
    scope: ScopeState,
    frames: Vec<Frame>,
    conds: Vec<CondFrame>,
    blocks: Vec<Block>,
    shared: HashMap<String, FileId>,
    halted: bool,
}

impl<'a> Preprocessor<'a> {
    pub fn new(config: &'a Config, provider: &'a dyn SourceProvider) -> Self {
        Preprocessor {
            config,
            provider,
            module: Module::new("", config.syntax),
            scope: ScopeState::new(),
            frames: Vec::new(),
            conds: Vec::new(),
            blocks: Vec::new(),
            shared: HashMap::new(),
            halted: false,
        }
    }

    pub fn run(mut self, path: &str) -> Result<Module, Error> {
        let lines = self
            .provider
            .open(path)?
            .ok_or_else(|| Error::FileNotFound(path.to_string()))?;
        debug!("module {} ({} lines)", path, lines.len());
        self.module.name = path.to_string();
        let id = self.add_file(path, lines, self.config.is_shared(path));
        let end = self.module.files[id].len();
        self.frames.push(Frame::new(Source::File(id), 0, end, 0));

        self.traverse();
        self.close_conditionals(0);

        trace!("final pass over {} lines", self.module.lines.len());
        self.final_pass();
        if !self.module.syntax.is_known() {
            self.module.syntax = self.module.detector.best();
        }
        Ok(self.module)
    }

    fn add_file(&mut self, path: &str, lines: Rc<Vec<String>>, shared: bool) -> FileId {
        let id = self.module.files.len();
        self.module.files.push(SourceFile::new(id, path, lines, shared));
        if shared {
            self.shared.insert(path.to_string(), id);
        }
        id
    }

    fn enabled(&self) -> bool {
        self.conds.last().map_or(true, |c| c.active)
    }

    fn fatal(&mut self, err: Error, file: FileId, line: usize) {
        warn!("{}", err);
        self.module.fatal = Some(Fatal {
            message: err.to_string(),
            file,
            line,
        });
        self.halted = true;
    }

    // ------------------------------------------------------------------------
    // Traversal
    // ------------------------------------------------------------------------

    fn traverse(&mut self) {
        while !self.halted {
            let Some(frame) = self.frames.last_mut() else {
                break;
            };
            if frame.current >= frame.end {
                if frame.remaining > 0 {
                    frame.remaining -= 1;
                    frame.iteration += 1;
                    frame.current = frame.start;
                    if let Some(var) = &frame.var {
                        let value = var
                            .step
                            .checked_mul(frame.iteration)
                            .and_then(|offset| var.first.checked_add(offset));
                        self.module.symbols.get_mut(var.symbol).current = value;
                    }
                    continue;
                }
                let Some(done) = self.frames.pop() else {
                    break;
                };
                if let (Source::File(file), false) = (&done.source, done.is_loop) {
                    self.module.files[*file].processed = true;
                    self.close_conditionals(done.cond_base);
                }
                continue;
            }
            let idx = frame.current;
            frame.current += 1;
            let replay = match (&frame.source, frame.replay) {
                (Source::File(file), true) => Some(*file),
                _ => None,
            };
            match replay {
                Some(file) => self.replay(file, idx),
                None => self.step(idx),
            }
        }
    }

    /// Record a line of a shared file at another include site, reusing the
    /// statement stored on its first visit.
    fn replay(&mut self, file: FileId, idx: usize) {
        let Some(stmt) = self.module.files[file].statements[idx].as_ref() else {
            return;
        };
        let enabled = self.enabled() && stmt.kind != StmtKind::Disabled;
        self.module.lines.push(LineRecord {
            file,
            line: idx,
            stmt: StmtRef::File(file, idx),
            enabled,
        });
    }

    fn text_at(&self, source: &Source, idx: usize) -> String {
        match source {
            Source::File(file) => self.module.files[*file].line(idx).to_string(),
            Source::Expansion { lines, .. } => lines.get(idx).cloned().unwrap_or_default(),
        }
    }

    /// Statements seen again (later loop iterations, expansions) are parsed
    /// fresh instead of overwriting the source line's statement.
    fn fresh(&self) -> bool {
        self.frames
            .iter()
            .any(|f| f.iteration > 0 || matches!(f.source, Source::Expansion { .. }))
    }

    fn parse(&mut self, text: &str) -> Statement {
        let macros = &self.module.macros;
        let lookup = |name: &str| macros.contains_key(name);
        parse_detect(text, &mut self.module.detector, &lookup)
    }

    fn step(&mut self, idx: usize) {
        let Some(frame) = self.frames.last() else {
            return;
        };
        let source = frame.source.clone();
        let (file, line) = match &source {
            Source::File(file) => (*file, idx),
            Source::Expansion { file, line, .. } => (*file, *line),
        };
        let fresh = self.fresh();

        let mut text = self.text_at(&source, idx);
        let mut stmt = self.parse(&text);
        let mut joined = false;
        while stmt.continues {
            let Some(frame) = self.frames.last_mut() else {
                break;
            };
            if frame.current >= frame.end {
                break;
            }
            let next = frame.current;
            frame.current += 1;
            let tail = self.text_at(&source, next);
            if let Source::File(f) = source {
                if !fresh {
                    self.module.files[f].statements[next] = Some(Statement::empty(stmt.syntax));
                    self.module.lines.push(LineRecord {
                        file: f,
                        line: next,
                        stmt: StmtRef::File(f, next),
                        enabled: false,
                    });
                }
            }
            let head = text.trim_end();
            let head = head.strip_suffix('\\').unwrap_or(head);
            text = format!("{head} {}", tail.trim_start());
            stmt = self.parse(&text);
            joined = true;
        }

        let at = match source {
            Source::File(f) if !fresh && !joined => StmtRef::File(f, idx),
            _ => StmtRef::Expanded(self.module.expanded.len()),
        };
        if let StmtRef::Expanded(_) = at {
            // Reserve the slot so references to `at` are valid while processing.
            self.module.expanded.push(ExpandedLine {
                file,
                line,
                text: text.clone(),
                stmt: Statement::empty(stmt.syntax),
            });
        }
        if joined {
            if let Source::File(f) = source {
                if !fresh {
                    self.module.files[f].statements[idx] = Some(Statement::empty(stmt.syntax));
                }
            }
        }

        let enabled = self.process(&mut stmt, at, file, line, idx);
        self.module.lines.push(LineRecord {
            file,
            line,
            stmt: at,
            enabled,
        });
        self.store(at, stmt);
    }

    fn store(&mut self, at: StmtRef, stmt: Statement) {
        match at {
            StmtRef::File(file, line) => self.module.files[file].statements[line] = Some(stmt),
            StmtRef::Expanded(idx) => self.module.expanded[idx].stmt = stmt,
        }
    }

    /// Handle one statement. Returns whether it was assembled.
    fn process(
        &mut self,
        stmt: &mut Statement,
        at: StmtRef,
        file: FileId,
        line: usize,
        idx: usize,
    ) -> bool {
        if stmt.is_conditional() {
            return self.conditional(stmt, at, file, line);
        }
        if let StmtKind::BlockClose { else_branch } = stmt.kind {
            let enabled = self.enabled();
            self.block_close(stmt, else_branch, at);
            return enabled;
        }
        if !self.enabled() {
            if stmt.opens_block {
                self.blocks.push(Block::Other);
            }
            *stmt = stmt.disabled();
            return false;
        }

        self.pass1(stmt, at, file, line);

        match stmt.kind {
            StmtKind::Repeat { .. } => self.start_loop(stmt, idx),
            StmtKind::MacroDef { .. } => self.define_macro(stmt, at, file, line, idx),
            StmtKind::MacroInvoke { .. } => self.expand(stmt, file, line),
            StmtKind::Include { .. } => self.include(stmt, file, line),
            StmtKind::Zone { .. } if stmt.opens_block => {}
            _ if stmt.opens_block => self.blocks.push(Block::Other),
            _ => {}
        }
        true
    }

    // ------------------------------------------------------------------------
    // Conditionals
    // ------------------------------------------------------------------------

    fn conditional(&mut self, stmt: &mut Statement, at: StmtRef, file: FileId, line: usize) -> bool {
        let def = SyntaxDef::get(stmt.syntax);
        if self.enabled() {
            self.conditional_label(stmt, at, file, line);
        }

        // Operands of conditionals bind right away, even in disabled code.
        let symbols = &self.module.symbols;
        let scope = &mut self.scope;
        stmt.for_each_symbol_mut(&mut |sym| {
            if !sym.is_def {
                scope.qualify(sym, SymbolFrom::Unknown, false, def);
                bind(symbols, sym);
            }
        });

        let Some(kind) = stmt.cond_kind() else {
            return self.enabled();
        };
        match kind {
            CondKind::If(test) => {
                let parent = self.enabled();
                if self.conds.len() >= MAX_NESTING {
                    if let Some(keyword) = &mut stmt.keyword {
                        keyword.set_error("Conditional nesting too deep");
                    }
                    self.fatal(Error::NestingOverflow(MAX_NESTING), file, line);
                    return parent;
                }
                let take = parent && self.test(stmt, test);
                self.conds.push(CondFrame {
                    active: take,
                    satisfied: take,
                    parent,
                    directive: at,
                });
                if stmt.opens_block {
                    self.blocks.push(Block::Cond);
                }
                parent
            }
            CondKind::Elif(test) => {
                let Some(top) = self.conds.last().copied() else {
                    unbalanced(stmt);
                    return self.enabled();
                };
                let take = top.parent && !top.satisfied && self.test(stmt, test);
                if let Some(top) = self.conds.last_mut() {
                    top.active = take;
                    top.satisfied |= take;
                }
                top.parent
            }
            CondKind::Else => self.else_branch(stmt),
            CondKind::Endif => self.endif(stmt),
        }
    }

    /// A label on a conditional line names the current address.
    fn conditional_label(&mut self, stmt: &mut Statement, at: StmtRef, file: FileId, line: usize) {
        let def = SyntaxDef::get(stmt.syntax);
        let Some(label) = stmt.label.as_mut().filter(|l| l.is_def) else {
            return;
        };
        self.scope.qualify(label, SymbolFrom::ProgramCounter, false, def);
        let Some(full) = label.full_name.clone() else {
            return;
        };
        let loc = Location {
            file,
            line,
            start: label.token.start,
            end: label.token.end,
            stmt: at,
        };
        let symbols = &mut self.module.symbols;
        if let Some(prev) = define(symbols, label, full, SymbolFrom::ProgramCounter, loc) {
            self.module.annotate(&prev, Severity::Error, "Duplicate label");
        }
    }

    fn else_branch(&mut self, stmt: &mut Statement) -> bool {
        match self.conds.last_mut() {
            Some(top) => {
                top.active = top.parent && !top.satisfied;
                top.satisfied = true;
                top.parent
            }
            None => {
                unbalanced(stmt);
                self.enabled()
            }
        }
    }

    fn endif(&mut self, stmt: &mut Statement) -> bool {
        match self.conds.pop() {
            Some(top) => top.parent,
            None => {
                unbalanced(stmt);
                self.enabled()
            }
        }
    }

    /// Evaluate a conditional's operand. Unresolvable values count as false.
    fn test(&self, stmt: &mut Statement, test: Test) -> bool {
        let StmtKind::Conditional { expr: Some(expr), .. } = &mut stmt.kind else {
            return false;
        };
        match test {
            Test::Defined | Test::Undefined => {
                let mut all = true;
                let mut any = false;
                expr.for_each_symbol(&mut |sym| {
                    any = true;
                    all &= sym.symbol.is_some();
                });
                (any && all) == (test == Test::Defined)
            }
            _ => match expr.resolve(&self.module.symbols) {
                Some(value) => match test {
                    Test::Zero => value == 0,
                    Test::Positive => value as u16 as i16 >= 0,
                    Test::Negative => (value as u16 as i16) < 0,
                    _ => value != 0,
                },
                None => {
                    expr.note.warning("Condition cannot be resolved");
                    false
                }
            },
        }
    }

    /// Report conditionals still open above `base`.
    fn close_conditionals(&mut self, base: usize) {
        while self.conds.len() > base {
            let Some(open) = self.conds.pop() else {
                break;
            };
            if let Some(keyword) = self
                .module
                .statement_mut(open.directive)
                .and_then(|s| s.keyword.as_mut())
            {
                keyword.set_error("Missing ENDIF");
            }
        }
    }

    fn block_close(&mut self, stmt: &mut Statement, else_branch: bool, at: StmtRef) {
        match self.blocks.pop() {
            Some(Block::Cond) => {
                if else_branch {
                    self.else_branch(stmt);
                    if stmt.opens_block {
                        self.blocks.push(Block::Cond);
                    }
                } else {
                    self.endif(stmt);
                }
            }
            Some(Block::Zone) => {
                self.scope.pop_zone();
            }
            Some(_) if else_branch => {
                if let Some(keyword) = &mut stmt.keyword {
                    keyword.set_error("Unexpected else");
                }
            }
            Some(_) => {}
            None => {
                if let Some(keyword) = &mut stmt.keyword {
                    keyword.set_error("Unbalanced '}'");
                }
            }
        }
        trace!("block close at {:?}, {} open", at, self.blocks.len());
    }

    // ------------------------------------------------------------------------
    // Symbols, first pass
    // ------------------------------------------------------------------------

    fn pass1(&mut self, stmt: &mut Statement, at: StmtRef, file: FileId, line: usize) {
        let syntax = stmt.syntax;
        let def = SyntaxDef::get(syntax);

        // Zones open before the line's label is qualified.
        let mut zone_start = false;
        if let StmtKind::Zone { name } = &stmt.kind {
            if syntax == Syntax::Dasm {
                match (&stmt.label, name) {
                    (Some(_), _) => zone_start = true,
                    (None, Some(name)) => self.scope.set_zone(name.text.clone()),
                    (None, None) => {
                        let name = self.scope.next_zone_name();
                        self.scope.set_zone(name);
                    }
                }
            } else {
                let name = match name {
                    Some(name) => name.text.clone(),
                    None => self.scope.next_zone_name(),
                };
                if stmt.opens_block {
                    self.scope.push_zone(name);
                    self.blocks.push(Block::Zone);
                } else {
                    self.scope.set_zone(name);
                }
            }
        }

        let label_from = match &stmt.kind {
            StmtKind::Equate { .. } | StmtKind::Variable { .. } => SymbolFrom::Equate,
            StmtKind::Import { .. } => SymbolFrom::Import,
            _ => SymbolFrom::ProgramCounter,
        };
        let other_from = match &stmt.kind {
            StmtKind::Import { .. } => SymbolFrom::Import,
            StmtKind::Scope {
                kind: ScopeKind::Proc,
                ..
            } => SymbolFrom::ProgramCounter,
            StmtKind::Repeat { .. } => SymbolFrom::Equate,
            _ => SymbolFrom::Unknown,
        };
        let immediate = matches!(stmt.kind, StmtKind::Variable { .. });

        let mut duplicates: Vec<Location> = Vec::new();
        let mut first = stmt.label.is_some();
        {
            let symbols = &mut self.module.symbols;
            let scope = &mut self.scope;
            stmt.for_each_symbol_mut(&mut |sym| {
                let is_label = std::mem::take(&mut first);
                if !sym.is_def {
                    scope.qualify(sym, SymbolFrom::Unknown, false, def);
                    let variable = lookup(symbols, sym).is_some_and(|id| symbols.get(id).ty == SymbolType::Variable);
                    if immediate || variable || sym.ty == SymbolType::Variable || sym.defined_test {
                        bind(symbols, sym);
                    }
                    return;
                }
                if sym.ty == SymbolType::NamedParam {
                    return;
                }
                let from = if is_label { label_from } else { other_from };
                scope.qualify(sym, from, zone_start && is_label, def);
                let Some(full) = sym.full_name.clone() else {
                    return;
                };
                let loc = Location {
                    file,
                    line,
                    start: sym.token.start,
                    end: sym.token.end,
                    stmt: at,
                };
                duplicates.extend(define(symbols, sym, full, from, loc));
            });
        }
        for loc in duplicates {
            self.module.annotate(&loc, Severity::Error, "Duplicate label");
        }

        // Values and flags that need the bound statement.
        let label_id = stmt.label.as_ref().and_then(|l| l.symbol);
        let symbols = &mut self.module.symbols;
        match &stmt.kind {
            StmtKind::Equate { value, zpage } => {
                if let Some(id) = label_id {
                    let symbol = symbols.get_mut(id);
                    symbol.value = Some(value.clone());
                    symbol.flags.zpage |= *zpage;
                }
            }
            StmtKind::Variable { value } => {
                let current = value.resolve(symbols);
                if let Some(id) = label_id {
                    symbols.get_mut(id).current = current;
                }
                if let Some(label) = &mut stmt.label {
                    label.value = current;
                }
            }
            StmtKind::Entry { names } if names.is_empty() => {
                if let Some(id) = label_id {
                    symbols.get_mut(id).flags.entry = true;
                }
            }
            StmtKind::Zone { .. } if zone_start => {
                if let Some(id) = label_id {
                    symbols.get_mut(id).flags.zone_start = true;
                }
            }
            _ => {}
        }

        // Scopes open after their name is defined in the outer scope.
        match &stmt.kind {
            StmtKind::Scope { name, .. } => {
                let name = match name {
                    Some(name) => name.name().to_string(),
                    None => self.scope.next_zone_name(),
                };
                self.scope.push_scope(&name);
            }
            StmtKind::EndScope(_) => {
                if self.scope.pop_scope().is_none() {
                    if let Some(keyword) = &mut stmt.keyword {
                        keyword.set_error("Unbalanced scope");
                    }
                }
            }
            _ => {}
        }
    }

    // ------------------------------------------------------------------------
    // Loops and macros
    // ------------------------------------------------------------------------

    /// Find the line that closes the block opened at `idx` in the current
    /// frame: the matching `}` for ACME blocks, else the matching end
    /// directive.
    fn scan_ahead(
        &self,
        idx: usize,
        syntax: Syntax,
        braces: bool,
        opens: fn(&StmtKind) -> bool,
        closes: fn(&StmtKind) -> bool,
    ) -> Option<usize> {
        let frame = self.frames.last()?;
        let mut depth = 1usize;
        for next in idx + 1..frame.end {
            let text = self.text_at(&frame.source, next);
            let stmt = parse_line(&text, syntax);
            if braces {
                if let StmtKind::BlockClose { .. } = stmt.kind {
                    depth -= 1;
                    if depth == 0 {
                        return Some(next);
                    }
                }
                if stmt.opens_block {
                    depth += 1;
                }
            } else if closes(&stmt.kind) {
                depth -= 1;
                if depth == 0 {
                    return Some(next);
                }
            } else if opens(&stmt.kind) {
                depth += 1;
            }
        }
        None
    }

    fn start_loop(&mut self, stmt: &mut Statement, idx: usize) {
        let StmtKind::Repeat { var, args } = &mut stmt.kind else {
            return;
        };
        let Some(end) = self.scan_ahead(
            idx,
            stmt.syntax,
            stmt.opens_block,
            |k| matches!(k, StmtKind::Repeat { .. }),
            |k| matches!(k, StmtKind::EndRepeat),
        ) else {
            if let Some(keyword) = &mut stmt.keyword {
                keyword.set_error("Missing end of loop");
            }
            return;
        };

        let values: Vec<Option<i64>> = args.iter().map(|a| a.resolve(&self.module.symbols)).collect();
        let (first, step, count) = match (stmt.syntax, values.as_slice()) {
            (Syntax::Acme, [Some(a), Some(b)]) => {
                let step = if b >= a { 1 } else { -1 };
                let span = b.checked_sub(*a).and_then(i64::checked_abs);
                match span.and_then(|n| n.checked_add(1)) {
                    Some(count) => (*a, step, count),
                    None => {
                        if let Some(arg) = args.last_mut() {
                            arg.note.error("Loop count out of range");
                        }
                        (*a, step, 0)
                    }
                }
            }
            (Syntax::Acme, [Some(n)]) => (1, 1, *n),
            (_, [Some(n), ..]) => (0, 1, *n),
            _ => {
                if let Some(arg) = args.first_mut() {
                    arg.note.warning("Loop count cannot be resolved");
                }
                (0, 1, 1)
            }
        };
        let count = if count > MAX_ITERATIONS {
            if let Some(arg) = args.last_mut() {
                arg.note.warning("Loop count too large");
            }
            MAX_ITERATIONS
        } else {
            count
        };
        let var = var.as_ref().and_then(|v| v.symbol).map(|symbol| LoopVar {
            symbol,
            first,
            step,
        });
        if let Some(var) = &var {
            self.module.symbols.get_mut(var.symbol).current = Some(first);
        }
        if stmt.opens_block {
            self.blocks.push(Block::Loop);
        }

        let cond_base = self.conds.len();
        let Some(parent) = self.frames.last_mut() else {
            return;
        };
        parent.current = end;
        if count <= 0 {
            return;
        }
        debug!("loop x{} over lines {}..{}", count, idx + 1, end);
        let mut frame = Frame::new(parent.source.clone(), idx + 1, end, cond_base);
        frame.remaining = count - 1;
        frame.var = var;
        frame.is_loop = true;
        self.frames.push(frame);
    }

    fn define_macro(&mut self, stmt: &mut Statement, at: StmtRef, file: FileId, line: usize, idx: usize) {
        let StmtKind::MacroDef { name, params } = &stmt.kind else {
            return;
        };
        let syntax = stmt.syntax;
        let braces = stmt.opens_block;
        let found = self.scan_ahead(
            idx,
            syntax,
            braces,
            |k| matches!(k, StmtKind::MacroDef { .. }),
            |k| matches!(k, StmtKind::EndMacro),
        );
        let Some(frame) = self.frames.last() else {
            return;
        };
        let source = frame.source.clone();
        let end = found.unwrap_or(frame.end);
        let body: Vec<String> = (idx + 1..end).map(|i| self.text_at(&source, i)).collect();

        // Body lines take no part in the run; placeholders are only valid
        // once substituted.
        if let (Source::File(f), false) = (&source, self.fresh()) {
            for (offset, text) in body.iter().enumerate() {
                let row = idx + 1 + offset;
                self.module.files[*f].statements[row] = Some(parse_line(text, syntax).disabled());
                self.module.lines.push(LineRecord {
                    file: *f,
                    line: row,
                    stmt: StmtRef::File(*f, row),
                    enabled: false,
                });
            }
        }

        if let Some(name) = name {
            let key = name.text.clone();
            debug!("macro {} ({} lines)", key, body.len());
            let def = MacroDef {
                name: key.clone(),
                params: params.iter().map(|p| p.name().to_string()).collect(),
                body,
                syntax,
                definition: Location {
                    file,
                    line,
                    start: name.start,
                    end: name.end,
                    stmt: at,
                },
            };
            self.module.macros.insert(key, def);
        }

        if found.is_none() {
            if let Some(keyword) = &mut stmt.keyword {
                keyword.set_error("Missing end of macro");
            }
        }
        if braces {
            self.blocks.push(Block::Macro);
        }
        if let Some(frame) = self.frames.last_mut() {
            frame.current = end;
        }
    }

    fn expand(&mut self, stmt: &mut Statement, file: FileId, line: usize) {
        let StmtKind::MacroInvoke { name, args } = &mut stmt.kind else {
            return;
        };
        let def = SyntaxDef::get(stmt.syntax);
        let key = match def.macro_prefix {
            Some(prefix) => name.text.strip_prefix(prefix).unwrap_or(name.text.as_str()),
            None => name.text.as_str(),
        }
        .to_string();
        if !self.module.macros.contains_key(&key) {
            name.set_error("Unknown macro");
            return;
        }
        if self.frames.len() >= MAX_NESTING {
            name.set_error("Macro nesting too deep");
            self.fatal(Error::IncludeOverflow(MAX_NESTING), file, line);
            return;
        }
        let Some(mac) = self.module.macros.get(&key) else {
            return;
        };
        let lines: Vec<String> = mac
            .body
            .iter()
            .map(|l| substitute(l, &mac.params, args, mac.syntax))
            .collect();
        debug!("expand {} ({} lines)", mac.name, lines.len());
        let end = lines.len();
        let source = Source::Expansion {
            lines: Rc::new(lines),
            file,
            line,
        };
        self.frames.push(Frame::new(source, 0, end, self.conds.len()));
    }

    fn include(&mut self, stmt: &mut Statement, file: FileId, line: usize) {
        let StmtKind::Include {
            file: name,
            binary: false,
        } = &mut stmt.kind
        else {
            return;
        };
        if name.is_empty() {
            return;
        }
        let path = name.text.clone();
        if self.frames.len() >= MAX_NESTING {
            name.set_error("Include nesting too deep");
            self.fatal(Error::IncludeOverflow(MAX_NESTING), file, line);
            return;
        }
        if let Some(&id) = self.shared.get(&path) {
            debug!("shared include {} replayed", path);
            let end = self.module.files[id].len();
            let mut frame = Frame::new(Source::File(id), 0, end, self.conds.len());
            frame.replay = true;
            self.frames.push(frame);
            return;
        }
        let lines = match self.provider.open(&path) {
            Ok(Some(lines)) => lines,
            Ok(None) => {
                name.set_error("File not found");
                return;
            }
            Err(err) => {
                warn!("{}", err);
                name.set_error(err.to_string());
                return;
            }
        };
        debug!("include {}", path);
        let shared = self.config.is_shared(&path);
        let id = self.add_file(&path, lines, shared);
        let end = self.module.files[id].len();
        self.frames
            .push(Frame::new(Source::File(id), 0, end, self.conds.len()));
    }

    // ------------------------------------------------------------------------
    // Final pass
    // ------------------------------------------------------------------------

    fn final_pass(&mut self) {
        let mut seen = std::collections::HashSet::new();
        let records: Vec<LineRecord> = self
            .module
            .lines
            .iter()
            .filter(|r| r.enabled && seen.insert(r.stmt))
            .copied()
            .collect();

        // 1. Bind what pass 1 left pending and record references.
        for record in &records {
            let Module {
                files,
                expanded,
                symbols,
                ..
            } = &mut self.module;
            let Some(stmt) = stmt_in(files, expanded, record.stmt) else {
                continue;
            };
            stmt.for_each_symbol_mut(&mut |sym| {
                if sym.is_def {
                    return;
                }
                if sym.symbol.is_none() {
                    bind(symbols, sym);
                }
                match sym.symbol {
                    Some(id) => symbols.get_mut(id).references.push(Location {
                        file: record.file,
                        line: record.line,
                        start: sym.token.start,
                        end: sym.token.end,
                        stmt: record.stmt,
                    }),
                    None if sym.defined_test => {}
                    None if sym.full_name.is_none()
                        || sym.ty.is_local()
                        || sym.ty == SymbolType::Variable =>
                    {
                        sym.token.set_error("Label not found")
                    }
                    None => {}
                }
            });
        }

        // 2. Equate values again, now with bound references; entry points.
        for record in &records {
            let Module {
                files,
                expanded,
                symbols,
                ..
            } = &mut self.module;
            let Some(stmt) = stmt_in(files, expanded, record.stmt) else {
                continue;
            };
            let label_id = stmt.label.as_ref().and_then(|l| l.symbol);
            match &stmt.kind {
                StmtKind::Equate { value, .. } => {
                    if let Some(id) = label_id {
                        if symbols.get(id).definition.stmt == record.stmt {
                            symbols.get_mut(id).value = Some(value.clone());
                        }
                    }
                }
                StmtKind::Entry { names } => {
                    for name in names {
                        if let Some(id) = name.as_symbol().and_then(|s| s.symbol) {
                            symbols.get_mut(id).flags.entry = true;
                        }
                    }
                }
                _ => {}
            }
        }

        // 3. Addressing modes and usage flags.
        for record in &records {
            let Module {
                files,
                expanded,
                symbols,
                ..
            } = &mut self.module;
            let Some(stmt) = stmt_in(files, expanded, record.stmt) else {
                continue;
            };
            let StmtKind::Opcode(op) = &mut stmt.kind else {
                continue;
            };
            let size = op.operand.as_ref().and_then(|e| e.size(symbols));
            op.mode = infer_mode(op.op, op.form, op.width, size);
            if op.mode.is_none() {
                if let Some(keyword) = &mut stmt.keyword {
                    keyword.set_error("Invalid addressing mode");
                }
            }
            mark_usage(symbols, op.op, op.form, op.mode, op.operand.as_ref());
        }

        // 4. Locals nobody refers to.
        let unused: Vec<Location> = self
            .module
            .symbols
            .iter()
            .filter(|(_, s)| s.ty.is_local() && s.references.is_empty())
            .map(|(_, s)| s.definition)
            .collect();
        for loc in unused {
            self.module.annotate(&loc, Severity::Info, "Unused local label");
        }
    }
}

fn stmt_in<'m>(
    files: &'m mut [SourceFile],
    expanded: &'m mut [ExpandedLine],
    at: StmtRef,
) -> Option<&'m mut Statement> {
    match at {
        StmtRef::File(file, line) => files.get_mut(file)?.statements.get_mut(line)?.as_mut(),
        StmtRef::Expanded(idx) => expanded.get_mut(idx).map(|e| &mut e.stmt),
    }
}

fn unbalanced(stmt: &mut Statement) {
    if let Some(keyword) = &mut stmt.keyword {
        keyword.set_error("Unbalanced conditional");
    }
}

fn lookup(symbols: &SymbolTable, sym: &SymbolExpr) -> Option<SymbolId> {
    sym.candidates
        .iter()
        .find_map(|c| symbols.find(c))
        .or_else(|| symbols.find(sym.full_name.as_deref()?))
}

/// Insert a definition. Variables reuse an existing symbol; anything else
/// already defined is a duplicate, reported with the earlier definition.
fn define(
    symbols: &mut SymbolTable,
    sym: &mut SymbolExpr,
    full: String,
    from: SymbolFrom,
    loc: Location,
) -> Option<Location> {
    if sym.ty == SymbolType::Variable {
        let id = match symbols.find(&full) {
            Some(id) => id,
            None => symbols
                .insert(Symbol::new(full, sym.ty, from, loc))
                .unwrap_or_else(|id| id),
        };
        sym.symbol = Some(id);
        return None;
    }
    match symbols.insert(Symbol::new(full, sym.ty, from, loc)) {
        Ok(id) => {
            sym.symbol = Some(id);
            None
        }
        Err(prev) => {
            sym.token.set_error("Duplicate label");
            Some(symbols.get(prev).definition)
        }
    }
}

/// Bind a qualified reference to an existing symbol, innermost scope first.
/// Variables are read at the point of reference.
fn bind(symbols: &SymbolTable, sym: &mut SymbolExpr) {
    if let Some(id) = lookup(symbols, sym) {
        sym.symbol = Some(id);
        if symbols.get(id).ty == SymbolType::Variable {
            sym.value = symbols.get(id).current;
        }
    }
}

fn mark_usage(
    symbols: &mut SymbolTable,
    op: Op,
    form: OperandForm,
    mode: Option<arch::Mode>,
    operand: Option<&crate::expr::Expression>,
) {
    let Some(operand) = operand else {
        return;
    };
    if form == OperandForm::Immediate {
        let mut ids = Vec::new();
        operand.for_each_symbol(&mut |sym| ids.extend(sym.symbol));
        for id in ids {
            symbols.get_mut(id).flags.constant = true;
        }
        return;
    }
    let Some(id) = operand.as_symbol().and_then(|s| s.symbol) else {
        return;
    };
    let flags = &mut symbols.get_mut(id).flags;
    match op {
        Op::JSR => flags.subroutine = true,
        op if op.is_jump() => flags.code = true,
        _ => flags.data = true,
    }
    if mode.is_some_and(|m| m.is_zero_page()) {
        flags.zpage = true;
    }
}

/// Replace macro placeholders in one body line: `]1`..`]9` (Merlin),
/// `{1}`..`{9}` (DASM), or named parameters.
fn substitute(line: &str, params: &[String], args: &[String], syntax: Syntax) -> String {
    let arg = |n: usize| args.get(n).map(String::as_str).unwrap_or_default();
    match syntax {
        Syntax::Merlin | Syntax::Lisa => {
            let mut out = line.to_string();
            for n in (1..=9).rev() {
                out = out.replace(&format!("]{n}"), arg(n - 1));
            }
            out
        }
        Syntax::Dasm => {
            let mut out = line.to_string();
            for n in 1..=9 {
                out = out.replace(&format!("{{{n}}}"), arg(n - 1));
            }
            out
        }
        _ => {
            let mut out = String::with_capacity(line.len());
            let mut word = String::new();
            let mut quote: Option<char> = None;
            let flush = |word: &mut String, out: &mut String| {
                match params.iter().position(|p| p == word.as_str()) {
                    Some(n) => out.push_str(arg(n)),
                    None => out.push_str(word),
                }
                word.clear();
            };
            for ch in line.chars() {
                if quote.is_none() && (ch.is_ascii_alphanumeric() || matches!(ch, '_' | '.' | '@')) {
                    word.push(ch);
                    continue;
                }
                flush(&mut word, &mut out);
                match quote {
                    Some(q) if q == ch => quote = None,
                    None if ch == '"' || ch == '\'' => quote = Some(ch),
                    _ => {}
                }
                out.push(ch);
            }
            flush(&mut word, &mut out);
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitution_styles() {
        let args = vec!["$10".to_string(), "VAL".to_string()];
        assert_eq!(
            substitute(" LDA ]1\n", &[], &args, Syntax::Merlin),
            " LDA $10\n"
        );
        assert_eq!(substitute(" sta {2}", &[], &args, Syntax::Dasm), " sta VAL");
        let params = vec!["src".to_string(), "dst".to_string()];
        assert_eq!(
            substitute(" lda src ; \"src\" dst", &params, &args, Syntax::Ca65),
            " lda $10 ; \"src\" VAL"
        );
    }
}
