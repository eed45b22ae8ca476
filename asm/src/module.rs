use std::collections::HashSet;

use arch::Syntax;
use indexmap::IndexMap;
use tracing::debug;

use crate::config::Config;
use crate::detect::Detector;
use crate::error::Error;
use crate::message::{Diagnostic, Severity};
use crate::preprocess::Preprocessor;
use crate::source::{FileId, SourceFile, SourceProvider};
use crate::statement::Statement;
use crate::symbol::{Location, SymbolFrom, SymbolId, SymbolTable};

/// Where a statement lives: a source line, or a line produced by a macro
/// expansion or a later loop iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StmtRef {
    File(FileId, usize),
    Expanded(usize),
}

/// One traversed line, in traversal order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRecord {
    pub file: FileId,
    pub line: usize,
    pub stmt: StmtRef,
    pub enabled: bool,
}

/// A statement that exists only in the traversal. `file` and `line` point
/// at the line that produced it.
#[derive(Debug, Clone)]
pub struct ExpandedLine {
    pub file: FileId,
    pub line: usize,
    pub text: String,
    pub stmt: Statement,
}

#[derive(Debug, Clone)]
pub struct MacroDef {
    pub name: String,
    pub params: Vec<String>,
    pub body: Vec<String>,
    pub syntax: Syntax,
    pub definition: Location,
}

/// The condition that stopped traversal early.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fatal {
    pub message: String,
    pub file: FileId,
    pub line: usize,
}

/// Result of one preprocessing run over a main file and its includes.
#[derive(Debug, Clone)]
pub struct Module {
    pub name: String,
    pub syntax: Syntax,
    pub files: Vec<SourceFile>,
    pub symbols: SymbolTable,
    pub lines: Vec<LineRecord>,
    pub expanded: Vec<ExpandedLine>,
    pub macros: IndexMap<String, MacroDef>,
    pub detector: Detector,
    pub fatal: Option<Fatal>,
}

impl Module {
    pub fn new(name: &str, syntax: Syntax) -> Self {
        Module {
            name: name.to_string(),
            syntax,
            files: Vec::new(),
            symbols: SymbolTable::new(),
            lines: Vec::new(),
            expanded: Vec::new(),
            macros: IndexMap::new(),
            detector: Detector::fixed(syntax),
            fatal: None,
        }
    }

    pub fn files(&self) -> &[SourceFile] {
        &self.files
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn lines(&self) -> &[LineRecord] {
        &self.lines
    }

    pub fn statement(&self, at: StmtRef) -> Option<&Statement> {
        match at {
            StmtRef::File(file, line) => self.files.get(file)?.statements.get(line)?.as_ref(),
            StmtRef::Expanded(idx) => self.expanded.get(idx).map(|e| &e.stmt),
        }
    }

    pub fn statement_mut(&mut self, at: StmtRef) -> Option<&mut Statement> {
        match at {
            StmtRef::File(file, line) => self.files.get_mut(file)?.statements.get_mut(line)?.as_mut(),
            StmtRef::Expanded(idx) => self.expanded.get_mut(idx).map(|e| &mut e.stmt),
        }
    }

    /// Source text a statement was parsed from.
    pub fn text(&self, at: StmtRef) -> &str {
        match at {
            StmtRef::File(file, line) => self.files.get(file).map(|f| f.line(line)).unwrap_or_default(),
            StmtRef::Expanded(idx) => self.expanded.get(idx).map(|e| e.text.as_str()).unwrap_or_default(),
        }
    }

    /// Every statement reference once, in traversal order.
    pub fn statement_refs(&self, enabled_only: bool) -> Vec<StmtRef> {
        let mut seen = HashSet::new();
        self.lines
            .iter()
            .filter(|r| r.enabled || !enabled_only)
            .filter(|r| seen.insert(r.stmt))
            .map(|r| r.stmt)
            .collect()
    }

    /// Mark the definition token at `loc`.
    pub fn annotate(&mut self, loc: &Location, severity: Severity, message: &str) {
        let Some(stmt) = self.statement_mut(loc.stmt) else {
            return;
        };
        stmt.for_each_symbol_mut(&mut |sym| {
            if sym.is_def && sym.token.start == loc.start && sym.token.end == loc.end {
                sym.token.note.set(severity, message);
            }
        });
    }

    /// Entry points this module declares, by name.
    pub fn entries(&self) -> Vec<(String, SymbolId)> {
        self.symbols
            .iter()
            .filter(|(_, s)| s.flags.entry)
            .map(|(id, s)| (s.name.clone(), id))
            .collect()
    }

    /// Flag global references that are still unbound, unless `external`
    /// knows the name.
    pub fn resolve_globals(&mut self, external: &dyn Fn(&str) -> bool) {
        for at in self.statement_refs(true) {
            let Some(stmt) = self.statement_mut(at) else {
                continue;
            };
            stmt.for_each_symbol_mut(&mut |sym| {
                if sym.is_def || sym.symbol.is_some() || !sym.ty.is_global() || sym.defined_test {
                    return;
                }
                let known = sym.candidates.iter().any(|c| external(c))
                    || sym.full_name.as_deref().is_some_and(external);
                if !known {
                    sym.token.set_error("Label not found");
                }
            });
        }
    }

    /// Every annotation, flattened, in traversal order.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        for record in &self.lines {
            if !seen.insert(record.stmt) {
                continue;
            }
            let Some(stmt) = self.statement(record.stmt) else {
                continue;
            };
            let path = self
                .files
                .get(record.file)
                .map(|f| f.path.clone())
                .unwrap_or_default();
            for (start, end, note) in stmt.notes() {
                let Some(message) = note.message() else {
                    continue;
                };
                out.push(Diagnostic {
                    path: path.clone(),
                    line: record.line,
                    start,
                    end,
                    severity: note.severity(),
                    message: message.to_string(),
                    source: self.text(record.stmt).to_string(),
                });
            }
        }
        if let Some(fatal) = &self.fatal {
            let file = self.files.get(fatal.file);
            out.push(Diagnostic {
                path: file.map(|f| f.path.clone()).unwrap_or_default(),
                line: fatal.line,
                start: 0,
                end: 0,
                severity: Severity::Error,
                message: fatal.message.clone(),
                source: file.map(|f| f.line(fatal.line).to_string()).unwrap_or_default(),
            });
        }
        out
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics().iter().any(|d| d.severity.is_error())
    }
}

/// Process one main file into a module, with no other modules to link
/// against.
pub fn assemble(
    path: &str,
    config: &Config,
    provider: &dyn SourceProvider,
) -> Result<Module, Error> {
    let mut module = Preprocessor::new(config, provider).run(path)?;
    let imports: HashSet<String> = module
        .symbols
        .iter()
        .filter(|(_, s)| s.from == SymbolFrom::Import)
        .map(|(_, s)| s.name.clone())
        .collect();
    module.resolve_globals(&|name| imports.contains(name));
    Ok(module)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPoint {
    pub module: usize,
    pub symbol: SymbolId,
}

/// A set of modules sharing one entry point table.
#[derive(Debug, Clone, Default)]
pub struct Project {
    pub config: Config,
    pub entries: IndexMap<String, EntryPoint>,
    pub modules: Vec<Module>,
}

impl Project {
    pub fn new(config: Config) -> Self {
        Project {
            config,
            entries: IndexMap::new(),
            modules: Vec::new(),
        }
    }

    /// Run one module and promote its entry points.
    pub fn assemble(&mut self, path: &str, provider: &dyn SourceProvider) -> Result<usize, Error> {
        let mut module = Preprocessor::new(&self.config, provider).run(path)?;
        let idx = self.modules.len();
        for (name, symbol) in module.entries() {
            if self.entries.contains_key(&name) {
                let loc = module.symbols.get(symbol).definition;
                module.annotate(&loc, Severity::Error, "Duplicate entry point");
                continue;
            }
            debug!("entry {} from {}", name, path);
            self.entries.insert(name, EntryPoint { module: idx, symbol });
        }
        self.modules.push(module);
        Ok(idx)
    }

    /// Check every module's global names against the entry table.
    pub fn link(&mut self) {
        let entries = &self.entries;
        for (idx, module) in self.modules.iter_mut().enumerate() {
            let conflicts: Vec<Location> = module
                .symbols
                .iter()
                .filter(|(_, s)| s.ty.is_global() && !s.flags.entry && s.from != SymbolFrom::Import)
                .filter(|(_, s)| entries.get(&s.name).is_some_and(|e| e.module != idx))
                .map(|(_, s)| s.definition)
                .collect();
            for loc in conflicts {
                module.annotate(&loc, Severity::Error, "Label conflicts with entry point");
            }
            let imports: HashSet<String> = module
                .symbols
                .iter()
                .filter(|(_, s)| s.from == SymbolFrom::Import)
                .map(|(_, s)| s.name.clone())
                .collect();
            module.resolve_globals(&|name| {
                imports.contains(name) || entries.get(name).is_some_and(|e| e.module != idx)
            });
        }
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.modules.iter().flat_map(|m| m.diagnostics()).collect()
    }
}
