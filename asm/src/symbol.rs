use indexmap::IndexMap;
use serde::Serialize;
use strum::Display;

use crate::expr::{size_of_value, Expression};
use crate::module::StmtRef;
use crate::source::FileId;

pub type SymbolId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
pub enum SymbolType {
    Simple,
    Scoped,
    CheapLocal,
    ZoneLocal,
    AnonLocal,
    LisaLocal,
    Ca65Local,
    Variable,
    TypeName,
    NamedParam,
}

impl SymbolType {
    /// Locals must resolve inside the module; globals may come from a link.
    pub fn is_local(self) -> bool {
        matches!(
            self,
            SymbolType::CheapLocal
                | SymbolType::ZoneLocal
                | SymbolType::AnonLocal
                | SymbolType::LisaLocal
                | SymbolType::Ca65Local
        )
    }

    pub fn is_global(self) -> bool {
        matches!(self, SymbolType::Simple | SymbolType::Scoped)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Display)]
pub enum SymbolFrom {
    #[default]
    Unknown,
    ProgramCounter,
    Equate,
    Import,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SymbolFlags {
    pub zpage: bool,
    pub constant: bool,
    pub subroutine: bool,
    pub data: bool,
    pub code: bool,
    pub entry: bool,
    pub zone_start: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub file: FileId,
    pub line: usize,
    pub start: usize,
    pub end: usize,
    pub stmt: StmtRef,
}

#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub ty: SymbolType,
    pub from: SymbolFrom,
    pub flags: SymbolFlags,
    pub definition: Location,
    pub references: Vec<Location>,
    pub value: Option<Expression>,
    /// Current value of a redefinable variable.
    pub current: Option<i64>,
}

impl Symbol {
    pub fn new(name: String, ty: SymbolType, from: SymbolFrom, definition: Location) -> Self {
        Symbol {
            name,
            ty,
            from,
            flags: SymbolFlags::default(),
            definition,
            references: Vec::new(),
            value: None,
            current: None,
        }
    }
}

/// Name table of one module: an arena of symbols plus an insertion-ordered
/// index from fully-qualified name to arena slot.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
    names: IndexMap<String, SymbolId>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn find(&self, name: &str) -> Option<SymbolId> {
        self.names.get(name).copied()
    }

    pub fn get(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id]
    }

    pub fn get_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.symbols[id]
    }

    pub fn by_name(&self, name: &str) -> Option<&Symbol> {
        self.find(name).map(|id| self.get(id))
    }

    /// Insert a new definition. A name that already exists is left alone and
    /// its id is returned as the error.
    pub fn insert(&mut self, symbol: Symbol) -> Result<SymbolId, SymbolId> {
        if let Some(&id) = self.names.get(&symbol.name) {
            return Err(id);
        }
        let id = self.symbols.len();
        self.names.insert(symbol.name.clone(), id);
        self.symbols.push(symbol);
        Ok(id)
    }

    /// Symbols in definition order.
    pub fn iter(&self) -> impl Iterator<Item = (SymbolId, &Symbol)> {
        self.names.values().map(|&id| (id, &self.symbols[id]))
    }

    pub fn resolve(&self, id: SymbolId) -> Option<i64> {
        self.resolve_depth(id, 0)
    }

    pub(crate) fn resolve_depth(&self, id: SymbolId, depth: usize) -> Option<i64> {
        let symbol = self.symbols.get(id)?;
        if let Some(current) = symbol.current {
            return Some(current);
        }
        symbol.value.as_ref()?.resolve_depth(self, depth)
    }

    pub(crate) fn size_depth(&self, id: SymbolId, depth: usize) -> Option<u8> {
        let symbol = self.symbols.get(id)?;
        if symbol.flags.zpage {
            return Some(1);
        }
        if let Some(current) = symbol.current {
            return Some(size_of_value(current, false));
        }
        match &symbol.value {
            Some(value) => value.size_depth(self, depth),
            None if symbol.from == SymbolFrom::ProgramCounter => Some(2),
            None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc() -> Location {
        Location {
            file: 0,
            line: 0,
            start: 0,
            end: 0,
            stmt: StmtRef::File(0, 0),
        }
    }

    #[test]
    fn duplicate_keeps_first() {
        let mut table = SymbolTable::new();
        let a = Symbol::new("FOO".into(), SymbolType::Simple, SymbolFrom::ProgramCounter, loc());
        let first = table.insert(a.clone()).unwrap();
        assert_eq!(table.insert(a), Err(first));
        assert_eq!(table.len(), 1);
        assert_eq!(table.size_depth(first, 0), Some(2));
    }

    #[test]
    fn variables_resolve_to_current() {
        let mut table = SymbolTable::new();
        let mut v = Symbol::new("]X".into(), SymbolType::Variable, SymbolFrom::Equate, loc());
        v.current = Some(3);
        let id = table.insert(v).unwrap();
        assert_eq!(table.resolve(id), Some(3));
        assert_eq!(table.by_name("]X").map(|s| s.ty), Some(SymbolType::Variable));
    }
}
