use std::collections::HashMap;

use crate::expr::SymbolExpr;
use crate::symbol::{SymbolFrom, SymbolType};
use crate::syntax::SyntaxDef;

/// Qualification state for one preprocessing run.
#[derive(Debug, Clone, Default)]
pub struct ScopeState {
    scopes: Vec<String>,
    zones: Vec<String>,
    anchor: Option<String>,
    anon: HashMap<(char, usize), usize>,
    lisa: [usize; 10],
    ca65: usize,
    zone_counter: usize,
}

impl ScopeState {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------------
    // Scopes and zones
    // ------------------------------------------------------------------------

    pub fn scope_path(&self, sep: &str) -> Option<String> {
        (!self.scopes.is_empty()).then(|| self.scopes.join(sep))
    }

    pub fn push_scope(&mut self, name: &str) {
        self.scopes.push(name.to_string());
    }

    pub fn pop_scope(&mut self) -> Option<String> {
        self.scopes.pop()
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    pub fn zone(&self) -> Option<&str> {
        self.zones.last().map(String::as_str)
    }

    /// Replace the current zone (ACME `!zone` without a block, DASM `SUBROUTINE`).
    pub fn set_zone(&mut self, name: String) {
        match self.zones.last_mut() {
            Some(top) => *top = name,
            None => self.zones.push(name),
        }
    }

    /// Open a nested zone (ACME `!zone name {`).
    pub fn push_zone(&mut self, name: String) {
        self.zones.push(name);
    }

    pub fn pop_zone(&mut self) -> Option<String> {
        self.zones.pop()
    }

    /// Name for a zone opened without one.
    pub fn next_zone_name(&mut self) -> String {
        let name = format!("__zone{}", self.zone_counter);
        self.zone_counter += 1;
        name
    }

    pub fn anchor(&self) -> Option<&str> {
        self.anchor.as_deref()
    }

    // ------------------------------------------------------------------------
    // Qualification
    // ------------------------------------------------------------------------

    /// Assign `full_name` (and `candidates` for scoped lookups) to `sym`.
    /// Definitions advance the anonymous counters and move the anchors.
    pub fn qualify(
        &mut self,
        sym: &mut SymbolExpr,
        from: SymbolFrom,
        zone_start: bool,
        def: &SyntaxDef,
    ) {
        let sep = def.scope_sep;
        let name = sym.name().to_string();
        sym.candidates.clear();
        match sym.ty {
            SymbolType::Simple | SymbolType::Scoped | SymbolType::TypeName => {
                let absolute = name.strip_prefix(sep);
                if sym.is_def {
                    let full = match self.scope_path(sep) {
                        Some(path) => format!("{path}{sep}{name}"),
                        None => name.clone(),
                    };
                    if sym.ty == SymbolType::Simple && from == SymbolFrom::ProgramCounter {
                        self.anchor = Some(full.clone());
                        if zone_start {
                            self.set_zone(full.clone());
                        }
                    }
                    sym.full_name = Some(full);
                } else if let Some(abs) = absolute {
                    sym.full_name = Some(abs.to_string());
                } else {
                    for depth in (1..=self.scopes.len()).rev() {
                        let path = self.scopes[..depth].join(sep);
                        sym.candidates.push(format!("{path}{sep}{name}"));
                    }
                    sym.candidates.push(name.clone());
                    sym.full_name = Some(name);
                }
            }
            SymbolType::CheapLocal => {
                let local = match &self.anchor {
                    Some(anchor) => format!("{anchor}{name}"),
                    None => name,
                };
                // The anchor already carries the scope path.
                let full = match (&self.anchor, self.scope_path(sep)) {
                    (None, Some(path)) => format!("{path}{sep}{local}"),
                    _ => local,
                };
                sym.full_name = Some(full);
            }
            SymbolType::ZoneLocal => {
                let full = match self.zone() {
                    Some(zone) if def.zone_prefix.is_some_and(|p| name.starts_with(p)) => {
                        format!("{zone}{name}")
                    }
                    Some(zone) => format!("{zone}.{name}"),
                    None => name,
                };
                sym.full_name = Some(full);
            }
            SymbolType::AnonLocal => {
                let marker = name.chars().next().unwrap_or('+');
                sym.run = name.len();
                sym.forward = marker == '+';
                let count = self.anon.entry((marker, sym.run)).or_insert(0);
                sym.full_name = if sym.is_def {
                    let full = format!("{marker}{}#{count}", sym.run);
                    *count += 1;
                    Some(full)
                } else if sym.forward {
                    Some(format!("{marker}{}#{count}", sym.run))
                } else {
                    count
                        .checked_sub(1)
                        .map(|n| format!("{marker}{}#{n}", sym.run))
                };
            }
            SymbolType::LisaLocal => {
                let mut chars = name.chars();
                let marker = chars.next().unwrap_or('^');
                let digit = chars.next().and_then(|c| c.to_digit(10)).unwrap_or(0) as usize;
                sym.run = digit;
                sym.forward = marker == '>';
                let count = &mut self.lisa[digit];
                sym.full_name = match marker {
                    '^' => {
                        let full = format!("^{digit}#{count}");
                        *count += 1;
                        Some(full)
                    }
                    '>' => Some(format!("^{digit}#{count}")),
                    _ => count.checked_sub(1).map(|n| format!("^{digit}#{n}")),
                };
            }
            SymbolType::Ca65Local => {
                let run = name.len().saturating_sub(1);
                sym.run = run;
                sym.forward = name.ends_with('+');
                sym.full_name = if sym.is_def {
                    let full = format!(":#{}", self.ca65);
                    self.ca65 += 1;
                    Some(full)
                } else if sym.forward {
                    Some(format!(":#{}", self.ca65 + run - 1))
                } else {
                    self.ca65.checked_sub(run).map(|n| format!(":#{n}"))
                };
            }
            SymbolType::Variable | SymbolType::NamedParam => {
                sym.full_name = Some(name);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::{Token, TokenType};
    use arch::Syntax;

    fn sym(text: &str, ty: SymbolType, is_def: bool) -> SymbolExpr {
        SymbolExpr::new(Token::new(text, 0, text.len(), TokenType::Symbol), ty, is_def)
    }

    fn full(
        state: &mut ScopeState,
        text: &str,
        ty: SymbolType,
        is_def: bool,
        syntax: Syntax,
    ) -> Option<String> {
        let mut s = sym(text, ty, is_def);
        state.qualify(&mut s, SymbolFrom::ProgramCounter, false, SyntaxDef::get(syntax));
        s.full_name
    }

    #[test]
    fn cheap_locals_follow_anchor() {
        let mut st = ScopeState::new();
        let m = Syntax::Merlin;
        full(&mut st, "MAIN", SymbolType::Simple, true, m);
        let a = full(&mut st, ":LOOP1", SymbolType::CheapLocal, true, m);
        full(&mut st, "NEXT", SymbolType::Simple, true, m);
        let b = full(&mut st, ":LOOP1", SymbolType::CheapLocal, false, m);
        assert_eq!(a.as_deref(), Some("MAIN:LOOP1"));
        assert_eq!(b.as_deref(), Some("NEXT:LOOP1"));
    }

    #[test]
    fn acme_anonymous_counters() {
        let mut st = ScopeState::new();
        let a = Syntax::Acme;
        let t = SymbolType::AnonLocal;
        assert_eq!(full(&mut st, "-", t, false, a), None);
        assert_eq!(full(&mut st, "+", t, false, a).as_deref(), Some("+1#0"));
        assert_eq!(full(&mut st, "+", t, true, a).as_deref(), Some("+1#0"));
        assert_eq!(full(&mut st, "-", t, true, a).as_deref(), Some("-1#0"));
        assert_eq!(full(&mut st, "--", t, true, a).as_deref(), Some("-2#0"));
        assert_eq!(full(&mut st, "-", t, false, a).as_deref(), Some("-1#0"));
        assert_eq!(full(&mut st, "+", t, false, a).as_deref(), Some("+1#1"));
    }

    #[test]
    fn ca65_anonymous_counters() {
        let mut st = ScopeState::new();
        let c = Syntax::Ca65;
        let t = SymbolType::Ca65Local;
        assert_eq!(full(&mut st, ":+", t, false, c).as_deref(), Some(":#0"));
        assert_eq!(full(&mut st, ":++", t, false, c).as_deref(), Some(":#1"));
        assert_eq!(full(&mut st, ":", t, true, c).as_deref(), Some(":#0"));
        assert_eq!(full(&mut st, ":", t, true, c).as_deref(), Some(":#1"));
        assert_eq!(full(&mut st, ":-", t, false, c).as_deref(), Some(":#1"));
        assert_eq!(full(&mut st, ":--", t, false, c).as_deref(), Some(":#0"));
    }

    #[test]
    fn lisa_locals() {
        let mut st = ScopeState::new();
        let l = Syntax::Lisa;
        let t = SymbolType::LisaLocal;
        assert_eq!(full(&mut st, ">1", t, false, l).as_deref(), Some("^1#0"));
        assert_eq!(full(&mut st, "^1", t, true, l).as_deref(), Some("^1#0"));
        assert_eq!(full(&mut st, "<1", t, false, l).as_deref(), Some("^1#0"));
        assert_eq!(full(&mut st, "<2", t, false, l), None);
    }

    #[test]
    fn scoped_candidates_innermost_first() {
        let mut st = ScopeState::new();
        st.push_scope("outer");
        st.push_scope("inner");
        let mut s = sym("foo", SymbolType::Simple, false);
        st.qualify(&mut s, SymbolFrom::Unknown, false, SyntaxDef::get(Syntax::Ca65));
        assert_eq!(
            s.candidates,
            vec!["outer::inner::foo", "outer::foo", "foo"]
        );
        let abs = full(&mut st, "::foo", SymbolType::Scoped, false, Syntax::Ca65);
        assert_eq!(abs.as_deref(), Some("foo"));
    }

    #[test]
    fn zone_locals() {
        let mut st = ScopeState::new();
        let d = Syntax::Dasm;
        let mut start = sym("START", SymbolType::Simple, true);
        st.qualify(&mut start, SymbolFrom::ProgramCounter, true, SyntaxDef::get(d));
        let dot = full(&mut st, ".loop", SymbolType::ZoneLocal, true, d);
        let dollar = full(&mut st, "loop$", SymbolType::ZoneLocal, true, d);
        assert_eq!(dot.as_deref(), Some("START.loop"));
        assert_eq!(dollar.as_deref(), Some("START.loop$"));
        assert_eq!(st.next_zone_name(), "__zone0");
    }
}
