//! Renumber numbered local labels (`:1`, `.10`, `3$`) over a range of
//! already-processed statements. The statements are not touched; the result
//! is a list of edits against the source lines.

use std::collections::HashMap;

use crate::expr::SymbolExpr;
use crate::statement::Statement;
use crate::symbol::SymbolType;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEdit {
    pub line: usize,
    pub start: usize,
    pub end: usize,
    pub text: String,
}

/// Split a local name into its fixed part and the numeric part.
fn split_number(name: &str) -> Option<(&str, &str, &str)> {
    let trimmed = name.trim_end_matches('$');
    let tail = &name[trimmed.len()..];
    let digits = trimmed.len() - trimmed.trim_end_matches(|c: char| c.is_ascii_digit()).len();
    if digits == 0 {
        return None;
    }
    let (head, number) = trimmed.split_at(trimmed.len() - digits);
    // Only the marker may precede the number.
    (head.chars().count() <= 1).then_some((head, number, tail))
}

fn renumberable(sym: &SymbolExpr) -> bool {
    matches!(sym.ty, SymbolType::CheapLocal | SymbolType::ZoneLocal) && split_number(sym.name()).is_some()
}

/// Give numbered locals defined in `statements` the numbers `start`,
/// `start + step`, ... in definition order, and rewrite every reference in
/// the range to match. `statements` pairs each statement with its line.
pub fn renumber_locals(statements: &[(usize, &Statement)], start: u32, step: u32) -> Vec<TextEdit> {
    let mut renamed: HashMap<String, String> = HashMap::new();
    let mut next = start;
    for (_, stmt) in statements {
        stmt.for_each_symbol(&mut |sym| {
            if !sym.is_def || !renumberable(sym) {
                return;
            }
            let Some(full) = &sym.full_name else {
                return;
            };
            if renamed.contains_key(full) {
                return;
            }
            if let Some((head, _, tail)) = split_number(sym.name()) {
                renamed.insert(full.clone(), format!("{head}{next}{tail}"));
                next += step;
            }
        });
    }

    let mut edits = Vec::new();
    for (line, stmt) in statements {
        stmt.for_each_symbol(&mut |sym| {
            if !renumberable(sym) {
                return;
            }
            let Some(text) = sym.full_name.as_ref().and_then(|f| renamed.get(f)) else {
                return;
            };
            if *text != sym.token.text {
                edits.push(TextEdit {
                    line: *line,
                    start: sym.token.start,
                    end: sym.token.end,
                    text: text.clone(),
                });
            }
        });
    }
    edits.sort_by_key(|e| (e.line, e.start));
    edits.dedup();
    edits
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_split() {
        assert_eq!(split_number(":12"), Some((":", "12", "")));
        assert_eq!(split_number(".3"), Some((".", "3", "")));
        assert_eq!(split_number("7$"), Some(("", "7", "$")));
        assert_eq!(split_number(":LOOP1"), None);
        assert_eq!(split_number(":X"), None);
    }
}
