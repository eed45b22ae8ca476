//! Column-aligned listing and symbol table views of a processed module.

use serde::Serialize;

use crate::config::Config;
use crate::module::Module;
use crate::statement::{Statement, StmtKind};
use crate::symbol::{SymbolFlags, SymbolFrom, SymbolType};

/// Lay out one statement on the configured tab stops: label, keyword,
/// operand, comment.
pub fn format_line(stmt: &Statement, text: &str, config: &Config) -> String {
    if matches!(stmt.kind, StmtKind::Empty | StmtKind::Disabled) && stmt.label.is_none() {
        return text.trim_end().to_string();
    }
    let stop = |n: usize| config.tab_stops.get(n).copied().unwrap_or(0);

    let mut out = String::new();
    if let Some(label) = &stmt.label {
        out.push_str(&label.token.text);
    }
    let Some(keyword) = &stmt.keyword else {
        if let Some(comment) = &stmt.comment {
            pad(&mut out, stop(2));
            out.push_str(&comment.text);
        }
        return out;
    };
    pad(&mut out, stop(0));
    if config.upper_case {
        out.push_str(&keyword.upper());
    } else {
        out.push_str(&keyword.text);
    }

    let operand_end = stmt.comment.as_ref().map_or(text.len(), |c| c.start);
    let operand = text.get(keyword.end..operand_end).unwrap_or_default().trim();
    if !operand.is_empty() {
        pad(&mut out, stop(1).max(stop(0) + 1));
        out.push_str(operand);
    }
    if let Some(comment) = &stmt.comment {
        pad(&mut out, stop(2));
        out.push_str(&comment.text);
    }
    out
}

/// Append spaces up to `column`, or one space when already past it.
fn pad(out: &mut String, column: usize) {
    let len = out.chars().count();
    if len < column {
        out.push_str(&" ".repeat(column - len));
    } else if !out.is_empty() {
        out.push(' ');
    }
}

/// Every line of every file in the module, formatted.
pub fn listing(module: &Module, config: &Config) -> Vec<String> {
    let mut out = Vec::new();
    for file in module.files() {
        out.push(format!("; {}", file.path));
        for (idx, stmt) in file.statements.iter().enumerate() {
            let text = file.line(idx);
            match stmt {
                Some(stmt) => out.push(format_line(stmt, text, config)),
                None => out.push(text.to_string()),
            }
        }
    }
    out
}

#[derive(Debug, Clone, Serialize)]
pub struct SymbolRow {
    pub name: String,
    pub ty: SymbolType,
    pub from: SymbolFrom,
    pub value: Option<i64>,
    pub file: String,
    pub line: usize,
    pub references: usize,
    pub flags: SymbolFlags,
}

pub fn symbol_rows(module: &Module) -> Vec<SymbolRow> {
    let symbols = module.symbols();
    symbols
        .iter()
        .map(|(id, s)| SymbolRow {
            name: s.name.clone(),
            ty: s.ty,
            from: s.from,
            value: symbols.resolve(id),
            file: module
                .files()
                .get(s.definition.file)
                .map(|f| f.path.clone())
                .unwrap_or_default(),
            line: s.definition.line + 1,
            references: s.references.len(),
            flags: s.flags,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_line;
    use arch::Syntax;

    #[test]
    fn columns_follow_tab_stops() {
        let config = Config::default();
        let text = "LOOP lda   #$10,x  ; count";
        let stmt = parse_line(text, Syntax::Merlin);
        let line = format_line(&stmt, text, &config);
        assert_eq!(line.find("lda"), Some(16));
        assert_eq!(line.find("#$10,x"), Some(20));
        assert_eq!(line.find("; count"), Some(40));

        let upper = Config {
            upper_case: true,
            ..Config::default()
        };
        assert!(format_line(&stmt, text, &upper).contains("LDA"));
    }
}
