use arch::Syntax;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use crate::error::Error;

/// Project options, read from `asm65.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// `unknown` turns on auto-detection.
    pub syntax: Syntax,
    /// Include paths that share one source file across all include sites.
    pub shared_includes: Vec<String>,
    pub include_dirs: Vec<PathBuf>,
    /// Listing columns for opcode, operand and comment.
    pub tab_stops: Vec<usize>,
    pub upper_case: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            syntax: Syntax::Unknown,
            shared_includes: Vec::new(),
            include_dirs: Vec::new(),
            tab_stops: vec![16, 20, 40],
            upper_case: false,
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self, Error> {
        let file = File::open(path).map_err(|_| Error::FileNotFound(path.to_string()))?;
        serde_yaml::from_reader(BufReader::new(file)).map_err(|e| Error::Config(path.to_string(), e))
    }

    pub fn from_yaml(text: &str) -> Result<Self, Error> {
        serde_yaml::from_str(text).map_err(|e| Error::Config("<inline>".to_string(), e))
    }

    pub fn with_syntax(syntax: Syntax) -> Self {
        Config {
            syntax,
            ..Config::default()
        }
    }

    pub fn is_shared(&self, path: &str) -> bool {
        self.shared_includes.iter().any(|p| p == path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config = Config::from_yaml("syntax: ca65\nshared_includes: [macros.inc]\n").unwrap();
        assert_eq!(config.syntax, Syntax::Ca65);
        assert!(config.is_shared("macros.inc"));
        assert_eq!(config.tab_stops, vec![16, 20, 40]);
        assert!(Config::from_yaml("syntax: [").is_err());
    }
}
