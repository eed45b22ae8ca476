use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tracing::debug;

use crate::error::Error;
use crate::statement::Statement;

pub type FileId = usize;

/// Where source text comes from. Contents are immutable for a run.
///
/// `Ok(None)` means the path does not exist; `Err` means it exists but
/// could not be read.
pub trait SourceProvider {
    fn open(&self, path: &str) -> Result<Option<Rc<Vec<String>>>, Error>;
}

/// Reads files from disk, trying each include directory in turn.
#[derive(Debug, Clone, Default)]
pub struct FsProvider {
    include_dirs: Vec<PathBuf>,
}

impl FsProvider {
    pub fn new(include_dirs: Vec<PathBuf>) -> Self {
        FsProvider { include_dirs }
    }

    pub fn read(path: &Path) -> Result<Vec<String>, Error> {
        let text = std::fs::read(path)
            .map_err(|e| Error::FileRead(path.display().to_string(), e))?;
        // Old sources are often Latin-1 or high-bit ASCII.
        let text = String::from_utf8_lossy(&text);
        Ok(text.lines().map(|l| l.trim_end_matches('\r').to_string()).collect())
    }
}

impl SourceProvider for FsProvider {
    fn open(&self, path: &str) -> Result<Option<Rc<Vec<String>>>, Error> {
        let candidates = std::iter::once(PathBuf::from(path))
            .chain(self.include_dirs.iter().map(|dir| dir.join(path)));
        for candidate in candidates {
            if candidate.is_file() {
                debug!("open {}", candidate.display());
                return FsProvider::read(&candidate).map(|lines| Some(Rc::new(lines)));
            }
        }
        Ok(None)
    }
}

/// In-memory sources, keyed by path.
#[derive(Debug, Clone, Default)]
pub struct MemoryProvider {
    files: HashMap<String, Rc<Vec<String>>>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, path: &str, text: &str) -> &mut Self {
        let lines = text.lines().map(str::to_string).collect();
        self.files.insert(path.to_string(), Rc::new(lines));
        self
    }

    pub fn with(mut self, path: &str, text: &str) -> Self {
        self.add(path, text);
        self
    }
}

impl SourceProvider for MemoryProvider {
    fn open(&self, path: &str) -> Result<Option<Rc<Vec<String>>>, Error> {
        Ok(self.files.get(path).cloned())
    }
}

/// One opened file. Shared includes keep a single instance across include
/// sites; any other include gets its own.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub id: FileId,
    pub path: String,
    pub lines: Rc<Vec<String>>,
    pub statements: Vec<Option<Statement>>,
    pub shared: bool,
    /// Set once the file's symbols have been processed (shared includes).
    pub processed: bool,
}

impl SourceFile {
    pub fn new(id: FileId, path: &str, lines: Rc<Vec<String>>, shared: bool) -> Self {
        SourceFile {
            id,
            path: path.to_string(),
            statements: vec![None; lines.len()],
            lines,
            shared,
            processed: false,
        }
    }

    pub fn line(&self, idx: usize) -> &str {
        self.lines.get(idx).map(String::as_str).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_provider_opens_by_path() {
        let provider = MemoryProvider::new().with("a.s", " LDA #1\n RTS");
        let lines = provider.open("a.s").unwrap().unwrap();
        assert_eq!(lines.len(), 2);
        assert!(provider.open("b.s").unwrap().is_none());
        let file = SourceFile::new(0, "a.s", lines, false);
        assert_eq!(file.line(1), " RTS");
        assert_eq!(file.line(5), "");
    }

    #[test]
    fn fs_provider_reports_missing_as_none() {
        let provider = FsProvider::new(vec![]);
        assert!(provider.open("no/such/dir/main.s").unwrap().is_none());
    }

    #[test]
    fn fs_provider_propagates_read_errors() {
        // A directory named like a file exists but cannot be read as one.
        let dir = std::env::temp_dir().join("asm65-unreadable.s");
        std::fs::create_dir_all(&dir).unwrap();
        let result = FsProvider::read(&dir);
        assert!(matches!(result, Err(Error::FileRead(_, _))));
    }
}
