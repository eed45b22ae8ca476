pub mod config;
pub mod detect;
pub mod error;
pub mod expr;
pub mod listing;
pub mod message;
pub mod module;
pub mod parser;
pub mod preprocess;
pub mod renumber;
pub mod scope;
pub mod source;
pub mod statement;
pub mod symbol;
pub mod syntax;
pub mod token;
pub mod tokenizer;

pub use arch::Syntax;
pub use config::Config;
pub use error::Error;
pub use message::{Diagnostic, Severity};
pub use module::{assemble, Module, Project, StmtRef};
pub use parser::{parse_detect, parse_line};
pub use source::{FsProvider, MemoryProvider, SourceProvider};
