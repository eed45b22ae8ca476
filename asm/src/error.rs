use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Failed to read file: {0}")]
    FileRead(String, #[source] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Config(String, #[source] serde_yaml::Error),

    #[error("Failed to write YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Conditional nesting exceeds {0} levels")]
    NestingOverflow(usize),

    #[error("File nesting exceeds {0} levels (recursive include?)")]
    IncludeOverflow(usize),
}
