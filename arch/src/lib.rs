pub mod mode;
pub mod op;
pub mod opcode;
pub mod syntax;

pub use mode::Mode;
pub use op::Op;
pub use syntax::Syntax;
