use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Assembler dialect.
///
/// The discriminant doubles as the index into per-dialect vote arrays, so
/// the known dialects are numbered densely from zero and `Unknown` comes last.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    IntoPrimitive,
    TryFromPrimitive,
    EnumString,
    EnumIter,
    Display,
)]
#[repr(u8)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive, serialize_all = "UPPERCASE")]
pub enum Syntax {
    Merlin = 0,
    Dasm = 1,
    Ca65 = 2,
    Acme = 3,
    Lisa = 4,
    #[default]
    Unknown = 5,
}

impl Syntax {
    pub const COUNT: usize = 5;

    pub const KNOWN: [Syntax; Syntax::COUNT] = [
        Syntax::Merlin,
        Syntax::Dasm,
        Syntax::Ca65,
        Syntax::Acme,
        Syntax::Lisa,
    ];

    pub fn parse(s: &str) -> Result<Self, String> {
        match s.trim().parse::<Self>() {
            Ok(syntax) => Ok(syntax),
            Err(_) => Err(format!("Unknown syntax: {s}")),
        }
    }

    /// Slot in a vote array, `None` for `Unknown`.
    pub fn index(self) -> Option<usize> {
        let idx: u8 = self.into();
        ((idx as usize) < Syntax::COUNT).then_some(idx as usize)
    }

    pub fn from_index(idx: usize) -> Syntax {
        u8::try_from(idx)
            .ok()
            .and_then(|idx| Syntax::try_from(idx).ok())
            .unwrap_or(Syntax::Unknown)
    }

    pub fn is_known(self) -> bool {
        self != Syntax::Unknown
    }

    /// Merlin and LISA share the Apple II conventions: labels only in
    /// column 1, high-bit ASCII for double quotes, `*` comment lines.
    pub fn is_merlin_family(self) -> bool {
        matches!(self, Syntax::Merlin | Syntax::Lisa)
    }
}

#[test]
fn test() {
    assert_eq!(Syntax::parse("merlin"), Ok(Syntax::Merlin));
    assert_eq!(Syntax::parse("CA65"), Ok(Syntax::Ca65));
    assert!(Syntax::parse("tasm").is_err());
    assert_eq!(Syntax::Acme.index(), Some(3));
    assert_eq!(Syntax::Unknown.index(), None);
    assert_eq!(Syntax::from_index(4), Syntax::Lisa);
    assert_eq!(Syntax::from_index(9), Syntax::Unknown);
    assert_eq!(Syntax::Dasm.to_string(), "DASM");
}
