use arch::Syntax;

/// Per-dialect votes collected while the dialect is unknown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Detector {
    strong: [u32; Syntax::COUNT],
    weak: [u32; Syntax::COUNT],
    pinned: Option<Syntax>,
}

impl Detector {
    pub fn new() -> Self {
        Self::default()
    }

    /// A detector that never votes.
    pub fn fixed(syntax: Syntax) -> Self {
        Detector {
            pinned: syntax.is_known().then_some(syntax),
            ..Self::default()
        }
    }

    pub fn pinned(&self) -> Option<Syntax> {
        self.pinned
    }

    pub fn pin(&mut self, syntax: Syntax) {
        if syntax.is_known() {
            self.pinned = Some(syntax);
        }
    }

    /// Pin the dialect if `line` carries a `SYNTAX:<name>` marker.
    pub fn scan_pin(&mut self, line: &str) {
        let upper = line.to_ascii_uppercase();
        let Some(at) = upper.find("SYNTAX:") else {
            return;
        };
        let name: String = upper[at + 7..]
            .trim_start()
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric())
            .collect();
        if let Ok(syntax) = Syntax::parse(&name) {
            self.pin(syntax);
        }
    }

    pub fn vote_strong(&mut self, syntax: Syntax) {
        if let Some(idx) = syntax.index() {
            self.strong[idx] += 1;
        }
    }

    pub fn vote_weak(&mut self, syntax: Syntax) {
        if let Some(idx) = syntax.index() {
            self.weak[idx] += 1;
        }
    }

    pub fn strong(&self, syntax: Syntax) -> u32 {
        syntax.index().map(|i| self.strong[i]).unwrap_or(0)
    }

    pub fn weak(&self, syntax: Syntax) -> u32 {
        syntax.index().map(|i| self.weak[i]).unwrap_or(0)
    }

    /// Winning dialect: the pin, else most strong votes, then most weak
    /// votes, then lowest index. `Unknown` when nothing has voted.
    pub fn best(&self) -> Syntax {
        if let Some(pinned) = self.pinned {
            return pinned;
        }
        let mut best: Option<(usize, u32, u32)> = None;
        for idx in 0..Syntax::COUNT {
            let score = (self.strong[idx], self.weak[idx]);
            if score == (0, 0) {
                continue;
            }
            match best {
                Some((_, s, w)) if (s, w) >= score => {}
                _ => best = Some((idx, score.0, score.1)),
            }
        }
        best.map(|(idx, _, _)| Syntax::from_index(idx))
            .unwrap_or(Syntax::Unknown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strong_beats_weak_then_index() {
        let mut d = Detector::new();
        assert_eq!(d.best(), Syntax::Unknown);
        d.vote_weak(Syntax::Merlin);
        d.vote_weak(Syntax::Merlin);
        d.vote_strong(Syntax::Acme);
        assert_eq!(d.best(), Syntax::Acme);
        d.vote_strong(Syntax::Dasm);
        assert_eq!(d.best(), Syntax::Dasm);
    }

    #[test]
    fn marker_pins() {
        let mut d = Detector::new();
        d.scan_pin("; SYNTAX: ca65 please");
        assert_eq!(d.pinned(), Some(Syntax::Ca65));
        d.vote_strong(Syntax::Merlin);
        assert_eq!(d.best(), Syntax::Ca65);
        d.scan_pin("; syntax:bogus");
        assert_eq!(d.pinned(), Some(Syntax::Ca65));
    }
}
