use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the four approaches at a junction. Declaration order is the capture
/// order and the order of every persisted array.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SignalId {
    A,
    B,
    C,
    D,
}

impl SignalId {
    pub const COUNT: usize = 4;
    pub const ALL: [SignalId; SignalId::COUNT] = [SignalId::A, SignalId::B, SignalId::C, SignalId::D];

    pub fn index(self) -> usize {
        match self {
            SignalId::A => 0,
            SignalId::B => 1,
            SignalId::C => 2,
            SignalId::D => 3,
        }
    }

    pub fn from_index(index: usize) -> Option<SignalId> {
        Self::ALL.get(index).copied()
    }

    pub fn letter(self) -> &'static str {
        match self {
            SignalId::A => "A",
            SignalId::B => "B",
            SignalId::C => "C",
            SignalId::D => "D",
        }
    }

    /// The signal after this one, wrapping D back to A.
    pub fn next_in_cycle(self) -> SignalId {
        Self::ALL[(self.index() + 1) % Self::COUNT]
    }

    pub fn parse(value: &str) -> Option<SignalId> {
        match value.trim() {
            "A" | "a" => Some(SignalId::A),
            "B" | "b" => Some(SignalId::B),
            "C" | "c" => Some(SignalId::C),
            "D" | "d" => Some(SignalId::D),
            _ => None,
        }
    }
}

impl fmt::Display for SignalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.letter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordinal_maps_to_letter() {
        let letters: Vec<_> = (0..4)
            .map(|i| SignalId::from_index(i).unwrap().letter())
            .collect();
        assert_eq!(letters, ["A", "B", "C", "D"]);
        assert_eq!(SignalId::from_index(4), None);
    }

    #[test]
    fn cycle_wraps_after_d() {
        assert_eq!(SignalId::C.next_in_cycle(), SignalId::D);
        assert_eq!(SignalId::D.next_in_cycle(), SignalId::A);
    }

    #[test]
    fn parse_accepts_either_case() {
        assert_eq!(SignalId::parse(" b "), Some(SignalId::B));
        assert_eq!(SignalId::parse("E"), None);
    }
}
