use rusty_ulid::Ulid;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::str::FromStr;
use std::{fmt::Display, ops::Deref};

/// Time-ordered entry id (ULID text form).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Hash)]
pub struct Eid(String);

impl Display for Eid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Eid {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Eid(s.to_string()))
    }
}

impl Deref for Eid {
    type Target = String;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<&str> for Eid {
    fn from(fr: &str) -> Self {
        Eid(fr.to_string())
    }
}

impl From<String> for Eid {
    fn from(fr: String) -> Self {
        Eid(fr)
    }
}

impl Eid {
    #[inline]
    pub fn new() -> Eid {
        Eid(Ulid::generate().to_string())
    }

    /// Next id strictly after `previous`, even within the same millisecond.
    /// Falls back to a fresh id when `previous` is not a ULID (e.g. imported data).
    pub fn after(previous: &Eid) -> Eid {
        match previous.0.parse::<Ulid>() {
            Ok(prev) => Eid(Ulid::next_monotonic(prev).to_string()),
            Err(_) => Eid::new(),
        }
    }
}

impl Default for Eid {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_after_previous_sort_later() {
        let mut prev = Eid::new();
        for _ in 0..50 {
            let next = Eid::after(&prev);
            assert!(next > prev, "{next} should sort after {prev}");
            prev = next;
        }
    }

    #[test]
    fn foreign_previous_id_still_yields_an_id() {
        let id = Eid::after(&Eid::from("1700000000000"));
        assert_eq!(id.len(), 26);
    }
}
