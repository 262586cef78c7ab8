use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Static identifier → author/year lookup used when neither metadata nor the
/// dashboard names them. Keys are matched exactly (case-sensitive).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InferenceTable {
    #[serde(default)]
    pub authors: BTreeMap<String, String>,
    #[serde(default)]
    pub years: BTreeMap<String, i32>,
}

const BUILTIN_AUTHORS: &[(&str, &str)] = &[
    ("hamlet", "William Shakespeare"),
    ("macbeth", "William Shakespeare"),
    ("othello", "William Shakespeare"),
    ("king_lear", "William Shakespeare"),
    ("romeo_and_juliet", "William Shakespeare"),
    ("the_great_gatsby", "F. Scott Fitzgerald"),
    ("The_Great_Gatsby_DATA", "F. Scott Fitzgerald"),
    ("monte_cristo", "Alexandre Dumas"),
    ("Monte_Cristo", "Alexandre Dumas"),
    ("pride_and_prejudice", "Jane Austen"),
    ("moby_dick", "Herman Melville"),
    ("frankenstein", "Mary Shelley"),
];

const BUILTIN_YEARS: &[(&str, i32)] = &[
    ("hamlet", 1603),
    ("macbeth", 1623),
    ("othello", 1622),
    ("king_lear", 1608),
    ("romeo_and_juliet", 1597),
    ("the_great_gatsby", 1925),
    ("The_Great_Gatsby_DATA", 1925),
    ("monte_cristo", 1844),
    ("Monte_Cristo", 1844),
    ("pride_and_prejudice", 1813),
    ("moby_dick", 1851),
    ("frankenstein", 1818),
];

impl InferenceTable {
    /// Table shipped with the binary.
    pub fn builtin() -> Self {
        Self {
            authors: BUILTIN_AUTHORS
                .iter()
                .map(|(id, author)| (id.to_string(), author.to_string()))
                .collect(),
            years: BUILTIN_YEARS
                .iter()
                .map(|(id, year)| (id.to_string(), *year))
                .collect(),
        }
    }

    /// Layer `other` on top of `self`; entries in `other` win.
    pub fn overlay(mut self, other: InferenceTable) -> Self {
        self.authors.extend(other.authors);
        self.years.extend(other.years);
        self
    }

    pub fn author(&self, id: &str) -> Option<&str> {
        self.authors.get(id).map(String::as_str)
    }

    pub fn year(&self, id: &str) -> Option<i32> {
        self.years.get(id).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.authors.is_empty() && self.years.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_lookup_is_exact_match() {
        let table = InferenceTable::builtin();
        assert_eq!(table.author("hamlet"), Some("William Shakespeare"));
        assert_eq!(table.author("Hamlet"), None);
        assert_eq!(table.author("ham"), None);
        assert_eq!(table.year("the_great_gatsby"), Some(1925));
    }

    #[test]
    fn overlay_prefers_new_entries() {
        let mut extra = InferenceTable::default();
        extra
            .authors
            .insert("hamlet".to_string(), "W. Shakespeare".to_string());
        extra.years.insert("ulysses".to_string(), 1922);

        let table = InferenceTable::builtin().overlay(extra);
        assert_eq!(table.author("hamlet"), Some("W. Shakespeare"));
        assert_eq!(table.year("ulysses"), Some(1922));
        assert_eq!(table.author("macbeth"), Some("William Shakespeare"));
    }
}
