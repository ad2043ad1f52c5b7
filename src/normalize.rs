use serde_derive::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Canonical join key for a gene display name: trimmed and uppercased.
///
/// Every join in the pipeline compares `GeneKey`s, never raw names, so a
/// symbol spelled `egfr ` in one source still finds `EGFR` in another.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct GeneKey(String);

impl GeneKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Borrow<str> for GeneKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GeneKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GeneKey {
    fn from(name: &str) -> Self {
        normalize(name)
    }
}

pub fn normalize(name: &str) -> GeneKey {
    GeneKey(name.trim().to_uppercase())
}

#[cfg(test)]
mod test {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("EGFR", "EGFR")]
    #[case("  egfr\t", "EGFR")]
    #[case("Brca1", "BRCA1")]
    #[case("", "")]
    #[case("   ", "")]
    fn normalize_trims_and_uppercases(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(normalize(raw).as_str(), expected);
    }

    #[test]
    fn normalize_is_idempotent() {
        let once = normalize(" kras ");
        let twice = normalize(once.as_str());
        assert_eq!(once, twice);
    }

    #[test]
    fn borrow_allows_str_lookup() {
        let mut map = indexmap::IndexMap::new();
        map.insert(normalize("tp53"), 1);
        assert_eq!(map.get("TP53"), Some(&1));
    }
}
