//! Built-in unit set and loading of custom ones.

use std::path::Path;

use quiz_core::model::TestableUnit;

/// Unit set id used for the built-in sample.
pub const SAMPLE_UNIT_SET: u64 = 1;

/// The 24 runes of the Elder Futhark with their transliterations.
const ELDER_FUTHARK: [(&str, &str, &str); 24] = [
    ("ᚠ", "f", "fehu"),
    ("ᚢ", "u", "uruz"),
    ("ᚦ", "th", "thurisaz"),
    ("ᚨ", "a", "ansuz"),
    ("ᚱ", "r", "raido"),
    ("ᚲ", "k", "kaunan"),
    ("ᚷ", "g", "gebo"),
    ("ᚹ", "w", "wunjo"),
    ("ᚺ", "h", "hagalaz"),
    ("ᚾ", "n", "naudiz"),
    ("ᛁ", "i", "isaz"),
    ("ᛃ", "j", "jera"),
    ("ᛇ", "ei", "eihwaz"),
    ("ᛈ", "p", "perth"),
    ("ᛉ", "z", "algiz"),
    ("ᛊ", "s", "sowilo"),
    ("ᛏ", "t", "tiwaz"),
    ("ᛒ", "b", "berkanan"),
    ("ᛖ", "e", "ehwaz"),
    ("ᛗ", "m", "mannaz"),
    ("ᛚ", "l", "laguz"),
    ("ᛜ", "ng", "ingwaz"),
    ("ᛞ", "d", "dagaz"),
    ("ᛟ", "o", "othala"),
];

#[must_use]
pub fn elder_futhark() -> Vec<TestableUnit> {
    ELDER_FUTHARK
        .iter()
        .map(|(symbol, answer, label)| TestableUnit::new(*symbol, *answer, *label))
        .collect()
}

/// Read a JSON array of units.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a unit array.
pub fn load_units(path: &Path) -> Result<Vec<TestableUnit>, Box<dyn std::error::Error>> {
    let raw = std::fs::read_to_string(path)?;
    let units: Vec<TestableUnit> = serde_json::from_str(&raw)?;
    Ok(units)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn sample_has_unique_symbols_and_answers() {
        let units = elder_futhark();
        assert_eq!(units.len(), 24);
        let symbols: HashSet<_> = units.iter().map(|u| u.symbol.as_str()).collect();
        let answers: HashSet<_> = units.iter().map(|u| u.expected_answer.as_str()).collect();
        assert_eq!(symbols.len(), 24);
        assert_eq!(answers.len(), 24);
    }
}
