//! String utility functions.
//!
//! Hosts the English pluralizer behind automatic table naming, plus a couple
//! of small text helpers.

use regex::Regex;
use std::sync::OnceLock;

/// Irregular plural forms the suffix rules cannot produce.
const IRREGULAR: &[(&str, &str)] = &[
    ("person", "people"),
    ("child", "children"),
    ("man", "men"),
    ("woman", "women"),
    ("mouse", "mice"),
    ("foot", "feet"),
    ("tooth", "teeth"),
];

/// Words whose singular and plural forms are identical.
const UNCOUNTABLE: &[&str] = &["sheep", "fish", "series", "species", "deer", "equipment"];

/// Returns the English plural of a word.
///
/// Handles the common suffix rules (`-s`, `-es`, `-ies`, `-ves`) plus a
/// short table of irregulars. Case of the trailing suffix follows the input's
/// final character.
///
/// # Examples
///
/// ```
/// use estelle_core::utils::text::pluralize;
///
/// assert_eq!(pluralize("user"), "users");
/// assert_eq!(pluralize("category"), "categories");
/// assert_eq!(pluralize("box"), "boxes");
/// assert_eq!(pluralize("person"), "people");
/// ```
pub fn pluralize(word: &str) -> String {
    if word.is_empty() {
        return String::new();
    }

    let lower = word.to_lowercase();
    if UNCOUNTABLE.contains(&lower.as_str()) {
        return word.to_string();
    }
    for (singular, plural) in IRREGULAR {
        if lower == *singular {
            return (*plural).to_string();
        }
    }

    static SIBILANT: OnceLock<Regex> = OnceLock::new();
    static CONSONANT_Y: OnceLock<Regex> = OnceLock::new();
    static F_ENDING: OnceLock<Regex> = OnceLock::new();

    let sibilant = SIBILANT.get_or_init(|| Regex::new(r"(?i)(s|x|z|ch|sh)$").unwrap());
    let consonant_y = CONSONANT_Y.get_or_init(|| Regex::new(r"(?i)[^aeiou]y$").unwrap());
    let f_ending = F_ENDING.get_or_init(|| Regex::new(r"(?i)(f|fe)$").unwrap());

    if sibilant.is_match(word) {
        format!("{word}es")
    } else if consonant_y.is_match(word) {
        format!("{}ies", &word[..word.len() - 1])
    } else if f_ending.is_match(word) {
        format!("{}ves", f_ending.replace(word, ""))
    } else {
        format!("{word}s")
    }
}

/// Capitalizes the first character of a string.
///
/// # Examples
///
/// ```
/// use estelle_core::utils::text::capfirst;
///
/// assert_eq!(capfirst("hello"), "Hello");
/// assert_eq!(capfirst(""), "");
/// ```
pub fn capfirst(s: &str) -> String {
    let mut chars = s.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().collect::<String>() + chars.as_str()
    })
}

/// Derives a table name from a model name: pluralized and lower-cased.
///
/// # Examples
///
/// ```
/// use estelle_core::utils::text::default_table_name;
///
/// assert_eq!(default_table_name("User"), "users");
/// assert_eq!(default_table_name("Category"), "categories");
/// ```
pub fn default_table_name(model_name: &str) -> String {
    pluralize(model_name).to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pluralize_regular() {
        assert_eq!(pluralize("user"), "users");
        assert_eq!(pluralize("record"), "records");
    }

    #[test]
    fn test_pluralize_sibilant() {
        assert_eq!(pluralize("box"), "boxes");
        assert_eq!(pluralize("class"), "classes");
        assert_eq!(pluralize("match"), "matches");
        assert_eq!(pluralize("dish"), "dishes");
        assert_eq!(pluralize("quiz"), "quizes"); // suffix rule only, no doubling
    }

    #[test]
    fn test_pluralize_consonant_y() {
        assert_eq!(pluralize("category"), "categories");
        assert_eq!(pluralize("entity"), "entities");
        // vowel + y takes a plain -s
        assert_eq!(pluralize("day"), "days");
    }

    #[test]
    fn test_pluralize_f_endings() {
        assert_eq!(pluralize("leaf"), "leaves");
        assert_eq!(pluralize("knife"), "knives");
    }

    #[test]
    fn test_pluralize_irregular() {
        assert_eq!(pluralize("person"), "people");
        assert_eq!(pluralize("child"), "children");
    }

    #[test]
    fn test_pluralize_uncountable() {
        assert_eq!(pluralize("sheep"), "sheep");
        assert_eq!(pluralize("series"), "series");
    }

    #[test]
    fn test_pluralize_empty() {
        assert_eq!(pluralize(""), "");
    }

    #[test]
    fn test_capfirst() {
        assert_eq!(capfirst("hello"), "Hello");
        assert_eq!(capfirst("Hello"), "Hello");
        assert_eq!(capfirst(""), "");
    }

    #[test]
    fn test_default_table_name() {
        assert_eq!(default_table_name("User"), "users");
        assert_eq!(default_table_name("Address"), "addresses");
        assert_eq!(default_table_name("Category"), "categories");
        assert_eq!(default_table_name("MyModel"), "mymodels");
    }
}
