//! String helpers for deriving storage names from model type names.

/// Simple English pluralization of a lower-case word.
pub fn pluralize(word: &str) -> String {
    let vowel_y = ["ay", "ey", "iy", "oy", "uy"];
    if word.ends_with('y') && word.len() > 1 && !vowel_y.iter().any(|s| word.ends_with(s)) {
        format!("{}ies", &word[..word.len() - 1])
    } else if word.ends_with('s')
        || word.ends_with("sh")
        || word.ends_with("ch")
        || word.ends_with('x')
        || word.ends_with('z')
    {
        format!("{}es", word)
    } else {
        format!("{}s", word)
    }
}

/// Table (or directory) name for a model type: the pluralized, lower-cased type name.
pub fn table_name(type_name: &str) -> String {
    pluralize(&type_name.to_lowercase())
}
