/// Keyword categories, in match order. A record matches a category when any
/// of its keywords contains one of the listed terms, ignoring case.
pub const CATEGORIES: &[(&str, &[&str])] = &[
    (
        "Wildlife",
        &["wildlife", "bird", "eagle", "hawk", "owl", "bear", "deer", "fox", "animal"],
    ),
    (
        "Weddings",
        &["wedding", "bride", "groom", "ceremony", "reception"],
    ),
    (
        "Sports",
        &["sports", "racing", "football", "soccer", "basketball", "tennis"],
    ),
    (
        "Portraits",
        &["portrait", "headshot", "people", "person", "face", "model"],
    ),
    (
        "Landscapes",
        &["landscape", "scenery", "mountain", "beach", "sunset", "sunrise"],
    ),
    ("Pets", &["pet", "dog", "cat", "puppy", "kitten"]),
];

pub const GENERAL_CATEGORY: &str = "General";

/// First category (in declared order) matched by `keywords`.
pub fn match_category(keywords: &[String]) -> Option<&'static str> {
    let lowered: Vec<String> = keywords.iter().map(|k| k.to_lowercase()).collect();

    CATEGORIES
        .iter()
        .find(|(_, terms)| {
            lowered
                .iter()
                .any(|keyword| terms.iter().any(|term| keyword.contains(term)))
        })
        .map(|(category, _)| *category)
}
