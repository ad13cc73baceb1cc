//! Answer Checking
//!
//! Submissions and expected answers are trimmed and lowercased before
//! comparison. Single-character answers are matched leniently: the
//! submission only has to contain the character ("rojo" passes for "r").

/// Normalize text for comparison.
pub fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Judge a submission against the expected answer.
pub fn is_correct(submitted: &str, expected: &str) -> bool {
    let submitted = normalize(submitted);
    let expected = normalize(expected);

    if submitted == expected {
        return true;
    }

    expected.chars().count() == 1 && submitted.contains(expected.as_str())
}
