/// Normalize OCR output line by line.
///
/// Non-printable and non-ASCII runs become a single space, whitespace runs
/// collapse to one space and every line is trimmed. Line breaks survive so
/// later stages can still reason about row layout.
pub fn normalize_text(input: &str) -> String {
    input
        .lines()
        .map(normalize_line)
        .collect::<Vec<String>>()
        .join("\n")
}

pub fn normalize_line(line: &str) -> String {
    let cleaned = line
        .chars()
        .map(|character| {
            if character.is_ascii_graphic() {
                character
            } else {
                ' '
            }
        })
        .collect::<String>();

    cleaned.split_whitespace().collect::<Vec<&str>>().join(" ")
}

/// Byte offsets of `needle` in `haystack`, compared case-insensitively.
///
/// Both sides are lowered with ASCII rules only, so offsets stay valid
/// for the original string.
pub fn find_all_ci(haystack: &str, needle: &str) -> Vec<usize> {
    if needle.is_empty() {
        return Vec::new();
    }

    let lowered = haystack.to_ascii_lowercase();
    let needle = needle.to_ascii_lowercase();
    lowered
        .match_indices(needle.as_str())
        .map(|(index, _)| index)
        .collect()
}

pub fn find_ci(haystack: &str, needle: &str) -> Option<usize> {
    if needle.is_empty() {
        return None;
    }
    haystack
        .to_ascii_lowercase()
        .find(needle.to_ascii_lowercase().as_str())
}
