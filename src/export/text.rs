/// Prepare selected text for insertion into a note.
///
/// Surrounding whitespace is always dropped. With `collapse_whitespace` every
/// run of whitespace inside the text becomes a single space. Returns `None`
/// when nothing is left.
pub fn edit_text(text: &str, collapse_whitespace: bool) -> Option<String> {
    let result = if collapse_whitespace {
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    } else {
        text.trim().to_string()
    };

    (!result.is_empty()).then_some(result)
}
