//! Word splitting for console command lines.

/// Splits a command line into words.
///
/// Whitespace separates words. Single or double quotes group a phrase into
/// one word and are removed from the result; a backslash escapes the next
/// character. An unterminated quote runs to the end of the line.
///
/// ```rust
/// use automation_util::split_command_words;
///
/// assert_eq!(split_command_words("place \"Call Get Data\" 10 20"), vec!["place", "Call Get Data", "10", "20"]);
/// ```
pub fn split_command_words(input: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;
    let mut chars = input.chars();

    while let Some(ch) = chars.next() {
        match (quote, ch) {
            (_, '\\') => {
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
                in_word = true;
            }
            (Some(open), ch) if ch == open => quote = None,
            (Some(_), ch) => current.push(ch),
            (None, '"' | '\'') => {
                quote = Some(ch);
                in_word = true;
            }
            (None, ch) if ch.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            (None, ch) => {
                current.push(ch);
                in_word = true;
            }
        }
    }
    if in_word {
        words.push(current);
    }
    words
}
