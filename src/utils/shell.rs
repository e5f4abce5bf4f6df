//! Quoting helpers for composing `sh -c` command strings.

/// Wrap `value` in single quotes, escaping any embedded single quote.
pub fn single_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Quote a word only when it contains characters the shell would interpret.
pub fn quote_word(value: &str) -> String {
    shell_words::quote(value).into_owned()
}
