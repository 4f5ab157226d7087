//! Dotted name splitting.

use std::mem;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Quote {
    None,
    Ansi,
    Back,
    Bracket,
}

/// Split a possibly qualified name such as `catalog.schema.table` into its
/// components.
///
/// Unquoted `.` separates components. Components may be quoted with `"..."`,
/// `` `...` `` or `[...]`; the quotes are stripped. Inside double quotes and
/// backticks a doubled quote character stands for one literal quote. Bracket
/// quoting has no escape and ends at the first `]`.
pub fn split_dotted_name(name: &str) -> Vec<String> {
    let mut quote = Quote::None;
    let mut component = String::new();
    let mut components = Vec::new();
    let mut chars = name.chars().peekable();

    while let Some(ch) = chars.next() {
        match quote {
            Quote::Ansi | Quote::Back => {
                let close = if quote == Quote::Ansi { '"' } else { '`' };
                if ch != close {
                    component.push(ch);
                } else if chars.peek() == Some(&close) {
                    chars.next();
                    component.push(close);
                } else {
                    quote = Quote::None;
                }
            }
            Quote::Bracket => {
                if ch == ']' {
                    quote = Quote::None;
                } else {
                    component.push(ch);
                }
            }
            Quote::None => match ch {
                '.' => components.push(mem::take(&mut component)),
                '"' => quote = Quote::Ansi,
                '`' => quote = Quote::Back,
                '[' => quote = Quote::Bracket,
                _ => component.push(ch),
            },
        }
    }

    components.push(component);
    components
}
