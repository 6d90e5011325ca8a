//! Shell-style word splitting
//!
//! Splits a rendered command line into words the way a POSIX shell would
//! for quoting and escaping purposes, without running a shell. For example
//!
//! ```text
//! "one two" three 'four five six'
//! ```
//!
//! becomes `["one two", "three", "four five six"]`. Expansions, globbing and
//! operators are not interpreted; `;`, `|`, `$x` and friends are ordinary
//! characters. Unterminated quotes are accepted and whatever was collected
//! becomes the last word.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Quote {
    None,
    Single,
    Double,
}

/// Split `input` into shell words
pub fn split(input: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut buf = String::new();
    let mut quote = Quote::None;
    let mut escape = false;
    // A word is present once anything, even an empty quoted segment, was seen
    let mut got_word = false;

    for c in input.chars() {
        if escape {
            buf.push(c);
            escape = false;
            got_word = true;
            continue;
        }

        match (c, quote) {
            ('\\', Quote::Single) => buf.push(c),
            ('\\', _) => escape = true,
            ('\'', Quote::None) => quote = Quote::Single,
            ('\'', Quote::Single) => {
                quote = Quote::None;
                got_word = true;
            }
            ('"', Quote::None) => quote = Quote::Double,
            ('"', Quote::Double) => {
                quote = Quote::None;
                got_word = true;
            }
            (c, Quote::None) if c.is_whitespace() => {
                if got_word {
                    words.push(std::mem::take(&mut buf));
                    got_word = false;
                }
            }
            (c, _) => {
                buf.push(c);
                got_word = true;
            }
        }
    }

    if got_word || !buf.is_empty() {
        words.push(buf);
    }
    words
}
