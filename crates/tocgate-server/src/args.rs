//! TOC command-line tokenization.
//!
//! Commands arrive as `verb SP arg1 SP arg2 …` with CSV-like quoting: space
//! separates fields, double quotes group them, leading spaces are trimmed,
//! and quoting is lazy (a stray quote inside a field is literal, an
//! unterminated quote runs to the end). A backslash removes itself and
//! passes the next character through verbatim; there is no other decoding.

/// Split a payload into its verb and the argument remainder.
pub fn split_verb(payload: &str) -> (&str, &str) {
    match payload.split_once(' ') {
        Some((verb, rest)) => (verb, rest),
        None => (payload, ""),
    }
}

/// Tokenize an argument string under the TOC quoting rules.
pub fn parse_args(input: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut chars = input.chars().peekable();

    loop {
        while chars.next_if(|c| *c == ' ').is_some() {}
        if chars.peek().is_none() {
            break;
        }

        let mut field = String::new();
        if chars.next_if(|c| *c == '"').is_some() {
            // Quoted field. A doubled quote is a literal quote; a closing
            // quote ends the field only at a separator or end of input.
            loop {
                match chars.next() {
                    None => break,
                    Some('\\') => {
                        if let Some(next) = chars.next() {
                            field.push(next);
                        }
                    },
                    Some('"') => match chars.peek() {
                        Some('"') => {
                            chars.next();
                            field.push('"');
                        },
                        Some(' ') | None => break,
                        Some(_) => field.push('"'),
                    },
                    Some(c) => field.push(c),
                }
            }
        } else {
            loop {
                match chars.next() {
                    None | Some(' ') => break,
                    Some('\\') => {
                        if let Some(next) = chars.next() {
                            field.push(next);
                        }
                    },
                    Some(c) => field.push(c),
                }
            }
        }
        args.push(field);
    }

    args
}
