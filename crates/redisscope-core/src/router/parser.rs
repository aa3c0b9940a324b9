//! Split a command line into arguments, `redis-cli` style
//!
//! Double quotes support `\n \r \t \b \a \\ \" \xHH` escapes; single quotes
//! only `\'`. A closing quote must be followed by whitespace or the end.

use crate::error::{CoreError, Result};

pub fn split_command_line(line: &str) -> Result<Vec<String>> {
    let mut args = Vec::new();
    let mut chars = line.trim().chars().peekable();

    loop {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        let Some(&first) = chars.peek() else {
            break;
        };

        let mut current: Vec<u8> = Vec::new();
        match first {
            '"' => {
                chars.next();
                loop {
                    match chars.next() {
                        None => return Err(unbalanced(line)),
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some('x') => {
                                let hex: String = chars.by_ref().take(2).collect();
                                match u8::from_str_radix(&hex, 16) {
                                    Ok(byte) if hex.len() == 2 => current.push(byte),
                                    _ => {
                                        current.push(b'x');
                                        current.extend_from_slice(hex.as_bytes());
                                    }
                                }
                            }
                            Some('n') => current.push(b'\n'),
                            Some('r') => current.push(b'\r'),
                            Some('t') => current.push(b'\t'),
                            Some('b') => current.push(0x08),
                            Some('a') => current.push(0x07),
                            Some(c) => push_char(&mut current, c),
                            None => return Err(unbalanced(line)),
                        },
                        Some(c) => push_char(&mut current, c),
                    }
                }
                closing_quote_boundary(&mut chars, line)?;
            }
            '\'' => {
                chars.next();
                loop {
                    match chars.next() {
                        None => return Err(unbalanced(line)),
                        Some('\'') => break,
                        Some('\\') if chars.peek() == Some(&'\'') => {
                            chars.next();
                            current.push(b'\'');
                        }
                        Some(c) => push_char(&mut current, c),
                    }
                }
                closing_quote_boundary(&mut chars, line)?;
            }
            _ => {
                while let Some(c) = chars.next_if(|c| !c.is_whitespace()) {
                    push_char(&mut current, c);
                }
            }
        }

        args.push(String::from_utf8_lossy(&current).into_owned());
    }

    Ok(args)
}

fn push_char(buf: &mut Vec<u8>, c: char) {
    let mut tmp = [0u8; 4];
    buf.extend_from_slice(c.encode_utf8(&mut tmp).as_bytes());
}

fn closing_quote_boundary(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    line: &str,
) -> Result<()> {
    match chars.peek() {
        None => Ok(()),
        Some(c) if c.is_whitespace() => Ok(()),
        Some(_) => Err(unbalanced(line)),
    }
}

fn unbalanced(line: &str) -> CoreError {
    CoreError::Validation(format!("Invalid argument(s): unbalanced quotes in '{}'", line))
}
