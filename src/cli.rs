//! Console helpers for the CLI tools
//!
//! Interactive prompting with bounded retries: each query shows an optional
//! existing value (kept on empty input), validates every attempt, and gives up
//! after the allowed attempts with the caller's error message.

use std::io::{self, BufRead, Write};

/// Prompt on stdout and read validated input from stdin
pub fn query_input(
    prompt: &str,
    existing: Option<&str>,
    error_msg: &str,
    max_attempts: u32,
    validate: impl Fn(&str) -> Result<(), String>,
) -> Option<String> {
    let stdin = io::stdin();
    let mut lock = stdin.lock();
    query_input_from(&mut lock, prompt, existing, error_msg, max_attempts, validate)
}

/// Reader-generic body of `query_input`
pub fn query_input_from<R: BufRead>(
    reader: &mut R,
    prompt: &str,
    existing: Option<&str>,
    error_msg: &str,
    max_attempts: u32,
    validate: impl Fn(&str) -> Result<(), String>,
) -> Option<String> {
    for _ in 0..max_attempts {
        match existing {
            Some(current) => print!("{prompt} [{current}]: "),
            None => print!("{prompt}: "),
        }
        let _ = io::stdout().flush();

        let mut line = String::new();
        if reader.read_line(&mut line).is_err() {
            return None;
        }

        let value = line.trim();
        let value = if value.is_empty() {
            match existing {
                Some(current) => current,
                None => {
                    println!("{error_msg}");
                    continue;
                }
            }
        } else {
            value
        };

        match validate(value) {
            Ok(()) => return Some(value.to_string()),
            Err(message) => println!("{error_msg}: {message}"),
        }
    }

    None
}

/// Ask a yes/no question, retrying until a recognizable answer arrives
pub fn confirm(prompt: &str, max_attempts: u32) -> Option<bool> {
    let stdin = io::stdin();
    let mut lock = stdin.lock();
    confirm_from(&mut lock, prompt, max_attempts)
}

/// Reader-generic body of `confirm`
pub fn confirm_from<R: BufRead>(reader: &mut R, prompt: &str, max_attempts: u32) -> Option<bool> {
    let answer = query_input_from(
        reader,
        prompt,
        None,
        "Invalid confirmation code, must be Y or N",
        max_attempts,
        |value| match value.to_lowercase().as_str() {
            "y" | "n" => Ok(()),
            _ => Err("must be 'Y' or 'N'".to_string()),
        },
    )?;

    Some(answer.to_lowercase() == "y")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_query_input_accepts_valid_value() {
        let mut input = Cursor::new(b"validvalue\n".to_vec());
        let result = query_input_from(&mut input, "Value", None, "Invalid", 3, |_| Ok(()));
        assert_eq!(result.as_deref(), Some("validvalue"));
    }

    #[test]
    fn test_query_input_retries_then_gives_up() {
        let mut input = Cursor::new(b"bad\nbad\nbad\n".to_vec());
        let result = query_input_from(&mut input, "Value", None, "Invalid", 3, |_| {
            Err("nope".to_string())
        });
        assert_eq!(result, None);
    }

    #[test]
    fn test_query_input_empty_keeps_existing() {
        let mut input = Cursor::new(b"\n".to_vec());
        let result = query_input_from(&mut input, "Value", Some("kept"), "Invalid", 3, |_| Ok(()));
        assert_eq!(result.as_deref(), Some("kept"));
    }

    #[test]
    fn test_query_input_retry_then_accept() {
        let mut input = Cursor::new(b"bad\ngoodvalue\n".to_vec());
        let result = query_input_from(&mut input, "Value", None, "Invalid", 3, |v| {
            if v == "goodvalue" {
                Ok(())
            } else {
                Err("nope".to_string())
            }
        });
        assert_eq!(result.as_deref(), Some("goodvalue"));
    }

    #[test]
    fn test_confirm_parses_answers() {
        let mut yes = Cursor::new(b"Y\n".to_vec());
        assert_eq!(confirm_from(&mut yes, "Proceed? (Y/N)", 2), Some(true));

        let mut no = Cursor::new(b"n\n".to_vec());
        assert_eq!(confirm_from(&mut no, "Proceed? (Y/N)", 2), Some(false));

        let mut junk = Cursor::new(b"maybe\nwhat\n".to_vec());
        assert_eq!(confirm_from(&mut junk, "Proceed? (Y/N)", 2), None);
    }
}
