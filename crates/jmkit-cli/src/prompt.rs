//! Validated terminal input, separate from the transformation flows.
//!
//! Every prompt loops on invalid input with a colored warning instead of
//! propagating a validation error; only real I/O failures surface. The
//! readers are generic over `BufRead` so the loop behavior is testable
//! against in-memory input.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use colored::Colorize;

pub fn success(message: &str) {
    println!("{} {message}", "ok:".green().bold());
}

pub fn warn(message: &str) {
    println!("{} {message}", "warning:".yellow().bold());
}

pub fn fail(message: &str) {
    eprintln!("{} {message}", "error:".red().bold());
}

/// Print the prompt and read one trimmed line. `None` means end of input.
fn read_line(input: &mut impl BufRead, prompt: &str) -> io::Result<Option<String>> {
    print!("{prompt}: ");
    io::stdout().flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        println!();
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

/// Non-empty free-form text; an empty answer takes the default when one is
/// given, otherwise re-prompts.
pub fn prompt_line(
    input: &mut impl BufRead,
    prompt: &str,
    default: Option<&str>,
) -> io::Result<Option<String>> {
    loop {
        let shown = match default {
            Some(d) => format!("{prompt} [{d}]"),
            None => prompt.to_string(),
        };
        let Some(answer) = read_line(input, &shown)? else {
            return Ok(None);
        };
        if !answer.is_empty() {
            return Ok(Some(answer));
        }
        if let Some(d) = default {
            return Ok(Some(d.to_string()));
        }
        warn("a value is required");
    }
}

/// Path to an existing file; re-prompts until one is named.
pub fn prompt_existing_path(
    input: &mut impl BufRead,
    prompt: &str,
) -> io::Result<Option<PathBuf>> {
    loop {
        let Some(answer) = prompt_line(input, prompt, None)? else {
            return Ok(None);
        };
        let path = PathBuf::from(answer);
        if path.is_file() {
            return Ok(Some(path));
        }
        warn(&format!("no such file: {}", path.display()));
    }
}

/// A number; re-prompts until one parses.
pub fn prompt_f64(input: &mut impl BufRead, prompt: &str) -> io::Result<Option<f64>> {
    loop {
        let Some(answer) = prompt_line(input, prompt, None)? else {
            return Ok(None);
        };
        match answer.parse::<f64>() {
            Ok(value) => return Ok(Some(value)),
            Err(_) => warn(&format!("not a number: {answer}")),
        }
    }
}

/// A number, or nothing: an empty answer skips.
pub fn prompt_optional_f64(input: &mut impl BufRead, prompt: &str) -> io::Result<Option<f64>> {
    loop {
        let Some(answer) = read_line(input, &format!("{prompt} (empty to skip)"))? else {
            return Ok(None);
        };
        if answer.is_empty() {
            return Ok(None);
        }
        match answer.parse::<f64>() {
            Ok(value) => return Ok(Some(value)),
            Err(_) => warn(&format!("not a number: {answer}")),
        }
    }
}

/// Yes/no with a default; end of input takes the default.
pub fn prompt_yes_no(input: &mut impl BufRead, prompt: &str, default: bool) -> io::Result<bool> {
    let hint = if default { "Y/n" } else { "y/N" };
    loop {
        let Some(answer) = read_line(input, &format!("{prompt} [{hint}]"))? else {
            return Ok(default);
        };
        match answer.to_ascii_lowercase().as_str() {
            "" => return Ok(default),
            "y" | "yes" => return Ok(true),
            "n" | "no" => return Ok(false),
            other => warn(&format!("answer y or n, not {other}")),
        }
    }
}

/// Menu selection in `1..=max`; re-prompts on anything else.
pub fn prompt_choice(
    input: &mut impl BufRead,
    prompt: &str,
    max: usize,
) -> io::Result<Option<usize>> {
    loop {
        let Some(answer) = read_line(input, prompt)? else {
            return Ok(None);
        };
        match answer.parse::<usize>() {
            Ok(choice) if (1..=max).contains(&choice) => return Ok(Some(choice)),
            _ => warn(&format!("pick a number between 1 and {max}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
