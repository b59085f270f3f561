//! Interactive stdin prompts.

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use chrono::NaiveDate;

/// Maximum length for a single field typed at a prompt
const MAX_INPUT_LENGTH: usize = 200;

/// Read one trimmed line. Ctrl-D (EOF) is an error rather than an empty answer.
fn read_line() -> Result<String> {
    let mut input = String::new();
    let read = io::stdin()
        .lock()
        .read_line(&mut input)
        .context("Failed to read from stdin")?;
    if read == 0 {
        anyhow::bail!("Input closed");
    }
    Ok(input.trim().chars().take(MAX_INPUT_LENGTH).collect())
}

/// Prompt for a value. An empty answer returns `default` (or empty).
pub fn text(label: &str, default: Option<&str>) -> Result<String> {
    match default {
        Some(d) if !d.is_empty() => print!("{} [{}]: ", label, d),
        _ => print!("{}: ", label),
    }
    io::stdout().flush()?;

    let input = read_line()?;
    if input.is_empty() {
        Ok(default.unwrap_or_default().to_string())
    } else {
        Ok(input)
    }
}

/// Prompt for an optional value; `-` clears an existing one.
pub fn optional(label: &str, current: Option<&str>) -> Result<Option<String>> {
    let value = text(label, current)?;
    Ok(parse_optional(&value))
}

fn parse_optional(value: &str) -> Option<String> {
    match value {
        "" | "-" => None,
        v => Some(v.to_string()),
    }
}

pub fn password() -> Result<String> {
    let password = rpassword::prompt_password("Password: ")?;
    Ok(password)
}

/// Prompt for a `YYYY-MM-DD` date until it parses or is left blank.
pub fn date(label: &str, current: Option<NaiveDate>) -> Result<Option<NaiveDate>> {
    let current = current.map(|d| d.format("%Y-%m-%d").to_string());
    loop {
        match optional(label, current.as_deref())? {
            None => return Ok(None),
            Some(value) => match parse_date(&value) {
                Some(date) => return Ok(Some(date)),
                None => println!("  Expected a date like 2024-01-31"),
            },
        }
    }
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

/// Prompt for an amount until it parses or is left blank.
pub fn amount(label: &str, current: Option<f64>) -> Result<Option<f64>> {
    let current = current.map(|a| a.to_string());
    loop {
        match optional(label, current.as_deref())? {
            None => return Ok(None),
            Some(value) => match parse_amount(&value) {
                Some(amount) => return Ok(Some(amount)),
                None => println!("  Expected a number like 52000 or 52,000.50"),
            },
        }
    }
}

fn parse_amount(value: &str) -> Option<f64> {
    let cleaned: String = value
        .chars()
        .filter(|c| !matches!(c, ',' | '$' | ' '))
        .collect();
    cleaned.parse::<f64>().ok().filter(|a| a.is_finite())
}

/// Yes/no question, defaulting to no
pub fn confirm(question: &str) -> Result<bool> {
    print!("{} [y/N]: ", question);
    io::stdout().flush()?;
    let input = read_line()?;
    Ok(matches!(input.to_lowercase().as_str(), "y" | "yes"))
}
