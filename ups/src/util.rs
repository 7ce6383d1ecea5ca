use std::{fs::File, io::Read, path::Path};

use anyhow::{Context, Result};

/// Reads at most `limit` bytes of a sysfs attribute. Short reads are fine.
pub fn read_attribute_prefix(path: &Path, limit: u64) -> Result<String> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;

    let mut bytes = Vec::new();
    // A failed read leaves whatever was read so far, like a short read.
    let _ = file.take(limit).read_to_end(&mut bytes);

    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Decodes the leading number of `text` the way `strtol` does: leading
/// whitespace and an optional sign are skipped, digits are consumed until the
/// first character outside the radix, and no digits at all yields 0.
pub fn parse_leading_number(text: &str, radix: u32) -> i64 {
    let text = text.trim_start();
    let (negative, text) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };

    let value = text
        .chars()
        .map_while(|c| c.to_digit(radix))
        .fold(0i64, |acc, digit| {
            acc.saturating_mul(radix.into()).saturating_add(digit.into())
        });

    if negative {
        -value
    } else {
        value
    }
}
