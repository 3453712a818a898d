use percent_encoding::percent_decode_str;

use crate::OutputFormat;

const MAX_FILENAME_CHARS: usize = 200;

/// Local filename for an artifact: the `Content-Disposition` suggestion when
/// usable, `download.<ext>` otherwise.
pub fn artifact_filename(content_disposition: Option<&str>, format: OutputFormat) -> String {
    content_disposition
        .and_then(filename_from_content_disposition)
        .unwrap_or_else(|| fallback_filename(format))
}

pub fn fallback_filename(format: OutputFormat) -> String {
    format!("download.{}", format.extension())
}

/// Extract and sanitize the filename from a `Content-Disposition` header value.
/// `filename*` (RFC 5987) wins over a plain `filename`.
pub fn filename_from_content_disposition(header: &str) -> Option<String> {
    let mut plain = None;
    let mut extended = None;
    for param in split_params(header).into_iter().skip(1) {
        let Some((key, value)) = param.split_once('=') else {
            continue;
        };
        match key.trim().to_ascii_lowercase().as_str() {
            "filename*" => extended = decode_extended(value.trim()),
            "filename" => plain = Some(unquote(value.trim())),
            _ => {}
        }
    }
    extended
        .and_then(|name| sanitize_filename(&name))
        .or_else(|| plain.and_then(|name| sanitize_filename(&name)))
}

// Split on `;` outside of quoted strings.
fn split_params(header: &str) -> Vec<&str> {
    let mut params = Vec::new();
    let mut in_quotes = false;
    let mut escaped = false;
    let mut start = 0;
    for (idx, c) in header.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            ';' if !in_quotes => {
                params.push(&header[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    params.push(&header[start..]);
    params
}

fn unquote(value: &str) -> String {
    let Some(inner) = value
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
    else {
        return value.to_string();
    };
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

// charset'language'percent-encoded
fn decode_extended(value: &str) -> Option<String> {
    let mut parts = value.splitn(3, '\'');
    let charset = parts.next()?;
    let _language = parts.next()?;
    let encoded = parts.next()?;
    let decoded = percent_decode_str(encoded);
    if charset.eq_ignore_ascii_case("utf-8") {
        decoded.decode_utf8().ok().map(|name| name.into_owned())
    } else {
        Some(decoded.decode_utf8_lossy().into_owned())
    }
}

/// Make a suggested name safe to create locally. `None` when nothing usable is left.
pub fn sanitize_filename(input: &str) -> Option<String> {
    let base = input.rsplit(&['/', '\\'][..]).next().unwrap_or(input);
    let cleaned: String = base
        .chars()
        .map(|c| if is_forbidden(c) { '_' } else { c })
        .collect();
    let cleaned = cleaned.trim_matches(&['_', ' ', '.'][..]);
    if cleaned.is_empty() {
        return None;
    }

    // Collapse multiple underscores
    let mut compacted = String::with_capacity(cleaned.len());
    let mut prev_underscore = false;
    for c in cleaned.chars() {
        if c == '_' {
            if !prev_underscore {
                compacted.push(c);
            }
            prev_underscore = true;
        } else {
            compacted.push(c);
            prev_underscore = false;
        }
    }

    let mut final_name: String = compacted.chars().take(MAX_FILENAME_CHARS).collect();
    let stem = final_name.split('.').next().unwrap_or_default();
    if is_reserved_windows_name(stem) {
        final_name.insert(0, '_');
    }
    Some(final_name)
}

fn is_forbidden(c: char) -> bool {
    matches!(c,
        '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0'..='\u{1F}'
    )
}

fn is_reserved_windows_name(name: &str) -> bool {
    const RESERVED: &[&str] = &[
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
        "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(name))
}
