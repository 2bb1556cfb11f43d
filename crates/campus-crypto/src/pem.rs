//! PEM canonicalisation.
//!
//! Keys arrive from browsers, servers and config files with CRLF line
//! endings, unwrapped bodies, missing newlines after the header, or
//! indentation. The strict PEM decoder rejects all of these, so keys are
//! rebuilt into a canonical 64-column LF form before parsing.

use crate::error::CryptoError;

const BEGIN: &str = "-----BEGIN ";
const DASHES: &str = "-----";
const LINE_WIDTH: usize = 64;

/// A PEM document rebuilt into canonical form.
#[derive(Debug)]
pub struct CanonicalPem {
    pub label: String,
    pub text: String,
}

/// Rebuild `input` as canonical PEM, keeping its label.
pub fn canonicalize(input: &str) -> Result<CanonicalPem, CryptoError> {
    let text = input.trim();
    let start = text
        .find(BEGIN)
        .ok_or_else(|| CryptoError::InvalidKey("missing PEM header".into()))?;
    let after_begin = &text[start + BEGIN.len()..];
    let label_end = after_begin
        .find(DASHES)
        .ok_or_else(|| CryptoError::InvalidKey("malformed PEM header".into()))?;
    let label = after_begin[..label_end].trim().to_string();
    if label.is_empty() {
        return Err(CryptoError::InvalidKey("empty PEM label".into()));
    }

    let body_and_footer = after_begin[label_end..].trim_start_matches('-');
    let footer = format!("-----END {label}");
    let body_end = body_and_footer
        .find(&footer)
        .ok_or_else(|| CryptoError::InvalidKey(format!("missing PEM footer for {label}")))?;

    let body: String = body_and_footer[..body_end]
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    if body.is_empty() {
        return Err(CryptoError::InvalidKey("empty PEM body".into()));
    }
    if !body
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'/' | b'='))
    {
        return Err(CryptoError::InvalidKey("PEM body is not base64".into()));
    }

    let mut out = format!("{BEGIN}{label}{DASHES}\n");
    for chunk in body.as_bytes().chunks(LINE_WIDTH) {
        out.push_str(&String::from_utf8_lossy(chunk));
        out.push('\n');
    }
    out.push_str(&format!("-----END {label}{DASHES}\n"));

    Ok(CanonicalPem { label, text: out })
}
