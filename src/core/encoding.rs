//! Input decoding with an ordered list of fallback encodings
//!
//! Marketplace exports arrive as Shift-JIS/cp932 most of the time, but
//! re-saved files are often UTF-8. Each label is tried in order and the first
//! clean decode wins.

use encoding_rs::Encoding;
use miette::Diagnostic;
use thiserror::Error;

/// Fallback order used when the configuration does not override it
pub const DEFAULT_ENCODINGS: &[&str] = &["utf-8", "cp932", "shift_jis", "euc-jp", "latin1"];

#[derive(Debug, Error, Diagnostic)]
pub enum EncodingError {
    #[error("Unknown encoding label: '{0}'")]
    #[diagnostic(
        code(rts::encoding::unknown_label),
        help("Use a WHATWG label such as utf-8, cp932, shift_jis, euc-jp or latin1")
    )]
    UnknownLabel(String),

    #[error("Input could not be decoded with any of: {}", .tried.join(", "))]
    #[diagnostic(
        code(rts::encoding::undecodable),
        help("Add latin1 to the encoding list to force a lossless byte decode")
    )]
    Undecodable { tried: Vec<String> },
}

/// Resolve configured labels to encodings, keeping the label for reporting
pub fn resolve_labels<S: AsRef<str>>(
    labels: &[S],
) -> Result<Vec<(String, &'static Encoding)>, EncodingError> {
    labels
        .iter()
        .map(|label| {
            let label = label.as_ref().trim();
            Encoding::for_label(canonical_label(label).as_bytes())
                .map(|enc| (label.to_string(), enc))
                .ok_or_else(|| EncodingError::UnknownLabel(label.to_string()))
        })
        .collect()
}

/// Decode bytes with the first encoding that produces no malformed sequences
///
/// Returns the decoded text and the label that succeeded. A UTF-8 BOM is
/// stripped when present.
pub fn decode_with_fallback<S: AsRef<str>>(
    bytes: &[u8],
    labels: &[S],
) -> Result<(String, String), EncodingError> {
    let encodings = resolve_labels(labels)?;

    for (label, encoding) in &encodings {
        let input = if *encoding == encoding_rs::UTF_8 {
            bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes)
        } else {
            bytes
        };

        if let Some(text) = encoding.decode_without_bom_handling_and_without_replacement(input) {
            tracing::debug!(encoding = %label, "decoded input");
            return Ok((text.into_owned(), label.clone()));
        }
        tracing::debug!(encoding = %label, "decode failed, trying next encoding");
    }

    Err(EncodingError::Undecodable {
        tried: encodings.into_iter().map(|(label, _)| label).collect(),
    })
}

/// Map Python-style codec names onto WHATWG labels
fn canonical_label(label: &str) -> &str {
    match label.to_ascii_lowercase().as_str() {
        "cp932" | "ms932" | "mskanji" => "windows-31j",
        "shiftjis" | "sjis" => "shift_jis",
        "eucjp" | "euc_jp" => "euc-jp",
        "utf8" | "utf_8" => "utf-8",
        "latin-1" | "latin_1" | "iso8859-1" => "latin1",
        _ => label,
    }
}
