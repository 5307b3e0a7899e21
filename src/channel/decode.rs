//! Inbound frame normalization.

use crate::guidance::GuidanceState;
use serde_json::Value;

/// How inbound frames are interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeMode {
    /// Log every frame verbatim
    Plain,
    /// Parse JSON, extract `move` guidance, unescape non-JSON text
    Guidance,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecodedMessage {
    /// String appended to the message log
    pub display: String,
    /// Present only for `{"type":"move","move":{...}}` frames
    pub guidance: Option<GuidanceState>,
}

pub fn decode_frame(raw: &str, mode: DecodeMode) -> DecodedMessage {
    if mode == DecodeMode::Plain {
        return DecodedMessage {
            display: raw.to_string(),
            guidance: None,
        };
    }

    match serde_json::from_str::<Value>(raw) {
        Ok(value) => DecodedMessage {
            guidance: move_guidance(&value),
            display: serde_json::to_string(&value).unwrap_or_else(|_| raw.to_string()),
        },
        Err(_) => DecodedMessage {
            display: unescape_unicode(raw),
            guidance: None,
        },
    }
}

fn move_guidance(value: &Value) -> Option<GuidanceState> {
    let object = value.as_object()?;
    if object.get("type")?.as_str()? != "move" {
        return None;
    }
    object
        .get("move")?
        .as_object()
        .map(GuidanceState::from_move)
}

/// Replace literal `\uXXXX` sequences with the characters they name.
///
/// Surrogate pairs written as two escapes are combined; a lone surrogate is
/// left as literal text.
pub fn unescape_unicode(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;

    while let Some(pos) = rest.find("\\u") {
        out.push_str(&rest[..pos]);
        let escape = &rest[pos..];
        let after = &escape[2..];

        let Some(unit) = parse_hex4(after) else {
            out.push_str("\\u");
            rest = after;
            continue;
        };

        if (0xD800..0xDC00).contains(&unit) {
            let low = after[4..]
                .strip_prefix("\\u")
                .and_then(parse_hex4)
                .filter(|low| (0xDC00..0xE000).contains(low));
            if let Some(low) = low {
                let code = 0x10000 + ((unit - 0xD800) << 10) + (low - 0xDC00);
                match char::from_u32(code) {
                    Some(ch) => out.push(ch),
                    None => out.push_str(&escape[..12]),
                }
                rest = &escape[12..];
                continue;
            }
        }

        match char::from_u32(unit) {
            Some(ch) => out.push(ch),
            None => out.push_str(&escape[..6]),
        }
        rest = &escape[6..];
    }

    out.push_str(rest);
    out
}

fn parse_hex4(s: &str) -> Option<u32> {
    let digits = s.get(..4)?;
    if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u32::from_str_radix(digits, 16).ok()
}
