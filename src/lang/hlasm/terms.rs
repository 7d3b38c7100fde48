//! Self-defining terms.
//!
//! Recognizes decimal, hexadecimal (`X'..'`), binary (`B'..'`) and character (`C'..'`)
//! terms and produces their 32 bit value.  Character terms are valued in EBCDIC.

use super::ebcdic;

fn quoted_body(s: &str) -> Option<&str> {
    if s.len() < 3 || !s.ends_with('\'') || s.as_bytes()[1] != b'\'' {
        return None;
    }
    Some(&s[2..s.len()-1])
}

/// Value of a self-defining term, or `None` if `s` is not one
pub fn self_defining_term(s: &str) -> Option<i32> {
    if s.is_empty() {
        return None;
    }
    if s.chars().all(|c| c.is_ascii_digit()) {
        return match s.parse::<i64>() {
            Ok(v) if v <= i32::MAX as i64 => Some(v as i32),
            _ => None
        };
    }
    let body = quoted_body(s)?;
    match s.as_bytes()[0].to_ascii_uppercase() {
        b'X' => {
            if body.is_empty() || body.len() > 8 {
                return None;
            }
            u32::from_str_radix(body,16).ok().map(|v| v as i32)
        },
        b'B' => {
            if body.is_empty() || body.len() > 32 {
                return None;
            }
            u32::from_str_radix(body,2).ok().map(|v| v as i32)
        },
        b'C' => {
            let unescaped = body.replace("''","'").replace("&&","&");
            if unescaped.is_empty() || unescaped.chars().count() > 4 {
                return None;
            }
            let mut ans: u32 = 0;
            for c in unescaped.chars() {
                ans = (ans << 8) | ebcdic::a2e(c) as u32;
            }
            Some(ans as i32)
        },
        _ => None
    }
}

pub fn is_self_defining_term(s: &str) -> bool {
    self_defining_term(s).is_some()
}
