//! Low-level JSON text writers.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

/// Write `s` as a quoted JSON string.
///
/// With `escape_html`, `<`, `>` and `&` are written as `\u003c`, `\u003e`
/// and `\u0026` so the output can be embedded in HTML.
pub fn write_json_string(out: &mut Vec<u8>, s: &str, escape_html: bool) {
    const STEP_SIZE: usize = 16;
    type Chunk = [u8; STEP_SIZE];

    out.push(b'"');

    let mut s = s;
    while let Some(Ok(chunk)) = s.as_bytes().get(..STEP_SIZE).map(Chunk::try_from) {
        let window = u128::from_ne_bytes(chunk);
        let plain = window & 0x80808080808080808080808080808080 == 0
            && !contains_byte(window, b'"')
            && !contains_byte(window, b'\\')
            && no_control_chars(window)
            && (!escape_html
                || !(contains_byte(window, b'<')
                    || contains_byte(window, b'>')
                    || contains_byte(window, b'&')));

        if plain {
            out.extend_from_slice(&chunk);
            s = &s[STEP_SIZE..];
        } else {
            // escape up to the first char boundary at or past the window
            let mut split = STEP_SIZE;
            while !s.is_char_boundary(split) {
                split += 1;
            }
            let (head, tail) = s.split_at(split);
            for c in head.chars() {
                write_json_escaped_char(out, c, escape_html);
            }
            s = tail;
        }
    }

    for c in s.chars() {
        write_json_escaped_char(out, c, escape_html);
    }

    out.push(b'"');
}

#[inline]
fn write_json_escaped_char(out: &mut Vec<u8>, c: char, escape_html: bool) {
    match c {
        '"' => out.extend_from_slice(b"\\\""),
        '\\' => out.extend_from_slice(b"\\\\"),
        '\n' => out.extend_from_slice(b"\\n"),
        '\r' => out.extend_from_slice(b"\\r"),
        '\t' => out.extend_from_slice(b"\\t"),
        '\u{08}' => out.extend_from_slice(b"\\b"),
        '\u{0C}' => out.extend_from_slice(b"\\f"),
        '<' | '>' | '&' if escape_html => write_unicode_escape(out, c as u32),
        // line and paragraph separators break JavaScript string literals
        '\u{2028}' | '\u{2029}' => write_unicode_escape(out, c as u32),
        c if (c as u32) < 0x20 => write_unicode_escape(out, c as u32),
        c if c.is_ascii() => out.push(c as u8),
        c => {
            let mut buf = [0u8; 4];
            out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
        }
    }
}

fn write_unicode_escape(out: &mut Vec<u8>, code_point: u32) {
    let to_hex = |d: u32| {
        if d < 10 {
            b'0' + d as u8
        } else {
            b'a' + (d - 10) as u8
        }
    };
    out.extend_from_slice(&[
        b'\\',
        b'u',
        to_hex((code_point >> 12) & 0xF),
        to_hex((code_point >> 8) & 0xF),
        to_hex((code_point >> 4) & 0xF),
        to_hex(code_point & 0xF),
    ]);
}

/// Check if any byte in the u128 equals the target byte.
/// Uses the SWAR (SIMD Within A Register) technique.
#[inline]
const fn contains_byte(val: u128, byte: u8) -> bool {
    let mask = 0x01010101010101010101010101010101u128 * (byte as u128);
    let xor_result = val ^ mask;
    let has_zero = (xor_result.wrapping_sub(0x01010101010101010101010101010101))
        & !xor_result
        & 0x80808080808080808080808080808080;
    has_zero != 0
}

/// Check that all bytes are >= 0x20.
#[inline]
const fn no_control_chars(value: u128) -> bool {
    let masked = value & 0xe0e0e0e0e0e0e0e0e0e0e0e0e0e0e0e0;
    let has_zero = (masked.wrapping_sub(0x01010101010101010101010101010101))
        & !masked
        & 0x80808080808080808080808080808080;
    has_zero == 0
}

/// Write a signed integer.
#[inline]
pub fn write_i64(out: &mut Vec<u8>, n: i64) {
    out.extend_from_slice(itoa::Buffer::new().format(n).as_bytes());
}

/// Write an unsigned integer.
#[inline]
pub fn write_u64(out: &mut Vec<u8>, n: u64) {
    out.extend_from_slice(itoa::Buffer::new().format(n).as_bytes());
}

/// Write a finite float at 64-bit precision.
///
/// Magnitudes below `1e-6` or from `1e21` up use exponent form
/// (`1e+21`, `1.5e-7`); everything else is plain decimal digits.
pub fn write_f64(out: &mut Vec<u8>, n: f64) {
    let abs = n.abs();
    let exponent = abs != 0.0 && !(1e-6..1e21).contains(&abs);
    let mut buf = ryu::Buffer::new();
    write_float(out, buf.format_finite(n), exponent);
}

/// Write a finite float at 32-bit precision, with the same cutoffs as
/// [`write_f64`].
pub fn write_f32(out: &mut Vec<u8>, n: f32) {
    let abs = n.abs();
    let exponent = abs != 0.0 && !(1e-6..1e21).contains(&abs);
    let mut buf = ryu::Buffer::new();
    write_float(out, buf.format_finite(n), exponent);
}

/// Re-render ryu's shortest digits in the requested notation.
fn write_float(out: &mut Vec<u8>, formatted: &str, exponent: bool) {
    let (negative, formatted) = match formatted.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, formatted),
    };
    let (mantissa, exp) = match formatted.split_once('e') {
        Some((mantissa, exp)) => (mantissa, exp.parse::<i32>().unwrap_or(0)),
        None => (formatted, 0),
    };
    let (int, frac) = mantissa.split_once('.').unwrap_or((mantissa, ""));

    let mut digits: Vec<u8> = int.bytes().chain(frac.bytes()).collect();
    // position of the decimal point relative to the first digit
    let mut point = int.len() as i32 + exp;
    let leading = digits.iter().take_while(|&&d| d == b'0').count();
    digits.drain(..leading);
    point -= leading as i32;
    while digits.last() == Some(&b'0') {
        digits.pop();
    }

    if negative {
        out.push(b'-');
    }
    if digits.is_empty() {
        out.push(b'0');
        return;
    }

    if exponent {
        out.push(digits[0]);
        if digits.len() > 1 {
            out.push(b'.');
            out.extend_from_slice(&digits[1..]);
        }
        let e = point - 1;
        if e < 0 {
            out.extend_from_slice(b"e-");
            write_u64(out, u64::from(e.unsigned_abs()));
        } else {
            out.extend_from_slice(b"e+");
            if e < 10 {
                out.push(b'0');
            }
            write_u64(out, u64::from(e.unsigned_abs()));
        }
    } else if point <= 0 {
        out.extend_from_slice(b"0.");
        out.resize(out.len() + point.unsigned_abs() as usize, b'0');
        out.extend_from_slice(&digits);
    } else if point as usize >= digits.len() {
        out.extend_from_slice(&digits);
        out.resize(out.len() + point as usize - digits.len(), b'0');
    } else {
        let (whole, fraction) = digits.split_at(point as usize);
        out.extend_from_slice(whole);
        out.push(b'.');
        out.extend_from_slice(fraction);
    }
}

/// Write bytes as a quoted standard base64 string.
pub fn write_base64(out: &mut Vec<u8>, bytes: &[u8]) {
    out.push(b'"');
    let mut encoded = String::with_capacity(bytes.len().div_ceil(3) * 4);
    STANDARD.encode_string(bytes, &mut encoded);
    out.extend_from_slice(encoded.as_bytes());
    out.push(b'"');
}
