//! Camelot Wheel notation for major keys
//!
//! The Camelot Wheel makes harmonic mixing mechanical for DJs:
//!
//! - Numbers 1-12 are positions on the wheel, a fifth apart
//! - Two rings, 'A' and 'B'
//! - Adjacent numbers and the same number with the other letter mix cleanly
//!
//! Only major keys are detected, and they are labelled on the 'A' ring
//! (C = 8A) to match codes already stored in existing libraries. Both rings
//! are accepted by [`compatible_keys`].

use crate::types::PitchClass;

/// Camelot code of the major key on `tonic`
pub fn to_camelot(tonic: PitchClass) -> &'static str {
    match tonic {
        PitchClass::C => "8A",
        PitchClass::Cs => "3A", // Db
        PitchClass::D => "10A",
        PitchClass::Ds => "5A", // Eb
        PitchClass::E => "12A",
        PitchClass::F => "7A",
        PitchClass::Fs => "2A", // Gb
        PitchClass::G => "9A",
        PitchClass::Gs => "4A", // Ab
        PitchClass::A => "11A",
        PitchClass::As => "6A", // Bb
        PitchClass::B => "1A",
    }
}

/// Tonic for a code produced by [`to_camelot`], the inverse of [`to_camelot`]
pub fn from_camelot(code: &str) -> Option<PitchClass> {
    PitchClass::ALL
        .iter()
        .copied()
        .find(|&p| to_camelot(p).eq_ignore_ascii_case(code.trim()))
}

/// Keys that mix harmonically with `code`: itself, one step either way on
/// the wheel, and the relative key on the other ring.
///
/// Returns an empty list for anything that is not a Camelot code.
pub fn compatible_keys(code: &str) -> Vec<String> {
    let Some((num, letter)) = parse_camelot(code) else {
        return Vec::new();
    };

    let plus_one = num % 12 + 1;
    let minus_one = if num == 1 { 12 } else { num - 1 };
    let relative = if letter == 'A' { 'B' } else { 'A' };

    vec![
        format!("{}{}", num, letter),
        format!("{}{}", plus_one, letter),
        format!("{}{}", minus_one, letter),
        format!("{}{}", num, relative),
    ]
}

fn parse_camelot(code: &str) -> Option<(u8, char)> {
    let code = code.trim();
    let letter = code.chars().last()?.to_ascii_uppercase();
    if letter != 'A' && letter != 'B' {
        return None;
    }
    let num: u8 = code[..code.len() - 1].parse().ok()?;
    (1..=12).contains(&num).then_some((num, letter))
}
