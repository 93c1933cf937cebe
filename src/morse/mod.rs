pub mod table;

pub use table::code_for;

use crate::segment::{Level, Segment, SegmentSequence};

/// Timing elements of a keyed Morse signal, measured in dits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MorseElement {
    Dot,
    Dash,
    SymbolGap,
    CharGap,
    WordGap,
}

impl MorseElement {
    pub fn units(&self) -> u64 {
        match self {
            MorseElement::Dot => 1,
            MorseElement::Dash => 3,
            MorseElement::SymbolGap => 1,
            MorseElement::CharGap => 3,
            MorseElement::WordGap => 7,
        }
    }

    pub fn level(&self) -> Level {
        match self {
            MorseElement::Dot | MorseElement::Dash => Level::High,
            MorseElement::SymbolGap | MorseElement::CharGap | MorseElement::WordGap => Level::Low,
        }
    }
}

/// Uppercases the text for table lookup. `ß` becomes `ẞ` first, plain
/// uppercasing would expand it to `SS`.
pub fn normalize_text(text: &str) -> String {
    text.replace('ß', "ẞ").to_uppercase()
}

/// Expands text into keyed elements, including the virtual trailing space.
pub fn elements(text: &str) -> Vec<MorseElement> {
    let mut text = normalize_text(text);
    if text.is_empty() {
        return Vec::new();
    }
    if !text.ends_with(' ') {
        text.push(' ');
    }

    let chars: Vec<char> = text.chars().collect();
    let mut out = Vec::new();

    for (i, &c) in chars.iter().enumerate() {
        if c == ' ' {
            out.push(MorseElement::WordGap);
            continue;
        }
        let Some(code) = code_for(c) else {
            continue;
        };

        let symbols: Vec<char> = code.chars().collect();
        for (j, symbol) in symbols.iter().enumerate() {
            match symbol {
                '.' => out.push(MorseElement::Dot),
                '-' => out.push(MorseElement::Dash),
                _ => {}
            }
            if j + 1 < symbols.len() {
                out.push(MorseElement::SymbolGap);
            }
        }

        if chars.get(i + 1).is_some_and(|&next| next != ' ') {
            out.push(MorseElement::CharGap);
        }
    }

    out
}

/// Encodes text into a pulse train with the given dit length.
///
/// The result always ends on a LOW tail of at least one word gap, so replays
/// stay separated.
pub fn encode(text: &str, dit_duration_ms: u64) -> SegmentSequence {
    if dit_duration_ms == 0 {
        return SegmentSequence::new();
    }
    SegmentSequence::normalized(elements(text).into_iter().map(|element| {
        Segment::new(
            element.level(),
            element.units().saturating_mul(dit_duration_ms),
        )
    }))
}

/// Dot/dash rendering of the text, one space between characters and `/`
/// for word gaps.
pub fn display(text: &str) -> String {
    normalize_text(text)
        .chars()
        .filter_map(code_for)
        .collect::<Vec<_>>()
        .join(" ")
}
