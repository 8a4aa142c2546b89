//! The two pieces of identifier grammar in the store.
//!
//! Module codes are read out of project names: an optional standalone
//! category letter (`A` or `B`, either case), optional whitespace, then a
//! run of exactly three digits. The first such group wins; digit runs of
//! any other length never count as a module number.
//!
//! Evaluation identifiers carry a sequence number: the tag `EP` immediately
//! followed by one or more digits, e.g. `EP4`.

use crate::model::ModulePrefix;

/// Tag prefixing evaluation sequence numbers in test identifiers.
pub const EVAL_TAG: &str = "EP";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ModuleCode {
    pub number: Option<String>,
    pub prefix: Option<ModulePrefix>,
}

/// Extract the module number and category letter from a project name.
/// Names without a three-digit group yield neither.
pub fn parse_module_code(name: &str) -> ModuleCode {
    let chars: Vec<char> = name.chars().collect();
    let mut i = 0usize;
    while i < chars.len() {
        if !chars[i].is_ascii_digit() {
            i += 1;
            continue;
        }
        let start = i;
        while i < chars.len() && chars[i].is_ascii_digit() {
            i += 1;
        }
        if i - start != 3 {
            continue;
        }
        let number: String = chars[start..i].iter().collect();
        return ModuleCode {
            prefix: prefix_before(&chars, start),
            number: Some(number),
        };
    }
    ModuleCode::default()
}

/// Category letter directly before a digit group: skip whitespace backwards,
/// accept a recognized letter only if it stands alone (start of the name or
/// preceded by whitespace).
fn prefix_before(chars: &[char], digit_start: usize) -> Option<ModulePrefix> {
    let mut j = digit_start;
    while j > 0 && chars[j - 1].is_whitespace() {
        j -= 1;
    }
    if j == 0 {
        return None;
    }
    let prefix = ModulePrefix::from_letter(chars[j - 1])?;
    if j >= 2 && !chars[j - 2].is_whitespace() {
        return None;
    }
    Some(prefix)
}

/// Sequence number of an evaluation identifier: digits immediately after
/// the first `EP` tag. `None` when the tag is absent, bare, or the number
/// does not fit in a u32.
pub fn eval_sequence(test_identifier: &str) -> Option<u32> {
    let pos = test_identifier.find(EVAL_TAG)?;
    let rest = &test_identifier[pos + EVAL_TAG.len()..];
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

/// The identifier following `current` in the evaluation sequence.
pub fn next_eval_identifier(max_seen: u32) -> String {
    format!("{}{}", EVAL_TAG, max_seen + 1)
}
