//! Natural ordering for file names.
//!
//! Galleries come out of zip files with names like `1.jpg`, `2.jpg`, ...,
//! `10.jpg`. Plain string order puts `10.jpg` before `2.jpg`; readers expect
//! the numeric order. [`natural_key`] splits a name into alternating text and
//! digit runs so that comparing keys compares digit runs by value:
//!
//! - `"1.png" < "2.png" < "10.png"`
//! - `"Page-2" < "page-10"` (text is compared case-insensitively)
//! - `"img007" == "img7"` as far as the numeric part goes
//!
//! Digit runs are compared by magnitude without parsing, so arbitrarily long
//! runs never overflow.

use std::cmp::Ordering;

/// A run of ASCII digits, leading zeros stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Digits(String);

impl Ord for Digits {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .len()
            .cmp(&other.0.len())
            .then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for Digits {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// One segment of a [`natural_key`]. Keys always start with `Text`
/// (possibly empty) and alternate, so segments at the same position are
/// always the same kind.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Segment {
    Text(String),
    Number(Digits),
}

/// Sort key for natural filename ordering.
pub fn natural_key(name: &str) -> Vec<Segment> {
    let mut key = Vec::new();
    let mut text = String::new();
    let mut chars = name.chars().peekable();

    while let Some(c) = chars.next() {
        if c.is_ascii_digit() {
            key.push(Segment::Text(std::mem::take(&mut text).to_lowercase()));
            let mut digits = String::from(c);
            while let Some(d) = chars.next_if(char::is_ascii_digit) {
                digits.push(d);
            }
            let trimmed = digits.trim_start_matches('0');
            key.push(Segment::Number(Digits(trimmed.to_string())));
        } else {
            text.push(c);
        }
    }
    key.push(Segment::Text(text.to_lowercase()));
    key
}
