//! Row-range literals and range merging
//!
//! A literal is either a single row (`"X"`) or a pair whose bracket
//! characters carry inclusivity: `"[lo"`/`"(lo"` and `"hi]"`/`"hi)"`.

use std::cmp::Ordering;

use super::errors::{OverflowError, OverflowResult};

/// One row range
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RangeLiteral {
    lower: String,
    upper: String,
    lower_inclusive: bool,
    upper_inclusive: bool,
}

impl RangeLiteral {
    pub fn new(
        lower: impl Into<String>,
        lower_inclusive: bool,
        upper: impl Into<String>,
        upper_inclusive: bool,
    ) -> Self {
        Self {
            lower: lower.into(),
            upper: upper.into(),
            lower_inclusive,
            upper_inclusive,
        }
    }

    /// Zero-width inclusive range at `row`
    pub fn point(row: impl Into<String>) -> Self {
        let row = row.into();
        Self::new(row.clone(), true, row, true)
    }

    /// `[lower, upper]`
    pub fn inclusive(lower: impl Into<String>, upper: impl Into<String>) -> Self {
        Self::new(lower, true, upper, true)
    }

    pub fn lower(&self) -> &str {
        &self.lower
    }

    pub fn upper(&self) -> &str {
        &self.upper
    }

    pub fn lower_inclusive(&self) -> bool {
        self.lower_inclusive
    }

    pub fn upper_inclusive(&self) -> bool {
        self.upper_inclusive
    }

    /// True for a zero-width inclusive range
    pub fn is_point(&self) -> bool {
        self.lower == self.upper && self.lower_inclusive && self.upper_inclusive
    }

    pub fn contains(&self, row: &str) -> bool {
        let above = match row.cmp(self.lower.as_str()) {
            Ordering::Greater => true,
            Ordering::Equal => self.lower_inclusive,
            Ordering::Less => false,
        };
        let below = match row.cmp(self.upper.as_str()) {
            Ordering::Less => true,
            Ordering::Equal => self.upper_inclusive,
            Ordering::Greater => false,
        };
        above && below
    }

    /// Serialized form: one element for a point, two otherwise
    pub fn encode(&self) -> Vec<String> {
        if self.is_point() {
            return vec![self.lower.clone()];
        }
        vec![
            format!("{}{}", if self.lower_inclusive { '[' } else { '(' }, self.lower),
            format!("{}{}", self.upper, if self.upper_inclusive { ']' } else { ')' }),
        ]
    }

    /// Inverse of [`encode`](Self::encode)
    pub fn decode(parts: &[String]) -> OverflowResult<Self> {
        match parts {
            [row] => Ok(Self::point(row.clone())),
            [lower, upper] => {
                let (lower, lower_inclusive) = if let Some(rest) = lower.strip_prefix('[') {
                    (rest, true)
                } else if let Some(rest) = lower.strip_prefix('(') {
                    (rest, false)
                } else {
                    return Err(OverflowError::range_literal_malformed(parts));
                };

                let (upper, upper_inclusive) = if let Some(rest) = upper.strip_suffix(']') {
                    (rest, true)
                } else if let Some(rest) = upper.strip_suffix(')') {
                    (rest, false)
                } else {
                    return Err(OverflowError::range_literal_malformed(parts));
                };

                Ok(Self::new(lower, lower_inclusive, upper, upper_inclusive))
            }
            _ => Err(OverflowError::range_literal_malformed(parts)),
        }
    }

    /// Lower bound first, inclusive before exclusive on ties
    fn cmp_lower(&self, other: &Self) -> Ordering {
        self.lower
            .cmp(&other.lower)
            .then(other.lower_inclusive.cmp(&self.lower_inclusive))
    }

    /// `next` starts before this range ends, or exactly at its end with
    /// either side of the shared row included
    fn touches(&self, next: &Self) -> bool {
        match next.lower.cmp(&self.upper) {
            Ordering::Less => true,
            Ordering::Equal => self.upper_inclusive || next.lower_inclusive,
            Ordering::Greater => false,
        }
    }

    fn absorb(&mut self, next: RangeLiteral) {
        match next.upper.cmp(&self.upper) {
            Ordering::Greater => {
                self.upper = next.upper;
                self.upper_inclusive = next.upper_inclusive;
            }
            Ordering::Equal => self.upper_inclusive |= next.upper_inclusive,
            Ordering::Less => {}
        }
    }
}

/// Sort and merge overlapping or touching ranges.
///
/// The result is sorted and disjoint; merging it again returns it unchanged.
pub fn merge_ranges(ranges: impl IntoIterator<Item = RangeLiteral>) -> Vec<RangeLiteral> {
    let mut sorted: Vec<RangeLiteral> = ranges.into_iter().collect();
    sorted.sort_by(|a, b| a.cmp_lower(b));

    let mut merged: Vec<RangeLiteral> = Vec::with_capacity(sorted.len());
    for range in sorted {
        match merged.last_mut() {
            Some(current) if current.touches(&range) => current.absorb(range),
            _ => merged.push(range),
        }
    }
    merged
}
