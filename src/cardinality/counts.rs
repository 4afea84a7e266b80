//! Field/value occurrence counts

use serde::{Deserialize, Serialize};

/// Occurrence counts for one field/value pair
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardinalityCounts {
    pub field: String,
    pub value: String,
    /// Occurrences of this value in this field
    pub field_value_count: u64,
    /// Occurrences of any value in this field
    pub field_all_value_count: u64,
    /// Distinct values in this field
    pub unique_field_all_value_count: u64,
    /// Occurrences of any value in any field
    pub total_all_field_all_value_count: u64,
    /// Distinct field/value pairs
    pub total_unique_all_field_all_value_count: u64,
    /// Distinct fields
    pub total_unique_all_field_count: u64,
}

impl CardinalityCounts {
    /// Counts with only the two numbers selectivity needs
    pub fn new(
        field: impl Into<String>,
        value: impl Into<String>,
        field_value_count: u64,
        total_all_field_all_value_count: u64,
    ) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
            field_value_count,
            total_all_field_all_value_count,
            ..Self::default()
        }
    }

    /// Combine counts from two sources.
    ///
    /// Instance counts are each halved and then summed; unique counts take
    /// the maximum. This approximates an average for equal-sized inputs.
    pub fn merge(&self, other: &CardinalityCounts) -> CardinalityCounts {
        let halve_sum = |a: u64, b: u64| a / 2 + b / 2;
        CardinalityCounts {
            field: self.field.clone(),
            value: self.value.clone(),
            field_value_count: halve_sum(self.field_value_count, other.field_value_count),
            field_all_value_count: halve_sum(
                self.field_all_value_count,
                other.field_all_value_count,
            ),
            unique_field_all_value_count: self
                .unique_field_all_value_count
                .max(other.unique_field_all_value_count),
            total_all_field_all_value_count: halve_sum(
                self.total_all_field_all_value_count,
                other.total_all_field_all_value_count,
            ),
            total_unique_all_field_all_value_count: self
                .total_unique_all_field_all_value_count
                .max(other.total_unique_all_field_all_value_count),
            total_unique_all_field_count: self
                .total_unique_all_field_count
                .max(other.total_unique_all_field_count),
        }
    }

    /// Fraction of the corpus this value matches, if the total is known
    pub fn selectivity(&self) -> Option<f64> {
        if self.total_all_field_all_value_count == 0 {
            return None;
        }
        Some(self.field_value_count as f64 / self.total_all_field_all_value_count as f64)
    }
}
