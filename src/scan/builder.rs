//! Scan descriptor construction
//!
//! Every descriptor built from one tree carries the same settings: the
//! primary query setting plus one setting per ExceededOr marker, so the
//! scheduler can coalesce them freely. Document ranges in one row are
//! bundled up to `docs_to_combine` per descriptor; every other range gets a
//! descriptor of its own.
//!
//! `planned` is always the text of the fully rewritten query, never the
//! caller's input. A shard tree that prints longer than it is replaced by
//! the planned text.

use std::sync::Arc;

use crate::context::QueryContext;
use crate::expression::ExpressionNode;
use crate::observability::{Event, Logger, MetricsRegistry};
use crate::overflow::OverflowPayload;

use super::descriptor::{QueryData, ScanSetting};
use super::range::{RangeCounts, RowRange};

/// Name of the primary query setting
pub const QUERY_SETTING: &str = "query";

/// Prefix of the per-marker settings
pub const EXCEEDED_OR_SETTING_PREFIX: &str = "ExceededOr:";

/// Builds `QueryData` for a rewritten tree
pub struct ScanDescriptorBuilder {
    priority: u32,
    docs_to_combine: usize,
    logger: Logger,
    metrics: Arc<MetricsRegistry>,
    counts: RangeCounts,
}

impl ScanDescriptorBuilder {
    pub fn new(ctx: &QueryContext) -> Self {
        Self {
            priority: ctx.config.query_iterator_priority,
            docs_to_combine: ctx.config.docs_to_combine.max(1),
            logger: ctx.logger.clone(),
            metrics: ctx.metrics.clone(),
            counts: RangeCounts::default(),
        }
    }

    /// Ranges seen so far, by kind
    pub fn counts(&self) -> RangeCounts {
        self.counts
    }

    /// Text sent with the scan: the printed shard tree, or `planned` when it
    /// is shorter
    pub fn query_text(&self, planned: &str, tree: &ExpressionNode) -> String {
        let printed = tree.to_string();
        if printed.len() > planned.len() {
            self.logger.event(
                Event::OriginalQuerySubstituted,
                &[
                    ("planned_len", planned.len().to_string().as_str()),
                    ("shard_len", printed.len().to_string().as_str()),
                ],
            );
            planned.to_string()
        } else {
            printed
        }
    }

    /// Primary setting followed by one setting per overflow marker
    pub fn settings(&self, query: &str, tree: &ExpressionNode) -> Vec<ScanSetting> {
        let mut settings = vec![ScanSetting::new(QUERY_SETTING, self.priority)
            .with_option(QUERY_SETTING, query)];

        for (offset, marker) in tree.overflow_markers().into_iter().enumerate() {
            let setting = ScanSetting::new(
                format!("{}{}", EXCEEDED_OR_SETTING_PREFIX, marker.id()),
                self.priority + 1 + offset as u32,
            )
            .with_option("field", marker.field());

            let setting = match marker.payload() {
                OverflowPayload::FstReference { uri } => setting.with_option("fstURI", uri.as_str()),
                OverflowPayload::ValueSet { .. } | OverflowPayload::MergedRanges { .. } => {
                    let ranges: Vec<Vec<String>> =
                        marker.row_ranges().iter().map(|r| r.encode()).collect();
                    setting.with_option("ranges", serde_json::Value::from(ranges).to_string())
                }
            };
            settings.push(setting);
        }
        settings
    }

    /// Descriptors covering `ranges`, in input order
    pub fn build(
        &mut self,
        planned: &str,
        tree: &ExpressionNode,
        ranges: impl IntoIterator<Item = RowRange>,
    ) -> Vec<QueryData> {
        let query = self.query_text(planned, tree);
        let settings = self.settings(&query, tree);

        let mut out = Vec::new();
        let mut bundle: Vec<RowRange> = Vec::new();

        for range in ranges {
            self.counts.record(range.kind());

            if range.is_document() {
                let same_row = bundle
                    .first()
                    .map_or(true, |first| first.row_id() == range.row_id());
                if !same_row || bundle.len() >= self.docs_to_combine {
                    self.emit(&mut out, &query, &settings, std::mem::take(&mut bundle));
                }
                bundle.push(range);
            } else {
                self.emit(&mut out, &query, &settings, std::mem::take(&mut bundle));
                self.emit(&mut out, &query, &settings, vec![range]);
            }
        }
        self.emit(&mut out, &query, &settings, bundle);

        out
    }

    fn emit(
        &self,
        out: &mut Vec<QueryData>,
        query: &str,
        settings: &[ScanSetting],
        ranges: Vec<RowRange>,
    ) {
        if ranges.is_empty() {
            return;
        }
        self.metrics.increment_descriptors_built();
        self.logger.event(
            Event::DescriptorBuilt,
            &[
                ("first_row", ranges[0].row_id()),
                ("ranges", ranges.len().to_string().as_str()),
            ],
        );
        out.push(QueryData::new(query, settings.to_vec(), ranges));
    }
}
