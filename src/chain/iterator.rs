//! Chained query streaming iterator
//!
//! `has_next`:
//! 1. A buffered latter result answers immediately.
//! 2. Otherwise the running latter query is closed.
//! 3. Initial results are pulled and their terms collected until
//!    `max_results_to_buffer` distinct terms are held, the initial results
//!    end, or the strategy reports no more terms. A batch never holds more
//!    than the bound; extra terms from the last extraction open the next
//!    batch.
//! 4. A non-empty batch becomes a new latter run; if it yields a result the
//!    iterator has a next element, otherwise step 3 repeats.
//! 5. Once the initial results are exhausted and no terms are carried over
//!    the chain is done.
//!
//! Errors from the initial results propagate unchanged. Any failure of a
//! latter run is fatal to the whole chain.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::context::QueryContext;
use crate::errors::{EngineError, EngineResult};
use crate::observability::{Event, Logger, MetricsRegistry};
use crate::scheduler::{CancellationToken, ResultRecord, VisibilityLabels};

use super::errors::ChainError;
use super::logic::{ChainStrategy, QueryLogic, ResultStream};

/// Streams the results of latter queries built from initial results
pub struct ChainedQueryIterator {
    initial: ResultStream,
    initial_exhausted: bool,
    template: Box<dyn QueryLogic>,
    strategy: Box<dyn ChainStrategy>,
    labels: VisibilityLabels,
    running: Option<Box<dyn QueryLogic>>,
    latter_results: Option<ResultStream>,
    pending: Option<ResultRecord>,
    carry: BTreeSet<String>,
    max_buffered: usize,
    latter_runs: u64,
    peak_buffered: usize,
    done: bool,
    cancel: CancellationToken,
    logger: Logger,
    metrics: Arc<MetricsRegistry>,
}

impl ChainedQueryIterator {
    pub fn new(
        ctx: &QueryContext,
        initial: ResultStream,
        template: Box<dyn QueryLogic>,
        strategy: Box<dyn ChainStrategy>,
        labels: VisibilityLabels,
    ) -> Self {
        Self {
            initial,
            initial_exhausted: false,
            template,
            strategy,
            labels,
            running: None,
            latter_results: None,
            pending: None,
            carry: BTreeSet::new(),
            max_buffered: ctx.config.max_results_to_buffer.max(1),
            latter_runs: 0,
            peak_buffered: 0,
            done: false,
            cancel: ctx.cancel.clone(),
            logger: ctx.logger.clone(),
            metrics: ctx.metrics.clone(),
        }
    }

    /// Number of latter runs started so far
    pub fn latter_runs(&self) -> u64 {
        self.latter_runs
    }

    /// Largest batch of terms held at once
    pub fn peak_buffered(&self) -> usize {
        self.peak_buffered
    }

    pub fn has_next(&mut self) -> EngineResult<bool> {
        if self.done {
            return Ok(false);
        }
        if self.cancel.is_cancelled() {
            self.close();
            return Ok(false);
        }

        match self.advance() {
            Ok(ready) => Ok(ready),
            Err(err) => {
                self.close();
                Err(err)
            }
        }
    }

    pub fn next_record(&mut self) -> EngineResult<Option<ResultRecord>> {
        if self.has_next()? {
            Ok(self.pending.take())
        } else {
            Ok(None)
        }
    }

    /// Close the running latter query and stop. Safe to call more than once.
    pub fn close(&mut self) {
        self.close_latter();
        self.pending = None;
        self.carry.clear();
        self.done = true;
    }

    fn advance(&mut self) -> EngineResult<bool> {
        if self.pending.is_some() {
            return Ok(true);
        }

        if let Some(record) = self.pull_latter()? {
            self.pending = Some(record);
            return Ok(true);
        }
        self.close_latter();

        while !self.initial_exhausted || !self.carry.is_empty() {
            let terms = self.harvest()?;
            if terms.is_empty() {
                continue;
            }

            self.start_latter(&terms)?;
            if let Some(record) = self.pull_latter()? {
                self.pending = Some(record);
                return Ok(true);
            }
            self.close_latter();
        }

        self.done = true;
        self.logger.event(
            Event::ChainExhausted,
            &[("latter_runs", self.latter_runs.to_string().as_str())],
        );
        Ok(false)
    }

    /// Collect one batch of distinct terms from the initial results
    fn harvest(&mut self) -> EngineResult<BTreeSet<String>> {
        let mut terms = BTreeSet::new();
        let carried = std::mem::take(&mut self.carry);
        self.fill(&mut terms, carried);

        while terms.len() < self.max_buffered && !self.initial_exhausted {
            let record = match self.initial.next() {
                Some(record) => record?,
                None => {
                    self.initial_exhausted = true;
                    break;
                }
            };
            match self.strategy.extract_terms(&record) {
                Some(extracted) => self.fill(&mut terms, extracted),
                None => break,
            }
        }

        self.peak_buffered = self.peak_buffered.max(terms.len());
        Ok(terms)
    }

    /// Add terms up to the batch bound; the rest wait for the next batch
    fn fill(&mut self, terms: &mut BTreeSet<String>, extracted: BTreeSet<String>) {
        for term in extracted {
            if terms.len() < self.max_buffered || terms.contains(&term) {
                terms.insert(term);
            } else {
                self.carry.insert(term);
            }
        }
    }

    fn start_latter(&mut self, terms: &BTreeSet<String>) -> EngineResult<()> {
        let query = self.strategy.build_query(terms);

        let mut logic = self.template.clone_logic();
        if let Err(err) = logic.initialize(&query, &self.labels) {
            logic.close();
            return Err(self.fatal("latter query setup failed", err));
        }
        let results = match logic.results() {
            Ok(results) => results,
            Err(err) => {
                logic.close();
                return Err(self.fatal("latter query did not start", err));
            }
        };

        self.latter_runs += 1;
        self.metrics.increment_latter_runs();
        self.logger.event(
            Event::ChainBatchDispatched,
            &[
                ("run", self.latter_runs.to_string().as_str()),
                ("terms", terms.len().to_string().as_str()),
            ],
        );

        self.running = Some(logic);
        self.latter_results = Some(results);
        Ok(())
    }

    fn pull_latter(&mut self) -> EngineResult<Option<ResultRecord>> {
        let next = match self.latter_results.as_mut() {
            Some(results) => results.next(),
            None => return Ok(None),
        };
        match next {
            Some(Ok(record)) => Ok(Some(record)),
            Some(Err(err)) => Err(self.fatal("latter query failed", err)),
            None => Ok(None),
        }
    }

    fn close_latter(&mut self) {
        self.latter_results = None;
        if let Some(mut logic) = self.running.take() {
            logic.close();
            self.logger.event(
                Event::ChainLatterClosed,
                &[("run", self.latter_runs.to_string().as_str())],
            );
        }
    }

    fn fatal(&self, context: &str, cause: EngineError) -> EngineError {
        let err = ChainError::fatal_query(format!("{}: {}", context, cause));
        self.logger
            .event(Event::ChainFatal, &[("reason", err.message())]);
        err.into()
    }
}

impl Iterator for ChainedQueryIterator {
    type Item = EngineResult<ResultRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}

impl Drop for ChainedQueryIterator {
    fn drop(&mut self) {
        self.close();
    }
}
