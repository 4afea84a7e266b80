//! Scan scheduler
//!
//! State machine: `Idle -> Draining -> Idle | Exhausted`.
//!
//! `has_next`:
//! 1. A buffered record answers immediately.
//! 2. An open session is pulled; when it runs dry it is closed.
//! 3. Otherwise the next upstream descriptor is taken together with every
//!    following descriptor that shares its settings, and one session is
//!    opened over the combined ranges.
//! 4. With no descriptor left the scheduler is exhausted.
//!
//! Any error closes the scheduler and is returned to the caller; nothing is
//! retried here.

use std::iter::Peekable;
use std::sync::Arc;

use crate::context::QueryContext;
use crate::observability::{Event, Logger, MetricsRegistry};
use crate::scan::QueryData;

use super::cancel::CancellationToken;
use super::errors::{SchedulerError, SchedulerResult};
use super::session::{ResultRecord, ScanSession, ScanSessionProvider, VisibilityLabels};

/// Where the scheduler is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerPhase {
    /// No session open
    Idle,
    /// A session is open and being drained
    Draining,
    /// Terminal
    Exhausted,
}

/// Streams result records for a sequence of scan descriptors
pub struct ScanScheduler<I: Iterator<Item = QueryData>> {
    upstream: Peekable<I>,
    provider: Arc<dyn ScanSessionProvider>,
    labels: VisibilityLabels,
    session: Option<Box<dyn ScanSession>>,
    pending: Option<ResultRecord>,
    phase: SchedulerPhase,
    ranges_seen: u64,
    scans_issued: u64,
    sessions_opened: u64,
    max_ranges: Option<u64>,
    cancel: CancellationToken,
    logger: Logger,
    metrics: Arc<MetricsRegistry>,
}

impl<I: Iterator<Item = QueryData>> ScanScheduler<I> {
    pub fn new(
        ctx: &QueryContext,
        upstream: impl IntoIterator<Item = QueryData, IntoIter = I>,
        provider: Arc<dyn ScanSessionProvider>,
        labels: VisibilityLabels,
    ) -> Self {
        Self {
            upstream: upstream.into_iter().peekable(),
            provider,
            labels,
            session: None,
            pending: None,
            phase: SchedulerPhase::Idle,
            ranges_seen: 0,
            scans_issued: 0,
            sessions_opened: 0,
            max_ranges: ctx.config.max_ranges_per_query,
            cancel: ctx.cancel.clone(),
            logger: ctx.logger.clone(),
            metrics: ctx.metrics.clone(),
        }
    }

    pub fn phase(&self) -> SchedulerPhase {
        self.phase
    }

    /// Ranges across every descriptor consumed so far
    pub fn ranges_seen(&self) -> u64 {
        self.ranges_seen
    }

    /// Descriptors consumed so far, before coalescing
    pub fn scans_issued(&self) -> u64 {
        self.scans_issued
    }

    /// Sessions actually opened, after coalescing
    pub fn sessions_opened(&self) -> u64 {
        self.sessions_opened
    }

    /// Returns true if a record is ready for `next_record`
    pub fn has_next(&mut self) -> SchedulerResult<bool> {
        if self.cancel.is_cancelled() {
            if self.phase != SchedulerPhase::Exhausted {
                self.logger.event(
                    Event::ScanCancelled,
                    &[("ranges_seen", self.ranges_seen.to_string().as_str())],
                );
            }
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

    /// Take the buffered record, if any
    pub fn next_record(&mut self) -> SchedulerResult<Option<ResultRecord>> {
        if self.has_next()? {
            Ok(self.pending.take())
        } else {
            Ok(None)
        }
    }

    /// Close any open session and stop. Safe to call more than once.
    pub fn close(&mut self) {
        self.close_session();
        self.pending = None;
        self.phase = SchedulerPhase::Exhausted;
    }

    fn advance(&mut self) -> SchedulerResult<bool> {
        loop {
            if self.pending.is_some() {
                return Ok(true);
            }
            if self.phase == SchedulerPhase::Exhausted {
                return Ok(false);
            }

            if let Some(session) = self.session.as_mut() {
                match session.next_record()? {
                    Some(record) => {
                        self.pending = Some(record);
                        continue;
                    }
                    None => {
                        self.close_session();
                        continue;
                    }
                }
            }

            match self.coalesce_next()? {
                Some(data) => self.open_session(&data)?,
                None => {
                    self.phase = SchedulerPhase::Exhausted;
                    self.logger.event(
                        Event::SchedulerExhausted,
                        &[
                            ("ranges_seen", self.ranges_seen.to_string().as_str()),
                            ("scans_issued", self.scans_issued.to_string().as_str()),
                            ("sessions_opened", self.sessions_opened.to_string().as_str()),
                        ],
                    );
                    return Ok(false);
                }
            }
        }
    }

    /// Next descriptor merged with every following one that shares its
    /// settings
    fn coalesce_next(&mut self) -> SchedulerResult<Option<QueryData>> {
        let mut combined = match self.upstream.next() {
            Some(data) => data,
            None => return Ok(None),
        };
        self.count(&combined)?;

        while let Some(next) = self.upstream.next_if(|n| combined.shares_settings(n)) {
            self.count(&next)?;
            combined.absorb(next);
        }
        Ok(Some(combined))
    }

    fn count(&mut self, data: &QueryData) -> SchedulerResult<()> {
        self.ranges_seen += data.range_count() as u64;
        self.scans_issued += 1;

        match self.max_ranges {
            Some(limit) if self.ranges_seen > limit => {
                self.logger.event(
                    Event::ScanLimitReached,
                    &[
                        ("limit", limit.to_string().as_str()),
                        ("ranges_seen", self.ranges_seen.to_string().as_str()),
                    ],
                );
                Err(SchedulerError::scan_limit_reached(limit, self.ranges_seen))
            }
            _ => Ok(()),
        }
    }

    fn open_session(&mut self, data: &QueryData) -> SchedulerResult<()> {
        match self.provider.open(data, &self.labels) {
            Ok(session) => {
                self.session = Some(session);
                self.sessions_opened += 1;
                self.phase = SchedulerPhase::Draining;
                self.metrics.increment_sessions_opened();
                self.logger.event(
                    Event::ScanSessionOpened,
                    &[("ranges", data.range_count().to_string().as_str())],
                );
                Ok(())
            }
            Err(err) => {
                self.session = None;
                self.logger
                    .event(Event::ConnectionFailed, &[("reason", err.message())]);
                Err(err)
            }
        }
    }

    /// Return the open session, if any. Close failures are logged and
    /// swallowed.
    fn close_session(&mut self) {
        if let Some(session) = self.session.take() {
            match self.provider.close(session) {
                Ok(()) => {
                    self.metrics.increment_sessions_closed();
                    self.logger.event(Event::ScanSessionClosed, &[]);
                }
                Err(err) => {
                    self.metrics.increment_session_close_failures();
                    self.logger
                        .event(Event::ScanSessionCloseFailed, &[("reason", err.message())]);
                }
            }
        }
        if self.phase == SchedulerPhase::Draining {
            self.phase = SchedulerPhase::Idle;
        }
    }
}

impl<I: Iterator<Item = QueryData>> Iterator for ScanScheduler<I> {
    type Item = SchedulerResult<ResultRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}

impl<I: Iterator<Item = QueryData>> Drop for ScanScheduler<I> {
    fn drop(&mut self) {
        self.close();
    }
}
