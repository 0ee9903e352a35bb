//! Tailing a log through DownloadDBLogFilePortion.
//!
//! The follower polls one line at a time from a moving marker. While the
//! provider reports more data it keeps polling; once it reports nothing
//! pending it waits [`DEFAULT_IDLE_INTERVAL`] before asking again. The loop
//! only ends when an error is returned.

use std::{convert::Infallible, io::Write, time::Duration};

use crate::{
    error::LogsError,
    provider::{LogPortion, LogProvider},
};

pub const DEFAULT_IDLE_INTERVAL: Duration = Duration::from_secs(15);
pub const DEFAULT_LINES_PER_FETCH: i32 = 1;

/// Marker the provider expects for the start of a log.
pub const INITIAL_MARKER: &str = "0";

#[derive(Debug, Clone)]
pub struct FollowOptions {
    pub lines_per_fetch: i32,
    /// Wait between polls once the provider has nothing pending
    pub idle_interval: Duration,
}

impl Default for FollowOptions {
    fn default() -> Self {
        Self {
            lines_per_fetch: DEFAULT_LINES_PER_FETCH,
            idle_interval: DEFAULT_IDLE_INTERVAL,
        }
    }
}

/// Resume position inside the followed log. Lives only as long as the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FollowCursor {
    marker: String,
    pending: bool,
}

impl Default for FollowCursor {
    fn default() -> Self {
        Self {
            marker: INITIAL_MARKER.to_string(),
            pending: true,
        }
    }
}

impl FollowCursor {
    pub fn marker(&self) -> &str {
        &self.marker
    }

    pub fn pending(&self) -> bool {
        self.pending
    }

    /// Moves to the marker returned with `portion`. A response without a
    /// marker keeps the current position.
    pub fn advance(&mut self, portion: &LogPortion) {
        if let Some(marker) = &portion.marker {
            self.marker.clone_from(marker);
        }
        self.pending = portion.pending;
    }
}

/// Outcome of a single poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cycle {
    /// More data is pending, poll again right away
    Polling,
    /// Nothing pending, wait before the next poll
    IdleWait,
}

pub struct LogFollower<P> {
    provider: P,
    instance: String,
    log_name: String,
    options: FollowOptions,
    cursor: FollowCursor,
}

impl<P: LogProvider> LogFollower<P> {
    pub fn new(
        provider: P,
        instance: impl Into<String>,
        log_name: impl Into<String>,
        options: FollowOptions,
    ) -> Self {
        Self {
            provider,
            instance: instance.into(),
            log_name: log_name.into(),
            options,
            cursor: FollowCursor::default(),
        }
    }

    pub fn cursor(&self) -> &FollowCursor {
        &self.cursor
    }

    /// Fetches the next portion, writes any content to `out` and advances
    /// the cursor.
    pub async fn poll<W: Write>(&mut self, out: &mut W) -> Result<Cycle, LogsError> {
        let portion = self
            .provider
            .download_log_portion(
                &self.instance,
                &self.log_name,
                self.cursor.marker(),
                self.options.lines_per_fetch,
            )
            .await?;

        if let Some(data) = portion.data.as_deref().filter(|d| !d.is_empty()) {
            out.write_all(data.as_bytes())
                .and_then(|_| out.flush())
                .map_err(|e| LogsError::local_io("<output>", e))?;
        }

        self.cursor.advance(&portion);
        log::trace!("{} now at marker {}", self.log_name, self.cursor.marker());

        Ok(match self.cursor.pending() {
            true => Cycle::Polling,
            false => Cycle::IdleWait,
        })
    }

    /// Follows the log forever, returning only on error.
    pub async fn run<W: Write>(&mut self, mut out: W) -> Result<Infallible, LogsError> {
        log::info!("Following {} on {}", self.log_name, self.instance);

        loop {
            if self.poll(&mut out).await? == Cycle::IdleWait {
                log::info!(
                    "No data pending. Sleeping {} sec",
                    self.options.idle_interval.as_secs()
                );
                tokio::time::sleep(self.options.idle_interval).await;
            }
        }
    }
}
