//! Retry-until-condition-or-timeout over a rendered page.
//!
//! Client-side rendered pages give no reliable "done" event, so both feed
//! scrolling and player discovery come down to: wait a bit, look at the DOM,
//! repeat. [`poll_until`] is that loop.

use crate::dom::DomSnapshot;
use crate::error::RenderError;
use crate::render::RenderedPageSource;
use std::time::Duration;
use tokio::time::{Instant, sleep};
use tracing::{debug, instrument, trace};

/// What to do to the page before each wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// Leave the page alone; it loads by itself.
    Stay,
    /// Ask the page for more content (scroll to the end) once per iteration.
    TriggerMore,
}

/// Result of a bounded poll.
#[derive(Debug)]
pub enum PollOutcome {
    /// The condition held on this snapshot.
    Ready(DomSnapshot),
    /// Time ran out; carries the last snapshot taken.
    TimedOut(DomSnapshot),
}

impl PollOutcome {
    pub fn is_ready(&self) -> bool {
        matches!(self, PollOutcome::Ready(_))
    }

    pub fn into_snapshot(self) -> DomSnapshot {
        match self {
            PollOutcome::Ready(dom) | PollOutcome::TimedOut(dom) => dom,
        }
    }
}

/// Poll `page` until `condition` holds or `timeout` has elapsed.
///
/// Each iteration optionally advances the page, sleeps `wait`, takes a fresh
/// snapshot and checks it. The first check always happens, even when `timeout`
/// is shorter than `wait`.
///
/// # Arguments
///
/// * `source` / `page` - The page being watched
/// * `condition` - Readiness check run on every fresh snapshot
/// * `advance` - Whether to ask the page for more content before each wait
/// * `wait` - Pause before each snapshot, one sampled value per poll
/// * `timeout` - Bound on the time since the poll started
///
/// # Returns
///
/// [`PollOutcome::Ready`] with the first snapshot that satisfied `condition`,
/// or [`PollOutcome::TimedOut`] with the last snapshot taken.
///
/// # Errors
///
/// A false condition is not an error. Only failures of the page source
/// (`trigger_more` or `snapshot`) are returned, unchanged.
///
/// # Examples
///
/// ```ignore
/// let outcome = poll_until(
///     &source,
///     &page,
///     |dom| site.is_detail_ready(dom),
///     Advance::Stay,
///     config.item_wait.sample(),
///     config.item_timeout,
/// )
/// .await?;
/// ```
#[instrument(
    level = "debug",
    skip_all,
    fields(?advance, wait_ms = wait.as_millis() as u64, timeout_ms = timeout.as_millis() as u64)
)]
pub async fn poll_until<S, C>(
    source: &S,
    page: &S::Handle,
    condition: C,
    advance: Advance,
    wait: Duration,
    timeout: Duration,
) -> Result<PollOutcome, RenderError>
where
    S: RenderedPageSource,
    C: Fn(&DomSnapshot) -> bool,
{
    let started = Instant::now();
    let mut checks = 0u32;

    loop {
        if advance == Advance::TriggerMore {
            source.trigger_more(page).await?;
        }
        sleep(wait).await;

        let snapshot = source.snapshot(page).await?;
        checks += 1;
        let elapsed = started.elapsed();

        if condition(&snapshot) {
            debug!(checks, elapsed_ms = elapsed.as_millis() as u64, "Condition met");
            return Ok(PollOutcome::Ready(snapshot));
        }
        if elapsed >= timeout {
            debug!(checks, elapsed_ms = elapsed.as_millis() as u64, "Poll timed out");
            return Ok(PollOutcome::TimedOut(snapshot));
        }
        trace!(checks, elapsed_ms = elapsed.as_millis() as u64, "Condition not met yet");
    }
}
