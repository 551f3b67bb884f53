//! Line-oriented terminal front end.
//!
//! Each input line replaces the whole search input. The published result list
//! is re-rendered as a table whenever it changes, with a banner while the
//! quota breaker is open. Logs go to stderr, so the writer passed here only
//! ever receives rendered tables.

use std::io::{self, Write};
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, warn};

use crate::domain::{
    DebounceController, Query, RateLimitStatus, ResultList, ScheduleDecision, SearchOrchestrator,
};

/// Drive the pipeline from `input` until end of input.
///
/// At end of input the pending search is allowed to fire and finish, the final
/// state is rendered, and the controller is shut down.
///
/// # Errors
///
/// Returns an error when reading input or writing output fails.
pub async fn run<R, W>(
    mut controller: DebounceController,
    orchestrator: Arc<SearchOrchestrator>,
    input: R,
    output: &mut W,
) -> io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();
    let mut results = orchestrator.subscribe();
    let mut rate_limit = orchestrator.subscribe_rate_limit();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let decision = controller.on_query_change(Query::new(line));
                if let ScheduleDecision::Suppressed { until } = decision {
                    render_results(
                        &orchestrator.current(),
                        RateLimitStatus::Exceeded { until },
                        output,
                    )?;
                }
            }
            Ok(()) = results.changed() => {
                let current = results.borrow_and_update().clone();
                render_results(&current, orchestrator.rate_limit_status(), output)?;
            }
            Ok(()) = rate_limit.changed() => {
                render_results(&orchestrator.current(), orchestrator.rate_limit_status(), output)?;
            }
        }
    }

    match controller.drain().await {
        Some(Ok(outcome)) => debug!(?outcome, "final search settled"),
        Some(Err(error)) => warn!(%error, "final search failed; showing previous results"),
        None => {}
    }
    render_results(&orchestrator.current(), orchestrator.rate_limit_status(), output)?;
    controller.shutdown();
    Ok(())
}

/// Render `results` as a table, preceded by a banner while rate limited.
///
/// # Errors
///
/// Returns an error when writing to `output` fails.
pub fn render_results(
    results: &ResultList,
    status: RateLimitStatus,
    output: &mut impl Write,
) -> io::Result<()> {
    if let RateLimitStatus::Exceeded { until } = status {
        writeln!(
            output,
            "Rate limit exceeded; edit the query to retry after {}",
            until.to_rfc3339()
        )?;
    }

    if results.is_empty() {
        writeln!(output, "No results.")?;
    } else {
        writeln!(
            output,
            "{:>10}  {:<24}  {:<28}  {:>9}  {:<40}  {}",
            "ID", "Username", "Full Name", "Followers", "Profile URL", "Avatar"
        )?;
        for user in results {
            writeln!(
                output,
                "{:>10}  {:<24}  {:<28}  {:>9}  {:<40}  {}",
                user.hit.id,
                user.login(),
                user.display_name.as_deref().unwrap_or("-"),
                user.followers,
                user.hit.html_url,
                user.hit.avatar_url,
            )?;
        }
    }
    writeln!(output)?;
    output.flush()
}
