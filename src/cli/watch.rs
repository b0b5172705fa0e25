use super::Session;
use atnd::attendance::Attendance;
use atnd::context::OpContext;
use std::time::{Duration, SystemTime};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Sweep the roster every `interval` until Ctrl-C
///
/// After each sweep the status history is printed, oldest sighting first.
/// Hardware errors (adapter down) are reported and retried on the next tick;
/// anything else ends the command.
pub async fn execute(
    session: &Session,
    interval: Option<Duration>,
) -> Result<(), Box<dyn std::error::Error>> {
    let engine = session.open_engine()?;
    let interval = interval.unwrap_or(session.config.search.watch_interval);

    let shutdown = CancellationToken::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            trigger.cancel();
        }
    });

    let root = OpContext::with_token(shutdown.clone());
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(interval = %humantime::format_duration(interval), "watching");

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let ctx = root.child(Some(session.config.search.timeout));
        match engine.search_all(&ctx).await {
            Ok(found) => info!(present = found.len(), "sweep complete"),
            Err(e) if shutdown.is_cancelled() && e.is_cancellation() => break,
            Err(e) if e.is_retryable() => {
                warn!(error = %e, "sweep failed, retrying next interval");
                eprintln!("{}", e.user_message());
                continue;
            }
            Err(e) => return Err(e.into()),
        }

        println!("--- {} ---", humantime::format_rfc3339_seconds(SystemTime::now()));
        for line in render_status(&engine.status(), SystemTime::now()) {
            println!("{}", line);
        }
    }

    info!("watch stopped");
    Ok(())
}

/// One line per sighting: name and how long ago it was seen
pub fn render_status(entries: &[Attendance], now: SystemTime) -> Vec<String> {
    if entries.is_empty() {
        return vec!["Nobody seen yet.".to_string()];
    }

    let width = entries.iter().map(|a| a.name.len()).max().unwrap_or(0);
    entries
        .iter()
        .map(|a| {
            // Whole seconds; a clock step backwards shows as "just now"
            let ago = now
                .duration_since(a.seen_at)
                .map(|d| Duration::from_secs(d.as_secs()))
                .unwrap_or_default();
            if ago.is_zero() {
                format!("{:width$}  just now", a.name, width = width)
            } else {
                format!(
                    "{:width$}  {} ago",
                    a.name,
                    humantime::format_duration(ago),
                    width = width
                )
            }
        })
        .collect()
}
