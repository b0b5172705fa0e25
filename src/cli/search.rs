use super::Session;
use atnd::context::OpContext;
use std::time::Duration;

/// Probe one member, or sweep the whole roster
///
/// The whole search runs under one deadline (`--timeout`, else
/// `[search] timeout`); Ctrl-C cancels it and stops any running probe.
pub async fn execute(
    session: &Session,
    name: Option<String>,
    timeout: Option<Duration>,
) -> Result<(), Box<dyn std::error::Error>> {
    let engine = session.open_engine()?;

    let ctx = OpContext::with_timeout(timeout.unwrap_or(session.config.search.timeout));
    let canceller = ctx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            canceller.cancel();
        }
    });

    match name {
        Some(name) => match engine.search_one(&ctx, &name).await? {
            Some(found) => println!("{} is here", found.name),
            None => println!("{} is not around", name),
        },
        None => {
            let found = engine.search_all(&ctx).await?;
            if found.is_empty() {
                println!("Nobody is around.");
            }
            for attendance in found {
                println!("{} is here", attendance.name);
            }
        }
    }

    Ok(())
}
