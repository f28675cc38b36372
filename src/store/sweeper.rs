//! Background removal of expired sessions.
//!
//! Lookups already drop expired sessions they touch; the sweeper handles the ones nobody
//! presents again.

use super::SessionStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error};

/// Spawn a task that purges expired sessions every `every`.
///
/// The first purge runs one full period after spawning.
pub fn spawn_session_sweeper(
    sessions: Arc<dyn SessionStore>,
    every: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(every.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // `interval` fires immediately on the first tick.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            match sessions.purge_expired().await {
                Ok(0) => {}
                Ok(purged) => debug!("purged {purged} expired sessions"),
                Err(err) => error!("session sweep failed: {err}"),
            }
        }
    })
}
