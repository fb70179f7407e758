// Session slot poller.
//
// Another process (or another store on the same file) may sign a user in
// or out. The poller re-reads the session slot on a fixed interval and
// forwards the session user only when it differs from the last one seen.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use unishare_core::models::User;

use crate::app::AppState;

/// Poll until the receiver is dropped. The first read is always forwarded.
pub async fn run(state: Arc<AppState>, tx: mpsc::Sender<Option<User>>) {
    let period = Duration::from_millis(state.config.session.poll_interval_ms);
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut last: Option<Option<User>> = None;
    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tx.closed() => {
                debug!("session receiver dropped, stopping poller");
                return;
            }
        }

        let current = match state.store.session() {
            Ok(user) => user,
            Err(e) => {
                warn!(error = %e, "failed to read session slot");
                continue;
            }
        };
        if last.as_ref() == Some(&current) {
            continue;
        }

        debug!(uid = current.as_ref().map(|u| u.uid.as_str()), "session changed");
        if tx.send(current.clone()).await.is_err() {
            debug!("session receiver dropped, stopping poller");
            return;
        }
        last = Some(current);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use unishare_ai::AiClient;
    use unishare_core::config::Config;
    use unishare_core::store::Store;

    fn state() -> Arc<AppState> {
        let config = Config::ephemeral();
        let store = Store::in_memory(config.trade.policy).unwrap();
        Arc::new(AppState::new(config, store, Arc::new(AiClient::Disabled)))
    }

    #[tokio::test(start_paused = true)]
    async fn forwards_initial_state_then_changes_only() {
        let state = state();
        let (tx, mut rx) = mpsc::channel(8);
        let poller = tokio::spawn(run(Arc::clone(&state), tx));

        assert_eq!(rx.recv().await, Some(None));

        let user = state
            .sign_in("asha@bvuniversity.edu.in", "Asha", None)
            .unwrap();
        let seen = rx.recv().await.unwrap().unwrap();
        assert_eq!(seen.uid, user.uid);

        // Unchanged slot: nothing more within several intervals.
        let quiet = tokio::time::timeout(Duration::from_secs(10), rx.recv()).await;
        assert!(quiet.is_err());

        state.sign_out().unwrap();
        assert_eq!(rx.recv().await, Some(None));

        drop(rx);
        poller.await.unwrap();
    }
}
