use tokio::{sync::mpsc, task::JoinHandle};
use wisdom_engine::api::Notification;

use crate::SharedInbox;

/// Moves every notification emitted by the store into the inbox, until the
/// store drops its end of the feed
pub fn spawn_relay(
    mut feed: mpsc::UnboundedReceiver<Notification>,
    inbox: SharedInbox,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(n) = feed.recv().await {
            tracing::trace!(recipient = ?n.recipient_id, kind = ?n.kind, "delivering notification");
            inbox.write().await.deliver(n);
        }
        tracing::debug!("notification feed closed");
    })
}
