use std::collections::HashMap;

use wisdom_engine::api::{Notification, UserId};

/// Delivered notifications of every user, oldest first
#[derive(Debug, Default)]
pub struct Inbox(HashMap<UserId, Vec<Notification>>);

impl Inbox {
    pub fn new() -> Inbox {
        Inbox::default()
    }

    pub fn deliver(&mut self, n: Notification) {
        self.0.entry(n.recipient_id).or_default().push(n);
    }

    /// Newest first
    pub fn all(&self, user: &UserId) -> Vec<Notification> {
        self.latest(user, usize::MAX)
    }

    /// The `n` newest notifications, newest first
    pub fn latest(&self, user: &UserId, n: usize) -> Vec<Notification> {
        self.0
            .get(user)
            .map(|notifs| notifs.iter().rev().take(n).cloned().collect())
            .unwrap_or_default()
    }

    pub fn unread_count(&self, user: &UserId) -> usize {
        self.0
            .get(user)
            .map(|notifs| notifs.iter().filter(|n| !n.read).count())
            .unwrap_or(0)
    }

    pub fn mark_all_read(&mut self, user: &UserId) {
        for n in self.0.get_mut(user).into_iter().flatten() {
            n.read = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use wisdom_engine::api::{ArticleId, NotificationKind, Uuid};

    use super::*;

    fn notif(recipient: UserId, i: usize) -> Notification {
        Notification::new(
            UserId::stub(),
            recipient,
            NotificationKind::Comment,
            ArticleId::stub(),
            None,
            format!("sender {i}"),
            chrono::Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn newest_first_and_read_tracking() {
        let mut inbox = Inbox::new();
        let (alice, bob) = (UserId(Uuid::new_v4()), UserId(Uuid::new_v4()));
        for i in 0..25 {
            inbox.deliver(notif(alice, i));
        }
        inbox.deliver(notif(bob, 0));

        let latest = inbox.latest(&alice, 20);
        assert_eq!(latest.len(), 20);
        assert_eq!(latest[0].sender_name, "sender 24");
        assert_eq!(latest[19].sender_name, "sender 5");
        assert_eq!(inbox.all(&alice).len(), 25);

        assert_eq!(inbox.unread_count(&alice), 25);
        inbox.mark_all_read(&alice);
        assert_eq!(inbox.unread_count(&alice), 0);
        assert_eq!(inbox.unread_count(&bob), 1);
        assert!(inbox.all(&UserId(Uuid::new_v4())).is_empty());
    }
}
