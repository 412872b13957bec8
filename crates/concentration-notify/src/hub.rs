//! Observer registry and fan-out.

use std::sync::{Arc, PoisonError, RwLock};

use concentration_model::Notification;

use crate::DispatchContext;

// ---------------------------------------------------------------------------
// Subscriber
// ---------------------------------------------------------------------------

/// Receives state-change notifications.
///
/// `update` should return quickly: subscribers with
/// [`Affinity::Caller`] run on the listener loop itself.
///
/// Any `Fn(&Notification)` closure is a subscriber.
pub trait Subscriber: Send + Sync + 'static {
    /// Called once per notification, in the order notifications are
    /// produced.
    fn update(&self, notification: &Notification);
}

impl<F> Subscriber for F
where
    F: Fn(&Notification) + Send + Sync + 'static,
{
    fn update(&self, notification: &Notification) {
        self(notification)
    }
}

/// Where a subscriber's `update` runs.
#[derive(Debug, Clone, Default)]
pub enum Affinity {
    /// Inline, on whatever task calls [`NotificationHub::notify`].
    #[default]
    Caller,
    /// On the given context's thread. Calls from other threads are queued.
    Context(DispatchContext),
}

#[derive(Clone)]
struct Registration {
    subscriber: Arc<dyn Subscriber>,
    affinity: Affinity,
}

// ---------------------------------------------------------------------------
// NotificationHub
// ---------------------------------------------------------------------------

/// Fans notifications out to every registered subscriber, in registration
/// order.
///
/// Cloning the hub gives another handle to the same registry.
#[derive(Clone, Default)]
pub struct NotificationHub {
    registrations: Arc<RwLock<Vec<Registration>>>,
}

impl NotificationHub {
    /// Creates an empty hub.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a subscriber.
    ///
    /// Registering the same `Arc` again is a no-op and returns `false`;
    /// the first registration and its affinity stay in place.
    pub fn subscribe(&self, subscriber: Arc<dyn Subscriber>, affinity: Affinity) -> bool {
        let mut registrations = self
            .registrations
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        if registrations
            .iter()
            .any(|r| Arc::ptr_eq(&r.subscriber, &subscriber))
        {
            tracing::debug!("subscriber already registered");
            return false;
        }

        registrations.push(Registration {
            subscriber,
            affinity,
        });
        tracing::debug!(subscribers = registrations.len(), "subscriber registered");
        true
    }

    /// Number of registered subscribers.
    pub fn len(&self) -> usize {
        self.registrations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// `true` if nobody is subscribed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Delivers `notification` to every subscriber.
    ///
    /// Caller-affine subscribers, and context-affine ones whose context is
    /// the current thread, run before this returns. Others are queued on
    /// their context; this waits for the enqueue only. A closed context is
    /// logged and skipped.
    ///
    /// Returns how many subscribers were reached.
    pub async fn notify(&self, notification: &Notification) -> usize {
        // Copy the list out so no lock is held across an await.
        let registrations = self
            .registrations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        let mut delivered = 0;
        for registration in registrations {
            match &registration.affinity {
                Affinity::Caller => {
                    registration.subscriber.update(notification);
                    delivered += 1;
                }
                Affinity::Context(context) if context.is_current() => {
                    registration.subscriber.update(notification);
                    delivered += 1;
                }
                Affinity::Context(context) => {
                    let subscriber = Arc::clone(&registration.subscriber);
                    let notification = notification.clone();
                    match context
                        .dispatch(move || subscriber.update(&notification))
                        .await
                    {
                        Ok(()) => delivered += 1,
                        Err(e) => tracing::warn!(error = %e, "notification not delivered"),
                    }
                }
            }
        }

        tracing::trace!(kind = ?notification.kind, delivered, "notification fanned out");
        delivered
    }
}

impl std::fmt::Debug for NotificationHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationHub")
            .field("subscribers", &self.len())
            .finish()
    }
}
