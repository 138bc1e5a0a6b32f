//! Per-request state threaded through the mediator.

use common::ActingPrincipal;
use uuid::Uuid;

use crate::notification::{DomainNotification, NotificationCollector};

/// An event handler failure recorded during publish.
///
/// Kept apart from the notifications: a dropped audit record does not turn
/// a committed command into a failed one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishFailure {
    pub event_type: String,
    pub handler: &'static str,
    pub reason: String,
}

/// Everything the core needs to know about the request being served.
///
/// Created fresh for every inbound request and passed explicitly through
/// `Mediator::send`, the command handler, and `Mediator::publish`. Nothing
/// in it is shared with other requests.
#[derive(Debug)]
pub struct RequestContext {
    request_id: Uuid,
    principal: ActingPrincipal,
    notifications: NotificationCollector,
    publish_failures: Vec<PublishFailure>,
}

impl RequestContext {
    pub fn new(principal: ActingPrincipal) -> Self {
        Self::with_request_id(Uuid::new_v4(), principal)
    }

    pub fn with_request_id(request_id: Uuid, principal: ActingPrincipal) -> Self {
        Self {
            request_id,
            principal,
            notifications: NotificationCollector::new(),
            publish_failures: Vec::new(),
        }
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn principal(&self) -> &ActingPrincipal {
        &self.principal
    }

    pub fn notifications(&self) -> &NotificationCollector {
        &self.notifications
    }

    pub fn notify(&mut self, notification: DomainNotification) {
        self.notifications.add(notification);
    }

    pub fn publish_failures(&self) -> &[PublishFailure] {
        &self.publish_failures
    }

    pub(crate) fn record_publish_failure(&mut self, failure: PublishFailure) {
        self.publish_failures.push(failure);
    }
}
