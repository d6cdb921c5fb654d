//! The server-side requeue routine contract.

use crate::error::AdapterResult;
use quemirror_model::{DeliveryId, QueueType};

/// Arguments for one invocation of the requeue routine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequeueCall {
    /// The broker-side delivery to reinsert.
    pub delivery_id: DeliveryId,
    /// Which physical queue to reinsert into.
    pub queue_type: QueueType,
    /// Redelivery delay in seconds.
    pub delay_seconds: u32,
    /// Redelivery-count hint stamped onto the new delivery.
    pub redelivery_count: u32,
}

/// Transport to the atomic server-side requeue routine.
///
/// The routine itself is owned by the broker's transport/storage layer:
/// it locates the original delivery record, constructs a new delivery
/// into the target queue honoring the requested delay, and returns the
/// affected count, or `None` when no matching delivery exists. This
/// contract only exposes invoking it, inside or outside a caller-managed
/// transaction.
pub trait RequeueTransport: Send + Sync {
    /// Invokes the routine outside any caller-managed transaction.
    ///
    /// `Ok(None)` means "no matching delivery" and is not an error.
    fn requeue(&self, call: &RequeueCall) -> AdapterResult<Option<i64>>;

    /// Begins a caller-managed transaction for all-or-nothing batches.
    fn begin(&self) -> AdapterResult<Box<dyn RequeueTransaction + '_>>;
}

impl<T: RequeueTransport + ?Sized> RequeueTransport for &T {
    fn requeue(&self, call: &RequeueCall) -> AdapterResult<Option<i64>> {
        (**self).requeue(call)
    }

    fn begin(&self) -> AdapterResult<Box<dyn RequeueTransaction + '_>> {
        (**self).begin()
    }
}

impl<T: RequeueTransport + ?Sized> RequeueTransport for std::sync::Arc<T> {
    fn requeue(&self, call: &RequeueCall) -> AdapterResult<Option<i64>> {
        (**self).requeue(call)
    }

    fn begin(&self) -> AdapterResult<Box<dyn RequeueTransaction + '_>> {
        (**self).begin()
    }
}

/// A caller-managed transaction around requeue routine invocations.
///
/// Invocations made through the transaction take effect only on
/// [`commit`](RequeueTransaction::commit); a rolled-back or dropped
/// transaction requeues nothing.
pub trait RequeueTransaction {
    /// Invokes the routine inside this transaction.
    fn requeue(&mut self, call: &RequeueCall) -> AdapterResult<Option<i64>>;

    /// Commits every invocation made through this transaction.
    fn commit(self: Box<Self>) -> AdapterResult<()>;

    /// Rolls the transaction back.
    fn rollback(self: Box<Self>);
}
