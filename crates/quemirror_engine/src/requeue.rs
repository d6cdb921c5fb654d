//! The requeue engine: batch policy over the server-side routine.

use crate::error::EngineResult;
use crate::request::{RequeueOutcome, RequeueRequest};
use quemirror_broker::RequeueTransport;
use tracing::{debug, info, warn};

/// Requeues broker-side deliveries through the atomic server-side
/// routine.
///
/// The routine itself is invoked, not reimplemented: this engine only
/// supplies batching policy — one shared transaction for all-or-nothing
/// semantics, or independent invocations for best-effort semantics. The
/// choice is the caller's trade-off between consistency and
/// availability.
pub struct RequeueEngine<R> {
    transport: R,
}

impl<R: RequeueTransport> RequeueEngine<R> {
    /// Creates a requeue engine over the given transport.
    pub fn new(transport: R) -> Self {
        Self { transport }
    }

    /// Requeues the batch described by `request`.
    pub fn requeue(&self, request: &RequeueRequest) -> EngineResult<RequeueOutcome> {
        if request.transactional {
            self.requeue_transactional(request)
        } else {
            self.requeue_independent(request)
        }
    }

    /// All-or-nothing: every invocation happens inside one transaction,
    /// and any transport fault rolls the whole batch back.
    ///
    /// A null routine result is not a fault; on commit the reported
    /// count is the full batch size, never a partial number.
    fn requeue_transactional(&self, request: &RequeueRequest) -> EngineResult<RequeueOutcome> {
        let mut tx = self.transport.begin()?;

        for delivery_id in &request.delivery_ids {
            if let Err(err) = tx.requeue(&request.call_for(*delivery_id)) {
                warn!(delivery = %delivery_id, "transactional requeue failed, rolling back batch");
                tx.rollback();
                return Err(err.into());
            }
        }

        tx.commit()?;
        info!(count = request.delivery_ids.len(), "requeue batch committed");
        Ok(RequeueOutcome {
            succeeded: request.delivery_ids.len(),
        })
    }

    /// Best-effort: each invocation stands alone. Only positive affected
    /// counts are counted; a transport fault fails just the in-flight
    /// delivery and the loop continues.
    fn requeue_independent(&self, request: &RequeueRequest) -> EngineResult<RequeueOutcome> {
        let mut succeeded = 0usize;

        for delivery_id in &request.delivery_ids {
            match self.transport.requeue(&request.call_for(*delivery_id)) {
                Ok(Some(count)) if count > 0 => succeeded += 1,
                Ok(_) => debug!(delivery = %delivery_id, "no matching delivery"),
                Err(err) => warn!(delivery = %delivery_id, "requeue failed: {err}"),
            }
        }

        info!(
            succeeded,
            requested = request.delivery_ids.len(),
            "independent requeue batch finished"
        );
        Ok(RequeueOutcome { succeeded })
    }
}
