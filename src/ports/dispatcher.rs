//! SideEffectDispatcher port - fire-and-forget notification jobs.
//!
//! The orchestrator returns side-effect commands; the application layer
//! hands them to this port AFTER the persistence transaction has
//! committed. A dispatch failure is logged and retried independently -
//! it must never roll back or re-run the financial transition.

use async_trait::async_trait;

use crate::domain::billing::SideEffect;
use crate::domain::foundation::DomainError;

/// Port for enqueueing side-effect notification jobs.
#[async_trait]
pub trait SideEffectDispatcher: Send + Sync {
    /// Enqueue a single side effect for delivery.
    async fn dispatch(&self, effect: SideEffect) -> Result<(), DomainError>;

    /// Enqueue several side effects, preserving order.
    ///
    /// The default implementation dispatches one by one and stops at the
    /// first failure; queue-backed implementations may batch.
    async fn dispatch_all(&self, effects: Vec<SideEffect>) -> Result<(), DomainError> {
        for effect in effects {
            self.dispatch(effect).await?;
        }
        Ok(())
    }
}
