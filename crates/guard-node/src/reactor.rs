//! Event reactor: re-evaluates a validator every time it is undelegated.
//!
//! One subscription for the lifetime of the process (`Idle → Subscribed`, no
//! way back). Each event becomes its own task in a [`JoinSet`]; handlers run
//! concurrently and finish in no particular order. There is no dedup across
//! events, so two quick undelegations from the same validator can both end
//! in a delegation.

use crate::actuator;
use crate::context::GuardContext;
use crate::directory;
use crate::ledger::{Confirmation, LedgerGateway, UndelegatedEvent, UndelegationStream};
use guard_core::{format_token_amount, needs_remediation, Address, GuardError};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactorState {
    Idle,
    Subscribed,
}

/// What handling one event amounted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    /// Stranded, delegation confirmed
    Remediated(Confirmation),
    /// Still staked or never earned commission
    Healthy,
    /// Stranded, but dry-run mode skipped the delegation
    Skipped,
    Failed(GuardError),
}

/// Fetch, evaluate and (if stranded) remediate a single validator.
pub async fn handle_undelegation(ctx: &GuardContext, validator: Address) -> EventOutcome {
    let record = match directory::get_validator(ctx.ledger.as_ref(), validator).await {
        Ok(record) => record,
        Err(e) => return EventOutcome::Failed(e),
    };

    if !needs_remediation(&record) {
        debug!(
            "Validator {} still has stake {} (reward {})",
            validator,
            format_token_amount(record.total_stake),
            format_token_amount(record.commission_reward)
        );
        return EventOutcome::Healthy;
    }

    if ctx.dry_run {
        info!("[DRY RUN] Would delegate to validator {}", validator);
        return EventOutcome::Skipped;
    }

    match actuator::remediate(ctx.ledger.as_ref(), validator, ctx.delegation_amount).await {
        Ok(confirmation) => EventOutcome::Remediated(confirmation),
        Err(e) => EventOutcome::Failed(e),
    }
}

pub struct EventReactor {
    ctx: GuardContext,
    state: ReactorState,
    handlers: JoinSet<(Address, EventOutcome)>,
}

impl EventReactor {
    pub fn new(ctx: GuardContext) -> Self {
        Self {
            ctx,
            state: ReactorState::Idle,
            handlers: JoinSet::new(),
        }
    }

    pub fn state(&self) -> ReactorState {
        self.state
    }

    /// Open the `Undelegated` subscription.
    pub async fn subscribe(&mut self) -> Result<UndelegationStream, GuardError> {
        if self.state == ReactorState::Subscribed {
            return Err(GuardError::Subscription(
                "reactor is already subscribed".to_string(),
            ));
        }
        let stream = self.ctx.ledger.subscribe_undelegations().await?;
        self.state = ReactorState::Subscribed;
        info!("Listening for Undelegated events...");
        Ok(stream)
    }

    /// Subscribe and dispatch events until the stream ends.
    ///
    /// Only returns when the gateway loses the subscription; in-flight
    /// handlers are drained first, then the loss is reported as
    /// [`GuardError::Subscription`] so the process exits and its supervisor
    /// can restart it.
    pub async fn run(mut self) -> Result<(), GuardError> {
        let mut events = self.subscribe().await?;

        loop {
            tokio::select! {
                maybe_event = events.recv() => match maybe_event {
                    Some(event) => self.dispatch(event),
                    None => break,
                },
                Some(joined) = self.handlers.join_next(), if !self.handlers.is_empty() => {
                    Self::report(joined);
                }
            }
        }

        while let Some(joined) = self.handlers.join_next().await {
            Self::report(joined);
        }

        Err(GuardError::Subscription(
            "Undelegated event stream closed".to_string(),
        ))
    }

    fn dispatch(&mut self, event: UndelegatedEvent) {
        info!(
            "Undelegated {} from {} to {}",
            format_token_amount(event.amount),
            event.validator,
            event.delegator
        );

        let ctx = self.ctx.clone();
        let validator = event.validator;
        self.handlers
            .spawn(async move { (validator, handle_undelegation(&ctx, validator).await) });
    }

    fn report(joined: Result<(Address, EventOutcome), tokio::task::JoinError>) {
        match joined {
            Ok((validator, EventOutcome::Remediated(c))) => {
                info!("Validator {} restaked (tx {})", validator, c.tx_hash)
            }
            Ok((validator, EventOutcome::Healthy)) => {
                debug!("Validator {} needs no remediation", validator)
            }
            Ok((_, EventOutcome::Skipped)) => {}
            Ok((validator, EventOutcome::Failed(e))) => {
                error!("Handling undelegation for {} failed: {}", validator, e)
            }
            Err(e) => warn!("Undelegation handler task aborted: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock_ledger::{info, MockLedger};
    use guard_core::{GuardConfig, U256};
    use std::sync::Arc;

    fn context(mock: &Arc<MockLedger>) -> GuardContext {
        GuardContext::new(mock.clone(), &GuardConfig::default())
    }

    fn undelegated(validator: Address) -> UndelegatedEvent {
        UndelegatedEvent {
            delegator: Address::repeat_byte(0xdd),
            validator,
            amount: U256::from(10u64),
        }
    }

    #[tokio::test]
    async fn test_handle_stranded_validator() {
        let v3 = Address::repeat_byte(3);
        let mock = Arc::new(MockLedger::new().with_validator(v3, info(0, 7)));

        let outcome = handle_undelegation(&context(&mock), v3).await;

        assert!(matches!(outcome, EventOutcome::Remediated(_)));
        assert_eq!(mock.delegation_count_for(v3), 1);
    }

    #[tokio::test]
    async fn test_handle_partial_undelegation() {
        let v4 = Address::repeat_byte(4);
        let mock = Arc::new(MockLedger::new().with_validator(v4, info(50, 7)));

        let outcome = handle_undelegation(&context(&mock), v4).await;

        assert_eq!(outcome, EventOutcome::Healthy);
        assert!(mock.delegations().is_empty());
    }

    #[tokio::test]
    async fn test_handle_zero_reward_validator() {
        let v = Address::repeat_byte(6);
        let mock = Arc::new(MockLedger::new().with_validator(v, info(0, 0)));

        assert_eq!(
            handle_undelegation(&context(&mock), v).await,
            EventOutcome::Healthy
        );
        assert!(mock.delegations().is_empty());
    }

    #[tokio::test]
    async fn test_handle_failure_is_reported() {
        let v = Address::repeat_byte(7);
        let mock = Arc::new(
            MockLedger::new()
                .with_validator(v, info(0, 7))
                .reject_delegations_to(v),
        );

        let outcome = handle_undelegation(&context(&mock), v).await;
        assert!(matches!(
            outcome,
            EventOutcome::Failed(GuardError::RemediationSubmission { .. })
        ));
    }

    #[tokio::test]
    async fn test_dry_run_skips() {
        let v = Address::repeat_byte(8);
        let mock = Arc::new(MockLedger::new().with_validator(v, info(0, 7)));

        let outcome = handle_undelegation(&context(&mock).with_dry_run(true), v).await;

        assert_eq!(outcome, EventOutcome::Skipped);
        assert!(mock.delegations().is_empty());
    }

    #[tokio::test]
    async fn test_subscribe_moves_to_subscribed() {
        let mock = Arc::new(MockLedger::new());
        let mut reactor = EventReactor::new(context(&mock));
        assert_eq!(reactor.state(), ReactorState::Idle);

        reactor.subscribe().await.unwrap();
        assert_eq!(reactor.state(), ReactorState::Subscribed);
        assert!(reactor.subscribe().await.is_err());
    }

    #[tokio::test]
    async fn test_run_handles_events_until_stream_closes() {
        let stranded = Address::repeat_byte(1);
        let healthy = Address::repeat_byte(2);
        let mock = Arc::new(
            MockLedger::new()
                .with_validator(stranded, info(0, 7))
                .with_validator(healthy, info(50, 7)),
        );

        let reactor = EventReactor::new(context(&mock));
        let handle = tokio::spawn(reactor.run());

        assert!(mock.emit(undelegated(stranded)).await);
        assert!(mock.emit(undelegated(healthy)).await);
        mock.close_events();

        let result = handle.await.unwrap();
        assert!(matches!(result, Err(GuardError::Subscription(_))));
        assert_eq!(mock.delegation_count_for(stranded), 1);
        assert_eq!(mock.delegation_count_for(healthy), 0);
        assert_eq!(mock.lookups(), 2);
    }

    #[tokio::test]
    async fn test_handlers_run_concurrently() {
        let slow = Address::repeat_byte(1);
        let fast = Address::repeat_byte(2);
        let gate = Arc::new(tokio::sync::Notify::new());
        let mock = Arc::new(
            MockLedger::new()
                .with_validator(slow, info(0, 7))
                .with_validator(fast, info(0, 9))
                .gate_confirmations_for(slow, gate.clone()),
        );

        // slow arrives first and stays blocked on its receipt
        assert!(mock.emit(undelegated(slow)).await);
        assert!(mock.emit(undelegated(fast)).await);
        mock.close_events();

        let handle = tokio::spawn(EventReactor::new(context(&mock)).run());

        let fast_done = tokio::time::timeout(std::time::Duration::from_secs(5), async {
            while !mock.confirmed().contains(&fast) {
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            }
        })
        .await;
        assert!(fast_done.is_ok(), "second handler was blocked by the first");
        assert_eq!(mock.confirmed(), vec![fast]);
        assert!(!handle.is_finished());

        gate.notify_one();
        let result = handle.await.unwrap();
        assert!(matches!(result, Err(GuardError::Subscription(_))));
        assert_eq!(mock.confirmed(), vec![fast, slow]);
    }

    #[tokio::test]
    async fn test_run_fails_when_subscription_unavailable() {
        let mock = Arc::new(MockLedger::new());
        // take the only subscription first
        let _stream = mock.subscribe_undelegations().await.unwrap();

        let result = EventReactor::new(context(&mock)).run().await;
        assert!(matches!(result, Err(GuardError::Subscription(_))));
    }
}
