//! Time-delay track: request, wait, approve or cancel.

mod common;

use bastion_engine::{
    CancelWindow, EngineError, ErrorKind, OperationOverride, TIMELOCK_UPDATE,
    TIMELOCK_UPDATE_REQUEST, WorkflowPath,
};
use bastion_types::{
    Action, Execution, Identity, OperationTypeId, PaymentDetails, Selector, TxId, TxStatus,
};
use common::*;

// ----- Scenario: request then approve after the lock ------------------------

#[test]
fn approve_after_release_completes() {
    let mut fx = Fixture::new();
    fx.dispatcher.respond(target(), vec![0x01]);

    let id = fx.request();
    let record = fx.engine.get_transaction(id).unwrap();
    assert_eq!(id, TxId(1));
    assert_eq!(record.status, TxStatus::Pending);
    assert_eq!(record.release_time, T0 + ADDR_PERIOD);
    assert_eq!(record.history, vec![Action::TimeDelayRequest]);
    assert_eq!(fx.engine.list_pending(), vec![id]);

    fx.clock.advance(30);
    let err = fx
        .engine
        .approve_by_timelock(id, fx.approver.identity())
        .unwrap_err();
    assert!(matches!(err, EngineError::TimeLockNotExpired { .. }));
    assert_eq!(err.kind(), ErrorKind::Timing);
    assert_eq!(
        fx.engine.get_transaction(id).unwrap().status,
        TxStatus::Pending
    );

    fx.clock.advance(31);
    let done = fx
        .engine
        .approve_by_timelock(id, fx.approver.identity())
        .unwrap();
    assert_eq!(done.status, TxStatus::Completed);
    assert_eq!(done.result, vec![0x01]);
    assert_eq!(
        done.history,
        vec![Action::TimeDelayRequest, Action::TimeDelayApprove]
    );
    assert!(done.message.is_none());
    assert!(fx.engine.list_pending().is_empty());

    let calls = fx.dispatcher.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].tx_id, id);
    assert_eq!(calls[0].target, target());
    assert_eq!(fx.events.names(), vec!["Requested", "Approved", "Executed"]);
}

#[test]
fn approval_allowed_exactly_at_release_time() {
    let mut fx = Fixture::new();
    let id = fx.request();
    fx.clock.set(T0 + ADDR_PERIOD);
    let done = fx
        .engine
        .approve_by_timelock(id, fx.approver.identity())
        .unwrap();
    assert_eq!(done.status, TxStatus::Completed);
}

#[test]
fn operation_without_override_uses_default_period() {
    let mut fx = Fixture::new();
    let other = fx
        .engine
        .register_named_operation_type("FEE_UPDATE", WorkflowPath::standard_set())
        .unwrap();
    assert_eq!(fx.engine.timelock_period(other), DEFAULT_PERIOD);
    assert_eq!(fx.engine.timelock_period(fx.op), ADDR_PERIOD);
}

// ----- Authorization --------------------------------------------------------

#[test]
fn approver_needs_the_approve_grant() {
    let mut fx = Fixture::new();
    let id = fx.request();
    fx.clock.advance(ADDR_PERIOD);

    for caller in [fx.outsider.identity(), fx.canceller.identity(), fx.requester.identity()] {
        let err = fx.engine.approve_by_timelock(id, caller).unwrap_err();
        assert!(
            matches!(err, EngineError::Unauthorized { action: Action::TimeDelayApprove, .. }),
            "{err}"
        );
        assert_eq!(err.kind(), ErrorKind::Authorization);
    }
    assert_eq!(
        fx.engine.get_transaction(id).unwrap().status,
        TxStatus::Pending
    );
    assert_eq!(fx.events.names(), vec!["Requested"]);
}

#[test]
fn requester_needs_the_request_grant() {
    let mut fx = Fixture::new();
    let params = fx.params_for(fx.outsider.identity());
    let err = fx.engine.create(fx.request_handler, params).unwrap_err();
    assert!(matches!(err, EngineError::Unauthorized { .. }));
    assert!(fx.engine.transactions().next().is_none());
}

#[test]
fn revoked_grant_stops_approval() {
    let mut fx = Fixture::new();
    let id = fx.request();
    fx.clock.advance(ADDR_PERIOD);

    let approver_role = bastion_types::RoleHash::from_name("APPROVER");
    fx.engine
        .revoke(approver_role, fx.request_handler, &[Action::TimeDelayApprove])
        .unwrap();
    assert!(!fx.engine.check_permission(
        &fx.approver.identity(),
        fx.request_handler,
        Action::TimeDelayApprove
    ));
    assert!(fx
        .engine
        .approve_by_timelock(id, fx.approver.identity())
        .is_err());
}

// ----- Cancellation ---------------------------------------------------------

#[test]
fn cancel_before_release_with_anytime_window() {
    let mut fx = Fixture::new();
    let id = fx.request();
    assert_eq!(fx.engine.cancel_window(fx.op), CancelWindow::Anytime);

    let cancelled = fx
        .engine
        .cancel_by_timelock(id, fx.canceller.identity())
        .unwrap();
    assert_eq!(cancelled.status, TxStatus::Cancelled);
    assert!(cancelled.result.is_empty());
    assert_eq!(
        cancelled.history,
        vec![Action::TimeDelayRequest, Action::TimeDelayCancel]
    );
    assert!(fx.dispatcher.calls().is_empty());
    assert_eq!(fx.events.names(), vec!["Requested", "Cancelled"]);
}

#[test]
fn after_release_window_blocks_early_cancel() {
    let mut fx = Fixture::with_config(|config| {
        config.timelock.overrides.insert(
            ADDR_UPDATE.into(),
            OperationOverride {
                period_secs: Some(ADDR_PERIOD),
                cancel_window: Some(CancelWindow::AfterRelease),
            },
        );
    });
    let id = fx.request();

    let err = fx
        .engine
        .cancel_by_timelock(id, fx.canceller.identity())
        .unwrap_err();
    assert!(matches!(err, EngineError::TimeLockNotExpired { .. }));

    fx.clock.advance(ADDR_PERIOD);
    let cancelled = fx
        .engine
        .cancel_by_timelock(id, fx.canceller.identity())
        .unwrap();
    assert_eq!(cancelled.status, TxStatus::Cancelled);
}

#[test]
fn cancel_window_can_change_at_runtime() {
    let mut fx = Fixture::new();
    fx.engine.set_cancel_window(fx.op, CancelWindow::AfterRelease);
    let id = fx.request();
    assert!(fx
        .engine
        .cancel_by_timelock(id, fx.canceller.identity())
        .is_err());
}

#[test]
fn approver_cannot_cancel() {
    let mut fx = Fixture::new();
    let id = fx.request();
    let err = fx
        .engine
        .cancel_by_timelock(id, fx.approver.identity())
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Unauthorized {
            action: Action::TimeDelayCancel,
            ..
        }
    ));
}

// ----- Terminal records -----------------------------------------------------

#[test]
fn terminal_records_reject_everything() {
    let mut fx = Fixture::new();
    let approved = fx.request();
    let cancelled = fx.request();
    fx.clock.advance(ADDR_PERIOD);
    fx.engine
        .approve_by_timelock(approved, fx.approver.identity())
        .unwrap();
    fx.engine
        .cancel_by_timelock(cancelled, fx.canceller.identity())
        .unwrap();

    for (id, status) in [(approved, TxStatus::Completed), (cancelled, TxStatus::Cancelled)] {
        let before = fx.engine.get_transaction(id).unwrap().clone();
        for err in [
            fx.engine
                .approve_by_timelock(id, fx.approver.identity())
                .unwrap_err(),
            fx.engine
                .cancel_by_timelock(id, fx.canceller.identity())
                .unwrap_err(),
        ] {
            assert_eq!(err, EngineError::NotPending { tx_id: id, status });
        }
        assert_eq!(fx.engine.get_transaction(id).unwrap(), &before);
    }
    assert_eq!(fx.dispatcher.calls().len(), 1);
}

#[test]
fn reverted_call_is_terminal_failure() {
    let mut fx = Fixture::new();
    fx.dispatcher.fail_target(target(), "boom");
    let id = fx.request();
    fx.clock.advance(ADDR_PERIOD);

    let failed = fx
        .engine
        .approve_by_timelock(id, fx.approver.identity())
        .unwrap();
    assert_eq!(failed.status, TxStatus::Failed);

    let err = fx
        .engine
        .approve_by_timelock(id, fx.approver.identity())
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::NotPending {
            tx_id: id,
            status: TxStatus::Failed
        }
    );
    let counts = fx.engine.status_counts();
    assert_eq!((counts.failed, counts.pending), (1, 0));
}

#[test]
fn unknown_record_is_not_found() {
    let mut fx = Fixture::new();
    assert_eq!(
        fx.engine
            .approve_by_timelock(TxId(99), fx.approver.identity())
            .unwrap_err(),
        EngineError::NotFound(TxId(99))
    );
    assert!(fx.engine.get_transaction(TxId::UNALLOCATED).is_err());
}

// ----- Request validation ---------------------------------------------------

#[test]
fn invalid_requests_leave_no_state() {
    let mut fx = Fixture::new();

    let mut unknown_op = fx.params();
    unknown_op.operation_type = OperationTypeId::from_name("NOPE");
    assert!(matches!(
        fx.engine.create(fx.request_handler, unknown_op).unwrap_err(),
        EngineError::InvalidOperationType(_)
    ));

    let err = fx
        .engine
        .create(Selector::from_signature("nothing()"), fx.params())
        .unwrap_err();
    assert_eq!(err, EngineError::UnknownFunction(Selector::from_signature("nothing()")));

    // The meta handler does not support TimeDelayRequest.
    let err = fx.engine.create(fx.meta_handler, fx.params()).unwrap_err();
    assert!(matches!(err, EngineError::UnsupportedAction { .. }));

    let mut zero_target = fx.params();
    zero_target.target = Identity::ZERO;
    assert!(matches!(
        fx.engine.create(fx.request_handler, zero_target).unwrap_err(),
        EngineError::InvalidExecutionPayload(_)
    ));

    let mut empty_raw = fx.params();
    empty_raw.execution = Execution::Raw { payload: vec![] };
    assert!(fx.engine.create(fx.request_handler, empty_raw).is_err());

    let mut value_without_call = fx.params();
    value_without_call.execution = Execution::None;
    value_without_call.value = 5;
    assert!(fx.engine.create(fx.request_handler, value_without_call).is_err());

    let mut engine_target = fx.params();
    engine_target.target = engine_identity();
    assert!(matches!(
        fx.engine.create(fx.request_handler, engine_target).unwrap_err(),
        EngineError::InvalidExecutionPayload(_)
    ));

    assert!(fx.engine.transactions().next().is_none());
    assert!(fx.events.events().is_empty());
    assert_eq!(fx.request(), TxId(1));
}

#[test]
fn handler_of_another_operation_type_is_rejected() {
    let mut fx = Fixture::new();
    let err = fx
        .engine
        .create(Selector::from_signature(TIMELOCK_UPDATE_REQUEST), fx.params())
        .unwrap_err();
    assert!(matches!(err, EngineError::HandlerMismatch { .. }));
}

#[test]
fn no_op_execution_completes_without_dispatch() {
    let mut fx = Fixture::new();
    let mut params = fx.params();
    params.execution = Execution::None;
    let id = fx.engine.create(fx.request_handler, params).unwrap();
    fx.clock.advance(ADDR_PERIOD);
    let done = fx
        .engine
        .approve_by_timelock(id, fx.approver.identity())
        .unwrap();
    assert_eq!(done.status, TxStatus::Completed);
    assert!(fx.dispatcher.calls().is_empty());
}

// ----- Payments -------------------------------------------------------------

fn payment() -> PaymentDetails {
    PaymentDetails {
        recipient: Identity::from_bytes([0x55; 32]),
        native_amount: 1_000,
        token: None,
        token_amount: 0,
    }
}

#[test]
fn payment_is_released_after_execution() {
    let mut fx = Fixture::new();
    let id = fx.request();
    fx.engine
        .attach_payment(id, fx.requester.identity(), payment())
        .unwrap();
    assert_eq!(
        fx.engine.get_transaction(id).unwrap().payment,
        Some(payment())
    );

    fx.clock.advance(ADDR_PERIOD);
    fx.engine
        .approve_by_timelock(id, fx.approver.identity())
        .unwrap();
    assert_eq!(fx.dispatcher.payments(), vec![(id, payment())]);
}

#[test]
fn failed_payment_fails_the_record() {
    let mut fx = Fixture::new();
    fx.dispatcher.fail_payments(true);
    let id = fx.request();
    fx.engine
        .attach_payment(id, fx.requester.identity(), payment())
        .unwrap();
    fx.clock.advance(ADDR_PERIOD);
    let record = fx
        .engine
        .approve_by_timelock(id, fx.approver.identity())
        .unwrap();
    assert_eq!(record.status, TxStatus::Failed);
}

#[test]
fn only_requester_attaches_payment() {
    let mut fx = Fixture::new();
    let id = fx.request();
    assert_eq!(
        fx.engine
            .attach_payment(id, fx.approver.identity(), payment())
            .unwrap_err(),
        EngineError::NotRequester {
            tx_id: id,
            caller: fx.approver.identity()
        }
    );

    let bad = PaymentDetails {
        token_amount: 7,
        ..payment()
    };
    assert!(matches!(
        fx.engine
            .attach_payment(id, fx.requester.identity(), bad)
            .unwrap_err(),
        EngineError::InvalidPayment(_)
    ));
    assert!(fx.engine.get_transaction(id).unwrap().payment.is_none());
}

// ----- Workflow catalog -----------------------------------------------------

#[test]
fn restricted_workflow_rejects_cancellation() {
    let mut fx = Fixture::new();
    let approve_only = fx
        .engine
        .register_named_operation_type(
            "APPROVE_ONLY",
            vec![WorkflowPath::new(
                "time-delay approve",
                vec![Action::TimeDelayRequest, Action::TimeDelayApprove],
            )],
        )
        .unwrap();
    let handler = fx
        .engine
        .register_function(bastion_engine::FunctionSchema::new(
            "restrictedRequest()",
            approve_only,
            [
                Action::TimeDelayRequest,
                Action::TimeDelayApprove,
                Action::TimeDelayCancel,
            ],
        ))
        .unwrap();
    let role = fx.engine.define_role("RESTRICTED", 1, false).unwrap();
    fx.engine.add_member(role, fx.owner.identity()).unwrap();
    fx.engine
        .grant(
            role,
            handler,
            &[
                Action::TimeDelayRequest,
                Action::TimeDelayApprove,
                Action::TimeDelayCancel,
            ],
        )
        .unwrap();

    let mut params = fx.params_for(fx.owner.identity());
    params.operation_type = approve_only;
    let id = fx.engine.create(handler, params).unwrap();

    let err = fx
        .engine
        .cancel_by_timelock(id, fx.owner.identity())
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::WorkflowViolation {
            action: Action::TimeDelayCancel,
            ..
        }
    ));
    fx.clock.advance(DEFAULT_PERIOD);
    assert!(fx
        .engine
        .approve_by_timelock(id, fx.owner.identity())
        .is_ok());
}

// ----- Self-governed time-lock updates --------------------------------------

#[test]
fn timelock_update_changes_period_on_completion() {
    let mut fx = Fixture::new();
    let owner = fx.owner.identity();
    assert_eq!(fx.engine.owner(), Some(owner));

    let id = fx
        .engine
        .request_timelock_update(owner, fx.op, 600)
        .unwrap();
    let record = fx.engine.get_transaction(id).unwrap();
    assert_eq!(record.params.target, engine_identity());
    let update_op = OperationTypeId::from_name(TIMELOCK_UPDATE);
    assert_eq!(record.operation_type(), update_op);
    assert_eq!(record.release_time, T0 + DEFAULT_PERIOD);
    assert_eq!(fx.engine.timelock_period(fx.op), ADDR_PERIOD);

    // Records created before the change keep their release time.
    let earlier = fx.request();

    fx.clock.advance(DEFAULT_PERIOD);
    let done = fx.engine.approve_by_timelock(id, owner).unwrap();
    assert_eq!(done.status, TxStatus::Completed);
    assert_eq!(done.result, ADDR_PERIOD.to_le_bytes().to_vec());
    assert_eq!(fx.engine.timelock_period(fx.op), 600);
    assert!(fx.dispatcher.calls().is_empty());

    assert_eq!(
        fx.engine.get_transaction(earlier).unwrap().release_time,
        T0 + ADDR_PERIOD
    );
    let later = fx.request();
    assert_eq!(
        fx.engine.get_transaction(later).unwrap().release_time,
        T0 + DEFAULT_PERIOD + 600
    );
}

#[test]
fn timelock_update_is_owner_only_and_rejects_zero() {
    let mut fx = Fixture::new();
    let err = fx
        .engine
        .request_timelock_update(fx.requester.identity(), fx.op, 600)
        .unwrap_err();
    assert!(matches!(err, EngineError::Unauthorized { .. }));

    let err = fx
        .engine
        .request_timelock_update(fx.owner.identity(), fx.op, 0)
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidExecutionPayload(_)));
    assert!(fx.engine.transactions().next().is_none());
}

#[test]
fn timelock_update_takes_no_payment() {
    let mut fx = Fixture::new();
    let owner = fx.owner.identity();
    fx.dispatcher.fail_payments(true);
    let id = fx
        .engine
        .request_timelock_update(owner, fx.op, 600)
        .unwrap();

    assert!(matches!(
        fx.engine.attach_payment(id, owner, payment()).unwrap_err(),
        EngineError::InvalidPayment(_)
    ));
    assert!(fx.engine.get_transaction(id).unwrap().payment.is_none());

    fx.clock.advance(DEFAULT_PERIOD);
    let done = fx.engine.approve_by_timelock(id, owner).unwrap();
    assert_eq!(done.status, TxStatus::Completed);
    assert_eq!(fx.engine.timelock_period(fx.op), 600);
}

#[test]
fn owner_role_is_protected() {
    let mut fx = Fixture::new();
    let owner_role = fx.engine.owner_role();
    let role = fx.engine.role(owner_role).unwrap();
    assert!(role.protected);
    assert_eq!(role.max_members, 1);

    assert!(matches!(
        fx.engine
            .add_member(owner_role, fx.outsider.identity())
            .unwrap_err(),
        EngineError::RoleFull { .. }
    ));
    assert_eq!(
        fx.engine
            .remove_member(owner_role, fx.owner.identity())
            .unwrap_err(),
        EngineError::ProtectedRole(owner_role)
    );

    fx.engine
        .replace_member(owner_role, fx.owner.identity(), fx.outsider.identity())
        .unwrap();
    assert_eq!(fx.engine.owner(), Some(fx.outsider.identity()));
    assert!(fx
        .engine
        .request_timelock_update(fx.outsider.identity(), fx.op, 120)
        .is_ok());
}
