//! Integration tests for payments, payouts, settlement and closing.

use chitfund_core::error::ChitFundError;
use chitfund_core::models::chit::{Chit, ChitStatus, CreateChitRequest, PayoutMethod};
use chitfund_core::models::payment::PaymentStatus;
use chitfund_core::models::payout::PayoutStatus;
use chitfund_core::models::user::{CreateUser, Identity};
use chitfund_core::month::YearMonth;
use chitfund_core::repository::{ChitRepository, PaymentRepository, UserRepository};
use chitfund_db::repository::{
    SurrealChitRepository, SurrealMemberRepository, SurrealPaymentRepository,
    SurrealPayoutRepository, SurrealUserRepository,
};
use chitfund_lifecycle::{ChitService, LedgerService};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

type Chits =
    ChitService<SurrealChitRepository<Db>, SurrealMemberRepository<Db>, SurrealUserRepository<Db>>;
type Ledger = LedgerService<
    SurrealChitRepository<Db>,
    SurrealMemberRepository<Db>,
    SurrealPaymentRepository<Db>,
    SurrealPayoutRepository<Db>,
>;

struct Fixture {
    chit_repo: SurrealChitRepository<Db>,
    payment_repo: SurrealPaymentRepository<Db>,
    chits: Chits,
    ledger: Ledger,
    chit: Chit,
    members: Vec<Uuid>,
}

fn month(s: &str) -> YearMonth {
    s.parse().unwrap()
}

/// An ACTIVE 10-member, 12-month chit starting 2024-01.
async fn active_chit(payout_method: PayoutMethod) -> Fixture {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    chitfund_db::run_migrations(&db).await.unwrap();

    let users = SurrealUserRepository::new(db.clone());
    let chits = ChitService::new(
        SurrealChitRepository::new(db.clone()),
        SurrealMemberRepository::new(db.clone()),
        users.clone(),
    );
    let ledger = LedgerService::new(
        SurrealChitRepository::new(db.clone()),
        SurrealMemberRepository::new(db.clone()),
        SurrealPaymentRepository::new(db.clone()),
        SurrealPayoutRepository::new(db.clone()),
    );

    let chit = chits
        .create_chit(
            CreateChitRequest {
                name: "Family Chit".into(),
                fund_amount: 100_000_000_000,
                tenure: 12,
                member_count: 10,
                start_month: "2024-01".into(),
                payout_method,
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();

    let mut members = Vec::new();
    for i in 0..10 {
        let email = format!("member{i}@example.com");
        let user = users
            .create(CreateUser {
                email: Some(email.clone()),
                mobile: None,
                name: format!("member{i}"),
                is_email_verified: true,
                is_mobile_verified: false,
            })
            .await
            .unwrap();
        chits
            .invite_member(chit.id, &Identity::email(&email))
            .await
            .unwrap();
        chits.join_chit(chit.id, user.id).await.unwrap();
        chits.approve_member(chit.id, user.id).await.unwrap();
        members.push(user.id);
    }
    let chit = chits.activate_chit(chit.id).await.unwrap();

    Fixture {
        chit_repo: SurrealChitRepository::new(db.clone()),
        payment_repo: SurrealPaymentRepository::new(db),
        chits,
        ledger,
        chit,
        members,
    }
}

fn conflict_reason(err: ChitFundError) -> String {
    match err {
        ChitFundError::Conflict { reason } => reason,
        other => panic!("expected conflict, got {other:?}"),
    }
}

#[tokio::test]
async fn payment_defaults_to_monthly_contribution() {
    let f = active_chit(PayoutMethod::Random).await;

    let payment = f
        .ledger
        .record_payment(f.chit.id, f.members[0], month("2024-01"), None)
        .await
        .unwrap();
    // 1 lakh fund over 10 members and 12 months, rounded down.
    assert_eq!(payment.amount, 100_000_000_000 / 120);
    assert_eq!(payment.status, PaymentStatus::Pending);

    let err = f
        .ledger
        .record_payment(f.chit.id, f.members[0], month("2024-01"), None)
        .await
        .unwrap_err();
    assert_eq!(conflict_reason(err), "payment already recorded");
}

#[tokio::test]
async fn payment_outside_term_or_by_stranger_is_rejected() {
    let f = active_chit(PayoutMethod::Random).await;

    let err = f
        .ledger
        .record_payment(f.chit.id, f.members[0], month("2025-01"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, ChitFundError::Conflict { .. }));

    let err = f
        .ledger
        .record_payment(f.chit.id, Uuid::new_v4(), month("2024-01"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, ChitFundError::NotFound { .. }));

    let err = f
        .ledger
        .record_payment(f.chit.id, f.members[0], month("2024-01"), Some(0))
        .await
        .unwrap_err();
    assert!(matches!(err, ChitFundError::Validation { .. }));
}

#[tokio::test]
async fn payment_status_transitions() {
    let f = active_chit(PayoutMethod::Random).await;
    let payment = f
        .ledger
        .record_payment(f.chit.id, f.members[1], month("2024-02"), None)
        .await
        .unwrap();

    let overdue = f.ledger.mark_payment_overdue(payment.id).await.unwrap();
    assert_eq!(overdue.status, PaymentStatus::Overdue);

    let err = f.ledger.mark_payment_overdue(payment.id).await.unwrap_err();
    assert!(matches!(err, ChitFundError::Conflict { .. }));

    let paid = f.ledger.mark_payment_paid(payment.id).await.unwrap();
    assert_eq!(paid.status, PaymentStatus::Paid);
    assert!(paid.paid_at.is_some());

    let err = f.ledger.mark_payment_paid(payment.id).await.unwrap_err();
    assert!(matches!(err, ChitFundError::Conflict { .. }));
}

#[tokio::test]
async fn payout_is_one_per_month() {
    let f = active_chit(PayoutMethod::Voting).await;

    let payout = f
        .ledger
        .schedule_payout(f.chit.id, month("2024-01"), f.members[2], None)
        .await
        .unwrap();
    assert_eq!(payout.amount, f.chit.fund_amount);
    assert_eq!(payout.status, PayoutStatus::Pending);

    let err = f
        .ledger
        .schedule_payout(f.chit.id, month("2024-01"), f.members[3], None)
        .await
        .unwrap_err();
    assert_eq!(conflict_reason(err), "payout already scheduled");

    let paid = f.ledger.mark_payout_paid(payout.id).await.unwrap();
    assert_eq!(paid.status, PayoutStatus::Paid);
    assert!(f.ledger.mark_payout_paid(payout.id).await.is_err());
}

#[tokio::test]
async fn voting_chit_cannot_draw() {
    let f = active_chit(PayoutMethod::Voting).await;
    let err = f
        .ledger
        .draw_payout_recipient(f.chit.id, month("2024-01"))
        .await
        .unwrap_err();
    assert_eq!(conflict_reason(err), "payout method requires a vote");
}

#[tokio::test]
async fn random_draw_gives_every_member_one_payout_first() {
    let f = active_chit(PayoutMethod::Random).await;

    let mut recipients = Vec::new();
    for m in month("2024-01").through(month("2024-10")) {
        let payout = f.ledger.draw_payout_recipient(f.chit.id, m).await.unwrap();
        assert!(f.members.contains(&payout.recipient_id));
        recipients.push(payout.recipient_id);
    }

    recipients.sort();
    recipients.dedup();
    assert_eq!(recipients.len(), 10, "each member drawn exactly once");
}

#[tokio::test]
async fn close_requires_term_end_and_full_settlement() {
    let f = active_chit(PayoutMethod::Random).await;

    let err = f
        .ledger
        .close_chit_as_of(f.chit.id, month("2024-12"))
        .await
        .unwrap_err();
    assert_eq!(conflict_reason(err), "chit term not ended");

    let err = f
        .ledger
        .close_chit_as_of(f.chit.id, month("2025-01"))
        .await
        .unwrap_err();
    assert_eq!(conflict_reason(err), "chit not settled");

    for m in f.chit.start_month.through(f.chit.end_month) {
        for member in &f.members {
            let payment = f
                .ledger
                .record_payment(f.chit.id, *member, m, None)
                .await
                .unwrap();
            f.ledger.mark_payment_paid(payment.id).await.unwrap();
        }
        let payout = f.ledger.draw_payout_recipient(f.chit.id, m).await.unwrap();
        f.ledger.mark_payout_paid(payout.id).await.unwrap();
    }

    let summary = f.ledger.settlement(f.chit.id).await.unwrap();
    assert_eq!(summary.months.len(), 12);
    assert!(summary.is_settled());

    let closed = f
        .ledger
        .close_chit_as_of(f.chit.id, month("2025-01"))
        .await
        .unwrap();
    assert_eq!(closed.status, ChitStatus::Closed);

    let err = f
        .ledger
        .record_payment(f.chit.id, f.members[0], month("2024-01"), None)
        .await
        .unwrap_err();
    assert_eq!(conflict_reason(err), "chit not active");

    f.chits.delete_chit(f.chit.id).await.unwrap();
}

#[tokio::test]
async fn active_chit_cannot_be_deleted() {
    let f = active_chit(PayoutMethod::Random).await;
    let err = f.chits.delete_chit(f.chit.id).await.unwrap_err();
    assert_eq!(conflict_reason(err), "chit is active");
}

#[tokio::test]
async fn settlement_reports_partial_months() {
    let f = active_chit(PayoutMethod::Random).await;
    let payment = f
        .ledger
        .record_payment(f.chit.id, f.members[0], month("2024-03"), None)
        .await
        .unwrap();
    f.ledger.mark_payment_paid(payment.id).await.unwrap();

    let summary = f.ledger.settlement(f.chit.id).await.unwrap();
    let march = summary
        .months
        .iter()
        .find(|m| m.month == month("2024-03"))
        .unwrap();
    assert_eq!(march.expected_payments, 10);
    assert_eq!(march.paid_payments, 1);
    assert_eq!(march.payout, None);
    assert_eq!(summary.unsettled_months().count(), 12);
}

#[tokio::test]
async fn ledger_of_a_closed_chit_is_frozen() {
    let f = active_chit(PayoutMethod::Random).await;
    let payment = f
        .ledger
        .record_payment(f.chit.id, f.members[0], month("2024-01"), None)
        .await
        .unwrap();
    let payout = f
        .ledger
        .schedule_payout(f.chit.id, month("2024-01"), f.members[1], None)
        .await
        .unwrap();

    f.chit_repo
        .update_status(f.chit.id, ChitStatus::Closed)
        .await
        .unwrap();

    let err = f.ledger.mark_payment_paid(payment.id).await.unwrap_err();
    assert_eq!(conflict_reason(err), "chit not active");
    let err = f.ledger.mark_payment_overdue(payment.id).await.unwrap_err();
    assert_eq!(conflict_reason(err), "chit not active");
    let err = f.ledger.mark_payout_paid(payout.id).await.unwrap_err();
    assert_eq!(conflict_reason(err), "chit not active");

    let summary = f.ledger.settlement(f.chit.id).await.unwrap();
    let january = &summary.months[0];
    assert_eq!(january.paid_payments, 0);
    assert_eq!(january.payout, Some(PayoutStatus::Pending));
    let stored = f.payment_repo.get_by_id(payment.id).await.unwrap();
    assert_eq!(stored.status, PaymentStatus::Pending);
}
