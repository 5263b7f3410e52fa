//! Integration tests for chit creation and the membership state machine
//! against in-memory SurrealDB.

use chitfund_core::error::ChitFundError;
use chitfund_core::models::chit::{ChitStatus, CreateChitRequest, PayoutMethod};
use chitfund_core::models::member::MemberStatus;
use chitfund_core::models::user::{CreateUser, Identity, User};
use chitfund_core::repository::UserRepository;
use chitfund_db::repository::{
    SurrealChitRepository, SurrealMemberRepository, SurrealUserRepository,
};
use chitfund_lifecycle::ChitService;
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

type Service =
    ChitService<SurrealChitRepository<Db>, SurrealMemberRepository<Db>, SurrealUserRepository<Db>>;

async fn setup() -> (Service, SurrealUserRepository<Db>) {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    chitfund_db::run_migrations(&db).await.unwrap();

    let users = SurrealUserRepository::new(db.clone());
    let service = ChitService::new(
        SurrealChitRepository::new(db.clone()),
        SurrealMemberRepository::new(db),
        users.clone(),
    );
    (service, users)
}

async fn user(users: &SurrealUserRepository<Db>, email: &str) -> User {
    users
        .create(CreateUser {
            email: Some(email.into()),
            mobile: None,
            name: email.into(),
            is_email_verified: true,
            is_mobile_verified: false,
        })
        .await
        .unwrap()
}

fn request(member_count: u32) -> CreateChitRequest {
    CreateChitRequest {
        name: "Office Chit".into(),
        fund_amount: 100_000_000_000,
        tenure: 12,
        member_count,
        start_month: "2024-01".into(),
        payout_method: PayoutMethod::Random,
    }
}

fn conflict_reason(err: ChitFundError) -> String {
    match err {
        ChitFundError::Conflict { reason } => reason,
        other => panic!("expected conflict, got {other:?}"),
    }
}

#[tokio::test]
async fn create_chit_derives_end_month() {
    let (service, _) = setup().await;
    let moderator = Uuid::new_v4();

    let chit = service.create_chit(request(10), moderator).await.unwrap();
    assert_eq!(chit.status, ChitStatus::Open);
    assert_eq!(chit.end_month.to_string(), "2024-12");
    assert_eq!(chit.moderator_id, moderator);

    let fetched = service.get_chit_by_id(chit.id).await.unwrap();
    assert_eq!(fetched, chit);
}

#[tokio::test]
async fn create_chit_rejects_invalid_requests() {
    let (service, _) = setup().await;

    let err = service
        .create_chit(request(13), Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ChitFundError::Validation { ref message } if message == "Member count must be in multiples of 5"
    ));

    let bad_month = CreateChitRequest {
        start_month: "2024-13".into(),
        ..request(10)
    };
    let err = service.create_chit(bad_month, Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, ChitFundError::Validation { .. }));
}

#[tokio::test]
async fn missing_chit_is_not_found() {
    let (service, _) = setup().await;
    let err = service.get_chit_by_id(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, ChitFundError::NotFound { ref entity, .. } if entity == "chit"));
}

#[tokio::test]
async fn invite_join_approve_flow() {
    let (service, users) = setup().await;
    let chit = service.create_chit(request(10), Uuid::new_v4()).await.unwrap();
    let ravi = user(&users, "ravi@example.com").await;

    let invited = service
        .invite_member(chit.id, &Identity::email("ravi@example.com"))
        .await
        .unwrap();
    assert_eq!(invited.status, MemberStatus::Invited);
    assert_eq!(invited.user_id, ravi.id);

    let joined = service.join_chit(chit.id, ravi.id).await.unwrap();
    assert_eq!(joined.status, MemberStatus::Joined);

    let err = service.join_chit(chit.id, ravi.id).await.unwrap_err();
    assert_eq!(conflict_reason(err), "already joined");

    let approved = service.approve_member(chit.id, ravi.id).await.unwrap();
    assert_eq!(approved.status, MemberStatus::Approved);

    let err = service.join_chit(chit.id, ravi.id).await.unwrap_err();
    assert_eq!(conflict_reason(err), "already approved");
}

#[tokio::test]
async fn invite_by_mobile_normalizes_identity() {
    let (service, users) = setup().await;
    let chit = service.create_chit(request(10), Uuid::new_v4()).await.unwrap();
    let member = users
        .create(CreateUser {
            email: None,
            mobile: Some("9876543210".into()),
            name: "User".into(),
            is_email_verified: false,
            is_mobile_verified: true,
        })
        .await
        .unwrap();

    let invited = service
        .invite_member(chit.id, &Identity::mobile("+91 98765-43210"))
        .await
        .unwrap();
    assert_eq!(invited.user_id, member.id);
}

#[tokio::test]
async fn invite_into_active_chit_is_chit_not_open() {
    let (service, users) = setup().await;
    let chit = service.create_chit(request(10), Uuid::new_v4()).await.unwrap();

    for i in 0..10 {
        let email = format!("member{i}@example.com");
        let u = user(&users, &email).await;
        service
            .invite_member(chit.id, &Identity::email(&email))
            .await
            .unwrap();
        service.join_chit(chit.id, u.id).await.unwrap();
        service.approve_member(chit.id, u.id).await.unwrap();
    }
    let active = service.activate_chit(chit.id).await.unwrap();
    assert_eq!(active.status, ChitStatus::Active);

    user(&users, "late@example.com").await;
    let err = service
        .invite_member(chit.id, &Identity::email("late@example.com"))
        .await
        .unwrap_err();
    assert_eq!(conflict_reason(err), "chit not open");
}

#[tokio::test]
async fn double_invite_is_already_invited() {
    let (service, users) = setup().await;
    let chit = service.create_chit(request(10), Uuid::new_v4()).await.unwrap();
    user(&users, "ravi@example.com").await;
    let identity = Identity::email("ravi@example.com");

    service.invite_member(chit.id, &identity).await.unwrap();
    let err = service.invite_member(chit.id, &identity).await.unwrap_err();
    assert_eq!(conflict_reason(err), "already invited");
}

#[tokio::test]
async fn rejected_member_cannot_be_reinvited_or_join() {
    let (service, users) = setup().await;
    let chit = service.create_chit(request(10), Uuid::new_v4()).await.unwrap();
    let ravi = user(&users, "ravi@example.com").await;
    let identity = Identity::email("ravi@example.com");

    service.invite_member(chit.id, &identity).await.unwrap();
    service.reject_member(chit.id, ravi.id).await.unwrap();

    let err = service.join_chit(chit.id, ravi.id).await.unwrap_err();
    assert_eq!(conflict_reason(err), "invitation rejected");

    let members = service.list_members(chit.id).await.unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].status, MemberStatus::Rejected);

    let err = service.invite_member(chit.id, &identity).await.unwrap_err();
    assert_eq!(conflict_reason(err), "already invited");
}

#[tokio::test]
async fn invite_unknown_user_is_not_found() {
    let (service, _) = setup().await;
    let chit = service.create_chit(request(10), Uuid::new_v4()).await.unwrap();

    let err = service
        .invite_member(chit.id, &Identity::email("nobody@example.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, ChitFundError::NotFound { ref entity, .. } if entity == "user"));

    let err = service
        .invite_member(Uuid::new_v4(), &Identity::email("nobody@example.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, ChitFundError::NotFound { ref entity, .. } if entity == "chit"));
}

#[tokio::test]
async fn member_limit_counts_seated_members() {
    let (service, users) = setup().await;
    let chit = service.create_chit(request(10), Uuid::new_v4()).await.unwrap();

    for i in 0..10 {
        let email = format!("member{i}@example.com");
        user(&users, &email).await;
        service
            .invite_member(chit.id, &Identity::email(&email))
            .await
            .unwrap();
    }

    user(&users, "eleventh@example.com").await;
    let err = service
        .invite_member(chit.id, &Identity::email("eleventh@example.com"))
        .await
        .unwrap_err();
    assert_eq!(conflict_reason(err), "member limit reached");
}

#[tokio::test]
async fn rejected_seat_can_be_refilled_and_chit_activated() {
    let (service, users) = setup().await;
    let chit = service.create_chit(request(10), Uuid::new_v4()).await.unwrap();

    let mut invited = Vec::new();
    for i in 0..10 {
        let email = format!("member{i}@example.com");
        invited.push(user(&users, &email).await);
        service
            .invite_member(chit.id, &Identity::email(&email))
            .await
            .unwrap();
    }

    let rejected = invited.remove(0);
    service.reject_member(chit.id, rejected.id).await.unwrap();

    // The rejected user still cannot come back.
    let err = service
        .invite_member(chit.id, &Identity::email("member0@example.com"))
        .await
        .unwrap_err();
    assert_eq!(conflict_reason(err), "already invited");

    invited.push(user(&users, "replacement@example.com").await);
    service
        .invite_member(chit.id, &Identity::email("replacement@example.com"))
        .await
        .unwrap();

    // The roster is full again.
    user(&users, "extra@example.com").await;
    let err = service
        .invite_member(chit.id, &Identity::email("extra@example.com"))
        .await
        .unwrap_err();
    assert_eq!(conflict_reason(err), "member limit reached");

    for member in &invited {
        service.join_chit(chit.id, member.id).await.unwrap();
        service.approve_member(chit.id, member.id).await.unwrap();
    }

    let active = service.activate_chit(chit.id).await.unwrap();
    assert_eq!(active.status, ChitStatus::Active);
}

#[tokio::test]
async fn join_without_invitation_is_not_found() {
    let (service, _) = setup().await;
    let chit = service.create_chit(request(10), Uuid::new_v4()).await.unwrap();

    let err = service.join_chit(chit.id, Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, ChitFundError::NotFound { .. }));
}

#[tokio::test]
async fn approve_requires_join() {
    let (service, users) = setup().await;
    let chit = service.create_chit(request(10), Uuid::new_v4()).await.unwrap();
    let ravi = user(&users, "ravi@example.com").await;
    service
        .invite_member(chit.id, &Identity::email("ravi@example.com"))
        .await
        .unwrap();

    let err = service.approve_member(chit.id, ravi.id).await.unwrap_err();
    assert_eq!(conflict_reason(err), "member has not joined");
}

#[tokio::test]
async fn activation_requires_full_approved_roster() {
    let (service, users) = setup().await;
    let chit = service.create_chit(request(10), Uuid::new_v4()).await.unwrap();
    let ravi = user(&users, "ravi@example.com").await;
    service
        .invite_member(chit.id, &Identity::email("ravi@example.com"))
        .await
        .unwrap();
    service.join_chit(chit.id, ravi.id).await.unwrap();
    service.approve_member(chit.id, ravi.id).await.unwrap();

    let err = service.activate_chit(chit.id).await.unwrap_err();
    assert_eq!(conflict_reason(err), "insufficient approved members");
    assert_eq!(
        service.get_chit_by_id(chit.id).await.unwrap().status,
        ChitStatus::Open
    );
}

#[tokio::test]
async fn listing_includes_moderated_and_invited_chits() {
    let (service, users) = setup().await;
    let ravi = user(&users, "ravi@example.com").await;

    let own = service.create_chit(request(10), ravi.id).await.unwrap();
    let other = service.create_chit(request(10), Uuid::new_v4()).await.unwrap();
    service.create_chit(request(10), Uuid::new_v4()).await.unwrap();
    service
        .invite_member(other.id, &Identity::email("ravi@example.com"))
        .await
        .unwrap();

    let mut ids: Vec<Uuid> = service
        .list_chits_for_user(ravi.id)
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.id)
        .collect();
    ids.sort();
    let mut expected = vec![own.id, other.id];
    expected.sort();
    assert_eq!(ids, expected);
}

#[tokio::test]
async fn delete_open_chit_removes_memberships() {
    let (service, users) = setup().await;
    let chit = service.create_chit(request(10), Uuid::new_v4()).await.unwrap();
    let ravi = user(&users, "ravi@example.com").await;
    service
        .invite_member(chit.id, &Identity::email("ravi@example.com"))
        .await
        .unwrap();

    service.delete_chit(chit.id).await.unwrap();

    assert!(service.get_chit_by_id(chit.id).await.is_err());
    assert!(service.list_chits_for_user(ravi.id).await.unwrap().is_empty());
}
