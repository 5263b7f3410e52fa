//! Chit and membership state machines.

use chitfund_core::error::{ChitFundError, ChitFundResult};
use chitfund_core::models::chit::{Chit, ChitStatus, CreateChit, CreateChitRequest};
use chitfund_core::models::member::{CreateMember, Member, MemberStatus};
use chitfund_core::models::user::Identity;
use chitfund_core::month::YearMonth;
use chitfund_core::repository::{ChitRepository, MemberRepository, UserRepository};
use chitfund_core::validation;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use crate::error::LifecycleError;
use crate::schedule;

/// Chit lifecycle service.
///
/// Membership writes and activation run under one async mutex so that
/// the member-count check and the insert that follows it cannot
/// interleave with another invite in this process. The membership
/// record id and unique index reject duplicates across processes.
pub struct ChitService<C, M, U>
where
    C: ChitRepository,
    M: MemberRepository,
    U: UserRepository,
{
    chit_repo: C,
    member_repo: M,
    user_repo: U,
    membership_lock: Mutex<()>,
}

impl<C, M, U> ChitService<C, M, U>
where
    C: ChitRepository,
    M: MemberRepository,
    U: UserRepository,
{
    pub fn new(chit_repo: C, member_repo: M, user_repo: U) -> Self {
        Self {
            chit_repo,
            member_repo,
            user_repo,
            membership_lock: Mutex::new(()),
        }
    }

    /// Validate the request, derive the end month and store the chit
    /// as OPEN with the caller as moderator.
    pub async fn create_chit(
        &self,
        request: CreateChitRequest,
        moderator_id: Uuid,
    ) -> ChitFundResult<Chit> {
        validation::validate_chit_creation(
            &request.name,
            request.fund_amount,
            request.tenure,
            request.member_count,
            &request.start_month,
        )
        .into_result()?;

        let start_month: YearMonth = request.start_month.parse().map_err(LifecycleError::from)?;
        let end_month = schedule::calculate_end_month(start_month, request.tenure)?;

        let chit = self
            .chit_repo
            .create(CreateChit {
                name: request.name.trim().to_string(),
                fund_amount: request.fund_amount,
                tenure: request.tenure,
                member_count: request.member_count,
                start_month,
                end_month,
                payout_method: request.payout_method,
                moderator_id,
            })
            .await?;

        info!(chit_id = %chit.id, %moderator_id, %start_month, %end_month, "Chit created");
        Ok(chit)
    }

    pub async fn get_chit_by_id(&self, chit_id: Uuid) -> ChitFundResult<Chit> {
        load_chit(&self.chit_repo, chit_id).await
    }

    /// Chits the user moderates or has any membership in, whatever its
    /// status.
    pub async fn list_chits_for_user(&self, user_id: Uuid) -> ChitFundResult<Vec<Chit>> {
        self.chit_repo.list_for_user(user_id).await
    }

    pub async fn list_members(&self, chit_id: Uuid) -> ChitFundResult<Vec<Member>> {
        load_chit(&self.chit_repo, chit_id).await?;
        self.member_repo.list_for_chit(chit_id).await
    }

    /// Invite the user behind `identity` into an OPEN chit.
    ///
    /// Any existing membership blocks a second invite, including a
    /// REJECTED one.
    pub async fn invite_member(&self, chit_id: Uuid, identity: &Identity) -> ChitFundResult<Member> {
        let (email, mobile) = match identity {
            Identity::Email(email) => (Some(email.as_str()), None),
            Identity::Mobile(mobile) => (None, Some(mobile.as_str())),
        };
        validation::validate_member_invite(&chit_id.to_string(), email, mobile).into_result()?;

        let _guard = self.membership_lock.lock().await;

        // 1. Chit must exist and be OPEN.
        let chit = load_chit(&self.chit_repo, chit_id).await?;
        if chit.status != ChitStatus::Open {
            return Err(LifecycleError::ChitNotOpen.into());
        }

        // 2. Rejected memberships give up their seat.
        let count = self.member_repo.count_active_for_chit(chit_id).await?;
        if count >= u64::from(chit.member_count) {
            return Err(LifecycleError::MemberLimitReached.into());
        }

        // 3. Resolve the invitee.
        let lookup = match identity {
            Identity::Email(email) => self.user_repo.get_by_email(email).await,
            Identity::Mobile(mobile) => self.user_repo.get_by_mobile(mobile).await,
        };
        let user = lookup.map_err(|e| match e {
            ChitFundError::NotFound { .. } => {
                LifecycleError::UserNotFound(identity.key().to_string()).into()
            }
            other => other,
        })?;

        // 4. One membership per (chit, user).
        if self.member_repo.find(chit_id, user.id).await?.is_some() {
            return Err(LifecycleError::AlreadyInvited.into());
        }

        let member = self
            .member_repo
            .insert(CreateMember {
                chit_id,
                user_id: user.id,
                status: MemberStatus::Invited,
            })
            .await
            .map_err(|e| match e {
                ChitFundError::Conflict { .. } => LifecycleError::AlreadyInvited.into(),
                other => other,
            })?;

        info!(%chit_id, user_id = %user.id, "Member invited");
        Ok(member)
    }

    /// Accept an invitation: INVITED → JOINED.
    pub async fn join_chit(&self, chit_id: Uuid, user_id: Uuid) -> ChitFundResult<Member> {
        validation::validate_join(&chit_id.to_string()).into_result()?;

        let _guard = self.membership_lock.lock().await;

        let member = self
            .member_repo
            .find(chit_id, user_id)
            .await?
            .ok_or(LifecycleError::NoInvitationFound { chit_id, user_id })?;

        match member.status {
            MemberStatus::Invited => {}
            MemberStatus::Joined => return Err(LifecycleError::AlreadyJoined.into()),
            MemberStatus::Approved => return Err(LifecycleError::AlreadyApproved.into()),
            MemberStatus::Rejected => return Err(LifecycleError::InvitationRejected.into()),
        }

        let member = self
            .member_repo
            .update_status(chit_id, user_id, MemberStatus::Joined)
            .await?;
        info!(%chit_id, %user_id, "Member joined");
        Ok(member)
    }

    /// Moderator approval: JOINED → APPROVED.
    pub async fn approve_member(&self, chit_id: Uuid, user_id: Uuid) -> ChitFundResult<Member> {
        let _guard = self.membership_lock.lock().await;

        let member = self.load_member(chit_id, user_id).await?;
        match member.status {
            MemberStatus::Joined => {}
            MemberStatus::Invited => return Err(LifecycleError::NotJoined.into()),
            MemberStatus::Approved => return Err(LifecycleError::AlreadyApproved.into()),
            MemberStatus::Rejected => return Err(LifecycleError::InvitationRejected.into()),
        }

        let member = self
            .member_repo
            .update_status(chit_id, user_id, MemberStatus::Approved)
            .await?;
        info!(%chit_id, %user_id, "Member approved");
        Ok(member)
    }

    /// Decline a pending membership: INVITED | JOINED → REJECTED.
    pub async fn reject_member(&self, chit_id: Uuid, user_id: Uuid) -> ChitFundResult<Member> {
        let _guard = self.membership_lock.lock().await;

        let member = self.load_member(chit_id, user_id).await?;
        match member.status {
            MemberStatus::Invited | MemberStatus::Joined => {}
            MemberStatus::Approved => return Err(LifecycleError::AlreadyApproved.into()),
            MemberStatus::Rejected => return Err(LifecycleError::InvitationRejected.into()),
        }

        let member = self
            .member_repo
            .update_status(chit_id, user_id, MemberStatus::Rejected)
            .await?;
        info!(%chit_id, %user_id, "Member rejected");
        Ok(member)
    }

    /// OPEN → ACTIVE once every seat holds an approved member.
    pub async fn activate_chit(&self, chit_id: Uuid) -> ChitFundResult<Chit> {
        let _guard = self.membership_lock.lock().await;

        let chit = load_chit(&self.chit_repo, chit_id).await?;
        if chit.status != ChitStatus::Open {
            return Err(LifecycleError::ChitNotOpen.into());
        }

        let approved = self
            .member_repo
            .list_for_chit(chit_id)
            .await?
            .iter()
            .filter(|m| m.status == MemberStatus::Approved)
            .count();
        if approved != chit.member_count as usize {
            return Err(LifecycleError::InsufficientApprovedMembers.into());
        }

        let chit = self
            .chit_repo
            .update_status(chit_id, ChitStatus::Active)
            .await?;
        info!(%chit_id, approved, "Chit activated");
        Ok(chit)
    }

    /// Delete an OPEN or CLOSED chit together with everything scoped to
    /// it.
    pub async fn delete_chit(&self, chit_id: Uuid) -> ChitFundResult<()> {
        let _guard = self.membership_lock.lock().await;

        let chit = load_chit(&self.chit_repo, chit_id).await?;
        if chit.status == ChitStatus::Active {
            return Err(LifecycleError::ChitActive.into());
        }

        self.chit_repo.delete(chit_id).await?;
        info!(%chit_id, "Chit deleted");
        Ok(())
    }

    async fn load_member(&self, chit_id: Uuid, user_id: Uuid) -> ChitFundResult<Member> {
        self.member_repo
            .find(chit_id, user_id)
            .await?
            .ok_or_else(|| LifecycleError::MemberNotFound { chit_id, user_id }.into())
    }
}

/// Fetch a chit, reporting absence as [`LifecycleError::ChitNotFound`].
pub(crate) async fn load_chit<C: ChitRepository>(repo: &C, chit_id: Uuid) -> ChitFundResult<Chit> {
    repo.get_by_id(chit_id).await.map_err(|e| match e {
        ChitFundError::NotFound { .. } => LifecycleError::ChitNotFound(chit_id).into(),
        other => other,
    })
}
