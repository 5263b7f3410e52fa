//! Payments, payouts, settlement and closing of ACTIVE chits.

use std::collections::HashMap;

use chitfund_core::error::ChitFundResult;
use chitfund_core::models::Paisa;
use chitfund_core::models::chit::{Chit, ChitStatus, PayoutMethod};
use chitfund_core::models::member::MemberStatus;
use chitfund_core::models::payment::{CreatePayment, Payment, PaymentStatus};
use chitfund_core::models::payout::{CreatePayout, Payout, PayoutStatus};
use chitfund_core::month::YearMonth;
use chitfund_core::repository::{
    ChitRepository, MemberRepository, PaymentRepository, PayoutRepository,
};
use rand::seq::IndexedRandom;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use crate::error::LifecycleError;
use crate::schedule;
use crate::service::load_chit;

/// Collection and payout state of one month of a chit's term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthSettlement {
    pub month: YearMonth,
    /// Approved members, each of whom owes one payment.
    pub expected_payments: u32,
    pub paid_payments: u32,
    pub payout: Option<PayoutStatus>,
}

impl MonthSettlement {
    pub fn is_settled(&self) -> bool {
        self.paid_payments >= self.expected_payments && self.payout == Some(PayoutStatus::Paid)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettlementSummary {
    pub chit_id: Uuid,
    pub months: Vec<MonthSettlement>,
}

impl SettlementSummary {
    pub fn is_settled(&self) -> bool {
        self.months.iter().all(MonthSettlement::is_settled)
    }

    pub fn unsettled_months(&self) -> impl Iterator<Item = YearMonth> + '_ {
        self.months
            .iter()
            .filter(|m| !m.is_settled())
            .map(|m| m.month)
    }
}

/// Ledger service.
///
/// Check-then-insert sequences for payments and payouts run under one
/// async mutex; the unique indexes on `(chit, member, month)` and
/// `(chit, month)` back this up across processes.
pub struct LedgerService<C, M, P, O>
where
    C: ChitRepository,
    M: MemberRepository,
    P: PaymentRepository,
    O: PayoutRepository,
{
    chit_repo: C,
    member_repo: M,
    payment_repo: P,
    payout_repo: O,
    write_lock: Mutex<()>,
}

impl<C, M, P, O> LedgerService<C, M, P, O>
where
    C: ChitRepository,
    M: MemberRepository,
    P: PaymentRepository,
    O: PayoutRepository,
{
    pub fn new(chit_repo: C, member_repo: M, payment_repo: P, payout_repo: O) -> Self {
        Self {
            chit_repo,
            member_repo,
            payment_repo,
            payout_repo,
            write_lock: Mutex::new(()),
        }
    }

    /// Record a member's installment for a month as PENDING. The amount
    /// defaults to the chit's monthly contribution.
    pub async fn record_payment(
        &self,
        chit_id: Uuid,
        member_id: Uuid,
        month: YearMonth,
        amount: Option<Paisa>,
    ) -> ChitFundResult<Payment> {
        let chit = self.active_chit_covering(chit_id, month).await?;
        self.ensure_approved(chit_id, member_id).await?;

        let amount = match amount {
            Some(amount) => amount,
            None => schedule::monthly_contribution(chit.fund_amount, chit.member_count, chit.tenure)?,
        };
        if amount <= 0 {
            return Err(LifecycleError::NonPositiveAmount.into());
        }

        let _guard = self.write_lock.lock().await;
        if self
            .payment_repo
            .find(chit_id, member_id, month)
            .await?
            .is_some()
        {
            return Err(LifecycleError::PaymentAlreadyRecorded.into());
        }

        let payment = self
            .payment_repo
            .create(CreatePayment {
                chit_id,
                member_id,
                amount,
                month,
            })
            .await?;
        info!(%chit_id, %member_id, %month, amount, "Payment recorded");
        Ok(payment)
    }

    /// PENDING | OVERDUE → PAID.
    pub async fn mark_payment_paid(&self, payment_id: Uuid) -> ChitFundResult<Payment> {
        let payment = self.payment_repo.get_by_id(payment_id).await?;
        self.active_chit(payment.chit_id).await?;
        if payment.status == PaymentStatus::Paid {
            return Err(transition(payment.status.as_str(), PaymentStatus::Paid.as_str()).into());
        }

        let payment = self
            .payment_repo
            .update_status(payment_id, PaymentStatus::Paid)
            .await?;
        info!(%payment_id, chit_id = %payment.chit_id, "Payment marked paid");
        Ok(payment)
    }

    /// PENDING → OVERDUE.
    pub async fn mark_payment_overdue(&self, payment_id: Uuid) -> ChitFundResult<Payment> {
        let payment = self.payment_repo.get_by_id(payment_id).await?;
        self.active_chit(payment.chit_id).await?;
        if payment.status != PaymentStatus::Pending {
            return Err(transition(payment.status.as_str(), PaymentStatus::Overdue.as_str()).into());
        }

        let payment = self
            .payment_repo
            .update_status(payment_id, PaymentStatus::Overdue)
            .await?;
        info!(%payment_id, chit_id = %payment.chit_id, "Payment marked overdue");
        Ok(payment)
    }

    /// Schedule the month's payout to an approved member as PENDING.
    /// The amount defaults to the full fund.
    pub async fn schedule_payout(
        &self,
        chit_id: Uuid,
        month: YearMonth,
        recipient_id: Uuid,
        amount: Option<Paisa>,
    ) -> ChitFundResult<Payout> {
        let chit = self.active_chit_covering(chit_id, month).await?;
        self.ensure_approved(chit_id, recipient_id).await?;
        self.insert_payout(&chit, month, recipient_id, amount).await
    }

    /// Pick the month's recipient at random among approved members with
    /// the fewest payouts so far, and schedule the payout.
    pub async fn draw_payout_recipient(
        &self,
        chit_id: Uuid,
        month: YearMonth,
    ) -> ChitFundResult<Payout> {
        let chit = self.active_chit_covering(chit_id, month).await?;
        if chit.payout_method == PayoutMethod::Voting {
            return Err(LifecycleError::VoteRequired.into());
        }

        let approved: Vec<Uuid> = self
            .member_repo
            .list_for_chit(chit_id)
            .await?
            .into_iter()
            .filter(|m| m.status == MemberStatus::Approved)
            .map(|m| m.user_id)
            .collect();

        let mut received: HashMap<Uuid, usize> = approved.iter().map(|id| (*id, 0)).collect();
        for payout in self.payout_repo.list_for_chit(chit_id).await? {
            if let Some(count) = received.get_mut(&payout.recipient_id) {
                *count += 1;
            }
        }

        let fewest = received
            .values()
            .copied()
            .min()
            .ok_or(LifecycleError::NoEligibleRecipient)?;
        let candidates: Vec<Uuid> = approved
            .into_iter()
            .filter(|id| received.get(id) == Some(&fewest))
            .collect();
        let recipient_id = *candidates
            .choose(&mut rand::rng())
            .ok_or(LifecycleError::NoEligibleRecipient)?;

        self.insert_payout(&chit, month, recipient_id, None).await
    }

    /// PENDING → PAID.
    pub async fn mark_payout_paid(&self, payout_id: Uuid) -> ChitFundResult<Payout> {
        let payout = self.payout_repo.get_by_id(payout_id).await?;
        self.active_chit(payout.chit_id).await?;
        if payout.status != PayoutStatus::Pending {
            return Err(transition(payout.status.as_str(), PayoutStatus::Paid.as_str()).into());
        }

        let payout = self
            .payout_repo
            .update_status(payout_id, PayoutStatus::Paid)
            .await?;
        info!(%payout_id, chit_id = %payout.chit_id, "Payout marked paid");
        Ok(payout)
    }

    /// Per-month collection and payout state over the whole term.
    pub async fn settlement(&self, chit_id: Uuid) -> ChitFundResult<SettlementSummary> {
        let chit = load_chit(&self.chit_repo, chit_id).await?;
        self.summarize(&chit).await
    }

    /// Close the chit if its term has ended by the current month.
    pub async fn close_chit(&self, chit_id: Uuid) -> ChitFundResult<Chit> {
        self.close_chit_as_of(chit_id, YearMonth::current()).await
    }

    /// ACTIVE → CLOSED once `current_month` is past the end month and
    /// every month of the term is settled.
    pub async fn close_chit_as_of(
        &self,
        chit_id: Uuid,
        current_month: YearMonth,
    ) -> ChitFundResult<Chit> {
        let chit = load_chit(&self.chit_repo, chit_id).await?;
        if chit.status != ChitStatus::Active {
            return Err(LifecycleError::ChitNotActive.into());
        }
        if current_month <= chit.end_month {
            return Err(LifecycleError::TermNotEnded.into());
        }
        if !self.summarize(&chit).await?.is_settled() {
            return Err(LifecycleError::NotSettled.into());
        }

        let chit = self
            .chit_repo
            .update_status(chit_id, ChitStatus::Closed)
            .await?;
        info!(%chit_id, "Chit closed");
        Ok(chit)
    }

    async fn summarize(&self, chit: &Chit) -> ChitFundResult<SettlementSummary> {
        let approved: Vec<Uuid> = self
            .member_repo
            .list_for_chit(chit.id)
            .await?
            .into_iter()
            .filter(|m| m.status == MemberStatus::Approved)
            .map(|m| m.user_id)
            .collect();

        let mut paid: HashMap<YearMonth, u32> = HashMap::new();
        for payment in self.payment_repo.list_for_chit(chit.id).await? {
            if payment.status == PaymentStatus::Paid && approved.contains(&payment.member_id) {
                *paid.entry(payment.month).or_default() += 1;
            }
        }

        let payouts: HashMap<YearMonth, PayoutStatus> = self
            .payout_repo
            .list_for_chit(chit.id)
            .await?
            .into_iter()
            .map(|p| (p.month, p.status))
            .collect();

        let expected = approved.len() as u32;
        let months = chit
            .start_month
            .through(chit.end_month)
            .map(|month| MonthSettlement {
                month,
                expected_payments: expected,
                paid_payments: paid.get(&month).copied().unwrap_or(0),
                payout: payouts.get(&month).copied(),
            })
            .collect();

        Ok(SettlementSummary {
            chit_id: chit.id,
            months,
        })
    }

    async fn insert_payout(
        &self,
        chit: &Chit,
        month: YearMonth,
        recipient_id: Uuid,
        amount: Option<Paisa>,
    ) -> ChitFundResult<Payout> {
        let amount = amount.unwrap_or(chit.fund_amount);
        if amount <= 0 {
            return Err(LifecycleError::NonPositiveAmount.into());
        }

        let _guard = self.write_lock.lock().await;
        if self
            .payout_repo
            .find_by_month(chit.id, month)
            .await?
            .is_some()
        {
            return Err(LifecycleError::PayoutAlreadyScheduled.into());
        }

        let payout = self
            .payout_repo
            .create(CreatePayout {
                chit_id: chit.id,
                recipient_id,
                amount,
                month,
            })
            .await?;
        info!(chit_id = %chit.id, %recipient_id, %month, amount, "Payout scheduled");
        Ok(payout)
    }

    /// Ledger entries only change while their chit is ACTIVE.
    async fn active_chit(&self, chit_id: Uuid) -> ChitFundResult<Chit> {
        let chit = load_chit(&self.chit_repo, chit_id).await?;
        if chit.status != ChitStatus::Active {
            return Err(LifecycleError::ChitNotActive.into());
        }
        Ok(chit)
    }

    async fn active_chit_covering(&self, chit_id: Uuid, month: YearMonth) -> ChitFundResult<Chit> {
        let chit = self.active_chit(chit_id).await?;
        if !chit.covers(month) {
            return Err(LifecycleError::MonthOutsideTerm(month).into());
        }
        Ok(chit)
    }

    async fn ensure_approved(&self, chit_id: Uuid, user_id: Uuid) -> ChitFundResult<()> {
        let member = self
            .member_repo
            .find(chit_id, user_id)
            .await?
            .ok_or(LifecycleError::MemberNotFound { chit_id, user_id })?;
        if member.status != MemberStatus::Approved {
            return Err(LifecycleError::MemberNotApproved.into());
        }
        Ok(())
    }
}

fn transition(from: &'static str, to: &'static str) -> LifecycleError {
    LifecycleError::InvalidStatusTransition { from, to }
}
