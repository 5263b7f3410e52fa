//! User profile reads and updates.

use chitfund_core::error::{ChitFundError, ChitFundResult};
use chitfund_core::models::user::{UpdateUser, User, normalize_mobile};
use chitfund_core::repository::UserRepository;
use chitfund_core::validation;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

/// Fields a user may change on their own profile.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProfile {
    pub name: Option<String>,
    pub email: Option<String>,
    pub mobile: Option<String>,
}

pub struct ProfileService<U: UserRepository> {
    user_repo: U,
}

impl<U: UserRepository> ProfileService<U> {
    pub fn new(user_repo: U) -> Self {
        Self { user_repo }
    }

    pub async fn get_profile(&self, user_id: Uuid) -> ChitFundResult<User> {
        self.user_repo.get_by_id(user_id).await
    }

    /// Apply the given fields. A changed email or mobile loses its
    /// verified flag until the user logs in through it again.
    pub async fn update_profile(&self, user_id: Uuid, input: UpdateProfile) -> ChitFundResult<User> {
        validation::validate_profile_update(
            input.name.as_deref(),
            input.email.as_deref(),
            input.mobile.as_deref(),
        )
        .into_result()?;

        let current = self.user_repo.get_by_id(user_id).await?;

        let email = input.email.map(|e| e.trim().to_string());
        let mobile = input.mobile.as_deref().map(normalize_mobile);
        let email_changed = email.is_some() && email != current.email;
        let mobile_changed = mobile.is_some() && mobile != current.mobile;

        // A contact identifies exactly one user for login and invites.
        if let (true, Some(email)) = (email_changed, email.as_deref()) {
            ensure_unclaimed(self.user_repo.get_by_email(email).await, "email")?;
        }
        if let (true, Some(mobile)) = (mobile_changed, mobile.as_deref()) {
            ensure_unclaimed(self.user_repo.get_by_mobile(mobile).await, "mobile")?;
        }

        let user = self
            .user_repo
            .update(
                user_id,
                UpdateUser {
                    name: input.name.map(|n| n.trim().to_string()),
                    email,
                    mobile,
                    is_email_verified: email_changed.then_some(false),
                    is_mobile_verified: mobile_changed.then_some(false),
                },
            )
            .await?;

        info!(%user_id, "Profile updated");
        Ok(user)
    }
}

fn ensure_unclaimed(holder: ChitFundResult<User>, field: &str) -> ChitFundResult<()> {
    match holder {
        Ok(_) => Err(ChitFundError::conflict(format!("{field} already in use"))),
        Err(ChitFundError::NotFound { .. }) => Ok(()),
        Err(e) => Err(e),
    }
}
