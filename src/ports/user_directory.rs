//! UserDirectory port - Read access to the surrounding application's users.
//!
//! Users and circles are owned elsewhere. Checkout only needs a name and
//! email for the payment customer and the circle to attach the
//! subscription to.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{CircleId, DomainError, UserId};

/// Profile fields needed to open a checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub circle_id: Option<CircleId>,
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Look up a user. `Ok(None)` when the user does not exist.
    async fn find_by_id(&self, user_id: UserId) -> Result<Option<UserProfile>, DomainError>;
}
