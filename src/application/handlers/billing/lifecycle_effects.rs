//! LifecycleEffects - applies lapse and reactivation outcomes to a user
//! and their profile as one unit.

use std::sync::Arc;

use tracing::info;

use crate::domain::account::User;
use crate::domain::billing::WebhookError;
use crate::domain::foundation::Timestamp;
use crate::domain::profile::UnpublishReason;
use crate::ports::EntitlementRepository;

/// Persists the durable consequences of entitlement transitions.
///
/// Both effects are idempotent: replaying an event converges on the same
/// state instead of compounding it. User and profile changes from one
/// event are persisted together so a crash cannot leave them split.
pub struct LifecycleEffects {
    repository: Arc<dyn EntitlementRepository>,
}

impl LifecycleEffects {
    pub fn new(repository: Arc<dyn EntitlementRepository>) -> Self {
        Self { repository }
    }

    /// Entitlement lost: stamp the lapse episode and take the profile down.
    ///
    /// Users without a profile just get the lapse stamped.
    pub async fn lapse(
        &self,
        user: &mut User,
        reason: UnpublishReason,
        now: Timestamp,
    ) -> Result<(), WebhookError> {
        user.record_lapse(now);

        match self.repository.find_profile_by_user(&user.id).await? {
            Some(mut profile) => {
                profile.unpublish_for_lapse(reason, now);
                self.repository
                    .update_user_and_profile(user, &profile)
                    .await?;
                info!(
                    user_id = %user.id,
                    profile_id = %profile.id,
                    reason = %reason.as_str(),
                    "unpublished profile after entitlement lapse"
                );
            }
            None => {
                self.repository.update_user(user).await?;
            }
        }

        Ok(())
    }

    /// Entitlement restored: close the lapse episode and republish the
    /// profile if the lapse is what unpublished it.
    pub async fn reactivate(&self, user: &mut User, now: Timestamp) -> Result<(), WebhookError> {
        user.record_reactivation(now);

        match self.repository.find_profile_by_user(&user.id).await? {
            Some(mut profile) => {
                let republished = profile.republish_if_lapsed();
                self.repository
                    .update_user_and_profile(user, &profile)
                    .await?;
                if republished {
                    info!(
                        user_id = %user.id,
                        profile_id = %profile.id,
                        "republished profile after entitlement restored"
                    );
                }
            }
            None => {
                self.repository.update_user(user).await?;
            }
        }

        Ok(())
    }
}
