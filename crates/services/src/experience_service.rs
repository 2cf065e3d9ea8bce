use std::sync::Arc;

use tracing::info;

use progress_core::model::{Experience, Learner, UserId};
use storage::repository::{LearnerRepository, StorageError};

use crate::error::{ExperienceServiceError, Missing};

/// Awards experience and reads learner levels.
#[derive(Clone)]
pub struct ExperienceService {
    learners: Arc<dyn LearnerRepository>,
}

impl ExperienceService {
    #[must_use]
    pub fn new(learners: Arc<dyn LearnerRepository>) -> Self {
        Self { learners }
    }

    /// Add `amount` xp to the learner; the level is recomputed in the same write.
    ///
    /// # Errors
    ///
    /// Returns `ExperienceServiceError::NotFound` if the learner does not exist.
    /// Returns `ExperienceServiceError::Storage` if persistence fails.
    pub async fn award_xp(
        &self,
        user: UserId,
        amount: u64,
    ) -> Result<Experience, ExperienceServiceError> {
        let experience = self
            .learners
            .award_xp(user, amount)
            .await
            .map_err(|err| match err {
                StorageError::NotFound => ExperienceServiceError::NotFound(Missing::Learner(user)),
                other => ExperienceServiceError::Storage(other),
            })?;
        info!(%user, amount, xp = experience.xp(), level = experience.level(), "xp awarded");
        Ok(experience)
    }

    /// Current xp and level of a learner.
    ///
    /// # Errors
    ///
    /// Returns `ExperienceServiceError::NotFound` if the learner does not exist.
    /// Returns `ExperienceServiceError::Storage` if the stored level disagrees
    /// with the stored xp, or if repository access fails.
    pub async fn experience(&self, user: UserId) -> Result<Experience, ExperienceServiceError> {
        Ok(self.learner(user).await?.experience())
    }

    /// # Errors
    ///
    /// Returns `ExperienceServiceError::NotFound` if the learner does not exist.
    /// Returns `ExperienceServiceError::Storage` if repository access fails.
    pub async fn learner(&self, user: UserId) -> Result<Learner, ExperienceServiceError> {
        self.learners
            .get_learner(user)
            .await?
            .ok_or(ExperienceServiceError::NotFound(Missing::Learner(user)))
    }

    /// Create a learner or refresh its profile; existing xp is preserved.
    ///
    /// # Errors
    ///
    /// Returns `ExperienceServiceError::Storage` if persistence fails.
    pub async fn register(&self, learner: &Learner) -> Result<(), ExperienceServiceError> {
        self.learners.upsert_learner(learner).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use progress_core::time::fixed_now;
    use storage::InMemoryRepository;

    fn fresh_service() -> (ExperienceService, UserId) {
        let repo = Arc::new(InMemoryRepository::new());
        (ExperienceService::new(repo), UserId::new(1))
    }

    #[tokio::test]
    async fn award_crosses_level_boundaries() {
        let (service, user) = fresh_service();
        let learner = Learner::new(user, "ada", "Ada", "Lovelace", fixed_now()).unwrap();
        service.register(&learner).await.unwrap();

        let experience = service.award_xp(user, 250).await.unwrap();
        assert_eq!(experience.xp(), 250);
        assert_eq!(experience.level(), 3);

        let experience = service.award_xp(user, 50).await.unwrap();
        assert_eq!(experience.level(), 4);
        assert_eq!(service.experience(user).await.unwrap(), experience);
    }

    #[tokio::test]
    async fn zero_award_keeps_level() {
        let (service, user) = fresh_service();
        let learner = Learner::new(user, "ada", "", "", fixed_now()).unwrap();
        service.register(&learner).await.unwrap();

        let experience = service.award_xp(user, 0).await.unwrap();
        assert_eq!(experience.xp(), 0);
        assert_eq!(experience.level(), 1);
    }

    #[tokio::test]
    async fn unknown_learner_is_not_found() {
        let (service, _) = fresh_service();
        let err = service.award_xp(UserId::new(404), 10).await.unwrap_err();
        assert!(matches!(
            err,
            ExperienceServiceError::NotFound(Missing::Learner(id)) if id == UserId::new(404)
        ));

        let err = service.experience(UserId::new(404)).await.unwrap_err();
        assert!(matches!(err, ExperienceServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn re_registering_keeps_experience() {
        let (service, user) = fresh_service();
        let learner = Learner::new(user, "ada", "Ada", "", fixed_now()).unwrap();
        service.register(&learner).await.unwrap();
        service.award_xp(user, 120).await.unwrap();

        let renamed = Learner::new(user, "ada", "Ada", "Byron", fixed_now()).unwrap();
        service.register(&renamed).await.unwrap();

        let stored = service.learner(user).await.unwrap();
        assert_eq!(stored.surname(), "Byron");
        assert_eq!(stored.experience().xp(), 120);
    }
}
