use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::UserId;

/// Experience awarded for each completed lesson.
pub const XP_PER_LESSON: u64 = 10;

/// Experience needed to climb one level.
pub const XP_PER_LEVEL: u64 = 100;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ExperienceError {
    #[error("stored level {stored} does not match level {expected} derived from {xp} xp")]
    LevelMismatch { xp: u64, stored: u32, expected: u32 },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LearnerError {
    #[error("username cannot be empty")]
    EmptyUsername,

    #[error(transparent)]
    Experience(#[from] ExperienceError),
}

//
// ─── LEVEL ─────────────────────────────────────────────────────────────────────
//

/// Level reached with `xp` experience points.
///
/// Levels start at 1 and go up every [`XP_PER_LEVEL`] points, so 0 xp is
/// level 1 and 250 xp is level 3.
#[must_use]
pub fn level_for_xp(xp: u64) -> u32 {
    let tier = xp / XP_PER_LEVEL;
    u32::try_from(tier).map_or(u32::MAX, |t| t.saturating_add(1))
}

//
// ─── EXPERIENCE ────────────────────────────────────────────────────────────────
//

/// Cumulative experience and the level derived from it.
///
/// The level is never set directly; every constructor derives it from `xp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Experience {
    xp: u64,
    level: u32,
}

impl Default for Experience {
    fn default() -> Self {
        Self::from_xp(0)
    }
}

impl Experience {
    #[must_use]
    pub fn from_xp(xp: u64) -> Self {
        Self {
            xp,
            level: level_for_xp(xp),
        }
    }

    /// Rehydrate a stored xp/level pair, checking the level against the xp.
    ///
    /// # Errors
    ///
    /// Returns `ExperienceError::LevelMismatch` if the stored level diverged.
    pub fn from_persisted(xp: u64, level: u32) -> Result<Self, ExperienceError> {
        let expected = level_for_xp(xp);
        if expected != level {
            return Err(ExperienceError::LevelMismatch {
                xp,
                stored: level,
                expected,
            });
        }
        Ok(Self { xp, level })
    }

    /// Experience after adding `amount` points. XP never decreases.
    #[must_use]
    pub fn award(self, amount: u64) -> Self {
        Self::from_xp(self.xp.saturating_add(amount))
    }

    #[must_use]
    pub fn xp(&self) -> u64 {
        self.xp
    }

    #[must_use]
    pub fn level(&self) -> u32 {
        self.level
    }
}

//
// ─── LEARNER ───────────────────────────────────────────────────────────────────
//

/// Learner profile fields the engine reads or updates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Learner {
    id: UserId,
    username: String,
    name: String,
    surname: String,
    experience: Experience,
    created_at: DateTime<Utc>,
}

impl Learner {
    /// # Errors
    ///
    /// Returns `LearnerError::EmptyUsername` if the trimmed username is empty.
    pub fn new(
        id: UserId,
        username: impl Into<String>,
        name: impl Into<String>,
        surname: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, LearnerError> {
        let username = username.into().trim().to_owned();
        if username.is_empty() {
            return Err(LearnerError::EmptyUsername);
        }
        Ok(Self {
            id,
            username,
            name: name.into().trim().to_owned(),
            surname: surname.into().trim().to_owned(),
            experience: Experience::default(),
            created_at,
        })
    }

    #[must_use]
    pub fn with_experience(mut self, experience: Experience) -> Self {
        self.experience = experience;
        self
    }

    /// Name printed on certificates: "name surname", or the username when both are blank.
    #[must_use]
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.name, self.surname);
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_owned()
        }
    }

    #[must_use]
    pub fn id(&self) -> UserId {
        self.id
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn surname(&self) -> &str {
        &self.surname
    }

    #[must_use]
    pub fn experience(&self) -> Experience {
        self.experience
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn level_starts_at_one_and_steps_every_hundred() {
        assert_eq!(level_for_xp(0), 1);
        assert_eq!(level_for_xp(99), 1);
        assert_eq!(level_for_xp(100), 2);
        assert_eq!(level_for_xp(250), 3);
    }

    #[test]
    fn level_is_non_decreasing() {
        let mut previous = level_for_xp(0);
        for xp in (0..2_000).step_by(7) {
            let level = level_for_xp(xp);
            assert!(level >= previous);
            previous = level;
        }
        assert_eq!(level_for_xp(u64::MAX), u32::MAX);
    }

    #[test]
    fn award_recomputes_level() {
        let exp = Experience::from_xp(95).award(XP_PER_LESSON);
        assert_eq!(exp.xp(), 105);
        assert_eq!(exp.level(), 2);
        assert_eq!(Experience::from_xp(u64::MAX).award(1).xp(), u64::MAX);
    }

    #[test]
    fn persisted_level_must_match_xp() {
        assert!(Experience::from_persisted(250, 3).is_ok());
        let err = Experience::from_persisted(250, 1).unwrap_err();
        assert_eq!(
            err,
            ExperienceError::LevelMismatch {
                xp: 250,
                stored: 1,
                expected: 3
            }
        );
    }

    #[test]
    fn display_name_falls_back_to_username() {
        let full = Learner::new(UserId::new(1), "ada", "Ada", "Lovelace", fixed_now()).unwrap();
        assert_eq!(full.display_name(), "Ada Lovelace");

        let bare = Learner::new(UserId::new(2), "grace", "", " ", fixed_now()).unwrap();
        assert_eq!(bare.display_name(), "grace");

        assert_eq!(
            Learner::new(UserId::new(3), " ", "A", "B", fixed_now()).unwrap_err(),
            LearnerError::EmptyUsername
        );
    }
}
