use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use course_core::model::{Course, CourseId, Enrollment, ProfileDraft, UserId, UserProfile};
use storage::repository::{
    CourseRepository, EnrollmentRepository, ProfileRepository, ProgressRepository,
};

use crate::error::ProfileServiceError;

/// Upper bound on recommendations shown on the profile page.
pub const RECOMMENDATION_LIMIT: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnrollmentItem {
    pub enrollment: Enrollment,
    pub course_title: String,
}

/// Profile page data: settings, enrolled courses and what to try next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileOverview {
    pub profile: UserProfile,
    pub enrollments: Vec<EnrollmentItem>,
    pub progress_by_course: BTreeMap<CourseId, u8>,
    pub recommended: Vec<Course>,
}

#[derive(Clone)]
pub struct ProfileService {
    profiles: Arc<dyn ProfileRepository>,
    courses: Arc<dyn CourseRepository>,
    enrollments: Arc<dyn EnrollmentRepository>,
    progress: Arc<dyn ProgressRepository>,
}

impl ProfileService {
    #[must_use]
    pub fn new(
        profiles: Arc<dyn ProfileRepository>,
        courses: Arc<dyn CourseRepository>,
        enrollments: Arc<dyn EnrollmentRepository>,
        progress: Arc<dyn ProgressRepository>,
    ) -> Self {
        Self {
            profiles,
            courses,
            enrollments,
            progress,
        }
    }

    /// Stored profile, or the defaults when the user never saved one.
    ///
    /// # Errors
    ///
    /// Returns `ProfileServiceError::Storage` if repository access fails.
    pub async fn load(&self, user_id: &UserId) -> Result<UserProfile, ProfileServiceError> {
        Ok(self
            .profiles
            .get_profile(user_id)
            .await?
            .unwrap_or_else(|| UserProfile::default_for(user_id.clone())))
    }

    /// Validate and store a profile, creating it on first save.
    ///
    /// # Errors
    ///
    /// Returns `ProfileServiceError::Profile` for out-of-range values.
    pub async fn save(
        &self,
        user_id: &UserId,
        draft: ProfileDraft,
    ) -> Result<UserProfile, ProfileServiceError> {
        let profile = draft.validate(user_id.clone())?;
        self.profiles.save_profile(&profile).await?;
        info!(user = %user_id, "profile saved");
        Ok(profile)
    }

    /// # Errors
    ///
    /// Returns `ProfileServiceError::Storage` if repository access fails.
    pub async fn overview(&self, user_id: &UserId) -> Result<ProfileOverview, ProfileServiceError> {
        let profile = self.load(user_id).await?;

        let mut enrollments = Vec::new();
        for enrollment in self.enrollments.list_enrollments(user_id).await? {
            // Courses are never deleted, but a dangling row should not break the page.
            if let Some(course) = self.courses.get_course(enrollment.course_id).await? {
                enrollments.push(EnrollmentItem {
                    course_title: course.title().to_owned(),
                    enrollment,
                });
            }
        }

        let progress_by_course = self
            .progress
            .list_progress(user_id)
            .await?
            .into_iter()
            .map(|p| (p.course_id(), p.completion_percent()))
            .collect();

        let mut recommended = self
            .courses
            .list_courses(Some(profile.preferred_difficulty()))
            .await?;
        recommended.truncate(RECOMMENDATION_LIMIT);

        Ok(ProfileOverview {
            profile,
            enrollments,
            progress_by_course,
            recommended,
        })
    }
}

#[cfg(test)]
mod tests {
    use course_core::model::{Difficulty, ProfileError, UserPreferences};
    use course_core::time::fixed_now;
    use storage::repository::{NewCourseRecord, Storage};

    use super::*;

    fn service(storage: &Storage) -> ProfileService {
        ProfileService::new(
            Arc::clone(&storage.profiles),
            Arc::clone(&storage.courses),
            Arc::clone(&storage.enrollments),
            Arc::clone(&storage.progress),
        )
    }

    async fn add_course(storage: &Storage, title: &str, difficulty: Difficulty) -> CourseId {
        storage
            .courses
            .insert_new_course(NewCourseRecord {
                title: title.into(),
                description: None,
                difficulty,
                thumbnail_path: None,
                created_at: fixed_now(),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn load_falls_back_to_defaults() {
        let storage = Storage::in_memory();
        let user = UserId::new("anna").unwrap();
        let profile = service(&storage).load(&user).await.unwrap();
        assert_eq!(profile, UserProfile::default_for(user));
        assert_eq!(profile.target_daily_minutes(), 20);
    }

    #[tokio::test]
    async fn save_validates_and_persists() {
        let storage = Storage::in_memory();
        let svc = service(&storage);
        let user = UserId::new("anna").unwrap();

        let err = svc
            .save(
                &user,
                ProfileDraft {
                    target_daily_minutes: 4,
                    preferred_difficulty: Difficulty::Beginner,
                    preferences: UserPreferences::default(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ProfileServiceError::Profile(ProfileError::InvalidDailyMinutes(4))
        ));

        let saved = svc
            .save(
                &user,
                ProfileDraft {
                    target_daily_minutes: 45,
                    preferred_difficulty: Difficulty::Advanced,
                    preferences: UserPreferences {
                        play_next_automatically: true,
                        ..UserPreferences::default()
                    },
                },
            )
            .await
            .unwrap();
        assert_eq!(svc.load(&user).await.unwrap(), saved);
        assert!(saved.preferences().play_next_automatically);
    }

    #[tokio::test]
    async fn overview_collects_enrollments_and_recommendations() {
        let storage = Storage::in_memory();
        let svc = service(&storage);
        let user = UserId::new("anna").unwrap();

        let joga = add_course(&storage, "Joga", Difficulty::Beginner).await;
        add_course(&storage, "Aerial", Difficulty::Advanced).await;
        for i in 0..7 {
            add_course(&storage, &format!("Start {i}"), Difficulty::Beginner).await;
        }
        storage
            .enrollments
            .enroll(
                &Enrollment::new(user.clone(), joga, fixed_now()),
                Some(course_core::model::ProgressState {
                    current_lesson_id: Some(course_core::model::LessonId::new(1)),
                    completion_percent: 0,
                }),
            )
            .await
            .unwrap();

        let overview = svc.overview(&user).await.unwrap();
        assert_eq!(overview.enrollments.len(), 1);
        assert_eq!(overview.enrollments[0].course_title, "Joga");
        assert_eq!(overview.progress_by_course.get(&joga), Some(&0));
        assert_eq!(overview.recommended.len(), RECOMMENDATION_LIMIT);
        assert!(
            overview
                .recommended
                .iter()
                .all(|c| c.difficulty() == Difficulty::Beginner)
        );
        assert_eq!(overview.recommended[0].title(), "Joga");
    }
}
