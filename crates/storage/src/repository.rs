use async_trait::async_trait;
use chrono::{DateTime, Utc};
use course_core::model::{
    Course, CourseId, CourseProgress, Difficulty, Enrollment, Lesson, LessonDraft, LessonId,
    ProgressState, UserId, UserProfile, sort_by_order,
};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Insert shape for a course; the id is assigned by the backend.
#[derive(Debug, Clone)]
pub struct NewCourseRecord {
    pub title: String,
    pub description: Option<String>,
    pub difficulty: Difficulty,
    pub thumbnail_path: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl NewCourseRecord {
    /// Build a record from a validated course, ignoring its placeholder id.
    #[must_use]
    pub fn from_course(course: &Course) -> Self {
        Self {
            title: course.title().to_owned(),
            description: course.description().map(str::to_owned),
            difficulty: course.difficulty(),
            thumbnail_path: course.thumbnail_path().map(str::to_owned),
            created_at: course.created_at(),
        }
    }
}

/// Insert shape for a lesson; id and (for appends) order index are assigned by the backend.
#[derive(Debug, Clone)]
pub struct NewLessonRecord {
    pub course_id: CourseId,
    pub title: String,
    pub description: Option<String>,
    pub video_path: String,
    pub thumbnail_path: Option<String>,
}

impl NewLessonRecord {
    #[must_use]
    pub fn from_lesson(lesson: &Lesson) -> Self {
        Self {
            course_id: lesson.course_id(),
            title: lesson.title().to_owned(),
            description: lesson.description().map(str::to_owned),
            video_path: lesson.video_path().to_owned(),
            thumbnail_path: lesson.thumbnail_path().map(str::to_owned),
        }
    }

    pub(crate) fn into_lesson(self, id: LessonId, order_index: i64) -> Result<Lesson, StorageError> {
        Lesson::new(
            id,
            self.course_id,
            LessonDraft {
                title: self.title,
                description: self.description,
            },
            self.video_path,
            self.thumbnail_path,
            order_index,
        )
        .map_err(|e| StorageError::Serialization(e.to_string()))
    }
}

/// Repository contract for courses.
#[async_trait]
pub trait CourseRepository: Send + Sync {
    /// Insert a course and return its assigned id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the course cannot be stored.
    async fn insert_new_course(&self, course: NewCourseRecord) -> Result<CourseId, StorageError>;

    /// Persist edits to an existing course.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the course does not exist.
    async fn update_course(&self, course: &Course) -> Result<(), StorageError>;

    /// Fetch a course by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_course(&self, id: CourseId) -> Result<Option<Course>, StorageError>;

    /// Fetch the first course with exactly this title.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn find_course_by_title(&self, title: &str) -> Result<Option<Course>, StorageError>;

    /// List courses ordered by difficulty, then title, optionally filtered by difficulty.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_courses(&self, difficulty: Option<Difficulty>)
    -> Result<Vec<Course>, StorageError>;
}

/// Repository contract for lessons.
#[async_trait]
pub trait LessonRepository: Send + Sync {
    /// Insert a lesson at the end of its course (order index = current max + 1).
    ///
    /// The index is computed and the row written in one atomic step.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the course does not exist.
    async fn append_lesson(&self, lesson: NewLessonRecord) -> Result<Lesson, StorageError>;

    /// Insert a lesson at an explicit order index.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the index is already taken in the course,
    /// `StorageError::NotFound` if the course does not exist.
    async fn insert_lesson_at(
        &self,
        lesson: NewLessonRecord,
        order_index: i64,
    ) -> Result<Lesson, StorageError>;

    /// Update title, description and thumbnail. The video path is never rewritten.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the lesson does not exist.
    async fn update_lesson(&self, lesson: &Lesson) -> Result<(), StorageError>;

    /// Remove a lesson.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the lesson does not exist.
    async fn delete_lesson(&self, id: LessonId) -> Result<(), StorageError>;

    /// Fetch a lesson by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_lesson(&self, id: LessonId) -> Result<Option<Lesson>, StorageError>;

    /// All lessons of a course in course order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_lessons(&self, course_id: CourseId) -> Result<Vec<Lesson>, StorageError>;

    /// Every lesson across all courses, grouped by course and in course order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_all_lessons(&self) -> Result<Vec<Lesson>, StorageError>;

    /// Replace a lesson's thumbnail path.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the lesson does not exist.
    async fn set_lesson_thumbnail(
        &self,
        id: LessonId,
        thumbnail_path: Option<&str>,
    ) -> Result<(), StorageError>;
}

/// Repository contract for enrollments.
#[async_trait]
pub trait EnrollmentRepository: Send + Sync {
    /// Create the enrollment if absent and, in the same transaction, the initial
    /// progress row if one is given and the learner has none for this course.
    ///
    /// Returns `true` when a new enrollment was created.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the course does not exist.
    async fn enroll(
        &self,
        enrollment: &Enrollment,
        initial: Option<ProgressState>,
    ) -> Result<bool, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn is_enrolled(&self, user_id: &UserId, course_id: CourseId)
    -> Result<bool, StorageError>;

    /// Enrollments of a user, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_enrollments(&self, user_id: &UserId) -> Result<Vec<Enrollment>, StorageError>;
}

/// Repository contract for per-course progress rows.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_progress(
        &self,
        user_id: &UserId,
        course_id: CourseId,
    ) -> Result<Option<CourseProgress>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_progress(&self, user_id: &UserId) -> Result<Vec<CourseProgress>, StorageError>;

    /// Create or overwrite the progress row, enrolling the user first if needed.
    /// Both writes commit together.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the course does not exist.
    async fn save_progress(
        &self,
        progress: &CourseProgress,
        enrolled_at: DateTime<Utc>,
    ) -> Result<(), StorageError>;

    /// Delete every progress row of a user, returning how many were removed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn clear_progress(&self, user_id: &UserId) -> Result<u64, StorageError>;
}

/// Repository contract for user profiles.
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_profile(&self, user_id: &UserId) -> Result<Option<UserProfile>, StorageError>;

    /// Create or replace the profile, preferences included.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn save_profile(&self, profile: &UserProfile) -> Result<(), StorageError>;
}

#[derive(Default)]
struct MemoryState {
    courses: BTreeMap<CourseId, Course>,
    lessons: BTreeMap<LessonId, Lesson>,
    enrollments: BTreeMap<(UserId, CourseId), Enrollment>,
    progress: BTreeMap<(UserId, CourseId), CourseProgress>,
    profiles: BTreeMap<UserId, UserProfile>,
    next_course_id: u64,
    next_lesson_id: u64,
}

impl MemoryState {
    fn insert_lesson(
        &mut self,
        record: NewLessonRecord,
        order_index: i64,
    ) -> Result<Lesson, StorageError> {
        if !self.courses.contains_key(&record.course_id) {
            return Err(StorageError::NotFound);
        }
        if self
            .lessons
            .values()
            .any(|l| l.course_id() == record.course_id && l.order_index() == order_index)
        {
            return Err(StorageError::Conflict);
        }
        self.next_lesson_id += 1;
        let lesson = record.into_lesson(LessonId::new(self.next_lesson_id), order_index)?;
        self.lessons.insert(lesson.id(), lesson.clone());
        Ok(lesson)
    }
}

/// Simple in-memory repository implementation for testing and prototyping.
///
/// A single lock covers all tables so multi-row writes are atomic.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, StorageError> {
        self.state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }
}

#[async_trait]
impl CourseRepository for InMemoryRepository {
    async fn insert_new_course(&self, course: NewCourseRecord) -> Result<CourseId, StorageError> {
        let mut guard = self.lock()?;
        guard.next_course_id += 1;
        let id = CourseId::new(guard.next_course_id);
        let course = Course::new(
            id,
            course.title,
            course.description,
            course.difficulty,
            course.thumbnail_path,
            course.created_at,
        )
        .map_err(|e| StorageError::Serialization(e.to_string()))?;
        guard.courses.insert(id, course);
        Ok(id)
    }

    async fn update_course(&self, course: &Course) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        let slot = guard
            .courses
            .get_mut(&course.id())
            .ok_or(StorageError::NotFound)?;
        *slot = course.clone();
        Ok(())
    }

    async fn get_course(&self, id: CourseId) -> Result<Option<Course>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.courses.get(&id).cloned())
    }

    async fn find_course_by_title(&self, title: &str) -> Result<Option<Course>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.courses.values().find(|c| c.title() == title).cloned())
    }

    async fn list_courses(
        &self,
        difficulty: Option<Difficulty>,
    ) -> Result<Vec<Course>, StorageError> {
        let guard = self.lock()?;
        let mut courses: Vec<Course> = guard
            .courses
            .values()
            .filter(|c| difficulty.is_none_or(|d| c.difficulty() == d))
            .cloned()
            .collect();
        courses.sort_by(|a, b| {
            (a.difficulty(), a.title(), a.id()).cmp(&(b.difficulty(), b.title(), b.id()))
        });
        Ok(courses)
    }
}

#[async_trait]
impl LessonRepository for InMemoryRepository {
    async fn append_lesson(&self, lesson: NewLessonRecord) -> Result<Lesson, StorageError> {
        let mut guard = self.lock()?;
        let max = guard
            .lessons
            .values()
            .filter(|l| l.course_id() == lesson.course_id)
            .map(Lesson::order_index)
            .max()
            .unwrap_or(0);
        guard.insert_lesson(lesson, max + 1)
    }

    async fn insert_lesson_at(
        &self,
        lesson: NewLessonRecord,
        order_index: i64,
    ) -> Result<Lesson, StorageError> {
        let mut guard = self.lock()?;
        guard.insert_lesson(lesson, order_index)
    }

    async fn update_lesson(&self, lesson: &Lesson) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        let slot = guard
            .lessons
            .get_mut(&lesson.id())
            .ok_or(StorageError::NotFound)?;
        let updated = Lesson::new(
            slot.id(),
            slot.course_id(),
            LessonDraft {
                title: lesson.title().to_owned(),
                description: lesson.description().map(str::to_owned),
            },
            slot.video_path(),
            lesson.thumbnail_path().map(str::to_owned),
            slot.order_index(),
        )
        .map_err(|e| StorageError::Serialization(e.to_string()))?;
        *slot = updated;
        Ok(())
    }

    async fn delete_lesson(&self, id: LessonId) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        guard
            .lessons
            .remove(&id)
            .map(|_| ())
            .ok_or(StorageError::NotFound)
    }

    async fn get_lesson(&self, id: LessonId) -> Result<Option<Lesson>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.lessons.get(&id).cloned())
    }

    async fn list_lessons(&self, course_id: CourseId) -> Result<Vec<Lesson>, StorageError> {
        let guard = self.lock()?;
        let mut lessons: Vec<Lesson> = guard
            .lessons
            .values()
            .filter(|l| l.course_id() == course_id)
            .cloned()
            .collect();
        sort_by_order(&mut lessons);
        Ok(lessons)
    }

    async fn list_all_lessons(&self) -> Result<Vec<Lesson>, StorageError> {
        let guard = self.lock()?;
        let mut lessons: Vec<Lesson> = guard.lessons.values().cloned().collect();
        lessons.sort_by_key(|l| (l.course_id(), l.order_index(), l.id()));
        Ok(lessons)
    }

    async fn set_lesson_thumbnail(
        &self,
        id: LessonId,
        thumbnail_path: Option<&str>,
    ) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        let lesson = guard.lessons.get_mut(&id).ok_or(StorageError::NotFound)?;
        lesson
            .set_thumbnail_path(thumbnail_path.map(str::to_owned))
            .map_err(|e| StorageError::Serialization(e.to_string()))
    }
}

#[async_trait]
impl EnrollmentRepository for InMemoryRepository {
    async fn enroll(
        &self,
        enrollment: &Enrollment,
        initial: Option<ProgressState>,
    ) -> Result<bool, StorageError> {
        let mut guard = self.lock()?;
        if !guard.courses.contains_key(&enrollment.course_id) {
            return Err(StorageError::NotFound);
        }
        let key = (enrollment.user_id.clone(), enrollment.course_id);
        let created = !guard.enrollments.contains_key(&key);
        if created {
            guard.enrollments.insert(key.clone(), enrollment.clone());
        }
        if let Some(initial) = initial {
            guard.progress.entry(key).or_insert_with(|| {
                CourseProgress::new(enrollment.user_id.clone(), enrollment.course_id, initial)
            });
        }
        Ok(created)
    }

    async fn is_enrolled(
        &self,
        user_id: &UserId,
        course_id: CourseId,
    ) -> Result<bool, StorageError> {
        let guard = self.lock()?;
        Ok(guard.enrollments.contains_key(&(user_id.clone(), course_id)))
    }

    async fn list_enrollments(&self, user_id: &UserId) -> Result<Vec<Enrollment>, StorageError> {
        let guard = self.lock()?;
        let mut found: Vec<Enrollment> = guard
            .enrollments
            .values()
            .filter(|e| &e.user_id == user_id)
            .cloned()
            .collect();
        found.sort_by_key(|e| (e.enrolled_at, e.course_id));
        Ok(found)
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn get_progress(
        &self,
        user_id: &UserId,
        course_id: CourseId,
    ) -> Result<Option<CourseProgress>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.progress.get(&(user_id.clone(), course_id)).cloned())
    }

    async fn list_progress(&self, user_id: &UserId) -> Result<Vec<CourseProgress>, StorageError> {
        let guard = self.lock()?;
        Ok(guard
            .progress
            .values()
            .filter(|p| p.user_id() == user_id)
            .cloned()
            .collect())
    }

    async fn save_progress(
        &self,
        progress: &CourseProgress,
        enrolled_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        if !guard.courses.contains_key(&progress.course_id()) {
            return Err(StorageError::NotFound);
        }
        let key = (progress.user_id().clone(), progress.course_id());
        guard.enrollments.entry(key.clone()).or_insert_with(|| {
            Enrollment::new(progress.user_id().clone(), progress.course_id(), enrolled_at)
        });
        guard.progress.insert(key, progress.clone());
        Ok(())
    }

    async fn clear_progress(&self, user_id: &UserId) -> Result<u64, StorageError> {
        let mut guard = self.lock()?;
        let before = guard.progress.len();
        guard.progress.retain(|(user, _), _| user != user_id);
        Ok(u64::try_from(before - guard.progress.len()).unwrap_or(u64::MAX))
    }
}

#[async_trait]
impl ProfileRepository for InMemoryRepository {
    async fn get_profile(&self, user_id: &UserId) -> Result<Option<UserProfile>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.profiles.get(user_id).cloned())
    }

    async fn save_profile(&self, profile: &UserProfile) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        guard
            .profiles
            .insert(profile.user_id().clone(), profile.clone());
        Ok(())
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub courses: Arc<dyn CourseRepository>,
    pub lessons: Arc<dyn LessonRepository>,
    pub enrollments: Arc<dyn EnrollmentRepository>,
    pub progress: Arc<dyn ProgressRepository>,
    pub profiles: Arc<dyn ProfileRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        Self {
            courses: Arc::new(repo.clone()),
            lessons: Arc::new(repo.clone()),
            enrollments: Arc::new(repo.clone()),
            progress: Arc::new(repo.clone()),
            profiles: Arc::new(repo),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use course_core::time::fixed_now;

    fn course_record(title: &str, difficulty: Difficulty) -> NewCourseRecord {
        NewCourseRecord {
            title: title.to_string(),
            description: None,
            difficulty,
            thumbnail_path: None,
            created_at: fixed_now(),
        }
    }

    fn lesson_record(course_id: CourseId, title: &str) -> NewLessonRecord {
        NewLessonRecord {
            course_id,
            title: title.to_string(),
            description: None,
            video_path: format!("/uploads/videos/{title}.mp4"),
            thumbnail_path: None,
        }
    }

    #[tokio::test]
    async fn append_assigns_max_plus_one() {
        let repo = InMemoryRepository::new();
        let course = repo
            .insert_new_course(course_record("Pilates", Difficulty::Beginner))
            .await
            .unwrap();

        repo.insert_lesson_at(lesson_record(course, "a"), 5)
            .await
            .unwrap();
        let appended = repo.append_lesson(lesson_record(course, "b")).await.unwrap();
        assert_eq!(appended.order_index(), 6);

        let err = repo
            .insert_lesson_at(lesson_record(course, "c"), 6)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict));
    }

    #[tokio::test]
    async fn append_to_missing_course_is_not_found() {
        let repo = InMemoryRepository::new();
        let err = repo
            .append_lesson(lesson_record(CourseId::new(77), "a"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
    }

    #[tokio::test]
    async fn enroll_twice_keeps_single_rows() {
        let repo = InMemoryRepository::new();
        let course = repo
            .insert_new_course(course_record("Pilates", Difficulty::Beginner))
            .await
            .unwrap();
        let user = UserId::new("u1").unwrap();
        let enrollment = Enrollment::new(user.clone(), course, fixed_now());
        let initial = ProgressState {
            current_lesson_id: Some(LessonId::new(1)),
            completion_percent: 0,
        };

        assert!(repo.enroll(&enrollment, None).await.unwrap());
        assert!(repo.list_progress(&user).await.unwrap().is_empty());

        assert!(!repo.enroll(&enrollment, Some(initial)).await.unwrap());
        assert!(!repo.enroll(&enrollment, Some(initial)).await.unwrap());
        assert_eq!(repo.list_enrollments(&user).await.unwrap().len(), 1);
        assert_eq!(repo.list_progress(&user).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn save_progress_enrolls_implicitly() {
        let repo = InMemoryRepository::new();
        let course = repo
            .insert_new_course(course_record("Pilates", Difficulty::Beginner))
            .await
            .unwrap();
        let user = UserId::new("u2").unwrap();
        let progress = CourseProgress::new(
            user.clone(),
            course,
            ProgressState {
                current_lesson_id: None,
                completion_percent: 100,
            },
        );
        repo.save_progress(&progress, fixed_now()).await.unwrap();
        assert!(repo.is_enrolled(&user, course).await.unwrap());

        assert_eq!(repo.clear_progress(&user).await.unwrap(), 1);
        assert!(repo.get_progress(&user, course).await.unwrap().is_none());
        assert!(repo.is_enrolled(&user, course).await.unwrap());
    }

    #[tokio::test]
    async fn courses_sorted_by_difficulty_then_title() {
        let repo = InMemoryRepository::new();
        repo.insert_new_course(course_record("Zen", Difficulty::Advanced))
            .await
            .unwrap();
        repo.insert_new_course(course_record("Core", Difficulty::Beginner))
            .await
            .unwrap();
        repo.insert_new_course(course_record("Abs", Difficulty::Beginner))
            .await
            .unwrap();

        let titles: Vec<String> = repo
            .list_courses(None)
            .await
            .unwrap()
            .iter()
            .map(|c| c.title().to_string())
            .collect();
        assert_eq!(titles, vec!["Abs", "Core", "Zen"]);

        let advanced = repo.list_courses(Some(Difficulty::Advanced)).await.unwrap();
        assert_eq!(advanced.len(), 1);
    }
}
