use course_core::model::{
    Course, CourseId, CourseProgress, Difficulty, Enrollment, Lesson, LessonDraft, LessonId,
    ProfileDraft, ProgressState, UserId, UserPreferences, UserProfile,
};
use course_core::time::fixed_now;
use storage::repository::{
    CourseRepository, EnrollmentRepository, LessonRepository, NewCourseRecord, NewLessonRecord,
    ProfileRepository, ProgressRepository, StorageError,
};
use storage::sqlite::SqliteRepository;

async fn connect(name: &str) -> SqliteRepository {
    let repo = SqliteRepository::connect(&format!("sqlite:file:{name}?mode=memory&cache=shared"))
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

async fn insert_course(repo: &SqliteRepository, title: &str, difficulty: Difficulty) -> CourseId {
    repo.insert_new_course(NewCourseRecord {
        title: title.to_string(),
        description: Some("opis".to_string()),
        difficulty,
        thumbnail_path: None,
        created_at: fixed_now(),
    })
    .await
    .unwrap()
}

fn lesson_record(course_id: CourseId, title: &str) -> NewLessonRecord {
    NewLessonRecord {
        course_id,
        title: title.to_string(),
        description: None,
        video_path: format!("/uploads/videos/{title}.mp4"),
        thumbnail_path: Some("/img/hero_pilates.svg".to_string()),
    }
}

#[tokio::test]
async fn migrations_are_idempotent() {
    let repo = connect("memdb_migrate_twice").await;
    repo.migrate().await.expect("second migrate");
    let id = insert_course(&repo, "Pilates", Difficulty::Beginner).await;
    assert!(repo.get_course(id).await.unwrap().is_some());
}

#[tokio::test]
async fn courses_roundtrip_and_sort() {
    let repo = connect("memdb_courses").await;
    let zen = insert_course(&repo, "Zen", Difficulty::Advanced).await;
    insert_course(&repo, "Core", Difficulty::Beginner).await;
    insert_course(&repo, "Abs", Difficulty::Beginner).await;

    let titles: Vec<String> = repo
        .list_courses(None)
        .await
        .unwrap()
        .iter()
        .map(|c| c.title().to_string())
        .collect();
    assert_eq!(titles, vec!["Abs", "Core", "Zen"]);

    let beginners = repo.list_courses(Some(Difficulty::Beginner)).await.unwrap();
    assert_eq!(beginners.len(), 2);

    let course = repo.get_course(zen).await.unwrap().unwrap();
    let edited = course
        .edited("Zen Flow", None, Difficulty::Intermediate)
        .unwrap();
    repo.update_course(&edited).await.unwrap();
    let fetched = repo.get_course(zen).await.unwrap().unwrap();
    assert_eq!(fetched.title(), "Zen Flow");
    assert_eq!(fetched.difficulty(), Difficulty::Intermediate);
    assert_eq!(fetched.created_at(), fixed_now());

    let ghost = Course::new(
        CourseId::new(999),
        "Ghost",
        None,
        Difficulty::Beginner,
        None,
        fixed_now(),
    )
    .unwrap();
    assert!(matches!(
        repo.update_course(&ghost).await,
        Err(StorageError::NotFound)
    ));
}

#[tokio::test]
async fn lessons_append_in_order_and_update_thumbnails() {
    let repo = connect("memdb_lessons").await;
    let course = insert_course(&repo, "Pilates", Difficulty::Beginner).await;

    let first = repo.append_lesson(lesson_record(course, "a")).await.unwrap();
    let second = repo.append_lesson(lesson_record(course, "b")).await.unwrap();
    assert_eq!(first.order_index(), 1);
    assert_eq!(second.order_index(), 2);

    let taken = repo
        .insert_lesson_at(lesson_record(course, "c"), 2)
        .await
        .unwrap_err();
    assert!(matches!(taken, StorageError::Conflict));

    let missing_course = repo
        .append_lesson(lesson_record(CourseId::new(404), "x"))
        .await
        .unwrap_err();
    assert!(matches!(missing_course, StorageError::NotFound));

    repo.set_lesson_thumbnail(first.id(), Some("/uploads/thumbnails/a-1.jpg"))
        .await
        .unwrap();
    let lessons = repo.list_lessons(course).await.unwrap();
    assert_eq!(lessons.len(), 2);
    assert!(!lessons[0].needs_thumbnail());
    assert!(lessons[1].needs_thumbnail());

    assert!(matches!(
        repo.set_lesson_thumbnail(LessonId::new(9999), None).await,
        Err(StorageError::NotFound)
    ));
}

#[tokio::test]
async fn update_lesson_never_rewrites_video_path() {
    let repo = connect("memdb_lesson_update").await;
    let course = insert_course(&repo, "Pilates", Difficulty::Beginner).await;
    let lesson = repo.append_lesson(lesson_record(course, "a")).await.unwrap();

    let renamed = Lesson::new(
        lesson.id(),
        course,
        LessonDraft {
            title: "Renamed".to_string(),
            description: Some("nowy opis".to_string()),
        },
        "/uploads/videos/other.mp4",
        None,
        lesson.order_index(),
    )
    .unwrap();
    repo.update_lesson(&renamed).await.unwrap();

    let fetched = repo.get_lesson(lesson.id()).await.unwrap().unwrap();
    assert_eq!(fetched.title(), "Renamed");
    assert_eq!(fetched.video_path(), lesson.video_path());
    assert_eq!(fetched.thumbnail_path(), None);

    repo.delete_lesson(lesson.id()).await.unwrap();
    assert!(repo.get_lesson(lesson.id()).await.unwrap().is_none());
}

#[tokio::test]
async fn enrollment_is_idempotent_and_seeds_progress() {
    let repo = connect("memdb_enroll").await;
    let course = insert_course(&repo, "Pilates", Difficulty::Beginner).await;
    let first = repo.append_lesson(lesson_record(course, "a")).await.unwrap();
    let user = UserId::new("learner-1").unwrap();
    let enrollment = Enrollment::new(user.clone(), course, fixed_now());
    let initial = ProgressState {
        current_lesson_id: Some(first.id()),
        completion_percent: 0,
    };

    assert!(repo.enroll(&enrollment, Some(initial)).await.unwrap());
    assert!(!repo.enroll(&enrollment, Some(initial)).await.unwrap());

    assert_eq!(repo.list_enrollments(&user).await.unwrap().len(), 1);
    let progress = repo.list_progress(&user).await.unwrap();
    assert_eq!(progress.len(), 1);
    assert_eq!(progress[0].current_lesson_id(), Some(first.id()));

    let empty = insert_course(&repo, "Joga", Difficulty::Beginner).await;
    let newcomer = UserId::new("learner-3").unwrap();
    assert!(
        repo.enroll(&Enrollment::new(newcomer.clone(), empty, fixed_now()), None)
            .await
            .unwrap()
    );
    assert!(repo.is_enrolled(&newcomer, empty).await.unwrap());
    assert!(repo.list_progress(&newcomer).await.unwrap().is_empty());

    let err = repo
        .enroll(
            &Enrollment::new(user, CourseId::new(404), fixed_now()),
            Some(initial),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound));
}

#[tokio::test]
async fn save_progress_upserts_and_enrolls() {
    let repo = connect("memdb_progress").await;
    let course = insert_course(&repo, "Pilates", Difficulty::Beginner).await;
    let user = UserId::new("learner-2").unwrap();

    let halfway = CourseProgress::new(
        user.clone(),
        course,
        ProgressState {
            current_lesson_id: Some(LessonId::new(2)),
            completion_percent: 50,
        },
    );
    repo.save_progress(&halfway, fixed_now()).await.unwrap();
    assert!(repo.is_enrolled(&user, course).await.unwrap());

    let done = CourseProgress::new(
        user.clone(),
        course,
        ProgressState {
            current_lesson_id: None,
            completion_percent: 100,
        },
    );
    repo.save_progress(&done, fixed_now()).await.unwrap();

    let fetched = repo.get_progress(&user, course).await.unwrap().unwrap();
    assert!(fetched.state().is_course_complete());
    assert_eq!(fetched.completion_percent(), 100);
    assert_eq!(repo.list_progress(&user).await.unwrap().len(), 1);

    assert_eq!(repo.clear_progress(&user).await.unwrap(), 1);
    assert_eq!(repo.clear_progress(&user).await.unwrap(), 0);
    assert!(repo.is_enrolled(&user, course).await.unwrap());
}

#[tokio::test]
async fn profiles_persist_nested_preferences() {
    let repo = connect("memdb_profiles").await;
    let user = UserId::new("learner-3").unwrap();
    assert!(repo.get_profile(&user).await.unwrap().is_none());

    let profile = ProfileDraft {
        target_daily_minutes: 45,
        preferred_difficulty: Difficulty::Advanced,
        preferences: UserPreferences {
            target_daily_study_minutes: 30,
            auto_complete_lesson_after_watch: false,
            play_next_automatically: true,
            email_progress_summaries: true,
        },
    }
    .validate(user.clone())
    .unwrap();
    repo.save_profile(&profile).await.unwrap();
    assert_eq!(repo.get_profile(&user).await.unwrap(), Some(profile));

    let reset = UserProfile::default_for(user.clone());
    repo.save_profile(&reset).await.unwrap();
    assert_eq!(repo.get_profile(&user).await.unwrap(), Some(reset));
}
