use std::fmt;

use chrono::{DateTime, Utc};
use course_core::model::{Course, Difficulty, Lesson, LessonDraft};
use storage::repository::{NewCourseRecord, NewLessonRecord, Storage, StorageError};

const COURSE_TITLE: &str = "Pilates Start: Początkujący";
const COURSE_DESCRIPTION: &str = "Łagodny wstęp do pilates dla osób zaczynających przygodę z ruchem. Krótkie, lekkie wizualnie lekcje z naciskiem na oddech, mobilizację i stabilizację.";
const COURSE_THUMBNAIL: &str = "/img/hero_pilates.svg";

struct SeedLesson {
    order_index: i64,
    title: &'static str,
    description: &'static str,
    file_name: &'static str,
    thumbnail: &'static str,
}

const LESSONS: &[SeedLesson] = &[
    SeedLesson {
        order_index: 1,
        title: "Lekcja 1: Oddech i aktywacja core",
        description: "Nauka oddechu boczno‑żebrowego, neutralnej miednicy i delikatnej aktywacji mięśnia poprzecznego brzucha; spokojne tempo, nacisk na jakość ruchu.",
        file_name: "pilates-start-beginner-01-oddech-i-aktywacja-core.mp4",
        thumbnail: "/img/hero_pilates.svg",
    },
    SeedLesson {
        order_index: 2,
        title: "Lekcja 2: Mobilizacja kręgosłupa",
        description: "Segmentowa mobilizacja kręgosłupa (posterior/anterior tilt, cat-cow, roll-down); poprawa elastyczności odcinka piersiowego i lędźwiowego.",
        file_name: "pilates-start-beginner-02-mobilizacja-kregoslupa.mp4",
        thumbnail: "/img/feature_hd_video.svg",
    },
    SeedLesson {
        order_index: 3,
        title: "Lekcja 3: Stabilizacja bioder",
        description: "Ćwiczenia stabilizujące miednicę i biodra (mosty, clamshell, odwodzenie nogi); spokojne przejścia, kontrola ustawienia kolan i stóp.",
        file_name: "pilates-start-beginner-03-stabilizacja-bioder.mp4",
        thumbnail: "/img/feature_devices.svg",
    },
    SeedLesson {
        order_index: 4,
        title: "Lekcja 4: Ustawienie łopatek i górnej części pleców",
        description: "Aktywacja łopatki i mięśnia zębatego przedniego, wydłużenie kręgosłupa piersiowego; praca nad otwieraniem klatki bez unoszenia barków.",
        file_name: "pilates-start-beginner-04-ustawienie-lopatek.mp4",
        thumbnail: "/img/feature_levels.svg",
    },
    SeedLesson {
        order_index: 5,
        title: "Lekcja 5: Balans i kontrola",
        description: "Proste sekwencje równoważne (stanie na jednej nodze, gentle hinge), stabilizacja środka i praca z oddechem dla utrzymania równowagi.",
        file_name: "pilates-start-beginner-05-balans-i-kontrola.mp4",
        thumbnail: "/img/feature_plans.svg",
    },
    SeedLesson {
        order_index: 6,
        title: "Lekcja 6: Delikatne rozciąganie całego ciała",
        description: "Pełne, łagodne rozciąganie (tyły ud, biodra, klatka piersiowa) z oddechem; przyjemne wyciszenie i regeneracja.",
        file_name: "pilates-start-beginner-06-rozciaganie-calego-ciala.mp4",
        thumbnail: "/img/feature_devices.svg",
    },
];

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    now: Option<DateTime<Utc>>,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidNow { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidNow { raw } => {
                write!(f, "invalid --now value (expected RFC3339): {raw}")
            }
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("COURSE_DB_URL").unwrap_or_else(|_| "sqlite:dev.sqlite3".into());
        let mut now: Option<DateTime<Utc>> = None;

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--now" => {
                    let value = require_value(&mut args, "--now")?;
                    let parsed = DateTime::parse_from_rfc3339(&value)
                        .map_err(|_| ArgsError::InvalidNow { raw: value.clone() })?
                        .with_timezone(&Utc);
                    now = Some(parsed);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self { db_url, now })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite:dev.sqlite3)");
    eprintln!("  --now <rfc3339>           Fixed creation time for a newly inserted course");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  COURSE_DB_URL");
}

fn seed_err<E: fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

async fn upsert_course(storage: &Storage, now: DateTime<Utc>) -> Result<Course, StorageError> {
    if let Some(existing) = storage.courses.find_course_by_title(COURSE_TITLE).await? {
        let thumbnail = existing
            .thumbnail_path()
            .map_or_else(|| COURSE_THUMBNAIL.to_string(), str::to_owned);
        let synced = Course::new(
            existing.id(),
            COURSE_TITLE,
            Some(COURSE_DESCRIPTION.to_string()),
            Difficulty::Beginner,
            Some(thumbnail),
            existing.created_at(),
        )
        .map_err(seed_err)?;
        storage.courses.update_course(&synced).await?;
        return Ok(synced);
    }

    let record = NewCourseRecord {
        title: COURSE_TITLE.to_string(),
        description: Some(COURSE_DESCRIPTION.to_string()),
        difficulty: Difficulty::Beginner,
        thumbnail_path: Some(COURSE_THUMBNAIL.to_string()),
        created_at: now,
    };
    let id = storage.courses.insert_new_course(record).await?;
    storage
        .courses
        .get_course(id)
        .await?
        .ok_or(StorageError::NotFound)
}

/// Upsert the lesson set by order index; returns (inserted, updated, removed).
async fn upsert_lessons(
    storage: &Storage,
    course: &Course,
) -> Result<(usize, usize, usize), StorageError> {
    let existing = storage.lessons.list_lessons(course.id()).await?;
    let (mut inserted, mut updated, mut removed) = (0, 0, 0);

    for seeded in LESSONS {
        let draft = LessonDraft {
            title: seeded.title.to_string(),
            description: Some(seeded.description.to_string()),
        };
        match existing.iter().find(|l| l.order_index() == seeded.order_index) {
            Some(current) => {
                // Generated raster thumbnails survive a reseed.
                let thumbnail = if current.needs_thumbnail() {
                    Some(seeded.thumbnail.to_string())
                } else {
                    current.thumbnail_path().map(str::to_owned)
                };
                let lesson = Lesson::new(
                    current.id(),
                    course.id(),
                    draft,
                    current.video_path(),
                    thumbnail,
                    current.order_index(),
                )
                .map_err(seed_err)?;
                storage.lessons.update_lesson(&lesson).await?;
                updated += 1;
            }
            None => {
                let record = NewLessonRecord {
                    course_id: course.id(),
                    title: draft.title,
                    description: draft.description,
                    video_path: format!("/uploads/videos/{}", seeded.file_name),
                    thumbnail_path: Some(seeded.thumbnail.to_string()),
                };
                storage
                    .lessons
                    .insert_lesson_at(record, seeded.order_index)
                    .await?;
                inserted += 1;
            }
        }
    }

    for extra in existing
        .iter()
        .filter(|l| !LESSONS.iter().any(|s| s.order_index == l.order_index()))
    {
        storage.lessons.delete_lesson(extra.id()).await?;
        removed += 1;
    }

    Ok((inserted, updated, removed))
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;
    let now = args.now.unwrap_or_else(Utc::now);
    let storage = Storage::sqlite(&args.db_url).await?;

    let course = upsert_course(&storage, now).await?;
    let (inserted, updated, removed) = upsert_lessons(&storage, &course).await?;

    println!(
        "Seeded course {} ({}): {inserted} lessons inserted, {updated} updated, {removed} removed",
        course.id(),
        course.title()
    );
    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
