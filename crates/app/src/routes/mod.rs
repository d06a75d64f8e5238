mod courses;
mod dev;
mod lessons;
mod profile;

use axum::extract::{DefaultBodyLimit, Request, State};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use services::AppServices;

use crate::config::Environment;
use crate::error::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub services: AppServices,
    pub environment: Environment,
}

pub fn router(state: AppState, body_limit: usize) -> Router {
    let dev = Router::new()
        .route(
            "/users/:user_id/lessons/:lesson_id/complete",
            post(dev::mark_complete),
        )
        .route("/users/:user_id/progress", delete(dev::clear_progress))
        .route("/thumbnails/rebuild", post(dev::rebuild_thumbnails))
        .route("/lessons/:lesson_id/thumbnail", post(dev::override_thumbnail))
        .route_layer(middleware::from_fn_with_state(state.clone(), dev_only));

    Router::new()
        .route("/health", get(health))
        .route("/api/courses", get(courses::list).post(courses::create))
        .route("/api/courses/featured", get(courses::featured))
        .route("/api/courses/:id", get(courses::show).put(courses::update))
        .route("/api/courses/:id/lessons", post(lessons::create))
        .route("/api/courses/:id/enroll", post(courses::enroll))
        .route("/api/lessons/:id", get(lessons::watch))
        .route("/api/lessons/:id/complete", post(lessons::complete))
        .route("/api/profile", get(profile::show).put(profile::update))
        .route("/api/instructor/dashboard", get(courses::dashboard))
        .nest("/dev", dev)
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(DefaultBodyLimit::max(body_limit)),
        )
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn dev_only(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if !state.environment.is_development() {
        return ApiError::Forbidden("dev endpoints are disabled").into_response();
    }
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::{self, Method, StatusCode, header};
    use course_core::model::UploadLimits;
    use course_core::time::fixed_now;
    use services::{Clock, ExtractError, FrameExtractor, MediaSettings};
    use storage::repository::Storage;
    use tempfile::TempDir;
    use tower::ServiceExt;

    use super::*;
    use crate::auth::{USER_ID_HEADER, USER_ROLES_HEADER};

    const BOUNDARY: &str = "course-test-boundary";

    struct StubExtractor;

    #[async_trait]
    impl FrameExtractor for StubExtractor {
        async fn extract_frame(&self, _video: &Path, output: &Path) -> Result<(), ExtractError> {
            tokio::fs::write(output, [0xFF, 0xD8, 0xFF]).await?;
            Ok(())
        }
    }

    struct TestApp {
        _media_root: TempDir,
        router: Router,
    }

    async fn app(environment: Environment) -> TestApp {
        let media_root = tempfile::tempdir().unwrap();
        let services = AppServices::from_storage(
            &Storage::in_memory(),
            Clock::fixed(fixed_now()),
            MediaSettings {
                root: media_root.path().to_path_buf(),
                limits: UploadLimits {
                    max_video_bytes: 64,
                    max_image_bytes: 16,
                },
                extractor: Arc::new(StubExtractor),
            },
        )
        .await
        .unwrap();
        TestApp {
            _media_root: media_root,
            router: router(
                AppState {
                    services,
                    environment,
                },
                1024 * 1024,
            ),
        }
    }

    fn multipart(fields: &[(&str, &str)], file: Option<(&str, &str, &[u8])>) -> Body {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        if let Some((name, file_name, bytes)) = file {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        Body::from(body)
    }

    fn request(method: Method, uri: &str, user: Option<(&str, &str)>) -> http::request::Builder {
        let mut builder = http::Request::builder().method(method).uri(uri);
        if let Some((id, roles)) = user {
            builder = builder
                .header(USER_ID_HEADER, id)
                .header(USER_ROLES_HEADER, roles);
        }
        builder
    }

    fn multipart_request(uri: &str, user: Option<(&str, &str)>, body: Body) -> Request {
        request(Method::POST, uri, user)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(body)
            .unwrap()
    }

    async fn send(app: &TestApp, req: Request) -> (StatusCode, Value) {
        let response = app.router.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    const INSTRUCTOR: Option<(&str, &str)> = Some(("coach", "instructor"));
    const LEARNER: Option<(&str, &str)> = Some(("learner", "user"));

    async fn create_course(app: &TestApp, title: &str) -> u64 {
        let body = multipart(&[("title", title), ("difficulty", "beginner")], None);
        let (status, course) = send(app, multipart_request("/api/courses", INSTRUCTOR, body)).await;
        assert_eq!(status, StatusCode::CREATED);
        course["id"].as_u64().unwrap()
    }

    async fn create_lesson(app: &TestApp, course: u64, title: &str) -> u64 {
        let body = multipart(&[("title", title)], Some(("video", "clip.mp4", b"frames".as_slice())));
        let uri = format!("/api/courses/{course}/lessons");
        let (status, lesson) = send(app, multipart_request(&uri, INSTRUCTOR, body)).await;
        assert_eq!(status, StatusCode::CREATED, "{lesson}");
        lesson["id"].as_u64().unwrap()
    }

    #[tokio::test]
    async fn health_is_open() {
        let app = app(Environment::Production).await;
        let req = request(Method::GET, "/health", None)
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn course_creation_requires_instructor() {
        let app = app(Environment::Production).await;
        let body = multipart(&[("title", "Joga")], None);
        let (status, _) = send(&app, multipart_request("/api/courses", None, body)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let body = multipart(&[("title", "Joga")], None);
        let (status, _) = send(&app, multipart_request("/api/courses", LEARNER, body)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let body = multipart(&[("title", "Joga")], Some(("thumbnail", "cover.gif", b"GIF89a".as_slice())));
        let (status, body) = send(&app, multipart_request("/api/courses", INSTRUCTOR, body)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["field"], "thumbnail");
    }

    #[tokio::test]
    async fn lesson_uploads_are_validated() {
        let app = app(Environment::Production).await;
        let course = create_course(&app, "Pilates").await;
        let uri = format!("/api/courses/{course}/lessons");

        let body = multipart(&[("title", "Oddech")], None);
        let (status, body) = send(&app, multipart_request(&uri, INSTRUCTOR, body)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["field"], "video");

        let body = multipart(&[("title", "Oddech")], Some(("video", "clip.avi", b"x".as_slice())));
        let (status, body) = send(&app, multipart_request(&uri, INSTRUCTOR, body)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["field"], "video");

        let big = [0_u8; 65];
        let body = multipart(&[("title", "Oddech")], Some(("video", "clip.mp4", big.as_slice())));
        let (status, body) = send(&app, multipart_request(&uri, INSTRUCTOR, body)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["field"], "video");

        let body = multipart(&[("title", "Orphan")], Some(("video", "clip.mp4", b"x".as_slice())));
        let (status, _) = send(
            &app,
            multipart_request("/api/courses/999/lessons", INSTRUCTOR, body),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn enroll_complete_and_watch() {
        let app = app(Environment::Production).await;
        let course = create_course(&app, "Pilates").await;
        let first = create_lesson(&app, course, "Oddech").await;
        let second = create_lesson(&app, course, "Mobilizacja kręgosłupa").await;

        let enroll = format!("/api/courses/{course}/enroll");
        let req = request(Method::POST, &enroll, LEARNER).body(Body::empty()).unwrap();
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["progress"]["state"]["current_lesson_id"], first);
        let req = request(Method::POST, &enroll, LEARNER).body(Body::empty()).unwrap();
        assert_eq!(send(&app, req).await.0, StatusCode::OK);

        let complete = format!("/api/lessons/{first}/complete");
        let req = request(Method::POST, &complete, LEARNER).body(Body::empty()).unwrap();
        let response = app.router.clone().oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let location = response.headers()[header::LOCATION].to_str().unwrap().to_owned();
        assert_eq!(location, format!("/api/lessons/{first}?just_completed=true"));

        let req = request(Method::GET, &location, LEARNER).body(Body::empty()).unwrap();
        let (status, view) = send(&app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["is_completed"], true);
        assert_eq!(view["completion_percent"], 50);
        assert_eq!(view["position"], 1);
        assert_eq!(view["next_lesson_id"], second);
        assert_eq!(view["tips"].as_array().unwrap().len(), 3);

        let uri = format!("/api/courses/{course}");
        let req = request(Method::GET, &uri, LEARNER).body(Body::empty()).unwrap();
        let (_, page) = send(&app, req).await;
        assert_eq!(page["enrolled"], true);
        assert_eq!(page["lessons"][0]["is_completed"], true);
        assert_eq!(page["lessons"][1]["is_completed"], false);

        let req = request(Method::GET, "/api/lessons/999", LEARNER)
            .body(Body::empty())
            .unwrap();
        assert_eq!(send(&app, req).await.0, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn catalogue_filters_by_level() {
        let app = app(Environment::Production).await;
        create_course(&app, "Pilates").await;

        let req = request(Method::GET, "/api/courses?level=beginner", None)
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);

        let req = request(Method::GET, "/api/courses?level=expert", None)
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["field"], "difficulty");

        let req = request(Method::GET, "/api/courses/featured", None)
            .body(Body::empty())
            .unwrap();
        let (_, body) = send(&app, req).await;
        assert_eq!(body[0]["lesson_count"], 0);
    }

    #[tokio::test]
    async fn profile_round_trip() {
        let app = app(Environment::Production).await;
        let req = request(Method::GET, "/api/profile", LEARNER)
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["profile"]["target_daily_minutes"], 20);

        let put = |minutes: u32| {
            request(Method::PUT, "/api/profile", LEARNER)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({ "target_daily_minutes": minutes, "preferred_difficulty": "advanced" })
                        .to_string(),
                ))
                .unwrap()
        };
        let (status, body) = send(&app, put(500)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["field"], "target_daily_minutes");

        let (status, body) = send(&app, put(30)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["preferred_difficulty"], "advanced");
    }

    #[tokio::test]
    async fn dev_routes_are_gated() {
        let prod = app(Environment::Production).await;
        let req = request(Method::POST, "/dev/thumbnails/rebuild", None)
            .body(Body::empty())
            .unwrap();
        assert_eq!(send(&prod, req).await.0, StatusCode::FORBIDDEN);

        let dev = app(Environment::Development).await;
        let course = create_course(&dev, "Pilates").await;
        let lesson = create_lesson(&dev, course, "Oddech").await;

        let uri = format!("/dev/users/someone/lessons/{lesson}/complete");
        let req = request(Method::POST, &uri, None).body(Body::empty()).unwrap();
        let (status, body) = send(&dev, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["state"]["completion_percent"], 100);

        let req = request(Method::DELETE, "/dev/users/someone/progress", None)
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&dev, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["removed"], 1);

        let req = request(Method::POST, "/dev/thumbnails/rebuild", None)
            .body(Body::empty())
            .unwrap();
        let (_, body) = send(&dev, req).await;
        assert_eq!(body["rebuilt"], 0);

        let uri = format!("/dev/lessons/{lesson}/thumbnail");
        let req = request(Method::POST, &uri, None)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json!({ "image": "not base64!" }).to_string()))
            .unwrap();
        let (status, body) = send(&dev, req).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["field"], "image");
    }
}
