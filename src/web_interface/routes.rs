use std::sync::Arc;

use warp::{http::StatusCode, reply, Filter, Rejection, Reply};

use super::types::{ApiError, DeleteResponse, ResourceResponse};
use crate::storage::ArchiveStorage;

/// GET /
pub fn dashboard_route() -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path::end().and(warp::get()).and_then(|| async move {
        let html = r#"<html><head><title>camrec</title></head>
                <body><h1>camrec is recording</h1><p>See /days for JSON.</p></body></html>"#;
        Ok::<_, Rejection>(reply::html(html))
    })
}

/// GET /days
pub fn list_days_route(
    storage: Arc<ArchiveStorage>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path("days")
        .and(warp::path::end())
        .and(warp::get())
        .and_then(move || {
            let storage = storage.clone();
            async move {
                match storage.list_days() {
                    Ok(days) => {
                        Ok::<_, Rejection>(reply::with_status(reply::json(&days), StatusCode::OK))
                    }
                    Err(_) => Ok::<_, Rejection>(reply::with_status(
                        reply::json(&ApiError {
                            message: "Failed to list recorded days".to_string(),
                        }),
                        StatusCode::INTERNAL_SERVER_ERROR,
                    )),
                }
            }
        })
}

/// GET /days/:day/files
pub fn list_segments_route(
    storage: Arc<ArchiveStorage>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("days" / String / "files")
        .and(warp::get())
        .and_then(move |day: String| {
            let storage = storage.clone();
            async move {
                if !ArchiveStorage::is_day_name(&day) {
                    return Ok::<_, Rejection>(reply::with_status(
                        reply::json(&ApiError {
                            message: "Invalid day name".to_string(),
                        }),
                        StatusCode::BAD_REQUEST,
                    ));
                }
                match storage.list_segments(&day) {
                    Ok(files) => Ok::<_, Rejection>(reply::with_status(
                        reply::json(&files),
                        StatusCode::OK,
                    )),
                    Err(_) => Ok::<_, Rejection>(reply::with_status(
                        reply::json(&ApiError {
                            message: "Day not found".to_string(),
                        }),
                        StatusCode::NOT_FOUND,
                    )),
                }
            }
        })
}

/// GET /resource
pub fn resource_route(
    storage: Arc<ArchiveStorage>,
    quota_bytes: u64,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path("resource")
        .and(warp::path::end())
        .and(warp::get())
        .and_then(move || {
            let storage = storage.clone();
            async move {
                match storage.total_size() {
                    Ok(used) => Ok::<_, Rejection>(reply::with_status(
                        reply::json(&ResourceResponse {
                            total_storage: quota_bytes,
                            used_storage: used,
                            available_storage: quota_bytes.saturating_sub(used),
                        }),
                        StatusCode::OK,
                    )),
                    Err(_) => Ok::<_, Rejection>(reply::with_status(
                        reply::json(&ApiError {
                            message: "Failed to aggregate storage usage".to_string(),
                        }),
                        StatusCode::INTERNAL_SERVER_ERROR,
                    )),
                }
            }
        })
}

/// DELETE /days/:day
pub fn delete_day_route(
    storage: Arc<ArchiveStorage>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("days" / String)
        .and(warp::delete())
        .and_then(move |day: String| {
            let storage = storage.clone();
            async move {
                if !ArchiveStorage::is_day_name(&day) {
                    return Ok::<_, Rejection>(reply::with_status(
                        reply::json(&ApiError {
                            message: "Invalid day name".to_string(),
                        }),
                        StatusCode::BAD_REQUEST,
                    ));
                }
                match storage.delete_day(&day) {
                    Ok(()) => Ok::<_, Rejection>(reply::with_status(
                        reply::json(&DeleteResponse {
                            message: "Directory deleted successfully".to_string(),
                        }),
                        StatusCode::OK,
                    )),
                    Err(_) => Ok::<_, Rejection>(reply::with_status(
                        reply::json(&ApiError {
                            message: "Day not found".to_string(),
                        }),
                        StatusCode::NOT_FOUND,
                    )),
                }
            }
        })
}

/// GET /static/:day/:file - raw segment bytes
pub fn segment_file_route(
    storage: Arc<ArchiveStorage>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("static" / String / String)
        .and(warp::get())
        .and_then(move |day: String, file: String| {
            let storage = storage.clone();
            async move {
                if !ArchiveStorage::is_day_name(&day) || file.contains("..") || file.contains('/') {
                    let res = reply::with_status(
                        reply::json(&ApiError {
                            message: "Invalid segment path".to_string(),
                        }),
                        StatusCode::BAD_REQUEST,
                    )
                    .into_response();
                    return Ok::<_, Rejection>(res);
                }

                let path = storage.segment_path(&day, &file);
                match tokio::fs::read(&path).await {
                    Ok(bytes) => {
                        let mime = mime_guess::from_path(&path).first_or_octet_stream();
                        let res = reply::with_status(
                            reply::with_header(bytes, "Content-Type", mime.essence_str()),
                            StatusCode::OK,
                        )
                        .into_response();
                        Ok::<_, Rejection>(res)
                    }
                    Err(_) => {
                        let res = reply::with_status(
                            reply::json(&ApiError {
                                message: "Segment not found".to_string(),
                            }),
                            StatusCode::NOT_FOUND,
                        )
                        .into_response();
                        Ok::<_, Rejection>(res)
                    }
                }
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn seeded_storage() -> (TempDir, Arc<ArchiveStorage>) {
        let dir = TempDir::new().unwrap();
        let storage = Arc::new(ArchiveStorage::new(dir.path()).unwrap());
        storage.ensure_day_dir("2024-03-09").unwrap();
        std::fs::write(
            storage.segment_path("2024-03-09", "18-04-56.mp4"),
            vec![0u8; 2048],
        )
        .unwrap();
        (dir, storage)
    }

    #[tokio::test]
    async fn test_list_days_returns_json_array() {
        let (_dir, storage) = seeded_storage();
        let route = list_days_route(storage);

        let res = warp::test::request().path("/days").reply(&route).await;
        assert_eq!(res.status(), StatusCode::OK);
        let days: Vec<String> = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(days, vec!["2024-03-09"]);
    }

    #[tokio::test]
    async fn test_list_segments_for_day() {
        let (_dir, storage) = seeded_storage();
        let route = list_segments_route(storage);

        let res = warp::test::request()
            .path("/days/2024-03-09/files")
            .reply(&route)
            .await;
        assert_eq!(res.status(), StatusCode::OK);
        let files: Vec<String> = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(files, vec!["18-04-56.mp4"]);
    }

    #[tokio::test]
    async fn test_list_segments_rejects_bad_day() {
        let (_dir, storage) = seeded_storage();
        let route = list_segments_route(storage);

        let res = warp::test::request()
            .path("/days/..%2F..%2Fetc/files")
            .reply(&route)
            .await;
        assert_ne!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_resource_reports_quota_math() {
        let (_dir, storage) = seeded_storage();
        let route = resource_route(storage, 10_000);

        let res = warp::test::request().path("/resource").reply(&route).await;
        assert_eq!(res.status(), StatusCode::OK);
        let body: serde_json::Value = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(body["total_storage"], 10_000);
        assert_eq!(body["used_storage"], 2048);
        assert_eq!(body["available_storage"], 10_000 - 2048);
    }

    #[tokio::test]
    async fn test_delete_day_removes_folder() {
        let (_dir, storage) = seeded_storage();
        let route = delete_day_route(Arc::clone(&storage));

        let res = warp::test::request()
            .method("DELETE")
            .path("/days/2024-03-09")
            .reply(&route)
            .await;
        assert_eq!(res.status(), StatusCode::OK);
        assert!(!storage.day_dir("2024-03-09").exists());

        let res = warp::test::request()
            .method("DELETE")
            .path("/days/2024-03-09")
            .reply(&route)
            .await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_delete_day_rejects_non_day_names() {
        let (_dir, storage) = seeded_storage();
        let route = delete_day_route(storage);

        let res = warp::test::request()
            .method("DELETE")
            .path("/days/not-a-date")
            .reply(&route)
            .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_segment_file_served_with_video_mime() {
        let (_dir, storage) = seeded_storage();
        let route = segment_file_route(storage);

        let res = warp::test::request()
            .path("/static/2024-03-09/18-04-56.mp4")
            .reply(&route)
            .await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()["content-type"], "video/mp4");
        assert_eq!(res.body().len(), 2048);
    }

    #[tokio::test]
    async fn test_segment_file_missing_is_404() {
        let (_dir, storage) = seeded_storage();
        let route = segment_file_route(storage);

        let res = warp::test::request()
            .path("/static/2024-03-09/00-00-00.mp4")
            .reply(&route)
            .await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }
}
