use std::convert::Infallible;
use std::sync::Arc;

use log::{error, info, warn};
use tokio_stream::wrappers::ReceiverStream;
use warp::http::StatusCode;
use warp::hyper::Body;
use warp::{reply, Filter, Rejection, Reply};

use super::types::{ApiError, DeleteForm, RecordForm, RecordResponse, VideosQuery};
use crate::controller::AppContext;
use crate::error_handling::types::{BrowseError, RecordingError};
use crate::retention::list_clip_dir;
use crate::streaming::multipart::stream_content_type;

const MAX_FORM_BYTES: u64 = 16 * 1024;

fn with_context(
    ctx: Arc<AppContext>,
) -> impl Filter<Extract = (Arc<AppContext>,), Error = Infallible> + Clone {
    warp::any().map(move || ctx.clone())
}

/// GET /stream
///
/// Infinite `multipart/x-mixed-replace` body fed by a dedicated stream
/// session; the session ends when the client goes away.
pub fn stream_route(
    ctx: Arc<AppContext>,
) -> impl Filter<Extract = (reply::Response,), Error = Rejection> + Clone {
    warp::path("stream")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_context(ctx))
        .map(|ctx: Arc<AppContext>| {
            let (_session, rx) = ctx.multiplexer.open_channel_session();
            let body = Body::wrap_stream(ReceiverStream::new(rx));

            let response = reply::with_header(
                warp::http::Response::new(body),
                "content-type",
                stream_content_type(),
            );
            reply::with_header(response, "cache-control", "no-cache").into_response()
        })
}

/// POST /record
pub fn record_route(
    ctx: Arc<AppContext>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path("record")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_FORM_BYTES))
        .and(warp::body::form())
        .and(with_context(ctx))
        .and_then(handle_record)
}

async fn handle_record(
    form: RecordForm,
    ctx: Arc<AppContext>,
) -> Result<reply::Response, Rejection> {
    let response = match form.action.as_str() {
        "start" => match ctx.recorder.start().await {
            Ok(started) => reply::with_status(
                reply::json(&RecordResponse::recording(started)),
                StatusCode::OK,
            )
            .into_response(),
            Err(e @ RecordingError::AlreadyRecording) => reply::with_status(
                reply::json(&ApiError::new(e.to_string())),
                StatusCode::CONFLICT,
            )
            .into_response(),
            Err(e) => {
                error!("Unable to start recording: {}", e);
                reply::with_status(
                    reply::json(&ApiError::new(e.to_string())),
                    StatusCode::INTERNAL_SERVER_ERROR,
                )
                .into_response()
            }
        },
        "stop" => {
            ctx.recorder.stop().await;
            reply::with_status(reply::json(&RecordResponse::idle()), StatusCode::OK)
                .into_response()
        }
        other => {
            warn!("Invalid record action: {:?}", other);
            reply::with_status("Invalid action", StatusCode::BAD_REQUEST).into_response()
        }
    };
    Ok(response)
}

/// POST /delete
pub fn delete_route(
    ctx: Arc<AppContext>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path("delete")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_FORM_BYTES))
        .and(warp::body::form())
        .and(with_context(ctx))
        .and_then(handle_delete)
}

async fn handle_delete(
    form: DeleteForm,
    ctx: Arc<AppContext>,
) -> Result<reply::Response, Rejection> {
    let days = match form.days.trim().parse::<i64>() {
        Ok(days) => days,
        Err(_) => {
            warn!("Rejecting cleanup with unparsable days {:?}", form.days);
            return Ok(
                reply::with_status("Error parsing days", StatusCode::BAD_REQUEST).into_response(),
            );
        }
    };

    let scope = form.scope;
    let root = ctx.clips_dir().to_path_buf();
    info!(
        "Cleanup of {} older than {} days requested",
        scope.label().to_lowercase(),
        days
    );

    match tokio::task::spawn_blocking(move || scope.run(&root, days)).await {
        Ok(deleted) => Ok(reply::with_status(
            format!("{} {} Deleted", deleted, scope.label()),
            StatusCode::OK,
        )
        .into_response()),
        Err(e) => {
            error!("Cleanup task failed: {}", e);
            Ok(reply::with_status(
                reply::json(&ApiError::new("Cleanup failed")),
                StatusCode::INTERNAL_SERVER_ERROR,
            )
            .into_response())
        }
    }
}

/// GET /statistics
pub fn statistics_route(
    ctx: Arc<AppContext>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path("statistics")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_context(ctx))
        .and_then(|ctx: Arc<AppContext>| async move {
            let statistics = ctx.statistics().await;
            Ok::<_, Rejection>(reply::json(&statistics))
        })
}

/// GET /videos?path=<folder> -> folders and clip files of the clip tree
pub fn videos_route(
    ctx: Arc<AppContext>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path("videos")
        .and(warp::path::end())
        .and(warp::get())
        .and(warp::query::<VideosQuery>())
        .and(with_context(ctx))
        .and_then(handle_videos)
}

async fn handle_videos(
    query: VideosQuery,
    ctx: Arc<AppContext>,
) -> Result<reply::Response, Rejection> {
    let root = ctx.clips_dir().to_path_buf();
    let sub_path = query.path.clone();

    let task = tokio::task::spawn_blocking(move || list_clip_dir(&root, &sub_path));
    let listing = match task.await {
        Ok(listing) => listing,
        Err(e) => {
            error!("Clip listing task failed: {}", e);
            return Ok(reply::with_status(
                reply::json(&ApiError::new("Failed to read directory")),
                StatusCode::INTERNAL_SERVER_ERROR,
            )
            .into_response());
        }
    };

    let response = match listing {
        Ok(listing) => reply::with_status(reply::json(&listing), StatusCode::OK).into_response(),
        Err(e) => {
            let status = match e {
                BrowseError::InvalidPath(_) => StatusCode::BAD_REQUEST,
                BrowseError::NotFound(_) => StatusCode::NOT_FOUND,
                BrowseError::IoError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            };
            warn!("Clip listing of {:?} failed: {}", query.path, e);
            reply::with_status(reply::json(&ApiError::new(e.to_string())), status).into_response()
        }
    };
    Ok(response)
}

/// GET /clips/... -> recorded segments
pub fn clips_route(
    ctx: Arc<AppContext>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path("clips").and(warp::fs::dir(ctx.clips_dir().to_path_buf()))
}

/// GET / -> static page and assets
pub fn static_route(
    ctx: Arc<AppContext>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::fs::dir(ctx.static_dir().to_path_buf())
}

/// Every endpoint, with request logging.
pub fn routes(
    ctx: Arc<AppContext>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    stream_route(ctx.clone())
        .or(record_route(ctx.clone()))
        .or(delete_route(ctx.clone()))
        .or(statistics_route(ctx.clone()))
        .or(videos_route(ctx.clone()))
        .or(clips_route(ctx.clone()))
        .or(static_route(ctx))
        .with(warp::log("camrelay::web"))
}
