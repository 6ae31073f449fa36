//! REST surface over [`EventService`]. Every response is a JSON envelope
//! carrying a `success` flag.

use std::convert::Infallible;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, error};
use warp::http::StatusCode;
use warp::reply::Response;
use warp::{Filter, Rejection, Reply};

use crate::error::ServiceError;
use crate::models::EventId;
use crate::service::{CreateEventRequest, EventService, UpdateEventRequest};

#[derive(Debug, Serialize)]
pub struct ErrorMessage {
    pub success: bool,
    pub error: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpcomingQuery {
    pub hours: Option<String>,
}

pub fn routes(service: EventService) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let health = warp::path!("api" / "health")
        .and(warp::get())
        .map(|| json_reply(StatusCode::OK, json!({ "success": true, "status": "healthy" })));

    let list = warp::path!("api" / "events")
        .and(warp::get())
        .and(with_service(service.clone()))
        .and_then(list_events);

    let create = warp::path!("api" / "events")
        .and(warp::post())
        .and(json_body::<CreateEventRequest>())
        .and(with_service(service.clone()))
        .and_then(create_event);

    let search = warp::path!("api" / "events" / "search")
        .and(warp::get())
        .and(warp::query::<SearchQuery>())
        .and(with_service(service.clone()))
        .and_then(search_events);

    let upcoming = warp::path!("api" / "events" / "upcoming")
        .and(warp::get())
        .and(warp::query::<UpcomingQuery>())
        .and(with_service(service.clone()))
        .and_then(upcoming_events);

    let get_one = warp::path!("api" / "events" / EventId)
        .and(warp::get())
        .and(with_service(service.clone()))
        .and_then(get_event);

    let update = warp::path!("api" / "events" / EventId)
        .and(warp::put())
        .and(json_body::<UpdateEventRequest>())
        .and(with_service(service.clone()))
        .and_then(update_event);

    let delete = warp::path!("api" / "events" / EventId)
        .and(warp::delete())
        .and(with_service(service))
        .and_then(delete_event);

    health
        .or(list)
        .or(create)
        .or(search)
        .or(upcoming)
        .or(get_one)
        .or(update)
        .or(delete)
        .recover(handle_rejection)
}

fn with_service(service: EventService) -> impl Filter<Extract = (EventService,), Error = Infallible> + Clone {
    warp::any().map(move || service.clone())
}

fn json_body<T>() -> impl Filter<Extract = (T,), Error = Rejection> + Clone
where
    T: for<'de> Deserialize<'de> + Send,
{
    warp::body::json()
}

async fn list_events(service: EventService) -> Result<Response, Infallible> {
    let events = service.list().await;
    Ok(json_reply(StatusCode::OK, json!({ "success": true, "events": events })))
}

async fn create_event(request: CreateEventRequest, service: EventService) -> Result<Response, Infallible> {
    Ok(match service.create(request).await {
        Ok(event) => json_reply(StatusCode::CREATED, json!({ "success": true, "event": event })),
        Err(err) => error_reply(&err),
    })
}

async fn get_event(id: EventId, service: EventService) -> Result<Response, Infallible> {
    Ok(match service.get(id).await {
        Ok(event) => json_reply(StatusCode::OK, json!({ "success": true, "event": event })),
        Err(err) => error_reply(&err),
    })
}

async fn update_event(
    id: EventId,
    request: UpdateEventRequest,
    service: EventService,
) -> Result<Response, Infallible> {
    Ok(match service.update(id, request).await {
        Ok(event) => json_reply(StatusCode::OK, json!({ "success": true, "event": event })),
        Err(err) => error_reply(&err),
    })
}

async fn delete_event(id: EventId, service: EventService) -> Result<Response, Infallible> {
    Ok(match service.delete(id).await {
        Ok(()) => json_reply(
            StatusCode::OK,
            json!({ "success": true, "message": "Event deleted successfully" }),
        ),
        Err(err) => error_reply(&err),
    })
}

async fn search_events(query: SearchQuery, service: EventService) -> Result<Response, Infallible> {
    let query = query.q.unwrap_or_default();
    Ok(match service.search(&query).await {
        Ok(events) => json_reply(StatusCode::OK, json!({ "success": true, "events": events })),
        Err(err) => error_reply(&err),
    })
}

async fn upcoming_events(query: UpcomingQuery, service: EventService) -> Result<Response, Infallible> {
    // Anything that is not an integer falls back to the default window.
    let hours = query.hours.as_deref().and_then(|raw| match raw.trim().parse::<i64>() {
        Ok(hours) => Some(hours),
        Err(_) => {
            debug!(raw, "Ignoring unparsable hours value");
            None
        }
    });
    Ok(match service.upcoming(hours).await {
        Ok(events) => json_reply(StatusCode::OK, json!({ "success": true, "events": events })),
        Err(err) => error_reply(&err),
    })
}

fn json_reply(status: StatusCode, body: serde_json::Value) -> Response {
    warp::reply::with_status(warp::reply::json(&body), status).into_response()
}

fn error_response(status: StatusCode, message: String) -> Response {
    let body = ErrorMessage {
        success: false,
        error: message,
    };
    warp::reply::with_status(warp::reply::json(&body), status).into_response()
}

fn error_reply(err: &ServiceError) -> Response {
    let status = match err {
        ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
        ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
        ServiceError::Store(store_err) => {
            error!("Event store failure: {}", store_err);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    error_response(status, err.to_string())
}

async fn handle_rejection(rejection: Rejection) -> Result<Response, Infallible> {
    let (status, message) = if rejection.is_not_found() {
        (StatusCode::NOT_FOUND, "Not found".to_string())
    } else if let Some(err) = rejection.find::<warp::filters::body::BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, format!("Invalid request body: {}", err))
    } else if rejection.find::<warp::reject::UnsupportedMediaType>().is_some() {
        (StatusCode::UNSUPPORTED_MEDIA_TYPE, "Expected a JSON body".to_string())
    } else if rejection.find::<warp::reject::InvalidQuery>().is_some() {
        (StatusCode::BAD_REQUEST, "Invalid query string".to_string())
    } else if rejection.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed".to_string())
    } else {
        error!("Unhandled rejection: {:?}", rejection);
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
    };
    Ok(error_response(status, message))
}
