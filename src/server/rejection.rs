use std::convert::Infallible;

use serde_json::json;
use warp::{
    http::StatusCode,
    reject::{self, Reject, Rejection},
    Reply,
};

use crate::error::FieldErrors;

#[derive(Debug)]
pub enum ApiRejection {
    Status { code: u16, info: Option<String> },
    Fields(FieldErrors),
}

impl Reject for ApiRejection {}

impl From<potion::Error> for ApiRejection {
    fn from(value: potion::Error) -> Self {
        Self::Status {
            code: u16::try_from(value.code).unwrap_or(500),
            info: value.info,
        }
    }
}

impl From<FieldErrors> for ApiRejection {
    fn from(value: FieldErrors) -> Self {
        Self::Fields(value)
    }
}

pub fn reject<E: Into<ApiRejection>>(error: E) -> Rejection {
    reject::custom(error.into())
}

fn detail(status: StatusCode, info: Option<&str>) -> warp::reply::WithStatus<warp::reply::Json> {
    let info = info.unwrap_or_else(|| status.canonical_reason().unwrap_or("Error"));
    warp::reply::with_status(warp::reply::json(&json!({ "detail": info })), status)
}

pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    if err.is_not_found() {
        return Ok(detail(StatusCode::NOT_FOUND, Some("Not found.")));
    }

    if let Some(rejection) = err.find::<ApiRejection>() {
        return Ok(match rejection {
            ApiRejection::Status { code, info } => {
                let status =
                    StatusCode::from_u16(*code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                if status.is_server_error() {
                    // details stay in the log
                    detail(status, None)
                } else {
                    detail(status, info.as_deref())
                }
            }
            ApiRejection::Fields(errors) => warp::reply::with_status(
                warp::reply::json(errors),
                StatusCode::BAD_REQUEST,
            ),
        });
    }

    if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        return Ok(detail(
            StatusCode::BAD_REQUEST,
            Some(&format!("JSON parse error - {e}")),
        ));
    }

    if err.find::<reject::PayloadTooLarge>().is_some() {
        return Ok(detail(StatusCode::PAYLOAD_TOO_LARGE, None));
    }

    if err.find::<reject::UnsupportedMediaType>().is_some() {
        return Ok(detail(StatusCode::UNSUPPORTED_MEDIA_TYPE, None));
    }

    if err.find::<reject::LengthRequired>().is_some() {
        return Ok(detail(StatusCode::LENGTH_REQUIRED, None));
    }

    if err.find::<reject::InvalidQuery>().is_some() {
        return Ok(detail(StatusCode::BAD_REQUEST, Some("Invalid query string.")));
    }

    if err.find::<reject::MethodNotAllowed>().is_some() {
        return Ok(detail(
            StatusCode::METHOD_NOT_ALLOWED,
            Some("Method not allowed."),
        ));
    }

    log::error!("Unhandled rejection: {err:?}");
    Ok(detail(StatusCode::INTERNAL_SERVER_ERROR, None))
}
