use kube::Error;
use kube::error::ErrorResponse;

const STATUS_CODE_404_NOT_FOUND: u16 = 404;
const STATUS_CODE_410_GONE: u16 = 410;
const STATUS_CODE_429_TOO_MANY_REQUESTS: u16 = 429;

pub fn is_404_not_found_error(err: &Error) -> bool {
    matches!(
        err,
        Error::Api(ErrorResponse {
            code: STATUS_CODE_404_NOT_FOUND,
            ..
        })
    )
}

/// the object was deleted after we saw it
pub fn is_410_gone_error(err: &Error) -> bool {
    matches!(
        err,
        Error::Api(ErrorResponse {
            code: STATUS_CODE_410_GONE,
            ..
        })
    )
}

/// eviction is blocked by a PodDisruptionBudget
pub fn is_429_too_many_requests_error(err: &Error) -> bool {
    matches!(
        err,
        Error::Api(ErrorResponse {
            code: STATUS_CODE_429_TOO_MANY_REQUESTS,
            ..
        })
    )
}

pub fn error_message(err: &Error) -> String {
    match err {
        Error::Api(ErrorResponse { message, .. }) if !message.is_empty() => message.clone(),
        other => other.to_string(),
    }
}
