use crate::errors::ServerError;
use crate::templates::components::error_page;
use astra::{Body, Response, ResponseBuilder};
use tracing::{error, warn};

pub type ResultResp = Result<Response, ServerError>;

pub fn status_of(err: &ServerError) -> u16 {
    match err {
        ServerError::NotFound => 404,
        ServerError::BadRequest(_) => 400,
        ServerError::DbError(_) | ServerError::XlsxError(_) | ServerError::InternalError => 500,
    }
}

/// Convert a ServerError into an HTML error page with the matching status.
pub fn error_to_response(err: ServerError) -> Response {
    let status = status_of(&err);
    if status >= 500 {
        error!(error = %err, "request failed");
    } else {
        warn!(status, error = %err, "request rejected");
    }

    let message = match &err {
        ServerError::NotFound => "Not Found".to_string(),
        ServerError::BadRequest(msg) => msg.clone(),
        other => other.to_string(),
    };
    let html = error_page(status, &message).into_string();

    match ResponseBuilder::new()
        .status(status)
        .header("Content-Type", mime::TEXT_HTML_UTF_8.as_ref())
        .body(Body::from(html.clone()))
    {
        Ok(resp) => resp,
        Err(_) => Response::new(Body::from(html)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_error_kind() {
        assert_eq!(error_to_response(ServerError::NotFound).status(), 404);
        assert_eq!(error_to_response(ServerError::BadRequest("no".into())).status(), 400);
        assert_eq!(error_to_response(ServerError::XlsxError("disk".into())).status(), 500);
    }
}
