// responses/xlsx.rs
use crate::errors::ServerError;
use crate::responses::ResultResp;
use astra::{Body, ResponseBuilder};

pub const XLSX_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Return XLSX file as HTTP response
pub fn xlsx_response(buffer: Vec<u8>, filename: &str) -> ResultResp {
    let resp = ResponseBuilder::new()
        .status(200)
        .header("Content-Type", XLSX_CONTENT_TYPE)
        .header(
            "Content-Disposition",
            format!("attachment; filename=\"{filename}\""),
        )
        .body(Body::from(buffer))
        .map_err(|_| ServerError::InternalError)?;

    Ok(resp)
}
