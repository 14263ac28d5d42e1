//! HTTP error response to [`ServiceError`] mapping.
//!
//! Bedrock answers with a JSON body and an `x-amzn-errortype` header, S3 with
//! an XML `<Error>` document. Both are reduced to the same pass-through shape.

use super::*;
use crate::transport::HttpResponse;
use quick_xml::events::Event;
use quick_xml::Reader;

/// Map a Bedrock (JSON protocol) error response.
pub fn map_json_error(service: &str, response: &HttpResponse) -> BedrockError {
    let body: Option<serde_json::Value> = serde_json::from_slice(&response.body).ok();

    let code = response
        .get_header("x-amzn-errortype")
        .map(|v| parse_error_type(v).to_string())
        .or_else(|| {
            body.as_ref()
                .and_then(|v| v.get("__type"))
                .and_then(|t| t.as_str())
                .map(|t| parse_error_type(t.rsplit('#').next().unwrap_or(t)).to_string())
        });

    let message = body.as_ref().and_then(|v| {
        v.get("message")
            .or_else(|| v.get("Message"))
            .and_then(|m| m.as_str())
            .map(String::from)
    });

    BedrockError::Service(ServiceError {
        service: service.to_string(),
        status: response.status,
        code,
        message,
        request_id: response.request_id().map(String::from),
    })
}

/// Map an S3 (XML protocol) error response.
pub fn map_s3_error(response: &HttpResponse) -> BedrockError {
    let body = String::from_utf8_lossy(&response.body);
    let parsed = parse_xml_error(&body);

    BedrockError::Service(ServiceError {
        service: "s3".to_string(),
        status: response.status,
        code: parsed.code,
        message: parsed.message,
        request_id: parsed
            .request_id
            .or_else(|| response.request_id().map(String::from)),
    })
}

/// Parse the x-amzn-errortype header to extract the error code.
pub fn parse_error_type(header_value: &str) -> &str {
    // Header format: "ErrorType:additional_info" or just "ErrorType"
    header_value.split(':').next().unwrap_or(header_value)
}

#[derive(Debug, Default)]
struct XmlError {
    code: Option<String>,
    message: Option<String>,
    request_id: Option<String>,
}

fn parse_xml_error(body: &str) -> XmlError {
    let mut reader = Reader::from_str(body);
    reader.trim_text(true);

    let mut parsed = XmlError::default();
    let mut current: Option<Vec<u8>> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => current = Some(e.name().as_ref().to_vec()),
            Ok(Event::Text(t)) => {
                let text = match t.unescape() {
                    Ok(text) => text.into_owned(),
                    Err(_) => continue,
                };
                match current.as_deref() {
                    Some(b"Code") => parsed.code = Some(text),
                    Some(b"Message") => parsed.message = Some(text),
                    Some(b"RequestId") => parsed.request_id = Some(text),
                    _ => {}
                }
            }
            Ok(Event::End(_)) => current = None,
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
    }

    parsed
}
