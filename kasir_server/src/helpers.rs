use actix_web::HttpRequest;
use duitku_tools::CallbackPayload;

use crate::errors::ServerError;

/// Parses a Duitku callback body. Duitku sends callbacks either as JSON or as a url-encoded form depending on the
/// channel, so the Content-Type header picks the decoder, with a fallback to trying both.
pub fn parse_callback_body(req: &HttpRequest, body: &[u8]) -> Result<CallbackPayload, ServerError> {
    let content_type = req
        .headers()
        .get("Content-Type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_ascii_lowercase();
    let parsed = if content_type.contains("json") {
        serde_json::from_slice::<CallbackPayload>(body).map_err(|e| e.to_string())
    } else if content_type.contains("x-www-form-urlencoded") {
        serde_urlencoded::from_bytes::<CallbackPayload>(body).map_err(|e| e.to_string())
    } else {
        serde_json::from_slice::<CallbackPayload>(body)
            .map_err(|e| e.to_string())
            .or_else(|_| serde_urlencoded::from_bytes::<CallbackPayload>(body).map_err(|e| e.to_string()))
    };
    parsed.map_err(ServerError::InvalidRequestBody)
}

#[cfg(test)]
mod test {
    use actix_web::test::TestRequest;

    use super::*;

    const JSON_BODY: &str = r#"{
        "merchantCode": "D1234",
        "amount": "94350.00",
        "merchantOrderId": "1-TRX-20240601-001-143005",
        "resultCode": "00",
        "signature": "abc123",
        "reference": "D12345REF"
    }"#;

    const FORM_BODY: &str = "merchantCode=D1234&amount=94350.00&merchantOrderId=1-TRX-20240601-001-143005&\
                             resultCode=00&signature=abc123&reference=D12345REF";

    #[test]
    fn parses_json_callbacks() {
        let req = TestRequest::default().insert_header(("Content-Type", "application/json")).to_http_request();
        let payload = parse_callback_body(&req, JSON_BODY.as_bytes()).unwrap();
        assert_eq!(payload.result_code, "00");
        assert_eq!(payload.reference.as_deref(), Some("D12345REF"));
    }

    #[test]
    fn parses_form_callbacks() {
        let req = TestRequest::default()
            .insert_header(("Content-Type", "application/x-www-form-urlencoded"))
            .to_http_request();
        let payload = parse_callback_body(&req, FORM_BODY.as_bytes()).unwrap();
        assert_eq!(payload.merchant_order_id, "1-TRX-20240601-001-143005");
    }

    #[test]
    fn guesses_when_content_type_is_missing() {
        let req = TestRequest::default().to_http_request();
        assert!(parse_callback_body(&req, JSON_BODY.as_bytes()).is_ok());
        assert!(parse_callback_body(&req, FORM_BODY.as_bytes()).is_ok());
    }

    #[test]
    fn rejects_garbage() {
        let req = TestRequest::default().to_http_request();
        let err = parse_callback_body(&req, b"not a callback").unwrap_err();
        assert!(matches!(err, ServerError::InvalidRequestBody(_)));
    }
}
