//! Response classification.
//!
//! The backend reports failures inconsistently: some are plain HTTP 401s,
//! others arrive as HTTP 200 with an error-shaped body such as
//! `{ "code": 401, "message": "인증 토큰이 필요합니다" }`. Every rule lives
//! in [`AUTH_RULES`] so call sites never inspect bodies themselves.

use serde_json::Value as JsonValue;

/// Outcome of inspecting one HTTP response.
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    /// Payload with any `{ "result": ... }` envelope removed.
    Success(JsonValue),
    BusinessError { status: u16, message: String },
    AuthError { message: String },
}

/// One way a response can signal an authentication failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthSignal {
    /// HTTP status code.
    HttpStatus(u16),
    /// Numeric or string `code`/`status` field in the body.
    BodyCode(u16),
    /// Phrase contained in a message field, compared case-insensitively
    /// with all whitespace removed.
    MessagePhrase(&'static str),
}

/// Any match classifies the response as [`Classification::AuthError`].
pub const AUTH_RULES: &[AuthSignal] = &[
    AuthSignal::HttpStatus(401),
    AuthSignal::HttpStatus(403),
    AuthSignal::BodyCode(401),
    AuthSignal::BodyCode(403),
    AuthSignal::MessagePhrase("인증 토큰이 필요"),
    AuthSignal::MessagePhrase("인증이 필요"),
    AuthSignal::MessagePhrase("토큰이 만료"),
    AuthSignal::MessagePhrase("세션이 만료"),
    AuthSignal::MessagePhrase("유효하지 않은 토큰"),
    AuthSignal::MessagePhrase("authentication token required"),
    AuthSignal::MessagePhrase("authentication required"),
    AuthSignal::MessagePhrase("session expired"),
    AuthSignal::MessagePhrase("token expired"),
];

/// Message fields in resolution order.
const MESSAGE_FIELDS: [&str; 3] = ["errorMessage", "message", "error"];

/// Fields carrying a status-like code.
const CODE_FIELDS: [&str; 2] = ["code", "status"];

/// Classify a response.
///
/// `body` is the parsed JSON (None for empty or non-JSON bodies); `raw` is
/// the body text, consulted for auth phrases when there is no JSON.
#[must_use]
pub fn classify(status: u16, body: Option<&JsonValue>, raw: &str) -> Classification {
    if let Some(message) = match_auth(status, body, raw) {
        return Classification::AuthError { message };
    }

    if !(200..300).contains(&status) || body.is_some_and(is_error_envelope) {
        return Classification::BusinessError {
            status,
            message: resolve_message(status, body),
        };
    }

    Classification::Success(unwrap_envelope(body))
}

fn match_auth(status: u16, body: Option<&JsonValue>, raw: &str) -> Option<String> {
    let codes = body.map(body_codes).unwrap_or_default();
    let messages: Vec<&str> = match body {
        Some(body) => message_fields(body).collect(),
        None if !raw.trim().is_empty() => vec![raw],
        None => Vec::new(),
    };

    let matched = AUTH_RULES.iter().any(|rule| match *rule {
        AuthSignal::HttpStatus(code) => status == code,
        AuthSignal::BodyCode(code) => codes.contains(&code),
        AuthSignal::MessagePhrase(phrase) => {
            let phrase = normalize(phrase);
            messages.iter().any(|m| normalize(m).contains(&phrase))
        }
    });

    matched.then(|| resolve_message(status, body))
}

/// Whether a 2xx body still describes a failure.
///
/// Matches `isSuccess: false`, a present `errorMessage` or
/// `baseResponseStatus`, or a numeric code of 400 and above.
#[must_use]
pub fn is_error_envelope(body: &JsonValue) -> bool {
    let Some(obj) = body.as_object() else {
        return false;
    };

    if obj.get("isSuccess").and_then(JsonValue::as_bool) == Some(false) {
        return true;
    }
    if ["errorMessage", "baseResponseStatus"]
        .iter()
        .any(|k| obj.get(*k).is_some_and(|v| !v.is_null()))
    {
        return true;
    }
    body_codes(body).iter().any(|code| *code >= 400)
}

/// First present message field, else `HTTP <status>`.
#[must_use]
pub fn resolve_message(status: u16, body: Option<&JsonValue>) -> String {
    body.and_then(|b| message_fields(b).next())
        .map(str::to_owned)
        .unwrap_or_else(|| format!("HTTP {status}"))
}

fn message_fields(body: &JsonValue) -> impl Iterator<Item = &str> {
    MESSAGE_FIELDS
        .iter()
        .filter_map(move |k| body.get(*k).and_then(JsonValue::as_str))
        .filter(|s| !s.trim().is_empty())
}

fn body_codes(body: &JsonValue) -> Vec<u16> {
    CODE_FIELDS
        .iter()
        .filter_map(|k| body.get(*k))
        .filter_map(parse_code)
        .collect()
}

/// `401`, `"401"` and prefixed forms such as `"COMMON401"` all map to 401.
fn parse_code(value: &JsonValue) -> Option<u16> {
    match value {
        JsonValue::Number(n) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
        JsonValue::String(s) => {
            let s = s.trim();
            let digits_start = s
                .char_indices()
                .rev()
                .take_while(|(_, c)| c.is_ascii_digit())
                .last()
                .map(|(i, _)| i)?;
            let digits = &s[digits_start..];
            if digits.len() == 3 {
                digits.parse().ok()
            } else {
                None
            }
        }
        _ => None,
    }
}

fn unwrap_envelope(body: Option<&JsonValue>) -> JsonValue {
    match body {
        Some(JsonValue::Object(obj)) if obj.contains_key("result") => {
            obj.get("result").cloned().unwrap_or(JsonValue::Null)
        }
        Some(other) => other.clone(),
        None => JsonValue::Null,
    }
}

fn normalize(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Lenient JSON parse: empty or malformed bodies become `None`.
pub(crate) fn parse_body(raw: &str) -> Option<JsonValue> {
    if raw.trim().is_empty() {
        return None;
    }
    serde_json::from_str(raw).ok()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn auth(message: &str) -> Classification {
        Classification::AuthError {
            message: message.into(),
        }
    }

    #[test]
    fn http_200_with_auth_code_body_is_auth_error() {
        let body = json!({ "code": 401, "message": "인증 토큰이 필요합니다" });
        assert_eq!(
            classify(200, Some(&body), &body.to_string()),
            auth("인증 토큰이 필요합니다")
        );
    }

    #[test]
    fn plain_401_and_403_are_auth_errors() {
        assert_eq!(classify(401, Some(&json!({})), "{}"), auth("HTTP 401"));
        assert_eq!(classify(403, None, ""), auth("HTTP 403"));
    }

    #[test]
    fn string_codes_map_to_status() {
        let body = json!({ "isSuccess": false, "code": "COMMON403", "message": "forbidden" });
        assert_eq!(classify(200, Some(&body), ""), auth("forbidden"));

        let body = json!({ "status": "401" });
        assert_eq!(classify(200, Some(&body), ""), auth("HTTP 200"));
    }

    #[test]
    fn message_phrase_ignores_case_and_spacing() {
        let body = json!({ "error": "Session   EXPIRED, please log in" });
        assert!(matches!(
            classify(400, Some(&body), ""),
            Classification::AuthError { .. }
        ));

        let body = json!({ "errorMessage": "인증토큰이 필요합니다." });
        assert!(matches!(
            classify(200, Some(&body), ""),
            Classification::AuthError { .. }
        ));
    }

    #[test]
    fn auth_phrase_in_plain_text_body() {
        assert_eq!(
            classify(200, None, "세션이 만료되었습니다"),
            auth("HTTP 200")
        );
    }

    #[test]
    fn business_error_message_priority() {
        let body = json!({ "error": "e", "message": "m", "errorMessage": "em" });
        assert_eq!(
            classify(500, Some(&body), ""),
            Classification::BusinessError {
                status: 500,
                message: "em".into()
            }
        );

        let body = json!({ "error": "e", "message": "m" });
        assert_eq!(
            classify(400, Some(&body), ""),
            Classification::BusinessError {
                status: 400,
                message: "m".into()
            }
        );

        assert_eq!(
            classify(502, None, "<html>bad gateway</html>"),
            Classification::BusinessError {
                status: 502,
                message: "HTTP 502".into()
            }
        );
    }

    #[test]
    fn error_envelope_on_200_is_business_error() {
        let body = json!({ "isSuccess": false, "code": "FAMILY404", "message": "가족을 찾을 수 없습니다" });
        assert_eq!(
            classify(200, Some(&body), ""),
            Classification::BusinessError {
                status: 200,
                message: "가족을 찾을 수 없습니다".into()
            }
        );

        let body = json!({ "baseResponseStatus": "INVALID_TICKET", "message": "bad ticket" });
        assert!(matches!(
            classify(200, Some(&body), ""),
            Classification::BusinessError { .. }
        ));
    }

    #[test]
    fn success_unwraps_result_envelope() {
        let body = json!({ "isSuccess": true, "code": "COMMON200", "message": "성공", "result": { "id": "m1" } });
        assert_eq!(
            classify(200, Some(&body), ""),
            Classification::Success(json!({ "id": "m1" }))
        );

        let body = json!([{ "id": "n1" }]);
        assert_eq!(
            classify(200, Some(&body), ""),
            Classification::Success(json!([{ "id": "n1" }]))
        );

        assert_eq!(classify(204, None, ""), Classification::Success(JsonValue::Null));
    }

    #[test]
    fn result_null_unwraps_to_null() {
        let body = json!({ "result": null });
        assert_eq!(classify(200, Some(&body), ""), Classification::Success(JsonValue::Null));
    }

    #[test]
    fn parse_code_forms() {
        assert_eq!(parse_code(&json!(401)), Some(401));
        assert_eq!(parse_code(&json!("403")), Some(403));
        assert_eq!(parse_code(&json!("COMMON200")), Some(200));
        assert_eq!(parse_code(&json!("OK")), None);
        assert_eq!(parse_code(&json!("ERR4011")), None);
        assert_eq!(parse_code(&json!(-1)), None);
    }

    #[test]
    fn parse_body_is_lenient() {
        assert_eq!(parse_body(""), None);
        assert_eq!(parse_body("  \n"), None);
        assert_eq!(parse_body("not json"), None);
        assert_eq!(parse_body("{\"a\":1}"), Some(json!({ "a": 1 })));
    }
}
