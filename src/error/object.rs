//! The externally visible error shape.

use serde::{Deserialize, Serialize};
use std::error::Error as StdError;

use super::{ServiceError, TransportError};

/// Field and message locating the offending part of a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub field: String,
    pub message: String,
}

/// One entry of the `errors` array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorObject {
    /// Correlation id, empty when the request carried none.
    pub id: String,
    pub status: u16,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Source>,
}

/// Wire envelope: `{"errors": [...]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    pub errors: Vec<ErrorObject>,
}

impl From<ErrorObject> for Payload {
    fn from(object: ErrorObject) -> Self {
        Self {
            errors: vec![object],
        }
    }
}

/// Map any error onto the wire shape.
///
/// - `ServiceError`: status and code copied, field/message in `source`.
/// - `TransportError`: status and code copied; field/message in `source` when
///   a field is named, otherwise the message goes to `detail`.
/// - anything else: 500, with the error's own text as the code.
pub fn to_error_object(id: &str, err: &(dyn StdError + 'static)) -> ErrorObject {
    if let Some(service) = err.downcast_ref::<ServiceError>() {
        return ErrorObject {
            id: id.to_string(),
            status: service.status.as_u16(),
            code: service.common.code.clone(),
            detail: None,
            source: Some(Source {
                field: service.field.clone(),
                message: service.common.message.clone(),
            }),
        };
    }

    if let Some(transport) = err.downcast_ref::<TransportError>() {
        let (detail, source) = if transport.field.is_empty() {
            (Some(transport.common.message.clone()), None)
        } else {
            let source = Source {
                field: transport.field.clone(),
                message: transport.common.message.clone(),
            };
            (None, Some(source))
        };
        return ErrorObject {
            id: id.to_string(),
            status: transport.status.as_u16(),
            code: transport.common.code.clone(),
            detail,
            source,
        };
    }

    ErrorObject {
        id: id.to_string(),
        status: 500,
        code: err.to_string(),
        detail: None,
        source: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_service_error_populates_source() {
        let err = ServiceError::new("required", "INVALID_EMAIL", "email", StatusCode::BAD_REQUEST);
        let object = to_error_object("req-1", &err);

        assert_eq!(
            object,
            ErrorObject {
                id: "req-1".into(),
                status: 400,
                code: "INVALID_EMAIL".into(),
                detail: None,
                source: Some(Source {
                    field: "email".into(),
                    message: "required".into(),
                }),
            }
        );
    }

    #[test]
    fn test_transport_error_without_field_uses_detail() {
        let err = TransportError::new("upstream refused connection", "UPSTREAM", "", StatusCode::BAD_GATEWAY);
        let object = to_error_object("req-2", &err);

        assert_eq!(object.status, 502);
        assert_eq!(object.code, "UPSTREAM");
        assert_eq!(object.detail.as_deref(), Some("upstream refused connection"));
        assert!(object.source.is_none());
    }

    #[test]
    fn test_transport_error_with_field_uses_source() {
        let err = TransportError::new(
            "Transport error occurred",
            "TRANSPORT_ERROR",
            "test_field",
            StatusCode::BAD_REQUEST,
        );
        let object = to_error_object("test_id", &err);

        assert_eq!(object.status, 400);
        assert_eq!(object.code, "TRANSPORT_ERROR");
        assert!(object.detail.is_none());
        assert_eq!(
            object.source,
            Some(Source {
                field: "test_field".into(),
                message: "Transport error occurred".into(),
            })
        );
    }

    #[test]
    fn test_generic_error_is_internal() {
        let err = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        let object = to_error_object("", &err);

        assert_eq!(object.id, "");
        assert_eq!(object.status, 500);
        assert_eq!(object.code, "boom");
        assert!(object.detail.is_none());
        assert!(object.source.is_none());
    }

    #[test]
    fn test_boxed_error_is_classified() {
        let boxed: crate::registry::BoxError =
            Box::new(ServiceError::new("taken", "DUPLICATE", "username", StatusCode::CONFLICT));
        let object = to_error_object("req-3", boxed.as_ref());
        assert_eq!(object.status, 409);
        assert_eq!(object.code, "DUPLICATE");
    }

    #[test]
    fn test_payload_omits_empty_fields() {
        let object = ErrorObject {
            id: "req-4".into(),
            status: 500,
            code: "boom".into(),
            detail: None,
            source: None,
        };
        let json = serde_json::to_value(Payload::from(object)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"errors": [{"id": "req-4", "status": 500, "code": "boom"}]})
        );
    }
}
