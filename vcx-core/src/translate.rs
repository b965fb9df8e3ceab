//! Translation of native callback outcomes into typed results.

use tracing::debug;

use crate::error::{BridgeError, ErrorCode, SUCCESS_MESSAGE, UNKNOWN_ERROR_MESSAGE};
use crate::handle::CommandHandle;
use crate::payload::{Payload, ResultShape};
use crate::registry::{Outcome, PendingCall};

/// Render a human-readable message for `code`.
///
/// Uses the native lookup first. A blank or missing answer falls back to
/// `"Success"` for code zero and to `"Unknown Error"` for everything else.
pub fn render_message(code: ErrorCode, lookup: &dyn Fn(ErrorCode) -> Option<String>) -> String {
    match lookup(code).filter(|message| !message.trim().is_empty()) {
        Some(message) => message,
        None if code.is_success() => SUCCESS_MESSAGE.to_string(),
        None => UNKNOWN_ERROR_MESSAGE.to_string(),
    }
}

/// Map a callback's error code and payload onto an outcome.
pub fn translate(
    code: ErrorCode,
    payload: Payload,
    expected: ResultShape,
    lookup: &dyn Fn(ErrorCode) -> Option<String>,
) -> Outcome {
    if !code.is_success() {
        return Err(BridgeError::Native {
            code,
            message: render_message(code, lookup),
        });
    }

    if payload.shape() == expected {
        Ok(payload)
    } else {
        Err(BridgeError::ShapeMismatch {
            expected,
            actual: payload.shape(),
        })
    }
}

/// Translate a callback outcome and resolve the taken call's sink.
///
/// Returns false if the caller had already stopped waiting.
pub fn resolve(
    command: CommandHandle,
    call: PendingCall,
    code: ErrorCode,
    payload: Payload,
    lookup: &dyn Fn(ErrorCode) -> Option<String>,
) -> bool {
    let outcome = translate(code, payload, call.shape(), lookup);
    let operation = call.operation();
    let elapsed = call.age();
    let delivered = call.resolve(outcome);

    debug!(
        command_handle = %command,
        operation,
        code = code.0,
        response_time_ms = elapsed.as_millis() as u64,
        delivered,
        "Completed pending call"
    );
    delivered
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::oneshot;

    fn known(code: ErrorCode) -> Option<String> {
        match code.0 {
            0 => Some("Success".to_string()),
            1081 => Some("Object is in invalid state for requested operation".to_string()),
            1001 => Some("Unknown Error".to_string()),
            _ => None,
        }
    }

    fn silent(_: ErrorCode) -> Option<String> {
        None
    }

    #[test]
    fn success_keeps_payload() {
        let outcome = translate(
            ErrorCode::SUCCESS,
            Payload::String("hello".into()),
            ResultShape::String,
            &known,
        );
        assert_eq!(outcome.unwrap(), Payload::String("hello".into()));
    }

    #[test]
    fn success_without_result_is_unit() {
        let outcome = translate(ErrorCode::SUCCESS, Payload::Unit, ResultShape::Unit, &known);
        assert_eq!(outcome.unwrap(), Payload::Unit);
    }

    #[test]
    fn failure_uses_native_message() {
        let err = translate(
            ErrorCode::INVALID_STATE,
            Payload::Unit,
            ResultShape::State,
            &known,
        )
        .unwrap_err();
        match err {
            BridgeError::Native { code, message } => {
                assert_eq!(code, ErrorCode::INVALID_STATE);
                assert_eq!(message, "Object is in invalid state for requested operation");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unclassified_code_falls_back() {
        let err = translate(ErrorCode(1001), Payload::Unit, ResultShape::Handle, &known).unwrap_err();
        assert!(matches!(err, BridgeError::Native { ref message, .. } if message == UNKNOWN_ERROR_MESSAGE));

        let err = translate(ErrorCode(424242), Payload::Unit, ResultShape::Handle, &known).unwrap_err();
        assert!(matches!(err, BridgeError::Native { ref message, .. } if message == UNKNOWN_ERROR_MESSAGE));
    }

    #[test]
    fn render_message_fallbacks() {
        assert_eq!(render_message(ErrorCode::SUCCESS, &known), "Success");
        assert_eq!(render_message(ErrorCode::SUCCESS, &silent), "Success");
        assert_eq!(render_message(ErrorCode(1234), &silent), "Unknown Error");
        assert_eq!(render_message(ErrorCode(1234), &|_| Some("  ".to_string())), "Unknown Error");
    }

    #[test]
    fn mismatched_success_payload_is_rejected() {
        let err = translate(ErrorCode::SUCCESS, Payload::Bool(true), ResultShape::Handle, &known)
            .unwrap_err();
        assert!(matches!(err, BridgeError::ShapeMismatch { .. }));
    }

    #[tokio::test]
    async fn resolve_delivers_once() {
        let (tx, rx) = oneshot::channel();
        let call = PendingCall::new(tx, ResultShape::Handle, "vcx_connection_create");

        let delivered = resolve(
            CommandHandle::from_raw(1 << 24 | 1),
            call,
            ErrorCode::SUCCESS,
            Payload::Handle(77),
            &known,
        );
        assert!(delivered);
        assert_eq!(rx.await.unwrap().unwrap(), Payload::Handle(77));
    }

    #[test]
    fn resolve_reports_abandoned_caller() {
        let (tx, rx) = oneshot::channel();
        drop(rx);
        let call = PendingCall::new(tx, ResultShape::Unit, "vcx_create_wallet");
        assert!(!resolve(
            CommandHandle::from_raw(1 << 24 | 2),
            call,
            ErrorCode::SUCCESS,
            Payload::Unit,
            &known,
        ));
    }
}
