//! Telegram-style response envelopes and error classification.

use std::{sync::OnceLock, time::Duration};

use regex::Regex;
use serde::{de::DeserializeOwned, Deserialize};

use tgpurge_core::{errors::Error, Result};

/// Wait applied when a 429 arrives without a duration.
pub const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(1);

#[derive(Debug, Deserialize)]
struct Envelope {
    ok: bool,
    #[serde(default)]
    result: Option<serde_json::Value>,
    #[serde(default)]
    error_code: Option<i64>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    parameters: Option<ResponseParameters>,
}

#[derive(Debug, Deserialize)]
struct ResponseParameters {
    #[serde(default)]
    retry_after: Option<u64>,
}

fn flood_wait_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(?:FLOOD_WAIT_|retry after\s+)(\d+)").expect("valid regex")
    })
}

/// Decode a bridge response body into `T`, mapping failures onto the core
/// error taxonomy.
pub fn decode<T: DeserializeOwned>(method: &str, status: u16, body: &str) -> Result<T> {
    let env: Envelope = match serde_json::from_str(body) {
        Ok(env) => env,
        Err(_) if status == 429 => {
            return Err(Error::RateLimited {
                wait: DEFAULT_RETRY_AFTER,
            })
        }
        Err(e) => {
            return Err(Error::Platform(format!(
                "{method}: undecodable response ({status}): {e}: {}",
                snippet(body)
            )))
        }
    };

    if !env.ok {
        let retry_after = env.parameters.and_then(|p| p.retry_after);
        return Err(classify(
            method,
            env.error_code.unwrap_or(i64::from(status)),
            env.description.as_deref().unwrap_or(""),
            retry_after,
        ));
    }

    let result = env.result.unwrap_or(serde_json::Value::Null);
    serde_json::from_value(result)
        .map_err(|e| Error::Platform(format!("{method}: unexpected result shape: {e}")))
}

/// Map a failed call onto rate-limit, unrecognized-platform or generic errors.
pub fn classify(method: &str, code: i64, description: &str, retry_after: Option<u64>) -> Error {
    let parsed = flood_wait_re()
        .captures(description)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<u64>().ok());

    if let Some(secs) = retry_after.or(parsed) {
        return Error::RateLimited {
            wait: Duration::from_secs(secs),
        };
    }
    if code == 429 {
        return Error::RateLimited {
            wait: DEFAULT_RETRY_AFTER,
        };
    }
    if code >= 500 || description.to_ascii_uppercase().contains("UNKNOWN") {
        return Error::Platform(format!("{method}: {code} {description}"));
    }
    Error::External(format!("{method} failed: {code} {description}"))
}

fn snippet(body: &str) -> String {
    body.chars().take(200).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_envelope_yields_result() {
        let v: Vec<i32> = decode("m", 200, r#"{"ok":true,"result":[1,2,3]}"#).unwrap();
        assert_eq!(v, vec![1, 2, 3]);
        let b: bool = decode("m", 200, r#"{"ok":true,"result":true}"#).unwrap();
        assert!(b);
    }

    #[test]
    fn retry_after_parameter_is_authoritative() {
        let err = decode::<bool>(
            "deleteMessages",
            429,
            r#"{"ok":false,"error_code":429,"description":"Too Many Requests: retry after 17","parameters":{"retry_after":12}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::RateLimited { wait } if wait == Duration::from_secs(12)));
    }

    #[test]
    fn flood_wait_description_is_parsed() {
        let err = classify("searchMessages", 420, "FLOOD_WAIT_35", None);
        assert!(matches!(err, Error::RateLimited { wait } if wait == Duration::from_secs(35)));

        let err = classify("x", 400, "Too Many Requests: retry after 9", None);
        assert!(matches!(err, Error::RateLimited { wait } if wait == Duration::from_secs(9)));
    }

    #[test]
    fn bare_429_uses_default_wait() {
        let err = classify("x", 429, "Too Many Requests", None);
        assert!(matches!(err, Error::RateLimited { wait } if wait == DEFAULT_RETRY_AFTER));
        let err = decode::<bool>("x", 429, "<html>slow down</html>").unwrap_err();
        assert!(err.is_rate_limited());
    }

    #[test]
    fn unknown_and_server_errors_are_platform_errors() {
        assert!(matches!(
            classify("x", 400, "UNKNOWN_METHOD", None),
            Error::Platform(_)
        ));
        assert!(matches!(
            classify("x", 500, "Internal", None),
            Error::Platform(_)
        ));
        assert!(matches!(
            decode::<bool>("x", 200, "not json").unwrap_err(),
            Error::Platform(_)
        ));
        assert!(matches!(
            decode::<Vec<i32>>("x", 200, r#"{"ok":true,"result":{"weird":1}}"#).unwrap_err(),
            Error::Platform(_)
        ));
    }

    #[test]
    fn other_failures_are_generic() {
        let err = decode::<bool>(
            "deleteMessages",
            400,
            r#"{"ok":false,"error_code":400,"description":"MESSAGE_DELETE_FORBIDDEN"}"#,
        )
        .unwrap_err();
        match err {
            Error::External(msg) => assert!(msg.contains("MESSAGE_DELETE_FORBIDDEN")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
