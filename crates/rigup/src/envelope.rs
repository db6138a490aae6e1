//! Machine-readable response envelope.
//!
//! With `--json`, every command prints exactly one envelope on stdout
//! and the process exit code is 0 iff `success`. Logs go to stderr so
//! the envelope stays parseable.

use serde::Serialize;

/// Envelope layout version.
pub const ENVELOPE_SCHEMA_VERSION: u32 = 1;

/// Error codes consumers may branch on. Anything else is reported as
/// `INTERNAL_ERROR` so new internal failure kinds never leak as new
/// contract surface.
pub const KNOWN_CODES: &[&str] = &[
    "MANIFEST_NOT_FOUND",
    "VERIFY_FAILED",
    "INSTALL_FAILED",
    "SCHEMA_INCOMPATIBLE",
    "MANIFEST_WRITE_FAILED",
];

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub schema_version: u32,
    pub cli_version: &'static str,
    pub command: String,
    pub run_id: String,
    pub timestamp_utc: String,
    pub success: bool,
    pub data: serde_json::Value,
    pub error: Option<EnvelopeError>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvelopeError {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remediation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docs_key: Option<String>,
}

/// An error that already knows its envelope code. Commands raise this
/// for failures whose code no library layer owns (verification, for
/// instance).
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct CodedError {
    pub code: &'static str,
    pub message: String,
}

impl CodedError {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl Envelope {
    pub fn success(
        command: &str,
        run_id: &str,
        timestamp_utc: &str,
        data: serde_json::Value,
    ) -> Self {
        Self {
            schema_version: ENVELOPE_SCHEMA_VERSION,
            cli_version: env!("CARGO_PKG_VERSION"),
            command: command.to_string(),
            run_id: run_id.to_string(),
            timestamp_utc: timestamp_utc.to_string(),
            success: true,
            data,
            error: None,
        }
    }

    pub fn failure(command: &str, run_id: &str, timestamp_utc: &str, err: &anyhow::Error) -> Self {
        Self {
            schema_version: ENVELOPE_SCHEMA_VERSION,
            cli_version: env!("CARGO_PKG_VERSION"),
            command: command.to_string(),
            run_id: run_id.to_string(),
            timestamp_utc: timestamp_utc.to_string(),
            success: false,
            data: serde_json::Value::Null,
            error: Some(envelope_error(err)),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| {
            // Envelope serialization cannot fail for these types; keep a
            // parseable fallback anyway.
            r#"{"success":false,"error":{"code":"INTERNAL_ERROR","message":"envelope serialization failed"}}"#.to_string()
        })
    }
}

/// Map an error to its envelope form: typed errors carry their own
/// codes, everything else is `INTERNAL_ERROR`.
fn envelope_error(err: &anyhow::Error) -> EnvelopeError {
    let code = classify(err);
    let detail = {
        let chain: Vec<String> = err.chain().skip(1).map(|c| c.to_string()).collect();
        if chain.is_empty() {
            None
        } else {
            Some(chain.join(": "))
        }
    };

    EnvelopeError {
        code,
        message: err.to_string(),
        detail,
        remediation: remediation(code).map(|r| r.to_string()),
        docs_key: Some(format!("errors/{}", code.to_lowercase().replace('_', "-"))),
    }
}

fn classify(err: &anyhow::Error) -> &'static str {
    let code = if let Some(coded) = err.downcast_ref::<CodedError>() {
        coded.code
    } else if let Some(core) = err.downcast_ref::<rigup_core::error::Error>() {
        core.code()
    } else if let Some(pkg) = err.downcast_ref::<rigup_pkg::Error>() {
        pkg.code()
    } else {
        "INTERNAL_ERROR"
    };

    if KNOWN_CODES.contains(&code) {
        code
    } else {
        "INTERNAL_ERROR"
    }
}

fn remediation(code: &str) -> Option<&'static str> {
    match code {
        "MANIFEST_NOT_FOUND" => {
            Some("Check the --manifest path, or run from a directory containing manifest.jsonc")
        }
        "SCHEMA_INCOMPATIBLE" => Some("Re-export the bundle with this version of rigup"),
        "INSTALL_FAILED" => Some("Re-run with -v to see the package manager output"),
        "VERIFY_FAILED" => Some("Inspect the failing checks and re-run `rigup restore`"),
        "MANIFEST_WRITE_FAILED" => Some("Check permissions on the manifest directory"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(envelope: &Envelope) -> serde_json::Value {
        serde_json::from_str(&envelope.to_json()).unwrap()
    }

    #[test]
    fn success_envelope_has_null_error() {
        let env = Envelope::success(
            "plan",
            "20260823-120000",
            "2026-08-23T12:00:00Z",
            serde_json::json!({"summary": {"install": 2}}),
        );
        let v = parse(&env);
        assert_eq!(v["schemaVersion"], 1);
        assert_eq!(v["command"], "plan");
        assert_eq!(v["success"], true);
        assert!(v["error"].is_null());
        assert_eq!(v["data"]["summary"]["install"], 2);
    }

    #[test]
    fn typed_core_errors_carry_their_code() {
        let err = anyhow::Error::from(rigup_core::error::Error::manifest_not_found("m.jsonc"));
        let env = Envelope::failure("plan", "r", "t", &err);
        let v = parse(&env);
        assert_eq!(v["success"], false);
        assert_eq!(v["error"]["code"], "MANIFEST_NOT_FOUND");
        assert_eq!(v["error"]["docsKey"], "errors/manifest-not-found");
        assert!(v["error"]["remediation"].is_string());
    }

    #[test]
    fn coded_errors_pass_through() {
        let err = anyhow::Error::from(CodedError::new("VERIFY_FAILED", "2 checks failed"));
        let env = Envelope::failure("restore", "r", "t", &err);
        assert_eq!(env.error.as_ref().unwrap().code, "VERIFY_FAILED");
    }

    #[test]
    fn unknown_codes_collapse_to_internal_error() {
        let err = anyhow::anyhow!("something odd");
        let env = Envelope::failure("plan", "r", "t", &err);
        assert_eq!(env.error.as_ref().unwrap().code, "INTERNAL_ERROR");

        let err = anyhow::Error::from(CodedError::new("MYSTERY_CODE", "x"));
        let env = Envelope::failure("plan", "r", "t", &err);
        assert_eq!(env.error.as_ref().unwrap().code, "INTERNAL_ERROR");
    }

    #[test]
    fn context_chain_lands_in_detail() {
        use anyhow::Context;
        let err = std::fs::read_to_string("/definitely/not/here")
            .context("Failed to load plan file")
            .unwrap_err();
        let env = Envelope::failure("diff", "r", "t", &err);
        let e = env.error.as_ref().unwrap();
        assert_eq!(e.message, "Failed to load plan file");
        assert!(e.detail.is_some());
    }
}
