use chrono::Utc;
use fabric_core::{AuthContext, ErrorCode, FabricError, FabricResult, Passport};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// How inbound calls are authenticated. `Disabled` accepts everything as
/// an anonymous principal — intended for local development only.
#[derive(Clone)]
pub enum AuthMode {
    PreSharedKey { token: String },
    Passport { trusted_keys: std::collections::HashMap<String, String> },
    Disabled,
}

/// Verifies an `Authorization` header against the configured mode,
/// producing the `AuthContext` the dispatch core consumes. Never parses
/// dispatch arguments — only the header.
pub fn verify(mode: &AuthMode, authorization: Option<&str>) -> FabricResult<AuthContext> {
    match mode {
        AuthMode::Disabled => Ok(AuthContext::None),
        AuthMode::PreSharedKey { token } => verify_pre_shared_key(token, authorization),
        AuthMode::Passport { trusted_keys } => verify_passport(trusted_keys, authorization),
    }
}

fn bearer_token(authorization: Option<&str>) -> Option<&str> {
    authorization?.strip_prefix("Bearer ")
}

fn verify_pre_shared_key(expected: &str, authorization: Option<&str>) -> FabricResult<AuthContext> {
    let Some(presented) = bearer_token(authorization) else {
        return Err(FabricError::new(ErrorCode::AuthDenied, "missing bearer token"));
    };
    let matches: bool = expected.as_bytes().ct_eq(presented.as_bytes()).into();
    if matches {
        Ok(AuthContext::PreSharedKey { principal_id: None, key_id: None })
    } else {
        Err(FabricError::new(ErrorCode::AuthInvalid, "bearer token does not match"))
    }
}

/// Passports travel as the bearer token, base64-free: a JSON object
/// matching [`Passport`]'s shape, so the header stays a single opaque
/// string rather than a structured credential split across headers.
fn verify_passport(
    trusted_keys: &std::collections::HashMap<String, String>,
    authorization: Option<&str>,
) -> FabricResult<AuthContext> {
    let Some(raw) = bearer_token(authorization) else {
        return Err(FabricError::new(ErrorCode::AuthDenied, "missing bearer token"));
    };
    let passport: Passport = serde_json::from_str(raw)
        .map_err(|e| FabricError::new(ErrorCode::AuthInvalid, format!("malformed passport: {e}")))?;

    if passport.expiry < Utc::now() {
        return Err(FabricError::new(ErrorCode::AuthExpired, "passport has expired"));
    }

    let secret = trusted_keys
        .get(&passport.key_id)
        .ok_or_else(|| FabricError::new(ErrorCode::AuthInvalid, format!("unknown key id '{}'", passport.key_id)))?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| FabricError::new(ErrorCode::ConfigError, format!("invalid passport key: {e}")))?;
    mac.update(signing_payload(&passport).as_bytes());
    let expected = hex::encode(mac.finalize().into_bytes());

    let valid: bool = expected.as_bytes().ct_eq(passport.signature.as_bytes()).into();
    if !valid {
        return Err(FabricError::new(ErrorCode::AuthInvalid, "passport signature does not verify"));
    }

    Ok(AuthContext::Passport {
        principal_id: passport.principal_id,
        passport_id: passport.passport_id,
        key_id: passport.key_id,
    })
}

fn signing_payload(passport: &Passport) -> String {
    format!("{}:{}:{}", passport.principal_id, passport.passport_id, passport.expiry.to_rfc3339())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::collections::HashMap;

    #[test]
    fn psk_accepts_matching_token() {
        let mode = AuthMode::PreSharedKey { token: "secret".to_string() };
        let ctx = verify(&mode, Some("Bearer secret")).unwrap();
        assert!(matches!(ctx, AuthContext::PreSharedKey { .. }));
    }

    #[test]
    fn psk_missing_token_is_auth_denied() {
        let mode = AuthMode::PreSharedKey { token: "secret".to_string() };
        let err = verify(&mode, None).unwrap_err();
        assert_eq!(err.code(), ErrorCode::AuthDenied);
    }

    #[test]
    fn psk_wrong_token_is_auth_invalid() {
        let mode = AuthMode::PreSharedKey { token: "secret".to_string() };
        let err = verify(&mode, Some("Bearer wrong")).unwrap_err();
        assert_eq!(err.code(), ErrorCode::AuthInvalid);
    }

    fn signed_passport(secret: &str, expiry: chrono::DateTime<Utc>) -> Passport {
        let mut passport = Passport {
            principal_id: "alice".to_string(),
            passport_id: "p1".to_string(),
            key_id: "k1".to_string(),
            signature: String::new(),
            expiry,
        };
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(signing_payload(&passport).as_bytes());
        passport.signature = hex::encode(mac.finalize().into_bytes());
        passport
    }

    #[test]
    fn passport_with_valid_signature_is_accepted() {
        let mut trusted_keys = HashMap::new();
        trusted_keys.insert("k1".to_string(), "shh".to_string());
        let mode = AuthMode::Passport { trusted_keys };
        let passport = signed_passport("shh", Utc::now() + Duration::minutes(5));
        let header = format!("Bearer {}", serde_json::to_string(&passport).unwrap());
        let ctx = verify(&mode, Some(&header)).unwrap();
        assert_eq!(ctx.principal_id(), Some("alice"));
    }

    #[test]
    fn passport_expired_is_auth_expired() {
        let mut trusted_keys = HashMap::new();
        trusted_keys.insert("k1".to_string(), "shh".to_string());
        let mode = AuthMode::Passport { trusted_keys };
        let passport = signed_passport("shh", Utc::now() - Duration::minutes(5));
        let header = format!("Bearer {}", serde_json::to_string(&passport).unwrap());
        let err = verify(&mode, Some(&header)).unwrap_err();
        assert_eq!(err.code(), ErrorCode::AuthExpired);
    }

    #[test]
    fn passport_bad_signature_is_auth_invalid() {
        let mut trusted_keys = HashMap::new();
        trusted_keys.insert("k1".to_string(), "shh".to_string());
        let mode = AuthMode::Passport { trusted_keys };
        let mut passport = signed_passport("shh", Utc::now() + Duration::minutes(5));
        passport.signature = "0".repeat(64);
        let header = format!("Bearer {}", serde_json::to_string(&passport).unwrap());
        let err = verify(&mode, Some(&header)).unwrap_err();
        assert_eq!(err.code(), ErrorCode::AuthInvalid);
    }
}
