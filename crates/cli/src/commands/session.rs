//! Session from the environment.
//!
//! Tokens are issued by the backend's auth service; the CLI only carries one.
//!
//! # Environment Variables
//!
//! - `BAZAAR_USER_ID` - Authenticated user id
//! - `BAZAAR_ACCESS_TOKEN` - Access token for that user
//! - `BAZAAR_USER_ROLE` - `customer` (default) or `admin`
//! - `BAZAAR_TOKEN_EXPIRES_AT` - RFC 3339 expiry (default: one hour from now)

use bazaar_client::{Role, Session};
use bazaar_core::UserId;
use chrono::{DateTime, Duration, Utc};
use secrecy::SecretString;

use super::CliError;

/// Build the session described by the environment, if any.
///
/// # Errors
///
/// Returns `CliError::InvalidArgument` if only one of user id and token is
/// set, or if the role or expiry cannot be parsed.
pub fn from_env() -> Result<Option<Session>, CliError> {
    from_lookup(|key| std::env::var(key).ok())
}

fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Option<Session>, CliError> {
    let user_id = lookup("BAZAAR_USER_ID").filter(|v| !v.trim().is_empty());
    let token = lookup("BAZAAR_ACCESS_TOKEN").filter(|v| !v.trim().is_empty());

    let (user_id, token) = match (user_id, token) {
        (None, None) => return Ok(None),
        (Some(user_id), Some(token)) => (user_id, token),
        (Some(_), None) => {
            return Err(CliError::InvalidArgument(
                "BAZAAR_USER_ID is set but BAZAAR_ACCESS_TOKEN is missing".to_string(),
            ));
        }
        (None, Some(_)) => {
            return Err(CliError::InvalidArgument(
                "BAZAAR_ACCESS_TOKEN is set but BAZAAR_USER_ID is missing".to_string(),
            ));
        }
    };

    let role = lookup("BAZAAR_USER_ROLE")
        .map(|value| value.parse::<Role>())
        .transpose()
        .map_err(CliError::InvalidArgument)?
        .unwrap_or_default();

    let expires_at = lookup("BAZAAR_TOKEN_EXPIRES_AT")
        .map(|value| {
            DateTime::parse_from_rfc3339(value.trim())
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| CliError::InvalidArgument(format!("BAZAAR_TOKEN_EXPIRES_AT: {e}")))
        })
        .transpose()?
        .unwrap_or_else(|| Utc::now() + Duration::hours(1));

    let session = Session::new(UserId::new(user_id), SecretString::from(token), expires_at, role);
    if session.is_expired(Utc::now()) {
        tracing::warn!(user_id = %session.user_id, "Access token has expired");
    }
    Ok(Some(session))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let pairs: Vec<(String, String)> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| {
            pairs
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
        }
    }

    #[test]
    fn test_no_session() {
        assert!(from_lookup(lookup(&[])).unwrap().is_none());
    }

    #[test]
    fn test_full_session() {
        let session = from_lookup(lookup(&[
            ("BAZAAR_USER_ID", "u-1"),
            ("BAZAAR_ACCESS_TOKEN", "token"),
            ("BAZAAR_USER_ROLE", "admin"),
            ("BAZAAR_TOKEN_EXPIRES_AT", "2030-01-01T00:00:00Z"),
        ]))
        .unwrap()
        .unwrap();
        assert_eq!(session.user_id, UserId::new("u-1"));
        assert!(session.is_admin());
        assert_eq!(session.expires_at.to_rfc3339(), "2030-01-01T00:00:00+00:00");
    }

    #[test]
    fn test_half_configured_session_is_rejected() {
        assert!(from_lookup(lookup(&[("BAZAAR_USER_ID", "u-1")])).is_err());
        assert!(from_lookup(lookup(&[("BAZAAR_ACCESS_TOKEN", "t")])).is_err());
    }

    #[test]
    fn test_bad_role() {
        let result = from_lookup(lookup(&[
            ("BAZAAR_USER_ID", "u-1"),
            ("BAZAAR_ACCESS_TOKEN", "token"),
            ("BAZAAR_USER_ROLE", "owner"),
        ]));
        assert!(matches!(result, Err(CliError::InvalidArgument(_))));
    }
}
