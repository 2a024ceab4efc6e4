//! Credential validation applied before any backend is touched.

use crate::credential::Credential;
use crate::error::{ProvisionError, ProvisionResult};
use crate::protocol::Protocol;
use chrono::NaiveDate;

/// Validity dates are stored as `YYYY-MM-DD`.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Descriptor labels show the last four characters of the identity.
pub const MIN_SECRET_LEN: usize = 4;

/// SoftEther rejects longer user names.
pub const MAX_USERNAME_LEN: usize = 255;

pub fn parse_date(value: &str) -> ProvisionResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|_| {
        ProvisionError::InvalidCredential(format!(
            "date '{}' is not in YYYY-MM-DD form",
            value
        ))
    })
}

/// Check the fields `protocol` relies on.
pub fn validate_credential(protocol: Protocol, credential: &Credential) -> ProvisionResult<()> {
    match protocol {
        Protocol::Vmess => {
            uuid::Uuid::parse_str(credential.id.trim()).map_err(|_| {
                ProvisionError::InvalidCredential(format!(
                    "vmess id '{}' is not a UUID",
                    credential.id
                ))
            })?;
        }
        Protocol::Shadowsocks => validate_secret(&credential.password)?,
        Protocol::Sstp => {
            if credential.username.trim().is_empty() {
                return Err(ProvisionError::InvalidCredential(
                    "sstp accounts need a username".into(),
                ));
            }
            validate_secret(&credential.password)?;
            if credential.expire_date.trim().is_empty() {
                return Err(ProvisionError::InvalidCredential(
                    "sstp accounts need an expire date".into(),
                ));
            }
        }
    }

    if credential.username.chars().count() > MAX_USERNAME_LEN {
        return Err(ProvisionError::InvalidCredential(format!(
            "username longer than {} characters",
            MAX_USERNAME_LEN
        )));
    }

    validate_window(credential)
}

fn validate_secret(secret: &str) -> ProvisionResult<()> {
    if secret.chars().count() < MIN_SECRET_LEN {
        return Err(ProvisionError::InvalidCredential(format!(
            "password must be at least {} characters",
            MIN_SECRET_LEN
        )));
    }
    if secret.chars().any(char::is_whitespace) {
        return Err(ProvisionError::InvalidCredential(
            "password must not contain whitespace".into(),
        ));
    }
    Ok(())
}

fn validate_window(credential: &Credential) -> ProvisionResult<()> {
    let start = non_empty(&credential.start_date).map(parse_date).transpose()?;
    let expire = non_empty(&credential.expire_date).map(parse_date).transpose()?;
    if let (Some(start), Some(expire)) = (start, expire) {
        if expire < start {
            return Err(ProvisionError::InvalidCredential(format!(
                "expire date {} is before start date {}",
                expire, start
            )));
        }
    }
    Ok(())
}

fn non_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}
