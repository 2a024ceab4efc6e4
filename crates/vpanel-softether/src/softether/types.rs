use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use vpanel_core::validation::DATE_FORMAT;

pub const JSONRPC_VERSION: &str = "2.0";

/// Header carrying the server administrator password.
pub const ADMIN_PASSWORD_HEADER: &str = "X-VPNADMIN-PASSWORD";

pub const METHOD_CREATE_USER: &str = "CreateUser";
pub const METHOD_DELETE_USER: &str = "DeleteUser";
pub const METHOD_ENUM_USER: &str = "EnumUser";

/// `AuthType_u32` for password authentication.
pub const AUTH_TYPE_PASSWORD: u32 = 1;

/// Per-user bandwidth cap in bits per second, upload and download alike.
pub const USER_BANDWIDTH_LIMIT: u32 = 10_000_000;

// ─── Config ─────────────────────────────────────────────────────────────────

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoftEtherConfig {
    /// JSON-RPC endpoint, e.g. `https://localhost:5555/api`.
    pub server_url: String,
    pub admin_password: String,
    pub hub: String,
    pub timeout_secs: u64,
    /// SoftEther ships a self-signed certificate, so this is opt-in.
    pub verify_tls: bool,
}

impl Default for SoftEtherConfig {
    fn default() -> Self {
        Self {
            server_url: "https://localhost:5555/api".to_string(),
            admin_password: String::new(),
            hub: "default".to_string(),
            timeout_secs: 10,
            verify_tls: false,
        }
    }
}

impl fmt::Debug for SoftEtherConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SoftEtherConfig")
            .field("server_url", &self.server_url)
            .field("admin_password", &"<redacted>")
            .field("hub", &self.hub)
            .field("timeout_secs", &self.timeout_secs)
            .field("verify_tls", &self.verify_tls)
            .finish()
    }
}

// ─── Envelope ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct RpcRequest<'a, P> {
    pub jsonrpc: &'static str,
    pub id: String,
    pub method: &'a str,
    pub params: P,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcResponse {
    #[serde(default)]
    pub jsonrpc: Option<String>,
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<RpcErrorBody>,
}

impl RpcResponse {
    /// The echoed correlation id as text; non-string ids are rendered as JSON.
    pub fn id_text(&self) -> String {
        match &self.id {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RpcErrorBody {
    pub code: i64,
    pub message: String,
}

// ─── Method payloads ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HubParams {
    #[serde(rename = "HubName_str")]
    pub hub_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteUserParams {
    #[serde(rename = "HubName_str")]
    pub hub_name: String,
    #[serde(rename = "Name_str")]
    pub name: String,
}

#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct CreateUserParams {
    #[serde(rename = "HubName_str")]
    pub hub_name: String,
    #[serde(rename = "Name_str")]
    pub name: String,
    #[serde(rename = "Note_utf")]
    pub note: String,
    #[serde(rename = "ExpireTime_dt")]
    pub expire_time: String,
    #[serde(rename = "AuthType_u32")]
    pub auth_type: u32,
    #[serde(rename = "Auth_Password_str")]
    pub password: String,
    #[serde(rename = "UsePolicy_bool")]
    pub use_policy: bool,
    #[serde(rename = "policy:Access_bool")]
    pub policy_access: bool,
    #[serde(rename = "policy:CheckMac_bool")]
    pub policy_check_mac: bool,
    #[serde(rename = "policy:CheckIP_bool")]
    pub policy_check_ip: bool,
    #[serde(rename = "policy:MaxMac_u32")]
    pub policy_max_mac: u32,
    #[serde(rename = "policy:MaxIP_u32")]
    pub policy_max_ip: u32,
    #[serde(rename = "policy:MaxUpload_u32")]
    pub policy_max_upload: u32,
    #[serde(rename = "policy:MaxDownload_u32")]
    pub policy_max_download: u32,
}

impl CreateUserParams {
    /// A password user limited to one MAC and one IP with the default caps.
    pub fn new(hub: &str, name: &str, note: &str, password: &str, expires: NaiveDate) -> Self {
        Self {
            hub_name: hub.to_string(),
            name: name.to_string(),
            note: note.to_string(),
            expire_time: expiry_timestamp(expires),
            auth_type: AUTH_TYPE_PASSWORD,
            password: password.to_string(),
            use_policy: true,
            policy_access: true,
            policy_check_mac: true,
            policy_check_ip: true,
            policy_max_mac: 1,
            policy_max_ip: 1,
            policy_max_upload: USER_BANDWIDTH_LIMIT,
            policy_max_download: USER_BANDWIDTH_LIMIT,
        }
    }
}

impl fmt::Debug for CreateUserParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CreateUserParams")
            .field("hub_name", &self.hub_name)
            .field("name", &self.name)
            .field("note", &self.note)
            .field("expire_time", &self.expire_time)
            .field("password", &"<redacted>")
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EnumUserResult {
    #[serde(rename = "HubName_str")]
    pub hub_name: String,
    #[serde(rename = "UserList")]
    pub users: Vec<RemoteUser>,
}

/// One row of `EnumUser`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RemoteUser {
    #[serde(rename = "Name_str")]
    pub name: String,
    /// Holds the bound device id.
    #[serde(rename = "Note_utf")]
    pub note: String,
    #[serde(rename = "Expires_dt")]
    pub expires: String,
    #[serde(rename = "IsExpiresFilled_bool")]
    pub expires_filled: bool,
}

impl RemoteUser {
    /// Expiry as `YYYY-MM-DD` in the timestamp's own offset; raw text when unparsable.
    pub fn expire_date(&self) -> String {
        normalize_expiry(&self.expires)
    }
}

/// Midnight UTC of `date`, RFC 3339 with second precision.
pub fn expiry_timestamp(date: NaiveDate) -> String {
    let midnight = date.and_time(NaiveTime::MIN).and_utc();
    midnight.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn normalize_expiry(raw: &str) -> String {
    match DateTime::parse_from_rfc3339(raw.trim()) {
        Ok(ts) => ts.date_naive().format(DATE_FORMAT).to_string(),
        Err(_) => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn create_user_params_wire_names() {
        let date = NaiveDate::from_ymd_opt(2025, 12, 31).unwrap();
        let params = CreateUserParams::new("default", "alice", "DEV1", "s3cret", date);
        assert_eq!(
            serde_json::to_value(&params).unwrap(),
            json!({
                "HubName_str": "default",
                "Name_str": "alice",
                "Note_utf": "DEV1",
                "ExpireTime_dt": "2025-12-31T00:00:00Z",
                "AuthType_u32": 1,
                "Auth_Password_str": "s3cret",
                "UsePolicy_bool": true,
                "policy:Access_bool": true,
                "policy:CheckMac_bool": true,
                "policy:CheckIP_bool": true,
                "policy:MaxMac_u32": 1,
                "policy:MaxIP_u32": 1,
                "policy:MaxUpload_u32": 10000000,
                "policy:MaxDownload_u32": 10000000
            })
        );
        assert!(!format!("{:?}", params).contains("s3cret"));
    }

    #[test]
    fn expiry_normalization_keeps_offset_date() {
        assert_eq!(normalize_expiry("2025-03-01T23:30:00+09:00"), "2025-03-01");
        assert_eq!(normalize_expiry("2025-03-01T23:30:00Z"), "2025-03-01");
        assert_eq!(normalize_expiry("never"), "never");
        assert_eq!(normalize_expiry(""), "");
    }

    #[test]
    fn response_id_as_text() {
        let r: RpcResponse =
            serde_json::from_value(json!({ "jsonrpc": "2.0", "id": "abc", "result": {} })).unwrap();
        assert_eq!(r.id_text(), "abc");
        let r: RpcResponse = serde_json::from_value(json!({ "id": 7 })).unwrap();
        assert_eq!(r.id_text(), "7");
        assert!(r.result.is_none());
    }

    #[test]
    fn config_debug_hides_password() {
        let cfg = SoftEtherConfig { admin_password: "topsecret".into(), ..Default::default() };
        assert!(!format!("{:?}", cfg).contains("topsecret"));
        assert_eq!(cfg.hub, "default");
    }
}
