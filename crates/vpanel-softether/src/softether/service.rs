//! SSTP credential store backed by a SoftEther hub.
//!
//! A credential maps onto a hub user: `username` is the user name, the
//! device binding is kept in the user's note, and the expire date becomes
//! the account expiry at midnight UTC. Nothing is stored locally.

use crate::softether::api_client::SoftEtherApiClient;
use crate::softether::types::*;
use log::info;
use serde_json::Value;
use vpanel_core::validation::{parse_date, validate_credential};
use vpanel_core::{Credential, Protocol, ProvisionError, ProvisionResult};

#[derive(Debug, Clone)]
pub struct SstpStore {
    client: SoftEtherApiClient,
}

impl SstpStore {
    pub fn new(client: SoftEtherApiClient) -> Self {
        Self { client }
    }

    pub fn from_config(config: &SoftEtherConfig) -> ProvisionResult<Self> {
        Ok(Self::new(SoftEtherApiClient::new(config)?))
    }

    pub async fn create(&self, credential: Credential) -> ProvisionResult<Credential> {
        validate_credential(Protocol::Sstp, &credential)?;
        let expires = parse_date(&credential.expire_date)?;
        let params = CreateUserParams::new(
            self.client.hub(),
            credential.username.trim(),
            credential.device_id.trim(),
            &credential.password,
            expires,
        );
        let _: Value = self.client.call(METHOD_CREATE_USER, params).await?;
        info!("created sstp user {} in hub {}", credential.username, self.client.hub());
        Ok(credential)
    }

    /// Remove user `name` after checking its device binding.
    pub async fn delete(&self, name: &str, device_id: &str) -> ProvisionResult<Credential> {
        let user = self
            .find(name)
            .await?
            .ok_or_else(|| ProvisionError::NotFound(name.to_string()))?;
        if user.note.trim() != device_id.trim() {
            return Err(ProvisionError::Forbidden(format!(
                "device does not match the binding of {}",
                name
            )));
        }

        let params = DeleteUserParams {
            hub_name: self.client.hub().to_string(),
            name: user.name.clone(),
        };
        let _: Value = self.client.call(METHOD_DELETE_USER, params).await?;
        info!("deleted sstp user {} from hub {}", name, self.client.hub());
        Ok(to_credential(&user))
    }

    pub async fn edit(&self, _name: &str, _updated: Credential) -> ProvisionResult<Credential> {
        Err(ProvisionError::Unsupported(
            "sstp users cannot be edited; delete and create instead".into(),
        ))
    }

    pub async fn list(&self) -> ProvisionResult<Vec<Credential>> {
        Ok(self.enumerate().await?.iter().map(to_credential).collect())
    }

    pub async fn get(&self, name: &str) -> ProvisionResult<Credential> {
        self.find(name)
            .await?
            .map(|u| to_credential(&u))
            .ok_or_else(|| ProvisionError::NotFound(name.to_string()))
    }

    async fn enumerate(&self) -> ProvisionResult<Vec<RemoteUser>> {
        let params = HubParams {
            hub_name: self.client.hub().to_string(),
        };
        let result: EnumUserResult = self.client.call(METHOD_ENUM_USER, params).await?;
        Ok(result.users)
    }

    async fn find(&self, name: &str) -> ProvisionResult<Option<RemoteUser>> {
        Ok(self.enumerate().await?.into_iter().find(|u| u.name == name))
    }
}

pub fn to_credential(user: &RemoteUser) -> Credential {
    Credential {
        username: user.name.clone(),
        device_id: user.note.clone(),
        expire_date: user.expire_date(),
        ..Default::default()
    }
}
