use async_trait::async_trait;
use serde_json::json;
use serial_test::serial;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::mpsc;
use vpanel_core::{DocumentLayout, ErrorKind};
use vpanel_firewall::{FirewallEvent, RecordingFirewall};
use vpanel_lib::config::{self, ENV_SOFTETHER_PASSWORD};
use vpanel_lib::{Credential, DescriptorForm, Protocol, ProvisioningService, RenderContext};
use vpanel_notifications::{Notifier, NotifyError};
use vpanel_softether::{SoftEtherConfig, SstpStore};
use vpanel_uri::{decode_shadowsocks, decode_vmess, locked_device, unlock};
use vpanel_v2ray::{ShadowsocksStore, VmessStore};

const VMESS_ID: &str = "3b2a6c1e-9d4f-4a7b-8e21-5f0c9d7a1b42";

struct ChannelNotifier(mpsc::UnboundedSender<(String, String)>);

#[async_trait]
impl Notifier for ChannelNotifier {
    async fn notify(&self, title: &str, message: &str) -> Result<(), NotifyError> {
        let _ = self.0.send((title.to_string(), message.to_string()));
        Ok(())
    }
}

struct Harness {
    dir: TempDir,
    service: ProvisioningService,
    firewall: Arc<RecordingFirewall>,
    notes: mpsc::UnboundedReceiver<(String, String)>,
}

fn write_json(path: &Path, value: &serde_json::Value) {
    std::fs::write(path, serde_json::to_string_pretty(value).unwrap()).unwrap();
}

fn unreachable_hub() -> SoftEtherConfig {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    SoftEtherConfig {
        server_url: format!("http://{}/api", addr),
        timeout_secs: 2,
        ..Default::default()
    }
}

fn harness() -> Harness {
    let dir = tempfile::tempdir().unwrap();
    write_json(&dir.path().join("shadowsocks.json"), &json!({ "inbounds": [] }));
    write_json(&dir.path().join("shadowsocks_users.json"), &json!({ "clients": [] }));
    write_json(&dir.path().join("vmess.json"), &json!({
        "inbounds": [{ "port": 443, "protocol": "vmess", "settings": { "clients": [] } }]
    }));
    write_json(&dir.path().join("vmess_users.json"), &json!({ "clients": [] }));

    let layout = DocumentLayout::new(dir.path(), dir.path());
    let firewall = Arc::new(RecordingFirewall::new());
    let (tx, notes) = mpsc::unbounded_channel();
    let service = ProvisioningService::new(
        VmessStore::from_layout(&layout, 443, firewall.clone()),
        ShadowsocksStore::from_layout(&layout, 443, firewall.clone()),
        SstpStore::from_config(&unreachable_hub()).unwrap(),
        RenderContext::new("vpn.example.com", "de", 443),
        Arc::new(ChannelNotifier(tx)),
    );
    Harness {
        dir,
        service,
        firewall,
        notes,
    }
}

async fn next_note(rx: &mut mpsc::UnboundedReceiver<(String, String)>) -> (String, String) {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("notification not sent")
        .expect("channel closed")
}

fn shadowsocks_request(password: &str, device: &str) -> Credential {
    Credential {
        username: "alice".into(),
        device_id: device.into(),
        start_date: "2025-01-01".into(),
        expire_date: "2025-12-31".into(),
        password: password.into(),
        ..Default::default()
    }
}

#[tokio::test]
async fn shadowsocks_lifecycle_notifies_without_secret() {
    let mut h = harness();
    let created = h
        .service
        .create(Protocol::Shadowsocks, shadowsocks_request("abc123", "PHONE"))
        .await
        .unwrap();
    assert_eq!(created.port, 10000);

    let (title, message) = next_note(&mut h.notes).await;
    assert_eq!(title, "shadowsocks credential created");
    assert!(message.contains("****c123"));
    assert!(!message.contains("abc123"));

    let removed = h.service.delete(Protocol::Shadowsocks, "abc123", "PHONE").await.unwrap();
    assert_eq!(removed.port, 10000);
    let (title, _) = next_note(&mut h.notes).await;
    assert_eq!(title, "shadowsocks credential deleted");

    assert_eq!(
        h.firewall.events(),
        vec![FirewallEvent::Opened(10000), FirewallEvent::Closed(10000)]
    );
    assert!(h.service.list(Protocol::Shadowsocks).await.unwrap().is_empty());
}

#[tokio::test]
async fn failed_mutation_sends_nothing() {
    let mut h = harness();
    let err = h
        .service
        .delete(Protocol::Shadowsocks, "missing1", "")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    h.service.flush_notifications().await;
    assert!(h.notes.try_recv().is_err());
}

#[tokio::test]
async fn shadowsocks_descriptor_round_trips() {
    let h = harness();
    h.service
        .create(Protocol::Shadowsocks, shadowsocks_request("abc123", "PHONE"))
        .await
        .unwrap();

    let plain = h
        .service
        .descriptor(Protocol::Shadowsocks, "abc123", DescriptorForm::Plain)
        .await
        .unwrap();
    let decoded = decode_shadowsocks(&plain).unwrap();
    assert_eq!(decoded.method, "aes-128-gcm");
    assert_eq!(decoded.password, "abc123");
    assert_eq!(decoded.host, "vpn.example.com");
    assert_eq!(decoded.port, 10000);
    assert_eq!(decoded.label, "valid before (2025-12-31) vpn-de-c123");

    let locked = h
        .service
        .descriptor(Protocol::Shadowsocks, "abc123", DescriptorForm::Locked)
        .await
        .unwrap();
    let decoded = decode_shadowsocks(&unlock(&locked).unwrap()).unwrap();
    assert_eq!(locked_device(&decoded.label), Some("PHONE"));
}

#[tokio::test]
async fn vmess_descriptor_uses_shared_port() {
    let mut h = harness();
    let created = h
        .service
        .create(
            Protocol::Vmess,
            Credential {
                id: VMESS_ID.into(),
                username: "bob".into(),
                expire_date: "2025-12-31".into(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(created.alter_id, 1);
    assert_eq!(created.port, 443);
    let (_, message) = next_note(&mut h.notes).await;
    assert!(message.starts_with(VMESS_ID));

    let uri = h
        .service
        .descriptor(Protocol::Vmess, VMESS_ID, DescriptorForm::Plain)
        .await
        .unwrap();
    let decoded = decode_vmess(&uri).unwrap();
    assert_eq!(decoded.id, VMESS_ID);
    assert_eq!(decoded.port, "443");
    assert_eq!(decoded.add, "vpn.example.com");
    assert!(decoded.ps.ends_with("vpn-de-1b42"));

    let err = h
        .service
        .descriptor(Protocol::Vmess, VMESS_ID, DescriptorForm::Locked)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MissingDeviceBinding);
    assert!(h.firewall.events().is_empty());
}

#[tokio::test]
async fn sstp_descriptor_is_unsupported_before_any_remote_call() {
    let h = harness();
    let err = h
        .service
        .descriptor(Protocol::Sstp, "alice", DescriptorForm::Plain)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unsupported);
}

#[tokio::test]
async fn sstp_against_unreachable_hub_is_remote_unavailable() {
    let h = harness();
    let err = h.service.list(Protocol::Sstp).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RemoteUnavailable);
    let err = h
        .service
        .edit(Protocol::Sstp, "alice", Credential::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unsupported);
}

#[tokio::test]
async fn edit_reports_previous_and_current() {
    let mut h = harness();
    h.service
        .create(Protocol::Shadowsocks, shadowsocks_request("abc123", "PHONE"))
        .await
        .unwrap();
    next_note(&mut h.notes).await;

    let mut updated = h.service.get(Protocol::Shadowsocks, "abc123").await.unwrap();
    updated.expire_date = "2026-06-30".into();
    let outcome = h.service.edit(Protocol::Shadowsocks, "abc123", updated).await.unwrap();
    assert_eq!(outcome.previous.expire_date, "2025-12-31");
    assert_eq!(outcome.current.expire_date, "2026-06-30");
    assert_eq!(outcome.current.port, 10000);

    let (title, message) = next_note(&mut h.notes).await;
    assert_eq!(title, "shadowsocks credential edited");
    assert!(message.contains("expires 2026-06-30"));
}

#[tokio::test]
async fn startup_check_reports_drift() {
    let h = harness();
    let reports = h.service.startup_check().await.unwrap();
    assert_eq!(reports.len(), 2);
    assert!(reports.iter().all(|r| r.is_consistent()));

    write_json(
        &h.dir.path().join("shadowsocks_users.json"),
        &json!({ "clients": [{ "password": "orphan99", "port": 10003 }] }),
    );
    let reports = h.service.check_consistency().await.unwrap();
    let ss = reports.iter().find(|r| !r.is_consistent()).unwrap();
    assert_eq!(ss.roster_entries, 1);
    assert_eq!(ss.inbound_entries, 0);
    assert_eq!(ss.missing_from_config, vec!["****an99".to_string()]);
}

#[test]
#[serial]
fn default_config_takes_password_from_environment() {
    std::env::set_var(ENV_SOFTETHER_PASSWORD, "hub-secret");
    let cfg = config::default_config();
    std::env::remove_var(ENV_SOFTETHER_PASSWORD);
    assert_eq!(cfg.unwrap().softether.admin_password, "hub-secret");
}

#[tokio::test]
#[serial]
async fn service_builds_from_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vpanel.toml");
    std::fs::write(
        &path,
        format!(
            "[v2ray]\nconfig_dir = {:?}\nroster_dir = {:?}\n\n[firewall]\nenabled = false\n",
            dir.path(),
            dir.path()
        ),
    )
    .unwrap();
    let cfg = config::load_config(&path).unwrap();
    let service = ProvisioningService::from_config(&cfg).unwrap();
    let err = service.list(Protocol::Vmess).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Persistence);
}
