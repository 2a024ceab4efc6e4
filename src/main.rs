//! vpanel - provision vmess, shadowsocks and SSTP credentials
//!
//! Every command prints JSON on stdout. Failures print
//! `{"error": <kind>, "message": <text>}` on stderr and exit non-zero.

use clap::{Args, Parser, Subcommand};
use log::{error, warn};
use serde::Serialize;
use serde_json::json;
use std::path::PathBuf;
use std::process::ExitCode;
use vpanel_lib::config::{self, ConfigError};
use vpanel_lib::{
    init_logging, Credential, DescriptorForm, Protocol, ProvisionError, ProvisioningService,
};

#[derive(Parser)]
#[command(name = "vpanel")]
#[command(version)]
#[command(about = "Credential provisioning for v2ray and SoftEther")]
struct Cli {
    /// Path to configuration file (defaults apply when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compare every v2ray document pair
    Check,
    /// List stored credentials
    List { protocol: Protocol },
    /// Provision a new credential
    Create {
        protocol: Protocol,
        #[command(flatten)]
        fields: CredentialArgs,
    },
    /// Change a stored credential; omitted fields keep their value
    Edit {
        protocol: Protocol,
        identity: String,
        #[command(flatten)]
        fields: CredentialArgs,
    },
    /// Remove a credential
    Delete {
        protocol: Protocol,
        identity: String,
        /// Device the credential is bound to
        #[arg(long, default_value = "")]
        device: String,
    },
    /// Print the connection descriptor of a credential
    Uri {
        protocol: Protocol,
        identity: String,
        /// Bind the descriptor to the credential's device
        #[arg(long)]
        locked: bool,
    },
}

#[derive(Args, Default)]
struct CredentialArgs {
    /// vmess client id (generated when empty)
    #[arg(long)]
    id: Option<String>,
    /// shadowsocks or SSTP secret (generated for shadowsocks when empty)
    #[arg(long)]
    password: Option<String>,
    #[arg(long)]
    username: Option<String>,
    #[arg(long)]
    device: Option<String>,
    /// YYYY-MM-DD
    #[arg(long)]
    start: Option<String>,
    /// YYYY-MM-DD
    #[arg(long)]
    expire: Option<String>,
}

impl CredentialArgs {
    fn apply(self, credential: &mut Credential) {
        let CredentialArgs {
            id,
            password,
            username,
            device,
            start,
            expire,
        } = self;
        if let Some(v) = id {
            credential.id = v;
        }
        if let Some(v) = password {
            credential.password = v;
        }
        if let Some(v) = username {
            credential.username = v;
        }
        if let Some(v) = device {
            credential.device_id = v;
        }
        if let Some(v) = start {
            credential.start_date = v;
        }
        if let Some(v) = expire {
            credential.expire_date = v;
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Provision(#[from] ProvisionError),

    #[error("Failed to encode output: {0}")]
    Output(#[from] serde_json::Error),
}

impl CliError {
    fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::Provision(e) => e.kind().as_str(),
            Self::Output(_) => "output",
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("{}", json!({ "error": e.kind(), "message": e.to_string() }));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => config::default_config()?,
    };
    if let Err(e) = init_logging(&config.logging) {
        eprintln!("{}", e);
    }

    let service = ProvisioningService::from_config(&config)?;
    if !matches!(cli.command, Command::Check) {
        if let Err(e) = service.startup_check().await {
            warn!("startup consistency check failed: {}", e);
        }
    }

    let result = execute(&service, cli.command).await;
    service.flush_notifications().await;
    result
}

async fn execute(service: &ProvisioningService, command: Command) -> Result<(), CliError> {
    match command {
        Command::Check => print(&service.check_consistency().await?),
        Command::List { protocol } => print(&service.list(protocol).await?),
        Command::Create { protocol, fields } => {
            let mut credential = Credential::default();
            fields.apply(&mut credential);
            print(&service.create(protocol, credential).await?)
        }
        Command::Edit {
            protocol,
            identity,
            fields,
        } => {
            let mut credential = service.get(protocol, &identity).await?;
            fields.apply(&mut credential);
            print(&service.edit(protocol, &identity, credential).await?)
        }
        Command::Delete {
            protocol,
            identity,
            device,
        } => print(&service.delete(protocol, &identity, &device).await?),
        Command::Uri {
            protocol,
            identity,
            locked,
        } => {
            let form = if locked { DescriptorForm::Locked } else { DescriptorForm::Plain };
            let uri = service.descriptor(protocol, &identity, form).await?;
            print(&json!({ "uri": uri }))
        }
    }
}

fn print<T: Serialize>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_every_command() {
        Cli::try_parse_from(["vpanel", "check"]).unwrap();
        Cli::try_parse_from(["vpanel", "-c", "panel.toml", "list", "vmess"]).unwrap();
        Cli::try_parse_from(["vpanel", "list", "3"]).unwrap();
        Cli::try_parse_from([
            "vpanel",
            "create",
            "shadowsocks",
            "--expire",
            "2025-12-31",
            "--device",
            "PHONE",
        ])
        .unwrap();
        Cli::try_parse_from(["vpanel", "edit", "vmess", "some-id", "--username", "bob"]).unwrap();
        Cli::try_parse_from(["vpanel", "delete", "sstp", "alice", "--device", "PHONE"]).unwrap();
        Cli::try_parse_from(["vpanel", "uri", "vmess", "some-id", "--locked"]).unwrap();
    }

    #[test]
    fn unknown_protocol_is_rejected() {
        assert!(Cli::try_parse_from(["vpanel", "list", "wireguard"]).is_err());
    }

    #[test]
    fn omitted_flags_keep_existing_fields() {
        let mut c = Credential {
            username: "alice".into(),
            expire_date: "2025-01-01".into(),
            ..Default::default()
        };
        CredentialArgs {
            expire: Some("2026-01-01".into()),
            ..Default::default()
        }
        .apply(&mut c);
        assert_eq!(c.username, "alice");
        assert_eq!(c.expire_date, "2026-01-01");
    }

    #[test]
    fn error_kind_follows_provision_error() {
        let e = CliError::from(ProvisionError::NotFound("x".into()));
        assert_eq!(e.kind(), "not_found");
    }
}
