//! `proxbox create-template <release> <template_id>`: cloud image to template.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::services::template::TemplateWorkflow;
use crate::commands::resource_id;
use crate::domain::{ChecksumAlgorithm, ExpectedChecksum, Release, Settings, TemplateRequest};
use crate::infra::fs::LocalFs;
use crate::output::TerminalReporter;

#[derive(Debug, Args)]
pub struct CreateTemplateArgs {
    /// Ubuntu release
    pub release: Release,

    /// Template ID (100-999999999)
    pub template_id: u64,

    /// Template name, [A-Za-z0-9_-] only [default: ubuntu-<release>-template]
    #[arg(short, long)]
    pub name: Option<String>,

    /// Memory in MB [default: from configuration]
    #[arg(short, long)]
    pub memory: Option<u32>,

    /// GB added to the image's disk; 0 keeps its size [default: from configuration]
    #[arg(short, long)]
    pub disk_increase: Option<u32>,

    /// SSH public key to inject via cloud-init
    #[arg(short = 'k', long, value_name = "PATH")]
    pub ssh_key: Option<PathBuf>,

    /// Proxmox storage for the imported disk
    #[arg(short = 's', long)]
    pub data_store: Option<String>,

    /// Keep the downloaded image for later runs
    #[arg(long)]
    pub keep_image: bool,

    /// Expected hex digest of the image; verified after download and before reuse
    #[arg(long, value_name = "HEX")]
    pub checksum: Option<String>,

    /// Digest algorithm for --checksum: sha224, sha256, sha384, or sha512
    #[arg(long, value_name = "ALGORITHM", default_value_t = ChecksumAlgorithm::Sha256)]
    pub checksum_algorithm: ChecksumAlgorithm,
}

impl CreateTemplateArgs {
    fn overrides(&self) -> Settings {
        Settings {
            ssh_key_path: self.ssh_key.clone(),
            data_store: self.data_store.clone(),
            ..Settings::default()
        }
    }
}

/// Run `proxbox create-template`.
///
/// # Errors
///
/// Returns an error if validation fails or any workflow step fails.
pub async fn run(app: &AppContext, args: &CreateTemplateArgs) -> Result<()> {
    let template_id = resource_id(args.template_id)?;
    let config = app.load_config(args.overrides())?;

    let req = TemplateRequest {
        name: args.name.clone(),
        memory_mb: args.memory,
        disk_increase_gb: args.disk_increase,
        keep_image: args.keep_image,
        checksum: args.checksum.as_ref().map(|hex| ExpectedChecksum {
            algorithm: args.checksum_algorithm,
            hex: hex.clone(),
        }),
        ..TemplateRequest::new(args.release, template_id)
    };

    let downloader = app.downloader()?;
    let reporter = TerminalReporter::new(&app.output);
    app.output.header(&format!(
        "Creating template {template_id} from Ubuntu {} ({})",
        args.release.version(),
        args.release
    ));

    TemplateWorkflow::new(
        &app.hypervisor,
        &downloader,
        &LocalFs,
        &LocalFs,
        &reporter,
        &config,
    )
    .create_template(&req)
    .await?;
    Ok(())
}
