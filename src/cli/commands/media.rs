use crate::cli::args::UploadArgs;
use crate::cli::commands::build_services;
use crate::config::model::RuntimeConfig;
use crate::error::Result;
use crate::media::upload_disk_media;
use crate::types::RunMode;

pub fn run_upload_command(config: &RuntimeConfig, args: &UploadArgs, run_mode: RunMode) -> Result<()> {
    let services = build_services(config, run_mode)?;
    upload_disk_media(services.cluster.as_ref(), &args.filename)?;
    Ok(())
}
