use crate::config::Config;
use crate::descriptor::EnvironmentDescriptor;
use crate::error::Result;
use crate::log_sink::log_path;
use crate::sampler::SamplerKind;
use clap::Args;
use std::io::Write;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct DescribeArgs {
    #[arg(long, value_enum, default_value_t = SamplerKind::Time)]
    pub sampler: SamplerKind,
    #[arg(long)]
    pub folder: Option<PathBuf>,
    /// Log base name recorded as Test_Result_File
    #[arg(short, long, default_value = "results")]
    pub output_name: String,
}

/// Prints the descriptor a session would write, without touching disk.
pub fn run(args: DescribeArgs, config: &Config, out: &mut impl Write) -> Result<()> {
    let folder = args
        .folder
        .unwrap_or_else(|| config.folder_for(args.sampler).to_path_buf());
    let descriptor = EnvironmentDescriptor::snapshot(&log_path(&folder, &args.output_name));
    out.write_all(&descriptor.to_json()?)?;
    writeln!(out)?;
    Ok(())
}
