use super::describe::DescribeArgs;
use super::measure::MeasureArgs;
use super::plan::PlanArgs;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a program repeatedly, sampling each run
    Measure(MeasureArgs),
    /// Measure every benchmark listed in a YAML plan
    Plan(PlanArgs),
    /// Print the environment descriptor for this host
    Describe(DescribeArgs),
}
