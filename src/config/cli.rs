use clap::Parser;
use clio::ClioPath;

/// Recalculates the ZooKeeper quorum addresses in a cluster's yarn-site configuration as part of
/// a cluster upgrade
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub(crate) struct Cli {
    /// Name of the cluster to run the upgrade step against
    #[clap(long)]
    pub(crate) cluster_name: String,

    /// YAML file holding the cluster registry: desired configs and service component hosts of
    /// every cluster. Updated in place once the step completes.
    #[clap(long, value_parser = clap::value_parser!(ClioPath).exists().is_file())]
    pub(crate) cluster_state_file: ClioPath,

    /// Run the step but don't commit anything to the cluster state file
    #[clap(long)]
    pub(crate) dry_run: bool,

    /// Generate a summary
    #[clap(long, value_parser = clap::value_parser!(ClioPath))]
    pub(crate) summary_file: Option<ClioPath>,

    /// Threads to use for the async runtime. Defaults to using as many threads as there are
    /// logical CPUs
    #[clap(long)]
    pub(crate) threads: Option<usize>,
}
