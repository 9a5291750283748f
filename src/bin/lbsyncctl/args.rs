use clap::{Parser, Subcommand, ValueEnum};

/// Cli interface to lb-sync
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct LbSyncCtlArgs {
    /// Configuration file, same lookup as the daemon
    #[arg(short, long, default_value = "lbsync")]
    pub config: String,
    #[arg(short, long, default_value = "plain")]
    pub out_format: OutFormat,
    /// Environment of the load balancer, required by the event_stack scope
    #[arg(short, long)]
    pub environment: Option<String>,
    #[clap(subcommand)]
    pub subcommand: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutFormat {
    Plain,
    Json
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the desired entries without applying them
    Preview,
    /// Run a single pass and print its report
    Sync,
    /// List the links currently attached to the load balancer
    Entries,
}
