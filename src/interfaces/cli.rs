use crate::domain::model::QueryClass;
use crate::domain::role::{Level, Module};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "iqms")]
#[command(about = "Fetch and cache IQMS query lists for the active role.")]
#[command(version)]
pub struct Cli {
    /// Choose color theme
    #[arg(short = 'T', long, global = true)]
    pub theme: Option<String>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Generate config sample
    #[arg(long)]
    pub generate_config: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Fetch every class for the active role and wait for all pages
    Sync {
        /// Level to sync (defaults to the role's own level)
        #[arg(short, long, value_enum)]
        level: Option<Level>,
    },

    /// Switch the active role and refetch all classes and levels
    SwitchRole {
        #[arg(long)]
        subsection: String,

        #[arg(long, value_enum)]
        module: Module,

        #[arg(long, value_enum)]
        level: Level,

        /// Allocated cells, comma separated
        #[arg(long, value_delimiter = ',')]
        cells: Vec<String>,
    },

    /// Show cached counts for the active role
    Status,

    /// Print cached items of one class
    Show {
        #[arg(value_enum)]
        class: QueryClass,

        /// Level to show (defaults to the role's own level)
        #[arg(short, long, value_enum)]
        level: Option<Level>,
    },

    /// Drop every cached list
    Clear,

    /// Fetch the FAQ list
    Faq,

    /// Fetch the frequency-query count for the active role
    Frequency {
        #[arg(short, long, value_enum)]
        level: Option<Level>,
    },
}
