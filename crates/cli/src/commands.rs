use clap::Subcommand;

#[derive(Subcommand)]
pub enum Commands {
    /// Pull everything an origin exports into a database
    Run {
        /// Origin name, e.g. "discord"
        #[arg(long)]
        origin: String,

        /// Alias of the API connection to pull from
        #[arg(long)]
        input: String,

        /// Alias of the database connection to write to
        #[arg(long)]
        output: String,
    },
    /// Resolve a configured connection and ping it
    TestConn {
        #[arg(long)]
        alias: String,
    },
    /// List the available origins and what they export
    Origins,
}
