use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "liftoff",
    about = "Liftoff — launch and restart distributed jobs",
    version,
    propagate_version = true,
)]
struct Cli {
    /// Launcher configuration (liftoff.toml). Defaults apply when omitted.
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the archives a job needs at runtime, in discovery order.
    Resolve {
        /// Job descriptor (job.toml)
        #[arg(short, long, default_value = "job.toml")]
        job: String,
        /// Component registry file; may be repeated
        #[arg(short, long)]
        registry: Vec<String>,
        /// Include the components required on secured clusters
        #[arg(long)]
        secure: bool,
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },
    /// Copy a job's library archives, archives and files into a store
    /// directory.
    Stage {
        #[arg(short, long, default_value = "job.toml")]
        job: String,
        /// Local directory backing the shared store
        #[arg(long)]
        root: String,
        /// Application path inside the store
        #[arg(short, long)]
        dest: String,
    },
    /// Carry a prior run's recovery state and checkpoints into a new
    /// application path.
    Migrate {
        /// Local directory backing the shared store
        #[arg(long)]
        root: String,
        /// Application path of the previous run
        #[arg(long)]
        from: String,
        /// Application path of the new run
        #[arg(long)]
        to: String,
        /// Identity of the new run, e.g. application_1700000000000_0002
        #[arg(long)]
        app_id: String,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("liftoff=info".parse()?)
        )
        .init();

    let cli = Cli::parse();
    let config = cli.config.as_deref();

    match cli.command {
        Commands::Resolve { job, registry, secure, format } => {
            commands::resolve::resolve(&job, &registry, secure, config, &format)
        }
        Commands::Stage { job, root, dest } => {
            commands::stage::stage(&job, &root, &dest)
        }
        Commands::Migrate { root, from, to, app_id } => {
            commands::migrate::migrate(&root, &from, &to, &app_id)
        }
    }
}
