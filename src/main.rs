use clap::Parser;
use miette::Result;
use tracing_subscriber::EnvFilter;
use bqt::cli::{Cli, Commands};

fn main() -> Result<()> {
    // Reset SIGPIPE to default behavior (terminate silently) for proper Unix piping.
    // Without this, piping to `head`, `grep -q`, etc. causes a panic on broken pipe.
    #[cfg(unix)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }
    }
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))?;

    let cli = Cli::parse();
    let global = cli.global;

    // RUST_LOG wins; otherwise warnings, or info with --verbose
    let default_level = if global.verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Init(args) => bqt::cli::commands::init::run(args),
        Commands::Build(args) => bqt::cli::commands::build::run(args, &global),
        Commands::Periods(args) => bqt::cli::commands::periods::run(args, &global),
        Commands::History(args) => bqt::cli::commands::history::run(args, &global),
        Commands::Show(args) => bqt::cli::commands::show::run(args, &global),
        Commands::Compare(args) => bqt::cli::commands::compare::run(args, &global),
        Commands::Coverage(args) => bqt::cli::commands::coverage::run(args, &global),
        Commands::Brands(args) => bqt::cli::commands::brands::run(args, &global),
        Commands::Completions(args) => bqt::cli::commands::completions::run(args),
    }
}
