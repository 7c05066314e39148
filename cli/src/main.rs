mod commands;
mod terminal;

use commands::{CommandLine, Commands, discover, interfaces, scan};
use netsweep_common::config::Config;
use terminal::{logging, print};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let commands = CommandLine::parse_args();

    let cfg = Config {
        no_banner: commands.no_banner,
        quiet: commands.quiet,
        verbose: commands.verbose,
    };

    logging::init_logging(&cfg);
    print::banner(cfg.no_banner, cfg.quiet);

    let result = match commands.command {
        Commands::Interfaces => {
            print::section("network interfaces", cfg.quiet);
            interfaces::interfaces(&cfg)
        }
        Commands::Discover(target) => {
            print::section("getting ready for discovery", cfg.quiet);
            discover::discover(target, &cfg).await
        }
        Commands::Scan(args) => {
            print::section("starting scanner", cfg.quiet);
            scan::scan(args, &cfg).await
        }
    };

    print::rule();
    result
}
