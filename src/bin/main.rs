use std::process;

use clap::Parser;
use logger::Logger;
use parser::Cli;

fn main() {
    let cli = Cli::parse();
    Logger::init(cli.verbose + u8::from(!cli.quiet));

    if let Err(e) = cli.serialize() {
        log::warn!("Failed to serialize command line arguments: {e}");
    }

    if let Err(e) = pfp_rs::run(cli) {
        log::error!("{e:?}");
        process::exit(1);
    }
}
