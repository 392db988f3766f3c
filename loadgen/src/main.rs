use core::error::Error;

use clap::Parser;
use loadgen::{cfg::Config, cmd::Cmd, report::Report, runtime::Runtime};
use tokio::runtime::Builder;

pub fn main() {
    let cmd = Cmd::parse();

    if let Err(err) = loadgen::logging::init(cmd.verbose as usize) {
        eprintln!("ERROR: failed to initialize logging: {err}");
        std::process::exit(1);
    }

    match run(cmd) {
        Ok(report) => log::info!("FINISHED // {report}"),
        Err(err) => {
            eprintln!("ERROR: {err}");
            std::process::exit(1);
        }
    }
}

fn run(cmd: Cmd) -> Result<Report, Box<dyn Error>> {
    let cfg: Config = cmd.try_into()?;

    let report = Builder::new_multi_thread()
        .enable_io()
        .enable_time()
        .thread_name("loadgen")
        .build()?
        .block_on(async {
            let runtime = Runtime::new(cfg);

            runtime.run().await
        })?;

    Ok(report)
}
