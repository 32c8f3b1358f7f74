//! `buildstage` command-line driver.

mod cli;
mod logging;

use anyhow::Result;

use buildstage::config::load_and_validate;
use buildstage::driver::Driver;
use buildstage::ports::BuildPorts;
use buildstage::recovery::{ExitHook, ProcessExitHook};
use buildstage::stages::StageRegistry;

use crate::cli::CliArgs;

/// Exit code for invalid invocations and configuration errors.
const USAGE_EXIT_CODE: i32 = 2;

#[tokio::main]
async fn main() {
    let args = cli::parse();
    if let Err(err) = logging::init_logging(&args) {
        eprintln!("buildstage error: {err:?}");
        std::process::exit(USAGE_EXIT_CODE);
    }
    logging::install_panic_hook();

    if let Err(err) = run_main(args).await {
        tracing::error!("{err:#}");
        ProcessExitHook.exit(USAGE_EXIT_CODE);
    }
}

async fn run_main(args: CliArgs) -> Result<()> {
    let registry = StageRegistry::with_builtins();
    let config = load_and_validate(&args.config, &registry.kinds())?;
    let params = args.params()?;
    let call_site = args.call_site_args()?;

    let ports = BuildPorts::local(&config, args.dry_run);
    let driver = Driver::new(config, ports).with_registry(registry);

    if args.plan {
        print!("{}", driver.plan(&args.stage, &params)?);
        return Ok(());
    }

    tracing::debug!(stage = %args.stage, "Starting run");
    let result = driver.run(&args.stage, params, call_site.as_ref()).await;
    driver.finish(&args.stage, result, &ProcessExitHook);
    Ok(())
}
