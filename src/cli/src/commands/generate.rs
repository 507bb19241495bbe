//! Run the flattening pipeline for the parsed CLI.

use cfs_gen_core::error::Result;
use cfs_gen_core::CancelFlag;
use cfs_gen_runtime::{ConverterTool, DockerCli, Pipeline};

use super::Cli;
use crate::output;

pub async fn execute(cli: Cli) -> Result<()> {
    let request = cli.request()?;
    let config = cli.pipeline_config()?;

    let engine = DockerCli::new(config.engine.clone());
    let converter = ConverterTool::new(config.converter.clone(), config.page_align);

    let cancel = CancelFlag::new();
    let signal_flag = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping after the current layer");
            signal_flag.cancel();
        }
    });

    let report = Pipeline::new(&engine, &converter, &config)
        .with_cancel(cancel)
        .run(&request)
        .await?;

    if cli.history {
        output::print_history(&report.history);
    }

    if request.dry_run {
        print!("{}", report.manifest);
        return Ok(());
    }

    if !cli.quiet {
        output::print_summary(&report);
    }
    if let Some(image) = &report.output {
        if cli.quiet {
            println!("{image}");
        } else {
            println!("Created cfs image with tag: {image}");
        }
    }

    Ok(())
}
