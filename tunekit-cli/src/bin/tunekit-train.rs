//! tunekit-train: LoRA/QLoRA supervised fine-tuning.

use clap::Parser;
use tunekit_cli::{TrainArgs, commands, logging};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = TrainArgs::parse();
    let _guard = logging::init(
        args.common.verbose,
        args.common.quiet,
        args.common.log_dir.as_deref(),
    )?;

    commands::train(args).await
}
