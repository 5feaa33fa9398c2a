//! tunekit-merge: fold a LoRA adapter into its base model.

use clap::Parser;
use tunekit_cli::{MergeArgs, commands, logging};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = MergeArgs::parse();
    let _guard = logging::init(
        args.common.verbose,
        args.common.quiet,
        args.common.log_dir.as_deref(),
    )?;

    commands::merge(args).await
}
