use clap::Args;

use crate::common::CommonArgs;

#[derive(Args)]
pub struct DefaultsArgs {
    #[command(flatten)]
    common_args: CommonArgs,
}

impl DefaultsArgs {
    pub fn run(&self) -> anyhow::Result<()> {
        let defaults = self.common_args.install_defaults()?;
        println!("{}", serde_json::to_string_pretty(&defaults)?);
        Ok(())
    }
}
