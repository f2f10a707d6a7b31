use clap::Parser;

use render_dojo::{config::DojoConfig, demos, flow};

fn main() -> anyhow::Result<()> {
    let config = DojoConfig::parse();
    config.validate()?;
    flow::run(config, demos::default_demos())
}
