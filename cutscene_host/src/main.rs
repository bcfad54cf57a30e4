use anyhow::Result;

mod cli;
mod config;
mod detection;
mod runtime;
mod triggers;

fn main() -> Result<()> {
    env_logger::init();
    let args = cli::parse()?;
    runtime::execute(args)
}
