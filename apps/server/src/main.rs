use anyhow::Context;
use quill::kernel::config::{env, load_settings};
use quill_logger::Logger;
use quill_server::Server;

#[quill_runtime::main(high_performance)]
async fn main() -> anyhow::Result<()> {
    let debug = std::env::var(env::DEBUG).is_ok_and(|raw| env::parse_debug_flag(&raw));
    let bootstrap = Logger::builder().name(env!("CARGO_PKG_NAME")).debug(debug);

    // Settings configure the global logger, so their own warnings go to the console
    let settings = bootstrap
        .scope(|| load_settings(std::env::var("QUILL_CONFIG").ok()))?
        .context("Critical: Configuration is malformed")?;

    let mut logger = Logger::builder().name(env!("CARGO_PKG_NAME")).debug(settings.debug);
    if let Some(dir) = &settings.logging.directory {
        logger = logger.directory(dir).json(settings.logging.json);
    }
    if let Some(directives) = &settings.logging.directives {
        logger = logger.directives(directives);
    }
    let _log = logger.init()?;

    Server::builder().settings(settings).build().await?.run().await
}
