use crate::{
    cli::args::Cli,
    config::{ConfigLoader, ScanConfig, Wordlist},
    engine::{ControlPlane, ReqwestTransport},
    reporters::writer,
    scan::events,
    ui::{app::App, printer, theme::Theme, tui},
    utils::logging,
};
use anyhow::{Context, Result};
use std::io::IsTerminal;
use std::sync::Arc;

pub async fn run(cli: Cli) -> Result<()> {
    // --silent output is meant for pipes, so it always runs headless
    let interactive = !cli.simple && !cli.silent && std::io::stdout().is_terminal();

    let level = logging::level_from_cli(&cli);
    logging::init(level, logging::sink_for(cli.log_file.clone(), interactive))?;

    let file_config = match cli.config.as_deref() {
        Some(path) => ConfigLoader::load_with_custom_path(Some(path))?,
        None => ConfigLoader::load()?,
    };
    let config = ScanConfig::resolve(&cli, &file_config).context("Invalid scan configuration")?;

    // Fail before the UI comes up; start() reloads it for every run
    Wordlist::load(&config.wordlist)?;

    let transport = Arc::new(ReqwestTransport::new(&config).context("Failed to build HTTP client")?);

    let (sender, receiver) = events::channel();
    let plane = ControlPlane::new(config, transport, Some(sender.clone()));

    let technologies = if interactive {
        let mut app = App::new(plane.clone(), sender);
        tui::run(&mut app, &Theme::default(), receiver)
            .await
            .context("Terminal UI failed")?;
        app.technologies().cloned()
    } else {
        printer::run(&plane, receiver, sender, cli.silent).await?
    };

    if let Some(path) = &cli.output {
        writer::write_results(path, &plane.results())
            .with_context(|| format!("Failed to write results to {:?}", path))?;
    }

    if !cli.silent {
        printer::print_summary(&plane, technologies.as_ref());
    }

    Ok(())
}
