//! `supdir` - CLI for the supervisor directory
//!
//! This binary lists and searches supervisors, runs interactive badge
//! sessions, and exports supervisor cards as PNG images.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::io::Write;

use anyhow::{bail, Context};
use clap::Parser;
use tokio::io::BufReader;

use supervisor_directory::card::{CardFlags, CardView};
use supervisor_directory::cli::{
    render, Cli, Command, ConfigCommand, ExportCommand, ListCommand, OutputFormat,
    PaletteCommand, Session, SessionCommand, SessionCommandArgs,
};
use supervisor_directory::{init_logging, load_directory, Badge, Config};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Load configuration
    let config = Config::load_from(cli.config.clone()).context("failed to load configuration")?;

    // Execute the command
    match cli.command {
        Command::List(list_cmd) => handle_list(&config, &list_cmd),
        Command::Palette(palette_cmd) => handle_palette(&config, &palette_cmd),
        Command::Session(session_cmd) => handle_session(&config, &session_cmd).await,
        Command::Export(export_cmd) => handle_export(config, export_cmd).await,
        Command::Config(config_cmd) => handle_config(&config, config_cmd),
    }
}

fn handle_list(config: &Config, cmd: &ListCommand) -> anyhow::Result<()> {
    let mut store = load_directory(config)?;
    if let Some(term) = &cmd.search {
        store.set_search_term(term.as_str());
    }

    let cards: Vec<CardView> = store
        .view()
        .iter()
        .map(|record| CardView::render(record, &CardFlags::default()))
        .collect();

    match cmd.format {
        OutputFormat::Plain => println!(
            "{}",
            render::directory(&cards, store.search_term(), &config.data.last_updated)
        ),
        OutputFormat::Table => println!("{}", render::table(&cards)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&cards)?),
    }
    Ok(())
}

fn handle_palette(config: &Config, cmd: &PaletteCommand) -> anyhow::Result<()> {
    let store = load_directory(config)?;
    if cmd.json {
        let badges: Vec<&Badge> = store.palette().iter().collect();
        println!("{}", serde_json::to_string_pretty(&badges)?);
    } else {
        println!("{}", render::palette(store.palette()));
    }
    Ok(())
}

async fn handle_session(config: &Config, cmd: &SessionCommandArgs) -> anyhow::Result<()> {
    let store = load_directory(config)?;
    let mut session = Session::new(config, store);
    let mut stdout = std::io::stdout();

    match &cmd.script {
        Some(path) => {
            let script = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("failed to read script {}", path.display()))?;
            session.run(script.as_bytes(), &mut stdout, true).await?;
        }
        None => {
            writeln!(stdout, "{}", session.render())?;
            let stdin = BufReader::new(tokio::io::stdin());
            session.run(stdin, &mut stdout, false).await?;
        }
    }
    Ok(())
}

async fn handle_export(mut config: Config, cmd: ExportCommand) -> anyhow::Result<()> {
    if let Some(output) = cmd.output {
        config.export.output_dir = Some(output);
    }
    let store = load_directory(&config)?;
    if store.record(&cmd.email).is_none() {
        bail!("no supervisor with email {}", cmd.email);
    }

    let mut session = Session::new(&config, store);
    session
        .execute(SessionCommand::Export { email: cmd.email }, &mut std::io::stdout())
        .await?;
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Data]");
                println!("  Records path:       {}", config.records_path().display());
                println!(
                    "  Palette path:       {}",
                    config
                        .data
                        .palette_path
                        .as_ref()
                        .map_or_else(|| "(built-in)".to_string(), |p| p.display().to_string())
                );
                println!("  Last updated:       {}", config.data.last_updated);
                println!();
                println!("[Layout]");
                println!(
                    "  Side panel open:    {}",
                    config.layout.side_panel_expanded
                );
                println!();
                println!("[Badges]");
                println!("  Removal:            {:?}", config.badges.removal);
                println!("  Removal delay (ms): {}", config.badges.removal_delay_ms);
                println!();
                println!("[Export]");
                println!("  Output dir:         {}", config.output_dir().display());
                println!("  Scale:              {}", config.export.scale);
                println!("  Use CORS:           {}", config.export.use_cors);
                println!(
                    "  Transparent:        {}",
                    config.export.transparent_background
                );
                println!(
                    "  File name:          <name>{}",
                    config.export.file_suffix
                );
                println!();
                println!("[Raster]");
                println!("  Card width:         {}", config.raster.card_width);
                println!("  CORS hosts:         {}", config.raster.cors_hosts.len());
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
