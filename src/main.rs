// Safewalk - companion check-in calls with safe-phrase transfer
// Main entry point

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use safewalk::assistant::{build_config, AssistantConfigurator};
use safewalk::config::{load_config, Config};
use safewalk::logging::init_tracing;
use safewalk::persona::{Persona, PersonaKind, PersonaRegistry};
use safewalk::server::{self, AppState};
use safewalk::vapi::VapiClient;

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// Config file (default: ~/.safewalk/config.toml)
    #[arg(long, global = true, env = "SAFEWALK_CONFIG")]
    config: Option<PathBuf>,

    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server
    Serve {
        /// Address to bind, overrides server.bind_address
        #[arg(long)]
        addr: Option<String>,
    },
    /// Push a persona, safe phrase and transfer number to the assistant
    Configure {
        /// Persona key (mom, dad, female_friend, male_friend)
        #[arg(long)]
        persona: Option<String>,
        /// Extra context to append to the persona (repeatable)
        #[arg(long)]
        context: Vec<String>,
        /// Voice override
        #[arg(long)]
        voice: Option<String>,
    },
    /// Place an outbound call with the configured assistant
    Call {
        /// Destination number in E.164 form
        number: String,
    },
    /// List built-in personas
    Personas {
        /// Print the full prompt for one persona
        #[arg(long)]
        show: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Serve { addr } => run_server(config, addr).await,
        Command::Configure {
            persona,
            context,
            voice,
        } => run_configure(config, persona, context, voice).await,
        Command::Call { number } => run_call(config, &number).await,
        Command::Personas { show } => list_personas(show.as_deref()),
    }
}

fn configurator(config: &Config) -> Result<AssistantConfigurator> {
    let client = VapiClient::new(
        config.token()?,
        config.vapi.base_url.clone(),
        config.request_timeout(),
    )?;
    Ok(AssistantConfigurator::new(Arc::new(client))
        .with_settings(config.model_settings())
        .with_timeout(config.request_timeout()))
}

async fn run_server(mut config: Config, addr: Option<String>) -> Result<()> {
    if let Some(addr) = addr {
        config.server.bind_address = addr;
    }
    config.validate()?;

    let configurator = configurator(&config)?;
    let identity = configurator
        .resolve_identity(config.assistant_id()?)
        .await
        .context("Could not resolve the permanent assistant")?;

    let registry = Arc::new(PersonaRegistry::builtin()?.with_limits(config.registry_limits()));
    let state = AppState::from_config(&config, registry, configurator, identity)?;

    server::serve(
        Arc::new(state),
        &config.server.bind_address,
        config.server.body_limit_bytes,
    )
    .await
}

async fn run_configure(
    config: Config,
    persona: Option<String>,
    context: Vec<String>,
    voice: Option<String>,
) -> Result<()> {
    config.validate()?;
    let persona = persona.unwrap_or_else(|| config.call.persona.clone());

    let registry = PersonaRegistry::builtin()?.with_limits(config.registry_limits());
    for fragment in &context {
        registry.augment(&persona, fragment)?;
    }
    let text = registry.resolve(&persona)?;

    let voice_id = match voice.or_else(|| config.call.voice_id.clone()) {
        Some(v) => v,
        None => registry
            .voice_for(&persona)?
            .map(str::to_string)
            .context("Persona has no default voice; pass --voice")?,
    };

    let assistant_config = build_config(
        text,
        voice_id,
        config.call.safe_phrase.clone(),
        config.transfer_number()?,
    )?;

    let configurator = configurator(&config)?;
    let identity = configurator.resolve_identity(config.assistant_id()?).await?;
    let handle = configurator.apply(&assistant_config, &identity).await?;

    println!("Assistant {} updated with persona '{}'", handle.id, persona);
    Ok(())
}

async fn run_call(config: Config, number: &str) -> Result<()> {
    config.validate()?;

    let configurator = configurator(&config)?;
    let identity = configurator.resolve_identity(config.assistant_id()?).await?;
    let call = configurator
        .place_call(&identity, number, config.phone_id()?)
        .await?;

    println!("Outbound call initiated: {}", call.id);
    Ok(())
}

fn list_personas(show: Option<&str>) -> Result<()> {
    if let Some(key) = show {
        let kind: PersonaKind = key.parse()?;
        let persona = Persona::load_builtin(kind)?;
        println!("{} ({}, voice: {})\n", persona.name, kind, persona.voice_id);
        println!("{}", persona.system_prompt);
        return Ok(());
    }

    for (kind, persona) in Persona::load_all_builtin()? {
        println!(
            "{:<14} {:<8} voice={:<10} {}",
            kind.key(),
            persona.name,
            persona.voice_id,
            persona.description
        );
    }
    Ok(())
}
