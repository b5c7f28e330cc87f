use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use golftrip::api::AppState;
use golftrip::models::preferences::{
    DiningPreference, FormOptions, GolfBudget, LodgingBudget, Region, TransportType,
};
use golftrip::{
    BookingMailer, GeminiClient, GolfTripConfig, GolfTripError, ItineraryFetcher, TripPreferences,
    logging, web,
};

#[derive(Parser, Debug)]
#[command(name = "golftrip", version, about = "Golf trip itinerary planner")]
struct Cli {
    #[arg(long, global = true, help = "Path to a TOML config file")]
    config: Option<PathBuf>,
    #[arg(long, short, global = true, help = "Enable debug logging")]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the planning web API
    Serve {
        #[arg(long)]
        port: Option<u16>,
    },
    /// Generate an itinerary and print it
    Plan {
        #[command(flatten)]
        trip: PlanArgs,
        #[arg(long, help = "Print the raw JSON document")]
        json: bool,
    },
    /// List the choices offered by the planning form
    Options,
    /// Show the effective configuration
    Config,
}

#[derive(Args, Debug)]
struct PlanArgs {
    #[arg(long, default_value_t = 4)]
    days: u8,
    #[arg(long, default_value_t = 4)]
    golfers: u8,
    /// First day of the trip (YYYY-MM-DD), defaults to 30 days from today
    #[arg(long)]
    start_date: Option<NaiveDate>,
    #[arg(long, value_enum, default_value_t = Region::Mesquite)]
    region: Region,
    #[arg(long, value_enum, default_value_t = GolfBudget::MidRange)]
    golf_budget: GolfBudget,
    #[arg(long, value_enum, default_value_t = LodgingBudget::CondoMidRange)]
    lodging_budget: LodgingBudget,
    #[arg(long, value_enum, default_value_t = DiningPreference::Mix)]
    dining: DiningPreference,
    #[arg(long, value_enum, default_value_t = TransportType::SelfDrive)]
    transport: TransportType,
}

impl From<PlanArgs> for TripPreferences {
    fn from(args: PlanArgs) -> Self {
        let defaults = TripPreferences::default();
        Self {
            days: args.days,
            golfers: args.golfers,
            start_date: args.start_date.unwrap_or(defaults.start_date),
            region: args.region,
            golf_budget: args.golf_budget,
            lodging_budget: args.lodging_budget,
            dining_preference: args.dining,
            transport_type: args.transport,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast_ref::<GolfTripError>() {
                Some(trip_err) => eprintln!("❌ {}", trip_err.user_message()),
                None => eprintln!("❌ {err:#}"),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = GolfTripConfig::load_from_path(cli.config.clone())?;
    logging::init(&config.logging, cli.verbose)?;

    match cli.command {
        Commands::Serve { port } => serve(config, port).await,
        Commands::Plan { trip, json } => plan(&config, trip.into(), json).await,
        Commands::Options => print_options(),
        Commands::Config => print_config(&config, cli.config),
    }
}

async fn serve(mut config: GolfTripConfig, port: Option<u16>) -> Result<()> {
    if let Some(port) = port {
        config.server.port = port;
    }

    let client = GeminiClient::new(&config.gemini)?;
    if config.gemini.api_key.is_none() {
        tracing::warn!("No Gemini API key configured; itinerary requests will be refused");
    }

    let booking = match BookingMailer::new(config.booking.clone()) {
        Ok(mailer) => Some(mailer),
        Err(err) => {
            tracing::warn!("Booking requests disabled: {}", err);
            None
        }
    };

    let state = AppState::new(Arc::new(client), booking);
    web::run(&config.server, state).await
}

async fn plan(config: &GolfTripConfig, preferences: TripPreferences, json: bool) -> Result<()> {
    let client = GeminiClient::new(&config.gemini)?;
    let fetcher = ItineraryFetcher::new(Arc::new(client));

    println!(
        "⛳ Planning a {}-day trip for {} golfer(s) in {} starting {}...",
        preferences.days, preferences.golfers, preferences.region, preferences.start_date
    );

    let trip = fetcher.fetch(&preferences).await?;

    if json {
        let document =
            serde_json::to_string_pretty(&trip).context("Failed to serialize itinerary")?;
        println!("{document}");
    } else {
        println!("\n{trip}");
    }
    Ok(())
}

fn print_options() -> Result<()> {
    let options = FormOptions::new();
    println!("Trip length: {}-{} days", options.min_days, options.max_days);
    println!("Golfers: {}-{}", options.min_golfers, options.max_golfers);
    println!("Regions: {}", options.regions.join(" | "));
    println!("Golf budget: {}", options.golf_budgets.join(" | "));
    println!("Lodging: {}", options.lodging_budgets.join(" | "));
    println!("Dining: {}", options.dining_preferences.join(" | "));
    println!("Transport: {}", options.transport_types.join(" | "));
    Ok(())
}

fn print_config(config: &GolfTripConfig, path: Option<PathBuf>) -> Result<()> {
    let source = path
        .or_else(GolfTripConfig::get_config_path)
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "config.toml".to_string());

    println!("Using config from: {source}");
    println!("Gemini model: {}", config.gemini.model);
    println!(
        "Gemini API key: {}",
        if config.gemini.api_key.is_some() { "configured" } else { "missing" }
    );
    println!("Server: {}:{}", config.server.host, config.server.port);
    println!(
        "Booking email: {}",
        if config.booking.is_configured() { "configured" } else { "disabled" }
    );
    println!("Log level: {} ({})", config.logging.level, config.logging.format);
    Ok(())
}
