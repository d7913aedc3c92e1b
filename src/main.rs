use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use fleet_dispatch::api::{DispatchApi, HttpDispatchApi};
use fleet_dispatch::backend::Backend;
use fleet_dispatch::config::{BackendConfig, DashboardConfig};
use fleet_dispatch::confirmation::ConfirmationLoop;
use fleet_dispatch::coordinator::{ActionCoordinator, NotificationLevel};
use fleet_dispatch::dashboard::Dashboard;
use fleet_dispatch::model::{Driver, Job, Vehicle};
use fleet_dispatch::shutdown::install_shutdown_handler;

#[derive(Parser, Debug)]
#[command(name = "fleet-dispatch")]
#[command(version)]
#[command(about = "Fleet dispatch dashboard with optimistic updates")]
#[command(propagate_version = true)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Run the reference backend (REST API and position feed)
    Serve(ServeArgs),

    /// Follow the live fleet view until interrupted
    Watch(WatchArgs),

    /// List drivers
    Drivers {
        #[command(flatten)]
        client: ClientArgs,

        /// Show the merged view (vehicle-derived status and job) instead of raw rows
        #[arg(long)]
        effective: bool,
    },

    /// List vehicles
    Vehicles {
        #[command(flatten)]
        client: ClientArgs,
    },

    /// List jobs
    Jobs {
        #[command(flatten)]
        client: ClientArgs,
    },

    /// Act on a driver
    Driver {
        #[command(flatten)]
        client: ClientArgs,

        #[command(subcommand)]
        command: DriverCommands,
    },
}

// =============================================================================
// Arguments
// =============================================================================

#[derive(Parser, Debug)]
struct ServeArgs {
    /// Address to bind both servers on
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port for the REST API
    #[arg(long, default_value = "3002")]
    port: u16,

    /// Port for the websocket position feed
    #[arg(long, default_value = "3001")]
    feed_port: u16,

    /// Milliseconds between position broadcasts
    #[arg(long, default_value = "2000")]
    feed_interval_ms: u64,
}

#[derive(Parser, Debug)]
struct ClientArgs {
    /// Base URL of the REST API
    #[arg(long, short = 'a', default_value = "http://localhost:3002")]
    api_url: String,

    /// Output format
    #[arg(long, short = 'o', default_value = "table")]
    output: OutputFormat,
}

#[derive(Parser, Debug)]
struct WatchArgs {
    #[command(flatten)]
    client: ClientArgs,

    /// Websocket URL of the position feed
    #[arg(long, default_value = "ws://localhost:3001")]
    feed_url: String,

    /// Delay before re-checking pending optimistic updates
    #[arg(long, default_value = "1000")]
    debounce_ms: u64,

    /// Milliseconds between printed views
    #[arg(long, default_value = "5000")]
    print_interval_ms: u64,
}

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(clap::Subcommand, Debug)]
enum DriverCommands {
    /// Assign a job to a driver
    Assign { driver_id: String, job: String },
    /// Reassign a driver to a different job
    Reassign { driver_id: String, job: String },
    /// Mark the driver's job as completed
    Complete { driver_id: String },
    /// Take a driver offline
    Pause { driver_id: String },
    /// Bring a paused driver back
    Resume { driver_id: String },
}

impl DriverCommands {
    fn driver_id(&self) -> &str {
        match self {
            DriverCommands::Assign { driver_id, .. }
            | DriverCommands::Reassign { driver_id, .. }
            | DriverCommands::Complete { driver_id }
            | DriverCommands::Pause { driver_id }
            | DriverCommands::Resume { driver_id } => driver_id,
        }
    }
}

impl ClientArgs {
    fn dashboard_config(&self) -> DashboardConfig {
        DashboardConfig {
            api_url: self.api_url.trim_end_matches('/').to_string(),
            ..DashboardConfig::default()
        }
    }
}

// =============================================================================
// Output
// =============================================================================

fn print_drivers(
    drivers: &[Driver],
    output: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(drivers)?),
        OutputFormat::Table => {
            if drivers.is_empty() {
                println!("No drivers found.");
                return Ok(());
            }
            println!("{:<6} {:<12} {:<9} {:<8} JOB", "ID", "NAME", "STATUS", "VEHICLE");
            println!("{}", "-".repeat(50));
            for driver in drivers {
                println!(
                    "{:<6} {:<12} {:<9} {:<8} {}",
                    driver.id,
                    driver.name,
                    driver.status,
                    driver.vehicle_id.as_deref().unwrap_or("-"),
                    driver.current_job.as_deref().unwrap_or("-"),
                );
            }
        }
    }
    Ok(())
}

fn print_vehicles(
    vehicles: &[Vehicle],
    output: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(vehicles)?),
        OutputFormat::Table => {
            if vehicles.is_empty() {
                println!("No vehicles found.");
                return Ok(());
            }
            println!(
                "{:<6} {:<10} {:<10} {:<9} {:<6} {:<22} JOB",
                "ID", "NAME", "DRIVER", "STATUS", "ROUTE", "POSITION"
            );
            println!("{}", "-".repeat(78));
            for vehicle in vehicles {
                println!(
                    "{:<6} {:<10} {:<10} {:<9} {:<6} {:<22} {}",
                    vehicle.id,
                    vehicle.name,
                    vehicle.driver_name,
                    vehicle.status,
                    vehicle.route,
                    format!("{:.5},{:.5}", vehicle.lat, vehicle.lng),
                    vehicle.job.as_deref().unwrap_or("-"),
                );
            }
        }
    }
    Ok(())
}

fn print_jobs(jobs: &[Job], output: &OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(jobs)?),
        OutputFormat::Table => {
            if jobs.is_empty() {
                println!("No jobs found.");
                return Ok(());
            }
            println!("{:<6} {:<12} {:<8} STATUS", "ID", "TYPE", "DRIVER");
            println!("{}", "-".repeat(40));
            for job in jobs {
                println!(
                    "{:<6} {:<12} {:<8} {}",
                    job.id, job.job_type, job.assigned_to, job.status
                );
            }
        }
    }
    Ok(())
}

// =============================================================================
// Command Handlers
// =============================================================================

async fn run_serve(args: ServeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let rest_addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let feed_addr: SocketAddr = format!("{}:{}", args.host, args.feed_port).parse()?;
    let config =
        BackendConfig::new(rest_addr, feed_addr).with_feed_interval_ms(args.feed_interval_ms);

    tracing::info!(
        rest_addr = %config.rest_addr,
        feed_addr = %config.feed_addr,
        feed_interval_ms = config.feed_interval_ms,
        "Starting fleet-dispatch backend"
    );

    let shutdown = install_shutdown_handler();
    let backend = Backend::bind(config).await?;
    backend.run(shutdown).await?;
    Ok(())
}

async fn run_watch(args: WatchArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = DashboardConfig::new(args.client.api_url.clone(), args.feed_url.clone())
        .with_confirm_debounce_ms(args.debounce_ms);
    let api: Arc<dyn DispatchApi> = Arc::new(HttpDispatchApi::new(&config)?);

    let mut dashboard = Dashboard::new(config, api);
    if let Err(e) = dashboard.load_initial().await {
        tracing::warn!(error = %e, "Initial load failed, waiting for the feed");
    }
    dashboard.start()?;

    let shutdown = install_shutdown_handler();
    let mut ticker = tokio::time::interval(Duration::from_millis(args.print_interval_ms));

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {
                let pending = dashboard.store().optimistic().await.len();
                println!(
                    "feed: {}  pending optimistic updates: {}",
                    dashboard.connection_state(),
                    pending
                );
                print_drivers(&dashboard.effective_drivers().await, &args.client.output)?;
                println!();
            }
        }
    }

    dashboard.shutdown().await;
    Ok(())
}

async fn run_list(client: &ClientArgs, what: ListTarget) -> Result<(), Box<dyn std::error::Error>> {
    let config = client.dashboard_config();
    let api: Arc<dyn DispatchApi> = Arc::new(HttpDispatchApi::new(&config)?);

    match what {
        ListTarget::Drivers { effective } => {
            if effective {
                let dashboard = Dashboard::new(config, api);
                dashboard.load_initial().await?;
                print_drivers(&dashboard.effective_drivers().await, &client.output)?;
            } else {
                print_drivers(&api.fetch_drivers().await?, &client.output)?;
            }
        }
        ListTarget::Vehicles => print_vehicles(&api.fetch_vehicles().await?, &client.output)?,
        ListTarget::Jobs => print_jobs(&api.fetch_jobs().await?, &client.output)?,
    }
    Ok(())
}

enum ListTarget {
    Drivers { effective: bool },
    Vehicles,
    Jobs,
}

/// Runs one action through the coordinator, then gives the backend one
/// debounce period to confirm it before printing the driver's view.
async fn run_driver_action(
    client: &ClientArgs,
    command: DriverCommands,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = client.dashboard_config();
    let debounce = config.confirm_debounce();
    let api: Arc<dyn DispatchApi> = Arc::new(HttpDispatchApi::new(&config)?);

    let dashboard = Dashboard::new(config, api.clone());
    dashboard.load_initial().await?;
    let coordinator: &ActionCoordinator = dashboard.coordinator();
    let mut notifications = coordinator.subscribe_notifications();

    let driver_id = command.driver_id().to_string();
    let accepted = match &command {
        DriverCommands::Assign { driver_id, job } => coordinator.assign_job(driver_id, job).await,
        DriverCommands::Reassign { driver_id, job } => {
            coordinator.reassign_job(driver_id, job).await
        }
        DriverCommands::Complete { driver_id } => coordinator.complete_job(driver_id).await,
        DriverCommands::Pause { driver_id } => {
            coordinator.pause_resume_driver(driver_id, true).await
        }
        DriverCommands::Resume { driver_id } => {
            coordinator.pause_resume_driver(driver_id, false).await
        }
    };

    while let Ok(notification) = notifications.try_recv() {
        match notification.level {
            NotificationLevel::Success => println!("{}", notification.message),
            NotificationLevel::Error => eprintln!("Error: {}", notification.message),
        }
    }

    if accepted && dashboard.store().patch(&driver_id).await.is_some() {
        tokio::time::sleep(debounce).await;
        let confirmation = ConfirmationLoop::new(dashboard.store().clone(), api, debounce);
        if confirmation.confirm_pending().await == 0 {
            eprintln!("Backend has not confirmed the change yet.");
        }
    }

    let view: Vec<Driver> = dashboard
        .effective_drivers()
        .await
        .into_iter()
        .filter(|d| d.id == driver_id)
        .collect();
    print_drivers(&view, &client.output)?;

    if !accepted {
        std::process::exit(1);
    }
    Ok(())
}

// =============================================================================
// Main Entry Point
// =============================================================================

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let default_filter = match args.command {
        Commands::Serve(_) | Commands::Watch(_) => "info",
        _ => "warn",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    match args.command {
        Commands::Serve(serve_args) => run_serve(serve_args).await?,
        Commands::Watch(watch_args) => run_watch(watch_args).await?,
        Commands::Drivers { client, effective } => {
            run_list(&client, ListTarget::Drivers { effective }).await?
        }
        Commands::Vehicles { client } => run_list(&client, ListTarget::Vehicles).await?,
        Commands::Jobs { client } => run_list(&client, ListTarget::Jobs).await?,
        Commands::Driver { client, command } => run_driver_action(&client, command).await?,
    }

    Ok(())
}
