use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::io;

use property_ops::records::{apartment, maintenance, tenant};
use property_ops::{
    dashboard, telemetry, AppConfig, ApartmentStatus, CredentialStore, Gateway,
    MaintenanceStatus, NewApartment, NewMaintenance, NewTenant, Session, TriageClassifier,
    ValuationEngine,
};

#[derive(Parser)]
#[command(name = "property-ops", version, about = "Property operations console")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct Login {
    #[arg(long, short = 'u')]
    user: String,
    #[arg(long, short = 'p')]
    password: String,
}

#[derive(Subcommand)]
enum Command {
    /// Create an operator account
    Signup(Login),
    /// Check credentials
    Login(Login),
    /// Estimate an apartment price
    Predict {
        #[arg(long)]
        location: String,
        /// Square feet
        #[arg(long, default_value_t = 500.0)]
        area: f64,
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..=5))]
        bathrooms: u32,
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..=5))]
        bedrooms: u32,
    },
    /// Show the priority a maintenance description would get
    Triage { description: Vec<String> },
    /// Headline counts
    Dashboard(Login),
    Tenants {
        #[command(flatten)]
        login: Login,
        #[command(subcommand)]
        action: TenantAction,
    },
    Apartments {
        #[command(flatten)]
        login: Login,
        #[command(subcommand)]
        action: ApartmentAction,
    },
    Maintenance {
        #[command(flatten)]
        login: Login,
        #[command(subcommand)]
        action: MaintenanceAction,
    },
}

#[derive(Subcommand)]
enum TenantAction {
    List {
        /// Dump the raw table as CSV
        #[arg(long)]
        csv: bool,
    },
    Add {
        first_name: String,
        last_name: String,
        phone_number: String,
        email: String,
    },
    UpdateEmail { id: i64, email: String },
    Delete { id: i64 },
}

#[derive(Subcommand)]
enum ApartmentAction {
    List {
        #[arg(long)]
        csv: bool,
    },
    Add {
        apartment_number: String,
        building: String,
        floor: i64,
        room_count: i64,
        #[arg(default_value = "Available")]
        status: ApartmentStatus,
    },
    UpdateStatus { id: i64, status: ApartmentStatus },
    Delete { id: i64 },
}

#[derive(Subcommand)]
enum MaintenanceAction {
    List {
        #[arg(long)]
        csv: bool,
    },
    Add {
        apartment_id: i64,
        description: String,
        #[arg(default_value = "Due")]
        status: MaintenanceStatus,
    },
    UpdateStatus { id: i64, status: MaintenanceStatus },
    Delete { id: i64 },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    match cli.command {
        Command::Predict {
            location,
            area,
            bathrooms,
            bedrooms,
        } => {
            if area < 300.0 {
                bail!("area must be at least 300 square feet");
            }
            let engine = ValuationEngine::load(
                &config.valuation.columns_path,
                &config.valuation.model_path,
            )?;
            let price = engine.predict(&location, area, bathrooms, bedrooms);
            if engine.schema().location_index(&location).is_none() {
                println!("⚠️  Unknown location '{}', using baseline estimate", location);
            }
            println!("🏠 Estimated apartment price: {:.2}", price);
        }
        Command::Triage { description } => {
            let classifier = TriageClassifier::new();
            let text = description.join(" ");
            let priority = classifier.classify(&text);
            println!("Assigned priority: {}", priority);
        }
        command => run_with_store(command, &config)?,
    }

    Ok(())
}

fn run_with_store(command: Command, config: &AppConfig) -> Result<()> {
    let gateway = Gateway::open(&config.database_path)
        .with_context(|| format!("Failed to open database {:?}", config.database_path))?;
    let store = CredentialStore::new(&gateway);

    match command {
        Command::Signup(login) => {
            store.register(&login.user, &login.password)?;
            println!("✓ Account created successfully");
        }
        Command::Login(login) => {
            let session = authenticate(&store, &login)?;
            println!("✓ Logged in successfully. Welcome, {}!", session.username());
        }
        Command::Dashboard(login) => {
            let session = authenticate(&store, &login)?;
            let summary = dashboard::summary(&gateway, &session)?;
            println!("📊 Dashboard");
            println!("   Occupied apartments:       {}", summary.occupied_apartments);
            println!("   Total tenants:             {}", summary.total_tenants);
            println!("   Maintenance due:           {}", summary.maintenance_due);
            println!("   High priority maintenance: {}", summary.high_priority_due);
        }
        Command::Tenants { login, action } => {
            let session = authenticate(&store, &login)?;
            run_tenants(&gateway, &session, action)?;
        }
        Command::Apartments { login, action } => {
            let session = authenticate(&store, &login)?;
            run_apartments(&gateway, &session, action)?;
        }
        Command::Maintenance { login, action } => {
            let session = authenticate(&store, &login)?;
            run_maintenance(&gateway, &session, action)?;
        }
        // Handled in main without opening the store
        Command::Predict { .. } | Command::Triage { .. } => {}
    }

    Ok(())
}

fn authenticate(store: &CredentialStore<'_>, login: &Login) -> Result<Session> {
    match store.login(&login.user, &login.password) {
        Some(session) => Ok(session),
        None => bail!("Invalid credentials"),
    }
}

fn dump_csv(gateway: &Gateway, query: &str) -> Result<()> {
    let table = gateway.fetch_all(query, [])?;
    table.write_csv(io::stdout())
}

fn run_tenants(gateway: &Gateway, session: &Session, action: TenantAction) -> Result<()> {
    match action {
        TenantAction::List { csv: true } => dump_csv(gateway, "SELECT * FROM tenants")?,
        TenantAction::List { csv: false } => {
            let tenants = tenant::list(gateway, session)?;
            if tenants.is_empty() {
                println!("No tenants found");
            }
            for t in tenants {
                println!(
                    "{:>4}  {} {}  {}  {}",
                    t.id, t.first_name, t.last_name, t.phone_number, t.email
                );
            }
        }
        TenantAction::Add {
            first_name,
            last_name,
            phone_number,
            email,
        } => {
            let id = tenant::add(
                gateway,
                session,
                &NewTenant {
                    first_name,
                    last_name,
                    phone_number,
                    email,
                },
            )?;
            println!("✓ Tenant {} added", id);
        }
        TenantAction::UpdateEmail { id, email } => {
            tenant::update_email(gateway, session, id, &email)?;
            println!("✓ Tenant {} email updated", id);
        }
        TenantAction::Delete { id } => {
            tenant::delete(gateway, session, id)?;
            println!("✓ Tenant {} deleted", id);
        }
    }
    Ok(())
}

fn run_apartments(gateway: &Gateway, session: &Session, action: ApartmentAction) -> Result<()> {
    match action {
        ApartmentAction::List { csv: true } => dump_csv(gateway, "SELECT * FROM apartments")?,
        ApartmentAction::List { csv: false } => {
            let apartments = apartment::list(gateway, session)?;
            if apartments.is_empty() {
                println!("No apartments found");
            }
            for a in apartments {
                println!(
                    "{:>4}  {} / {}  floor {}  {} rooms  {}",
                    a.id, a.building, a.apartment_number, a.floor, a.room_count, a.status
                );
            }
        }
        ApartmentAction::Add {
            apartment_number,
            building,
            floor,
            room_count,
            status,
        } => {
            let id = apartment::add(
                gateway,
                session,
                &NewApartment {
                    apartment_number,
                    building,
                    floor,
                    room_count,
                    status,
                },
            )?;
            println!("✓ Apartment {} added", id);
        }
        ApartmentAction::UpdateStatus { id, status } => {
            apartment::update_status(gateway, session, id, status)?;
            println!("✓ Apartment {} is now {}", id, status);
        }
        ApartmentAction::Delete { id } => {
            apartment::delete(gateway, session, id)?;
            println!("✓ Apartment {} deleted", id);
        }
    }
    Ok(())
}

fn run_maintenance(gateway: &Gateway, session: &Session, action: MaintenanceAction) -> Result<()> {
    match action {
        MaintenanceAction::List { csv: true } => dump_csv(gateway, "SELECT * FROM maintenance")?,
        MaintenanceAction::List { csv: false } => {
            let records = maintenance::list(gateway, session)?;
            if records.is_empty() {
                println!("No maintenance records found");
            }
            for r in records {
                println!(
                    "{:>4}  apt {:<4} {:<10} {:<10} {}",
                    r.id,
                    r.apartment_id,
                    r.status.as_str(),
                    r.priority_marker(),
                    r.description
                );
            }
        }
        MaintenanceAction::Add {
            apartment_id,
            description,
            status,
        } => {
            let classifier = TriageClassifier::new();
            let (id, priority) = maintenance::add(
                gateway,
                session,
                &NewMaintenance {
                    apartment_id,
                    description,
                    status,
                },
                &classifier,
            )?;
            println!("✓ Maintenance record {} added ({})", id, priority);
        }
        MaintenanceAction::UpdateStatus { id, status } => {
            maintenance::update_status(gateway, session, id, status)?;
            println!("✓ Maintenance record {} is now {}", id, status);
        }
        MaintenanceAction::Delete { id } => {
            maintenance::delete(gateway, session, id)?;
            println!("✓ Maintenance record {} deleted", id);
        }
    }
    Ok(())
}
