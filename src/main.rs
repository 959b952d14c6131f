use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use aquabook::config::AppConfig;
use aquabook::models::catalog;
use aquabook::models::{Field, Role};
use aquabook::services::booking::{SubmitError, SUBMIT_SUCCESS_MESSAGE};
use aquabook::services::navigation::LogNavigator;
use aquabook::state::AppState;

const USAGE: &str = "usage:
  aquabook login <email> <password>
  aquabook register <name> <email> <password> [role]
  aquabook logout
  aquabook catalog
  aquabook book field=value...
fields: product, service_type, address, description, visit_date, visit_time";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some((command, rest)) = args.split_first() else {
        anyhow::bail!("{USAGE}");
    };

    if command == "catalog" {
        print_catalog();
        return Ok(());
    }

    let config = AppConfig::from_env()?;
    tracing::info!(api = %config.api_base_url, "using booking backend");
    let state = AppState::from_config(config)?;

    match (command.as_str(), rest) {
        ("login", [email, password]) => {
            let route = state.auth().login(email, password).await?;
            println!("Login successful, continue to {}", route.as_str());
        }
        ("register", [name, email, password, role @ ..]) if role.len() <= 1 => {
            let role = role.first().map(|r| Role::parse(r));
            let route = state.auth().register(name, email, password, role).await?;
            println!("Registration successful, continue to {}", route.as_str());
        }
        ("logout", []) => {
            state.auth().logout().await?;
            println!("Logged out");
        }
        ("book", assignments) => book(&state, assignments).await?,
        _ => anyhow::bail!("{USAGE}"),
    }

    Ok(())
}

async fn book(state: &AppState, assignments: &[String]) -> anyhow::Result<()> {
    let engine = state.booking_engine(Arc::new(LogNavigator));

    for assignment in assignments {
        let Some((name, value)) = assignment.split_once('=') else {
            anyhow::bail!("expected field=value, got {assignment:?}");
        };
        let Some(field) = Field::parse(name) else {
            anyhow::bail!("unknown field {name:?}");
        };
        engine.set_field(field, value);
    }

    let form = engine.form();
    if !form.product.is_empty() && !catalog::is_known_product(&form.product) {
        tracing::warn!(product = %form.product, "product is not in the catalog");
    }
    if !form.service_type.is_empty() && !catalog::is_known_service_type(&form.service_type) {
        tracing::warn!(service_type = %form.service_type, "service type is not in the catalog");
    }

    match engine.submit().await {
        Ok(()) => {
            println!("{SUBMIT_SUCCESS_MESSAGE}");
            Ok(())
        }
        Err(SubmitError::Invalid(errors)) => {
            for (field, message) in &errors {
                eprintln!("  {field}: {message}");
            }
            anyhow::bail!("booking form has {} invalid field(s)", errors.len())
        }
        Err(e) => Err(e.into()),
    }
}

fn print_catalog() {
    println!("Products: {}", catalog::PRODUCTS.join(", "));
    println!("Service types: {}", catalog::SERVICE_TYPES.join(", "));
    println!();
    for service in &catalog::SERVICES {
        println!(
            "{:<20} {:>6}  {}",
            service.title,
            service.price_display(),
            service.description
        );
    }
}
