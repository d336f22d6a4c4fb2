//! Database seeder for Pagu development and testing.
//!
//! Seeds a handful of units with ceilings, resets the cycle to the Initial
//! stage and prints one bearer token per role for local API calls.
//!
//! Usage: cargo run --bin seeder

use pagu_core::context::{CycleSettings, Unit};
use pagu_core::store::ProposalStore;
use pagu_db::PgProposalStore;
use pagu_shared::types::UnitId;
use pagu_shared::{AppConfig, JwtConfig, JwtService, Role};
use rust_decimal::Decimal;
use uuid::Uuid;

/// Development units: code, name and ceiling.
const UNITS: [(&str, &str, i64); 4] = [
    ("TI", "Informatics", 1_000_000_000),
    ("LIB", "Library", 250_000_000),
    ("AKT-D3", "Accounting Diploma", 600_000_000),
    ("LPPM", "Research and Community Service", 900_000_000),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;

    println!("Connecting to database...");
    let db = pagu_db::connect_with(&config.database).await?;
    let store = PgProposalStore::new(db);

    println!("Seeding units...");
    seed_units(&store).await?;

    println!("Resetting cycle settings...");
    store.save_settings(&CycleSettings::default()).await?;

    println!("Issuing development tokens...");
    print_tokens(&config)?;

    println!("Seeding complete!");
    Ok(())
}

/// Creates or refreshes the development units.
async fn seed_units(store: &PgProposalStore) -> anyhow::Result<()> {
    for (code, name, ceiling) in UNITS {
        let unit = Unit {
            id: UnitId::parse(code)?,
            name: name.to_string(),
            ceiling: Decimal::from(ceiling),
            active: true,
        };
        store.upsert_unit(&unit).await?;
        println!("  {code}: ceiling {ceiling}");
    }
    Ok(())
}

/// Prints a token for a reviewer, an administrator and the first unit.
fn print_tokens(config: &AppConfig) -> anyhow::Result<()> {
    let minutes = i64::try_from(config.jwt.access_token_expiry_secs / 60)?;
    let jwt = JwtService::new(JwtConfig {
        secret: config.jwt.secret.clone(),
        access_token_expires_minutes: minutes,
    });

    let first_unit = UnitId::parse(UNITS[0].0)?;
    let tokens = [
        ("unit", Role::Unit, Some(first_unit)),
        ("reviewer", Role::Reviewer, None),
        ("administrator", Role::Administrator, None),
    ];
    for (label, role, unit) in tokens {
        let token = jwt.issue_access_token(Uuid::new_v4(), role, unit)?;
        println!("  {label}: {token}");
    }
    Ok(())
}
