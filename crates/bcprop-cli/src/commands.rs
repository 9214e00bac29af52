//! Command handlers. Every command prints pretty JSON on stdout; logs go
//! to stderr.

use bcprop_core::{AppConfig, Coordinate};
use bcprop_lookup::{LookupError, LookupService, OcpCity};
use serde::Serialize;

use crate::Commands;

/// What a `lookup` invocation resolves from.
#[derive(Debug, PartialEq)]
pub(crate) enum LookupInput {
    Point {
        coordinate: Coordinate,
        municipality: Option<String>,
    },
    Address(String),
}

/// Turn the raw `lookup` flags into one input, rejecting incomplete pairs.
pub(crate) fn lookup_input(
    lat: Option<f64>,
    lon: Option<f64>,
    municipality: Option<String>,
    address: Option<String>,
) -> Result<LookupInput, LookupError> {
    match (lat, lon, address) {
        (Some(lat), Some(lon), _) => Ok(LookupInput::Point {
            coordinate: Coordinate::new(lat, lon)?,
            municipality,
        }),
        (None, None, Some(address)) if !address.trim().is_empty() => {
            Ok(LookupInput::Address(address))
        }
        _ => Err(LookupError::MissingInput),
    }
}

pub(crate) async fn run(command: Commands, config: &AppConfig) -> anyhow::Result<()> {
    let service = LookupService::from_config(config)?;
    match command {
        Commands::Lookup {
            lat,
            lon,
            municipality,
            address,
        } => {
            let snapshot = match lookup_input(lat, lon, municipality, address)? {
                LookupInput::Point {
                    coordinate,
                    municipality,
                } => {
                    service
                        .lookup_coordinate(coordinate, municipality.as_deref())
                        .await?
                }
                LookupInput::Address(address) => service.lookup_address(&address).await?,
            };
            if !snapshot.errors.is_empty() {
                tracing::warn!(errors = ?snapshot.errors, "snapshot resolved with provider errors");
            }
            print_json(&snapshot)
        }
        Commands::Zoning {
            lat,
            lon,
            municipality,
        } => {
            let outcome = service
                .zoning(Coordinate::new(lat, lon)?, municipality.as_deref())
                .await?;
            print_json(&outcome)
        }
        Commands::Ocp { city, lat, lon } => {
            let city: OcpCity = city.parse()?;
            let coordinate = match (lat, lon) {
                (Some(lat), Some(lon)) => Some(Coordinate::new(lat, lon)?),
                _ => None,
            };
            print_json(&service.ocp(city, coordinate).await?)
        }
        Commands::Sources => print_json(service.sources().sources()),
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
