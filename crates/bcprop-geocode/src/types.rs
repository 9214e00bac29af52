use bcprop_core::Coordinate;
use serde::{Deserialize, Serialize};

use crate::error::GeocodeError;

/// Best match for one address query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodeResult {
    /// The normalized query text.
    pub address: String,
    pub coordinate: Coordinate,
    pub display_name: String,
    /// Locality reported by the geocoder, used as a municipality hint.
    pub city: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct NominatimPlace {
    pub lat: String,
    pub lon: String,
    #[serde(default)]
    pub display_name: String,
    pub address: Option<NominatimAddress>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct NominatimAddress {
    pub city: Option<String>,
    pub town: Option<String>,
    pub village: Option<String>,
    pub municipality: Option<String>,
    pub state_district: Option<String>,
}

impl NominatimAddress {
    fn locality(&self) -> Option<String> {
        [
            &self.city,
            &self.town,
            &self.village,
            &self.municipality,
            &self.state_district,
        ]
        .into_iter()
        .flatten()
        .map(|s| s.trim())
        .find(|s| !s.is_empty())
        .map(str::to_string)
    }
}

impl NominatimPlace {
    pub(crate) fn into_result(self, query: &str) -> Result<GeocodeResult, GeocodeError> {
        let parse = |value: &str, name: &str| {
            value.trim().parse::<f64>().map_err(|_| GeocodeError::Parse {
                message: format!("invalid {name} '{value}' in geocoder response"),
            })
        };
        let latitude = parse(&self.lat, "lat")?;
        let longitude = parse(&self.lon, "lon")?;
        let coordinate =
            Coordinate::new(latitude, longitude).map_err(|e| GeocodeError::Parse {
                message: e.to_string(),
            })?;
        let city = self.address.as_ref().and_then(NominatimAddress::locality);

        Ok(GeocodeResult {
            address: query.to_string(),
            coordinate,
            display_name: self.display_name,
            city,
        })
    }
}
