//! Point emission sources

use serde::{Deserialize, Serialize};

use crate::core_types::geo::GeoPoint;
use crate::core_types::units::{GramsPerSecond, Meters, MilligramsPerSecond};
use crate::core_types::weather::AtmosphericConditions;

/// Identifier assigned by the store that owns the source list
pub type SourceId = u32;

/// A stack or vent releasing pollutant at a fixed rate
///
/// Sources are created and persisted elsewhere; a calculation pass only reads them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmissionSource {
    /// Store identifier
    pub id: SourceId,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Stack position
    pub position: GeoPoint,
    /// Effective release height above ground
    pub stack_height: Meters,
    /// Emission rate as stored (g/s)
    pub emission_rate: GramsPerSecond,
    /// Per-source meteorology, overriding the pass-wide conditions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meteorology: Option<AtmosphericConditions>,
}

impl EmissionSource {
    /// Create a source with no meteorology override
    pub fn new(id: SourceId, lat: f64, lng: f64, height_m: f64, emission_rate_g_per_s: f64) -> Self {
        Self {
            id,
            name: format!("Source {id}"),
            position: GeoPoint::new(lat, lng),
            stack_height: Meters::new(height_m),
            emission_rate: GramsPerSecond::new(emission_rate_g_per_s),
            meteorology: None,
        }
    }

    /// Same source with a display name
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Same source with its own meteorology
    pub fn with_meteorology(mut self, conditions: AtmosphericConditions) -> Self {
        self.meteorology = Some(conditions);
        self
    }

    /// Emission rate in the unit the plume formula uses
    #[inline]
    #[must_use]
    pub fn emission_mg_per_s(&self) -> MilligramsPerSecond {
        self.emission_rate.to_milligrams_per_second()
    }

    /// Conditions that apply to this source: its override if present, else `pass_wide`
    #[inline]
    #[must_use]
    pub fn conditions<'a>(&'a self, pass_wide: &'a AtmosphericConditions) -> &'a AtmosphericConditions {
        self.meteorology.as_ref().unwrap_or(pass_wide)
    }
}
