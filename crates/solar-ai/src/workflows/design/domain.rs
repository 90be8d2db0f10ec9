use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier wrapper for submitted design jobs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DesignJobId(pub String);

impl fmt::Display for DesignJobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Roof construction the array will be mounted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoofType {
    Tilted,
    Flat,
    Metal,
    Tile,
}

impl RoofType {
    pub const fn label(self) -> &'static str {
        match self {
            RoofType::Tilted => "tilted",
            RoofType::Flat => "flat",
            RoofType::Metal => "metal",
            RoofType::Tile => "tile",
        }
    }

    /// Mounting system recommended for this roof construction.
    pub const fn mounting_system(self) -> &'static str {
        match self {
            RoofType::Flat => "ballasted",
            _ => "roof-mounted",
        }
    }
}

/// Compass orientation of the roof face receiving the array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
}

impl Orientation {
    /// Azimuth in degrees, 180 = due south.
    pub const fn azimuth_degrees(self) -> f64 {
        match self {
            Orientation::North => 0.0,
            Orientation::NorthEast => 45.0,
            Orientation::East => 90.0,
            Orientation::SouthEast => 135.0,
            Orientation::South => 180.0,
            Orientation::SouthWest => 225.0,
            Orientation::West => 270.0,
            Orientation::NorthWest => 315.0,
        }
    }
}

/// Customer priority steering candidate ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DesignPriority {
    Cost,
    #[default]
    Efficiency,
    Reliability,
    Space,
}

/// Geographic position of the installation site.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SiteLocation {
    pub latitude: f64,
    pub longitude: f64,
}

/// Immutable snapshot of customer inputs captured at job creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignRequirements {
    /// Requested system size in watts DC.
    pub target_power_w: f64,
    /// Total budget in euros. Zero means unconstrained.
    pub budget: f64,
    pub roof_type: RoofType,
    pub orientation: Orientation,
    #[serde(default = "default_tilt")]
    pub tilt_degrees: f64,
    #[serde(default)]
    pub priority: DesignPriority,
    #[serde(default)]
    pub constraints: Vec<String>,
    pub location: SiteLocation,
}

fn default_tilt() -> f64 {
    30.0
}

impl DesignRequirements {
    /// Validates customer input before any job record is created.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut violations = Vec::new();

        if !(self.target_power_w > 0.0) || !self.target_power_w.is_finite() {
            violations.push(FieldViolation {
                field: "target_power_w",
                message: "target power must be a positive number of watts".to_string(),
            });
        }
        if self.budget < 0.0 || !self.budget.is_finite() {
            violations.push(FieldViolation {
                field: "budget",
                message: "budget must be zero or a positive amount".to_string(),
            });
        }
        if !(0.0..=90.0).contains(&self.tilt_degrees) {
            violations.push(FieldViolation {
                field: "tilt_degrees",
                message: "tilt must lie between 0 and 90 degrees".to_string(),
            });
        }
        if !(-90.0..=90.0).contains(&self.location.latitude) {
            violations.push(FieldViolation {
                field: "location.latitude",
                message: "latitude must lie between -90 and 90".to_string(),
            });
        }
        if !(-180.0..=180.0).contains(&self.location.longitude) {
            violations.push(FieldViolation {
                field: "location.longitude",
                message: "longitude must lie between -180 and 180".to_string(),
            });
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { violations })
        }
    }
}

/// Field-level rejection raised synchronously at job creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    pub violations: Vec<FieldViolation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<&str> = self
            .violations
            .iter()
            .map(|violation| violation.field)
            .collect();
        write!(f, "invalid design requirements: {}", fields.join(", "))
    }
}

impl std::error::Error for ValidationError {}

/// Derived site data, set once at job creation and never mutated afterward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationContext {
    pub latitude: f64,
    pub longitude: f64,
    /// Köppen climate classification, e.g. "Cfb" for temperate oceanic.
    pub climate_zone: String,
    /// Plane-of-array irradiance estimate in kWh/m²/year.
    pub solar_irradiance: f64,
    pub electricity_price_per_kwh: f64,
    pub feed_in_tariff_per_kwh: f64,
}

impl LocationContext {
    /// Enriches the submitted site with climate and tariff defaults.
    ///
    /// Climate zone and irradiance fall back to a latitude-band heuristic when
    /// the caller supplies no zone; tariff defaults match the European averages
    /// used throughout the financial model.
    pub fn derive(location: &SiteLocation, climate_zone: Option<&str>) -> Self {
        let zone = climate_zone
            .map(str::to_string)
            .unwrap_or_else(|| zone_for_latitude(location.latitude).to_string());

        Self {
            latitude: location.latitude,
            longitude: location.longitude,
            solar_irradiance: irradiance_for_zone(&zone),
            climate_zone: zone,
            electricity_price_per_kwh: 0.25,
            feed_in_tariff_per_kwh: 0.13,
        }
    }
}

fn zone_for_latitude(latitude: f64) -> &'static str {
    let abs = latitude.abs();
    if abs >= 60.0 {
        "Dfc"
    } else if abs >= 45.0 {
        "Cfb"
    } else if abs >= 35.0 {
        "Csa"
    } else if abs >= 23.0 {
        "BSk"
    } else {
        "BWh"
    }
}

/// Annual irradiance by Köppen zone, kWh/m²/year.
pub(crate) fn irradiance_for_zone(zone: &str) -> f64 {
    match zone {
        "Cfb" => 1230.0,
        "Csa" => 1800.0,
        "Cfa" => 1600.0,
        "BSk" => 2000.0,
        "BWh" => 2300.0,
        "Dfa" => 1400.0,
        "Dfc" => 900.0,
        _ => 1200.0,
    }
}

/// High level status tracked throughout the design job lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DesignJobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl DesignJobStatus {
    pub const fn label(self) -> &'static str {
        match self {
            DesignJobStatus::Pending => "pending",
            DesignJobStatus::Processing => "processing",
            DesignJobStatus::Completed => "completed",
            DesignJobStatus::Failed => "failed",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, DesignJobStatus::Completed | DesignJobStatus::Failed)
    }
}

/// Chosen equipment ids plus mounting and optimization notes, written once
/// when selection completes and amendable by a human reviewer afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquipmentSelections {
    pub panel_id: String,
    pub inverter_id: String,
    pub mounting_system: String,
    pub optimization: String,
}

/// Series/parallel layout of the selected array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayConfiguration {
    pub panels_per_string: u32,
    pub number_of_strings: u32,
    pub total_panels: u32,
    pub total_power_dc_w: f64,
    /// DC/AC ratio against the inverter's nominal output.
    pub power_ratio: f64,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelSummary {
    pub id: String,
    pub maker: String,
    pub model: String,
    pub max_power_w: f64,
    pub efficiency_pct: f64,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InverterSummary {
    pub id: String,
    pub maker: String,
    pub model: String,
    pub nominal_ac_power_w: f64,
    pub european_efficiency_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub equipment: f64,
    pub installation: f64,
    pub total: f64,
    pub per_watt_dc: f64,
}

/// Final design payload: equipment, cost, and array configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignResult {
    pub panel: PanelSummary,
    pub inverter: InverterSummary,
    pub array: ArrayConfiguration,
    pub cost: CostBreakdown,
}

/// Environmental derivatives of the annual production estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentalBenefits {
    pub co2_offset_tons: f64,
    pub equivalent_trees: u32,
    pub coal_displacement_tons: f64,
}

/// Financial outcome of the design. All numbers are finite; metrics that are
/// undefined for the cash-flow profile are `None` rather than sentinel values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialMetrics {
    pub system_cost: f64,
    pub payback_period_years: Option<f64>,
    pub npv: f64,
    pub irr_pct: Option<f64>,
    pub lcoe_per_kwh: f64,
}

/// Production and financial estimates, written once on completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceEstimates {
    pub annual_production_kwh: f64,
    pub monthly_production_kwh: Vec<f64>,
    pub performance_ratio_pct: f64,
    pub specific_yield_kwh_per_kwp: f64,
    pub capacity_factor_pct: f64,
    pub environmental: EnvironmentalBenefits,
    pub financial: FinancialMetrics,
}
