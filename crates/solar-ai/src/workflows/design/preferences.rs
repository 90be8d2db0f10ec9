use serde::{Deserialize, Serialize};

use super::catalog::{InverterRecord, PanelRecord};
use super::repository::StoreError;

/// Weighting level for a preference dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PriorityLevel {
    Low,
    #[default]
    Medium,
    High,
}

/// Optional overrides biasing candidate ranking. Preferences only reorder
/// candidates; they never alter compatibility scores or correctness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct UserPreferences {
    #[serde(default)]
    pub preferred_panel_brands: Vec<String>,
    #[serde(default)]
    pub preferred_inverter_brands: Vec<String>,
    #[serde(default)]
    pub budget_priority: PriorityLevel,
    #[serde(default)]
    pub performance_priority: PriorityLevel,
}

/// Persistence seam for the single preference profile the gateway exposes.
pub trait PreferenceStore: Send + Sync {
    fn load(&self) -> Result<UserPreferences, StoreError>;
    fn save(&self, preferences: UserPreferences) -> Result<(), StoreError>;
}

/// Bounded ordering bonus applied on top of the compatibility score.
///
/// The bonus tops out well under a single scoring point band (max 6.0) so a
/// preferred brand can win a near-tie but never outrank a materially better
/// pair.
pub(crate) fn ranking_bonus(
    preferences: &UserPreferences,
    panel: &PanelRecord,
    inverter: &InverterRecord,
) -> f64 {
    let mut bonus = 0.0;
    if preferences
        .preferred_panel_brands
        .iter()
        .any(|brand| brand.eq_ignore_ascii_case(&panel.maker))
    {
        bonus += 2.0;
    }
    if preferences
        .preferred_inverter_brands
        .iter()
        .any(|brand| brand.eq_ignore_ascii_case(&inverter.maker))
    {
        bonus += 2.0;
    }
    if preferences.performance_priority == PriorityLevel::High {
        bonus += (panel.efficiency_pct / 25.0).min(1.0);
    }
    if preferences.budget_priority == PriorityLevel::High {
        let price_per_watt = panel.price / panel.max_power_w.max(1.0);
        bonus += (1.0 - price_per_watt).clamp(0.0, 1.0);
    }
    bonus
}

#[cfg(test)]
mod tests {
    use super::*;

    fn panel(maker: &str) -> PanelRecord {
        PanelRecord {
            id: "pan".to_string(),
            maker: maker.to_string(),
            model: "M".to_string(),
            max_power_w: 400.0,
            open_circuit_voltage: 45.0,
            short_circuit_current: 10.8,
            voltage_at_pmax: 37.9,
            current_at_pmax: 10.6,
            temp_coeff_voc: -0.27,
            temp_coeff_isc: 0.05,
            efficiency_pct: 21.0,
            price: 210.0,
        }
    }

    fn inverter(maker: &str) -> InverterRecord {
        InverterRecord {
            id: "inv".to_string(),
            maker: maker.to_string(),
            model: "I".to_string(),
            nominal_ac_power_w: 5000.0,
            max_dc_voltage: 600.0,
            mppt_voltage_min: 175.0,
            mppt_voltage_max: 500.0,
            max_input_current_per_mppt: 15.0,
            max_short_circuit_current: 25.0,
            mppt_trackers: 2,
            european_efficiency_pct: 96.5,
            price: 1250.0,
        }
    }

    #[test]
    fn preferred_brands_earn_a_bounded_bonus() {
        let preferences = UserPreferences {
            preferred_panel_brands: vec!["SunPower".to_string()],
            preferred_inverter_brands: vec!["SMA".to_string()],
            ..UserPreferences::default()
        };
        let bonus = ranking_bonus(&preferences, &panel("SunPower"), &inverter("SMA"));
        assert!(bonus >= 4.0 && bonus <= 6.0);
    }

    #[test]
    fn no_preferences_means_no_bonus() {
        let bonus = ranking_bonus(
            &UserPreferences::default(),
            &panel("SunPower"),
            &inverter("SMA"),
        );
        assert_eq!(bonus, 0.0);
    }

    #[test]
    fn brand_matching_is_case_insensitive() {
        let preferences = UserPreferences {
            preferred_panel_brands: vec!["sunpower".to_string()],
            ..UserPreferences::default()
        };
        let bonus = ranking_bonus(&preferences, &panel("SunPower"), &inverter("SMA"));
        assert_eq!(bonus, 2.0);
    }
}
