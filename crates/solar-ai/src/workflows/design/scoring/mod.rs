mod cache;
mod config;
mod rules;

pub use cache::CompatibilityCache;
pub use config::ScoringConfig;
pub(crate) use rules::isc_at_temp;

use serde::{Deserialize, Serialize};

use super::catalog::{electrical_fingerprint, InverterRecord, PanelRecord};

/// Stateless scorer applying the configured rules to a panel/inverter pair.
///
/// Scoring is pure and deterministic: identical inputs always produce an
/// identical entry, which is what makes cached matrix entries safe to reuse.
pub struct CompatibilityScorer {
    config: ScoringConfig,
}

impl CompatibilityScorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    pub fn score(&self, panel: &PanelRecord, inverter: &InverterRecord) -> CompatibilityMatrixEntry {
        let derivation = rules::derive_strings(panel, inverter, &self.config);

        let mut recommendations = Vec::new();
        let mut potential_issues = Vec::new();

        if derivation.min_string_length > derivation.max_string_length {
            // Hard failure: no string length satisfies both voltage bounds.
            potential_issues.push(format!(
                "no legal string length: minimum {} exceeds maximum {}",
                derivation.min_string_length, derivation.max_string_length
            ));
            return CompatibilityMatrixEntry {
                panel_id: panel.id.clone(),
                inverter_id: inverter.id.clone(),
                overall_score: 0,
                voltage_score: 0,
                current_score: 0,
                power_score: 0,
                temperature_score: 0,
                string_configuration: StringConfiguration {
                    panels_per_string: 0,
                    number_of_strings: 0,
                    min_string_length: derivation.min_string_length,
                    max_string_length: derivation.max_string_length,
                },
                recommendations,
                potential_issues,
                fingerprint: electrical_fingerprint(panel, inverter),
            };
        }

        let (voltage, voltage_issue) = rules::voltage_score(inverter, &derivation, &self.config);
        let (current, current_issue) = rules::current_score(panel, inverter, &self.config);
        let (power, power_issue) = rules::power_score(&derivation, &self.config);
        let (temperature, temperature_issue) =
            rules::temperature_score(inverter, &derivation, &self.config);

        for issue in [voltage_issue, current_issue, power_issue, temperature_issue]
            .into_iter()
            .flatten()
        {
            potential_issues.push(issue);
        }

        if derivation.number_of_strings > 1 {
            recommendations.push(format!(
                "wire {} parallel strings of {} panels across the {} MPPT inputs",
                derivation.number_of_strings, derivation.panels_per_string, inverter.mppt_trackers
            ));
        } else {
            recommendations.push(format!(
                "a single string of {} panels suits this inverter",
                derivation.panels_per_string
            ));
        }
        if power > 90.0 {
            recommendations.push(format!(
                "DC/AC ratio {:.2} sits near the optimal oversizing point",
                derivation.power_ratio
            ));
        }

        let weighted = voltage * self.config.voltage_weight
            + current * self.config.current_weight
            + power * self.config.power_weight
            + temperature * self.config.temperature_weight;
        let weight_sum = self.config.voltage_weight
            + self.config.current_weight
            + self.config.power_weight
            + self.config.temperature_weight;
        let overall = (weighted / weight_sum).round().clamp(0.0, 100.0) as u8;

        CompatibilityMatrixEntry {
            panel_id: panel.id.clone(),
            inverter_id: inverter.id.clone(),
            overall_score: overall,
            voltage_score: clamp_score(voltage),
            current_score: clamp_score(current),
            power_score: clamp_score(power),
            temperature_score: clamp_score(temperature),
            string_configuration: StringConfiguration {
                panels_per_string: derivation.panels_per_string,
                number_of_strings: derivation.number_of_strings,
                min_string_length: derivation.min_string_length,
                max_string_length: derivation.max_string_length,
            },
            recommendations,
            potential_issues,
            fingerprint: electrical_fingerprint(panel, inverter),
        }
    }
}

fn clamp_score(score: f64) -> u8 {
    score.round().clamp(0.0, 100.0) as u8
}

/// Recommended series/parallel layout with the legal string-length bounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StringConfiguration {
    pub panels_per_string: u32,
    pub number_of_strings: u32,
    pub min_string_length: u32,
    pub max_string_length: u32,
}

/// Cached scoring result for a (panel, inverter) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompatibilityMatrixEntry {
    pub panel_id: String,
    pub inverter_id: String,
    pub overall_score: u8,
    pub voltage_score: u8,
    pub current_score: u8,
    pub power_score: u8,
    pub temperature_score: u8,
    pub string_configuration: StringConfiguration,
    pub recommendations: Vec<String>,
    pub potential_issues: Vec<String>,
    /// Hash of the electrical attributes the scores were computed against.
    #[serde(skip)]
    pub fingerprint: u64,
}

impl CompatibilityMatrixEntry {
    pub fn is_compatible(&self) -> bool {
        self.string_configuration.min_string_length <= self.string_configuration.max_string_length
    }
}
