use std::sync::Arc;

use super::catalog::{InverterRecord, PanelRecord};
use super::domain::{ArrayConfiguration, DesignPriority, DesignRequirements};
use super::preferences::{ranking_bonus, UserPreferences};
use super::scoring::{
    isc_at_temp, CompatibilityCache, CompatibilityMatrixEntry, CompatibilityScorer,
};

/// Installation labour as a fraction of equipment cost. Equipment works out
/// to 75% of the installed total, matching the quoting split used in the
/// cost breakdown.
pub(crate) const INSTALLATION_COST_FACTOR: f64 = 1.0 / 3.0;

/// Winning candidate: the pair, its cached matrix entry, and the array layout
/// sized to the customer's target.
#[derive(Debug, Clone)]
pub struct EquipmentSelection {
    pub panel: PanelRecord,
    pub inverter: InverterRecord,
    pub compatibility: Arc<CompatibilityMatrixEntry>,
    pub array: ArrayConfiguration,
    pub equipment_cost: f64,
}

/// Ranks every panel/inverter pair and returns the best sized candidate.
///
/// Candidates must score as electrically compatible and admit an array layout
/// within the target-power tolerance; when a budget is set, the estimated
/// installed total must fit it. Ranking is by compatibility score with a
/// bounded preference bias, tie-broken by lower equipment cost and then fewer
/// panels. Returns `None` when no pair survives the filters.
pub(crate) fn select_equipment(
    panels: &[PanelRecord],
    inverters: &[InverterRecord],
    requirements: &DesignRequirements,
    preferences: &UserPreferences,
    scorer: &CompatibilityScorer,
    cache: &CompatibilityCache,
    target_power_tolerance: f64,
) -> Option<EquipmentSelection> {
    let mut best: Option<(f64, EquipmentSelection)> = None;

    for panel in panels {
        for inverter in inverters {
            let entry = cache.score(scorer, panel, inverter);
            if !entry.is_compatible() || entry.overall_score == 0 {
                continue;
            }

            let Some(array) = size_array(
                panel,
                inverter,
                &entry,
                scorer,
                requirements.target_power_w,
                target_power_tolerance,
            ) else {
                continue;
            };

            let equipment_cost =
                panel.price * f64::from(array.total_panels) + inverter.price;
            let installed_total = equipment_cost * (1.0 + INSTALLATION_COST_FACTOR);
            if requirements.budget > 0.0 && installed_total > requirements.budget {
                continue;
            }

            let rank = f64::from(entry.overall_score)
                + ranking_bonus(preferences, panel, inverter)
                + priority_bonus(requirements.priority, panel);
            let candidate = EquipmentSelection {
                panel: panel.clone(),
                inverter: inverter.clone(),
                compatibility: entry,
                array,
                equipment_cost,
            };

            let replace = match &best {
                None => true,
                Some((best_rank, best_candidate)) => {
                    rank > *best_rank
                        || (rank == *best_rank
                            && prefer_on_tie(&candidate, best_candidate))
                }
            };
            if replace {
                best = Some((rank, candidate));
            }
        }
    }

    best.map(|(_, selection)| selection)
}

fn prefer_on_tie(candidate: &EquipmentSelection, incumbent: &EquipmentSelection) -> bool {
    if candidate.equipment_cost != incumbent.equipment_cost {
        return candidate.equipment_cost < incumbent.equipment_cost;
    }
    if candidate.array.total_panels != incumbent.array.total_panels {
        return candidate.array.total_panels < incumbent.array.total_panels;
    }
    // Stable last resort so identical inputs always pick the same pair.
    (candidate.panel.id.as_str(), candidate.inverter.id.as_str())
        < (incumbent.panel.id.as_str(), incumbent.inverter.id.as_str())
}

/// Small ordering nudge from the customer's stated priority. Bounded well
/// under a scoring point band; never changes which pairs are viable.
fn priority_bonus(priority: DesignPriority, panel: &PanelRecord) -> f64 {
    match priority {
        DesignPriority::Efficiency => ((panel.efficiency_pct - 18.0) / 4.0).clamp(0.0, 1.5),
        DesignPriority::Cost => {
            let price_per_watt = panel.price / panel.max_power_w.max(1.0);
            (1.5 - price_per_watt * 2.0).clamp(0.0, 1.5)
        }
        DesignPriority::Space => ((panel.max_power_w - 350.0) / 100.0).clamp(0.0, 1.5),
        DesignPriority::Reliability => 0.0,
    }
}

/// Finds the legal series/parallel layout whose DC power lands closest to the
/// target, rejecting layouts outside the tolerance band.
fn size_array(
    panel: &PanelRecord,
    inverter: &InverterRecord,
    entry: &CompatibilityMatrixEntry,
    scorer: &CompatibilityScorer,
    target_power_w: f64,
    tolerance: f64,
) -> Option<ArrayConfiguration> {
    let bounds = &entry.string_configuration;
    if bounds.min_string_length == 0 || bounds.min_string_length > bounds.max_string_length {
        return None;
    }

    let isc_hot = isc_at_temp(panel, scorer.config().hot_design_temp_c);
    let max_parallel = if isc_hot > 0.0 {
        ((inverter.max_short_circuit_current / isc_hot).floor() as u32).max(1)
    } else {
        1
    };

    let mut best: Option<(f64, u32, u32)> = None;
    for length in bounds.min_string_length..=bounds.max_string_length {
        for strings in 1..=max_parallel {
            let total = length * strings;
            let dc = panel.max_power_w * f64::from(total);
            let deviation = (dc - target_power_w).abs();
            if deviation > target_power_w * tolerance {
                continue;
            }
            let better = match best {
                None => true,
                Some((best_deviation, best_length, best_strings)) => {
                    deviation < best_deviation
                        || (deviation == best_deviation
                            && total < best_length * best_strings)
                }
            };
            if better {
                best = Some((deviation, length, strings));
            }
        }
    }

    let (_, panels_per_string, number_of_strings) = best?;
    let total_panels = panels_per_string * number_of_strings;
    let total_power_dc_w = panel.max_power_w * f64::from(total_panels);
    let power_ratio = if inverter.nominal_ac_power_w > 0.0 {
        total_power_dc_w / inverter.nominal_ac_power_w
    } else {
        0.0
    };

    Some(ArrayConfiguration {
        panels_per_string,
        number_of_strings,
        total_panels,
        total_power_dc_w,
        power_ratio,
        summary: if number_of_strings == 1 {
            format!("1 string of {panels_per_string} panels")
        } else {
            format!("{number_of_strings} strings of {panels_per_string} panels each")
        },
    })
}
