use super::super::catalog::{InverterRecord, PanelRecord};
use super::config::ScoringConfig;

/// Standard test condition temperature, °C.
const STC_TEMP_C: f64 = 25.0;

/// Intermediate electrical quantities shared by the sub-score rules.
pub(crate) struct StringDerivation {
    pub voc_cold: f64,
    pub voc_hot: f64,
    pub isc_hot: f64,
    pub min_string_length: u32,
    pub max_string_length: u32,
    pub panels_per_string: u32,
    pub number_of_strings: u32,
    pub power_ratio: f64,
}

pub(crate) fn voc_at_temp(panel: &PanelRecord, temp_c: f64) -> f64 {
    panel.open_circuit_voltage * (1.0 + panel.temp_coeff_voc / 100.0 * (temp_c - STC_TEMP_C))
}

pub(crate) fn isc_at_temp(panel: &PanelRecord, temp_c: f64) -> f64 {
    panel.short_circuit_current * (1.0 + panel.temp_coeff_isc / 100.0 * (temp_c - STC_TEMP_C))
}

/// Derives string-length bounds and a recommended layout for the pair.
///
/// The minimum keeps Voc above the inverter's MPPT low threshold at the hot
/// design temperature; the maximum keeps Voc below the max DC input voltage at
/// the cold design temperature. When the bounds cross, the pair cannot form a
/// legal string and the caller must treat it as a hard failure.
pub(crate) fn derive_strings(
    panel: &PanelRecord,
    inverter: &InverterRecord,
    config: &ScoringConfig,
) -> StringDerivation {
    let voc_cold = voc_at_temp(panel, config.cold_design_temp_c);
    let voc_hot = voc_at_temp(panel, config.hot_design_temp_c);
    let isc_hot = isc_at_temp(panel, config.hot_design_temp_c);

    let max_string_length = if voc_cold > 0.0 {
        (inverter.max_dc_voltage / voc_cold).floor() as u32
    } else {
        0
    };
    let min_string_length = if voc_hot > 0.0 {
        (inverter.mppt_voltage_min / voc_hot).ceil().max(1.0) as u32
    } else {
        u32::MAX
    };

    let (panels_per_string, number_of_strings, power_ratio) = if min_string_length
        <= max_string_length
    {
        recommend_layout(panel, inverter, config, min_string_length, max_string_length)
    } else {
        (0, 0, 0.0)
    };

    StringDerivation {
        voc_cold,
        voc_hot,
        isc_hot,
        min_string_length,
        max_string_length,
        panels_per_string,
        number_of_strings,
        power_ratio,
    }
}

/// Picks the legal layout whose DC/AC ratio lands closest to the sweet spot.
fn recommend_layout(
    panel: &PanelRecord,
    inverter: &InverterRecord,
    config: &ScoringConfig,
    min_len: u32,
    max_len: u32,
) -> (u32, u32, f64) {
    let isc_hot = isc_at_temp(panel, config.hot_design_temp_c);
    let max_parallel = if isc_hot > 0.0 {
        ((inverter.max_short_circuit_current / isc_hot).floor() as u32).max(1)
    } else {
        1
    };

    let mut best = (min_len, 1, ratio_for(panel, inverter, min_len, 1));
    for length in min_len..=max_len {
        for strings in 1..=max_parallel {
            let ratio = ratio_for(panel, inverter, length, strings);
            if (ratio - config.oversizing_sweet_spot).abs()
                < (best.2 - config.oversizing_sweet_spot).abs()
            {
                best = (length, strings, ratio);
            }
        }
    }
    best
}

fn ratio_for(panel: &PanelRecord, inverter: &InverterRecord, length: u32, strings: u32) -> f64 {
    let dc = panel.max_power_w * f64::from(length) * f64::from(strings);
    if inverter.nominal_ac_power_w > 0.0 {
        dc / inverter.nominal_ac_power_w
    } else {
        0.0
    }
}

/// Linear headroom score: 100 while utilization stays under the margin, 0 at
/// or above the limit, linear in between.
fn headroom_score(utilization: f64, margin: f64) -> f64 {
    if utilization <= margin {
        100.0
    } else if utilization >= 1.0 {
        0.0
    } else {
        100.0 * (1.0 - utilization) / (1.0 - margin)
    }
}

pub(crate) fn voltage_score(
    inverter: &InverterRecord,
    derivation: &StringDerivation,
    config: &ScoringConfig,
) -> (f64, Option<String>) {
    let string_voltage = derivation.voc_cold * f64::from(derivation.panels_per_string);
    let utilization = string_voltage / inverter.max_dc_voltage;
    let score = headroom_score(utilization, config.full_score_margin);
    let issue = (utilization >= 1.0).then(|| {
        format!(
            "string Voc at {:.0}°C ({:.1}V) exceeds inverter max DC voltage ({:.0}V)",
            config.cold_design_temp_c, string_voltage, inverter.max_dc_voltage
        )
    });
    (score, issue)
}

pub(crate) fn current_score(
    panel: &PanelRecord,
    inverter: &InverterRecord,
    config: &ScoringConfig,
) -> (f64, Option<String>) {
    let utilization = panel.short_circuit_current / inverter.max_input_current_per_mppt;
    let score = headroom_score(utilization, config.full_score_margin);
    let issue = (utilization >= 1.0).then(|| {
        format!(
            "panel Isc ({:.1}A) exceeds inverter max input current per MPPT ({:.1}A)",
            panel.short_circuit_current, inverter.max_input_current_per_mppt
        )
    });
    (score, issue)
}

pub(crate) fn power_score(
    derivation: &StringDerivation,
    config: &ScoringConfig,
) -> (f64, Option<String>) {
    let ratio = derivation.power_ratio;
    if ratio >= config.oversizing_min && ratio <= config.oversizing_max {
        let score = 100.0 - (ratio - config.oversizing_sweet_spot).abs() * 40.0;
        (score.max(0.0), None)
    } else {
        let distance = if ratio < config.oversizing_min {
            config.oversizing_min - ratio
        } else {
            ratio - config.oversizing_max
        };
        let score = (100.0 - distance * 300.0).max(0.0);
        let issue = Some(format!(
            "DC/AC ratio {:.2} falls outside the {:.2}-{:.2} oversizing band",
            ratio, config.oversizing_min, config.oversizing_max
        ));
        (score, issue)
    }
}

pub(crate) fn temperature_score(
    inverter: &InverterRecord,
    derivation: &StringDerivation,
    config: &ScoringConfig,
) -> (f64, Option<String>) {
    let mut score = 100.0;
    let mut issue = None;

    let array_isc = derivation.isc_hot * f64::from(derivation.number_of_strings);
    if inverter.max_short_circuit_current > 0.0 {
        let utilization = array_isc / inverter.max_short_circuit_current;
        if utilization > config.full_score_margin {
            score -= 50.0 * ((utilization - config.full_score_margin)
                / (1.0 - config.full_score_margin))
                .min(1.0);
        }
        if utilization >= 1.0 {
            issue = Some(format!(
                "array Isc at {:.0}°C ({:.1}A) exceeds inverter short-circuit rating ({:.1}A)",
                config.hot_design_temp_c, array_isc, inverter.max_short_circuit_current
            ));
        }
    }

    let operating_voltage = derivation.voc_hot * f64::from(derivation.panels_per_string);
    if operating_voltage < inverter.mppt_voltage_min {
        score -= 50.0;
        issue.get_or_insert_with(|| {
            format!(
                "string voltage at {:.0}°C ({:.1}V) drops below the MPPT window ({:.0}V)",
                config.hot_design_temp_c, operating_voltage, inverter.mppt_voltage_min
            )
        });
    }

    (score.max(0.0), issue)
}
