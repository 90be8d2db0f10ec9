use super::domain::{
    CostBreakdown, DesignResult, FinancialMetrics, InverterSummary, PanelSummary,
    PerformanceEstimates,
};
use super::selection::{EquipmentSelection, INSTALLATION_COST_FACTOR};
use super::simulation::SimulationResult;

/// Structurally merges selection, simulation, and financial outputs into the
/// completed-job payload and derives the confidence score.
pub struct ResultAggregator;

impl ResultAggregator {
    pub fn assemble(
        selection: &EquipmentSelection,
        simulation: &SimulationResult,
        financial: FinancialMetrics,
    ) -> (DesignResult, PerformanceEstimates, u8) {
        let equipment = selection.equipment_cost;
        let installation = equipment * INSTALLATION_COST_FACTOR;
        let total = equipment + installation;
        let per_watt_dc = if selection.array.total_power_dc_w > 0.0 {
            total / selection.array.total_power_dc_w
        } else {
            0.0
        };

        let design = DesignResult {
            panel: PanelSummary {
                id: selection.panel.id.clone(),
                maker: selection.panel.maker.clone(),
                model: selection.panel.model.clone(),
                max_power_w: selection.panel.max_power_w,
                efficiency_pct: selection.panel.efficiency_pct,
                quantity: selection.array.total_panels,
            },
            inverter: InverterSummary {
                id: selection.inverter.id.clone(),
                maker: selection.inverter.maker.clone(),
                model: selection.inverter.model.clone(),
                nominal_ac_power_w: selection.inverter.nominal_ac_power_w,
                european_efficiency_pct: selection.inverter.european_efficiency_pct,
            },
            array: selection.array.clone(),
            cost: CostBreakdown {
                equipment,
                installation,
                total,
                per_watt_dc,
            },
        };

        let estimates = PerformanceEstimates {
            annual_production_kwh: simulation.annual_production_kwh,
            monthly_production_kwh: simulation.monthly_production_kwh.clone(),
            performance_ratio_pct: simulation.performance_ratio_pct,
            specific_yield_kwh_per_kwp: simulation.specific_yield_kwh_per_kwp,
            capacity_factor_pct: simulation.capacity_factor_pct,
            environmental: simulation.environmental.clone(),
            financial,
        };

        let confidence = confidence_score(selection.compatibility.overall_score);

        (design, estimates, confidence)
    }
}

/// Rounded average of the four confidence factors.
///
/// Only the compatibility factor varies with the chosen pair; data quality,
/// requirement clarity, and location accuracy are fixed grades of the catalog
/// data and validated inputs that reach this stage.
fn confidence_score(compatibility: u8) -> u8 {
    const DATA_QUALITY: f64 = 90.0;
    const REQUIREMENT_CLARITY: f64 = 95.0;
    const LOCATION_ACCURACY: f64 = 90.0;

    let average =
        (f64::from(compatibility) + DATA_QUALITY + REQUIREMENT_CLARITY + LOCATION_ACCURACY) / 4.0;
    average.round().clamp(0.0, 100.0) as u8
}
