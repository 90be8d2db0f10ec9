use super::domain::FinancialMetrics;
use super::simulation::SimulationResult;

/// Capital cost inputs for the financial model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostInputs {
    pub equipment_cost: f64,
    pub installation_cost: f64,
}

/// Tariff and modelling assumptions applied over the analysis horizon.
#[derive(Debug, Clone, PartialEq)]
pub struct TariffContext {
    pub electricity_price_per_kwh: f64,
    /// Annual electricity price inflation, fraction.
    pub price_inflation_rate: f64,
    /// Discount rate for NPV and payback, fraction.
    pub discount_rate: f64,
    /// Analysis horizon in years; defaults to the typical panel warranty.
    pub analysis_horizon_years: u32,
    /// Operation and maintenance cost, euros per kWp per year.
    pub annual_om_cost_per_kw: f64,
    /// Annual module degradation, fraction.
    pub degradation_rate: f64,
}

impl TariffContext {
    pub fn with_electricity_price(price_per_kwh: f64) -> Self {
        Self {
            electricity_price_per_kwh: price_per_kwh,
            price_inflation_rate: 0.025,
            discount_rate: 0.05,
            analysis_horizon_years: 25,
            annual_om_cost_per_kw: 20.0,
            degradation_rate: 0.005,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CalculationError {
    #[error("financial calculation produced a non-finite {field}")]
    NonFinite { field: &'static str },
    #[error("invalid financial input: {0}")]
    InvalidInput(String),
}

/// Pure financial model over the simulation output.
///
/// Payback is a numeric search over discounted yearly savings, IRR a bisection
/// on the NPV function; both return `None` instead of a sentinel when the cash
/// flows never support them. Every returned number is guaranteed finite.
pub struct FinancialAnalyzer;

impl FinancialAnalyzer {
    pub fn analyze(
        costs: &CostInputs,
        simulation: &SimulationResult,
        tariff: &TariffContext,
    ) -> Result<FinancialMetrics, CalculationError> {
        let system_cost = costs.equipment_cost + costs.installation_cost;
        if !system_cost.is_finite() || system_cost <= 0.0 {
            return Err(CalculationError::InvalidInput(
                "system cost must be a positive amount".to_string(),
            ));
        }
        if tariff.analysis_horizon_years == 0 {
            return Err(CalculationError::InvalidInput(
                "analysis horizon must cover at least one year".to_string(),
            ));
        }
        if !(simulation.specific_yield_kwh_per_kwp > 0.0) {
            return Err(CalculationError::InvalidInput(
                "specific yield must be positive".to_string(),
            ));
        }

        let kwp = simulation.annual_production_kwh / simulation.specific_yield_kwh_per_kwp;
        let horizon = tariff.analysis_horizon_years;

        // Yearly net savings with degradation and price inflation applied.
        let mut net_savings = Vec::with_capacity(horizon as usize);
        let mut total_production = 0.0;
        let mut total_om = 0.0;
        for year in 1..=horizon {
            let age = f64::from(year - 1);
            let production =
                simulation.annual_production_kwh * (1.0 - tariff.degradation_rate).powf(age);
            let inflation = (1.0 + tariff.price_inflation_rate).powf(age);
            let revenue = production * tariff.electricity_price_per_kwh * inflation;
            let om = tariff.annual_om_cost_per_kw * kwp * inflation;
            net_savings.push(revenue - om);
            total_production += production;
            total_om += om;
        }

        if !(total_production > 0.0) {
            return Err(CalculationError::InvalidInput(
                "lifecycle energy production must be positive".to_string(),
            ));
        }

        let payback_period_years = discounted_payback(system_cost, &net_savings, tariff);

        let mut npv = -system_cost;
        for (index, saving) in net_savings.iter().enumerate() {
            npv += saving / (1.0 + tariff.discount_rate).powi(index as i32 + 1);
        }

        let irr_pct = internal_rate_of_return(system_cost, &net_savings).map(|rate| rate * 100.0);

        let lcoe_per_kwh = (system_cost + total_om) / total_production;

        let metrics = FinancialMetrics {
            system_cost,
            payback_period_years,
            npv,
            irr_pct,
            lcoe_per_kwh,
        };
        ensure_finite(&metrics)?;
        Ok(metrics)
    }
}

fn discounted_payback(
    system_cost: f64,
    net_savings: &[f64],
    tariff: &TariffContext,
) -> Option<f64> {
    let mut cumulative = 0.0;
    for (index, saving) in net_savings.iter().enumerate() {
        let discounted = saving / (1.0 + tariff.discount_rate).powi(index as i32 + 1);
        let previous = cumulative;
        cumulative += discounted;
        if cumulative >= system_cost {
            // Interpolate within the crossing year for a fractional period.
            let year = index as f64;
            let fraction = if discounted > 0.0 {
                (system_cost - previous) / discounted
            } else {
                1.0
            };
            return Some(year + fraction);
        }
    }
    None
}

/// Bisection on the NPV function over the year-0 outflow plus yearly savings.
/// The upper bracket grows geometrically until the NPV changes sign, so very
/// fast-returning systems still resolve; `None` means the cash flows never
/// cross zero.
fn internal_rate_of_return(system_cost: f64, net_savings: &[f64]) -> Option<f64> {
    let npv_at = |rate: f64| -> f64 {
        let mut value = -system_cost;
        for (index, saving) in net_savings.iter().enumerate() {
            value += saving / (1.0 + rate).powi(index as i32 + 1);
        }
        value
    };

    let mut low = -0.9;
    let npv_low = npv_at(low);
    if npv_low.is_nan() {
        return None;
    }

    let mut high = 1.0;
    let mut npv_high = npv_at(high);
    while !npv_high.is_nan() && npv_high.signum() == npv_low.signum() && high < 1e6 {
        high *= 2.0;
        npv_high = npv_at(high);
    }
    if npv_high.is_nan() || npv_low.signum() == npv_high.signum() {
        return None;
    }

    for _ in 0..100 {
        let mid = (low + high) / 2.0;
        let value = npv_at(mid);
        if value.abs() < 1e-7 {
            return Some(mid);
        }
        if value.signum() == npv_low.signum() {
            low = mid;
        } else {
            high = mid;
        }
    }
    Some((low + high) / 2.0)
}

fn ensure_finite(metrics: &FinancialMetrics) -> Result<(), CalculationError> {
    if !metrics.system_cost.is_finite() {
        return Err(CalculationError::NonFinite {
            field: "system_cost",
        });
    }
    if !metrics.npv.is_finite() {
        return Err(CalculationError::NonFinite { field: "npv" });
    }
    if !metrics.lcoe_per_kwh.is_finite() {
        return Err(CalculationError::NonFinite {
            field: "lcoe_per_kwh",
        });
    }
    if let Some(payback) = metrics.payback_period_years {
        if !payback.is_finite() {
            return Err(CalculationError::NonFinite {
                field: "payback_period_years",
            });
        }
    }
    if let Some(irr) = metrics.irr_pct {
        if !irr.is_finite() {
            return Err(CalculationError::NonFinite { field: "irr_pct" });
        }
    }
    Ok(())
}
