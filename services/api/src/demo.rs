use std::time::Duration;

use clap::Args;
use solar_ai::config::PipelineConfig;
use solar_ai::error::AppError;
use solar_ai::workflows::design::{
    ClimateModelEngine, DesignJobRecord, DesignJobStatus, DesignJobOrchestrator,
    DesignPriority, DesignRequirements, JobOutcome, Orientation, RoofType, ScoringConfig,
    SiteLocation,
};

use crate::infra::{InMemoryDesignJobStore, InMemoryEquipmentCatalog, InMemoryPreferenceStore};

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Requested system size in watts DC
    #[arg(long, default_value_t = 6000.0)]
    pub(crate) target_power_w: f64,
    /// Total budget in euros; zero means unconstrained
    #[arg(long, default_value_t = 0.0)]
    pub(crate) budget: f64,
    /// Site latitude (defaults to Paris)
    #[arg(long, default_value_t = 48.8566)]
    pub(crate) latitude: f64,
    /// Site longitude (defaults to Paris)
    #[arg(long, default_value_t = 2.3522)]
    pub(crate) longitude: f64,
    /// Roof tilt in degrees
    #[arg(long, default_value_t = 30.0)]
    pub(crate) tilt: f64,
    /// Seconds to wait for the pipeline before giving up
    #[arg(long, default_value_t = 30)]
    pub(crate) wait_secs: u64,
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let orchestrator = DesignJobOrchestrator::new(
        InMemoryEquipmentCatalog::default(),
        ClimateModelEngine,
        InMemoryDesignJobStore::default(),
        InMemoryPreferenceStore::default(),
        ScoringConfig::default(),
        PipelineConfig::default(),
    );

    let requirements = DesignRequirements {
        target_power_w: args.target_power_w,
        budget: args.budget,
        roof_type: RoofType::Tilted,
        orientation: Orientation::South,
        tilt_degrees: args.tilt,
        priority: DesignPriority::Efficiency,
        constraints: Vec::new(),
        location: SiteLocation {
            latitude: args.latitude,
            longitude: args.longitude,
        },
    };

    let accepted = orchestrator.submit(requirements)?;
    println!("submitted design job {}", accepted.id);
    println!(
        "site: lat {:.4}, lon {:.4}, climate zone {}",
        accepted.location_context.latitude,
        accepted.location_context.longitude,
        accepted.location_context.climate_zone
    );

    let deadline = std::time::Instant::now() + Duration::from_secs(args.wait_secs);
    let finished = loop {
        let record = orchestrator.get(&accepted.id)?;
        if record.status.is_terminal() {
            break record;
        }
        if std::time::Instant::now() >= deadline {
            println!(
                "job still {} after {}s; giving up",
                record.status.label(),
                args.wait_secs
            );
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    };

    render_outcome(&finished);
    Ok(())
}

fn render_outcome(record: &DesignJobRecord) {
    println!();
    println!("== design job {} ==", record.id);
    println!("status: {}", record.status.label());

    if let Some(selections) = &record.equipment_selections {
        println!(
            "selected: panel {} / inverter {} ({})",
            selections.panel_id, selections.inverter_id, selections.mounting_system
        );
    }

    match (&record.outcome, record.status) {
        (Some(JobOutcome::Completed { design_result, performance_estimates }), _) => {
            let array = &design_result.array;
            println!(
                "array: {} ({:.1} kW DC, DC/AC ratio {:.2})",
                array.summary,
                array.total_power_dc_w / 1000.0,
                array.power_ratio
            );
            println!(
                "cost: {:.0} EUR total ({:.0} equipment, {:.0} installation, {:.2} EUR/W)",
                design_result.cost.total,
                design_result.cost.equipment,
                design_result.cost.installation,
                design_result.cost.per_watt_dc
            );
            println!(
                "production: {:.0} kWh/year ({:.0} kWh/kWp, PR {:.1}%)",
                performance_estimates.annual_production_kwh,
                performance_estimates.specific_yield_kwh_per_kwp,
                performance_estimates.performance_ratio_pct
            );
            let financial = &performance_estimates.financial;
            match financial.payback_period_years {
                Some(payback) => println!("payback: {payback:.1} years"),
                None => println!("payback: not reached within the analysis horizon"),
            }
            println!(
                "NPV: {:.0} EUR, LCOE: {:.3} EUR/kWh",
                financial.npv, financial.lcoe_per_kwh
            );
            println!(
                "environment: {:.1} t CO2/year offset (~{} trees)",
                performance_estimates.environmental.co2_offset_tons,
                performance_estimates.environmental.equivalent_trees
            );
            if let Some(confidence) = record.confidence_score {
                println!("confidence: {confidence}/100");
            }
        }
        (Some(JobOutcome::Failed { failure, message }), _) => {
            println!("failed ({}): {message}", failure.label());
        }
        (None, DesignJobStatus::Pending | DesignJobStatus::Processing) => {
            println!("still running");
        }
        (None, _) => {
            println!("terminal without a recorded outcome");
        }
    }
}
