//! ---
//! ems_section: "11-simulation"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Appliance activation synthesis and calendar placement."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
//! Synthetic appliance load curves.
//!
//! Recorded activation templates are reshaped into a new cycle with a chosen
//! peak power and duration ([`synth`]), then laid out over a calendar window
//! either uniformly per day or following an hour-of-day weekly schedule
//! ([`placement`]). The resulting series is exported as CSV for grid
//! simulator players ([`export`]).
pub mod align;
pub mod curve;
pub mod errors;
pub mod export;
pub mod placement;
pub mod resample;
pub mod scenario;
pub mod schedule;
pub mod series;
pub mod synth;
pub mod template;

use tracing::info;

pub use errors::{Result, SynthError};
pub use export::{export_csv, read_csv, write_csv, CsvLayout};
pub use placement::{place_probabilistic_weekly, place_uniform_random, seeded_rng, PlacementMode};
pub use resample::InterpolationKind;
pub use scenario::{run_scenario, ApplianceConfig, ScenarioConfig, ScenarioReport};
pub use schedule::{DayTypeSchedule, ScheduleConfig};
pub use series::{CalendarWindow, SeriesPoint, SeriesSummary, TimeSeries};
pub use synth::{
    synthesize_activation, ActivationCurve, GenerationMethod, GenerationParams, Strategy,
};
pub use template::{load_templates, TemplatePattern, TemplateStore};

/// Sampling interval of recorded templates, in seconds.
pub const DEFAULT_NATIVE_TIMESTEP_SECS: u32 = 7;
/// Sampling interval of exported series, in seconds.
pub const DEFAULT_OUTPUT_TIMESTEP_SECS: u32 = 60;

/// Synthesise one activation and place it over `window`.
///
/// The same curve is reused for every placed activation. `seed` drives the
/// placement generator; `None` draws from OS entropy.
pub fn generate_timeseries(
    templates: &[TemplatePattern],
    params: &GenerationParams,
    window: &CalendarWindow,
    placement: &PlacementMode,
    seed: Option<u64>,
) -> Result<TimeSeries> {
    let curve = synthesize_activation(templates, params)?;
    let mut rng = seeded_rng(seed);
    let series = placement.place(&curve, window, &mut rng)?;
    info!(
        start = %window.start(),
        end = %window.end(),
        curve_samples = curve.len(),
        seed = ?seed,
        "generated appliance time series"
    );
    Ok(series)
}
