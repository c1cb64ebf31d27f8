//! ---
//! ems_section: "11-simulation"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Appliance activation synthesis and calendar placement."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
//! Curve synthesis from recorded templates.
//!
//! Every strategy builds one activation at the native timestep from templates
//! that have been normalised, scaled to the target power band and resampled to
//! the target duration. The result is then moved onto the output grid.
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_with::{DeserializeFromStr, SerializeDisplay};
use tracing::{debug, info, warn};

use crate::align::align;
use crate::curve::{clamp_non_negative, normalize, peak, scale};
use crate::errors::{Result, SynthError};
use crate::resample::{resample, resample_timestep, InterpolationKind};
use crate::template::TemplatePattern;
use crate::{DEFAULT_NATIVE_TIMESTEP_SECS, DEFAULT_OUTPUT_TIMESTEP_SECS};

/// String identifiers accepted in configuration files and on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, SerializeDisplay, DeserializeFromStr)]
pub enum GenerationMethod {
    Weighted,
    Interpolate,
    #[default]
    Scaling,
    Dtw,
}

impl GenerationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationMethod::Weighted => "weighted",
            GenerationMethod::Interpolate => "interpolate",
            GenerationMethod::Scaling => "scaling",
            GenerationMethod::Dtw => "dtw",
        }
    }
}

impl fmt::Display for GenerationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GenerationMethod {
    type Err = SynthError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "weighted" => Ok(GenerationMethod::Weighted),
            "interpolate" => Ok(GenerationMethod::Interpolate),
            "scaling" => Ok(GenerationMethod::Scaling),
            "dtw" => Ok(GenerationMethod::Dtw),
            other => Err(SynthError::invalid(format!(
                "unknown generation method '{}'",
                other
            ))),
        }
    }
}

/// Curve synthesis strategy together with the knobs it reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Blend every template, weighted by closeness in peak power and duration.
    WeightedAverage,
    /// Linear blend of the two templates closest in peak power.
    NearestTwo,
    /// Replay one template; out-of-range indices fall back to the first.
    DirectScaling { index: usize },
    /// Average all templates after warping them onto a reference template.
    DtwAverage { reference: usize },
}

impl Strategy {
    pub fn from_method(method: GenerationMethod, ref_index: usize) -> Self {
        match method {
            GenerationMethod::Weighted => Strategy::WeightedAverage,
            GenerationMethod::Interpolate => Strategy::NearestTwo,
            GenerationMethod::Scaling => Strategy::DirectScaling { index: ref_index },
            GenerationMethod::Dtw => Strategy::DtwAverage {
                reference: ref_index,
            },
        }
    }

    pub fn method(&self) -> GenerationMethod {
        match self {
            Strategy::WeightedAverage => GenerationMethod::Weighted,
            Strategy::NearestTwo => GenerationMethod::Interpolate,
            Strategy::DirectScaling { .. } => GenerationMethod::Scaling,
            Strategy::DtwAverage { .. } => GenerationMethod::Dtw,
        }
    }
}

impl Default for Strategy {
    fn default() -> Self {
        Strategy::DirectScaling { index: 0 }
    }
}

/// Target shape of the synthesised activation.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    /// Peak power in watts.
    pub nominal_power: f64,
    pub duration_min: f64,
    /// Power floor the curve is scaled onto.
    pub baseline: f64,
    pub native_timestep_secs: u32,
    pub output_timestep_secs: u32,
    pub strategy: Strategy,
    pub interpolation: InterpolationKind,
}

impl GenerationParams {
    pub fn new(nominal_power: f64, duration_min: f64, strategy: Strategy) -> Self {
        Self {
            nominal_power,
            duration_min,
            baseline: 0.0,
            native_timestep_secs: DEFAULT_NATIVE_TIMESTEP_SECS,
            output_timestep_secs: DEFAULT_OUTPUT_TIMESTEP_SECS,
            strategy,
            interpolation: InterpolationKind::default(),
        }
    }

    pub fn with_baseline(mut self, baseline: f64) -> Self {
        self.baseline = baseline;
        self
    }

    pub fn with_timesteps(mut self, native_secs: u32, output_secs: u32) -> Self {
        self.native_timestep_secs = native_secs;
        self.output_timestep_secs = output_secs;
        self
    }

    pub fn with_interpolation(mut self, kind: InterpolationKind) -> Self {
        self.interpolation = kind;
        self
    }

    /// Reject values the synthesis formulas cannot work with.
    ///
    /// Duration and timesteps must be positive. Nominal power must be finite,
    /// and positive for the weighted average whose weights divide by it. The
    /// baseline is free: a baseline above nominal simply inverts the scaled shape.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("duration_min", self.duration_min),
            ("native timestep", f64::from(self.native_timestep_secs)),
            ("output timestep", f64::from(self.output_timestep_secs)),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(SynthError::invalid(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
        }
        if !self.nominal_power.is_finite() || !self.baseline.is_finite() {
            return Err(SynthError::invalid(format!(
                "nominal_power {} and baseline {} must be finite",
                self.nominal_power, self.baseline
            )));
        }
        if self.strategy == Strategy::WeightedAverage && self.nominal_power <= 0.0 {
            return Err(SynthError::invalid(format!(
                "weighted synthesis needs a positive nominal_power, got {}",
                self.nominal_power
            )));
        }
        Ok(())
    }
}

/// One synthesised appliance cycle on the output grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivationCurve {
    samples: Vec<f64>,
    timestep_secs: u32,
}

impl ActivationCurve {
    pub fn new(samples: Vec<f64>, timestep_secs: u32) -> Self {
        Self {
            samples,
            timestep_secs,
        }
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn timestep_secs(&self) -> u32 {
        self.timestep_secs
    }

    pub fn peak(&self) -> f64 {
        peak(&self.samples)
    }

    /// Energy of one cycle in watt-hours.
    pub fn energy_wh(&self) -> f64 {
        self.samples.iter().sum::<f64>() * f64::from(self.timestep_secs) / 3600.0
    }
}

/// Synthesise one activation and resample it onto the output timestep.
pub fn synthesize_activation(
    templates: &[TemplatePattern],
    params: &GenerationParams,
) -> Result<ActivationCurve> {
    let native = synthesize_native(templates, params)?;
    let samples = resample_timestep(
        &native,
        params.duration_min,
        f64::from(params.native_timestep_secs),
        f64::from(params.output_timestep_secs),
    );
    let curve = ActivationCurve::new(samples, params.output_timestep_secs);
    info!(
        method = %params.strategy.method(),
        templates = templates.len(),
        native_samples = native.len(),
        output_samples = curve.len(),
        peak_w = curve.peak(),
        "synthesised activation curve"
    );
    Ok(curve)
}

/// Synthesise one activation at the native timestep.
pub fn synthesize_native(
    templates: &[TemplatePattern],
    params: &GenerationParams,
) -> Result<Vec<f64>> {
    params.validate()?;
    if templates.is_empty() {
        return Err(SynthError::invalid("at least one template is required"));
    }
    let mut curve = match params.strategy {
        Strategy::WeightedAverage => weighted_average(templates, params),
        Strategy::NearestTwo => nearest_two(templates, params),
        Strategy::DirectScaling { index } => direct_scaling(templates, params, index),
        Strategy::DtwAverage { reference } => dtw_average(templates, params, reference),
    };
    // Cubic resampling can undershoot around sharp edges.
    clamp_non_negative(&mut curve);
    Ok(curve)
}

/// Per-template blending weights, normalised to sum to one.
pub fn template_weights(templates: &[TemplatePattern], nominal: f64, duration_min: f64) -> Vec<f64> {
    let raw: Vec<f64> = templates
        .iter()
        .map(|tpl| {
            let power_weight = 1.0 / (1.0 + (tpl.max_power - nominal).abs() / nominal);
            let duration_weight =
                1.0 / (1.0 + (tpl.duration_min() - duration_min).abs() / duration_min);
            power_weight * duration_weight
        })
        .collect();
    let total: f64 = raw.iter().sum();
    if total > 0.0 && total.is_finite() {
        raw.iter().map(|w| w / total).collect()
    } else {
        vec![1.0 / templates.len() as f64; templates.len()]
    }
}

/// Normalise, scale and stretch one template to the target duration.
fn shape(template: &TemplatePattern, params: &GenerationParams) -> Vec<f64> {
    let scaled = scale(
        &normalize(&template.power_sequence),
        params.nominal_power,
        params.baseline,
    );
    resample(
        &scaled,
        params.duration_min,
        f64::from(params.native_timestep_secs),
        params.interpolation,
    )
}

fn weighted_average(templates: &[TemplatePattern], params: &GenerationParams) -> Vec<f64> {
    let weights = template_weights(templates, params.nominal_power, params.duration_min);
    debug!(?weights, "weighted-average template weights");
    let mut blended: Vec<f64> = Vec::new();
    for (template, weight) in templates.iter().zip(&weights) {
        let shaped = shape(template, params);
        if blended.is_empty() {
            blended = vec![0.0; shaped.len()];
        }
        for (acc, value) in blended.iter_mut().zip(&shaped) {
            *acc += value * weight;
        }
    }
    blended
}

fn nearest_two(templates: &[TemplatePattern], params: &GenerationParams) -> Vec<f64> {
    let nominal = params.nominal_power;
    let mut ranked: Vec<usize> = (0..templates.len()).collect();
    ranked.sort_by(|&a, &b| {
        let da = (templates[a].max_power - nominal).abs();
        let db = (templates[b].max_power - nominal).abs();
        da.total_cmp(&db)
    });

    let first = &templates[ranked[0]];
    if ranked.len() == 1 {
        return shape(first, params);
    }
    let second = &templates[ranked[1]];
    let s1 = shape(first, params);
    let s2 = shape(second, params);
    let (p1, p2) = (first.max_power, second.max_power);
    let alpha = if p1 == p2 {
        0.5
    } else {
        ((nominal - p1) / (p2 - p1)).clamp(0.0, 1.0)
    };
    debug!(p1, p2, alpha, "nearest-two interpolation");
    s1.iter()
        .zip(&s2)
        .map(|(a, b)| (1.0 - alpha) * a + alpha * b)
        .collect()
}

fn pick<'a>(
    templates: &'a [TemplatePattern],
    index: usize,
    role: &str,
) -> &'a TemplatePattern {
    templates.get(index).unwrap_or_else(|| {
        warn!(
            index,
            available = templates.len(),
            role,
            "template index out of range; using the first template"
        );
        &templates[0]
    })
}

fn direct_scaling(templates: &[TemplatePattern], params: &GenerationParams, index: usize) -> Vec<f64> {
    shape(pick(templates, index, "scaling"), params)
}

fn dtw_average(templates: &[TemplatePattern], params: &GenerationParams, reference: usize) -> Vec<f64> {
    let reference_curve = shape(pick(templates, reference, "dtw reference"), params);
    let mut sum = vec![0.0; reference_curve.len()];
    for template in templates {
        let aligned = align(&shape(template, params), &reference_curve);
        for (acc, value) in sum.iter_mut().zip(&aligned) {
            *acc += value;
        }
    }
    let count = templates.len() as f64;
    sum.into_iter().map(|v| v / count).collect()
}
