//! Template compilation: template × preset × context → fixture segments.

use thiserror::Error;
use tracing::debug;

use crate::{
    curve::{Curve, CurveError, NativeCurve},
    error::CoreError,
    fixture::Pose,
    segment::{ChannelName, ChannelValue, FixtureSegment},
    transition::TransitionHint,
};

use super::{
    DimmerRender, GeometryAssignment, GeometryParams, PatternStep, Preset, Template,
    context::{FixtureContext, TemplateCompileContext},
};

/// A recoverable condition recorded during compilation.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileWarning {
    /// Declared transitions would consume more than 80% of the section; they
    /// were scaled down so effects keep at least 20%.
    #[error(
        "section '{section_id}': transitions of {requested_bars} bars scaled to {granted_bars} bars"
    )]
    TransitionBudgetScaled {
        /// Section being compiled.
        section_id: String,
        /// Bars the template asked for.
        requested_bars: f64,
        /// Bars actually granted.
        granted_bars: f64,
    },
    /// A channel's curve failed to generate; a flat default at the clamp
    /// midpoint was substituted.
    #[error("{section_id}/{step_id}/{fixture_id}: {channel} curve replaced by default: {error}")]
    CurveFallback {
        /// Section being compiled.
        section_id: String,
        /// Step whose curve failed.
        step_id: String,
        /// Fixture whose channel was replaced.
        fixture_id: String,
        /// The channel.
        channel: ChannelName,
        /// The underlying curve error.
        error: CurveError,
    },
}

/// The result of compiling one template over one section window.
#[derive(Debug, Clone, PartialEq)]
pub struct CompileOutput {
    /// Segments for every `(pass, step, fixture)` combination, in compile
    /// order.
    pub segments: Vec<FixtureSegment>,
    /// How many complete template passes fit the effect window.
    pub num_complete_cycles: u32,
    /// Entry transition after budgeting, for the boundary engine.
    pub entry_hint: Option<TransitionHint>,
    /// Exit transition after budgeting, for the boundary engine.
    pub exit_hint: Option<TransitionHint>,
    /// Recoverable conditions encountered.
    pub warnings: Vec<CompileWarning>,
}

/// Compiles a template against a context, with an optional preset overlay.
///
/// The template tiles across the section's effect window: each complete pass
/// through the steps is one cycle, and a trailing partial pass is clamped to
/// the window. Within a pass, step windows are proportional to their declared
/// `duration_bars`.
///
/// # Errors
///
/// Unknown movement/dimmer/geometry ids and structural template failures are
/// fatal. Curve-level failures recover per-segment with a warning.
pub fn compile(
    template: &Template,
    context: &TemplateCompileContext<'_>,
    preset: Option<&Preset>,
) -> Result<CompileOutput, CoreError> {
    let effective = match preset {
        Some(preset) => preset.apply(template),
        None => template.clone(),
    };
    effective.validate().map_err(CoreError::Template)?;
    let intensity = preset
        .and_then(|p| p.intensity)
        .unwrap_or(context.intensity);
    let preset_id = preset.map(|p| p.preset_id.clone());

    let mut warnings = Vec::new();
    let (entry_hint, exit_hint) = budget_transitions(&effective, context, &mut warnings);
    let entry_bars = entry_hint.as_ref().map_or(0.0, |h| h.duration_bars);
    let exit_bars = exit_hint.as_ref().map_or(0.0, |h| h.duration_bars);

    let effect_start_ms = context.start_ms + (entry_bars * context.ms_per_bar).round() as i64;
    let effect_end_ms =
        context.start_ms + context.duration_ms - (exit_bars * context.ms_per_bar).round() as i64;

    let template_bars = effective.total_step_bars();
    let effect_bars = (effect_end_ms - effect_start_ms) as f64 / context.ms_per_bar;
    let num_complete_cycles = (effect_bars / template_bars).floor() as u32;

    let mut segments = Vec::new();
    let mut cursor = effect_start_ms as f64;
    let mut pass = 0u32;
    'tile: loop {
        for step in &effective.steps {
            if cursor >= effect_end_ms as f64 - 0.5 {
                break 'tile;
            }
            let step_end = (cursor + step.timing.duration_bars * context.ms_per_bar)
                .min(effect_end_ms as f64);
            let t0 = cursor.round() as i64;
            let t1 = step_end.round() as i64;
            if t1 > t0 {
                compile_step(
                    step,
                    &effective,
                    context,
                    preset_id.as_deref(),
                    intensity,
                    pass,
                    t0,
                    t1,
                    &mut segments,
                    &mut warnings,
                )?;
            }
            cursor += step.timing.duration_bars * context.ms_per_bar;
        }
        pass += 1;
    }

    debug!(
        section_id = %context.section_id,
        segments = segments.len(),
        num_complete_cycles,
        "template compiled"
    );

    Ok(CompileOutput {
        segments,
        num_complete_cycles,
        entry_hint,
        exit_hint,
        warnings,
    })
}

/// Reserves entry/exit transition time, scaling down when transitions would
/// starve the effects. Effects always keep at least 20% of the window.
fn budget_transitions(
    template: &Template,
    context: &TemplateCompileContext<'_>,
    warnings: &mut Vec<CompileWarning>,
) -> (Option<TransitionHint>, Option<TransitionHint>) {
    let mut entry = template
        .steps
        .first()
        .and_then(|s| s.entry_transition.clone());
    let mut exit = template.steps.last().and_then(|s| s.exit_transition.clone());

    let requested = entry.as_ref().map_or(0.0, |h| h.duration_bars)
        + exit.as_ref().map_or(0.0, |h| h.duration_bars);
    let total = f64::from(context.duration_bars);
    if requested > 0.8 * total {
        let scale = 0.8 * total / requested;
        if let Some(hint) = entry.as_mut() {
            hint.duration_bars *= scale;
        }
        if let Some(hint) = exit.as_mut() {
            hint.duration_bars *= scale;
        }
        warnings.push(CompileWarning::TransitionBudgetScaled {
            section_id: context.section_id.clone(),
            requested_bars: requested,
            granted_bars: 0.8 * total,
        });
    }
    (entry, exit)
}

#[allow(clippy::too_many_arguments)]
fn compile_step(
    step: &PatternStep,
    template: &Template,
    context: &TemplateCompileContext<'_>,
    preset_id: Option<&str>,
    intensity: super::Intensity,
    pass: u32,
    t0_ms: i64,
    t1_ms: i64,
    segments: &mut Vec<FixtureSegment>,
    warnings: &mut Vec<CompileWarning>,
) -> Result<(), CoreError> {
    let movement = context.movements.resolve(&step.movement_id)?;
    let dimmer = context.dimmers.resolve(&step.dimmer_id)?;

    // Geometry smart fallback: per-fixture curves only for an asymmetric
    // geometry driving more than one fixture.
    let (assignments, per_fixture_curves) = match &step.geometry_id {
        Some(geometry_id) => {
            let params = GeometryParams::from_step_params(&step.params);
            let assignments = context
                .geometry
                .apply(geometry_id, &params, &context.fixtures)?;
            let symmetric = context.geometry.is_symmetric(geometry_id)?;
            (assignments, !symmetric && context.fixtures.len() > 1)
        }
        None => (
            context
                .fixtures
                .iter()
                .map(|f| GeometryAssignment {
                    fixture_id: f.fixture_id.clone(),
                    pan_offset_deg: 0.0,
                    tilt_offset_deg: 0.0,
                    tilt_role: super::TiltRole::default(),
                    phase_offset: 0.0,
                    amplitude_scale: 1.0,
                })
                .collect(),
            false,
        ),
    };

    let window_ms = t1_ms - t0_ms;
    let window_bars = window_ms as f64 / context.ms_per_bar;

    for (fixture, assignment) in context.fixtures.iter().zip(&assignments) {
        let mut segment = FixtureSegment::new(
            context.section_id.clone(),
            step.step_id.clone(),
            template.template_id.clone(),
            format!(
                "{}_{}_{}_{}",
                context.section_id, step.step_id, pass, fixture.fixture_id
            ),
            fixture.fixture_id.clone(),
            t0_ms,
            t1_ms,
        )
        .map_err(CoreError::Validation)?;
        segment.preset_id = preset_id.map(str::to_owned);
        segment.allow_grouping = !per_fixture_curves;
        segment
            .metadata
            .insert("movement_id".to_owned(), step.movement_id.clone());
        segment
            .metadata
            .insert("dimmer_id".to_owned(), step.dimmer_id.clone());
        if let Some(geometry_id) = &step.geometry_id {
            segment
                .metadata
                .insert("geometry_id".to_owned(), geometry_id.clone());
        }
        segment.metadata.insert("role".to_owned(), fixture.role.clone());

        let cal = &fixture.calibration;
        let tilt_deg = assignment.tilt_role.canonical_tilt_deg() + assignment.tilt_offset_deg;
        let aim = Pose::new(assignment.pan_offset_deg, tilt_deg);
        let (pan_base, tilt_base) = cal.degrees_to_dmx(aim);

        // Pan.
        segment.set_channel(movement_channel_value(
            ChannelName::Pan,
            movement.pan_curve,
            movement.amplitude_deg * cal.pan_dmx_per_degree() * assignment.amplitude_scale,
            pan_base,
            cal.pan_min_dmx,
            cal.pan_max_dmx,
            movement.cycles_per_bar * window_bars,
            assignment.phase_offset,
            1.0,
            context,
            step,
            fixture,
            warnings,
        )?);

        // Tilt.
        segment.set_channel(movement_channel_value(
            ChannelName::Tilt,
            movement.tilt_curve,
            movement.tilt_amplitude_deg * cal.tilt_dmx_per_degree() * assignment.amplitude_scale,
            tilt_base,
            cal.tilt_min_dmx,
            cal.tilt_max_dmx,
            movement.cycles_per_bar * window_bars,
            assignment.phase_offset,
            movement.tilt_frequency,
            context,
            step,
            fixture,
            warnings,
        )?);

        // Dimmer.
        let floor = cal.dimmer_floor_dmx;
        let ceiling = cal.dimmer_ceiling_dmx.max(floor);
        let dimmer_value = match dimmer.render(
            intensity,
            0.0,
            1.0,
            window_ms,
            context.beat_grid,
            context.n_samples,
        ) {
            Ok(DimmerRender::Static(dmx)) => {
                ChannelValue::static_value(ChannelName::Dimmer, dmx, floor, ceiling)
            }
            Ok(DimmerRender::Curve(points)) => ChannelValue::absolute_curve(
                ChannelName::Dimmer,
                Curve::Custom(points),
                floor,
                ceiling,
            ),
            Err(error) => {
                warnings.push(CompileWarning::CurveFallback {
                    section_id: context.section_id.clone(),
                    step_id: step.step_id.clone(),
                    fixture_id: fixture.fixture_id.clone(),
                    channel: ChannelName::Dimmer,
                    error,
                });
                let midpoint = midpoint_dmx(floor, ceiling);
                ChannelValue::static_value(ChannelName::Dimmer, midpoint, floor, ceiling)
            }
        }
        .map_err(CoreError::Validation)?;
        segment.set_channel(dimmer_value);

        segments.push(segment);
    }
    Ok(())
}

/// Builds a movement channel value: an offset-centered curve when the pattern
/// drives the channel, a static position otherwise. Curve failures substitute
/// a static hold at the base position and record a warning.
#[allow(clippy::too_many_arguments)]
fn movement_channel_value(
    channel: ChannelName,
    kind: Option<crate::curve::NativeKind>,
    amplitude_dmx: f64,
    base_dmx: u8,
    clamp_min: u8,
    clamp_max: u8,
    cycles: f64,
    phase: f64,
    frequency: f64,
    context: &TemplateCompileContext<'_>,
    step: &PatternStep,
    fixture: &FixtureContext,
    warnings: &mut Vec<CompileWarning>,
) -> Result<ChannelValue, CoreError> {
    let Some(kind) = kind else {
        return ChannelValue::static_value(channel, base_dmx, clamp_min, clamp_max)
            .map_err(CoreError::Validation);
    };

    // Fit the swing inside the safety interval, re-centering the base so the
    // full amplitude stays reachable.
    let span = f64::from(clamp_max) - f64::from(clamp_min);
    let amplitude = amplitude_dmx.abs().min(span);
    if amplitude_dmx.abs() > span {
        debug!(
            fixture_id = %fixture.fixture_id,
            %channel,
            requested = amplitude_dmx.abs(),
            granted = span,
            "movement swing clamped to safety limits"
        );
    }
    let half = amplitude / 2.0;
    let base = f64::from(base_dmx)
        .clamp(f64::from(clamp_min) + half, f64::from(clamp_max) - half)
        .round();

    let native = NativeCurve::new(kind)
        .with_cycles(cycles)
        .with_frequency(frequency)
        .with_phase(phase);
    let curve = Curve::Native(native);

    match curve.generate(context.n_samples) {
        Ok(_) => ChannelValue::offset_curve(
            channel,
            curve,
            base as u8,
            amplitude.round().min(255.0) as u8,
            clamp_min,
            clamp_max,
        )
        .map_err(CoreError::Validation),
        Err(error) => {
            warnings.push(CompileWarning::CurveFallback {
                section_id: context.section_id.clone(),
                step_id: step.step_id.clone(),
                fixture_id: fixture.fixture_id.clone(),
                channel,
                error,
            });
            ChannelValue::static_value(channel, midpoint_dmx(clamp_min, clamp_max), clamp_min, clamp_max)
                .map_err(CoreError::Validation)
        }
    }
}

fn midpoint_dmx(lo: u8, hi: u8) -> u8 {
    ((u16::from(lo) + u16::from(hi)) / 2) as u8
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::{
        template::{
            DimmerRegistry, GeometryRegistry, Intensity, MovementRegistry, PatternStep,
            RoleStrategy, StepTiming, TemplateCompileContext,
        },
        timing::BeatGrid,
        transition::{TransitionHint, TransitionMode},
    };

    use super::*;

    fn context<'a>(
        grid: &'a BeatGrid,
        geometry: &'a GeometryRegistry,
        movements: &'a MovementRegistry,
        dimmers: &'a DimmerRegistry,
        n_fixtures: usize,
        start_bar: u32,
        duration_bars: u32,
    ) -> TemplateCompileContext<'a> {
        let mut fixtures: Vec<FixtureContext> = (0..n_fixtures)
            .map(|i| FixtureContext::for_tests(&format!("MH{}", i + 1), i))
            .collect();
        RoleStrategy::FourPointChevron.assign("moving_heads", &mut fixtures);
        TemplateCompileContext::new(
            "verse",
            fixtures,
            grid,
            start_bar,
            duration_bars,
            Intensity::Smooth,
            geometry,
            movements,
            dimmers,
        )
    }

    fn one_step_template(movement: &str, dimmer: &str) -> Template {
        Template {
            template_id: "pan_sweep".into(),
            version: 1,
            name: "Pan sweep".into(),
            steps: vec![PatternStep::new("step_1", movement, dimmer)],
            metadata: Default::default(),
        }
    }

    #[test]
    fn one_bar_step_tiles_across_the_window() {
        let grid = BeatGrid::from_constant_bpm(120.0, 4, 180_000).unwrap();
        let (g, m, d) = (
            GeometryRegistry::builtins(),
            MovementRegistry::builtins(),
            DimmerRegistry::builtins(),
        );
        let ctx = context(&grid, &g, &m, &d, 1, 1, 90);
        let out = compile(&one_step_template("sweep_lr", "hold"), &ctx, None).unwrap();

        assert_eq!(out.segments.len(), 90);
        assert_eq!(out.num_complete_cycles, 90);
        for (i, segment) in out.segments.iter().enumerate() {
            assert_eq!(segment.duration_ms(), 2_000, "segment {i}");
            assert_eq!(segment.t0_ms, i as i64 * 2_000);
        }
    }

    #[test]
    fn multi_step_windows_are_proportional() {
        let grid = BeatGrid::from_constant_bpm(120.0, 4, 16_000).unwrap();
        let (g, m, d) = (
            GeometryRegistry::builtins(),
            MovementRegistry::builtins(),
            DimmerRegistry::builtins(),
        );
        let ctx = context(&grid, &g, &m, &d, 1, 1, 8);
        let mut template = one_step_template("sweep_sine", "breathe");
        template.steps = vec![
            PatternStep {
                timing: StepTiming { duration_bars: 6.0 },
                ..PatternStep::new("long", "sweep_sine", "breathe")
            },
            PatternStep {
                timing: StepTiming { duration_bars: 2.0 },
                ..PatternStep::new("short", "circle", "pulse")
            },
        ];
        let out = compile(&template, &ctx, None).unwrap();
        assert_eq!(out.segments.len(), 2);
        assert_eq!(out.segments[0].duration_ms(), 12_000);
        assert_eq!(out.segments[1].duration_ms(), 4_000);
        assert_eq!(out.num_complete_cycles, 1);
    }

    #[test]
    fn transition_budget_scales_down_past_eighty_percent() {
        let grid = BeatGrid::from_constant_bpm(120.0, 4, 8_000).unwrap();
        let (g, m, d) = (
            GeometryRegistry::builtins(),
            MovementRegistry::builtins(),
            DimmerRegistry::builtins(),
        );
        let ctx = context(&grid, &g, &m, &d, 1, 1, 4);
        let mut template = one_step_template("sweep_sine", "hold");
        template.steps[0].entry_transition =
            Some(TransitionHint::new(TransitionMode::Crossfade, 2.0));
        template.steps[0].exit_transition =
            Some(TransitionHint::new(TransitionMode::Crossfade, 2.0));

        let out = compile(&template, &ctx, None).unwrap();
        assert!(matches!(
            out.warnings.as_slice(),
            [CompileWarning::TransitionBudgetScaled { .. }]
        ));
        let granted = out.entry_hint.unwrap().duration_bars + out.exit_hint.unwrap().duration_bars;
        assert!((granted - 3.2).abs() < 1e-9, "granted {granted}");
        // Effects keep at least 20% of the window.
        let effect_ms: i64 = out.segments.iter().map(FixtureSegment::duration_ms).sum();
        assert!(effect_ms >= 8_000 / 5);
    }

    #[test]
    fn asymmetric_geometry_disables_grouping() {
        let grid = BeatGrid::from_constant_bpm(120.0, 4, 8_000).unwrap();
        let (g, m, d) = (
            GeometryRegistry::builtins(),
            MovementRegistry::builtins(),
            DimmerRegistry::builtins(),
        );
        let ctx = context(&grid, &g, &m, &d, 4, 1, 4);
        let mut template = one_step_template("sweep_sine", "hold");
        template.steps[0].geometry_id = Some("wave_lr".into());
        let out = compile(&template, &ctx, None).unwrap();
        assert!(out.segments.iter().all(|s| !s.allow_grouping));

        let mut symmetric = one_step_template("sweep_sine", "hold");
        symmetric.steps[0].geometry_id = Some("fan".into());
        let out = compile(&symmetric, &ctx, None).unwrap();
        assert!(out.segments.iter().all(|s| s.allow_grouping));
    }

    #[test]
    fn single_fixture_always_groups() {
        let grid = BeatGrid::from_constant_bpm(120.0, 4, 8_000).unwrap();
        let (g, m, d) = (
            GeometryRegistry::builtins(),
            MovementRegistry::builtins(),
            DimmerRegistry::builtins(),
        );
        let ctx = context(&grid, &g, &m, &d, 1, 1, 4);
        let mut template = one_step_template("sweep_sine", "hold");
        template.steps[0].geometry_id = Some("wave_lr".into());
        let out = compile(&template, &ctx, None).unwrap();
        assert!(out.segments.iter().all(|s| s.allow_grouping));
    }

    #[test]
    fn segments_carry_minimum_channels_and_clamps() {
        let grid = BeatGrid::from_constant_bpm(120.0, 4, 8_000).unwrap();
        let (g, m, d) = (
            GeometryRegistry::builtins(),
            MovementRegistry::builtins(),
            DimmerRegistry::builtins(),
        );
        let ctx = context(&grid, &g, &m, &d, 2, 1, 4);
        let out = compile(&one_step_template("circle", "breathe"), &ctx, None).unwrap();
        for segment in &out.segments {
            segment.validate().unwrap();
            for channel in [ChannelName::Pan, ChannelName::Tilt, ChannelName::Dimmer] {
                assert!(segment.channel(channel).is_some(), "missing {channel}");
            }
        }
    }

    #[test]
    fn unknown_movement_is_fatal() {
        let grid = BeatGrid::from_constant_bpm(120.0, 4, 8_000).unwrap();
        let (g, m, d) = (
            GeometryRegistry::builtins(),
            MovementRegistry::builtins(),
            DimmerRegistry::builtins(),
        );
        let ctx = context(&grid, &g, &m, &d, 1, 1, 4);
        let template = one_step_template("warp", "hold");
        assert!(compile(&template, &ctx, None).is_err());
    }
}
