//! The rendering pipeline: plan → segments → transitions → XSQ.
//!
//! Runs single-threaded and synchronously: sections compile in plan order,
//! steps in declaration order, fixtures in rig order. Segments are sorted by
//! `(fixture_id, t0_ms)` before the transition engine runs, and elements emit
//! in rig order with effects ascending by start time. Inputs are never
//! mutated; a failed run writes no file.

use std::{collections::BTreeMap, path::Path};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    error::CoreError,
    fixture::RigProfile,
    plan::{ChoreographyPlan, EnergyTarget, MacroPlan, Section},
    segment::FixtureSegment,
    template::{
        CompileWarning, DimmerRegistry, FixtureContext, GeometryRegistry, Intensity,
        MovementRegistry, RoleStrategy, TemplateCompileContext, TemplateRegistry, compile,
    },
    timing::{BeatGrid, SectionSpan},
    transition::{SectionTransitions, TransitionConfig, TransitionProcessor},
    xsq::{
        DmxSettingsBuilder, Effect, ElementType, EmissionError, SequenceHead, XSequence,
        write_xsq_file,
    },
};

/// All pattern registries, built once at startup and read-only afterwards.
#[derive(Debug, Clone)]
pub struct Registries {
    /// Template library.
    pub templates: TemplateRegistry,
    /// Movement library.
    pub movements: MovementRegistry,
    /// Dimmer library.
    pub dimmers: DimmerRegistry,
    /// Geometry library.
    pub geometry: GeometryRegistry,
}

impl Registries {
    /// Builds every builtin library.
    #[must_use]
    pub fn builtins() -> Self {
        Self {
            templates: TemplateRegistry::builtins(),
            movements: MovementRegistry::builtins(),
            dimmers: DimmerRegistry::builtins(),
            geometry: GeometryRegistry::builtins(),
        }
    }
}

/// Pipeline tunables and optional inputs.
#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    /// Sample count for curve validation and custom-curve generation.
    pub n_samples: Option<usize>,
    /// Transition engine configuration.
    pub transition: TransitionConfig,
    /// Optional macro-level show intent; absence never fails the pipeline.
    pub macro_plan: Option<MacroPlan>,
    /// A parsed template XSQ whose head, elements and timing tracks are kept.
    pub template_xsq: Option<XSequence>,
    /// Spatial role inference strategy.
    pub role_strategy: RoleStrategy,
    /// Media file recorded in the head.
    pub media_file: String,
    /// Song title recorded in the head.
    pub song: String,
    /// Artist recorded in the head.
    pub artist: String,
}

/// A recoverable condition recorded while rendering.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RenderWarning {
    /// Forwarded from template compilation.
    #[error(transparent)]
    Compile(#[from] CompileWarning),
    /// A section named a preset its template does not declare; the base
    /// template was used.
    #[error("section '{section_id}': preset '{preset_id}' not found, using base template")]
    PresetNotFound {
        /// Section naming the preset.
        section_id: String,
        /// The missing preset.
        preset_id: String,
    },
}

/// Everything a render produced.
#[derive(Debug, Clone)]
pub struct RenderOutput {
    /// The serializable sequence document.
    pub xsq: XSequence,
    /// The final per-fixture timeline, transitions and gap fills included.
    pub segments: Vec<FixtureSegment>,
    /// Per-section spans, for artifact sidecars.
    pub section_spans: BTreeMap<String, SectionSpan>,
    /// Recoverable conditions recorded along the way.
    pub warnings: Vec<RenderWarning>,
}

/// Compiles a choreography plan into an XSQ document.
#[derive(Debug)]
pub struct RenderingPipeline<'a> {
    plan: ChoreographyPlan,
    beat_grid: BeatGrid,
    rig: RigProfile,
    registries: &'a Registries,
    options: PipelineOptions,
}

impl<'a> RenderingPipeline<'a> {
    /// Creates a pipeline over validated-on-render inputs.
    #[must_use]
    pub fn new(
        plan: ChoreographyPlan,
        beat_grid: BeatGrid,
        rig: RigProfile,
        registries: &'a Registries,
        options: PipelineOptions,
    ) -> Self {
        Self {
            plan,
            beat_grid,
            rig,
            registries,
            options,
        }
    }

    /// Renders the plan to an in-memory sequence.
    ///
    /// # Errors
    ///
    /// Validation, template, geometry and emission failures abort with the
    /// offending section attached; no partial output is produced.
    pub fn render(&self) -> Result<RenderOutput, CoreError> {
        let validated = self
            .plan
            .clone()
            .validate(self.beat_grid.total_bars())
            .map_err(CoreError::Validation)?;
        info!(
            sections = validated.sections().len(),
            fixtures = self.rig.fixtures.len(),
            "starting render"
        );

        let mut warnings: Vec<RenderWarning> = Vec::new();
        let mut segments: Vec<FixtureSegment> = Vec::new();
        let mut section_transitions: Vec<SectionTransitions> = Vec::new();
        let mut section_spans = BTreeMap::new();

        for section in validated.sections() {
            let (start_ms, end_ms) = self
                .beat_grid
                .bar_window(section.start_bar, section.end_bar);
            section_spans.insert(section.name.clone(), SectionSpan { start_ms, end_ms });

            let output = self.compile_section(section, &mut warnings)?;
            debug!(
                section = %section.name,
                segments = output.segments.len(),
                cycles = output.num_complete_cycles,
                "section compiled"
            );
            warnings.extend(output.warnings.into_iter().map(RenderWarning::Compile));
            section_transitions.push(SectionTransitions {
                section_id: section.name.clone(),
                entry: output.entry_hint,
                exit: output.exit_hint,
            });
            segments.extend(output.segments);
        }

        segments.sort_by(|a, b| {
            a.fixture_id
                .cmp(&b.fixture_id)
                .then(a.t0_ms.cmp(&b.t0_ms))
        });

        let processor = TransitionProcessor::new(
            self.options.transition,
            &self.rig,
            self.beat_grid.ms_per_bar(),
            section_transitions,
        );
        let timeline = processor.process(segments, self.beat_grid.duration_ms());
        info!(segments = timeline.len(), "timeline complete");

        let xsq = self.serialize(&timeline)?;
        Ok(RenderOutput {
            xsq,
            segments: timeline,
            section_spans,
            warnings,
        })
    }

    /// Renders and writes the XSQ file. Serialization completes in memory
    /// before anything touches the filesystem.
    ///
    /// # Errors
    ///
    /// Everything [`RenderingPipeline::render`] reports, plus I/O failures.
    pub fn render_to_file(&self, path: &Path) -> Result<RenderOutput, CoreError> {
        let output = self.render()?;
        write_xsq_file(&output.xsq, path).map_err(CoreError::Emission)?;
        info!(path = %path.display(), "wrote XSQ");
        Ok(output)
    }

    /// Writes the artifact bundle (merged plan, beat grid, compile trace)
    /// next to the XSQ for post-hoc inspection.
    ///
    /// # Errors
    ///
    /// [`CoreError::Emission`] when a sidecar cannot be written.
    pub fn write_artifacts(&self, output: &RenderOutput, dir: &Path) -> Result<(), CoreError> {
        let write_json = |name: &str, value: &serde_json::Value| -> Result<(), CoreError> {
            let path = dir.join(name);
            let text = serde_json::to_string_pretty(value).map_err(|e| {
                CoreError::Emission(EmissionError::Io {
                    path: path.display().to_string(),
                    message: e.to_string(),
                })
            })?;
            std::fs::write(&path, text).map_err(|e| {
                CoreError::Emission(EmissionError::Io {
                    path: path.display().to_string(),
                    message: e.to_string(),
                })
            })
        };

        write_json("plan.json", &serde_json::to_value(&self.plan).unwrap_or_default())?;
        write_json(
            "beat_grid.json",
            &serde_json::to_value(&self.beat_grid).unwrap_or_default(),
        )?;
        let trace = serde_json::json!({
            "sections": output.section_spans,
            "segments": output.segments.len(),
            "warnings": output
                .warnings
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<String>>(),
        });
        write_json("compile_trace.json", &trace)
    }

    fn compile_section(
        &self,
        section: &Section,
        warnings: &mut Vec<RenderWarning>,
    ) -> Result<crate::template::CompileOutput, CoreError> {
        let doc = self
            .registries
            .templates
            .get(&section.template_id)
            .map_err(|e| CoreError::Template(e).in_section(&section.name, None))?;

        // Explicit preset first; otherwise a macro-plan energy hint may pick
        // one. A missing preset downgrades to a warning.
        let preset = match &section.preset_id {
            Some(preset_id) => match doc.preset(preset_id) {
                Ok(preset) => Some(preset),
                Err(_) => {
                    warn!(section = %section.name, preset = %preset_id, "preset not found");
                    warnings.push(RenderWarning::PresetNotFound {
                        section_id: section.name.clone(),
                        preset_id: preset_id.clone(),
                    });
                    None
                }
            },
            None => self
                .options
                .macro_plan
                .as_ref()
                .and_then(|m| m.energy_for(&section.name))
                .and_then(|energy| {
                    let preset_id = match energy {
                        EnergyTarget::Low => "low",
                        EnergyTarget::High | EnergyTarget::Peak => "high",
                        EnergyTarget::Medium => return None,
                    };
                    doc.preset(preset_id).ok()
                }),
        };

        let fixtures = self.fixture_contexts(section)?;
        let mut context = TemplateCompileContext::new(
            section.name.clone(),
            fixtures,
            &self.beat_grid,
            section.start_bar,
            section.duration_bars(),
            Intensity::default(),
            &self.registries.geometry,
            &self.registries.movements,
            &self.registries.dimmers,
        );
        if let Some(n_samples) = self.options.n_samples {
            context.n_samples = n_samples;
        }

        compile(&doc.template, &context, preset).map_err(|e| e.in_section(&section.name, None))
    }

    /// Expands the section's targets to an ordered, deduplicated fixture
    /// context list with roles assigned.
    fn fixture_contexts(&self, section: &Section) -> Result<Vec<FixtureContext>, CoreError> {
        let mut ids: Vec<String> = Vec::new();
        for target in &section.targets {
            for id in self
                .rig
                .expand_target(target, &section.name)
                .map_err(CoreError::Validation)?
            {
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
        }
        let mut fixtures: Vec<FixtureContext> = ids
            .iter()
            .enumerate()
            .filter_map(|(index, id)| {
                self.rig
                    .fixture(id)
                    .map(|instance| FixtureContext::from_instance(instance, index))
            })
            .collect();
        self.options
            .role_strategy
            .assign(&section.name, &mut fixtures);
        Ok(fixtures)
    }

    /// Serializes the final timeline: elements in rig order, effects ascending
    /// by start time, settings strings interned in the effect DB.
    fn serialize(&self, timeline: &[FixtureSegment]) -> Result<XSequence, CoreError> {
        let mut xsq = match &self.options.template_xsq {
            Some(template) => template.clone(),
            None => XSequence::new(SequenceHead {
                duration_ms: self.beat_grid.duration_ms(),
                media_file: self.options.media_file.clone(),
                song: self.options.song.clone(),
                artist: self.options.artist.clone(),
                ..SequenceHead::default()
            }),
        };
        xsq.effect_db.rebuild_index();

        for fixture in &self.rig.fixtures {
            let builder = DmxSettingsBuilder::new(fixture);
            xsq.ensure_element(ElementType::Model, &fixture.model_name);
            for segment in timeline
                .iter()
                .filter(|s| s.fixture_id == fixture.fixture_id)
            {
                let settings = builder.build(segment).map_err(CoreError::Curve)?;
                let ref_index = xsq.effect_db.intern(settings);
                xsq.add_effect(
                    ElementType::Model,
                    &fixture.model_name,
                    0,
                    Effect {
                        ref_index: Some(ref_index),
                        name: Some("DMX".to_owned()),
                        start_ms: segment.t0_ms,
                        end_ms: segment.t1_ms,
                        ..Effect::default()
                    },
                );
            }
        }

        // A beats timing track, unless a template already provides one.
        if !xsq
            .elements
            .iter()
            .any(|e| e.element_type == ElementType::Timing)
        {
            let beats = self.beat_grid.beat_boundaries();
            for (i, &start) in beats.iter().enumerate() {
                let end = beats
                    .get(i + 1)
                    .copied()
                    .unwrap_or_else(|| self.beat_grid.duration_ms());
                xsq.add_effect(
                    ElementType::Timing,
                    "Beats",
                    0,
                    Effect {
                        label: Some((i + 1).to_string()),
                        start_ms: start,
                        end_ms: end,
                        ..Effect::default()
                    },
                );
            }
        }

        xsq.check_unique_elements().map_err(CoreError::Emission)?;
        Ok(xsq)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::plan::Section;

    use super::*;

    fn simple_pipeline(registries: &Registries) -> RenderingPipeline<'_> {
        let grid = BeatGrid::from_constant_bpm(120.0, 4, 16_000).unwrap();
        let rig = RigProfile::single("MH1", "Dmx MH1");
        let plan = ChoreographyPlan::new(
            vec![Section::new("all", 1, 8, "pan_sweep", ["moving_heads"])],
            "test",
        );
        RenderingPipeline::new(plan, grid, rig, registries, PipelineOptions::default())
    }

    #[test]
    fn render_produces_elements_effects_and_timing() {
        let registries = Registries::builtins();
        let output = simple_pipeline(&registries).render().unwrap();
        let model = output.xsq.element("Dmx MH1").unwrap();
        assert_eq!(model.layers[0].effects.len(), 8);
        assert!(output.xsq.element("Beats").is_some());
        assert!(!output.xsq.effect_db.entries.is_empty());
    }

    #[test]
    fn effects_ascend_within_each_layer() {
        let registries = Registries::builtins();
        let output = simple_pipeline(&registries).render().unwrap();
        for element in &output.xsq.elements {
            for layer in &element.layers {
                for pair in layer.effects.windows(2) {
                    assert!(pair[0].start_ms <= pair[1].start_ms);
                }
            }
        }
    }

    #[test]
    fn invalid_plan_renders_nothing() {
        let registries = Registries::builtins();
        let grid = BeatGrid::from_constant_bpm(120.0, 4, 16_000).unwrap();
        let rig = RigProfile::single("MH1", "Dmx MH1");
        let plan = ChoreographyPlan::new(
            vec![
                Section::new("a", 1, 6, "pan_sweep", ["moving_heads"]),
                Section::new("b", 5, 8, "pan_sweep", ["moving_heads"]),
            ],
            "overlap",
        );
        let pipeline =
            RenderingPipeline::new(plan, grid, rig, &registries, PipelineOptions::default());
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.xsq");
        assert!(pipeline.render_to_file(&path).is_err());
        assert!(!path.exists(), "failed run must not write a file");
    }

    #[test]
    fn unknown_preset_downgrades_to_warning() {
        let registries = Registries::builtins();
        let grid = BeatGrid::from_constant_bpm(120.0, 4, 16_000).unwrap();
        let rig = RigProfile::single("MH1", "Dmx MH1");
        let mut section = Section::new("all", 1, 8, "pan_sweep", ["moving_heads"]);
        section.preset_id = Some("nonexistent".into());
        let plan = ChoreographyPlan::new(vec![section], "test");
        let pipeline =
            RenderingPipeline::new(plan, grid, rig, &registries, PipelineOptions::default());
        let output = pipeline.render().unwrap();
        assert!(output
            .warnings
            .iter()
            .any(|w| matches!(w, RenderWarning::PresetNotFound { .. })));
    }

    #[test]
    fn missing_macro_plan_never_fails() {
        let registries = Registries::builtins();
        let pipeline = simple_pipeline(&registries);
        assert!(pipeline.render().is_ok());
    }
}
