//! The template registry: builtin factories and JSON loading.

use std::{
    collections::{BTreeMap, HashMap},
    path::Path,
};

use crate::transition::{TransitionHint, TransitionMode};

use super::{
    DimmerRegistry, GeometryRegistry, MovementRegistry, PatternStep, Preset, StepOverride,
    StepTiming, Template, TemplateError,
};

/// A template together with its presets.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TemplateDoc {
    /// The base template.
    pub template: Template,
    /// Presets selectable by plan sections.
    #[serde(default)]
    pub presets: Vec<Preset>,
}

impl TemplateDoc {
    /// Finds a preset by id.
    ///
    /// # Errors
    ///
    /// [`TemplateError::UnknownPreset`] when absent.
    pub fn preset(&self, preset_id: &str) -> Result<&Preset, TemplateError> {
        self.presets
            .iter()
            .find(|p| p.preset_id == preset_id)
            .ok_or_else(|| TemplateError::UnknownPreset {
                template_id: self.template.template_id.clone(),
                preset_id: preset_id.to_owned(),
            })
    }
}

/// In-process template registry, populated once at startup.
#[derive(Debug, Clone, Default)]
pub struct TemplateRegistry {
    templates: HashMap<String, TemplateDoc>,
}

impl TemplateRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the registry of builtin templates.
    #[must_use]
    pub fn builtins() -> Self {
        let mut registry = Self::new();
        registry.register(pan_sweep_doc());
        registry.register(fan_pulse_doc());
        registry.register(mirror_wave_doc());
        registry.register(chevron_bloom_doc());
        registry
    }

    /// Registers (or replaces) a template document.
    pub fn register(&mut self, doc: TemplateDoc) {
        self.templates
            .insert(doc.template.template_id.clone(), doc);
    }

    /// Resolves a template id.
    ///
    /// # Errors
    ///
    /// [`TemplateError::UnknownTemplate`] when absent.
    pub fn get(&self, template_id: &str) -> Result<&TemplateDoc, TemplateError> {
        self.templates
            .get(template_id)
            .ok_or_else(|| TemplateError::UnknownTemplate(template_id.to_owned()))
    }

    /// All registered template ids, sorted.
    #[must_use]
    pub fn list(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.templates.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Loads every `*.json` template document from a directory.
    ///
    /// Substitutes `{param}` placeholders from `params` before parsing and
    /// validates every pattern id against the libraries.
    ///
    /// # Errors
    ///
    /// [`TemplateError::Load`] for unreadable or invalid files, plus the
    /// pattern-id errors from [`TemplateRegistry::validate_pattern_ids`].
    pub fn load_dir(
        &mut self,
        dir: &Path,
        params: &BTreeMap<String, String>,
        movements: &MovementRegistry,
        dimmers: &DimmerRegistry,
        geometry: &GeometryRegistry,
    ) -> Result<usize, TemplateError> {
        let entries = std::fs::read_dir(dir).map_err(|e| TemplateError::Load {
            template_id: dir.display().to_string(),
            message: e.to_string(),
        })?;
        let mut loaded = 0;
        let mut paths: Vec<_> = entries
            .filter_map(Result::ok)
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();
        for path in paths {
            let template_id = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let text = std::fs::read_to_string(&path).map_err(|e| TemplateError::Load {
                template_id: template_id.clone(),
                message: e.to_string(),
            })?;
            let text = substitute_params(&text, params);
            let doc: TemplateDoc =
                serde_json::from_str(&text).map_err(|e| TemplateError::Load {
                    template_id: template_id.clone(),
                    message: e.to_string(),
                })?;
            doc.template.validate()?;
            Self::validate_pattern_ids(&doc, movements, dimmers, geometry)?;
            self.register(doc);
            loaded += 1;
        }
        Ok(loaded)
    }

    /// Checks that every movement/dimmer/geometry id a document references is
    /// registered in the corresponding library.
    ///
    /// # Errors
    ///
    /// The matching `Unknown*` [`TemplateError`].
    pub fn validate_pattern_ids(
        doc: &TemplateDoc,
        movements: &MovementRegistry,
        dimmers: &DimmerRegistry,
        geometry: &GeometryRegistry,
    ) -> Result<(), TemplateError> {
        for step in &doc.template.steps {
            if !movements.has(&step.movement_id) {
                return Err(TemplateError::UnknownMovement(step.movement_id.clone()));
            }
            if !dimmers.has(&step.dimmer_id) {
                return Err(TemplateError::UnknownDimmer(step.dimmer_id.clone()));
            }
            if let Some(geometry_id) = &step.geometry_id
                && !geometry.has(geometry_id)
            {
                return Err(TemplateError::Load {
                    template_id: doc.template.template_id.clone(),
                    message: format!("unknown geometry '{geometry_id}'"),
                });
            }
        }
        Ok(())
    }
}

/// Replaces `{key}` placeholders with their parameter values.
fn substitute_params(text: &str, params: &BTreeMap<String, String>) -> String {
    let mut out = text.to_owned();
    for (key, value) in params {
        out = out.replace(&format!("{{{key}}}"), value);
    }
    out
}

fn pan_sweep_doc() -> TemplateDoc {
    TemplateDoc {
        template: Template {
            template_id: "pan_sweep".into(),
            version: 1,
            name: "Pan sweep".into(),
            steps: vec![PatternStep::new("step_1", "sweep_lr", "hold")],
            metadata: BTreeMap::new(),
        },
        presets: Vec::new(),
    }
    .with_energy_presets()
}

fn fan_pulse_doc() -> TemplateDoc {
    TemplateDoc {
        template: Template {
            template_id: "fan_pulse".into(),
            version: 1,
            name: "Fan pulse".into(),
            steps: vec![PatternStep {
                geometry_id: Some("fan".into()),
                timing: StepTiming { duration_bars: 2.0 },
                entry_transition: Some(TransitionHint::new(TransitionMode::Crossfade, 0.5)),
                exit_transition: Some(TransitionHint::new(TransitionMode::Crossfade, 0.5)),
                ..PatternStep::new("step_1", "sweep_sine", "pulse")
            }],
            metadata: BTreeMap::new(),
        },
        presets: Vec::new(),
    }
    .with_energy_presets()
}

fn mirror_wave_doc() -> TemplateDoc {
    TemplateDoc {
        template: Template {
            template_id: "mirror_wave".into(),
            version: 1,
            name: "Mirror wave".into(),
            steps: vec![
                PatternStep {
                    geometry_id: Some("mirror_lr".into()),
                    timing: StepTiming { duration_bars: 2.0 },
                    ..PatternStep::new("step_1", "sweep_sine", "breathe")
                },
                PatternStep {
                    geometry_id: Some("wave_lr".into()),
                    timing: StepTiming { duration_bars: 2.0 },
                    ..PatternStep::new("step_2", "circle", "breathe")
                },
            ],
            metadata: BTreeMap::new(),
        },
        presets: Vec::new(),
    }
    .with_energy_presets()
}

fn chevron_bloom_doc() -> TemplateDoc {
    TemplateDoc {
        template: Template {
            template_id: "chevron_bloom".into(),
            version: 1,
            name: "Chevron bloom".into(),
            steps: vec![PatternStep {
                geometry_id: Some("chevron_v".into()),
                timing: StepTiming { duration_bars: 4.0 },
                params: BTreeMap::from([("tightness".to_owned(), 0.7)]),
                ..PatternStep::new("step_1", "figure8", "breathe")
            }],
            metadata: BTreeMap::new(),
        },
        presets: Vec::new(),
    }
    .with_energy_presets()
}

impl TemplateDoc {
    /// Appends the shared `low`/`high` energy presets when a document does not
    /// declare its own, so macro-plan energy hints always have something to
    /// land on.
    fn with_energy_presets(mut self) -> Self {
        let has_low = self.presets.iter().any(|p| p.preset_id == "low");
        let has_high = self.presets.iter().any(|p| p.preset_id == "high");
        if !has_low {
            self.presets.push(Preset {
                preset_id: "low".into(),
                name: "Low energy".into(),
                step_overrides: BTreeMap::new(),
                intensity: Some(super::Intensity::Subtle),
            });
        }
        if !has_high {
            self.presets.push(Preset {
                preset_id: "high".into(),
                name: "High energy".into(),
                step_overrides: BTreeMap::from([(
                    "step_1".to_owned(),
                    StepOverride {
                        dimmer_id: Some("pulse".into()),
                        ..StepOverride::default()
                    },
                )]),
                intensity: Some(super::Intensity::Dramatic),
            });
        }
        self
    }
}
