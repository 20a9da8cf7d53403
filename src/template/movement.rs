//! The movement pattern library.

use std::collections::HashMap;

use crate::curve::NativeKind;

use super::TemplateError;

/// An abstract movement: which curves drive pan and tilt, and how far.
///
/// `amplitude_deg` values are peak-to-peak travel; the compiler converts them
/// to DMX swing against each fixture's calibrated range and clamps to its
/// safety limits.
#[derive(Debug, Clone, PartialEq)]
pub struct MovementPattern {
    /// Pattern identifier.
    pub movement_id: String,
    /// Curve driving the pan channel, `None` for a static pan.
    pub pan_curve: Option<NativeKind>,
    /// Curve driving the tilt channel, `None` for a static tilt.
    pub tilt_curve: Option<NativeKind>,
    /// Tilt frequency multiplier relative to pan (2.0 for a figure-eight).
    pub tilt_frequency: f64,
    /// Peak-to-peak pan travel in degrees.
    pub amplitude_deg: f64,
    /// Peak-to-peak tilt travel in degrees.
    pub tilt_amplitude_deg: f64,
    /// Movement cycles per bar for periodic curves.
    pub cycles_per_bar: f64,
}

/// The registry of movement patterns, keyed by id.
#[derive(Debug, Clone)]
pub struct MovementRegistry {
    patterns: HashMap<String, MovementPattern>,
}

impl MovementRegistry {
    /// Builds the registry of builtin movements.
    #[must_use]
    pub fn builtins() -> Self {
        let mut registry = Self {
            patterns: HashMap::new(),
        };
        registry.register(MovementPattern {
            movement_id: "sweep_lr".into(),
            pan_curve: Some(NativeKind::Ramp),
            tilt_curve: None,
            tilt_frequency: 1.0,
            amplitude_deg: 540.0,
            tilt_amplitude_deg: 0.0,
            cycles_per_bar: 0.0,
        });
        registry.register(MovementPattern {
            movement_id: "sweep_sine".into(),
            pan_curve: Some(NativeKind::Sine),
            tilt_curve: None,
            tilt_frequency: 1.0,
            amplitude_deg: 120.0,
            tilt_amplitude_deg: 0.0,
            cycles_per_bar: 0.25,
        });
        registry.register(MovementPattern {
            movement_id: "circle".into(),
            pan_curve: Some(NativeKind::Sine),
            tilt_curve: Some(NativeKind::Cosine),
            tilt_frequency: 1.0,
            amplitude_deg: 90.0,
            tilt_amplitude_deg: 45.0,
            cycles_per_bar: 0.25,
        });
        registry.register(MovementPattern {
            movement_id: "figure8".into(),
            pan_curve: Some(NativeKind::Sine),
            tilt_curve: Some(NativeKind::Sine),
            tilt_frequency: 2.0,
            amplitude_deg: 90.0,
            tilt_amplitude_deg: 40.0,
            cycles_per_bar: 0.25,
        });
        registry.register(MovementPattern {
            movement_id: "tilt_wave".into(),
            pan_curve: None,
            tilt_curve: Some(NativeKind::Sine),
            tilt_frequency: 1.0,
            amplitude_deg: 0.0,
            tilt_amplitude_deg: 50.0,
            cycles_per_bar: 0.5,
        });
        registry.register(MovementPattern {
            movement_id: "static_pose".into(),
            pan_curve: None,
            tilt_curve: None,
            tilt_frequency: 1.0,
            amplitude_deg: 0.0,
            tilt_amplitude_deg: 0.0,
            cycles_per_bar: 0.0,
        });
        registry
    }

    /// Registers (or replaces) a pattern.
    pub fn register(&mut self, pattern: MovementPattern) {
        self.patterns.insert(pattern.movement_id.clone(), pattern);
    }

    /// Resolves a movement id.
    ///
    /// # Errors
    ///
    /// [`TemplateError::UnknownMovement`] when the id is not registered.
    pub fn resolve(&self, movement_id: &str) -> Result<&MovementPattern, TemplateError> {
        self.patterns
            .get(movement_id)
            .ok_or_else(|| TemplateError::UnknownMovement(movement_id.to_owned()))
    }

    /// Whether an id is registered.
    #[must_use]
    pub fn has(&self, movement_id: &str) -> bool {
        self.patterns.contains_key(movement_id)
    }

    /// All registered ids, sorted.
    #[must_use]
    pub fn list(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.patterns.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_resolve() {
        let registry = MovementRegistry::builtins();
        for id in ["sweep_lr", "circle", "figure8", "tilt_wave", "static_pose"] {
            assert!(registry.resolve(id).is_ok(), "missing builtin '{id}'");
        }
    }

    #[test]
    fn unknown_movement_errors() {
        let registry = MovementRegistry::builtins();
        assert!(matches!(
            registry.resolve("teleport"),
            Err(TemplateError::UnknownMovement(_))
        ));
    }
}
