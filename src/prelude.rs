//! Convenient re-exports of the public surface.
//!
//! `use lumiseq::prelude::*;` pulls in everything needed to drive the
//! pipeline end to end.

pub use crate::{
    curve::{
        Curve, CurveError, CurvePoint, DmxMapMode, NativeCurve, NativeDmxCurve, NativeKind,
        invert_limits, map_to_dmx, samples_for_duration,
    },
    error::{CoreError, ValidationError},
    fixture::{
        ChannelInversions, ChaseOrder, DmxMapping, FixtureCalibration, FixtureGroup,
        FixtureInstance, FixturePosition, PlanTarget, Pose, RigProfile, SplitDimension,
        load_fixture_file,
    },
    pipeline::{
        PipelineOptions, Registries, RenderOutput, RenderWarning, RenderingPipeline,
    },
    plan::{
        ChoreographyPlan, EnergyTarget, MacroPlan, PalettePlan, PaletteRef, Section, SectionHint,
        ValidatedPlan,
    },
    segment::{BlendMode, ChannelName, ChannelValue, FixtureSegment},
    template::{
        CompileOutput, CompileWarning, DimmerPattern, DimmerRegistry, DimmerRender,
        FixtureContext, GeometryAssignment, GeometryError, GeometryParams, GeometryRegistry,
        Intensity, IntensityParams, MovementPattern, MovementRegistry, PatternStep, Preset,
        RoleStrategy,
        StepOverride, StepTiming, Template, TemplateCompileContext, TemplateDoc, TemplateError,
        TemplateRegistry, TiltRole, compile,
    },
    timing::{BeatGrid, GridError, Resolution, SectionSpan, TimeRef, TimeResolver},
    transition::{
        Boundary, BoundaryKind, SectionTransitions, TransitionConfig, TransitionHint,
        TransitionMode, TransitionProcessor, TransitionStrategy, blend_value, detect_boundaries,
    },
    xsq::{
        DisplayElement, DmxSettingsBuilder, Effect, EffectDb, EffectLayer, Element, ElementType,
        EmissionError, SequenceHead, XSequence, XsqParseError, custom_value_curve_string,
        emit_xsq, fmt_trunc, native_value_curve_string, parse_xsq, write_xsq_file,
    },
};
