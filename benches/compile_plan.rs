use criterion::{Criterion, criterion_group, criterion_main};

use lumiseq::prelude::*;

fn build_inputs() -> (ChoreographyPlan, BeatGrid, RigProfile) {
    let grid = BeatGrid::from_constant_bpm(128.0, 4, 240_000).unwrap();
    let fixtures: Vec<FixtureInstance> = (1..=4)
        .map(|i| FixtureInstance::standard(format!("MH{i}"), format!("Dmx MH{i}")))
        .collect();
    let group = FixtureGroup {
        group_id: "moving_heads".to_owned(),
        fixture_ids: fixtures.iter().map(|f| f.fixture_id.clone()).collect(),
        chase_order: ChaseOrder::LeftToRight,
        tags: Vec::new(),
    };
    let rig = RigProfile::new(fixtures, vec![group]).unwrap();
    let plan = ChoreographyPlan::new(
        vec![
            Section::new("intro", 1, 16, "pan_sweep", ["moving_heads"]),
            Section::new("verse", 17, 48, "mirror_wave", ["moving_heads"]),
            Section::new("chorus", 49, 80, "fan_pulse", ["moving_heads"]),
            Section::new("outro", 81, 120, "chevron_bloom", ["moving_heads"]),
        ],
        "bench",
    );
    (plan, grid, rig)
}

fn bench_render(c: &mut Criterion) {
    let registries = Registries::builtins();
    let (plan, grid, rig) = build_inputs();
    c.bench_function("render_four_section_plan", |b| {
        b.iter(|| {
            let pipeline = RenderingPipeline::new(
                plan.clone(),
                grid.clone(),
                rig.clone(),
                &registries,
                PipelineOptions::default(),
            );
            std::hint::black_box(pipeline.render().unwrap())
        })
    });
}

fn bench_emit(c: &mut Criterion) {
    let registries = Registries::builtins();
    let (plan, grid, rig) = build_inputs();
    let pipeline =
        RenderingPipeline::new(plan, grid, rig, &registries, PipelineOptions::default());
    let output = pipeline.render().unwrap();
    c.bench_function("emit_xsq", |b| {
        b.iter(|| std::hint::black_box(emit_xsq(&output.xsq).unwrap()))
    });
}

criterion_group!(benches, bench_render, bench_emit);
criterion_main!(benches);
