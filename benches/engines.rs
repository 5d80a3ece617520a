use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use epigrid::{
    Direction, Entity, Grid, Parameters, PartitionedEngine, Population, SequentialEngine, Status,
};

static POPULATION: u32 = 2400;
static TICKS: u32 = 50;
static GRID_SIZE: i32 = 60;

// Deterministic scatter of people over the grid; every tenth person starts infected.
fn population(grid: &Grid) -> Population {
    let parameters = Parameters::default();
    let directions = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
    ];
    Population::new(
        (0..POPULATION)
            .map(|i| {
                let status = if i % 10 == 0 {
                    Status::Infected
                } else {
                    Status::Susceptible
                };
                let x = (i * 7 % grid.max_x as u32) as i32;
                let y = (i * 13 % grid.max_y as u32) as i32;
                Entity::new(
                    i + 1,
                    (x, y),
                    status,
                    directions[(i % 4) as usize],
                    (i % 3 + 1) as i32,
                    &parameters,
                )
            })
            .collect(),
    )
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let grid = Grid::new(GRID_SIZE, GRID_SIZE);
    let start = population(&grid);

    c.bench_function("sequential", |bencher| {
        let engine = SequentialEngine::new(grid, Parameters::default());
        bencher.iter_with_large_drop(|| {
            let mut population = start.clone();
            engine.run(&mut population, TICKS);
            population
        })
    });

    let mut group = c.benchmark_group("partitioned");
    for workers in [1, 2, 4, 8] {
        group.bench_with_input(
            BenchmarkId::from_parameter(workers),
            &workers,
            |bencher, &workers| {
                let engine = PartitionedEngine::new(grid, Parameters::default(), workers);
                bencher.iter_with_large_drop(|| {
                    let mut population = start.clone();
                    engine
                        .run(&mut population, TICKS)
                        .expect("partitioned run failed");
                    population
                })
            },
        );
    }
    group.finish();
}

criterion_group!(engine_benches, criterion_benchmark);
criterion_main!(engine_benches);
