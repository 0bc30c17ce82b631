//! Behavioural properties of the rule catalogue and the step executor,
//! exercised through the public API only.

#![allow(
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::panic,
    clippy::float_cmp
)]

use tessera_grid::{Boundary, Grid};
use tessera_rules::multistate::wire;
use tessera_rules::{
    AvalancheStats, CellRandom, CyclicRule, DiffusionRule, DiscreteRule, DoubleBuffer, DropSite,
    IsingRule, Lattice, LifeRule, PercolationSearch, RelaxationRule, SandpileRule, StepExecutor,
    SummaryDetail, Traversal, WireworldRule, next_generation,
};

fn noisy(width: usize, height: usize, states: u8, seed: u64) -> Grid<u8> {
    let random = CellRandom::new(seed);
    let cells = (0..width * height)
        .map(|i| u8::try_from(random.bits(i) % u64::from(states)).unwrap())
        .collect();
    Grid::from_cells(width, height, Boundary::Toroidal, cells).unwrap()
}

// ---------------------------------------------------------------------------
// Determinism and order independence
// ---------------------------------------------------------------------------

#[test]
fn deterministic_rules_give_identical_output_on_fresh_copies() {
    let grid = noisy(24, 17, 2, 3);
    let rule = LifeRule::conway();
    let a = next_generation(&grid.clone(), &rule, 0, CellRandom::new(0), Traversal::RowMajor).unwrap();
    let b = next_generation(&grid.clone(), &rule, 0, CellRandom::new(99), Traversal::RowMajor).unwrap();
    assert_eq!(a, b);
}

#[test]
fn row_major_and_column_major_sweeps_agree_for_every_local_rule() {
    let rules = [
        DiscreteRule::LifeLike(LifeRule::parse("B36/S23").unwrap()),
        DiscreteRule::Wireworld(WireworldRule::new()),
        DiscreteRule::Cyclic(CyclicRule::new(4, 1, tessera_grid::Neighborhood::VonNeumann).unwrap()),
        DiscreteRule::Ising(IsingRule::new(2.0, false).unwrap()),
    ];
    for rule in rules {
        let grid = noisy(13, 11, 4, 17);
        let random = CellRandom::new(5);
        let row = next_generation(&grid, &rule, 2, random, Traversal::RowMajor).unwrap();
        let col = next_generation(&grid, &rule, 2, random, Traversal::ColumnMajor).unwrap();
        assert_eq!(row, col, "{} differs by traversal", rule.name());
    }
}

#[test]
fn batched_and_single_stepping_reach_the_same_state() {
    let lattice = || Lattice::Discrete {
        buffers: DoubleBuffer::new(noisy(20, 20, 2, 8)),
        rule: DiscreteRule::Ising(IsingRule::new(2.3, true).unwrap()),
    };
    let mut a = StepExecutor::new(lattice(), 1234);
    let mut b = StepExecutor::new(lattice(), 1234).with_traversal(Traversal::ColumnMajor);
    for _ in 0..12 {
        a.run_generation().unwrap();
    }
    for _ in 0..3 {
        for _ in 0..4 {
            b.run_generation().unwrap();
        }
    }
    assert_eq!(a.lattice(), b.lattice());
    assert_eq!(a.generation(), 12);
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn lonely_life_cell_dies_on_a_3x3_torus() {
    let mut grid = Grid::new(3, 3, Boundary::Toroidal, 0_u8).unwrap();
    grid.set(1, 1, 1).unwrap();
    let next = next_generation(&grid, &LifeRule::conway(), 0, CellRandom::new(0), Traversal::RowMajor).unwrap();
    assert!(next.cells().iter().all(|&c| c == 0));
}

#[test]
fn wireworld_conductor_fires_next_to_one_head_but_not_three() {
    let rule = WireworldRule::new();
    let random = CellRandom::new(0);

    let mut one = Grid::new(5, 5, Boundary::Clamped, wire::EMPTY).unwrap();
    one.set(2, 2, wire::CONDUCTOR).unwrap();
    one.set(1, 2, wire::HEAD).unwrap();
    let next = next_generation(&one, &rule, 0, random, Traversal::RowMajor).unwrap();
    assert_eq!(next.get(2, 2), Some(wire::HEAD));
    assert_eq!(next.get(1, 2), Some(wire::TAIL));

    let mut three = Grid::new(5, 5, Boundary::Clamped, wire::EMPTY).unwrap();
    three.set(2, 2, wire::CONDUCTOR).unwrap();
    for (x, y) in [(1, 1), (2, 1), (3, 1)] {
        three.set(x, y, wire::HEAD).unwrap();
    }
    let next = next_generation(&three, &rule, 0, random, Traversal::RowMajor).unwrap();
    assert_eq!(next.get(2, 2), Some(wire::CONDUCTOR));
}

#[test]
fn diffusion_conserves_mass_with_zero_flux_boundary() {
    let mut grid = Grid::new(16, 12, Boundary::ZeroFlux, 0.0_f32).unwrap();
    grid.set(0, 0, 1.0).unwrap();
    let lattice = Lattice::Scalar {
        buffers: DoubleBuffer::new(grid),
        rule: DiffusionRule::new(0.22, 1.0).unwrap(),
    };
    let mut executor = StepExecutor::new(lattice, 0);
    let mut mass = 0.0;
    for _ in 0..500 {
        let summary = executor.run_generation().unwrap();
        let SummaryDetail::Field { mass: m } = summary.detail else {
            panic!("expected field detail");
        };
        mass = m;
    }
    assert!((mass - 1.0).abs() < 1e-3, "mass drifted to {mass}");
}

#[test]
fn sandpile_is_stable_after_each_generation() {
    let rule = SandpileRule::new(4, 1, DropSite::Center).unwrap();
    let lattice = Lattice::Pile {
        grid: Grid::new(21, 21, Boundary::Clamped, 0).unwrap(),
        rule: rule.clone(),
        stats: AvalancheStats::default(),
    };
    let mut executor = StepExecutor::new(lattice, 0);
    for _ in 0..800 {
        executor.run_generation().unwrap();
    }
    let Lattice::Pile { grid, .. } = executor.lattice() else {
        panic!("expected a sandpile");
    };
    let mut copy = grid.clone();
    let again = rule.relax(&mut copy).unwrap();
    assert_eq!(again.topplings, 0);
    assert_eq!(&copy, grid);
    assert!(grid.cells().iter().all(|&v| v < 4));
}

#[test]
fn percolation_result_is_stable_once_done() {
    let mut grid = Grid::new(30, 20, Boundary::Clamped, 0_u8).unwrap();
    let random = CellRandom::new(21);
    for i in 0..grid.len() {
        if random.uniform(i) < 0.62 {
            grid.set_index(i, 1).unwrap();
        }
    }
    let mut search = PercolationSearch::new();
    let mut guard = 0;
    while !search.state().bfs_done {
        search.step(&mut grid).unwrap();
        guard += 1;
        assert!(guard <= 600);
    }
    let finished = search.state();
    for _ in 0..10 {
        search.step(&mut grid).unwrap();
        assert_eq!(search.state().percolates, finished.percolates);
    }
    assert_eq!(search.state(), finished);
}
