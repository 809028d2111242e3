use anyhow::{ensure, Context, Result};
use fdm_flow::{
    is_inside_sdf, CircleSdf2, ConstantScalarField2, ConstantVectorField2, Field2, Grid2,
    MacVelocity2, ScalarField2, SolverConfig, Vec2,
};

const DT: f64 = 1.0 / 60.0;
const WIDTH: usize = 64;
const HEIGHT: usize = 32;

fn obstacle() -> CircleSdf2 {
    CircleSdf2::new(Vec2::new(1.0, 0.5), 0.2)
}

/// Uniform flow past a sphere: one projection, then report how divergence
/// free the result is and how far the flow bends behind the obstacle.
fn run_obstacle(config: &SolverConfig, grid: Grid2) -> Result<()> {
    let sphere = obstacle();
    let input = MacVelocity2::new(grid, Vec2::new(1.0, 0.0));
    let mut output = MacVelocity2::new(grid, Vec2::zero());
    let mut solver = config.pressure.build();
    solver.solve(
        &input,
        DT,
        &mut output,
        &sphere,
        &ConstantVectorField2::zero(),
        &ConstantScalarField2::full(),
        config.pressure.use_compressed,
    );

    let result = solver.linear_system_solver().last_result();
    println!(
        "pressure: {} {} after {} iterations (residual {:.3e})",
        solver.linear_system_solver().name(),
        if result.is_converged() { "converged" } else { "stopped" },
        result.iterations,
        result.residual_norm,
    );

    let divergence = output.divergence();
    let mut max_divergence: f64 = 0.0;
    for j in 0..grid.height() {
        for i in 0..grid.width() {
            if !is_inside_sdf(sphere.sample(grid.cell_center(i, j))) {
                max_divergence = max_divergence.max(divergence.get(i, j).abs());
            }
        }
    }
    let deflection = |i: usize| {
        (0..grid.height())
            .map(|j| output.v().get(i, j).abs())
            .fold(0.0_f64, f64::max)
    };
    println!("max |div| outside the obstacle: {max_divergence:.3e}");
    println!(
        "max |v| upstream {:.3e}, downstream {:.3e}",
        deflection(2),
        deflection(41)
    );
    ensure!(max_divergence.is_finite(), "projection produced a non-finite velocity");
    Ok(())
}

/// Smears a scalar blob around the same obstacle.
fn run_diffusion(config: &SolverConfig, grid: Grid2) -> Result<()> {
    let sphere = obstacle();
    let blob = CircleSdf2::new(Vec2::new(0.5, 0.5), 0.15);
    let source = Field2::from_fn(grid, |i, j| {
        if is_inside_sdf(blob.sample(grid.cell_center(i, j))) {
            1.0
        } else {
            0.0
        }
    });
    let mut field = source.clone();
    let mut dest = Field2::new(grid, 0.0);
    let mut solver = config.diffusion.build();
    for _ in 0..10 {
        solver.solve_scalar(
            &field,
            0.01,
            DT,
            &mut dest,
            &sphere,
            &ConstantScalarField2::full(),
        );
        std::mem::swap(&mut field, &mut dest);
    }
    let (lo, hi) = field.min_max();
    println!(
        "diffusion: total {:.4} -> {:.4}, range [{lo:.3e}, {hi:.3e}]",
        source.sum(),
        field.sum()
    );
    ensure!(lo.is_finite() && hi.is_finite(), "diffusion produced a non-finite value");
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();

    let config = match std::env::args().nth(1) {
        Some(path) => SolverConfig::load(&path)
            .with_context(|| format!("failed to load solver config from {path}"))?,
        None => SolverConfig::default(),
    };
    log::info!("solver config: {config:?}");

    let grid = Grid2::uniform(WIDTH, HEIGHT, 1.0 / HEIGHT as f64);
    run_obstacle(&config, grid)?;
    run_diffusion(&config, grid)?;
    Ok(())
}
