//! Headless simulation command

use anyhow::{bail, Context, Result};
use glam::IVec3;
use lumen_particles::{ParticleSystem, SimulationConfig, VoxelGrid};

pub struct SimulateArgs {
    pub config: String,
    pub frames: u32,
    pub every: u32,
    pub slice: Option<usize>,
    pub seed: Option<u64>,
}

pub fn run(args: SimulateArgs) -> Result<()> {
    let mut config = SimulationConfig::from_file(&args.config)
        .with_context(|| format!("Failed to load scene '{}'", args.config))?;
    if args.seed.is_some() {
        config.seed = args.seed;
    }

    let depth = config.grid.shape.dims()[2];
    if let Some(k) = args.slice {
        if k >= depth {
            bail!("slice {k} is outside the grid (last axis has {depth} layers)");
        }
    }

    let mut system = ParticleSystem::from_config(&config).context("Failed to build scene")?;
    let dt = system.engine.dt;
    let every = args.every.max(1);

    println!(
        "Simulating '{}' for {} frame(s) at dt {} s",
        args.config, args.frames, dt
    );
    println!("{:>6} {:>8} {:>8} {:>8} {:>8} {:>8}", "frame", "t", "emitted", "died", "active", "voxels");

    for frame in 0..args.frames {
        let t = frame as f32 * dt;
        system.frame(t);
        if frame % every == 0 || frame + 1 == args.frames {
            let stats = system.last_stats();
            println!(
                "{:>6} {:>8.3} {:>8} {:>8} {:>8} {:>8}",
                frame, t, stats.emitted, stats.despawned, stats.active, stats.voxels
            );
        }
    }

    println!(
        "\nDone: {} particle(s) emitted, {} active, kinetic energy {:.3}",
        system.total_emitted(),
        system.state.active_count(),
        system.state.kinetic_energy()
    );

    if let Some(k) = args.slice {
        println!("\nSlice at layer {k}:");
        print!("{}", render_slice(system.grid(), k));
    }

    Ok(())
}

/// ASCII view of one layer of the grid along the last axis.
/// Rows run along axis 1 (top row is the highest index), columns along axis 0.
fn render_slice(grid: &VoxelGrid, layer: usize) -> String {
    let [d0, d1, _] = grid.shape().dims();
    let mut out = String::with_capacity((d0 + 1) * d1);
    for y in (0..d1).rev() {
        for x in 0..d0 {
            let voxel = IVec3::new(x as i32, y as i32, layer as i32);
            out.push(if grid.get(voxel) { '#' } else { '.' });
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use lumen_core::GridShape;
    use lumen_particles::draw_sphere;

    #[test]
    fn slice_shows_marked_voxels() {
        let grid = draw_sphere(Vec3::new(1.0, 2.0, 0.0), 0.4, GridShape::new(3, 3, 2));
        assert_eq!(render_slice(&grid, 0), ".#.\n...\n...\n");
        assert_eq!(render_slice(&grid, 1), "...\n...\n...\n");
    }
}
