//! Scene validation command

use anyhow::{Context, Result};
use lumen_particles::{ConstraintConfig, EmitterConfig, ForceConfig, SimulationConfig};

pub fn run(path: &str, print: bool) -> Result<()> {
    let config =
        SimulationConfig::from_file(path).with_context(|| format!("Failed to load scene '{path}'"))?;

    let bounds = config.bounds();
    println!("Scene: {path}");
    println!("  Grid: {:?}", config.grid.shape.dims());
    println!(
        "  Engine: dt {} s, {} slots, boundary {:?}, bounds {} .. {}",
        config.engine.dt, config.engine.pool_size, config.engine.boundary, bounds.min, bounds.max
    );
    println!(
        "  Render: {:?}{}",
        config.render.mode,
        if config.render.motion_blur { " + motion blur" } else { "" }
    );
    match config.max_age() {
        Some(age) => println!("  Max age: {age} s"),
        None => println!("  Max age: unlimited"),
    }

    println!("  Forces ({}):", config.forces.len());
    for force in &config.forces {
        println!("    {}", force_label(force));
    }
    println!("  Constraints ({}):", config.constraints.len());
    for constraint in &config.constraints {
        println!("    {}", constraint_label(constraint));
    }
    println!("  Emitters ({}):", config.emitters.len());
    for emitter in &config.emitters {
        match emitter {
            EmitterConfig::Point(e) => {
                println!("    point at {} ({}/s toward {})", e.position, e.rate, e.direction)
            }
            EmitterConfig::Volume(e) => println!(
                "    volume {} .. {} ({}/s)",
                e.bounds_min, e.bounds_max, e.rate
            ),
        }
    }

    if print {
        println!();
        print!("{}", config.to_toml_string().context("Failed to serialize scene")?);
    }

    Ok(())
}

fn force_label(force: &ForceConfig) -> String {
    match force {
        ForceConfig::Gravity { g, axis } => format!("gravity g={g} axis={axis}"),
        ForceConfig::Drag { coefficient } => format!("drag {coefficient}"),
        ForceConfig::Wind {
            direction,
            strength,
            turbulence,
        } => format!("wind {direction} x{strength} turbulence {turbulence}"),
        ForceConfig::GravityWell { center, strength, .. } => {
            format!("gravity well at {center} strength {strength}")
        }
        ForceConfig::Spring { anchors, stiffness, .. } => {
            format!("spring k={stiffness} ({} anchors)", anchors.len())
        }
        ForceConfig::Vortex {
            center, axis, strength, ..
        } => format!("vortex at {center} about {axis} strength {strength}"),
    }
}

fn constraint_label(constraint: &ConstraintConfig) -> String {
    match constraint {
        ConstraintConfig::BoundaryCollision { restitution, .. } => {
            format!("boundary collision e={restitution}")
        }
        ConstraintConfig::BoundaryWrap { .. } => "boundary wrap".to_string(),
        ConstraintConfig::ParticleCollision {
            enabled,
            restitution,
            spatial_hash,
        } => {
            if *enabled {
                let broad = if *spatial_hash { "spatial hash" } else { "naive" };
                format!("particle collision e={restitution} ({broad})")
            } else {
                "particle collision (disabled)".to_string()
            }
        }
        ConstraintConfig::SphereCollision {
            center,
            radius,
            inside,
            ..
        } => {
            let kind = if *inside { "container" } else { "obstacle" };
            format!("sphere {kind} at {center} r={radius}")
        }
    }
}
