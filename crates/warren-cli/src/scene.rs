//! Demo room: floor, walls, a few props and a ball dropped from above.

use std::f32::consts::FRAC_PI_2;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use nalgebra::{UnitQuaternion, Vector3};
use warren::{yaw_rotation, Action, Environment, ObjectId};

/// Half size of the square room.
const ROOM: f32 = 10.0;

/// Ids of the interesting objects in the demo room.
pub struct Scene {
    /// Ball dropped at the start.
    pub ball: ObjectId,
    /// Props that report collisions.
    pub props: Vec<ObjectId>,
}

/// Populate `env`, writing the textures it needs into `texture_dir`.
pub fn build(env: &mut Environment, texture_dir: &Path) -> Result<Scene> {
    fs::create_dir_all(texture_dir)
        .with_context(|| format!("creating {}", texture_dir.display()))?;
    let floor_tex = write_checker(texture_dir, "floor.png", [200, 200, 200], [90, 90, 90])?;
    let wall_tex = write_checker(texture_dir, "wall.png", [180, 120, 80], [150, 95, 60])?;
    let prop_tex = write_checker(texture_dir, "prop.png", [60, 140, 220], [30, 90, 170])?;
    let ball_tex = write_checker(texture_dir, "ball.png", [230, 60, 50], [250, 220, 60])?;

    let identity = UnitQuaternion::identity();

    env.add_box(
        &floor_tex,
        Vector3::new(ROOM, 0.5, ROOM),
        Vector3::new(0.0, -0.5, 0.0),
        identity,
        0.0,
        false,
    )?;

    for (x, z, rot) in [
        (0.0, -ROOM, 0.0),
        (0.0, ROOM, 0.0),
        (-ROOM, 0.0, FRAC_PI_2),
        (ROOM, 0.0, FRAC_PI_2),
    ] {
        env.add_box(
            &wall_tex,
            Vector3::new(ROOM, 1.5, 0.5),
            Vector3::new(x, 1.5, z),
            yaw_rotation(rot),
            0.0,
            false,
        )?;
    }

    let props = vec![
        env.add_box(
            &prop_tex,
            Vector3::new(0.75, 0.75, 0.75),
            Vector3::new(3.0, 0.75, -5.0),
            yaw_rotation(0.4),
            0.0,
            true,
        )?,
        env.add_cylinder(
            &prop_tex,
            Vector3::new(0.6, 1.0, 0.6),
            Vector3::new(-3.0, 1.0, -4.0),
            identity,
            0.0,
            true,
        )?,
        env.add_box(
            &prop_tex,
            Vector3::new(0.5, 0.5, 0.5),
            Vector3::new(0.0, 0.5, -7.0),
            identity,
            2.0,
            true,
        )?,
    ];

    let ball = env.add_sphere(
        &ball_tex,
        0.5,
        Vector3::new(0.5, 8.0, -3.0),
        identity,
        1.0,
        true,
    )?;

    env.add_agent(Vector3::new(0.0, 1.0, 6.0), 0.0)?;

    Ok(Scene { ball, props })
}

/// Walk forward, turning left for a while every 60 steps.
pub fn action_for_step(step: u32) -> Action {
    if step % 60 >= 45 {
        Action::new(1, 0, 1)
    } else {
        Action::new(0, 0, 1)
    }
}

/// Camera pose looking straight down on the room.
pub fn overhead_pose() -> (Vector3<f32>, UnitQuaternion<f32>) {
    (
        Vector3::new(0.0, 30.0, 0.0),
        UnitQuaternion::from_axis_angle(&Vector3::x_axis(), -FRAC_PI_2),
    )
}

fn write_checker(dir: &Path, name: &str, a: [u8; 3], b: [u8; 3]) -> Result<String> {
    let image = image::RgbImage::from_fn(8, 8, |x, y| {
        if (x / 2 + y / 2) % 2 == 0 {
            image::Rgb(a)
        } else {
            image::Rgb(b)
        }
    });
    let path = dir.join(name);
    image
        .save(&path)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(path.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use warren::EnvironmentConfig;

    #[test]
    fn test_build_scene() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = EnvironmentConfig::default();
        config.agent.spawn = false;
        let mut env = Environment::new(config).unwrap();

        let scene = build(&mut env, dir.path()).unwrap();
        // Floor, four walls, three props, ball, agent.
        assert_eq!(env.object_count(), 10);
        assert_eq!(scene.props.len(), 3);
        assert!(env.agent_id().is_some());
        assert!(env.object(scene.ball).unwrap().detects_collision());
    }

    #[test]
    fn test_action_schedule() {
        assert_eq!(action_for_step(0), Action::new(0, 0, 1));
        assert_eq!(action_for_step(50), Action::new(1, 0, 1));
        assert_eq!(action_for_step(60), Action::new(0, 0, 1));
    }
}
