//! End-to-end behaviour of the environment: ids, collisions, teleports,
//! agent control and camera rendering.

use std::f32::consts::FRAC_PI_2;
use std::path::{Path, PathBuf};

use base64::Engine;
use nalgebra::{UnitQuaternion, Vector3};
use warren::{Action, CameraSpec, EnvError, Environment, EnvironmentConfig, ObjectId};

const DT: f32 = 1.0 / 60.0;

fn config(spawn_agent: bool, gravity: bool) -> EnvironmentConfig {
    let mut config = EnvironmentConfig::default();
    config.agent.spawn = spawn_agent;
    if !gravity {
        config.physics.gravity = [0.0, 0.0, 0.0];
    }
    config
}

fn add_floor(env: &mut Environment) -> ObjectId {
    env.add_box(
        "",
        Vector3::new(20.0, 0.5, 20.0),
        Vector3::new(0.0, -0.5, 0.0),
        UnitQuaternion::identity(),
        0.0,
        false,
    )
    .unwrap()
}

fn add_crate(env: &mut Environment, x: f32, detect: bool) -> ObjectId {
    env.add_box(
        "",
        Vector3::new(0.5, 0.5, 0.5),
        Vector3::new(x, 3.0, 0.0),
        UnitQuaternion::identity(),
        1.0,
        detect,
    )
    .unwrap()
}

/// Write an indexed tetrahedron as an embedded glTF file.
fn write_tetrahedron(dir: &Path) -> PathBuf {
    let corners: [f32; 12] = [
        0.0, 0.0, 0.0, //
        1.0, 0.0, 0.0, //
        0.0, 1.0, 0.0, //
        0.0, 0.0, 1.0,
    ];
    let indices: [u16; 12] = [0, 2, 1, 0, 1, 3, 0, 3, 2, 1, 2, 3];
    let mut bytes: Vec<u8> = corners.iter().flat_map(|f| f.to_le_bytes()).collect();
    bytes.extend(indices.iter().flat_map(|i| i.to_le_bytes()));
    let data = base64::engine::general_purpose::STANDARD.encode(&bytes);
    let json = format!(
        r#"{{
  "asset": {{"version": "2.0"}},
  "scene": 0,
  "scenes": [{{"nodes": [0]}}],
  "nodes": [{{"mesh": 0}}],
  "meshes": [{{"primitives": [{{"attributes": {{"POSITION": 0}}, "indices": 1}}]}}],
  "buffers": [{{"byteLength": 72, "uri": "data:application/octet-stream;base64,{data}"}}],
  "bufferViews": [
    {{"buffer": 0, "byteOffset": 0, "byteLength": 48}},
    {{"buffer": 0, "byteOffset": 48, "byteLength": 24}}
  ],
  "accessors": [
    {{"bufferView": 0, "componentType": 5126, "count": 4, "type": "VEC3",
      "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 1.0]}},
    {{"bufferView": 1, "componentType": 5123, "count": 12, "type": "SCALAR"}}
  ]
}}"#
    );
    let path = dir.join("tetra.gltf");
    std::fs::write(&path, json).unwrap();
    path
}

/// Write a unit cube centred on the origin as a Wavefront OBJ file.
fn write_obj_cube(dir: &Path) -> PathBuf {
    let obj = "o cube\n\
        v -0.5 -0.5 0.5\nv 0.5 -0.5 0.5\nv 0.5 0.5 0.5\nv -0.5 0.5 0.5\n\
        v -0.5 -0.5 -0.5\nv 0.5 -0.5 -0.5\nv 0.5 0.5 -0.5\nv -0.5 0.5 -0.5\n\
        f 1 2 3 4\nf 6 5 8 7\nf 5 1 4 8\nf 2 6 7 3\nf 4 3 7 8\nf 5 6 2 1\n";
    let path = dir.join("cube.obj");
    std::fs::write(&path, obj).unwrap();
    path
}

#[test]
fn test_ids_are_monotonic_and_never_reused() {
    let mut env = Environment::new(config(true, true)).unwrap();
    let agent = env.agent_id().unwrap();
    let floor = add_floor(&mut env);
    let a = add_crate(&mut env, 0.0, false);
    assert!(agent < floor && floor < a);

    env.remove_object(a).unwrap();
    let b = add_crate(&mut env, 0.0, false);
    assert!(b > a);
    assert_eq!(env.object_ids(), vec![agent, floor, b]);
}

#[test]
fn test_remove_twice_is_harmless() {
    let mut env = Environment::new(config(false, true)).unwrap();
    let id = add_crate(&mut env, 0.0, false);

    env.remove_object(id).unwrap();
    env.remove_object(id).unwrap();
    env.remove_object(ObjectId(1000)).unwrap();

    assert_eq!(env.object_count(), 0);
    assert_eq!(env.physics().body_count(), 0);
    assert!(env.object_info(id).is_none());
}

#[test]
fn test_collisions_are_rebuilt_every_step() {
    let mut env = Environment::new(config(false, false)).unwrap();
    let a = add_crate(&mut env, 0.0, true);
    let b = add_crate(&mut env, 20.0, true);

    env.step(&Action::default(), 1);
    assert!(env.collided_ids().is_empty());

    // Overlap the two boxes.
    env.locate_object(b, Vector3::new(0.6, 3.0, 0.0), UnitQuaternion::identity())
        .unwrap();
    env.step(&Action::default(), 1);
    assert!(env.collided_ids().contains(&a));
    assert!(env.collided_ids().contains(&b));

    // Pull them apart again; the set is replaced, not accumulated.
    env.locate_object(b, Vector3::new(20.0, 3.0, 0.0), UnitQuaternion::identity())
        .unwrap();
    env.step(&Action::default(), 1);
    assert!(env.collided_ids().is_empty());
}

#[test]
fn test_only_detecting_objects_are_reported() {
    let mut env = Environment::new(config(false, false)).unwrap();
    let watched = add_crate(&mut env, 0.0, true);
    let quiet = add_crate(&mut env, 0.6, false);

    // Touching a non-detecting object is not a collision.
    env.step(&Action::default(), 1);
    assert!(env.collided_ids().is_empty());

    env.locate_object(watched, Vector3::new(0.0, 3.0, 0.0), UnitQuaternion::identity())
        .unwrap();
    let partner = add_crate(&mut env, -0.6, true);
    env.step(&Action::default(), 1);
    assert!(env.collided_ids().contains(&watched));
    assert!(env.collided_ids().contains(&partner));
    assert!(!env.collided_ids().contains(&quiet));

    env.remove_object(watched).unwrap();
    assert!(!env.collided_ids().contains(&watched));
}

#[test]
fn test_resting_on_floor_is_not_a_collision() {
    let mut env = Environment::new(config(false, true)).unwrap();
    add_floor(&mut env);
    let agent = env
        .add_agent(Vector3::new(-15.0, 1.0, -15.0), 0.0)
        .unwrap();
    let ball = env
        .add_sphere(
            "",
            1.0,
            Vector3::new(5.0, 3.0, 0.0),
            UnitQuaternion::identity(),
            0.5,
            true,
        )
        .unwrap();

    env.step(&Action::default(), 60);
    assert!(env.collided_ids().is_empty());
    assert!(env.object_info(ball).unwrap().pos[1] < 1.1);

    // Bring the agent up against the ball.
    env.locate_agent(Vector3::new(5.0, 1.0, 1.9), 0.0).unwrap();
    env.step(&Action::default(), 1);
    assert!(env.collided_ids().contains(&ball));
    assert!(!env.collided_ids().contains(&agent));
}

#[test]
fn test_teleport_resets_velocity() {
    let mut env = Environment::new(config(false, true)).unwrap();
    let id = add_crate(&mut env, 0.0, false);

    // Let it build up speed first.
    env.step(&Action::default(), 30);
    assert!(env.object_info(id).unwrap().velocity[1] < -1.0);

    env.locate_object(id, Vector3::new(1.0, 5.0, 2.0), UnitQuaternion::identity())
        .unwrap();
    env.step(&Action::default(), 1);

    let info = env.object_info(id).unwrap();
    let expected_y = 5.0 - 9.81 * DT * DT;
    assert!((info.pos[0] - 1.0).abs() < 1e-4);
    assert!((info.pos[1] - expected_y).abs() < 5e-3, "{info:?}");
    assert!((info.pos[2] - 2.0).abs() < 1e-4);
    assert!((info.velocity[1] + 9.81 * DT).abs() < 1e-2);
}

#[test]
fn test_sphere_comes_to_rest_on_floor() {
    let mut env = Environment::new(config(false, true)).unwrap();
    add_floor(&mut env);
    let ball = env
        .add_sphere(
            "",
            0.5,
            Vector3::new(0.0, 10.0, 0.0),
            UnitQuaternion::identity(),
            1.0,
            false,
        )
        .unwrap();

    let mut last_y = f32::MAX;
    for _ in 0..20 {
        env.step(&Action::default(), 6);
        let y = env.object_info(ball).unwrap().pos[1];
        assert!(y <= last_y + 0.2);
        last_y = y;
    }
    env.step(&Action::default(), 600);

    let info = env.object_info(ball).unwrap();
    assert!((info.pos[1] - 0.5).abs() < 0.05, "{info:?}");
    assert!(Vector3::from(info.velocity).norm() < 0.1);
}

#[test]
fn test_agent_moves_along_heading() {
    let mut env = Environment::new(config(false, true)).unwrap();
    add_floor(&mut env);
    // Facing -X.
    env.add_agent(Vector3::new(5.0, 1.0, 0.0), FRAC_PI_2).unwrap();

    let mut last_x = env.agent_info().unwrap().pos[0];
    for _ in 0..30 {
        env.step(&Action::new(0, 0, 1), 1);
        let info = env.agent_info().unwrap();
        assert!(info.pos[0] < last_x, "{info:?}");
        assert!(info.pos[2].abs() < 0.05);
        last_x = info.pos[0];
    }
}

#[test]
fn test_positive_strafe_moves_left() {
    let mut env = Environment::new(config(false, true)).unwrap();
    add_floor(&mut env);
    env.add_agent(Vector3::new(0.0, 1.0, 0.0), 0.0).unwrap();

    env.step(&Action::new(0, 1, 0), 20);
    let info = env.agent_info().unwrap();
    assert!(info.pos[0] < -0.5, "{info:?}");
    assert!(info.pos[2].abs() < 0.05);

    env.locate_agent(Vector3::new(0.0, 1.0, 0.0), 0.0).unwrap();
    env.step(&Action::new(0, -1, 0), 20);
    let info = env.agent_info().unwrap();
    assert!(info.pos[0] > 0.5, "{info:?}");
}

#[test]
fn test_agent_turns_with_look() {
    let mut env = Environment::new(config(false, true)).unwrap();
    add_floor(&mut env);
    env.add_agent(Vector3::new(0.0, 1.0, 0.0), 0.0).unwrap();

    env.step(&Action::new(1, 0, 0), 30);
    let rot_y = env.agent_info().unwrap().rot_y();
    assert!(rot_y > 0.1, "rot_y = {rot_y}");

    env.locate_agent(Vector3::new(0.0, 1.0, 0.0), 0.0).unwrap();
    let info = env.agent_info().unwrap();
    assert!(info.rot_y().abs() < 1e-5);
}

#[test]
fn test_render_views_are_independent() {
    let mut env = Environment::new(config(true, true)).unwrap();
    add_floor(&mut env);
    add_crate(&mut env, 0.0, false);

    let spec = CameraSpec {
        width: 48,
        height: 32,
        background: [0.2, 0.3, 0.4],
        ..CameraSpec::default()
    };
    let front = env.add_camera_view(spec).unwrap();
    let top = env
        .add_camera_view(CameraSpec {
            shadow_width: 128,
            ..spec
        })
        .unwrap();
    assert_eq!(env.frame_buffer_size(front).unwrap(), 48 * 32 * 3);
    assert_eq!(env.frame_buffer_width(top).unwrap(), 48);
    assert_eq!(env.frame_buffer_height(top).unwrap(), 32);

    env.render(front, Vector3::new(0.0, 3.0, 10.0), UnitQuaternion::identity())
        .unwrap();
    let before = env.frame_buffer(front).unwrap().to_vec();
    assert!(before.chunks_exact(3).any(|px| px != [51, 77, 102]));

    let down = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), -FRAC_PI_2);
    env.render(top, Vector3::new(0.0, 15.0, 0.0), down).unwrap();

    assert_eq!(env.frame_buffer(front).unwrap(), before.as_slice());
    assert_ne!(env.frame_buffer(top).unwrap(), before.as_slice());
    assert!(!env.camera(front).unwrap().frame_buffer().is_bound());
}

#[test]
fn test_render_does_not_touch_physics() {
    let mut env = Environment::new(config(true, true)).unwrap();
    add_floor(&mut env);
    let id = add_crate(&mut env, 0.0, false);
    env.step(&Action::default(), 3);
    let before = env.object_info(id).unwrap();

    let camera = env.add_camera_view(CameraSpec::default()).unwrap();
    let agent = env.agent_info().unwrap();
    env.render(camera, agent.position(), agent.rotation()).unwrap();

    assert_eq!(env.object_info(id).unwrap(), before);
}

#[test]
fn test_model_and_texture_replacement() {
    let dir = tempfile::tempdir().unwrap();
    let model_path = write_tetrahedron(dir.path());
    let texture_path = dir.path().join("red.png");
    image::RgbImage::from_pixel(2, 2, image::Rgb([255, 0, 0]))
        .save(&texture_path)
        .unwrap();

    let mut env = Environment::new(config(false, true)).unwrap();
    add_floor(&mut env);
    let fixed = env
        .add_model(
            &model_path,
            Vector3::new(2.0, 2.0, 2.0),
            Vector3::new(-3.0, 0.0, 0.0),
            UnitQuaternion::identity(),
            0.0,
            false,
        )
        .unwrap();
    let loose = env
        .add_model(
            &model_path,
            Vector3::new(1.0, 1.0, 1.0),
            Vector3::new(3.0, 4.0, 0.0),
            UnitQuaternion::identity(),
            1.0,
            false,
        )
        .unwrap();
    assert_eq!(env.object_count(), 3);
    assert_eq!(*env.object(fixed).unwrap().scale(), Vector3::new(2.0, 2.0, 2.0));

    env.replace_object_textures(loose, &[&texture_path]).unwrap();
    let textured = env.object(loose).unwrap().model().unwrap();
    assert!(textured.parts()[0].texture.is_some());
    // The other instance of the same file keeps its own material.
    assert!(env.object(fixed).unwrap().model().unwrap().parts()[0]
        .texture
        .is_none());

    let missing = env.replace_object_textures(loose, &["/nonexistent/blue.png"]);
    assert!(matches!(missing, Err(EnvError::Render(_))));
    assert!(env.object(loose).unwrap().model().unwrap().parts()[0]
        .texture
        .is_some());

    // The dynamic model falls onto the floor.
    env.step(&Action::default(), 120);
    assert!(env.object_info(loose).unwrap().pos[1] < 1.0);
}

#[test]
fn test_obj_model_falls_onto_floor() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_obj_cube(dir.path());

    let mut env = Environment::new(config(false, true)).unwrap();
    add_floor(&mut env);
    let cube = env
        .add_model(
            &path,
            Vector3::new(1.0, 1.0, 1.0),
            Vector3::new(0.0, 3.0, 0.0),
            UnitQuaternion::identity(),
            1.0,
            false,
        )
        .unwrap();
    assert_eq!(env.object(cube).unwrap().model().unwrap().num_parts(), 1);

    env.step(&Action::default(), 300);
    let info = env.object_info(cube).unwrap();
    assert!((info.pos[1] - 0.5).abs() < 0.1, "{info:?}");
}
