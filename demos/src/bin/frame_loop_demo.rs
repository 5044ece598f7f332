//! Frame loop demo.
//!
//! Uploads a box and a grid into one shared geometry, then runs a paced frame
//! loop that keeps material, object and pass constants mirrored per frame:
//! - materials are edited every `--edit-interval` frames and propagate
//!   through the dirty countdown
//! - the box spins, so its object constants are dirty every frame
//! - pass constants are rewritten every frame
//!
//! ```bash
//! cargo run --bin frame_loop_demo -- --backend dummy --frames 120 --log debug
//! ```

use clap::Parser;
use strata_core::math::{Vec3, look_at_rh, mat4_from_translation, perspective_rh};
use strata_graphics::{
    ConstantMirror, GraphicsError, GraphicsInstance, Light, Material, MaterialConstants,
    MeshGeometry, ObjectConstants, PassConstants, ShadingBlock,
};
use strata_demos::DemoArgs;
use strata_demos::shapes::build_shapes;

const WIDTH: u32 = 1280;
const HEIGHT: u32 = 720;
const DELTA_TIME: f32 = 1.0 / 60.0;

/// One drawable: a submesh of the shared geometry with its transforms.
struct RenderItem {
    submesh: &'static str,
    material: usize,
    constants: ShadingBlock<ObjectConstants>,
}

fn main() -> Result<(), GraphicsError> {
    let args = DemoArgs::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&args.log)).init();

    log::info!("Starting Strata frame loop demo");
    log::info!("Core version: {}", strata_core::VERSION);
    log::info!("Graphics version: {}", strata_graphics::VERSION);
    strata_core::init();
    strata_graphics::init();

    let frames = args.frames_in_flight()?;
    let instance = GraphicsInstance::with_parameters(args.instance_parameters())?;
    let device = instance.create_device()?;
    log::info!("Device: {} ({} frames in flight)", device.name(), frames);

    // Load-time upload.
    let mut commands = device.create_command_list("load");
    let mut shapes = MeshGeometry::build(&device, &mut commands, build_shapes())?;
    let load = device.submit(commands)?;

    let mut pipeline = device.create_pipeline(frames);
    let mut material_cb = ConstantMirror::new(&device, "materials", frames, 8)?;
    let mut object_cb = ConstantMirror::new(&device, "objects", frames, 8)?;
    let pass_cb = ConstantMirror::<PassConstants>::new(&device, "pass", frames, 1)?;

    let mut materials = vec![
        Material::new(
            "bricks",
            material_cb.create_block(MaterialConstants {
                diffuse_albedo: [0.7, 0.3, 0.2, 1.0],
                roughness: 0.6,
                ..MaterialConstants::default()
            })?,
        )
        .with_diffuse_srv(0)
        .with_normal_srv(1),
        Material::new(
            "tile",
            material_cb.create_block(MaterialConstants {
                fresnel_r0: [0.2, 0.2, 0.2],
                roughness: 0.1,
                ..MaterialConstants::default()
            })?,
        )
        .with_diffuse_srv(2),
    ];

    let mut items = vec![
        RenderItem {
            submesh: "box",
            material: 0,
            constants: object_cb.create_block(ObjectConstants::from_world(
                &mat4_from_translation(Vec3::new(0.0, 0.75, 0.0)),
            ))?,
        },
        RenderItem {
            submesh: "grid",
            material: 1,
            constants: object_cb.create_block(ObjectConstants::default())?,
        },
    ];

    let mut pass = PassConstants::default();
    pass.set_render_target_size(WIDTH, HEIGHT);
    pass.near_z = 1.0;
    pass.far_z = 1000.0;
    pass.ambient_light = [0.25, 0.25, 0.35, 1.0];
    pass.lights[0] = Light::directional(Vec3::new(0.577, -0.577, 0.577), Vec3::new(0.9, 0.9, 0.8));
    let proj = perspective_rh(
        std::f32::consts::FRAC_PI_4,
        WIDTH as f32 / HEIGHT as f32,
        pass.near_z,
        pass.far_z,
    );

    let mut elements_written = 0usize;
    for frame in 0..args.frames {
        let slot = pipeline.begin_frame();
        pass.advance(DELTA_TIME);

        if args.edit_interval > 0 && frame > 0 && frame % args.edit_interval == 0 {
            let material = &mut materials[(frame / args.edit_interval) as usize % 2];
            let tint = (frame as f32 * 0.01).sin().abs();
            material.constants.modify(|c| c.diffuse_albedo[1] = tint);
            log::debug!("Frame {}: edited material `{}`", frame, material.name);
        }

        let angle = pass.total_time;
        let spin = strata_core::math::Mat4::new_rotation(Vec3::y() * angle);
        items[0]
            .constants
            .set(ObjectConstants::from_world(
                &(mat4_from_translation(Vec3::new(0.0, 0.75, 0.0)) * spin),
            ));

        let eye = Vec3::new(15.0 * angle.cos() * 0.2, 5.0, -15.0);
        let view = look_at_rh(&eye, &Vec3::zeros(), &Vec3::y());
        pass.set_camera(eye, &view, &proj);

        elements_written += material_cb.sync(slot, materials.iter_mut().map(|m| &mut m.constants))?;
        elements_written += object_cb.sync(slot, items.iter_mut().map(|i| &mut i.constants))?;
        pass_cb.write(slot, 0, &pass)?;

        let commands = device.create_command_list(format!("frame_{frame}"));
        for item in &items {
            let submesh = shapes.resolve(item.submesh)?;
            let material = &materials[item.material];
            log::trace!(
                "Frame {}: draw `{}` with `{}` (material cb {} at {}, object cb {} at {}) {:?}",
                frame,
                item.submesh,
                material.name,
                material.cb_index(),
                material_cb.element_offset(material.cb_index()),
                item.constants.index(),
                object_cb.element_offset(item.constants.index()),
                submesh.draw_args(1)
            );
        }
        pipeline.end_frame(device.submit(commands)?);

        if shapes.has_transients() && load.query() {
            shapes.dispose_transients()?;
            log::info!("Frame {}: released geometry staging buffers", frame);
        }
    }

    pipeline.wait_idle();
    if shapes.has_transients() {
        load.wait();
        shapes.dispose_transients()?;
    }

    log::info!(
        "Ran {} frames: {} mirrored elements written, {} dirty material slots left",
        args.frames,
        elements_written,
        materials
            .iter()
            .map(|m| m.constants.frames_dirty())
            .sum::<u32>()
    );
    Ok(())
}
