//! Shader-visible constant layouts.
//!
//! All layouts are `#[repr(C)]` and [`Pod`](bytemuck::Pod), with fields
//! ordered so vectors never straddle a 16-byte register. Matrices are stored
//! column-major.

use strata_core::math::{IDENTITY_COLS, Mat4, Vec3, mat4_to_cols_array_2d};

use crate::frame::ShadingBlock;

/// Number of lights in [`PassConstants::lights`].
pub const MAX_LIGHTS: usize = 16;

/// Per-material surface parameters.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MaterialConstants {
    pub diffuse_albedo: [f32; 4],
    pub fresnel_r0: [f32; 3],
    pub roughness: f32,
    /// Texture-coordinate transform.
    pub mat_transform: [[f32; 4]; 4],
}

impl Default for MaterialConstants {
    fn default() -> Self {
        Self {
            diffuse_albedo: [1.0, 1.0, 1.0, 1.0],
            fresnel_r0: [0.01, 0.01, 0.01],
            roughness: 0.25,
            mat_transform: IDENTITY_COLS,
        }
    }
}

/// A directional, point or spot light.
///
/// Falloff and position apply to point and spot lights, direction to
/// directional and spot lights, spot power to spot lights only.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Light {
    pub strength: [f32; 3],
    pub falloff_start: f32,
    pub direction: [f32; 3],
    pub falloff_end: f32,
    pub position: [f32; 3],
    pub spot_power: f32,
}

impl Default for Light {
    fn default() -> Self {
        Self {
            strength: [0.5, 0.5, 0.5],
            falloff_start: 1.0,
            direction: [0.0, -1.0, 0.0],
            falloff_end: 10.0,
            position: [0.0, 0.0, 0.0],
            spot_power: 64.0,
        }
    }
}

impl Light {
    /// A directional light shining along `direction`.
    pub fn directional(direction: Vec3, strength: Vec3) -> Self {
        Self {
            direction: direction.normalize().into(),
            strength: strength.into(),
            ..Self::default()
        }
    }
}

/// Per-object transforms.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ObjectConstants {
    pub world: [[f32; 4]; 4],
    pub tex_transform: [[f32; 4]; 4],
}

impl Default for ObjectConstants {
    fn default() -> Self {
        Self {
            world: IDENTITY_COLS,
            tex_transform: IDENTITY_COLS,
        }
    }
}

impl ObjectConstants {
    pub fn from_world(world: &Mat4) -> Self {
        Self {
            world: mat4_to_cols_array_2d(world),
            ..Self::default()
        }
    }
}

/// Per-pass camera, timing and lighting data.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PassConstants {
    pub view: [[f32; 4]; 4],
    pub inv_view: [[f32; 4]; 4],
    pub proj: [[f32; 4]; 4],
    pub inv_proj: [[f32; 4]; 4],
    pub view_proj: [[f32; 4]; 4],
    pub inv_view_proj: [[f32; 4]; 4],
    pub eye_pos: [f32; 3],
    pub _pad0: f32,
    pub render_target_size: [f32; 2],
    pub inv_render_target_size: [f32; 2],
    pub near_z: f32,
    pub far_z: f32,
    pub total_time: f32,
    pub delta_time: f32,
    pub ambient_light: [f32; 4],
    /// Directional lights first, then point lights, then spot lights.
    pub lights: [Light; MAX_LIGHTS],
}

impl Default for PassConstants {
    fn default() -> Self {
        Self {
            view: IDENTITY_COLS,
            inv_view: IDENTITY_COLS,
            proj: IDENTITY_COLS,
            inv_proj: IDENTITY_COLS,
            view_proj: IDENTITY_COLS,
            inv_view_proj: IDENTITY_COLS,
            eye_pos: [0.0; 3],
            _pad0: 0.0,
            render_target_size: [0.0; 2],
            inv_render_target_size: [0.0; 2],
            near_z: 0.0,
            far_z: 0.0,
            total_time: 0.0,
            delta_time: 0.0,
            ambient_light: [0.0, 0.0, 0.0, 1.0],
            lights: [Light::default(); MAX_LIGHTS],
        }
    }
}

impl PassConstants {
    /// Fill the camera matrices and their inverses. A singular matrix inverts
    /// to identity.
    pub fn set_camera(&mut self, eye: Vec3, view: &Mat4, proj: &Mat4) {
        let view_proj = proj * view;
        let invert = |m: &Mat4| m.try_inverse().unwrap_or_else(Mat4::identity);

        self.view = mat4_to_cols_array_2d(view);
        self.inv_view = mat4_to_cols_array_2d(&invert(view));
        self.proj = mat4_to_cols_array_2d(proj);
        self.inv_proj = mat4_to_cols_array_2d(&invert(proj));
        self.view_proj = mat4_to_cols_array_2d(&view_proj);
        self.inv_view_proj = mat4_to_cols_array_2d(&invert(&view_proj));
        self.eye_pos = eye.into();
    }

    pub fn set_render_target_size(&mut self, width: u32, height: u32) {
        let (w, h) = (width.max(1) as f32, height.max(1) as f32);
        self.render_target_size = [w, h];
        self.inv_render_target_size = [1.0 / w, 1.0 / h];
    }

    /// Advance the clock by `delta_time` seconds.
    pub fn advance(&mut self, delta_time: f32) {
        self.delta_time = delta_time;
        self.total_time += delta_time;
    }
}

static_assertions::const_assert_eq!(std::mem::size_of::<MaterialConstants>(), 96);
static_assertions::const_assert_eq!(std::mem::size_of::<Light>(), 48);
static_assertions::const_assert_eq!(std::mem::size_of::<ObjectConstants>(), 128);
static_assertions::const_assert_eq!(std::mem::size_of::<PassConstants>(), 1216);

/// A named material: texture slots plus its dirty-tracked surface constants.
///
/// The constant block's [`index`](ShadingBlock::index) is the material's
/// element in every slot of the material mirror.
#[derive(Debug)]
pub struct Material {
    pub name: String,
    /// Shader-resource heap index of the diffuse texture.
    pub diffuse_srv_heap_index: Option<u32>,
    /// Shader-resource heap index of the normal map.
    pub normal_srv_heap_index: Option<u32>,
    pub constants: ShadingBlock<MaterialConstants>,
}

impl Material {
    pub fn new(name: impl Into<String>, constants: ShadingBlock<MaterialConstants>) -> Self {
        Self {
            name: name.into(),
            diffuse_srv_heap_index: None,
            normal_srv_heap_index: None,
            constants,
        }
    }

    pub fn with_diffuse_srv(mut self, heap_index: u32) -> Self {
        self.diffuse_srv_heap_index = Some(heap_index);
        self
    }

    pub fn with_normal_srv(mut self, heap_index: u32) -> Self {
        self.normal_srv_heap_index = Some(heap_index);
        self
    }

    /// Element index in the material mirror.
    pub fn cb_index(&self) -> u32 {
        self.constants.index()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alignment::constant_buffer_byte_size;
    use crate::frame::{ConstantMirror, DirtyState, FramesInFlight};
    use crate::instance::{BackendType, GraphicsInstance, InstanceParameters};
    use rstest::rstest;

    #[rstest]
    #[case::material(std::mem::size_of::<MaterialConstants>(), 256)]
    #[case::object(std::mem::size_of::<ObjectConstants>(), 256)]
    #[case::pass(std::mem::size_of::<PassConstants>(), 1280)]
    fn test_constant_stride(#[case] size: usize, #[case] stride: u64) {
        assert_eq!(constant_buffer_byte_size(size as u32), stride);
    }

    #[test]
    fn test_material_defaults() {
        let constants = MaterialConstants::default();
        assert_eq!(constants.diffuse_albedo, [1.0; 4]);
        assert_eq!(constants.roughness, 0.25);
        assert_eq!(constants.mat_transform, IDENTITY_COLS);
    }

    #[test]
    fn test_set_camera_inverts() {
        let mut pass = PassConstants::default();
        let eye = Vec3::new(0.0, 2.0, -5.0);
        let view = strata_core::math::look_at_rh(&eye, &Vec3::zeros(), &Vec3::y());
        let proj = strata_core::math::perspective_rh(1.0, 1.5, 0.1, 100.0);
        pass.set_camera(eye, &view, &proj);

        let inv_view = Mat4::from(pass.inv_view);
        let product = Mat4::from(pass.view) * inv_view;
        assert!((product - Mat4::identity()).abs().max() < 1e-4);
        assert_eq!(pass.eye_pos, [0.0, 2.0, -5.0]);
    }

    #[test]
    fn test_render_target_size() {
        let mut pass = PassConstants::default();
        pass.set_render_target_size(800, 0);
        assert_eq!(pass.render_target_size, [800.0, 1.0]);
        assert_eq!(pass.inv_render_target_size, [1.0 / 800.0, 1.0]);
    }

    #[test]
    fn test_material_edit_marks_block_dirty() {
        let instance = GraphicsInstance::with_parameters(
            InstanceParameters::new().with_backend(BackendType::Dummy),
        )
        .unwrap();
        let device = instance.create_device().unwrap();
        let frames = FramesInFlight::new(3).unwrap();
        let mut mirror = ConstantMirror::new(&device, "materials", frames, 8).unwrap();
        let mut brick = Material::new(
            "brick",
            mirror.create_block(MaterialConstants::default()).unwrap(),
        )
        .with_diffuse_srv(0)
        .with_normal_srv(1);

        for frame in 0..3 {
            mirror.sync(frame, [&mut brick.constants]).unwrap();
        }
        assert_eq!(brick.constants.state(), DirtyState::Clean);

        brick.constants.edit().roughness = 0.8;
        assert_eq!(brick.constants.state(), DirtyState::Dirty(3));
        assert_eq!(brick.cb_index(), 0);
        assert_eq!(brick.normal_srv_heap_index, Some(1));
    }
}
