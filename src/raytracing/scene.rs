use super::container::{LinearSet, MassBoxSet, Octree, ShapeArena, ShapeContainer, ShapeId};
use super::material::Material;
use super::math::{Box3, Ray, Vec3};
use super::shape::Shape;

pub const DEFAULT_WIDTH: u32 = 800;
pub const DEFAULT_HEIGHT: u32 = 600;
pub const DEFAULT_FOV: f32 = 60.0;
pub const DEFAULT_SAMPLES: u32 = 16;

/// Which container the scene resolves intersections with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccelMode {
    Linear,
    MassBox,
    Octree,
}

/// A group of shapes sharing one material. `bounds` is the union of the
/// member extents and is what the light sampler draws points from.
pub struct SceneObject {
    pub material: Material,
    pub bounds: Box3,
    pub shapes: Vec<ShapeId>,
}

/// The nearest intersection along a ray, resolved through the container.
#[derive(Debug, Clone, Copy)]
pub struct RayHit {
    pub t: f32,
    pub shape: ShapeId,
    pub object: usize,
}

/// Scene parameters plus the owned geometry. Shapes live in an arena and are
/// referenced by index from both the objects and the container, so a shape
/// straddling several octree cells is still stored exactly once. The loader
/// mutates the scene incrementally; rendering treats it as read-only.
pub struct Scene {
    width: u32,
    height: u32,
    fov: f32,
    scale: f32,
    aspect: f32,
    pub eye: Vec3,
    pub center: Vec3,
    pub up: Vec3,
    pub ambient: Vec3,
    pub background: Vec3,
    pub samples: u32,
    shapes: ShapeArena,
    shape_objects: Vec<usize>,
    objects: Vec<SceneObject>,
    container: Box<dyn ShapeContainer>,
}

impl Scene {
    pub fn new() -> Scene {
        let fov = DEFAULT_FOV;
        Scene {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            fov,
            scale: (fov.to_radians() * 0.5).tan(),
            aspect: DEFAULT_WIDTH as f32 / DEFAULT_HEIGHT as f32,
            eye: Vec3::new(0.0, 0.0, -1.0),
            center: Vec3::zero(),
            up: Vec3::y_axis(),
            ambient: Vec3::zero(),
            background: Vec3::zero(),
            samples: DEFAULT_SAMPLES,
            shapes: Vec::new(),
            shape_objects: Vec::new(),
            objects: Vec::new(),
            container: Box::new(MassBoxSet::new()),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn fov(&self) -> f32 {
        self.fov
    }

    /// Projection scale factor, `tan(fov / 2)`.
    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn set_width(&mut self, width: u32) {
        self.width = width;
        self.aspect = self.width as f32 / self.height as f32;
    }

    pub fn set_height(&mut self, height: u32) {
        self.height = height;
        self.aspect = self.width as f32 / self.height as f32;
    }

    pub fn set_fov(&mut self, fov: f32) {
        self.fov = fov;
        self.scale = (fov.to_radians() * 0.5).tan();
    }

    /// Starts a new object and returns its handle.
    pub fn add_object(&mut self, material: Material) -> usize {
        self.objects.push(SceneObject {
            material,
            bounds: Box3::empty(),
            shapes: Vec::new(),
        });
        self.objects.len() - 1
    }

    /// Adds a shape to an existing object, growing the object bounds and
    /// registering the shape with the container.
    pub fn add_shape(&mut self, object: usize, shape: Box<dyn Shape>) {
        let id = self.shapes.len();
        let extents = shape.extents();
        self.objects[object].bounds.include(&extents);
        self.objects[object].shapes.push(id);
        self.shapes.push(shape);
        self.shape_objects.push(object);
        self.container.add_shape(id, &self.shapes);
    }

    pub fn objects(&self) -> &[SceneObject] {
        &self.objects
    }

    pub fn objects_mut(&mut self) -> &mut [SceneObject] {
        &mut self.objects
    }

    pub fn shape(&self, id: ShapeId) -> &dyn Shape {
        self.shapes[id].as_ref()
    }

    pub fn shape_count(&self) -> usize {
        self.shapes.len()
    }

    pub fn material_of(&self, hit: &RayHit) -> &Material {
        &self.objects[hit.object].material
    }

    /// Union of every shape's extents.
    pub fn world_bounds(&self) -> Box3 {
        let mut bounds = Box3::empty();
        for shape in &self.shapes {
            bounds.include(&shape.extents());
        }
        if self.shapes.is_empty() {
            bounds = Box3::from_min_max(-Vec3::one(), Vec3::one());
        }
        bounds
    }

    /// Replaces the container, re-registering every shape. Construction is
    /// single-threaded and must finish before rendering starts.
    pub fn rebuild_container(&mut self, mode: AccelMode) {
        let mut container: Box<dyn ShapeContainer> = match mode {
            AccelMode::Linear => Box::new(LinearSet::new()),
            AccelMode::MassBox => Box::new(MassBoxSet::new()),
            AccelMode::Octree => Box::new(Octree::new(self.world_bounds())),
        };
        for id in 0..self.shapes.len() {
            container.add_shape(id, &self.shapes);
        }
        self.container = container;
    }

    /// Nearest intersection along the ray, if any.
    pub fn hit(&self, ray: &Ray) -> Option<RayHit> {
        let mut best = f32::MAX;
        self.container
            .intersect(&self.shapes, ray, &mut best)
            .map(|shape| RayHit {
                t: best,
                shape,
                object: self.shape_objects[shape],
            })
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}
