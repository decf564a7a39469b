use super::math::{Box3, Ray};
use super::shape::Shape;

/// Handle into the scene's shape arena. Containers never own geometry, they
/// only reference it, so the same shape can sit in several octree cells while
/// being stored exactly once.
pub type ShapeId = usize;

pub type ShapeArena = Vec<Box<dyn Shape>>;

/// A collection of shapes that can resolve the nearest hit along a ray.
/// `intersect` narrows the shared `best` accumulator and reports the shape
/// that produced the closest hit, if any got closer.
pub trait ShapeContainer: Send + Sync {
    fn add_shape(&mut self, id: ShapeId, arena: &ShapeArena);

    fn intersect(&self, arena: &ShapeArena, ray: &Ray, best: &mut f32) -> Option<ShapeId>;

    fn len(&self) -> usize;
}

/// Unordered sequence with O(n) intersection.
#[derive(Default)]
pub struct LinearSet {
    ids: Vec<ShapeId>,
}

impl LinearSet {
    pub fn new() -> LinearSet {
        LinearSet::default()
    }
}

impl ShapeContainer for LinearSet {
    fn add_shape(&mut self, id: ShapeId, _arena: &ShapeArena) {
        self.ids.push(id);
    }

    fn intersect(&self, arena: &ShapeArena, ray: &Ray, best: &mut f32) -> Option<ShapeId> {
        let mut hit = None;
        for &id in &self.ids {
            if let Some(t) = arena[id].intersect(ray, *best) {
                *best = t;
                hit = Some(id);
            }
        }
        hit
    }

    fn len(&self) -> usize {
        self.ids.len()
    }
}

/// A linear scan behind one aggregate bounding box that grows with every
/// insertion. Rays that miss the aggregate never touch the members.
pub struct MassBoxSet {
    shapes: LinearSet,
    bounds: Box3,
}

impl MassBoxSet {
    pub fn new() -> MassBoxSet {
        MassBoxSet {
            shapes: LinearSet::new(),
            bounds: Box3::empty(),
        }
    }

    pub fn bounds(&self) -> Box3 {
        self.bounds
    }
}

impl Default for MassBoxSet {
    fn default() -> Self {
        Self::new()
    }
}

impl ShapeContainer for MassBoxSet {
    fn add_shape(&mut self, id: ShapeId, arena: &ShapeArena) {
        self.bounds.include(&arena[id].extents());
        debug_assert!(self.bounds.contains_box(&arena[id].extents()));
        self.shapes.add_shape(id, arena);
    }

    fn intersect(&self, arena: &ShapeArena, ray: &Ray, best: &mut f32) -> Option<ShapeId> {
        if !self.bounds.intersect_ray(ray, *best) {
            return None;
        }
        self.shapes.intersect(arena, ray, best)
    }

    fn len(&self) -> usize {
        self.shapes.len()
    }
}

const LEAF_CAPACITY: usize = 5;
const MAX_DEPTH: u32 = 8;

enum NodeKind {
    Leaf(Vec<ShapeId>),
    Internal([usize; 8]),
}

struct OctreeNode {
    bounds: Box3,
    depth: u32,
    kind: NodeKind,
}

/// Adaptive octree over a fixed spatial box. Nodes live in a flat arena and
/// refer to each other by index, so growing the arena never invalidates a
/// node. A leaf that reaches capacity below the depth limit splits into eight
/// children at its geometric center; shapes straddling a split plane are
/// referenced by every child they overlap. Subdivision is permanent.
///
/// Every shape inserted must overlap the box the tree was built over.
pub struct Octree {
    nodes: Vec<OctreeNode>,
    shape_count: usize,
    leaf_capacity: usize,
    max_depth: u32,
}

impl Octree {
    pub fn new(bounds: Box3) -> Octree {
        Octree::with_limits(bounds, LEAF_CAPACITY, MAX_DEPTH)
    }

    pub fn with_limits(bounds: Box3, leaf_capacity: usize, max_depth: u32) -> Octree {
        Octree {
            nodes: vec![OctreeNode {
                bounds,
                depth: 0,
                kind: NodeKind::Leaf(Vec::new()),
            }],
            shape_count: 0,
            leaf_capacity,
            max_depth,
        }
    }

    fn insert(&mut self, node: usize, id: ShapeId, extents: &Box3, arena: &ShapeArena) {
        if let NodeKind::Internal(children) = &self.nodes[node].kind {
            let children = *children;
            for child in children {
                if self.nodes[child].bounds.overlaps(extents) {
                    self.insert(child, id, extents, arena);
                }
            }
            return;
        }
        let full = {
            let NodeKind::Leaf(shapes) = &mut self.nodes[node].kind else {
                unreachable!()
            };
            shapes.push(id);
            shapes.len() >= self.leaf_capacity
        };
        if full && self.nodes[node].depth < self.max_depth {
            self.subdivide(node, arena);
        }
    }

    fn subdivide(&mut self, node: usize, arena: &ShapeArena) {
        let bounds = self.nodes[node].bounds;
        let depth = self.nodes[node].depth;
        let mut children = [0; 8];
        for (octant, slot) in children.iter_mut().enumerate() {
            *slot = self.nodes.len();
            self.nodes.push(OctreeNode {
                bounds: bounds.octant(octant),
                depth: depth + 1,
                kind: NodeKind::Leaf(Vec::new()),
            });
        }
        let held = match std::mem::replace(&mut self.nodes[node].kind, NodeKind::Internal(children))
        {
            NodeKind::Leaf(shapes) => shapes,
            NodeKind::Internal(_) => unreachable!(),
        };
        for id in held {
            let extents = arena[id].extents();
            for child in children {
                if self.nodes[child].bounds.overlaps(&extents) {
                    self.insert(child, id, &extents, arena);
                }
            }
        }
    }

    fn intersect_node(
        &self,
        node: usize,
        arena: &ShapeArena,
        ray: &Ray,
        best: &mut f32,
        hit: &mut Option<ShapeId>,
    ) {
        match &self.nodes[node].kind {
            NodeKind::Leaf(shapes) => {
                for &id in shapes {
                    if let Some(t) = arena[id].intersect(ray, *best) {
                        *best = t;
                        *hit = Some(id);
                    }
                }
            }
            NodeKind::Internal(children) => {
                for &child in children {
                    self.intersect_node(child, arena, ray, best, hit);
                }
            }
        }
    }
}

impl ShapeContainer for Octree {
    fn add_shape(&mut self, id: ShapeId, arena: &ShapeArena) {
        let extents = arena[id].extents();
        self.insert(0, id, &extents, arena);
        self.shape_count += 1;
    }

    fn intersect(&self, arena: &ShapeArena, ray: &Ray, best: &mut f32) -> Option<ShapeId> {
        let mut hit = None;
        self.intersect_node(0, arena, ray, best, &mut hit);
        hit
    }

    fn len(&self) -> usize {
        self.shape_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raytracing::math::Vec3;
    use crate::raytracing::shape::{Sphere, Triangle};

    fn sphere_grid() -> ShapeArena {
        let mut arena: ShapeArena = Vec::new();
        for x in -1..=1 {
            for y in -1..=1 {
                for z in 0..=1 {
                    arena.push(Box::new(Sphere::new(
                        Vec3::new(x as f32 * 3.0, y as f32 * 3.0, z as f32 * 4.0 + 4.0),
                        1.0,
                    )));
                }
            }
        }
        arena
    }

    fn probe_rays() -> Vec<Ray> {
        let mut rays = Vec::new();
        for x in -6..=6 {
            for y in -6..=6 {
                let direction = Vec3::new(x as f32 * 0.1, y as f32 * 0.1, 1.0).normalize();
                rays.push(Ray::new(Vec3::new(0.0, 0.0, -2.0), direction));
            }
        }
        rays
    }

    fn fill<C: ShapeContainer>(container: &mut C, arena: &ShapeArena) {
        for id in 0..arena.len() {
            container.add_shape(id, arena);
        }
    }

    fn world_bounds(arena: &ShapeArena) -> Box3 {
        let mut bounds = Box3::empty();
        for shape in arena {
            bounds.include(&shape.extents());
        }
        bounds
    }

    #[test]
    fn mass_box_bounds_contain_every_member() {
        let arena = sphere_grid();
        let mut set = MassBoxSet::new();
        for id in 0..arena.len() {
            set.add_shape(id, &arena);
            for seen in 0..=id {
                assert!(set.bounds().contains_box(&arena[seen].extents()));
            }
        }
    }

    #[test]
    fn octree_agrees_with_linear_scan() {
        let arena = sphere_grid();
        let mut linear = LinearSet::new();
        let mut octree = Octree::new(world_bounds(&arena));
        fill(&mut linear, &arena);
        fill(&mut octree, &arena);

        for ray in probe_rays() {
            let mut linear_best = f32::MAX;
            let mut octree_best = f32::MAX;
            let expected = linear.intersect(&arena, &ray, &mut linear_best);
            let found = octree.intersect(&arena, &ray, &mut octree_best);
            assert_eq!(expected.is_some(), found.is_some());
            if expected.is_some() {
                assert!((linear_best - octree_best).abs() < 1e-5);
            }
        }
    }

    #[test]
    fn subdivided_and_flat_trees_report_equal_distances() {
        let arena = sphere_grid();
        let bounds = world_bounds(&arena);
        // capacity below the shape count forces splits, a huge one forbids them
        let mut split = Octree::with_limits(bounds, 2, MAX_DEPTH);
        let mut flat = Octree::with_limits(bounds, arena.len() + 1, MAX_DEPTH);
        fill(&mut split, &arena);
        fill(&mut flat, &arena);
        assert!(split.nodes.len() > 1);
        assert_eq!(flat.nodes.len(), 1);

        for ray in probe_rays() {
            let mut split_best = f32::MAX;
            let mut flat_best = f32::MAX;
            let a = split.intersect(&arena, &ray, &mut split_best);
            let b = flat.intersect(&arena, &ray, &mut flat_best);
            assert_eq!(a.is_some(), b.is_some());
            if a.is_some() {
                assert!((split_best - flat_best).abs() < 1e-5);
            }
        }
    }

    #[test]
    fn straddling_shape_is_still_hit_once_subdivided() {
        // a triangle across the root center plus enough spheres to split
        let mut arena: ShapeArena = vec![Box::new(Triangle::new(
            Vec3::new(-0.5, -0.5, 1.0),
            Vec3::new(0.5, -0.5, 1.0),
            Vec3::new(0.0, 0.5, 1.0),
        ))];
        for i in 0..6 {
            arena.push(Box::new(Sphere::new(
                Vec3::new(i as f32 - 2.5, 2.0, 1.0),
                0.4,
            )));
        }
        let mut octree = Octree::new(Box3::from_min_max(
            Vec3::new(-4.0, -4.0, 0.0),
            Vec3::new(4.0, 4.0, 2.0),
        ));
        fill(&mut octree, &arena);
        assert!(octree.nodes.len() > 1);

        let ray = Ray::new(Vec3::new(0.0, 0.0, -1.0), Vec3::z_axis());
        let mut best = f32::MAX;
        let hit = octree.intersect(&arena, &ray, &mut best);
        assert_eq!(hit, Some(0));
        assert!((best - 2.0).abs() < 1e-5);
    }

    #[test]
    fn container_size_counts_shapes_not_references() {
        let arena = sphere_grid();
        let mut octree = Octree::with_limits(world_bounds(&arena), 2, MAX_DEPTH);
        fill(&mut octree, &arena);
        assert_eq!(octree.len(), arena.len());
    }
}
