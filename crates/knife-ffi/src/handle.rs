//! The opaque state a foreign caller threads through every call: the
//! partition's primal mesh, its cutting surface, and the `Domain` they are
//! intersected into. Grounded on `knife_fortran.c`'s module-level statics
//! (`surface_primal`, `surface`, `volume_primal`, `domain`, `partition`),
//! collapsed into one owned struct per the opaque-handle design note.

use knife_core::{KnifeError, Result};
use knife_cut::{ConstraintKind, VertexConstraint};
use knife_domain::{Domain, Topo};
use knife_geom::{Geom, SubtriId};
use knife_math::{Point3, Vec3};
use knife_primal::Primal;
use knife_surface::SurfaceMesh;
use std::path::Path;

/// Per-partition state threaded through every `extern "C"` call.
pub struct KnifeHandle {
    partition: i32,
    volume_primal: Option<Primal>,
    surface: Option<SurfaceMesh>,
    domain: Option<Domain>,
}

fn not_null<'a, T>(value: &'a Option<T>, what: &str) -> Result<&'a T> {
    value.as_ref().ok_or_else(|| KnifeError::Null(format!("{what} NULL")))
}

fn not_null_mut<'a, T>(value: &'a mut Option<T>, what: &str) -> Result<&'a mut T> {
    value.as_mut().ok_or_else(|| KnifeError::Null(format!("{what} NULL")))
}

impl Default for KnifeHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl KnifeHandle {
    pub fn new() -> Self {
        Self {
            partition: -1,
            volume_primal: None,
            surface: None,
            domain: None,
        }
    }

    /// `nnode0` (the count of nodes owned, as opposed to ghosted, by this
    /// partition) is accepted for signature fidelity with the host
    /// boundary but not otherwise consulted: `Primal` has no notion of
    /// partition ghost nodes.
    pub fn volume(
        &mut self,
        part_id: i32,
        _nnode0: usize,
        nnode: usize,
        x: &[f64],
        y: &[f64],
        z: &[f64],
        nface: usize,
        ncell: usize,
        c2n_one_based: &[[u32; 4]],
    ) -> Result<()> {
        self.partition = part_id;
        let mut primal = Primal::create(nnode, nface, ncell);
        primal.copy_volume(x, y, z, c2n_one_based);
        self.volume_primal = Some(primal);
        Ok(())
    }

    /// `start` is the running boundary-face-fill offset the caller tracks
    /// across successive patches (one call per patch); returns the next
    /// offset.
    pub fn boundary(&mut self, start: usize, patch: u32, f2n_one_based: &[[u32; 3]]) -> Result<usize> {
        if f2n_one_based.is_empty() {
            return Ok(start);
        }
        let primal = not_null_mut(&mut self.volume_primal, "volume_primal")?;
        primal.copy_boundary(start, patch, f2n_one_based)
    }

    pub fn required_local_dual(&mut self, script_path: &Path, required: &mut [u8]) -> Result<()> {
        let primal = not_null(&self.volume_primal, "volume_primal")?;
        if required.len() != primal.nnode() {
            return Err(KnifeError::ArrayBound(format!(
                "knife_required_local_dual: wrong nnode {} {}",
                required.len(),
                primal.nnode()
            )));
        }

        let surface = knife_surface::apply_script(script_path)?;
        if surface.ntriangle() == 0 {
            return Err(KnifeError::NotFound(
                "giving up in knife_required_local_dual, surface has no faces".into(),
            ));
        }

        let primal = not_null_mut(&mut self.volume_primal, "volume_primal")?;
        primal.establish_all()?;

        let domain = Domain::new(self.partition.max(0) as u32);
        domain.required_local_dual(primal, &surface, required)?;

        self.surface = Some(surface);
        self.domain = Some(domain);
        Ok(())
    }

    pub fn cut(&mut self, required: &[u8]) -> Result<()> {
        let primal = not_null(&self.volume_primal, "volume_primal")?;
        if required.len() != primal.nnode() {
            return Err(KnifeError::ArrayBound(format!(
                "knife_cut: wrong nnode {} {}",
                required.len(),
                primal.nnode()
            )));
        }
        let surface = not_null(&self.surface, "surface")?.clone();
        let domain = not_null_mut(&mut self.domain, "domain")?;
        domain.create_dual(primal, required)?;
        domain.boolean_subtract(&surface)
    }

    pub fn dual_topo(&self, topo: &mut [i32]) -> Result<()> {
        let primal = not_null(&self.volume_primal, "volume_primal")?;
        let domain = not_null(&self.domain, "domain")?;
        if topo.len() != primal.nnode() {
            return Err(KnifeError::ArrayBound(format!(
                "knife_dual_topo: wrong nnode {} {}",
                topo.len(),
                primal.nnode()
            )));
        }
        for (node, slot) in topo.iter_mut().enumerate() {
            *slot = domain.topo(node) as i32;
        }
        Ok(())
    }

    pub fn make_dual_required(&mut self, node: usize) -> Result<()> {
        self.ensure_poly(node)
    }

    /// Adds an interior Poly at `node` if one is not already required,
    /// mirroring `knife_fortran.c`'s fallback of silently growing the dual
    /// when a caller asks about a node it never marked required.
    fn ensure_poly(&mut self, node: usize) -> Result<()> {
        if not_null(&self.domain, "domain")?.poly(node).is_some() {
            return Ok(());
        }
        let primal = not_null(&self.volume_primal, "volume_primal")?;
        let domain = self.domain.as_mut().ok_or_else(|| KnifeError::Null("domain NULL".into()))?;
        domain.add_interior_poly(primal, node)
    }

    pub fn dual_regions(&self, node: usize) -> Result<usize> {
        let domain = not_null(&self.domain, "domain")?;
        let poly = domain.poly(node).ok_or_else(|| KnifeError::Null(format!("poly {node} NULL")))?;
        Ok(poly.regions())
    }

    pub fn poly_centroid_volume(&self, node: usize, region: usize) -> Result<(Point3, f64)> {
        let primal = not_null(&self.volume_primal, "volume_primal")?;
        let domain = not_null(&self.domain, "domain")?;
        let poly = domain.poly(node).ok_or_else(|| KnifeError::Null(format!("poly {node} NULL")))?;
        poly.centroid_volume(domain.geom(), region, primal.xyz(node)?)
    }

    fn edge_midpoint_node(&self, node1: usize, node2: usize) -> Result<()> {
        let primal = not_null(&self.volume_primal, "volume_primal")?;
        primal.find_edge(node1 as u32, node2 as u32)?;
        Ok(())
    }

    pub fn ntriangles_between_poly(
        &mut self,
        node1: usize,
        region1: usize,
        node2: usize,
        region2: usize,
    ) -> Result<usize> {
        self.edge_midpoint_node(node1, node2)?;
        self.ensure_poly(node1)?;
        self.ensure_poly(node2)?;
        let domain = not_null(&self.domain, "domain")?;
        let poly1 = domain.poly(node1).ok_or_else(|| KnifeError::Null("poly1 NULL".into()))?;
        let _ = region2;
        Ok(poly1.nsubtri_between(domain.geom(), region1, node2)?)
    }

    pub fn triangles_between_poly(
        &mut self,
        node1: usize,
        region1: usize,
        node2: usize,
    ) -> Result<Vec<SubtriTriangle>> {
        self.edge_midpoint_node(node1, node2)?;
        self.ensure_poly(node1)?;
        self.ensure_poly(node2)?;
        let domain = not_null(&self.domain, "domain")?;
        let poly1 = domain.poly(node1).ok_or_else(|| KnifeError::Null("poly1 NULL".into()))?;
        let subtris = poly1.subtri_between(domain.geom(), region1, node2)?;
        Ok(subtris
            .into_iter()
            .map(|id| subtri_triangle(domain.geom(), id))
            .collect())
    }

    pub fn number_of_surface_triangles(&self, node: usize, region: usize, patch: u32) -> Result<usize> {
        let domain = not_null(&self.domain, "domain")?;
        let poly = domain.poly(node).ok_or_else(|| KnifeError::Null(format!("poly {node} NULL")))?;
        poly.surface_nsubtri(region, patch)
    }

    pub fn surface_triangles(&self, node: usize, region: usize, patch: u32) -> Result<Vec<SubtriTriangle>> {
        let domain = not_null(&self.domain, "domain")?;
        let poly = domain.poly(node).ok_or_else(|| KnifeError::Null(format!("poly {node} NULL")))?;
        let subtris = poly.surface_subtri(region, patch)?;
        Ok(subtris
            .into_iter()
            .map(|id| subtri_triangle(domain.geom(), id))
            .collect())
    }

    pub fn number_of_boundary_triangles(&self, node: usize, face_id: usize, region: usize) -> Result<usize> {
        let domain = not_null(&self.domain, "domain")?;
        let poly = domain.poly(node).ok_or_else(|| KnifeError::Null(format!("poly {node} NULL")))?;
        poly.boundary_nsubtri(region, face_id)
    }

    pub fn boundary_triangles(&self, node: usize, face_id: usize, region: usize) -> Result<Vec<SubtriTriangle>> {
        let domain = not_null(&self.domain, "domain")?;
        let poly = domain.poly(node).ok_or_else(|| KnifeError::Null(format!("poly {node} NULL")))?;
        let subtris = poly.boundary_subtri(region, face_id)?;
        Ok(subtris
            .into_iter()
            .map(|id| subtri_triangle(domain.geom(), id))
            .collect())
    }

    pub fn between_poly_sens(&self, node1: usize, region1: usize, node2: usize) -> Result<Vec<[VertexConstraint; 3]>> {
        let domain = not_null(&self.domain, "domain")?;
        let poly1 = domain.poly(node1).ok_or_else(|| KnifeError::Null("poly1 NULL".into()))?;
        poly1.between_sens(domain.geom(), region1, node2)
    }

    pub fn surface_sens(&self, node: usize, region: usize, patch: u32) -> Result<Vec<[VertexConstraint; 3]>> {
        let domain = not_null(&self.domain, "domain")?;
        let poly = domain.poly(node).ok_or_else(|| KnifeError::Null(format!("poly {node} NULL")))?;
        poly.surface_sens(domain.geom(), region, patch)
    }

    pub fn boundary_sens(&self, node: usize, face_id: usize, region: usize) -> Result<Vec<[VertexConstraint; 3]>> {
        let domain = not_null(&self.domain, "domain")?;
        let poly = domain.poly(node).ok_or_else(|| KnifeError::Null(format!("poly {node} NULL")))?;
        poly.boundary_sens(domain.geom(), region, face_id)
    }

    pub fn cut_surface_dim(&self) -> Result<(usize, usize)> {
        let surface = not_null(&self.surface, "surface")?;
        Ok((surface.nnode(), surface.ntriangle()))
    }

    pub fn cut_surface(&self) -> Result<(&[Point3], &[[u32; 3]])> {
        let surface = not_null(&self.surface, "surface")?;
        Ok((&surface.xyz, &surface.triangles))
    }
}

/// One active Subtri's vertex positions, unnormalized area-weighted
/// normal, and area, as crossed at the `triangles_between_poly`/
/// `surface_triangles`/`boundary_triangles` boundary.
#[derive(Debug, Clone, Copy)]
pub struct SubtriTriangle {
    pub node0: Point3,
    pub node1: Point3,
    pub node2: Point3,
    pub normal: Vec3,
    pub area: f64,
}

fn subtri_triangle(geom: &Geom, id: SubtriId) -> SubtriTriangle {
    let s = geom.subtri(id);
    let (p0, p1, p2) = (
        geom.subnode_xyz(s.subnodes[0]),
        geom.subnode_xyz(s.subnodes[1]),
        geom.subnode_xyz(s.subnodes[2]),
    );
    let raw = (p1 - p0).cross(&(p2 - p0));
    let area = raw.norm() / 2.0;
    let normal = if area > 0.0 { raw / raw.norm() } else { raw };
    SubtriTriangle {
        node0: p0,
        node1: p1,
        node2: p2,
        normal,
        area,
    }
}

/// One-based constraint-kind code matching `parent_int`'s layout.
pub fn constraint_kind_code(kind: ConstraintKind) -> i32 {
    kind as i32 + 1
}

/// `Topo` is already the `i32`-repr code the host solver expects, zero-based
/// per spec (the topology codes are not shifted at the boundary).
pub fn topo_code(topo: Topo) -> i32 {
    topo as i32
}
