#![warn(missing_docs)]

//! High-level facade over the `knife` mesh-cutting crates.
//!
//! Provides [`Session`] — load a tetrahedral volume mesh, cut it against a
//! knife script's surface, and read back per-node dual topology — without
//! threading a partition handle through a foreign-callable boundary, the
//! way [`knife_ffi`] must.

pub use knife_core;
pub use knife_cut;
pub use knife_domain;
pub use knife_geom;
pub use knife_io;
pub use knife_math;
pub use knife_primal;
pub use knife_surface;

use knife_core::Result;
use knife_domain::{Domain, Topo};
use knife_primal::Primal;
use knife_surface::SurfaceMesh;
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::Path;

/// One partition's worth of state: a volume mesh, and (once [`Session::cut`]
/// has run) the cutting surface and the dual it produced.
pub struct Session {
    partition: u32,
    primal: Primal,
    surface: Option<SurfaceMesh>,
    domain: Option<Domain>,
}

impl Session {
    /// Wrap an already-built, already-[`Primal::establish_all`]'d mesh.
    pub fn new(partition: u32, primal: Primal) -> Self {
        Self {
            partition,
            primal,
            surface: None,
            domain: None,
        }
    }

    /// Read an AFLR3-style `.fgrid` volume mesh and derive its connectivity.
    pub fn from_fgrid(partition: u32, path: &Path) -> Result<Self> {
        let mut reader = BufReader::new(File::open(path)?);
        let mut primal = knife_io::read_fgrid(&mut reader)?;
        primal.establish_all()?;
        Ok(Self::new(partition, primal))
    }

    /// Read a FUN3D-style (ASCII or binary) `.tri`/`.ugrid` volume mesh and
    /// derive its connectivity.
    pub fn from_tri(partition: u32, path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let mut primal = knife_io::read_tri(&bytes)?;
        primal.establish_all()?;
        Ok(Self::new(partition, primal))
    }

    /// The volume mesh this session was built from.
    pub fn primal(&self) -> &Primal {
        &self.primal
    }

    /// The cutting surface loaded by the most recent [`Session::cut`] call.
    pub fn surface(&self) -> Option<&SurfaceMesh> {
        self.surface.as_ref()
    }

    /// The dual built by the most recent [`Session::cut`] call.
    pub fn domain(&self) -> Option<&Domain> {
        self.domain.as_ref()
    }

    /// Load a knife script's cutting surface, build a dual over every node
    /// the surface passes near, and subtract the surface from it.
    ///
    /// A convenience composition of `required_local_dual`, `create_dual`
    /// and `boolean_subtract` for callers who don't need to grow the dual
    /// incrementally the way the foreign-callable boundary does.
    pub fn cut(&mut self, script_path: &Path) -> Result<()> {
        let surface = knife_surface::apply_script(script_path)?;
        let mut required = vec![0u8; self.primal.nnode()];
        let domain = Domain::new(self.partition);
        domain.required_local_dual(&self.primal, &surface, &mut required)?;

        let mut domain = domain;
        domain.create_dual(&self.primal, &required)?;
        domain.boolean_subtract(&surface)?;

        self.surface = Some(surface);
        self.domain = Some(domain);
        Ok(())
    }

    /// Tally how many primal nodes fall into each [`Topo`] classification
    /// after a [`Session::cut`].
    pub fn cut_statistics(&self) -> Option<CutStatistics> {
        let domain = self.domain.as_ref()?;
        let mut stats = CutStatistics::default();
        for node in 0..self.primal.nnode() {
            match domain.topo(node) {
                Topo::Uncut => stats.uncut += 1,
                Topo::Cut => stats.cut += 1,
                Topo::BoundaryAdjacent => stats.boundary_adjacent += 1,
                Topo::Empty => stats.empty += 1,
            }
        }
        Some(stats)
    }

    /// Write the volume mesh back out as `.fgrid`.
    pub fn write_fgrid(&self, out: &mut impl Write) -> Result<()> {
        knife_io::write_fgrid(&self.primal, out)
    }
}

/// Per-partition node counts by [`Topo`] classification, reported after a cut.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CutStatistics {
    /// Nodes with a Poly that was never cut.
    pub uncut: usize,
    /// Nodes with a Poly that the surface actually trimmed.
    pub cut: usize,
    /// Nodes uncut but bordering a primal boundary patch.
    pub boundary_adjacent: usize,
    /// Nodes with no Poly at all.
    pub empty: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_tet() -> Primal {
        let mut primal = Primal::create(4, 4, 1);
        primal.copy_volume(
            &[0.0, 1.0, 0.0, 0.0],
            &[0.0, 0.0, 1.0, 0.0],
            &[0.0, 0.0, 0.0, 1.0],
            &[[1, 2, 3, 4]],
        );
        primal
            .copy_boundary(0, 1, &[[1, 3, 2]])
            .and_then(|n| primal.copy_boundary(n, 1, &[[1, 2, 4]]))
            .and_then(|n| primal.copy_boundary(n, 1, &[[2, 3, 4]]))
            .and_then(|n| primal.copy_boundary(n, 1, &[[3, 1, 4]]))
            .unwrap();
        primal.establish_all().unwrap();
        primal
    }

    #[test]
    fn a_session_with_no_cut_yet_reports_no_statistics() {
        let session = Session::new(0, unit_tet());
        assert!(session.cut_statistics().is_none());
        assert!(session.domain().is_none());
    }

    #[test]
    fn cutting_with_a_surface_nowhere_near_the_mesh_leaves_every_node_empty() {
        let mut session = Session::new(0, unit_tet());
        let dir = std::env::temp_dir().join(format!("knife-kernel-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let surface_path = dir.join("far.tri");
        std::fs::write(
            &surface_path,
            "3 1\n10 0 0\n10 1 0\n10 0 1\n1 2 3\n1\n",
        )
        .unwrap();
        let script_path = dir.join("far.knife");
        std::fs::write(&script_path, format!("{}\n", surface_path.display())).unwrap();

        session.cut(&script_path).unwrap();
        let stats = session.cut_statistics().unwrap();
        assert_eq!(stats.cut, 0);
        assert_eq!(stats.empty, 4);
    }
}
