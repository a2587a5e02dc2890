//! Tecplot ASCII `.t` export (diagnostic dumps, cut-surface visualization)
//! and the minimal FEPOINT deformation-file reader consumed by the
//! `massoud` knife script directive. Grounded on `surface_export_tec` and
//! `primal_apply_massoud`.

use knife_core::{KnifeError, Result};
use knife_math::Point3;
use std::io::{BufRead, Write};

/// Write a triangulated surface as a Tecplot `FEPOINT`/`ET=TRIANGLE` zone.
pub fn write_tecplot_surface(
    title: &str,
    xyz: &[Point3],
    t2n_one_based: &[[u32; 3]],
    out: &mut impl Write,
) -> Result<()> {
    writeln!(out, "TITLE = \"{title}\"").map_err(KnifeError::from)?;
    writeln!(out, "VARIABLES = \"X\", \"Y\", \"Z\"").map_err(KnifeError::from)?;
    writeln!(
        out,
        "ZONE N={}, E={}, F=FEPOINT, ET=TRIANGLE",
        xyz.len(),
        t2n_one_based.len()
    )
    .map_err(KnifeError::from)?;
    for p in xyz {
        writeln!(out, "{} {} {}", p.x, p.y, p.z).map_err(KnifeError::from)?;
    }
    for t in t2n_one_based {
        writeln!(out, "{} {} {}", t[0], t[1], t[2]).map_err(KnifeError::from)?;
    }
    Ok(())
}

/// A per-node displacement read from a Tecplot FEPOINT deformation file:
/// `global_id dx dy dz [sensitivity columns...]`, one-based node id, extra
/// trailing columns ignored. Grounded on `primal_apply_massoud`'s
/// column-skipping behaviour.
pub fn read_massoud(input: &mut impl BufRead) -> Result<Vec<(u32, Point3)>> {
    let mut text = String::new();
    std::io::Read::read_to_string(input, &mut text).map_err(KnifeError::from)?;

    let mut displacements = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with("TITLE") || line.starts_with("VARIABLES") || line.starts_with("ZONE") {
            continue;
        }
        let mut fields = line.split_whitespace();
        let Some(id_tok) = fields.next() else { continue };
        let Ok(id) = id_tok.parse::<u32>() else { continue };
        let dx: f64 = fields
            .next()
            .and_then(|t| t.parse().ok())
            .ok_or_else(|| KnifeError::FileError("massoud: missing dx".into()))?;
        let dy: f64 = fields
            .next()
            .and_then(|t| t.parse().ok())
            .ok_or_else(|| KnifeError::FileError("massoud: missing dy".into()))?;
        let dz: f64 = fields
            .next()
            .and_then(|t| t.parse().ok())
            .ok_or_else(|| KnifeError::FileError("massoud: missing dz".into()))?;
        // any remaining sensitivity columns are intentionally ignored.
        displacements.push((id, Point3::new(dx, dy, dz)));
    }
    Ok(displacements)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_the_expected_zone_header() {
        let xyz = vec![Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0), Point3::new(0.0, 1.0, 0.0)];
        let tris = vec![[1u32, 2, 3]];
        let mut buf = Vec::new();
        write_tecplot_surface("test", &xyz, &tris, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("N=3, E=1"));
    }

    #[test]
    fn reads_massoud_displacements_skipping_extra_columns() {
        let text = "1 0.1 0.2 0.3 99.0\n2 -0.1 0.0 0.0\n";
        let mut cursor = std::io::Cursor::new(text.as_bytes());
        let displacements = read_massoud(&mut cursor).unwrap();
        assert_eq!(displacements.len(), 2);
        assert_eq!(displacements[0].0, 1);
        assert!((displacements[0].1.x - 0.1).abs() < 1e-12);
    }
}
