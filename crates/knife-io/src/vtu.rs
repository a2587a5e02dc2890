//! VTK `UnstructuredGrid` ASCII `.vtu` export, for surface triangles and
//! volume tetrahedra. Binary/appended VTK data encoding is out of scope.

use knife_core::{KnifeError, Result};
use knife_math::Point3;
use std::io::Write;

const VTK_TRIANGLE: u8 = 5;
const VTK_TETRA: u8 = 10;

fn write_header(out: &mut impl Write, npoints: usize, ncells: usize) -> Result<()> {
    writeln!(out, "<?xml version=\"1.0\"?>").map_err(KnifeError::from)?;
    writeln!(
        out,
        "<VTKFile type=\"UnstructuredGrid\" version=\"0.1\" byte_order=\"LittleEndian\">"
    )
    .map_err(KnifeError::from)?;
    writeln!(out, "  <UnstructuredGrid>").map_err(KnifeError::from)?;
    writeln!(
        out,
        "    <Piece NumberOfPoints=\"{npoints}\" NumberOfCells=\"{ncells}\">"
    )
    .map_err(KnifeError::from)?;
    Ok(())
}

fn write_points(out: &mut impl Write, xyz: &[Point3]) -> Result<()> {
    writeln!(out, "      <Points>").map_err(KnifeError::from)?;
    writeln!(
        out,
        "        <DataArray type=\"Float64\" NumberOfComponents=\"3\" format=\"ascii\">"
    )
    .map_err(KnifeError::from)?;
    for p in xyz {
        writeln!(out, "          {} {} {}", p.x, p.y, p.z).map_err(KnifeError::from)?;
    }
    writeln!(out, "        </DataArray>").map_err(KnifeError::from)?;
    writeln!(out, "      </Points>").map_err(KnifeError::from)?;
    Ok(())
}

fn write_cells(out: &mut impl Write, cells: &[Vec<u32>], vtk_type: u8) -> Result<()> {
    writeln!(out, "      <Cells>").map_err(KnifeError::from)?;
    writeln!(
        out,
        "        <DataArray type=\"Int32\" Name=\"connectivity\" format=\"ascii\">"
    )
    .map_err(KnifeError::from)?;
    for cell in cells {
        let nodes: Vec<String> = cell.iter().map(|n| n.to_string()).collect();
        writeln!(out, "          {}", nodes.join(" ")).map_err(KnifeError::from)?;
    }
    writeln!(out, "        </DataArray>").map_err(KnifeError::from)?;

    writeln!(
        out,
        "        <DataArray type=\"Int32\" Name=\"offsets\" format=\"ascii\">"
    )
    .map_err(KnifeError::from)?;
    let mut offset = 0u32;
    for cell in cells {
        offset += cell.len() as u32;
        writeln!(out, "          {offset}").map_err(KnifeError::from)?;
    }
    writeln!(out, "        </DataArray>").map_err(KnifeError::from)?;

    writeln!(
        out,
        "        <DataArray type=\"UInt8\" Name=\"types\" format=\"ascii\">"
    )
    .map_err(KnifeError::from)?;
    for _ in cells {
        writeln!(out, "          {vtk_type}").map_err(KnifeError::from)?;
    }
    writeln!(out, "        </DataArray>").map_err(KnifeError::from)?;
    writeln!(out, "      </Cells>").map_err(KnifeError::from)?;
    Ok(())
}

fn write_footer(out: &mut impl Write) -> Result<()> {
    writeln!(out, "    </Piece>").map_err(KnifeError::from)?;
    writeln!(out, "  </UnstructuredGrid>").map_err(KnifeError::from)?;
    writeln!(out, "</VTKFile>").map_err(KnifeError::from)?;
    Ok(())
}

/// Write a zero-based triangle mesh to ASCII `.vtu`.
pub fn write_vtu_surface(xyz: &[Point3], t2n_zero_based: &[[u32; 3]], out: &mut impl Write) -> Result<()> {
    write_header(out, xyz.len(), t2n_zero_based.len())?;
    write_points(out, xyz)?;
    let cells: Vec<Vec<u32>> = t2n_zero_based.iter().map(|t| t.to_vec()).collect();
    write_cells(out, &cells, VTK_TRIANGLE)?;
    write_footer(out)
}

/// Write a zero-based tetrahedral mesh to ASCII `.vtu`.
pub fn write_vtu_volume(xyz: &[Point3], c2n_zero_based: &[[u32; 4]], out: &mut impl Write) -> Result<()> {
    write_header(out, xyz.len(), c2n_zero_based.len())?;
    write_points(out, xyz)?;
    let cells: Vec<Vec<u32>> = c2n_zero_based.iter().map(|c| c.to_vec()).collect();
    write_cells(out, &cells, VTK_TETRA)?;
    write_footer(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn surface_export_contains_triangle_cell_type() {
        let xyz = vec![Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0), Point3::new(0.0, 1.0, 0.0)];
        let tris = vec![[0u32, 1, 2]];
        let mut buf = Vec::new();
        write_vtu_surface(&xyz, &tris, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("NumberOfPoints=\"3\""));
        assert!(text.contains(&format!("{VTK_TRIANGLE}")));
    }
}
