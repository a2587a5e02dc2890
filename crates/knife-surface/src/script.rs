//! The knife input script: a line-oriented recursive-descent reader that
//! names a cutting-surface mesh file, lists transform directives to apply
//! to it, and optionally narrows it to a subset of boundary patches.
//! Grounded on `knife_fortran.c`'s `knife_required_local_dual`, the only
//! place the legacy source actually reads one of these files.

use crate::SurfaceMesh;
use knife_core::{KnifeError, Result};
use knife_math::Transform;
use knife_primal::Primal;
use std::collections::BTreeSet;
use std::io::BufReader;
use std::path::Path;

/// One line of the knife input script, after the surface file path.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptDirective {
    Outward,
    Inward,
    Translate(f64, f64, f64),
    Rotate { axis: (f64, f64, f64), degrees: f64 },
    Scale(f64),
    FlipYz,
    FlipZy,
    ReflectY,
    Massoud(String),
}

/// A parsed script: the surface file path, the transform directives in
/// order, and the boundary patch ids named after `faces` (empty means no
/// `faces` line was present, i.e. keep the whole surface).
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedScript {
    pub surface_path: String,
    pub directives: Vec<ScriptDirective>,
    pub faces: Vec<u32>,
}

/// Parse the text of a knife input script.
pub fn parse_script(text: &str) -> Result<ParsedScript> {
    let mut tokens = text.split_whitespace();
    let surface_path = tokens
        .next()
        .ok_or_else(|| KnifeError::FileError("knife script: missing surface file path".into()))?
        .to_owned();

    let mut directives = Vec::new();
    let mut faces = Vec::new();
    let mut reading_faces = false;

    while let Some(tok) = tokens.next() {
        if reading_faces {
            let id: u32 = tok
                .parse()
                .map_err(|_| KnifeError::FileError(format!("knife script: bad face id '{tok}'")))?;
            faces.push(id);
            continue;
        }
        match tok {
            "outward" => directives.push(ScriptDirective::Outward),
            "inward" => directives.push(ScriptDirective::Inward),
            "translate" => {
                let dx = next_f64(&mut tokens, "translate dx")?;
                let dy = next_f64(&mut tokens, "translate dy")?;
                let dz = next_f64(&mut tokens, "translate dz")?;
                directives.push(ScriptDirective::Translate(dx, dy, dz));
            }
            "rotate" => {
                let nx = next_f64(&mut tokens, "rotate nx")?;
                let ny = next_f64(&mut tokens, "rotate ny")?;
                let nz = next_f64(&mut tokens, "rotate nz")?;
                let degrees = next_f64(&mut tokens, "rotate angle")?;
                directives.push(ScriptDirective::Rotate {
                    axis: (nx, ny, nz),
                    degrees,
                });
            }
            "scale" => {
                let s = next_f64(&mut tokens, "scale factor")?;
                directives.push(ScriptDirective::Scale(s));
            }
            "flip_yz" => directives.push(ScriptDirective::FlipYz),
            "flip_zy" => directives.push(ScriptDirective::FlipZy),
            "reflect_y" => directives.push(ScriptDirective::ReflectY),
            "massoud" => {
                let path = tokens
                    .next()
                    .ok_or_else(|| KnifeError::FileError("knife script: missing massoud path".into()))?
                    .to_owned();
                directives.push(ScriptDirective::Massoud(path));
            }
            "faces" => reading_faces = true,
            other => {
                return Err(KnifeError::FileError(format!(
                    "knife script: unrecognized directive '{other}'"
                )))
            }
        }
    }

    if reading_faces && faces.is_empty() {
        return Err(KnifeError::Failure(
            "error specifying faces for cut surface in knife input file".into(),
        ));
    }

    Ok(ParsedScript {
        surface_path,
        directives,
        faces,
    })
}

fn next_f64<'a>(tokens: &mut impl Iterator<Item = &'a str>, what: &str) -> Result<f64> {
    tokens
        .next()
        .ok_or_else(|| KnifeError::FileError(format!("knife script: missing {what}")))?
        .parse()
        .map_err(|_| KnifeError::FileError(format!("knife script: bad {what}")))
}

fn load_primal(path: &Path) -> Result<Primal> {
    let bytes = std::fs::read(path).map_err(KnifeError::from)?;
    match path.extension().and_then(|e| e.to_str()) {
        Some("fgrid") => knife_io::read_fgrid(&mut BufReader::new(&bytes[..])),
        _ => knife_io::read_tri(&bytes),
    }
}

/// Load, transform, and subset the surface named by a knife input script,
/// returning the finished [`SurfaceMesh`]. `script_dir` resolves a
/// relative `massoud` path the same way the script's own path is resolved.
pub fn apply_script(script_path: &Path) -> Result<SurfaceMesh> {
    let text = std::fs::read_to_string(script_path).map_err(KnifeError::from)?;
    let parsed = parse_script(&text)?;
    let script_dir = script_path.parent().unwrap_or_else(|| Path::new("."));

    let mut primal = load_primal(&script_dir.join(&parsed.surface_path))?;
    let mut inward_pointing_normal = false;

    for directive in &parsed.directives {
        match directive {
            ScriptDirective::Outward => inward_pointing_normal = false,
            ScriptDirective::Inward => inward_pointing_normal = true,
            ScriptDirective::Translate(dx, dy, dz) => {
                primal.apply_transform(&Transform::translation(*dx, *dy, *dz));
            }
            ScriptDirective::Rotate { axis, degrees } => {
                let (nx, ny, nz) = *axis;
                let dir = knife_math::Dir3::new_normalize(knife_math::Vec3::new(nx, ny, nz));
                let radians = degrees.to_radians();
                primal.apply_transform(&Transform::rotation_about_axis(&dir, radians));
            }
            ScriptDirective::Scale(s) => {
                primal.apply_transform(&Transform::uniform_scale(*s));
            }
            ScriptDirective::FlipYz => primal.flip_yz(),
            ScriptDirective::FlipZy => primal.flip_zy(),
            ScriptDirective::ReflectY => primal.reflect_y(),
            ScriptDirective::Massoud(path) => {
                apply_massoud(&mut primal, &script_dir.join(path))?;
            }
        }
    }

    let patches: BTreeSet<u32> = parsed.faces.into_iter().collect();
    SurfaceMesh::from_primal(&primal, &patches, inward_pointing_normal)
}

fn apply_massoud(primal: &mut Primal, path: &Path) -> Result<()> {
    let file = std::fs::File::open(path).map_err(KnifeError::from)?;
    let displacements = knife_io::read_massoud(&mut BufReader::new(file))?;
    for (one_based_node, delta) in displacements {
        let node = one_based_node as usize - 1;
        primal.displace_node(node, delta.coords)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_transform_directives_in_order() {
        let text = "surface.tri\ntranslate 1 2 3\nflip_yz\nscale 2\n";
        let parsed = parse_script(text).unwrap();
        assert_eq!(parsed.surface_path, "surface.tri");
        assert_eq!(
            parsed.directives,
            vec![
                ScriptDirective::Translate(1.0, 2.0, 3.0),
                ScriptDirective::FlipYz,
                ScriptDirective::Scale(2.0),
            ]
        );
        assert!(parsed.faces.is_empty());
    }

    #[test]
    fn parses_trailing_face_ids() {
        let text = "surface.tri\ninward\nfaces 3 7 9\n";
        let parsed = parse_script(text).unwrap();
        assert_eq!(parsed.directives, vec![ScriptDirective::Inward]);
        assert_eq!(parsed.faces, vec![3, 7, 9]);
    }

    #[test]
    fn empty_faces_list_is_an_error() {
        let text = "surface.tri\nfaces\n";
        assert!(parse_script(text).is_err());
    }
}
