//! ASCII FAST `.fgrid` volume-grid format: a header triple
//! `nnode nfaceb ncell`, then node coordinates (one triple per line), then
//! boundary face connectivity, then boundary patch tags, then tetrahedral
//! connectivity — all one-based, matching the layout FUN3D's own
//! `fast_fgrid` reader expects.

use knife_core::{KnifeError, Result};
use knife_primal::Primal;
use std::io::{BufRead, Write};

/// Parse an ASCII `.fgrid` volume mesh.
pub fn read_fgrid(input: &mut impl BufRead) -> Result<Primal> {
    let mut tokens = tokenize(input)?;
    let mut next = || {
        tokens
            .next()
            .ok_or_else(|| KnifeError::FileError("fgrid: unexpected end of file".into()))
    };
    let nnode: usize = parse(next()?)?;
    let nfaceb: usize = parse(next()?)?;
    let ncell: usize = parse(next()?)?;

    let mut x = Vec::with_capacity(nnode);
    let mut y = Vec::with_capacity(nnode);
    let mut z = Vec::with_capacity(nnode);
    for _ in 0..nnode {
        x.push(parse(next()?)?);
        y.push(parse(next()?)?);
        z.push(parse(next()?)?);
    }

    let mut f2n = Vec::with_capacity(nfaceb);
    for _ in 0..nfaceb {
        let a = parse(next()?)?;
        let b = parse(next()?)?;
        let c = parse(next()?)?;
        f2n.push([a, b, c]);
    }

    let mut tags = Vec::with_capacity(nfaceb);
    for _ in 0..nfaceb {
        tags.push(parse::<u32>(next()?)?);
    }

    let mut c2n = Vec::with_capacity(ncell);
    for _ in 0..ncell {
        let a = parse(next()?)?;
        let b = parse(next()?)?;
        let c = parse(next()?)?;
        let d = parse(next()?)?;
        c2n.push([a, b, c, d]);
    }

    let mut primal = Primal::create(nnode, nfaceb, ncell);
    primal.copy_volume(&x, &y, &z, &c2n);
    let mut start = 0;
    for (face, &tag) in f2n.into_iter().zip(tags.iter()) {
        start = primal.copy_boundary(start, tag, &[face])?;
    }
    Ok(primal)
}

/// Write an ASCII `.fgrid` volume mesh.
pub fn write_fgrid(primal: &Primal, out: &mut impl Write) -> Result<()> {
    writeln!(out, "{} {} {}", primal.nnode(), primal.nface(), primal.ncell())
        .map_err(KnifeError::from)?;
    for i in 0..primal.nnode() {
        let p = primal.xyz(i)?;
        writeln!(out, "{} {} {}", p.x, p.y, p.z).map_err(KnifeError::from)?;
    }
    for i in 0..primal.nface() {
        let f = primal.face(i)?;
        writeln!(out, "{} {} {}", f.nodes[0] + 1, f.nodes[1] + 1, f.nodes[2] + 1)
            .map_err(KnifeError::from)?;
    }
    for i in 0..primal.nface() {
        writeln!(out, "{}", primal.face(i)?.patch).map_err(KnifeError::from)?;
    }
    for i in 0..primal.ncell() {
        let c = primal.cell(i)?;
        writeln!(out, "{} {} {} {}", c[0] + 1, c[1] + 1, c[2] + 1, c[3] + 1)
            .map_err(KnifeError::from)?;
    }
    Ok(())
}

fn tokenize(input: &mut impl BufRead) -> Result<std::vec::IntoIter<String>> {
    let mut text = String::new();
    input
        .read_to_string(&mut text)
        .map_err(|e| KnifeError::FileError(e.to_string()))?;
    Ok(text.split_whitespace().map(str::to_owned).collect::<Vec<_>>().into_iter())
}

fn parse<T: std::str::FromStr>(token: String) -> Result<T> {
    token
        .parse()
        .map_err(|_| KnifeError::FileError(format!("fgrid: could not parse token '{token}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn round_trips_a_single_tetrahedron() {
        let mut primal = Primal::create(4, 1, 1);
        primal.copy_volume(
            &[0.0, 1.0, 0.0, 0.0],
            &[0.0, 0.0, 1.0, 0.0],
            &[0.0, 0.0, 0.0, 1.0],
            &[[1, 2, 3, 4]],
        );
        primal.copy_boundary(0, 5, &[[1, 2, 3]]).unwrap();

        let mut buf = Vec::new();
        write_fgrid(&primal, &mut buf).unwrap();

        let mut cursor = Cursor::new(buf);
        let read_back = read_fgrid(&mut cursor).unwrap();
        assert_eq!(read_back.nnode(), 4);
        assert_eq!(read_back.nface(), 1);
        assert_eq!(read_back.ncell(), 1);
        assert_eq!(read_back.face(0).unwrap().patch, 5);
    }
}
