//! `knife`: convert volume/surface mesh formats, run a knife input script
//! against a volume mesh, and report the resulting dual's cut statistics.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use knife_kernel::knife_primal::Primal;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "knife")]
#[command(about = "Boolean-subtract a cutting surface from a tetrahedral volume mesh", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a knife input script against a volume mesh and report cut statistics
    Cut {
        /// Volume mesh to cut (.fgrid, or FUN3D .tri/.ugrid)
        volume: PathBuf,
        /// Knife input script naming the cutting surface
        script: PathBuf,
        /// Partition id to report diagnostics under
        #[arg(long, default_value_t = 0)]
        partition: u32,
    },
    /// Convert a mesh file between formats (by file extension)
    Convert {
        /// Input mesh file (.fgrid, .tri, .ugrid)
        input: PathBuf,
        /// Output mesh file (.fgrid, .tri, .vtu)
        output: PathBuf,
    },
    /// Print a summary of a volume mesh's size and boundary patches
    Info {
        /// Volume mesh to inspect (.fgrid, .tri, .ugrid)
        volume: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Cut {
            volume,
            script,
            partition,
        } => cut(&volume, &script, partition),
        Commands::Convert { input, output } => convert(&input, &output),
        Commands::Info { volume } => info(&volume),
    }
}

fn read_volume(path: &Path) -> Result<Primal> {
    let mut primal = match path.extension().and_then(|e| e.to_str()) {
        Some("fgrid") => {
            let mut reader = std::io::BufReader::new(File::open(path).with_context(|| format!("opening {}", path.display()))?);
            knife_kernel::knife_io::read_fgrid(&mut reader)?
        }
        _ => {
            let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
            knife_kernel::knife_io::read_tri(&bytes)?
        }
    };
    primal.establish_all()?;
    Ok(primal)
}

fn cut(volume: &Path, script: &Path, partition: u32) -> Result<()> {
    let primal = read_volume(volume)?;
    tracing::info!(nnode = primal.nnode(), ncell = primal.ncell(), "loaded volume mesh");

    let mut session = knife_kernel::Session::new(partition, primal);
    session.cut(script)?;
    let stats = session
        .cut_statistics()
        .expect("cut_statistics is Some immediately after a successful cut");

    println!("uncut:             {}", stats.uncut);
    println!("cut:               {}", stats.cut);
    println!("boundary-adjacent: {}", stats.boundary_adjacent);
    println!("empty:             {}", stats.empty);
    Ok(())
}

fn convert(input: &Path, output: &Path) -> Result<()> {
    let primal = read_volume(input)?;
    let mut out = BufWriter::new(File::create(output).with_context(|| format!("creating {}", output.display()))?);
    match output.extension().and_then(|e| e.to_str()) {
        Some("fgrid") => knife_kernel::knife_io::write_fgrid(&primal, &mut out)?,
        Some("tri") => knife_kernel::knife_io::write_tri(&primal, &mut out)?,
        Some("vtu") => {
            let xyz: Vec<_> = (0..primal.nnode())
                .map(|n| primal.xyz(n))
                .collect::<std::result::Result<Vec<_>, _>>()?;
            if primal.ncell() > 0 {
                let cells: Vec<[u32; 4]> = (0..primal.ncell())
                    .map(|c| primal.cell(c))
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                knife_kernel::knife_io::write_vtu_volume(&xyz, &cells, &mut out)?;
            } else {
                let patches: BTreeSet<u32> = BTreeSet::new();
                let surface = knife_kernel::knife_surface::SurfaceMesh::from_primal(&primal, &patches, false)?;
                knife_kernel::knife_io::write_vtu_surface(&surface.xyz, &surface.triangles, &mut out)?;
            }
        }
        other => bail!("unsupported output format: {:?}", other),
    }
    tracing::info!(output = %output.display(), "wrote converted mesh");
    Ok(())
}

fn info(volume: &Path) -> Result<()> {
    let primal = read_volume(volume)?;
    println!("nnode: {}", primal.nnode());
    println!("nface: {}", primal.nface());
    println!("ncell: {}", primal.ncell());

    let mut patches = BTreeSet::new();
    for i in 0..primal.nface() {
        patches.insert(primal.face(i)?.patch);
    }
    println!("patches: {}", patches.into_iter().map(|p| p.to_string()).collect::<Vec<_>>().join(", "));
    Ok(())
}
