//! Coupling matrix inspection.

use anyhow::ensure;
use clangor_core::{CouplingMatrix, MatrixFamily};
use clangor_synth::MAX_MATRIX_SIZE;
use clap::Args;

#[derive(Args)]
pub struct MatrixArgs {
    /// Matrix family (e.g. hadamard, special-orthogonal, circulant-8)
    #[arg(required_unless_present = "list")]
    family: Option<MatrixFamily>,

    /// Side length N
    #[arg(short = 'n', long, default_value_t = 8)]
    size: usize,

    /// Seed for the randomized families
    #[arg(short, long, default_value_t = 0)]
    seed: u64,

    /// List the available families
    #[arg(long)]
    list: bool,
}

pub fn run(args: MatrixArgs) -> anyhow::Result<()> {
    if args.list {
        for family in MatrixFamily::ALL {
            println!("{family}");
        }
        return Ok(());
    }
    let Some(family) = args.family else {
        anyhow::bail!("no matrix family given");
    };
    ensure!(
        (1..=MAX_MATRIX_SIZE).contains(&args.size),
        "size must be between 1 and {MAX_MATRIX_SIZE}"
    );

    let matrix = CouplingMatrix::build(family, args.size, args.seed);
    println!("{family} {n}x{n} (seed {})", args.seed, n = matrix.size());
    print!("{}", format_matrix(&matrix));
    println!("orthogonality error: {:.3e}", matrix.orthogonality_error());
    Ok(())
}

fn format_matrix(matrix: &CouplingMatrix) -> String {
    let mut out = String::new();
    for i in 0..matrix.size() {
        let row: Vec<String> = matrix.row(i).iter().map(|x| format!("{x:>8.4}")).collect();
        out.push_str(&row.join(" "));
        out.push('\n');
    }
    out
}
