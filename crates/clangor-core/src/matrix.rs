//! Feedback coupling matrices for the FDN.
//!
//! A [`CouplingMatrix`] is a dense, row-major N×N matrix built once per
//! render and read-only afterwards. [`MatrixFamily`] is the closed set of
//! constructions; [`CouplingMatrix::build`] dispatches on it.
//!
//! # Families
//!
//! | Family | Orthogonal | Construction |
//! |--------|------------|--------------|
//! | `Orthogonal` | yes | Haar-random, Householder QR of a Gaussian matrix |
//! | `SpecialOrthogonal` | yes | as above, determinant forced to +1 |
//! | `CirculantOrthogonal` | yes | random circulant with unit-magnitude spectrum |
//! | `Circulant4`..`Circulant32` | yes | same, seed row limited to 4..32 random taps |
//! | `Upper/LowerTriangular*` | no | random entries in `[0, 1]` or `[−1, 0]` |
//! | `Schroeder*` | no | state matrix of a chain of series allpasses |
//! | `Absorbent*` | no | orthogonal core times per-column absorption |
//! | `Hadamard` | yes | Sylvester; other sizes use the uniform Householder |
//! | `Conference` | yes | Paley when `N − 1` is an odd prime; otherwise Hadamard |
//!
//! [`CouplingMatrix::householder`] builds the reflection `I − 2vvᵗ/‖v‖²`
//! from an explicit vector.

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std as alloc;

use alloc::vec;
use alloc::vec::Vec;
use core::f64::consts::TAU;
use core::fmt;
use core::str::FromStr;

use libm::{cos, sin, sqrt};

use crate::math::{EPSILON, is_prime};
use crate::random::RandomStream;

/// Closed set of matrix constructions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum MatrixFamily {
    /// Haar-random orthogonal matrix
    Orthogonal,
    /// Haar-random rotation (determinant +1)
    #[default]
    SpecialOrthogonal,
    /// Random orthogonal circulant, full-width seed row
    CirculantOrthogonal,
    /// Orthogonal circulant from 4 random seed taps
    Circulant4,
    /// Orthogonal circulant from 8 random seed taps
    Circulant8,
    /// Orthogonal circulant from 16 random seed taps
    Circulant16,
    /// Orthogonal circulant from 32 random seed taps
    Circulant32,
    /// Upper triangle in `[0, 1]`
    UpperTriangularPositive,
    /// Upper triangle in `[−1, 0]`
    UpperTriangularNegative,
    /// Lower triangle in `[0, 1]`
    LowerTriangularPositive,
    /// Lower triangle in `[−1, 0]`
    LowerTriangularNegative,
    /// Series-allpass state matrix, gains in `[0, 1]`
    SchroederPositive,
    /// Series-allpass state matrix, gains in `[−1, 0]`
    SchroederNegative,
    /// Orthogonal core, absorption in `[0, 1]`
    AbsorbentPositive,
    /// Orthogonal core, absorption in `[−1, 0]`
    AbsorbentNegative,
    /// Normalized Sylvester-Hadamard
    Hadamard,
    /// Normalized Paley conference matrix
    Conference,
}

impl MatrixFamily {
    /// Every family, in menu order.
    pub const ALL: [MatrixFamily; 17] = [
        Self::Orthogonal,
        Self::SpecialOrthogonal,
        Self::CirculantOrthogonal,
        Self::Circulant4,
        Self::Circulant8,
        Self::Circulant16,
        Self::Circulant32,
        Self::UpperTriangularPositive,
        Self::UpperTriangularNegative,
        Self::LowerTriangularPositive,
        Self::LowerTriangularNegative,
        Self::SchroederPositive,
        Self::SchroederNegative,
        Self::AbsorbentPositive,
        Self::AbsorbentNegative,
        Self::Hadamard,
        Self::Conference,
    ];

    /// Kebab-case name used in presets and on the command line.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Orthogonal => "orthogonal",
            Self::SpecialOrthogonal => "special-orthogonal",
            Self::CirculantOrthogonal => "circulant-orthogonal",
            Self::Circulant4 => "circulant-4",
            Self::Circulant8 => "circulant-8",
            Self::Circulant16 => "circulant-16",
            Self::Circulant32 => "circulant-32",
            Self::UpperTriangularPositive => "upper-triangular-positive",
            Self::UpperTriangularNegative => "upper-triangular-negative",
            Self::LowerTriangularPositive => "lower-triangular-positive",
            Self::LowerTriangularNegative => "lower-triangular-negative",
            Self::SchroederPositive => "schroeder-positive",
            Self::SchroederNegative => "schroeder-negative",
            Self::AbsorbentPositive => "absorbent-positive",
            Self::AbsorbentNegative => "absorbent-negative",
            Self::Hadamard => "hadamard",
            Self::Conference => "conference",
        }
    }

    /// Looks up a family by menu index; out-of-range indices clamp to the
    /// last entry.
    pub fn from_index(index: usize) -> Self {
        Self::ALL[index.min(Self::ALL.len() - 1)]
    }

    /// Whether the construction yields `M·Mᵗ = I`.
    pub const fn is_orthogonal(self) -> bool {
        !matches!(
            self,
            Self::UpperTriangularPositive
                | Self::UpperTriangularNegative
                | Self::LowerTriangularPositive
                | Self::LowerTriangularNegative
                | Self::SchroederPositive
                | Self::SchroederNegative
                | Self::AbsorbentPositive
                | Self::AbsorbentNegative
        )
    }
}

impl fmt::Display for MatrixFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when parsing an unknown family name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownFamily;

impl fmt::Display for UnknownFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("unknown matrix family")
    }
}

#[cfg(feature = "std")]
impl std::error::Error for UnknownFamily {}

impl FromStr for MatrixFamily {
    type Err = UnknownFamily;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|family| family.name().eq_ignore_ascii_case(s))
            .ok_or(UnknownFamily)
    }
}

/// Dense N×N matrix, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct CouplingMatrix {
    size: usize,
    data: Vec<f64>,
}

impl CouplingMatrix {
    /// N×N identity. Sizes below 1 are raised to 1.
    pub fn identity(size: usize) -> Self {
        let size = size.max(1);
        let mut data = vec![0.0; size * size];
        for i in 0..size {
            data[i * size + i] = 1.0;
        }
        Self { size, data }
    }

    /// Wraps row-major data. Returns `None` unless `data.len() == size²`
    /// and `size > 0`.
    pub fn from_rows(size: usize, data: Vec<f64>) -> Option<Self> {
        (size > 0 && data.len() == size * size).then_some(Self { size, data })
    }

    /// Householder reflection `I − 2vvᵗ/‖v‖²`.
    ///
    /// Orthogonal and symmetric for every nonzero `v`. A zero (or empty)
    /// vector yields the identity.
    pub fn householder(v: &[f64]) -> Self {
        let mut m = Self::identity(v.len());
        let norm2: f64 = v.iter().map(|x| x * x).sum();
        if norm2 < EPSILON || !norm2.is_finite() {
            return m;
        }
        let scale = 2.0 / norm2;
        for (i, vi) in v.iter().enumerate() {
            for (j, vj) in v.iter().enumerate() {
                m.data[i * m.size + j] -= scale * vi * vj;
            }
        }
        m
    }

    /// Builds a matrix of `family` and `size`, drawing randomness from a
    /// stream seeded with `seed`.
    pub fn build(family: MatrixFamily, size: usize, seed: u64) -> Self {
        let size = size.max(1);
        let mut rng = RandomStream::new(seed);

        #[cfg(feature = "tracing")]
        tracing::debug!(family = family.name(), size, seed, "building coupling matrix");

        match family {
            MatrixFamily::Orthogonal => random_orthogonal(size, &mut rng, false),
            MatrixFamily::SpecialOrthogonal => random_orthogonal(size, &mut rng, true),
            MatrixFamily::CirculantOrthogonal => circulant_orthogonal(size, size, &mut rng),
            MatrixFamily::Circulant4 => circulant_orthogonal(size, 4, &mut rng),
            MatrixFamily::Circulant8 => circulant_orthogonal(size, 8, &mut rng),
            MatrixFamily::Circulant16 => circulant_orthogonal(size, 16, &mut rng),
            MatrixFamily::Circulant32 => circulant_orthogonal(size, 32, &mut rng),
            MatrixFamily::UpperTriangularPositive => triangular(size, &mut rng, true, 1.0),
            MatrixFamily::UpperTriangularNegative => triangular(size, &mut rng, true, -1.0),
            MatrixFamily::LowerTriangularPositive => triangular(size, &mut rng, false, 1.0),
            MatrixFamily::LowerTriangularNegative => triangular(size, &mut rng, false, -1.0),
            MatrixFamily::SchroederPositive => schroeder(size, &mut rng, 1.0),
            MatrixFamily::SchroederNegative => schroeder(size, &mut rng, -1.0),
            MatrixFamily::AbsorbentPositive => absorbent(size, &mut rng, 1.0),
            MatrixFamily::AbsorbentNegative => absorbent(size, &mut rng, -1.0),
            MatrixFamily::Hadamard => hadamard(size),
            MatrixFamily::Conference => conference(size),
        }
    }

    /// Side length N.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Entry at row `i`, column `j`.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[i * self.size + j]
    }

    /// Row-major entries.
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Row `i`.
    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.size..(i + 1) * self.size]
    }

    /// `out = M · x`. Both slices must be N long.
    #[inline]
    pub fn mul_vec(&self, x: &[f64], out: &mut [f64]) {
        debug_assert_eq!(x.len(), self.size);
        debug_assert_eq!(out.len(), self.size);
        for (row, y) in self.data.chunks_exact(self.size).zip(out.iter_mut()) {
            *y = row.iter().zip(x).map(|(a, b)| a * b).sum();
        }
    }

    /// Frobenius norm of `M·Mᵗ − I`; zero for an exactly orthogonal matrix.
    pub fn orthogonality_error(&self) -> f64 {
        let n = self.size;
        let mut sum = 0.0;
        for i in 0..n {
            for j in 0..n {
                let dot: f64 = self.row(i).iter().zip(self.row(j)).map(|(a, b)| a * b).sum();
                let d = dot - if i == j { 1.0 } else { 0.0 };
                sum += d * d;
            }
        }
        sqrt(sum)
    }

    /// Whether `M = Mᵗ` within `tolerance`.
    pub fn is_symmetric(&self, tolerance: f64) -> bool {
        let n = self.size;
        (0..n).all(|i| (0..i).all(|j| (self.get(i, j) - self.get(j, i)).abs() <= tolerance))
    }

    fn negate_column(&mut self, j: usize) {
        for i in 0..self.size {
            self.data[i * self.size + j] = -self.data[i * self.size + j];
        }
    }
}

/// Haar-random orthogonal matrix via Householder QR of a Gaussian matrix.
///
/// Columns are sign-corrected with `diag(R)` so the distribution is uniform
/// over O(N). With `special` set, the first column is negated when the
/// determinant is −1.
fn random_orthogonal(n: usize, rng: &mut RandomStream, special: bool) -> CouplingMatrix {
    let a: Vec<f64> = (0..n * n).map(|_| rng.normal()).collect();

    let mut r = a;
    let mut q = CouplingMatrix::identity(n);
    // det(Q) is (−1)^(applied reflections) before sign correction.
    let mut negative = false;

    for k in 0..n {
        let mut x: Vec<f64> = (k..n).map(|i| r[i * n + k]).collect();
        let norm_x = sqrt(x.iter().map(|v| v * v).sum::<f64>());
        if norm_x < 1e-15 {
            continue;
        }
        let sign = if x[0] >= 0.0 { 1.0 } else { -1.0 };
        x[0] += sign * norm_x;
        let norm_v = sqrt(x.iter().map(|v| v * v).sum::<f64>());
        if norm_v < 1e-15 {
            continue;
        }
        for v in &mut x {
            *v /= norm_v;
        }
        negative = !negative;

        for j in k..n {
            let dot: f64 = (k..n).map(|i| x[i - k] * r[i * n + j]).sum();
            for i in k..n {
                r[i * n + j] -= 2.0 * x[i - k] * dot;
            }
        }
        for i in 0..n {
            let dot: f64 = (k..n).map(|j| q.data[i * n + j] * x[j - k]).sum();
            for j in k..n {
                q.data[i * n + j] -= 2.0 * dot * x[j - k];
            }
        }
    }

    for j in 0..n {
        if r[j * n + j] < 0.0 {
            q.negate_column(j);
            negative = !negative;
        }
    }
    if special && negative {
        q.negate_column(0);
    }
    q
}

/// Orthogonal circulant from a band-limited random seed row.
///
/// The seed row is `[1, r₁, …, r_band, 0, …]` with `rᵢ ∈ [−1, 1)`. Every
/// DFT bin is projected onto the unit circle, which makes the circulant
/// orthogonal; the spectrum stays Hermitian, so the result is real.
fn circulant_orthogonal(n: usize, band: usize, rng: &mut RandomStream) -> CouplingMatrix {
    let mut source = vec![0.0; n];
    source[0] = 1.0;
    for s in source.iter_mut().skip(1).take(band) {
        *s = rng.uniform(-1.0, 1.0);
    }

    let nf = n as f64;
    let mut spectrum: Vec<(f64, f64)> = (0..n)
        .map(|k| {
            source.iter().enumerate().fold((0.0, 0.0), |(re, im), (t, &x)| {
                let w = TAU * (k * t % n) as f64 / nf;
                (re + x * cos(w), im - x * sin(w))
            })
        })
        .collect();
    for (re, im) in &mut spectrum {
        let mag = sqrt(*re * *re + *im * *im);
        if mag < EPSILON {
            *re = 1.0;
            *im = 0.0;
        } else {
            *re /= mag;
            *im /= mag;
        }
    }

    let row: Vec<f64> = (0..n)
        .map(|t| {
            spectrum.iter().enumerate().fold(0.0, |acc, (k, &(re, im))| {
                let w = TAU * (k * t % n) as f64 / nf;
                acc + re * cos(w) - im * sin(w)
            }) / nf
        })
        .collect();

    let mut m = CouplingMatrix::identity(n);
    for i in 0..n {
        for j in 0..n {
            m.data[i * n + j] = row[(j + n - i) % n];
        }
    }
    m
}

fn triangular(n: usize, rng: &mut RandomStream, upper: bool, sign: f64) -> CouplingMatrix {
    let mut m = CouplingMatrix::identity(n);
    for i in 0..n {
        for j in 0..n {
            let inside = if upper { j >= i } else { j <= i };
            m.data[i * n + j] = if inside { sign * rng.next_f64() } else { 0.0 };
        }
    }
    m
}

/// State matrix of `n` Schroeder allpasses in series with gains `gᵢ`.
///
/// `A[i][i] = gᵢ`, and below the diagonal
/// `A[i][j] = (1 − g_j²) · Π_{k=j+1}^{i−1} (−g_k)`.
fn schroeder(n: usize, rng: &mut RandomStream, sign: f64) -> CouplingMatrix {
    let gains: Vec<f64> = (0..n).map(|_| sign * rng.next_f64()).collect();
    let mut m = CouplingMatrix::identity(n);
    for i in 0..n {
        for j in 0..n {
            m.data[i * n + j] = if i == j {
                gains[i]
            } else if j < i {
                let chain: f64 = gains[j + 1..i].iter().map(|g| -g).product();
                (1.0 - gains[j] * gains[j]) * chain
            } else {
                0.0
            };
        }
    }
    m
}

fn absorbent(n: usize, rng: &mut RandomStream, sign: f64) -> CouplingMatrix {
    let mut m = random_orthogonal(n, rng, false);
    for j in 0..n {
        let g = sign * rng.next_f64();
        for i in 0..n {
            m.data[i * n + j] *= g;
        }
    }
    m
}

/// Normalized Sylvester-Hadamard; non-power-of-two sizes fall back to the
/// uniform Householder `I − (2/N)·11ᵗ`.
fn hadamard(n: usize) -> CouplingMatrix {
    if !n.is_power_of_two() {
        return CouplingMatrix::householder(&vec![1.0; n]);
    }
    let scale = 1.0 / sqrt(n as f64);
    let mut m = CouplingMatrix::identity(n);
    for i in 0..n {
        for j in 0..n {
            let parity = (i & j).count_ones() % 2;
            m.data[i * n + j] = if parity == 0 { scale } else { -scale };
        }
    }
    m
}

/// Normalized Paley conference matrix of order `n`.
///
/// Requires `q = n − 1` to be an odd prime; the core is the Jacobsthal
/// matrix `Q[i][j] = χ(j − i)` (quadratic character mod q). For
/// `q ≡ 1 (mod 4)` the matrix is symmetric, for `q ≡ 3 (mod 4)` it is
/// antisymmetric apart from the border. Order 2 is special-cased; other
/// orders fall back to [`hadamard`].
fn conference(n: usize) -> CouplingMatrix {
    if n == 2 {
        let mut m = CouplingMatrix::identity(2);
        m.data = vec![0.0, 1.0, 1.0, 0.0];
        return m;
    }
    let q = n.wrapping_sub(1);
    if n < 4 || !is_prime(q as u64) {
        return hadamard(n);
    }

    let symmetric = q % 4 == 1;
    let scale = 1.0 / sqrt(q as f64);
    let mut m = CouplingMatrix::identity(n);
    m.data.fill(0.0);
    for j in 1..n {
        m.data[j] = scale;
        m.data[j * n] = if symmetric { scale } else { -scale };
    }
    for i in 0..q {
        for j in 0..q {
            m.data[(i + 1) * n + j + 1] = scale * quadratic_character((j + q - i) % q, q);
        }
    }
    m
}

/// Legendre symbol `(a / q)` for an odd prime `q`.
fn quadratic_character(a: usize, q: usize) -> f64 {
    if a == 0 {
        return 0.0;
    }
    let (a, q) = (a as u64, q as u64);
    let mut result = 1u64;
    let mut base = a % q;
    let mut exp = (q - 1) / 2;
    while exp > 0 {
        if exp & 1 == 1 {
            result = result * base % q;
        }
        base = base * base % q;
        exp >>= 1;
    }
    if result == 1 { 1.0 } else { -1.0 }
}
