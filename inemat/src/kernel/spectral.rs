//! Discrete Fourier, cosine and Hilbert transforms.
//!
//! Every transform acts on each column independently, except that a matrix with a single
//! row is treated as one signal laid out along that row.

use std::f64::consts::PI;

use crate::coefficient::{Complex, Real};
use crate::dense::{ComplexMatrix, DenseMatrix, RealMatrix};

use super::FloatCoefficient;

/// Applies `transform` to every signal of `m`. Signals are columns, or the only row of a
/// row vector.
fn along_signals<T, U, F>(m: &DenseMatrix<T>, transform: F) -> DenseMatrix<U>
where
    T: FloatCoefficient,
    U: FloatCoefficient,
    F: Fn(&[T], &mut [U]) + Send + Sync,
{
    let (rows, cols) = (m.rows(), m.cols());
    if rows == 1 && cols > 1 {
        let signal: Vec<T> = (0..cols).map(|c| m.at(0, c)).collect();
        let mut out = vec![U::zero(); cols];
        transform(&signal, &mut out);
        return DenseMatrix::from_fn(1, cols, |_, c| out[c]);
    }
    DenseMatrix::fill_columns(rows, cols, |j, column| transform(m.column(j), column))
}

fn fourier(input: &[Complex], output: &mut [Complex], sign: f64) {
    let n = input.len();
    let step = sign * 2.0 * PI / n as f64;
    for (k, out) in output.iter_mut().enumerate() {
        *out = input
            .iter()
            .enumerate()
            .map(|(t, &x)| x * Complex::from_polar(1.0, step * ((k * t) % n) as f64))
            .sum();
    }
}

/// Unnormalized forward transform `X[k] = sum x[t] exp(-2 pi i k t / n)`.
pub fn dft<T: FloatCoefficient>(m: &DenseMatrix<T>) -> ComplexMatrix {
    along_signals(m, |signal, out| {
        let input: Vec<Complex> = signal.iter().map(|&v| v.to_complex()).collect();
        fourier(&input, out, -1.0);
    })
}

/// Inverse of [`dft`], scaled by `1 / n`.
pub fn idft<T: FloatCoefficient>(m: &DenseMatrix<T>) -> ComplexMatrix {
    along_signals(m, |signal, out| {
        let input: Vec<Complex> = signal.iter().map(|&v| v.to_complex()).collect();
        fourier(&input, out, 1.0);
        let scale = (out.len() as f64).recip();
        for v in out {
            *v *= scale;
        }
    })
}

#[inline]
fn dct_weight(k: usize, n: usize) -> f64 {
    if k == 0 {
        (1.0 / n as f64).sqrt()
    } else {
        (2.0 / n as f64).sqrt()
    }
}

#[inline]
fn dct_basis(k: usize, t: usize, n: usize) -> f64 {
    (PI * (t as f64 + 0.5) * k as f64 / n as f64).cos()
}

/// Orthonormal type II cosine transform.
pub fn dct(m: &RealMatrix) -> RealMatrix {
    along_signals(m, |signal: &[Real], out: &mut [Real]| {
        let n = signal.len();
        for (k, o) in out.iter_mut().enumerate() {
            let sum: f64 = signal.iter().enumerate().map(|(t, &x)| x * dct_basis(k, t, n)).sum();
            *o = dct_weight(k, n) * sum;
        }
    })
}

/// Orthonormal type III cosine transform, the inverse of [`dct`].
pub fn idct(m: &RealMatrix) -> RealMatrix {
    along_signals(m, |coefficients: &[Real], out: &mut [Real]| {
        let n = coefficients.len();
        for (t, o) in out.iter_mut().enumerate() {
            *o = coefficients
                .iter()
                .enumerate()
                .map(|(k, &c)| dct_weight(k, n) * c * dct_basis(k, t, n))
                .sum();
        }
    })
}

/// The analytic signal `x + i H(x)` of every real signal.
pub fn analytic_signal(m: &RealMatrix) -> ComplexMatrix {
    along_signals(m, |signal: &[Real], out: &mut [Complex]| {
        let n = signal.len();
        let input: Vec<Complex> = signal.iter().map(|&v| Complex::new(v, 0.0)).collect();
        let mut spectrum = vec![Complex::new(0.0, 0.0); n];
        fourier(&input, &mut spectrum, -1.0);
        for (k, v) in spectrum.iter_mut().enumerate() {
            let doubled = k > 0 && 2 * k < n;
            let kept = k == 0 || 2 * k == n;
            if doubled {
                *v *= 2.0;
            } else if !kept {
                *v = Complex::new(0.0, 0.0);
            }
        }
        fourier(&spectrum, out, 1.0);
        let scale = (n as f64).recip();
        for v in out {
            *v *= scale;
        }
    })
}

/// Hilbert transform of every real signal.
pub fn hilbert_transform(m: &RealMatrix) -> RealMatrix {
    analytic_signal(m).imag_part()
}

impl<T: FloatCoefficient> DenseMatrix<T> {
    pub fn dft(&self) -> ComplexMatrix {
        dft(self)
    }

    pub fn idft(&self) -> ComplexMatrix {
        idft(self)
    }
}

impl RealMatrix {
    pub fn dct(&self) -> RealMatrix {
        dct(self)
    }

    pub fn idct(&self) -> RealMatrix {
        idct(self)
    }

    pub fn hilbert_transform(&self) -> RealMatrix {
        hilbert_transform(self)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;
    use rand::{rngs::SmallRng, SeedableRng};

    #[test]
    fn dft_of_impulse_and_constant() {
        let impulse = RealMatrix::from_vec(&[vec![1.0], vec![0.0], vec![0.0], vec![0.0]]);
        for (_, _, v) in impulse.dft().iter() {
            assert!((v - Complex::new(1.0, 0.0)).norm() < 1e-15);
        }
        let constant = RealMatrix::ones(4, 1);
        let spectrum = constant.dft();
        assert!((spectrum[(0, 0)] - Complex::new(4.0, 0.0)).norm() < 1e-12);
        assert!((1..4).all(|k| spectrum[(k, 0)].norm() < 1e-12));
    }

    #[test]
    fn inverse_pairs() {
        let mut rng = SmallRng::seed_from_u64(1);
        let c = ComplexMatrix::random(&mut rng, 7, 3);
        let back = c.dft().idft();
        for (i, j, v) in back.iter() {
            assert!((v - c[(i, j)]).norm() < 1e-12);
        }

        let r = RealMatrix::random(&mut rng, 6, 2);
        let back = r.dct().idct();
        for (i, j, v) in back.iter() {
            assert_relative_eq!(v, r[(i, j)], epsilon = 1e-12);
        }
    }

    #[test]
    fn dct_is_orthonormal() {
        let r = RealMatrix::from_vec(&[vec![1.0, 2.0, 3.0, 4.0, 5.0]]);
        let d = r.dct();
        assert_eq!((d.rows(), d.cols()), (1, 5));
        let energy = |m: &RealMatrix| m.iter().map(|(_, _, v)| v * v).sum::<f64>();
        assert_relative_eq!(energy(&d), energy(&r), epsilon = 1e-10);
        assert_relative_eq!(d[(0, 0)], 15.0 / 5f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn hilbert_of_cosine_is_sine() {
        let n = 16;
        let signal = RealMatrix::from_fn(n, 1, |t, _| (2.0 * PI * t as f64 / n as f64).cos());
        let h = signal.hilbert_transform();
        for t in 0..n {
            assert_relative_eq!(h[(t, 0)], (2.0 * PI * t as f64 / n as f64).sin(), epsilon = 1e-12);
        }
        let analytic = analytic_signal(&signal);
        for t in 0..n {
            assert_relative_eq!(analytic[(t, 0)].re, signal[(t, 0)], epsilon = 1e-12);
        }
    }

    #[test]
    fn row_vectors_transform_along_the_row() {
        let r = RealMatrix::from_vec(&[vec![1.0, 1.0, 1.0]]);
        let s = r.dft();
        assert_eq!((s.rows(), s.cols()), (1, 3));
        assert!((s[(0, 0)] - Complex::new(3.0, 0.0)).norm() < 1e-12);
        assert!(s[(0, 1)].norm() < 1e-12);
    }
}
