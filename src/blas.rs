use crate::parallel::{for_each_enumerated, max_indexed, sum_indexed};
use crate::{CsrMatrix, FdmMatrix2, FdmMatrixRow2, FdmVector2};

/// Vector and matrix kernels the iterative solvers are written against.
pub trait Blas {
    type Vector: Clone + Default + Send + Sync;
    type Matrix: Sync;

    fn set(value: f64, result: &mut Self::Vector);

    fn copy(source: &Self::Vector, result: &mut Self::Vector);

    fn dot(a: &Self::Vector, b: &Self::Vector) -> f64;

    /// result = a * x + y
    fn axpy(a: f64, x: &Self::Vector, y: &Self::Vector, result: &mut Self::Vector);

    /// y += a * x
    fn axpy_in_place(a: f64, x: &Self::Vector, y: &mut Self::Vector);

    /// y = a * y + x
    fn aypx(a: f64, y: &mut Self::Vector, x: &Self::Vector);

    fn mvm(m: &Self::Matrix, v: &Self::Vector, result: &mut Self::Vector);

    /// result = b - a * x
    fn residual(a: &Self::Matrix, x: &Self::Vector, b: &Self::Vector, result: &mut Self::Vector);

    fn l2_norm(v: &Self::Vector) -> f64;

    fn linf_norm(v: &Self::Vector) -> f64;

    /// Reshapes `result` to match `like` without caring about its contents.
    fn resize_like(like: &Self::Vector, result: &mut Self::Vector);

    fn zeros_like(like: &Self::Vector) -> Self::Vector {
        let mut result = Self::Vector::default();
        Self::resize_like(like, &mut result);
        Self::set(0.0, &mut result);
        result
    }
}

/// Kernels over the 5-point stencil representation.
#[derive(Clone, Copy, Debug, Default)]
pub struct FdmBlas2;

impl FdmBlas2 {
    pub fn set_matrix(row: FdmMatrixRow2, result: &mut FdmMatrix2) {
        result.fill(row);
    }

    pub fn copy_matrix(source: &FdmMatrix2, result: &mut FdmMatrix2) {
        result.resize(source.width(), source.height(), FdmMatrixRow2::default());
        result.copy_from(source);
    }

    /// Row `(x, y)` of `m * v`.
    pub fn row_product(m: &FdmMatrix2, v: &FdmVector2, x: usize, y: usize) -> f64 {
        let row = m.get(x, y);
        let mut sum = row.center * v.get(x, y);
        if x > 0 {
            sum += m.get(x - 1, y).right * v.get(x - 1, y);
        }
        if x + 1 < m.width() {
            sum += row.right * v.get(x + 1, y);
        }
        if y > 0 {
            sum += m.get(x, y - 1).up * v.get(x, y - 1);
        }
        if y + 1 < m.height() {
            sum += row.up * v.get(x, y + 1);
        }
        sum
    }

    /// Sum of off-diagonal terms of row `(x, y)` applied to `v`.
    pub fn off_diagonal_product(m: &FdmMatrix2, v: &FdmVector2, x: usize, y: usize) -> f64 {
        Self::row_product(m, v, x, y) - m.get(x, y).center * v.get(x, y)
    }
}

impl Blas for FdmBlas2 {
    type Vector = FdmVector2;
    type Matrix = FdmMatrix2;

    fn set(value: f64, result: &mut FdmVector2) {
        result.fill(value);
    }

    fn copy(source: &FdmVector2, result: &mut FdmVector2) {
        Self::resize_like(source, result);
        result.copy_from(source);
    }

    fn dot(a: &FdmVector2, b: &FdmVector2) -> f64 {
        assert_eq!(a.size(), b.size(), "dot product of differently sized vectors");
        let (a, b) = (a.as_slice(), b.as_slice());
        sum_indexed(a.len(), |i| a[i] * b[i])
    }

    fn axpy(a: f64, x: &FdmVector2, y: &FdmVector2, result: &mut FdmVector2) {
        Self::resize_like(x, result);
        result.fill_with_index(|i, j| a * x.get(i, j) + y.get(i, j));
    }

    fn axpy_in_place(a: f64, x: &FdmVector2, y: &mut FdmVector2) {
        y.update_with_index(|i, j, value| value + a * x.get(i, j));
    }

    fn aypx(a: f64, y: &mut FdmVector2, x: &FdmVector2) {
        y.update_with_index(|i, j, value| a * value + x.get(i, j));
    }

    fn mvm(m: &FdmMatrix2, v: &FdmVector2, result: &mut FdmVector2) {
        Self::resize_like(v, result);
        result.fill_with_index(|i, j| Self::row_product(m, v, i, j));
    }

    fn residual(a: &FdmMatrix2, x: &FdmVector2, b: &FdmVector2, result: &mut FdmVector2) {
        Self::resize_like(x, result);
        result.fill_with_index(|i, j| b.get(i, j) - Self::row_product(a, x, i, j));
    }

    fn l2_norm(v: &FdmVector2) -> f64 {
        Self::dot(v, v).sqrt()
    }

    fn linf_norm(v: &FdmVector2) -> f64 {
        let values = v.as_slice();
        max_indexed(values.len(), |i| values[i].abs())
    }

    fn resize_like(like: &FdmVector2, result: &mut FdmVector2) {
        result.resize(like.width(), like.height(), 0.0);
    }
}

/// Kernels over the compressed (CSR) representation.
#[derive(Clone, Copy, Debug, Default)]
pub struct FdmCompressedBlas2;

impl Blas for FdmCompressedBlas2 {
    type Vector = Vec<f64>;
    type Matrix = CsrMatrix;

    fn set(value: f64, result: &mut Vec<f64>) {
        for_each_enumerated(result, |_, slot| *slot = value);
    }

    fn copy(source: &Vec<f64>, result: &mut Vec<f64>) {
        result.clear();
        result.extend_from_slice(source);
    }

    fn dot(a: &Vec<f64>, b: &Vec<f64>) -> f64 {
        assert_eq!(a.len(), b.len(), "dot product of differently sized vectors");
        sum_indexed(a.len(), |i| a[i] * b[i])
    }

    fn axpy(a: f64, x: &Vec<f64>, y: &Vec<f64>, result: &mut Vec<f64>) {
        Self::resize_like(x, result);
        for_each_enumerated(result, |i, slot| *slot = a * x[i] + y[i]);
    }

    fn axpy_in_place(a: f64, x: &Vec<f64>, y: &mut Vec<f64>) {
        for_each_enumerated(y, |i, slot| *slot += a * x[i]);
    }

    fn aypx(a: f64, y: &mut Vec<f64>, x: &Vec<f64>) {
        for_each_enumerated(y, |i, slot| *slot = a * *slot + x[i]);
    }

    fn mvm(m: &CsrMatrix, v: &Vec<f64>, result: &mut Vec<f64>) {
        result.resize(m.n_rows(), 0.0);
        m.mul_vec(v, result);
    }

    fn residual(a: &CsrMatrix, x: &Vec<f64>, b: &Vec<f64>, result: &mut Vec<f64>) {
        result.resize(a.n_rows(), 0.0);
        for_each_enumerated(result, |i, slot| *slot = b[i] - a.row_dot(i, x));
    }

    fn l2_norm(v: &Vec<f64>) -> f64 {
        Self::dot(v, v).sqrt()
    }

    fn linf_norm(v: &Vec<f64>) -> f64 {
        max_indexed(v.len(), |i| v[i].abs())
    }

    fn resize_like(like: &Vec<f64>, result: &mut Vec<f64>) {
        result.resize(like.len(), 0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn assert_close(a: f64, b: f64, tol: f64) {
        assert!(
            (a - b).abs() <= tol,
            "expected {a} to be within {tol} of {b}"
        );
    }

    fn random_stencil(rng: &mut StdRng, width: usize, height: usize) -> FdmMatrix2 {
        let mut m = FdmMatrix2::new(width, height, FdmMatrixRow2::default());
        for slot in m.as_mut_slice() {
            *slot = FdmMatrixRow2 {
                center: rng.gen_range(1.0..4.0),
                right: rng.gen_range(-1.0..0.0),
                up: rng.gen_range(-1.0..0.0),
            };
        }
        m
    }

    fn random_vector(rng: &mut StdRng, width: usize, height: usize) -> FdmVector2 {
        let mut v = FdmVector2::new(width, height, 0.0);
        for slot in v.as_mut_slice() {
            *slot = rng.gen_range(-1.0..1.0);
        }
        v
    }

    #[test]
    fn stencil_operator_is_symmetric() {
        let mut rng = StdRng::seed_from_u64(7);
        for (width, height) in [(1, 1), (3, 2), (5, 7), (8, 8)] {
            let m = random_stencil(&mut rng, width, height);
            let x = random_vector(&mut rng, width, height);
            let y = random_vector(&mut rng, width, height);
            let mut ax = FdmVector2::default();
            let mut ay = FdmVector2::default();
            FdmBlas2::mvm(&m, &x, &mut ax);
            FdmBlas2::mvm(&m, &y, &mut ay);
            assert_close(FdmBlas2::dot(&ax, &y), FdmBlas2::dot(&x, &ay), 1e-10);
        }
    }

    #[test]
    fn residual_matches_b_minus_ax() {
        let mut rng = StdRng::seed_from_u64(11);
        let m = random_stencil(&mut rng, 6, 4);
        let x = random_vector(&mut rng, 6, 4);
        let b = random_vector(&mut rng, 6, 4);
        let mut ax = FdmVector2::default();
        let mut r = FdmVector2::default();
        FdmBlas2::mvm(&m, &x, &mut ax);
        FdmBlas2::residual(&m, &x, &b, &mut r);
        for j in 0..4 {
            for i in 0..6 {
                assert_close(r.get(i, j), b.get(i, j) - ax.get(i, j), 1e-12);
            }
        }
    }

    #[test]
    fn stencil_mvm_on_known_matrix() {
        let mut m = FdmMatrix2::new(2, 1, FdmMatrixRow2::default());
        m.set(0, 0, FdmMatrixRow2 { center: 2.0, right: -1.0, up: 0.0 });
        m.set(1, 0, FdmMatrixRow2 { center: 3.0, right: 0.0, up: 0.0 });
        let v = FdmVector2::from_fn(2, 1, |i, _| (i + 1) as f64);
        let mut out = FdmVector2::default();
        FdmBlas2::mvm(&m, &v, &mut out);
        assert_close(out.get(0, 0), 0.0, 1e-12);
        assert_close(out.get(1, 0), 5.0, 1e-12);
    }

    #[test]
    fn vector_kernels() {
        let x = FdmVector2::from_fn(2, 2, |i, j| (i + 2 * j) as f64);
        let mut y = FdmVector2::new(2, 2, 1.0);
        FdmBlas2::axpy_in_place(2.0, &x, &mut y);
        assert_close(y.get(1, 1), 7.0, 1e-12);
        FdmBlas2::aypx(0.5, &mut y, &x);
        assert_close(y.get(1, 1), 6.5, 1e-12);
        let mut out = FdmVector2::default();
        FdmBlas2::axpy(-1.0, &x, &y, &mut out);
        assert_close(out.get(1, 1), 3.5, 1e-12);
        assert_close(FdmBlas2::linf_norm(&x), 3.0, 1e-12);
        assert_close(FdmBlas2::l2_norm(&x), 14.0_f64.sqrt(), 1e-12);
        let zeros = FdmBlas2::zeros_like(&x);
        assert_eq!(zeros.size(), (2, 2));
        assert_close(FdmBlas2::l2_norm(&zeros), 0.0, 0.0);
    }

    #[test]
    fn compressed_kernels_follow_csr() {
        let mut m = CsrMatrix::new(3);
        m.add_row(&mut [(0, 2.0), (1, -1.0)]);
        m.add_row(&mut [(0, -1.0), (1, 2.0), (2, -1.0)]);
        m.add_row(&mut [(1, -1.0), (2, 2.0)]);
        let x = vec![1.0, 2.0, 3.0];
        let b = vec![1.0, 1.0, 1.0];
        let mut ax = Vec::new();
        let mut r = Vec::new();
        FdmCompressedBlas2::mvm(&m, &x, &mut ax);
        FdmCompressedBlas2::residual(&m, &x, &b, &mut r);
        assert_eq!(ax, vec![0.0, 0.0, 4.0]);
        assert_eq!(r, vec![1.0, 1.0, -3.0]);
        assert_close(FdmCompressedBlas2::dot(&x, &b), 6.0, 1e-12);
        let mut y = b.clone();
        FdmCompressedBlas2::axpy_in_place(1.0, &x, &mut y);
        assert_eq!(y, vec![2.0, 3.0, 4.0]);
    }

    #[test]
    #[should_panic(expected = "differently sized")]
    fn dot_rejects_mismatched_grids() {
        let a = FdmVector2::new(3, 2, 1.0);
        let b = FdmVector2::new(2, 3, 1.0);
        FdmBlas2::dot(&a, &b);
    }

    #[test]
    #[should_panic(expected = "differently sized")]
    fn compressed_dot_rejects_mismatched_lengths() {
        FdmCompressedBlas2::dot(&vec![1.0, 2.0], &vec![1.0, 2.0, 3.0]);
    }
}
