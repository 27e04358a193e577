//! Forward-difference derivative fallbacks, used when a gradient or
//! constraint Jacobian evaluator is not supplied.

use ndarray::{Array1, Array2, ArrayView1};

/// Forward-difference gradient of a scalar function:
/// `df/dx_i ~ (f(x + h e_i) - f(x)) / h`.
pub fn approx_fprime<F>(x: &[f64], f: F, eps: f64) -> Array1<f64>
where
    F: Fn(ArrayView1<f64>) -> f64,
{
    let n = x.len();
    let mut x_step = x.to_vec();
    let f0 = f(ArrayView1::from(&x_step));
    let mut grad = Array1::zeros(n);
    for i in 0..n {
        x_step[i] = x[i] + eps;
        grad[i] = (f(ArrayView1::from(&x_step)) - f0) / eps;
        x_step[i] = x[i];
    }
    grad
}

/// Forward-difference Jacobian of a vector function with `dim` outputs.
/// Column `j` holds `(g(x + h e_j) - g(x)) / h`.
pub fn approx_jacobian<G>(x: &[f64], g: G, eps: f64, dim: usize) -> Array2<f64>
where
    G: Fn(ArrayView1<f64>) -> Array1<f64>,
{
    let n = x.len();
    let mut x_step = x.to_vec();
    let g0 = g(ArrayView1::from(&x_step));
    let mut jac = Array2::zeros((dim, n));
    for j in 0..n {
        x_step[j] = x[j] + eps;
        let g_plus = g(ArrayView1::from(&x_step));
        for i in 0..dim {
            jac[[i, j]] = (g_plus[i] - g0[i]) / eps;
        }
        x_step[j] = x[j];
    }
    jac
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn gradient_of_a_quadratic_matches_the_analytic_form() {
        let grad = approx_fprime(&[1.0, -2.0], |x| x[0] * x[0] + 3.0 * x[1], 1e-8);
        assert_relative_eq!(grad[0], 2.0, epsilon = 1e-6);
        assert_relative_eq!(grad[1], 3.0, epsilon = 1e-6);
    }

    #[test]
    fn jacobian_of_a_linear_map_recovers_its_matrix() {
        let jac = approx_jacobian(
            &[0.5, 0.5],
            |x| array![2.0 * x[0] + x[1], -x[0]],
            1e-8,
            2,
        );
        assert_relative_eq!(jac[[0, 0]], 2.0, epsilon = 1e-6);
        assert_relative_eq!(jac[[0, 1]], 1.0, epsilon = 1e-6);
        assert_relative_eq!(jac[[1, 0]], -1.0, epsilon = 1e-6);
        assert_relative_eq!(jac[[1, 1]], 0.0, epsilon = 1e-6);
    }
}
