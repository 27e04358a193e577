//! `extern "C"` trampolines handed to Ipopt.
//!
//! Each one recovers the [`ProblemAdapter`] from `user_data`, runs the safe
//! Rust logic inside `catch_unwind`, and signals failure to Ipopt by
//! returning FALSE. A panic must never unwind across the C boundary.

use crate::adapter::ProblemAdapter;
use crate::ipopt::ffi::{Bool, Index, Number, FALSE, TRUE};
use libc::c_void;
use std::panic::{catch_unwind, UnwindSafe};
use std::slice;

fn guarded<F>(name: &str, closure: F) -> Bool
where
    F: FnOnce() -> Result<(), String> + UnwindSafe,
{
    match catch_unwind(closure) {
        Ok(Ok(())) => TRUE,
        Ok(Err(msg)) => {
            eprintln!("minimize-ipopt: {name} evaluation failed: {msg}");
            FALSE
        }
        Err(_) => {
            eprintln!("minimize-ipopt: panic inside {name} callback");
            FALSE
        }
    }
}

unsafe fn adapter_mut<'a>(user_data: *mut c_void) -> &'a mut ProblemAdapter {
    &mut *(user_data as *mut ProblemAdapter)
}

pub(crate) extern "C" fn eval_f(
    n: Index,
    x: *mut Number,
    _new_x: Bool,
    obj_value: *mut Number,
    user_data: *mut c_void,
) -> Bool {
    guarded("objective", || {
        let adapter = unsafe { adapter_mut(user_data) };
        let x = unsafe { slice::from_raw_parts(x, n as usize) };
        unsafe { *obj_value = adapter.objective(x) };
        Ok(())
    })
}

pub(crate) extern "C" fn eval_grad_f(
    n: Index,
    x: *mut Number,
    _new_x: Bool,
    grad_f: *mut Number,
    user_data: *mut c_void,
) -> Bool {
    guarded("gradient", || {
        let adapter = unsafe { adapter_mut(user_data) };
        let x = unsafe { slice::from_raw_parts(x, n as usize) };
        let out = unsafe { slice::from_raw_parts_mut(grad_f, n as usize) };
        let grad = adapter.gradient(x);
        if grad.len() != out.len() {
            return Err(format!(
                "gradient has length {}, expected {}",
                grad.len(),
                out.len()
            ));
        }
        for (dst, src) in out.iter_mut().zip(grad.iter()) {
            *dst = *src;
        }
        Ok(())
    })
}

pub(crate) extern "C" fn eval_g(
    n: Index,
    x: *mut Number,
    _new_x: Bool,
    m: Index,
    g: *mut Number,
    user_data: *mut c_void,
) -> Bool {
    guarded("constraints", || {
        let adapter = unsafe { adapter_mut(user_data) };
        let x = unsafe { slice::from_raw_parts(x, n as usize) };
        let out = unsafe { slice::from_raw_parts_mut(g, m as usize) };
        let stacked = adapter.constraints(x);
        if stacked.len() != out.len() {
            return Err(format!(
                "stacked constraint vector has length {}, expected {}",
                stacked.len(),
                out.len()
            ));
        }
        for (dst, src) in out.iter_mut().zip(stacked.iter()) {
            *dst = *src;
        }
        Ok(())
    })
}

#[allow(non_snake_case)]
pub(crate) extern "C" fn eval_jac_g(
    n: Index,
    x: *mut Number,
    _new_x: Bool,
    _m: Index,
    nele_jac: Index,
    iRow: *mut Index,
    jCol: *mut Index,
    values: *mut Number,
    user_data: *mut c_void,
) -> Bool {
    // Ipopt asks for the sparsity structure by passing a null `values`.
    if values.is_null() {
        return guarded("jacobian structure", || {
            let adapter = unsafe { adapter_mut(user_data) };
            let rows_out = unsafe { slice::from_raw_parts_mut(iRow, nele_jac as usize) };
            let cols_out = unsafe { slice::from_raw_parts_mut(jCol, nele_jac as usize) };
            let (rows, cols) = adapter.jacobian_structure();
            if rows.len() != rows_out.len() {
                return Err(format!(
                    "structure has {} nonzeros, ipopt expected {}",
                    rows.len(),
                    rows_out.len()
                ));
            }
            for (dst, src) in rows_out.iter_mut().zip(rows) {
                *dst = *src as Index;
            }
            for (dst, src) in cols_out.iter_mut().zip(cols) {
                *dst = *src as Index;
            }
            Ok(())
        });
    }

    guarded("jacobian", || {
        let adapter = unsafe { adapter_mut(user_data) };
        let x = unsafe { slice::from_raw_parts(x, n as usize) };
        let out = unsafe { slice::from_raw_parts_mut(values, nele_jac as usize) };
        let vals = adapter.jacobian(x)?;
        if vals.len() != out.len() {
            return Err(format!(
                "jacobian produced {} values, structure has {}",
                vals.len(),
                out.len()
            ));
        }
        out.copy_from_slice(&vals);
        Ok(())
    })
}

#[allow(non_snake_case)]
pub(crate) extern "C" fn eval_h(
    n: Index,
    x: *mut Number,
    _new_x: Bool,
    obj_factor: Number,
    m: Index,
    lambda: *mut Number,
    _new_lambda: Bool,
    nele_hess: Index,
    iRow: *mut Index,
    jCol: *mut Index,
    values: *mut Number,
    user_data: *mut c_void,
) -> Bool {
    // With the limited-memory approximation the Hessian has zero declared
    // nonzeros and Ipopt never asks for values; the callback still has to
    // exist and succeed.
    if nele_hess == 0 {
        return TRUE;
    }

    if values.is_null() {
        // Dense lower triangle, row-major with col <= row.
        return guarded("hessian structure", || {
            let rows_out = unsafe { slice::from_raw_parts_mut(iRow, nele_hess as usize) };
            let cols_out = unsafe { slice::from_raw_parts_mut(jCol, nele_hess as usize) };
            let mut idx = 0;
            for r in 0..n {
                for c in 0..=r {
                    rows_out[idx] = r;
                    cols_out[idx] = c;
                    idx += 1;
                }
            }
            if idx != nele_hess as usize {
                return Err(format!(
                    "hessian structure has {idx} entries, ipopt expected {nele_hess}"
                ));
            }
            Ok(())
        });
    }

    guarded("hessian", || {
        let adapter = unsafe { adapter_mut(user_data) };
        let x = unsafe { slice::from_raw_parts(x, n as usize) };
        let multipliers = unsafe { slice::from_raw_parts(lambda, m as usize) };
        let out = unsafe { slice::from_raw_parts_mut(values, nele_hess as usize) };
        let vals = adapter.hessian(x, multipliers, obj_factor)?;
        if vals.len() != out.len() {
            return Err(format!(
                "hessian produced {} values, expected {}",
                vals.len(),
                out.len()
            ));
        }
        out.copy_from_slice(&vals);
        Ok(())
    })
}

/// Passive per-iteration hook: records the latest iteration count and
/// nothing else. Returning TRUE tells Ipopt to keep going.
pub(crate) extern "C" fn intermediate(
    _alg_mod: Index,
    iter_count: Index,
    _obj_value: Number,
    _inf_pr: Number,
    _inf_du: Number,
    _mu: Number,
    _d_norm: Number,
    _regularization_size: Number,
    _alpha_du: Number,
    _alpha_pr: Number,
    _ls_trials: Index,
    user_data: *mut c_void,
) -> Bool {
    let adapter = unsafe { adapter_mut(user_data) };
    adapter.record_iteration(iter_count);
    TRUE
}
