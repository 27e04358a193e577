//! Safe owning wrapper around the Ipopt problem handle.

use std::ffi::CString;

use libc::c_void;

use crate::adapter::ProblemAdapter;
use crate::error::{Error, Result};
use crate::ipopt::{callbacks, ffi};
use crate::options::OptionValue;

/// Everything `IpoptSolve` writes back: final point, constraint values,
/// objective, and the three multiplier vectors.
pub(crate) struct RawSolution {
    pub status: i32,
    pub x: Vec<f64>,
    pub g: Vec<f64>,
    pub obj_val: f64,
    pub mult_g: Vec<f64>,
    pub mult_x_l: Vec<f64>,
    pub mult_x_u: Vec<f64>,
}

/// An Ipopt problem instance. The handle is freed on drop.
pub(crate) struct Nlp {
    raw: ffi::IpoptProblem,
    n: usize,
    m: usize,
}

impl Nlp {
    /// Create the solver-side problem from the adapter's discovered sizes and
    /// the translated bound arrays. Ipopt copies the bound arrays internally.
    pub fn new(
        adapter: &ProblemAdapter,
        mut x_l: Vec<f64>,
        mut x_u: Vec<f64>,
        mut g_l: Vec<f64>,
        mut g_u: Vec<f64>,
    ) -> Result<Self> {
        let n = adapter.n();
        let m = adapter.m();
        let raw = unsafe {
            ffi::CreateIpoptProblem(
                n as ffi::Index,
                x_l.as_mut_ptr(),
                x_u.as_mut_ptr(),
                m as ffi::Index,
                g_l.as_mut_ptr(),
                g_u.as_mut_ptr(),
                adapter.structure().nnz() as ffi::Index,
                adapter.hessian_nnz() as ffi::Index,
                ffi::C_STYLE,
                callbacks::eval_f,
                callbacks::eval_g,
                callbacks::eval_grad_f,
                callbacks::eval_jac_g,
                callbacks::eval_h,
            )
        };
        if raw.is_null() {
            return Err(Error::SolverCreation);
        }
        unsafe {
            ffi::SetIntermediateCallback(raw, callbacks::intermediate);
        }
        Ok(Nlp { raw, n, m })
    }

    /// Register one option with Ipopt, dispatching on the value type.
    pub fn add_option(&mut self, name: &str, value: &OptionValue) -> Result<()> {
        let rejected = || Error::OptionRejected {
            name: name.to_string(),
            value: value.to_string(),
        };
        let key = CString::new(name).map_err(|_| rejected())?;
        let accepted = match value {
            OptionValue::Int(v) => unsafe {
                ffi::AddIpoptIntOption(self.raw, key.as_ptr(), *v)
            },
            OptionValue::Num(v) => unsafe {
                ffi::AddIpoptNumOption(self.raw, key.as_ptr(), *v)
            },
            OptionValue::Str(s) => {
                let val = CString::new(s.as_str()).map_err(|_| rejected())?;
                unsafe { ffi::AddIpoptStrOption(self.raw, key.as_ptr(), val.as_ptr()) }
            }
        };
        if accepted == ffi::TRUE {
            Ok(())
        } else {
            Err(rejected())
        }
    }

    /// Run the solve. Blocks until Ipopt returns control; the adapter's
    /// callbacks are driven from this thread only.
    pub fn solve(&mut self, adapter: &mut ProblemAdapter, x0: &[f64]) -> RawSolution {
        let mut x = x0.to_vec();
        let mut g = vec![0.0; self.m];
        let mut mult_g = vec![0.0; self.m];
        let mut mult_x_l = vec![0.0; self.n];
        let mut mult_x_u = vec![0.0; self.n];
        let mut obj_val = 0.0;
        let status = unsafe {
            ffi::IpoptSolve(
                self.raw,
                x.as_mut_ptr(),
                g.as_mut_ptr(),
                &mut obj_val,
                mult_g.as_mut_ptr(),
                mult_x_l.as_mut_ptr(),
                mult_x_u.as_mut_ptr(),
                adapter as *mut ProblemAdapter as *mut c_void,
            )
        };
        RawSolution {
            status,
            x,
            g,
            obj_val,
            mult_g,
            mult_x_l,
            mult_x_u,
        }
    }
}

impl Drop for Nlp {
    fn drop(&mut self) {
        unsafe { ffi::FreeIpoptProblem(self.raw) };
    }
}
