//! Raw bindings to Ipopt's standard C interface (`IpoptStdCInterface.h`).
//!
//! Only the subset needed to create a problem, register options, attach the
//! intermediate callback and run `IpoptSolve` is declared here. The safe
//! wrapper lives in [`super::nlp`].

#![allow(non_camel_case_types)]
#![allow(non_snake_case)]

use libc::{c_char, c_int, c_void};

pub type Index = c_int;
pub type Number = f64;
/// Ipopt's C interface uses `int` as its boolean type.
pub type Bool = c_int;

pub const TRUE: Bool = 1;
pub const FALSE: Bool = 0;

/// Opaque handle to an Ipopt problem instance.
pub type IpoptProblem = *mut c_void;

pub type Eval_F_CB = extern "C" fn(
    n: Index,
    x: *mut Number,
    new_x: Bool,
    obj_value: *mut Number,
    user_data: *mut c_void,
) -> Bool;

pub type Eval_Grad_F_CB = extern "C" fn(
    n: Index,
    x: *mut Number,
    new_x: Bool,
    grad_f: *mut Number,
    user_data: *mut c_void,
) -> Bool;

pub type Eval_G_CB = extern "C" fn(
    n: Index,
    x: *mut Number,
    new_x: Bool,
    m: Index,
    g: *mut Number,
    user_data: *mut c_void,
) -> Bool;

pub type Eval_Jac_G_CB = extern "C" fn(
    n: Index,
    x: *mut Number,
    new_x: Bool,
    m: Index,
    nele_jac: Index,
    iRow: *mut Index,
    jCol: *mut Index,
    values: *mut Number,
    user_data: *mut c_void,
) -> Bool;

pub type Eval_H_CB = extern "C" fn(
    n: Index,
    x: *mut Number,
    new_x: Bool,
    obj_factor: Number,
    m: Index,
    lambda: *mut Number,
    new_lambda: Bool,
    nele_hess: Index,
    iRow: *mut Index,
    jCol: *mut Index,
    values: *mut Number,
    user_data: *mut c_void,
) -> Bool;

pub type Intermediate_CB = extern "C" fn(
    alg_mod: Index,
    iter_count: Index,
    obj_value: Number,
    inf_pr: Number,
    inf_du: Number,
    mu: Number,
    d_norm: Number,
    regularization_size: Number,
    alpha_du: Number,
    alpha_pr: Number,
    ls_trials: Index,
    user_data: *mut c_void,
) -> Bool;

/// Zero-based (row, col) indexing for the Jacobian/Hessian structure arrays.
pub const C_STYLE: Index = 0;

#[link(name = "ipopt")]
extern "C" {
    pub fn CreateIpoptProblem(
        n: Index,
        x_L: *mut Number,
        x_U: *mut Number,
        m: Index,
        g_L: *mut Number,
        g_U: *mut Number,
        nele_jac: Index,
        nele_hess: Index,
        index_style: Index,
        eval_f: Eval_F_CB,
        eval_g: Eval_G_CB,
        eval_grad_f: Eval_Grad_F_CB,
        eval_jac_g: Eval_Jac_G_CB,
        eval_h: Eval_H_CB,
    ) -> IpoptProblem;

    pub fn FreeIpoptProblem(ipopt_problem: IpoptProblem);

    pub fn AddIpoptStrOption(
        ipopt_problem: IpoptProblem,
        keyword: *const c_char,
        val: *const c_char,
    ) -> Bool;

    pub fn AddIpoptNumOption(
        ipopt_problem: IpoptProblem,
        keyword: *const c_char,
        val: Number,
    ) -> Bool;

    pub fn AddIpoptIntOption(
        ipopt_problem: IpoptProblem,
        keyword: *const c_char,
        val: c_int,
    ) -> Bool;

    pub fn SetIntermediateCallback(
        ipopt_problem: IpoptProblem,
        intermediate_cb: Intermediate_CB,
    ) -> Bool;

    pub fn IpoptSolve(
        ipopt_problem: IpoptProblem,
        x: *mut Number,
        g: *mut Number,
        obj_val: *mut Number,
        mult_g: *mut Number,
        mult_x_L: *mut Number,
        mult_x_U: *mut Number,
        user_data: *mut c_void,
    ) -> c_int;
}
