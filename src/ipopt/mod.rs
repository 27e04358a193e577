//! Binding to the external Ipopt solver: raw FFI, panic-safe callback
//! trampolines, and an owning handle wrapper.

pub(crate) mod callbacks;
pub(crate) mod ffi;
pub(crate) mod nlp;
