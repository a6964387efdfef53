//! A reference interpreter and optimizer for a small three-address-code
//! intermediate language: JSON-in/JSON-out IR, CFG construction, classical
//! dataflow analyses, and two optimization passes.

pub mod analysis;
pub mod cfg;
pub mod cli;
pub mod dom;
pub mod error;
pub mod heap;
pub mod interp;
pub mod ir;
pub mod opt;
