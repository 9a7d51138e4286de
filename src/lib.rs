//! `hict-core`: the in-memory assembly layer over a multi-resolution Hi-C
//! contact matrix. It tracks the current scaffolding order of an assembly's
//! contigs, translates that order into reads against an immutable, on-disk
//! block matrix, and exposes the edits (reverse, move, (un)group into a
//! scaffold, split a contig) a human curator drives during manual assembly
//! correction.
//!
//! ## Usage
//!
//! ```no_run
//! use hict_core::facade::HictAssembly;
//! use hict_core::units::QueryUnit;
//!
//! # fn open_store() -> Box<dyn hict_core::block_store::BlockStore> { unimplemented!() }
//! let assembly = HictAssembly::new();
//! assembly.open(open_store()).unwrap();
//! let size = assembly.get_matrix_size_bins(1000).unwrap();
//! let (matrix, row_weights, col_weights) = assembly
//!     .get_dense_submatrix(1000, 0, 0, size, size, QueryUnit::Bins, false)
//!     .unwrap();
//! ```
//!
//! ## Implementation
//!
//! The contig tree and the scaffold tree ([`contig_tree`], [`scaffold_tree`])
//! are both built on one generic implicit-key treap ([`treap`]), the contig
//! tree keyed by count/bp/bins/pixels and the scaffold tree keyed by bp span.
//! Reading a range of the assembly goes through the ATU resolver
//! ([`atu_resolver`]) and the submatrix assembler ([`assembler`]), which pull
//! blocks from a [`block_store::BlockStore`] — an external, read-only
//! collaborator this crate only specifies the interface of. [`facade`] ties
//! all of it together behind the `open`/`close` lifecycle and the operations
//! a caller actually drives.
//!
//! ## Testing
//!
//! Run the unit tests with `cargo test`. `benches/contig_tree.rs` carries a
//! `criterion` benchmark of the contig tree's core operations under
//! `cargo bench`.

pub mod agp;
pub mod assembler;
pub mod atu_resolver;
pub mod block_store;
pub mod contig;
pub mod contig_tree;
pub mod error;
pub mod facade;
pub mod matrix;
pub mod scaffold;
pub mod scaffold_tree;
pub mod stripe;
pub mod treap;
pub mod units;

pub use error::{HictError, Result};
pub use facade::HictAssembly;
