//! # tensorix
//!
//! An n-dimensional tensor engine: a shape/strides/dtype data model, real
//! and complex arithmetic with broadcasting, fancy indexing, reductions,
//! and the element-wise kernel framework that drives all of the above.
//!
//! `tensorix` is the computational core this crate's name borrows from the
//! wider "n-dimensional array with real/complex dtypes" family of numerical
//! libraries; it is deliberately scoped to that core rather than to the
//! scalar-math helpers, PRNGs, or dense linear-algebra factorizations
//! (LU/QR/SVD/eigendecomposition/Cholesky) built on top of it — those are
//! external collaborators that consume `Tensor`'s public contract.
//!
//! ## Data model
//!
//! A [`Tensor`] is one real [`Storage`] buffer, an optional imaginary
//! `Storage`, and a shape vector. Storage is reference-counted and
//! copy-on-write: cloning a tensor is a pointer bump, and a write only
//! deep-copies the underlying buffer if it was shared.
//!
//! ```
//! use tensorix::{DType, Tensor};
//!
//! let a = Tensor::from_flat(&[1.0, 2.0, 3.0], None).unwrap().reshape(&[3, 1]).unwrap();
//! let b = Tensor::from_flat(&[10.0, 20.0], None).unwrap();
//!
//! let product = tensorix::ops::mul(
//!     tensorix::OpInput::Tensor(&a),
//!     tensorix::OpInput::Tensor(&b),
//! ).unwrap();
//!
//! match product {
//!     tensorix::OpOutput::Tensor(t) => {
//!         assert_eq!(t.shape(), &[3, 2]);
//!         assert_eq!(t.dtype(), DType::Float64);
//!     }
//!     tensorix::OpOutput::Scalar(_) => unreachable!(),
//! }
//! ```
//!
//! ## Fancy indexing
//!
//! [`Indexer`] reads and writes sub-tensors through integers, integer
//! arrays, Python-style slice strings (`"start:stop:step"`), boolean masks,
//! and predicates:
//!
//! ```
//! use tensorix::index::indexer::{IndexArg, Indexer, SetValue};
//! use tensorix::tensor::ElementValue;
//! use tensorix::Tensor;
//!
//! let mut x = Tensor::from_flat(&[10.0, 20.0, 30.0, 40.0, 50.0], None).unwrap();
//! Indexer::set(
//!     &mut x,
//!     &[IndexArg::Slice("::-2")],
//!     SetValue::Scalar(ElementValue::Real(0.0)),
//! )
//! .unwrap();
//! assert_eq!(x.real_data(), vec![0.0, 20.0, 0.0, 40.0, 0.0]);
//! ```
//!
//! ## Crate layout
//!
//! - [`dtype`] — the closed `Logic`/`Int32`/`Float64` dtype set and the
//!   dtype-policy functions operations use to resolve or reject output
//!   dtypes.
//! - [`complex`] — `ComplexScalar`: arithmetic, Smith division, and the
//!   closed-form transcendentals (`sqrt`, `exp`, `log`, trig, inverse trig
//!   and hyperbolic forms).
//! - [`storage`] — `Storage`: the refcounted, copy-on-write numeric buffer.
//! - [`tensor`] — `Tensor`: shape/strides/offset, factories, reshape
//!   family, data access, equality checks, and the broadcast planner.
//! - [`input`] — `InputInfo`/`OpInput`: normalizes any operand (number,
//!   complex scalar, nested array, flat buffer, tensor) into one uniform
//!   view.
//! - [`index`] — `IndexIterator` and [`index::indexer`]'s `Indexer`: the
//!   fancy-indexing subsystem.
//! - [`kernel`] — the unary/binary/reduction loop-assembly framework,
//!   in-place evaluation rules, and dtype-policy hookup.
//! - [`ops`] — the ready-made operator library (arithmetic, comparisons,
//!   unary transcendentals, reductions) built on the kernel factory.
//! - [`error`] — `TensorError` and its error-kind taxonomy.

pub mod complex;
pub mod dtype;
pub mod error;
pub mod index;
pub mod input;
pub mod kernel;
pub mod ops;
pub mod storage;
pub mod tensor;

pub use complex::ComplexScalar;
pub use dtype::DType;
pub use error::{Result, TensorError};
pub use index::indexer::Indexer;
pub use input::{InputInfo, OpInput};
pub use kernel::{OpOutput, ReductionOutput};
pub use storage::Storage;
pub use tensor::{concat, ElementValue, NestedValue, Tensor};
