//! `piranha` multiplies sparse multivariate truncated power series in parallel.
//!
//! A series is an unordered set of `(coefficient, monomial)` terms over a fixed
//! [`symbol::SymbolSet`]; [`multiply`] estimates the shape of the product before doing any real
//! work, picks a lock-free partitioning strategy accordingly, and runs it on a scoped worker
//! pool. See [`config::Config`] for the knobs, [`coefficient::Coefficient`] and
//! [`monomial::Monomial`] for the capability traits a custom ring or exponent representation
//! needs to implement, and [`multiplier`] for the engine itself.
//!
//! ```
//! use std::sync::Arc;
//! use num::BigInt;
//! use piranha::config::Config;
//! use piranha::monomial::ExponentVec;
//! use piranha::series::Series;
//! use piranha::symbol::SymbolSet;
//! use piranha::term::Term;
//!
//! let symbols = Arc::new(SymbolSet::new(["x"]));
//! let a = Series::from_terms(
//!     symbols.clone(),
//!     vec![Term::new(BigInt::from(1), ExponentVec::new(vec![0])),
//!          Term::new(BigInt::from(2), ExponentVec::new(vec![1]))],
//! ).unwrap();
//! let b = Series::from_terms(
//!     symbols,
//!     vec![Term::new(BigInt::from(3), ExponentVec::new(vec![0])),
//!          Term::new(BigInt::from(4), ExponentVec::new(vec![1]))],
//! ).unwrap();
//!
//! let product = piranha::multiply(&a, &b, &Config::default()).unwrap();
//! assert_eq!(product.len(), 3);
//! ```

pub mod coefficient;
pub mod config;
pub mod error;
pub mod monomial;
pub mod multiplier;
pub mod series;
pub mod symbol;
pub mod term;
pub mod threadpool;

pub use crate::error::{Error, Result};
pub use crate::multiplier::{multiply, multiply_cancellable};
