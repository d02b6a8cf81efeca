/*!
 * Jupyter notebook document model and I/O.
 *
 * - `model`: cells and notebooks with pass-through of uninterpreted fields
 * - `io`: loading, Jupyter-style serialization, atomic writes
 */

pub mod io;
pub mod model;

pub use self::model::{Cell, CellKind, Notebook};
