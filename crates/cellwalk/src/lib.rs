//! # Cellwalk
//!
//! A step evaluator for homoiconic cell arrays.
//!
//! Source is loaded into arrays of [`Cell`]s and evaluated one expression
//! at a time. Words that look up to actions are invoked, and an action
//! flagged as *enfix* takes the value on its left as its first argument.
//! Enfix dispatch is steered entirely by attributes on the action, so
//! `1 + 2 * 3` is `9` and `if false [2] else [3]` is `3` without any
//! precedence table.
//!
//! ## Architecture
//!
//! - **Loader**: text to cells ([`load`])
//! - **Step evaluator**: one expression per step, with enfix lookahead
//!   ([`Evaluator::run_one_step`])
//! - **Invocation**: argument fulfillment, refinement pickups, type
//!   checking, dispatch and redo ([`Evaluator::invoke_action`])
//! - **Natives**: the built-in actions defined in `lib`
//!
//! ```
//! use cellwalk::{Cell, Evaluator};
//!
//! let mut evaluator = Evaluator::new().unwrap();
//! let result = evaluator.eval_str("1 + 2 * 3").unwrap();
//! assert_eq!(result, Cell::integer(9));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod action;
pub mod call;
pub mod context;
pub mod data_stack;
pub mod environment;
pub mod error;
pub mod eval;
pub mod feed;
pub mod frame;
pub mod loader;
pub mod natives;
pub mod value;

// Re-export main types
pub use action::{dispatcher, parse_spec, Action, ActionFlags, Bounce, Param, ParamClass};
pub use call::Call;
pub use context::EvalContext;
pub use data_stack::{DataStack, StackMark};
pub use environment::{Binding, Context};
pub use error::{EvalError, Throw, ThrowLabel};
pub use eval::{Evaluator, FulfillHook};
pub use feed::{Feed, FeedFlags};
pub use frame::{Frame, FrameFlags, FrameId};
pub use loader::{load, LoadError};
pub use value::{ActionValue, Cell, CellFlags, Kind, Series, Symbol, TypeSet, Value};

/// Cellwalk version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
