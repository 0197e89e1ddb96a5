//! Error types for evaluation
//!
//! Errors and non-local control share one channel: a [`Throw`] travels as
//! [`EvalError::Thrown`] and is only turned back into a value by the frame
//! (or `catch`) whose label it matches. Everything else passes it along
//! untouched.

use std::fmt;
use std::rc::Rc;

use thiserror::Error;

use crate::action::Action;
use crate::frame::FrameId;
use crate::loader::LoadError;
use crate::value::{Cell, Symbol};

/// The label a throw is tagged with.
#[derive(Debug, Clone)]
pub enum ThrowLabel {
    /// A user-level throw (`throw`, `throw/name`); blank when unnamed
    User(Cell),
    /// Unwind to the action frame with this id, making the payload its
    /// result (definitional RETURN)
    Unwind(FrameId),
    /// Re-run the action frame with this id, optionally with a different
    /// (parameter-compatible) phase
    Redo {
        /// Target frame
        frame: FrameId,
        /// Replacement phase; `None` keeps the current one
        phase: Option<Rc<Action>>,
        /// Whether the type check pass runs again
        checked: bool,
    },
}

/// A labeled non-local transfer of control.
#[derive(Debug, Clone)]
pub struct Throw {
    /// Who should catch it
    pub label: ThrowLabel,
    /// What it carries
    pub payload: Cell,
}

impl Throw {
    /// A user throw with an optional name.
    pub fn user(name: Option<Cell>, payload: Cell) -> Self {
        Self {
            label: ThrowLabel::User(name.unwrap_or_else(Cell::blank)),
            payload,
        }
    }

    /// An unwind to `frame` delivering `payload`.
    pub fn unwind(frame: FrameId, payload: Cell) -> Self {
        Self {
            label: ThrowLabel::Unwind(frame),
            payload,
        }
    }

    /// A redo of `frame`.
    pub fn redo(frame: FrameId, phase: Option<Rc<Action>>, checked: bool) -> Self {
        Self {
            label: ThrowLabel::Redo {
                frame,
                phase,
                checked,
            },
            payload: Cell::void(),
        }
    }
}

impl fmt::Display for Throw {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.label {
            ThrowLabel::User(name) if name.is_truthy() => {
                write!(f, "{} (named {})", self.payload, name)
            }
            ThrowLabel::User(_) => write!(f, "{}", self.payload),
            ThrowLabel::Unwind(frame) => write!(f, "unwind to {:?}", frame),
            ThrowLabel::Redo { frame, .. } => write!(f, "redo of {:?}", frame),
        }
    }
}

/// Errors that can occur during evaluation.
#[derive(Error, Debug)]
pub enum EvalError {
    // ═══════════════════════════════════════════════════════════════════
    // Lookup
    // ═══════════════════════════════════════════════════════════════════
    /// Word not bound anywhere on the scope chain
    #[error("{name} is not bound")]
    UnboundWord {
        /// The word
        name: Symbol,
    },

    /// Word bound to a void (unset) variable
    #[error("{name} has no value")]
    NoValue {
        /// The word
        name: Symbol,
    },

    /// Assignment with nothing to assign
    #[error("{target} needs a value")]
    NeedValue {
        /// The assignment form, as written
        target: String,
    },

    /// Path could not be resolved or assigned
    #[error("bad path: {message}")]
    BadPath {
        /// What went wrong
        message: String,
    },

    // ═══════════════════════════════════════════════════════════════════
    // Fulfillment
    // ═══════════════════════════════════════════════════════════════════
    /// Required argument missing at end of input
    #[error("{action} is missing its {param} argument")]
    MissingArgument {
        /// Action label
        action: String,
        /// Parameter name
        param: Symbol,
    },

    /// A deferred enfix operator would split an argument of an action
    /// that forbids it
    #[error("ambiguous enfix: {operator} would be deferred past an argument of {action}")]
    AmbiguousInfix {
        /// The enfix operator
        operator: Symbol,
        /// The action whose argument was being gathered
        action: String,
    },

    /// A refinement named at the call site that the action does not have
    #[error("{action} has no refinement /{refinement}")]
    BadRefinement {
        /// Action label
        action: String,
        /// The refinement as written
        refinement: Symbol,
    },

    /// The same refinement named twice in one call
    #[error("/{refinement} used more than once with {action}")]
    DuplicateRefinement {
        /// Action label
        action: String,
        /// The refinement
        refinement: Symbol,
    },

    /// An argument supplied for a refinement that is not in use
    #[error("{action} was given {param} but its refinement is not in use")]
    UnusedRefinementArg {
        /// Action label
        action: String,
        /// The gated parameter
        param: Symbol,
    },

    /// Apply template names a parameter the action does not have
    #[error("{action} has no parameter named {name}")]
    NoSuchParameter {
        /// Action label
        action: String,
        /// The name given
        name: Symbol,
    },

    /// A left-quoting action received an evaluated value
    #[error("{action} quotes its left argument, but it was produced by evaluation")]
    EvaluativeQuote {
        /// Action label
        action: String,
    },

    // ═══════════════════════════════════════════════════════════════════
    // Types
    // ═══════════════════════════════════════════════════════════════════
    /// Argument fails its declared constraint
    #[error("{action} does not allow {kind} for its {param} argument")]
    ArgumentType {
        /// Action label
        action: String,
        /// Parameter name
        param: Symbol,
        /// Offending value's type
        kind: &'static str,
    },

    /// Result fails the declared return constraint
    #[error("{action} cannot return {kind}")]
    ReturnType {
        /// Action label
        action: String,
        /// Offending value's type
        kind: &'static str,
    },

    /// Generic type error raised by a native
    #[error("type error: {message}")]
    TypeError {
        /// What went wrong
        message: String,
    },

    /// Malformed spec block
    #[error("bad spec: {message}")]
    BadSpec {
        /// What went wrong
        message: String,
    },

    // ═══════════════════════════════════════════════════════════════════
    // Arithmetic
    // ═══════════════════════════════════════════════════════════════════
    /// Division by zero
    #[error("division by zero")]
    DivisionByZero,

    /// Integer overflow
    #[error("integer overflow in {op}")]
    IntegerOverflow {
        /// The operation
        op: &'static str,
    },

    // ═══════════════════════════════════════════════════════════════════
    // Limits and control
    // ═══════════════════════════════════════════════════════════════════
    /// Too many nested action invocations
    #[error("stack overflow: call depth {depth} exceeds maximum {max}")]
    StackOverflow {
        /// Depth reached
        depth: usize,
        /// Configured limit
        max: usize,
    },

    /// Host requested interruption
    #[error("evaluation interrupted")]
    Interrupted,

    /// Dispatcher or redo misuse; a defect in native or host code
    #[error("protocol violation: {message}")]
    Protocol {
        /// What went wrong
        message: String,
    },

    /// A throw that no frame has caught (yet)
    #[error("no catch for throw: {0}")]
    Thrown(Throw),

    /// Source text could not be loaded
    #[error(transparent)]
    Load(#[from] LoadError),
}

impl EvalError {
    /// Whether this is a non-local control transfer rather than a failure.
    pub fn is_throw(&self) -> bool {
        matches!(self, EvalError::Thrown(_))
    }

    /// Build a protocol violation.
    pub fn protocol(message: impl Into<String>) -> Self {
        EvalError::Protocol {
            message: message.into(),
        }
    }

    /// Build a native type error.
    pub fn type_error(message: impl Into<String>) -> Self {
        EvalError::TypeError {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_parameter_and_action() {
        let err = EvalError::ArgumentType {
            action: "add".into(),
            param: "value1".into(),
            kind: "text!",
        };
        assert_eq!(
            err.to_string(),
            "add does not allow text! for its value1 argument"
        );
    }

    #[test]
    fn test_unnamed_user_throw_has_blank_label() {
        let t = Throw::user(None, Cell::integer(1));
        assert!(matches!(&t.label, ThrowLabel::User(name) if !name.is_truthy()));
        assert!(EvalError::Thrown(t).is_throw());
    }
}
