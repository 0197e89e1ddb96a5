//! Path resolution: `obj/field`, `block/2`, `action/refinement/...`

use super::{plain, Evaluator};
use crate::environment::Context;
use crate::error::EvalError;
use crate::feed::Feed;
use crate::frame::Frame;
use crate::value::{ActionValue, Cell, Series, Symbol, Value};

/// What a path designates.
pub(crate) enum PathTarget {
    /// A plain value
    Value(Cell),
    /// An action, plus the refinements named after it
    Action {
        action: ActionValue,
        label: Option<Symbol>,
        refinements: Vec<Symbol>,
    },
}

fn bad_path(message: impl Into<String>) -> EvalError {
    EvalError::BadPath {
        message: message.into(),
    }
}

impl Evaluator {
    /// Resolve a path's elements left to right. Once an action is reached,
    /// every remaining element must be a word naming a refinement.
    pub(crate) fn resolve_path(&mut self, cells: &[Cell], scope: &Context) -> Result<PathTarget, EvalError> {
        let Some(head) = cells.first() else {
            return Err(bad_path("empty path"));
        };
        let mut current = match head.value() {
            Value::Word(symbol) => self.lookup_value(symbol, scope)?,
            Value::Group(series) => self.eval_group(series, scope)?.unwrap_or_else(Cell::null),
            _ => return Err(bad_path(format!("path cannot start with {}", head.kind().name()))),
        };
        let label = head.as_symbol().cloned();

        for (position, element) in cells.iter().enumerate().skip(1) {
            if let Some(action) = current.as_action() {
                let refinements = cells[position..]
                    .iter()
                    .map(|cell| match cell.value() {
                        Value::Word(symbol) => Ok(symbol.clone()),
                        _ => Err(bad_path(format!("{} is not a refinement name", cell))),
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                return Ok(PathTarget::Action {
                    action: action.clone(),
                    label,
                    refinements,
                });
            }
            let picker = self.path_picker(element, scope)?;
            current = pick(&current, &picker)?;
        }

        match current.as_action() {
            Some(action) => Ok(PathTarget::Action {
                action: action.clone(),
                label,
                refinements: Vec::new(),
            }),
            None => Ok(PathTarget::Value(current)),
        }
    }

    fn path_picker(&mut self, element: &Cell, scope: &Context) -> Result<Cell, EvalError> {
        match element.value() {
            Value::Group(series) => Ok(self.eval_group(series, scope)?.unwrap_or_else(Cell::null)),
            _ => Ok(element.clone()),
        }
    }

    /// Evaluate a path in a step: fetch a value, or invoke an action with
    /// the refinements the path names.
    pub(crate) fn eval_path(
        &mut self,
        frame: &mut Frame,
        feed: &mut Feed,
        series: &Series,
        scope: &Context,
    ) -> Result<(), EvalError> {
        match self.resolve_path(series.cells(), scope)? {
            PathTarget::Value(cell) => {
                frame.out = plain(cell);
                Ok(())
            }
            PathTarget::Action {
                action,
                label,
                refinements,
            } => {
                let base = self.stack.mark();
                for refinement in refinements {
                    if self.stack.find_refinement(base, &refinement).is_some() {
                        self.stack.unwind_to(base);
                        return Err(EvalError::DuplicateRefinement {
                            action: label.map_or_else(|| "anonymous action".to_string(), |l| l.to_string()),
                            refinement,
                        });
                    }
                    self.stack.push_refinement(refinement);
                }
                self.run_action(frame, feed, &action, label, false, base)
            }
        }
    }

    /// The value a get-path designates, without invoking anything.
    pub(crate) fn get_path(&mut self, series: &Series, scope: &Context) -> Result<Cell, EvalError> {
        match self.resolve_path(series.cells(), scope)? {
            PathTarget::Value(cell) => Ok(cell),
            PathTarget::Action {
                action,
                refinements,
                ..
            } => {
                if refinements.is_empty() {
                    Ok(Cell::new(Value::Action(action)))
                } else {
                    Err(bad_path(format!("cannot get {} with refinements", Cell::new(Value::GetPath(series.clone())))))
                }
            }
        }
    }

    /// Store `value` at the location a set-path designates. Only object
    /// fields can be assigned; arrays are immutable.
    pub(crate) fn set_path(&mut self, series: &Series, scope: &Context, value: Cell) -> Result<(), EvalError> {
        let cells = series.cells();
        let Some((last, prefix)) = cells.split_last() else {
            return Err(bad_path("empty path"));
        };
        if prefix.is_empty() {
            return Err(bad_path("set-path needs at least two elements"));
        }
        let container = match self.resolve_path(prefix, scope)? {
            PathTarget::Value(cell) => cell,
            PathTarget::Action { .. } => return Err(bad_path("cannot assign into an action")),
        };
        let picker = self.path_picker(last, scope)?;
        match (container.value(), picker.value()) {
            (Value::Object(ctx), Value::Word(field)) => {
                match ctx.index_of(field) {
                    Some(index) => {
                        ctx.set_index(index, value);
                    }
                    None => {
                        ctx.define(field.clone(), value);
                    }
                }
                Ok(())
            }
            _ => Err(bad_path(format!(
                "cannot set {} in {}",
                picker,
                container.kind().name()
            ))),
        }
    }
}

/// One step of path selection.
fn pick(container: &Cell, picker: &Cell) -> Result<Cell, EvalError> {
    match (container.value(), picker.value()) {
        (Value::Object(ctx), Value::Word(field)) => ctx
            .get(field)
            .ok_or_else(|| bad_path(format!("object has no field {}", field))),
        (Value::Block(series) | Value::Group(series), Value::Integer(n)) => Ok(match series.pick(*n) {
            Some(cell) => match series.scope() {
                Some(scope) => cell.derelativize(scope),
                None => cell.clone(),
            },
            None => Cell::null(),
        }),
        _ => Err(bad_path(format!(
            "cannot pick {} from {}",
            picker,
            container.kind().name()
        ))),
    }
}
