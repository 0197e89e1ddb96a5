//! Argument type checking
//!
//! Runs as its own pass after fulfillment (and after the fulfill hook), so
//! whatever ends up in the varlist is what gets checked. Cells that pass
//! are marked `CHECKED`, and a checked redo skips them the second time
//! around unless something rewrote them in between.

use std::rc::Rc;

use super::Evaluator;
use crate::action::ParamClass;
use crate::error::EvalError;
use crate::frame::Frame;
use crate::value::{CellFlags, Value};

impl Evaluator {
    pub(crate) fn typecheck(&mut self, af: &mut Frame) -> Result<(), EvalError> {
        let (phase, varlist) = {
            let inv = af
                .invocation()
                .ok_or_else(|| EvalError::protocol("typecheck without an action frame"))?;
            (Rc::clone(&inv.phase), inv.varlist.clone())
        };
        let label = af.label_string();
        let mut in_unused_refinement = false;

        for (index, param) in phase.params().iter().enumerate() {
            af.set_cursor(index);
            let Some(mut cell) = varlist.get_index(index) else {
                continue;
            };

            match param.class {
                ParamClass::Local | ParamClass::Output | ParamClass::Variadic => continue,
                ParamClass::Refinement => {
                    in_unused_refinement = match cell.value() {
                        Value::Logic(true) => false,
                        Value::Null | Value::Logic(false) => true,
                        _ => {
                            return Err(EvalError::ArgumentType {
                                action: label,
                                param: param.symbol.clone(),
                                kind: cell.kind().name(),
                            })
                        }
                    };
                    continue;
                }
                _ => {}
            }

            if in_unused_refinement {
                if !cell.is_null() {
                    return Err(EvalError::UnusedRefinementArg {
                        action: label,
                        param: param.symbol.clone(),
                    });
                }
                continue;
            }

            if cell.has(CellFlags::CHECKED) {
                continue;
            }
            if !param.types.accepts(&cell) {
                return Err(EvalError::ArgumentType {
                    action: label,
                    param: param.symbol.clone(),
                    kind: cell.kind().name(),
                });
            }
            cell.set(CellFlags::CHECKED);
            varlist.set_index(index, cell);
        }
        Ok(())
    }
}
