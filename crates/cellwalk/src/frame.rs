//! Frames: the record of one in-progress step or action call

use std::rc::Rc;

use bitflags::bitflags;

use crate::action::Action;
use crate::data_stack::StackMark;
use crate::environment::Context;
use crate::value::{Cell, Symbol};

/// Identity of a frame, used as the target of unwind and redo throws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId(pub u64);

bitflags! {
    /// Capability flags of a frame.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct FrameFlags: u8 {
        /// This frame is evaluating one argument for an enclosing call.
        const FULFILLING_ARG = 1 << 0;
        /// The action in this frame was invoked enfix.
        const RUNNING_ENFIX = 1 << 1;
        /// Invisible steps do not end this frame's step while input remains.
        const NO_INVISIBLE = 1 << 2;
        /// Deferring an enfix operator here is an error.
        const ERROR_ON_DEFERRED_ENFIX = 1 << 3;
        /// The first action run by this frame reports its `<output>`s on
        /// the data stack.
        const WANTS_OUTPUTS = 1 << 4;
    }
}

/// Resumable point of the step evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepState {
    /// About to fetch and classify the next cell
    Start,
    /// A value was produced; check for an enfix operator to the right
    Lookahead,
    /// Step complete (possibly invisible)
    Finished,
}

/// Resumable point of the invocation engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionState {
    /// Walking parameters, gathering arguments
    Fulfill,
    /// Filling refinements that were mentioned out of order
    Pickups,
    /// Validating every argument against its constraint
    Typecheck,
    /// Running the phase's dispatcher
    Dispatch,
    /// Result (or invisibility) established
    Done,
}

/// Fields present while a frame invokes an action.
#[derive(Debug)]
pub struct Invocation {
    /// The action as fetched
    pub original: Rc<Action>,
    /// The action currently running; redo may retarget it
    pub phase: Rc<Action>,
    /// Binding the action was fetched with
    pub binding: Option<Context>,
    /// Name the action was invoked through
    pub label: Option<Symbol>,
    /// Argument storage, keyed like `original`'s parameters
    pub varlist: Context,
    /// Where the engine is
    pub state: ActionState,
    /// Data stack height at call entry
    pub base: StackMark,
    cursor: usize,
}

/// One in-progress step or call.
#[derive(Debug)]
pub struct Frame {
    id: FrameId,
    /// Output cell
    pub out: Cell,
    /// Scratch cell
    pub spare: Cell,
    /// Capability flags
    pub flags: FrameFlags,
    /// Step evaluator state
    pub state: StepState,
    invocation: Option<Invocation>,
    argument_of: Option<String>,
}

impl Frame {
    /// Create a frame with a fresh (stale) output.
    pub fn new(id: FrameId, flags: FrameFlags) -> Self {
        Self {
            id,
            out: Cell::fresh(),
            spare: Cell::fresh(),
            flags,
            state: StepState::Start,
            invocation: None,
            argument_of: None,
        }
    }

    /// Builder: mark this frame as gathering an argument for the action
    /// labelled `label`.
    pub fn gathering_for(mut self, label: String) -> Self {
        self.argument_of = Some(label);
        self
    }

    /// Label of the action this frame gathers an argument for.
    pub fn parent_label(&self) -> &str {
        self.argument_of.as_deref().unwrap_or("evaluation")
    }

    /// This frame's identity.
    pub fn id(&self) -> FrameId {
        self.id
    }

    /// Whether a flag is set.
    pub fn has(&self, flag: FrameFlags) -> bool {
        self.flags.contains(flag)
    }

    /// Bind this frame to an action, allocating argument storage.
    pub fn begin_action(
        &mut self,
        action: Rc<Action>,
        binding: Option<Context>,
        label: Option<Symbol>,
        base: StackMark,
    ) {
        let varlist = Context::for_frame(action.params().iter().map(|p| &p.symbol), self.id);
        self.invocation = Some(Invocation {
            original: Rc::clone(&action),
            phase: action,
            binding,
            label,
            varlist,
            state: ActionState::Fulfill,
            base,
            cursor: 0,
        });
    }

    /// Invocation fields, if this frame is running an action.
    pub fn invocation(&self) -> Option<&Invocation> {
        self.invocation.as_ref()
    }

    /// Mutable invocation fields.
    pub fn invocation_mut(&mut self) -> Option<&mut Invocation> {
        self.invocation.as_mut()
    }

    /// Argument storage, if this frame is running an action.
    pub fn varlist(&self) -> Option<&Context> {
        self.invocation.as_ref().map(|inv| &inv.varlist)
    }

    /// The running phase, if any.
    pub fn phase(&self) -> Option<&Rc<Action>> {
        self.invocation.as_ref().map(|inv| &inv.phase)
    }

    /// Position of the lockstep cursor over parameters, arguments and
    /// exemplar.
    pub fn cursor(&self) -> usize {
        self.invocation.as_ref().map_or(0, |inv| inv.cursor)
    }

    pub(crate) fn set_cursor(&mut self, index: usize) {
        if let Some(inv) = self.invocation.as_mut() {
            inv.cursor = index;
        }
    }

    /// The label used in error messages: the invoked name, else the
    /// action's own name.
    pub fn label_string(&self) -> String {
        match &self.invocation {
            Some(inv) => inv
                .label
                .as_ref()
                .or_else(|| inv.original.name())
                .map(|s| s.to_string())
                .unwrap_or_else(|| "anonymous action".to_string()),
            None => "evaluation".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{dispatcher, Bounce, Param, ParamClass};
    use crate::value::TypeSet;

    #[test]
    fn test_begin_action_allocates_varlist() {
        let action = Rc::new(
            Action::new(
                vec![
                    Param::new("a", ParamClass::Normal, TypeSet::any_value()),
                    Param::new("b", ParamClass::Normal, TypeSet::any_value()),
                ],
                dispatcher(|_call| Ok(Bounce::Invisible)),
            )
            .with_name("pair"),
        );
        let mut frame = Frame::new(FrameId(3), FrameFlags::empty());
        frame.begin_action(action, None, None, StackMark::default());

        let varlist = frame.varlist().unwrap();
        assert_eq!(varlist.len(), 2);
        assert_eq!(varlist.frame_id(), Some(FrameId(3)));
        assert_eq!(frame.label_string(), "pair");
        assert_eq!(frame.invocation().unwrap().state, ActionState::Fulfill);
    }

    #[test]
    fn test_new_frame_output_is_stale() {
        let frame = Frame::new(FrameId(1), FrameFlags::FULFILLING_ARG);
        assert!(frame.out.is_stale());
        assert!(frame.has(FrameFlags::FULFILLING_ARG));
        assert_eq!(frame.state, StepState::Start);
        assert_eq!(frame.parent_label(), "evaluation");
    }

    #[test]
    fn test_argument_frame_knows_its_caller() {
        let frame = Frame::new(FrameId(2), FrameFlags::FULFILLING_ARG).gathering_for("add".to_string());
        assert_eq!(frame.parent_label(), "add");
    }
}
