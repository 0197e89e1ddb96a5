//! The `lib` context: constants, datatypes and natives

use super::Context;
use crate::error::EvalError;
use crate::natives;
use crate::value::{Cell, Kind};

impl Context {
    /// Create a root context holding everything code can use without
    /// defining it first.
    pub fn lib() -> Result<Self, EvalError> {
        let lib = Self::new(None);

        // Constants
        lib.define("true", Cell::logic(true));
        lib.define("false", Cell::logic(false));
        lib.define("null", Cell::null());
        lib.define("blank", Cell::blank());

        // Datatypes
        for kind in Kind::ALL.into_iter().filter(|k| k.name().ends_with('!')) {
            lib.define(kind.name(), Cell::datatype(kind));
        }

        natives::register(&lib)?;
        Ok(lib)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn test_lib_has_constants_and_datatypes() {
        let lib = Context::lib().unwrap();
        assert_eq!(lib.get(&"true".into()), Some(Cell::logic(true)));
        assert!(matches!(
            lib.get(&"integer!".into()).map(|c| c.into_value()),
            Some(Value::Datatype(Kind::Integer))
        ));
    }

    #[test]
    fn test_lib_has_natives() {
        let lib = Context::lib().unwrap();
        for name in ["add", "+", "if", "else", "func", "return", "redo", "apply"] {
            assert!(
                lib.get(&name.into()).is_some_and(|c| c.as_action().is_some()),
                "{} should be an action",
                name
            );
        }
    }
}
