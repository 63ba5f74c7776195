use crate::advice::OffsetHandler;

#[derive(Copy, Clone, Debug)]
pub struct Settings {
    /// How advice reads the receiver and arguments of the instrumented method
    ///
    /// With `Retaining`, advice reads the original slots, so exit advice sees any assignment the
    /// method body made to its parameters. With `Copying`, the receiver and arguments are copied
    /// on entry and both entry and exit advice read the copies.
    pub offset_handler: OffsetHandler,

    /// Run exit advice before `athrow` instructions too, not just before returns
    ///
    /// Only throws written in the method body itself are covered. Exceptions propagating out of
    /// called methods skip the exit advice.
    pub exit_on_throw: bool,
}

impl Settings {
    pub fn new() -> Settings {
        Settings {
            offset_handler: OffsetHandler::Retaining,
            exit_on_throw: true,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings::new()
    }
}
