use crate::advice::AdviceRole;
use crate::jvm;
use std::fmt;

/// Errors raised while resolving advice or weaving it into a method
///
/// Members are identified by their rendered form (`Class.name:descriptor`) so that errors can
/// outlive the class graph they were raised against.
#[derive(Debug)]
pub enum Error {
    BytecodeGen(jvm::Error),

    /// The donor class has no method marked as entry or exit advice
    NoAdviceDefined { donor: String },

    /// Two donor methods are marked with the same role
    DuplicateAdvice {
        role: AdviceRole,
        first: String,
        second: String,
    },

    /// Advice method is not static, or its parameter markers are malformed
    InvalidDonor { donor: String, reason: String },

    /// The code locator has no code for a marked advice method
    MissingDonorCode { donor: String },

    /// A value is produced (by entry advice or by exit advice) that no one reads
    ValueNeverRead { donor: String },

    /// Advice reads the entered value, but it is entry advice or entry advice produces none
    ValueMarkerWithoutEntry { donor: String, parameter: usize },

    /// Exit advice reads the entered value more than once, or through an incompatible type
    IncompatibleValueType { donor: String, parameter: usize },

    /// Entry advice uses a marker which only makes sense on method exit
    ExitOnlyMarker { donor: String, parameter: usize },

    /// Entry advice reads the receiver of a constructor before it is initialized
    UninitializedThisAccess { donor: String, target: String },

    /// Advice reads the receiver of a static method
    StaticHasNoThis { donor: String, target: String },

    /// Advice parameter cannot hold the receiver
    ThisTypeMismatch { donor: String, target: String },

    /// Advice code writes to a parameter which is read-only
    ReadOnlyWrite { donor: String, parameter: usize },

    /// Advice reads a field which the instrumented type doesn't have
    FieldNotFound {
        donor: String,
        target: String,
        field: String,
    },

    /// Advice parameter cannot hold the value of the field it reads
    FieldTypeMismatch {
        donor: String,
        target: String,
        field: String,
    },

    /// Advice reads an instance field from a static method
    InstanceFieldFromStatic {
        donor: String,
        target: String,
        field: String,
    },

    /// Advice reads an argument the method doesn't have
    ArgumentIndexOutOfRange {
        donor: String,
        target: String,
        index: usize,
        arguments: usize,
    },

    /// Advice parameter cannot hold the argument it reads
    ArgumentTypeMismatch {
        donor: String,
        target: String,
        index: usize,
    },

    /// Advice parameter cannot hold the return value (or the method returns nothing)
    ReturnTypeMismatch { donor: String, target: String },

    /// Advice parameter cannot hold a `java.lang.Throwable`
    ThrownTypeMismatch { donor: String, target: String },

    /// Something besides the returned or thrown value is on the stack at a method exit
    NonEmptyStackAtExit {
        target: String,
        element: usize,
        height: usize,
    },

    /// Relocated local variables don't fit in the frame anymore
    LocalsOverflow { target: String },
}

impl From<jvm::Error> for Error {
    fn from(err: jvm::Error) -> Error {
        Error::BytecodeGen(err)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BytecodeGen(err) => write!(f, "malformed bytecode: {:?}", err),
            Error::NoAdviceDefined { donor } => {
                write!(f, "{} has no method marked as entry or exit advice", donor)
            }
            Error::DuplicateAdvice {
                role,
                first,
                second,
            } => write!(
                f,
                "both {} and {} are marked as {} advice",
                first, second, role
            ),
            Error::InvalidDonor { donor, reason } => {
                write!(f, "{} cannot be used as advice: {}", donor, reason)
            }
            Error::MissingDonorCode { donor } => write!(f, "no code found for {}", donor),
            Error::ValueNeverRead { donor } => {
                write!(f, "the value returned by {} is never read", donor)
            }
            Error::ValueMarkerWithoutEntry { donor, parameter } => write!(
                f,
                "parameter {} of {} reads the entered value, but entry advice produces none",
                parameter, donor
            ),
            Error::IncompatibleValueType { donor, parameter } => write!(
                f,
                "parameter {} of {} cannot receive the entered value",
                parameter, donor
            ),
            Error::ExitOnlyMarker { donor, parameter } => write!(
                f,
                "parameter {} of {} uses a marker only allowed on exit advice",
                parameter, donor
            ),
            Error::UninitializedThisAccess { donor, target } => write!(
                f,
                "{} reads the receiver of {} before it is initialized",
                donor, target
            ),
            Error::StaticHasNoThis { donor, target } => write!(
                f,
                "{} reads the receiver of static method {}",
                donor, target
            ),
            Error::ThisTypeMismatch { donor, target } => write!(
                f,
                "{} cannot receive the receiver of {}",
                donor, target
            ),
            Error::ReadOnlyWrite { donor, parameter } => write!(
                f,
                "parameter {} of {} is read-only, but the advice writes to it",
                parameter, donor
            ),
            Error::FieldNotFound {
                donor,
                target,
                field,
            } => write!(
                f,
                "{} reads field {}, which {} cannot see",
                donor, field, target
            ),
            Error::FieldTypeMismatch {
                donor,
                target,
                field,
            } => write!(
                f,
                "{} cannot receive the value of {} in {}",
                donor, field, target
            ),
            Error::InstanceFieldFromStatic {
                donor,
                target,
                field,
            } => write!(
                f,
                "{} reads instance field {} from static method {}",
                donor, field, target
            ),
            Error::ArgumentIndexOutOfRange {
                donor,
                target,
                index,
                arguments,
            } => write!(
                f,
                "{} reads argument {} of {}, which only has {} arguments",
                donor, index, target, arguments
            ),
            Error::ArgumentTypeMismatch {
                donor,
                target,
                index,
            } => write!(
                f,
                "{} cannot receive argument {} of {}",
                donor, index, target
            ),
            Error::ReturnTypeMismatch { donor, target } => write!(
                f,
                "{} cannot receive the return value of {}",
                donor, target
            ),
            Error::ThrownTypeMismatch { donor, target } => write!(
                f,
                "{} cannot receive exceptions thrown by {}",
                donor, target
            ),
            Error::NonEmptyStackAtExit {
                target,
                element,
                height,
            } => write!(
                f,
                "stack of {} has unexpected height {} at exit (element {})",
                target, height, element
            ),
            Error::LocalsOverflow { target } => {
                write!(f, "too many local variables in {} after weaving", target)
            }
        }
    }
}

impl std::error::Error for Error {}
