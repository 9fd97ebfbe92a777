mod compile;
mod unarchive;

pub use compile::{
    BatchFailure, CompileError, CompilePlan, CompileReport, Compiler, Destination, SourceOutcome,
};
pub use unarchive::{ReviveOutcome, ReviveReport, ReviveStatus, UnarchiveError, Unarchiver};
