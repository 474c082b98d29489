pub mod analysis;
pub mod descriptor;
pub mod flags;
pub mod script;

pub use analysis::{ArgValue, CallSite, ImportTable, ScriptAnalysis};
pub use descriptor::{Direction, ModelDescriptor, Objective, OpData, OpSpec, OutputScalar};
pub use flags::{ActionKind, FlagManifest, FlagRecordBuilder, FlagSpec, OptionObservation};
pub use script::Script;
