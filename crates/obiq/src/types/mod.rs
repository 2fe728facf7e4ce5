//! Runtime shapes of the declared types: objects, protocols, records,
//! enums, the built-in collections, and the `Result`/`Error` pair.

mod collections;
mod enums;
mod object;
mod protocol;
mod record;
mod result;

pub use collections::{ListInstance, MapInstance, SetInstance};
pub use enums::EnumInstance;
pub use object::{MethodBody, MethodDef, MethodSignature, NativeFn, ObjectInstance};
pub use protocol::ProtocolInstance;
pub use record::{RecordInstance, RecordType};
pub use result::{ErrorInstance, ResultInstance};
