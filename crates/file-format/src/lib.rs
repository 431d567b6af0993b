//! STEP file staging for the service: ephemeral request files and the
//! codec that moves artifacts through them.

pub mod codec;
pub mod ephemeral;
pub mod errors;

pub use codec::ArtifactCodec;
pub use ephemeral::{EphemeralFile, EphemeralScope, FileRole};
pub use errors::CodecError;
