//! Interaction webhook runtime: envelope parsing, command routing, reply delivery
//! and the HTTP server that ties them together.

pub mod interaction;
pub mod responder;
pub mod router;
pub mod server;

pub use interaction::*;
pub use responder::*;
pub use router::*;
pub use server::*;
