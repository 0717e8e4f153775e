pub mod handshake;
pub mod router;
pub mod signature;

pub use router::{build_router, IngressState};
