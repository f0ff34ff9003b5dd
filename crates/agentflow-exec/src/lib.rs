pub mod client;
pub mod contracts;
pub mod error;
pub mod session;
pub mod stream;

pub use client::*;
pub use contracts::*;
pub use error::*;
pub use session::Session;
pub use stream::decode_stream;
pub use stream::EventStreamDecoder;
