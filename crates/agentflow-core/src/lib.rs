pub mod actions;
pub mod archive;
pub mod config;
pub mod error;
pub mod events;
pub mod layout;
pub mod persistence;
pub mod policy;
pub mod records;
pub mod reducer;
pub mod state;
pub mod store;
pub mod translate;

pub use actions::*;
pub use reducer::*;
pub use state::*;

pub use archive::Conversation;
pub use archive::ConversationArchive;
pub use config::AgentflowConfig;
pub use error::*;
pub use events::ExecutionEvent;
pub use persistence::*;
pub use policy::*;
pub use records::*;
pub use store::Store;
