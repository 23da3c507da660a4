//! Pipeline stage handlers.
//!
//! Each handler is a free function over the processor, dispatched once per
//! cycle with its position in the configured stage list. A handler that finds
//! no pipeline record at its position is a routine no-op, not an error: the
//! pipeline simply has not filled that far yet.

/// Signature matching and multi-word completion.
pub mod decode;
/// Instruction fetch and the PC-advance bookkeeping.
pub mod fetch;
/// Operation-list execution under the blocking protocol.
pub mod execute;
/// Reserved final stage.
pub mod writeback;

pub use decode::decode;
pub use execute::execute;
pub use fetch::fetch;
pub use writeback::writeback;
