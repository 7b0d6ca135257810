// Screening core: canonical result, response normalization, the session
// state machine and the history ledger. Network access goes through the
// `assets` and `agent` traits only.

pub mod handlers;
pub mod history;
pub mod normalizer;
pub mod result;
pub mod session;
