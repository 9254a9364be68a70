mod listen;
mod scrobble;
mod session;

pub use listen::Listen;
pub use scrobble::Scrobble;
pub use session::{Session, SessionStatus};
