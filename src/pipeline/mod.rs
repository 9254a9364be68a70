//! Export → retroactivity window → scrobbling policy → duplicate check → submit.

mod duplicates;
mod retroactivity;
mod upload;
mod validator;

pub use duplicates::{is_same_play, DuplicateDetector, DEFAULT_BUFFER_SECS, SAME_TRACK_SIMILARITY};
pub use retroactivity::{RetroactivityFilter, MAX_BACKDATE_DAYS};
pub use upload::{UploadReport, Uploader};
pub use validator::{engagements, Engagement, ListenValidator, ValidationPolicy};
