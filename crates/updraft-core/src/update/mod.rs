//! Update-cycle domain types: events, errors, states and download units.

mod errors;
mod events;
mod state;
mod types;

pub use errors::{UpdateError, UpdateResult};
pub use events::{EventCode, UpdateEvent};
pub use state::{StateInput, UpdateState};
pub use types::{DownloadUnit, MANIFEST_ID, VERSION_ID};
