//! Desktop activity logger: observes window focus, title, and user presence
//! notifications and appends deduplicated, duration-annotated records to a
//! local store. The interesting part is the debouncing pipeline in
//! [daemon::processing]; platform signal backends are supplied by the host
//! through the traits in [signals].

pub mod daemon;
pub mod signals;
pub mod utils;
