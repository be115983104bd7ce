pub mod collector;

/// Request from the processing layer to re-read the focused window, so a
/// focus record is captured right when the user becomes active after idle.
#[derive(Debug, PartialEq, Eq)]
pub struct RefreshFocus;
