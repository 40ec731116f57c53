/// Router Module Index
///
/// Page routers grouped by the tier the route table assigns them. The grouping is for
/// readability only: access is decided by `guard::route_guard`, which wraps all three.

/// Entry point and account pages; open to everyone.
pub mod public;

/// Owner portal under `/portal`; needs a signed-in viewer.
pub mod portal;

/// Staff dashboard under `/dashboard`; admin tier only.
pub mod dashboard;
