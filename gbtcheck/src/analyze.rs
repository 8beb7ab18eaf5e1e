//! Contains all analysis of decoded packets: the checker that compares packets against the hits they were built from,
//! the fibre swap diagnosis, the timing analysis, and the dispatcher running checks in parallel.
pub mod check_result;
pub mod checker;
pub mod diagnose;
pub mod dispatcher;
pub mod timing;
