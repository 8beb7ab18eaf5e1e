//! Trait for all check options.

/// A config that implements this trait controls how packets are checked and analysed.
pub trait CheckOpt {
    /// Number of worker threads checking packets in parallel.
    fn worker_threads(&self) -> usize;
    /// Compute the BCID slope of every plane after checking.
    fn timing_analysis(&self) -> bool;
    /// Look for planes with swapped fibres after checking.
    fn diagnose_swaps(&self) -> bool;
    /// Print the summary report at the end of processing.
    fn print_report(&self) -> bool;
}

impl<T> CheckOpt for &T
where
    T: CheckOpt,
{
    fn worker_threads(&self) -> usize {
        (*self).worker_threads()
    }
    fn timing_analysis(&self) -> bool {
        (*self).timing_analysis()
    }
    fn diagnose_swaps(&self) -> bool {
        (*self).diagnose_swaps()
    }
    fn print_report(&self) -> bool {
        (*self).print_report()
    }
}

impl<T> CheckOpt for Box<T>
where
    T: CheckOpt,
{
    fn worker_threads(&self) -> usize {
        (**self).worker_threads()
    }
    fn timing_analysis(&self) -> bool {
        (**self).timing_analysis()
    }
    fn diagnose_swaps(&self) -> bool {
        (**self).diagnose_swaps()
    }
    fn print_report(&self) -> bool {
        (**self).print_report()
    }
}

impl<T> CheckOpt for std::sync::Arc<T>
where
    T: CheckOpt,
{
    fn worker_threads(&self) -> usize {
        (**self).worker_threads()
    }
    fn timing_analysis(&self) -> bool {
        (**self).timing_analysis()
    }
    fn diagnose_swaps(&self) -> bool {
        (**self).diagnose_swaps()
    }
    fn print_report(&self) -> bool {
        (**self).print_report()
    }
}
