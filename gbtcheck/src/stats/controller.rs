//! Contains the [Controller] that collects stats and reports errors.
//! It also controls the stop flag, which can be used to stop processing if a fatal error occurs, or if the config contains a max number of errors to tolerate.
//! Finally when the event loop breaks (at the end of execution), it will print a summary of the stats collected, using the Report struct.

use super::err_printer::ErrPrinter;
use super::stats_report::make_report;
use crate::util::*;

/// The Controller receives stats and builds a summary report that is printed at the end of execution.
pub struct Controller<C: Config + 'static> {
    stats_collector: StatsCollector,
    /// Time from [Controller] is instantiated, to all processing threads disconnected their [StatType] producer channel.
    pub processing_time: Instant,
    config: &'static C,
    max_tolerate_errors: u32,
    // The channel where stats are received from other threads.
    recv_stats_channel: flume::Receiver<StatType>,
    // Set to None when the event loop starts, so the loop breaks when all producers have dropped their channel.
    send_stats_channel: Option<flume::Sender<StatType>>,
    end_processing_flag: Arc<AtomicBool>,
    any_errors_flag: Arc<AtomicBool>,
}

impl<C: Config + 'static> Controller<C> {
    /// Creates a new [Controller] from a [Config].
    pub fn new(global_config: &'static C) -> Self {
        let (send_stats_channel, recv_stats_channel): (
            flume::Sender<StatType>,
            flume::Receiver<StatType>,
        ) = flume::unbounded();
        Controller {
            stats_collector: StatsCollector::default(),
            config: global_config,
            processing_time: Instant::now(),
            max_tolerate_errors: global_config.max_tolerate_errors(),
            recv_stats_channel,
            send_stats_channel: Some(send_stats_channel),
            end_processing_flag: Arc::new(AtomicBool::new(false)),
            any_errors_flag: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Returns a clone of the channel that is used to send stats to the Controller.
    ///
    /// Returns `None` once the controller is running, as it no longer accepts new producers.
    pub fn send_channel(&self) -> Option<flume::Sender<StatType>> {
        if self.send_stats_channel.is_none() {
            log::error!("Controller send channel is none, most likely it is already running and does not accept new producers");
        }
        self.send_stats_channel.clone()
    }

    /// Returns a cloned reference to the end processing flag.
    pub fn end_processing_flag(&self) -> Arc<AtomicBool> {
        self.end_processing_flag.clone()
    }

    /// Returns a cloned reference to the any errors flag
    ///
    /// The flag is set if there's any errors at end of processing.
    pub fn any_errors_flag(&self) -> Arc<AtomicBool> {
        self.any_errors_flag.clone()
    }

    /// Starts the event loop for the Controller
    /// This function will block until the channel is closed
    pub fn run(&mut self) {
        // No new producers after this point
        self.send_stats_channel = None;

        // Breaks when every sender is dropped
        while let Ok(stats_update) = self.recv_stats_channel.recv() {
            self.update(stats_update);
        }
        let processing_time = self.processing_time.elapsed();
        log::debug!("Stats collection done in {processing_time:.02?}");

        self.stats_collector.finalize(self.config.mute_errors());

        if self.stats_collector.any_errors() {
            self.any_errors_flag.store(true, Ordering::SeqCst);
            if !self.config.mute_errors() {
                self.print_errors();
            }
        }

        if let Some(format) = self.config.stats_output_format() {
            if let Err(e) = self
                .stats_collector
                .write_stats(&self.config.stats_output_mode(), format)
            {
                log::error!("{e}");
            }
        }

        if self.config.print_report() && self.config.stats_output_mode() != StatsOutputMode::Stdout
        {
            // Clones so the fatal error stays in the collector returned to the caller
            let mut stats = self.stats_collector.clone();
            make_report(processing_time, &mut stats).print();
        }
    }

    /// Consumes the controller and returns the collected stats.
    pub fn into_stats_collector(self) -> StatsCollector {
        self.stats_collector
    }

    fn update(&mut self, stat: StatType) {
        match stat {
            StatType::Error(msg) => {
                if self.stats_collector.fatal_err() {
                    log::trace!("Fatal error already seen, ignoring error: {msg}");
                    return;
                }

                self.stats_collector.collect(StatType::Error(msg));

                if self.max_tolerate_errors > 0 {
                    log::trace!("Error count: {}", self.stats_collector.err_count());
                    if self.stats_collector.err_count() == u64::from(self.max_tolerate_errors) {
                        log::trace!("Errors reached maximum tolerated errors, stopping...");
                        self.end_processing_flag.store(true, Ordering::SeqCst);
                    }
                }
            }

            StatType::Fatal(err) => {
                if self.stats_collector.fatal_err() {
                    log::trace!("Fatal error already seen, ignoring error: {err}");
                    return;
                }
                self.end_processing_flag.store(true, Ordering::SeqCst);
                log::error!("FATAL: {err}\nShutting down...");
                self.stats_collector.collect(StatType::Fatal(err));
            }
            StatType::Slope { plane, slope } => {
                log::info!("Plane {plane}: slope {slope:.3} BC per pair");
                self.stats_collector.collect(stat);
            }
            StatType::PacketChecked { .. }
            | StatType::HitsSuppressed(_)
            | StatType::PlaneVerdicts { .. }
            | StatType::UnexpectedChannels(_)
            | StatType::SwapCandidate(_) => {
                log::trace!("{stat}");
                self.stats_collector.collect(stat);
            }
        }
    }

    fn print_errors(&self) {
        let max_errors = (self.max_tolerate_errors > 0).then_some(self.max_tolerate_errors);
        ErrPrinter::new(max_errors, self.config.error_code_filter()).print(
            self.stats_collector.errors(),
            self.stats_collector.unique_error_codes_as_slice(),
        );
    }
}
