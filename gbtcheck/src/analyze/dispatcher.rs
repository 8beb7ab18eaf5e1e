//! Contains [check_units] that checks packets in parallel on worker threads, and [build_units] that makes the packets to check from hit records.
use crate::util::*;

/// A packet and the hits it was built from.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckUnit {
    /// Packet to check
    pub packet: Packet,
    /// Hits the packet should contain
    pub truth: HitMap,
}

impl CheckUnit {
    /// New unit from a packet and its truth.
    pub fn new(packet: Packet, truth: HitMap) -> Self {
        Self { packet, truth }
    }
}

/// Builds one [CheckUnit] per region of the hits.
///
/// The truth of a unit holds every hit of its region, including the hits gap suppression keeps out of the packet.
/// The number of suppressed hits is sent as [StatType::HitsSuppressed].
///
/// # Errors
/// [CodecError::EmptyHitSet] without hits, or the first error building a packet.
pub fn build_units(
    config: &impl BuilderOpt,
    hits: &[HitRecord],
    stats_send: &flume::Sender<StatType>,
) -> Result<Vec<CheckUnit>, CodecError> {
    let builder = PacketBuilder::new(config)?;
    if hits.is_empty() {
        return Err(CodecError::EmptyHitSet);
    }
    let mut by_region: BTreeMap<u8, Vec<HitRecord>> = BTreeMap::new();
    hits.iter()
        .for_each(|hit| by_region.entry(hit.region()).or_default().push(*hit));

    by_region
        .into_values()
        .map(|region_hits| {
            let dropped = suppress_gap(&region_hits, builder.bc_gap()).dropped.len();
            if dropped > 0 {
                send_stat(stats_send, StatType::HitsSuppressed(dropped as u32));
            }
            let packet = builder.make_packet(&region_hits)?;
            Ok(CheckUnit::new(packet, HitMap::from_records(&region_hits)))
        })
        .collect()
}

/// Checks the units on `config.worker_threads()` threads and reports the outcome to the stats controller.
///
/// Results are returned in the order of the units. A unit is `None` if it was never checked because the stop flag was raised.
pub fn check_units<C: Config + 'static>(
    config: &'static C,
    units: Vec<CheckUnit>,
    stats_send: &flume::Sender<StatType>,
    stop_flag: &Arc<AtomicBool>,
) -> io::Result<Vec<Option<CheckResult>>> {
    let unit_count = units.len();
    let worker_count = config.worker_threads().clamp(1, unit_count.max(1));
    let (unit_send, unit_recv) = crossbeam_channel::bounded::<(usize, CheckUnit)>(worker_count * 2);
    let (result_send, result_recv) = crossbeam_channel::unbounded::<(usize, CheckResult)>();

    let mut worker_handles: Vec<JoinHandle<()>> = Vec::with_capacity(worker_count);
    for id in 0..worker_count {
        let unit_recv = unit_recv.clone();
        let result_send = result_send.clone();
        let stats_send = stats_send.clone();
        let stop_flag = Arc::clone(stop_flag);
        worker_handles.push(
            thread::Builder::new()
                .name(format!("Checker #{id}"))
                .spawn(move || {
                    while let Ok((idx, unit)) = unit_recv.recv() {
                        if stop_flag.load(Ordering::SeqCst) {
                            log::trace!("Checker #{id} stopping, stop flag raised");
                            break;
                        }
                        let result = checker::check(&unit.packet, &unit.truth);
                        report_result(&unit.packet, &result, &stats_send);
                        if result_send.send((idx, result)).is_err() {
                            break;
                        }
                    }
                })?,
        );
    }
    // Only the workers hold these now
    drop(unit_recv);
    drop(result_send);

    for (idx, unit) in units.into_iter().enumerate() {
        if stop_flag.load(Ordering::SeqCst) {
            log::debug!("Stop flag raised, {} units left unchecked", unit_count - idx);
            break;
        }
        if unit_send.send((idx, unit)).is_err() {
            log::warn!("All checkers disconnected, {} units left unchecked", unit_count - idx);
            break;
        }
    }
    drop(unit_send);

    let mut results: Vec<Option<CheckResult>> = vec![None; unit_count];
    result_recv
        .iter()
        .for_each(|(idx, result)| results[idx] = Some(result));

    worker_handles.into_iter().for_each(|handle| {
        let name = handle.thread().name().unwrap_or("Checker").to_string();
        if handle.join().is_err() {
            send_stat(
                stats_send,
                StatType::Fatal(format!("{name} panicked").into()),
            );
        }
    });
    Ok(results)
}

/// Sends the stats and error messages of one checked packet.
pub fn report_result(packet: &Packet, result: &CheckResult, stats_send: &flume::Sender<StatType>) {
    send_stat(
        stats_send,
        StatType::PacketChecked {
            region: packet.region(),
            words: packet.len(),
        },
    );
    result
        .plane_counts()
        .into_iter()
        .for_each(|(plane, counts)| send_stat(stats_send, StatType::PlaneVerdicts { plane, counts }));
    if !result.unexpected().is_empty() {
        send_stat(
            stats_send,
            StatType::UnexpectedChannels(result.unexpected().len() as u32),
        );
    }
    result
        .error_messages()
        .into_iter()
        .for_each(|msg| send_stat(stats_send, StatType::Error(msg.into())));
}

/// Sends a stat, logging instead if the controller is gone.
pub(crate) fn send_stat(stats_send: &flume::Sender<StatType>, stat: StatType) {
    if let Err(e) = stats_send.send(stat) {
        log::warn!("Stats controller disconnected, dropped: {}", e.into_inner());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn hits() -> Vec<HitRecord> {
        vec![
            HitRecord::new(3, 0, 100, 0, 20).unwrap(),
            HitRecord::new(3, 0, 101, 0, 20).unwrap(),
            HitRecord::new(7, 2, 300, 1, 21).unwrap(),
            HitRecord::new(9, 5, 40, 3, 22).unwrap(),
        ]
    }

    #[test]
    fn test_build_units_per_region() {
        let (send, recv) = flume::unbounded();
        let cfg = MockConfig {
            bc_gap: 5,
            ..Default::default()
        };
        let units = build_units(&cfg, &hits(), &send).unwrap();
        assert_eq!(units.len(), 3);
        assert_eq!(
            units.iter().map(|u| u.packet.region()).collect::<Vec<_>>(),
            vec![20, 21, 22]
        );
        // Truth keeps the suppressed hit
        assert_eq!(units[0].truth.hit_count(), 2);
        drop(send);
        assert_eq!(recv.iter().collect::<Vec<_>>(), vec![StatType::HitsSuppressed(1)]);
    }

    static CONFIG_TEST_CHECK_UNITS: OnceLock<MockConfig> = OnceLock::new();

    #[test]
    fn test_check_units_in_order() {
        let cfg = CONFIG_TEST_CHECK_UNITS.get_or_init(|| MockConfig {
            worker_threads: 3,
            ..Default::default()
        });
        let (send, recv) = flume::unbounded();
        let units = build_units(cfg, &hits(), &send).unwrap();
        let stop_flag = Arc::new(AtomicBool::new(false));

        let results = check_units(cfg, units, &send, &stop_flag).unwrap();
        drop(send);

        assert_eq!(results.len(), 3);
        let regions: Vec<u8> = results
            .iter()
            .map(|r| r.as_ref().unwrap().channels().next().unwrap().key.region)
            .collect();
        assert_eq!(regions, vec![20, 21, 22]);
        assert!(results.iter().all(|r| r.as_ref().unwrap().is_clean()));

        let packets_checked = recv
            .iter()
            .filter(|s| matches!(s, StatType::PacketChecked { .. }))
            .count();
        assert_eq!(packets_checked, 3);
    }

    static CONFIG_TEST_STOPPED: OnceLock<MockConfig> = OnceLock::new();

    #[test]
    fn test_check_units_stopped() {
        let cfg = CONFIG_TEST_STOPPED.get_or_init(MockConfig::default);
        let (send, _recv) = flume::unbounded();
        let units = build_units(cfg, &hits(), &send).unwrap();
        let stop_flag = Arc::new(AtomicBool::new(true));

        let results = check_units(cfg, units, &send, &stop_flag).unwrap();
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(Option::is_none));
    }

    #[test]
    fn test_report_result_errors() {
        let (send, recv) = flume::unbounded();
        let hits = hits();
        let builder = PacketBuilder::new(&BuilderConfig::default()).unwrap();
        let mut packet = builder.make_packet(&hits[..1]).unwrap();
        packet.word_mut(0).unwrap().flip_bit(PAYLOAD_OFFSET).unwrap();
        let result = checker::check(&packet, &HitMap::from_records(&hits[..1]));

        report_result(&packet, &result, &send);
        drop(send);
        let errors: Vec<Box<str>> = recv
            .iter()
            .filter_map(|s| match s {
                StatType::Error(msg) => Some(msg),
                _ => None,
            })
            .collect();
        assert!(errors.iter().any(|e| e.contains("[E10]")));
        assert!(errors.iter().any(|e| e.contains("[E20]")));
    }
}
