//! Linear address scan over one bus.
//!
//! Every address in the range is probed with the cheapest transaction
//! that is safe for it; followers that NACK are simply absent. The scan
//! is lazy and finite, and stops for good after the first fatal error.

use std::ops::RangeInclusive;

use crate::bus::i2c::I2cBus;
use crate::bus::{check_address, FIRST_ADDRESS, LAST_ADDRESS};
use crate::errors::{I2cError, I2cResult};

/// Which probe the scanner uses for an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeKind {
    QuickWrite,
    ByteRead,
}

/// Address ranges that must be probed with a read instead of a quick
/// write.
///
/// The defaults follow the conventional bus-tool split: 0x30-0x37 and
/// 0x50-0x5F hold parts (EEPROMs among them) where an unexpected write
/// can corrupt state. Safe-probe ranges vary by device family, so they
/// are data, not control flow.
#[derive(Debug, Clone)]
pub struct ScanPolicy {
    pub read_probe: Vec<RangeInclusive<u8>>,
}

impl Default for ScanPolicy {
    fn default() -> Self {
        Self {
            read_probe: vec![0x30..=0x37, 0x50..=0x5F],
        }
    }
}

impl ScanPolicy {
    pub fn probe_kind(&self, address: u8) -> ProbeKind {
        if self.read_probe.iter().any(|range| range.contains(&address)) {
            ProbeKind::ByteRead
        } else {
            ProbeKind::QuickWrite
        }
    }
}

struct ProbeScan<'p, F> {
    probe: F,
    policy: &'p ScanPolicy,
    invalid: Option<I2cError>,
    next: u16,
    last: u16,
    failed: bool,
}

impl<F> Iterator for ProbeScan<'_, F>
where
    F: FnMut(u8, ProbeKind) -> I2cResult<()>,
{
    type Item = I2cResult<u8>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        if let Some(err) = self.invalid.take() {
            self.failed = true;
            return Some(Err(err));
        }
        while self.next <= self.last {
            let address = self.next as u8;
            self.next += 1;
            match (self.probe)(address, self.policy.probe_kind(address)) {
                Ok(()) => return Some(Ok(address)),
                Err(err) if err.is_absent() => continue,
                Err(err) => {
                    self.failed = true;
                    return Some(Err(err));
                }
            }
        }
        None
    }
}

fn scan_with<F>(first: u8, last: u8, policy: &ScanPolicy, probe: F) -> ProbeScan<'_, F>
where
    F: FnMut(u8, ProbeKind) -> I2cResult<()>,
{
    let invalid = check_address(first)
        .and_then(|()| check_address(last))
        .err()
        .or_else(|| {
            (first > last).then(|| I2cError::InvalidArgument {
                reason: format!("scan range start {first:#04x} is above end {last:#04x}"),
            })
        });
    ProbeScan {
        probe,
        policy,
        invalid,
        next: first as u16,
        last: last as u16,
        failed: false,
    }
}

/// Probes the addresses in `[first, last]` lazily, yielding each
/// responding one as it is found.
///
/// A NACK means the address is absent and is skipped. Any other failure
/// is yielded once and ends the scan for good: the sequence is finite
/// and cannot be restarted. Collect into `I2cResult<Vec<u8>>` when the
/// whole set is wanted at once.
pub fn scan_range<'a>(
    bus: &'a mut I2cBus,
    first: u8,
    last: u8,
    policy: &'a ScanPolicy,
) -> impl Iterator<Item = I2cResult<u8>> + 'a {
    scan_with(first, last, policy, move |address, kind| {
        bus.set_follower(address)?;
        match kind {
            ProbeKind::QuickWrite => bus.write_quick(false),
            ProbeKind::ByteRead => bus.read_byte().map(drop),
        }
    })
}

/// [`scan_range`] over the whole usable address range.
pub fn scan<'a>(
    bus: &'a mut I2cBus,
    policy: &'a ScanPolicy,
) -> impl Iterator<Item = I2cResult<u8>> + 'a {
    scan_range(bus, FIRST_ADDRESS, LAST_ADDRESS, policy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nix::errno::Errno;

    fn absent(address: u8) -> I2cError {
        I2cError::RemoteIo {
            address,
            source: Errno::EREMOTEIO,
        }
    }

    #[test]
    fn default_policy_read_probes_the_risky_ranges() {
        let policy = ScanPolicy::default();
        assert_eq!(policy.probe_kind(0x30), ProbeKind::ByteRead);
        assert_eq!(policy.probe_kind(0x37), ProbeKind::ByteRead);
        assert_eq!(policy.probe_kind(0x50), ProbeKind::ByteRead);
        assert_eq!(policy.probe_kind(0x5F), ProbeKind::ByteRead);
        assert_eq!(policy.probe_kind(0x2F), ProbeKind::QuickWrite);
        assert_eq!(policy.probe_kind(0x38), ProbeKind::QuickWrite);
        assert_eq!(policy.probe_kind(0x60), ProbeKind::QuickWrite);
    }

    #[test]
    fn custom_policy_overrides_the_ranges() {
        let policy = ScanPolicy {
            read_probe: vec![0x10..=0x12],
        };
        assert_eq!(policy.probe_kind(0x11), ProbeKind::ByteRead);
        assert_eq!(policy.probe_kind(0x50), ProbeKind::QuickWrite);
    }

    #[test]
    fn empty_bus_scans_to_an_empty_result() {
        let policy = ScanPolicy::default();
        let found: I2cResult<Vec<u8>> =
            scan_with(FIRST_ADDRESS, LAST_ADDRESS, &policy, |address, _| {
                Err(absent(address))
            })
            .collect();
        assert!(found.unwrap().is_empty());
    }

    #[test]
    fn responding_addresses_are_yielded_in_order() {
        let policy = ScanPolicy::default();
        let found: I2cResult<Vec<u8>> =
            scan_with(FIRST_ADDRESS, LAST_ADDRESS, &policy, |address, _| {
                if address == 0x40 || address == 0x58 {
                    Ok(())
                } else {
                    Err(absent(address))
                }
            })
            .collect();
        assert_eq!(found.unwrap(), vec![0x40, 0x58]);
    }

    #[test]
    fn nack_in_a_read_probe_range_is_skipped_not_raised() {
        let policy = ScanPolicy::default();
        let found: I2cResult<Vec<u8>> = scan_with(0x30, 0x37, &policy, |address, kind| {
            assert_eq!(kind, ProbeKind::ByteRead);
            Err(absent(address))
        })
        .collect();
        assert!(found.unwrap().is_empty());
    }

    #[test]
    fn the_scan_is_lazy() {
        use std::cell::Cell;

        let policy = ScanPolicy::default();
        let probed = Cell::new(0u16);
        let mut iter = scan_with(FIRST_ADDRESS, LAST_ADDRESS, &policy, |address, _| {
            probed.set(probed.get() + 1);
            if address >= 0x10 {
                Ok(())
            } else {
                Err(absent(address))
            }
        });

        // Nothing is probed until the sequence is pulled, and pulling
        // one item probes no further than its address.
        assert_eq!(probed.get(), 0);
        assert_eq!(iter.next().unwrap().unwrap(), 0x10);
        assert_eq!(probed.get(), 0x10 - FIRST_ADDRESS as u16 + 1);
    }

    #[test]
    fn fatal_errors_are_yielded_once_then_the_scan_ends() {
        let policy = ScanPolicy::default();
        let mut iter = scan_with(FIRST_ADDRESS, LAST_ADDRESS, &policy, |address, _| {
            if address == 0x10 {
                Err(I2cError::Io(std::io::Error::from_raw_os_error(libc::EACCES)))
            } else {
                Err(absent(address))
            }
        });
        assert!(matches!(iter.next(), Some(Err(I2cError::Io(_)))));
        assert!(iter.next().is_none());
    }

    #[test]
    fn inverted_and_reserved_ranges_are_invalid() {
        let policy = ScanPolicy::default();
        let no_probe = |_: u8, _: ProbeKind| Ok(());

        let mut iter = scan_with(0x50, 0x30, &policy, no_probe);
        assert!(matches!(
            iter.next(),
            Some(Err(I2cError::InvalidArgument { .. }))
        ));
        assert!(iter.next().is_none());

        let mut iter = scan_with(0x00, 0x77, &policy, no_probe);
        assert!(matches!(
            iter.next(),
            Some(Err(I2cError::InvalidArgument { .. }))
        ));
        assert!(iter.next().is_none());
    }

    #[test]
    fn scanning_a_missing_bus_fails_with_no_such_bus() {
        match I2cBus::open_path("/dev/i2c-no-such-bus") {
            Err(I2cError::NoSuchBus { .. }) => {}
            other => panic!("expected NoSuchBus, got {other:?}"),
        }
    }
}
