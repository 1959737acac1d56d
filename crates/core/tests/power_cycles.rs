use sysoff_config::{BoardProfile, CorruptSpec, CycleStep, WakeSource, WakeupStrategy};
use sysoff_core::app::BootOutcome;
use sysoff_core::device::{Device, PowerState, StepOutcome};
use sysoff_core::{Pin, PortDomain};

fn device() -> Device {
    Device::new(BoardProfile::nrf54l15dk()).unwrap()
}

fn press(switch: WakeSource) -> CycleStep {
    CycleStep::Press { switch }
}

fn booted(outcome: StepOutcome) -> Box<sysoff_core::app::BootReport> {
    match outcome {
        StepOutcome::Booted(report) => report,
        other => panic!("expected a boot, got {:?}", other),
    }
}

#[test]
fn test_first_boot_resets_and_counts_once() {
    let mut dev = device();
    let report = dev.power_on().clone();

    assert!(!report.retained_valid);
    assert_eq!(report.outcome, BootOutcome::SystemOff);
    assert!(report.console.contains(&"Retained data: INVALID".to_string()));
    assert!(report.console.contains(&"Boot count: 1".to_string()));
    assert!(report.console.contains(&"Off count: 0".to_string()));

    let record = dev.retained();
    assert_eq!(record.boots, 1);
    assert_eq!(record.off_count, 1);
    assert!(record.is_valid());
}

#[test]
fn test_counters_track_cycles() {
    let mut dev = device();
    dev.power_on();
    let switches = [
        WakeSource::Sw0,
        WakeSource::Sw1,
        WakeSource::Sw2,
        WakeSource::Sw3,
    ];
    let mut last_uptime = dev.retained().uptime_sum;
    for n in 2..=9u32 {
        let report = booted(dev.apply(&press(switches[n as usize % 4])).unwrap());
        assert!(report.retained_valid);
        assert_eq!(report.record.boots, n);
        assert_eq!(report.record.off_count, n);
        assert!(report.record.uptime_sum > last_uptime);
        last_uptime = report.record.uptime_sum;
    }
    assert_eq!(dev.history().len(), 9);
}

#[test]
fn test_sw1_wake_end_to_end() {
    let mut dev = device();
    dev.power_on();

    let report = booted(dev.apply(&press(WakeSource::Sw1)).unwrap());
    let event = report.event.clone().unwrap();
    assert_eq!(event.mask(PortDomain(1)), 1 << 9);
    assert_eq!(event.mask(PortDomain(0)), 0);
    assert_eq!(event.resolution.source, Some(WakeSource::Sw1));
    assert_eq!(event.resolution.pulses, 2);

    assert_eq!(
        &report.console[..4],
        [
            "nrf54l15dk system off demo",
            "LATCH REGISTER FOR P0: 0",
            "LATCH REGISTER FOR P1: 512",
            "WAKEUP SRC: SW1",
        ]
    );

    for port in dev.board().ports() {
        assert_eq!(port.dev.latch(), 0, "{} latch not cleared", port.id);
    }
    // LED ends the blink off.
    assert!(!dev.board().output_level(Pin::new(2, 9)));
}

#[test]
fn test_sw3_on_p0() {
    let mut dev = device();
    dev.power_on();
    let report = booted(dev.apply(&press(WakeSource::Sw3)).unwrap());
    assert!(report.console.contains(&"LATCH REGISTER FOR P0: 16".to_string()));
    assert!(report.console.contains(&"WAKEUP SRC: SW3".to_string()));
    assert_eq!(report.event.as_ref().unwrap().resolution.pulses, 4);
}

#[test]
fn test_timer_wake_resolves_unknown() {
    let mut profile = BoardProfile::nrf54l15dk();
    profile.wakeup = WakeupStrategy::Timer { seconds: 2 };
    let mut dev = Device::new(profile).unwrap();

    let first = dev.power_on().clone();
    assert_eq!(
        first.console.last().map(String::as_str),
        Some("Entering system off; wait 2 seconds to restart")
    );

    // Switches are not armed in timer mode.
    assert!(matches!(
        dev.apply(&press(WakeSource::Sw0)).unwrap(),
        StepOutcome::StayedOff
    ));

    let report = booted(dev.apply(&CycleStep::Timer).unwrap());
    assert!(report.console.contains(&"WAKEUP SRC: unknown".to_string()));
    assert_eq!(report.record.boots, 2);
    assert!(dev.board().grtc.syscounter_us() >= 2_000_000);
}

#[test]
fn test_timer_unavailable_still_powers_off() {
    let mut profile = BoardProfile::nrf54l15dk();
    profile.wakeup = WakeupStrategy::Timer { seconds: 2 };
    let mut dev = Device::new(profile).unwrap();
    dev.board_mut().grtc.set_unavailable(true);

    let report = dev.power_on().clone();
    assert!(report
        .console
        .contains(&"Unable to prepare GRTC as a wake up source (err = -134).".to_string()));
    assert_eq!(report.outcome, BootOutcome::SystemOff);
    assert_eq!(dev.retained().off_count, 1);
}

#[test]
fn test_pin_fault_skips_remaining_wake_pins() {
    let mut dev = device();
    // SW1 is the second switch configured; SW2 and SW3 must stay unarmed.
    dev.board_mut().inject_pin_fault(Pin::new(1, 9));
    let report = dev.power_on().clone();

    assert!(report
        .console
        .contains(&"Could not configure sw1 GPIO (-5)".to_string()));
    assert_eq!(
        report.console.last().map(String::as_str),
        Some("Entering system off; press any switch to restart")
    );
    assert_eq!(report.outcome, BootOutcome::SystemOff);

    assert!(matches!(
        dev.apply(&press(WakeSource::Sw2)).unwrap(),
        StepOutcome::StayedOff
    ));
    assert!(matches!(
        dev.apply(&press(WakeSource::Sw3)).unwrap(),
        StepOutcome::StayedOff
    ));
    let report = booted(dev.apply(&press(WakeSource::Sw0)).unwrap());
    assert!(report.console.contains(&"WAKEUP SRC: SW0".to_string()));
}

#[test]
fn test_suspend_failure_halts_without_off_count() {
    let mut dev = device();
    dev.board_mut().console.set_refuse_suspend(true);
    let report = dev.power_on().clone();

    assert!(matches!(report.outcome, BootOutcome::Halted(_)));
    assert!(report
        .console
        .contains(&"Could not suspend console (-16)".to_string()));
    assert_eq!(dev.power_state(), PowerState::Halted);

    let record = dev.retained();
    assert_eq!(record.boots, 1);
    assert_eq!(record.off_count, 0);
    assert!(record.is_valid());

    assert!(matches!(
        dev.apply(&press(WakeSource::Sw0)).unwrap(),
        StepOutcome::Ignored
    ));
}

#[test]
fn test_corruption_detected_on_next_boot() {
    let mut dev = device();
    dev.power_on();
    dev.apply(&press(WakeSource::Sw0)).unwrap();

    dev.apply(&CycleStep::Corrupt(CorruptSpec {
        offset: 8,
        xor: 0x01,
    }))
    .unwrap();
    let report = booted(dev.apply(&press(WakeSource::Sw0)).unwrap());

    assert!(!report.retained_valid);
    assert!(report.console.contains(&"Retained data: INVALID".to_string()));
    assert_eq!(report.record.boots, 1);
    assert_eq!(report.record.off_count, 1);
}

#[test]
fn test_power_loss_starts_over() {
    let mut dev = device();
    dev.power_on();
    dev.apply(&press(WakeSource::Sw1)).unwrap();
    assert_eq!(dev.retained().boots, 2);

    let report = booted(dev.apply(&CycleStep::PowerLoss).unwrap());
    assert!(!report.retained_valid);
    assert!(report.console.contains(&"WAKEUP SRC: unknown".to_string()));
    assert_eq!(dev.retained().boots, 1);
}

#[test]
fn test_idle_changes_nothing() {
    let mut dev = device();
    dev.power_on();
    let before = dev.retained();
    dev.run_steps(&[CycleStep::Idle, CycleStep::Idle]).unwrap();
    assert_eq!(dev.retained(), before);
    assert_eq!(dev.power_state(), PowerState::Off);
}
