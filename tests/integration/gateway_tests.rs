//! End-to-end tests: Gateway → frames → mock controller → reader thread
//! → profile state and driver data.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use linkmux::Error;
use linkmux::app::events::LinkEvent;
use linkmux::drivers::color::Channel;
use linkmux::drivers::digital::DigitalGeneric;
use linkmux::drivers::mcu::McuDriver;
use linkmux::profile::{ProfileState, WaitPhase};
use linkmux::rpc::schema::{
    DigitalCommand, Level, McuAction, PinMode, ProfileCommand, ProfileConfig, Request,
    Response, ResponseCode, StepMode, UartCommand, UartPort,
};

use crate::mock_device::{
    FIRMWARE_VERSION, Harness, firmware, harness, harness_with, test_config,
};

const SETTLE: Duration = Duration::from_secs(2);

fn registered(h: &Harness, id: u8, config: ProfileConfig) {
    h.gateway.add_profile(id, config);
    h.gateway.register(id).unwrap();
    assert_eq!(h.gateway.await_idle(id).unwrap(), ProfileState::Idle);
}

// ── Registration ──────────────────────────────────────────────

#[test]
fn registration_sends_config_and_reaches_idle() {
    let h = harness(Box::new(firmware));
    let config = ProfileConfig::DigitalGeneric {
        pin: 13,
        mode: PinMode::Output,
    };
    h.gateway.add_profile(3, config.clone());
    assert_eq!(h.gateway.state(3), Some(ProfileState::Unregistered));

    h.gateway.register(3).unwrap();
    assert_eq!(h.gateway.await_idle(3).unwrap(), ProfileState::Idle);

    let requests = h.device.requests();
    assert_eq!(requests.len(), 1);
    match &requests[0] {
        Request::Registration(r) => {
            assert_eq!(r.profile_id, 3);
            assert_eq!(r.config, config);
        }
        other => panic!("expected registration, got {:?}", other),
    }
}

#[test]
fn register_all_walks_configured_profiles_in_order() {
    let h = harness(Box::new(firmware));
    let mut config = test_config();
    config.profiles = vec![
        linkmux::config::ProfileSpec {
            id: 7,
            driver: ProfileConfig::McuDriver,
        },
        linkmux::config::ProfileSpec {
            id: 2,
            driver: ProfileConfig::ColorSensor,
        },
    ];
    h.gateway.add_configured_profiles(&config.profiles);
    h.gateway.register_all().unwrap();

    let ids: Vec<u8> = h.device.requests().iter().map(Request::profile_id).collect();
    assert_eq!(ids, vec![7, 2]);
}

#[test]
fn registration_without_reply_times_out_and_stays_unregistered() {
    let h = harness(Box::new(|_| Vec::new()));
    h.gateway.add_profile(1, ProfileConfig::StepMotor);

    let err = h.gateway.register(1).unwrap_err();
    assert_eq!(
        err,
        Error::Timeout {
            profile_id: 1,
            phase: WaitPhase::Registration
        }
    );
    assert_eq!(h.gateway.state(1), Some(ProfileState::Unregistered));
    assert!(h.events.events().contains(&LinkEvent::Timeout {
        profile_id: 1,
        phase: WaitPhase::Registration
    }));

    // The controller never accepted it, so no action reaches the wire.
    assert_eq!(
        h.gateway.step_motor_steps(1, 100, 500, true).unwrap_err(),
        Error::NotRegistered(1)
    );
    assert_eq!(
        h.device.wait_for_requests(2, Duration::from_millis(50)).len(),
        1
    );
}

// ── Digital ───────────────────────────────────────────────────

#[test]
fn write_digital_records_pin_state_after_ack() {
    let h = harness(Box::new(firmware));
    registered(
        &h,
        1,
        ProfileConfig::DigitalGeneric {
            pin: 13,
            mode: PinMode::Output,
        },
    );

    h.gateway.write_digital(1, Level::High).unwrap();

    let profile = h.gateway.profile(1).unwrap();
    let level = profile
        .with_driver::<DigitalGeneric, _>(|d| d.pin_state())
        .unwrap();
    assert_eq!(level, Some(Level::High));

    let requests = h.device.requests();
    assert!(matches!(
        &requests[1],
        Request::Action(a) if a.command == ProfileCommand::Digital(DigitalCommand::Write(Level::High))
    ));
}

/// Every `StateChanged` recorded for `id`, in emission order.
fn state_changes(h: &Harness, id: u8) -> Vec<(ProfileState, ProfileState)> {
    h.events
        .events()
        .into_iter()
        .filter_map(|e| match e {
            LinkEvent::StateChanged {
                profile_id,
                from,
                to,
            } if profile_id == id => Some((from, to)),
            _ => None,
        })
        .collect()
}

fn wait_for_changes(h: &Harness, id: u8, count: usize) -> Vec<(ProfileState, ProfileState)> {
    let deadline = Instant::now() + SETTLE;
    loop {
        let changes = state_changes(h, id);
        if changes.len() >= count || Instant::now() >= deadline {
            return changes;
        }
        thread::sleep(Duration::from_millis(2));
    }
}

#[test]
fn digital_write_walks_blocking_waiting_idle_in_order() {
    use ProfileState::{Blocking, Idle, Unregistered, Waiting};

    // Registration is answered by the script; the write is answered by hand.
    let h = Arc::new(harness(Box::new(|req: &Request| {
        if req.is_registration() {
            firmware(req)
        } else {
            Vec::new()
        }
    })));
    registered(
        &h,
        1,
        ProfileConfig::DigitalGeneric {
            pin: 13,
            mode: PinMode::Output,
        },
    );
    assert_eq!(
        wait_for_changes(&h, 1, 2),
        vec![(Unregistered, Waiting), (Waiting, Idle)]
    );

    let profile = h.gateway.profile(1).unwrap();
    let pin_state = || {
        profile
            .with_driver::<DigitalGeneric, _>(|d| d.pin_state())
            .unwrap()
    };
    assert_eq!(pin_state(), None);

    let writer = {
        let h = Arc::clone(&h);
        thread::spawn(move || h.gateway.write_digital(1, Level::High))
    };
    h.device.wait_for_requests(2, SETTLE);
    assert_eq!(h.gateway.state(1), Some(Blocking));
    assert_eq!(pin_state(), None);

    h.device.ack(1);
    writer.join().unwrap().unwrap();
    assert_eq!(h.gateway.state(1), Some(Waiting));

    h.device.data(1, &[]);
    assert_eq!(h.gateway.await_idle(1).unwrap(), Idle);
    assert_eq!(pin_state(), Some(Level::High));

    assert_eq!(
        wait_for_changes(&h, 1, 5),
        vec![
            (Unregistered, Waiting),
            (Waiting, Idle),
            (Idle, Blocking),
            (Blocking, Waiting),
            (Waiting, Idle),
        ]
    );
}

#[test]
fn toggle_digital_alternates_levels() {
    let h = harness(Box::new(firmware));
    registered(
        &h,
        1,
        ProfileConfig::DigitalGeneric {
            pin: 13,
            mode: PinMode::Output,
        },
    );

    assert_eq!(h.gateway.toggle_digital(1).unwrap(), Level::High);
    h.gateway.await_idle(1).unwrap();
    assert_eq!(h.gateway.toggle_digital(1).unwrap(), Level::Low);
}

#[test]
fn read_digital_returns_reported_level() {
    let h = harness(Box::new(firmware));
    registered(
        &h,
        4,
        ProfileConfig::DigitalGeneric {
            pin: 2,
            mode: PinMode::InputPullup,
        },
    );
    assert_eq!(h.gateway.read_digital(4).unwrap(), Level::High);
    assert_eq!(h.gateway.state(4), Some(ProfileState::Idle));
}

#[test]
fn action_on_unregistered_profile_is_rejected_without_writing() {
    let h = harness(Box::new(firmware));
    h.gateway.add_profile(1, DigitalGeneric::new(13, PinMode::Output));

    let err = h.gateway.write_digital(1, Level::High).unwrap_err();
    assert_eq!(err, Error::NotRegistered(1));
    assert!(h.device.wait_for_requests(1, Duration::from_millis(50)).is_empty());
}

#[test]
fn wrong_kind_operation_is_a_kind_mismatch() {
    let h = harness(Box::new(firmware));
    registered(&h, 5, ProfileConfig::ColorSensor);

    let err = h.gateway.write_digital(5, Level::Low).unwrap_err();
    assert!(matches!(err, Error::KindMismatch { profile_id: 5, .. }));
}

#[test]
fn unknown_profile_operation_fails() {
    let h = harness(Box::new(firmware));
    assert_eq!(
        h.gateway.write_digital(42, Level::High).unwrap_err(),
        Error::UnknownProfile(42)
    );
}

// ── Queries ───────────────────────────────────────────────────

#[test]
fn mcu_version_and_ram_queries() {
    let h = harness(Box::new(firmware));
    registered(&h, 9, ProfileConfig::McuDriver);

    assert_eq!(h.gateway.mcu_version(9).unwrap(), FIRMWARE_VERSION);

    let ram = h.gateway.mcu_ram(9).unwrap();
    assert_eq!(ram.total, 8192);
    assert_eq!(ram.free, 4096);
    assert_eq!(ram.used(), 4096);

    let profile = h.gateway.profile(9).unwrap();
    let version = profile
        .with_driver::<McuDriver, _>(|d| d.version().map(str::to_owned))
        .unwrap();
    assert_eq!(version.as_deref(), Some(FIRMWARE_VERSION));
}

#[test]
fn mcu_reset_is_fire_and_forget() {
    let h = harness(Box::new(firmware));
    registered(&h, 9, ProfileConfig::McuDriver);
    h.gateway.mcu_reset(9).unwrap();

    let requests = h.device.wait_for_requests(2, SETTLE);
    assert!(matches!(
        &requests[1],
        Request::Action(a) if a.command == ProfileCommand::Mcu(McuAction::Reset)
    ));
}

#[test]
fn color_read_reorders_payload() {
    let h = harness(Box::new(firmware));
    registered(&h, 6, ProfileConfig::ColorSensor);

    let rgb = h.gateway.read_color(6).unwrap();
    assert_eq!((rgb.r, rgb.g, rgb.b), (200, 40, 10));
    assert_eq!(rgb.dominant(), Channel::Red);
}

#[test]
fn ultrasonic_distance_is_big_endian() {
    let h = harness(Box::new(firmware));
    registered(&h, 8, ProfileConfig::UltrasonicSensor { pin: 5 });
    assert_eq!(h.gateway.measure_distance(8).unwrap(), 300);
}

#[test]
fn query_without_completion_times_out_and_faults() {
    let h = harness(Box::new(|req: &Request| {
        let ack = Response::new(ResponseCode::Ack, req.profile_id(), vec![]);
        if req.is_registration() {
            vec![ack.clone(), Response::new(ResponseCode::Data, req.profile_id(), vec![])]
        } else {
            vec![ack]
        }
    }));
    registered(&h, 8, ProfileConfig::UltrasonicSensor { pin: 5 });

    let err = h.gateway.measure_distance(8).unwrap_err();
    assert_eq!(
        err,
        Error::Timeout {
            profile_id: 8,
            phase: WaitPhase::Completion
        }
    );
    assert_eq!(h.gateway.state(8), Some(ProfileState::Faulted));

    // A late completion still resolves the profile.
    h.device.data(8, &[0x00, 0x40]);
    assert!(h.events.wait_for(SETTLE, |e| *e
        == LinkEvent::StateChanged {
            profile_id: 8,
            from: ProfileState::Faulted,
            to: ProfileState::Idle,
        }));
}

// ── UART and step motor ───────────────────────────────────────

#[test]
fn uart_queue_drains_in_order() {
    let h = harness(Box::new(firmware));
    registered(
        &h,
        10,
        ProfileConfig::UartTtlGeneric {
            port: UartPort::Uart2,
            baudrate: 9600,
        },
    );

    h.gateway
        .queue_uart_commands(
            10,
            ["AT", "AT+GMR"].map(|c| UartCommand {
                command: c.into(),
                event_triggered: false,
            }),
        )
        .unwrap();

    assert!(h.gateway.send_next_uart(10).unwrap());
    h.gateway.await_idle(10).unwrap();
    assert_eq!(h.gateway.uart_response(10).unwrap().as_deref(), Some("OK AT"));

    assert!(h.gateway.send_next_uart(10).unwrap());
    h.gateway.await_idle(10).unwrap();
    assert_eq!(
        h.gateway.uart_response(10).unwrap().as_deref(),
        Some("OK AT+GMR")
    );

    assert!(!h.gateway.send_next_uart(10).unwrap());
}

#[test]
fn step_motor_speed_sends_unit_direction() {
    let h = harness(Box::new(firmware));
    registered(&h, 11, ProfileConfig::StepMotor);

    h.gateway.step_motor_speed(11, -40, 800, false).unwrap();
    h.gateway.await_idle(11).unwrap();

    let requests = h.device.requests();
    match &requests[1] {
        Request::Action(a) => match &a.command {
            ProfileCommand::Step(cmd) => assert_eq!(cmd.mode, StepMode::Direction(-1)),
            other => panic!("unexpected command {:?}", other),
        },
        other => panic!("unexpected request {:?}", other),
    }
}

// ── Controller reports ────────────────────────────────────────

#[test]
fn device_error_and_debug_do_not_change_state() {
    let h = harness(Box::new(firmware));
    registered(&h, 1, ProfileConfig::ColorSensor);

    h.device
        .send(&Response::new(ResponseCode::Error, 1, b"sensor missing".to_vec()));
    h.device
        .send(&Response::new(ResponseCode::Debug, 1, b"tick".to_vec()));

    assert!(h.events.wait_for(SETTLE, |e| matches!(
        e,
        LinkEvent::Debug { profile_id: 1, message } if message == "tick"
    )));
    assert!(h.events.events().contains(&LinkEvent::DeviceError {
        profile_id: 1,
        message: "sensor missing".into(),
    }));
    assert_eq!(h.gateway.state(1), Some(ProfileState::Idle));
}

#[test]
fn response_for_unknown_id_is_reported() {
    let h = harness(Box::new(firmware));
    h.device.ack(99);
    assert!(h.events.wait_for(SETTLE, |e| *e
        == LinkEvent::UnknownProfile {
            profile_id: 99,
            code: ResponseCode::Ack,
        }));
}

#[test]
fn garbage_between_frames_is_skipped() {
    let h = harness(Box::new(firmware));
    registered(&h, 1, ProfileConfig::ColorSensor);

    h.device.raw(&[0xde, 0xad, 0x00]);
    assert!(h.events.wait_for(SETTLE, |e| matches!(e, LinkEvent::MalformedFrame { .. })));

    // The link still works afterwards.
    assert_eq!(h.gateway.read_color(1).unwrap().r, 200);
}

// ── Registry ──────────────────────────────────────────────────

#[test]
fn replacing_a_profile_emits_replaced() {
    let h = harness(Box::new(firmware));
    h.gateway.add_profile(3, ProfileConfig::ColorSensor);
    h.gateway.add_profile(3, ProfileConfig::StepMotor);

    assert!(h.events.events().contains(&LinkEvent::Replaced {
        profile_id: 3,
        old_kind: "color",
        new_kind: "step_motor",
    }));
    assert_eq!(h.gateway.registry().len(), 1);
    assert_eq!(h.gateway.profile(3).unwrap().kind(), "step_motor");
}

#[test]
fn removed_profile_is_unknown() {
    let h = harness(Box::new(firmware));
    registered(&h, 3, ProfileConfig::ColorSensor);
    assert!(h.gateway.remove_profile(3).is_some());
    assert_eq!(h.gateway.read_color(3).unwrap_err(), Error::UnknownProfile(3));
}

#[test]
fn invalid_config_is_rejected_at_start() {
    let mut config = test_config();
    config.max_frame_size = 4;
    let (host, _device) = crate::mock_device::link();
    let result = linkmux::Gateway::start(
        host.clone(),
        host,
        &config,
        Arc::new(linkmux::app::ports::NullSink),
    );
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn zero_ack_timeout_waits_for_slow_controller() {
    let mut config = test_config();
    config.ack_timeout_ms = 0;
    let h = harness_with(
        &config,
        Box::new(|req: &Request| {
            if !req.is_registration() {
                thread::sleep(Duration::from_millis(100));
            }
            firmware(req)
        }),
    );
    registered(&h, 1, ProfileConfig::StepMotor);
    h.gateway.step_motor_steps(1, 200, 500, true).unwrap();
    h.gateway.await_idle(1).unwrap();
}
