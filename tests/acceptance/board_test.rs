//! Board bring-up from a configuration file.

use bsp_common::config::BoardConfig;
use bsp_common::error::BspError;
use bsp_common::state::TimeBaseState;
use bsp_drivers::psram::{MR4, MR8, READ_REG_CMD, WRITE_REG_CMD};
use bsp_drivers::{Board, SimulatedBoard, SimulatedPin, SimulatedUart, SimulatedXspi, UserLed};
use bsp_timebase::{SimulatedTimer, SimulationMode, TickSource, TimeBase};
use std::io::Write;
use tempfile::NamedTempFile;

const BOARD_TOML: &str = r#"
[timebase]
tick_priority = 7
nvic_priority_bits = 4

[clock]
pclk1_hz = 100000000
apb1_divider = "div4"
timer_prescaler = true

[psram]
enabled = true
mr8 = [0x4B, 0x10]
mr4 = [0x20, 0x4B]
mapped_timeout_cycles = 52

[daemon]
blink_period = "100ms"
status_interval = "2s"
"#;

fn config_file() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(BOARD_TOML.as_bytes()).unwrap();
    file
}

#[test]
fn test_bring_up_from_file() {
    let file = config_file();
    let config = BoardConfig::from_file(file.path()).unwrap();
    assert_eq!(config.daemon.blink_period.as_millis(), 100);

    // Div4 with the timer prescaler set runs the timer at 4x pclk1
    let timer = SimulatedTimer::new(
        config.clock.clone(),
        SimulationMode::Stepped { ticks_per_read: 2 },
    );
    let tb = TimeBase::init(timer, &config.timebase).unwrap();
    assert_eq!(tb.timer().setup().prescaler, 399);
    assert_eq!(tb.timer().counter_hz(), 1_000_000);
    assert_eq!(tb.priority(), 7);

    let (mut board, pins, uart) = SimulatedBoard::simulated();
    board.init(&config.psram).unwrap();
    assert!(board.psram_ready());
    let bus = board.psram.bus();
    assert_eq!(bus.register(MR8), Some([0x4B, 0x10]));
    assert_eq!(bus.register(MR4), Some([0x20, 0x4B]));
    assert_eq!(bus.memory_mapped_config().unwrap().timeout_cycles, 0x34);

    for led in UserLed::ALL {
        board.leds.set(led, true);
        tb.delay_ms(1);
        board.leds.set(led, false);
    }
    assert!(pins.iter().all(|p| p.writes() == 3 && !p.is_high()));

    board
        .console
        .writeln_crlf(format_args!("t={}", tb.raw_ticks()))
        .unwrap();
    let text = uart.captured_text();
    assert!(text.starts_with("t="));
    assert!(text.ends_with("us\r\n"));
}

#[test]
fn test_psram_verify_failure_leaves_time_base_running() {
    let config = BoardConfig::default();
    let tb = TimeBase::init(
        SimulatedTimer::stepped(config.clock.clone()),
        &config.timebase,
    )
    .unwrap();

    let mut bus = SimulatedXspi::new(WRITE_REG_CMD, READ_REG_CMD);
    bus.set_read_only(MR8);
    let pins: [SimulatedPin; 4] = Default::default();
    let mut board = Board::new(bus, pins, SimulatedUart::new());

    let err = board.init(&config.psram).unwrap_err();
    assert!(matches!(err, BspError::RegisterVerify { register: 8, .. }));
    assert!(!board.psram_ready());
    assert!(board.psram.bus().write_config().is_none());

    assert_eq!(tb.state(), TimeBaseState::Running);
    tb.timer().advance(70_000);
    assert_eq!(tb.raw_ticks().ticks(), 70_000);
}

#[test]
fn test_invalid_priority_from_file_is_rejected() {
    let mut config = BoardConfig::from_toml(BOARD_TOML).unwrap();
    config.timebase.nvic_priority_bits = 2;
    let err = TimeBase::init(SimulatedTimer::stepped(config.clock.clone()), &config.timebase)
        .unwrap_err();
    assert_eq!(
        err,
        BspError::InvalidPriority {
            priority: 7,
            levels: 4,
        }
    );
}

#[test]
fn test_round_trip_default_config() {
    let toml = BoardConfig::default().to_toml().unwrap();
    let parsed = BoardConfig::from_toml(&toml).unwrap();
    assert_eq!(parsed.timebase, BoardConfig::default().timebase);
    assert_eq!(parsed.psram, BoardConfig::default().psram);
}
