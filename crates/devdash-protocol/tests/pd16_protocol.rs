//! PD16 decoding and bus routing

use devdash_protocol::pd16::{PD16_BASE_ID, PD16_BLOCK_SIZE};
use devdash_protocol::prelude::*;
use devdash_protocol::{FrameSource, IoType};
use pretty_assertions::assert_eq;
use rstest::rstest;

fn value(decoded: &[DecodedChannel], name: &str) -> f64 {
    decoded
        .iter()
        .find(|(n, _)| n == name)
        .map(|(_, v)| v.value)
        .unwrap_or_else(|| panic!("missing channel {name} in {decoded:?}"))
}

#[test]
fn test_speed_pulse_input() {
    let pd16 = Pd16Protocol::new();
    let decoded = pd16.decode(0x6D3, &hex::decode("6101138802EE03E8").unwrap());
    assert_eq!(value(&decoded, "pd16_A_SPI_1_state"), 1.0);
    assert!((value(&decoded, "pd16_A_SPI_1_voltage") - 5.0).abs() < 1e-9);
    assert!((value(&decoded, "pd16_A_SPI_1_dutyCycle") - 75.0).abs() < 1e-9);
    assert_eq!(value(&decoded, "pd16_A_SPI_1_frequency"), 1000.0);
}

#[test]
fn test_25a_output() {
    let pd16 = Pd16Protocol::new();
    let decoded = pd16.decode(0x6D4, &hex::decode("00502EE03A983200").unwrap());
    assert_eq!(value(&decoded, "pd16_A_25A_0_load"), 80.0);
    assert!((value(&decoded, "pd16_A_25A_0_voltage") - 12.0).abs() < 1e-9);
    assert!((value(&decoded, "pd16_A_25A_0_currentLow") - 15.0).abs() < 1e-9);
    assert!((value(&decoded, "pd16_A_25A_0_currentHigh") - 0.05).abs() < 1e-9);
    assert_eq!(value(&decoded, "pd16_A_25A_0_retries"), 0.0);
    assert_eq!(value(&decoded, "pd16_A_25A_0_pinState"), 0.0);
}

#[test]
fn test_device_status_firmware() {
    let mut pd16 = Pd16Protocol::new();
    pd16.set_device_id(DeviceId::B);
    let decoded = pd16.decode(0x6DD, &hex::decode("10020F0300000000").unwrap());
    assert_eq!(value(&decoded, "pd16_B_status"), 1.0);
    assert!((value(&decoded, "pd16_B_firmwareVersion") - 2.1503).abs() < 1e-4);
}

#[rstest]
#[case(DeviceId::A, 0x6D0)]
#[case(DeviceId::B, 0x6D8)]
#[case(DeviceId::C, 0x6E0)]
#[case(DeviceId::D, 0x6E8)]
fn test_device_isolation(#[case] device: DeviceId, #[case] base_id: u32) {
    let pd16 = Pd16Protocol::for_device(device);
    assert_eq!(pd16.base_id(), base_id);

    let payload = hex::decode("6000000000000000").unwrap();
    assert!(!pd16.decode(base_id + 3, &payload).is_empty());
    for other in DeviceId::ALL.into_iter().filter(|d| *d != device) {
        assert!(pd16.decode(other.base_id() + 3, &payload).is_empty());
    }
    assert!(pd16.decode(0x360, &hex::decode("0DAC000000000000").unwrap()).is_empty());
}

#[test]
fn test_mux_byte() {
    assert_eq!(Pd16Protocol::mux_type(0x62), Some(IoType::SpeedPulse));
    assert_eq!(Pd16Protocol::mux_index(0x62), 2);
    assert_eq!(Pd16Protocol::mux_type(0x00), Some(IoType::Output25A));
    assert_eq!(Pd16Protocol::mux_index(0x00), 0);
}

#[test]
fn test_io_type_names() {
    let names: Vec<&str> = [
        IoType::Output25A,
        IoType::Output8A,
        IoType::HalfBridge,
        IoType::SpeedPulse,
        IoType::AnalogVoltage,
    ]
    .into_iter()
    .map(IoType::short_name)
    .collect();
    assert_eq!(names, vec!["25A", "8A", "HBO", "SPI", "AVI"]);
}

#[test]
fn test_truncated_frames_never_panic() {
    let pd16 = Pd16Protocol::new();
    let full = hex::decode("6101138802EE03E8").unwrap();
    for offset in 0..PD16_BLOCK_SIZE {
        for len in 0..=full.len() {
            pd16.decode(PD16_BASE_ID + offset, &full[..len]);
        }
    }
    assert!(pd16.decode(0x6D3, &full[..1]).is_empty());
    assert_eq!(pd16.decode(0x6D3, &full[..2]).len(), 1);
    assert_eq!(pd16.decode(0x6D3, &full[..4]).len(), 2);
    assert_eq!(pd16.decode(0x6D3, &full[..6]).len(), 3);
}

#[test]
fn test_bus_routing() {
    let bus = BusDecoder::new(HaltechProtocol::new())
        .with_pd16(DeviceId::A)
        .unwrap()
        .with_pd16(DeviceId::D)
        .unwrap();

    assert_eq!(bus.route(0x6D3), FrameSource::Pd16(DeviceId::A));
    assert_eq!(bus.route(0x6EF), FrameSource::Pd16(DeviceId::D));
    assert_eq!(bus.route(0x6DB), FrameSource::Ecu);

    let spi = bus.decode(0x6EB, &hex::decode("6101138802EE03E8").unwrap());
    assert_eq!(spi[0].0, "pd16_D_SPI_1_state");

    let engine = bus.decode(0x360, &hex::decode("0DAC01F400000000").unwrap());
    assert_eq!(value(&engine, "rpm"), 3500.0);

    assert!(matches!(
        BusDecoder::default()
            .with_pd16(DeviceId::B)
            .and_then(|b| b.with_pd16(DeviceId::B)),
        Err(ProtocolError::DuplicateDevice('B'))
    ));
}
