//! ADC取得タスク
//!
//! サンプリングトリガーごとにデッドタイムを確認し、MCP3301を1回読み出します。

use core::cell::RefCell;

use embassy_embedded_hal::shared_bus::blocking::spi::SpiDevice;
use embassy_stm32::{gpio::Output, mode::Blocking, spi::Spi};
use embassy_sync::blocking_mutex::{raw::NoopRawMutex, Mutex};

use crate::mill_tim::PhaseCounter;
use crate::state::FIELD_MILL;

/// MCP3301 が接続された SPI バス
pub type AdcSpiBus = Mutex<NoopRawMutex, RefCell<Spi<'static, Blocking>>>;

/// MCP3301（CS付きSPIデバイス）
pub type AdcDevice = SpiDevice<'static, NoopRawMutex, Spi<'static, Blocking>, Output<'static>>;

/// ADC取得タスク
///
/// # Arguments
/// * `gate_pin` - ゲート判定の出力（使用可能で High）
/// * `sample_pin` - 読み取りごとに反転する出力
#[embassy_executor::task]
pub async fn acquisition_task(
    adc: AdcDevice,
    gate_pin: Output<'static>,
    sample_pin: Output<'static>,
) {
    FIELD_MILL
        .acquisition(PhaseCounter, adc)
        .with_debug_pins(gate_pin, sample_pin)
        .run(FIELD_MILL.triggers())
        .await;
}
