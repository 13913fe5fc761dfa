#![no_std]
#![no_main]

mod fmt;

mod config;
mod hardware;
mod mill_tim;
mod state;
mod tasks;

#[cfg(not(feature = "defmt"))]
use panic_halt as _;
#[cfg(feature = "defmt")]
use {defmt_rtt as _, panic_probe as _};

use core::cell::RefCell;

use embassy_embedded_hal::shared_bus::blocking::spi::SpiDevice;
use embassy_executor::Spawner;
use embassy_stm32::gpio::{Level, Output, Speed};
use embassy_sync::blocking_mutex::Mutex;
use embassy_time::{Duration, Timer};
use static_cell::StaticCell;

use mill_tim::SamplingAlarm;
use state::{CONFIG_STORE, FIELD_MILL};
use tasks::{
    acquisition::AdcSpiBus, acquisition_task, motor_control_task, rotor_speed_task, signal_task,
    status_task,
};

static ADC_SPI_BUS: StaticCell<AdcSpiBus> = StaticCell::new();

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    // ハードウェア初期化
    let config = hardware::create_clock_config();
    let p = embassy_stm32::init(config);

    info!("═══════════════════════════════════════════════════════");
    info!("   Electrostatic Field Mill • STM32G431VB @ 160MHz");
    info!("═══════════════════════════════════════════════════════");

    // 設定・キャリブレーションテーブル読み込み（タスク起動前）
    info!("Loading configuration...");
    let settings = FIELD_MILL.init(&CONFIG_STORE);

    // センサー有効LED（PC13）
    let valid_led = Output::new(p.PC13, Level::Low, Speed::Low);

    // MCP3301 SPI（PB12=CS、PB13=SCK、PB14=MISO）
    let spi = hardware::create_adc_spi(p.SPI2, p.PB13, p.PB14);
    let spi_bus = ADC_SPI_BUS.init(Mutex::new(RefCell::new(spi)));
    let adc = SpiDevice::new(spi_bus, hardware::create_adc_cs(p.PB12));

    // スコープ確認用出力（PA6、PA7）
    let (gate_pin, sample_pin) = hardware::create_scope_pins(p.PA6, p.PA7);

    // チョッパーモーターPWM（TIM1_CH1 = PA8）
    let motor_pwm = hardware::create_motor_pwm(p.TIM1, p.PA8);

    // タスク起動（割り込みより先に消費側を用意）
    spawner.spawn(rotor_speed_task(valid_led)).unwrap();
    spawner.spawn(signal_task()).unwrap();
    spawner.spawn(acquisition_task(adc, gate_pin, sample_pin)).unwrap();
    spawner.spawn(motor_control_task(motor_pwm)).unwrap();
    spawner.spawn(status_task()).unwrap();

    // TIM2/TIM3/EXTI8 初期化、サンプリング開始
    unsafe {
        hardware::init_mill_timers();
    }
    FIELD_MILL
        .sampling_trigger(SamplingAlarm)
        .set_sampling_rate(settings.sampling_rate_hz);

    info!("Field mill running");

    // メインループ（将来の拡張用）
    loop {
        Timer::after(Duration::from_millis(1000)).await;
    }
}
