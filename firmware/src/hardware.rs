//! ハードウェア初期化モジュール
//!
//! ペリフェラルの初期化ロジックを集約します。

use embassy_stm32::{
    gpio::{Level, Output, OutputType, Speed},
    mode::Blocking,
    peripherals,
    spi::{self, Spi},
    timer::{low_level::CountingMode, simple_pwm::PwmPin, simple_pwm::SimplePwm},
    Config, Peri,
};

use crate::config;
use crate::mill_tim;

/// RCCクロック設定を初期化
///
/// HSI → PLL（÷4 × 80 ÷ 2）で160MHz生成（タイマークロック 160MHz）
pub fn create_clock_config() -> Config {
    let mut config = Config::default();
    {
        use embassy_stm32::rcc::{Pll, PllMul, PllPreDiv, PllRDiv, PllSource, Sysclk};

        config.rcc.hsi = true;
        config.rcc.pll = Some(Pll {
            source: PllSource::HSI,
            prediv: PllPreDiv::DIV4,
            mul: PllMul::MUL80,
            divp: None,
            divq: None,
            divr: Some(PllRDiv::DIV2),
        });
        config.rcc.sys = Sysclk::PLL1_R; // システムクロックをPLLに設定
    }
    config
}

/// MCP3301 用 SPI2 を初期化（受信のみ、PB13=SCK、PB14=MISO）
pub fn create_adc_spi(
    spi2: Peri<'static, peripherals::SPI2>,
    sck: Peri<'static, peripherals::PB13>,
    miso: Peri<'static, peripherals::PB14>,
) -> Spi<'static, Blocking> {
    let mut spi_config = spi::Config::default();
    spi_config.frequency = config::adc::SPI_FREQUENCY;
    spi_config.mode = spi::MODE_0;
    Spi::new_blocking_rxonly(spi2, sck, miso, spi_config)
}

/// MCP3301 チップセレクト（PB12、アクティブLow）
pub fn create_adc_cs(cs: Peri<'static, peripherals::PB12>) -> Output<'static> {
    Output::new(cs, Level::High, Speed::VeryHigh)
}

/// ADC取得のスコープ確認用出力（PA6 = ゲート判定、PA7 = 読み取りごとに反転）
pub fn create_scope_pins(
    gate: Peri<'static, peripherals::PA6>,
    sample: Peri<'static, peripherals::PA7>,
) -> (Output<'static>, Output<'static>) {
    (
        Output::new(gate, Level::Low, Speed::VeryHigh),
        Output::new(sample, Level::Low, Speed::VeryHigh),
    )
}

/// チョッパーモーターPWM（TIM1_CH1 = PA8）
pub fn create_motor_pwm(
    tim1: Peri<'static, peripherals::TIM1>,
    pin: Peri<'static, peripherals::PA8>,
) -> SimplePwm<'static, peripherals::TIM1> {
    SimplePwm::new(
        tim1,
        Some(PwmPin::new(pin, OutputType::PushPull)),
        None,
        None,
        None,
        config::pwm::FREQUENCY,
        CountingMode::EdgeAlignedUp,
    )
}

/// フィールドミル用タイマーとローター入力の初期化
///
/// TIM2（フリーランカウンタ）、TIM3（サンプリングアラーム）、PB8（EXTI8）、PA5（位置エコー）
///
/// # Safety
/// PACを使用した直接レジスタ操作を含む
pub unsafe fn init_mill_timers() {
    info!("Initializing TIM2 phase counter, TIM3 sampling alarm, EXTI8 rotor input...");
    mill_tim::init_phase_counter();
    mill_tim::init_sampling_alarm();
    mill_tim::init_position_echo();
    mill_tim::init_rotor_input();
    info!("Field mill timers initialized");
}
