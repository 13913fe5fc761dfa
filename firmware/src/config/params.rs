//! ボード固有のハードウェア設定パラメータ
//!
//! 測定アルゴリズムの定数は `field_mill::config` 側にあります。

use embassy_stm32::time::Hertz;

/// ADC（MCP3301）SPI設定
pub mod adc {
    use super::Hertz;

    /// SPIクロック（MCP3301 @3.3V の上限付近）
    pub const SPI_FREQUENCY: Hertz = Hertz(1_700_000);
}

/// チョッパーモーターPWM設定
pub mod pwm {
    use super::Hertz;

    /// PWM周波数
    pub const FREQUENCY: Hertz = Hertz(field_mill::config::motor::PWM_FREQUENCY_HZ);
}

/// 割り込み優先度（上位4bitが有効、小さいほど高優先）
pub mod irq {
    /// ローターエッジ（EXTI9_5）：タイムスタンプ精度優先で最高位
    pub const ROTOR_EDGE_PRIORITY: u8 = 0x10;

    /// サンプリングアラーム（TIM3）
    pub const SAMPLING_ALARM_PRIORITY: u8 = 0x20;
}

/// オシロスコープ確認用出力（GPIOA）
pub mod scope {
    /// ローター位置ビットのエコー（エッジ割り込みから直接書く）
    pub const POSITION_ECHO_PIN: usize = 5;
}

/// ローターインタラプタ入力ピン番号（GPIOB）
pub const ROTOR_INPUT_PIN: usize = 8;

/// 状態ログ出力周期 [ms]
pub const STATUS_LOG_PERIOD_MS: u64 = 1000;
