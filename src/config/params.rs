//! フィールドミルの固定パラメータ
//!
//! タイマー設定から導出される定数はすべてここで計算します。
//! 数値リテラルを各モジュールに散らさないこと。

/// タイマー入力クロック [Hz]（STM32G431 APB1 = SYSCLK 160MHz）
pub const TIMER_BASE_CLOCK_HZ: u32 = 160_000_000;

/// タイマープリスケーラ分周比（PSC = 1 → ÷2）
pub const TIMER_DIVIDER: u32 = 2;

/// フリーランタイマーのカウント周波数 [Hz]（80MHz、12.5ns/tick）
pub const TIMER_TICK_HZ: u32 = TIMER_BASE_CLOCK_HZ / TIMER_DIVIDER;

/// 1周期（= 4エッジ）あたりの機械回転数
pub const REVOLUTIONS_PER_PERIOD: u64 = 1;

/// 周期 [tick] → RPM 変換定数
///
/// RPM = RPM_CONSTANT / period_ticks
pub const RPM_CONSTANT: u64 = TIMER_TICK_HZ as u64 * 60 * REVOLUTIONS_PER_PERIOD;

/// 1周期を構成するローターエッジ数
pub const EDGES_PER_PERIOD: u8 = 4;

/// デバウンスしきい値 = 直前の周期 >> DEBOUNCE_SHIFT（1/16周期）
pub const DEBOUNCE_SHIFT: u32 = 4;

/// 1/4周期境界の前後で捨てる区間 [tick]
///
/// ローター端でのフリンジングにより波形が矩形にならない区間
pub const DEADTIME_TICKS: u32 = (TIMER_BASE_CLOCK_HZ / 4_000_000) * 1500;

/// キュー容量（周期・トリガー・サンプル共通）
pub const QUEUE_CAPACITY: usize = 10;

/// 受信タイムアウト [ms]（生存確認用）
pub const RECEIVE_TIMEOUT_MS: u64 = 1000;

/// 速度制御周期 [ms]
pub const CONTROL_PERIOD_MS: u64 = 100;

/// 移動平均の時定数 [サンプル]
pub const AVERAGE_WINDOW: f32 = 10_000.0;

/// 平均値ログ出力間隔 [サンプル]
pub const AVERAGE_LOG_INTERVAL: u16 = 1000;

/// キャリブレーション点の最大数
pub const MAX_CALIBRATION_POINTS: usize = 100;

/// キャリブレーション未実施時に返す値
pub const UNCALIBRATED_FIELD: f32 = -1.0;

/// サンプリング設定
pub mod sampling {
    use super::TIMER_BASE_CLOCK_HZ;

    /// サンプリングレート要求値（デフォルト値）[Hz]
    pub const DEFAULT_RATE_HZ: u32 = 1000;

    /// 実際に使用するレート（要求値に関わらず固定）
    pub const PINNED_RATE_HZ: u32 = 2400;

    /// アラーム周期 [timer tick] = base / (rate * 4)（80MHz tick で 2 * rate [Hz]）
    pub const fn alarm_ticks(rate_hz: u32) -> u32 {
        TIMER_BASE_CLOCK_HZ / (rate_hz * 4)
    }
}

/// モーター速度制御パラメータ
pub mod motor {
    /// 目標回転数 [RPM]（デフォルト値）
    pub const DEFAULT_TARGET_RPM: u32 = 3600;

    /// 比例ゲイン（デフォルト値）
    pub const DEFAULT_KP: f32 = 0.001;

    /// 微分ゲイン（デフォルト値、負）
    pub const DEFAULT_KD: f32 = -0.001;

    /// 不感帯 [RPM]（|誤差| < この値は 0 とみなす）
    pub const DEADBAND_RPM: i32 = 2;

    /// 出力上限 [%]
    pub const MAX_POWER: f32 = 100.0;

    /// 出力下限 [%]
    pub const MIN_POWER: f32 = 0.0;

    /// 上限接近警告しきい値 [%]
    pub const POWER_WARNING: f32 = 93.0;

    /// 速度センサ無効かつ停止中のデューティ [%]（始動用キック）
    pub const STALL_DUTY: f32 = 50.0;

    /// モーター無効時のデューティ [%]
    pub const DISABLED_DUTY: f32 = 0.0;

    /// PWM周波数 [Hz]
    pub const PWM_FREQUENCY_HZ: u32 = 1000;
}

/// 設定キー
pub mod keys {
    pub const TARGET_RPM: &str = "FM_targetRPM";
    pub const TUNE_P: &str = "FM_motorTuneP";
    pub const TUNE_D: &str = "FM_motorTuneD";
    pub const SAMPLING_RATE: &str = "FM_samplingRate";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rpm_constant_from_timer() {
        assert_eq!(TIMER_TICK_HZ, 80_000_000);
        assert_eq!(RPM_CONSTANT, 4_800_000_000);
    }

    #[test]
    fn test_deadtime_ticks() {
        assert_eq!(DEADTIME_TICKS, 60_000);
    }

    #[test]
    fn test_pinned_alarm() {
        assert_eq!(sampling::alarm_ticks(sampling::PINNED_RATE_HZ), 16_666);
    }
}
