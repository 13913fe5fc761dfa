//! ADC取得タスク（MCP3301 13bit差動ADC）
//!
//! サンプリングトリガーごとに位相ゲートを確認し、使用可能な位相であれば
//! SPIで1フレーム読み取ってサンプルキューに積みます。

use embassy_time::{with_timeout, Duration};
use embedded_hal::digital::OutputPin;

use crate::config::RECEIVE_TIMEOUT_MS;
use crate::hal::{NoPin, SerialBus, Timer};
use crate::queues::{post, Sample, SampleQueue, TriggerQueue};
use crate::rotor::PhaseWindowGate;
use crate::state::RotorPhaseState;

/// 符号ビット（bit 12）
const SIGN_BIT: u16 = 0x1000;

/// 値ビット（bit 0-11）
const VALUE_MASK: u16 = 0x0FFF;

/// 1フレーム（MSBファースト2バイト）を符号付き13bit値に変換
///
/// バイト順をホスト順に入れ替え、bit 12 を符号として符号拡張する。
/// bit 13-15（ヌルビット等）は無視。
#[inline]
pub fn decode_frame(frame: [u8; 2]) -> i32 {
    let raw = u16::from_be_bytes(frame);
    if raw & SIGN_BIT != 0 {
        (u32::from(raw & VALUE_MASK) | 0xFFFF_F000) as i32
    } else {
        i32::from(raw & VALUE_MASK)
    }
}

/// トリガー1回分の処理結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// サンプルをキューに積んだ
    Queued(Sample),
    /// 位相ゲート外のため破棄
    Gated,
    /// SPI転送失敗のため破棄
    TransferFailed,
    /// サンプルキューが満杯のため破棄
    Dropped,
}

/// ADC取得タスク
///
/// オシロスコープ確認用の出力ピンを2本持てる（既定では何も出力しない）:
/// - `gate_pin`: 直近のゲート判定（使用可能で High）
/// - `sample_pin`: 読み取り成功ごとに反転
pub struct AdcAcquisition<'a, T: Timer, B: SerialBus, G: OutputPin = NoPin, S: OutputPin = NoPin> {
    rotor: &'a RotorPhaseState,
    samples: &'a SampleQueue,
    gate: PhaseWindowGate,
    timer: T,
    bus: B,
    gate_pin: G,
    sample_pin: S,
    sample_level: bool,
    /// 累計転送失敗回数
    faults: u32,
}

impl<'a, T: Timer, B: SerialBus> AdcAcquisition<'a, T, B> {
    pub fn new(
        rotor: &'a RotorPhaseState,
        samples: &'a SampleQueue,
        gate: PhaseWindowGate,
        timer: T,
        bus: B,
    ) -> Self {
        Self {
            rotor,
            samples,
            gate,
            timer,
            bus,
            gate_pin: NoPin,
            sample_pin: NoPin,
            sample_level: false,
            faults: 0,
        }
    }

    /// デバッグ出力ピンを付ける
    pub fn with_debug_pins<G: OutputPin, S: OutputPin>(
        self,
        gate_pin: G,
        sample_pin: S,
    ) -> AdcAcquisition<'a, T, B, G, S> {
        AdcAcquisition {
            rotor: self.rotor,
            samples: self.samples,
            gate: self.gate,
            timer: self.timer,
            bus: self.bus,
            gate_pin,
            sample_pin,
            sample_level: false,
            faults: self.faults,
        }
    }
}

impl<'a, T: Timer, B: SerialBus, G: OutputPin, S: OutputPin> AdcAcquisition<'a, T, B, G, S> {
    /// 累計転送失敗回数
    pub fn faults(&self) -> u32 {
        self.faults
    }

    /// サンプルを1つ取得（ゲート外・転送失敗時は何もしない）
    pub fn acquire(&mut self) -> Result<Option<Sample>, B::Error> {
        let timestamp = self.timer.now();
        let usable = self.gate.is_usable(self.rotor.last_period(), timestamp);
        self.gate_pin.set_state(usable.into()).ok();
        if !usable {
            return Ok(None);
        }

        let rotor_position = self.rotor.position();
        let mut frame = [0u8; 2];
        self.bus.read_frame(&mut frame)?;

        self.sample_level = !self.sample_level;
        self.sample_pin.set_state(self.sample_level.into()).ok();

        Ok(Some(Sample {
            value: decode_frame(frame),
            rotor_position,
            timestamp,
        }))
    }

    /// トリガー1回分の処理
    pub fn on_trigger(&mut self) -> AcquireOutcome {
        match self.acquire() {
            Ok(Some(sample)) => {
                if post(self.samples, sample) {
                    AcquireOutcome::Queued(sample)
                } else {
                    AcquireOutcome::Dropped
                }
            }
            Ok(None) => AcquireOutcome::Gated,
            Err(_) => {
                self.faults = self.faults.wrapping_add(1);
                error!("ADC transfer failed, sample dropped (faults: {})", self.faults);
                AcquireOutcome::TransferFailed
            }
        }
    }

    /// タスクループ
    pub async fn run(&mut self, triggers: &TriggerQueue) {
        info!("ADC acquisition task started");
        loop {
            match with_timeout(Duration::from_millis(RECEIVE_TIMEOUT_MS), triggers.receive()).await {
                Ok(()) => {
                    self.on_trigger();
                }
                Err(_) => {
                    info!("No sampling trigger for {} ms", RECEIVE_TIMEOUT_MS);
                }
            }
        }
    }
}
