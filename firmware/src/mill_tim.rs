//! フィールドミル用タイマー・エッジ割り込みの実装
//!
//! ## ハードウェア構成
//! - TIM2: 32bitフリーランカウンタ（160MHz ÷ 2 = 80MHz、12.5ns/tick）
//!   ローター周期の計測とサンプルのタイムスタンプに使用。
//!   1周期（4エッジ）ごとにローター側でリセットされる。
//! - TIM3: サンプリングアラーム（80MHz、ARR = アラーム周期 - 1）
//!   UPDATE割り込みでトリガーキューに通知。
//! - PB8 (EXTI8): ローターインタラプタ入力、両エッジで割り込み。
//! - PA5: ローター位置ビットのエコー出力（オシロスコープ確認用）。
//!
//! どちらの割り込みハンドラも `FIELD_MILL` からコンポーネントをその場で
//! 組み立てて1回分の処理を行います（状態はすべてアトミック変数側）。

use core::convert::Infallible;

use embassy_stm32::pac;
use embedded_hal::digital::{ErrorType, OutputPin};

use field_mill::config::TIMER_DIVIDER;
use field_mill::hal::{AlarmTimer, Timer};

use crate::config::{irq, scope, ROTOR_INPUT_PIN};
use crate::state::FIELD_MILL;

/// TIM2 フリーランカウンタ
#[derive(Clone, Copy)]
pub struct PhaseCounter;

impl Timer for PhaseCounter {
    #[inline(always)]
    fn now(&self) -> u32 {
        pac::TIM2.cnt().read()
    }

    #[inline(always)]
    fn reset(&self) {
        pac::TIM2.cnt().write_value(0);
    }
}

/// TIM3 サンプリングアラーム
pub struct SamplingAlarm;

impl AlarmTimer for SamplingAlarm {
    fn set_alarm_ticks(&mut self, ticks: u32) {
        let tim3 = pac::TIM3;
        let arr = ticks.saturating_sub(1).min(0xFFFF); // TIM3は16bit

        tim3.cr1().modify(|w| w.set_cen(false));
        tim3.arr().write_value(pac::timer::regs::ArrCore(arr));
        tim3.cnt().write_value(pac::timer::regs::CntCore(0));
        tim3.egr().write(|w| w.set_ug(true)); // ARR/PSC反映
        tim3.sr().write(|w| w.0 = 0);
        tim3.cr1().modify(|w| w.set_cen(true));
    }

    #[inline(always)]
    fn rearm(&mut self) {
        // ARRによる自動リロードなので、フラグクリアのみ
        pac::TIM3.sr().modify(|w| w.set_uif(false));
    }
}

/// GPIOA 出力ピン（BSRR 直接書き込み、割り込みから使う）
pub struct ScopePin<const N: usize>;

impl<const N: usize> ErrorType for ScopePin<N> {
    type Error = Infallible;
}

impl<const N: usize> OutputPin for ScopePin<N> {
    #[inline(always)]
    fn set_low(&mut self) -> Result<(), Infallible> {
        pac::GPIOA.bsrr().write(|w| w.set_br(N, true));
        Ok(())
    }

    #[inline(always)]
    fn set_high(&mut self) -> Result<(), Infallible> {
        pac::GPIOA.bsrr().write(|w| w.set_bs(N, true));
        Ok(())
    }
}

/// TIM2 フリーランカウンタの初期化
///
/// # Safety
/// PACを使用した直接レジスタ操作を含む
pub unsafe fn init_phase_counter() {
    let rcc = pac::RCC;
    let tim2 = pac::TIM2;

    rcc.apb1enr1().modify(|w| w.set_tim2en(true));

    tim2.cr1().modify(|w| w.set_cen(false));
    tim2.psc().write_value((TIMER_DIVIDER - 1) as u16); // 160MHz ÷ 2
    tim2.arr().write_value(u32::MAX);
    tim2.cnt().write_value(0);
    tim2.egr().write(|w| w.set_ug(true)); // プリスケーラ反映
    tim2.sr().write(|w| w.0 = 0);
    tim2.cr1().modify(|w| w.set_cen(true));
}

/// TIM3 サンプリングアラームの初期化（周期は `SamplingTrigger::set_sampling_rate` で設定）
///
/// # Safety
/// PACを使用した直接レジスタ操作を含む
pub unsafe fn init_sampling_alarm() {
    let rcc = pac::RCC;
    let tim3 = pac::TIM3;

    rcc.apb1enr1().modify(|w| w.set_tim3en(true));

    tim3.cr1().modify(|w| {
        w.set_cen(false);
        w.set_urs(pac::timer::vals::Urs::COUNTER_ONLY); // UGでは割り込みを出さない
    });
    tim3.psc().write_value((TIMER_DIVIDER - 1) as u16);
    tim3.dier().modify(|w| w.set_uie(true));

    unsafe {
        cortex_m::peripheral::NVIC::unmask(pac::Interrupt::TIM3);
        let mut cp = cortex_m::Peripherals::steal();
        cp.NVIC
            .set_priority(pac::Interrupt::TIM3, irq::SAMPLING_ALARM_PRIORITY);
    }
}

/// ローター位置エコー出力（PA5、プッシュプル）の初期化
///
/// # Safety
/// PACを使用した直接レジスタ操作を含む
pub unsafe fn init_position_echo() {
    let pin = scope::POSITION_ECHO_PIN;

    pac::RCC.ahb2enr().modify(|w| w.set_gpioaen(true));
    pac::GPIOA.bsrr().write(|w| w.set_br(pin, true));
    pac::GPIOA
        .moder()
        .modify(|w| w.set_moder(pin, pac::gpio::vals::Moder::OUTPUT));
}

/// ローターインタラプタ入力（PB8、EXTI8 両エッジ）の初期化
///
/// # Safety
/// PACを使用した直接レジスタ操作を含む
pub unsafe fn init_rotor_input() {
    let rcc = pac::RCC;
    let gpiob = pac::GPIOB;
    let pin = ROTOR_INPUT_PIN;

    rcc.ahb2enr().modify(|w| w.set_gpioben(true));
    rcc.apb2enr().modify(|w| w.set_syscfgen(true));

    // 入力、プルなし（インタラプタ側でプルアップ済み）
    gpiob
        .moder()
        .modify(|w| w.set_moder(pin, pac::gpio::vals::Moder::INPUT));
    gpiob
        .pupdr()
        .modify(|w| w.set_pupdr(pin, pac::gpio::vals::Pupdr::FLOATING));

    // EXTI8 ← GPIOB（EXTICR3 の先頭）
    pac::SYSCFG
        .exticr(pin / 4)
        .modify(|w| w.set_exti(pin % 4, 1));

    let exti = pac::EXTI;
    exti.rtsr(0).modify(|w| w.set_line(pin, true));
    exti.ftsr(0).modify(|w| w.set_line(pin, true));
    exti.pr(0).write(|w| w.set_line(pin, true));
    exti.imr(0).modify(|w| w.set_line(pin, true));

    unsafe {
        cortex_m::peripheral::NVIC::unmask(pac::Interrupt::EXTI9_5);
        let mut cp = cortex_m::Peripherals::steal();
        cp.NVIC
            .set_priority(pac::Interrupt::EXTI9_5, irq::ROTOR_EDGE_PRIORITY);
    }
}

/// ローターエッジ割り込み
///
/// # Safety
/// 割り込みコンテキストで実行されるため、処理は最小限にする
#[inline(always)]
unsafe fn rotor_edge_irq_handler() {
    let exti = pac::EXTI;
    let pin = ROTOR_INPUT_PIN;

    if !exti.pr(0).read().line(pin) {
        return;
    }
    exti.pr(0).write(|w| w.set_line(pin, true)); // フラグクリア（1書き込み）

    let level = pac::GPIOB.idr().read().idr(pin) as u8 != 0;
    let mut echo = ScopePin::<{ scope::POSITION_ECHO_PIN }>;
    FIELD_MILL.phase_tracker(PhaseCounter).on_edge_echo(level, &mut echo);
}

/// サンプリングアラーム割り込み
///
/// # Safety
/// 割り込みコンテキストで実行されるため、処理は最小限にする
#[inline(always)]
unsafe fn sampling_alarm_irq_handler() {
    if !pac::TIM3.sr().read().uif() {
        return;
    }
    FIELD_MILL.sampling_trigger(SamplingAlarm).on_alarm();
}

/// EXTI9_5割り込みのエントリーポイント
#[allow(non_snake_case)]
#[no_mangle]
pub unsafe extern "C" fn EXTI9_5() {
    rotor_edge_irq_handler();
}

/// TIM3割り込みのエントリーポイント
#[allow(non_snake_case)]
#[no_mangle]
pub unsafe extern "C" fn TIM3() {
    sampling_alarm_irq_handler();
}
