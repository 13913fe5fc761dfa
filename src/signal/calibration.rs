//! キャリブレーションカーブ
//!
//! センサー生値から電界値への区分線形変換。テーブルは読み込み時に
//! センサー値の昇順に並べ、各点から次の点への傾きを事前計算します。
//! 実行中のリロードはテーブルを丸ごと差し替え、読み出し側が書き換え途中の
//! テーブルを見ることはありません。

use core::cell::RefCell;
use core::fmt;
use core::sync::atomic::{AtomicU32, Ordering};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use heapless::Vec;

use crate::config::{MAX_CALIBRATION_POINTS, UNCALIBRATED_FIELD};

/// キャリブレーション点
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationPoint {
    /// センサー生値
    pub sensor_reading: i32,
    /// 印加電界
    pub applied_field: f32,
    /// 次の点への傾き [電界/カウント]（最後の点は 0）
    pub slope_to_next: f32,
}

/// テーブル構築エラー
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CalibrationError {
    /// 点数が上限を超えている
    TooManyPoints(usize),
    /// 同じセンサー値が2回以上現れた（傾きが定義できない）
    DuplicateReading(i32),
    /// 電界値が有限でない
    NonFiniteField(i32),
}

impl fmt::Display for CalibrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalibrationError::TooManyPoints(n) => {
                write!(f, "{} calibration points (max {})", n, MAX_CALIBRATION_POINTS)
            }
            CalibrationError::DuplicateReading(r) => write!(f, "duplicate sensor reading {}", r),
            CalibrationError::NonFiniteField(r) => write!(f, "non-finite field at reading {}", r),
        }
    }
}

/// キャリブレーションテーブル（センサー値昇順）
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationTable {
    points: Vec<CalibrationPoint, MAX_CALIBRATION_POINTS>,
}

impl CalibrationTable {
    /// 空のテーブル（未校正）
    pub const fn empty() -> Self {
        Self { points: Vec::new() }
    }

    /// (センサー値, 電界) のペアからテーブルを構築
    pub fn from_pairs(pairs: &[(i32, f32)]) -> Result<Self, CalibrationError> {
        let mut points: Vec<CalibrationPoint, MAX_CALIBRATION_POINTS> = Vec::new();
        for &(sensor_reading, applied_field) in pairs {
            if !applied_field.is_finite() {
                return Err(CalibrationError::NonFiniteField(sensor_reading));
            }
            points
                .push(CalibrationPoint {
                    sensor_reading,
                    applied_field,
                    slope_to_next: 0.0,
                })
                .map_err(|_| CalibrationError::TooManyPoints(pairs.len()))?;
        }
        points.sort_unstable_by_key(|p| p.sensor_reading);

        for i in 1..points.len() {
            let (prev, next) = (points[i - 1], points[i]);
            if prev.sensor_reading == next.sensor_reading {
                return Err(CalibrationError::DuplicateReading(next.sensor_reading));
            }
            let dx = (next.sensor_reading as i64 - prev.sensor_reading as i64) as f32;
            let dy = next.applied_field - prev.applied_field;
            points[i - 1].slope_to_next = dy / dx;
            debug!(
                "calibration point: reading={}, field={}, slope={}",
                prev.sensor_reading,
                prev.applied_field,
                points[i - 1].slope_to_next
            );
        }

        Ok(Self { points })
    }

    pub fn points(&self) -> &[CalibrationPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// 2点以上あれば校正済み
    pub fn is_calibrated(&self) -> bool {
        self.points.len() >= 2
    }

    /// 生値を電界値に変換
    ///
    /// # Returns
    /// 電界値。未校正（2点未満）または走査で該当点がない場合は `UNCALIBRATED_FIELD`
    pub fn lookup(&self, reading: i32) -> f32 {
        let points = &self.points;
        if points.len() < 2 {
            return UNCALIBRATED_FIELD;
        }

        let first = &points[0];
        if reading < first.sensor_reading {
            return first.applied_field + offset(reading, first) * first.slope_to_next;
        }

        // 末尾から、センサー値が reading より真に小さい最初の点を探す
        let last = points.len() - 1;
        for i in (0..=last).rev() {
            let point = &points[i];
            if reading > point.sensor_reading {
                // 最後の点より上は直前区間の傾きで外挿
                let slope = if i == last {
                    points[i - 1].slope_to_next
                } else {
                    point.slope_to_next
                };
                return point.applied_field + offset(reading, point) * slope;
            }
        }

        // reading == 最初の点のセンサー値
        UNCALIBRATED_FIELD
    }
}

#[inline(always)]
fn offset(reading: i32, point: &CalibrationPoint) -> f32 {
    (reading as i64 - point.sensor_reading as i64) as f32
}

/// 差し替え可能なキャリブレーションテーブル
///
/// 差し替えとコピーだけをクリティカルセクション内で行う。変換は各読み出し側が
/// 手元のコピーで行い、版数が変わったときだけコピーし直す（[`refresh`]）。
///
/// [`refresh`]: CalibrationStore::refresh
pub struct CalibrationStore {
    table: Mutex<CriticalSectionRawMutex, RefCell<CalibrationTable>>,
    version: AtomicU32,
}

impl CalibrationStore {
    pub const fn new() -> Self {
        Self {
            table: Mutex::new(RefCell::new(CalibrationTable::empty())),
            version: AtomicU32::new(0),
        }
    }

    /// テーブルを丸ごと差し替え
    pub fn install(&self, table: CalibrationTable) {
        // 版数はテーブルと同じロック内で進める
        let version = self.table.lock(|current| {
            *current.borrow_mut() = table;
            self.version.fetch_add(1, Ordering::Release).wrapping_add(1)
        });
        info!("calibration table v{} installed", version);
    }

    /// 手元のコピーを最新に更新
    ///
    /// 版数が `seen` と同じなら何もしない（ロックも取らない）。
    ///
    /// # Returns
    /// コピーし直した場合 `true`
    pub fn refresh(&self, cache: &mut CalibrationTable, seen: &mut u32) -> bool {
        if self.version.load(Ordering::Acquire) == *seen {
            return false;
        }
        self.table.lock(|current| {
            cache.clone_from(&current.borrow());
            *seen = self.version.load(Ordering::Relaxed);
        });
        true
    }

    /// 現在のテーブルのコピーと版数
    pub fn snapshot(&self) -> (CalibrationTable, u32) {
        self.table
            .lock(|current| (current.borrow().clone(), self.version.load(Ordering::Relaxed)))
    }

    /// 現在のテーブルの点数
    pub fn len(&self) -> usize {
        self.table.lock(|table| table.borrow().len())
    }

    pub fn is_calibrated(&self) -> bool {
        self.table.lock(|table| table.borrow().is_calibrated())
    }

    /// 差し替え回数
    pub fn version(&self) -> u32 {
        self.version.load(Ordering::Acquire)
    }
}
