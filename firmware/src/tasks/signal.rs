//! 信号処理タスク

use crate::state::FIELD_MILL;

/// 信号処理タスク（復調・移動平均・電界値変換）
#[embassy_executor::task]
pub async fn signal_task() {
    FIELD_MILL
        .signal_processor()
        .run(FIELD_MILL.samples())
        .await;
}
