use crate::queue::QueueItem;
use crate::scanner::ScanResult;

/// Priority points a retried item loses
pub const RETRY_DEMOTION: u8 = 2;

/// Returns the item to requeue when `result` is a transient failure and
/// `item` still has retries left
pub fn retry_item(item: &QueueItem, result: &ScanResult, max_retries: u32) -> Option<QueueItem> {
    if result.is_transient_failure() && item.retries < max_retries {
        Some(item.retried(RETRY_DEMOTION))
    } else {
        None
    }
}
