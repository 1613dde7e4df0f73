use super::*;
use anyhow::anyhow;

#[tokio::test(start_paused = true)]
async fn elapsed_remote_call_is_a_transport_error() {
    let result: RemoteResult<u32> = safe_api_call(Duration::from_millis(50), async {
        tokio::time::sleep(Duration::from_secs(5)).await;
        RemoteResult::ok(1)
    })
    .await;
    assert_eq!(result, RemoteResult::TransportError);
}

#[tokio::test]
async fn completed_remote_call_passes_through() {
    let result = safe_api_call(Duration::from_secs(1), async {
        RemoteResult::<u32>::GenericError("nope".into())
    })
    .await;
    assert_eq!(result, RemoteResult::GenericError("nope".into()));
}

#[tokio::test(start_paused = true)]
async fn elapsed_cache_call_reports_cache_timeout() {
    let result: CacheResult<u32> = safe_cache_call(Duration::from_millis(10), async {
        tokio::time::sleep(Duration::from_secs(1)).await;
        Ok(Some(1))
    })
    .await;
    assert_eq!(result, CacheResult::GenericError(CACHE_ERROR_TIMEOUT.into()));
}

#[tokio::test]
async fn cache_error_keeps_its_context_chain() {
    let result: CacheResult<u32> = safe_cache_call(Duration::from_secs(1), async {
        Err(anyhow!("disk full").context("insert failed"))
    })
    .await;
    assert_eq!(
        result,
        CacheResult::GenericError("insert failed: disk full".into())
    );
}

#[tokio::test]
async fn missing_cache_row_is_a_null_success() {
    let result: CacheResult<u32> =
        safe_cache_call(Duration::from_secs(1), async { Ok(None) }).await;
    assert_eq!(result, CacheResult::Success(None));
}

#[test]
fn negative_write_sentinel_becomes_failure() {
    assert_eq!(check_write(Ok(4), "failed"), Ok(4));
    assert_eq!(check_write(Ok(-1), "failed"), Err("failed".to_string()));
    assert_eq!(
        check_write(Err(anyhow!("locked")), "failed"),
        Err("failed".to_string())
    );
}
