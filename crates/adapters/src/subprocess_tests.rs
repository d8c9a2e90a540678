use super::*;

#[tokio::test]
async fn succeeds_within_timeout() {
    let mut cmd = Command::new("true");
    cmd.kill_on_drop(true);
    let output = run_with_timeout(cmd, Duration::from_secs(5), "true").await;
    assert!(output.is_ok());
}

#[tokio::test]
async fn reports_timeout_elapsed() {
    let mut cmd = Command::new("sleep");
    cmd.arg("5");
    cmd.kill_on_drop(true);
    let result = run_with_timeout(cmd, Duration::from_millis(50), "sleep").await;
    let err = result.expect_err("should time out");
    assert!(err.contains("timed out"));
}
