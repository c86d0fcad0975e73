use super::*;

#[tokio::test]
async fn reports_progress_in_at_least_ten_percent_increments() {
    let lines = [
        "frame=10\n",
        "out_time_us=1000000\n", // 10s of 100s = 10%
        "out_time_us=1500000\n", // 15% — below the next 10% bucket, should not send again
        "out_time_us=2200000\n", // 22%
        "out_time_us=9900000\n", // 99%
        "progress=end\n",
    ]
    .concat();

    let (tx, mut rx) = mpsc::unbounded_channel();
    stream_progress(lines.as_bytes(), 100.0, tx).await;

    let mut received = Vec::new();
    while let Ok(pct) = rx.try_recv() {
        received.push(pct);
    }
    assert_eq!(received, vec![10, 20, 90]);
}

#[tokio::test]
async fn zero_duration_never_reports_progress() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    stream_progress(&b"out_time_us=5000000\n"[..], 0.0, tx).await;
    assert!(rx.try_recv().is_err());
}
