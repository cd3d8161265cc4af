//! Scheduler specs: independent jobs, failure isolation, overlap guard.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use sw_core::SystemClock;
use sw_engine::{JobError, JobScheduler, SchedulerError};

#[tokio::test(start_paused = true)]
async fn a_failing_job_never_stops_its_own_or_other_jobs_triggers() {
    let scheduler = JobScheduler::new(SystemClock);
    let healthy_runs = Arc::new(AtomicU32::new(0));

    scheduler
        .register("doomed", Duration::from_secs(10), || async {
            Err::<(), JobError>("retailer API 500".into())
        })
        .unwrap();
    let counter = Arc::clone(&healthy_runs);
    scheduler
        .register("healthy", Duration::from_secs(10), move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })
        .unwrap();

    tokio::time::sleep(Duration::from_secs(35)).await;

    assert_eq!(healthy_runs.load(Ordering::SeqCst), 3);
    let status = scheduler.status();
    let doomed = status.iter().find(|s| s.record.name == "doomed").unwrap();
    assert_eq!(doomed.record.run_count, 3);
    assert_eq!(doomed.record.last_error.as_deref(), Some("retailer API 500"));
    let healthy = status.iter().find(|s| s.record.name == "healthy").unwrap();
    assert!(healthy.record.last_error.is_none());
}

#[tokio::test(start_paused = true)]
async fn the_same_job_never_runs_twice_concurrently() {
    let scheduler = JobScheduler::new(SystemClock);
    let concurrent = Arc::new(AtomicU32::new(0));
    let peak = Arc::new(AtomicU32::new(0));

    let (active, high_water) = (Arc::clone(&concurrent), Arc::clone(&peak));
    scheduler
        .register("exclusive", Duration::from_secs(10), move || {
            let active = Arc::clone(&active);
            let high_water = Arc::clone(&high_water);
            async move {
                let now_active = active.fetch_add(1, Ordering::SeqCst) + 1;
                high_water.fetch_max(now_active, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_secs(25)).await;
                active.fetch_sub(1, Ordering::SeqCst);
                Ok(())
            }
        })
        .unwrap();

    tokio::time::sleep(Duration::from_secs(120)).await;

    assert_eq!(peak.load(Ordering::SeqCst), 1);
    let status = &scheduler.status()[0];
    assert!(status.record.skipped_overlaps > 0);
}

#[tokio::test]
async fn job_names_are_unique_per_scheduler() {
    let scheduler = JobScheduler::new(SystemClock);
    scheduler
        .register("availability-scan", Duration::from_secs(120), || async { Ok(()) })
        .unwrap();

    let err = scheduler
        .register("availability-scan", Duration::from_secs(60), || async { Ok(()) })
        .unwrap_err();
    assert!(matches!(err, SchedulerError::DuplicateJob(_)));
}

#[tokio::test(start_paused = true)]
async fn the_status_snapshot_reports_schedules_and_next_runs() {
    let scheduler = JobScheduler::new(SystemClock);
    scheduler
        .register("scan", Duration::from_secs(120), || async { Ok(()) })
        .unwrap();
    scheduler
        .register("cleanup", Duration::from_secs(3600), || async { Ok(()) })
        .unwrap();

    let status = scheduler.status();
    assert_eq!(status.len(), 2);
    for job in &status {
        assert!(job.next_run > job.record.registered_at);
        assert_eq!(job.record.run_count, 0);
    }

    tokio::time::sleep(Duration::from_secs(125)).await;
    let scan = scheduler
        .status()
        .into_iter()
        .find(|s| s.record.name == "scan")
        .unwrap();
    assert_eq!(scan.record.run_count, 1);
    assert!(scan.record.last_duration.is_some());
    assert!(scan.record.last_success_at.is_some());
}
